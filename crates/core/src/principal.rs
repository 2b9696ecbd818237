use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Dispatcher,
    Technician,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Dispatcher => "dispatcher",
            Self::Technician => "technician",
        }
    }

    /// Whether this role may approve, reject and list proposals.
    pub fn can_review(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

/// The authenticated caller of an engine operation. Produced once by the
/// session layer and passed to every operation instead of re-reading roles.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub user: String,
    pub role: Role,
}

impl Principal {
    pub fn new(user: impl Into<String>, role: Role) -> Self {
        Self {
            user: user.into(),
            role,
        }
    }

    pub fn admin(user: impl Into<String>) -> Self {
        Self::new(user, Role::Admin)
    }
}

impl fmt::Display for Principal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.user, self.role.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_admin_reviews() {
        assert!(Role::Admin.can_review());
        assert!(!Role::Dispatcher.can_review());
        assert!(!Role::Technician.can_review());
    }

    #[test]
    fn display_names_user_and_role() {
        let principal = Principal::new("field-tech", Role::Technician);
        assert_eq!(principal.to_string(), "field-tech (technician)");
        assert_eq!(Principal::admin("ops").role, Role::Admin);
    }
}
