use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use crate::CoreError;
use crate::ids::WellId;

pub const KIND_CREATE_WELL: &str = "create_well";
pub const KIND_UPDATE_WELL: &str = "update_well";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ProposalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Result<Self, CoreError> {
        match s {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(CoreError::InvalidData(format!("unknown proposal status: {s}"))),
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Pending)
    }
}

impl fmt::Display for ProposalStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor position slot. Each well holds at most one anchor per quadrant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    NE,
    NW,
    SE,
    SW,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [Self::NE, Self::NW, Self::SE, Self::SW];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NE => "NE",
            Self::NW => "NW",
            Self::SE => "SE",
            Self::SW => "SW",
        }
    }
}

impl FromStr for Quadrant {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "NE" => Ok(Self::NE),
            "NW" => Ok(Self::NW),
            "SE" => Ok(Self::SE),
            "SW" => Ok(Self::SW),
            _ => Err(CoreError::InvalidData(format!("unknown quadrant: {s}"))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorInput {
    pub quadrant: Quadrant,
    pub lat: f64,
    pub lng: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyInput {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
}

impl CompanyInput {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// The trimmed company name, or `None` when absent or blank.
    pub fn resolved_name(&self) -> Option<&str> {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
    }
}

/// Well fields carried by a proposal. Every field is optional: on create an
/// absent field is stored as NULL, on update it keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellFields {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<WellId>,
    #[serde(default, deserialize_with = "trimmed_api")]
    pub api: Option<String>,
    #[serde(default)]
    pub company: Option<CompanyInput>,
    #[serde(default)]
    pub company_man_name: Option<String>,
    #[serde(default)]
    pub company_man_number: Option<String>,
    #[serde(default)]
    pub company_man_email: Option<String>,
    #[serde(default)]
    pub company_man_cell: Option<String>,
    #[serde(default)]
    pub previous_anchor_company: Option<String>,
    #[serde(default)]
    pub last_test_date: Option<NaiveDate>,
    #[serde(default, deserialize_with = "lenient_anchors")]
    pub anchors: Option<Vec<AnchorInput>>,
}

impl WellFields {
    /// The api code without surrounding whitespace; blank counts as absent.
    pub fn api_code(&self) -> Option<&str> {
        normalize_api(self.api.as_deref())
    }
}

pub fn normalize_api(api: Option<&str>) -> Option<&str> {
    api.map(str::trim).filter(|api| !api.is_empty())
}

fn trimmed_api<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let api = Option::<String>::deserialize(deserializer)?;
    Ok(normalize_api(api.as_deref()).map(str::to_string))
}

/// Anchors that are present but not a sequence are treated as absent.
fn lenient_anchors<'de, D>(deserializer: D) -> Result<Option<Vec<AnchorInput>>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<serde_json::Value>::deserialize(deserializer)? {
        Some(serde_json::Value::Array(items)) => items
            .into_iter()
            .map(serde_json::from_value)
            .collect::<Result<Vec<AnchorInput>, _>>()
            .map(Some)
            .map_err(serde::de::Error::custom),
        _ => Ok(None),
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WellPayload {
    pub well: WellFields,
}

impl From<WellFields> for WellPayload {
    fn from(well: WellFields) -> Self {
        Self { well }
    }
}

/// A proposed well mutation, discriminated by `kind`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload", rename_all = "snake_case")]
pub enum WellChange {
    CreateWell(WellPayload),
    UpdateWell(WellPayload),
}

impl WellChange {
    pub fn kind(&self) -> &'static str {
        match self {
            Self::CreateWell(_) => KIND_CREATE_WELL,
            Self::UpdateWell(_) => KIND_UPDATE_WELL,
        }
    }

    pub fn payload(&self) -> &WellPayload {
        match self {
            Self::CreateWell(p) | Self::UpdateWell(p) => p,
        }
    }

    pub fn payload_json(&self) -> Result<String, CoreError> {
        serde_json::to_string(self.payload()).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Decode a stored `(kind, payload)` pair. Returns `Ok(None)` for kinds
    /// the applier does not handle.
    pub fn decode(kind: &str, payload: &str) -> Result<Option<Self>, CoreError> {
        let parse = |payload: &str| -> Result<WellPayload, CoreError> {
            serde_json::from_str(payload)
                .map_err(|e| CoreError::InvalidPayload(format!("{kind}: {e}")))
        };
        match kind {
            KIND_CREATE_WELL => Ok(Some(Self::CreateWell(parse(payload)?))),
            KIND_UPDATE_WELL => Ok(Some(Self::UpdateWell(parse(payload)?))),
            _ => Ok(None),
        }
    }

    /// Shape checks applied at submission time.
    pub fn validate(&self) -> Result<(), CoreError> {
        let well = &self.payload().well;
        match self {
            Self::CreateWell(_) => {
                if well.id.is_some() {
                    return Err(CoreError::InvalidPayload(
                        "create_well must not carry a well id".into(),
                    ));
                }
            }
            Self::UpdateWell(_) => {
                if well.id.is_none() && well.api_code().is_none() {
                    return Err(CoreError::InvalidPayload(
                        "update_well needs a well id or api".into(),
                    ));
                }
            }
        }
        if let Some(anchors) = &well.anchors {
            for (i, a) in anchors.iter().enumerate() {
                if anchors[..i].iter().any(|prev| prev.quadrant == a.quadrant) {
                    return Err(CoreError::InvalidPayload(format!(
                        "duplicate anchor quadrant {}",
                        a.quadrant.as_str()
                    )));
                }
            }
        }
        Ok(())
    }
}
