use wellops_core::{
    ids::*,
    principal::{Principal, Role},
    proposal::{AnchorInput, CompanyInput, Quadrant, WellChange, WellFields},
};
use wellops_engine::{ApprovalOutcome, EngineConfig, ReviewEngine};
use wellops_storage::{SqliteStorage, StorageError};

/// Well fields with only the api code set.
pub fn well(api: &str) -> WellFields {
    WellFields {
        api: Some(api.to_string()),
        ..WellFields::default()
    }
}

pub fn anchor(quadrant: Quadrant, lat: f64, lng: f64) -> AnchorInput {
    AnchorInput { quadrant, lat, lng }
}

/// A review engine over an in-memory store, plus a reviewer and a field
/// technician to act as.
pub struct TestPortal {
    pub engine: ReviewEngine,
    pub admin: Principal,
    pub tech: Principal,
}

impl TestPortal {
    pub fn new() -> Result<Self, StorageError> {
        Ok(Self::with_engine(ReviewEngine::new(
            SqliteStorage::open_in_memory()?,
            EngineConfig::default(),
        )))
    }

    pub fn with_engine(engine: ReviewEngine) -> Self {
        Self {
            engine,
            admin: Principal::new("office-admin", Role::Admin),
            tech: Principal::new("field-tech", Role::Technician),
        }
    }

    /// Submit a `create_well` proposal as the technician.
    pub fn submit_create(
        &mut self,
        fields: WellFields,
    ) -> Result<ChangeId, Box<dyn std::error::Error>> {
        let change = WellChange::CreateWell(fields.into());
        Ok(self.engine.submit(&self.tech, &change)?)
    }

    /// Submit an `update_well` proposal as the technician.
    pub fn submit_update(
        &mut self,
        fields: WellFields,
    ) -> Result<ChangeId, Box<dyn std::error::Error>> {
        let change = WellChange::UpdateWell(fields.into());
        Ok(self.engine.submit(&self.tech, &change)?)
    }

    /// Approve as the admin and return the affected well.
    pub fn approve_well(
        &mut self,
        change_id: ChangeId,
    ) -> Result<WellId, Box<dyn std::error::Error>> {
        match self.engine.approve(&self.admin, change_id)? {
            ApprovalOutcome::Applied { well_id, .. } => Ok(well_id),
            ApprovalOutcome::Unsupported { kind, .. } => {
                Err(format!("proposal {change_id} has unsupported kind {kind}").into())
            }
        }
    }

    /// Submit and approve a new well in one step.
    pub fn create_well(
        &mut self,
        fields: WellFields,
    ) -> Result<WellId, Box<dyn std::error::Error>> {
        let change_id = self.submit_create(fields)?;
        self.approve_well(change_id)
    }

    /// Create a well owned by the named company.
    pub fn create_well_for(
        &mut self,
        api: &str,
        company: &str,
    ) -> Result<WellId, Box<dyn std::error::Error>> {
        self.create_well(WellFields {
            company: Some(CompanyInput::named(company)),
            ..well(api)
        })
    }
}
