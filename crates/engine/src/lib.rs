pub mod apply;
pub mod config;
pub mod error;
pub mod merge;

pub use apply::{ApprovalOutcome, UNSUPPORTED_KIND_REASON, WellAction};
pub use config::EngineConfig;
pub use error::EngineError;

use tracing::{error, info};

use wellops_core::{
    clock::Clock,
    ids::*,
    principal::Principal,
    proposal::{ProposalStatus, WellChange},
};
use wellops_storage::{
    AnchorRecord, CompanyRecord, HistoryRecord, ProposalRecord, SqliteStorage, Storage,
    StorageError, WellRecord,
};

/// The review workflow over one store: submission, the pending queue,
/// rejection and the approval transaction.
pub struct ReviewEngine {
    clock: Clock,
    storage: SqliteStorage,
    config: EngineConfig,
}

impl ReviewEngine {
    pub fn new(storage: SqliteStorage, config: EngineConfig) -> Self {
        Self {
            clock: Clock::new(),
            storage,
            config,
        }
    }

    /// Open the database named by `config`.
    pub fn open(config: EngineConfig) -> Result<Self, EngineError> {
        let storage = SqliteStorage::open(&config.database_path)?;
        storage.set_busy_timeout(config.busy_timeout_ms)?;
        Ok(Self::new(storage, config))
    }

    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    fn require_reviewer(principal: &Principal, action: &'static str) -> Result<(), EngineError> {
        if principal.role.can_review() {
            Ok(())
        } else {
            Err(EngineError::Forbidden {
                user: principal.user.clone(),
                action,
            })
        }
    }

    // ========================================================================
    // Submission
    // ========================================================================

    /// Store a validated well change as a new pending proposal.
    pub fn submit(
        &mut self,
        principal: &Principal,
        change: &WellChange,
    ) -> Result<ChangeId, EngineError> {
        change.validate()?;
        let payload = change.payload_json()?;
        self.insert_pending(principal, change.kind(), payload)
    }

    /// Store a proposal of any kind without validating its payload.
    pub fn submit_raw(
        &mut self,
        principal: &Principal,
        kind: &str,
        payload: &serde_json::Value,
    ) -> Result<ChangeId, EngineError> {
        let payload = serde_json::to_string(payload)
            .map_err(|e| StorageError::Serialization(e.to_string()))?;
        self.insert_pending(principal, kind, payload)
    }

    fn insert_pending(
        &mut self,
        principal: &Principal,
        kind: &str,
        payload: String,
    ) -> Result<ChangeId, EngineError> {
        let record = ProposalRecord {
            change_id: ChangeId::new(),
            kind: kind.to_string(),
            submitted_by: principal.user.clone(),
            status: ProposalStatus::Pending,
            payload,
            created_at: self.clock.tick()?,
            decided_at: None,
            decided_by: None,
            reason: None,
        };
        self.storage.insert_proposal(&record)?;
        info!(change_id = %record.change_id, kind, submitted_by = %principal.user, "proposal submitted");
        Ok(record.change_id)
    }

    // ========================================================================
    // Review queue
    // ========================================================================

    /// Pending proposals in review order, oldest first.
    pub fn list_pending(&self, principal: &Principal) -> Result<Vec<ProposalRecord>, EngineError> {
        Self::require_reviewer(principal, "list pending proposals")?;
        Ok(self.storage.list_pending(self.config.pending_limit)?)
    }

    /// Any proposal regardless of status. Reviewers see all of them,
    /// everyone else only their own submissions.
    pub fn get_proposal(
        &self,
        principal: &Principal,
        change_id: ChangeId,
    ) -> Result<ProposalRecord, EngineError> {
        let proposal = self
            .storage
            .get_proposal(change_id)?
            .ok_or_else(|| EngineError::ProposalNotFound(change_id.to_string()))?;
        if !principal.role.can_review() && proposal.submitted_by != principal.user {
            return Err(EngineError::Forbidden {
                user: principal.user.clone(),
                action: "view this proposal",
            });
        }
        Ok(proposal)
    }

    /// Reject a pending proposal. Rejecting an unknown or already decided
    /// proposal changes nothing and returns `false`.
    pub fn reject(
        &mut self,
        principal: &Principal,
        change_id: ChangeId,
        reason: &str,
    ) -> Result<bool, EngineError> {
        Self::require_reviewer(principal, "reject proposals")?;
        let now = self.clock.tick()?;
        let rejected = self
            .storage
            .reject_proposal(change_id, reason, &principal.user, now)?;
        if rejected {
            info!(%change_id, reason, decided_by = %principal.user, "proposal rejected");
        } else {
            info!(%change_id, "reject ignored, proposal not pending");
        }
        Ok(rejected)
    }

    /// Approve a pending proposal and apply it in one transaction.
    ///
    /// Fails with `ProposalNotFound` when the proposal is missing or already
    /// decided. Any failure while applying rolls the whole transaction back
    /// and leaves the proposal pending.
    pub fn approve(
        &mut self,
        principal: &Principal,
        change_id: ChangeId,
    ) -> Result<ApprovalOutcome, EngineError> {
        Self::require_reviewer(principal, "approve proposals")?;
        let now = self.clock.tick()?;

        let tx = self.storage.begin_approval()?;
        let proposal = tx
            .pending_proposal(change_id)?
            .ok_or_else(|| EngineError::ProposalNotFound(change_id.to_string()))?;

        let result = apply::apply_proposal(&tx, &proposal, &principal.user, now)
            .and_then(|outcome| tx.commit().map(|()| outcome).map_err(EngineError::from));

        match result {
            Ok(outcome) => {
                match &outcome {
                    ApprovalOutcome::Applied {
                        well_id, action, ..
                    } => {
                        info!(%change_id, %well_id, ?action, kind = %proposal.kind, decided_by = %principal.user, "proposal approved");
                    }
                    ApprovalOutcome::Unsupported { kind, .. } => {
                        info!(%change_id, kind = %kind, "proposal rejected as unsupported");
                    }
                }
                Ok(outcome)
            }
            Err(err) => {
                error!(%change_id, kind = %proposal.kind, error = %err, "approval rolled back");
                match err {
                    EngineError::WellNotFound(_) => Err(err),
                    other => Err(EngineError::ApprovalFailed {
                        change_id: change_id.to_string(),
                        message: other.to_string(),
                    }),
                }
            }
        }
    }

    // ========================================================================
    // Reads
    // ========================================================================

    pub fn get_well(&self, well_id: WellId) -> Result<Option<WellRecord>, EngineError> {
        Ok(self.storage.get_well(well_id)?)
    }

    pub fn find_well_by_api(&self, api: &str) -> Result<Option<WellRecord>, EngineError> {
        Ok(self.storage.find_well_by_api(api)?)
    }

    pub fn get_anchors(&self, well_id: WellId) -> Result<Vec<AnchorRecord>, EngineError> {
        Ok(self.storage.get_anchors(well_id)?)
    }

    pub fn get_company(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, EngineError> {
        Ok(self.storage.get_company(company_id)?)
    }

    pub fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRecord>, EngineError> {
        Ok(self.storage.find_company_by_name(name)?)
    }

    /// Audit snapshots for a well, oldest first. Reviewers only.
    pub fn well_history(
        &self,
        principal: &Principal,
        well_id: WellId,
    ) -> Result<Vec<HistoryRecord>, EngineError> {
        Self::require_reviewer(principal, "read well history")?;
        Ok(self.storage.get_history(well_id)?)
    }
}
