use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use wellops_core::{
    clock::Timestamp,
    ids::*,
    proposal::{ProposalStatus, Quadrant},
};

use crate::error::StorageError;
use crate::sqlite::ApprovalTx;

#[derive(Debug, Clone, PartialEq)]
pub struct ProposalRecord {
    pub change_id: ChangeId,
    pub kind: String,
    pub submitted_by: String,
    pub status: ProposalStatus,
    /// JSON text as submitted. Never rewritten after insert.
    pub payload: String,
    pub created_at: Timestamp,
    pub decided_at: Option<Timestamp>,
    pub decided_by: Option<String>,
    pub reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompanyRecord {
    pub company_id: CompanyId,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WellRecord {
    pub well_id: WellId,
    pub api: Option<String>,
    pub company_id: Option<CompanyId>,
    pub company_man_name: Option<String>,
    pub company_man_number: Option<String>,
    pub company_man_email: Option<String>,
    pub company_man_cell: Option<String>,
    pub previous_anchor_company: Option<String>,
    pub last_test_date: Option<NaiveDate>,
    pub updated_at: Timestamp,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnchorRecord {
    pub well_id: WellId,
    pub quadrant: Quadrant,
    pub lat: f64,
    pub lng: f64,
}

/// Full well state captured at approval time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WellSnapshot {
    pub well: WellRecord,
    /// Anchor rows as stored after the approval was applied.
    pub anchors: Vec<AnchorRecord>,
    /// Whether the approved payload carried an anchor list.
    pub anchors_changed: bool,
}

#[derive(Debug, Clone)]
pub struct HistoryRecord {
    pub well_id: WellId,
    pub change_id: ChangeId,
    pub snapshot_json: String,
    pub checksum: [u8; 32],
    pub recorded_at: Timestamp,
}

impl HistoryRecord {
    pub fn snapshot(&self) -> Result<WellSnapshot, StorageError> {
        serde_json::from_str(&self.snapshot_json)
            .map_err(|e| StorageError::Serialization(e.to_string()))
    }

    /// Recompute the checksum over the stored snapshot text.
    pub fn verify(&self) -> bool {
        blake3::hash(self.snapshot_json.as_bytes()).as_bytes() == &self.checksum
    }
}

pub trait Storage {
    fn insert_proposal(&mut self, record: &ProposalRecord) -> Result<(), StorageError>;

    fn get_proposal(&self, change_id: ChangeId) -> Result<Option<ProposalRecord>, StorageError>;

    /// Pending proposals, oldest first.
    fn list_pending(&self, limit: Option<u32>) -> Result<Vec<ProposalRecord>, StorageError>;

    /// Move a pending proposal to `rejected`. Returns `false` without
    /// touching the row when it is missing or no longer pending.
    fn reject_proposal(
        &mut self,
        change_id: ChangeId,
        reason: &str,
        decided_by: &str,
        decided_at: Timestamp,
    ) -> Result<bool, StorageError>;

    /// Open the write transaction an approval runs in.
    fn begin_approval(&mut self) -> Result<ApprovalTx<'_>, StorageError>;

    fn get_well(&self, well_id: WellId) -> Result<Option<WellRecord>, StorageError>;

    fn find_well_by_api(&self, api: &str) -> Result<Option<WellRecord>, StorageError>;

    fn well_count(&self) -> Result<u64, StorageError>;

    fn get_anchors(&self, well_id: WellId) -> Result<Vec<AnchorRecord>, StorageError>;

    fn get_company(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, StorageError>;

    fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRecord>, StorageError>;

    fn company_count(&self) -> Result<u64, StorageError>;

    /// Snapshots for a well in the order they were recorded.
    fn get_history(&self, well_id: WellId) -> Result<Vec<HistoryRecord>, StorageError>;

    fn history_for_change(
        &self,
        change_id: ChangeId,
    ) -> Result<Option<HistoryRecord>, StorageError>;
}
