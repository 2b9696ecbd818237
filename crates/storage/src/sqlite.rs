use std::time::Duration;

use rusqlite::{Connection, Row, Transaction, TransactionBehavior, params};

use wellops_core::{
    clock::Timestamp,
    ids::*,
    proposal::{AnchorInput, CompanyInput, ProposalStatus},
};

use crate::error::StorageError;
use crate::traits::{
    AnchorRecord, CompanyRecord, HistoryRecord, ProposalRecord, Storage, WellRecord, WellSnapshot,
};
use crate::{anchors, company, wells};

/// Convert Vec<u8> to fixed-size array with proper error handling.
pub(crate) fn to_array<const N: usize>(v: Vec<u8>, label: &str) -> Result<[u8; N], StorageError> {
    v.try_into()
        .map_err(|_| StorageError::Serialization(format!("invalid {label} length")))
}

const PROPOSAL_COLUMNS: &str =
    "change_id, kind, submitted_by, status, payload, created_at, decided_at, decided_by, reason";

fn read_proposal(row: &Row) -> Result<ProposalRecord, StorageError> {
    let change_id_bytes: Vec<u8> = row.get(0)?;
    let status: String = row.get(3)?;
    let decided_at: Option<i64> = row.get(6)?;
    Ok(ProposalRecord {
        change_id: ChangeId::from_bytes(to_array::<16>(change_id_bytes, "change_id")?),
        kind: row.get(1)?,
        submitted_by: row.get(2)?,
        status: ProposalStatus::parse(&status)?,
        payload: row.get(4)?,
        created_at: Timestamp::from_millis(row.get(5)?),
        decided_at: decided_at.map(Timestamp::from_millis),
        decided_by: row.get(7)?,
        reason: row.get(8)?,
    })
}

fn query_proposal(
    conn: &Connection,
    change_id: ChangeId,
    pending_only: bool,
) -> Result<Option<ProposalRecord>, StorageError> {
    let filter = if pending_only {
        "change_id = ?1 AND status = 'pending'"
    } else {
        "change_id = ?1"
    };
    let mut stmt = conn.prepare(&format!(
        "SELECT {PROPOSAL_COLUMNS} FROM pending_changes WHERE {filter}"
    ))?;
    let mut rows = stmt.query(params![change_id.as_bytes().as_slice()])?;
    match rows.next()? {
        Some(row) => Ok(Some(read_proposal(row)?)),
        None => Ok(None),
    }
}

pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    pub fn open(path: &str) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        crate::schema::init_schema(&conn)?;
        Ok(Self { conn })
    }

    /// How long a writer waits on another connection's lock before failing.
    pub fn set_busy_timeout(&self, ms: u64) -> Result<(), StorageError> {
        self.conn.busy_timeout(Duration::from_millis(ms))?;
        Ok(())
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }
}

impl Storage for SqliteStorage {
    fn insert_proposal(&mut self, record: &ProposalRecord) -> Result<(), StorageError> {
        self.conn
            .execute(
                "INSERT INTO pending_changes (change_id, kind, submitted_by, status, payload, created_at, decided_at, decided_by, reason)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
                params![
                    record.change_id.as_bytes().as_slice(),
                    record.kind,
                    record.submitted_by,
                    record.status.as_str(),
                    record.payload,
                    record.created_at.as_millis(),
                    record.decided_at.map(|t| t.as_millis()),
                    record.decided_by,
                    record.reason,
                ],
            )
            .map_err(|e| StorageError::from_write(e, "insert proposal"))?;
        Ok(())
    }

    fn get_proposal(&self, change_id: ChangeId) -> Result<Option<ProposalRecord>, StorageError> {
        query_proposal(&self.conn, change_id, false)
    }

    fn list_pending(&self, limit: Option<u32>) -> Result<Vec<ProposalRecord>, StorageError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {PROPOSAL_COLUMNS} FROM pending_changes WHERE status = 'pending'
             ORDER BY created_at, rowid LIMIT ?1"
        ))?;
        // SQLite treats a negative LIMIT as unbounded.
        let limit = limit.map_or(-1, i64::from);
        let mut rows = stmt.query(params![limit])?;
        let mut result = Vec::new();
        while let Some(row) = rows.next()? {
            result.push(read_proposal(row)?);
        }
        Ok(result)
    }

    fn reject_proposal(
        &mut self,
        change_id: ChangeId,
        reason: &str,
        decided_by: &str,
        decided_at: Timestamp,
    ) -> Result<bool, StorageError> {
        let changed = self.conn.execute(
            "UPDATE pending_changes SET status = 'rejected', reason = ?1, decided_by = ?2, decided_at = ?3
             WHERE change_id = ?4 AND status = 'pending'",
            params![
                reason,
                decided_by,
                decided_at.as_millis(),
                change_id.as_bytes().as_slice(),
            ],
        )?;
        Ok(changed == 1)
    }

    fn begin_approval(&mut self) -> Result<ApprovalTx<'_>, StorageError> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;
        Ok(ApprovalTx { tx })
    }

    fn get_well(&self, well_id: WellId) -> Result<Option<WellRecord>, StorageError> {
        wells::get_well(&self.conn, well_id)
    }

    fn find_well_by_api(&self, api: &str) -> Result<Option<WellRecord>, StorageError> {
        wells::find_well_by_api(&self.conn, api)
    }

    fn well_count(&self) -> Result<u64, StorageError> {
        wells::well_count(&self.conn)
    }

    fn get_anchors(&self, well_id: WellId) -> Result<Vec<AnchorRecord>, StorageError> {
        anchors::get_anchors(&self.conn, well_id)
    }

    fn get_company(&self, company_id: CompanyId) -> Result<Option<CompanyRecord>, StorageError> {
        company::get_company(&self.conn, company_id)
    }

    fn find_company_by_name(&self, name: &str) -> Result<Option<CompanyRecord>, StorageError> {
        company::find_company_by_name(&self.conn, name)
    }

    fn company_count(&self) -> Result<u64, StorageError> {
        company::company_count(&self.conn)
    }

    fn get_history(&self, well_id: WellId) -> Result<Vec<HistoryRecord>, StorageError> {
        wells::get_history(&self.conn, well_id)
    }

    fn history_for_change(
        &self,
        change_id: ChangeId,
    ) -> Result<Option<HistoryRecord>, StorageError> {
        wells::history_for_change(&self.conn, change_id)
    }
}

/// Write transaction for a single approval.
///
/// Opened IMMEDIATE, so the write lock is held from the first read: the
/// pending-status check and the status flip cannot interleave with another
/// approval. Dropping the handle without `commit` rolls everything back.
pub struct ApprovalTx<'conn> {
    tx: Transaction<'conn>,
}

impl ApprovalTx<'_> {
    /// The proposal, only while it is still pending.
    pub fn pending_proposal(
        &self,
        change_id: ChangeId,
    ) -> Result<Option<ProposalRecord>, StorageError> {
        query_proposal(&self.tx, change_id, true)
    }

    pub fn ensure_company(
        &self,
        input: Option<&CompanyInput>,
        now: Timestamp,
    ) -> Result<Option<CompanyId>, StorageError> {
        company::ensure_company(&self.tx, input, now)
    }

    pub fn get_well(&self, well_id: WellId) -> Result<Option<WellRecord>, StorageError> {
        wells::get_well(&self.tx, well_id)
    }

    pub fn find_well_by_api(&self, api: &str) -> Result<Option<WellRecord>, StorageError> {
        wells::find_well_by_api(&self.tx, api)
    }

    pub fn insert_well(&self, well: &WellRecord, now: Timestamp) -> Result<(), StorageError> {
        wells::insert_well(&self.tx, well, now)
    }

    pub fn update_well(&self, well: &WellRecord) -> Result<(), StorageError> {
        wells::update_well(&self.tx, well)
    }

    pub fn upsert_anchors(
        &self,
        well_id: WellId,
        anchors: Option<&[AnchorInput]>,
        now: Timestamp,
    ) -> Result<usize, StorageError> {
        anchors::upsert_anchors(&self.tx, well_id, anchors, now)
    }

    pub fn get_anchors(&self, well_id: WellId) -> Result<Vec<AnchorRecord>, StorageError> {
        anchors::get_anchors(&self.tx, well_id)
    }

    pub fn append_history(
        &self,
        change_id: ChangeId,
        snapshot: &WellSnapshot,
        now: Timestamp,
    ) -> Result<HistoryRecord, StorageError> {
        wells::append_history(&self.tx, change_id, snapshot, now)
    }

    /// Flip a pending proposal to a terminal status.
    pub fn mark_decided(
        &self,
        change_id: ChangeId,
        status: ProposalStatus,
        reason: Option<&str>,
        decided_by: &str,
        now: Timestamp,
    ) -> Result<(), StorageError> {
        if !status.is_terminal() {
            return Err(StorageError::ConstraintViolation(format!(
                "cannot decide proposal {change_id} as {status}"
            )));
        }
        let changed = self.tx.execute(
            "UPDATE pending_changes SET status = ?1, reason = ?2, decided_by = ?3, decided_at = ?4
             WHERE change_id = ?5 AND status = 'pending'",
            params![
                status.as_str(),
                reason,
                decided_by,
                now.as_millis(),
                change_id.as_bytes().as_slice(),
            ],
        )?;
        if changed == 0 {
            return Err(StorageError::NotFound(format!("pending proposal {change_id}")));
        }
        Ok(())
    }

    pub fn commit(self) -> Result<(), StorageError> {
        self.tx.commit()?;
        Ok(())
    }
}
