use tracing::{debug, warn};

use wellops_core::{
    clock::Timestamp,
    ids::*,
    proposal::{ProposalStatus, WellChange, WellFields},
};
use wellops_storage::{ApprovalTx, HistoryRecord, ProposalRecord, WellRecord, WellSnapshot};

use crate::error::EngineError;
use crate::merge;

pub const UNSUPPORTED_KIND_REASON: &str = "Unsupported kind";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WellAction {
    Created,
    Updated,
}

#[derive(Debug)]
pub enum ApprovalOutcome {
    Applied {
        change_id: ChangeId,
        well_id: WellId,
        action: WellAction,
        history: HistoryRecord,
    },
    /// The proposal's kind has no applier; it was rejected instead.
    Unsupported { change_id: ChangeId, kind: String },
}

impl ApprovalOutcome {
    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Applied { .. })
    }
}

/// Apply a pending proposal inside `tx` and flip its status. The caller owns
/// commit and rollback.
pub(crate) fn apply_proposal(
    tx: &ApprovalTx<'_>,
    proposal: &ProposalRecord,
    decided_by: &str,
    now: Timestamp,
) -> Result<ApprovalOutcome, EngineError> {
    let change_id = proposal.change_id;
    let Some(change) = WellChange::decode(&proposal.kind, &proposal.payload)? else {
        warn!(%change_id, kind = %proposal.kind, "unsupported proposal kind, rejecting");
        tx.mark_decided(
            change_id,
            ProposalStatus::Rejected,
            Some(UNSUPPORTED_KIND_REASON),
            decided_by,
            now,
        )?;
        return Ok(ApprovalOutcome::Unsupported {
            change_id,
            kind: proposal.kind.clone(),
        });
    };

    let fields = &change.payload().well;
    let (well, action) = match &change {
        WellChange::CreateWell(_) => (create_well(tx, fields, now)?, WellAction::Created),
        WellChange::UpdateWell(_) => (update_well(tx, fields, now)?, WellAction::Updated),
    };
    let well_id = well.well_id;

    tx.upsert_anchors(well_id, fields.anchors.as_deref(), now)?;
    let snapshot = WellSnapshot {
        anchors: tx.get_anchors(well_id)?,
        anchors_changed: fields.anchors.is_some(),
        well,
    };
    let history = tx.append_history(change_id, &snapshot, now)?;

    tx.mark_decided(change_id, ProposalStatus::Approved, None, decided_by, now)?;
    Ok(ApprovalOutcome::Applied {
        change_id,
        well_id,
        action,
        history,
    })
}

fn create_well(
    tx: &ApprovalTx<'_>,
    fields: &WellFields,
    now: Timestamp,
) -> Result<WellRecord, EngineError> {
    let company_id = tx.ensure_company(fields.company.as_ref(), now)?;
    let well = merge::new_well(WellId::new(), fields, company_id, now);
    tx.insert_well(&well, now)?;
    debug!(well_id = %well.well_id, api = ?well.api, "inserted well");
    Ok(well)
}

fn update_well(
    tx: &ApprovalTx<'_>,
    fields: &WellFields,
    now: Timestamp,
) -> Result<WellRecord, EngineError> {
    let current = resolve_target(tx, fields)?;
    let company_id = tx.ensure_company(fields.company.as_ref(), now)?;
    let merged = merge::coalesce(&current, fields, company_id, now);
    tx.update_well(&merged)?;
    debug!(well_id = %merged.well_id, "merged well update");
    Ok(merged)
}

/// An explicit id wins; the api code is only consulted without one.
fn resolve_target(tx: &ApprovalTx<'_>, fields: &WellFields) -> Result<WellRecord, EngineError> {
    if let Some(well_id) = fields.id {
        return tx
            .get_well(well_id)?
            .ok_or_else(|| EngineError::WellNotFound(well_id.to_string()));
    }
    match fields.api_code() {
        Some(api) => tx
            .find_well_by_api(api)?
            .ok_or_else(|| EngineError::WellNotFound(format!("api {api}"))),
        None => Err(EngineError::WellNotFound("no id or api given".into())),
    }
}
