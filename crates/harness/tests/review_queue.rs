use serde_json::json;

use wellops_core::{
    ids::*,
    principal::{Principal, Role},
    proposal::*,
};
use wellops_engine::{EngineConfig, EngineError, ReviewEngine};
use wellops_harness::{TestPortal, well};
use wellops_storage::SqliteStorage;

// ============================================================================
// Listing
// ============================================================================

#[test]
fn pending_list_is_oldest_first() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let a = portal.submit_create(well("30-015-00001"))?;
    let b = portal.submit_create(well("30-015-00002"))?;
    let c = portal.submit_update(well("30-015-00001"))?;

    let pending = portal.engine.list_pending(&portal.admin)?;
    let ids: Vec<ChangeId> = pending.iter().map(|p| p.change_id).collect();
    assert_eq!(ids, vec![a, b, c]);
    assert!(pending.windows(2).all(|w| w[0].created_at < w[1].created_at));
    assert!(pending.iter().all(|p| p.status == ProposalStatus::Pending));
    assert_eq!(pending[2].kind, KIND_UPDATE_WELL);
    assert_eq!(pending[0].submitted_by, "field-tech");

    Ok(())
}

#[test]
fn decided_proposals_leave_the_queue() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let a = portal.submit_create(well("30-015-00011"))?;
    let b = portal.submit_create(well("30-015-00012"))?;
    let c = portal.submit_create(well("30-015-00013"))?;

    portal.approve_well(a)?;
    portal.engine.reject(&portal.admin, c, "duplicate entry")?;

    let pending = portal.engine.list_pending(&portal.admin)?;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].change_id, b);

    Ok(())
}

#[test]
fn pending_limit_caps_the_page() -> Result<(), Box<dyn std::error::Error>> {
    let config = EngineConfig {
        pending_limit: Some(2),
        ..EngineConfig::default()
    };
    let engine = ReviewEngine::new(SqliteStorage::open_in_memory()?, config);
    let mut portal = TestPortal::with_engine(engine);
    let a = portal.submit_create(well("30-015-00021"))?;
    let b = portal.submit_create(well("30-015-00022"))?;
    portal.submit_create(well("30-015-00023"))?;

    let ids: Vec<ChangeId> = portal
        .engine
        .list_pending(&portal.admin)?
        .iter()
        .map(|p| p.change_id)
        .collect();
    assert_eq!(ids, vec![a, b]);

    Ok(())
}

#[test]
fn technicians_cannot_list() -> Result<(), Box<dyn std::error::Error>> {
    let portal = TestPortal::new()?;
    let err = portal.engine.list_pending(&portal.tech).unwrap_err();
    assert!(matches!(err, EngineError::Forbidden { .. }));
    Ok(())
}

// ============================================================================
// Rejection
// ============================================================================

#[test]
fn reject_records_reason_and_reviewer() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let change_id = portal.submit_create(well("30-015-00031"))?;

    assert!(portal.engine.reject(&portal.admin, change_id, "api typo")?);

    let proposal = portal.engine.get_proposal(&portal.admin, change_id)?;
    assert_eq!(proposal.status, ProposalStatus::Rejected);
    assert_eq!(proposal.reason.as_deref(), Some("api typo"));
    assert_eq!(proposal.decided_by.as_deref(), Some("office-admin"));
    assert!(proposal.decided_at.is_some());

    Ok(())
}

#[test]
fn reject_twice_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let change_id = portal.submit_create(well("30-015-00041"))?;

    assert!(portal.engine.reject(&portal.admin, change_id, "first")?);
    let first = portal.engine.get_proposal(&portal.admin, change_id)?;

    assert!(!portal.engine.reject(&portal.admin, change_id, "second")?);
    let second = portal.engine.get_proposal(&portal.admin, change_id)?;
    assert_eq!(second, first);
    assert_eq!(second.reason.as_deref(), Some("first"));

    Ok(())
}

#[test]
fn reject_after_approve_changes_nothing() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let change_id = portal.submit_create(well("30-015-00051"))?;
    portal.approve_well(change_id)?;
    let approved = portal.engine.get_proposal(&portal.admin, change_id)?;

    assert!(!portal.engine.reject(&portal.admin, change_id, "too late")?);
    assert_eq!(portal.engine.get_proposal(&portal.admin, change_id)?, approved);

    Ok(())
}

#[test]
fn reject_unknown_id_returns_false() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    assert!(!portal.engine.reject(&portal.admin, ChangeId::new(), "gone")?);
    Ok(())
}

// ============================================================================
// Submission and visibility
// ============================================================================

#[test]
fn invalid_submissions_are_refused() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;

    // Update with neither id nor api
    assert!(portal.submit_update(WellFields::default()).is_err());

    // Create carrying an id
    assert!(
        portal
            .submit_create(WellFields {
                id: Some(WellId::new()),
                ..well("30-015-00061")
            })
            .is_err()
    );

    assert!(portal.engine.list_pending(&portal.admin)?.is_empty());
    Ok(())
}

#[test]
fn payload_is_stored_as_submitted() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let payload = json!({ "well": { "api": "30-015-00071", "anchors": "n/a" } });
    let change_id = portal
        .engine
        .submit_raw(&portal.tech, KIND_CREATE_WELL, &payload)?;

    let proposal = portal.engine.get_proposal(&portal.admin, change_id)?;
    let stored: serde_json::Value = serde_json::from_str(&proposal.payload)?;
    assert_eq!(stored, payload);

    // A non-list anchors value reads as absent.
    let well_id = portal.approve_well(change_id)?;
    assert!(portal.engine.get_anchors(well_id)?.is_empty());

    Ok(())
}

#[test]
fn submitters_see_only_their_own() -> Result<(), Box<dyn std::error::Error>> {
    let mut portal = TestPortal::new()?;
    let change_id = portal.submit_create(well("30-015-00081"))?;

    let own = portal.engine.get_proposal(&portal.tech, change_id)?;
    assert_eq!(own.change_id, change_id);

    let other = Principal::new("second-tech", Role::Technician);
    let err = portal.engine.get_proposal(&other, change_id).unwrap_err();
    assert!(matches!(err, EngineError::Forbidden { .. }));

    let err = portal
        .engine
        .get_proposal(&portal.admin, ChangeId::new())
        .unwrap_err();
    assert!(matches!(err, EngineError::ProposalNotFound(_)));

    Ok(())
}
