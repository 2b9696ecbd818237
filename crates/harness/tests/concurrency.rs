use std::sync::{Arc, Barrier};
use std::thread;

use wellops_core::{ids::*, principal::Principal, proposal::*};
use wellops_engine::{ApprovalOutcome, EngineError};
use wellops_harness::{SharedStore, well};
use wellops_storage::Storage;

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

/// Approve `change_id` from a fresh connection once every thread is ready.
fn approve_from_thread(
    store: &SharedStore,
    barrier: Arc<Barrier>,
    change_id: ChangeId,
) -> Result<thread::JoinHandle<std::result::Result<ApprovalOutcome, EngineError>>> {
    let mut engine = store.open_engine()?;
    Ok(thread::spawn(move || {
        barrier.wait();
        engine.approve(&Principal::admin("office-admin"), change_id)
    }))
}

// ============================================================================
// Racing reviewers
// ============================================================================

#[test]
fn racing_approvals_apply_once() -> Result<()> {
    let store = SharedStore::new()?;
    let mut portal = store.open_portal()?;
    let change_id = portal.submit_create(WellFields {
        company: Some(CompanyInput::named("Racing Resources")),
        ..well("30-015-77001")
    })?;

    let barrier = Arc::new(Barrier::new(2));
    let handles = vec![
        approve_from_thread(&store, barrier.clone(), change_id)?,
        approve_from_thread(&store, barrier, change_id)?,
    ];
    let results: Vec<_> = handles
        .into_iter()
        .map(|h| h.join().map_err(|_| "approval thread panicked"))
        .collect::<std::result::Result<_, _>>()?;

    let applied = results
        .iter()
        .filter(|r| matches!(r, Ok(ApprovalOutcome::Applied { .. })))
        .count();
    let not_found = results
        .iter()
        .filter(|r| matches!(r, Err(EngineError::ProposalNotFound(_))))
        .count();
    assert_eq!((applied, not_found), (1, 1), "{results:?}");

    let storage = portal.engine.storage();
    assert_eq!(storage.well_count()?, 1);
    assert_eq!(storage.company_count()?, 1);
    let well_id = portal.engine.find_well_by_api("30-015-77001")?.unwrap().well_id;
    assert_eq!(portal.engine.well_history(&portal.admin, well_id)?.len(), 1);
    let proposal = portal.engine.get_proposal(&portal.admin, change_id)?;
    assert_eq!(proposal.status, ProposalStatus::Approved);

    Ok(())
}

#[test]
fn racing_new_company_resolves_to_one_row() -> Result<()> {
    let store = SharedStore::new()?;
    let mut portal = store.open_portal()?;
    let first = portal.submit_create(WellFields {
        company: Some(CompanyInput::named("Twin Peaks Oil")),
        ..well("30-015-78001")
    })?;
    let second = portal.submit_create(WellFields {
        company: Some(CompanyInput::named("TWIN PEAKS OIL")),
        ..well("30-015-78002")
    })?;

    let barrier = Arc::new(Barrier::new(2));
    let handles = vec![
        approve_from_thread(&store, barrier.clone(), first)?,
        approve_from_thread(&store, barrier, second)?,
    ];
    for handle in handles {
        let outcome = handle.join().map_err(|_| "approval thread panicked")??;
        assert!(outcome.is_ok());
    }

    assert_eq!(portal.engine.storage().company_count()?, 1);
    let a = portal.engine.find_well_by_api("30-015-78001")?.unwrap();
    let b = portal.engine.find_well_by_api("30-015-78002")?.unwrap();
    assert_eq!(a.company_id, b.company_id);

    Ok(())
}

#[test]
fn reject_racing_approve_leaves_one_decision() -> Result<()> {
    let store = SharedStore::new()?;
    let mut portal = store.open_portal()?;
    let change_id = portal.submit_create(well("30-015-79001"))?;

    let barrier = Arc::new(Barrier::new(2));
    let approver = approve_from_thread(&store, barrier.clone(), change_id)?;
    let mut rejecter = store.open_engine()?;
    let rejected = thread::spawn(move || {
        barrier.wait();
        rejecter.reject(&Principal::admin("second-admin"), change_id, "hold")
    });

    let approved = approver.join().map_err(|_| "approval thread panicked")?;
    let rejected = rejected.join().map_err(|_| "reject thread panicked")??;

    let proposal = portal.engine.get_proposal(&portal.admin, change_id)?;
    if rejected {
        assert!(matches!(approved, Err(EngineError::ProposalNotFound(_))));
        assert_eq!(proposal.status, ProposalStatus::Rejected);
        assert_eq!(portal.engine.storage().well_count()?, 0);
    } else {
        assert!(matches!(approved, Ok(ApprovalOutcome::Applied { .. })));
        assert_eq!(proposal.status, ProposalStatus::Approved);
        assert_eq!(portal.engine.storage().well_count()?, 1);
    }

    Ok(())
}
