//! The ghost-net lifecycle: report, claim, recover, mark missing, delete.
//!
//! ```text
//!   report ──► REPORTED ──claim──► SALVAGE_PENDING ──recover──► RECOVERED
//!                 │                      │
//!                 └──── mark missing ────┴──► MISSING
//! ```
//!
//! Every transition is a compare-and-set against the net's version. When a
//! concurrent writer wins, the net is re-read and every guard is evaluated
//! again, so the loser of a claim race sees the net as already claimed.

use chrono::Utc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  guard::{self, MAX_CAS_ATTEMPTS},
  identity::Caller,
  model::{
    GhostNet, MISSING_PHONE_PLACEHOLDER, NetAction, NetStatus, NewReport,
    non_blank,
  },
  store::{Commit, NetOrdering, NetStore},
};

/// A full listing together with the ordering the store could honour.
#[derive(Debug, Clone)]
pub struct NetListing {
  pub ordering: NetOrdering,
  pub nets:     Vec<GhostNet>,
}

// ─── Reads ───────────────────────────────────────────────────────────────────

pub async fn get<S: NetStore>(store: &S, net_id: Uuid) -> Result<GhostNet> {
  guard::load_net(store, net_id).await
}

/// All nets, newest first.
///
/// Ordering degrades explicitly: by `created_at`, then by `reported_at`, then
/// unordered. Each step down is logged; only a failure of the last tier is an
/// error.
pub async fn list<S: NetStore>(store: &S) -> Result<NetListing> {
  let created = match store.list_ghost_nets(NetOrdering::CreatedAtDesc).await {
    Ok(nets) => {
      return Ok(NetListing { ordering: NetOrdering::CreatedAtDesc, nets });
    }
    Err(e) => e,
  };
  warn!(error = %created, "ordering by created_at failed, falling back to reported_at");

  let reported = match store.list_ghost_nets(NetOrdering::ReportedAtDesc).await {
    Ok(nets) => {
      return Ok(NetListing { ordering: NetOrdering::ReportedAtDesc, nets });
    }
    Err(e) => e,
  };
  warn!(error = %reported, "ordering by reported_at failed, returning unordered");

  let nets = store
    .list_ghost_nets(NetOrdering::Unordered)
    .await
    .map_err(Error::store)?;
  Ok(NetListing { ordering: NetOrdering::Unordered, nets })
}

pub async fn list_by_status<S: NetStore>(
  store: &S,
  status: NetStatus,
) -> Result<Vec<GhostNet>> {
  store.list_ghost_nets_by_status(status).await.map_err(Error::store)
}

/// Nets the caller reported.
pub async fn list_reported_by_me<S: NetStore>(
  store: &S,
  caller: &Caller,
) -> Result<Vec<GhostNet>> {
  let who = caller.require()?;
  store
    .list_ghost_nets_by_reporter(who.account_id)
    .await
    .map_err(Error::store)
}

/// Nets the caller is responsible for recovering.
pub async fn list_assigned_to_me<S: NetStore>(
  store: &S,
  caller: &Caller,
) -> Result<Vec<GhostNet>> {
  let who = caller.require()?;
  store
    .list_ghost_nets_by_salvor(who.account_id)
    .await
    .map_err(Error::store)
}

// ─── Transitions ─────────────────────────────────────────────────────────────

/// Record a new net in `REPORTED`. Anonymous callers are allowed; an
/// authenticated caller is recorded as the reporter.
pub async fn report<S: NetStore>(
  store: &S,
  caller: &Caller,
  report: NewReport,
) -> Result<GhostNet> {
  guard::validate_report(&report)?;

  let reporter = match caller.identity() {
    Some(who) => Some(guard::load_account(store, who.account_id).await?),
    None => None,
  };

  let now = Utc::now();
  let net = GhostNet {
    net_id:                 Uuid::new_v4(),
    location:               report.location.filter(|l| !l.trim().is_empty()),
    coordinates:            report.coordinates,
    status:                 NetStatus::Reported,
    estimated_size:         report.estimated_size,
    description:            report.description,
    created_at:             Some(now),
    reported_at:            Some(now),
    reporter_id:            reporter.as_ref().map(|a| a.account_id),
    reporter_name:          reporter.as_ref().map(|a| a.display_name.clone()),
    reported_by_handle:     reporter.as_ref().map(|a| a.handle.clone()),
    salvor_account_id:      None,
    missing_reporter_name:  None,
    missing_reporter_phone: None,
    version:                0,
  };

  let net = store.insert_ghost_net(net).await.map_err(Error::store)?;
  info!(
    net_id = %net.net_id,
    reporter = net.reported_by_handle.as_deref().unwrap_or("anonymous"),
    "ghost net reported"
  );
  Ok(net)
}

/// Take responsibility for recovering a `REPORTED` net.
pub async fn claim<S: NetStore>(
  store: &S,
  caller: &Caller,
  net_id: Uuid,
) -> Result<GhostNet> {
  let who = caller.require()?;
  let (from, net) = transition(store, net_id, |net| {
    guard::ensure_allows(net, NetAction::Claim)?;
    net.salvor_account_id = Some(who.account_id);
    net.status = NetStatus::SalvagePending;
    Ok(())
  })
  .await?;
  info!(net_id = %net_id, %from, to = %net.status, actor = %who.handle, "ghost net claimed");
  Ok(net)
}

/// Mark a net as recovered. Only its current salvor may do this.
pub async fn recover<S: NetStore>(
  store: &S,
  caller: &Caller,
  net_id: Uuid,
) -> Result<GhostNet> {
  let who = caller.require()?;
  let (from, net) = transition(store, net_id, |net| {
    guard::ensure_salvor(net, who)?;
    guard::ensure_allows(net, NetAction::Recover)?;
    net.status = NetStatus::Recovered;
    Ok(())
  })
  .await?;
  info!(net_id = %net_id, %from, to = %net.status, actor = %who.handle, "ghost net recovered");
  Ok(net)
}

/// Declare a net missing, backfilling contact details from the caller's
/// account.
///
/// Reporter fields are only filled where unset. The missing-contact fields
/// always describe the declaring caller; the phone falls back to
/// [`MISSING_PHONE_PLACEHOLDER`].
pub async fn mark_missing<S: NetStore>(
  store: &S,
  caller: &Caller,
  net_id: Uuid,
) -> Result<GhostNet> {
  let who = caller.require()?;
  let account = guard::load_account(store, who.account_id).await?;
  let name = account.name_or_handle().to_owned();
  let phone = non_blank(account.phone.as_ref())
    .unwrap_or(MISSING_PHONE_PLACEHOLDER)
    .to_owned();

  let (from, net) = transition(store, net_id, |net| {
    guard::ensure_allows(net, NetAction::MarkMissing)?;

    if non_blank(net.reporter_name.as_ref()).is_none() {
      net.reporter_name = Some(name.clone());
    }
    if non_blank(net.reported_by_handle.as_ref()).is_none() {
      net.reported_by_handle = Some(account.handle.clone());
    }
    if net.reporter_id.is_none() {
      net.reporter_id = Some(account.account_id);
    }
    net.missing_reporter_name = Some(name.clone());
    net.missing_reporter_phone = Some(phone.clone());
    net.status = NetStatus::Missing;

    debug!(
      net_id = %net.net_id,
      reporter_name = ?net.reporter_name,
      reported_by = ?net.reported_by_handle,
      reporter_id = ?net.reporter_id,
      "missing-contact backfill"
    );
    guard::validate_missing_contact(net)
  })
  .await?;
  info!(net_id = %net_id, %from, to = %net.status, actor = %who.handle, "ghost net marked missing");
  Ok(net)
}

/// Remove a net. Only its reporter may, and only while `REPORTED` or
/// `MISSING`.
pub async fn delete<S: NetStore>(
  store: &S,
  caller: &Caller,
  net_id: Uuid,
) -> Result<()> {
  let who = caller.require()?;
  for _ in 0..MAX_CAS_ATTEMPTS {
    let net = guard::load_net(store, net_id).await?;
    guard::ensure_reporter(&net, who)?;
    guard::ensure_allows(&net, NetAction::Delete)?;

    match store
      .delete_ghost_net(net_id, net.version)
      .await
      .map_err(Error::store)?
    {
      Commit::Applied(()) => {
        info!(net_id = %net_id, from = %net.status, actor = %who.handle, "ghost net deleted");
        return Ok(());
      }
      Commit::Conflict => continue,
    }
  }
  warn!(net_id = %net_id, "delete lost every compare-and-set attempt");
  Err(Error::ConcurrentModification { entity: "ghost net", id: net_id })
}

/// Read the net, apply `change` to a copy, and write it back if nobody else
/// wrote in between. Returns the status before the change and the stored
/// result.
async fn transition<S, F>(
  store: &S,
  net_id: Uuid,
  mut change: F,
) -> Result<(NetStatus, GhostNet)>
where
  S: NetStore,
  F: FnMut(&mut GhostNet) -> Result<()>,
{
  for _ in 0..MAX_CAS_ATTEMPTS {
    let current = guard::load_net(store, net_id).await?;
    let from = current.status;
    let mut next = current;
    change(&mut next)?;

    match store.replace_ghost_net(next).await.map_err(Error::store)? {
      Commit::Applied(stored) => return Ok((from, stored)),
      Commit::Conflict => {
        debug!(net_id = %net_id, "ghost net changed underneath us, retrying");
      }
    }
  }
  warn!(net_id = %net_id, "transition lost every compare-and-set attempt");
  Err(Error::ConcurrentModification { entity: "ghost net", id: net_id })
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::{
    ErrorKind,
    model::Coordinates,
    testing::{MemoryStore, account, net_fixture},
  };

  fn baltic() -> NewReport {
    NewReport {
      location:       Some("Baltic, off Rügen".into()),
      coordinates:    Some(Coordinates { latitude: 54.4, longitude: 13.6 }),
      estimated_size: Some("20m".into()),
      description:    None,
    }
  }

  #[tokio::test]
  async fn anonymous_report_has_no_reporter() {
    let store = MemoryStore::default();
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();

    assert_eq!(net.status, NetStatus::Reported);
    assert!(net.reporter_id.is_none());
    assert!(net.salvor_account_id.is_none());
    assert!(net.created_at.is_some());
    assert_eq!(net.created_at, net.reported_at);
  }

  #[tokio::test]
  async fn authenticated_report_records_reporter() {
    let store = MemoryStore::default();
    let (ada, caller) = account(&store, "ada", "Ada Lovelace", None).await;
    let net = report(&store, &caller, baltic()).await.unwrap();

    assert_eq!(net.reporter_id, Some(ada.account_id));
    assert_eq!(net.reporter_name.as_deref(), Some("Ada Lovelace"));
    assert_eq!(net.reported_by_handle.as_deref(), Some("ada"));
  }

  #[tokio::test]
  async fn report_without_location_is_rejected() {
    let store = MemoryStore::default();
    let err = report(&store, &Caller::Anonymous, NewReport::default())
      .await
      .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ValidationFailed);
  }

  #[tokio::test]
  async fn claim_moves_reported_to_salvage_pending() {
    let store = MemoryStore::default();
    let (a, caller) = account(&store, "a", "A", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();

    let claimed = claim(&store, &caller, net.net_id).await.unwrap();
    assert_eq!(claimed.status, NetStatus::SalvagePending);
    assert_eq!(claimed.salvor_account_id, Some(a.account_id));
    assert_eq!(claimed.version, net.version + 1);
  }

  #[tokio::test]
  async fn claim_requires_identity() {
    let store = MemoryStore::default();
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();
    let err = claim(&store, &Caller::Anonymous, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
  }

  #[tokio::test]
  async fn claim_of_unknown_net_is_not_found() {
    let store = MemoryStore::default();
    let (_, caller) = account(&store, "a", "A", None).await;
    let err = claim(&store, &caller, Uuid::new_v4()).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::NotFound);
  }

  #[tokio::test]
  async fn reclaim_is_rejected() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let (_, b) = account(&store, "b", "B", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();
    claim(&store, &a, net.net_id).await.unwrap();

    let again = claim(&store, &a, net.net_id).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::InvalidState);
    let other = claim(&store, &b, net.net_id).await.unwrap_err();
    assert_eq!(other.kind(), ErrorKind::InvalidState);
  }

  #[tokio::test]
  async fn claim_only_from_reported() {
    let store = MemoryStore::default();
    let (_, caller) = account(&store, "a", "A", None).await;
    for status in [NetStatus::SalvagePending, NetStatus::Recovered, NetStatus::Missing] {
      let net = net_fixture(status);
      store.put_net(net.clone()).await;
      let err = claim(&store, &caller, net.net_id).await.unwrap_err();
      assert_eq!(err.kind(), ErrorKind::InvalidState, "{status}");
    }
  }

  #[tokio::test]
  async fn losing_a_claim_race_reports_invalid_state() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let (b, _) = account(&store, "b", "B", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();

    let mut winner = net.clone();
    winner.status = NetStatus::SalvagePending;
    winner.salvor_account_id = Some(b.account_id);
    store.interleave_write(winner).await;

    let err = claim(&store, &a, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    let stored = get(&store, net.net_id).await.unwrap();
    assert_eq!(stored.salvor_account_id, Some(b.account_id));
  }

  #[tokio::test]
  async fn recover_by_salvor_only() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let (_, b) = account(&store, "b", "B", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();
    claim(&store, &a, net.net_id).await.unwrap();

    let err = recover(&store, &b, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    let recovered = recover(&store, &a, net.net_id).await.unwrap();
    assert_eq!(recovered.status, NetStatus::Recovered);

    let again = recover(&store, &a, net.net_id).await.unwrap_err();
    assert_eq!(again.kind(), ErrorKind::InvalidState);
  }

  #[tokio::test]
  async fn recover_unclaimed_net_is_forbidden() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();
    let err = recover(&store, &a, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
  }

  #[tokio::test]
  async fn mark_missing_without_phone_uses_placeholder() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "ada", "Ada", None).await;
    let net = report(&store, &a, baltic()).await.unwrap();

    let missing = mark_missing(&store, &a, net.net_id).await.unwrap();
    assert_eq!(missing.status, NetStatus::Missing);
    assert_eq!(missing.missing_reporter_name.as_deref(), Some("Ada"));
    assert_eq!(
      missing.missing_reporter_phone.as_deref(),
      Some(MISSING_PHONE_PLACEHOLDER)
    );
  }

  #[tokio::test]
  async fn mark_missing_backfills_anonymous_report() {
    let store = MemoryStore::default();
    let (b, caller) = account(&store, "bob", " ", Some("+49 40 123")).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();

    let missing = mark_missing(&store, &caller, net.net_id).await.unwrap();
    assert_eq!(missing.reporter_id, Some(b.account_id));
    // Blank display name falls back to the handle.
    assert_eq!(missing.reporter_name.as_deref(), Some("bob"));
    assert_eq!(missing.reported_by_handle.as_deref(), Some("bob"));
    assert_eq!(missing.missing_reporter_name.as_deref(), Some("bob"));
    assert_eq!(missing.missing_reporter_phone.as_deref(), Some("+49 40 123"));
  }

  #[tokio::test]
  async fn mark_missing_keeps_original_reporter() {
    let store = MemoryStore::default();
    let (ada, reporter) = account(&store, "ada", "Ada", Some("111")).await;
    let (_, salvor) = account(&store, "sal", "Sal", Some("222")).await;
    let net = report(&store, &reporter, baltic()).await.unwrap();
    claim(&store, &salvor, net.net_id).await.unwrap();

    let missing = mark_missing(&store, &salvor, net.net_id).await.unwrap();
    assert_eq!(missing.reporter_id, Some(ada.account_id));
    assert_eq!(missing.reporter_name.as_deref(), Some("Ada"));
    assert_eq!(missing.missing_reporter_name.as_deref(), Some("Sal"));
    assert_eq!(missing.missing_reporter_phone.as_deref(), Some("222"));
  }

  #[tokio::test]
  async fn recovered_net_cannot_go_missing() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();
    claim(&store, &a, net.net_id).await.unwrap();
    recover(&store, &a, net.net_id).await.unwrap();

    let err = mark_missing(&store, &a, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);
    assert_eq!(get(&store, net.net_id).await.unwrap().status, NetStatus::Recovered);
  }

  #[tokio::test]
  async fn delete_guards_are_distinct() {
    let store = MemoryStore::default();
    let (_, reporter) = account(&store, "r", "R", None).await;
    let (_, other) = account(&store, "o", "O", None).await;

    // Reporter, REPORTED: allowed.
    let net = report(&store, &reporter, baltic()).await.unwrap();
    delete(&store, &reporter, net.net_id).await.unwrap();
    assert_eq!(
      get(&store, net.net_id).await.unwrap_err().kind(),
      ErrorKind::NotFound
    );

    // Not reporter, REPORTED: forbidden.
    let net = report(&store, &reporter, baltic()).await.unwrap();
    let err = delete(&store, &other, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Reporter, SALVAGE_PENDING: wrong state.
    claim(&store, &other, net.net_id).await.unwrap();
    let err = delete(&store, &reporter, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidState);

    // Not reporter, SALVAGE_PENDING: the relationship is checked first.
    let err = delete(&store, &other, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);

    // Reporter, MISSING: allowed.
    mark_missing(&store, &other, net.net_id).await.unwrap();
    delete(&store, &reporter, net.net_id).await.unwrap();
  }

  #[tokio::test]
  async fn anonymous_reports_cannot_be_deleted() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let net = report(&store, &Caller::Anonymous, baltic()).await.unwrap();
    let err = delete(&store, &a, net.net_id).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Forbidden);
  }

  #[tokio::test]
  async fn list_is_newest_first() {
    let store = MemoryStore::default();
    let first = net_fixture(NetStatus::Reported);
    let mut second = net_fixture(NetStatus::Reported);
    second.created_at = first.created_at.map(|t| t + chrono::Duration::seconds(5));
    store.put_net(first.clone()).await;
    store.put_net(second.clone()).await;

    let listing = list(&store).await.unwrap();
    assert_eq!(listing.ordering, NetOrdering::CreatedAtDesc);
    let ids: Vec<_> = listing.nets.iter().map(|n| n.net_id).collect();
    assert_eq!(ids, vec![second.net_id, first.net_id]);
  }

  #[tokio::test]
  async fn list_falls_back_to_reported_at() {
    let store = MemoryStore::default();
    let mut legacy = net_fixture(NetStatus::Reported);
    legacy.created_at = None;
    store.put_net(legacy).await;
    report(&store, &Caller::Anonymous, baltic()).await.unwrap();

    let listing = list(&store).await.unwrap();
    assert_eq!(listing.ordering, NetOrdering::ReportedAtDesc);
    assert_eq!(listing.nets.len(), 2);
  }

  #[tokio::test]
  async fn list_falls_back_to_unordered() {
    let store = MemoryStore::default();
    let mut legacy = net_fixture(NetStatus::Reported);
    legacy.created_at = None;
    legacy.reported_at = None;
    store.put_net(legacy).await;

    let listing = list(&store).await.unwrap();
    assert_eq!(listing.ordering, NetOrdering::Unordered);
    assert_eq!(listing.nets.len(), 1);
  }

  #[tokio::test]
  async fn list_fails_only_when_every_tier_fails() {
    let store = MemoryStore::default();
    for ordering in [
      NetOrdering::CreatedAtDesc,
      NetOrdering::ReportedAtDesc,
      NetOrdering::Unordered,
    ] {
      store.fail_ordering(ordering).await;
    }
    let err = list(&store).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unavailable);
    assert!(err.kind().is_retryable());
  }

  #[tokio::test]
  async fn my_reports_and_assignments() {
    let store = MemoryStore::default();
    let (_, a) = account(&store, "a", "A", None).await;
    let (_, b) = account(&store, "b", "B", None).await;
    let mine = report(&store, &a, baltic()).await.unwrap();
    report(&store, &b, baltic()).await.unwrap();
    claim(&store, &b, mine.net_id).await.unwrap();

    let reported = list_reported_by_me(&store, &a).await.unwrap();
    assert_eq!(reported.len(), 1);
    assert_eq!(reported[0].net_id, mine.net_id);

    let assigned = list_assigned_to_me(&store, &b).await.unwrap();
    assert_eq!(assigned.len(), 1);
    assert_eq!(assigned[0].net_id, mine.net_id);

    let pending = list_by_status(&store, NetStatus::SalvagePending).await.unwrap();
    assert_eq!(pending.len(), 1);

    let err = list_reported_by_me(&store, &Caller::Anonymous).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Unauthorized);
  }
}
