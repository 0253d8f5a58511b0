//! Authorization and validation helpers shared by the engines.
//!
//! Guards run in a fixed order: identity, existence, relationship, state.
//! Each produces a distinct [`Error`] so callers can tell them apart.

use uuid::Uuid;

use crate::{
  Error, Result,
  identity::CallerIdentity,
  model::{Account, GhostNet, NetAction, NewReport, ReassignmentRequest, non_blank},
  store::NetStore,
};

/// Attempts a conditional write gets before giving up with
/// [`Error::ConcurrentModification`].
pub const MAX_CAS_ATTEMPTS: usize = 3;

// ─── Loading ─────────────────────────────────────────────────────────────────

pub async fn load_net<S: NetStore>(store: &S, id: Uuid) -> Result<GhostNet> {
  store
    .get_ghost_net(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::GhostNetNotFound(id))
}

pub async fn load_request<S: NetStore>(
  store: &S,
  id: Uuid,
) -> Result<ReassignmentRequest> {
  store
    .get_request(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::RequestNotFound(id))
}

pub async fn load_account<S: NetStore>(store: &S, id: Uuid) -> Result<Account> {
  store
    .get_account(id)
    .await
    .map_err(Error::store)?
    .ok_or(Error::AccountNotFound(id))
}

// ─── Relationship and state ──────────────────────────────────────────────────

pub fn ensure_allows(net: &GhostNet, action: NetAction) -> Result<()> {
  if net.status.allows(action) {
    Ok(())
  } else {
    Err(Error::InvalidNetTransition {
      net_id: net.net_id,
      status: net.status,
      action,
    })
  }
}

pub fn ensure_salvor(net: &GhostNet, caller: &CallerIdentity) -> Result<()> {
  match net.salvor_account_id {
    Some(id) if id == caller.account_id => Ok(()),
    _ => Err(Error::NotSalvor(net.net_id)),
  }
}

pub fn ensure_reporter(net: &GhostNet, caller: &CallerIdentity) -> Result<()> {
  match net.reporter_id {
    Some(id) if id == caller.account_id => Ok(()),
    _ => Err(Error::NotReporter(net.net_id)),
  }
}

pub fn ensure_current_salvor(
  request: &ReassignmentRequest,
  caller: &CallerIdentity,
) -> Result<()> {
  if request.current_salvor_id == caller.account_id {
    Ok(())
  } else {
    Err(Error::NotCurrentSalvor(request.request_id))
  }
}

pub fn ensure_pending(request: &ReassignmentRequest) -> Result<()> {
  if request.status.is_pending() {
    Ok(())
  } else {
    Err(Error::RequestSettled {
      request_id: request.request_id,
      status:     request.status,
    })
  }
}

// ─── Field validation ────────────────────────────────────────────────────────

/// The contact fields a `MISSING` net must carry. Mirrors the store's check
/// constraint so an invalid row is never submitted.
pub fn validate_missing_contact(net: &GhostNet) -> Result<()> {
  let required = [
    ("missing_reporter_name", &net.missing_reporter_name),
    ("missing_reporter_phone", &net.missing_reporter_phone),
    ("reporter_name", &net.reporter_name),
    ("reported_by_handle", &net.reported_by_handle),
  ];
  for (field, value) in required {
    if non_blank(value.as_ref()).is_none() {
      return Err(Error::Validation(format!(
        "{field} must be set on a missing ghost net"
      )));
    }
  }
  if net.reporter_id.is_none() {
    return Err(Error::Validation(
      "reporter_id must be set on a missing ghost net".into(),
    ));
  }
  Ok(())
}

pub fn validate_report(report: &NewReport) -> Result<()> {
  let has_text = non_blank(report.location.as_ref()).is_some();
  match report.coordinates {
    None if !has_text => Err(Error::Validation(
      "a location description or coordinates are required".into(),
    )),
    Some(c) if !(-90.0..=90.0).contains(&c.latitude) => Err(Error::Validation(
      format!("latitude {} is out of range", c.latitude),
    )),
    Some(c) if !(-180.0..=180.0).contains(&c.longitude) => {
      Err(Error::Validation(format!(
        "longitude {} is out of range",
        c.longitude
      )))
    }
    _ => Ok(()),
  }
}
