//! Reassignment negotiation: one account asks the current salvor to hand
//! over a claim, and the salvor accepts or rejects.
//!
//! A net has at most one `PENDING` request at any time. Accepting one moves
//! the claim and settles every other pending request for the net in a single
//! store transaction.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
  Error, Result,
  guard::{self, MAX_CAS_ATTEMPTS},
  identity::Caller,
  model::{NetAction, ReassignmentRequest, RequestStatus},
  store::{Commit, NetStore, TransferCommit, TransferOutcome},
};

// ─── Views ───────────────────────────────────────────────────────────────────

/// A request the caller made, with the target net's details joined in at
/// read time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SentRequestView {
  #[serde(flatten)]
  pub request:            ReassignmentRequest,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ghost_net_location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ghost_net_size:     Option<String>,
}

/// A pending request addressed to the caller as current salvor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IncomingRequestView {
  #[serde(flatten)]
  pub request:            ReassignmentRequest,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requester_handle:   Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub requester_name:     Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ghost_net_location: Option<String>,
  #[serde(skip_serializing_if = "Option::is_none")]
  pub ghost_net_size:     Option<String>,
}

// ─── Operations ──────────────────────────────────────────────────────────────

/// Ask to take over the claim on `net_id`.
///
/// The request snapshots the salvor it was made against, and is only stored
/// if the net is still at the version that snapshot was read from.
pub async fn create<S: NetStore>(
  store: &S,
  caller: &Caller,
  net_id: Uuid,
) -> Result<ReassignmentRequest> {
  let who = caller.require()?;
  for _ in 0..MAX_CAS_ATTEMPTS {
    let net = guard::load_net(store, net_id).await?;
    let salvor = net.salvor_account_id.ok_or(Error::NoSalvor(net_id))?;
    if salvor == who.account_id {
      return Err(Error::SelfReassignment(net_id));
    }
    guard::ensure_allows(&net, NetAction::Reassign)?;

    let pending = store
      .list_requests_for_net(net_id, Some(RequestStatus::Pending))
      .await
      .map_err(Error::store)?;
    if !pending.is_empty() {
      return Err(Error::PendingRequestExists { net_id });
    }

    let request = ReassignmentRequest {
      request_id:        Uuid::new_v4(),
      ghost_net_id:      net_id,
      requester_id:      who.account_id,
      current_salvor_id: salvor,
      status:            RequestStatus::Pending,
      created_at:        Utc::now(),
    };

    // A conflict means either a concurrent create won the single pending
    // slot or the net changed under us; the next read tells which.
    match store
      .insert_request(request, net.version)
      .await
      .map_err(Error::store)?
    {
      Commit::Applied(request) => {
        info!(
          request_id = %request.request_id,
          net_id = %net_id,
          requester = %who.handle,
          "reassignment requested"
        );
        return Ok(request);
      }
      Commit::Conflict => {
        debug!(net_id = %net_id, "request insert raced a concurrent write, retrying");
      }
    }
  }
  warn!(net_id = %net_id, "create lost every compare-and-set attempt");
  Err(Error::ConcurrentModification { entity: "ghost net", id: net_id })
}

/// Hand the claim over to the requester.
pub async fn accept<S: NetStore>(
  store: &S,
  caller: &Caller,
  request_id: Uuid,
) -> Result<TransferOutcome> {
  let who = caller.require()?;
  for _ in 0..MAX_CAS_ATTEMPTS {
    let request = guard::load_request(store, request_id).await?;
    guard::ensure_current_salvor(&request, who)?;
    guard::ensure_pending(&request)?;

    let net = guard::load_net(store, request.ghost_net_id).await?;
    guard::ensure_allows(&net, NetAction::Reassign)?;
    if net.salvor_account_id != Some(request.current_salvor_id) {
      return Err(Error::StaleRequest(request_id));
    }

    let commit = TransferCommit {
      request_id,
      net_id:          net.net_id,
      net_version:     net.version,
      expected_salvor: request.current_salvor_id,
      new_salvor:      request.requester_id,
    };
    match store.complete_transfer(commit).await.map_err(Error::store)? {
      Commit::Applied(outcome) => {
        info!(
          request_id = %request_id,
          net_id = %outcome.net.net_id,
          to = %outcome.request.requester_id,
          rejected = outcome.rejected.len(),
          actor = %who.handle,
          "reassignment accepted"
        );
        return Ok(outcome);
      }
      Commit::Conflict => {
        debug!(request_id = %request_id, "transfer raced a concurrent write, retrying");
      }
    }
  }
  warn!(request_id = %request_id, "accept lost every compare-and-set attempt");
  Err(Error::ConcurrentModification { entity: "reassignment request", id: request_id })
}

/// Decline a pending request. The net is not touched.
pub async fn reject<S: NetStore>(
  store: &S,
  caller: &Caller,
  request_id: Uuid,
) -> Result<ReassignmentRequest> {
  let who = caller.require()?;
  for _ in 0..MAX_CAS_ATTEMPTS {
    let request = guard::load_request(store, request_id).await?;
    guard::ensure_current_salvor(&request, who)?;
    guard::ensure_pending(&request)?;

    match store.reject_request(request_id).await.map_err(Error::store)? {
      Commit::Applied(request) => {
        info!(request_id = %request_id, actor = %who.handle, "reassignment rejected");
        return Ok(request);
      }
      Commit::Conflict => continue,
    }
  }
  warn!(request_id = %request_id, "reject lost every compare-and-set attempt");
  Err(Error::ConcurrentModification { entity: "reassignment request", id: request_id })
}

// ─── Views ───────────────────────────────────────────────────────────────────

/// Every request the caller made, newest first.
pub async fn sent_by_me<S: NetStore>(
  store: &S,
  caller: &Caller,
) -> Result<Vec<SentRequestView>> {
  let who = caller.require()?;
  let requests = store
    .list_requests_by_requester(who.account_id)
    .await
    .map_err(Error::store)?;

  let mut views = Vec::with_capacity(requests.len());
  for request in requests {
    let net = store
      .get_ghost_net(request.ghost_net_id)
      .await
      .map_err(Error::store)?;
    views.push(SentRequestView {
      ghost_net_location: net.as_ref().and_then(|n| n.location_label()),
      ghost_net_size:     net.and_then(|n| n.estimated_size),
      request,
    });
  }
  Ok(views)
}

/// Pending requests addressed to the caller, newest first.
pub async fn incoming_to_me<S: NetStore>(
  store: &S,
  caller: &Caller,
) -> Result<Vec<IncomingRequestView>> {
  let who = caller.require()?;
  let requests = store
    .list_pending_requests_for_salvor(who.account_id)
    .await
    .map_err(Error::store)?;

  let mut views = Vec::with_capacity(requests.len());
  for request in requests {
    let requester = store
      .get_account(request.requester_id)
      .await
      .map_err(Error::store)?;
    let net = store
      .get_ghost_net(request.ghost_net_id)
      .await
      .map_err(Error::store)?;
    views.push(IncomingRequestView {
      requester_handle:   requester.as_ref().map(|a| a.handle.clone()),
      requester_name:     requester.map(|a| a.display_name),
      ghost_net_location: net.as_ref().and_then(|n| n.location_label()),
      ghost_net_size:     net.and_then(|n| n.estimated_size),
      request,
    });
  }
  Ok(views)
}
