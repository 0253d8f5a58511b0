//! In-memory [`NetStore`] used by the engine tests, with hooks for injecting
//! ordering failures and concurrent writers.

use std::collections::HashSet;

use chrono::Utc;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::{
  identity::Caller,
  model::{
    Account, ContactUpdate, GhostNet, NetStatus, ReassignmentRequest,
    RequestStatus,
  },
  store::{Commit, NetOrdering, NetStore, TransferCommit, TransferOutcome},
};

#[derive(Debug, thiserror::Error)]
pub enum MemoryError {
  #[error("injected failure for {0}")]
  Injected(NetOrdering),
  #[error("row without {0}")]
  MissingKey(&'static str),
}

#[derive(Default)]
struct Inner {
  accounts:   Vec<Account>,
  nets:       Vec<GhostNet>,
  requests:   Vec<ReassignmentRequest>,
  failing:    HashSet<NetOrdering>,
  /// Written over the target net right before the next conditional write
  /// (`replace_ghost_net` or `insert_request`).
  interloper: Option<GhostNet>,
}

impl Inner {
  fn apply_interloper(&mut self) {
    if let Some(mut other) = self.interloper.take()
      && let Some(slot) = self.nets.iter_mut().find(|n| n.net_id == other.net_id)
    {
      other.version = slot.version + 1;
      *slot = other;
    }
  }
}

#[derive(Default)]
pub struct MemoryStore {
  inner: Mutex<Inner>,
}

impl MemoryStore {
  pub async fn fail_ordering(&self, ordering: NetOrdering) {
    self.inner.lock().await.failing.insert(ordering);
  }

  /// Simulate another worker committing `net` between our read and write.
  pub async fn interleave_write(&self, net: GhostNet) {
    self.inner.lock().await.interloper = Some(net);
  }

  /// Insert a request as-is, bypassing the single-pending check.
  pub async fn force_request(&self, request: ReassignmentRequest) {
    self.inner.lock().await.requests.push(request);
  }

  /// Insert a net as-is, bypassing the engine.
  pub async fn put_net(&self, net: GhostNet) {
    self.inner.lock().await.nets.push(net);
  }
}

pub fn net_fixture(status: NetStatus) -> GhostNet {
  let now = Utc::now();
  GhostNet {
    net_id:                 Uuid::new_v4(),
    location:               None,
    coordinates:            None,
    status,
    estimated_size:         None,
    description:            None,
    created_at:             Some(now),
    reported_at:            Some(now),
    reporter_id:            None,
    reporter_name:          None,
    reported_by_handle:     None,
    salvor_account_id:      None,
    missing_reporter_name:  None,
    missing_reporter_phone: None,
    version:                0,
  }
}

/// Register an account straight into the store and return a caller for it.
pub async fn account(
  store: &MemoryStore,
  handle: &str,
  display_name: &str,
  phone: Option<&str>,
) -> (Account, Caller) {
  let account = Account {
    account_id:      Uuid::new_v4(),
    handle:          handle.into(),
    display_name:    display_name.into(),
    phone:           phone.map(str::to_owned),
    credential_hash: "hash".into(),
    created_at:      Utc::now(),
  };
  let caller = Caller::account(account.account_id, handle);
  let stored = store.insert_account(account).await.unwrap().applied().unwrap();
  (stored, caller)
}

fn newest_first(nets: &mut [GhostNet]) {
  nets.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

fn newest_requests_first(requests: &mut [ReassignmentRequest]) {
  requests.sort_by(|a, b| b.created_at.cmp(&a.created_at));
}

impl NetStore for MemoryStore {
  type Error = MemoryError;

  async fn insert_account(&self, account: Account) -> Result<Commit<Account>, MemoryError> {
    let mut inner = self.inner.lock().await;
    if inner.accounts.iter().any(|a| a.handle == account.handle) {
      return Ok(Commit::Conflict);
    }
    inner.accounts.push(account.clone());
    Ok(Commit::Applied(account))
  }

  async fn get_account(&self, id: Uuid) -> Result<Option<Account>, MemoryError> {
    let inner = self.inner.lock().await;
    Ok(inner.accounts.iter().find(|a| a.account_id == id).cloned())
  }

  async fn get_account_by_handle(&self, handle: &str) -> Result<Option<Account>, MemoryError> {
    let inner = self.inner.lock().await;
    Ok(inner.accounts.iter().find(|a| a.handle == handle).cloned())
  }

  async fn update_account_contact(
    &self,
    id: Uuid,
    update: ContactUpdate,
  ) -> Result<Option<Account>, MemoryError> {
    let mut inner = self.inner.lock().await;
    Ok(inner.accounts.iter_mut().find(|a| a.account_id == id).map(|a| {
      a.display_name = update.display_name;
      a.phone = update.phone;
      a.clone()
    }))
  }

  async fn insert_ghost_net(&self, mut net: GhostNet) -> Result<GhostNet, MemoryError> {
    net.version = 0;
    self.inner.lock().await.nets.push(net.clone());
    Ok(net)
  }

  async fn get_ghost_net(&self, id: Uuid) -> Result<Option<GhostNet>, MemoryError> {
    let inner = self.inner.lock().await;
    Ok(inner.nets.iter().find(|n| n.net_id == id).cloned())
  }

  async fn list_ghost_nets(&self, ordering: NetOrdering) -> Result<Vec<GhostNet>, MemoryError> {
    let inner = self.inner.lock().await;
    if inner.failing.contains(&ordering) {
      return Err(MemoryError::Injected(ordering));
    }
    let mut nets = inner.nets.clone();
    match ordering {
      NetOrdering::CreatedAtDesc => {
        if nets.iter().any(|n| n.created_at.is_none()) {
          return Err(MemoryError::MissingKey("created_at"));
        }
        newest_first(&mut nets);
      }
      NetOrdering::ReportedAtDesc => {
        if nets.iter().any(|n| n.reported_at.is_none()) {
          return Err(MemoryError::MissingKey("reported_at"));
        }
        nets.sort_by(|a, b| b.reported_at.cmp(&a.reported_at));
      }
      NetOrdering::Unordered => {}
    }
    Ok(nets)
  }

  async fn list_ghost_nets_by_reporter(&self, account: Uuid) -> Result<Vec<GhostNet>, MemoryError> {
    let inner = self.inner.lock().await;
    let mut nets: Vec<_> = inner
      .nets
      .iter()
      .filter(|n| n.reporter_id == Some(account))
      .cloned()
      .collect();
    newest_first(&mut nets);
    Ok(nets)
  }

  async fn list_ghost_nets_by_salvor(&self, account: Uuid) -> Result<Vec<GhostNet>, MemoryError> {
    let inner = self.inner.lock().await;
    let mut nets: Vec<_> = inner
      .nets
      .iter()
      .filter(|n| n.salvor_account_id == Some(account))
      .cloned()
      .collect();
    newest_first(&mut nets);
    Ok(nets)
  }

  async fn list_ghost_nets_by_status(&self, status: NetStatus) -> Result<Vec<GhostNet>, MemoryError> {
    let inner = self.inner.lock().await;
    let mut nets: Vec<_> = inner.nets.iter().filter(|n| n.status == status).cloned().collect();
    newest_first(&mut nets);
    Ok(nets)
  }

  async fn replace_ghost_net(&self, mut net: GhostNet) -> Result<Commit<GhostNet>, MemoryError> {
    let mut inner = self.inner.lock().await;
    inner.apply_interloper();
    let Some(slot) = inner.nets.iter_mut().find(|n| n.net_id == net.net_id) else {
      return Ok(Commit::Conflict);
    };
    if slot.version != net.version {
      return Ok(Commit::Conflict);
    }
    net.version += 1;
    *slot = net.clone();
    Ok(Commit::Applied(net))
  }

  async fn delete_ghost_net(&self, id: Uuid, expected_version: u64) -> Result<Commit<()>, MemoryError> {
    let mut inner = self.inner.lock().await;
    let before = inner.nets.len();
    inner.nets.retain(|n| !(n.net_id == id && n.version == expected_version));
    Ok(if inner.nets.len() < before { Commit::Applied(()) } else { Commit::Conflict })
  }

  async fn count_reported_by(&self, account: Uuid) -> Result<u64, MemoryError> {
    let inner = self.inner.lock().await;
    Ok(inner.nets.iter().filter(|n| n.reporter_id == Some(account)).count() as u64)
  }

  async fn count_recovered_by(&self, account: Uuid) -> Result<u64, MemoryError> {
    let inner = self.inner.lock().await;
    Ok(
      inner
        .nets
        .iter()
        .filter(|n| n.salvor_account_id == Some(account) && n.status == NetStatus::Recovered)
        .count() as u64,
    )
  }

  async fn insert_request(
    &self,
    request: ReassignmentRequest,
    net_version: u64,
  ) -> Result<Commit<ReassignmentRequest>, MemoryError> {
    let mut inner = self.inner.lock().await;
    inner.apply_interloper();
    let net_ok = inner.nets.iter().any(|n| {
      n.net_id == request.ghost_net_id
        && n.version == net_version
        && n.salvor_account_id == Some(request.current_salvor_id)
        && !n.status.is_terminal()
    });
    if !net_ok {
      return Ok(Commit::Conflict);
    }
    let duplicate = inner
      .requests
      .iter()
      .any(|r| r.ghost_net_id == request.ghost_net_id && r.status.is_pending());
    if duplicate {
      return Ok(Commit::Conflict);
    }
    inner.requests.push(request.clone());
    Ok(Commit::Applied(request))
  }

  async fn get_request(&self, id: Uuid) -> Result<Option<ReassignmentRequest>, MemoryError> {
    let inner = self.inner.lock().await;
    Ok(inner.requests.iter().find(|r| r.request_id == id).cloned())
  }

  async fn list_requests_by_requester(
    &self,
    account: Uuid,
  ) -> Result<Vec<ReassignmentRequest>, MemoryError> {
    let inner = self.inner.lock().await;
    let mut requests: Vec<_> =
      inner.requests.iter().filter(|r| r.requester_id == account).cloned().collect();
    newest_requests_first(&mut requests);
    Ok(requests)
  }

  async fn list_pending_requests_for_salvor(
    &self,
    account: Uuid,
  ) -> Result<Vec<ReassignmentRequest>, MemoryError> {
    let inner = self.inner.lock().await;
    let mut requests: Vec<_> = inner
      .requests
      .iter()
      .filter(|r| r.current_salvor_id == account && r.status.is_pending())
      .cloned()
      .collect();
    newest_requests_first(&mut requests);
    Ok(requests)
  }

  async fn list_requests_for_net(
    &self,
    net_id: Uuid,
    status: Option<RequestStatus>,
  ) -> Result<Vec<ReassignmentRequest>, MemoryError> {
    let inner = self.inner.lock().await;
    let mut requests: Vec<_> = inner
      .requests
      .iter()
      .filter(|r| r.ghost_net_id == net_id && status.is_none_or(|s| r.status == s))
      .cloned()
      .collect();
    newest_requests_first(&mut requests);
    Ok(requests)
  }

  async fn reject_request(&self, id: Uuid) -> Result<Commit<ReassignmentRequest>, MemoryError> {
    let mut inner = self.inner.lock().await;
    match inner.requests.iter_mut().find(|r| r.request_id == id) {
      Some(r) if r.status.is_pending() => {
        r.status = RequestStatus::Rejected;
        Ok(Commit::Applied(r.clone()))
      }
      _ => Ok(Commit::Conflict),
    }
  }

  async fn complete_transfer(
    &self,
    commit: TransferCommit,
  ) -> Result<Commit<TransferOutcome>, MemoryError> {
    let mut inner = self.inner.lock().await;
    let net_ok = inner.nets.iter().any(|n| {
      n.net_id == commit.net_id
        && n.version == commit.net_version
        && n.salvor_account_id == Some(commit.expected_salvor)
        && !n.status.is_terminal()
    });
    let request_ok = inner.requests.iter().any(|r| {
      r.request_id == commit.request_id
        && r.ghost_net_id == commit.net_id
        && r.status.is_pending()
    });
    if !(net_ok && request_ok) {
      return Ok(Commit::Conflict);
    }

    let mut net = None;
    if let Some(n) = inner.nets.iter_mut().find(|n| n.net_id == commit.net_id) {
      n.salvor_account_id = Some(commit.new_salvor);
      n.version += 1;
      net = Some(n.clone());
    }

    let mut request = None;
    let mut rejected = Vec::new();
    for r in inner.requests.iter_mut().filter(|r| r.ghost_net_id == commit.net_id) {
      if r.request_id == commit.request_id {
        r.status = RequestStatus::Accepted;
        request = Some(r.clone());
      } else if r.status.is_pending() {
        r.status = RequestStatus::Rejected;
        rejected.push(r.request_id);
      }
    }

    match (net, request) {
      (Some(net), Some(request)) => {
        Ok(Commit::Applied(TransferOutcome { net, request, rejected }))
      }
      _ => Ok(Commit::Conflict),
    }
  }
}
