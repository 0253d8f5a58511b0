//! The `NetStore` trait: the entity-store contract the engines run against.
//!
//! Implemented by storage backends (e.g. `netpatrol-store-sqlite`). Every
//! read-modify-write the engines perform ends in exactly one conditional
//! write here: the store compares the entity's current version (or status)
//! with the one the engine read, and reports [`Commit::Conflict`] instead of
//! writing when they differ.
//!
//! `Self::Error` is reserved for backend failures (I/O, corrupt rows). The
//! engines surface it as [`crate::ErrorKind::Unavailable`].

use std::future::Future;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::{
  Account, ContactUpdate, GhostNet, NetStatus, ReassignmentRequest,
  RequestStatus,
};

// ─── Write outcomes ──────────────────────────────────────────────────────────

/// Result of a conditional write.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub enum Commit<T> {
  /// The precondition held and the write was applied.
  Applied(T),
  /// The precondition did not hold; nothing was written.
  Conflict,
}

impl<T> Commit<T> {
  pub fn applied(self) -> Option<T> {
    match self {
      Self::Applied(t) => Some(t),
      Self::Conflict => None,
    }
  }
}

/// Ordering for [`NetStore::list_ghost_nets`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum NetOrdering {
  /// Newest `created_at` first. Fails if any row lacks a usable `created_at`.
  CreatedAtDesc,
  /// Newest `reported_at` first. Fails if any row lacks a usable
  /// `reported_at`.
  ReportedAtDesc,
  /// Storage order; tolerates rows with missing timestamps.
  Unordered,
}

/// The single transaction that completes an accepted reassignment.
#[derive(Debug, Clone)]
pub struct TransferCommit {
  pub request_id:      Uuid,
  pub net_id:          Uuid,
  /// The net version the engine validated against.
  pub net_version:     u64,
  /// The salvor the engine observed; must still be current.
  pub expected_salvor: Uuid,
  pub new_salvor:      Uuid,
}

/// Everything [`NetStore::complete_transfer`] changed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransferOutcome {
  pub net:      GhostNet,
  pub request:  ReassignmentRequest,
  /// Sibling requests moved from `PENDING` to `REJECTED`.
  pub rejected: Vec<Uuid>,
}

// ─── Trait ───────────────────────────────────────────────────────────────────

/// Abstraction over a NetPatrol entity-store backend.
///
/// All methods return `Send` futures so the trait can be used from
/// multi-threaded runtimes (e.g. tokio with `axum`).
pub trait NetStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  // ── Accounts ──────────────────────────────────────────────────────────

  /// Persist a new account. [`Commit::Conflict`] if the handle is taken.
  fn insert_account(
    &self,
    account: Account,
  ) -> impl Future<Output = Result<Commit<Account>, Self::Error>> + Send + '_;

  fn get_account(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  fn get_account_by_handle<'a>(
    &'a self,
    handle: &'a str,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + 'a;

  /// Replace the contact fields of an account. `None` if it does not exist.
  fn update_account_contact(
    &self,
    id: Uuid,
    update: ContactUpdate,
  ) -> impl Future<Output = Result<Option<Account>, Self::Error>> + Send + '_;

  // ── Ghost nets ────────────────────────────────────────────────────────

  /// Persist a freshly reported net. The stored version starts at 0.
  fn insert_ghost_net(
    &self,
    net: GhostNet,
  ) -> impl Future<Output = Result<GhostNet, Self::Error>> + Send + '_;

  fn get_ghost_net(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<GhostNet>, Self::Error>> + Send + '_;

  fn list_ghost_nets(
    &self,
    ordering: NetOrdering,
  ) -> impl Future<Output = Result<Vec<GhostNet>, Self::Error>> + Send + '_;

  /// Nets reported by `account`, newest first.
  fn list_ghost_nets_by_reporter(
    &self,
    account: Uuid,
  ) -> impl Future<Output = Result<Vec<GhostNet>, Self::Error>> + Send + '_;

  /// Nets currently assigned to `account`, newest first.
  fn list_ghost_nets_by_salvor(
    &self,
    account: Uuid,
  ) -> impl Future<Output = Result<Vec<GhostNet>, Self::Error>> + Send + '_;

  fn list_ghost_nets_by_status(
    &self,
    status: NetStatus,
  ) -> impl Future<Output = Result<Vec<GhostNet>, Self::Error>> + Send + '_;

  /// Overwrite the stored net with `net` if the stored version still equals
  /// `net.version`. The applied value carries the bumped version.
  fn replace_ghost_net(
    &self,
    net: GhostNet,
  ) -> impl Future<Output = Result<Commit<GhostNet>, Self::Error>> + Send + '_;

  /// Delete the net if its stored version still equals `expected_version`.
  fn delete_ghost_net(
    &self,
    id: Uuid,
    expected_version: u64,
  ) -> impl Future<Output = Result<Commit<()>, Self::Error>> + Send + '_;

  fn count_reported_by(
    &self,
    account: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  /// Nets assigned to `account` with status `RECOVERED`.
  fn count_recovered_by(
    &self,
    account: Uuid,
  ) -> impl Future<Output = Result<u64, Self::Error>> + Send + '_;

  // ── Reassignment requests ─────────────────────────────────────────────

  /// Persist a new `PENDING` request. [`Commit::Conflict`] if the net
  /// already has a pending request, or if the net is no longer at
  /// `net_version` with `request.current_salvor_id` as its salvor, or is
  /// `RECOVERED`.
  fn insert_request(
    &self,
    request: ReassignmentRequest,
    net_version: u64,
  ) -> impl Future<Output = Result<Commit<ReassignmentRequest>, Self::Error>>
  + Send
  + '_;

  fn get_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Option<ReassignmentRequest>, Self::Error>>
  + Send
  + '_;

  /// Requests made by `account`, newest first.
  fn list_requests_by_requester(
    &self,
    account: Uuid,
  ) -> impl Future<Output = Result<Vec<ReassignmentRequest>, Self::Error>>
  + Send
  + '_;

  /// `PENDING` requests whose snapshotted salvor is `account`, newest first.
  fn list_pending_requests_for_salvor(
    &self,
    account: Uuid,
  ) -> impl Future<Output = Result<Vec<ReassignmentRequest>, Self::Error>>
  + Send
  + '_;

  fn list_requests_for_net(
    &self,
    net_id: Uuid,
    status: Option<RequestStatus>,
  ) -> impl Future<Output = Result<Vec<ReassignmentRequest>, Self::Error>>
  + Send
  + '_;

  /// Move a request from `PENDING` to `REJECTED`. [`Commit::Conflict`] if it
  /// is no longer pending.
  fn reject_request(
    &self,
    id: Uuid,
  ) -> impl Future<Output = Result<Commit<ReassignmentRequest>, Self::Error>>
  + Send
  + '_;

  /// Atomically reassign the net, accept the request, and reject every other
  /// pending request for the net. Nothing is written unless the net version
  /// and salvor match, the net is not `RECOVERED`, and the request is still
  /// pending.
  fn complete_transfer(
    &self,
    commit: TransferCommit,
  ) -> impl Future<Output = Result<Commit<TransferOutcome>, Self::Error>>
  + Send
  + '_;
}
