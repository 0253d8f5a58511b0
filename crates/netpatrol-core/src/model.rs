//! Entity types: accounts, ghost nets, and reassignment requests.
//!
//! Status fields are closed enums. The set of legal ghost-net transitions is
//! encoded once in [`NetStatus::allows`]; every guard in the engines goes
//! through it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Written to `missing_reporter_phone` when the declaring account has no
/// phone on file.
pub const MISSING_PHONE_PLACEHOLDER: &str = "N/A";

// ─── Account ─────────────────────────────────────────────────────────────────

/// A registered account. The credential hash is opaque to the core; it is
/// produced and checked by the credential collaborator in the service layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Account {
  pub account_id:      Uuid,
  /// Login handle; unique across the store.
  pub handle:          String,
  pub display_name:    String,
  pub phone:           Option<String>,
  #[serde(skip_serializing, default)]
  pub credential_hash: String,
  pub created_at:      DateTime<Utc>,
}

impl Account {
  /// Display name, falling back to the handle when the name is blank.
  pub fn name_or_handle(&self) -> &str {
    non_blank(Some(&self.display_name)).unwrap_or(&self.handle)
  }
}

/// Input to [`crate::accounts::register`].
#[derive(Debug, Clone)]
pub struct NewAccount {
  pub handle:          String,
  pub display_name:    String,
  pub phone:           Option<String>,
  pub credential_hash: String,
}

/// The mutable part of an account.
#[derive(Debug, Clone, Deserialize)]
pub struct ContactUpdate {
  pub display_name: String,
  pub phone:        Option<String>,
}

/// An account as shown to other accounts: no credential material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountProfile {
  pub account_id:   Uuid,
  pub handle:       String,
  pub display_name: String,
  pub phone:        Option<String>,
}

impl From<Account> for AccountProfile {
  fn from(a: Account) -> Self {
    Self {
      account_id:   a.account_id,
      handle:       a.handle,
      display_name: a.display_name,
      phone:        a.phone,
    }
  }
}

// ─── Ghost net ───────────────────────────────────────────────────────────────

/// Where a ghost net is in its reporting-and-salvage lifecycle.
#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum NetStatus {
  Reported,
  SalvagePending,
  Recovered,
  Missing,
}

/// A state-changing action on a ghost net.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
pub enum NetAction {
  #[strum(to_string = "claim")]
  Claim,
  #[strum(to_string = "recover")]
  Recover,
  #[strum(to_string = "mark missing")]
  MarkMissing,
  #[strum(to_string = "delete")]
  Delete,
  /// Hand the claim to another account. Leaves the status unchanged.
  #[strum(to_string = "reassign")]
  Reassign,
}

impl NetStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  /// `RECOVERED` is the only terminal state.
  pub fn is_terminal(self) -> bool { matches!(self, Self::Recovered) }

  /// Whether `action` is legal from this status. Authorization is checked
  /// separately.
  pub fn allows(self, action: NetAction) -> bool {
    use NetAction::*;
    use NetStatus::*;
    match (self, action) {
      (Reported, Claim) => true,
      (SalvagePending, Recover) => true,
      (Reported | SalvagePending | Missing, MarkMissing) => true,
      (Reported | Missing, Delete) => true,
      (Recovered, MarkMissing) => false,
      (SalvagePending | Recovered | Missing, Claim) => false,
      (Reported | Recovered | Missing, Recover) => false,
      (SalvagePending | Recovered, Delete) => false,
      (Reported | SalvagePending | Missing, Reassign) => true,
      (Recovered, Reassign) => false,
    }
  }
}

impl NetAction {
  /// The status a successful action leaves the net in; `None` for delete
  /// and for reassignment, which keeps the current status.
  pub fn target(self) -> Option<NetStatus> {
    match self {
      Self::Claim => Some(NetStatus::SalvagePending),
      Self::Recover => Some(NetStatus::Recovered),
      Self::MarkMissing => Some(NetStatus::Missing),
      Self::Delete | Self::Reassign => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinates {
  pub latitude:  f64,
  pub longitude: f64,
}

/// A reported or salvaged ghost net.
///
/// `created_at` and `reported_at` are optional only because historical rows
/// may lack them; every report made through [`crate::lifecycle::report`] sets
/// both to the same instant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GhostNet {
  pub net_id:                 Uuid,
  /// Free-text description of the location.
  pub location:               Option<String>,
  pub coordinates:            Option<Coordinates>,
  pub status:                 NetStatus,
  pub estimated_size:         Option<String>,
  pub description:            Option<String>,
  pub created_at:             Option<DateTime<Utc>>,
  pub reported_at:            Option<DateTime<Utc>>,
  pub reporter_id:            Option<Uuid>,
  pub reporter_name:          Option<String>,
  pub reported_by_handle:     Option<String>,
  /// The account currently responsible for recovery.
  pub salvor_account_id:      Option<Uuid>,
  pub missing_reporter_name:  Option<String>,
  pub missing_reporter_phone: Option<String>,
  /// Optimistic-concurrency counter; bumped by the store on every write.
  pub version:                u64,
}

impl GhostNet {
  /// `"lat, lon"` when coordinates are known, otherwise the free-text
  /// location.
  pub fn location_label(&self) -> Option<String> {
    match self.coordinates {
      Some(c) => Some(format!("{}, {}", c.latitude, c.longitude)),
      None => self.location.clone(),
    }
  }
}

/// Input to [`crate::lifecycle::report`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct NewReport {
  pub location:       Option<String>,
  pub coordinates:    Option<Coordinates>,
  pub estimated_size: Option<String>,
  pub description:    Option<String>,
}

// ─── Reassignment request ────────────────────────────────────────────────────

#[derive(
  Debug,
  Clone,
  Copy,
  PartialEq,
  Eq,
  Hash,
  Serialize,
  Deserialize,
  strum::Display,
  strum::EnumString,
  strum::IntoStaticStr,
)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum RequestStatus {
  Pending,
  Accepted,
  Rejected,
}

impl RequestStatus {
  pub fn as_str(self) -> &'static str { self.into() }

  pub fn is_pending(self) -> bool { matches!(self, Self::Pending) }
}

/// An offer to take over salvage responsibility for a ghost net. Settled
/// requests are never mutated or deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReassignmentRequest {
  pub request_id:        Uuid,
  pub ghost_net_id:      Uuid,
  pub requester_id:      Uuid,
  /// The net's salvor when the request was made.
  pub current_salvor_id: Uuid,
  pub status:            RequestStatus,
  pub created_at:        DateTime<Utc>,
}

// ─── Helpers ─────────────────────────────────────────────────────────────────

/// `Some(s)` if `s` has non-whitespace content.
pub(crate) fn non_blank(s: Option<&String>) -> Option<&str> {
  s.map(String::as_str).filter(|s| !s.trim().is_empty())
}
