//! Encoding and decoding helpers between domain types and the plain-text
//! representations stored in SQLite columns.
//!
//! Timestamps are stored as fixed-width RFC 3339 strings in UTC with
//! microsecond precision, so lexical order in SQL is chronological order.
//! UUIDs are stored as hyphenated lowercase strings. Statuses are stored as
//! their `SCREAMING_SNAKE_CASE` names.

use chrono::{DateTime, SecondsFormat, Utc};
use netpatrol_core::model::{
  Account, Coordinates, GhostNet, NetStatus, ReassignmentRequest,
  RequestStatus,
};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Uuid ─────────────────────────────────────────────────────────────────────

pub fn encode_uuid(id: Uuid) -> String { id.hyphenated().to_string() }

pub fn decode_uuid(s: &str) -> Result<Uuid> { Ok(Uuid::parse_str(s)?) }

fn decode_opt_uuid(s: Option<String>) -> Result<Option<Uuid>> {
  s.as_deref().map(decode_uuid).transpose()
}

// ─── DateTime<Utc> ───────────────────────────────────────────────────────────

pub fn encode_dt(dt: DateTime<Utc>) -> String {
  dt.to_rfc3339_opts(SecondsFormat::Micros, true)
}

pub fn decode_dt(s: &str) -> Result<DateTime<Utc>> {
  DateTime::parse_from_rfc3339(s)
    .map(|dt| dt.with_timezone(&Utc))
    .map_err(|e| Error::DateParse(e.to_string()))
}

/// Historical rows may carry a NULL or malformed timestamp; both read as
/// `None`. Ordered listings reject such rows separately.
fn decode_dt_lenient(s: Option<String>) -> Option<DateTime<Utc>> {
  s.as_deref().and_then(|s| decode_dt(s).ok())
}

// ─── Statuses ────────────────────────────────────────────────────────────────

pub fn decode_net_status(s: &str) -> Result<NetStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown ghost net status: {s:?}")))
}

pub fn decode_request_status(s: &str) -> Result<RequestStatus> {
  s.parse()
    .map_err(|_| Error::Decode(format!("unknown request status: {s:?}")))
}

// ─── Raw rows ────────────────────────────────────────────────────────────────

pub const ACCOUNT_COLUMNS: &str =
  "account_id, handle, display_name, phone, credential_hash, created_at";

/// An account row as read from SQLite, before decoding.
pub struct RawAccount {
  pub account_id:      String,
  pub handle:          String,
  pub display_name:    String,
  pub phone:           Option<String>,
  pub credential_hash: String,
  pub created_at:      String,
}

impl RawAccount {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      account_id:      row.get(0)?,
      handle:          row.get(1)?,
      display_name:    row.get(2)?,
      phone:           row.get(3)?,
      credential_hash: row.get(4)?,
      created_at:      row.get(5)?,
    })
  }

  pub fn into_account(self) -> Result<Account> {
    Ok(Account {
      account_id:      decode_uuid(&self.account_id)?,
      handle:          self.handle,
      display_name:    self.display_name,
      phone:           self.phone,
      credential_hash: self.credential_hash,
      created_at:      decode_dt(&self.created_at)?,
    })
  }
}

pub const NET_COLUMNS: &str = "net_id, location, latitude, longitude, status, \
   estimated_size, description, created_at, reported_at, reporter_id, \
   reporter_name, reported_by, salvor_account_id, missing_reporter_name, \
   missing_reporter_phone, version";

/// A ghost-net row as read from SQLite, before decoding.
pub struct RawGhostNet {
  pub net_id:                 String,
  pub location:               Option<String>,
  pub latitude:               Option<f64>,
  pub longitude:              Option<f64>,
  pub status:                 String,
  pub estimated_size:         Option<String>,
  pub description:            Option<String>,
  pub created_at:             Option<String>,
  pub reported_at:            Option<String>,
  pub reporter_id:            Option<String>,
  pub reporter_name:          Option<String>,
  pub reported_by:            Option<String>,
  pub salvor_account_id:      Option<String>,
  pub missing_reporter_name:  Option<String>,
  pub missing_reporter_phone: Option<String>,
  pub version:                i64,
}

impl RawGhostNet {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      net_id:                 row.get(0)?,
      location:               row.get(1)?,
      latitude:               row.get(2)?,
      longitude:              row.get(3)?,
      status:                 row.get(4)?,
      estimated_size:         row.get(5)?,
      description:            row.get(6)?,
      created_at:             row.get(7)?,
      reported_at:            row.get(8)?,
      reporter_id:            row.get(9)?,
      reporter_name:          row.get(10)?,
      reported_by:            row.get(11)?,
      salvor_account_id:      row.get(12)?,
      missing_reporter_name:  row.get(13)?,
      missing_reporter_phone: row.get(14)?,
      version:                row.get(15)?,
    })
  }

  pub fn into_ghost_net(self) -> Result<GhostNet> {
    let coordinates = match (self.latitude, self.longitude) {
      (Some(latitude), Some(longitude)) => Some(Coordinates { latitude, longitude }),
      _ => None,
    };
    let version = u64::try_from(self.version)
      .map_err(|_| Error::Decode(format!("negative version: {}", self.version)))?;
    Ok(GhostNet {
      net_id: decode_uuid(&self.net_id)?,
      location: self.location,
      coordinates,
      status: decode_net_status(&self.status)?,
      estimated_size: self.estimated_size,
      description: self.description,
      created_at: decode_dt_lenient(self.created_at),
      reported_at: decode_dt_lenient(self.reported_at),
      reporter_id: decode_opt_uuid(self.reporter_id)?,
      reporter_name: self.reporter_name,
      reported_by_handle: self.reported_by,
      salvor_account_id: decode_opt_uuid(self.salvor_account_id)?,
      missing_reporter_name: self.missing_reporter_name,
      missing_reporter_phone: self.missing_reporter_phone,
      version,
    })
  }
}

pub const REQUEST_COLUMNS: &str = "request_id, ghost_net_id, requester_id, \
   current_salvor_id, status, created_at";

/// A reassignment-request row as read from SQLite, before decoding.
pub struct RawRequest {
  pub request_id:        String,
  pub ghost_net_id:      String,
  pub requester_id:      String,
  pub current_salvor_id: String,
  pub status:            String,
  pub created_at:        String,
}

impl RawRequest {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      request_id:        row.get(0)?,
      ghost_net_id:      row.get(1)?,
      requester_id:      row.get(2)?,
      current_salvor_id: row.get(3)?,
      status:            row.get(4)?,
      created_at:        row.get(5)?,
    })
  }

  pub fn into_request(self) -> Result<ReassignmentRequest> {
    Ok(ReassignmentRequest {
      request_id:        decode_uuid(&self.request_id)?,
      ghost_net_id:      decode_uuid(&self.ghost_net_id)?,
      requester_id:      decode_uuid(&self.requester_id)?,
      current_salvor_id: decode_uuid(&self.current_salvor_id)?,
      status:            decode_request_status(&self.status)?,
      created_at:        decode_dt(&self.created_at)?,
    })
  }
}
