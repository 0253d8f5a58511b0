//! [`SqliteStore`]: the SQLite implementation of [`NetStore`].

use std::path::Path;

use rusqlite::{OptionalExtension as _, TransactionBehavior};
use uuid::Uuid;

use netpatrol_core::{
  model::{
    Account, ContactUpdate, GhostNet, NetStatus, ReassignmentRequest,
    RequestStatus,
  },
  store::{Commit, NetOrdering, NetStore, TransferCommit, TransferOutcome},
};

use crate::{
  encode::{
    ACCOUNT_COLUMNS, NET_COLUMNS, REQUEST_COLUMNS, RawAccount, RawGhostNet,
    RawRequest, decode_uuid, encode_dt, encode_uuid,
  },
  schema::SCHEMA,
  Error, Result,
};

// ─── Store ───────────────────────────────────────────────────────────────────

/// A NetPatrol entity store backed by a single SQLite file.
///
/// Cloning is cheap; the inner connection is reference-counted.
#[derive(Clone)]
pub struct SqliteStore {
  pub(crate) conn: tokio_rusqlite::Connection,
}

impl SqliteStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open(path).await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  /// Open an in-memory store, useful for testing.
  pub async fn open_in_memory() -> Result<Self> {
    let conn = tokio_rusqlite::Connection::open_in_memory().await?;
    let store = Self { conn };
    store.init_schema().await?;
    Ok(store)
  }

  async fn init_schema(&self) -> Result<()> {
    self
      .conn
      .call(|conn| {
        conn.execute_batch(SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  /// Run a net query returning zero or more rows and decode them.
  async fn query_nets(
    &self,
    sql: String,
    param: Option<String>,
  ) -> Result<Vec<GhostNet>> {
    let raws: Vec<RawGhostNet> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = match param {
          Some(p) => stmt.query_map(rusqlite::params![p], RawGhostNet::from_row)?,
          None => stmt.query_map([], RawGhostNet::from_row)?,
        }
        .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawGhostNet::into_ghost_net).collect()
  }

  async fn query_requests(
    &self,
    sql: String,
    params: Vec<String>,
  ) -> Result<Vec<ReassignmentRequest>> {
    let raws: Vec<RawRequest> = self
      .conn
      .call(move |conn| {
        let mut stmt = conn.prepare(&sql)?;
        let rows = stmt
          .query_map(rusqlite::params_from_iter(params), RawRequest::from_row)?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.into_iter().map(RawRequest::into_request).collect()
  }

  async fn count(&self, sql: &'static str, account: Uuid) -> Result<u64> {
    let id_str = encode_uuid(account);
    let n: i64 = self
      .conn
      .call(move |conn| {
        Ok(conn.query_row(sql, rusqlite::params![id_str], |r| r.get(0))?)
      })
      .await?;
    Ok(n.max(0) as u64)
  }
}

fn is_constraint_violation(e: &rusqlite::Error) -> bool {
  matches!(
    e,
    rusqlite::Error::SqliteFailure(f, _)
      if f.code == rusqlite::ErrorCode::ConstraintViolation
  )
}

fn select_net(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<Option<RawGhostNet>> {
  conn
    .query_row(
      &format!("SELECT {NET_COLUMNS} FROM ghost_nets WHERE net_id = ?1"),
      rusqlite::params![id_str],
      RawGhostNet::from_row,
    )
    .optional()
}

fn select_request(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<Option<RawRequest>> {
  conn
    .query_row(
      &format!(
        "SELECT {REQUEST_COLUMNS} FROM reassignment_requests WHERE request_id = ?1"
      ),
      rusqlite::params![id_str],
      RawRequest::from_row,
    )
    .optional()
}

fn select_account(
  conn: &rusqlite::Connection,
  id_str: &str,
) -> rusqlite::Result<Option<RawAccount>> {
  conn
    .query_row(
      &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE account_id = ?1"),
      rusqlite::params![id_str],
      RawAccount::from_row,
    )
    .optional()
}

// ─── NetStore impl ───────────────────────────────────────────────────────────

impl NetStore for SqliteStore {
  type Error = Error;

  // ── Accounts ──────────────────────────────────────────────────────────────

  async fn insert_account(&self, account: Account) -> Result<Commit<Account>> {
    let id_str     = encode_uuid(account.account_id);
    let handle     = account.handle.clone();
    let name       = account.display_name.clone();
    let phone      = account.phone.clone();
    let credential = account.credential_hash.clone();
    let at_str     = encode_dt(account.created_at);

    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO accounts (
             account_id, handle, display_name, phone, credential_hash, created_at
           ) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
          rusqlite::params![id_str, handle, name, phone, credential, at_str],
        ) {
          Ok(_) => Ok(true),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(if inserted { Commit::Applied(account) } else { Commit::Conflict })
  }

  async fn get_account(&self, id: Uuid) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_account(conn, &id_str)?))
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  async fn get_account_by_handle(&self, handle: &str) -> Result<Option<Account>> {
    let handle = handle.to_owned();
    let raw: Option<RawAccount> = self
      .conn
      .call(move |conn| {
        Ok(conn
          .query_row(
            &format!("SELECT {ACCOUNT_COLUMNS} FROM accounts WHERE handle = ?1"),
            rusqlite::params![handle],
            RawAccount::from_row,
          )
          .optional()?)
      })
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  async fn update_account_contact(
    &self,
    id:     Uuid,
    update: ContactUpdate,
  ) -> Result<Option<Account>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE accounts SET display_name = ?2, phone = ?3 WHERE account_id = ?1",
          rusqlite::params![id_str, update.display_name, update.phone],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_account(conn, &id_str)?)
      })
      .await?;
    raw.map(RawAccount::into_account).transpose()
  }

  // ── Ghost nets ────────────────────────────────────────────────────────────

  async fn insert_ghost_net(&self, mut net: GhostNet) -> Result<GhostNet> {
    net.version = 0;
    let row = net.clone();

    self
      .conn
      .call(move |conn| {
        conn.execute(
          &format!(
            "INSERT INTO ghost_nets ({NET_COLUMNS})
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, 0)"
          ),
          rusqlite::params![
            encode_uuid(row.net_id),
            row.location,
            row.coordinates.map(|c| c.latitude),
            row.coordinates.map(|c| c.longitude),
            row.status.as_str(),
            row.estimated_size,
            row.description,
            row.created_at.map(encode_dt),
            row.reported_at.map(encode_dt),
            row.reporter_id.map(encode_uuid),
            row.reporter_name,
            row.reported_by_handle,
            row.salvor_account_id.map(encode_uuid),
            row.missing_reporter_name,
            row.missing_reporter_phone,
          ],
        )?;
        Ok(())
      })
      .await?;

    Ok(net)
  }

  async fn get_ghost_net(&self, id: Uuid) -> Result<Option<GhostNet>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_net(conn, &id_str)?))
      .await?;
    raw.map(RawGhostNet::into_ghost_net).transpose()
  }

  async fn list_ghost_nets(&self, ordering: NetOrdering) -> Result<Vec<GhostNet>> {
    let order_by = match ordering {
      NetOrdering::CreatedAtDesc => " ORDER BY created_at DESC, rowid DESC",
      NetOrdering::ReportedAtDesc => " ORDER BY reported_at DESC, rowid DESC",
      NetOrdering::Unordered => "",
    };
    let nets = self
      .query_nets(format!("SELECT {NET_COLUMNS} FROM ghost_nets{order_by}"), None)
      .await?;

    // A row whose key is NULL or unparseable cannot be placed in the order.
    let unusable = match ordering {
      NetOrdering::CreatedAtDesc => {
        nets.iter().any(|n| n.created_at.is_none()).then_some("created_at")
      }
      NetOrdering::ReportedAtDesc => {
        nets.iter().any(|n| n.reported_at.is_none()).then_some("reported_at")
      }
      NetOrdering::Unordered => None,
    };
    match unusable {
      Some(key) => Err(Error::OrderingUnavailable(key)),
      None => Ok(nets),
    }
  }

  async fn list_ghost_nets_by_reporter(&self, account: Uuid) -> Result<Vec<GhostNet>> {
    self
      .query_nets(
        format!(
          "SELECT {NET_COLUMNS} FROM ghost_nets WHERE reporter_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ),
        Some(encode_uuid(account)),
      )
      .await
  }

  async fn list_ghost_nets_by_salvor(&self, account: Uuid) -> Result<Vec<GhostNet>> {
    self
      .query_nets(
        format!(
          "SELECT {NET_COLUMNS} FROM ghost_nets WHERE salvor_account_id = ?1
           ORDER BY created_at DESC, rowid DESC"
        ),
        Some(encode_uuid(account)),
      )
      .await
  }

  async fn list_ghost_nets_by_status(&self, status: NetStatus) -> Result<Vec<GhostNet>> {
    self
      .query_nets(
        format!(
          "SELECT {NET_COLUMNS} FROM ghost_nets WHERE status = ?1
           ORDER BY created_at DESC, rowid DESC"
        ),
        Some(status.as_str().to_owned()),
      )
      .await
  }

  async fn replace_ghost_net(&self, net: GhostNet) -> Result<Commit<GhostNet>> {
    let row = net.clone();

    // created_at and reported_at are fixed at insert time.
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "UPDATE ghost_nets SET
             location = ?3, latitude = ?4, longitude = ?5, status = ?6,
             estimated_size = ?7, description = ?8, reporter_id = ?9,
             reporter_name = ?10, reported_by = ?11, salvor_account_id = ?12,
             missing_reporter_name = ?13, missing_reporter_phone = ?14,
             version = version + 1
           WHERE net_id = ?1 AND version = ?2",
          rusqlite::params![
            encode_uuid(row.net_id),
            row.version as i64,
            row.location,
            row.coordinates.map(|c| c.latitude),
            row.coordinates.map(|c| c.longitude),
            row.status.as_str(),
            row.estimated_size,
            row.description,
            row.reporter_id.map(encode_uuid),
            row.reporter_name,
            row.reported_by_handle,
            row.salvor_account_id.map(encode_uuid),
            row.missing_reporter_name,
            row.missing_reporter_phone,
          ],
        )?)
      })
      .await?;

    if changed == 0 {
      return Ok(Commit::Conflict);
    }
    Ok(Commit::Applied(GhostNet { version: net.version + 1, ..net }))
  }

  async fn delete_ghost_net(&self, id: Uuid, expected_version: u64) -> Result<Commit<()>> {
    let id_str = encode_uuid(id);
    let changed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute(
          "DELETE FROM ghost_nets WHERE net_id = ?1 AND version = ?2",
          rusqlite::params![id_str, expected_version as i64],
        )?)
      })
      .await?;
    Ok(if changed == 0 { Commit::Conflict } else { Commit::Applied(()) })
  }

  async fn count_reported_by(&self, account: Uuid) -> Result<u64> {
    self
      .count("SELECT COUNT(*) FROM ghost_nets WHERE reporter_id = ?1", account)
      .await
  }

  async fn count_recovered_by(&self, account: Uuid) -> Result<u64> {
    self
      .count(
        "SELECT COUNT(*) FROM ghost_nets
         WHERE salvor_account_id = ?1 AND status = 'RECOVERED'",
        account,
      )
      .await
  }

  // ── Reassignment requests ─────────────────────────────────────────────────

  async fn insert_request(
    &self,
    request: ReassignmentRequest,
    net_version: u64,
  ) -> Result<Commit<ReassignmentRequest>> {
    let id_str        = encode_uuid(request.request_id);
    let net_str       = encode_uuid(request.ghost_net_id);
    let requester_str = encode_uuid(request.requester_id);
    let salvor_str    = encode_uuid(request.current_salvor_id);
    let status_str    = request.status.as_str();
    let at_str        = encode_dt(request.created_at);
    let version       = net_version as i64;

    // Zero rows when the net moved on since the engine read it. The partial
    // unique index rejects a second PENDING row for the net.
    let inserted = self
      .conn
      .call(move |conn| {
        match conn.execute(
          "INSERT INTO reassignment_requests (
             request_id, ghost_net_id, requester_id, current_salvor_id,
             status, created_at
           )
           SELECT ?1, ?2, ?3, ?4, ?5, ?6
           WHERE EXISTS (
             SELECT 1 FROM ghost_nets
             WHERE net_id = ?2 AND version = ?7 AND salvor_account_id = ?4
               AND status <> 'RECOVERED'
           )",
          rusqlite::params![
            id_str,
            net_str,
            requester_str,
            salvor_str,
            status_str,
            at_str,
            version
          ],
        ) {
          Ok(n) => Ok(n > 0),
          Err(e) if is_constraint_violation(&e) => Ok(false),
          Err(e) => Err(e.into()),
        }
      })
      .await?;

    Ok(if inserted { Commit::Applied(request) } else { Commit::Conflict })
  }

  async fn get_request(&self, id: Uuid) -> Result<Option<ReassignmentRequest>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| Ok(select_request(conn, &id_str)?))
      .await?;
    raw.map(RawRequest::into_request).transpose()
  }

  async fn list_requests_by_requester(
    &self,
    account: Uuid,
  ) -> Result<Vec<ReassignmentRequest>> {
    self
      .query_requests(
        format!(
          "SELECT {REQUEST_COLUMNS} FROM reassignment_requests
           WHERE requester_id = ?1 ORDER BY created_at DESC, rowid DESC"
        ),
        vec![encode_uuid(account)],
      )
      .await
  }

  async fn list_pending_requests_for_salvor(
    &self,
    account: Uuid,
  ) -> Result<Vec<ReassignmentRequest>> {
    self
      .query_requests(
        format!(
          "SELECT {REQUEST_COLUMNS} FROM reassignment_requests
           WHERE current_salvor_id = ?1 AND status = 'PENDING'
           ORDER BY created_at DESC, rowid DESC"
        ),
        vec![encode_uuid(account)],
      )
      .await
  }

  async fn list_requests_for_net(
    &self,
    net_id: Uuid,
    status: Option<RequestStatus>,
  ) -> Result<Vec<ReassignmentRequest>> {
    let net_str = encode_uuid(net_id);
    match status {
      Some(s) => {
        self
          .query_requests(
            format!(
              "SELECT {REQUEST_COLUMNS} FROM reassignment_requests
               WHERE ghost_net_id = ?1 AND status = ?2
               ORDER BY created_at DESC, rowid DESC"
            ),
            vec![net_str, s.as_str().to_owned()],
          )
          .await
      }
      None => {
        self
          .query_requests(
            format!(
              "SELECT {REQUEST_COLUMNS} FROM reassignment_requests
               WHERE ghost_net_id = ?1 ORDER BY created_at DESC, rowid DESC"
            ),
            vec![net_str],
          )
          .await
      }
    }
  }

  async fn reject_request(&self, id: Uuid) -> Result<Commit<ReassignmentRequest>> {
    let id_str = encode_uuid(id);
    let raw = self
      .conn
      .call(move |conn| {
        let changed = conn.execute(
          "UPDATE reassignment_requests SET status = 'REJECTED'
           WHERE request_id = ?1 AND status = 'PENDING'",
          rusqlite::params![id_str],
        )?;
        if changed == 0 {
          return Ok(None);
        }
        Ok(select_request(conn, &id_str)?)
      })
      .await?;

    match raw {
      Some(raw) => Ok(Commit::Applied(raw.into_request()?)),
      None => Ok(Commit::Conflict),
    }
  }

  async fn complete_transfer(
    &self,
    commit: TransferCommit,
  ) -> Result<Commit<TransferOutcome>> {
    let request_str  = encode_uuid(commit.request_id);
    let net_str      = encode_uuid(commit.net_id);
    let expected_str = encode_uuid(commit.expected_salvor);
    let new_str      = encode_uuid(commit.new_salvor);
    let version      = commit.net_version as i64;

    // Dropping the transaction without commit rolls back.
    let raw = self
      .conn
      .call(move |conn| {
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let net_changed = tx.execute(
          "UPDATE ghost_nets SET salvor_account_id = ?2, version = version + 1
           WHERE net_id = ?1 AND version = ?3 AND salvor_account_id = ?4
             AND status <> 'RECOVERED'",
          rusqlite::params![net_str, new_str, version, expected_str],
        )?;
        if net_changed == 0 {
          return Ok(None);
        }

        let request_changed = tx.execute(
          "UPDATE reassignment_requests SET status = 'ACCEPTED'
           WHERE request_id = ?1 AND ghost_net_id = ?2 AND status = 'PENDING'",
          rusqlite::params![request_str, net_str],
        )?;
        if request_changed == 0 {
          return Ok(None);
        }

        let rejected: Vec<String> = {
          let mut stmt = tx.prepare(
            "SELECT request_id FROM reassignment_requests
             WHERE ghost_net_id = ?1 AND status = 'PENDING'",
          )?;
          stmt
            .query_map(rusqlite::params![net_str], |r| r.get(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.execute(
          "UPDATE reassignment_requests SET status = 'REJECTED'
           WHERE ghost_net_id = ?1 AND status = 'PENDING'",
          rusqlite::params![net_str],
        )?;

        let net = select_net(&tx, &net_str)?;
        let request = select_request(&tx, &request_str)?;
        tx.commit()?;
        Ok(net.zip(request).map(|(n, r)| (n, r, rejected)))
      })
      .await?;

    let Some((net, request, rejected)) = raw else {
      return Ok(Commit::Conflict);
    };
    Ok(Commit::Applied(TransferOutcome {
      net:      net.into_ghost_net()?,
      request:  request.into_request()?,
      rejected: rejected.iter().map(|s| decode_uuid(s)).collect::<Result<_>>()?,
    }))
  }
}
