//! Per-account counters, computed on demand from the store.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result, identity::Caller, store::NetStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct AccountStats {
  /// Nets this account reported.
  pub reported:  u64,
  /// Nets this account is salvor of and that are `RECOVERED`.
  pub recovered: u64,
}

pub async fn stats_for<S: NetStore>(store: &S, account: Uuid) -> Result<AccountStats> {
  let reported = store.count_reported_by(account).await.map_err(Error::store)?;
  let recovered = store.count_recovered_by(account).await.map_err(Error::store)?;
  Ok(AccountStats { reported, recovered })
}

/// Counters for the authenticated caller.
pub async fn account_stats<S: NetStore>(
  store: &S,
  caller: &Caller,
) -> Result<AccountStats> {
  let who = caller.require()?;
  stats_for(store, who.account_id).await
}
