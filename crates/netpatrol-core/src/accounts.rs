//! Account registration and contact maintenance.
//!
//! Credential hashing happens before [`register`] is called; the core stores
//! the hash verbatim and never inspects it.

use chrono::Utc;
use tracing::info;
use uuid::Uuid;

use crate::{
  Error, Result,
  guard,
  identity::Caller,
  model::{Account, AccountProfile, ContactUpdate, NewAccount},
  store::{Commit, NetStore},
};

pub async fn register<S: NetStore>(store: &S, input: NewAccount) -> Result<Account> {
  let handle = input.handle.trim().to_owned();
  if handle.is_empty() {
    return Err(Error::Validation("handle must not be empty".into()));
  }
  if input.display_name.trim().is_empty() {
    return Err(Error::Validation("display name must not be empty".into()));
  }
  if input.credential_hash.is_empty() {
    return Err(Error::Validation("credential hash must not be empty".into()));
  }

  let account = Account {
    account_id:      Uuid::new_v4(),
    handle:          handle.clone(),
    display_name:    input.display_name.trim().to_owned(),
    phone:           normalise_phone(input.phone),
    credential_hash: input.credential_hash,
    created_at:      Utc::now(),
  };

  match store.insert_account(account).await.map_err(Error::store)? {
    Commit::Applied(account) => {
      info!(account_id = %account.account_id, handle = %account.handle, "account registered");
      Ok(account)
    }
    Commit::Conflict => Err(Error::HandleTaken(handle)),
  }
}

/// The caller's own account.
pub async fn current<S: NetStore>(store: &S, caller: &Caller) -> Result<Account> {
  let who = caller.require()?;
  guard::load_account(store, who.account_id).await
}

pub async fn get_by_id<S: NetStore>(store: &S, id: Uuid) -> Result<AccountProfile> {
  guard::load_account(store, id).await.map(AccountProfile::from)
}

pub async fn get_by_handle<S: NetStore>(
  store: &S,
  handle: &str,
) -> Result<AccountProfile> {
  store
    .get_account_by_handle(handle)
    .await
    .map_err(Error::store)?
    .map(AccountProfile::from)
    .ok_or_else(|| Error::AccountHandleNotFound(handle.to_owned()))
}

/// Change the caller's display name and phone. Nothing else on an account is
/// mutable.
pub async fn update_contact<S: NetStore>(
  store: &S,
  caller: &Caller,
  update: ContactUpdate,
) -> Result<Account> {
  let who = caller.require()?;
  if update.display_name.trim().is_empty() {
    return Err(Error::Validation("display name must not be empty".into()));
  }
  let update = ContactUpdate {
    display_name: update.display_name.trim().to_owned(),
    phone:        normalise_phone(update.phone),
  };
  store
    .update_account_contact(who.account_id, update)
    .await
    .map_err(Error::store)?
    .ok_or(Error::AccountNotFound(who.account_id))
}

fn normalise_phone(phone: Option<String>) -> Option<String> {
  phone
    .map(|p| p.trim().to_owned())
    .filter(|p| !p.is_empty())
}
