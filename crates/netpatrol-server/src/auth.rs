//! HTTP Basic identity resolution and the argon2 credential collaborator.

use argon2::{
  Argon2, PasswordHash, PasswordHasher, PasswordVerifier,
  password_hash::SaltString,
};
use axum::extract::FromRequestParts;
use axum::http::{HeaderMap, header, request::Parts};
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as B64;
use netpatrol_core::{identity::Caller, store::NetStore};
use rand_core::OsRng;

use crate::{AppState, error::ApiError};

/// The caller resolved from the request's `Authorization` header.
pub struct Identity(pub Caller);

/// Verified against when the handle is unknown, so a miss costs the same
/// argon2 run as a wrong password. Parameters match `Argon2::default()`.
const UNKNOWN_ACCOUNT_HASH: &str = "$argon2id$v=19$m=19456,t=2,p=1$P3byvjlVb2/H3lnvRQoqwA$IFB8Q87UsGwMfljnUB8QfBmB0vHUMHHD5CDbnHRxZyI";

/// Hash a password into an argon2 PHC string.
pub fn hash_password(password: &str) -> Result<String, ApiError> {
  let salt = SaltString::generate(&mut OsRng);
  Argon2::default()
    .hash_password(password.as_bytes(), &salt)
    .map(|h| h.to_string())
    .map_err(|e| ApiError::Hashing(e.to_string()))
}

/// Check `password` against a stored PHC string. Unparseable hashes never
/// verify.
pub fn verify_password(password: &str, hash: &str) -> bool {
  PasswordHash::new(hash)
    .map(|parsed| {
      Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
    })
    .unwrap_or(false)
}

/// Split a `Basic` header value into `(handle, password)`.
fn basic_credentials(headers: &HeaderMap) -> Result<Option<(String, String)>, ApiError> {
  let Some(value) = headers.get(header::AUTHORIZATION) else {
    return Ok(None);
  };
  let value = value.to_str().map_err(|_| ApiError::InvalidCredentials)?;
  let encoded = value
    .strip_prefix("Basic ")
    .ok_or(ApiError::InvalidCredentials)?;
  let decoded = B64.decode(encoded.trim()).map_err(|_| ApiError::InvalidCredentials)?;
  let creds = String::from_utf8(decoded).map_err(|_| ApiError::InvalidCredentials)?;
  let (handle, password) = creds.split_once(':').ok_or(ApiError::InvalidCredentials)?;
  Ok(Some((handle.to_owned(), password.to_owned())))
}

/// Resolve the caller for a request.
///
/// No header is an anonymous caller. A header that does not name an account
/// or whose password does not verify is rejected outright rather than
/// downgraded to anonymous.
pub async fn resolve_caller<S: NetStore>(
  headers: &HeaderMap,
  store:   &S,
) -> Result<Caller, ApiError> {
  let Some((handle, password)) = basic_credentials(headers)? else {
    return Ok(Caller::Anonymous);
  };

  let account = store
    .get_account_by_handle(&handle)
    .await
    .map_err(netpatrol_core::Error::store)?;
  let Some(account) = account else {
    verify_password(&password, UNKNOWN_ACCOUNT_HASH);
    tracing::debug!(handle = %handle, "no account for handle");
    return Err(ApiError::InvalidCredentials);
  };

  if !verify_password(&password, &account.credential_hash) {
    tracing::debug!(handle = %handle, "password did not verify");
    return Err(ApiError::InvalidCredentials);
  }
  Ok(Caller::account(account.account_id, account.handle))
}

impl<S> FromRequestParts<AppState<S>> for Identity
where
  S: NetStore + Clone + 'static,
{
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    state: &AppState<S>,
  ) -> Result<Self, Self::Rejection> {
    resolve_caller(&parts.headers, state.store.as_ref())
      .await
      .map(Identity)
  }
}

#[cfg(test)]
mod tests {
  use axum::http::HeaderValue;

  use super::*;

  fn headers(value: &str) -> HeaderMap {
    let mut h = HeaderMap::new();
    h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
    h
  }

  #[test]
  fn hashes_verify_only_their_password() {
    let hash = hash_password("tide-tables").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("tide-tables", &hash));
    assert!(!verify_password("tide-table", &hash));
    assert!(!verify_password("tide-tables", "not a phc string"));
  }

  #[test]
  fn unknown_account_hash_costs_a_default_verify() {
    let parsed = PasswordHash::new(UNKNOWN_ACCOUNT_HASH).unwrap();
    let params = argon2::Params::try_from(&parsed).unwrap();
    let default = Argon2::default();
    assert_eq!(parsed.algorithm.as_str(), "argon2id");
    assert_eq!(params.m_cost(), default.params().m_cost());
    assert_eq!(params.t_cost(), default.params().t_cost());
    assert_eq!(params.p_cost(), default.params().p_cost());
    assert!(!verify_password("", UNKNOWN_ACCOUNT_HASH));
  }

  #[test]
  fn parses_basic_credentials() {
    let value = format!("Basic {}", B64.encode("alice:s3:cret"));
    let creds = basic_credentials(&headers(&value)).unwrap();
    assert_eq!(creds, Some(("alice".to_owned(), "s3:cret".to_owned())));
    assert_eq!(basic_credentials(&HeaderMap::new()).unwrap(), None);
  }

  #[test]
  fn rejects_malformed_headers() {
    assert!(basic_credentials(&headers("Bearer abc")).is_err());
    assert!(basic_credentials(&headers("Basic ***")).is_err());
    let no_colon = format!("Basic {}", B64.encode("alice"));
    assert!(basic_credentials(&headers(&no_colon)).is_err());
  }
}
