//! Handlers for `/accounts` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `POST` | `/accounts` | Body: `{"handle","display_name","phone"?,"password"}` |
//! | `GET`  | `/accounts/current` | The authenticated account |
//! | `PUT`  | `/accounts/current` | Body: `{"display_name","phone"?}` |
//! | `GET`  | `/accounts/{id}` | Public profile |
//! | `GET`  | `/accounts/by-handle/{handle}` | Public profile |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use netpatrol_core::{
  Error, accounts,
  model::{Account, AccountProfile, ContactUpdate, NewAccount},
  store::NetStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, ApiError,
  auth::{Identity, hash_password},
  handlers::{ApiJson, ApiPath},
};

#[derive(Debug, Deserialize)]
pub struct SignupBody {
  pub handle:       String,
  pub display_name: String,
  pub phone:        Option<String>,
  pub password:     String,
}

/// `POST /accounts`
pub async fn register<S>(
  State(state): State<AppState<S>>,
  ApiJson(body): ApiJson<SignupBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NetStore + Clone + 'static,
{
  if body.password.is_empty() {
    return Err(Error::Validation("password must not be empty".into()).into());
  }
  let credential_hash = hash_password(&body.password)?;
  let account = accounts::register(state.store.as_ref(), NewAccount {
    handle: body.handle,
    display_name: body.display_name,
    phone: body.phone,
    credential_hash,
  })
  .await?;
  Ok((StatusCode::CREATED, Json(AccountProfile::from(account))))
}

/// `GET /accounts/current`
pub async fn current<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
) -> Result<Json<Account>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(accounts::current(state.store.as_ref(), &caller).await?))
}

/// `PUT /accounts/current`
pub async fn update_current<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiJson(update): ApiJson<ContactUpdate>,
) -> Result<Json<Account>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(
    accounts::update_contact(state.store.as_ref(), &caller, update).await?,
  ))
}

/// `GET /accounts/{id}`
pub async fn by_id<S>(
  State(state): State<AppState<S>>,
  _: Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<AccountProfile>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(accounts::get_by_id(state.store.as_ref(), id).await?))
}

/// `GET /accounts/by-handle/{handle}`
pub async fn by_handle<S>(
  State(state): State<AppState<S>>,
  _: Identity,
  ApiPath(handle): ApiPath<String>,
) -> Result<Json<AccountProfile>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(accounts::get_by_handle(state.store.as_ref(), &handle).await?))
}
