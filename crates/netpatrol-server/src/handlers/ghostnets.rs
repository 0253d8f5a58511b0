//! Handlers for `/ghostnets` endpoints.
//!
//! Public reads still resolve the caller, so bad credentials are a 401.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`    | `/ghostnets` | Optional `?status=REPORTED\|SALVAGE_PENDING\|RECOVERED\|MISSING` |
//! | `POST`   | `/ghostnets` | Anonymous reports allowed |
//! | `GET`    | `/ghostnets/{id}` | 404 if not found |
//! | `DELETE` | `/ghostnets/{id}` | Reporter only |
//! | `GET`    | `/ghostnets/my-reports` | |
//! | `GET`    | `/ghostnets/my-assignments` | |
//! | `GET`    | `/ghostnets/stats` | |
//! | `PUT`    | `/ghostnets/{id}/claim`, `/recover`, `/mark-missing` | |

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use netpatrol_core::{
  lifecycle,
  model::{GhostNet, NetStatus, NewReport},
  stats::{self, AccountStats},
  store::NetStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, ApiError, ORDERING_HEADER,
  auth::Identity,
  handlers::{ApiJson, ApiPath, ApiQuery},
};

// ─── Reads ────────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct ListParams {
  pub status: Option<NetStatus>,
}

/// `GET /ghostnets[?status=<status>]`
///
/// The unfiltered listing reports the ordering it achieved in
/// [`ORDERING_HEADER`].
pub async fn list<S>(
  State(state): State<AppState<S>>,
  _: Identity,
  ApiQuery(params): ApiQuery<ListParams>,
) -> Result<Response, ApiError>
where
  S: NetStore + Clone + 'static,
{
  if let Some(status) = params.status {
    let nets = lifecycle::list_by_status(state.store.as_ref(), status).await?;
    return Ok(Json(nets).into_response());
  }
  let listing = lifecycle::list(state.store.as_ref()).await?;
  Ok(([(ORDERING_HEADER, listing.ordering.to_string())], Json(listing.nets)).into_response())
}

/// `GET /ghostnets/{id}`
pub async fn get_one<S>(
  State(state): State<AppState<S>>,
  _: Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GhostNet>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(lifecycle::get(state.store.as_ref(), id).await?))
}

/// `GET /ghostnets/my-reports`
pub async fn my_reports<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
) -> Result<Json<Vec<GhostNet>>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(lifecycle::list_reported_by_me(state.store.as_ref(), &caller).await?))
}

/// `GET /ghostnets/my-assignments`
pub async fn my_assignments<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
) -> Result<Json<Vec<GhostNet>>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(lifecycle::list_assigned_to_me(state.store.as_ref(), &caller).await?))
}

/// `GET /ghostnets/stats`
pub async fn my_stats<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
) -> Result<Json<AccountStats>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(stats::account_stats(state.store.as_ref(), &caller).await?))
}

// ─── Writes ───────────────────────────────────────────────────────────────────

/// `POST /ghostnets`
pub async fn report<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiJson(body): ApiJson<NewReport>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NetStore + Clone + 'static,
{
  let net = lifecycle::report(state.store.as_ref(), &caller, body).await?;
  Ok((StatusCode::CREATED, Json(net)))
}

/// `DELETE /ghostnets/{id}`
pub async fn delete_one<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<StatusCode, ApiError>
where
  S: NetStore + Clone + 'static,
{
  lifecycle::delete(state.store.as_ref(), &caller, id).await?;
  Ok(StatusCode::NO_CONTENT)
}

/// `PUT /ghostnets/{id}/claim`
pub async fn claim<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GhostNet>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(lifecycle::claim(state.store.as_ref(), &caller, id).await?))
}

/// `PUT /ghostnets/{id}/recover`
pub async fn recover<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GhostNet>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(lifecycle::recover(state.store.as_ref(), &caller, id).await?))
}

/// `PUT /ghostnets/{id}/mark-missing`
pub async fn mark_missing<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<GhostNet>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(lifecycle::mark_missing(state.store.as_ref(), &caller, id).await?))
}
