//! Handlers for `/reassignment-requests` endpoints.

use axum::{
  Json,
  extract::State,
  http::StatusCode,
  response::IntoResponse,
};
use netpatrol_core::{
  model::ReassignmentRequest,
  negotiation::{self, IncomingRequestView, SentRequestView},
  store::{NetStore, TransferOutcome},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  AppState, ApiError,
  auth::Identity,
  handlers::{ApiJson, ApiPath},
};

#[derive(Debug, Deserialize)]
pub struct CreateBody {
  pub ghost_net_id: Uuid,
}

/// `POST /reassignment-requests`: body `{"ghost_net_id":"…"}`
pub async fn create<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiJson(body): ApiJson<CreateBody>,
) -> Result<impl IntoResponse, ApiError>
where
  S: NetStore + Clone + 'static,
{
  let request =
    negotiation::create(state.store.as_ref(), &caller, body.ghost_net_id).await?;
  Ok((StatusCode::CREATED, Json(request)))
}

/// `GET /reassignment-requests/sent`
pub async fn sent<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
) -> Result<Json<Vec<SentRequestView>>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(negotiation::sent_by_me(state.store.as_ref(), &caller).await?))
}

/// `GET /reassignment-requests/incoming`
pub async fn incoming<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
) -> Result<Json<Vec<IncomingRequestView>>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(negotiation::incoming_to_me(state.store.as_ref(), &caller).await?))
}

/// `PUT /reassignment-requests/{id}/accept`
pub async fn accept<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<TransferOutcome>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(negotiation::accept(state.store.as_ref(), &caller, id).await?))
}

/// `PUT /reassignment-requests/{id}/reject`
pub async fn reject<S>(
  State(state): State<AppState<S>>,
  Identity(caller): Identity,
  ApiPath(id): ApiPath<Uuid>,
) -> Result<Json<ReassignmentRequest>, ApiError>
where
  S: NetStore + Clone + 'static,
{
  Ok(Json(negotiation::reject(state.store.as_ref(), &caller, id).await?))
}
