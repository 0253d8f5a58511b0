//! JSON HTTP service for NetPatrol.
//!
//! Exposes an axum [`Router`] over any [`NetStore`]. Identity comes from HTTP
//! Basic credentials checked against each account's argon2 hash; requests
//! without an `Authorization` header run as [`Caller::Anonymous`].
//!
//! [`Caller::Anonymous`]: netpatrol_core::identity::Caller::Anonymous

pub mod auth;
pub mod error;
pub mod handlers;

pub use error::ApiError;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  extract::{Request, State},
  http::{HeaderValue, StatusCode, header},
  middleware::{self, Next},
  response::Response,
  routing::{get, post, put},
};
use netpatrol_core::store::NetStore;
use serde::Deserialize;
use tower_http::trace::TraceLayer;

use handlers::{accounts, ghostnets, requests};

/// Response header naming the ordering `GET /api/ghostnets` could honour.
pub const ORDERING_HEADER: &str = "x-netpatrol-ordering";

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `netpatrol.toml` and
/// `NETPATROL_*` environment variables.
#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
  pub host:       String,
  pub port:       u16,
  pub store_path: PathBuf,
  /// Realm advertised in `WWW-Authenticate` challenges.
  pub realm:      String,
}

impl Default for ServerConfig {
  fn default() -> Self {
    Self {
      host:       "127.0.0.1".to_string(),
      port:       8080,
      store_path: PathBuf::from("netpatrol.db"),
      realm:      "netpatrol".to_string(),
    }
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: NetStore> {
  pub store:  Arc<S>,
  pub config: Arc<ServerConfig>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build the axum [`Router`] for the service, mounted under `/api`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: NetStore + Clone + 'static,
{
  let api = Router::new()
    // Accounts
    .route("/accounts",                   post(accounts::register::<S>))
    .route("/accounts/current",           get(accounts::current::<S>).put(accounts::update_current::<S>))
    .route("/accounts/by-handle/{handle}", get(accounts::by_handle::<S>))
    .route("/accounts/{id}",              get(accounts::by_id::<S>))
    // Ghost nets
    .route("/ghostnets",                  get(ghostnets::list::<S>).post(ghostnets::report::<S>))
    .route("/ghostnets/my-reports",       get(ghostnets::my_reports::<S>))
    .route("/ghostnets/my-assignments",   get(ghostnets::my_assignments::<S>))
    .route("/ghostnets/stats",            get(ghostnets::my_stats::<S>))
    .route("/ghostnets/{id}",             get(ghostnets::get_one::<S>).delete(ghostnets::delete_one::<S>))
    .route("/ghostnets/{id}/claim",       put(ghostnets::claim::<S>))
    .route("/ghostnets/{id}/recover",     put(ghostnets::recover::<S>))
    .route("/ghostnets/{id}/mark-missing", put(ghostnets::mark_missing::<S>))
    // Reassignment requests
    .route("/reassignment-requests",              post(requests::create::<S>))
    .route("/reassignment-requests/sent",         get(requests::sent::<S>))
    .route("/reassignment-requests/incoming",     get(requests::incoming::<S>))
    .route("/reassignment-requests/{id}/accept",  put(requests::accept::<S>))
    .route("/reassignment-requests/{id}/reject",  put(requests::reject::<S>));

  Router::new()
    .nest("/api", api)
    .layer(middleware::from_fn_with_state(state.config.clone(), basic_challenge))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

/// Attach a `WWW-Authenticate` challenge to every 401.
async fn basic_challenge(
  State(config): State<Arc<ServerConfig>>,
  request: Request,
  next: Next,
) -> Response {
  let mut response = next.run(request).await;
  if response.status() == StatusCode::UNAUTHORIZED
    && let Ok(value) = HeaderValue::from_str(&format!("Basic realm=\"{}\"", config.realm))
  {
    response.headers_mut().insert(header::WWW_AUTHENTICATE, value);
  }
  response
}
