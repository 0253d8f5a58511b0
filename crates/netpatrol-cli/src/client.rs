//! Async HTTP client wrapping the NetPatrol JSON API.

use anyhow::{Context, Result, anyhow};
use netpatrol_core::{
  model::{Account, AccountProfile, GhostNet, NetStatus, NewReport, ReassignmentRequest},
  negotiation::{IncomingRequestView, SentRequestView},
  stats::AccountStats,
  store::TransferOutcome,
};
use reqwest::{Client, Method, RequestBuilder};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::json;
use std::time::Duration;
use uuid::Uuid;

/// Connection settings for the NetPatrol API.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiConfig {
  pub base_url: String,
  pub username: String,
  pub password: String,
}

/// Error body returned by the server.
#[derive(Deserialize)]
struct ErrorBody {
  error: String,
}

/// Async HTTP client for the NetPatrol JSON API.
///
/// Cheap to clone; the inner [`reqwest::Client`] is `Arc`-based.
#[derive(Clone)]
pub struct ApiClient {
  client: Client,
  config: ApiConfig,
}

impl ApiClient {
  pub fn new(config: ApiConfig) -> Result<Self> {
    let client = Client::builder()
      .timeout(Duration::from_secs(30))
      .build()
      .context("failed to build HTTP client")?;
    Ok(Self { client, config })
  }

  fn url(&self, path: &str) -> String {
    format!("{}/api{}", self.config.base_url.trim_end_matches('/'), path)
  }

  /// Build a request, attaching Basic credentials when a user is configured.
  fn request(&self, method: Method, path: &str) -> RequestBuilder {
    let req = self.client.request(method, self.url(path));
    if self.config.username.is_empty() {
      req
    } else {
      req.basic_auth(&self.config.username, Some(&self.config.password))
    }
  }

  async fn checked(req: RequestBuilder, what: &str) -> Result<reqwest::Response> {
    tracing::debug!("{what}");
    let resp = req.send().await.with_context(|| format!("{what} failed"))?;
    let status = resp.status();
    if status.is_success() {
      return Ok(resp);
    }
    let message = resp
      .json::<ErrorBody>()
      .await
      .map(|b| b.error)
      .unwrap_or_default();
    Err(anyhow!("{what} → {status}: {message}"))
  }

  async fn fetch<T: DeserializeOwned>(&self, req: RequestBuilder, what: &str) -> Result<T> {
    Self::checked(req, what)
      .await?
      .json()
      .await
      .with_context(|| format!("deserialising response to {what}"))
  }

  // ── Accounts ──────────────────────────────────────────────────────────────

  /// `POST /api/accounts`, using the configured user and password.
  pub async fn signup(&self, display_name: &str, phone: Option<&str>) -> Result<AccountProfile> {
    let body = json!({
      "handle": self.config.username,
      "display_name": display_name,
      "phone": phone,
      "password": self.config.password,
    });
    let req = self.client.post(self.url("/accounts")).json(&body);
    self.fetch(req, "POST /accounts").await
  }

  /// `GET /api/accounts/current`
  pub async fn whoami(&self) -> Result<Account> {
    let req = self.request(Method::GET, "/accounts/current");
    self.fetch(req, "GET /accounts/current").await
  }

  // ── Ghost nets ────────────────────────────────────────────────────────────

  /// `GET /api/ghostnets[?status=<status>]`
  pub async fn list(&self, status: Option<NetStatus>) -> Result<Vec<GhostNet>> {
    let mut req = self.request(Method::GET, "/ghostnets");
    if let Some(s) = status {
      req = req.query(&[("status", s.as_str())]);
    }
    self.fetch(req, "GET /ghostnets").await
  }

  pub async fn my_reports(&self) -> Result<Vec<GhostNet>> {
    let req = self.request(Method::GET, "/ghostnets/my-reports");
    self.fetch(req, "GET /ghostnets/my-reports").await
  }

  pub async fn my_assignments(&self) -> Result<Vec<GhostNet>> {
    let req = self.request(Method::GET, "/ghostnets/my-assignments");
    self.fetch(req, "GET /ghostnets/my-assignments").await
  }

  /// `POST /api/ghostnets`
  pub async fn report(&self, report: &NewReport) -> Result<GhostNet> {
    let req = self.request(Method::POST, "/ghostnets").json(report);
    self.fetch(req, "POST /ghostnets").await
  }

  /// `PUT /api/ghostnets/{id}/{action}` for claim, recover and mark-missing.
  pub async fn transition(&self, id: Uuid, action: &str) -> Result<GhostNet> {
    let path = format!("/ghostnets/{id}/{action}");
    let req = self.request(Method::PUT, &path);
    self.fetch(req, &format!("PUT {path}")).await
  }

  /// `DELETE /api/ghostnets/{id}`
  pub async fn delete(&self, id: Uuid) -> Result<()> {
    let path = format!("/ghostnets/{id}");
    Self::checked(self.request(Method::DELETE, &path), &format!("DELETE {path}")).await?;
    Ok(())
  }

  /// `GET /api/ghostnets/stats`
  pub async fn stats(&self) -> Result<AccountStats> {
    let req = self.request(Method::GET, "/ghostnets/stats");
    self.fetch(req, "GET /ghostnets/stats").await
  }

  // ── Reassignment requests ─────────────────────────────────────────────────

  /// `POST /api/reassignment-requests`
  pub async fn request_reassignment(&self, net_id: Uuid) -> Result<ReassignmentRequest> {
    let req = self
      .request(Method::POST, "/reassignment-requests")
      .json(&json!({ "ghost_net_id": net_id }));
    self.fetch(req, "POST /reassignment-requests").await
  }

  pub async fn sent(&self) -> Result<Vec<SentRequestView>> {
    let req = self.request(Method::GET, "/reassignment-requests/sent");
    self.fetch(req, "GET /reassignment-requests/sent").await
  }

  pub async fn incoming(&self) -> Result<Vec<IncomingRequestView>> {
    let req = self.request(Method::GET, "/reassignment-requests/incoming");
    self.fetch(req, "GET /reassignment-requests/incoming").await
  }

  pub async fn accept(&self, id: Uuid) -> Result<TransferOutcome> {
    let path = format!("/reassignment-requests/{id}/accept");
    let req = self.request(Method::PUT, &path);
    self.fetch(req, &format!("PUT {path}")).await
  }

  pub async fn reject(&self, id: Uuid) -> Result<ReassignmentRequest> {
    let path = format!("/reassignment-requests/{id}/reject");
    let req = self.request(Method::PUT, &path);
    self.fetch(req, &format!("PUT {path}")).await
  }
}
