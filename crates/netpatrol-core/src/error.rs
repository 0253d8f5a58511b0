//! Error types for `netpatrol-core`.
//!
//! Every failure carries enough context to be logged on its own, and maps onto
//! exactly one [`ErrorKind`] so the service layer can pick a response without
//! inspecting messages.

use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::model::{NetAction, NetStatus, RequestStatus};

/// The closed taxonomy every [`Error`] belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, strum::Display)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
  /// The referenced entity does not exist.
  NotFound,
  /// No resolved identity where one is required.
  Unauthorized,
  /// An identity is present but lacks the required relationship.
  Forbidden,
  /// The entity exists but its status disallows the transition.
  InvalidState,
  /// A concurrency invariant would be violated.
  Conflict,
  /// Required fields are missing or malformed.
  ValidationFailed,
  /// The store failed transiently; safe to retry.
  Unavailable,
}

impl ErrorKind {
  pub fn is_retryable(self) -> bool { matches!(self, Self::Unavailable) }
}

#[derive(Debug, Error)]
pub enum Error {
  #[error("ghost net not found: {0}")]
  GhostNetNotFound(Uuid),

  #[error("reassignment request not found: {0}")]
  RequestNotFound(Uuid),

  #[error("account not found: {0}")]
  AccountNotFound(Uuid),

  #[error("account not found: {0:?}")]
  AccountHandleNotFound(String),

  #[error("authentication required")]
  Unauthenticated,

  #[error("only the assigned salvor may recover ghost net {0}")]
  NotSalvor(Uuid),

  #[error("only the original reporter may delete ghost net {0}")]
  NotReporter(Uuid),

  #[error("only the current salvor may settle request {0}")]
  NotCurrentSalvor(Uuid),

  #[error("ghost net {0} is already assigned to the requester")]
  SelfReassignment(Uuid),

  #[error("cannot {action} ghost net {net_id} while it is {status}")]
  InvalidNetTransition {
    net_id: Uuid,
    status: NetStatus,
    action: NetAction,
  },

  #[error("request {request_id} is already {status}")]
  RequestSettled {
    request_id: Uuid,
    status:     RequestStatus,
  },

  #[error("ghost net {0} has no salvor to take over from")]
  NoSalvor(Uuid),

  #[error("ghost net {net_id} already has a pending request")]
  PendingRequestExists { net_id: Uuid },

  #[error("request {0} names a salvor who no longer holds the claim")]
  StaleRequest(Uuid),

  #[error("{entity} {id} was modified concurrently; giving up")]
  ConcurrentModification { entity: &'static str, id: Uuid },

  #[error("handle {0:?} is already taken")]
  HandleTaken(String),

  #[error("validation failed: {0}")]
  Validation(String),

  #[error("store error: {0}")]
  Store(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
  pub fn kind(&self) -> ErrorKind {
    match self {
      Self::GhostNetNotFound(_)
      | Self::RequestNotFound(_)
      | Self::AccountNotFound(_)
      | Self::AccountHandleNotFound(_) => ErrorKind::NotFound,
      Self::Unauthenticated => ErrorKind::Unauthorized,
      Self::NotSalvor(_)
      | Self::NotReporter(_)
      | Self::NotCurrentSalvor(_)
      | Self::SelfReassignment(_) => ErrorKind::Forbidden,
      Self::InvalidNetTransition { .. }
      | Self::RequestSettled { .. }
      | Self::NoSalvor(_) => ErrorKind::InvalidState,
      Self::PendingRequestExists { .. }
      | Self::StaleRequest(_)
      | Self::ConcurrentModification { .. }
      | Self::HandleTaken(_) => ErrorKind::Conflict,
      Self::Validation(_) => ErrorKind::ValidationFailed,
      Self::Store(_) => ErrorKind::Unavailable,
    }
  }

  /// Wrap a backend error. Store errors are always reported as
  /// [`ErrorKind::Unavailable`].
  pub fn store<E>(e: E) -> Self
  where
    E: std::error::Error + Send + Sync + 'static,
  {
    Self::Store(Box::new(e))
  }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
