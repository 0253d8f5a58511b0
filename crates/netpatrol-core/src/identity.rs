//! The acting caller of an operation.
//!
//! Resolution from a request (headers, sessions) belongs to the service
//! layer. The core consumes the result as a read-only fact.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

/// A resolved, authenticated account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CallerIdentity {
  pub account_id: Uuid,
  pub handle:     String,
}

/// Who is performing an operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Caller {
  #[default]
  Anonymous,
  Account(CallerIdentity),
}

impl Caller {
  pub fn account(account_id: Uuid, handle: impl Into<String>) -> Self {
    Self::Account(CallerIdentity { account_id, handle: handle.into() })
  }

  pub fn identity(&self) -> Option<&CallerIdentity> {
    match self {
      Self::Anonymous => None,
      Self::Account(id) => Some(id),
    }
  }

  /// The authenticated identity, or [`Error::Unauthenticated`].
  pub fn require(&self) -> Result<&CallerIdentity> {
    self.identity().ok_or(Error::Unauthenticated)
  }

  pub fn account_id(&self) -> Option<Uuid> {
    self.identity().map(|id| id.account_id)
  }
}
