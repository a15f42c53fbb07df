//! Sessions and the resolved caller identity.
//!
//! Sessions are plain rows keyed by a digest of the cookie token; the raw
//! token never touches the store. Expiry is enforced on lookup, and expired
//! rows are swept opportunistically.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::permission::{Permission, PermissionSet};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRecord {
  /// Hex SHA-256 of the raw cookie token.
  pub token_hash: String,
  pub user_id:    Uuid,
  pub created_at: DateTime<Utc>,
  pub expires_at: DateTime<Utc>,
}

impl SessionRecord {
  pub fn is_expired(&self, now: DateTime<Utc>) -> bool { self.expires_at <= now }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewSession {
  pub token_hash: String,
  pub user_id:    Uuid,
  pub expires_at: DateTime<Utc>,
}

/// The authenticated principal attached to a request after session
/// verification.
#[derive(Debug, Clone)]
pub struct Caller {
  pub user_id:     Uuid,
  pub employee_id: String,
  pub name:        String,
  pub role_name:   String,
  pub permissions: PermissionSet,
}

impl Caller {
  pub fn can(&self, permission: Permission) -> bool {
    self.permissions.allows(permission)
  }
}
