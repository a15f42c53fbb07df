//! Extractor for the authenticated caller.
//!
//! The server's session middleware resolves the session cookie and stashes a
//! [`Caller`] in request extensions before the router runs. Handlers that
//! declare an [`Auth`] argument get that caller, or a 401 when the middleware
//! left nothing behind.

use axum::{extract::FromRequestParts, http::request::Parts};
use gemba_core::{permission::Permission, session::Caller};

use crate::error::ApiError;

/// The caller attached to the current request.
#[derive(Debug, Clone)]
pub struct Auth(pub Caller);

impl Auth {
  /// Fails with 403 unless the caller's role grants `permission`.
  pub fn require(&self, permission: Permission) -> Result<&Caller, ApiError> {
    if self.0.can(permission) {
      Ok(&self.0)
    } else {
      Err(ApiError::Forbidden(permission))
    }
  }
}

impl<S: Send + Sync> FromRequestParts<S> for Auth {
  type Rejection = ApiError;

  async fn from_request_parts(
    parts: &mut Parts,
    _state: &S,
  ) -> Result<Self, Self::Rejection> {
    parts
      .extensions
      .get::<Caller>()
      .cloned()
      .map(Auth)
      .ok_or(ApiError::Unauthorized)
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use gemba_core::permission::PermissionSet;
  use uuid::Uuid;

  use super::*;

  fn caller(permissions: PermissionSet) -> Caller {
    Caller {
      user_id: Uuid::new_v4(),
      employee_id: "EMP-042".to_owned(),
      name: "Pat Fitter".to_owned(),
      role_name: "employee".to_owned(),
      permissions,
    }
  }

  #[test]
  fn require_honors_the_permission_set() {
    let auth = Auth(caller(
      [Permission::SkillView].into_iter().collect(),
    ));
    assert!(auth.require(Permission::SkillView).is_ok());
    assert!(matches!(
      auth.require(Permission::SkillCreate),
      Err(ApiError::Forbidden(Permission::SkillCreate))
    ));
  }

  #[test]
  fn wildcard_grants_everything() {
    let auth = Auth(caller(PermissionSet::All));
    assert!(auth.require(Permission::SystemSettings).is_ok());
    assert!(auth.require(Permission::UserDelete).is_ok());
  }
}
