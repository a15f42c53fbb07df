//! API error type and its HTTP status mapping.

use axum::{
  Json,
  http::StatusCode,
  response::{IntoResponse, Response},
};
use gemba_core::{Error as CoreError, permission::Permission};
use serde_json::json;

/// Error type for API handlers.
///
/// Domain failures keep the [`gemba_core`] taxonomy so the status mapping
/// lives in one place; the first two variants belong to the session gate and
/// never originate in the store.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
  /// No valid session accompanied the request.
  #[error("authentication required")]
  Unauthorized,
  /// The session is valid but the role lacks a permission.
  #[error("missing permission: {}", .0.as_token())]
  Forbidden(Permission),
  /// A handler-level lookup miss.
  #[error("{0} not found")]
  NotFound(String),
  /// Domain failure surfaced by the store.
  #[error(transparent)]
  Core(#[from] CoreError),
}

impl ApiError {
  /// Converts a store error through the core taxonomy.
  pub fn from_store<E: Into<CoreError>>(err: E) -> Self {
    ApiError::Core(err.into())
  }

  fn status(&self) -> StatusCode {
    match self {
      ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
      ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
      ApiError::NotFound(_) => StatusCode::NOT_FOUND,
      ApiError::Core(err) => match err {
        CoreError::Invalid(_) => StatusCode::UNPROCESSABLE_ENTITY,
        CoreError::Duplicate { .. }
        | CoreError::DeleteBlocked { .. }
        | CoreError::SelfPrerequisite
        | CoreError::DuplicatePrerequisite => StatusCode::CONFLICT,
        CoreError::NotFound { .. } => StatusCode::NOT_FOUND,
        CoreError::UnknownPermission(_)
        | CoreError::Serialization(_)
        | CoreError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
      },
    }
  }
}

impl IntoResponse for ApiError {
  fn into_response(self) -> Response {
    let status = self.status();
    if status.is_server_error() {
      tracing::error!(error = %self, "request failed");
    }
    let body = Json(json!({
      "success": false,
      "error": self.to_string(),
    }));
    (status, body).into_response()
  }
}

// ─── Tests ───────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use gemba_core::Entity;
  use uuid::Uuid;

  use super::*;

  fn status_of(err: ApiError) -> StatusCode { err.status() }

  #[test]
  fn errors_map_to_expected_statuses() {
    assert_eq!(status_of(ApiError::Unauthorized), StatusCode::UNAUTHORIZED);
    assert_eq!(
      status_of(ApiError::Forbidden(Permission::SkillCreate)),
      StatusCode::FORBIDDEN
    );
    assert_eq!(
      status_of(ApiError::NotFound("skill WELD-01".into())),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status_of(ApiError::Core(CoreError::invalid("name must not be empty"))),
      StatusCode::UNPROCESSABLE_ENTITY
    );
    assert_eq!(
      status_of(ApiError::Core(CoreError::duplicate(Entity::Skill, "code"))),
      StatusCode::CONFLICT
    );
    assert_eq!(
      status_of(ApiError::Core(CoreError::not_found(
        Entity::Project,
        Uuid::nil()
      ))),
      StatusCode::NOT_FOUND
    );
    assert_eq!(
      status_of(ApiError::Core(CoreError::Storage("disk on fire".into()))),
      StatusCode::INTERNAL_SERVER_ERROR
    );
  }

  #[test]
  fn forbidden_names_the_missing_token() {
    let err = ApiError::Forbidden(Permission::SkillCategoryManage);
    assert_eq!(err.to_string(), "missing permission: skill_category:manage");
  }
}
