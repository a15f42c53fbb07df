//! Handlers for `/settings`, `/audit`, and `/attachments` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/settings` | Requires `system:settings` |
//! | `PUT`  | `/settings` | Requires `system:settings`; whole document |
//! | `GET`  | `/audit` | Requires `system:settings`; `?entityType=&entityId=&user=&limit=` |
//! | `GET`  | `/attachments` | `?entityType=&entityId=`, both required |
//! | `POST` | `/attachments` | Metadata record; binaries live elsewhere |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gemba_core::{
  permission::Permission,
  store::FactoryStore,
  system::{Attachment, AuditEntry, AuditQuery, EntityKind, NewAttachment, SystemSettings},
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  caller::Auth,
  envelope::{Envelope, ok},
  error::ApiError,
};

// ─── Settings ────────────────────────────────────────────────────────────────

/// `GET /settings` — requires `system:settings`.
pub async fn get_settings<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
) -> Result<Json<Envelope<SystemSettings>>, ApiError> {
  auth.require(Permission::SystemSettings)?;
  let settings = store.get_settings().await.map_err(ApiError::from_store)?;
  Ok(ok(settings))
}

/// `PUT /settings` — requires `system:settings`. The whole document is
/// replaced; omitted fields fall back to their defaults.
pub async fn put_settings<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(settings): Json<SystemSettings>,
) -> Result<Json<Envelope<SystemSettings>>, ApiError> {
  auth.require(Permission::SystemSettings)?;
  let saved = store
    .put_settings(settings)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(saved))
}

// ─── Audit log ───────────────────────────────────────────────────────────────

/// `GET /audit[?entityType=&entityId=&user=&limit=]` — requires
/// `system:settings`.
pub async fn list_audit<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Query(query): Query<AuditQuery>,
) -> Result<Json<Envelope<Vec<AuditEntry>>>, ApiError> {
  auth.require(Permission::SystemSettings)?;
  let entries = store.list_audit(&query).await.map_err(ApiError::from_store)?;
  Ok(ok(entries))
}

// ─── Attachments ─────────────────────────────────────────────────────────────

/// Both filters are required; attachments are only ever read per entity.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttachmentParams {
  #[serde(rename = "entityType")]
  pub entity_kind: EntityKind,
  pub entity_id:   Uuid,
}

/// `GET /attachments?entityType=&entityId=`
pub async fn list_attachments<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(params): Query<AttachmentParams>,
) -> Result<Json<Envelope<Vec<Attachment>>>, ApiError> {
  let attachments = store
    .list_attachments(params.entity_kind, params.entity_id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(attachments))
}

/// `POST /attachments` — records metadata only; the binary is uploaded to
/// object storage out of band. The uploader defaults to the caller.
pub async fn add_attachment<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(mut input): Json<NewAttachment>,
) -> Result<impl IntoResponse, ApiError> {
  if input.uploaded_by.is_none() {
    input.uploaded_by = Some(auth.0.user_id);
  }
  let attachment = store
    .add_attachment(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, ok(attachment)))
}
