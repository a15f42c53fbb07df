//! Handlers for `/projects` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/projects` | `?search=&status=&department=&owner=`, newest first |
//! | `GET`    | `/projects/stats` | Aggregate counts |
//! | `GET`    | `/projects/{id}` | 404 if not found |
//! | `POST`   | `/projects` | Requires `project:create` |
//! | `PUT`    | `/projects/{id}` | Requires `project:update` |
//! | `DELETE` | `/projects/{id}` | Requires `project:delete` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gemba_core::{
  permission::Permission,
  project::{NewProject, Project, ProjectQuery, ProjectStats, ProjectSummary, ProjectUpdate},
  store::FactoryStore,
  system::{EntityKind, NewAuditEntry},
};
use serde_json::json;
use uuid::Uuid;

use crate::{
  caller::Auth,
  envelope::{Envelope, ok},
  error::ApiError,
  record_audit,
};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /projects[?search=&status=&department=&owner=]`
pub async fn list<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(query): Query<ProjectQuery>,
) -> Result<Json<Envelope<Vec<ProjectSummary>>>, ApiError> {
  let projects = store
    .list_projects(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(projects))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /projects/stats`
pub async fn stats<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
) -> Result<Json<Envelope<ProjectStats>>, ApiError> {
  let stats = store.project_stats().await.map_err(ApiError::from_store)?;
  Ok(ok(stats))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /projects/{id}`
pub async fn get_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<ProjectSummary>>, ApiError> {
  let project = store
    .get_project(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("project {id}")))?;
  Ok(ok(project))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /projects` — requires `project:create`.
pub async fn create<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(input): Json<NewProject>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = auth.require(Permission::ProjectCreate)?.user_id;
  let project = store
    .create_project(input)
    .await
    .map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Project,
    entity_id:   project.id,
    action:      "create".to_owned(),
    details:     Some(json!({ "name": project.name })),
  })
  .await;
  Ok((StatusCode::CREATED, ok(project)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /projects/{id}` — requires `project:update`.
pub async fn update_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
  Json(update): Json<ProjectUpdate>,
) -> Result<Json<Envelope<Project>>, ApiError> {
  let actor = auth.require(Permission::ProjectUpdate)?.user_id;
  let project = store
    .update_project(id, update)
    .await
    .map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Project,
    entity_id:   project.id,
    action:      "update".to_owned(),
    details:     Some(json!({ "name": project.name })),
  })
  .await;
  Ok(ok(project))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /projects/{id}` — requires `project:delete`.
pub async fn delete_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<()>>, ApiError> {
  let actor = auth.require(Permission::ProjectDelete)?.user_id;
  store.delete_project(id).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Project,
    entity_id:   id,
    action:      "delete".to_owned(),
    details:     None,
  })
  .await;
  Ok(ok(()))
}
