//! Handlers for `/departments` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/departments` | Optional `?active=` |
//! | `GET`    | `/departments/{id}` | Detail with manager and members |
//! | `POST`   | `/departments` | Requires `department:manage` |
//! | `PUT`    | `/departments/{id}` | Requires `department:manage` |
//! | `DELETE` | `/departments/{id}` | Requires `department:manage` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gemba_core::{
  org::{Department, DepartmentDetail, DepartmentSummary, DepartmentUpdate, NewDepartment},
  permission::Permission,
  store::FactoryStore,
};
use serde::Deserialize;
use uuid::Uuid;

use crate::{
  caller::Auth,
  envelope::{Envelope, ok},
  error::ApiError,
};

// ─── List ────────────────────────────────────────────────────────────────────

#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
  #[serde(default)]
  pub active: Option<bool>,
}

/// `GET /departments[?active=]`
pub async fn list<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(params): Query<ListParams>,
) -> Result<Json<Envelope<Vec<DepartmentSummary>>>, ApiError> {
  let departments = store
    .list_departments(params.active)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(departments))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /departments/{id}`
pub async fn get_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<DepartmentDetail>>, ApiError> {
  let detail = store
    .get_department(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("department {id}")))?;
  Ok(ok(detail))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /departments` — requires `department:manage`.
pub async fn create<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(input): Json<NewDepartment>,
) -> Result<impl IntoResponse, ApiError> {
  auth.require(Permission::DepartmentManage)?;
  let department = store
    .create_department(input)
    .await
    .map_err(ApiError::from_store)?;
  Ok((StatusCode::CREATED, ok(department)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /departments/{id}` — requires `department:manage`.
pub async fn update_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
  Json(update): Json<DepartmentUpdate>,
) -> Result<Json<Envelope<Department>>, ApiError> {
  auth.require(Permission::DepartmentManage)?;
  let department = store
    .update_department(id, update)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(department))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /departments/{id}` — requires `department:manage`.
pub async fn delete_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<()>>, ApiError> {
  auth.require(Permission::DepartmentManage)?;
  store
    .delete_department(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(()))
}
