//! Handlers for `/users` and `/roles` endpoints.
//!
//! | Method | Path | Notes |
//! |--------|------|-------|
//! | `GET`  | `/users` | Requires `user:view`; `?search=&department=&role=&active=` |
//! | `GET`  | `/users/{id}` | Requires `user:view` |
//! | `POST` | `/users` | Requires `user:create`; body carries a raw PIN |
//! | `PUT`  | `/users/{id}` | Requires `user:update`; employee id is immutable |
//! | `GET`  | `/roles` | Role list with permission tokens |
//! | `GET`  | `/roles/{id}` | 404 if not found |
//!
//! Raw PINs are hashed here and never reach the store; user payloads never
//! echo the stored hash back out.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gemba_core::{
  org::{NewUser, Role, User, UserQuery, UserSummary, UserUpdate},
  permission::Permission,
  store::FactoryStore,
  system::{EntityKind, NewAuditEntry},
};
use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
  caller::Auth,
  envelope::{Envelope, ok},
  error::ApiError,
  pin,
  record_audit,
};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /users[?search=&department=&role=&active=]` — requires `user:view`.
pub async fn list<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Query(query): Query<UserQuery>,
) -> Result<Json<Envelope<Vec<UserSummary>>>, ApiError> {
  auth.require(Permission::UserView)?;
  let users = store.list_users(&query).await.map_err(ApiError::from_store)?;
  Ok(ok(users))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /users/{id}` — requires `user:view`.
pub async fn get_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<UserSummary>>, ApiError> {
  auth.require(Permission::UserView)?;
  let user = store
    .get_user(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("user {id}")))?;
  Ok(ok(user))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /users` body. The raw PIN is validated and hashed before the store
/// sees anything.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBody {
  pub employee_id:   String,
  pub name:          String,
  #[serde(default)]
  pub email:         Option<String>,
  pub pin:           String,
  pub role_id:       Uuid,
  #[serde(default)]
  pub department_id: Option<Uuid>,
  #[serde(default)]
  pub is_active:     Option<bool>,
}

/// `POST /users` — requires `user:create`.
pub async fn create<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(body): Json<CreateBody>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = auth.require(Permission::UserCreate)?.user_id;
  let pin_hash = pin::hash_pin(&body.pin)?;
  let input = NewUser {
    employee_id:   body.employee_id,
    name:          body.name,
    email:         body.email,
    pin_hash,
    role_id:       body.role_id,
    department_id: body.department_id,
    is_active:     body.is_active,
  };
  let user = store.create_user(input).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::User,
    entity_id:   user.id,
    action:      "create".to_owned(),
    details:     Some(json!({ "employeeId": user.employee_id })),
  })
  .await;
  Ok((StatusCode::CREATED, ok(user)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /users/{id}` body. A present `pin` is re-hashed; a present empty
/// `email` clears the stored address.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBody {
  #[serde(default)]
  pub name:          Option<String>,
  #[serde(default)]
  pub email:         Option<String>,
  #[serde(default)]
  pub pin:           Option<String>,
  #[serde(default)]
  pub role_id:       Option<Uuid>,
  #[serde(default)]
  pub department_id: Option<Uuid>,
  #[serde(default)]
  pub is_active:     Option<bool>,
}

/// `PUT /users/{id}` — requires `user:update`.
pub async fn update_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
  Json(body): Json<UpdateBody>,
) -> Result<Json<Envelope<User>>, ApiError> {
  let actor = auth.require(Permission::UserUpdate)?.user_id;
  let pin_hash = match &body.pin {
    Some(raw) => Some(pin::hash_pin(raw)?),
    None => None,
  };
  let update = UserUpdate {
    name:          body.name,
    email:         body.email,
    pin_hash,
    role_id:       body.role_id,
    department_id: body.department_id,
    is_active:     body.is_active,
  };
  let user = store.update_user(id, update).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::User,
    entity_id:   user.id,
    action:      "update".to_owned(),
    details:     Some(json!({ "employeeId": user.employee_id })),
  })
  .await;
  Ok(ok(user))
}

// ─── Roles ───────────────────────────────────────────────────────────────────

/// `GET /roles`
pub async fn list_roles<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
) -> Result<Json<Envelope<Vec<Role>>>, ApiError> {
  let roles = store.list_roles().await.map_err(ApiError::from_store)?;
  Ok(ok(roles))
}

/// `GET /roles/{id}`
pub async fn get_role<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Role>>, ApiError> {
  let role = store
    .get_role(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("role {id}")))?;
  Ok(ok(role))
}
