//! Handlers for `/skills` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/skills` | Optional `?search=&category=&active=&root=` |
//! | `GET`    | `/skills/tree` | Nested tree, optional `?category=` |
//! | `GET`    | `/skills/stats` | Aggregate counts |
//! | `GET`    | `/skills/{id}` | 404 if not found |
//! | `GET`    | `/skills/code/{code}` | Lookup by code |
//! | `GET`    | `/skills/{id}/breadcrumbs` | Crosses into the category chain |
//! | `POST`   | `/skills` | Requires `skill:create` |
//! | `PUT`    | `/skills/{id}` | Requires `skill:update` |
//! | `DELETE` | `/skills/{id}` | Requires `skill:delete` |
//! | `POST`   | `/skills/{id}/prerequisites` | Requires `skill:update` |
//! | `DELETE` | `/skills/{id}/prerequisites/{prerequisite_id}` | Requires `skill:update` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gemba_core::{
  permission::Permission,
  skill::{
    NewPrerequisite, NewSkill, Skill, SkillDetail, SkillQuery, SkillStats, SkillSummary,
    SkillUpdate,
  },
  store::FactoryStore,
  system::{EntityKind, NewAuditEntry},
  tree::{SkillCrumb, TreeIndex},
};
use serde::Serialize;
use serde_json::json;
use uuid::Uuid;

use crate::{
  caller::Auth,
  envelope::{Envelope, ok},
  error::ApiError,
  record_audit,
};

// ─── List ────────────────────────────────────────────────────────────────────

/// `GET /skills[?search=&category=&active=&root=]`
pub async fn list<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(query): Query<SkillQuery>,
) -> Result<Json<Envelope<Vec<SkillSummary>>>, ApiError> {
  let skills = store.list_skills(&query).await.map_err(ApiError::from_store)?;
  Ok(ok(skills))
}

// ─── Tree ────────────────────────────────────────────────────────────────────

/// One node of the nested skill tree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SkillNode {
  #[serde(flatten)]
  pub summary:  SkillSummary,
  pub children: Vec<SkillNode>,
}

fn skill_node(index: &TreeIndex<SkillSummary>, row: &SkillSummary) -> SkillNode {
  let id = row.skill.id;
  SkillNode {
    summary:  row.clone(),
    children: index.children(id).map(|child| skill_node(index, child)).collect(),
  }
}

/// `GET /skills/tree[?category=&active=]`
pub async fn tree<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(query): Query<SkillQuery>,
) -> Result<Json<Envelope<Vec<SkillNode>>>, ApiError> {
  let skills = store.list_skills(&query).await.map_err(ApiError::from_store)?;
  let index = TreeIndex::build(skills);
  let nodes: Vec<SkillNode> = index.roots().map(|row| skill_node(&index, row)).collect();
  Ok(ok(nodes))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /skills/stats`
pub async fn stats<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
) -> Result<Json<Envelope<SkillStats>>, ApiError> {
  let stats = store.skill_stats().await.map_err(ApiError::from_store)?;
  Ok(ok(stats))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /skills/{id}`
pub async fn get_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<SkillDetail>>, ApiError> {
  let detail = store
    .get_skill(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("skill {id}")))?;
  Ok(ok(detail))
}

/// `GET /skills/code/{code}`
pub async fn get_by_code<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(code): Path<String>,
) -> Result<Json<Envelope<Skill>>, ApiError> {
  let skill = store
    .get_skill_by_code(&code)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("skill with code {code:?}")))?;
  Ok(ok(skill))
}

// ─── Breadcrumbs ─────────────────────────────────────────────────────────────

/// `GET /skills/{id}/breadcrumbs`
pub async fn breadcrumbs<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<SkillCrumb>>>, ApiError> {
  let trail = store
    .skill_breadcrumbs(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(trail))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /skills` — requires `skill:create`.
pub async fn create<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(input): Json<NewSkill>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = auth.require(Permission::SkillCreate)?.user_id;
  let skill = store.create_skill(input).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Skill,
    entity_id:   skill.id,
    action:      "create".to_owned(),
    details:     Some(json!({ "name": skill.name, "code": skill.code })),
  })
  .await;
  Ok((StatusCode::CREATED, ok(skill)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /skills/{id}` — requires `skill:update`.
pub async fn update_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
  Json(update): Json<SkillUpdate>,
) -> Result<Json<Envelope<Skill>>, ApiError> {
  let actor = auth.require(Permission::SkillUpdate)?.user_id;
  let skill = store.update_skill(id, update).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Skill,
    entity_id:   skill.id,
    action:      "update".to_owned(),
    details:     Some(json!({ "name": skill.name, "code": skill.code })),
  })
  .await;
  Ok(ok(skill))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /skills/{id}` — requires `skill:delete`.
pub async fn delete_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<()>>, ApiError> {
  let actor = auth.require(Permission::SkillDelete)?.user_id;
  store.delete_skill(id).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Skill,
    entity_id:   id,
    action:      "delete".to_owned(),
    details:     None,
  })
  .await;
  Ok(ok(()))
}

// ─── Prerequisites ───────────────────────────────────────────────────────────

/// `POST /skills/{id}/prerequisites` — requires `skill:update`.
pub async fn add_prerequisite<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
  Json(input): Json<NewPrerequisite>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = auth.require(Permission::SkillUpdate)?.user_id;
  let edge = store
    .add_prerequisite(id, input)
    .await
    .map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Skill,
    entity_id:   id,
    action:      "prerequisite_add".to_owned(),
    details:     Some(json!({ "prerequisiteSkillId": edge.prerequisite_skill_id })),
  })
  .await;
  Ok((StatusCode::CREATED, ok(edge)))
}

/// `DELETE /skills/{id}/prerequisites/{prerequisite_id}` — requires
/// `skill:update`.
pub async fn remove_prerequisite<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path((id, prerequisite_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Envelope<()>>, ApiError> {
  let actor = auth.require(Permission::SkillUpdate)?.user_id;
  store
    .remove_prerequisite(id, prerequisite_id)
    .await
    .map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::Skill,
    entity_id:   id,
    action:      "prerequisite_remove".to_owned(),
    details:     Some(json!({ "prerequisiteId": prerequisite_id })),
  })
  .await;
  Ok(ok(()))
}
