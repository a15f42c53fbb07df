//! Handlers for `/categories` endpoints.
//!
//! | Method   | Path | Notes |
//! |----------|------|-------|
//! | `GET`    | `/categories` | Optional `?kind=department\|area&active=` |
//! | `GET`    | `/categories/tree` | Nested tree with subtree skill counts |
//! | `GET`    | `/categories/stats` | Aggregate counts |
//! | `GET`    | `/categories/{id}` | 404 if not found |
//! | `GET`    | `/categories/slug/{slug}` | Shallowest match wins |
//! | `GET`    | `/categories/{id}/breadcrumbs` | Root-to-node trail |
//! | `POST`   | `/categories` | Requires `skill_category:manage` |
//! | `PUT`    | `/categories/{id}` | Requires `skill_category:manage` |
//! | `DELETE` | `/categories/{id}` | Requires `skill_category:manage` |

use std::sync::Arc;

use axum::{
  Json,
  extract::{Path, Query, State},
  http::StatusCode,
  response::IntoResponse,
};
use gemba_core::{
  category::{
    Category, CategoryDetail, CategoryQuery, CategoryStats, CategorySummary, CategoryUpdate,
    NewCategory,
  },
  permission::Permission,
  store::FactoryStore,
  system::{EntityKind, NewAuditEntry},
  tree::{CategoryCrumb, TreeIndex},
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

/// `GET /categories[?kind=&active=]`
pub async fn list<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(query): Query<CategoryQuery>,
) -> Result<Json<Envelope<Vec<CategorySummary>>>, ApiError> {
  let categories = store
    .list_categories(&query)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(categories))
}

// ─── Tree ────────────────────────────────────────────────────────────────────

/// One node of the nested category tree.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryNode {
  #[serde(flatten)]
  pub summary:             CategorySummary,
  /// Skills in this category and every descendant.
  pub subtree_skill_count: i64,
  pub children:            Vec<CategoryNode>,
}

fn category_node(index: &TreeIndex<CategorySummary>, row: &CategorySummary) -> CategoryNode {
  let id = row.category.id;
  CategoryNode {
    summary:             row.clone(),
    subtree_skill_count: index.subtree_sum(id, &|r| r.skill_count),
    children:            index
      .children(id)
      .map(|child| category_node(index, child))
      .collect(),
  }
}

/// `GET /categories/tree[?kind=&active=]`
pub async fn tree<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Query(query): Query<CategoryQuery>,
) -> Result<Json<Envelope<Vec<CategoryNode>>>, ApiError> {
  let categories = store
    .list_categories(&query)
    .await
    .map_err(ApiError::from_store)?;
  let index = TreeIndex::build(categories);
  let nodes: Vec<CategoryNode> =
    index.roots().map(|row| category_node(&index, row)).collect();
  Ok(ok(nodes))
}

// ─── Stats ───────────────────────────────────────────────────────────────────

/// `GET /categories/stats`
pub async fn stats<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
) -> Result<Json<Envelope<CategoryStats>>, ApiError> {
  let stats = store.category_stats().await.map_err(ApiError::from_store)?;
  Ok(ok(stats))
}

// ─── Get one ─────────────────────────────────────────────────────────────────

/// `GET /categories/{id}`
pub async fn get_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<CategoryDetail>>, ApiError> {
  let detail = store
    .get_category(id)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("category {id}")))?;
  Ok(ok(detail))
}

/// `GET /categories/slug/{slug}`
pub async fn get_by_slug<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(slug): Path<String>,
) -> Result<Json<Envelope<Category>>, ApiError> {
  let category = store
    .get_category_by_slug(&slug)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| ApiError::NotFound(format!("category with slug {slug:?}")))?;
  Ok(ok(category))
}

// ─── Breadcrumbs ─────────────────────────────────────────────────────────────

/// `GET /categories/{id}/breadcrumbs`
pub async fn breadcrumbs<S: FactoryStore>(
  State(store): State<Arc<S>>,
  _auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<Vec<CategoryCrumb>>>, ApiError> {
  let trail = store
    .category_breadcrumbs(id)
    .await
    .map_err(ApiError::from_store)?;
  Ok(ok(trail))
}

// ─── Create ──────────────────────────────────────────────────────────────────

/// `POST /categories` — requires `skill_category:manage`.
pub async fn create<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Json(input): Json<NewCategory>,
) -> Result<impl IntoResponse, ApiError> {
  let actor = auth.require(Permission::SkillCategoryManage)?.user_id;
  let category = store
    .create_category(input)
    .await
    .map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::SkillCategory,
    entity_id:   category.id,
    action:      "create".to_owned(),
    details:     Some(json!({ "name": category.name })),
  })
  .await;
  Ok((StatusCode::CREATED, ok(category)))
}

// ─── Update ──────────────────────────────────────────────────────────────────

/// `PUT /categories/{id}` — requires `skill_category:manage`.
pub async fn update_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
  Json(update): Json<CategoryUpdate>,
) -> Result<Json<Envelope<Category>>, ApiError> {
  let actor = auth.require(Permission::SkillCategoryManage)?.user_id;
  let category = store
    .update_category(id, update)
    .await
    .map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::SkillCategory,
    entity_id:   category.id,
    action:      "update".to_owned(),
    details:     Some(json!({ "name": category.name })),
  })
  .await;
  Ok(ok(category))
}

// ─── Delete ──────────────────────────────────────────────────────────────────

/// `DELETE /categories/{id}` — requires `skill_category:manage`.
pub async fn delete_one<S: FactoryStore>(
  State(store): State<Arc<S>>,
  auth: Auth,
  Path(id): Path<Uuid>,
) -> Result<Json<Envelope<()>>, ApiError> {
  let actor = auth.require(Permission::SkillCategoryManage)?.user_id;
  store.delete_category(id).await.map_err(ApiError::from_store)?;
  record_audit(&*store, NewAuditEntry {
    user_id:     Some(actor),
    entity_kind: EntityKind::SkillCategory,
    entity_id:   id,
    action:      "delete".to_owned(),
    details:     None,
  })
  .await;
  Ok(ok(()))
}
