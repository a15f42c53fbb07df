//! JSON REST API for Gemba.
//!
//! Exposes an axum [`Router`] backed by any
//! [`gemba_core::store::FactoryStore`]. Session resolution happens upstream:
//! the server's middleware verifies the session cookie and stashes a
//! [`gemba_core::session::Caller`] in request extensions, which handlers
//! pick up through the [`caller::Auth`] extractor. Transport concerns (TLS,
//! cookies, static assets) are the caller's responsibility.
//!
//! # Mounting
//!
//! ```rust,ignore
//! .nest("/api", gemba_api::api_router(store.clone()))
//! ```

pub mod caller;
pub mod categories;
pub mod departments;
pub mod envelope;
pub mod error;
pub mod pin;
pub mod projects;
pub mod skills;
pub mod system;
pub mod users;

use std::sync::Arc;

use axum::{
  Router,
  routing::{delete, get, post},
};
use gemba_core::{store::FactoryStore, system::NewAuditEntry};

pub use crate::{caller::Auth, envelope::Envelope, error::ApiError};

/// Records an audit entry, logging instead of failing the request when the
/// write itself fails.
pub async fn record_audit<S: FactoryStore>(store: &S, entry: NewAuditEntry) {
  if let Err(err) = store.record_audit(entry).await {
    tracing::warn!(error = %err, "failed to record audit entry");
  }
}

/// Build a fully-materialised API router for `store`.
///
/// The returned `Router<()>` can be nested into any parent router regardless
/// of its own state type.
pub fn api_router<S: FactoryStore + 'static>(store: Arc<S>) -> Router<()> {
  Router::new()
    // Categories
    .route(
      "/categories",
      get(categories::list::<S>).post(categories::create::<S>),
    )
    .route("/categories/tree", get(categories::tree::<S>))
    .route("/categories/stats", get(categories::stats::<S>))
    .route("/categories/slug/{slug}", get(categories::get_by_slug::<S>))
    .route(
      "/categories/{id}",
      get(categories::get_one::<S>)
        .put(categories::update_one::<S>)
        .delete(categories::delete_one::<S>),
    )
    .route(
      "/categories/{id}/breadcrumbs",
      get(categories::breadcrumbs::<S>),
    )
    // Skills
    .route("/skills", get(skills::list::<S>).post(skills::create::<S>))
    .route("/skills/tree", get(skills::tree::<S>))
    .route("/skills/stats", get(skills::stats::<S>))
    .route("/skills/code/{code}", get(skills::get_by_code::<S>))
    .route(
      "/skills/{id}",
      get(skills::get_one::<S>)
        .put(skills::update_one::<S>)
        .delete(skills::delete_one::<S>),
    )
    .route("/skills/{id}/breadcrumbs", get(skills::breadcrumbs::<S>))
    .route(
      "/skills/{id}/prerequisites",
      post(skills::add_prerequisite::<S>),
    )
    .route(
      "/skills/{id}/prerequisites/{prerequisite_id}",
      delete(skills::remove_prerequisite::<S>),
    )
    // Departments
    .route(
      "/departments",
      get(departments::list::<S>).post(departments::create::<S>),
    )
    .route(
      "/departments/{id}",
      get(departments::get_one::<S>)
        .put(departments::update_one::<S>)
        .delete(departments::delete_one::<S>),
    )
    // Roles (read-only)
    .route("/roles", get(users::list_roles::<S>))
    .route("/roles/{id}", get(users::get_role::<S>))
    // Users
    .route("/users", get(users::list::<S>).post(users::create::<S>))
    .route(
      "/users/{id}",
      get(users::get_one::<S>).put(users::update_one::<S>),
    )
    // Projects
    .route(
      "/projects",
      get(projects::list::<S>).post(projects::create::<S>),
    )
    .route("/projects/stats", get(projects::stats::<S>))
    .route(
      "/projects/{id}",
      get(projects::get_one::<S>)
        .put(projects::update_one::<S>)
        .delete(projects::delete_one::<S>),
    )
    // System
    .route(
      "/settings",
      get(system::get_settings::<S>).put(system::put_settings::<S>),
    )
    .route("/audit", get(system::list_audit::<S>))
    .route(
      "/attachments",
      get(system::list_attachments::<S>).post(system::add_attachment::<S>),
    )
    .with_state(store)
}
