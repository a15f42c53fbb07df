//! HTTP server wiring for Gemba.
//!
//! Assembles the resource API from [`gemba_api`], the auth endpoints, the
//! cookie page gate, and session resolution into one axum [`Router`] backed
//! by any [`FactoryStore`].

pub mod auth;
pub mod gate;
pub mod seed;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Json, Router,
  http::StatusCode,
  middleware,
  routing::{get, post},
};
use gemba_core::store::FactoryStore;
use serde::Deserialize;
use serde_json::json;
use tower_http::trace::TraceLayer;

// ─── Configuration ───────────────────────────────────────────────────────

fn default_host() -> String { "127.0.0.1".to_owned() }
fn default_port() -> u16 { 8080 }
fn default_store_path() -> PathBuf { PathBuf::from("gemba.db") }

/// Runtime server configuration, deserialised from `config.toml` and the
/// `GEMBA_*` environment. Every field has a default so a bare binary boots.
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
  #[serde(default = "default_host")]
  pub host:       String,
  #[serde(default = "default_port")]
  pub port:       u16,
  #[serde(default = "default_store_path")]
  pub store_path: PathBuf,
  /// Verify the seed rows on boot.
  #[serde(default)]
  pub seed:       bool,
}

impl Default for ServerConfig {
  fn default() -> Self {
    ServerConfig {
      host:       default_host(),
      port:       default_port(),
      store_path: default_store_path(),
      seed:       false,
    }
  }
}

// ─── Router ──────────────────────────────────────────────────────────────

/// Build the full application router.
///
/// Layers run outside-in: request tracing, then the cookie page gate, then
/// session resolution, then routing. The gate reads only cookies, so a
/// redirected page request never touches the store.
pub fn router<S: FactoryStore + 'static>(store: Arc<S>) -> Router {
  let auth_routes = Router::new()
    .route("/api/auth/login", post(auth::login::<S>))
    .route("/api/auth/logout", post(auth::logout::<S>))
    .route("/api/auth/me", get(auth::me))
    .route("/api/health", get(health))
    .with_state(Arc::clone(&store));

  Router::new()
    .merge(auth_routes)
    .nest("/api", gemba_api::api_router(Arc::clone(&store)))
    .fallback(not_found)
    .layer(middleware::from_fn_with_state(store, auth::attach_caller::<S>))
    .layer(middleware::from_fn(gate::page_gate))
    .layer(TraceLayer::new_for_http())
}

async fn health() -> Json<serde_json::Value> { Json(json!({ "status": "ok" })) }

/// Page paths fall through here; no frontend is served from this binary.
async fn not_found() -> StatusCode { StatusCode::NOT_FOUND }

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, header},
  };
  use gemba_store_sqlite::SqliteStore;
  use serde_json::Value;
  use tower::ServiceExt as _;

  async fn make_store() -> Arc<SqliteStore> {
    let store = SqliteStore::open_in_memory().await.unwrap();
    seed::run(&store).await.unwrap();
    Arc::new(store)
  }

  async fn oneshot_raw(
    store: Arc<SqliteStore>,
    method: &str,
    uri: &str,
    headers: Vec<(header::HeaderName, String)>,
    body: &str,
  ) -> axum::response::Response {
    let mut builder = Request::builder().method(method).uri(uri);
    for (k, v) in headers {
      builder = builder.header(k, v);
    }
    let req = builder.body(Body::from(body.to_string())).unwrap();
    router(store).oneshot(req).await.unwrap()
  }

  async fn body_json(resp: axum::response::Response) -> Value {
    let bytes =
      axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
  }

  /// Extracts `gemba_session=<token>` from the login response's
  /// `Set-Cookie` headers.
  fn session_cookie(resp: &axum::response::Response) -> Option<String> {
    resp.headers().get_all(header::SET_COOKIE).iter().find_map(|v| {
      let v = v.to_str().ok()?;
      let rest = v.strip_prefix("gemba_session=")?;
      let token = rest.split(';').next()?;
      (!token.is_empty()).then(|| format!("gemba_session={token}"))
    })
  }

  async fn login(
    store: Arc<SqliteStore>,
    employee_id: &str,
    pin: &str,
  ) -> axum::response::Response {
    oneshot_raw(
      store,
      "POST",
      "/api/auth/login",
      vec![(header::CONTENT_TYPE, "application/json".to_owned())],
      &format!(r#"{{"employeeId":"{employee_id}","pin":"{pin}"}}"#),
    )
    .await
  }

  async fn admin_cookie(store: &Arc<SqliteStore>) -> String {
    let resp = login(Arc::clone(store), "ADMIN-001", "123456").await;
    assert_eq!(resp.status(), StatusCode::OK);
    session_cookie(&resp).expect("login should set a session cookie")
  }

  fn json_headers(cookie: &str) -> Vec<(header::HeaderName, String)> {
    vec![
      (header::COOKIE, cookie.to_owned()),
      (header::CONTENT_TYPE, "application/json".to_owned()),
    ]
  }

  // ── Health and gating ───────────────────────────────────────────────────

  #[tokio::test]
  async fn health_is_public() {
    let store = make_store().await;
    let resp = oneshot_raw(store, "GET", "/api/health", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["status"], "ok");
  }

  #[tokio::test]
  async fn api_requires_a_session() {
    let store = make_store().await;
    let resp = oneshot_raw(store, "GET", "/api/skills", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    let body = body_json(resp).await;
    assert_eq!(body["success"], false);
  }

  #[tokio::test]
  async fn page_gate_redirects() {
    let store = make_store().await;

    let resp =
      oneshot_raw(Arc::clone(&store), "GET", "/dashboard", vec![], "").await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
      resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
      "/login?redirect=/dashboard"
    );
    // A stale cookie pair is cleared on the way to the login page.
    assert!(resp.headers().get_all(header::SET_COOKIE).iter().count() >= 2);

    let cookie = admin_cookie(&store).await;
    let resp = oneshot_raw(
      Arc::clone(&store),
      "GET",
      "/",
      vec![(header::COOKIE, cookie.clone())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
      resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
      "/dashboard"
    );

    let resp = oneshot_raw(
      store,
      "GET",
      "/login",
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(
      resp.headers().get(header::LOCATION).unwrap().to_str().unwrap(),
      "/dashboard"
    );
  }

  // ── Login and logout ────────────────────────────────────────────────────

  #[tokio::test]
  async fn login_sets_cookies_and_me_resolves() {
    let store = make_store().await;
    let resp = login(Arc::clone(&store), "ADMIN-001", "123456").await;
    assert_eq!(resp.status(), StatusCode::OK);

    let cookies: Vec<_> = resp
      .headers()
      .get_all(header::SET_COOKIE)
      .iter()
      .map(|v| v.to_str().unwrap().to_owned())
      .collect();
    assert!(cookies.iter().any(|c| c.starts_with("gemba_session=")));
    assert!(cookies.iter().any(|c| c.starts_with("gemba_session_exp=")));

    let cookie = session_cookie(&resp).unwrap();
    let body = body_json(resp).await;
    assert_eq!(body["success"], true);
    assert_eq!(body["data"]["user"]["employeeId"], "ADMIN-001");

    let me = oneshot_raw(
      store,
      "GET",
      "/api/auth/me",
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(me.status(), StatusCode::OK);
    let body = body_json(me).await;
    assert_eq!(body["data"]["permissions"], json!(["*"]));
  }

  #[tokio::test]
  async fn login_rejects_a_wrong_pin() {
    let store = make_store().await;
    let resp = login(store, "ADMIN-001", "999999").await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  #[tokio::test]
  async fn login_locks_after_repeated_failures() {
    let store = make_store().await;
    for _ in 0..4 {
      let resp = login(Arc::clone(&store), "EMP-001", "999999").await;
      assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
    }
    let resp = login(Arc::clone(&store), "EMP-001", "999999").await;
    assert_eq!(resp.status(), StatusCode::LOCKED);

    // Even the right PIN is refused while the lockout holds.
    let resp = login(store, "EMP-001", "000000").await;
    assert_eq!(resp.status(), StatusCode::LOCKED);
  }

  #[tokio::test]
  async fn logout_clears_the_session() {
    let store = make_store().await;
    let cookie = admin_cookie(&store).await;

    let resp = oneshot_raw(
      Arc::clone(&store),
      "POST",
      "/api/auth/logout",
      vec![(header::COOKIE, cookie.clone())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let cleared: Vec<_> = resp
      .headers()
      .get_all(header::SET_COOKIE)
      .iter()
      .map(|v| v.to_str().unwrap().to_owned())
      .collect();
    assert!(cleared.iter().any(|c| c.contains("Max-Age=0")));

    let resp = oneshot_raw(
      store,
      "GET",
      "/api/auth/me",
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
  }

  // ── Permissions ─────────────────────────────────────────────────────────

  #[tokio::test]
  async fn permissions_gate_mutations() {
    let store = make_store().await;

    let emp = login(Arc::clone(&store), "EMP-001", "000000").await;
    assert_eq!(emp.status(), StatusCode::OK);
    let emp_cookie = session_cookie(&emp).unwrap();

    // Employees can read the catalog but not change it.
    let resp = oneshot_raw(
      Arc::clone(&store),
      "GET",
      "/api/categories",
      vec![(header::COOKIE, emp_cookie.clone())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = oneshot_raw(
      Arc::clone(&store),
      "POST",
      "/api/categories",
      json_headers(&emp_cookie),
      r#"{"name":"Welding"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::FORBIDDEN);

    let cookie = admin_cookie(&store).await;
    let resp = oneshot_raw(
      store,
      "POST",
      "/api/categories",
      json_headers(&cookie),
      r#"{"name":"Welding"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
  }

  // ── CRUD over HTTP ──────────────────────────────────────────────────────

  #[tokio::test]
  async fn crud_round_trip_over_http() {
    let store = make_store().await;
    let cookie = admin_cookie(&store).await;

    let resp = oneshot_raw(
      Arc::clone(&store),
      "POST",
      "/api/categories",
      json_headers(&cookie),
      r#"{"name":"Safety"}"#,
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);
    let root = body_json(resp).await;
    assert_eq!(root["data"]["slug"], "safety");
    let root_id = root["data"]["id"].as_str().unwrap().to_owned();

    let resp = oneshot_raw(
      Arc::clone(&store),
      "POST",
      "/api/categories",
      json_headers(&cookie),
      &format!(r#"{{"name":"Fire Safety","parentId":"{root_id}"}}"#),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = oneshot_raw(
      Arc::clone(&store),
      "POST",
      "/api/skills",
      json_headers(&cookie),
      &format!(
        r#"{{"name":"Extinguisher Handling","code":"EXT-101","categoryId":"{root_id}"}}"#
      ),
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CREATED);

    let resp = oneshot_raw(
      Arc::clone(&store),
      "GET",
      "/api/categories/tree",
      vec![(header::COOKIE, cookie.clone())],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let tree = body_json(resp).await;
    let roots = tree["data"].as_array().unwrap();
    let safety = roots.iter().find(|n| n["slug"] == "safety").unwrap();
    assert_eq!(safety["subtreeSkillCount"], 1);
    assert_eq!(safety["children"].as_array().unwrap().len(), 1);

    // A category with children cannot be deleted out from under them.
    let resp = oneshot_raw(
      Arc::clone(&store),
      "DELETE",
      &format!("/api/categories/{root_id}"),
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::CONFLICT);
  }

  // ── Audit and seeding ───────────────────────────────────────────────────

  #[tokio::test]
  async fn audit_records_logins() {
    let store = make_store().await;
    let cookie = admin_cookie(&store).await;

    let resp = oneshot_raw(
      store,
      "GET",
      "/api/audit",
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    let entries = body["data"].as_array().unwrap();
    assert!(entries.iter().any(|e| e["action"] == "login"));
  }

  #[tokio::test]
  async fn seeding_is_idempotent() {
    let store = make_store().await;
    seed::run(store.as_ref()).await.unwrap();

    let cookie = admin_cookie(&store).await;
    let resp = oneshot_raw(
      store,
      "GET",
      "/api/roles",
      vec![(header::COOKIE, cookie)],
      "",
    )
    .await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = body_json(resp).await;
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
  }
}
