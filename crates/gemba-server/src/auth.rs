//! Login, logout, and session plumbing.
//!
//! | Method | Path             | Notes                                   |
//! |--------|------------------|-----------------------------------------|
//! | POST   | /api/auth/login  | employee id + PIN, sets session cookies |
//! | POST   | /api/auth/logout | deletes the session, clears cookies     |
//! | GET    | /api/auth/me     | resolved caller and permission tokens   |
//!
//! The raw session token only ever lives in the cookie; the store sees its
//! SHA-256 digest. A companion non-`HttpOnly` expiry cookie carries the
//! session deadline as Unix milliseconds so clients can watch their own
//! clock without another round trip.

use std::sync::Arc;

use axum::{
  Json,
  extract::{Request, State},
  http::{HeaderMap, HeaderValue, StatusCode, header},
  middleware::Next,
  response::{IntoResponse, Response},
};
use chrono::{DateTime, Duration, Utc};
use gemba_api::{ApiError, Auth, Envelope, envelope::ok, pin, record_audit};
use gemba_core::{
  Error as CoreError,
  session::{Caller, NewSession},
  store::FactoryStore,
  system::{EntityKind, NewAuditEntry},
};
use rand_core::{OsRng, RngCore};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sha2::{Digest as _, Sha256};
use uuid::Uuid;

pub const SESSION_COOKIE: &str = "gemba_session";
pub const SESSION_EXP_COOKIE: &str = "gemba_session_exp";

const CLEAR_SESSION: &str =
  "gemba_session=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0";
const CLEAR_SESSION_EXP: &str =
  "gemba_session_exp=; Path=/; SameSite=Lax; Max-Age=0";

/// Failed attempts before the account locks.
const MAX_LOGIN_FAILURES: i64 = 5;
/// How long a lockout lasts.
const LOCKOUT_MINUTES: i64 = 15;

// ─── Cookies and tokens ──────────────────────────────────────────────────

/// 256-bit random token, hex-encoded.
fn new_token() -> String {
  let mut bytes = [0u8; 32];
  OsRng.fill_bytes(&mut bytes);
  hex::encode(bytes)
}

/// Hex SHA-256 of the raw token; this is what the store keys sessions by.
pub fn token_digest(token: &str) -> String {
  hex::encode(Sha256::digest(token.as_bytes()))
}

/// Returns the named cookie's value from the `Cookie` header, if present.
pub fn cookie_value(headers: &HeaderMap, name: &str) -> Option<String> {
  let raw = headers.get(header::COOKIE)?.to_str().ok()?;
  raw.split(';').find_map(|pair| {
    let (key, value) = pair.trim().split_once('=')?;
    (key == name).then(|| value.to_owned())
  })
}

fn append_session_cookies(
  headers: &mut HeaderMap,
  token: &str,
  expires_at: DateTime<Utc>,
  now: DateTime<Utc>,
) {
  let max_age = (expires_at - now).num_seconds().max(0);
  let session = format!(
    "{SESSION_COOKIE}={token}; Path=/; HttpOnly; SameSite=Lax; \
     Max-Age={max_age}"
  );
  let expiry = format!(
    "{SESSION_EXP_COOKIE}={}; Path=/; SameSite=Lax; Max-Age={max_age}",
    expires_at.timestamp_millis()
  );
  for cookie in [session, expiry] {
    if let Ok(value) = HeaderValue::from_str(&cookie) {
      headers.append(header::SET_COOKIE, value);
    }
  }
}

/// Expires both session cookies on the client.
pub fn clear_session_cookies(headers: &mut HeaderMap) {
  headers.append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_SESSION));
  headers
    .append(header::SET_COOKIE, HeaderValue::from_static(CLEAR_SESSION_EXP));
}

// ─── Wire types ──────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginBody {
  pub employee_id: String,
  pub pin:         String,
}

/// Caller identity as returned to the client.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallerPayload {
  pub id:          Uuid,
  pub employee_id: String,
  pub name:        String,
  pub role_name:   String,
  pub permissions: Vec<String>,
}

impl From<&Caller> for CallerPayload {
  fn from(caller: &Caller) -> Self {
    CallerPayload {
      id:          caller.user_id,
      employee_id: caller.employee_id.clone(),
      name:        caller.name.clone(),
      role_name:   caller.role_name.clone(),
      permissions: caller.permissions.tokens(),
    }
  }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginData {
  pub user:       CallerPayload,
  pub expires_at: DateTime<Utc>,
}

/// Deliberately vague: the response never says whether the employee id or
/// the PIN was wrong.
fn invalid_credentials() -> Response {
  (
    StatusCode::UNAUTHORIZED,
    Json(json!({ "success": false, "error": "invalid employee id or PIN" })),
  )
    .into_response()
}

fn account_locked() -> Response {
  (
    StatusCode::LOCKED,
    Json(json!({
      "success": false,
      "error": "account locked, try again later"
    })),
  )
    .into_response()
}

// ─── Login ───────────────────────────────────────────────────────────────

pub async fn login<S: FactoryStore>(
  State(store): State<Arc<S>>,
  Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
  let now = Utc::now();
  let Some(user) = store
    .get_user_by_employee_id(&body.employee_id)
    .await
    .map_err(ApiError::from_store)?
  else {
    return Ok(invalid_credentials());
  };
  if !user.is_active {
    return Ok(invalid_credentials());
  }
  if let Some(until) = user.locked_until {
    if until > now {
      return Ok(account_locked());
    }
  }

  if !pin::verify_pin(&body.pin, &user.pin_hash) {
    let failures = user.failed_login_attempts + 1;
    let locked_until = (failures >= MAX_LOGIN_FAILURES)
      .then(|| now + Duration::minutes(LOCKOUT_MINUTES));
    store
      .record_login_failure(user.id, locked_until)
      .await
      .map_err(ApiError::from_store)?;
    return Ok(if locked_until.is_some() {
      account_locked()
    } else {
      invalid_credentials()
    });
  }

  store
    .record_login_success(user.id)
    .await
    .map_err(ApiError::from_store)?;

  let settings = store.get_settings().await.map_err(ApiError::from_store)?;
  let expires_at = now + Duration::hours(settings.session.max_duration_hours);
  let token = new_token();
  let digest = token_digest(&token);
  store
    .create_session(NewSession {
      token_hash: digest.clone(),
      user_id:    user.id,
      expires_at,
    })
    .await
    .map_err(ApiError::from_store)?;

  // Piggyback housekeeping on logins rather than running a timer.
  if let Err(err) = store.sweep_expired_sessions(now).await {
    tracing::debug!(error = %err, "expired-session sweep failed");
  }

  let caller = store
    .resolve_caller(&digest, now)
    .await
    .map_err(ApiError::from_store)?
    .ok_or_else(|| {
      ApiError::Core(CoreError::Storage(
        "freshly created session did not resolve".into(),
      ))
    })?;

  record_audit(store.as_ref(), NewAuditEntry {
    user_id:     Some(user.id),
    entity_kind: EntityKind::User,
    entity_id:   user.id,
    action:      "login".into(),
    details:     None,
  })
  .await;

  let mut response =
    ok(LoginData { user: CallerPayload::from(&caller), expires_at })
      .into_response();
  append_session_cookies(response.headers_mut(), &token, expires_at, now);
  Ok(response)
}

// ─── Logout ──────────────────────────────────────────────────────────────

/// Always succeeds and always clears the cookies, even when no session row
/// existed.
pub async fn logout<S: FactoryStore>(
  State(store): State<Arc<S>>,
  headers: HeaderMap,
) -> Result<Response, ApiError> {
  if let Some(token) = cookie_value(&headers, SESSION_COOKIE) {
    let digest = token_digest(&token);
    let caller = store
      .resolve_caller(&digest, Utc::now())
      .await
      .map_err(ApiError::from_store)?;
    store.delete_session(&digest).await.map_err(ApiError::from_store)?;
    if let Some(caller) = caller {
      record_audit(store.as_ref(), NewAuditEntry {
        user_id:     Some(caller.user_id),
        entity_kind: EntityKind::User,
        entity_id:   caller.user_id,
        action:      "logout".into(),
        details:     None,
      })
      .await;
    }
  }

  let mut response = ok(()).into_response();
  clear_session_cookies(response.headers_mut());
  Ok(response)
}

// ─── Me ──────────────────────────────────────────────────────────────────

pub async fn me(Auth(caller): Auth) -> Json<Envelope<CallerPayload>> {
  ok(CallerPayload::from(&caller))
}

// ─── Middleware ──────────────────────────────────────────────────────────

/// Resolves the session cookie into a [`Caller`] request extension. Runs on
/// every request; downstream extractors and the page gate read the result.
pub async fn attach_caller<S: FactoryStore>(
  State(store): State<Arc<S>>,
  mut req: Request,
  next: Next,
) -> Response {
  if let Some(token) = cookie_value(req.headers(), SESSION_COOKIE) {
    match store.resolve_caller(&token_digest(&token), Utc::now()).await {
      Ok(Some(caller)) => {
        req.extensions_mut().insert(caller);
      }
      Ok(None) => {}
      Err(err) => {
        tracing::error!(error = %err, "failed to resolve session");
      }
    }
  }
  next.run(req).await
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn cookie_value_picks_the_named_pair() {
    let mut headers = HeaderMap::new();
    headers.insert(
      header::COOKIE,
      HeaderValue::from_static("theme=dark; gemba_session=abc123; other=1"),
    );
    assert_eq!(
      cookie_value(&headers, SESSION_COOKIE).as_deref(),
      Some("abc123")
    );
    assert_eq!(cookie_value(&headers, SESSION_EXP_COOKIE), None);
  }

  #[test]
  fn tokens_are_fresh_and_digests_stable() {
    let a = new_token();
    let b = new_token();
    assert_eq!(a.len(), 64);
    assert_ne!(a, b);
    assert_eq!(token_digest(&a), token_digest(&a));
    assert_ne!(token_digest(&a), token_digest(&b));
  }

  #[test]
  fn session_cookies_round_expiry_to_millis() {
    let now = Utc::now();
    let expires_at = now + Duration::hours(24);
    let mut headers = HeaderMap::new();
    append_session_cookies(&mut headers, "tok", expires_at, now);

    let cookies: Vec<_> = headers
      .get_all(header::SET_COOKIE)
      .iter()
      .map(|v| v.to_str().unwrap().to_owned())
      .collect();
    assert_eq!(cookies.len(), 2);
    assert!(cookies[0].starts_with("gemba_session=tok;"));
    assert!(cookies[0].contains("HttpOnly"));
    assert!(
      cookies[1]
        .starts_with(&format!("gemba_session_exp={}", expires_at.timestamp_millis()))
    );
    assert!(!cookies[1].contains("HttpOnly"));
  }
}
