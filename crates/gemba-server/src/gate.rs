//! Request gate for page navigation.
//!
//! Every request passes through [`page_gate`] before routing. The gate only
//! checks that the session cookies *look* live (present, expiry stamp in the
//! future); actual verification against the session store happens downstream
//! in [`crate::auth::attach_caller`]. Keeping the gate cookie-only means
//! page redirects never cost a database round trip.

use axum::{
  extract::Request,
  http::HeaderMap,
  middleware::Next,
  response::{IntoResponse, Redirect, Response},
};
use chrono::Utc;
use gemba_api::ApiError;

use crate::auth;

/// Outcome of gating a single request path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateDecision {
  /// Let the request through to routing.
  Allow,
  /// Bounce an already-authenticated visitor to the dashboard.
  RedirectToDashboard,
  /// Send the visitor to the login page, optionally carrying the path to
  /// return to afterwards.
  RedirectToLogin(Option<String>),
}

/// The session cookie pair as read from the `Cookie` header.
///
/// `expiry_millis` mirrors the non-`HttpOnly` expiry cookie the login
/// handler sets alongside the token so that clients can observe their own
/// session lifetime.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionCookies {
  pub token:         Option<String>,
  pub expiry_millis: Option<i64>,
}

impl SessionCookies {
  pub fn from_headers(headers: &HeaderMap) -> Self {
    SessionCookies {
      token:         auth::cookie_value(headers, auth::SESSION_COOKIE),
      expiry_millis: auth::cookie_value(headers, auth::SESSION_EXP_COOKIE)
        .and_then(|raw| raw.parse().ok()),
    }
  }

  /// Presence check only. A token with no expiry cookie counts as live; the
  /// store still gets the final word when the session is resolved.
  fn plausibly_live(&self, now_millis: i64) -> bool {
    self.token.is_some()
      && self.expiry_millis.is_none_or(|expiry| expiry > now_millis)
  }
}

/// Paths reachable without any session.
fn is_public(path: &str) -> bool {
  const PUBLIC: &[&str] = &[
    "/api/auth/login",
    "/api/auth/logout",
    "/api/auth/me",
    "/api/health",
    "/design-system",
    "/compare",
  ];
  PUBLIC.iter().any(|prefix| {
    path == *prefix
      || path
        .strip_prefix(prefix)
        .is_some_and(|rest| rest.starts_with('/'))
  })
}

/// Static assets skip the gate entirely. Anything whose last segment carries
/// a file extension is treated as an asset.
fn is_static(path: &str) -> bool {
  path.starts_with("/assets/")
    || path == "/favicon.ico"
    || path.rsplit('/').next().is_some_and(|seg| seg.contains('.'))
}

/// Pure routing decision for one request. `now_millis` is the current time
/// as a Unix millisecond stamp, matching the expiry cookie's encoding.
pub fn evaluate(
  path: &str,
  cookies: &SessionCookies,
  now_millis: i64,
) -> GateDecision {
  let live = cookies.plausibly_live(now_millis);

  if path == "/" {
    return if live {
      GateDecision::RedirectToDashboard
    } else {
      GateDecision::RedirectToLogin(None)
    };
  }
  if path == "/login" {
    return if live {
      GateDecision::RedirectToDashboard
    } else {
      GateDecision::Allow
    };
  }
  if is_public(path) || is_static(path) {
    return GateDecision::Allow;
  }
  if live {
    GateDecision::Allow
  } else {
    GateDecision::RedirectToLogin(Some(path.to_owned()))
  }
}

/// Middleware wrapper around [`evaluate`].
///
/// API paths never see a `307`; a gated API request is answered with the
/// same `401` envelope the handlers produce. Page redirects to the login
/// screen also delete both session cookies so a stale pair cannot loop.
pub async fn page_gate(req: Request, next: Next) -> Response {
  let path = req.uri().path().to_owned();
  let cookies = SessionCookies::from_headers(req.headers());

  match evaluate(&path, &cookies, Utc::now().timestamp_millis()) {
    GateDecision::Allow => next.run(req).await,
    GateDecision::RedirectToDashboard => {
      Redirect::temporary("/dashboard").into_response()
    }
    GateDecision::RedirectToLogin(target) => {
      if path.starts_with("/api") {
        return ApiError::Unauthorized.into_response();
      }
      let location = match target {
        Some(target) => format!("/login?redirect={target}"),
        None => "/login".to_owned(),
      };
      let mut response = Redirect::temporary(&location).into_response();
      auth::clear_session_cookies(response.headers_mut());
      response
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  const NOW: i64 = 1_700_000_000_000;

  fn live() -> SessionCookies {
    SessionCookies {
      token:         Some("deadbeef".into()),
      expiry_millis: Some(NOW + 60_000),
    }
  }

  fn anonymous() -> SessionCookies { SessionCookies::default() }

  #[test]
  fn root_routes_by_session() {
    assert_eq!(
      evaluate("/", &anonymous(), NOW),
      GateDecision::RedirectToLogin(None)
    );
    assert_eq!(evaluate("/", &live(), NOW), GateDecision::RedirectToDashboard);
  }

  #[test]
  fn login_bounces_live_sessions() {
    assert_eq!(evaluate("/login", &anonymous(), NOW), GateDecision::Allow);
    assert_eq!(
      evaluate("/login", &live(), NOW),
      GateDecision::RedirectToDashboard
    );
  }

  #[test]
  fn expiry_cookie_governs_plausibility() {
    let stale = SessionCookies {
      token:         Some("deadbeef".into()),
      expiry_millis: Some(NOW - 1),
    };
    assert_eq!(
      evaluate("/dashboard", &stale, NOW),
      GateDecision::RedirectToLogin(Some("/dashboard".into()))
    );

    let no_expiry = SessionCookies {
      token:         Some("deadbeef".into()),
      expiry_millis: None,
    };
    assert_eq!(evaluate("/dashboard", &no_expiry, NOW), GateDecision::Allow);
  }

  #[test]
  fn public_and_static_paths_always_allow() {
    for path in [
      "/api/auth/login",
      "/api/health",
      "/design-system",
      "/design-system/tokens",
      "/compare",
      "/assets/app.css",
      "/favicon.ico",
      "/robots.txt",
    ] {
      assert_eq!(
        evaluate(path, &anonymous(), NOW),
        GateDecision::Allow,
        "{path} should be reachable without a session"
      );
    }
  }

  #[test]
  fn protected_pages_redirect_with_target() {
    assert_eq!(
      evaluate("/skills/catalog", &anonymous(), NOW),
      GateDecision::RedirectToLogin(Some("/skills/catalog".into()))
    );
    assert_eq!(evaluate("/skills/catalog", &live(), NOW), GateDecision::Allow);
  }

  #[test]
  fn api_paths_are_gated_like_pages() {
    assert_eq!(
      evaluate("/api/skills", &anonymous(), NOW),
      GateDecision::RedirectToLogin(Some("/api/skills".into()))
    );
    assert_eq!(evaluate("/api/skills", &live(), NOW), GateDecision::Allow);
  }
}
