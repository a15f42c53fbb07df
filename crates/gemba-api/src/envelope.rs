//! Response envelope shared by every endpoint.
//!
//! Successful responses are wrapped as `{ "success": true, "data": ... }`;
//! failures are rendered by [`ApiError`](crate::error::ApiError) as
//! `{ "success": false, "error": "..." }`. Clients can branch on `success`
//! without inspecting status codes.

use axum::Json;
use serde::Serialize;

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
  pub success: bool,
  pub data:    T,
}

/// Wraps `data` in a successful envelope.
pub fn ok<T: Serialize>(data: T) -> Json<Envelope<T>> {
  Json(Envelope { success: true, data })
}
