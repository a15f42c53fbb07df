//! Core types and trait definitions for the Gemba factory-organization
//! store.
//!
//! This crate is deliberately free of HTTP and database dependencies.
//! All other crates depend on it; it depends on nothing proprietary.

pub mod category;
pub mod error;
pub mod org;
pub mod permission;
pub mod project;
pub mod session;
pub mod skill;
pub mod store;
pub mod system;
pub mod tree;
pub mod validate;

pub use error::{Entity, Error, Result};
