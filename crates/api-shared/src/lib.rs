//! # API Shared
//!
//! Shared utilities and definitions for the HMS APIs.
//!
//! Contains:
//! - Wire types (`wire` module) with OpenAPI schemas and conversions from core models
//! - Shared services like `HealthService`
//! - API key authentication
//!
//! Used by `api-rest` and the `hms-run` binary.

pub mod auth;
pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
