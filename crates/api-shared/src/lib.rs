//! # API Shared
//!
//! Shared definitions for the Klinik HTTP surface.
//!
//! Contains:
//! - Request/response wire types with OpenAPI schemas (`wire` module)
//! - `HealthService` for the `/health` endpoint
//! - The admin header credential check
//!
//! Used by `api-rest` and the `klinik-run` binary.

pub mod auth;
pub mod health;
pub mod wire;

pub use health::HealthService;
pub use wire::*;
