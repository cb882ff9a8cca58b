//! # Klinik Core
//!
//! Core business logic for the clinic queue system.
//!
//! This crate contains the domain records and every user action over them:
//! - Patient registration with atomically issued queue numbers
//! - Queue status transitions, cancellation and reordering
//! - Prescriptions and the pharmacy worklist
//! - The medicine catalog and self-service orders
//! - Admin login checks with an append-only audit log
//! - Pure projections for the queue board, dashboard and pharmacy screens
//!
//! Storage sits behind the traits in [`store`], with a relational (SQLite) backend and an
//! in-process tree backend that pushes change notifications.
//!
//! **No API concerns**: HTTP servers, request authentication and wire types belong in
//! `api-rest` or `api-shared`.

pub mod backends;
pub mod config;
pub mod constants;
pub mod error;
pub mod login;
pub mod medicine;
pub mod patient;
pub mod prescription;
pub mod projection;
pub mod queue;
pub mod refresh;
pub mod services;
pub mod store;
pub mod tree_store;
pub mod view_prefs;

pub use config::{AdminCredentials, BackendKind, CoreConfig};
pub use error::{ClinicError, ClinicResult};
pub use klinik_types::{NonEmptyText, TextError};
pub use klinik_uuid::RecordId;
pub use services::ClinicServices;
pub use store::ClinicBackend;
