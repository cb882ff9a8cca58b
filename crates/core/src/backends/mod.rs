//! Concrete storage backends.
//!
//! A deployment picks exactly one at startup via [`CoreConfig::backend`]; the two schemas are
//! not interoperable and there is no migration between them.

pub mod relational;
pub mod tree;

pub use relational::RelationalBackend;
pub use tree::TreeBackend;

use crate::config::{BackendKind, CoreConfig};
use crate::store::ClinicBackend;
use crate::ClinicResult;
use std::sync::Arc;

/// Opens the backend selected by `cfg`.
///
/// # Errors
///
/// Returns the backend's open error: a [`crate::ClinicError::Database`] for the relational
/// backend, or a file error for the tree backend's snapshot directory.
pub fn open_backend(cfg: &CoreConfig) -> ClinicResult<Arc<dyn ClinicBackend>> {
    let backend: Arc<dyn ClinicBackend> = match cfg.backend() {
        BackendKind::Relational => Arc::new(RelationalBackend::open(cfg.database_path())?),
        BackendKind::Tree => Arc::new(TreeBackend::open(cfg.data_dir())?),
    };
    tracing::info!(backend = backend.backend_name(), "opened clinic store");
    Ok(backend)
}
