//! Core runtime configuration.
//!
//! Configuration is resolved once at process startup and then passed into core services as an
//! `Arc<CoreConfig>`. Request handling never reads process-wide environment variables.
//!
//! The `*_from_env_value` functions are pure parsers over an optional raw value so they can be
//! tested without touching the real environment.

use crate::constants::{
    DEFAULT_ADMIN_PASSWORD, DEFAULT_ADMIN_USERNAME, DEFAULT_DATABASE_PATH, DEFAULT_DATA_DIR,
    DEFAULT_MINUTES_PER_SLOT, DEFAULT_POLL_INTERVAL_SECS,
};
use crate::{ClinicError, ClinicResult};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Which storage backend a deployment commits to.
///
/// The two schemas are not interoperable; switching backends starts from an empty store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BackendKind {
    /// SQLite tables with snake_case columns and foreign keys.
    Relational,
    /// In-process node tree with change listeners, snapshotted to JSON files.
    Tree,
}

impl FromStr for BackendKind {
    type Err = ClinicError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "relational" | "sql" | "sqlite" => Ok(Self::Relational),
            "tree" | "realtime" => Ok(Self::Tree),
            other => Err(ClinicError::InvalidInput(format!(
                "unknown backend '{other}' (expected 'relational' or 'tree')"
            ))),
        }
    }
}

/// The literal admin credential pair.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AdminCredentials {
    pub username: String,
    pub password: String,
}

impl AdminCredentials {
    /// Literal comparison of both fields. No hashing, no sessions.
    pub fn matches(&self, username: &str, password: &str) -> bool {
        self.username == username && self.password == password
    }
}

impl Default for AdminCredentials {
    fn default() -> Self {
        Self {
            username: DEFAULT_ADMIN_USERNAME.into(),
            password: DEFAULT_ADMIN_PASSWORD.into(),
        }
    }
}

/// Core configuration resolved at startup.
#[derive(Clone, Debug)]
pub struct CoreConfig {
    backend: BackendKind,
    database_path: PathBuf,
    data_dir: PathBuf,
    minutes_per_slot: u32,
    poll_interval: Duration,
    admin: AdminCredentials,
}

impl CoreConfig {
    /// Create a new `CoreConfig` with default queue timing and credentials.
    pub fn new(backend: BackendKind, database_path: PathBuf, data_dir: PathBuf) -> Self {
        Self {
            backend,
            database_path,
            data_dir,
            minutes_per_slot: DEFAULT_MINUTES_PER_SLOT,
            poll_interval: Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS),
            admin: AdminCredentials::default(),
        }
    }

    pub fn with_minutes_per_slot(mut self, minutes: u32) -> ClinicResult<Self> {
        if minutes == 0 {
            return Err(ClinicError::InvalidInput(
                "minutes per slot must be greater than zero".into(),
            ));
        }
        self.minutes_per_slot = minutes;
        Ok(self)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> ClinicResult<Self> {
        if interval.is_zero() {
            return Err(ClinicError::InvalidInput(
                "poll interval must be greater than zero".into(),
            ));
        }
        self.poll_interval = interval;
        Ok(self)
    }

    pub fn with_admin_credentials(mut self, admin: AdminCredentials) -> Self {
        self.admin = admin;
        self
    }

    pub fn backend(&self) -> BackendKind {
        self.backend
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn minutes_per_slot(&self) -> u32 {
        self.minutes_per_slot
    }

    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    pub fn admin(&self) -> &AdminCredentials {
        &self.admin
    }
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self::new(
            BackendKind::Relational,
            PathBuf::from(DEFAULT_DATABASE_PATH),
            PathBuf::from(DEFAULT_DATA_DIR),
        )
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

/// Parse the backend kind. `None` or blank selects the relational backend.
pub fn backend_kind_from_env_value(value: Option<String>) -> ClinicResult<BackendKind> {
    non_blank(value)
        .map(|v| v.parse::<BackendKind>())
        .transpose()
        .map(|kind| kind.unwrap_or(BackendKind::Relational))
}

/// Parse minutes per queue slot. `None` or blank selects [`DEFAULT_MINUTES_PER_SLOT`].
pub fn minutes_per_slot_from_env_value(value: Option<String>) -> ClinicResult<u32> {
    match non_blank(value) {
        None => Ok(DEFAULT_MINUTES_PER_SLOT),
        Some(v) => v
            .parse::<u32>()
            .map_err(|e| ClinicError::InvalidInput(format!("invalid minutes per slot '{v}': {e}"))),
    }
}

/// Parse the polling interval in whole seconds. `None` or blank selects the 30 second default.
pub fn poll_interval_from_env_value(value: Option<String>) -> ClinicResult<Duration> {
    match non_blank(value) {
        None => Ok(Duration::from_secs(DEFAULT_POLL_INTERVAL_SECS)),
        Some(v) => v
            .parse::<u64>()
            .map(Duration::from_secs)
            .map_err(|e| ClinicError::InvalidInput(format!("invalid poll interval '{v}': {e}"))),
    }
}

/// Resolve a full configuration from the process environment.
///
/// Intended to be called exactly once from a binary's `main`, after `.env` has been loaded.
///
/// # Errors
///
/// Returns [`ClinicError::InvalidInput`] if any variable is present but unparseable.
pub fn from_process_env() -> ClinicResult<CoreConfig> {
    let var = |name: &str| std::env::var(name).ok();

    let backend = backend_kind_from_env_value(var("KLINIK_BACKEND"))?;
    let database_path =
        non_blank(var("KLINIK_DB_PATH")).unwrap_or_else(|| DEFAULT_DATABASE_PATH.into());
    let data_dir = non_blank(var("KLINIK_DATA_DIR")).unwrap_or_else(|| DEFAULT_DATA_DIR.into());

    let defaults = AdminCredentials::default();
    let admin = AdminCredentials {
        username: non_blank(var("KLINIK_ADMIN_USERNAME")).unwrap_or(defaults.username),
        password: non_blank(var("KLINIK_ADMIN_PASSWORD")).unwrap_or(defaults.password),
    };

    CoreConfig::new(backend, database_path.into(), data_dir.into())
        .with_minutes_per_slot(minutes_per_slot_from_env_value(var(
            "KLINIK_MINUTES_PER_SLOT",
        ))?)?
        .with_poll_interval(poll_interval_from_env_value(var("KLINIK_POLL_SECS"))?)
        .map(|cfg| cfg.with_admin_credentials(admin))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_kind_defaults_to_relational() {
        assert_eq!(
            backend_kind_from_env_value(None).unwrap(),
            BackendKind::Relational
        );
        assert_eq!(
            backend_kind_from_env_value(Some("  ".into())).unwrap(),
            BackendKind::Relational
        );
    }

    #[test]
    fn test_backend_kind_parses_tree() {
        assert_eq!(
            backend_kind_from_env_value(Some("Tree".into())).unwrap(),
            BackendKind::Tree
        );
        assert!(backend_kind_from_env_value(Some("mongo".into())).is_err());
    }

    #[test]
    fn test_minutes_per_slot_default_and_override() {
        assert_eq!(minutes_per_slot_from_env_value(None).unwrap(), 15);
        assert_eq!(minutes_per_slot_from_env_value(Some("10".into())).unwrap(), 10);
        assert!(minutes_per_slot_from_env_value(Some("ten".into())).is_err());
    }

    #[test]
    fn test_zero_minutes_per_slot_rejected() {
        let err = CoreConfig::default().with_minutes_per_slot(0).unwrap_err();
        assert!(matches!(err, ClinicError::InvalidInput(_)));
    }

    #[test]
    fn test_poll_interval_default() {
        assert_eq!(
            poll_interval_from_env_value(None).unwrap(),
            Duration::from_secs(30)
        );
        assert!(CoreConfig::default()
            .with_poll_interval(Duration::ZERO)
            .is_err());
    }

    #[test]
    fn test_admin_credentials_compare_literally() {
        let admin = AdminCredentials::default();
        assert!(admin.matches("admin", "admin"));
        assert!(!admin.matches("admin", "Admin"));
        assert!(!admin.matches(" admin", "admin"));
    }

    #[test]
    fn test_default_admin_credentials() {
        let cfg = CoreConfig::default();
        assert_eq!(cfg.admin().username, "admin");
        assert_eq!(cfg.admin().password, "admin");
    }
}
