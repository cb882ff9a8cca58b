//! Client-local dashboard preferences.
//!
//! "Clearing" the dashboard only hides entries created at or before the clear instant from
//! that one viewer's dashboard. The stores are never touched.

use crate::queue::QueueEntry;
use crate::{ClinicError, ClinicResult};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::Path;

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ViewPrefs {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dashboard_cleared_at: Option<DateTime<Utc>>,
}

impl ViewPrefs {
    pub fn hiding_before(at: Option<DateTime<Utc>>) -> Self {
        Self {
            dashboard_cleared_at: at,
        }
    }

    pub fn clear(&mut self, at: DateTime<Utc>) {
        self.dashboard_cleared_at = Some(at);
    }

    pub fn restore(&mut self) {
        self.dashboard_cleared_at = None;
    }

    pub fn hides(&self, entry: &QueueEntry) -> bool {
        self.dashboard_cleared_at
            .is_some_and(|cleared_at| entry.created_at <= cleared_at)
    }

    /// Reads preferences from a YAML file. A missing file yields the defaults.
    pub fn load(path: &Path) -> ClinicResult<Self> {
        let raw = match fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => return Err(ClinicError::FileRead(e)),
        };
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        serde_yaml::from_str(&raw).map_err(ClinicError::YamlDeserialization)
    }

    pub fn save(&self, path: &Path) -> ClinicResult<()> {
        let raw = serde_yaml::to_string(self).map_err(ClinicError::YamlSerialization)?;
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(ClinicError::FileWrite)?;
        }
        fs::write(path, raw).map_err(ClinicError::FileWrite)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use klinik_uuid::RecordId;
    use tempfile::TempDir;

    #[test]
    fn test_clear_hides_entries_created_at_or_before() {
        let now = Utc::now();
        let older = QueueEntry::create(RecordId::new(), 1, 15, now - Duration::minutes(5));
        let exact = QueueEntry::create(RecordId::new(), 2, 15, now);
        let newer = QueueEntry::create(RecordId::new(), 3, 15, now + Duration::seconds(1));

        let mut prefs = ViewPrefs::default();
        assert!(!prefs.hides(&older));

        prefs.clear(now);
        assert!(prefs.hides(&older));
        assert!(prefs.hides(&exact));
        assert!(!prefs.hides(&newer));

        prefs.restore();
        assert!(!prefs.hides(&older));
    }

    #[test]
    fn test_load_missing_file_is_default() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let prefs = ViewPrefs::load(&temp_dir.path().join("absent.yaml")).unwrap();
        assert_eq!(prefs, ViewPrefs::default());
    }

    #[test]
    fn test_save_then_load() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("nested").join("view_prefs.yaml");

        let mut prefs = ViewPrefs::default();
        prefs.clear(Utc::now());
        prefs.save(&path).unwrap();

        assert_eq!(ViewPrefs::load(&path).unwrap(), prefs);
    }

    #[test]
    fn test_malformed_file_is_reported() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let path = temp_dir.path().join("view_prefs.yaml");
        fs::write(&path, "dashboard_cleared_at: [not, a, time]").unwrap();
        assert!(matches!(
            ViewPrefs::load(&path),
            Err(ClinicError::YamlDeserialization(_))
        ));
    }
}
