//! In-process hierarchical JSON store with change notifications.
//!
//! Data is addressed by slash-separated paths (`queue_entries/<id>/status`). Every write
//! publishes a [`StoreChange`] on a broadcast channel so subscribers can re-read instead of
//! polling. When opened on a directory, each top-level node is snapshotted to
//! `<dir>/<node>.json` after every write to that node and reloaded on open.
//!
//! All operations take the tree lock for their full duration, so [`TreeStore::transaction`]
//! is a true read-modify-write: no other write can interleave between the read and the commit.

use crate::constants::CHANGE_FEED_CAPACITY;
use crate::store::StoreChange;
use crate::{ClinicError, ClinicResult};
use serde_json::{Map, Value};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::broadcast;

const SNAPSHOT_EXTENSION: &str = "json";

pub struct TreeStore {
    root: RwLock<Map<String, Value>>,
    snapshot_dir: Option<PathBuf>,
    changes: broadcast::Sender<StoreChange>,
}

impl TreeStore {
    /// A store that lives only as long as the process.
    pub fn in_memory() -> Self {
        Self::with_root(Map::new(), None)
    }

    /// Opens (creating if needed) a snapshot directory and loads every `<node>.json` in it.
    ///
    /// # Errors
    ///
    /// Returns [`ClinicError::FileWrite`] if the directory cannot be created,
    /// [`ClinicError::FileRead`] if a snapshot cannot be read, or
    /// [`ClinicError::Deserialization`] if a snapshot is not valid JSON.
    pub fn open(dir: &Path) -> ClinicResult<Self> {
        fs::create_dir_all(dir).map_err(ClinicError::FileWrite)?;

        let mut root = Map::new();
        for entry in fs::read_dir(dir).map_err(ClinicError::FileRead)? {
            let path = entry.map_err(ClinicError::FileRead)?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(SNAPSHOT_EXTENSION) {
                continue;
            }
            let Some(node) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            let raw = fs::read_to_string(&path).map_err(ClinicError::FileRead)?;
            let value: Value = serde_json::from_str(&raw).map_err(|e| {
                ClinicError::Deserialization(format!("{}: {e}", path.display()))
            })?;
            root.insert(node.to_string(), value);
        }

        tracing::debug!(dir = %dir.display(), nodes = root.len(), "loaded tree store snapshot");
        Ok(Self::with_root(root, Some(dir.to_path_buf())))
    }

    fn with_root(root: Map<String, Value>, snapshot_dir: Option<PathBuf>) -> Self {
        let (changes, _) = broadcast::channel(CHANGE_FEED_CAPACITY);
        Self {
            root: RwLock::new(root),
            snapshot_dir,
            changes,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        self.changes.subscribe()
    }

    pub fn get(&self, path: &str) -> ClinicResult<Option<Value>> {
        let segments = split_path(path)?;
        let root = self.read()?;
        Ok(lookup(&root, &segments).cloned())
    }

    /// Child key/value pairs of the node at `path`, sorted by key. Empty if absent.
    pub fn children(&self, path: &str) -> ClinicResult<Vec<(String, Value)>> {
        let segments = split_path(path)?;
        let root = self.read()?;
        let mut out: Vec<(String, Value)> = match lookup(&root, &segments) {
            Some(Value::Object(map)) => map.iter().map(|(k, v)| (k.clone(), v.clone())).collect(),
            _ => Vec::new(),
        };
        out.sort_by(|a, b| a.0.cmp(&b.0));
        Ok(out)
    }

    /// Replaces whatever is at `path`, creating intermediate nodes.
    pub fn set(&self, path: &str, value: Value) -> ClinicResult<()> {
        let segments = split_path(path)?;
        let mut root = self.write()?;
        self.commit(&mut root, &segments, path, |node| {
            insert_at(node, &segments, value)?;
            Ok(true)
        })?;
        Ok(())
    }

    /// Merges `fields` into the object at `path`. Returns `false` (and writes nothing) if
    /// there is no object there.
    pub fn update(&self, path: &str, fields: Map<String, Value>) -> ClinicResult<bool> {
        let segments = split_path(path)?;
        let mut root = self.write()?;
        self.commit(&mut root, &segments, path, |node| {
            match lookup_mut(node, &segments).and_then(Value::as_object_mut) {
                Some(target) => {
                    target.extend(fields);
                    Ok(true)
                }
                None => Ok(false),
            }
        })
    }

    /// Deletes the node at `path`. Returns whether anything was there.
    pub fn remove(&self, path: &str) -> ClinicResult<bool> {
        let segments = split_path(path)?;
        let mut root = self.write()?;
        self.commit(&mut root, &segments, path, |node| {
            Ok(remove_at(node, &segments).is_some())
        })
    }

    /// Atomic read-modify-write of a single node.
    ///
    /// `update` sees the current value (`None` if absent) and returns the value to commit,
    /// or `None` to abort. Returns the committed value, or `None` if aborted.
    pub fn transaction<F>(&self, path: &str, update: F) -> ClinicResult<Option<Value>>
    where
        F: FnOnce(Option<&Value>) -> Option<Value>,
    {
        let segments = split_path(path)?;
        let mut root = self.write()?;
        let Some(next) = update(lookup(&root, &segments)) else {
            return Ok(None);
        };
        let committed = next.clone();
        self.commit(&mut root, &segments, path, |node| {
            insert_at(node, &segments, next)?;
            Ok(true)
        })?;
        Ok(Some(committed))
    }

    fn read(&self) -> ClinicResult<RwLockReadGuard<'_, Map<String, Value>>> {
        self.root.read().map_err(|_| ClinicError::LockPoisoned)
    }

    fn write(&self) -> ClinicResult<RwLockWriteGuard<'_, Map<String, Value>>> {
        self.root.write().map_err(|_| ClinicError::LockPoisoned)
    }

    /// Applies `mutate` to a copy of the touched top-level node, snapshots the copy, and only
    /// then swaps it into the tree and notifies subscribers.
    ///
    /// `mutate` returns `false` when there is nothing to write. If the snapshot fails the tree
    /// is left as it was and no change is published.
    fn commit<F>(
        &self,
        root: &mut Map<String, Value>,
        segments: &[&str],
        path: &str,
        mutate: F,
    ) -> ClinicResult<bool>
    where
        F: FnOnce(&mut Map<String, Value>) -> ClinicResult<bool>,
    {
        let Some(node) = segments.first().copied() else {
            return Err(ClinicError::InvalidInput("empty store path".into()));
        };

        let mut staged = Map::new();
        if let Some(current) = root.get(node) {
            staged.insert(node.to_string(), current.clone());
        }
        if !mutate(&mut staged)? {
            return Ok(false);
        }

        if let Some(dir) = &self.snapshot_dir {
            persist_node(dir, node, staged.get(node))?;
        }

        match staged.remove(node) {
            Some(value) => root.insert(node.to_string(), value),
            None => root.remove(node),
        };
        // No receivers is not an error: nobody is watching yet.
        let _ = self.changes.send(StoreChange {
            path: path.to_string(),
        });
        Ok(true)
    }
}

fn split_path(path: &str) -> ClinicResult<Vec<&str>> {
    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    if segments.is_empty() {
        return Err(ClinicError::InvalidInput(format!("invalid store path '{path}'")));
    }
    Ok(segments)
}

fn lookup<'a>(root: &'a Map<String, Value>, segments: &[&str]) -> Option<&'a Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = root.get(*first)?;
    for segment in rest {
        current = current.as_object()?.get(*segment)?;
    }
    Some(current)
}

fn lookup_mut<'a>(root: &'a mut Map<String, Value>, segments: &[&str]) -> Option<&'a mut Value> {
    let (first, rest) = segments.split_first()?;
    let mut current = root.get_mut(*first)?;
    for segment in rest {
        current = current.as_object_mut()?.get_mut(*segment)?;
    }
    Some(current)
}

fn insert_at(map: &mut Map<String, Value>, segments: &[&str], value: Value) -> ClinicResult<()> {
    match segments {
        [] => Err(ClinicError::InvalidInput("empty store path".into())),
        [last] => {
            map.insert((*last).to_string(), value);
            Ok(())
        }
        [head, rest @ ..] => {
            let child = map
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            match child.as_object_mut() {
                Some(inner) => insert_at(inner, rest, value),
                None => Err(ClinicError::InvalidInput(format!(
                    "store node '{head}' is not an object"
                ))),
            }
        }
    }
}

fn remove_at(root: &mut Map<String, Value>, segments: &[&str]) -> Option<Value> {
    let (last, parents) = segments.split_last()?;
    let parent = if parents.is_empty() {
        root
    } else {
        lookup_mut(root, parents)?.as_object_mut()?
    };
    parent.remove(*last)
}

fn persist_node(dir: &Path, node: &str, value: Option<&Value>) -> ClinicResult<()> {
    let target = dir.join(format!("{node}.{SNAPSHOT_EXTENSION}"));
    let Some(value) = value else {
        if target.exists() {
            fs::remove_file(&target).map_err(ClinicError::FileWrite)?;
        }
        return Ok(());
    };

    let raw = serde_json::to_string_pretty(value).map_err(ClinicError::Serialization)?;
    let staging = dir.join(format!(".{node}.{SNAPSHOT_EXTENSION}.tmp"));
    fs::write(&staging, raw).map_err(ClinicError::FileWrite)?;
    fs::rename(&staging, &target).map_err(ClinicError::FileWrite)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    #[test]
    fn test_set_get_nested_path() {
        let store = TreeStore::in_memory();
        store.set("patients/a1", json!({"full_name": "Alice"})).unwrap();

        assert_eq!(
            store.get("patients/a1/full_name").unwrap(),
            Some(json!("Alice"))
        );
        assert_eq!(store.get("patients/zz").unwrap(), None);
        assert_eq!(store.children("patients").unwrap().len(), 1);
        assert!(store.children("nothing").unwrap().is_empty());
    }

    #[test]
    fn test_update_merges_and_reports_missing() {
        let store = TreeStore::in_memory();
        store
            .set("queue_entries/q1", json!({"status": "waiting", "queue_number": 1}))
            .unwrap();

        let mut fields = Map::new();
        fields.insert("status".into(), json!("examining"));
        assert!(store.update("queue_entries/q1", fields.clone()).unwrap());
        assert!(!store.update("queue_entries/q2", fields).unwrap());

        assert_eq!(
            store.get("queue_entries/q1").unwrap(),
            Some(json!({"status": "examining", "queue_number": 1}))
        );
        assert_eq!(store.get("queue_entries/q2").unwrap(), None);
    }

    #[test]
    fn test_remove_reports_existence() {
        let store = TreeStore::in_memory();
        store.set("a/b", json!(1)).unwrap();
        assert!(store.remove("a/b").unwrap());
        assert!(!store.remove("a/b").unwrap());
    }

    #[test]
    fn test_transaction_abort_writes_nothing() {
        let store = TreeStore::in_memory();
        let mut rx = store.subscribe();

        assert_eq!(store.transaction("counters/x", |_| None).unwrap(), None);
        assert_eq!(store.get("counters/x").unwrap(), None);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_writes_publish_changes() {
        let store = TreeStore::in_memory();
        let mut rx = store.subscribe();
        store.set("queue_entries/q1", json!({})).unwrap();

        let change = rx.try_recv().unwrap();
        assert_eq!(change.path, "queue_entries/q1");
        assert_eq!(change.collection(), "queue_entries");
    }

    #[test]
    fn test_empty_path_rejected() {
        let store = TreeStore::in_memory();
        assert!(store.get("").is_err());
        assert!(store.set("//", json!(1)).is_err());
    }

    #[test]
    fn test_snapshot_survives_reopen() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        {
            let store = TreeStore::open(temp_dir.path()).unwrap();
            store.set("counters/queue_number", json!(4)).unwrap();
            store.set("patients/p1", json!({"full_name": "Bob"})).unwrap();
            store.remove("patients/p1").unwrap();
        }

        assert!(temp_dir.path().join("counters.json").exists());

        let reopened = TreeStore::open(temp_dir.path()).unwrap();
        assert_eq!(
            reopened.get("counters/queue_number").unwrap(),
            Some(json!(4))
        );
        assert!(reopened.children("patients").unwrap().is_empty());
    }

    #[test]
    fn test_failed_snapshot_leaves_tree_unchanged() {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = TreeStore::open(temp_dir.path()).unwrap();
        store.set("patients/p1", json!({"full_name": "Alice"})).unwrap();
        let mut rx = store.subscribe();

        fs::remove_dir_all(temp_dir.path()).unwrap();

        assert!(matches!(
            store.set("patients/p2", json!({"full_name": "Bob"})),
            Err(ClinicError::FileWrite(_))
        ));
        let mut fields = Map::new();
        fields.insert("full_name".into(), json!("Alicia"));
        assert!(store.update("patients/p1", fields).is_err());
        assert!(store.transaction("counters/x", |_| Some(json!(1))).is_err());

        assert_eq!(store.get("patients/p2").unwrap(), None);
        assert_eq!(
            store.get("patients/p1/full_name").unwrap(),
            Some(json!("Alice"))
        );
        assert_eq!(store.get("counters").unwrap(), None);
        assert!(rx.try_recv().is_err());
    }
}
