//! Local key-value persistence for the user profile and presence record.
//!
//! Values are opaque JSON strings at this level; [`records`] layers the
//! typed records on top.

use std::collections::BTreeMap;

pub mod records;

pub use records::*;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    NotFound,
    StorageUnavailable,
    Corrupt(String),
    Io(String),
}

impl std::fmt::Display for CatalogError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CatalogError::NotFound => write!(f, "state entry not found"),
            CatalogError::StorageUnavailable => write!(f, "browser storage unavailable"),
            CatalogError::Corrupt(msg) => write!(f, "stored state corrupt: {msg}"),
            CatalogError::Io(msg) => write!(f, "state storage error: {msg}"),
        }
    }
}

impl std::error::Error for CatalogError {}

pub trait StateStore {
    fn get(&self, key: &str) -> Result<Option<String>, CatalogError>;
    fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError>;
    /// Returns whether a value was present.
    fn remove(&mut self, key: &str) -> Result<bool, CatalogError>;
}

#[derive(Debug, Default, Clone)]
pub struct InMemoryStateStore {
    entries: BTreeMap<String, String>,
}

impl InMemoryStateStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }
}

impl StateStore for InMemoryStateStore {
    fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
        Ok(self.entries.get(key).cloned())
    }

    fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError> {
        self.entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<bool, CatalogError> {
        Ok(self.entries.remove(key).is_some())
    }
}

#[cfg(not(target_arch = "wasm32"))]
mod file_storage {
    use std::io::ErrorKind;
    use std::path::{Path, PathBuf};

    use super::{CatalogError, StateStore};

    /// One `<key>.json` file per key under a state directory.
    #[derive(Debug, Clone)]
    pub struct FileStateStore {
        dir: PathBuf,
    }

    impl FileStateStore {
        pub fn new(dir: impl Into<PathBuf>) -> Result<Self, CatalogError> {
            let dir = dir.into();
            std::fs::create_dir_all(&dir)
                .map_err(|e| CatalogError::Io(format!("create {}: {e}", dir.display())))?;
            Ok(Self { dir })
        }

        pub fn dir(&self) -> &Path {
            &self.dir
        }

        fn path_for(&self, key: &str) -> Result<PathBuf, CatalogError> {
            let valid = !key.is_empty()
                && key
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
                && !key.starts_with('.');
            if !valid {
                return Err(CatalogError::Io(format!("invalid state key {key:?}")));
            }
            Ok(self.dir.join(format!("{key}.json")))
        }
    }

    impl StateStore for FileStateStore {
        fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
            let path = self.path_for(key)?;
            match std::fs::read_to_string(&path) {
                Ok(raw) => Ok(Some(raw)),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
                Err(e) => Err(CatalogError::Io(format!("read {}: {e}", path.display()))),
            }
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError> {
            let path = self.path_for(key)?;
            // Temp file then rename; readers never see a partial record.
            let tmp = path.with_extension("json.tmp");
            std::fs::write(&tmp, value)
                .map_err(|e| CatalogError::Io(format!("write {}: {e}", tmp.display())))?;
            std::fs::rename(&tmp, &path)
                .map_err(|e| CatalogError::Io(format!("rename {}: {e}", path.display())))
        }

        fn remove(&mut self, key: &str) -> Result<bool, CatalogError> {
            let path = self.path_for(key)?;
            match std::fs::remove_file(&path) {
                Ok(()) => Ok(true),
                Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
                Err(e) => Err(CatalogError::Io(format!("remove {}: {e}", path.display()))),
            }
        }
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_storage::FileStateStore;

#[cfg(target_arch = "wasm32")]
mod wasm_storage {
    use super::{CatalogError, StateStore};

    /// `window.localStorage`, one item per key.
    #[derive(Debug, Default)]
    pub struct LocalStorageStateStore;

    impl LocalStorageStateStore {
        pub fn new() -> Result<Self, CatalogError> {
            window_local_storage()?;
            Ok(Self)
        }
    }

    impl StateStore for LocalStorageStateStore {
        fn get(&self, key: &str) -> Result<Option<String>, CatalogError> {
            let storage = window_local_storage()?;
            let raw = storage
                .get_item(key)
                .map_err(|e| CatalogError::Io(format!("get_item({key}) failed: {:?}", e)))?;
            Ok(raw.filter(|r| !r.trim().is_empty()))
        }

        fn set(&mut self, key: &str, value: &str) -> Result<(), CatalogError> {
            let storage = window_local_storage()?;
            storage
                .set_item(key, value)
                .map_err(|e| CatalogError::Io(format!("set_item({key}) failed: {:?}", e)))
        }

        fn remove(&mut self, key: &str) -> Result<bool, CatalogError> {
            let existed = self.get(key)?.is_some();
            let storage = window_local_storage()?;
            storage
                .remove_item(key)
                .map_err(|e| CatalogError::Io(format!("remove_item({key}) failed: {:?}", e)))?;
            Ok(existed)
        }
    }

    fn window_local_storage() -> Result<web_sys::Storage, CatalogError> {
        let win = web_sys::window().ok_or(CatalogError::StorageUnavailable)?;
        win.local_storage()
            .map_err(|e| CatalogError::Io(format!("localStorage error: {:?}", e)))?
            .ok_or(CatalogError::StorageUnavailable)
    }
}

#[cfg(target_arch = "wasm32")]
pub use wasm_storage::LocalStorageStateStore;

#[cfg(not(target_arch = "wasm32"))]
#[derive(Debug)]
pub struct LocalStorageStateStore;

#[cfg(not(target_arch = "wasm32"))]
impl LocalStorageStateStore {
    pub fn new() -> Result<Self, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}

#[cfg(not(target_arch = "wasm32"))]
impl StateStore for LocalStorageStateStore {
    fn get(&self, _key: &str) -> Result<Option<String>, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn set(&mut self, _key: &str, _value: &str) -> Result<(), CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }

    fn remove(&mut self, _key: &str) -> Result<bool, CatalogError> {
        Err(CatalogError::StorageUnavailable)
    }
}

#[cfg(test)]
mod tests {
    use super::{CatalogError, FileStateStore, InMemoryStateStore, LocalStorageStateStore, StateStore};

    fn temp_dir(tag: &str) -> std::path::PathBuf {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        std::env::temp_dir().join(format!("watakoko-catalog-{tag}-{}-{nanos}", std::process::id()))
    }

    #[test]
    fn memory_store_set_get_remove() {
        let mut store = InMemoryStateStore::new();
        assert_eq!(store.get("k").unwrap(), None);
        store.set("k", "v1").unwrap();
        store.set("k", "v2").unwrap();
        assert_eq!(store.get("k").unwrap().as_deref(), Some("v2"));
        assert!(store.remove("k").unwrap());
        assert!(!store.remove("k").unwrap());
    }

    #[test]
    fn file_store_persists_across_instances() {
        let dir = temp_dir("persist");
        {
            let mut store = FileStateStore::new(&dir).unwrap();
            store.set("watakoko_user", r#"{"id":"u1"}"#).unwrap();
        }
        let mut store = FileStateStore::new(&dir).unwrap();
        assert_eq!(
            store.get("watakoko_user").unwrap().as_deref(),
            Some(r#"{"id":"u1"}"#)
        );
        assert_eq!(store.get("missing").unwrap(), None);
        assert!(store.remove("watakoko_user").unwrap());
        assert_eq!(store.get("watakoko_user").unwrap(), None);
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn file_store_rejects_path_like_keys() {
        let dir = temp_dir("keys");
        let store = FileStateStore::new(&dir).unwrap();
        assert!(matches!(store.get("../etc"), Err(CatalogError::Io(_))));
        assert!(matches!(store.get(""), Err(CatalogError::Io(_))));
        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn local_storage_unavailable_off_wasm() {
        assert_eq!(
            LocalStorageStateStore::new().unwrap_err(),
            CatalogError::StorageUnavailable
        );
    }
}
