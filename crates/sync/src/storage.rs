//! Per-user client-side persistence.
//!
//! Two keys are used per user:
//! - `shop_data_{uid}` - a cart snapshot written while no backend is
//!   configured; migrated to the backend and deleted on the next login
//! - `wishlist_{uid}` - the session wishlist cache

use std::collections::HashMap;
use std::io::ErrorKind;
use std::path::PathBuf;
use std::sync::{Mutex, PoisonError};

use serde::Serialize;
use serde::de::DeserializeOwned;
use thiserror::Error;

use shopsync_core::{CartLine, Product, Uid};

/// Errors that can occur when reading or writing local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Filesystem operation failed.
    #[error("Storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored value is not valid JSON for the expected type.
    #[error("Storage parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

/// A string key-value store.
pub trait LocalStore: Send + Sync {
    /// Read a value. `Ok(None)` if the key is absent.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write a value, replacing any previous one.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete a value. Deleting an absent key succeeds.
    ///
    /// # Errors
    ///
    /// Returns error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Storage key for the pre-sync cart snapshot.
#[must_use]
pub fn cart_key(uid: &Uid) -> String {
    format!("shop_data_{uid}")
}

/// Storage key for the session wishlist.
#[must_use]
pub fn wishlist_key(uid: &Uid) -> String {
    format!("wishlist_{uid}")
}

/// Read and decode a JSON value.
///
/// # Errors
///
/// Returns error if the value cannot be read or decoded.
pub fn load_json<T: DeserializeOwned>(
    store: &dyn LocalStore,
    key: &str,
) -> Result<Option<T>, StorageError> {
    store
        .get(key)?
        .map(|raw| serde_json::from_str(&raw))
        .transpose()
        .map_err(StorageError::from)
}

/// Encode and write a JSON value.
///
/// # Errors
///
/// Returns error if the value cannot be encoded or written.
pub fn save_json<T: Serialize + ?Sized>(
    store: &dyn LocalStore,
    key: &str,
    value: &T,
) -> Result<(), StorageError> {
    let raw = serde_json::to_string(value)?;
    store.set(key, &raw)
}

/// Stored cart snapshot, empty if none.
///
/// # Errors
///
/// Returns error if the snapshot cannot be read or decoded.
pub fn load_cart(store: &dyn LocalStore, uid: &Uid) -> Result<Vec<CartLine>, StorageError> {
    Ok(load_json(store, &cart_key(uid))?.unwrap_or_default())
}

/// Stored session wishlist, empty if none.
///
/// # Errors
///
/// Returns error if the wishlist cannot be read or decoded.
pub fn load_wishlist(store: &dyn LocalStore, uid: &Uid) -> Result<Vec<Product>, StorageError> {
    Ok(load_json(store, &wishlist_key(uid))?.unwrap_or_default())
}

// =============================================================================
// FileStore
// =============================================================================

/// One JSON file per key inside a directory.
///
/// File names are the percent-encoded key, so every key gets its own file
/// and a uid can never escape the directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Use `dir` for storage, creating it if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    /// Percent-encoded so distinct keys never share a file and no key can
    /// name a path outside the directory.
    fn path_for(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{}.json", urlencoding::encode(key)))
    }
}

impl LocalStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match std::fs::read_to_string(self.path_for(key)) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        std::fs::write(&tmp, value)?;
        std::fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match std::fs::remove_file(self.path_for(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

// =============================================================================
// MemoryStore
// =============================================================================

/// In-process store, used for anonymous sessions and tests.
#[derive(Debug, Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl LocalStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(values.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut values = self.values.lock().unwrap_or_else(PoisonError::into_inner);
        values.remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use shopsync_core::ProductId;

    use super::*;

    #[test]
    fn test_keys() {
        let uid = Uid::new("abc123");
        assert_eq!(cart_key(&uid), "shop_data_abc123");
        assert_eq!(wishlist_key(&uid), "wishlist_abc123");
    }

    #[test]
    fn test_file_store_set_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("nested")).unwrap();

        assert_eq!(store.get("wishlist_u1").unwrap(), None);
        store.set("wishlist_u1", "[]").unwrap();
        assert_eq!(store.get("wishlist_u1").unwrap().as_deref(), Some("[]"));

        store.remove("wishlist_u1").unwrap();
        assert_eq!(store.get("wishlist_u1").unwrap(), None);
        store.remove("wishlist_u1").unwrap();
    }

    #[test]
    fn test_file_store_keys_stay_in_dir() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        store.set("shop_data_../../etc", "{}").unwrap();
        assert!(dir.path().join("shop_data_..%2F..%2Fetc.json").exists());
    }

    #[test]
    fn test_file_store_distinct_uids_do_not_share_files() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path()).unwrap();
        let dotted = wishlist_key(&Uid::new("a.b"));
        let underscored = wishlist_key(&Uid::new("a_b"));

        store.set(&dotted, r#"["alice"]"#).unwrap();
        assert_eq!(store.get(&underscored).unwrap(), None);

        store.set(&underscored, r#"["bob"]"#).unwrap();
        assert_eq!(store.get(&dotted).unwrap().as_deref(), Some(r#"["alice"]"#));
        assert_eq!(store.get(&underscored).unwrap().as_deref(), Some(r#"["bob"]"#));

        for (a, b) in [("a/b", "a%2Fb"), ("a b", "a+b"), ("ü", "%C3%BC")] {
            let (a, b) = (cart_key(&Uid::new(a)), cart_key(&Uid::new(b)));
            store.set(&a, "1").unwrap();
            assert_eq!(store.get(&b).unwrap(), None, "{a} and {b} collide");
            store.remove(&a).unwrap();
        }
    }

    #[test]
    fn test_load_cart_round_trip_and_corruption() {
        let store = MemoryStore::new();
        let uid = Uid::new("u1");
        assert!(load_cart(&store, &uid).unwrap().is_empty());

        let lines = vec![CartLine {
            product: Product::new(ProductId::new(1), "A", Decimal::new(5, 0)),
            quantity: 2,
        }];
        save_json(&store, &cart_key(&uid), &lines).unwrap();
        assert_eq!(load_cart(&store, &uid).unwrap(), lines);

        store.set(&cart_key(&uid), "{not json").unwrap();
        assert!(matches!(load_cart(&store, &uid), Err(StorageError::Parse(_))));
    }
}
