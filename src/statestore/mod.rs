//! Typed key/value storage over a byte-level datastore.
//!
//! [`ByteStore`] is the consumed capability (production: [`sled`], tests: an
//! in-memory map); [`StateStore`] adds JSON encode/decode and the `iterate`
//! helper the wallet and cheque store build their key-prefix scans on.

mod memory;
mod sled_store;

pub use memory::MemoryByteStore;
pub use sled_store::SledByteStore;

use crate::error::{AntError, AntResult};
use serde::Serialize;
use serde::de::DeserializeOwned;

/// Byte-level key/value capability. Keys and values are opaque bytes; the
/// typed layer ([`StateStore`]) owns the encoding.
pub trait ByteStore: Send + Sync {
    fn get(&self, key: &str) -> AntResult<Option<Vec<u8>>>;
    fn put(&self, key: &str, value: Vec<u8>) -> AntResult<()>;
    fn delete(&self, key: &str) -> AntResult<()>;
    /// Returns all `(key, value)` pairs whose key starts with `prefix`.
    /// Ordering is the underlying datastore's and is unspecified here.
    fn iter_prefix(&self, prefix: &str) -> AntResult<Vec<(String, Vec<u8>)>>;
}

/// Typed wrapper over a [`ByteStore`]. Values are JSON-encoded; none of
/// this crate's persisted types need a non-JSON wire format, so encoding
/// is plain `serde_json` throughout.
pub struct StateStore<S: ByteStore> {
    inner: S,
}

impl<S: ByteStore> StateStore<S> {
    pub fn new(inner: S) -> Self {
        Self { inner }
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> AntResult<T> {
        let raw = self
            .inner
            .get(key)?
            .ok_or_else(|| AntError::NotFound(key.to_string()))?;
        serde_json::from_slice(&raw).map_err(AntError::decode)
    }

    pub fn try_get<T: DeserializeOwned>(&self, key: &str) -> AntResult<Option<T>> {
        match self.inner.get(key)? {
            None => Ok(None),
            Some(raw) => serde_json::from_slice(&raw).map(Some).map_err(AntError::decode),
        }
    }

    pub fn put<T: Serialize>(&self, key: &str, value: &T) -> AntResult<()> {
        let raw = serde_json::to_vec(value).map_err(AntError::decode)?;
        self.inner.put(key, raw)
    }

    pub fn delete(&self, key: &str) -> AntResult<()> {
        self.inner.delete(key)
    }

    /// Visits every `(key, decoded value)` pair under `prefix`. Entries that
    /// fail to decode are skipped and logged rather than aborting the scan.
    pub fn iterate<T: DeserializeOwned>(&self, prefix: &str) -> AntResult<Vec<(String, T)>> {
        let raw = self.inner.iter_prefix(prefix)?;
        let mut out = Vec::with_capacity(raw.len());
        for (key, bytes) in raw {
            match serde_json::from_slice::<T>(&bytes) {
                Ok(value) => out.push((key, value)),
                Err(err) => tracing::warn!(key, %err, "skipping undecodable state store entry"),
            }
        }
        Ok(out)
    }
}
