use crate::error::{AntError, AntResult};
use crate::statestore::ByteStore;
use std::path::Path;

/// Production [`ByteStore`] backed by an embedded `sled` database.
///
/// `sled::Db` is a cheap, `Arc`-backed handle, so cloning shares the same
/// underlying tree — the CLI opens one store and clones it into both the
/// wallet and the cheque store rather than opening the database twice.
#[derive(Clone)]
pub struct SledByteStore {
    db: sled::Db,
}

impl SledByteStore {
    pub fn open(path: impl AsRef<Path>) -> AntResult<Self> {
        let db = sled::open(path).map_err(AntError::transport)?;
        Ok(Self { db })
    }
}

impl ByteStore for SledByteStore {
    fn get(&self, key: &str) -> AntResult<Option<Vec<u8>>> {
        Ok(self
            .db
            .get(key)
            .map_err(AntError::transport)?
            .map(|ivec| ivec.to_vec()))
    }

    fn put(&self, key: &str, value: Vec<u8>) -> AntResult<()> {
        self.db.insert(key, value).map_err(AntError::transport)?;
        self.db.flush().map_err(AntError::transport)?;
        Ok(())
    }

    fn delete(&self, key: &str) -> AntResult<()> {
        self.db.remove(key).map_err(AntError::transport)?;
        self.db.flush().map_err(AntError::transport)?;
        Ok(())
    }

    fn iter_prefix(&self, prefix: &str) -> AntResult<Vec<(String, Vec<u8>)>> {
        let mut out = Vec::new();
        for item in self.db.scan_prefix(prefix) {
            let (key, value) = item.map_err(AntError::transport)?;
            let key = String::from_utf8(key.to_vec()).map_err(AntError::decode)?;
            out.push((key, value.to_vec()));
        }
        Ok(out)
    }
}
