use crate::error::AntResult;
use crate::statestore::ByteStore;
use std::collections::BTreeMap;
use std::sync::RwLock;

/// In-memory [`ByteStore`] used by tests and by any tool invocation that
/// does not want to touch disk.
#[derive(Default)]
pub struct MemoryByteStore {
    map: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl ByteStore for MemoryByteStore {
    fn get(&self, key: &str) -> AntResult<Option<Vec<u8>>> {
        Ok(self.map.read().expect("lock poisoned").get(key).cloned())
    }

    fn put(&self, key: &str, value: Vec<u8>) -> AntResult<()> {
        self.map
            .write()
            .expect("lock poisoned")
            .insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> AntResult<()> {
        self.map.write().expect("lock poisoned").remove(key);
        Ok(())
    }

    fn iter_prefix(&self, prefix: &str) -> AntResult<Vec<(String, Vec<u8>)>> {
        Ok(self
            .map
            .read()
            .expect("lock poisoned")
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect())
    }
}
