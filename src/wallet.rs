//! Local secp256k1 key store.
//!
//! Keys are persisted through the [`StateStore`] under `/wallet/list/<address>`
//! (JSON-quoted hex of the raw 32-byte scalar) with one distinguished entry,
//! `/wallet/default`, that designates the node's identity. Key material
//! itself is generated/imported via `alloy_signer_local::PrivateKeySigner`,
//! which wraps a `k256::ecdsa::SigningKey` — this crate never links `k256`
//! or `secp256k1` directly.

use crate::error::{AntError, AntResult};
use crate::statestore::{ByteStore, StateStore};
use alloy_primitives::{Address, B256};
use alloy_signer_local::PrivateKeySigner;
use rand::rngs::OsRng;
use std::str::FromStr;

const LIST_PREFIX: &str = "/wallet/list/";
const DEFAULT_KEY: &str = "/wallet/default";

fn list_key(address: &Address) -> String {
    format!("{LIST_PREFIX}{address}")
}

/// Wraps a raw private key for storage; `Display`/`FromStr` round-trip as
/// `0x`-prefixed hex, the on-disk wire format for wallet records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct StoredKey(pub B256);

impl StoredKey {
    /// Fails if the 32 bytes are not a valid secp256k1 scalar (zero, or
    /// greater than or equal to the curve order).
    pub fn signer(&self) -> AntResult<PrivateKeySigner> {
        PrivateKeySigner::from_bytes(&self.0).map_err(AntError::decode)
    }

    pub fn address(&self) -> AntResult<Address> {
        Ok(self.signer()?.address())
    }
}

pub struct Wallet<S: ByteStore> {
    store: StateStore<S>,
}

impl<S: ByteStore> Wallet<S> {
    pub fn new(store: StateStore<S>) -> Self {
        Self { store }
    }

    /// Generates a fresh secp256k1 key, persists it, and makes it the
    /// default identity if none is set yet.
    pub fn new_address(&self) -> AntResult<Address> {
        let signer = PrivateKeySigner::random_with(&mut OsRng);
        self.persist(StoredKey(signer.to_bytes()))
    }

    /// Imports a raw 32-byte hex private key.
    pub fn import(&self, hex_key: &str) -> AntResult<Address> {
        let bytes = B256::from_str(hex_key).map_err(AntError::decode)?;
        self.persist(StoredKey(bytes))
    }

    fn persist(&self, key: StoredKey) -> AntResult<Address> {
        let address = key.address()?;
        self.store.put(&list_key(&address), &key)?;
        if self.store.try_get::<StoredKey>(DEFAULT_KEY)?.is_none() {
            self.store.put(DEFAULT_KEY, &key)?;
        }
        Ok(address)
    }

    pub fn get(&self, address: &Address) -> AntResult<StoredKey> {
        self.store.get(&list_key(address))
    }

    pub fn get_default(&self) -> AntResult<StoredKey> {
        self.store.get(DEFAULT_KEY)
    }

    /// Requires `address` to already be a listed key.
    pub fn set_default(&self, address: &Address) -> AntResult<()> {
        let key = self.get(address)?;
        self.store.put(DEFAULT_KEY, &key)
    }

    pub fn list(&self) -> AntResult<Vec<(Address, StoredKey)>> {
        let entries: Vec<(String, StoredKey)> = self.store.iterate(LIST_PREFIX)?;
        Ok(entries
            .into_iter()
            .filter_map(|(raw_key, value)| {
                raw_key
                    .strip_prefix(LIST_PREFIX)
                    .and_then(|addr| Address::from_str(addr).ok())
                    .map(|addr| (addr, value))
            })
            .collect())
    }

    /// Fails if `address` is the current default identity.
    pub fn delete(&self, address: &Address) -> AntResult<()> {
        if let Ok(default_key) = self.get_default() {
            if default_key.address().ok() == Some(*address) {
                return Err(AntError::Policy("cannot delete default address"));
            }
        }
        self.store.delete(&list_key(address))
    }
}
