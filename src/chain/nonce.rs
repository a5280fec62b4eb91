//! Local nonce cache: fetches `.pending()` (mempool-inclusive) on first
//! use per address, then increments locally; resets to force a re-query
//! after a failed send.

use alloy_network::Network;
use alloy_primitives::Address;
use alloy_provider::Provider;
use alloy_provider::fillers::NonceManager;
use alloy_transport::TransportResult;
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use tokio::sync::Mutex;

#[derive(Clone, Debug, Default)]
pub struct PendingNonceManager {
    nonces: Arc<DashMap<Address, Arc<Mutex<u64>>>>,
}

#[async_trait]
impl NonceManager for PendingNonceManager {
    async fn get_next_nonce<P, N>(&self, provider: &P, address: Address) -> TransportResult<u64>
    where
        P: Provider<N>,
        N: Network,
    {
        const NONE: u64 = u64::MAX;
        let nonce = {
            let entry = self
                .nonces
                .entry(address)
                .or_insert_with(|| Arc::new(Mutex::new(NONE)));
            Arc::clone(entry.value())
        };
        let mut nonce = nonce.lock().await;
        let new_nonce = if *nonce == NONE {
            provider.get_transaction_count(address).pending().await?
        } else {
            *nonce + 1
        };
        *nonce = new_nonce;
        Ok(new_nonce)
    }
}

impl PendingNonceManager {
    pub async fn reset_nonce(&self, address: Address) {
        if let Some(lock) = self.nonces.get(&address) {
            let mut nonce = lock.lock().await;
            *nonce = u64::MAX;
        }
    }
}
