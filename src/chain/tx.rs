//! The transaction facade: `call` (read-only), `send` (signed submission),
//! `wait_for_receipt`. Built on an `alloy` `RootProvider` composed with a
//! filler stack (`GasFiller` -> `NonceFiller` -> `ChainIdFiller` ->
//! `WalletFiller`) narrowed to this node's single EVM chain and single
//! signer.

use crate::chain::nonce::PendingNonceManager;
use crate::error::{AntError, AntResult};
use crate::sctx::CallContext;
use alloy_network::EthereumWallet;
use alloy_primitives::{Address, Bytes, B256, U256};
use alloy_provider::fillers::{ChainIdFiller, FillProvider, GasFiller, Identity, JoinFill, NonceFiller, WalletFiller};
use alloy_provider::{Provider, ProviderBuilder, RootProvider};
use alloy_rpc_types_eth::{TransactionReceipt, TransactionRequest};
use alloy_signer_local::PrivateKeySigner;
use alloy_transport_http::Http;
use async_trait::async_trait;
use std::time::Duration;
use url::Url;

pub type InnerFiller = JoinFill<GasFiller, JoinFill<NonceFiller<PendingNonceManager>, ChainIdFiller>>;
pub type InnerProvider =
    FillProvider<JoinFill<JoinFill<Identity, InnerFiller>, WalletFiller<EthereumWallet>>, RootProvider>;

/// A contract call or transaction submission.
pub struct TxRequest {
    pub to: Address,
    pub data: Bytes,
    pub value: U256,
    pub ctx: CallContext,
    /// Logged, non-semantic — e.g. "lock" or "cashCheque".
    pub description: &'static str,
}

impl TxRequest {
    pub fn new(to: Address, data: Bytes) -> Self {
        Self {
            to,
            data,
            value: U256::ZERO,
            ctx: CallContext::default(),
            description: "",
        }
    }
}

#[async_trait]
pub trait TransactionService: Send + Sync {
    async fn call(&self, to: Address, data: Bytes) -> AntResult<Bytes>;
    async fn send(&self, req: TxRequest) -> AntResult<B256>;
    async fn wait_for_receipt(&self, hash: B256) -> AntResult<TransactionReceipt>;
}

pub struct AlloyTransactionService {
    provider: InnerProvider,
    nonce_manager: PendingNonceManager,
    receipt_timeout: Duration,
}

impl AlloyTransactionService {
    /// Access to the underlying filled/wallet-bound provider, for callers
    /// that build calls through `alloy_sol_types::sol!` contract bindings
    /// (the bootstrap flow) rather than through raw `TxRequest`s.
    pub fn provider(&self) -> &InnerProvider {
        &self.provider
    }

    pub fn connect(rpc_url: Url, signer: PrivateKeySigner, receipt_timeout: Duration) -> Self {
        let nonce_manager = PendingNonceManager::default();
        let wallet = EthereumWallet::from(signer);
        let filler = JoinFill::new(
            GasFiller,
            JoinFill::new(NonceFiller::new(nonce_manager.clone()), ChainIdFiller::default()),
        );
        let provider: InnerProvider = ProviderBuilder::default()
            .filler(filler)
            .wallet(wallet)
            .connect_http(rpc_url);
        Self {
            provider,
            nonce_manager,
            receipt_timeout,
        }
    }
}

#[async_trait]
impl TransactionService for AlloyTransactionService {
    async fn call(&self, to: Address, data: Bytes) -> AntResult<Bytes> {
        let tx = TransactionRequest::default().with_to(to).with_input(data);
        self.provider
            .call(tx)
            .await
            .map_err(AntError::transport)
    }

    async fn send(&self, req: TxRequest) -> AntResult<B256> {
        let mut tx = TransactionRequest::default()
            .with_to(req.to)
            .with_input(req.data)
            .with_value(req.value);
        if let Some(gas_price) = req.ctx.gas_price {
            tx.set_gas_price(gas_price.to::<u128>());
        }
        if let Some(gas_limit) = req.ctx.gas_limit {
            tx.set_gas_limit(gas_limit);
        }
        tracing::info!(description = req.description, to = %req.to, "submitting transaction");
        let from = self.provider.wallet().default_signer_address();
        match self.provider.send_transaction(tx).await {
            Ok(pending) => Ok(*pending.tx_hash()),
            Err(err) => {
                self.nonce_manager.reset_nonce(from).await;
                Err(AntError::transport(err))
            }
        }
    }

    async fn wait_for_receipt(&self, hash: B256) -> AntResult<TransactionReceipt> {
        let pending = self
            .provider
            .get_transaction_receipt(hash)
            .await
            .map_err(AntError::transport)?;
        match pending {
            Some(receipt) => Ok(receipt),
            None => {
                // Poll until mined or the receipt timeout elapses.
                let deadline = tokio::time::Instant::now() + self.receipt_timeout;
                loop {
                    if tokio::time::Instant::now() >= deadline {
                        return Err(AntError::Transport(format!(
                            "timed out waiting for receipt of {hash}"
                        )));
                    }
                    tokio::time::sleep(Duration::from_millis(500)).await;
                    if let Some(receipt) = self
                        .provider
                        .get_transaction_receipt(hash)
                        .await
                        .map_err(AntError::transport)?
                    {
                        return Ok(receipt);
                    }
                }
            }
        }
    }
}

#[async_trait]
impl crate::chain::ChainBackend for AlloyTransactionService {
    async fn balance_at(&self, address: Address) -> AntResult<U256> {
        self.provider.get_balance(address).await.map_err(AntError::transport)
    }

    async fn suggest_gas_price(&self) -> AntResult<U256> {
        let price = self.provider.get_gas_price().await.map_err(AntError::transport)?;
        Ok(U256::from(price))
    }

    async fn chain_id(&self) -> AntResult<u64> {
        self.provider.get_chain_id().await.map_err(AntError::transport)
    }
}
