//! One-shot stake acquisition, run once at node start.
//!
//! Idempotent: if the locker already reports a nonzero locked amount for
//! this node's id, `lock_token` returns immediately. Otherwise it waits for
//! native-gas and pledge-token balance preconditions (3s interval, 10
//! attempts each — ~30s ceiling per precondition) before approving and
//! locking the pledge.

use crate::chain::tx::{AlloyTransactionService, TransactionService, TxRequest};
use crate::chain::{ChainBackend, IChequebook, IERC20, ILocker};
use crate::error::{AntError, AntResult};
use crate::retry::do_with_retry;
use crate::sctx::CallContext;
use alloy_primitives::{Address, U256};
use std::time::Duration;

/// Gas headroom required before attempting to send any transaction:
/// enough for roughly one approve + one lock at a generous gas limit.
const GAS_HEADROOM_UNITS: u64 = 15_000;
const BALANCE_POLL_INTERVAL: Duration = Duration::from_secs(3);
const BALANCE_POLL_ATTEMPTS: u32 = 10;

pub struct ChainBootstrap<'a> {
    pub tx: &'a AlloyTransactionService,
    pub locker: Address,
}

impl<'a> ChainBootstrap<'a> {
    pub fn new(tx: &'a AlloyTransactionService, locker: Address) -> Self {
        Self { tx, locker }
    }

    /// Reads the locker's configured pledge token address.
    pub async fn token_contract(&self) -> AntResult<Address> {
        let locker = ILocker::new(self.locker, self.tx.provider());
        let token = locker.tokenContract().call().await.map_err(AntError::transport)?;
        Ok(token)
    }

    /// Acquires stake for `node_id`/`eth_address`, or confirms it is
    /// already staked. Fail-fast: a failure here must abort node startup.
    pub async fn lock_token(&self, node_id: &str, eth_address: Address) -> AntResult<()> {
        let locker = ILocker::new(self.locker, self.tx.provider());

        let lock_info = locker
            .antLockInfos(node_id.to_string())
            .call()
            .await
            .map_err(AntError::transport)?;
        if lock_info.lockedAmount > U256::ZERO {
            tracing::info!(node_id, "already staked, skipping lock");
            return Ok(());
        }

        self.check_native_balance(eth_address).await?;

        let min_lock = locker.minLockAmount().call().await.map_err(AntError::transport)?;
        let token_address = self.token_contract().await?;
        self.check_token_balance(token_address, eth_address, min_lock).await?;

        let token = IERC20::new(token_address, self.tx.provider());
        let approve_call = token.approve(self.locker, min_lock);
        let approve_req = TxRequest {
            to: token_address,
            data: approve_call.calldata().clone(),
            value: U256::ZERO,
            ctx: CallContext::default(),
            description: "approve",
        };
        let approve_hash = self.tx.send(approve_req).await?;
        let approve_receipt = self.tx.wait_for_receipt(approve_hash).await?;
        if !approve_receipt.status() {
            return Err(AntError::ChainRejected("approve reverted".into()));
        }

        let lock_call = locker.lock(node_id.to_string(), eth_address);
        let lock_req = TxRequest {
            to: self.locker,
            data: lock_call.calldata().clone(),
            value: U256::ZERO,
            ctx: CallContext::default(),
            description: "lock",
        };
        let lock_hash = self.tx.send(lock_req).await?;
        let lock_receipt = self.tx.wait_for_receipt(lock_hash).await?;
        if !lock_receipt.status() {
            return Err(AntError::ChainRejected("lock reverted".into()));
        }

        tracing::info!(node_id, %eth_address, "stake locked");
        Ok(())
    }

    async fn check_native_balance(&self, address: Address) -> AntResult<()> {
        do_with_retry(
            || async {
                let balance = self.tx.balance_at(address).await?;
                let gas_price = self.tx.suggest_gas_price().await?;
                let required = gas_price.saturating_mul(U256::from(GAS_HEADROOM_UNITS));
                if balance >= required {
                    Ok(())
                } else {
                    Err(AntError::InsufficientFunds("insufficient native token for gas"))
                }
            },
            BALANCE_POLL_INTERVAL,
            BALANCE_POLL_ATTEMPTS,
        )
        .await
    }

    async fn check_token_balance(
        &self,
        token_address: Address,
        address: Address,
        min_lock: U256,
    ) -> AntResult<()> {
        let token = IERC20::new(token_address, self.tx.provider());
        do_with_retry(
            || async {
                let balance = token
                    .balanceOf(address)
                    .call()
                    .await
                    .map_err(AntError::transport)?;
                if balance >= min_lock {
                    Ok(())
                } else {
                    Err(AntError::InsufficientFunds("insufficient token for pledge"))
                }
            },
            BALANCE_POLL_INTERVAL,
            BALANCE_POLL_ATTEMPTS,
        )
        .await
    }

    /// Exposed to the CLI's balance commands.
    pub async fn balance_of_native(&self, address: Address) -> AntResult<U256> {
        self.tx.balance_at(address).await
    }

    pub async fn balance_of_token(&self, address: Address) -> AntResult<U256> {
        let token_address = self.token_contract().await?;
        let token = IERC20::new(token_address, self.tx.provider());
        token.balanceOf(address).call().await.map_err(AntError::transport)
    }
}

/// Default gas limit applied to a cheque cashout when the caller does not
/// supply one explicitly.
pub const CASH_OUT_DEFAULT_GAS_LIMIT: u64 = 300_000;

/// Helper for cheque cashout: submits `cashCheque` against a chequebook.
pub async fn cash_cheque(
    tx: &AlloyTransactionService,
    chequebook: Address,
    beneficiary: Address,
    cumulative_payout: U256,
    signature: &[u8],
    gas_limit: Option<u64>,
) -> AntResult<alloy_primitives::B256> {
    let contract = IChequebook::new(chequebook, tx.provider());
    let call = contract.cashCheque(beneficiary, cumulative_payout, signature.to_vec().into());
    let req = TxRequest {
        to: chequebook,
        data: call.calldata().clone(),
        value: U256::ZERO,
        ctx: CallContext::default().with_gas_limit(gas_limit.unwrap_or(CASH_OUT_DEFAULT_GAS_LIMIT)),
        description: "cashCheque",
    };
    tx.send(req).await
}

/// Reads the amount already cashed out on-chain for `beneficiary`.
pub async fn paid_out(
    tx: &AlloyTransactionService,
    chequebook: Address,
    beneficiary: Address,
) -> AntResult<U256> {
    let contract = IChequebook::new(chequebook, tx.provider());
    contract.paidOut(beneficiary).call().await.map_err(AntError::transport)
}
