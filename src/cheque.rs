//! Cheque store (persistence) and manager (cashout accounting).
//!
//! Cheques are received from a queen, never issued locally. `save_cheque`
//! is an unconditional overwrite per chequebook key — no monotonicity
//! guard is enforced on `cumulativePayout` across writes.

use crate::chain::bootstrap::{self, CASH_OUT_DEFAULT_GAS_LIMIT};
use crate::chain::tx::AlloyTransactionService;
use crate::error::{AntError, AntResult};
use crate::proto::Cheque;
use crate::statestore::{ByteStore, StateStore};
use crate::types::TokenAmount;
use alloy_primitives::{Address, B256, U256};
use async_trait::async_trait;

const PREFIX: &str = "/cheque/";

fn key(chequebook: &Address) -> String {
    format!("{PREFIX}{chequebook:#x}")
}

pub struct ChequeStore<S: ByteStore> {
    store: StateStore<S>,
}

impl<S: ByteStore> ChequeStore<S> {
    pub fn new(store: StateStore<S>) -> Self {
        Self { store }
    }

    pub fn save_cheque(&self, cheque: &Cheque) -> AntResult<()> {
        self.store.put(&key(&cheque.chequebook), cheque)
    }

    pub fn get_cheque(&self, chequebook: &Address) -> AntResult<Cheque> {
        self.store.get(&key(chequebook))
    }

    pub fn get_cheques(&self) -> AntResult<Vec<Cheque>> {
        let entries: Vec<(String, Cheque)> = self.store.iterate(PREFIX)?;
        Ok(entries.into_iter().map(|(_, c)| c).collect())
    }
}

/// On-chain cashout accounting for a single cheque.
#[derive(Debug, Clone, Copy)]
pub struct CashAccounting {
    pub cumulative_payout: TokenAmount,
    pub paid_out: TokenAmount,
    pub can_cash_out: TokenAmount,
}

/// Chequebook on-chain operations, abstracted so the manager can be tested
/// against an in-memory fake instead of a live RPC endpoint.
#[async_trait]
pub trait ChequebookBackend: Send + Sync {
    async fn paid_out(&self, chequebook: Address, beneficiary: Address) -> AntResult<U256>;
    async fn cash_cheque(
        &self,
        chequebook: Address,
        beneficiary: Address,
        cumulative_payout: U256,
        signature: &[u8],
        gas_limit: Option<u64>,
    ) -> AntResult<B256>;
}

#[async_trait]
impl ChequebookBackend for AlloyTransactionService {
    async fn paid_out(&self, chequebook: Address, beneficiary: Address) -> AntResult<U256> {
        bootstrap::paid_out(self, chequebook, beneficiary).await
    }

    async fn cash_cheque(
        &self,
        chequebook: Address,
        beneficiary: Address,
        cumulative_payout: U256,
        signature: &[u8],
        gas_limit: Option<u64>,
    ) -> AntResult<B256> {
        bootstrap::cash_cheque(self, chequebook, beneficiary, cumulative_payout, signature, gas_limit).await
    }
}

pub struct ChequeManager<'a, S: ByteStore, C: ChequebookBackend> {
    pub store: &'a ChequeStore<S>,
    pub chain: &'a C,
    pub beneficiary: Address,
}

impl<'a, S: ByteStore, C: ChequebookBackend> ChequeManager<'a, S, C> {
    pub fn new(store: &'a ChequeStore<S>, chain: &'a C, beneficiary: Address) -> Self {
        Self { store, chain, beneficiary }
    }

    /// Derives display/cashout accounting for a stored cheque against the
    /// chain's current `paidOut` value.
    pub async fn convert_cheque(&self, chequebook: Address) -> AntResult<CashAccounting> {
        let cheque = self.store.get_cheque(&chequebook)?;
        let paid_out = TokenAmount(self.chain.paid_out(chequebook, self.beneficiary).await?);
        let cumulative_payout = cheque.cumulative_payout();
        Ok(CashAccounting {
            cumulative_payout,
            paid_out,
            can_cash_out: cumulative_payout.saturating_sub(paid_out),
        })
    }

    /// Cashes out a single chequebook. Fails with `Policy` if there is
    /// nothing left to cash out. Returns immediately on submission — the
    /// caller is responsible for waiting on the receipt if desired.
    pub async fn cash_out(&self, chequebook: Address) -> AntResult<B256> {
        let cheque = self.store.get_cheque(&chequebook)?;
        let accounting = self.convert_cheque(chequebook).await?;
        if accounting.can_cash_out.is_zero() {
            return Err(AntError::Policy("uncashed out amount is zero"));
        }
        self.chain
            .cash_cheque(
                chequebook,
                self.beneficiary,
                cheque.cumulative_payout,
                &cheque.signature,
                Some(CASH_OUT_DEFAULT_GAS_LIMIT),
            )
            .await
    }

    /// Cashes out every stored chequebook with a nonzero cashable amount.
    /// Skips chequebooks already fully cashed out; aborts the whole batch
    /// on the first per-transaction send error rather than continuing past
    /// it (see DESIGN.md for the rationale).
    pub async fn cash_out_all(&self) -> AntResult<Vec<B256>> {
        let cheques = self.store.get_cheques()?;
        let mut hashes = Vec::new();
        for cheque in cheques {
            let accounting = self.convert_cheque(cheque.chequebook).await?;
            if accounting.can_cash_out.is_zero() {
                continue;
            }
            let hash = self
                .chain
                .cash_cheque(
                    cheque.chequebook,
                    self.beneficiary,
                    cheque.cumulative_payout,
                    &cheque.signature,
                    Some(CASH_OUT_DEFAULT_GAS_LIMIT),
                )
                .await?;
            hashes.push(hash);
        }
        Ok(hashes)
    }
}
