//! Thin CLI composition root: `ant wallet {...}` / `ant cheque {...}`.
//! Each subcommand opens the on-disk state store, calls straight into the
//! library API, and prints a single line — either the result or the error
//! string — then exits 0 on success or 1 on failure. No daemon lifecycle,
//! no block/message capabilities: those are out of this crate's scope.

use crate::chain::tx::AlloyTransactionService;
use crate::cheque::{ChequeManager, ChequeStore};
use crate::config::Config;
use crate::error::AntResult;
use crate::statestore::{SledByteStore, StateStore};
use crate::wallet::Wallet;
use alloy_primitives::Address;
use clap::Subcommand;
use std::path::PathBuf;
use std::time::Duration;

/// One-shot chain-bootstrap timeout ceiling, reused here as the
/// receipt-wait budget for cheque cashout transactions.
const CHAIN_CALL_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Local wallet key management.
    Wallet {
        #[command(subcommand)]
        action: WalletAction,
    },
    /// Reward cheque inspection and cashout.
    Cheque {
        #[command(subcommand)]
        action: ChequeAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum WalletAction {
    /// List every stored address.
    Ls,
    /// Generate a fresh key and store it.
    New,
    /// Remove an address, unless it is the current default.
    Delete { address: Address },
    /// Import a raw 32-byte hex private key.
    Import { private_key: String },
    /// Print the raw hex private key for an address.
    Export { address: Address },
    /// Print the current default address.
    Default,
    /// Make an already-listed address the default identity.
    Setdefault { address: Address },
}

#[derive(Subcommand, Debug)]
pub enum ChequeAction {
    /// List every stored cheque.
    Ls,
    /// Show cashout accounting for one chequebook.
    Get { chequebook: Address },
    /// Cash out one chequebook.
    Cashout { chequebook: Address },
    /// Cash out every chequebook with a nonzero cashable amount.
    Cashoutall,
}

/// Runs `command` against `config` and returns the process exit code.
pub async fn run(config: &Config, command: Command) -> i32 {
    let result = match command {
        Command::Wallet { action } => run_wallet(config, action),
        Command::Cheque { action } => run_cheque(config, action).await,
    };
    match result {
        Ok(line) => {
            println!("{line}");
            0
        }
        Err(err) => {
            println!("{err}");
            1
        }
    }
}

fn data_dir(config: &Config) -> PathBuf {
    config.data_dir.clone().unwrap_or_else(|| PathBuf::from("./data"))
}

fn open_store(config: &Config) -> AntResult<SledByteStore> {
    SledByteStore::open(data_dir(config))
}

fn run_wallet(config: &Config, action: WalletAction) -> AntResult<String> {
    let wallet = Wallet::new(StateStore::new(open_store(config)?));
    match action {
        WalletAction::Ls => {
            let mut addresses: Vec<String> =
                wallet.list()?.into_iter().map(|(address, _)| address.to_string()).collect();
            addresses.sort();
            Ok(addresses.join("\n"))
        }
        WalletAction::New => Ok(wallet.new_address()?.to_string()),
        WalletAction::Delete { address } => {
            wallet.delete(&address)?;
            Ok(format!("deleted {address}"))
        }
        WalletAction::Import { private_key } => Ok(wallet.import(&private_key)?.to_string()),
        WalletAction::Export { address } => Ok(wallet.get(&address)?.0.to_string()),
        WalletAction::Default => Ok(wallet.get_default()?.address()?.to_string()),
        WalletAction::Setdefault { address } => {
            wallet.set_default(&address)?;
            Ok(format!("default set to {address}"))
        }
    }
}

fn build_tx_service(config: &Config, wallet: &Wallet<SledByteStore>) -> AntResult<AlloyTransactionService> {
    let signer = wallet.get_default()?.signer()?;
    Ok(AlloyTransactionService::connect(
        config.chain.endpoint.clone(),
        signer,
        CHAIN_CALL_TIMEOUT,
    ))
}

async fn run_cheque(config: &Config, action: ChequeAction) -> AntResult<String> {
    let store = open_store(config)?;
    let wallet = Wallet::new(StateStore::new(store.clone()));
    let cheque_store = ChequeStore::new(StateStore::new(store));
    let beneficiary = wallet.get_default()?.address()?;

    match action {
        ChequeAction::Ls => {
            let lines: Vec<String> = cheque_store
                .get_cheques()?
                .into_iter()
                .map(|c| format!("{} {}", c.chequebook, c.cumulative_payout()))
                .collect();
            Ok(lines.join("\n"))
        }
        ChequeAction::Get { chequebook } => {
            let tx = build_tx_service(config, &wallet)?;
            let manager = ChequeManager::new(&cheque_store, &tx, beneficiary);
            let accounting = manager.convert_cheque(chequebook).await?;
            Ok(format!(
                "cumulativePayout={} paidOut={} canCashOut={}",
                accounting.cumulative_payout, accounting.paid_out, accounting.can_cash_out
            ))
        }
        ChequeAction::Cashout { chequebook } => {
            let tx = build_tx_service(config, &wallet)?;
            let manager = ChequeManager::new(&cheque_store, &tx, beneficiary);
            Ok(manager.cash_out(chequebook).await?.to_string())
        }
        ChequeAction::Cashoutall => {
            let tx = build_tx_service(config, &wallet)?;
            let manager = ChequeManager::new(&cheque_store, &tx, beneficiary);
            let hashes = manager.cash_out_all().await?;
            Ok(hashes.iter().map(|h| h.to_string()).collect::<Vec<_>>().join("\n"))
        }
    }
}
