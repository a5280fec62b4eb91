//! Node agent for a decentralized storage-mining network (an "ant").
//!
//! Each node maintains an on-chain stake, receives block-push and
//! block-migration directives from a rotating set of coordinator peers
//! ("queens"), persists incoming content into a local block store, records
//! and cashes out reward cheques, and manages a local secp256k1 wallet.
//!
//! # Core subsystems
//!
//! - [`mine`] — the mine service: message dispatch, the queen ping loop,
//!   and composition root for the rest of the crate.
//! - [`migrator`] — the asynchronous block-migration pipeline the mine
//!   service drives.
//! - [`queen`] — round-robin coordinator-peer selection with failover.
//! - [`chain`] — the read-only [`chain::ChainBackend`] capability, the
//!   transaction facade ([`chain::tx`]), and the one-shot stake-acquisition
//!   flow ([`chain::bootstrap`]).
//! - [`cheque`] — cheque persistence and on-chain cashout accounting.
//! - [`wallet`] and [`signer`] — the local key store and the signing
//!   capability bound to its default key.
//! - [`statestore`] — the typed key/value layer every persisted subsystem
//!   builds on.
//! - [`proto`] — wire-level message types and the `Messenger` /
//!   `Blockstore` / `Pinner` / `BlockService` capability traits the mine
//!   service is built against (no concrete transport ships in this crate).
//! - [`types`] — token/native amount value types.
//! - [`sctx`] — context-scoped gas parameters.
//! - [`retry`] — the generic retry helper used by the chain bootstrap.
//! - [`config`] — node configuration loading.
//! - [`error`] — the crate's single error taxonomy.

pub mod chain;
pub mod cheque;
pub mod cli;
pub mod config;
pub mod error;
pub mod migrator;
pub mod mine;
pub mod proto;
pub mod queen;
pub mod retry;
pub mod sctx;
mod sig_down;
pub mod signer;
pub mod statestore;
mod telemetry;
pub mod types;
pub mod util;
pub mod wallet;
