//! Wire-level message types and the capability traits the mine service
//! dispatches onto. `Messenger`, `Blockstore`, `Pinner`, and `BlockService`
//! are consumed capabilities (no concrete libp2p/IPFS implementation ships
//! in this crate); in-memory fakes exercise them in tests.

use crate::types::TokenAmount;
use async_trait::async_trait;
use cid::Cid;
use libp2p_identity::PeerId;
use std::time::Duration;

/// Outcome code attached to a terminal block operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultCode {
    Success,
    Failure(String),
}

/// A reward cheque received from a queen. Never issued locally.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Cheque {
    pub chequebook: alloy_primitives::Address,
    pub beneficiary: alloy_primitives::Address,
    pub cumulative_payout: alloy_primitives::U256,
    pub cumulative_reward: alloy_primitives::U256,
    pub signature: Vec<u8>,
}

impl Cheque {
    pub fn cumulative_payout(&self) -> TokenAmount {
        TokenAmount(self.cumulative_payout)
    }
}

/// A migration directive: copy content addressed by `cid` from `from_ant`.
#[derive(Debug, Clone)]
pub struct MigrateBlockRequest {
    pub from_ant: String,
    pub cids: Vec<Cid>,
}

#[derive(Debug, Clone)]
pub struct MigrateBlockResponse {
    pub seq: u64,
    pub code: ResultCode,
}

/// Per-block completion, streamed to the queen one message per block.
#[derive(Debug, Clone)]
pub struct MigrateBlockResult {
    pub from_ant: String,
    pub cid: Cid,
    pub code: ResultCode,
}

#[derive(Debug, Clone)]
pub struct PushBlockRequest {
    pub cid: Cid,
    pub bytes: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct PushBlockResponse {
    pub seq: u64,
    pub code: ResultCode,
}

/// Outbound messaging to peers. Inbound dispatch is the mine service's own
/// public API (`MineService::on_*`); a real transport calls into it.
#[async_trait]
pub trait Messenger: Send + Sync {
    async fn ping(&self, peer: &PeerId, timeout: Duration) -> crate::error::AntResult<()>;

    /// Responds to an inbound ping with `Pong{seq}`.
    async fn respond_pong(&self, peer: &PeerId, seq: u64, timeout: Duration) -> crate::error::AntResult<()>;

    async fn respond_push_block(
        &self,
        peer: &PeerId,
        response: PushBlockResponse,
        timeout: Duration,
        attempts: u32,
    ) -> crate::error::AntResult<()>;

    async fn respond_migrate_block(
        &self,
        peer: &PeerId,
        response: MigrateBlockResponse,
        timeout: Duration,
        attempts: u32,
    ) -> crate::error::AntResult<()>;

    async fn send_migrate_block_result(
        &self,
        peer: &PeerId,
        result: MigrateBlockResult,
        timeout: Duration,
        attempts: u32,
    ) -> crate::error::AntResult<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinMode {
    Direct,
}

#[async_trait]
pub trait Blockstore: Send + Sync {
    async fn has(&self, cid: &Cid) -> crate::error::AntResult<bool>;
    async fn add(&self, cid: Cid, bytes: Vec<u8>) -> crate::error::AntResult<()>;
}

#[async_trait]
pub trait Pinner: Send + Sync {
    async fn pin(&self, cid: &Cid, mode: PinMode) -> crate::error::AntResult<()>;
}

#[async_trait]
pub trait BlockService: Send + Sync {
    /// Fetches a block from the network. Triggered only when the block is
    /// not already present in the local blockstore.
    async fn get_block(&self, cid: &Cid) -> crate::error::AntResult<Vec<u8>>;
}
