//! Chain-side capabilities: a read-only [`ChainBackend`], the typed contract
//! bindings (locker / chequebook / ERC-20), the [`tx`] transaction facade,
//! and the one-shot [`bootstrap`] stake-acquisition flow.
//!
//! Contract ABIs are declared with `alloy_sol_types::sol!` rather than
//! hand-rolled ABI pack/unpack calls.

pub mod bootstrap;
pub mod nonce;
pub mod tx;

use alloy_primitives::{Address, U256};
use async_trait::async_trait;

/// Read-only chain queries consumed by the bootstrap flow and the CLI's
/// balance commands.
#[async_trait]
pub trait ChainBackend: Send + Sync {
    async fn balance_at(&self, address: Address) -> crate::error::AntResult<U256>;
    async fn suggest_gas_price(&self) -> crate::error::AntResult<U256>;
    async fn chain_id(&self) -> crate::error::AntResult<u64>;
}

alloy_sol_types::sol! {
    #[sol(rpc)]
    interface ILocker {
        function minLockAmount() external view returns (uint256);
        function antLockInfos(string calldata nodeId) external view returns (uint256 lockedAmount, uint256 lockedAt);
        function lock(string calldata nodeId, address antAddress) external returns (bool);
        function tokenContract() external view returns (address);
    }

    #[sol(rpc)]
    interface IChequebook {
        function paidOut(address beneficiary) external view returns (uint256);
        function cashCheque(address beneficiary, uint256 cumulativePayout, bytes calldata signature) external returns (bool);
    }

    #[sol(rpc)]
    interface IERC20 {
        function balanceOf(address owner) external view returns (uint256);
        function transfer(address to, uint256 amount) external returns (bool);
        function approve(address spender, uint256 amount) external returns (bool);
    }
}
