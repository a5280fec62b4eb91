//! Context-scoped transaction parameters.
//!
//! Rust has no ambient per-call context type to carry gas price/limit on.
//! Instead a small value is passed explicitly to the transaction facade at
//! the call site, rather than threaded implicitly through every signature.

use alloy_primitives::U256;

/// Per-call gas parameters. Absent fields mean "use backend default" (gas
/// limit) or "backend-estimated" (gas price).
#[derive(Debug, Clone, Copy, Default)]
pub struct CallContext {
    pub gas_price: Option<U256>,
    pub gas_limit: Option<u64>,
}

impl CallContext {
    pub fn with_gas_price(mut self, gas_price: U256) -> Self {
        self.gas_price = Some(gas_price);
        self
    }

    pub fn with_gas_limit(mut self, gas_limit: u64) -> Self {
        self.gas_limit = Some(gas_limit);
        self
    }

    /// Returns `gas_limit`, falling back to `default` if unset — used by
    /// cheque cashout, which defaults to 300,000 gas.
    pub fn gas_limit_or(&self, default: u64) -> u64 {
        self.gas_limit.unwrap_or(default)
    }
}
