//! Big-integer amount types with a fixed decimal count.
//!
//! Reward cheques and on-chain balances are carried as arbitrary-precision
//! integers (raw token units); these wrappers only add a `Display` that
//! scales the integer into a human-readable decimal via `rust_decimal`.

use alloy_primitives::U256;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use std::fmt;
use std::str::FromStr;

/// An amount denominated in the locker/chequebook token, 16 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct TokenAmount(pub U256);

/// An amount denominated in the chain's native coin, 18 decimal places.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NativeAmount(pub U256);

const TOKEN_DECIMALS: u32 = 16;
const NATIVE_DECIMALS: u32 = 18;

fn to_display(raw: U256, decimals: u32) -> String {
    // U256 can exceed Decimal's 96-bit mantissa for very large balances;
    // fall back to the raw integer string in that (expected to be rare) case.
    match Decimal::from_str(&raw.to_string()) {
        Ok(d) => {
            let scaled = d / Decimal::from_u128(10u128.pow(decimals)).expect("fits in u128");
            scaled.normalize().to_string()
        }
        Err(_) => raw.to_string(),
    }
}

impl fmt::Display for TokenAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_display(self.0, TOKEN_DECIMALS))
    }
}

impl fmt::Display for NativeAmount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", to_display(self.0, NATIVE_DECIMALS))
    }
}

impl From<U256> for TokenAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl From<U256> for NativeAmount {
    fn from(value: U256) -> Self {
        Self(value)
    }
}

impl TokenAmount {
    pub fn zero() -> Self {
        Self(U256::ZERO)
    }

    pub fn saturating_sub(self, rhs: Self) -> Self {
        if self.0 >= rhs.0 {
            Self(self.0 - rhs.0)
        } else {
            Self::zero()
        }
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}
