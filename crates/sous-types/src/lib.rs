//! # sous-types
//!
//! Shared domain types used across the SousChef workspace.
//!
//! ## Modules
//!
//! - [`address`]: 32-byte account/contract addresses
//! - [`events`]: Events emitted by the chef and its strategies

pub mod address;
pub mod events;

pub use address::Address;

/// Token amounts. Wide enough that `amount * ACC_PRECISION` fits for any
/// realistic supply.
pub type Amount = u128;

/// Pool identifier in the staking engine.
pub type PoolId = u64;

/// Block height. Reward emission is block-based.
pub type BlockNumber = u64;

/// Fixed-point scale of every per-share accumulator
/// (`acc_reward_per_share`, `acc_yield_per_share`).
pub const ACC_PRECISION: Amount = 1_000_000_000_000;

/// Fixed-point scale of the base-asset reward index.
pub const INDEX_PRECISION: Amount = 1_000_000_000_000;

/// Compute `a * b / c`, rounding down.
///
/// Returns `None` on overflow or when `c` is zero.
pub fn mul_div(a: Amount, b: Amount, c: Amount) -> Option<Amount> {
    if c == 0 {
        return None;
    }
    a.checked_mul(b).map(|product| product / c)
}
