//! # sous-strategy
//!
//! Bonus reward strategies invoked when yield tokens are burned.
//!
//! A strategy holds a table of `(reward_token, ratio)` slots. When the chef
//! reports a burn of `amount` yield tokens for a user, each active slot is
//! owed `amount * ratio / T`, where `T` is the sum of all active ratios. How
//! the owed amount is supplied depends on the backend:
//!
//! - [`FundedPool`] pays from a pre-deposited balance, capped at what it holds
//! - [`MintedSupply`] mints on demand and pays nothing for assets it may not mint
//!
//! Shortfalls are never errors and never recorded as debt.
//!
//! ## Modules
//!
//! - [`table`]: Sparse id-indexed reward slots
//! - [`distributor`]: Ratio-weighted claim logic shared by both backends
//! - [`funded`]: Pre-funded backend ("reward bucket")
//! - [`minted`]: Minting backend ("reward fountain")
//! - [`registry`]: Address-keyed set of deployed strategies

pub mod distributor;
pub mod funded;
pub mod minted;
pub mod registry;
pub mod table;

use std::fmt;

pub use distributor::{RewardDistributor, SupplyBackend};
pub use funded::{FundedPool, RewardBucket};
pub use minted::{MintedSupply, RewardFountain};
pub use registry::StrategyRegistry;
pub use table::{RewardSlot, RewardTable};

use serde::{Deserialize, Serialize};
use sous_token::{TokenBank, TokenError};
use sous_types::{Address, Amount};

/// Error types for strategy operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StrategyError {
    /// Caller is neither the owner (admin calls) nor the chef (claims).
    #[error("caller {0} is not authorized")]
    Unauthorized(Address),

    /// Parallel argument lists differ in length.
    #[error("length mismatch: {left} vs {right}")]
    LengthMismatch {
        /// Length of the first list.
        left: usize,
        /// Length of the mismatched list.
        right: usize,
    },

    /// Slot id was never allocated.
    #[error("unknown reward slot {0}")]
    UnknownSlot(u64),

    /// Slot would carry a ratio without an asset.
    #[error("invalid reward slot {id}: nonzero ratio needs a reward token")]
    InvalidSlot {
        /// The offending slot id (or the id it would receive).
        id: u64,
    },

    /// The backend does not support the operation.
    #[error("operation not supported by this strategy")]
    Unsupported,

    /// Held balance too low for a withdrawal.
    #[error("insufficient balance of {token}: have {available}, need {required}")]
    InsufficientBalance {
        /// Asset being withdrawn.
        token: Address,
        /// Balance held by the strategy.
        available: Amount,
        /// Total requested.
        required: Amount,
    },

    /// Ratio sum or payout overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// Token ledger error.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// Convenience result type for strategy operations.
pub type Result<T> = std::result::Result<T, StrategyError>;

/// Which supply model a strategy uses.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyKind {
    Funded,
    Minted,
}

/// What one slot received from a claim.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPayout {
    /// Slot id in the strategy's table.
    pub id: u64,
    pub reward_token: Address,
    /// `burned * ratio / T`.
    pub ideal: Amount,
    /// What the user actually received.
    pub paid: Amount,
}

/// A bonus reward strategy as seen by the chef.
///
/// Object safe: the chef holds strategies as `dyn RewardStrategy` so either
/// backend can be assigned to any pool.
pub trait RewardStrategy: fmt::Debug {
    fn kind(&self) -> StrategyKind;

    fn address(&self) -> Address;

    /// The only account allowed to call [`claim_reward`](Self::claim_reward).
    fn sous_chef(&self) -> Address;

    /// Administrator of the reward table.
    fn owner(&self) -> Address;

    /// Distribute bonus assets to `user` for `amount` burned yield tokens.
    ///
    /// Per-asset failures pay zero for that asset and do not fail the claim.
    ///
    /// # Errors
    ///
    /// - [`StrategyError::Unauthorized`] if `caller` is not the chef
    fn claim_reward(
        &mut self,
        bank: &mut TokenBank,
        caller: Address,
        user: Address,
        amount: Amount,
    ) -> Result<Vec<RewardPayout>>;

    /// Overwrite slots by id. Zero token with zero ratio removes a slot.
    fn set_reward_tokens(
        &mut self,
        caller: Address,
        ids: &[u64],
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<()>;

    /// Append slots. Returns the ids they received.
    fn add_reward_tokens(
        &mut self,
        caller: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Vec<u64>>;

    /// Move held reward assets out, bypassing ratios. Owner only.
    fn withdraw_reward_tokens(
        &mut self,
        bank: &mut TokenBank,
        caller: Address,
        to: Address,
        ids: &[u64],
        amounts: &[Amount],
    ) -> Result<()>;

    /// Slot `id`, or an empty slot if it was never allocated.
    fn reward_tokens(&self, id: u64) -> RewardSlot;

    /// Number of slot ids allocated so far.
    fn reward_token_count(&self) -> u64;

    /// Hand administration to `new_owner`. Returns the previous owner.
    fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<Address>;

    /// Give up administration for good. The reward table is frozen from
    /// then on; claims keep working.
    fn renounce_ownership(&mut self, caller: Address) -> Result<Address> {
        self.transfer_ownership(caller, Address::ZERO)
    }
}

fn check_lengths(left: usize, right: usize) -> Result<()> {
    if left == right {
        Ok(())
    } else {
        Err(StrategyError::LengthMismatch { left, right })
    }
}
