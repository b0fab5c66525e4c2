//! # sous-chef
//!
//! Yield tokens over a block-emission staking engine.
//!
//! The chef stakes users' LP tokens into a [`StakingEngine`] under its own
//! account, routes every harvested base reward into a [`ShareVault`], and
//! mints one yield token per vault share to the depositors who earned it.
//! Burning yield tokens redeems the matching vault shares for the base asset
//! and optionally triggers a bonus payout from the pool's reward strategy.
//!
//! ## Modules
//!
//! - [`chef`]: Registration, deposit, withdraw and burn
//! - [`index`]: Base-asset reward per yield token
//! - [`config`]: TOML configuration
//! - [`events`]: Event bus
//! - [`runtime`]: A complete in-memory deployment
//!
//! [`StakingEngine`]: sous_engine::StakingEngine
//! [`ShareVault`]: sous_engine::ShareVault

pub mod chef;
pub mod config;
pub mod events;
pub mod index;
pub mod runtime;

pub use chef::{BurnReceipt, Host, HostView, SousChef, UserStake, YieldTokenInfo};
pub use config::ChefConfig;
pub use events::EventBus;
pub use index::RewardIndex;
pub use runtime::Runtime;

use sous_engine::EngineError;
use sous_strategy::StrategyError;
use sous_token::TokenError;
use sous_types::{Address, Amount, PoolId};

/// Error types for chef operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ChefError {
    /// Caller is not the chef's owner.
    #[error("caller {0} is not the owner")]
    Unauthorized(Address),

    /// The pool already has a yield token.
    #[error("pool {pid} already has a yield token")]
    AlreadyRegistered {
        /// The pool id.
        pid: PoolId,
    },

    /// The pool has no yield token.
    #[error("pool {pid} has no yield token")]
    NotRegistered {
        /// The pool id.
        pid: PoolId,
    },

    /// The staking engine has no such pool.
    #[error("pool {pid} does not exist in the staking engine")]
    InvalidPool {
        /// The pool id.
        pid: PoolId,
    },

    /// The address is not a yield token of this chef.
    #[error("{0} is not a registered yield token")]
    UnknownToken(Address),

    /// The address is not a deployed strategy.
    #[error("{0} is not a deployed strategy")]
    UnknownStrategy(Address),

    /// Burn larger than the caller's yield token balance.
    #[error("insufficient yield token balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Caller's balance.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// Withdrawal larger than the caller's stake.
    #[error("insufficient stake: have {available}, need {required}")]
    InsufficientStake {
        /// Caller's stake.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// Parallel argument lists differ in length.
    #[error("length mismatch: {pids} pids, {strategies} strategies")]
    LengthMismatch {
        /// Number of pool ids.
        pids: usize,
        /// Number of strategies.
        strategies: usize,
    },

    /// Accumulator or amount overflowed.
    #[error("arithmetic overflow")]
    Overflow,

    /// Token ledger error.
    #[error("token error: {0}")]
    Token(#[from] TokenError),

    /// Staking engine or vault error.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// Strategy administration error.
    #[error("strategy error: {0}")]
    Strategy(#[from] StrategyError),
}

/// Convenience result type for chef operations.
pub type Result<T> = std::result::Result<T, ChefError>;
