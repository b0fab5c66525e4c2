//! # sous-token
//!
//! Fungible token ledger for the SousChef workspace.
//!
//! Every asset in the system (stake tokens, the base reward asset, vault
//! shares, bonus reward assets and the per-pool yield tokens) is a [`Token`]
//! held in one [`TokenBank`]. Minting and burning are gated by a per-token
//! minter set; yield tokens carry an immutable [`YieldBinding`] and list the
//! chef as their only minter.
//!
//! ## Modules
//!
//! - [`ledger`]: Single-token balances, allowances and supply
//! - [`bank`]: Address-keyed registry of tokens
//! - [`yield_token`]: Pool binding for chef-issued yield tokens

pub mod bank;
pub mod ledger;
pub mod yield_token;

pub use bank::TokenBank;
pub use ledger::Token;
pub use yield_token::YieldBinding;

use sous_types::{Address, Amount};

/// Error types for token operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum TokenError {
    /// No token is registered at the address.
    #[error("unknown token {0}")]
    UnknownToken(Address),

    /// A token already exists at the address.
    #[error("token already exists at {0}")]
    TokenExists(Address),

    /// Balance too low for a transfer or burn.
    #[error("insufficient balance: have {available}, need {required}")]
    InsufficientBalance {
        /// Balance of the debited account.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// Allowance too low for a delegated transfer.
    #[error("insufficient allowance: have {available}, need {required}")]
    InsufficientAllowance {
        /// Remaining allowance.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// The caller may not mint, burn or administer this token.
    #[error("caller {caller} is not authorized on token {token}")]
    Unauthorized {
        /// The rejected caller.
        caller: Address,
        /// The token being operated on.
        token: Address,
    },

    /// Supply or balance would overflow.
    #[error("arithmetic overflow")]
    Overflow,
}

/// Convenience result type for token operations.
pub type Result<T> = std::result::Result<T, TokenError>;
