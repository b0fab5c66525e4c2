//! # sous-engine
//!
//! Collaborators the chef stakes into and converts rewards through.
//!
//! The chef only ever talks to a [`StakingEngine`] (pools that emit a base
//! reward per block) and a [`ShareVault`] (a vault that wraps the base reward
//! into appreciating shares). Both are traits so any host can be plugged in.
//! This crate also ships in-memory hosts implementing them.
//!
//! ## Modules
//!
//! - [`emission`]: Block-based reward emission across weighted pools
//! - [`vault`]: Share vault over the base reward asset

pub mod emission;
pub mod vault;

use std::fmt;

pub use emission::EmissionEngine;
pub use vault::RewardVault;

use sous_token::{TokenBank, TokenError};
use sous_types::{mul_div, Address, Amount, BlockNumber, PoolId};

/// Error types for engine and vault operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    /// No pool with this id exists.
    #[error("unknown pool {0}")]
    UnknownPool(PoolId),

    /// Withdrawal larger than the staked amount.
    #[error("insufficient stake: have {available}, need {required}")]
    InsufficientStake {
        /// Amount currently staked.
        available: Amount,
        /// Amount requested.
        required: Amount,
    },

    /// Leaving the vault with more shares than held.
    #[error("insufficient shares: have {available}, need {required}")]
    InsufficientShares {
        /// Shares held by the account.
        available: Amount,
        /// Shares requested.
        required: Amount,
    },

    /// The caller is not the engine owner.
    #[error("caller {0} is not the engine owner")]
    Unauthorized(Address),

    /// Arithmetic overflow in reward math.
    #[error("arithmetic overflow")]
    Overflow,

    /// Token ledger error.
    #[error("token error: {0}")]
    Token(#[from] TokenError),
}

/// Convenience result type for engine operations.
pub type Result<T> = std::result::Result<T, EngineError>;

/// A pool-staking engine that emits a base reward per block.
///
/// Stake and reward move through the shared [`TokenBank`]. `deposit` and
/// `withdraw` bring the pool up to date, pay the account's pending reward and
/// only then change its stake.
pub trait StakingEngine: fmt::Debug {
    /// Address the engine holds tokens under.
    fn address(&self) -> Address;

    /// The base reward asset it emits.
    fn reward_token(&self) -> Address;

    /// Stake asset of `pid`, `None` if no such pool exists.
    fn pool_lp_token(&self, pid: PoolId) -> Option<Address>;

    /// Stake `amount` of the pool's asset for `account`.
    ///
    /// The engine pulls the stake with `transfer_from`, so `account` must
    /// have approved it. Returns the base reward harvested to `account`.
    fn deposit(
        &mut self,
        bank: &mut TokenBank,
        block: BlockNumber,
        account: Address,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Amount>;

    /// Unstake `amount` for `account`. Returns the base reward harvested.
    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        block: BlockNumber,
        account: Address,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Amount>;

    /// Reward `account` would harvest if the pool were updated at `block`.
    fn pending_reward(&self, block: BlockNumber, pid: PoolId, account: Address) -> Result<Amount>;

    /// Amount `account` has staked in `pid`.
    fn staked(&self, pid: PoolId, account: Address) -> Amount;
}

/// A vault that converts the base asset into shares at a floating rate.
///
/// The rate is `asset_balance / total_shares`; it rises whenever the vault
/// receives assets without minting shares.
pub trait ShareVault: fmt::Debug {
    /// Address the vault holds its assets under.
    fn address(&self) -> Address;

    /// The underlying base asset.
    fn asset(&self) -> Address;

    /// The share token it mints.
    fn share_token(&self) -> Address;

    /// Deposit `amount` of the asset from `account` (pulled with
    /// `transfer_from`) and mint shares to it. Returns the shares minted.
    fn enter(&mut self, bank: &mut TokenBank, account: Address, amount: Amount) -> Result<Amount>;

    /// Burn `shares` from `account` and pay out the matching asset amount.
    fn leave(&mut self, bank: &mut TokenBank, account: Address, shares: Amount) -> Result<Amount>;

    /// Outstanding shares.
    fn total_shares(&self, bank: &TokenBank) -> Result<Amount> {
        Ok(bank.total_supply(&self.share_token())?)
    }

    /// Base asset held by the vault.
    fn asset_balance(&self, bank: &TokenBank) -> Result<Amount> {
        Ok(bank.balance_of(&self.asset(), &self.address())?)
    }

    /// Shares `enter(amount)` would mint right now. 1:1 while the vault is
    /// empty on either side.
    fn preview_enter(&self, bank: &TokenBank, amount: Amount) -> Result<Amount> {
        let shares = self.total_shares(bank)?;
        let assets = self.asset_balance(bank)?;
        if shares == 0 || assets == 0 {
            return Ok(amount);
        }
        mul_div(amount, shares, assets).ok_or(EngineError::Overflow)
    }

    /// Assets `leave(shares)` would pay right now.
    fn preview_leave(&self, bank: &TokenBank, shares: Amount) -> Result<Amount> {
        let total = self.total_shares(bank)?;
        if total == 0 {
            return Ok(0);
        }
        let assets = self.asset_balance(bank)?;
        mul_div(shares, assets, total).ok_or(EngineError::Overflow)
    }
}
