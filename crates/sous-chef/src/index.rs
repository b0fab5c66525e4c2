//! Base-asset reward per yield token.
//!
//! Every outstanding yield token is backed by one vault share held by the
//! chef, so the base asset a yield token redeems for is the vault's
//! `asset_balance / total_shares`. The chef tracks that ratio as a
//! fixed-point index scaled by [`INDEX_PRECISION`]. The stored value never
//! goes down while shares are outstanding; once the vault is empty it falls
//! back to [`RewardIndex::ONE`].

use std::fmt;

use serde::{Deserialize, Serialize};
use sous_types::{mul_div, Amount, INDEX_PRECISION};

use crate::{ChefError, Result};

/// Fixed-point base asset per yield token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RewardIndex(Amount);

impl RewardIndex {
    /// One base unit per yield token: the rate of an empty vault.
    pub const ONE: RewardIndex = RewardIndex(INDEX_PRECISION);

    pub const fn from_raw(raw: Amount) -> Self {
        Self(raw)
    }

    pub fn from_units(units: Amount) -> Option<Self> {
        units.checked_mul(INDEX_PRECISION).map(Self)
    }

    pub fn raw(&self) -> Amount {
        self.0
    }

    /// Whole base units per yield token, rounded down.
    pub fn as_units(&self) -> Amount {
        self.0 / INDEX_PRECISION
    }

    /// Index implied by a vault holding `asset_balance` against
    /// `total_shares`. `None` while no shares exist.
    pub fn from_vault(asset_balance: Amount, total_shares: Amount) -> Result<Option<Self>> {
        if total_shares == 0 {
            return Ok(None);
        }
        mul_div(asset_balance, INDEX_PRECISION, total_shares)
            .map(|raw| Some(Self(raw)))
            .ok_or(ChefError::Overflow)
    }

    /// Base asset owed for `amount` yield tokens, rounded down.
    pub fn apply(&self, amount: Amount) -> Result<Amount> {
        mul_div(amount, self.0, INDEX_PRECISION).ok_or(ChefError::Overflow)
    }

    /// Advance to `observed` if it is higher.
    pub fn advance(&mut self, observed: RewardIndex) -> bool {
        if observed > *self {
            *self = observed;
            true
        } else {
            false
        }
    }
}

impl Default for RewardIndex {
    fn default() -> Self {
        Self::ONE
    }
}

impl fmt::Display for RewardIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{:012}",
            self.0 / INDEX_PRECISION,
            self.0 % INDEX_PRECISION
        )
    }
}
