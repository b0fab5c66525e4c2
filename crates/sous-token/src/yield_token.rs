//! Yield tokens: chef-issued receipts for accrued pool yield.
//!
//! A yield token is an ordinary [`Token`] with two differences: its address
//! is derived from `(sous_chef, pid)`, and the chef is its owner and only
//! minter, so nobody else can mint or burn it. Transfers and approvals work
//! like any other token. No yield logic lives here.

use serde::{Deserialize, Serialize};
use sous_types::{Address, PoolId};

use crate::ledger::Token;

/// Display name given to every yield token.
pub const YIELD_TOKEN_NAME: &str = "Sushi Yield Token";

/// Symbol given to every yield token.
pub const YIELD_TOKEN_SYMBOL: &str = "SYT";

/// Immutable link between a yield token and the pool it represents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldBinding {
    /// Pool id in the staking engine.
    pub pid: PoolId,
    /// Stake asset backing the pool.
    pub lp_token: Address,
    /// The chef that created the token and alone may mint or burn it.
    pub sous_chef: Address,
}

impl YieldBinding {
    /// The token address this binding lives at.
    pub fn token_address(&self) -> Address {
        Address::yield_token(&self.sous_chef, self.pid)
    }
}

/// Build the yield token for `pid` at its derived address.
pub fn new_yield_token(sous_chef: Address, pid: PoolId, lp_token: Address) -> Token {
    let binding = YieldBinding {
        pid,
        lp_token,
        sous_chef,
    };
    Token::new(
        binding.token_address(),
        YIELD_TOKEN_NAME,
        YIELD_TOKEN_SYMBOL,
        sous_chef,
    )
    .with_binding(binding)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TokenError;

    #[test]
    fn test_yield_token_bound_to_pool() {
        let chef = Address::account("chef");
        let lp = Address::account("lp");
        let token = new_yield_token(chef, 4, lp);

        assert_eq!(token.address(), Address::yield_token(&chef, 4));
        let binding = token.binding().expect("binding");
        assert_eq!(binding.pid, 4);
        assert_eq!(binding.lp_token, lp);
        assert_eq!(binding.sous_chef, chef);
    }

    #[test]
    fn test_only_chef_mints_and_burns() {
        let chef = Address::account("chef");
        let alice = Address::account("alice");
        let mut token = new_yield_token(chef, 0, Address::account("lp"));

        assert!(matches!(
            token.mint(alice, alice, 1),
            Err(TokenError::Unauthorized { .. })
        ));
        token.mint(chef, alice, 10).expect("chef mints");
        assert!(matches!(
            token.burn(alice, alice, 1),
            Err(TokenError::Unauthorized { .. })
        ));
        token.burn(chef, alice, 10).expect("chef burns");
        assert_eq!(token.total_supply(), 0);
    }

    #[test]
    fn test_chef_cannot_be_joined_by_other_minters() {
        let chef = Address::account("chef");
        let mallory = Address::account("mallory");
        let mut token = new_yield_token(chef, 0, Address::account("lp"));
        assert!(token.set_minter(mallory, mallory, true).is_err());
        assert!(!token.is_minter(&mallory));
    }
}
