//! Address-keyed registry of every token in a deployment.
//!
//! Contracts never hold token objects directly: they name tokens by address
//! and move balances through the bank. This keeps a single source of truth
//! for balances across the chef, the staking engine, the vault and the
//! strategies.

use std::collections::HashMap;

use sous_types::{Address, Amount};

use crate::ledger::Token;
use crate::yield_token::YieldBinding;
use crate::{Result, TokenError};

/// All tokens of a deployment, keyed by address.
#[derive(Clone, Debug, Default)]
pub struct TokenBank {
    tokens: HashMap<Address, Token>,
    /// Per-creator counter feeding [`Address::token`].
    nonces: HashMap<Address, u64>,
}

impl TokenBank {
    /// Create an empty bank.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a plain token owned by `creator` at the next derived address.
    pub fn create_token(&mut self, creator: Address, name: &str, symbol: &str) -> Result<Address> {
        let nonce = self.nonces.get(&creator).copied().unwrap_or(0);
        let address = Address::token(&creator, nonce);
        self.insert(Token::new(address, name, symbol, creator))?;
        self.nonces.insert(creator, nonce + 1);
        Ok(address)
    }

    /// Register a token at its own address.
    ///
    /// # Errors
    ///
    /// - [`TokenError::TokenExists`] if the address is taken
    pub fn insert(&mut self, token: Token) -> Result<Address> {
        let address = token.address();
        if self.tokens.contains_key(&address) {
            return Err(TokenError::TokenExists(address));
        }
        tracing::debug!(
            token = %address,
            symbol = token.symbol(),
            owner = %token.owner(),
            "token created"
        );
        self.tokens.insert(address, token);
        Ok(address)
    }

    pub fn contains(&self, token: &Address) -> bool {
        self.tokens.contains_key(token)
    }

    /// Look up a token.
    ///
    /// # Errors
    ///
    /// - [`TokenError::UnknownToken`] if nothing is registered at `token`
    pub fn get(&self, token: &Address) -> Result<&Token> {
        self.tokens
            .get(token)
            .ok_or(TokenError::UnknownToken(*token))
    }

    fn get_mut(&mut self, token: &Address) -> Result<&mut Token> {
        self.tokens
            .get_mut(token)
            .ok_or(TokenError::UnknownToken(*token))
    }

    /// Pool binding of a yield token, `None` for plain tokens and unknown addresses.
    pub fn binding(&self, token: &Address) -> Option<YieldBinding> {
        self.tokens.get(token).and_then(|t| t.binding().copied())
    }

    pub fn balance_of(&self, token: &Address, account: &Address) -> Result<Amount> {
        Ok(self.get(token)?.balance_of(account))
    }

    pub fn total_supply(&self, token: &Address) -> Result<Amount> {
        Ok(self.get(token)?.total_supply())
    }

    pub fn allowance(&self, token: &Address, owner: &Address, spender: &Address) -> Result<Amount> {
        Ok(self.get(token)?.allowance(owner, spender))
    }

    /// See [`Token::transfer`].
    pub fn transfer(
        &mut self,
        token: &Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.get_mut(token)?.transfer(from, to, amount)
    }

    /// See [`Token::approve`].
    pub fn approve(
        &mut self,
        token: &Address,
        owner: Address,
        spender: Address,
        amount: Amount,
    ) -> Result<()> {
        self.get_mut(token)?.approve(owner, spender, amount);
        Ok(())
    }

    /// See [`Token::transfer_from`].
    pub fn transfer_from(
        &mut self,
        token: &Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.get_mut(token)?.transfer_from(spender, from, to, amount)
    }

    /// See [`Token::mint`].
    pub fn mint(
        &mut self,
        token: &Address,
        caller: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        self.get_mut(token)?.mint(caller, to, amount)?;
        tracing::debug!(token = %token, to = %to, amount, "minted");
        Ok(())
    }

    /// See [`Token::burn`].
    pub fn burn(
        &mut self,
        token: &Address,
        caller: Address,
        from: Address,
        amount: Amount,
    ) -> Result<()> {
        self.get_mut(token)?.burn(caller, from, amount)?;
        tracing::debug!(token = %token, from = %from, amount, "burned");
        Ok(())
    }

    /// Grant or revoke minting rights on a plain token.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Unauthorized`] if `caller` is not the owner, or the
    ///   token is a yield token (its minter set is fixed to the chef)
    pub fn set_minter(
        &mut self,
        token: &Address,
        caller: Address,
        minter: Address,
        allowed: bool,
    ) -> Result<()> {
        let entry = self.get_mut(token)?;
        if entry.binding().is_some() {
            return Err(TokenError::Unauthorized {
                caller,
                token: *token,
            });
        }
        entry.set_minter(caller, minter, allowed)?;
        tracing::info!(token = %token, minter = %minter, allowed, "minter updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::yield_token::new_yield_token;

    #[test]
    fn test_create_token_addresses_are_sequential() {
        let mut bank = TokenBank::new();
        let deployer = Address::account("deployer");
        let first = bank.create_token(deployer, "A", "A").expect("create");
        let second = bank.create_token(deployer, "B", "B").expect("create");
        assert_eq!(first, Address::token(&deployer, 0));
        assert_eq!(second, Address::token(&deployer, 1));
    }

    #[test]
    fn test_insert_rejects_duplicates() {
        let mut bank = TokenBank::new();
        let chef = Address::account("chef");
        bank.insert(new_yield_token(chef, 0, Address::ZERO))
            .expect("first insert");
        let result = bank.insert(new_yield_token(chef, 0, Address::ZERO));
        assert!(matches!(result, Err(TokenError::TokenExists(_))));
    }

    #[test]
    fn test_unknown_token() {
        let bank = TokenBank::new();
        let missing = Address::account("missing");
        assert_eq!(
            bank.balance_of(&missing, &missing),
            Err(TokenError::UnknownToken(missing))
        );
        assert!(bank.binding(&missing).is_none());
    }

    #[test]
    fn test_yield_token_minters_fixed() {
        let mut bank = TokenBank::new();
        let chef = Address::account("chef");
        let token = bank
            .insert(new_yield_token(chef, 0, Address::ZERO))
            .expect("insert");
        let result = bank.set_minter(&token, chef, Address::account("other"), true);
        assert!(matches!(result, Err(TokenError::Unauthorized { .. })));
    }

    #[test]
    fn test_bank_roundtrip_operations() {
        let mut bank = TokenBank::new();
        let owner = Address::account("owner");
        let alice = Address::account("alice");
        let bob = Address::account("bob");
        let token = bank.create_token(owner, "Reward", "RWD").expect("create");

        bank.mint(&token, owner, alice, 100).expect("mint");
        bank.approve(&token, alice, bob, 60).expect("approve");
        bank.transfer_from(&token, bob, alice, bob, 60).expect("pull");
        bank.burn(&token, owner, bob, 10).expect("burn");

        assert_eq!(bank.balance_of(&token, &alice).expect("balance"), 40);
        assert_eq!(bank.balance_of(&token, &bob).expect("balance"), 50);
        assert_eq!(bank.total_supply(&token).expect("supply"), 90);
    }
}
