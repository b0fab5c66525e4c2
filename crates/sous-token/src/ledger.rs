//! Single-token ledger.
//!
//! A [`Token`] tracks balances, allowances and total supply for one asset.
//! Every mutating method validates first and writes last, so an `Err` never
//! leaves a half-applied transfer behind.

use std::collections::{BTreeSet, HashMap};

use sous_types::{Address, Amount};

use crate::yield_token::YieldBinding;
use crate::{Result, TokenError};

/// Allowance value treated as unlimited: never decremented.
pub const UNLIMITED_ALLOWANCE: Amount = Amount::MAX;

/// A fungible token.
#[derive(Clone, Debug)]
pub struct Token {
    address: Address,
    name: String,
    symbol: String,
    /// May grant and revoke minter rights.
    owner: Address,
    /// Accounts allowed to mint and burn.
    minters: BTreeSet<Address>,
    total_supply: Amount,
    balances: HashMap<Address, Amount>,
    /// `(owner, spender) -> remaining allowance`.
    allowances: HashMap<(Address, Address), Amount>,
    binding: Option<YieldBinding>,
}

impl Token {
    /// Create an empty token. The owner starts as the only minter.
    pub fn new(address: Address, name: &str, symbol: &str, owner: Address) -> Self {
        Self {
            address,
            name: name.to_string(),
            symbol: symbol.to_string(),
            owner,
            minters: BTreeSet::from([owner]),
            total_supply: 0,
            balances: HashMap::new(),
            allowances: HashMap::new(),
            binding: None,
        }
    }

    /// Attach a yield binding. Only used when the chef creates a yield token.
    pub(crate) fn with_binding(mut self, binding: YieldBinding) -> Self {
        self.binding = Some(binding);
        self
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn total_supply(&self) -> Amount {
        self.total_supply
    }

    /// Pool binding, present only on yield tokens.
    pub fn binding(&self) -> Option<&YieldBinding> {
        self.binding.as_ref()
    }

    /// Balance of `account` (zero when unknown).
    pub fn balance_of(&self, account: &Address) -> Amount {
        self.balances.get(account).copied().unwrap_or(0)
    }

    /// Remaining allowance `owner` granted to `spender`.
    pub fn allowance(&self, owner: &Address, spender: &Address) -> Amount {
        self.allowances
            .get(&(*owner, *spender))
            .copied()
            .unwrap_or(0)
    }

    pub fn is_minter(&self, account: &Address) -> bool {
        self.minters.contains(account)
    }

    /// Move `amount` from `from` to `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    /// - [`TokenError::Overflow`] if the recipient balance would overflow
    pub fn transfer(&mut self, from: Address, to: Address, amount: Amount) -> Result<()> {
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        if from == to || amount == 0 {
            return Ok(());
        }
        let credited = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.set_balance(from, available - amount);
        self.set_balance(to, credited);
        Ok(())
    }

    /// Set the allowance of `spender` over `owner`'s balance.
    pub fn approve(&mut self, owner: Address, spender: Address, amount: Amount) {
        if amount == 0 {
            self.allowances.remove(&(owner, spender));
        } else {
            self.allowances.insert((owner, spender), amount);
        }
    }

    /// Move `amount` from `from` to `to` on behalf of `spender`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::InsufficientAllowance`] if the allowance is too low
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    pub fn transfer_from(
        &mut self,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        let allowed = if spender == from {
            UNLIMITED_ALLOWANCE
        } else {
            self.allowance(&from, &spender)
        };
        if allowed < amount {
            return Err(TokenError::InsufficientAllowance {
                available: allowed,
                required: amount,
            });
        }

        self.transfer(from, to, amount)?;

        if allowed != UNLIMITED_ALLOWANCE {
            self.approve(from, spender, allowed - amount);
        }
        Ok(())
    }

    /// Create `amount` new units for `to`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Unauthorized`] if `caller` is not a minter
    /// - [`TokenError::Overflow`] if supply or balance would overflow
    pub fn mint(&mut self, caller: Address, to: Address, amount: Amount) -> Result<()> {
        self.require_minter(caller)?;
        let supply = self
            .total_supply
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;
        let balance = self
            .balance_of(&to)
            .checked_add(amount)
            .ok_or(TokenError::Overflow)?;

        self.total_supply = supply;
        self.set_balance(to, balance);
        Ok(())
    }

    /// Destroy `amount` units held by `from`.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Unauthorized`] if `caller` is not a minter
    /// - [`TokenError::InsufficientBalance`] if `from` holds less than `amount`
    pub fn burn(&mut self, caller: Address, from: Address, amount: Amount) -> Result<()> {
        self.require_minter(caller)?;
        let available = self.balance_of(&from);
        if available < amount {
            return Err(TokenError::InsufficientBalance {
                available,
                required: amount,
            });
        }

        self.total_supply -= amount;
        self.set_balance(from, available - amount);
        Ok(())
    }

    /// Grant or revoke minting rights. Owner only.
    ///
    /// # Errors
    ///
    /// - [`TokenError::Unauthorized`] if `caller` is not the owner
    pub fn set_minter(&mut self, caller: Address, minter: Address, allowed: bool) -> Result<()> {
        if caller != self.owner {
            return Err(TokenError::Unauthorized {
                caller,
                token: self.address,
            });
        }
        if allowed {
            self.minters.insert(minter);
        } else {
            self.minters.remove(&minter);
        }
        Ok(())
    }

    fn require_minter(&self, caller: Address) -> Result<()> {
        if self.minters.contains(&caller) {
            Ok(())
        } else {
            Err(TokenError::Unauthorized {
                caller,
                token: self.address,
            })
        }
    }

    fn set_balance(&mut self, account: Address, balance: Amount) {
        if balance == 0 {
            self.balances.remove(&account);
        } else {
            self.balances.insert(account, balance);
        }
    }
}
