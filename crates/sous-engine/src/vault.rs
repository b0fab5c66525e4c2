//! Share vault over the base reward asset.
//!
//! Entering deposits the asset and mints shares at the current rate; leaving
//! burns shares for a proportional slice of everything the vault holds.
//! Assets sent to the vault directly (protocol fees, external yield) raise
//! the value of every share.

use sous_token::TokenBank;
use sous_types::{Address, Amount};

use crate::{EngineError, Result, ShareVault};

/// In-memory share vault.
#[derive(Clone, Debug)]
pub struct RewardVault {
    address: Address,
    asset: Address,
    share_token: Address,
}

impl RewardVault {
    /// Deploy a vault at `address` over `asset`.
    ///
    /// Registers the share token in `bank` at `Address::token(address, 0)`,
    /// owned and minted only by the vault.
    pub fn deploy(
        bank: &mut TokenBank,
        address: Address,
        asset: Address,
        share_name: &str,
        share_symbol: &str,
    ) -> Result<Self> {
        bank.get(&asset)?;
        let share_token = bank.create_token(address, share_name, share_symbol)?;
        tracing::info!(vault = %address, asset = %asset, share_token = %share_token, "vault deployed");
        Ok(Self {
            address,
            asset,
            share_token,
        })
    }
}

impl ShareVault for RewardVault {
    fn address(&self) -> Address {
        self.address
    }

    fn asset(&self) -> Address {
        self.asset
    }

    fn share_token(&self) -> Address {
        self.share_token
    }

    fn enter(&mut self, bank: &mut TokenBank, account: Address, amount: Amount) -> Result<Amount> {
        let shares = self.preview_enter(bank, amount)?;
        bank.transfer_from(&self.asset, self.address, account, self.address, amount)?;
        bank.mint(&self.share_token, self.address, account, shares)?;
        tracing::debug!(account = %account, amount, shares, "vault enter");
        Ok(shares)
    }

    fn leave(&mut self, bank: &mut TokenBank, account: Address, shares: Amount) -> Result<Amount> {
        let held = bank.balance_of(&self.share_token, &account)?;
        if held < shares {
            return Err(EngineError::InsufficientShares {
                available: held,
                required: shares,
            });
        }
        let amount = self.preview_leave(bank, shares)?;
        bank.burn(&self.share_token, self.address, account, shares)?;
        bank.transfer(&self.asset, self.address, account, amount)?;
        tracing::debug!(account = %account, shares, amount, "vault leave");
        Ok(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        bank: TokenBank,
        vault: RewardVault,
        asset: Address,
        owner: Address,
    }

    fn fixture() -> Fixture {
        let mut bank = TokenBank::new();
        let owner = Address::account("owner");
        let asset = bank.create_token(owner, "SushiToken", "SUSHI").expect("asset");
        let vault = RewardVault::deploy(
            &mut bank,
            Address::contract(&owner, "vault"),
            asset,
            "SushiBar",
            "xSUSHI",
        )
        .expect("deploy");
        Fixture {
            bank,
            vault,
            asset,
            owner,
        }
    }

    fn fund(f: &mut Fixture, account: Address, amount: Amount) {
        f.bank.mint(&f.asset, f.owner, account, amount).expect("mint");
        f.bank
            .approve(&f.asset, account, f.vault.address(), amount)
            .expect("approve");
    }

    #[test]
    fn test_first_enter_is_one_to_one() {
        let mut f = fixture();
        let alice = Address::account("alice");
        fund(&mut f, alice, 1_000);
        let shares = f.vault.enter(&mut f.bank, alice, 1_000).expect("enter");
        assert_eq!(shares, 1_000);
        assert_eq!(f.vault.asset_balance(&f.bank).expect("assets"), 1_000);
    }

    #[test]
    fn test_inflow_raises_share_value() {
        let mut f = fixture();
        let alice = Address::account("alice");
        let bob = Address::account("bob");
        fund(&mut f, alice, 100);
        f.vault.enter(&mut f.bank, alice, 100).expect("enter");

        // Direct inflow doubles the rate.
        f.bank
            .mint(&f.asset, f.owner, f.vault.address(), 100)
            .expect("inflow");

        fund(&mut f, bob, 100);
        let shares = f.vault.enter(&mut f.bank, bob, 100).expect("enter");
        assert_eq!(shares, 50);

        let paid = f.vault.leave(&mut f.bank, alice, 100).expect("leave");
        assert_eq!(paid, 200);
        assert_eq!(f.bank.balance_of(&f.asset, &alice).expect("balance"), 200);
    }

    #[test]
    fn test_preview_matches_enter() {
        let mut f = fixture();
        let alice = Address::account("alice");
        fund(&mut f, alice, 300);
        f.vault.enter(&mut f.bank, alice, 100).expect("enter");
        f.bank
            .mint(&f.asset, f.owner, f.vault.address(), 50)
            .expect("inflow");

        let previewed = f.vault.preview_enter(&f.bank, 200).expect("preview");
        let minted = f.vault.enter(&mut f.bank, alice, 200).expect("enter");
        assert_eq!(previewed, minted);
    }

    #[test]
    fn test_leave_more_than_held() {
        let mut f = fixture();
        let alice = Address::account("alice");
        fund(&mut f, alice, 10);
        f.vault.enter(&mut f.bank, alice, 10).expect("enter");
        let result = f.vault.leave(&mut f.bank, alice, 11);
        assert_eq!(
            result,
            Err(EngineError::InsufficientShares {
                available: 10,
                required: 11
            })
        );
    }

    #[test]
    fn test_enter_without_allowance_changes_nothing() {
        let mut f = fixture();
        let alice = Address::account("alice");
        f.bank.mint(&f.asset, f.owner, alice, 10).expect("mint");
        let result = f.vault.enter(&mut f.bank, alice, 10);
        assert!(matches!(result, Err(EngineError::Token(_))));
        assert_eq!(f.vault.total_shares(&f.bank).expect("shares"), 0);
    }
}
