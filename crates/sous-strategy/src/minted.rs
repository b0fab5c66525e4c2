//! Minting backend ("reward fountain").
//!
//! Mints each slot's share directly to the user. The strategy has to be a
//! minter of the reward token; when it is not, that slot pays zero and the
//! other slots are unaffected.

use sous_token::{TokenBank, TokenError};
use sous_types::{Address, Amount};

use crate::distributor::{RewardDistributor, SupplyBackend};
use crate::{Result, StrategyKind};

/// Supply by minting.
#[derive(Clone, Copy, Debug, Default)]
pub struct MintedSupply;

/// A strategy minting its rewards on demand.
pub type RewardFountain = RewardDistributor<MintedSupply>;

impl SupplyBackend for MintedSupply {
    const KIND: StrategyKind = StrategyKind::Minted;

    fn supply(
        &mut self,
        bank: &mut TokenBank,
        strategy: Address,
        reward_token: Address,
        user: Address,
        ideal: Amount,
    ) -> Result<Amount> {
        match bank.mint(&reward_token, strategy, user, ideal) {
            Ok(()) => Ok(ideal),
            Err(TokenError::Unauthorized { .. }) => {
                tracing::warn!(
                    strategy = %strategy,
                    reward_token = %reward_token,
                    ideal,
                    "fountain is not a minter, paying nothing"
                );
                Ok(0)
            }
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{RewardStrategy, StrategyError};

    #[test]
    fn test_mints_only_where_authorized() {
        let mut bank = TokenBank::new();
        let owner = Address::account("owner");
        let chef = Address::account("chef");
        let alice = Address::account("alice");
        let r0 = bank.create_token(owner, "Reward0", "R0").expect("r0");
        let r1 = bank.create_token(owner, "Reward1", "R1").expect("r1");
        let address = Address::strategy(&owner, 0);
        let mut fountain =
            RewardFountain::new(address, chef, owner, MintedSupply, &[r0, r1], &[3, 7])
                .expect("fountain");

        bank.set_minter(&r1, owner, address, true).expect("grant");

        let payouts = fountain
            .claim_reward(&mut bank, chef, alice, 1_000)
            .expect("claim");
        assert_eq!(payouts[0].paid, 0);
        assert_eq!(payouts[1].paid, 700);
        assert_eq!(bank.balance_of(&r0, &alice).expect("r0"), 0);
        assert_eq!(bank.balance_of(&r1, &alice).expect("r1"), 700);
        assert_eq!(fountain.kind(), StrategyKind::Minted);
    }

    #[test]
    fn test_withdraw_not_supported() {
        let mut bank = TokenBank::new();
        let owner = Address::account("owner");
        let r0 = bank.create_token(owner, "Reward0", "R0").expect("r0");
        let mut fountain = RewardFountain::new(
            Address::strategy(&owner, 0),
            Address::account("chef"),
            owner,
            MintedSupply,
            &[r0],
            &[1],
        )
        .expect("fountain");
        assert_eq!(
            fountain.withdraw_reward_tokens(&mut bank, owner, owner, &[0], &[1]),
            Err(StrategyError::Unsupported)
        );
    }
}
