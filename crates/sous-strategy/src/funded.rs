//! Pre-funded backend ("reward bucket").
//!
//! Pays from assets already sent to the strategy's address. When the held
//! balance cannot cover a slot's share, the user receives what is there and
//! the rest is simply not owed.

use std::collections::BTreeMap;

use sous_token::TokenBank;
use sous_types::{Address, Amount};

use crate::distributor::{RewardDistributor, SupplyBackend};
use crate::{Result, StrategyError, StrategyKind};

/// Supply from the strategy's own balance.
#[derive(Clone, Copy, Debug, Default)]
pub struct FundedPool;

/// A strategy paying from a pre-funded balance.
pub type RewardBucket = RewardDistributor<FundedPool>;

impl SupplyBackend for FundedPool {
    const KIND: StrategyKind = StrategyKind::Funded;

    fn supply(
        &mut self,
        bank: &mut TokenBank,
        strategy: Address,
        reward_token: Address,
        user: Address,
        ideal: Amount,
    ) -> Result<Amount> {
        let held = bank.balance_of(&reward_token, &strategy)?;
        let paid = ideal.min(held);
        if paid < ideal {
            tracing::warn!(
                strategy = %strategy,
                reward_token = %reward_token,
                ideal,
                held,
                "bucket short, paying held balance"
            );
        }
        bank.transfer(&reward_token, strategy, user, paid)?;
        Ok(paid)
    }

    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        strategy: Address,
        to: Address,
        transfers: &[(Address, Amount)],
    ) -> Result<()> {
        let mut required: BTreeMap<Address, Amount> = BTreeMap::new();
        for (token, amount) in transfers {
            let entry = required.entry(*token).or_insert(0);
            *entry = entry.checked_add(*amount).ok_or(StrategyError::Overflow)?;
        }
        for (token, required) in &required {
            let available = bank.balance_of(token, &strategy)?;
            if available < *required {
                return Err(StrategyError::InsufficientBalance {
                    token: *token,
                    available,
                    required: *required,
                });
            }
        }

        for (token, amount) in transfers {
            bank.transfer(token, strategy, to, *amount)?;
        }
        Ok(())
    }
}
