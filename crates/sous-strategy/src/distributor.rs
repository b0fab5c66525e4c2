//! Ratio-weighted claim logic shared by both strategy backends.
//!
//! [`RewardDistributor`] owns the slot table, the access rules and the split
//! of a burned amount across slots. Where the assets come from is delegated
//! to a [`SupplyBackend`].

use std::fmt;

use sous_token::TokenBank;
use sous_types::{mul_div, Address, Amount};

use crate::table::{RewardSlot, RewardTable};
use crate::{
    check_lengths, Result, RewardPayout, RewardStrategy, StrategyError, StrategyKind,
};

/// Source of the assets a strategy pays out.
pub trait SupplyBackend: fmt::Debug {
    const KIND: StrategyKind;

    /// Deliver up to `ideal` of `reward_token` to `user`. Returns the amount
    /// actually delivered.
    fn supply(
        &mut self,
        bank: &mut TokenBank,
        strategy: Address,
        reward_token: Address,
        user: Address,
        ideal: Amount,
    ) -> Result<Amount>;

    /// Move held assets out. `transfers` are `(reward_token, amount)` pairs
    /// and must all succeed or none.
    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        strategy: Address,
        to: Address,
        transfers: &[(Address, Amount)],
    ) -> Result<()> {
        let _ = (bank, strategy, to, transfers);
        Err(StrategyError::Unsupported)
    }
}

/// A strategy: slot table plus a supply backend.
#[derive(Clone, Debug)]
pub struct RewardDistributor<B> {
    address: Address,
    sous_chef: Address,
    owner: Address,
    table: RewardTable,
    backend: B,
}

impl<B: SupplyBackend> RewardDistributor<B> {
    /// Create a strategy serving `sous_chef`, administered by `owner`.
    ///
    /// # Errors
    ///
    /// Same as [`RewardTable::add`] for the initial slots.
    pub fn new(
        address: Address,
        sous_chef: Address,
        owner: Address,
        backend: B,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Self> {
        let mut table = RewardTable::new();
        table.add(reward_tokens, ratios)?;
        Ok(Self {
            address,
            sous_chef,
            owner,
            table,
            backend,
        })
    }

    pub fn table(&self) -> &RewardTable {
        &self.table
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if !self.owner.is_zero() && caller == self.owner {
            Ok(())
        } else {
            Err(StrategyError::Unauthorized(caller))
        }
    }
}

impl<B: SupplyBackend> RewardStrategy for RewardDistributor<B> {
    fn kind(&self) -> StrategyKind {
        B::KIND
    }

    fn address(&self) -> Address {
        self.address
    }

    fn sous_chef(&self) -> Address {
        self.sous_chef
    }

    fn owner(&self) -> Address {
        self.owner
    }

    fn claim_reward(
        &mut self,
        bank: &mut TokenBank,
        caller: Address,
        user: Address,
        amount: Amount,
    ) -> Result<Vec<RewardPayout>> {
        if caller != self.sous_chef {
            return Err(StrategyError::Unauthorized(caller));
        }
        let total_ratio = self.table.total_ratio();
        if total_ratio == 0 || amount == 0 {
            return Ok(Vec::new());
        }

        // Price every slot before paying any.
        let owed = self
            .table
            .active()
            .map(|(id, slot)| {
                mul_div(amount, Amount::from(slot.ratio), total_ratio)
                    .map(|ideal| (id, slot, ideal))
                    .ok_or(StrategyError::Overflow)
            })
            .collect::<Result<Vec<(u64, RewardSlot, Amount)>>>()?;

        let mut payouts = Vec::with_capacity(owed.len());
        for (id, slot, ideal) in owed {
            let paid = match self
                .backend
                .supply(bank, self.address, slot.reward_token, user, ideal)
            {
                Ok(paid) => paid,
                Err(e) => {
                    tracing::warn!(
                        strategy = %self.address,
                        id,
                        reward_token = %slot.reward_token,
                        error = %e,
                        "reward slot paid nothing"
                    );
                    0
                }
            };
            tracing::debug!(
                strategy = %self.address,
                user = %user,
                id,
                ideal,
                paid,
                "bonus reward paid"
            );
            payouts.push(RewardPayout {
                id,
                reward_token: slot.reward_token,
                ideal,
                paid,
            });
        }
        Ok(payouts)
    }

    fn set_reward_tokens(
        &mut self,
        caller: Address,
        ids: &[u64],
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<()> {
        self.require_owner(caller)?;
        self.table.set(ids, reward_tokens, ratios)?;
        tracing::info!(strategy = %self.address, slots = ids.len(), "reward tokens set");
        Ok(())
    }

    fn add_reward_tokens(
        &mut self,
        caller: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Vec<u64>> {
        self.require_owner(caller)?;
        let ids = self.table.add(reward_tokens, ratios)?;
        tracing::info!(strategy = %self.address, slots = ids.len(), "reward tokens added");
        Ok(ids)
    }

    fn withdraw_reward_tokens(
        &mut self,
        bank: &mut TokenBank,
        caller: Address,
        to: Address,
        ids: &[u64],
        amounts: &[Amount],
    ) -> Result<()> {
        self.require_owner(caller)?;
        check_lengths(ids.len(), amounts.len())?;
        let mut transfers = Vec::with_capacity(ids.len());
        for (id, amount) in ids.iter().zip(amounts) {
            let slot = self.table.get(*id);
            if slot.reward_token.is_zero() {
                return Err(StrategyError::UnknownSlot(*id));
            }
            transfers.push((slot.reward_token, *amount));
        }
        self.backend.withdraw(bank, self.address, to, &transfers)?;
        tracing::info!(strategy = %self.address, to = %to, slots = ids.len(), "reward tokens withdrawn");
        Ok(())
    }

    fn reward_tokens(&self, id: u64) -> RewardSlot {
        self.table.get(id)
    }

    fn reward_token_count(&self) -> u64 {
        self.table.len()
    }

    fn transfer_ownership(&mut self, caller: Address, new_owner: Address) -> Result<Address> {
        self.require_owner(caller)?;
        let previous = std::mem::replace(&mut self.owner, new_owner);
        tracing::info!(strategy = %self.address, previous = %previous, new_owner = %new_owner, "strategy ownership transferred");
        Ok(previous)
    }
}
