//! Sparse id-indexed reward slots.
//!
//! Ids are handed out sequentially by [`RewardTable::add`] and never reused
//! implicitly. A slot with a zero token and zero ratio is removed but keeps
//! its id; [`RewardTable::set`] may later overwrite it.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use sous_types::{Address, Amount};

use crate::{check_lengths, Result, StrategyError};

/// One entry of the table.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardSlot {
    pub reward_token: Address,
    pub ratio: u64,
}

impl RewardSlot {
    /// Counts toward distribution: non-zero token and ratio.
    pub fn is_active(&self) -> bool {
        !self.reward_token.is_zero() && self.ratio > 0
    }
}

/// The slot table of one strategy.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct RewardTable {
    slots: BTreeMap<u64, RewardSlot>,
    next_id: u64,
}

impl RewardTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ids allocated so far, removed slots included.
    pub fn len(&self) -> u64 {
        self.next_id
    }

    pub fn is_empty(&self) -> bool {
        self.next_id == 0
    }

    /// Slot `id`, empty if never allocated or removed.
    pub fn get(&self, id: u64) -> RewardSlot {
        self.slots.get(&id).copied().unwrap_or_default()
    }

    /// Active slots in id order.
    pub fn active(&self) -> impl Iterator<Item = (u64, RewardSlot)> + '_ {
        self.slots
            .iter()
            .filter(|(_, slot)| slot.is_active())
            .map(|(id, slot)| (*id, *slot))
    }

    /// Sum of ratios over active slots.
    pub fn total_ratio(&self) -> Amount {
        self.active().map(|(_, slot)| Amount::from(slot.ratio)).sum()
    }

    /// Append slots, returning their ids. All-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`StrategyError::LengthMismatch`] if the lists differ in length
    /// - [`StrategyError::InvalidSlot`] if any token is zero
    pub fn add(&mut self, reward_tokens: &[Address], ratios: &[u64]) -> Result<Vec<u64>> {
        check_lengths(reward_tokens.len(), ratios.len())?;
        for (offset, token) in reward_tokens.iter().enumerate() {
            if token.is_zero() {
                return Err(StrategyError::InvalidSlot {
                    id: self.next_id + offset as u64,
                });
            }
        }

        let mut ids = Vec::with_capacity(reward_tokens.len());
        for (token, ratio) in reward_tokens.iter().zip(ratios) {
            let id = self.next_id;
            self.slots.insert(
                id,
                RewardSlot {
                    reward_token: *token,
                    ratio: *ratio,
                },
            );
            self.next_id += 1;
            ids.push(id);
        }
        Ok(ids)
    }

    /// Overwrite allocated slots by id. All-or-nothing.
    ///
    /// # Errors
    ///
    /// - [`StrategyError::LengthMismatch`] if the lists differ in length
    /// - [`StrategyError::UnknownSlot`] if an id was never allocated
    /// - [`StrategyError::InvalidSlot`] if a zero token comes with a ratio
    pub fn set(&mut self, ids: &[u64], reward_tokens: &[Address], ratios: &[u64]) -> Result<()> {
        check_lengths(ids.len(), reward_tokens.len())?;
        check_lengths(ids.len(), ratios.len())?;
        for ((id, token), ratio) in ids.iter().zip(reward_tokens).zip(ratios) {
            if *id >= self.next_id {
                return Err(StrategyError::UnknownSlot(*id));
            }
            if token.is_zero() && *ratio != 0 {
                return Err(StrategyError::InvalidSlot { id: *id });
            }
        }

        for ((id, token), ratio) in ids.iter().zip(reward_tokens).zip(ratios) {
            if token.is_zero() {
                self.slots.remove(id);
            } else {
                self.slots.insert(
                    *id,
                    RewardSlot {
                        reward_token: *token,
                        ratio: *ratio,
                    },
                );
            }
        }
        Ok(())
    }
}
