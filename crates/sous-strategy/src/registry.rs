//! Address-keyed set of deployed strategies.
//!
//! The chef stores only a strategy's address per pool. At burn time it
//! resolves that address here.

use std::collections::{BTreeMap, HashMap};

use sous_types::Address;

use crate::funded::{FundedPool, RewardBucket};
use crate::minted::{MintedSupply, RewardFountain};
use crate::{Result, RewardStrategy};

/// All deployed strategies.
#[derive(Debug, Default)]
pub struct StrategyRegistry {
    strategies: BTreeMap<Address, Box<dyn RewardStrategy>>,
    /// Per-owner deployment counter feeding [`Address::strategy`].
    nonces: HashMap<Address, u64>,
}

impl StrategyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Deploy a pre-funded strategy owned by `owner` serving `sous_chef`.
    pub fn deploy_bucket(
        &mut self,
        owner: Address,
        sous_chef: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Address> {
        let address = self.next_address(owner);
        let bucket = RewardBucket::new(address, sous_chef, owner, FundedPool, reward_tokens, ratios)?;
        Ok(self.insert(owner, Box::new(bucket)))
    }

    /// Deploy a minting strategy owned by `owner` serving `sous_chef`.
    pub fn deploy_fountain(
        &mut self,
        owner: Address,
        sous_chef: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Address> {
        let address = self.next_address(owner);
        let fountain =
            RewardFountain::new(address, sous_chef, owner, MintedSupply, reward_tokens, ratios)?;
        Ok(self.insert(owner, Box::new(fountain)))
    }

    pub fn contains(&self, address: &Address) -> bool {
        self.strategies.contains_key(address)
    }

    pub fn get(&self, address: &Address) -> Option<&dyn RewardStrategy> {
        self.strategies.get(address).map(|s| s.as_ref())
    }

    pub fn get_mut(&mut self, address: &Address) -> Option<&mut (dyn RewardStrategy + 'static)> {
        self.strategies.get_mut(address).map(|s| s.as_mut())
    }

    pub fn len(&self) -> usize {
        self.strategies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.strategies.is_empty()
    }

    fn next_address(&self, owner: Address) -> Address {
        let nonce = self.nonces.get(&owner).copied().unwrap_or(0);
        Address::strategy(&owner, nonce)
    }

    fn insert(&mut self, owner: Address, strategy: Box<dyn RewardStrategy>) -> Address {
        let address = strategy.address();
        tracing::info!(
            strategy = %address,
            owner = %owner,
            kind = ?strategy.kind(),
            "strategy deployed"
        );
        *self.nonces.entry(owner).or_insert(0) += 1;
        self.strategies.insert(address, strategy);
        address
    }
}
