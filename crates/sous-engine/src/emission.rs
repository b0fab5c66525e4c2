//! Block-based reward emission across weighted pools.
//!
//! Every block emits `reward_per_block` of the reward token, split between
//! pools by allocation point. Each pool keeps an accumulated reward per
//! staked unit (scaled by [`ACC_PRECISION`]); a staker's pending reward is
//! `amount * acc / ACC_PRECISION - reward_debt`.
//!
//! Pools update lazily: nothing happens on a block until someone touches
//! the pool, and then all blocks since `last_reward_block` are emitted at
//! once.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use sous_token::TokenBank;
use sous_types::{mul_div, Address, Amount, BlockNumber, PoolId, ACC_PRECISION};

use crate::{EngineError, Result, StakingEngine};

/// State of one pool.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolInfo {
    /// Asset staked into the pool.
    pub lp_token: Address,
    /// Share of the per-block emission.
    pub alloc_point: u64,
    /// Last block whose emission is reflected in `acc_reward_per_share`.
    pub last_reward_block: BlockNumber,
    /// Reward per staked unit, scaled by [`ACC_PRECISION`].
    pub acc_reward_per_share: Amount,
    /// Sum of all stakes.
    pub total_staked: Amount,
}

/// A staker's position in one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StakeInfo {
    pub amount: Amount,
    pub reward_debt: Amount,
}

/// In-memory emission engine.
#[derive(Clone, Debug)]
pub struct EmissionEngine {
    address: Address,
    owner: Address,
    reward_token: Address,
    reward_per_block: Amount,
    start_block: BlockNumber,
    total_alloc_point: u64,
    pools: Vec<PoolInfo>,
    stakers: HashMap<(PoolId, Address), StakeInfo>,
}

impl EmissionEngine {
    /// Create an engine with no pools.
    ///
    /// The engine mints `reward_token` as pools update, so it must be one of
    /// the token's minters.
    ///
    /// # Arguments
    ///
    /// * `address` - Address the engine holds stake and rewards under
    /// * `owner` - Account allowed to add and reweight pools
    /// * `reward_token` - Emitted asset
    /// * `reward_per_block` - Emission per block across all pools
    /// * `start_block` - First block that emits
    pub fn new(
        address: Address,
        owner: Address,
        reward_token: Address,
        reward_per_block: Amount,
        start_block: BlockNumber,
    ) -> Self {
        Self {
            address,
            owner,
            reward_token,
            reward_per_block,
            start_block,
            total_alloc_point: 0,
            pools: Vec::new(),
            stakers: HashMap::new(),
        }
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    pub fn reward_per_block(&self) -> Amount {
        self.reward_per_block
    }

    pub fn start_block(&self) -> BlockNumber {
        self.start_block
    }

    pub fn total_alloc_point(&self) -> u64 {
        self.total_alloc_point
    }

    pub fn pool_length(&self) -> usize {
        self.pools.len()
    }

    pub fn pool_info(&self, pid: PoolId) -> Option<&PoolInfo> {
        usize::try_from(pid).ok().and_then(|i| self.pools.get(i))
    }

    /// Position of `account` in `pid` (empty if it never staked).
    pub fn user_info(&self, pid: PoolId, account: Address) -> StakeInfo {
        self.stakers
            .get(&(pid, account))
            .copied()
            .unwrap_or_default()
    }

    /// Add a pool. Owner only. The same stake asset may back several pools.
    ///
    /// # Arguments
    ///
    /// * `with_update` - Bring every existing pool up to `block` first, so
    ///   the new weights only apply from here on
    ///
    /// # Errors
    ///
    /// - [`EngineError::Unauthorized`] if `caller` is not the owner
    pub fn add_pool(
        &mut self,
        bank: &mut TokenBank,
        block: BlockNumber,
        caller: Address,
        alloc_point: u64,
        lp_token: Address,
        with_update: bool,
    ) -> Result<PoolId> {
        self.require_owner(caller)?;
        bank.get(&lp_token)?;
        if with_update {
            self.mass_update_pools(bank, block)?;
        }
        let total = self
            .total_alloc_point
            .checked_add(alloc_point)
            .ok_or(EngineError::Overflow)?;

        let pid = self.pools.len() as PoolId;
        self.total_alloc_point = total;
        self.pools.push(PoolInfo {
            lp_token,
            alloc_point,
            last_reward_block: block.max(self.start_block),
            acc_reward_per_share: 0,
            total_staked: 0,
        });
        tracing::info!(pid, alloc_point, lp_token = %lp_token, "pool added");
        Ok(pid)
    }

    /// Change a pool's allocation point. Owner only.
    pub fn set_pool(
        &mut self,
        bank: &mut TokenBank,
        block: BlockNumber,
        caller: Address,
        pid: PoolId,
        alloc_point: u64,
        with_update: bool,
    ) -> Result<()> {
        self.require_owner(caller)?;
        let previous = self.pool(pid)?.alloc_point;
        if with_update {
            self.mass_update_pools(bank, block)?;
        }
        self.total_alloc_point = self
            .total_alloc_point
            .checked_sub(previous)
            .and_then(|t| t.checked_add(alloc_point))
            .ok_or(EngineError::Overflow)?;
        self.pool_mut(pid)?.alloc_point = alloc_point;
        tracing::info!(pid, alloc_point, "pool reweighted");
        Ok(())
    }

    /// Update every pool to `block`.
    pub fn mass_update_pools(&mut self, bank: &mut TokenBank, block: BlockNumber) -> Result<()> {
        for pid in 0..self.pools.len() as PoolId {
            self.update_pool(bank, block, pid)?;
        }
        Ok(())
    }

    /// Emit the pool's share of all blocks since its last update.
    ///
    /// Nothing is minted while the pool is empty; the blocks are skipped.
    pub fn update_pool(&mut self, bank: &mut TokenBank, block: BlockNumber, pid: PoolId) -> Result<()> {
        let pool = self.pool(pid)?;
        if block <= pool.last_reward_block {
            return Ok(());
        }
        if pool.total_staked == 0 {
            self.pool_mut(pid)?.last_reward_block = block;
            return Ok(());
        }

        let reward = self.emission(pool, block)?;
        let acc = accumulate(pool.acc_reward_per_share, reward, pool.total_staked)?;
        if reward > 0 {
            bank.mint(&self.reward_token, self.address, self.address, reward)?;
        }

        let pool = self.pool_mut(pid)?;
        pool.acc_reward_per_share = acc;
        pool.last_reward_block = block;
        tracing::debug!(pid, block, reward, "pool updated");
        Ok(())
    }

    fn emission(&self, pool: &PoolInfo, block: BlockNumber) -> Result<Amount> {
        if self.total_alloc_point == 0 {
            return Ok(0);
        }
        let blocks = Amount::from(block - pool.last_reward_block);
        let per_block = blocks
            .checked_mul(self.reward_per_block)
            .ok_or(EngineError::Overflow)?;
        mul_div(
            per_block,
            Amount::from(pool.alloc_point),
            Amount::from(self.total_alloc_point),
        )
        .ok_or(EngineError::Overflow)
    }

    /// Pay out up to `amount` of reward, capped at what the engine holds.
    fn safe_reward_transfer(
        &self,
        bank: &mut TokenBank,
        to: Address,
        amount: Amount,
    ) -> Result<Amount> {
        let held = bank.balance_of(&self.reward_token, &self.address)?;
        let paid = amount.min(held);
        if paid < amount {
            tracing::warn!(to = %to, owed = amount, paid, "reward balance short");
        }
        bank.transfer(&self.reward_token, self.address, to, paid)?;
        Ok(paid)
    }

    fn pool(&self, pid: PoolId) -> Result<&PoolInfo> {
        self.pool_info(pid).ok_or(EngineError::UnknownPool(pid))
    }

    fn pool_mut(&mut self, pid: PoolId) -> Result<&mut PoolInfo> {
        usize::try_from(pid)
            .ok()
            .and_then(|i| self.pools.get_mut(i))
            .ok_or(EngineError::UnknownPool(pid))
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if caller == self.owner {
            Ok(())
        } else {
            Err(EngineError::Unauthorized(caller))
        }
    }
}

/// `acc + reward * ACC_PRECISION / total_staked`.
fn accumulate(acc: Amount, reward: Amount, total_staked: Amount) -> Result<Amount> {
    let delta = mul_div(reward, ACC_PRECISION, total_staked).ok_or(EngineError::Overflow)?;
    acc.checked_add(delta).ok_or(EngineError::Overflow)
}

/// `amount * acc / ACC_PRECISION - reward_debt`, clamped at zero.
fn pending(stake: &StakeInfo, acc: Amount) -> Result<Amount> {
    let accrued = mul_div(stake.amount, acc, ACC_PRECISION).ok_or(EngineError::Overflow)?;
    Ok(accrued.saturating_sub(stake.reward_debt))
}

fn reward_debt(amount: Amount, acc: Amount) -> Result<Amount> {
    mul_div(amount, acc, ACC_PRECISION).ok_or(EngineError::Overflow)
}

impl StakingEngine for EmissionEngine {
    fn address(&self) -> Address {
        self.address
    }

    fn reward_token(&self) -> Address {
        self.reward_token
    }

    fn pool_lp_token(&self, pid: PoolId) -> Option<Address> {
        self.pool_info(pid).map(|p| p.lp_token)
    }

    fn deposit(
        &mut self,
        bank: &mut TokenBank,
        block: BlockNumber,
        account: Address,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Amount> {
        let lp_token = self.pool(pid)?.lp_token;
        if amount > 0 {
            bank.transfer_from(&lp_token, self.address, account, self.address, amount)?;
        }
        self.update_pool(bank, block, pid)?;

        let acc = self.pool(pid)?.acc_reward_per_share;
        let stake = self.user_info(pid, account);
        let owed = pending(&stake, acc)?;
        let harvested = self.safe_reward_transfer(bank, account, owed)?;

        let staked = stake
            .amount
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        let pool = self.pool_mut(pid)?;
        pool.total_staked = pool
            .total_staked
            .checked_add(amount)
            .ok_or(EngineError::Overflow)?;
        self.stakers.insert(
            (pid, account),
            StakeInfo {
                amount: staked,
                reward_debt: reward_debt(staked, acc)?,
            },
        );
        tracing::debug!(pid, account = %account, amount, harvested, "engine deposit");
        Ok(harvested)
    }

    fn withdraw(
        &mut self,
        bank: &mut TokenBank,
        block: BlockNumber,
        account: Address,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Amount> {
        let lp_token = self.pool(pid)?.lp_token;
        let stake = self.user_info(pid, account);
        if stake.amount < amount {
            return Err(EngineError::InsufficientStake {
                available: stake.amount,
                required: amount,
            });
        }
        self.update_pool(bank, block, pid)?;

        let acc = self.pool(pid)?.acc_reward_per_share;
        let owed = pending(&stake, acc)?;
        let harvested = self.safe_reward_transfer(bank, account, owed)?;

        let staked = stake.amount - amount;
        let pool = self.pool_mut(pid)?;
        pool.total_staked -= amount;
        self.stakers.insert(
            (pid, account),
            StakeInfo {
                amount: staked,
                reward_debt: reward_debt(staked, acc)?,
            },
        );
        if amount > 0 {
            bank.transfer(&lp_token, self.address, account, amount)?;
        }
        tracing::debug!(pid, account = %account, amount, harvested, "engine withdraw");
        Ok(harvested)
    }

    fn pending_reward(&self, block: BlockNumber, pid: PoolId, account: Address) -> Result<Amount> {
        let pool = self.pool(pid)?;
        let mut acc = pool.acc_reward_per_share;
        if block > pool.last_reward_block && pool.total_staked > 0 {
            let reward = self.emission(pool, block)?;
            acc = accumulate(acc, reward, pool.total_staked)?;
        }
        pending(&self.user_info(pid, account), acc)
    }

    fn staked(&self, pid: PoolId, account: Address) -> Amount {
        self.user_info(pid, account).amount
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const RPB: Amount = 10_000;

    struct Fixture {
        bank: TokenBank,
        engine: EmissionEngine,
        owner: Address,
        lp: Address,
    }

    fn fixture() -> Fixture {
        let mut bank = TokenBank::new();
        let owner = Address::account("owner");
        let engine_address = Address::contract(&owner, "engine");
        let reward = bank.create_token(owner, "SushiToken", "SUSHI").expect("reward");
        bank.set_minter(&reward, owner, engine_address, true)
            .expect("grant");
        let lp = bank.create_token(owner, "LP", "LP").expect("lp");
        let engine = EmissionEngine::new(engine_address, owner, reward, RPB, 100);
        Fixture {
            bank,
            engine,
            owner,
            lp,
        }
    }

    fn stake(f: &mut Fixture, account: Address, amount: Amount, block: BlockNumber) -> Amount {
        f.bank.mint(&f.lp, f.owner, account, amount).expect("mint lp");
        f.bank
            .approve(&f.lp, account, f.engine.address(), amount)
            .expect("approve");
        f.engine
            .deposit(&mut f.bank, block, account, 0, amount)
            .expect("deposit")
    }

    #[test]
    fn test_no_emission_before_start() {
        let mut f = fixture();
        let alice = Address::account("alice");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, f.lp, true)
            .expect("add");
        stake(&mut f, alice, 100, 5);
        assert_eq!(f.engine.pending_reward(100, 0, alice).expect("pending"), 0);
        assert_eq!(f.engine.pending_reward(101, 0, alice).expect("pending"), RPB);
    }

    #[test]
    fn test_harvest_on_deposit() {
        let mut f = fixture();
        let alice = Address::account("alice");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, f.lp, true)
            .expect("add");
        stake(&mut f, alice, 100, 5);
        let harvested = f
            .engine
            .deposit(&mut f.bank, 103, alice, 0, 0)
            .expect("poke");
        assert_eq!(harvested, 3 * RPB);
        let reward = f.engine.reward_token();
        assert_eq!(f.bank.balance_of(&reward, &alice).expect("balance"), 3 * RPB);
        assert_eq!(f.engine.pending_reward(103, 0, alice).expect("pending"), 0);
    }

    #[test]
    fn test_alloc_split_between_pools() {
        let mut f = fixture();
        let alice = Address::account("alice");
        let other_lp = f.bank.create_token(f.owner, "LP2", "LP2").expect("lp2");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, f.lp, true)
            .expect("add");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 300, other_lp, true)
            .expect("add");
        stake(&mut f, alice, 100, 5);
        assert_eq!(f.engine.pending_reward(102, 0, alice).expect("pending"), 2 * RPB / 4);
    }

    #[test]
    fn test_pro_rata_between_stakers() {
        let mut f = fixture();
        let alice = Address::account("alice");
        let bob = Address::account("bob");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, f.lp, true)
            .expect("add");
        stake(&mut f, alice, 100, 5);
        stake(&mut f, bob, 300, 101);
        assert_eq!(f.engine.pending_reward(105, 0, alice).expect("pending"), RPB + RPB);
        assert_eq!(f.engine.pending_reward(105, 0, bob).expect("pending"), 3 * RPB);
    }

    #[test]
    fn test_withdraw_returns_stake() {
        let mut f = fixture();
        let alice = Address::account("alice");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, f.lp, true)
            .expect("add");
        stake(&mut f, alice, 100, 5);

        let over = f.engine.withdraw(&mut f.bank, 101, alice, 0, 101);
        assert_eq!(
            over,
            Err(EngineError::InsufficientStake {
                available: 100,
                required: 101
            })
        );

        let harvested = f
            .engine
            .withdraw(&mut f.bank, 101, alice, 0, 40)
            .expect("withdraw");
        assert_eq!(harvested, RPB);
        assert_eq!(f.bank.balance_of(&f.lp, &alice).expect("lp"), 40);
        assert_eq!(f.engine.staked(0, alice), 60);
        assert_eq!(f.engine.pool_info(0).expect("pool").total_staked, 60);
    }

    #[test]
    fn test_add_pool_owner_only() {
        let mut f = fixture();
        let alice = Address::account("alice");
        let result = f.engine.add_pool(&mut f.bank, 1, alice, 100, f.lp, false);
        assert_eq!(result, Err(EngineError::Unauthorized(alice)));
        assert_eq!(f.engine.pool_length(), 0);
    }

    #[test]
    fn test_unknown_pool() {
        let mut f = fixture();
        let alice = Address::account("alice");
        assert!(f.engine.pool_lp_token(0).is_none());
        assert_eq!(
            f.engine.deposit(&mut f.bank, 1, alice, 0, 0),
            Err(EngineError::UnknownPool(0))
        );
    }

    #[test]
    fn test_set_pool_reweights() {
        let mut f = fixture();
        let alice = Address::account("alice");
        let other_lp = f.bank.create_token(f.owner, "LP2", "LP2").expect("lp2");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, f.lp, true)
            .expect("add");
        f.engine
            .add_pool(&mut f.bank, 1, f.owner, 100, other_lp, true)
            .expect("add");
        stake(&mut f, alice, 100, 5);
        f.engine
            .set_pool(&mut f.bank, 102, f.owner, 1, 300, true)
            .expect("set");
        assert_eq!(f.engine.total_alloc_point(), 400);
        // Two blocks at 1/2, then one at 1/4.
        assert_eq!(
            f.engine.pending_reward(103, 0, alice).expect("pending"),
            RPB + RPB / 4
        );
    }
}
