//! Registration, deposit, withdraw and burn.
//!
//! ## Accounting
//!
//! The chef is a single staker in the engine. Whatever base reward the
//! engine harvests to it goes straight into the vault, and the resulting
//! shares are spread over the pool's depositors with a per-pool accumulator:
//!
//! ```text
//! acc_yield_per_share += shares * ACC_PRECISION / total_staked
//! pending(user)        = stake * acc_yield_per_share / ACC_PRECISION - reward_debt
//! ```
//!
//! A user's pending amount is minted as yield tokens on every deposit or
//! withdraw, so the chef keeps no per-user yield balance. Each yield token in
//! circulation is matched by one vault share held by the chef; burning it
//! leaves the vault with that share.
//!
//! Every operation checks its preconditions before the first state change.

use std::collections::{BTreeMap, BTreeSet, HashMap};

use serde::{Deserialize, Serialize};
use sous_engine::{EngineError, ShareVault, StakingEngine};
use sous_strategy::{RewardPayout, StrategyRegistry};
use sous_token::yield_token::new_yield_token;
use sous_token::TokenBank;
use sous_types::events::ChefEvent;
use sous_types::{mul_div, Address, Amount, BlockNumber, PoolId, ACC_PRECISION};

use crate::events::EventBus;
use crate::index::RewardIndex;
use crate::{ChefError, Result};

/// Registration record of a pool. All-zero for unregistered pools.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct YieldTokenInfo {
    pub yield_token: Address,
    /// Zero when only base-asset redemption applies.
    pub strategy: Address,
}

/// A depositor's stake in one pool.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserStake {
    /// LP tokens deposited through the chef.
    pub amount: Amount,
    /// `amount * acc_yield_per_share / ACC_PRECISION` at the last settlement.
    pub reward_debt: Amount,
}

/// Per-pool share accounting.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolLedger {
    /// Vault shares per staked LP token, scaled by [`ACC_PRECISION`].
    pub acc_yield_per_share: Amount,
    /// LP tokens staked through the chef.
    pub total_staked: Amount,
}

/// Result of a burn.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BurnReceipt {
    pub pid: PoolId,
    /// Base asset paid to the burner.
    pub reward: Amount,
    /// Bonus payouts from the pool's strategy, empty when it has none.
    pub bonuses: Vec<RewardPayout>,
}

/// Mutable access to everything the chef calls into.
pub struct Host<'a> {
    /// Block the operation executes in.
    pub block: BlockNumber,
    pub bank: &'a mut TokenBank,
    pub engine: &'a mut dyn StakingEngine,
    pub vault: &'a mut dyn ShareVault,
    pub strategies: &'a mut StrategyRegistry,
    pub events: &'a EventBus,
}

impl Host<'_> {
    pub fn view(&self) -> HostView<'_> {
        HostView {
            block: self.block,
            bank: &*self.bank,
            engine: &*self.engine,
            vault: &*self.vault,
        }
    }
}

/// Read-only access for views.
#[derive(Clone, Copy)]
pub struct HostView<'a> {
    /// Block the view is evaluated at.
    pub block: BlockNumber,
    pub bank: &'a TokenBank,
    pub engine: &'a dyn StakingEngine,
    pub vault: &'a dyn ShareVault,
}

/// The yield token orchestrator.
#[derive(Clone, Debug)]
pub struct SousChef {
    address: Address,
    owner: Address,
    yield_tokens: BTreeMap<PoolId, YieldTokenInfo>,
    /// Reverse lookup from yield token to pool.
    token_pools: HashMap<Address, PoolId>,
    ledgers: BTreeMap<PoolId, PoolLedger>,
    stakes: HashMap<(PoolId, Address), UserStake>,
    reward_index: RewardIndex,
}

impl SousChef {
    /// Create a chef at `address` administered by `owner`.
    pub fn new(address: Address, owner: Address) -> Self {
        tracing::info!(sous_chef = %address, owner = %owner, "sous chef deployed");
        Self {
            address,
            owner,
            yield_tokens: BTreeMap::new(),
            token_pools: HashMap::new(),
            ledgers: BTreeMap::new(),
            stakes: HashMap::new(),
            reward_index: RewardIndex::ONE,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn owner(&self) -> Address {
        self.owner
    }

    /// Address the yield token of `pid` has, or will have once created.
    pub fn get_yield_token_address(&self, pid: PoolId) -> Address {
        Address::yield_token(&self.address, pid)
    }

    /// Registration of `pid`, all-zero if the pool has no yield token.
    pub fn y_token_info_of(&self, pid: PoolId) -> YieldTokenInfo {
        self.yield_tokens.get(&pid).copied().unwrap_or_default()
    }

    /// Pool a yield token belongs to.
    pub fn pool_of(&self, yield_token: &Address) -> Option<PoolId> {
        self.token_pools.get(yield_token).copied()
    }

    /// Registered pool ids in ascending order.
    pub fn registered_pools(&self) -> impl Iterator<Item = PoolId> + '_ {
        self.yield_tokens.keys().copied()
    }

    pub fn user_info(&self, pid: PoolId, user: Address) -> UserStake {
        self.stakes.get(&(pid, user)).copied().unwrap_or_default()
    }

    pub fn pool_ledger(&self, pid: PoolId) -> PoolLedger {
        self.ledgers.get(&pid).copied().unwrap_or_default()
    }

    /// Stored reward index, as of the last state change.
    pub fn stored_reward_index(&self) -> RewardIndex {
        self.reward_index
    }

    /// Create yield tokens for `pids`, assigning `strategies` pairwise.
    ///
    /// The whole batch is validated before any token is created.
    ///
    /// # Errors
    ///
    /// - [`ChefError::Unauthorized`] if `caller` is not the owner
    /// - [`ChefError::LengthMismatch`] if the lists differ in length
    /// - [`ChefError::AlreadyRegistered`] if a pool already has a yield token
    ///   or appears twice in the batch
    /// - [`ChefError::InvalidPool`] if the engine has no such pool
    /// - [`ChefError::UnknownStrategy`] if a non-zero strategy is not deployed
    pub fn create_yield_tokens(
        &mut self,
        host: &mut Host<'_>,
        caller: Address,
        pids: &[PoolId],
        strategies: &[Address],
    ) -> Result<Vec<Address>> {
        self.require_owner(caller)?;
        if pids.len() != strategies.len() {
            return Err(ChefError::LengthMismatch {
                pids: pids.len(),
                strategies: strategies.len(),
            });
        }

        let mut batch = BTreeSet::new();
        let mut lp_tokens = Vec::with_capacity(pids.len());
        for (pid, strategy) in pids.iter().zip(strategies) {
            if self.yield_tokens.contains_key(pid) || !batch.insert(*pid) {
                return Err(ChefError::AlreadyRegistered { pid: *pid });
            }
            let lp_token = host
                .engine
                .pool_lp_token(*pid)
                .ok_or(ChefError::InvalidPool { pid: *pid })?;
            require_strategy(host.strategies, *strategy)?;
            lp_tokens.push(lp_token);
        }

        let mut created = Vec::with_capacity(pids.len());
        for ((pid, strategy), lp_token) in pids.iter().zip(strategies).zip(lp_tokens) {
            let yield_token = host
                .bank
                .insert(new_yield_token(self.address, *pid, lp_token))?;
            self.yield_tokens.insert(
                *pid,
                YieldTokenInfo {
                    yield_token,
                    strategy: *strategy,
                },
            );
            self.token_pools.insert(yield_token, *pid);
            self.ledgers.insert(*pid, PoolLedger::default());

            tracing::info!(
                pid,
                lp_token = %lp_token,
                yield_token = %yield_token,
                strategy = %strategy,
                "yield token created"
            );
            host.events.emit(
                host.block,
                ChefEvent::YieldTokenCreated {
                    pid: *pid,
                    lp_token,
                    yield_token,
                    strategy: *strategy,
                },
            );
            created.push(yield_token);
        }
        Ok(created)
    }

    /// Point `pid` at a different strategy (or none). Balances and history
    /// are not migrated.
    ///
    /// # Errors
    ///
    /// - [`ChefError::Unauthorized`] if `caller` is not the owner
    /// - [`ChefError::NotRegistered`] if `pid` has no yield token
    /// - [`ChefError::UnknownStrategy`] if a non-zero strategy is not deployed
    pub fn update_strategy(
        &mut self,
        host: &mut Host<'_>,
        caller: Address,
        pid: PoolId,
        strategy: Address,
    ) -> Result<()> {
        self.require_owner(caller)?;
        if !self.yield_tokens.contains_key(&pid) {
            return Err(ChefError::NotRegistered { pid });
        }
        require_strategy(host.strategies, strategy)?;

        if let Some(info) = self.yield_tokens.get_mut(&pid) {
            info.strategy = strategy;
        }
        tracing::info!(pid, strategy = %strategy, "strategy updated");
        host.events
            .emit(host.block, ChefEvent::StrategyUpdated { pid, strategy });
        Ok(())
    }

    /// Stake `amount` LP tokens for `caller` and mint the yield tokens it
    /// earned since its last interaction with the pool. Zero is allowed and
    /// only harvests.
    ///
    /// `caller` must have approved the chef for `amount` of the LP token.
    /// Returns the yield tokens minted.
    ///
    /// # Errors
    ///
    /// - [`ChefError::NotRegistered`] if `pid` has no yield token
    /// - [`ChefError::Token`] if the LP transfer fails
    pub fn deposit(
        &mut self,
        host: &mut Host<'_>,
        caller: Address,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Amount> {
        let info = self.registered(pid)?;
        let lp_token = host
            .engine
            .pool_lp_token(pid)
            .ok_or(ChefError::InvalidPool { pid })?;
        let stake = self.user_info(pid, caller);
        let staked = stake
            .amount
            .checked_add(amount)
            .ok_or(ChefError::Overflow)?;

        if amount > 0 {
            host.bank
                .transfer_from(&lp_token, self.address, caller, self.address, amount)?;
            host.bank
                .approve(&lp_token, self.address, host.engine.address(), amount)?;
        }
        let harvested = host
            .engine
            .deposit(host.bank, host.block, self.address, pid, amount)?;
        self.harvest(host, pid, harvested)?;

        let minted = self.settle(host.bank, pid, caller, info.yield_token, staked)?;
        let ledger = self.ledgers.entry(pid).or_default();
        ledger.total_staked = ledger
            .total_staked
            .checked_add(amount)
            .ok_or(ChefError::Overflow)?;
        self.refresh_index(host.bank, &*host.vault)?;

        tracing::debug!(pid, user = %caller, amount, harvested, minted, "deposit");
        host.events.emit(
            host.block,
            ChefEvent::Deposit {
                user: caller,
                pid,
                amount,
                minted,
            },
        );
        Ok(minted)
    }

    /// Unstake `amount` LP tokens back to `caller`, minting its pending
    /// yield tokens first. Returns the yield tokens minted.
    ///
    /// # Errors
    ///
    /// - [`ChefError::NotRegistered`] if `pid` has no yield token
    /// - [`ChefError::InsufficientStake`] if `caller` staked less than `amount`
    pub fn withdraw(
        &mut self,
        host: &mut Host<'_>,
        caller: Address,
        pid: PoolId,
        amount: Amount,
    ) -> Result<Amount> {
        let info = self.registered(pid)?;
        let lp_token = host
            .engine
            .pool_lp_token(pid)
            .ok_or(ChefError::InvalidPool { pid })?;
        let stake = self.user_info(pid, caller);
        if stake.amount < amount {
            return Err(ChefError::InsufficientStake {
                available: stake.amount,
                required: amount,
            });
        }

        let harvested = host
            .engine
            .withdraw(host.bank, host.block, self.address, pid, amount)?;
        self.harvest(host, pid, harvested)?;

        let minted = self.settle(host.bank, pid, caller, info.yield_token, stake.amount - amount)?;
        let ledger = self.ledgers.entry(pid).or_default();
        ledger.total_staked = ledger.total_staked.saturating_sub(amount);
        if amount > 0 {
            host.bank
                .transfer(&lp_token, self.address, caller, amount)?;
        }
        self.refresh_index(host.bank, &*host.vault)?;

        tracing::debug!(pid, user = %caller, amount, harvested, minted, "withdraw");
        host.events.emit(
            host.block,
            ChefEvent::Withdraw {
                user: caller,
                pid,
                amount,
                minted,
            },
        );
        Ok(minted)
    }

    /// Burn `amount` of `yield_token` held by `caller` and pay out the base
    /// asset it backs, then ask the pool's strategy for bonus rewards.
    ///
    /// The burn and base payout are final before the strategy runs; a
    /// failing strategy only means no bonus.
    ///
    /// # Errors
    ///
    /// - [`ChefError::UnknownToken`] if `yield_token` is not one of ours
    /// - [`ChefError::InsufficientBalance`] if `caller` holds less than `amount`
    pub fn burn_yield_token(
        &mut self,
        host: &mut Host<'_>,
        caller: Address,
        yield_token: Address,
        amount: Amount,
    ) -> Result<BurnReceipt> {
        let pid = self
            .pool_of(&yield_token)
            .ok_or(ChefError::UnknownToken(yield_token))?;
        let info = self.registered(pid)?;
        let available = host.bank.balance_of(&yield_token, &caller)?;
        if available < amount {
            return Err(ChefError::InsufficientBalance {
                available,
                required: amount,
            });
        }
        let shares = host
            .bank
            .balance_of(&host.vault.share_token(), &self.address)?;
        if shares < amount {
            return Err(EngineError::InsufficientShares {
                available: shares,
                required: amount,
            }
            .into());
        }
        self.refresh_index(host.bank, &*host.vault)?;

        host.bank
            .burn(&yield_token, self.address, caller, amount)?;
        let reward = host.vault.leave(host.bank, self.address, amount)?;
        host.bank
            .transfer(&host.vault.asset(), self.address, caller, reward)?;
        self.refresh_index(host.bank, &*host.vault)?;

        tracing::debug!(pid, user = %caller, amount, reward, "yield token burned");
        host.events.emit(
            host.block,
            ChefEvent::YieldTokenBurned {
                user: caller,
                pid,
                amount,
                reward,
            },
        );

        let bonuses = self.claim_bonus(host, caller, pid, info.strategy, amount);
        Ok(BurnReceipt {
            pid,
            reward,
            bonuses,
        })
    }

    /// Hand administration to `new_owner`.
    pub fn transfer_ownership(
        &mut self,
        host: &mut Host<'_>,
        caller: Address,
        new_owner: Address,
    ) -> Result<()> {
        self.require_owner(caller)?;
        let previous_owner = std::mem::replace(&mut self.owner, new_owner);
        tracing::info!(previous = %previous_owner, new_owner = %new_owner, "ownership transferred");
        host.events.emit(
            host.block,
            ChefEvent::OwnershipTransferred {
                contract: self.address,
                previous_owner,
                new_owner,
            },
        );
        Ok(())
    }

    /// Give up administration for good. Registered pools keep working but
    /// no pool can be added or reassigned afterwards.
    pub fn renounce_ownership(&mut self, host: &mut Host<'_>, caller: Address) -> Result<()> {
        self.transfer_ownership(host, caller, Address::ZERO)
    }

    /// Yield tokens `deposit(pid, 0)` by `user` would mint at `view.block`.
    ///
    /// # Errors
    ///
    /// - [`ChefError::NotRegistered`] if `pid` has no yield token
    pub fn pending_yield_token(&self, view: &HostView<'_>, pid: PoolId, user: Address) -> Result<Amount> {
        self.registered(pid)?;
        let ledger = self.pool_ledger(pid);
        let mut acc = ledger.acc_yield_per_share;
        if ledger.total_staked > 0 {
            let reward = view.engine.pending_reward(view.block, pid, self.address)?;
            if reward > 0 {
                let shares = view.vault.preview_enter(view.bank, reward)?;
                acc = accumulate(acc, shares, ledger.total_staked)?;
            }
        }
        pending(&self.user_info(pid, user), acc)
    }

    /// Base asset per yield token right now.
    ///
    /// Never falls while the vault has shares outstanding. An emptied vault
    /// reports [`RewardIndex::ONE`], the rate its next entry gets.
    pub fn sushi_reward_per_yield_token(&self, view: &HostView<'_>) -> Result<RewardIndex> {
        let observed = RewardIndex::from_vault(
            view.vault.asset_balance(view.bank)?,
            view.vault.total_shares(view.bank)?,
        )?;
        Ok(observed.map_or(RewardIndex::ONE, |o| o.max(self.reward_index)))
    }

    /// Base asset a burn of `amount` would pay right now.
    ///
    /// Priced at the vault's live rate, which can sit below the stored index
    /// once the vault has been emptied and refilled.
    pub fn preview_burn(&self, view: &HostView<'_>, amount: Amount) -> Result<Amount> {
        Ok(view.vault.preview_leave(view.bank, amount)?)
    }

    /// Put a harvest into the vault and credit the shares to `pid`.
    fn harvest(&mut self, host: &mut Host<'_>, pid: PoolId, harvested: Amount) -> Result<()> {
        if harvested == 0 {
            return Ok(());
        }
        let asset = host.vault.asset();
        host.bank
            .approve(&asset, self.address, host.vault.address(), harvested)?;
        let shares = host.vault.enter(host.bank, self.address, harvested)?;

        let ledger = self.ledgers.entry(pid).or_default();
        if ledger.total_staked == 0 {
            tracing::warn!(pid, shares, "harvest with nothing staked, shares unassigned");
            return Ok(());
        }
        ledger.acc_yield_per_share = accumulate(ledger.acc_yield_per_share, shares, ledger.total_staked)?;
        tracing::debug!(pid, harvested, shares, "harvest entered vault");
        Ok(())
    }

    /// Mint `user`'s pending yield tokens and rewrite its stake as `staked`.
    fn settle(
        &mut self,
        bank: &mut TokenBank,
        pid: PoolId,
        user: Address,
        yield_token: Address,
        staked: Amount,
    ) -> Result<Amount> {
        let acc = self.pool_ledger(pid).acc_yield_per_share;
        let minted = pending(&self.user_info(pid, user), acc)?;
        let reward_debt = mul_div(staked, acc, ACC_PRECISION).ok_or(ChefError::Overflow)?;
        if minted > 0 {
            bank.mint(&yield_token, self.address, user, minted)?;
        }
        self.stakes.insert(
            (pid, user),
            UserStake {
                amount: staked,
                reward_debt,
            },
        );
        Ok(minted)
    }

    fn claim_bonus(
        &self,
        host: &mut Host<'_>,
        user: Address,
        pid: PoolId,
        strategy: Address,
        amount: Amount,
    ) -> Vec<RewardPayout> {
        if strategy.is_zero() {
            return Vec::new();
        }
        let Some(target) = host.strategies.get_mut(&strategy) else {
            tracing::warn!(pid, strategy = %strategy, "strategy missing, no bonus paid");
            return Vec::new();
        };
        match target.claim_reward(host.bank, self.address, user, amount) {
            Ok(payouts) => payouts,
            Err(e) => {
                tracing::warn!(pid, strategy = %strategy, error = %e, "strategy claim failed, no bonus paid");
                Vec::new()
            }
        }
    }

    /// Track the vault rate. With no shares left no yield token is
    /// outstanding, so the index drops back to the rate the next harvest
    /// enters at.
    fn refresh_index(&mut self, bank: &TokenBank, vault: &dyn ShareVault) -> Result<()> {
        let observed =
            RewardIndex::from_vault(vault.asset_balance(bank)?, vault.total_shares(bank)?)?;
        match observed {
            Some(observed) => {
                if self.reward_index.advance(observed) {
                    tracing::debug!(index = %self.reward_index, "reward index advanced");
                }
            }
            None if self.reward_index != RewardIndex::ONE => {
                tracing::debug!(previous = %self.reward_index, "vault emptied, reward index reset");
                self.reward_index = RewardIndex::ONE;
            }
            None => {}
        }
        Ok(())
    }

    fn registered(&self, pid: PoolId) -> Result<YieldTokenInfo> {
        self.yield_tokens
            .get(&pid)
            .copied()
            .ok_or(ChefError::NotRegistered { pid })
    }

    fn require_owner(&self, caller: Address) -> Result<()> {
        if !self.owner.is_zero() && caller == self.owner {
            Ok(())
        } else {
            Err(ChefError::Unauthorized(caller))
        }
    }
}

fn require_strategy(registry: &StrategyRegistry, strategy: Address) -> Result<()> {
    if strategy.is_zero() || registry.contains(&strategy) {
        Ok(())
    } else {
        Err(ChefError::UnknownStrategy(strategy))
    }
}

fn accumulate(acc: Amount, shares: Amount, total_staked: Amount) -> Result<Amount> {
    let delta = mul_div(shares, ACC_PRECISION, total_staked).ok_or(ChefError::Overflow)?;
    acc.checked_add(delta).ok_or(ChefError::Overflow)
}

fn pending(stake: &UserStake, acc: Amount) -> Result<Amount> {
    let accrued = mul_div(stake.amount, acc, ACC_PRECISION).ok_or(ChefError::Overflow)?;
    Ok(accrued.saturating_sub(stake.reward_debt))
}
