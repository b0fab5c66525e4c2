//! A complete in-memory deployment.
//!
//! [`Runtime`] owns the token bank, an [`EmissionEngine`], a
//! [`RewardVault`], the strategy registry and the chef, and executes every
//! call at an explicit block height. Operations run in the current block;
//! [`Runtime::advance_to`] and [`Runtime::mine`] move time forward.

use sous_engine::{EmissionEngine, RewardVault, ShareVault};
use sous_strategy::{RewardSlot, RewardStrategy, StrategyRegistry};
use sous_token::TokenBank;
use sous_types::events::ChefEvent;
use sous_types::{Address, Amount, BlockNumber, PoolId};

use crate::chef::{BurnReceipt, Host, HostView, SousChef, UserStake, YieldTokenInfo};
use crate::config::ChefConfig;
use crate::events::EventBus;
use crate::index::RewardIndex;
use crate::{ChefError, Result};

/// The whole system in one place.
#[derive(Debug)]
pub struct Runtime {
    block: BlockNumber,
    deployer: Address,
    bank: TokenBank,
    engine: EmissionEngine,
    vault: RewardVault,
    strategies: StrategyRegistry,
    chef: SousChef,
    events: EventBus,
}

impl Runtime {
    /// Deploy the reward token, engine, vault and chef, all owned by
    /// `deployer`, starting at block 0.
    ///
    /// The deployer stays a minter of the reward token alongside the engine.
    pub fn new(deployer: Address, config: &ChefConfig) -> Result<Self> {
        let mut bank = TokenBank::new();
        let reward_token = bank.create_token(
            deployer,
            &config.tokens.reward_name,
            &config.tokens.reward_symbol,
        )?;

        let engine_address = Address::contract(&deployer, "engine");
        bank.set_minter(&reward_token, deployer, engine_address, true)?;
        let engine = EmissionEngine::new(
            engine_address,
            deployer,
            reward_token,
            Amount::from(config.emission.reward_per_block),
            config.emission.start_block,
        );

        let vault = RewardVault::deploy(
            &mut bank,
            Address::contract(&deployer, "vault"),
            reward_token,
            &config.tokens.share_name,
            &config.tokens.share_symbol,
        )?;
        let chef = SousChef::new(Address::contract(&deployer, "sous_chef"), deployer);

        tracing::info!(
            deployer = %deployer,
            reward_token = %reward_token,
            reward_per_block = config.emission.reward_per_block,
            start_block = config.emission.start_block,
            "runtime deployed"
        );
        Ok(Self {
            block: 0,
            deployer,
            bank,
            engine,
            vault,
            strategies: StrategyRegistry::new(),
            chef,
            events: EventBus::default(),
        })
    }

    /// Deploy from the configuration named by `SOUS_CONFIG`, or the
    /// defaults when it is unset.
    pub fn from_env(deployer: Address) -> anyhow::Result<Self> {
        let config = ChefConfig::load()?;
        Ok(Self::new(deployer, &config)?)
    }

    pub fn block(&self) -> BlockNumber {
        self.block
    }

    /// Move to `block`. Time never goes backwards.
    pub fn advance_to(&mut self, block: BlockNumber) {
        self.block = self.block.max(block);
    }

    /// Move forward `blocks` blocks.
    pub fn mine(&mut self, blocks: u64) {
        self.block = self.block.saturating_add(blocks);
    }

    pub fn deployer(&self) -> Address {
        self.deployer
    }

    pub fn bank(&self) -> &TokenBank {
        &self.bank
    }

    pub fn engine(&self) -> &EmissionEngine {
        &self.engine
    }

    pub fn vault(&self) -> &RewardVault {
        &self.vault
    }

    pub fn chef(&self) -> &SousChef {
        &self.chef
    }

    pub fn strategies(&self) -> &StrategyRegistry {
        &self.strategies
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// The base reward asset.
    pub fn reward_token(&self) -> Address {
        self.vault.asset()
    }

    /// The vault's share token.
    pub fn share_token(&self) -> Address {
        self.vault.share_token()
    }

    pub fn vault_address(&self) -> Address {
        self.vault.address()
    }

    fn split(&mut self) -> (&mut SousChef, Host<'_>) {
        (
            &mut self.chef,
            Host {
                block: self.block,
                bank: &mut self.bank,
                engine: &mut self.engine,
                vault: &mut self.vault,
                strategies: &mut self.strategies,
                events: &self.events,
            },
        )
    }

    fn view(&self) -> HostView<'_> {
        HostView {
            block: self.block,
            bank: &self.bank,
            engine: &self.engine,
            vault: &self.vault,
        }
    }

    // Tokens

    /// Create a plain token owned (and minted) by `creator`.
    pub fn create_token(&mut self, creator: Address, name: &str, symbol: &str) -> Result<Address> {
        Ok(self.bank.create_token(creator, name, symbol)?)
    }

    pub fn mint(&mut self, token: Address, caller: Address, to: Address, amount: Amount) -> Result<()> {
        Ok(self.bank.mint(&token, caller, to, amount)?)
    }

    pub fn transfer(&mut self, token: Address, from: Address, to: Address, amount: Amount) -> Result<()> {
        Ok(self.bank.transfer(&token, from, to, amount)?)
    }

    pub fn transfer_from(
        &mut self,
        token: Address,
        spender: Address,
        from: Address,
        to: Address,
        amount: Amount,
    ) -> Result<()> {
        Ok(self.bank.transfer_from(&token, spender, from, to, amount)?)
    }

    pub fn approve(&mut self, token: Address, owner: Address, spender: Address, amount: Amount) -> Result<()> {
        Ok(self.bank.approve(&token, owner, spender, amount)?)
    }

    pub fn set_minter(&mut self, token: Address, caller: Address, minter: Address, allowed: bool) -> Result<()> {
        Ok(self.bank.set_minter(&token, caller, minter, allowed)?)
    }

    /// Balance of `account`, zero for unknown tokens.
    pub fn balance_of(&self, token: Address, account: Address) -> Amount {
        self.bank.balance_of(&token, &account).unwrap_or(0)
    }

    /// Total supply, zero for unknown tokens.
    pub fn total_supply(&self, token: Address) -> Amount {
        self.bank.total_supply(&token).unwrap_or(0)
    }

    // Staking engine administration

    pub fn add_pool(
        &mut self,
        caller: Address,
        alloc_point: u64,
        lp_token: Address,
        with_update: bool,
    ) -> Result<PoolId> {
        Ok(self
            .engine
            .add_pool(&mut self.bank, self.block, caller, alloc_point, lp_token, with_update)?)
    }

    pub fn set_pool(
        &mut self,
        caller: Address,
        pid: PoolId,
        alloc_point: u64,
        with_update: bool,
    ) -> Result<()> {
        Ok(self
            .engine
            .set_pool(&mut self.bank, self.block, caller, pid, alloc_point, with_update)?)
    }

    // Vault

    /// Enter the vault directly. `caller` must have approved the vault.
    pub fn enter_vault(&mut self, caller: Address, amount: Amount) -> Result<Amount> {
        Ok(self.vault.enter(&mut self.bank, caller, amount)?)
    }

    pub fn leave_vault(&mut self, caller: Address, shares: Amount) -> Result<Amount> {
        Ok(self.vault.leave(&mut self.bank, caller, shares)?)
    }

    // Chef

    pub fn create_yield_tokens(
        &mut self,
        caller: Address,
        pids: &[PoolId],
        strategies: &[Address],
    ) -> Result<Vec<Address>> {
        let (chef, mut host) = self.split();
        chef.create_yield_tokens(&mut host, caller, pids, strategies)
    }

    pub fn update_strategy(&mut self, caller: Address, pid: PoolId, strategy: Address) -> Result<()> {
        let (chef, mut host) = self.split();
        chef.update_strategy(&mut host, caller, pid, strategy)
    }

    pub fn deposit(&mut self, caller: Address, pid: PoolId, amount: Amount) -> Result<Amount> {
        let (chef, mut host) = self.split();
        chef.deposit(&mut host, caller, pid, amount)
    }

    pub fn withdraw(&mut self, caller: Address, pid: PoolId, amount: Amount) -> Result<Amount> {
        let (chef, mut host) = self.split();
        chef.withdraw(&mut host, caller, pid, amount)
    }

    pub fn burn_yield_token(
        &mut self,
        caller: Address,
        yield_token: Address,
        amount: Amount,
    ) -> Result<BurnReceipt> {
        let (chef, mut host) = self.split();
        chef.burn_yield_token(&mut host, caller, yield_token, amount)
    }

    pub fn transfer_chef_ownership(&mut self, caller: Address, new_owner: Address) -> Result<()> {
        let (chef, mut host) = self.split();
        chef.transfer_ownership(&mut host, caller, new_owner)
    }

    pub fn renounce_chef_ownership(&mut self, caller: Address) -> Result<()> {
        let (chef, mut host) = self.split();
        chef.renounce_ownership(&mut host, caller)
    }

    pub fn get_yield_token_address(&self, pid: PoolId) -> Address {
        self.chef.get_yield_token_address(pid)
    }

    pub fn y_token_info_of(&self, pid: PoolId) -> YieldTokenInfo {
        self.chef.y_token_info_of(pid)
    }

    pub fn user_info(&self, pid: PoolId, user: Address) -> UserStake {
        self.chef.user_info(pid, user)
    }

    pub fn pending_yield_token(&self, pid: PoolId, user: Address) -> Result<Amount> {
        self.chef.pending_yield_token(&self.view(), pid, user)
    }

    pub fn sushi_reward_per_yield_token(&self) -> Result<RewardIndex> {
        self.chef.sushi_reward_per_yield_token(&self.view())
    }

    pub fn preview_burn(&self, amount: Amount) -> Result<Amount> {
        self.chef.preview_burn(&self.view(), amount)
    }

    // Strategies

    /// Deploy a pre-funded strategy serving this chef.
    pub fn deploy_bucket(
        &mut self,
        owner: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Address> {
        let chef = self.chef.address();
        let address = self
            .strategies
            .deploy_bucket(owner, chef, reward_tokens, ratios)?;
        self.emit_slots(address, 0, reward_tokens);
        Ok(address)
    }

    /// Deploy a minting strategy serving this chef.
    pub fn deploy_fountain(
        &mut self,
        owner: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Address> {
        let chef = self.chef.address();
        let address = self
            .strategies
            .deploy_fountain(owner, chef, reward_tokens, ratios)?;
        self.emit_slots(address, 0, reward_tokens);
        Ok(address)
    }

    pub fn set_reward_tokens(
        &mut self,
        strategy: Address,
        caller: Address,
        ids: &[u64],
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<()> {
        self.strategy_mut(strategy)?
            .set_reward_tokens(caller, ids, reward_tokens, ratios)?;
        for (id, reward_token) in ids.iter().zip(reward_tokens) {
            self.events.emit(
                self.block,
                ChefEvent::RewardTokenSet {
                    strategy,
                    id: *id,
                    reward_token: *reward_token,
                },
            );
        }
        Ok(())
    }

    pub fn add_reward_tokens(
        &mut self,
        strategy: Address,
        caller: Address,
        reward_tokens: &[Address],
        ratios: &[u64],
    ) -> Result<Vec<u64>> {
        let ids = self
            .strategy_mut(strategy)?
            .add_reward_tokens(caller, reward_tokens, ratios)?;
        if let Some(first) = ids.first() {
            self.emit_slots(strategy, *first, reward_tokens);
        }
        Ok(ids)
    }

    pub fn withdraw_reward_tokens(
        &mut self,
        strategy: Address,
        caller: Address,
        to: Address,
        ids: &[u64],
        amounts: &[Amount],
    ) -> Result<()> {
        let target = self
            .strategies
            .get_mut(&strategy)
            .ok_or(ChefError::UnknownStrategy(strategy))?;
        Ok(target.withdraw_reward_tokens(&mut self.bank, caller, to, ids, amounts)?)
    }

    pub fn reward_tokens(&self, strategy: Address, id: u64) -> Result<RewardSlot> {
        self.strategies
            .get(&strategy)
            .map(|s| s.reward_tokens(id))
            .ok_or(ChefError::UnknownStrategy(strategy))
    }

    pub fn transfer_strategy_ownership(
        &mut self,
        strategy: Address,
        caller: Address,
        new_owner: Address,
    ) -> Result<()> {
        let previous_owner = self
            .strategy_mut(strategy)?
            .transfer_ownership(caller, new_owner)?;
        self.events.emit(
            self.block,
            ChefEvent::OwnershipTransferred {
                contract: strategy,
                previous_owner,
                new_owner,
            },
        );
        Ok(())
    }

    pub fn renounce_strategy_ownership(&mut self, strategy: Address, caller: Address) -> Result<()> {
        let previous_owner = self.strategy_mut(strategy)?.renounce_ownership(caller)?;
        self.events.emit(
            self.block,
            ChefEvent::OwnershipTransferred {
                contract: strategy,
                previous_owner,
                new_owner: Address::ZERO,
            },
        );
        Ok(())
    }

    fn strategy_mut(&mut self, strategy: Address) -> Result<&mut (dyn RewardStrategy + 'static)> {
        self.strategies
            .get_mut(&strategy)
            .ok_or(ChefError::UnknownStrategy(strategy))
    }

    /// Emit `RewardTokenSet` for slots written sequentially from `first_id`.
    fn emit_slots(&self, strategy: Address, first_id: u64, reward_tokens: &[Address]) {
        for (id, reward_token) in (first_id..).zip(reward_tokens) {
            self.events.emit(
                self.block,
                ChefEvent::RewardTokenSet {
                    strategy,
                    id,
                    reward_token: *reward_token,
                },
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sous_engine::StakingEngine;

    fn runtime() -> (Runtime, Address) {
        let deployer = Address::account("deployer");
        let rt = Runtime::new(deployer, &ChefConfig::default()).expect("runtime");
        (rt, deployer)
    }

    #[test]
    fn test_new_deploys_from_config() {
        let (rt, deployer) = runtime();
        assert_eq!(rt.engine().reward_per_block(), 10_000);
        assert_eq!(rt.engine().start_block(), 100);
        assert_eq!(rt.chef().owner(), deployer);
        let reward = rt.bank().get(&rt.reward_token()).expect("reward");
        assert_eq!(reward.symbol(), "SUSHI");
        assert!(reward.is_minter(&rt.engine().address()));
    }

    #[test]
    fn test_from_env_reads_config_file() {
        let deployer = Address::account("deployer");
        let path = std::env::temp_dir().join(format!("sous-config-{}.toml", std::process::id()));
        std::fs::write(
            &path,
            "[emission]\nreward_per_block = 40\nstart_block = 7\n\n[tokens]\nreward_symbol = \"RWD\"\n",
        )
        .expect("write config");

        std::env::set_var(crate::config::CONFIG_ENV, &path);
        let rt = Runtime::from_env(deployer).expect("runtime from file");
        assert_eq!(rt.engine().reward_per_block(), 40);
        assert_eq!(rt.engine().start_block(), 7);
        let reward = rt.bank().get(&rt.reward_token()).expect("reward");
        assert_eq!(reward.symbol(), "RWD");
        assert_eq!(reward.name(), "SushiToken");

        // A missing file falls back to the defaults.
        std::fs::remove_file(&path).expect("remove config");
        let rt = Runtime::from_env(deployer).expect("runtime from defaults");
        assert_eq!(rt.engine().reward_per_block(), 10_000);

        std::fs::write(&path, "[emission]\nstart_block = \"soon\"\n").expect("write bad config");
        assert!(Runtime::from_env(deployer).is_err());
        std::fs::remove_file(&path).expect("remove config");
        std::env::remove_var(crate::config::CONFIG_ENV);
    }

    #[test]
    fn test_time_only_moves_forward() {
        let (mut rt, _) = runtime();
        rt.advance_to(50);
        rt.advance_to(10);
        assert_eq!(rt.block(), 50);
        rt.mine(3);
        assert_eq!(rt.block(), 53);
    }

    #[test]
    fn test_unknown_strategy_admin() {
        let (mut rt, deployer) = runtime();
        let bogus = Address::account("bogus");
        assert_eq!(
            rt.add_reward_tokens(bogus, deployer, &[], &[]),
            Err(ChefError::UnknownStrategy(bogus))
        );
        assert_eq!(rt.reward_tokens(bogus, 0), Err(ChefError::UnknownStrategy(bogus)));
    }

    #[test]
    fn test_reward_token_set_events() {
        let (mut rt, deployer) = runtime();
        let r0 = rt.create_token(deployer, "Reward0", "R0").expect("r0");
        let r1 = rt.create_token(deployer, "Reward1", "R1").expect("r1");
        let bucket = rt.deploy_bucket(deployer, &[r0], &[5]).expect("bucket");

        let mut rx = rt.events().subscribe();
        let ids = rt
            .add_reward_tokens(bucket, deployer, &[r1], &[7])
            .expect("add");
        assert_eq!(ids, vec![1]);
        let record = rx.try_recv().expect("event");
        assert_eq!(
            record.event,
            ChefEvent::RewardTokenSet {
                strategy: bucket,
                id: 1,
                reward_token: r1
            }
        );
    }

    #[test]
    fn test_strategy_ownership_transfer() {
        let (mut rt, deployer) = runtime();
        let next = Address::account("next");
        let fountain = rt.deploy_fountain(deployer, &[], &[]).expect("fountain");
        rt.transfer_strategy_ownership(fountain, deployer, next)
            .expect("transfer");
        assert_eq!(rt.strategies().get(&fountain).map(|s| s.owner()), Some(next));
        assert!(rt
            .transfer_strategy_ownership(fountain, deployer, deployer)
            .is_err());
    }
}
