//! Fixtures for end-to-end scenarios across the sous crates.
//!
//! Every scenario starts from [`setup`]: a default [`Runtime`] with a
//! funded deployer, one LP token held by alice and bob, and that LP token
//! listed as pool 0 of the staking engine.
//!
//! Run the scenarios:
//! ```sh
//! cargo test -p sous-integration-tests
//! ```

use sous_chef::{ChefConfig, Runtime};
use sous_types::{Address, Amount};
use tracing_subscriber::EnvFilter;

/// Base reward per block in the default configuration.
pub const RPB: Amount = 10_000;

/// Reward tokens minted to the deployer at setup.
pub const DEPLOYER_FUNDS: Amount = 100_000_000;

/// LP tokens minted to each of alice and bob at setup.
pub const LP_FUNDS: Amount = 10_000;

/// A deployed system plus the accounts the scenarios use.
pub struct Fixture {
    pub rt: Runtime,
    pub deployer: Address,
    pub alice: Address,
    pub bob: Address,
    pub carol: Address,
    /// LP token of pool 0.
    pub lp: Address,
}

/// Install a test subscriber honouring `RUST_LOG`, defaulting to the
/// configured level. Safe to call from every test.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(ChefConfig::default().logging.log_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_test_writer()
        .try_init();
}

/// Deploy the system at block 0 and list the LP token as pool 0 with 100
/// allocation points.
///
/// # Panics
///
/// Panics if any deployment step fails.
pub fn setup() -> Fixture {
    init_tracing();

    let deployer = Address::account("deployer");
    let alice = Address::account("alice");
    let bob = Address::account("bob");
    let carol = Address::account("carol");

    let mut rt = Runtime::new(deployer, &ChefConfig::default()).expect("deploy runtime");
    let lp = rt.create_token(deployer, "Test LP", "TLP").expect("lp token");
    let chef = rt.chef().address();
    let vault = rt.vault_address();
    let reward = rt.reward_token();

    rt.mint(lp, deployer, alice, LP_FUNDS).expect("mint lp to alice");
    rt.mint(lp, deployer, bob, LP_FUNDS).expect("mint lp to bob");
    rt.mint(reward, deployer, deployer, DEPLOYER_FUNDS)
        .expect("fund deployer");
    rt.approve(reward, deployer, vault, 10_000_000_000)
        .expect("deployer approves vault");
    rt.approve(lp, alice, chef, 100_000).expect("alice approves chef");
    rt.approve(lp, bob, chef, 100_000).expect("bob approves chef");
    rt.add_pool(deployer, 100, lp, true).expect("list pool 0");

    Fixture {
        rt,
        deployer,
        alice,
        bob,
        carol,
        lp,
    }
}

impl Fixture {
    /// Create and list another LP token.
    ///
    /// # Panics
    ///
    /// Panics if the token cannot be created or listed.
    pub fn list_pool(&mut self, alloc_point: u64, with_update: bool) -> Address {
        let lp = self
            .rt
            .create_token(self.deployer, "Test LP", "TLP")
            .expect("lp token");
        self.rt
            .add_pool(self.deployer, alloc_point, lp, with_update)
            .expect("list pool");
        lp
    }

    /// Yield token balance of `account` in `pid`.
    pub fn yield_balance(&self, pid: u64, account: Address) -> Amount {
        self.rt
            .balance_of(self.rt.get_yield_token_address(pid), account)
    }

    /// Base reward balance of `account`.
    pub fn reward_balance(&self, account: Address) -> Amount {
        self.rt.balance_of(self.rt.reward_token(), account)
    }

    /// Send the deployer's reward tokens straight to the vault, raising
    /// the base asset per share.
    ///
    /// # Panics
    ///
    /// Panics if the deployer cannot cover `amount`.
    pub fn donate_to_vault(&mut self, amount: Amount) {
        let reward = self.rt.reward_token();
        let vault = self.rt.vault_address();
        self.rt
            .transfer(reward, self.deployer, vault, amount)
            .expect("donate to vault");
    }

    /// Double the vault's base asset balance.
    pub fn double_vault(&mut self) {
        let held = self.reward_balance(self.rt.vault_address());
        self.donate_to_vault(held);
    }
}
