//! Integration test: reward index behaviour and base asset conservation.
//!
//! 1. The index starts at one, doubles with the vault, and never falls
//!    while yield tokens are outstanding
//! 2. Burning every yield token empties the vault into the holders' hands
//! 3. Random operation sequences keep every yield token backed by a share
//! 4. Without outside inflows a staker never redeems more than was emitted

use proptest::prelude::*;
use sous_chef::RewardIndex;
use sous_integration_tests::{setup, Fixture, DEPLOYER_FUNDS, RPB};
use sous_types::Address;

/// Replay the accrual walk-through up to block 115, leaving alice with
/// 76250 and bob with 26250 yield tokens at a rate of 2.
fn run_to_block_115() -> (Fixture, Address) {
    let mut f = setup();
    let (alice, bob) = (f.alice, f.bob);
    f.rt.create_yield_tokens(f.deployer, &[0], &[Address::ZERO])
        .expect("create pool 0");
    let yt = f.rt.get_yield_token_address(0);

    f.rt.deposit(alice, 0, 100).expect("alice joins");
    for block in [101, 102, 103, 106] {
        f.rt.advance_to(block);
        f.rt.deposit(alice, 0, if block == 101 { 100 } else { 0 })
            .expect("alice harvests");
    }
    f.rt.advance_to(107);
    f.rt.deposit(bob, 0, 200).expect("bob joins");
    for block in [108, 109] {
        f.rt.advance_to(block);
        f.rt.deposit(bob, 0, 0).expect("bob harvests");
    }
    f.rt.advance_to(110);
    f.rt.deposit(alice, 0, 0).expect("alice harvests");

    f.rt.advance_to(111);
    f.rt.burn_yield_token(alice, yt, RPB).expect("burn at 1");
    f.rt.advance_to(112);
    f.donate_to_vault(RPB * 9);
    f.rt.advance_to(113);
    f.rt.burn_yield_token(alice, yt, RPB).expect("burn at 2");
    f.rt.advance_to(114);
    f.list_pool(100, true);
    f.rt.advance_to(115);
    f.rt.deposit(alice, 0, 0).expect("alice at 115");
    f.rt.deposit(bob, 0, 0).expect("bob at 115");

    assert_eq!(f.yield_balance(0, alice), 76_250);
    assert_eq!(f.yield_balance(0, bob), 26_250);
    (f, yt)
}

#[test]
fn test_index_starts_at_one() {
    let f = setup();
    let index = f.rt.sushi_reward_per_yield_token().expect("index");
    assert_eq!(index, RewardIndex::ONE);
    assert_eq!(index.as_units(), 1);
    assert_eq!(index.apply(123).expect("apply"), 123);
    // Nothing to redeem from an empty vault.
    assert_eq!(f.rt.preview_burn(123).expect("preview"), 0);
}

#[test]
fn test_burning_everything_conserves_base_asset() {
    let (mut f, yt) = run_to_block_115();
    let (alice, bob) = (f.alice, f.bob);
    let chef = f.rt.chef().address();
    let vault = f.rt.vault_address();

    assert_eq!(
        f.rt.sushi_reward_per_yield_token().expect("index").as_units(),
        2
    );
    assert_eq!(f.reward_balance(vault), 205_000);
    assert_eq!(f.rt.total_supply(f.rt.share_token()), 102_500);

    f.rt.advance_to(116);
    assert_eq!(f.rt.preview_burn(76_250).expect("preview"), 152_500);
    let receipt = f.rt.burn_yield_token(alice, yt, 76_250).expect("alice");
    assert_eq!(receipt.reward, 152_500);

    f.rt.advance_to(117);
    let receipt = f.rt.burn_yield_token(bob, yt, 26_250).expect("bob");
    assert_eq!(receipt.reward, 52_500);

    assert_eq!(f.reward_balance(alice), 182_500);
    assert_eq!(f.reward_balance(bob), 52_500);
    assert_eq!(f.reward_balance(chef), 0);
    assert_eq!(f.reward_balance(vault), 0);
    assert_eq!(f.rt.total_supply(f.rt.share_token()), 0);
    assert_eq!(f.rt.total_supply(yt), 0);

    // Nothing left to redeem: the index is back at the entry rate.
    let index = f.rt.sushi_reward_per_yield_token().expect("index");
    assert_eq!(index, RewardIndex::ONE);
    assert_eq!(f.rt.chef().stored_reward_index(), index);
}

#[test]
fn test_index_prices_burns_after_vault_empties() {
    let mut f = setup();
    let alice = f.alice;
    f.rt.create_yield_tokens(f.deployer, &[0], &[Address::ZERO])
        .expect("create pool 0");
    let yt = f.rt.get_yield_token_address(0);

    f.rt.deposit(alice, 0, 100).expect("deposit");
    f.rt.advance_to(101);
    assert_eq!(f.rt.deposit(alice, 0, 0).expect("harvest"), RPB);
    f.donate_to_vault(RPB);
    let receipt = f.rt.burn_yield_token(alice, yt, RPB).expect("burn all");
    assert_eq!(receipt.reward, RPB * 2);
    assert_eq!(f.rt.total_supply(f.rt.share_token()), 0);
    assert_eq!(f.rt.chef().stored_reward_index(), RewardIndex::ONE);

    // The next harvest enters the empty vault one to one.
    f.rt.advance_to(102);
    let minted = f.rt.deposit(alice, 0, 0).expect("harvest again");
    assert_eq!(minted, RPB);
    let index = f.rt.sushi_reward_per_yield_token().expect("index");
    assert_eq!(index, RewardIndex::ONE);
    let promised = index.apply(minted).expect("apply");
    assert_eq!(f.rt.preview_burn(minted).expect("preview"), promised);

    let receipt = f.rt.burn_yield_token(alice, yt, minted).expect("burn again");
    assert_eq!(receipt.reward, promised);
    assert_eq!(f.reward_balance(alice), RPB * 3);
}

#[test]
fn test_burn_through_transfer_pays_holder() {
    let (mut f, yt) = run_to_block_115();
    let (alice, carol) = (f.alice, f.carol);
    let chef = f.rt.chef().address();

    f.rt.advance_to(116);
    f.rt.transfer(yt, alice, carol, 76_250).expect("to carol");
    f.rt.advance_to(117);
    let receipt = f.rt.burn_yield_token(carol, yt, 76_250).expect("carol burns");
    assert_eq!(receipt.reward, 152_500);
    assert_eq!(f.reward_balance(carol), 152_500);
    assert_eq!(f.reward_balance(alice), 30_000);
    assert_eq!(f.reward_balance(chef), 0);
    assert_eq!(f.reward_balance(f.rt.vault_address()), 52_500);
    assert_eq!(f.rt.balance_of(f.rt.share_token(), chef), 26_250);
}

#[derive(Clone, Debug)]
enum Op {
    Deposit { bob: bool, amount: u128 },
    Withdraw { bob: bool, amount: u128 },
    Burn { bob: bool, amount: u128 },
    Donate(u128),
    Mine(u64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (any::<bool>(), 0u128..2_000).prop_map(|(bob, amount)| Op::Deposit { bob, amount }),
        (any::<bool>(), 0u128..2_000).prop_map(|(bob, amount)| Op::Withdraw { bob, amount }),
        (any::<bool>(), 1u128..20_000).prop_map(|(bob, amount)| Op::Burn { bob, amount }),
        (1u128..50_000).prop_map(Op::Donate),
        (1u64..5).prop_map(Op::Mine),
    ]
}

#[derive(Clone, Debug)]
enum SoloOp {
    Deposit(u128),
    Harvest,
    Withdraw(u128),
    Burn(u128),
    Mine(u64),
}

fn solo_op() -> impl Strategy<Value = SoloOp> {
    prop_oneof![
        (1u128..2_000).prop_map(SoloOp::Deposit),
        Just(SoloOp::Harvest),
        (1u128..2_000).prop_map(SoloOp::Withdraw),
        (1u128..30_000).prop_map(SoloOp::Burn),
        (1u64..5).prop_map(SoloOp::Mine),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    /// Base asset received plus what the remaining yield tokens redeem for
    /// never exceeds the base reward the engine emitted to the pool.
    #[test]
    fn prop_redemption_bounded_by_emission(ops in prop::collection::vec(solo_op(), 1..40)) {
        let mut f = setup();
        f.rt.create_yield_tokens(f.deployer, &[0], &[Address::ZERO])
            .expect("create pool 0");
        let yt = f.rt.get_yield_token_address(0);
        let alice = f.alice;
        let reward = f.rt.reward_token();
        f.rt.advance_to(100);

        let mut received: u128 = 0;
        for op in ops {
            match op {
                SoloOp::Deposit(amount) => {
                    let _ = f.rt.deposit(alice, 0, amount);
                }
                SoloOp::Harvest => {
                    let _ = f.rt.deposit(alice, 0, 0);
                }
                SoloOp::Withdraw(amount) => {
                    let _ = f.rt.withdraw(alice, 0, amount);
                }
                SoloOp::Burn(amount) => {
                    if let Ok(receipt) = f.rt.burn_yield_token(alice, yt, amount) {
                        received += receipt.reward;
                    }
                }
                SoloOp::Mine(blocks) => f.rt.mine(blocks),
            }

            let emitted = f.rt.total_supply(reward) - DEPLOYER_FUNDS;
            let held = f.rt.balance_of(yt, alice);
            let redeemable = f.rt.preview_burn(held).expect("preview");
            prop_assert!(
                received + redeemable <= emitted,
                "received {} + redeemable {} > emitted {}",
                received,
                redeemable,
                emitted
            );
            prop_assert_eq!(f.reward_balance(alice), received);
        }
    }

    /// The index never falls while shares are outstanding, yield tokens
    /// never outnumber the chef's shares, and a burn pays exactly its
    /// preview.
    #[test]
    fn prop_index_monotonic_and_backed(ops in prop::collection::vec(op(), 1..40)) {
        let mut f = setup();
        f.rt.create_yield_tokens(f.deployer, &[0], &[Address::ZERO])
            .expect("create pool 0");
        let yt = f.rt.get_yield_token_address(0);
        let chef = f.rt.chef().address();
        let share = f.rt.share_token();
        f.rt.advance_to(100);

        let mut last = f.rt.sushi_reward_per_yield_token().expect("index");
        for op in ops {
            match op {
                Op::Deposit { bob, amount } => {
                    let user = if bob { f.bob } else { f.alice };
                    let _ = f.rt.deposit(user, 0, amount);
                }
                Op::Withdraw { bob, amount } => {
                    let user = if bob { f.bob } else { f.alice };
                    let _ = f.rt.withdraw(user, 0, amount);
                }
                Op::Burn { bob, amount } => {
                    let user = if bob { f.bob } else { f.alice };
                    let preview = f.rt.preview_burn(amount).expect("preview");
                    if let Ok(receipt) = f.rt.burn_yield_token(user, yt, amount) {
                        prop_assert_eq!(receipt.reward, preview);
                    }
                }
                Op::Donate(amount) => f.donate_to_vault(amount),
                Op::Mine(blocks) => f.rt.mine(blocks),
            }

            let index = f.rt.sushi_reward_per_yield_token().expect("index");
            if f.rt.total_supply(share) > 0 {
                prop_assert!(index >= last, "index fell from {} to {}", last, index);
            } else {
                prop_assert_eq!(index, RewardIndex::ONE);
            }
            last = index;
            prop_assert!(f.rt.total_supply(yt) <= f.rt.balance_of(share, chef));
            prop_assert_eq!(f.reward_balance(chef), 0);
        }
    }

    /// A staker alone in a pool mints exactly one yield token per emitted
    /// base unit while the vault is at its initial rate.
    #[test]
    fn prop_single_staker_mints_emission(stake in 1u128..5_000, blocks in 1u64..50) {
        let mut f = setup();
        f.rt.create_yield_tokens(f.deployer, &[0], &[Address::ZERO])
            .expect("create pool 0");
        f.rt.advance_to(100);
        f.rt.deposit(f.alice, 0, stake).expect("deposit");
        f.rt.mine(blocks);

        let pending = f.rt.pending_yield_token(0, f.alice).expect("pending");
        let minted = f.rt.deposit(f.alice, 0, 0).expect("harvest");
        prop_assert_eq!(pending, minted);
        let emitted = RPB * u128::from(blocks);
        prop_assert!(minted <= emitted);
        prop_assert!(emitted - minted < stake);
    }
}
