//! Events emitted by the chef, its strategies and ownership changes.
//!
//! Events are published on the chef's event bus wrapped in an
//! [`EventRecord`] carrying a sequence number and the block they happened in.

use serde::{Deserialize, Serialize};

use crate::{Address, Amount, BlockNumber, PoolId};

/// Envelope for all published events.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EventRecord {
    /// Monotonic sequence number assigned by the bus.
    pub sequence: u64,
    /// Block in which the event happened.
    pub block: BlockNumber,
    pub event: ChefEvent,
}

/// All event types.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum ChefEvent {
    /// A pool received its yield token.
    YieldTokenCreated {
        pid: PoolId,
        /// Backing stake asset of the pool.
        lp_token: Address,
        yield_token: Address,
        /// Zero when no strategy is assigned.
        strategy: Address,
    },
    StrategyUpdated {
        pid: PoolId,
        strategy: Address,
    },
    Deposit {
        user: Address,
        pid: PoolId,
        amount: Amount,
        /// Yield tokens minted to `user` by this deposit.
        minted: Amount,
    },
    Withdraw {
        user: Address,
        pid: PoolId,
        amount: Amount,
        minted: Amount,
    },
    YieldTokenBurned {
        user: Address,
        pid: PoolId,
        amount: Amount,
        /// Base asset paid out.
        reward: Amount,
    },
    /// A strategy slot was written (set or appended).
    RewardTokenSet {
        strategy: Address,
        id: u64,
        reward_token: Address,
    },
    OwnershipTransferred {
        contract: Address,
        previous_owner: Address,
        new_owner: Address,
    },
}
