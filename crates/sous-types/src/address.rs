//! Account and contract addresses.
//!
//! An [`Address`] is an opaque 32-byte identifier. Contracts, tokens and
//! strategies get theirs from a BLAKE3 derivation (see
//! [`sous_crypto::blake3`]), which is what makes a pool's yield token address
//! computable before the token exists.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_with::serde_as;
use sous_crypto::blake3;

use crate::PoolId;

/// A 32-byte address. The all-zero address means "none".
#[serde_as]
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Address(#[serde_as(as = "serde_with::hex::Hex")] pub [u8; 32]);

impl Address {
    /// The zero address.
    pub const ZERO: Address = Address([0u8; 32]);

    /// Wrap raw bytes.
    pub const fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }

    /// Borrow the raw bytes.
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    /// Whether this is the zero address.
    pub fn is_zero(&self) -> bool {
        self.0 == [0u8; 32]
    }

    /// Derive an address under a registered context from length-prefixed fields.
    pub fn derive(context: &str, fields: &[&[u8]]) -> Self {
        Self(blake3::derive_address(context, fields))
    }

    /// Address of a named externally-owned account.
    pub fn account(label: &str) -> Self {
        Self::derive(blake3::contexts::ACCOUNT_ADDRESS, &[label.as_bytes()])
    }

    /// Address of a singleton contract deployed by `deployer`.
    pub fn contract(deployer: &Address, label: &str) -> Self {
        Self::derive(
            blake3::contexts::CONTRACT_ADDRESS,
            &[deployer.as_bytes(), label.as_bytes()],
        )
    }

    /// Address of the yield token for `pid` under the chef at `sous_chef`.
    ///
    /// Pure in both inputs: the same value before and after the token is
    /// created.
    pub fn yield_token(sous_chef: &Address, pid: PoolId) -> Self {
        Self::derive(
            blake3::contexts::YIELD_TOKEN_ADDRESS,
            &[sous_chef.as_bytes(), &pid.to_le_bytes()],
        )
    }

    /// Address of the `nonce`-th plain token created by `creator`.
    pub fn token(creator: &Address, nonce: u64) -> Self {
        Self::derive(
            blake3::contexts::TOKEN_ADDRESS,
            &[creator.as_bytes(), &nonce.to_le_bytes()],
        )
    }

    /// Address of the `nonce`-th strategy deployed by `owner`.
    pub fn strategy(owner: &Address, nonce: u64) -> Self {
        Self::derive(
            blake3::contexts::STRATEGY_ADDRESS,
            &[owner.as_bytes(), &nonce.to_le_bytes()],
        )
    }
}

impl From<[u8; 32]> for Address {
    fn from(bytes: [u8; 32]) -> Self {
        Self(bytes)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl fmt::Debug for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // First 8 bytes are enough to tell addresses apart in logs.
        write!(f, "Address(0x{}..)", hex::encode(&self.0[..8]))
    }
}
