//! Domain-separated BLAKE3 address derivation.
//!
//! Every address is the output of BLAKE3 in key-derivation mode, keyed by a
//! registered context string. Two kinds of object can therefore never share
//! an address even when derived from identical inputs.
//!
//! Inputs are streamed into the hasher as `LE32(len) || bytes` per field, so
//! field boundaries are part of what gets hashed.

/// Registered context strings, one per kind of address.
pub mod contexts {
    /// Yield token of a pool: `[sous_chef, pid_le]`.
    pub const YIELD_TOKEN_ADDRESS: &str = "SousChef v1 yield-token-address";
    /// Singleton contracts (chef, engine, vault): `[deployer, label]`.
    pub const CONTRACT_ADDRESS: &str = "SousChef v1 contract-address";
    /// Plain fungible tokens: `[creator, nonce_le]`.
    pub const TOKEN_ADDRESS: &str = "SousChef v1 token-address";
    /// Reward strategies: `[owner, nonce_le]`.
    pub const STRATEGY_ADDRESS: &str = "SousChef v1 strategy-address";
    /// Named externally-owned accounts: `[label]`.
    pub const ACCOUNT_ADDRESS: &str = "SousChef v1 account-address";

    pub const ALL: [&str; 5] = [
        YIELD_TOKEN_ADDRESS,
        CONTRACT_ADDRESS,
        TOKEN_ADDRESS,
        STRATEGY_ADDRESS,
        ACCOUNT_ADDRESS,
    ];
}

/// Whether `context` is one of [`contexts::ALL`].
pub fn is_registered_context(context: &str) -> bool {
    contexts::ALL.contains(&context)
}

/// Derive a 32-byte address from `fields` under `context`.
///
/// # Arguments
///
/// * `context` - A registered context string
/// * `fields` - Input fields, each length-prefixed before hashing
pub fn derive_address(context: &str, fields: &[&[u8]]) -> [u8; 32] {
    debug_assert!(is_registered_context(context), "unregistered context");
    let mut hasher = ::blake3::Hasher::new_derive_key(context);
    for field in fields {
        hasher.update(&(field.len() as u32).to_le_bytes());
        hasher.update(field);
    }
    *hasher.finalize().as_bytes()
}
