//! # sous-crypto
//!
//! Hashing primitives for the SousChef workspace.
//!
//! Every address in the system (contracts, tokens, strategies, the yield
//! token of each pool) is a BLAKE3 derivation under a registered context
//! string, so any party can compute an address before the thing it names
//! exists.
//!
//! ## Modules
//!
//! - [`blake3`]: domain-separated BLAKE3 address derivation

pub mod blake3;
