//! # DKG Core
//!
//! Distributed key generation based on Pedersen's verifiable secret sharing
//! over a prime-order elliptic-curve group (see [Secure Distributed Key
//! Generation for Discrete-Log Based Cryptosystems
//! ](https://link.springer.com/article/10.1007/s00145-006-0347-3)).
//!
//! Every participant deals a secret of its own through one VSS instance and
//! verifies every other dealer's deal; the certified deals combine into a
//! Shamir-shared group secret whose public key is known while the private
//! scalar is never assembled anywhere. A resharing variant refreshes the
//! shares, optionally for a new committee, without changing the group key.
//!
//! The crate is transport-agnostic: it exposes typed in-memory messages with
//! canonical byte encodings, and the caller moves them between nodes.

/// The DKG orchestrator: drives the parallel VSS instances of one round and
/// assembles the final distributed key share.
pub mod dkg;

/// Typed errors for the VSS and DKG layers
pub mod errors;

/// Participant groups: indexed public keys with an associated threshold
pub mod group;

/// The per-dealer verifiable secret sharing instance
pub mod vss;

pub use errors::{DKGError, DKGResult, VSSError, VSSResult};
