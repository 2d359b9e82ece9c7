//! Cryptographic primitives for the commit-reveal scheme.
//!
//! This module provides:
//! - Secret and SecretDigest for the hidden half of a commitment
//! - Commitment over the packed (move, digest, address) layout

mod commitment;
mod secret;

pub use commitment::{
    compute_commitment, derive_secret_digest, pack_commitment_preimage, CommitError, Commitment,
    SecretDigest, COMMITMENT_PREIMAGE_LEN,
};
pub use secret::Secret;
