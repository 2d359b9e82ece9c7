//! Commitment = keccak256(move || secret_digest || address).

use crate::games::{InvalidMove, Move, ParseMoveError};
use alloy_primitives::{keccak256, Address, B256};
use alloy_sol_types::{sol_data, SolType};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Packed preimage length: 1-byte move, 32-byte digest, 20-byte address.
pub const COMMITMENT_PREIMAGE_LEN: usize = 1 + 32 + 20;

/// Solidity `(uint8, bytes32, address)`, hashed in its packed form.
type CommitmentPreimage = (sol_data::Uint<8>, sol_data::FixedBytes<32>, sol_data::Address);

/// Input errors raised before any transaction is built.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CommitError {
    #[error("secret text must not be empty")]
    EmptySecret,

    #[error(transparent)]
    InvalidMove(#[from] InvalidMove),

    #[error(transparent)]
    UnknownMove(#[from] ParseMoveError),
}

/// keccak256 of the secret text, submitted in the clear at reveal time.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SecretDigest(B256);

impl SecretDigest {
    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    pub fn to_b256(&self) -> B256 {
        self.0
    }
}

impl From<B256> for SecretDigest {
    fn from(hash: B256) -> Self {
        Self(hash)
    }
}

impl fmt::Debug for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "SecretDigest({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for SecretDigest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Hash binding a player to a move without revealing it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Commitment(B256);

impl Commitment {
    /// Commit `mv` under `digest` for `player`.
    pub fn new(mv: Move, digest: &SecretDigest, player: &Address) -> Self {
        Self(keccak256(pack_commitment_preimage(mv, digest, player)))
    }

    /// Create from raw bytes
    pub fn from_bytes(bytes: [u8; 32]) -> Self {
        Self(B256::new(bytes))
    }

    /// Get the underlying bytes
    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0 .0
    }

    pub fn to_b256(&self) -> B256 {
        self.0
    }

    /// Verify that the given reveal reproduces this commitment
    pub fn verify(&self, mv: Move, digest: &SecretDigest, player: &Address) -> bool {
        *self == Self::new(mv, digest, player)
    }
}

impl fmt::Debug for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Commitment({})", hex::encode(&self.0[..8]))
    }
}

impl fmt::Display for Commitment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Digest of arbitrary non-empty secret text, hashed as UTF-8 bytes.
pub fn derive_secret_digest(secret_text: &str) -> Result<SecretDigest, CommitError> {
    if secret_text.is_empty() {
        return Err(CommitError::EmptySecret);
    }
    Ok(SecretDigest(keccak256(secret_text.as_bytes())))
}

/// Commitment from a raw on-chain move value; anything outside 1..=3 is rejected.
pub fn compute_commitment(
    raw_move: u8,
    digest: &SecretDigest,
    player: &Address,
) -> Result<Commitment, CommitError> {
    let mv = Move::try_from(raw_move)?;
    Ok(Commitment::new(mv, digest, player))
}

/// Solidity's `abi.encodePacked(uint8 move, bytes32 digest, address player)`.
pub fn pack_commitment_preimage(mv: Move, digest: &SecretDigest, player: &Address) -> Vec<u8> {
    CommitmentPreimage::abi_encode_packed(&(mv.as_u8(), digest.0, *player))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn player() -> Address {
        Address::repeat_byte(0xAA)
    }

    #[test]
    fn test_keccak_is_not_sha3() {
        assert_eq!(
            hex::encode(keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn test_secret_digest_is_deterministic() {
        let first = derive_secret_digest("abc123").unwrap();
        let second = derive_secret_digest("abc123").unwrap();
        assert_eq!(first, second);
        assert_ne!(first, derive_secret_digest("abc124").unwrap());
    }

    #[test]
    fn test_secret_digest_hashes_utf8_bytes() {
        let digest = derive_secret_digest("ключ").unwrap();
        assert_eq!(digest.to_b256(), keccak256("ключ".as_bytes()));
    }

    #[test]
    fn test_empty_secret_rejected() {
        assert_eq!(derive_secret_digest(""), Err(CommitError::EmptySecret));
    }

    #[test]
    fn test_packed_layout() {
        let digest = SecretDigest::from_bytes([0x11; 32]);
        let packed = pack_commitment_preimage(Move::Scissors, &digest, &player());

        assert_eq!(packed.len(), COMMITMENT_PREIMAGE_LEN);
        assert_eq!(packed.len(), 53);
        assert_eq!(packed[0], 3);
        assert!(packed[1..33].iter().all(|b| *b == 0x11));
        assert!(packed[33..].iter().all(|b| *b == 0xAA));
    }

    #[test]
    fn test_commitment_is_hash_of_packed_preimage() {
        let digest = derive_secret_digest("abc123").unwrap();
        let commitment = Commitment::new(Move::Paper, &digest, &player());
        let expected = keccak256(pack_commitment_preimage(Move::Paper, &digest, &player()));
        assert_eq!(commitment.to_b256(), expected);
    }

    #[test]
    fn test_round_trip_commit_then_reveal() {
        let digest_at_commit = derive_secret_digest("abc123").unwrap();
        let commitment = compute_commitment(2, &digest_at_commit, &player()).unwrap();

        let digest_at_reveal = derive_secret_digest("abc123").unwrap();
        assert!(commitment.verify(Move::Paper, &digest_at_reveal, &player()));
        assert_eq!(
            compute_commitment(2, &digest_at_reveal, &player()).unwrap(),
            commitment
        );
    }

    #[test]
    fn test_different_moves_different_commitments() {
        let digest = derive_secret_digest("abc123").unwrap();
        let rock = compute_commitment(1, &digest, &player()).unwrap();
        let paper = compute_commitment(2, &digest, &player()).unwrap();
        let scissors = compute_commitment(3, &digest, &player()).unwrap();

        assert_ne!(rock, paper);
        assert_ne!(paper, scissors);
        assert_ne!(rock, scissors);
    }

    #[test]
    fn test_commitment_bound_to_player() {
        let digest = derive_secret_digest("abc123").unwrap();
        let other = Address::repeat_byte(0xBB);
        assert_ne!(
            Commitment::new(Move::Rock, &digest, &player()),
            Commitment::new(Move::Rock, &digest, &other)
        );
    }

    #[test]
    fn test_out_of_range_moves_rejected() {
        let digest = derive_secret_digest("abc123").unwrap();
        for raw in [0u8, 4, 255] {
            assert_eq!(
                compute_commitment(raw, &digest, &player()),
                Err(CommitError::InvalidMove(InvalidMove(raw)))
            );
        }
    }

    #[test]
    fn test_wrong_reveal_fails_verification() {
        let digest = derive_secret_digest("abc123").unwrap();
        let commitment = Commitment::new(Move::Rock, &digest, &player());

        assert!(!commitment.verify(Move::Paper, &digest, &player()));
        assert!(!commitment.verify(
            Move::Rock,
            &derive_secret_digest("abc124").unwrap(),
            &player()
        ));
    }

    #[test]
    fn test_commitment_serializes_as_prefixed_hex() {
        let commitment = Commitment::from_bytes([0xAB; 32]);
        let json = serde_json::to_string(&commitment).unwrap();
        assert_eq!(json, format!("\"0x{}\"", "ab".repeat(32)));
        assert_eq!(serde_json::from_str::<Commitment>(&json).unwrap(), commitment);
    }
}
