//! Player-held secret text for a single commitment.

use super::commitment::{CommitError, SecretDigest};
use alloy_primitives::keccak256;
use rand::RngCore;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Random text that hides a committed move until reveal.
///
/// Only its digest ever leaves the process, and only at reveal time. The
/// text is never empty, so deriving the digest cannot fail.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Secret(String);

impl Secret {
    /// Generate a fresh secret from 16 random bytes.
    pub fn random() -> Self {
        let mut bytes = [0u8; 16];
        rand::thread_rng().fill_bytes(&mut bytes);
        Self(hex::encode(bytes))
    }

    /// Use caller-provided text as the secret.
    pub fn from_text(text: impl Into<String>) -> Result<Self, CommitError> {
        let text = text.into();
        if text.is_empty() {
            return Err(CommitError::EmptySecret);
        }
        Ok(Self(text))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// keccak256 of the secret's UTF-8 bytes.
    pub fn digest(&self) -> SecretDigest {
        SecretDigest::from(keccak256(self.0.as_bytes()))
    }
}

impl TryFrom<String> for Secret {
    type Error = CommitError;

    fn try_from(text: String) -> Result<Self, Self::Error> {
        Self::from_text(text)
    }
}

impl From<Secret> for String {
    fn from(secret: Secret) -> Self {
        secret.0
    }
}

impl fmt::Debug for Secret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Secret(<redacted>)")
    }
}
