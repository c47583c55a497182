// SPDX-License-Identifier: MIT OR Apache-2.0

//! X25519 Diffie-Hellman key agreement.
use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use x25519_dalek::StaticSecret;

use crate::crypto::Secret;
use crate::serde::{deserialize_hex, serialize_hex};

pub const X25519_KEY_SIZE: usize = 32;

pub const X25519_SHARED_SECRET_SIZE: usize = 32;

/// X25519 secret key.
///
/// Used both for long-lived device keys and for the short-lived ephemeral keys scoped to one key
/// generation.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecretKey(Secret<X25519_KEY_SIZE>);

impl SecretKey {
    pub fn from_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    /// Derives the public counterpart of this secret key.
    pub fn public_key(&self) -> PublicKey {
        let secret = StaticSecret::from(*self.0.as_bytes());
        PublicKey(x25519_dalek::PublicKey::from(&secret).to_bytes())
    }

    /// Computes the Diffie-Hellman shared secret between this secret key and a remote public key.
    pub fn calculate_agreement(
        &self,
        their_key: &PublicKey,
    ) -> Result<[u8; X25519_SHARED_SECRET_SIZE], X25519Error> {
        let secret = StaticSecret::from(*self.0.as_bytes());
        let shared = secret.diffie_hellman(&x25519_dalek::PublicKey::from(their_key.0));
        if !shared.was_contributory() {
            return Err(X25519Error::NonContributory);
        }
        Ok(shared.to_bytes())
    }
}

/// X25519 public key.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PublicKey([u8; X25519_KEY_SIZE]);

impl PublicKey {
    pub const fn from_bytes(bytes: [u8; X25519_KEY_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; X25519_KEY_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for PublicKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("PublicKey").field(&self.to_hex()).finish()
    }
}

impl TryFrom<&[u8]> for PublicKey {
    type Error = X25519Error;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; X25519_KEY_SIZE] = value
            .try_into()
            .map_err(|_| X25519Error::InvalidKeyLength(value.len(), X25519_KEY_SIZE))?;
        Ok(Self(bytes))
    }
}

impl Serialize for PublicKey {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for PublicKey {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|err: X25519Error| serde::de::Error::custom(err.to_string()))
    }
}

#[derive(Debug, Error)]
pub enum X25519Error {
    /// The shared secret was all zeroes, which happens when the remote key is a low-order point.
    #[error("x25519 agreement is not contributory")]
    NonContributory,

    /// Public key has an invalid length.
    #[error("invalid public key length {0} bytes, expected {1} bytes")]
    InvalidKeyLength(usize, usize),
}

#[cfg(test)]
mod tests {
    use super::SecretKey;

    #[test]
    fn agreement_is_symmetric() {
        let alice = SecretKey::from_bytes([7; 32]);
        let bob = SecretKey::from_bytes([8; 32]);

        let shared_1 = alice.calculate_agreement(&bob.public_key()).unwrap();
        let shared_2 = bob.calculate_agreement(&alice.public_key()).unwrap();
        assert_eq!(shared_1, shared_2);

        let eve = SecretKey::from_bytes([9; 32]);
        let shared_3 = eve.calculate_agreement(&bob.public_key()).unwrap();
        assert_ne!(shared_1, shared_3);
    }

    #[test]
    fn rejects_non_contributory_agreement() {
        let alice = SecretKey::from_bytes([7; 32]);
        let low_order = super::PublicKey::from_bytes([0; 32]);
        assert!(alice.calculate_agreement(&low_order).is_err());
    }
}
