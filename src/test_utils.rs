// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deterministic helpers to test the key-splitting protocol without real cryptography.
use std::sync::atomic::{AtomicU8, Ordering};

use thiserror::Error;

use crate::crypto::aead::AEAD_NONCE_SIZE;
use crate::crypto::hmac::hmac_sha256;
use crate::crypto::x25519::{PublicKey, SecretKey};
use crate::folder_key::{ClientHalf, FOLDER_KEY_SIZE, ServerHalf, ServerHalfId};
use crate::identity::UserId;
use crate::key_split::EncryptedClientHalf;
use crate::traits::SplitCrypto;

/// Step of [`StubCrypto`] which can be rigged to fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StubFailure {
    RandomServerHalf,
    EncryptClientHalf,
    ServerHalfId,
}

/// Deterministic [`SplitCrypto`] stub.
///
/// "Random" server halves count up from zero and client halves are passed through as plaintext
/// "ciphertexts", which makes every produced value predictable. Individual protocol steps can be
/// rigged to fail for error-path tests.
#[derive(Debug, Default)]
pub struct StubCrypto {
    next_half: AtomicU8,
    failure: Option<StubFailure>,
}

impl StubCrypto {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stub which fails at the given protocol step.
    pub fn failing(failure: StubFailure) -> Self {
        Self {
            next_half: AtomicU8::new(0),
            failure: Some(failure),
        }
    }

    /// Reverses this stub's "encryption" of a client half.
    pub fn stub_decrypt(&self, encrypted: &EncryptedClientHalf) -> ClientHalf {
        let bytes: [u8; FOLDER_KEY_SIZE] = encrypted
            .ciphertext()
            .try_into()
            .expect("stub ciphertext is an unencrypted client half");
        ClientHalf::from_bytes(bytes)
    }

    fn step(&self, step: StubFailure) -> Result<(), StubError> {
        if self.failure == Some(step) {
            return Err(StubError(step));
        }
        Ok(())
    }
}

impl SplitCrypto for StubCrypto {
    type Error = StubError;

    fn random_server_half(&self) -> Result<ServerHalf, StubError> {
        self.step(StubFailure::RandomServerHalf)?;
        let n = self.next_half.fetch_add(1, Ordering::Relaxed);
        Ok(ServerHalf::new([n; FOLDER_KEY_SIZE]))
    }

    fn encrypt_client_half(
        &self,
        _ephemeral_secret: &SecretKey,
        _device_key: &PublicKey,
        client_half: &ClientHalf,
    ) -> Result<EncryptedClientHalf, StubError> {
        self.step(StubFailure::EncryptClientHalf)?;
        Ok(EncryptedClientHalf::new(
            client_half.as_bytes().to_vec(),
            [0; AEAD_NONCE_SIZE],
        ))
    }

    fn server_half_id(
        &self,
        user: &UserId,
        device_key: &PublicKey,
        server_half: &ServerHalf,
    ) -> Result<ServerHalfId, StubError> {
        self.step(StubFailure::ServerHalfId)?;
        Ok(ServerHalfId::from_bytes(hmac_sha256(
            server_half.as_bytes(),
            &[user.as_bytes(), device_key.as_bytes()],
        )))
    }
}

/// The stub was rigged to fail at this step.
#[derive(Debug, Error, PartialEq, Eq)]
#[error("stub crypto was rigged to fail at {0:?}")]
pub struct StubError(pub StubFailure);

/// Key pair for a test device, derived from a seed byte.
pub fn device_key_pair(seed: u8) -> (SecretKey, PublicKey) {
    let secret = SecretKey::from_bytes([seed; 32]);
    let public = secret.public_key();
    (secret, public)
}
