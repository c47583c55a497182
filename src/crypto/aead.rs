// SPDX-License-Identifier: MIT OR Apache-2.0

//! XChaCha20-Poly1305 authenticated encryption.
use chacha20poly1305::aead::{Aead, KeyInit, Payload};
use chacha20poly1305::{XChaCha20Poly1305, XNonce};
use thiserror::Error;

pub const AEAD_KEY_SIZE: usize = 32;

pub const AEAD_NONCE_SIZE: usize = 24;

pub type AeadKey = [u8; AEAD_KEY_SIZE];

/// Nonces are drawn at random for every encryption; the extended 24-byte XChaCha20 nonce makes
/// random nonces collision-safe.
pub type AeadNonce = [u8; AEAD_NONCE_SIZE];

/// Encrypts and authenticates a plaintext.
pub fn aead_encrypt(
    key: &AeadKey,
    plaintext: &[u8],
    nonce: AeadNonce,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, AeadError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).expect("aead key size");
    let ciphertext = cipher
        .encrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: plaintext,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| AeadError::Encrypt)?;
    Ok(ciphertext)
}

/// Decrypts a ciphertext, verifying its authentication tag.
pub fn aead_decrypt(
    key: &AeadKey,
    ciphertext: &[u8],
    nonce: AeadNonce,
    aad: Option<&[u8]>,
) -> Result<Vec<u8>, AeadError> {
    let cipher = XChaCha20Poly1305::new_from_slice(key).expect("aead key size");
    let plaintext = cipher
        .decrypt(
            XNonce::from_slice(&nonce),
            Payload {
                msg: ciphertext,
                aad: aad.unwrap_or_default(),
            },
        )
        .map_err(|_| AeadError::Decrypt)?;
    Ok(plaintext)
}

#[derive(Debug, Error)]
pub enum AeadError {
    #[error("plaintext could not be encrypted")]
    Encrypt,

    #[error("ciphertext could not be authenticated and decrypted")]
    Decrypt,
}

#[cfg(test)]
mod tests {
    use super::{aead_decrypt, aead_encrypt};

    #[test]
    fn encrypt_decrypt() {
        let key = [7; 32];
        let nonce = [8; 24];

        let ciphertext = aead_encrypt(&key, b"client half", nonce, None).unwrap();
        assert_ne!(&ciphertext, b"client half");

        let plaintext = aead_decrypt(&key, &ciphertext, nonce, None).unwrap();
        assert_eq!(&plaintext, b"client half");
    }

    #[test]
    fn rejects_tampered_ciphertext() {
        let key = [7; 32];
        let nonce = [8; 24];

        let mut ciphertext = aead_encrypt(&key, b"client half", nonce, None).unwrap();
        ciphertext[0] ^= 1;
        assert!(aead_decrypt(&key, &ciphertext, nonce, None).is_err());
    }

    #[test]
    fn rejects_wrong_key() {
        let nonce = [8; 24];
        let ciphertext = aead_encrypt(&[7; 32], b"client half", nonce, None).unwrap();
        assert!(aead_decrypt(&[9; 32], &ciphertext, nonce, None).is_err());
    }

    #[test]
    fn authenticates_additional_data() {
        let key = [7; 32];
        let nonce = [8; 24];

        let ciphertext = aead_encrypt(&key, b"client half", nonce, Some(b"generation 3")).unwrap();
        assert!(aead_decrypt(&key, &ciphertext, nonce, Some(b"generation 3")).is_ok());
        assert!(aead_decrypt(&key, &ciphertext, nonce, Some(b"generation 4")).is_err());
        assert!(aead_decrypt(&key, &ciphertext, nonce, None).is_err());
    }
}
