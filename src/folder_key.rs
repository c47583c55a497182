// SPDX-License-Identifier: MIT OR Apache-2.0

//! Folder encryption keys and their two-half split representation.
//!
//! Every key generation of a shared folder has one symmetric [`FolderKey`]. Instead of storing
//! the key anywhere, it is split per device into a random [`ServerHalf`] kept by the server and a
//! [`ClientHalf`] encrypted towards the device. Masking is a plain XOR over the key bytes, so
//! recombining both halves yields the folder key while either half on its own reveals nothing.
//!
//! The server addresses stored halves through a [`ServerHalfId`], a keyed digest which commits to
//! the half, its user and its device without revealing the half's value. When a device or user is
//! removed from a folder these identifiers are collected per generation and handed to the server
//! for deletion, see [`add_generation`](crate::add_generation).
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::crypto::hmac::HMAC_SHA256_DIGEST_SIZE;
use crate::crypto::{Rng, RngError, Secret};
use crate::serde::{deserialize_hex, serialize_hex};

/// 256-bit symmetric folder key.
pub const FOLDER_KEY_SIZE: usize = 32;

pub const SERVER_HALF_ID_SIZE: usize = HMAC_SHA256_DIGEST_SIZE;

/// Symmetric encryption key for one key generation of a shared folder.
///
/// The key only exists transiently while splitting or recovering it; it is never persisted in
/// plaintext by this crate.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FolderKey(Secret<FOLDER_KEY_SIZE>);

impl FolderKey {
    #[cfg(any(test, feature = "test_utils"))]
    pub fn new(bytes: [u8; FOLDER_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    /// Generates a fresh folder key, to be used for a new folder or the next key generation after
    /// a membership change.
    pub fn generate(rng: &Rng) -> Result<Self, RngError> {
        Ok(Self(Secret::from_bytes(rng.random_array()?)))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; FOLDER_KEY_SIZE] {
        self.0.as_bytes()
    }
}

/// Random mask for one (device, generation) pair, stored by the untrusted server.
///
/// The caller uploads the half to the server after splitting; this crate never transmits it.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerHalf(Secret<FOLDER_KEY_SIZE>);

impl ServerHalf {
    #[cfg(any(test, feature = "test_utils"))]
    pub fn new(bytes: [u8; FOLDER_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    pub(crate) fn from_bytes(bytes: [u8; FOLDER_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; FOLDER_KEY_SIZE] {
        self.0.as_bytes()
    }
}

/// Folder key masked with a device's server half.
///
/// Client halves exist only in encrypted form outside of the splitting and recovery paths.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClientHalf(Secret<FOLDER_KEY_SIZE>);

impl ClientHalf {
    pub(crate) fn from_bytes(bytes: [u8; FOLDER_KEY_SIZE]) -> Self {
        Self(Secret::from_bytes(bytes))
    }

    pub(crate) fn as_bytes(&self) -> &[u8; FOLDER_KEY_SIZE] {
        self.0.as_bytes()
    }
}

/// Masks a folder key with a server half, yielding the client half for one device.
pub fn mask_folder_key(server_half: &ServerHalf, folder_key: &FolderKey) -> ClientHalf {
    ClientHalf(Secret::from_bytes(xor(
        server_half.as_bytes(),
        folder_key.as_bytes(),
    )))
}

/// Recombines a server half with its client half, recovering the folder key.
pub fn unmask_client_half(server_half: &ServerHalf, client_half: &ClientHalf) -> FolderKey {
    FolderKey(Secret::from_bytes(xor(
        server_half.as_bytes(),
        client_half.as_bytes(),
    )))
}

fn xor(a: &[u8; FOLDER_KEY_SIZE], b: &[u8; FOLDER_KEY_SIZE]) -> [u8; FOLDER_KEY_SIZE] {
    let mut out = [0u8; FOLDER_KEY_SIZE];
    for (i, byte) in out.iter_mut().enumerate() {
        *byte = a[i] ^ b[i];
    }
    out
}

/// Identifier under which the server stores one server half.
///
/// Derived as an HMAC keyed by the half itself over its user and device, the identifier commits
/// to a specific stored half without revealing its value. It is the handle used to delete the
/// half after the device or user was removed from the folder.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ServerHalfId([u8; SERVER_HALF_ID_SIZE]);

impl ServerHalfId {
    pub const fn from_bytes(bytes: [u8; SERVER_HALF_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; SERVER_HALF_ID_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl fmt::Display for ServerHalfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for ServerHalfId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ServerHalfId").field(&self.to_hex()).finish()
    }
}

impl Serialize for ServerHalfId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for ServerHalfId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        let bytes: [u8; SERVER_HALF_ID_SIZE] = bytes.as_slice().try_into().map_err(|_| {
            serde::de::Error::custom(format!(
                "invalid server half id length, expected {SERVER_HALF_ID_SIZE} bytes"
            ))
        })?;
        Ok(Self(bytes))
    }
}

#[cfg(test)]
mod tests {
    use crate::crypto::Rng;

    use super::{FolderKey, ServerHalf, mask_folder_key, unmask_client_half};

    #[test]
    fn mask_round_trip() {
        let rng = Rng::from_seed([1; 32]);

        for _ in 0..8 {
            let folder_key = FolderKey::generate(&rng).unwrap();
            let server_half = ServerHalf::from_bytes(rng.random_array().unwrap());

            let client_half = mask_folder_key(&server_half, &folder_key);
            assert_eq!(
                unmask_client_half(&server_half, &client_half),
                folder_key
            );
        }
    }

    #[test]
    fn client_half_differs_from_key() {
        let folder_key = FolderKey::new([7; 32]);
        let server_half = ServerHalf::new([9; 32]);

        let client_half = mask_folder_key(&server_half, &folder_key);
        assert_ne!(client_half.as_bytes(), folder_key.as_bytes());
        assert_ne!(client_half.as_bytes(), server_half.as_bytes());
    }

    #[test]
    fn server_half_id_serde() {
        let id = super::ServerHalfId::from_bytes([7; 32]);

        // Hex string in human-readable encodings.
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, format!("\"{}\"", id.to_hex()));
        let id_again: super::ServerHalfId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, id_again);

        // Raw bytes in CBOR: two bytes of header plus the 32-byte digest.
        let bytes = crate::cbor::encode_cbor(&id).unwrap();
        assert_eq!(bytes.len(), 34);
        let id_again: super::ServerHalfId = crate::cbor::decode_cbor(&bytes).unwrap();
        assert_eq!(id, id_again);
    }
}
