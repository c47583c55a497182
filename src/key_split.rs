// SPDX-License-Identifier: MIT OR Apache-2.0

//! One-shot splitting of a folder key into a per-device encrypted client half and a server half.
//!
//! Splitting runs once per (user, device, key generation) when a folder is created or its key is
//! rotated after a membership change. The resulting [`KeyInfo`] record goes into the folder's
//! persisted key bundle while the raw [`ServerHalf`] is uploaded to the server; the two travel
//! over different trust paths and only together they yield the folder key again.
//!
//! A device later fetches its server half and [recovers](recover_folder_key) the folder key by
//! decrypting the client half with its device secret and unmasking it.
use std::collections::BTreeMap;
use std::fmt;

use serde::de::{Error as SerdeError, MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cbor::{DecodeError, EncodeError, decode_cbor, encode_cbor};
use crate::crypto::aead::{AEAD_KEY_SIZE, AeadError, AeadNonce, aead_decrypt, aead_encrypt};
use crate::crypto::hkdf::{HkdfError, hkdf_sha256};
use crate::crypto::hmac::hmac_sha256;
use crate::crypto::x25519::{PublicKey, SecretKey, X25519Error};
use crate::crypto::{Rng, RngError};
use crate::folder_key::{
    ClientHalf, FOLDER_KEY_SIZE, FolderKey, ServerHalf, ServerHalfId, mask_folder_key,
    unmask_client_half,
};
use crate::identity::UserId;
use crate::traits::SplitCrypto;

/// Index into a key generation's list of ephemeral public keys.
///
/// Multiple devices may share one ephemeral key within a generation, so the key itself is not
/// repeated in every [`KeyInfo`] record.
pub type EphemeralKeyIndex = u32;

/// Domain separator for deriving the client-half encryption key from an X25519 agreement.
const CLIENT_HALF_INFO: &[u8] = b"folder-keys/client-half/v1";

/// Client half encrypted towards one device with the generation's ephemeral key.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedClientHalf {
    #[serde(with = "serde_bytes")]
    ciphertext: Vec<u8>,
    #[serde(with = "serde_bytes")]
    nonce: AeadNonce,
}

impl EncryptedClientHalf {
    pub(crate) fn new(ciphertext: Vec<u8>, nonce: AeadNonce) -> Self {
        Self { ciphertext, nonce }
    }

    pub(crate) fn ciphertext(&self) -> &[u8] {
        &self.ciphertext
    }
}

/// Durable record of one (user, device, key generation) triple in a folder's key bundle.
///
/// Created by [`split_folder_key`] and immutable afterwards; it is only ever retired by the
/// removal bookkeeping marking its server half for deletion.
///
/// Records survive round-trips through peers running other protocol versions: fields unknown to
/// this version are collected into [`extra`](KeyInfo::extra) on decoding and written back out on
/// encoding instead of being dropped.
#[derive(Clone, Debug, PartialEq)]
pub struct KeyInfo {
    /// Client half of the folder key, encrypted towards the device.
    pub client_half: EncryptedClientHalf,

    /// Handle under which the server stores the matching server half.
    pub server_half_id: ServerHalfId,

    /// Which of the generation's ephemeral public keys the client half was encrypted with.
    pub epub_key_index: EphemeralKeyIndex,

    /// Opaque fields of future protocol versions, preserved across re-serialization.
    pub extra: BTreeMap<String, ciborium::Value>,
}

impl KeyInfo {
    /// Encodes the record in CBOR format, including any preserved unknown fields.
    pub fn to_bytes(&self) -> Result<Vec<u8>, EncodeError> {
        encode_cbor(self)
    }

    /// Decodes a record from CBOR format, keeping unknown fields intact.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, DecodeError> {
        decode_cbor(bytes)
    }
}

impl Serialize for KeyInfo {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        // The ephemeral key index is omitted when zero, matching older records which predate the
        // field.
        let known_fields = if self.epub_key_index == 0 { 2 } else { 3 };
        let mut map = serializer.serialize_map(Some(known_fields + self.extra.len()))?;
        map.serialize_entry("client_half", &self.client_half)?;
        map.serialize_entry("server_half_id", &self.server_half_id)?;
        if self.epub_key_index != 0 {
            map.serialize_entry("epub_key_index", &self.epub_key_index)?;
        }
        for (key, value) in &self.extra {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for KeyInfo {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct KeyInfoVisitor;

        impl<'de> Visitor<'de> for KeyInfoVisitor {
            type Value = KeyInfo;

            fn expecting(&self, formatter: &mut fmt::Formatter) -> fmt::Result {
                formatter.write_str("key info encoded as a map")
            }

            fn visit_map<A>(self, mut map: A) -> Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut client_half = None;
                let mut server_half_id = None;
                let mut epub_key_index = None;
                let mut extra = BTreeMap::new();

                while let Some(key) = map.next_key::<String>()? {
                    match key.as_str() {
                        "client_half" => client_half = Some(map.next_value()?),
                        "server_half_id" => server_half_id = Some(map.next_value()?),
                        "epub_key_index" => epub_key_index = Some(map.next_value()?),
                        // Unknown fields are kept verbatim instead of being dropped.
                        _ => {
                            extra.insert(key, map.next_value::<ciborium::Value>()?);
                        }
                    }
                }

                Ok(KeyInfo {
                    client_half: client_half
                        .ok_or_else(|| SerdeError::custom("client half missing"))?,
                    server_half_id: server_half_id
                        .ok_or_else(|| SerdeError::custom("server half id missing"))?,
                    epub_key_index: epub_key_index.unwrap_or_default(),
                    extra,
                })
            }
        }

        deserializer.deserialize_map(KeyInfoVisitor)
    }
}

/// Splits a folder key into the two per-device halves.
///
/// The protocol, in strict order:
///
/// 1. Generate a fresh random [`ServerHalf`].
/// 2. Mask the folder key with it to get the client half.
/// 3. Encrypt the client half towards the device's public key, using the ephemeral secret key of
///    this key generation.
/// 4. Derive the [`ServerHalfId`] from user, device key and server half.
///
/// Returns the [`KeyInfo`] record for the key bundle and the raw server half for upload. The
/// caller must store both, via their separate trust paths. When any step fails the primitive's
/// error is returned unchanged and no key material is handed out.
pub fn split_folder_key<C: SplitCrypto>(
    crypto: &C,
    user: &UserId,
    folder_key: &FolderKey,
    ephemeral_secret: &SecretKey,
    epub_key_index: EphemeralKeyIndex,
    device_key: &PublicKey,
) -> Result<(KeyInfo, ServerHalf), C::Error> {
    let server_half = crypto.random_server_half()?;
    let client_half = mask_folder_key(&server_half, folder_key);
    let encrypted_client_half =
        crypto.encrypt_client_half(ephemeral_secret, device_key, &client_half)?;
    let server_half_id = crypto.server_half_id(user, device_key, &server_half)?;

    let info = KeyInfo {
        client_half: encrypted_client_half,
        server_half_id,
        epub_key_index,
        extra: BTreeMap::new(),
    };
    Ok((info, server_half))
}

/// Recovers the folder key on a device.
///
/// Takes the device's secret key, the ephemeral public key the record's
/// [`epub_key_index`](KeyInfo::epub_key_index) points at, the persisted record and the server
/// half fetched from the server.
pub fn recover_folder_key(
    device_secret: &SecretKey,
    ephemeral_key: &PublicKey,
    info: &KeyInfo,
    server_half: &ServerHalf,
) -> Result<FolderKey, CryptoError> {
    let client_half = decrypt_client_half(device_secret, ephemeral_key, &info.client_half)?;
    Ok(unmask_client_half(server_half, &client_half))
}

fn decrypt_client_half(
    device_secret: &SecretKey,
    ephemeral_key: &PublicKey,
    encrypted: &EncryptedClientHalf,
) -> Result<ClientHalf, CryptoError> {
    let shared_secret = device_secret.calculate_agreement(ephemeral_key)?;
    let key = hkdf_sha256::<AEAD_KEY_SIZE>(None, &shared_secret, CLIENT_HALF_INFO)?;
    let plaintext = aead_decrypt(&key, &encrypted.ciphertext, encrypted.nonce, None)?;
    let bytes: [u8; FOLDER_KEY_SIZE] = plaintext
        .as_slice()
        .try_into()
        .map_err(|_| CryptoError::ClientHalfSize)?;
    Ok(ClientHalf::from_bytes(bytes))
}

/// Production [`SplitCrypto`] backed by the crate's primitives.
///
/// Client halves are encrypted with an X25519 agreement between the generation's ephemeral secret
/// key and the device key, run through HKDF-SHA256 and XChaCha20-Poly1305. Server-half
/// identifiers are HMAC-SHA256, keyed by the half itself, over user id and device key.
#[derive(Debug)]
pub struct FolderCrypto<'a> {
    rng: &'a Rng,
}

impl<'a> FolderCrypto<'a> {
    pub fn new(rng: &'a Rng) -> Self {
        Self { rng }
    }
}

impl SplitCrypto for FolderCrypto<'_> {
    type Error = CryptoError;

    fn random_server_half(&self) -> Result<ServerHalf, CryptoError> {
        Ok(ServerHalf::from_bytes(self.rng.random_array()?))
    }

    fn encrypt_client_half(
        &self,
        ephemeral_secret: &SecretKey,
        device_key: &PublicKey,
        client_half: &ClientHalf,
    ) -> Result<EncryptedClientHalf, CryptoError> {
        let shared_secret = ephemeral_secret.calculate_agreement(device_key)?;
        let key = hkdf_sha256::<AEAD_KEY_SIZE>(None, &shared_secret, CLIENT_HALF_INFO)?;
        let nonce: AeadNonce = self.rng.random_array()?;
        let ciphertext = aead_encrypt(&key, client_half.as_bytes(), nonce, None)?;
        Ok(EncryptedClientHalf { ciphertext, nonce })
    }

    fn server_half_id(
        &self,
        user: &UserId,
        device_key: &PublicKey,
        server_half: &ServerHalf,
    ) -> Result<ServerHalfId, CryptoError> {
        let digest = hmac_sha256(
            server_half.as_bytes(),
            &[user.as_bytes(), device_key.as_bytes()],
        );
        Ok(ServerHalfId::from_bytes(digest))
    }
}

#[derive(Debug, Error)]
pub enum CryptoError {
    #[error(transparent)]
    Rng(#[from] RngError),

    #[error(transparent)]
    X25519(#[from] X25519Error),

    #[error(transparent)]
    Hkdf(#[from] HkdfError),

    #[error(transparent)]
    Aead(#[from] AeadError),

    #[error("decrypted client half does not match the folder key size")]
    ClientHalfSize,
}
