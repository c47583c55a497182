// SPDX-License-Identifier: MIT OR Apache-2.0

use std::error::Error;

use crate::crypto::x25519::{PublicKey, SecretKey};
use crate::folder_key::{ClientHalf, ServerHalf, ServerHalfId};
use crate::identity::UserId;
use crate::key_split::EncryptedClientHalf;

/// Cryptographic operations required to split a folder key into per-device halves.
///
/// All three operations are pure functions of their inputs, aside from the randomness drawn for a
/// fresh server half. Implementations must not carry hidden mutable state: the splitter may be
/// invoked concurrently for all devices of a key generation.
///
/// The production implementation is [`FolderCrypto`](crate::FolderCrypto); tests use a
/// deterministic stub.
pub trait SplitCrypto {
    type Error: Error;

    /// Generates a fresh, random server half.
    fn random_server_half(&self) -> Result<ServerHalf, Self::Error>;

    /// Encrypts a client half towards a device, using the ephemeral secret key of the current key
    /// generation.
    fn encrypt_client_half(
        &self,
        ephemeral_secret: &SecretKey,
        device_key: &PublicKey,
        client_half: &ClientHalf,
    ) -> Result<EncryptedClientHalf, Self::Error>;

    /// Derives the identifier under which the server stores this server half.
    ///
    /// Identifiers must be stable and collision-resistant across the lifetime of the system, since
    /// the server uses them to delete specific halves long after they were uploaded.
    fn server_half_id(
        &self,
        user: &UserId,
        device_key: &PublicKey,
        server_half: &ServerHalf,
    ) -> Result<ServerHalfId, Self::Error>;
}
