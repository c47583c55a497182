// SPDX-License-Identifier: MIT OR Apache-2.0

//! `folder-keys` is the key-distribution core of an end-to-end encrypted, multi-device,
//! multi-user shared folder.
//!
//! A folder has one symmetric encryption key per key generation. Instead of handing that key to a
//! server or copying it between devices, it is [split](split_folder_key) per device into two
//! halves: a random **server half** stored by the (untrusted) storage backend, and a **client
//! half** (the folder key masked with the server half) encrypted towards the device's public
//! key. The server never sees the folder key or a plaintext client half; a device recombines the
//! encrypted client half from the folder's key bundle with the server half it fetches from the
//! backend to [recover](recover_folder_key) the folder key.
//!
//! ## Key generations and rotation
//!
//! Whenever the membership of a folder changes, the folder key is rotated: a new generation's key
//! is generated and split again for every remaining (user, device) pair. Removed devices keep
//! their old key material but never learn keys of later generations.
//!
//! Rotation leaves stale server halves behind, one per removed device and generation it lived
//! through. The removal bookkeeping [accumulates](add_generation) the [`ServerHalfId`] handles of
//! those halves across generations into a [`RemovalInfo`] record, which the caller turns into
//! batched deletion requests against the server.
//!
//! ## Trust and transport
//!
//! This crate is pure data transformation: it performs no network or storage I/O. Callers upload
//! server halves, persist [`KeyInfo`] records into their folder metadata and deliver deletion
//! instructions over their own transport. The cryptographic backend of the splitter is an
//! exchangeable [`SplitCrypto`](traits::SplitCrypto) capability; [`FolderCrypto`] is the
//! production implementation, tests run against a deterministic stub.
//!
//! ## Serialization
//!
//! Durable records are encoded in CBOR. [`KeyInfo`] records tolerate peers running newer protocol
//! versions: fields unknown to this version are preserved opaquely and written back out on
//! re-serialization instead of being dropped.
mod cbor;
mod crypto;
mod device_keys;
mod folder_key;
mod identity;
mod key_split;
mod removal;
mod serde;
#[cfg(any(test, feature = "test_utils"))]
pub mod test_utils;
pub mod traits;

pub use cbor::{DecodeError, EncodeError, decode_cbor, encode_cbor};
pub use crypto::aead::AeadError;
pub use crypto::hkdf::HkdfError;
pub use crypto::x25519::{PublicKey, SecretKey, X25519Error};
pub use crypto::{Rng, RngError};
pub use device_keys::{
    DevicePublicKey, DevicePublicKeys, DeviceServerHalves, MergeError, UserDevicePublicKeys,
    UserDeviceServerHalves, drop_empty_users, merge_users, user_devices_equal,
};
pub use folder_key::{
    ClientHalf, FOLDER_KEY_SIZE, FolderKey, SERVER_HALF_ID_SIZE, ServerHalf, ServerHalfId,
    mask_folder_key, unmask_client_half,
};
pub use identity::{USER_ID_SIZE, UserId, UserIdError};
pub use key_split::{
    CryptoError, EncryptedClientHalf, EphemeralKeyIndex, FolderCrypto, KeyInfo, recover_folder_key,
    split_folder_key,
};
pub use removal::{
    DeviceRemovalIds, RemovalError, RemovalInfo, UserRemovalInfo, add_generation,
};
