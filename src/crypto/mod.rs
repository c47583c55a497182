// SPDX-License-Identifier: MIT OR Apache-2.0

//! Cryptographic primitives backing the folder key protocol.
pub mod aead;
pub mod hkdf;
pub mod hmac;
mod rng;
mod secret;
pub mod x25519;

pub use rng::{Rng, RngError};
pub use secret::Secret;
