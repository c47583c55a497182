// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interfaces to exchange the cryptographic backend of the key splitter.
mod crypto;

pub use crypto::SplitCrypto;
