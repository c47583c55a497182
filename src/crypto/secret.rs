// SPDX-License-Identifier: MIT OR Apache-2.0

//! Fixed-size container for secret key material.
use std::fmt;

use serde::{Deserialize, Serialize};
use subtle::ConstantTimeEq;
use zeroize::ZeroizeOnDrop;

/// Byte container for secrets with best-effort hygiene: memory is zeroised on drop, equality runs
/// in constant time and debug output never prints the value.
///
/// "Best effort" since side-channels are ultimately a property of the deployed system including
/// the hardware it runs on, not of a container type.
#[derive(Clone, Eq, Serialize, Deserialize, ZeroizeOnDrop)]
pub struct Secret<const N: usize>(#[serde(with = "serde_bytes")] [u8; N]);

impl<const N: usize> Secret<N> {
    pub(crate) fn from_bytes(bytes: [u8; N]) -> Self {
        Self(bytes)
    }

    pub(crate) fn as_bytes(&self) -> &[u8; N] {
        &self.0
    }
}

impl<const N: usize> PartialEq for Secret<N> {
    fn eq(&self, other: &Self) -> bool {
        // Constant-time comparison.
        bool::from(self.0.ct_eq(&other.0))
    }
}

impl<const N: usize> fmt::Debug for Secret<N> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secret").field("value", &"***").finish()
    }
}

#[cfg(test)]
mod tests {
    use super::Secret;

    #[test]
    fn equality() {
        let secret_1 = Secret::from_bytes([7; 32]);
        let secret_2 = Secret::from_bytes([7; 32]);
        let secret_3 = Secret::from_bytes([8; 32]);

        assert_eq!(secret_1, secret_2);
        assert_ne!(secret_1, secret_3);
    }

    #[test]
    fn redacted_debug() {
        let secret = Secret::from_bytes([7; 4]);
        assert!(!format!("{secret:?}").contains('7'));
    }
}
