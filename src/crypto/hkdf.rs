// SPDX-License-Identifier: MIT OR Apache-2.0

//! HKDF-SHA256 key derivation.
use hkdf::Hkdf;
use sha2::Sha256;
use thiserror::Error;

/// Derives `N` bytes of key material from the given input via HKDF-SHA256.
pub fn hkdf_sha256<const N: usize>(
    salt: Option<&[u8]>,
    ikm: &[u8],
    info: &[u8],
) -> Result<[u8; N], HkdfError> {
    let hkdf = Hkdf::<Sha256>::new(salt, ikm);
    let mut okm = [0u8; N];
    hkdf.expand(info, &mut okm)
        .map_err(|_| HkdfError::InvalidOutputLength)?;
    Ok(okm)
}

#[derive(Debug, Error)]
pub enum HkdfError {
    #[error("requested hkdf output length is invalid")]
    InvalidOutputLength,
}
