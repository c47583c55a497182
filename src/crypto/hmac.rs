// SPDX-License-Identifier: MIT OR Apache-2.0

//! HMAC-SHA256 keyed hashing.
use hmac::{Hmac, Mac};
use sha2::Sha256;

pub const HMAC_SHA256_DIGEST_SIZE: usize = 32;

/// Keyed HMAC-SHA256 over the concatenation of the given messages.
pub fn hmac_sha256(key: &[u8], messages: &[&[u8]]) -> [u8; HMAC_SHA256_DIGEST_SIZE] {
    let mut mac = Hmac::<Sha256>::new_from_slice(key).expect("hmac accepts any key size");
    for message in messages {
        mac.update(message);
    }
    let result = mac.finalize().into_bytes();
    result[..].try_into().expect("hmac-sha256 digest size")
}

#[cfg(test)]
mod tests {
    use super::hmac_sha256;

    #[test]
    fn rfc_4231_test_case_1() {
        let digest = hmac_sha256(&[0x0b; 20], &[b"Hi There"]);
        assert_eq!(
            hex::encode(digest),
            "b0344c61d8db38535ca8afceaf0bf12b881dc200c9833da726e9376c2e32cff7"
        );
    }

    #[test]
    fn keyed_and_message_sensitive() {
        let digest = hmac_sha256(&[1; 32], &[b"server", b"half"]);

        // Concatenation of the message parts does not change the digest, key or content changes
        // do.
        assert_eq!(digest, hmac_sha256(&[1; 32], &[b"serverhalf"]));
        assert_ne!(digest, hmac_sha256(&[2; 32], &[b"server", b"half"]));
        assert_ne!(digest, hmac_sha256(&[1; 32], &[b"server", b"halves"]));
    }
}
