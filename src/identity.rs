// SPDX-License-Identifier: MIT OR Apache-2.0

//! Identifiers for the users of a shared folder.
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::serde::{deserialize_hex, serialize_hex};

pub const USER_ID_SIZE: usize = 16;

/// Opaque identifier of one user.
///
/// This crate never interprets user ids; resolving them to accounts and devices is the concern of
/// the surrounding identity layer. They only need to be stable, since server-half identifiers are
/// derived from them.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct UserId([u8; USER_ID_SIZE]);

impl UserId {
    pub const fn from_bytes(bytes: [u8; USER_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn as_bytes(&self) -> &[u8; USER_ID_SIZE] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        hex::encode(self.0)
    }
}

impl TryFrom<&[u8]> for UserId {
    type Error = UserIdError;

    fn try_from(value: &[u8]) -> Result<Self, Self::Error> {
        let bytes: [u8; USER_ID_SIZE] = value
            .try_into()
            .map_err(|_| UserIdError::InvalidLength(value.len(), USER_ID_SIZE))?;
        Ok(Self(bytes))
    }
}

impl FromStr for UserId {
    type Err = UserIdError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::try_from(hex::decode(value)?.as_slice())
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.to_hex())
    }
}

impl fmt::Debug for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("UserId").field(&self.to_hex()).finish()
    }
}

impl Serialize for UserId {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serialize_hex(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for UserId {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let bytes = deserialize_hex(deserializer)?;
        bytes
            .as_slice()
            .try_into()
            .map_err(|err: UserIdError| serde::de::Error::custom(err.to_string()))
    }
}

/// Error types for `UserId` struct.
#[derive(Debug, Error)]
pub enum UserIdError {
    /// User id has an invalid length.
    #[error("invalid user id length {0} bytes, expected {1} bytes")]
    InvalidLength(usize, usize),

    /// User id string contains invalid hexadecimal characters.
    #[error("invalid hex encoding in user id string")]
    InvalidHexEncoding(#[from] hex::FromHexError),
}

#[cfg(test)]
mod tests {
    use super::{UserId, UserIdError};

    #[test]
    fn hex_round_trip() {
        let user = UserId::from_bytes([7; 16]);
        let parsed: UserId = user.to_hex().parse().unwrap();
        assert_eq!(user, parsed);
    }

    #[test]
    fn invalid_length() {
        let result = UserId::try_from([1, 2, 3].as_slice());
        assert!(matches!(result, Err(UserIdError::InvalidLength(3, 16))));
    }

    #[test]
    fn invalid_hex_encoding() {
        let result: Result<UserId, UserIdError> = "not a hex string".parse();
        assert!(matches!(result, Err(UserIdError::InvalidHexEncoding(_))));
    }
}
