// SPDX-License-Identifier: MIT OR Apache-2.0

//! Per-user, per-device key material of one folder.
//!
//! The containers in this module are keyed by user first and device second, mirroring how key
//! bundles are assembled: every writer contributes the material for their own slice of the
//! membership roster, and slices from independent writers are combined with [`merge_users`],
//! which treats an overlap as a data-integrity bug rather than merging silently.
use std::collections::{HashMap, HashSet};

use thiserror::Error;

use crate::crypto::x25519::PublicKey;
use crate::folder_key::ServerHalf;
use crate::identity::UserId;

/// Public key identifying one device of a user.
pub type DevicePublicKey = PublicKey;

/// The devices of one user.
pub type DevicePublicKeys = HashSet<DevicePublicKey>;

/// All users of a folder with their device sets.
pub type UserDevicePublicKeys = HashMap<UserId, DevicePublicKeys>;

/// Server halves of one user's devices, for one key generation.
pub type DeviceServerHalves = HashMap<DevicePublicKey, ServerHalf>;

/// Server halves of all users' devices, for one key generation.
///
/// This is the freshly-split output of one key rotation, waiting to be uploaded.
pub type UserDeviceServerHalves = HashMap<UserId, DeviceServerHalves>;

/// Compares two device rosters.
///
/// Rosters are equal when they name the same number of users and every user has an equal device
/// set; a user missing from one side compares as an empty device set.
pub fn user_devices_equal(a: &UserDevicePublicKeys, b: &UserDevicePublicKeys) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.iter().all(|(user, devices)| match b.get(user) {
        Some(other) => devices == other,
        None => devices.is_empty(),
    })
}

/// Returns the roster without the users that have no devices left.
///
/// A projection for tests and diagnostics; membership decisions are never based on an empty
/// device set.
pub fn drop_empty_users(roster: &UserDevicePublicKeys) -> UserDevicePublicKeys {
    roster
        .iter()
        .filter(|(_, devices)| !devices.is_empty())
        .map(|(user, devices)| (*user, devices.clone()))
        .collect()
}

/// Combines two user-keyed maps contributed by independent writers.
///
/// The operands must be disjoint: the same user appearing in both is an integrity bug upstream
/// (two independent contributors never describe the same user) and fails the merge instead of
/// overwriting either side. Per-user payloads are moved as-is, there is no deep merge.
pub fn merge_users<V>(
    a: HashMap<UserId, V>,
    b: HashMap<UserId, V>,
) -> Result<HashMap<UserId, V>, MergeError> {
    let mut merged = a;
    merged.reserve(b.len());
    for (user, value) in b {
        if merged.contains_key(&user) {
            return Err(MergeError::DuplicateUser { user });
        }
        merged.insert(user, value);
    }
    Ok(merged)
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MergeError {
    /// The same user contributed to both operands of a disjoint merge.
    #[error("user {user} is present in both operands of a disjoint merge")]
    DuplicateUser { user: UserId },
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};

    use crate::folder_key::ServerHalf;
    use crate::identity::UserId;
    use crate::test_utils::device_key_pair;

    use super::{
        DeviceServerHalves, MergeError, UserDevicePublicKeys, drop_empty_users, merge_users,
        user_devices_equal,
    };

    #[test]
    fn device_set_equality() {
        let (_, device_1) = device_key_pair(1);
        let (_, device_2) = device_key_pair(2);

        let set_a = HashSet::from([device_1, device_2]);
        let set_b = HashSet::from([device_2, device_1]);
        let set_c = HashSet::from([device_1]);

        assert_eq!(set_a, set_b);
        assert_ne!(set_a, set_c);
    }

    #[test]
    fn roster_equality_is_symmetric() {
        let (_, device_1) = device_key_pair(1);
        let (_, device_2) = device_key_pair(2);
        let user_1 = UserId::from_bytes([1; 16]);
        let user_2 = UserId::from_bytes([2; 16]);

        let roster_a: UserDevicePublicKeys = HashMap::from([
            (user_1, HashSet::from([device_1])),
            (user_2, HashSet::from([device_2])),
        ]);
        let roster_b = roster_a.clone();
        let roster_c: UserDevicePublicKeys = HashMap::from([
            (user_1, HashSet::from([device_1])),
            (user_2, HashSet::from([device_1, device_2])),
        ]);

        assert!(user_devices_equal(&roster_a, &roster_a));
        assert!(user_devices_equal(&roster_a, &roster_b));
        assert!(user_devices_equal(&roster_b, &roster_a));
        assert!(!user_devices_equal(&roster_a, &roster_c));
        assert!(!user_devices_equal(&roster_c, &roster_a));
    }

    #[test]
    fn missing_user_compares_as_empty_set() {
        let (_, device_1) = device_key_pair(1);
        let user_1 = UserId::from_bytes([1; 16]);
        let user_2 = UserId::from_bytes([2; 16]);
        let user_3 = UserId::from_bytes([3; 16]);

        // Users without devices compare equal to absent users, as long as the user count
        // matches.
        let roster_a: UserDevicePublicKeys = HashMap::from([
            (user_1, HashSet::from([device_1])),
            (user_2, HashSet::new()),
        ]);
        let roster_b: UserDevicePublicKeys = HashMap::from([
            (user_1, HashSet::from([device_1])),
            (user_3, HashSet::new()),
        ]);
        assert!(user_devices_equal(&roster_a, &roster_b));

        // A user with devices on one side only does not.
        let roster_c: UserDevicePublicKeys = HashMap::from([
            (user_1, HashSet::from([device_1])),
            (user_3, HashSet::from([device_1])),
        ]);
        assert!(!user_devices_equal(&roster_a, &roster_c));
        assert!(!user_devices_equal(&roster_c, &roster_a));
    }

    #[test]
    fn drop_empty_users_is_idempotent() {
        let (_, device_1) = device_key_pair(1);
        let user_1 = UserId::from_bytes([1; 16]);
        let user_2 = UserId::from_bytes([2; 16]);

        let roster: UserDevicePublicKeys = HashMap::from([
            (user_1, HashSet::from([device_1])),
            (user_2, HashSet::new()),
        ]);

        let kept = drop_empty_users(&roster);
        assert_eq!(kept.len(), 1);
        assert!(kept.contains_key(&user_1));
        assert_eq!(drop_empty_users(&kept), kept);

        // The input is left alone.
        assert_eq!(roster.len(), 2);
    }

    #[test]
    fn merge_disjoint_users() {
        let (_, device_1) = device_key_pair(1);
        let (_, device_2) = device_key_pair(2);
        let user_1 = UserId::from_bytes([1; 16]);
        let user_2 = UserId::from_bytes([2; 16]);

        let halves_a: DeviceServerHalves = HashMap::from([(device_1, ServerHalf::new([1; 32]))]);
        let halves_b: DeviceServerHalves = HashMap::from([(device_2, ServerHalf::new([2; 32]))]);

        let merged = merge_users(
            HashMap::from([(user_1, halves_a.clone())]),
            HashMap::from([(user_2, halves_b.clone())]),
        )
        .unwrap();

        assert_eq!(merged.len(), 2);
        assert_eq!(merged.get(&user_1), Some(&halves_a));
        assert_eq!(merged.get(&user_2), Some(&halves_b));
    }

    #[test]
    fn merge_rejects_overlapping_users() {
        let (_, device_1) = device_key_pair(1);
        let (_, device_2) = device_key_pair(2);
        let user_1 = UserId::from_bytes([1; 16]);

        let halves_a: DeviceServerHalves = HashMap::from([(device_1, ServerHalf::new([1; 32]))]);
        let halves_b: DeviceServerHalves = HashMap::from([(device_2, ServerHalf::new([2; 32]))]);

        let result = merge_users(
            HashMap::from([(user_1, halves_a)]),
            HashMap::from([(user_1, halves_b)]),
        );
        assert_eq!(result.unwrap_err(), MergeError::DuplicateUser { user: user_1 });
    }
}
