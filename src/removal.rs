// SPDX-License-Identifier: MIT OR Apache-2.0

//! Bookkeeping of server halves to delete after devices or users were removed from a folder.
//!
//! Removing a device (or a whole user) from a folder rotates the folder key, but the removed
//! device still has server halves stored at the server, one per key generation it lived through.
//! Those halves are dead weight at best and a recovery risk at worst, so the server is told to
//! delete them.
//!
//! The revocation logic walks the folder's key generations oldest-first and produces one
//! [`RemovalInfo`] record per generation, naming exactly one [`ServerHalfId`] per removed
//! device. [`add_generation`] folds these records into an accumulated history in which every
//! device carries its ids in generation order. The fold insists on strict structural agreement
//! between history and generation (same users, same flags, same devices, rectangular id lists):
//! any disagreement means the per-generation records were computed against diverging rosters,
//! which is a protocol-invariant violation and not recoverable here.
use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::device_keys::DevicePublicKey;
use crate::folder_key::ServerHalfId;
use crate::identity::UserId;

/// Server-half ids to delete for each removed device, in generation order (oldest first).
pub type DeviceRemovalIds = HashMap<DevicePublicKey, Vec<ServerHalfId>>;

/// Removal record of one user.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRemovalInfo {
    /// True when the user was evicted from the folder entirely, false when only some of their
    /// devices were pruned.
    pub user_removed: bool,

    /// Ids of the server halves to delete, per removed device.
    pub device_removal_ids: DeviceRemovalIds,
}

/// Accumulated removal records of all affected users, across all processed key generations.
///
/// This is the instruction set eventually handed to the server's deletion protocol.
pub type RemovalInfo = HashMap<UserId, UserRemovalInfo>;

/// Folds one key generation's removal record into the accumulated history.
///
/// Generations must be folded oldest first; each device's id list grows by exactly one entry per
/// fold. The generation must describe the same removed users and devices as the history, with
/// matching `user_removed` flags and exactly one id per device.
///
/// The whole generation is validated before any id is appended: on error the history is left
/// untouched, so a failed fold can be inspected without discarding the accumulated state.
pub fn add_generation(
    history: &mut RemovalInfo,
    generation: &RemovalInfo,
) -> Result<(), RemovalError> {
    if history.len() != generation.len() {
        return Err(RemovalError::UserCountMismatch {
            expected: history.len(),
            actual: generation.len(),
        });
    }

    for (user, user_generation) in generation {
        let user_history = history
            .get(user)
            .ok_or(RemovalError::UnknownUser { user: *user })?;
        validate_user_generation(*user, user_history, user_generation)?;
    }

    for (user, user_generation) in generation {
        let user_history = history.get_mut(user).expect("user validated above");
        for (device, ids) in &user_generation.device_removal_ids {
            user_history
                .device_removal_ids
                .get_mut(device)
                .expect("device validated above")
                .push(ids[0]);
        }
    }

    Ok(())
}

fn validate_user_generation(
    user: UserId,
    history: &UserRemovalInfo,
    generation: &UserRemovalInfo,
) -> Result<(), RemovalError> {
    if history.user_removed != generation.user_removed {
        return Err(RemovalError::RemovedFlagMismatch {
            user,
            history: history.user_removed,
            generation: generation.user_removed,
        });
    }

    if history.device_removal_ids.len() != generation.device_removal_ids.len() {
        return Err(RemovalError::DeviceCountMismatch {
            user,
            history: history.device_removal_ids.len(),
            generation: generation.device_removal_ids.len(),
        });
    }

    // Before the fold all of the user's accumulated lists must share one length, otherwise the
    // history would turn non-rectangular.
    let mut accumulated_count: Option<usize> = None;
    for (device, ids) in &generation.device_removal_ids {
        if ids.len() != 1 {
            return Err(RemovalError::GenerationIdCount {
                user,
                device: *device,
                count: ids.len(),
            });
        }

        let accumulated = history.device_removal_ids.get(device).ok_or(
            RemovalError::UnknownDevice {
                user,
                device: *device,
            },
        )?;

        match accumulated_count {
            None => accumulated_count = Some(accumulated.len()),
            Some(expected) if accumulated.len() != expected => {
                return Err(RemovalError::RaggedHistory {
                    user,
                    device: *device,
                    expected,
                    actual: accumulated.len(),
                });
            }
            Some(_) => {}
        }
    }

    Ok(())
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RemovalError {
    /// History and generation disagree on the number of removed users.
    #[error("removal history covers {expected} users, generation covers {actual}")]
    UserCountMismatch { expected: usize, actual: usize },

    /// A generation names a user the history has never seen.
    #[error("no removal history for user {user}")]
    UnknownUser { user: UserId },

    /// History and generation disagree on whether the user was fully evicted.
    #[error(
        "user_removed is {history} in history but {generation} in generation for user {user}"
    )]
    RemovedFlagMismatch {
        user: UserId,
        history: bool,
        generation: bool,
    },

    /// History and generation disagree on the number of removed devices of a user.
    #[error("history covers {history} devices, generation covers {generation} for user {user}")]
    DeviceCountMismatch {
        user: UserId,
        history: usize,
        generation: usize,
    },

    /// A single generation must contribute exactly one id per device.
    #[error("expected exactly one server half id, got {count} for user {user} and device {device}")]
    GenerationIdCount {
        user: UserId,
        device: DevicePublicKey,
        count: usize,
    },

    /// A generation names a device the history has never seen.
    #[error("no removal history for user {user} and device {device}")]
    UnknownDevice {
        user: UserId,
        device: DevicePublicKey,
    },

    /// The accumulated id lists of a user have diverging lengths.
    #[error("expected {expected} accumulated ids, got {actual} for user {user} and device {device}")]
    RaggedHistory {
        user: UserId,
        device: DevicePublicKey,
        expected: usize,
        actual: usize,
    },
}
