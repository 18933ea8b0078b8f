// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! A registered signing identity. Revocation is the only mutation
//! allowed; a key is never deleted while any block references it.

use serde::{Deserialize, Serialize};

use crate::value_objects::{Hash32, KeyType, PublicKeyBytes, Timestamp};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthorisedKey {
    pub fingerprint: Hash32,
    pub owner: String,
    pub public_key: PublicKeyBytes,
    pub key_type: KeyType,
    pub parent_fingerprint: Option<Hash32>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub revoked_at: Option<Timestamp>,
}

impl AuthorisedKey {
    /// A key is active at `at` iff `createdAt <= at < (revokedAt or ∞)`
    /// and `at < (expiresAt or ∞)`.
    pub fn is_active_at(&self, at: Timestamp) -> bool {
        if at < self.created_at {
            return false;
        }
        if let Some(revoked) = self.revoked_at {
            if at >= revoked {
                return false;
            }
        }
        if let Some(expires) = self.expires_at {
            if at >= expires {
                return false;
            }
        }
        true
    }

    pub fn is_revoked(&self) -> bool {
        self.revoked_at.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key(created: i64, expires: Option<i64>, revoked: Option<i64>) -> AuthorisedKey {
        AuthorisedKey {
            fingerprint: Hash32::ZERO,
            owner: "Alice".to_string(),
            public_key: PublicKeyBytes::new(vec![4, 1, 2, 3]),
            key_type: KeyType::Root,
            parent_fingerprint: None,
            created_at: Timestamp::from_millis(created),
            expires_at: expires.map(Timestamp::from_millis),
            revoked_at: revoked.map(Timestamp::from_millis),
        }
    }

    #[test]
    fn active_window_respects_created_expires_revoked() {
        let k = key(100, Some(200), None);
        assert!(!k.is_active_at(Timestamp::from_millis(50)));
        assert!(k.is_active_at(Timestamp::from_millis(150)));
        assert!(!k.is_active_at(Timestamp::from_millis(200)));
    }

    #[test]
    fn revocation_ends_active_window_at_revocation_instant() {
        let k = key(100, None, Some(150));
        assert!(k.is_active_at(Timestamp::from_millis(149)));
        assert!(!k.is_active_at(Timestamp::from_millis(150)));
        assert!(k.is_revoked());
    }

    #[test]
    fn indefinite_key_with_no_bounds_is_always_active_after_creation() {
        let k = key(100, None, None);
        assert!(k.is_active_at(Timestamp::from_millis(i64::MAX)));
    }
}
