// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Secure key vault: password-encrypts a PKCS#8 private key before
//! handing it to [`VaultRepository`] for storage, and reverses that on
//! load. A wrong password or tampered ciphertext surfaces as `INTEGRITY`,
//! never as a silently-wrong key.

use std::sync::Arc;

use rand::RngCore;

use blockchain_core_domain::entities::StoredPrivateKey;
use blockchain_core_domain::repositories::VaultRepository;
use blockchain_core_domain::services::CryptoService;
use blockchain_core_domain::BlockchainError;

const ALGORITHM_TAG: &str = "aes256gcm-pbkdf2-hmac-sha3-256";
const KDF_ITERATIONS: u32 = 210_000;
const SALT_LEN: usize = 16;

pub struct Vault {
    repository: Arc<dyn VaultRepository>,
    crypto: Arc<dyn CryptoService>,
}

impl Vault {
    pub fn new(repository: Arc<dyn VaultRepository>, crypto: Arc<dyn CryptoService>) -> Self {
        Self { repository, crypto }
    }

    /// Encrypts `private_key_der` under `password` and stores it keyed by
    /// `owner`, replacing any prior entry for the same owner.
    pub async fn store(&self, owner: &str, private_key_der: &[u8], password: &str) -> Result<(), BlockchainError> {
        let mut salt = vec![0u8; SALT_LEN];
        rand::rng().fill_bytes(&mut salt);
        let key = self.crypto.derive_key_from_password(password, &salt, KDF_ITERATIONS)?;
        let (ciphertext, nonce) = self.crypto.encrypt(&key, private_key_der)?;

        self.repository
            .store(&StoredPrivateKey {
                owner: owner.to_string(),
                encrypted_private_key: ciphertext,
                kdf_salt: salt,
                kdf_iterations: KDF_ITERATIONS,
                algorithm_tag: ALGORITHM_TAG.to_string(),
                nonce,
            })
            .await
    }

    /// Loads and decrypts `owner`'s private key. A wrong password decrypts
    /// to garbage or fails AES-GCM's tag check; both surface uniformly as
    /// `INTEGRITY`.
    pub async fn load(&self, owner: &str, password: &str) -> Result<Vec<u8>, BlockchainError> {
        let stored = self
            .repository
            .load(owner)
            .await?
            .ok_or_else(|| BlockchainError::not_found(format!("no vault entry for owner {owner}")))?;
        let key = self.crypto.derive_key_from_password(password, &stored.kdf_salt, stored.kdf_iterations)?;
        self.crypto.decrypt(&key, &stored.nonce, &stored.encrypted_private_key)
    }

    pub async fn check(&self, owner: &str) -> Result<bool, BlockchainError> {
        self.repository.exists(owner).await
    }

    pub async fn delete(&self, owner: &str) -> Result<(), BlockchainError> {
        self.repository.delete(owner).await
    }

    pub async fn list(&self) -> Result<Vec<String>, BlockchainError> {
        self.repository.list_owners().await
    }

    /// Verifies `password` unlocks `owner`'s entry without returning the
    /// key material, for a `vault test` command.
    pub async fn test(&self, owner: &str, password: &str) -> Result<bool, BlockchainError> {
        Ok(self.load(owner, password).await.is_ok())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_core_domain::services::Sha3P256CryptoService;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryVaultRepo {
        rows: Mutex<HashMap<String, StoredPrivateKey>>,
    }

    #[async_trait::async_trait]
    impl VaultRepository for InMemoryVaultRepo {
        async fn store(&self, key: &StoredPrivateKey) -> Result<(), BlockchainError> {
            self.rows.lock().unwrap().insert(key.owner.clone(), key.clone());
            Ok(())
        }
        async fn load(&self, owner: &str) -> Result<Option<StoredPrivateKey>, BlockchainError> {
            Ok(self.rows.lock().unwrap().get(owner).cloned())
        }
        async fn exists(&self, owner: &str) -> Result<bool, BlockchainError> {
            Ok(self.rows.lock().unwrap().contains_key(owner))
        }
        async fn delete(&self, owner: &str) -> Result<(), BlockchainError> {
            self.rows.lock().unwrap().remove(owner);
            Ok(())
        }
        async fn list_owners(&self) -> Result<Vec<String>, BlockchainError> {
            let mut owners: Vec<_> = self.rows.lock().unwrap().keys().cloned().collect();
            owners.sort();
            Ok(owners)
        }
    }

    fn vault() -> Vault {
        Vault::new(Arc::new(InMemoryVaultRepo::default()), Arc::new(Sha3P256CryptoService::new()))
    }

    #[tokio::test]
    async fn store_then_load_round_trips_with_correct_password() {
        let vault = vault();
        vault.store("alice", b"private-key-der-bytes", "CorrectHorse9!Battery").await.unwrap();

        let loaded = vault.load("alice", "CorrectHorse9!Battery").await.unwrap();
        assert_eq!(loaded, b"private-key-der-bytes");
    }

    #[tokio::test]
    async fn load_with_wrong_password_fails_as_integrity() {
        let vault = vault();
        vault.store("bob", b"secret-material", "CorrectHorse9!Battery").await.unwrap();

        let err = vault.load("bob", "WrongPassword9!Battery").await.unwrap_err();
        assert_eq!(err.kind().code(), "INTEGRITY");
    }

    #[tokio::test]
    async fn test_reports_password_correctness_without_leaking_key() {
        let vault = vault();
        vault.store("carol", b"material", "CorrectHorse9!Battery").await.unwrap();

        assert!(vault.test("carol", "CorrectHorse9!Battery").await.unwrap());
        assert!(!vault.test("carol", "WrongPassword9!Battery").await.unwrap());
    }

    #[tokio::test]
    async fn delete_and_list_owners() {
        let vault = vault();
        vault.store("alice", b"x", "CorrectHorse9!Battery").await.unwrap();
        vault.store("dave", b"y", "CorrectHorse9!Battery").await.unwrap();

        assert_eq!(vault.list().await.unwrap(), vec!["alice".to_string(), "dave".to_string()]);
        vault.delete("alice").await.unwrap();
        assert!(!vault.check("alice").await.unwrap());
    }
}
