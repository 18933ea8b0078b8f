// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Off-chain blob storage: payloads above [`OffChainStore::threshold`]
//! live as encrypted files under a configured directory instead of inline
//! in the `block` table. Content keys are derived from a process master
//! key plus the content id (`hash(master_key || content_id)`), so the
//! `offchain_record` row only ever carries a key *reference*, never key
//! material.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use tracing::{debug, warn};

use blockchain_core_domain::entities::OffChainRecord;
use blockchain_core_domain::repositories::OffChainRecordRepository;
use blockchain_core_domain::services::CryptoService;
use blockchain_core_domain::value_objects::{Hash32, Timestamp};
use blockchain_core_domain::BlockchainError;

/// Payloads larger than this many bytes are stored off-chain.
pub const DEFAULT_OFF_CHAIN_THRESHOLD: u64 = 524_288;

/// Identifies which key-derivation scheme produced an `OffChainRecord`'s
/// content key; stored verbatim as `encryption_key_ref`.
const KEY_REF: &str = "master-derived:v1";

pub struct OffChainStore {
    dir: PathBuf,
    threshold: u64,
    master_key: [u8; 32],
    crypto: Arc<dyn CryptoService>,
    repository: Arc<dyn OffChainRecordRepository>,
}

impl OffChainStore {
    pub fn new(
        dir: PathBuf,
        threshold: u64,
        master_key: [u8; 32],
        crypto: Arc<dyn CryptoService>,
        repository: Arc<dyn OffChainRecordRepository>,
    ) -> Self {
        Self { dir, threshold, master_key, crypto, repository }
    }

    pub fn should_store_off_chain(&self, len: u64) -> bool {
        len > self.threshold
    }

    fn content_key(&self, content_id: Hash32) -> [u8; 32] {
        let mut buf = Vec::with_capacity(32 + 32);
        buf.extend_from_slice(&self.master_key);
        buf.extend_from_slice(content_id.as_bytes());
        *self.crypto.hash(&buf).as_bytes()
    }

    fn file_path(&self, content_id: Hash32, now_nanos: u128) -> PathBuf {
        let prefix = &content_id.to_hex()[..16];
        self.dir.join(format!("offchain_{now_nanos}_{prefix}.dat"))
    }

    /// Stores `plaintext` off-chain, deduplicating on `contentId`. Returns the content id and, when a new record was
    /// written, the [`OffChainRecord`] to persist in the same
    /// unit-of-work as the owning block.
    pub async fn write(&self, plaintext: &[u8]) -> Result<(Hash32, Option<OffChainRecord>), BlockchainError> {
        let content_id = self.crypto.hash(plaintext);

        if let Some(existing) = self.repository.find_by_content_id(content_id).await? {
            if self.verify_roundtrip(&existing, plaintext).await.is_ok() {
                debug!(content_id = %content_id, "off-chain content deduplicated");
                return Ok((content_id, None));
            }
            warn!(content_id = %content_id, "existing off-chain record failed verification, rewriting");
        }

        let key = self.content_key(content_id);
        let (ciphertext, nonce) = self.crypto.encrypt(&key, plaintext)?;

        let now_nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
        let path = self.file_path(content_id, now_nanos);

        std::fs::create_dir_all(&self.dir).map_err(BlockchainError::from)?;
        write_new_file_0600(&path, &ciphertext)?;

        let record = OffChainRecord {
            content_id,
            cipher_path: path.to_string_lossy().into_owned(),
            nonce,
            cleartext_size: plaintext.len() as u64,
            cipher_size: ciphertext.len() as u64,
            encryption_key_ref: KEY_REF.to_string(),
            created_at: Timestamp::from(chrono::Utc::now()),
        };
        Ok((content_id, Some(record)))
    }

    /// Reads and decrypts the content behind `content_id`. Verifies the decrypted plaintext hashes back to
    /// `content_id`; mismatch is `INTEGRITY`.
    pub async fn read(&self, content_id: Hash32) -> Result<Vec<u8>, BlockchainError> {
        let record = self
            .repository
            .find_by_content_id(content_id)
            .await?
            .ok_or_else(|| BlockchainError::not_found(format!("off-chain record {content_id} not found")))?;
        let plaintext = self.decrypt_file(&record).await?;
        self.verify_roundtrip(&record, &plaintext).await?;
        Ok(plaintext)
    }

    async fn decrypt_file(&self, record: &OffChainRecord) -> Result<Vec<u8>, BlockchainError> {
        let ciphertext = std::fs::read(&record.cipher_path).map_err(BlockchainError::from)?;
        let key = self.content_key(record.content_id);
        self.crypto.decrypt(&key, &record.nonce, &ciphertext)
    }

    async fn verify_roundtrip(&self, record: &OffChainRecord, plaintext: &[u8]) -> Result<(), BlockchainError> {
        if self.crypto.hash(plaintext) != record.content_id {
            return Err(BlockchainError::integrity(format!(
                "off-chain content {} failed hash verification",
                record.content_id
            )));
        }
        Ok(())
    }

    /// Deletes one off-chain record's row and file by content id. Used to
    /// compensate a write whose owning block subsequently failed to save.
    pub async fn delete(&self, content_id: Hash32) -> Result<(), BlockchainError> {
        if let Some(record) = self.repository.find_by_content_id(content_id).await? {
            if let Err(e) = std::fs::remove_file(&record.cipher_path) {
                warn!(path = %record.cipher_path, error = %e, "failed to remove off-chain file during compensating delete");
            }
            self.repository.delete(content_id).await?;
        }
        Ok(())
    }

    /// Deletes every `OffChainRecord` (row and file) not present in
    /// `referenced`.
    /// File-deletion errors are logged, not propagated, matching the
    /// spec's "errors are logged but do not fail the rollback" rule.
    pub async fn collect_garbage(&self, referenced: &[Hash32]) -> Result<u64, BlockchainError> {
        let orphaned = self.repository.list_unreferenced(referenced).await?;
        let mut removed = 0;
        for record in orphaned {
            if let Err(e) = std::fs::remove_file(&record.cipher_path) {
                warn!(path = %record.cipher_path, error = %e, "failed to remove orphaned off-chain file");
            }
            self.repository.delete(record.content_id).await?;
            removed += 1;
        }
        Ok(removed)
    }
}

#[cfg(unix)]
fn write_new_file_0600(path: &Path, contents: &[u8]) -> Result<(), BlockchainError> {
    use std::fs::OpenOptions;
    use std::io::Write;
    use std::os::unix::fs::OpenOptionsExt;

    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .mode(0o600)
        .open(path)
        .map_err(BlockchainError::from)?;
    file.write_all(contents).map_err(BlockchainError::from)
}

#[cfg(not(unix))]
fn write_new_file_0600(path: &Path, contents: &[u8]) -> Result<(), BlockchainError> {
    std::fs::write(path, contents).map_err(BlockchainError::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use blockchain_core_domain::services::Sha3P256CryptoService;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct InMemoryOffChainRepo {
        rows: Mutex<HashMap<Hash32, OffChainRecord>>,
    }

    #[async_trait::async_trait]
    impl OffChainRecordRepository for InMemoryOffChainRepo {
        async fn save(&self, record: &OffChainRecord) -> Result<(), BlockchainError> {
            self.rows.lock().unwrap().insert(record.content_id, record.clone());
            Ok(())
        }
        async fn find_by_content_id(&self, content_id: Hash32) -> Result<Option<OffChainRecord>, BlockchainError> {
            Ok(self.rows.lock().unwrap().get(&content_id).cloned())
        }
        async fn list_unreferenced(&self, referenced: &[Hash32]) -> Result<Vec<OffChainRecord>, BlockchainError> {
            Ok(self.rows.lock().unwrap().values().filter(|r| !referenced.contains(&r.content_id)).cloned().collect())
        }
        async fn delete(&self, content_id: Hash32) -> Result<(), BlockchainError> {
            self.rows.lock().unwrap().remove(&content_id);
            Ok(())
        }
    }

    fn store(dir: &Path) -> OffChainStore {
        OffChainStore::new(
            dir.to_path_buf(),
            DEFAULT_OFF_CHAIN_THRESHOLD,
            [9u8; 32],
            Arc::new(Sha3P256CryptoService::new()),
            Arc::new(InMemoryOffChainRepo::default()),
        )
    }

    #[tokio::test]
    async fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let (content_id, record) = store.write(b"big payload").await.unwrap();
        let record = record.unwrap();
        store.repository.save(&record).await.unwrap();

        let read_back = store.read(content_id).await.unwrap();
        assert_eq!(read_back, b"big payload");
    }

    #[tokio::test]
    async fn write_deduplicates_identical_content() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let (_, first) = store.write(b"same content").await.unwrap();
        store.repository.save(&first.unwrap()).await.unwrap();

        let (_, second) = store.write(b"same content").await.unwrap();
        assert!(second.is_none());
    }

    #[tokio::test]
    async fn garbage_collection_removes_unreferenced_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store(dir.path());

        let (content_id, record) = store.write(b"orphan").await.unwrap();
        store.repository.save(&record.unwrap()).await.unwrap();

        let removed = store.collect_garbage(&[]).await.unwrap();
        assert_eq!(removed, 1);
        assert!(store.repository.find_by_content_id(content_id).await.unwrap().is_none());
    }
}
