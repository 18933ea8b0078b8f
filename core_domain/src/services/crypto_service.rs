// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! # Crypto Service
//!
//! Implements the cryptographic primitives: hashing, ECDSA
//! signing/verification over NIST P-256, signer fingerprints, AES-256-GCM
//! encryption, and password-based key derivation.
//!
//! All operations here are synchronous and CPU-bound; there is nothing in
//! this module that benefits from `async`. The `core` crate's
//! infrastructure layer calls these from worker-pool tasks when batching
//! is useful.
//!
//! ## Algorithm choices
//!
//! - Hashing: SHA3-256 everywhere a content digest or fingerprint is
//!   needed.
//! - Signing: ECDSA over NIST P-256 (secp256r1), DER-encoded signatures.
//! - Symmetric encryption: AES-256-GCM. CBC was considered and rejected;
//!   GCM gives authenticated encryption in one primitive.
//! - Key derivation: PBKDF2-HMAC-SHA3-256, minimum 100,000 iterations.

use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::{Aes256Gcm, Nonce};
use ecdsa::signature::{Signer, Verifier};
use hmac::Hmac;
use p256::ecdsa::{Signature, SigningKey, VerifyingKey};
use p256::pkcs8::DecodePrivateKey;
use sha3::{Digest, Sha3_256};

use crate::error::BlockchainError;
use crate::value_objects::{Hash32, PublicKeyBytes, SignatureBytes};

/// Minimum PBKDF2 iteration count accepted by [`CryptoService::derive_key_from_password`].
pub const MIN_KDF_ITERATIONS: u32 = 100_000;
/// Minimum vault/signing password length.
pub const MIN_PASSWORD_LEN: usize = 12;

/// Port for the cryptographic primitives. A trait, rather than free
/// functions, so tests can substitute a deterministic stub signer
/// without touching real key material.
pub trait CryptoService: Send + Sync {
    /// SHA3-256 digest of `data`.
    fn hash(&self, data: &[u8]) -> Hash32;

    /// Signs `message` with a PKCS#8 DER-encoded P-256 private key,
    /// returning a DER-encoded ECDSA signature.
    fn sign(&self, private_key_der: &[u8], message: &[u8]) -> Result<SignatureBytes, BlockchainError>;

    /// Verifies `signature` over `message` against a SEC1 public key.
    /// Returns `Ok(())` on success; `Err(BlockchainError::Integrity)`
    /// carrying `INVALID_SIGNATURE` semantics otherwise.
    fn verify(
        &self,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<(), BlockchainError>;

    /// SHA3-256 of the raw SEC1 public key bytes; the signer fingerprint
    /// used throughout blocks and keys.
    fn fingerprint(&self, public_key: &PublicKeyBytes) -> Hash32;

    /// Encrypts `plaintext` under `key` (32 bytes) with a freshly
    /// generated 12-byte nonce, returning `(ciphertext, nonce)`.
    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 12]), BlockchainError>;

    /// Decrypts `ciphertext` under `key` and `nonce`.
    fn decrypt(&self, key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, BlockchainError>;

    /// Derives a 32-byte symmetric key from `password` using PBKDF2-HMAC-SHA3-256.
    /// Rejects passwords shorter than [`MIN_PASSWORD_LEN`] or failing the
    /// character-class policy, and iteration counts below
    /// [`MIN_KDF_ITERATIONS`], both as `WEAK_PASSWORD`/`INVALID_KEY` usage
    /// errors.
    fn derive_key_from_password(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<[u8; 32], BlockchainError>;
}

/// Default [`CryptoService`] implementation backed by `p256`, `sha3`,
/// `aes-gcm`, and `pbkdf2`.
#[derive(Debug, Default, Clone, Copy)]
pub struct Sha3P256CryptoService;

impl Sha3P256CryptoService {
    pub fn new() -> Self {
        Self
    }
}

impl CryptoService for Sha3P256CryptoService {
    fn hash(&self, data: &[u8]) -> Hash32 {
        let mut hasher = Sha3_256::new();
        hasher.update(data);
        let digest: [u8; 32] = hasher.finalize().into();
        Hash32::from_bytes(digest)
    }

    fn sign(&self, private_key_der: &[u8], message: &[u8]) -> Result<SignatureBytes, BlockchainError> {
        let signing_key = SigningKey::from_pkcs8_der(private_key_der)
            .map_err(|e| BlockchainError::usage(format!("invalid private key: {e}")))?;
        let signature: Signature = signing_key.sign(message);
        Ok(SignatureBytes::new(signature.to_der().as_bytes().to_vec()))
    }

    fn verify(
        &self,
        public_key: &PublicKeyBytes,
        message: &[u8],
        signature: &SignatureBytes,
    ) -> Result<(), BlockchainError> {
        let verifying_key = VerifyingKey::from_sec1_bytes(public_key.as_slice())
            .map_err(|e| BlockchainError::auth(format!("invalid public key: {e}")))?;
        let sig = Signature::from_der(signature.as_slice())
            .map_err(|_| BlockchainError::integrity("malformed signature encoding"))?;
        verifying_key
            .verify(message, &sig)
            .map_err(|_| BlockchainError::integrity("signature verification failed"))
    }

    fn fingerprint(&self, public_key: &PublicKeyBytes) -> Hash32 {
        self.hash(public_key.as_slice())
    }

    fn encrypt(&self, key: &[u8; 32], plaintext: &[u8]) -> Result<(Vec<u8>, [u8; 12]), BlockchainError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| BlockchainError::usage(format!("invalid aes key: {e}")))?;
        let nonce_bytes: [u8; 12] = rand::random();
        let nonce = Nonce::from_slice(&nonce_bytes);
        let ciphertext = cipher
            .encrypt(nonce, Payload { msg: plaintext, aad: &[] })
            .map_err(|_| BlockchainError::integrity("encryption failed"))?;
        Ok((ciphertext, nonce_bytes))
    }

    fn decrypt(&self, key: &[u8; 32], nonce: &[u8; 12], ciphertext: &[u8]) -> Result<Vec<u8>, BlockchainError> {
        let cipher = Aes256Gcm::new_from_slice(key)
            .map_err(|e| BlockchainError::usage(format!("invalid aes key: {e}")))?;
        let nonce = Nonce::from_slice(nonce);
        cipher
            .decrypt(nonce, Payload { msg: ciphertext, aad: &[] })
            .map_err(|_| BlockchainError::integrity("decryption failed: wrong key or corrupted data"))
    }

    fn derive_key_from_password(
        &self,
        password: &str,
        salt: &[u8],
        iterations: u32,
    ) -> Result<[u8; 32], BlockchainError> {
        validate_password_policy(password)?;
        if iterations < MIN_KDF_ITERATIONS {
            return Err(BlockchainError::usage(format!(
                "kdf iterations {iterations} below minimum {MIN_KDF_ITERATIONS}"
            )));
        }
        let mut key = [0u8; 32];
        pbkdf2::pbkdf2::<Hmac<Sha3_256>>(password.as_bytes(), salt, iterations, &mut key)
            .map_err(|e| BlockchainError::config(format!("key derivation failed: {e}")))?;
        Ok(key)
    }
}

/// Enforces the password policy: at least [`MIN_PASSWORD_LEN`]
/// characters, spanning at least three of {lowercase, uppercase, digit,
/// symbol}.
fn validate_password_policy(password: &str) -> Result<(), BlockchainError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(BlockchainError::usage(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_symbol = password.chars().any(|c| !c.is_ascii_alphanumeric());
    let classes_met = [has_lower, has_upper, has_digit, has_symbol]
        .iter()
        .filter(|&&met| met)
        .count();
    if classes_met < 3 {
        return Err(BlockchainError::usage(
            "password must contain at least three of: lowercase, uppercase, digit, symbol",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePrivateKey;

    fn service() -> Sha3P256CryptoService {
        Sha3P256CryptoService::new()
    }

    fn keypair() -> (Vec<u8>, PublicKeyBytes) {
        let signing_key = SigningKey::random(&mut rand::rng());
        let private_der = signing_key.to_pkcs8_der().unwrap().as_bytes().to_vec();
        let verifying_key = VerifyingKey::from(&signing_key);
        let public = PublicKeyBytes::new(verifying_key.to_sec1_bytes().to_vec());
        (private_der, public)
    }

    #[test]
    fn hash_is_deterministic_and_32_bytes() {
        let svc = service();
        let h1 = svc.hash(b"hello");
        let h2 = svc.hash(b"hello");
        assert_eq!(h1, h2);
        assert_eq!(h1.as_bytes().len(), 32);
    }

    #[test]
    fn sign_then_verify_round_trips() {
        let svc = service();
        let (private_der, public) = keypair();
        let message = b"block signing tuple";
        let signature = svc.sign(&private_der, message).unwrap();
        svc.verify(&public, message, &signature).unwrap();
    }

    #[test]
    fn verify_rejects_tampered_message() {
        let svc = service();
        let (private_der, public) = keypair();
        let signature = svc.sign(&private_der, b"original").unwrap();
        let result = svc.verify(&public, b"tampered", &signature);
        assert!(result.is_err());
    }

    #[test]
    fn fingerprint_matches_hash_of_public_key() {
        let svc = service();
        let (_, public) = keypair();
        assert_eq!(svc.fingerprint(&public), svc.hash(public.as_slice()));
    }

    #[test]
    fn encrypt_then_decrypt_round_trips() {
        let svc = service();
        let key = [7u8; 32];
        let (ciphertext, nonce) = svc.encrypt(&key, b"off-chain payload").unwrap();
        let plaintext = svc.decrypt(&key, &nonce, &ciphertext).unwrap();
        assert_eq!(plaintext, b"off-chain payload");
    }

    #[test]
    fn decrypt_with_wrong_key_fails() {
        let svc = service();
        let (ciphertext, nonce) = svc.encrypt(&[1u8; 32], b"secret").unwrap();
        assert!(svc.decrypt(&[2u8; 32], &nonce, &ciphertext).is_err());
    }

    #[test]
    fn derive_key_from_password_rejects_short_passwords() {
        let svc = service();
        let err = svc
            .derive_key_from_password("Aa1!Aa1!", b"salt", MIN_KDF_ITERATIONS)
            .unwrap_err();
        assert_eq!(err.kind().code(), "USAGE");
    }

    #[test]
    fn derive_key_from_password_rejects_low_iteration_counts() {
        let svc = service();
        let err = svc
            .derive_key_from_password("CorrectHorse9!Battery", b"salt", 1_000)
            .unwrap_err();
        assert_eq!(err.kind().code(), "USAGE");
    }

    #[test]
    fn derive_key_from_password_succeeds_for_strong_password() {
        let svc = service();
        let key = svc
            .derive_key_from_password("CorrectHorse9!Battery", b"salt", MIN_KDF_ITERATIONS)
            .unwrap();
        assert_eq!(key.len(), 32);
    }
}
