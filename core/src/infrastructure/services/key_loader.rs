// /////////////////////////////////////////////////////////////////////////////
// Adaptive Pipeline RS
// Copyright (c) 2025 Michael Gardner, A Bit of Help, Inc.
// SPDX-License-Identifier: BSD-3-Clause
// See LICENSE file in the project root.
// /////////////////////////////////////////////////////////////////////////////

//! Loads a PKCS#8 ECDSA/secp256r1 private key from a file, auto-detecting
//! PEM, base64-wrapped DER, or raw DER. Rejects paths resolving
//! under system-sensitive prefixes, the same canonicalisation approach
//! `core_bootstrap::cli::validator::SecureArgParser` uses for its broader
//! CLI-hygiene check, narrowed here to the key material's own prefix list.

use std::path::Path;

use p256::ecdsa::SigningKey;
use p256::pkcs8::DecodePrivateKey;

use blockchain_core_domain::BlockchainError;

/// Prefixes a key file path may never resolve under, distinct from
/// (and narrower than) `core_bootstrap`'s general `PROTECTED_DIRS` list.
const PROTECTED_PREFIXES: &[&str] = &["/etc", "/bin", "/usr/bin", "/boot", "/proc"];

/// Loads and parses a private key file, returning its PKCS#8 DER bytes.
/// Signing itself stays in `core_domain::services::crypto_service`; this
/// only resolves "a path on disk" down to "DER bytes a `CryptoService`
/// can sign with".
pub fn load_private_key_der(path: &Path) -> Result<Vec<u8>, BlockchainError> {
    let canonical = path
        .canonicalize()
        .map_err(|e| BlockchainError::usage(format!("cannot resolve key path {}: {e}", path.display())))?;

    for prefix in PROTECTED_PREFIXES {
        if canonical.starts_with(prefix) {
            return Err(BlockchainError::usage(format!(
                "refusing to read key material from protected path: {}",
                canonical.display()
            )));
        }
    }

    let raw = std::fs::read(&canonical).map_err(BlockchainError::from)?;
    let der = detect_and_decode(&raw)?;
    reject_non_ec_key(&der)?;
    Ok(der)
}

fn detect_and_decode(raw: &[u8]) -> Result<Vec<u8>, BlockchainError> {
    let text = String::from_utf8_lossy(raw);
    if text.trim_start().starts_with("-----BEGIN") {
        let key = SigningKey::from_pkcs8_pem(&text)
            .map_err(|e| BlockchainError::usage(format!("invalid PEM private key: {e}")))?;
        return Ok(key.to_pkcs8_der().map_err(|e| BlockchainError::usage(e.to_string()))?.as_bytes().to_vec());
    }

    let stripped: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if !stripped.is_empty() && is_base64(&stripped) {
        use base64::Engine;
        if let Ok(decoded) = base64::engine::general_purpose::STANDARD.decode(&stripped) {
            return Ok(decoded);
        }
    }

    Ok(raw.to_vec())
}

fn is_base64(s: &str) -> bool {
    s.chars().all(|c| c.is_ascii_alphanumeric() || c == '+' || c == '/' || c == '=')
}

/// Confirms the DER bytes parse as a PKCS#8 `PrivateKeyInfo` wrapping an
/// ECDSA secp256r1 key, rejecting RSA and other algorithms with a message
/// pointing at the conversion path.
fn reject_non_ec_key(der: &[u8]) -> Result<(), BlockchainError> {
    SigningKey::from_pkcs8_der(der).map(|_| ()).map_err(|e| {
        BlockchainError::usage(format!(
            "unsupported private key format ({e}); only PKCS#8 ECDSA secp256r1 keys are accepted, \
             convert RSA or other key types with the `convert-key` command first"
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use p256::pkcs8::EncodePrivateKey;

    fn sample_der() -> Vec<u8> {
        let signing_key = SigningKey::random(&mut rand::rng());
        signing_key.to_pkcs8_der().unwrap().as_bytes().to_vec()
    }

    #[test]
    fn loads_raw_der_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.der");
        std::fs::write(&path, sample_der()).unwrap();

        let loaded = load_private_key_der(&path).unwrap();
        assert!(SigningKey::from_pkcs8_der(&loaded).is_ok());
    }

    #[test]
    fn loads_pem_file() {
        let signing_key = SigningKey::random(&mut rand::rng());
        let pem = signing_key.to_pkcs8_pem(Default::default()).unwrap();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.pem");
        std::fs::write(&path, pem.as_bytes()).unwrap();

        let loaded = load_private_key_der(&path).unwrap();
        assert!(SigningKey::from_pkcs8_der(&loaded).is_ok());
    }

    #[test]
    fn loads_base64_wrapped_der() {
        use base64::Engine;
        let der = sample_der();
        let encoded = base64::engine::general_purpose::STANDARD.encode(&der);
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("key.b64");
        std::fs::write(&path, encoded).unwrap();

        let loaded = load_private_key_der(&path).unwrap();
        assert_eq!(loaded, der);
    }

    #[test]
    fn rejects_path_under_protected_prefix() {
        let err = load_private_key_der(Path::new("/etc/hostname")).unwrap_err();
        assert!(err.to_string().contains("protected") || err.to_string().contains("resolve"));
    }
}
