//! Cryptographic utilities for the detection vault
//!
//! Provides the AES-256-GCM envelopes used for encrypted detection-event
//! originals and anonymous identity mappings. Every envelope produced by a
//! [`KeyRing`] carries a leading key-version byte so that keys can rotate
//! without re-encrypting rows already at rest.

use crate::error::{Error, Result};
use aes_gcm::{
    aead::{Aead, KeyInit},
    Aes256Gcm, Nonce,
};
use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};
use base64::Engine;
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use zeroize::{Zeroize, ZeroizeOnDrop};

/// AES-256-GCM encryption key size
pub const KEY_SIZE: usize = 32;

/// Nonce size for AES-GCM
pub const NONCE_SIZE: usize = 12;

/// Byte length of an anonymous-identity token before encoding
const TOKEN_SIZE: usize = 32;

/// AES-256-GCM key material, zeroized on drop.
#[derive(Clone, Zeroize, ZeroizeOnDrop)]
pub struct MasterKey([u8; KEY_SIZE]);

impl MasterKey {
    /// Generate a fresh random key
    pub fn generate() -> Self {
        let mut key = [0u8; KEY_SIZE];
        OsRng.fill_bytes(&mut key);
        Self(key)
    }

    /// Parse a key from its base64 encoding (standard alphabet, 32 bytes)
    pub fn from_base64(encoded: &str) -> Result<Self> {
        let bytes = STANDARD
            .decode(encoded.trim())
            .map_err(|e| Error::Config(format!("Master key is not valid base64: {}", e)))?;
        if bytes.len() != KEY_SIZE {
            return Err(Error::Config(format!(
                "Master key must be {} bytes, got {}",
                KEY_SIZE,
                bytes.len()
            )));
        }
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&bytes);
        Ok(Self(key))
    }

    /// Derive a deterministic key from a label. Development fallback only;
    /// anyone holding the label can reproduce the key.
    pub fn derive_insecure(label: &str) -> Self {
        let digest = Sha256::digest(label.as_bytes());
        let mut key = [0u8; KEY_SIZE];
        key.copy_from_slice(&digest);
        Self(key)
    }

    /// Raw key bytes
    pub fn as_bytes(&self) -> &[u8; KEY_SIZE] {
        &self.0
    }

    /// Short SHA-256 fingerprint, safe for log lines
    pub fn fingerprint(&self) -> String {
        let digest = Sha256::digest(self.0);
        digest[..4].iter().map(|b| format!("{:02x}", b)).collect()
    }
}

/// Encrypt data using AES-256-GCM
///
/// The random nonce is prepended to the ciphertext.
pub fn encrypt(key: &[u8; KEY_SIZE], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Crypto(format!("Failed to create cipher: {}", e)))?;

    let mut nonce_bytes = [0u8; NONCE_SIZE];
    rand::thread_rng().fill_bytes(&mut nonce_bytes);
    let nonce = Nonce::from_slice(&nonce_bytes);

    let ciphertext = cipher
        .encrypt(nonce, plaintext)
        .map_err(|e| Error::Crypto(format!("Encryption failed: {}", e)))?;

    let mut result = Vec::with_capacity(NONCE_SIZE + ciphertext.len());
    result.extend_from_slice(&nonce_bytes);
    result.extend_from_slice(&ciphertext);

    Ok(result)
}

/// Decrypt data using AES-256-GCM
pub fn decrypt(key: &[u8; KEY_SIZE], ciphertext: &[u8]) -> Result<Vec<u8>> {
    if ciphertext.len() < NONCE_SIZE {
        return Err(Error::Crypto("Ciphertext too short".to_string()));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| Error::Crypto(format!("Failed to create cipher: {}", e)))?;

    let nonce = Nonce::from_slice(&ciphertext[..NONCE_SIZE]);
    let encrypted = &ciphertext[NONCE_SIZE..];

    cipher
        .decrypt(nonce, encrypted)
        .map_err(|e| Error::Crypto(format!("Decryption failed: {}", e)))
}

/// Versioned key set for the detection vault.
///
/// Sealing always uses the active key; opening selects the key named by the
/// envelope's version byte, so older envelopes stay readable after rotation.
pub struct KeyRing {
    active_version: u8,
    keys: HashMap<u8, MasterKey>,
}

impl KeyRing {
    /// Create a ring with a single active key
    pub fn new(active_version: u8, key: MasterKey) -> Self {
        let mut keys = HashMap::new();
        keys.insert(active_version, key);
        Self {
            active_version,
            keys,
        }
    }

    /// Add a retired key kept for decryption only
    pub fn with_previous(mut self, version: u8, key: MasterKey) -> Result<Self> {
        if self.keys.contains_key(&version) {
            return Err(Error::Config(format!(
                "Duplicate key version {} in key ring",
                version
            )));
        }
        self.keys.insert(version, key);
        Ok(self)
    }

    /// Version of the key used for new envelopes
    pub fn active_version(&self) -> u8 {
        self.active_version
    }

    /// Fingerprint of the active key, for startup logging
    pub fn active_fingerprint(&self) -> String {
        self.keys[&self.active_version].fingerprint()
    }

    /// Encrypt with the active key, producing `[version][nonce][ciphertext]`
    pub fn seal(&self, plaintext: &[u8]) -> Result<Vec<u8>> {
        let key = &self.keys[&self.active_version];
        let sealed = encrypt(key.as_bytes(), plaintext)?;
        let mut envelope = Vec::with_capacity(1 + sealed.len());
        envelope.push(self.active_version);
        envelope.extend_from_slice(&sealed);
        Ok(envelope)
    }

    /// Decrypt an envelope, selecting the key by its version byte
    pub fn open(&self, envelope: &[u8]) -> Result<Vec<u8>> {
        if envelope.len() < 1 + NONCE_SIZE {
            return Err(Error::Crypto("Envelope too short".to_string()));
        }
        let version = envelope[0];
        let key = self
            .keys
            .get(&version)
            .ok_or_else(|| Error::Crypto(format!("No key for envelope version {}", version)))?;
        decrypt(key.as_bytes(), &envelope[1..])
    }

    /// Seal and render as standard base64 for storage in a text column
    pub fn seal_to_string(&self, plaintext: &[u8]) -> Result<String> {
        Ok(STANDARD.encode(self.seal(plaintext)?))
    }

    /// Open an envelope stored as base64
    pub fn open_from_string(&self, encoded: &str) -> Result<Vec<u8>> {
        let envelope = STANDARD
            .decode(encoded)
            .map_err(|e| Error::Crypto(format!("Envelope is not valid base64: {}", e)))?;
        self.open(&envelope)
    }
}

/// URL-safe random token for anonymous identities
pub fn random_token() -> String {
    let mut bytes = [0u8; TOKEN_SIZE];
    OsRng.fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_encrypt_decrypt() {
        let key = MasterKey::generate();
        let plaintext = b"jane.doe@example.com";

        let ciphertext = encrypt(key.as_bytes(), plaintext).unwrap();
        let decrypted = decrypt(key.as_bytes(), &ciphertext).unwrap();

        assert_eq!(plaintext.as_slice(), decrypted.as_slice());
    }

    #[test]
    fn test_decrypt_wrong_key() {
        let key1 = MasterKey::generate();
        let key2 = MasterKey::generate();
        let plaintext = b"555-123-4567";

        let ciphertext = encrypt(key1.as_bytes(), plaintext).unwrap();
        let result = decrypt(key2.as_bytes(), &ciphertext);

        assert!(result.is_err());
    }

    #[test]
    fn test_keyring_roundtrip() {
        let ring = KeyRing::new(1, MasterKey::generate());
        let envelope = ring.seal(b"original value").unwrap();

        assert_eq!(envelope[0], 1);
        assert_eq!(ring.open(&envelope).unwrap(), b"original value");
    }

    #[test]
    fn test_keyring_rotation_reads_old_envelopes() {
        let old_key = MasterKey::generate();
        let old_ring = KeyRing::new(1, old_key.clone());
        let old_envelope = old_ring.seal(b"sealed before rotation").unwrap();

        let rotated = KeyRing::new(2, MasterKey::generate())
            .with_previous(1, old_key)
            .unwrap();

        assert_eq!(rotated.open(&old_envelope).unwrap(), b"sealed before rotation");
        let fresh = rotated.seal(b"sealed after rotation").unwrap();
        assert_eq!(fresh[0], 2);
    }

    #[test]
    fn test_keyring_unknown_version() {
        let ring = KeyRing::new(1, MasterKey::generate());
        let other = KeyRing::new(7, MasterKey::generate());

        let envelope = other.seal(b"data").unwrap();
        let err = ring.open(&envelope).unwrap_err();
        assert!(err.to_string().contains("version 7"));
    }

    #[test]
    fn test_keyring_rejects_duplicate_version() {
        let result = KeyRing::new(1, MasterKey::generate())
            .with_previous(1, MasterKey::generate());
        assert!(result.is_err());
    }

    #[test]
    fn test_envelope_too_short() {
        let ring = KeyRing::new(1, MasterKey::generate());
        assert!(ring.open(&[1, 2, 3]).is_err());
    }

    #[test]
    fn test_seal_to_string_roundtrip() {
        let ring = KeyRing::new(3, MasterKey::generate());
        let encoded = ring.seal_to_string(b"123-45-6789").unwrap();
        assert_eq!(ring.open_from_string(&encoded).unwrap(), b"123-45-6789");
    }

    #[test]
    fn test_master_key_base64_roundtrip() {
        let key = MasterKey::generate();
        let encoded = STANDARD.encode(key.as_bytes());
        let parsed = MasterKey::from_base64(&encoded).unwrap();
        assert_eq!(parsed.as_bytes(), key.as_bytes());
    }

    #[test]
    fn test_master_key_rejects_bad_input() {
        assert!(MasterKey::from_base64("not base64!!").is_err());
        assert!(MasterKey::from_base64(&STANDARD.encode([0u8; 16])).is_err());
    }

    #[test]
    fn test_derive_insecure_is_deterministic() {
        let a = MasterKey::derive_insecure("dev");
        let b = MasterKey::derive_insecure("dev");
        assert_eq!(a.as_bytes(), b.as_bytes());
        assert_ne!(a.as_bytes(), MasterKey::derive_insecure("other").as_bytes());
    }

    #[test]
    fn test_random_token_unique_and_urlsafe() {
        let a = random_token();
        let b = random_token();
        assert_ne!(a, b);
        assert_eq!(a.len(), 43);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_'));
    }

    #[test]
    fn test_fingerprint_is_short_and_stable() {
        let key = MasterKey::derive_insecure("fingerprint");
        assert_eq!(key.fingerprint().len(), 8);
        assert_eq!(key.fingerprint(), key.fingerprint());
    }
}
