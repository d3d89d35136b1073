//! Privacore configuration management

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::crypto::{KeyRing, MasterKey};
use crate::error::{Error, Result};

/// Main Privacore configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PrivacoreConfig {
    /// Encryption key provisioning
    pub encryption: EncryptionConfig,

    /// Masking engine configuration
    pub masking: MaskingConfig,

    /// DLP escalation thresholds
    pub dlp: DlpConfig,

    /// Compliance center configuration
    pub compliance: ComplianceConfig,

    /// Storage configuration
    pub storage: StorageConfig,
}

/// Encryption key provisioning
///
/// The master key is never embedded in configuration files; the config only
/// names the environment variable that carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncryptionConfig {
    /// Environment variable holding the base64-encoded 32-byte master key
    pub key_env: String,

    /// Version tag stamped on newly sealed envelopes
    pub active_key_version: u8,

    /// Derive a fixed development key when the environment variable is
    /// missing. Never enable outside local development.
    pub allow_insecure_dev_key: bool,
}

impl Default for EncryptionConfig {
    fn default() -> Self {
        Self {
            key_env: "PRIVACORE_MASTER_KEY".to_string(),
            active_key_version: 1,
            allow_insecure_dev_key: false,
        }
    }
}

/// Masking engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MaskingConfig {
    /// Hours an anonymous identity stays resolvable
    pub identity_ttl_hours: u32,
}

impl Default for MaskingConfig {
    fn default() -> Self {
        Self {
            identity_ttl_hours: 24,
        }
    }
}

/// DLP escalation thresholds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DlpConfig {
    /// Risk score above which a masking pass raises an incident
    pub high_risk_threshold: f64,

    /// Risk score above which the incident is Critical instead of High
    pub critical_risk_threshold: f64,
}

impl Default for DlpConfig {
    fn default() -> Self {
        Self {
            high_risk_threshold: 70.0,
            critical_risk_threshold: 90.0,
        }
    }
}

/// Compliance center configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComplianceConfig {
    /// Days before a pending unmasking request expires
    pub unmasking_expiry_days: u32,

    /// DLP violations per report window above which stricter policies are
    /// recommended
    pub dlp_violation_threshold: usize,

    /// Overdue retention items above which a policy review is recommended
    pub retention_backlog_threshold: usize,

    /// Unmasking requests per window above which privacy training is
    /// recommended
    pub unmasking_request_threshold: usize,
}

impl Default for ComplianceConfig {
    fn default() -> Self {
        Self {
            unmasking_expiry_days: 30,
            dlp_violation_threshold: 10,
            retention_backlog_threshold: 50,
            unmasking_request_threshold: 5,
        }
    }
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Base directory for persisted state
    pub state_dir: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        let base = dirs_next::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("privacore");
        Self { state_dir: base }
    }
}

/// Build the process key ring from the configured environment variable.
///
/// A missing key fails fast unless the insecure development fallback is
/// explicitly enabled; a present but malformed key always fails.
pub fn load_keyring(config: &EncryptionConfig) -> Result<KeyRing> {
    match std::env::var(&config.key_env) {
        Ok(encoded) => {
            let key = MasterKey::from_base64(&encoded)?;
            Ok(KeyRing::new(config.active_key_version, key))
        }
        Err(_) if config.allow_insecure_dev_key => {
            tracing::warn!(
                env = %config.key_env,
                "master key missing; using insecure development key"
            );
            Ok(KeyRing::new(
                config.active_key_version,
                MasterKey::derive_insecure("privacore-dev"),
            ))
        }
        Err(_) => Err(Error::Config(format!(
            "Master key environment variable {} is not set",
            config.key_env
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::Engine;

    #[test]
    fn test_default_config() {
        let config = PrivacoreConfig::default();
        assert_eq!(config.encryption.key_env, "PRIVACORE_MASTER_KEY");
        assert_eq!(config.encryption.active_key_version, 1);
        assert!(!config.encryption.allow_insecure_dev_key);
        assert_eq!(config.masking.identity_ttl_hours, 24);
        assert_eq!(config.dlp.high_risk_threshold, 70.0);
        assert_eq!(config.dlp.critical_risk_threshold, 90.0);
        assert_eq!(config.compliance.unmasking_expiry_days, 30);
        assert_eq!(config.compliance.dlp_violation_threshold, 10);
        assert_eq!(config.compliance.retention_backlog_threshold, 50);
        assert_eq!(config.compliance.unmasking_request_threshold, 5);
        assert!(config.storage.state_dir.ends_with("privacore"));
    }

    #[test]
    fn test_toml_round_trip() {
        let config = PrivacoreConfig::default();
        let rendered = toml::to_string_pretty(&config).unwrap();
        let parsed: PrivacoreConfig = toml::from_str(&rendered).unwrap();
        assert_eq!(parsed.dlp.high_risk_threshold, 70.0);
        assert_eq!(parsed.masking.identity_ttl_hours, 24);
        assert_eq!(parsed.encryption.key_env, "PRIVACORE_MASTER_KEY");
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let parsed: PrivacoreConfig = toml::from_str(
            r#"
            [dlp]
            high_risk_threshold = 60.0
            "#,
        )
        .unwrap();
        assert_eq!(parsed.dlp.high_risk_threshold, 60.0);
        assert_eq!(parsed.dlp.critical_risk_threshold, 90.0);
        assert_eq!(parsed.compliance.unmasking_expiry_days, 30);
    }

    #[test]
    fn test_load_keyring_fails_without_key() {
        let config = EncryptionConfig {
            key_env: "PRIVACORE_TEST_KEY_ABSENT".to_string(),
            ..Default::default()
        };
        let err = load_keyring(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }

    #[test]
    fn test_load_keyring_dev_fallback() {
        let config = EncryptionConfig {
            key_env: "PRIVACORE_TEST_KEY_DEV".to_string(),
            allow_insecure_dev_key: true,
            ..Default::default()
        };
        let ring = load_keyring(&config).unwrap();
        assert_eq!(ring.active_version(), 1);
    }

    #[test]
    fn test_load_keyring_reads_env() {
        let encoded = base64::engine::general_purpose::STANDARD.encode([7u8; 32]);
        std::env::set_var("PRIVACORE_TEST_KEY_SET", &encoded);

        let config = EncryptionConfig {
            key_env: "PRIVACORE_TEST_KEY_SET".to_string(),
            ..Default::default()
        };
        let ring = load_keyring(&config).unwrap();
        let sealed = ring.seal(b"original value").unwrap();
        assert_eq!(ring.open(&sealed).unwrap(), b"original value");
    }

    #[test]
    fn test_load_keyring_rejects_malformed_key() {
        std::env::set_var("PRIVACORE_TEST_KEY_BAD", "not base64!!!");
        let config = EncryptionConfig {
            key_env: "PRIVACORE_TEST_KEY_BAD".to_string(),
            allow_insecure_dev_key: true,
            ..Default::default()
        };
        // The fallback covers a missing key, never a malformed one
        let err = load_keyring(&config).err().unwrap();
        assert!(matches!(err, Error::Config(_)));
    }
}
