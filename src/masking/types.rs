//! Masking engine wire and storage types

use crate::detect::DataType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Per-user privacy toggles consumed by the masking engine.
///
/// The masking gates map onto detection types: `mask_pii` covers emails,
/// phones, SSNs, IP addresses and generic PII; `mask_financial` covers cards
/// and account references; `mask_phi` covers health information.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PrivacySettings {
    #[serde(default = "default_true")]
    pub mask_pii: bool,
    #[serde(default = "default_true")]
    pub mask_phi: bool,
    #[serde(default = "default_true")]
    pub mask_financial: bool,
    #[serde(default)]
    pub ghost_mode: bool,
    #[serde(default)]
    pub anonymous_chat: bool,
    #[serde(default = "default_true")]
    pub metadata_minimization: bool,
    #[serde(default)]
    pub ephemeral_messages: bool,
    #[serde(default = "default_ephemeral_hours")]
    pub ephemeral_duration_hours: u32,
}

fn default_true() -> bool {
    true
}

fn default_ephemeral_hours() -> u32 {
    24
}

impl PrivacySettings {
    /// The strict baseline used when a user has no stored profile:
    /// all masking on, behavioral features off, ephemeral off.
    pub fn strict() -> Self {
        Self {
            mask_pii: true,
            mask_phi: true,
            mask_financial: true,
            ghost_mode: false,
            anonymous_chat: false,
            metadata_minimization: true,
            ephemeral_messages: false,
            ephemeral_duration_hours: default_ephemeral_hours(),
        }
    }

    /// True when the settings enable detection of the given type
    pub fn allows(&self, data_type: DataType) -> bool {
        match data_type {
            DataType::Email
            | DataType::Phone
            | DataType::Ssn
            | DataType::IpAddress
            | DataType::Pii => self.mask_pii,
            DataType::CreditCard | DataType::Financial => self.mask_financial,
            DataType::Phi => self.mask_phi,
        }
    }
}

impl Default for PrivacySettings {
    fn default() -> Self {
        Self::strict()
    }
}

/// Stored privacy profile, at most one per user
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PrivacyProfile {
    pub user_id: String,
    pub settings: PrivacySettings,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Partial profile update; absent fields keep their stored values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    pub mask_pii: Option<bool>,
    pub mask_phi: Option<bool>,
    pub mask_financial: Option<bool>,
    pub ghost_mode: Option<bool>,
    pub anonymous_chat: Option<bool>,
    pub metadata_minimization: Option<bool>,
    pub ephemeral_messages: Option<bool>,
    pub ephemeral_duration_hours: Option<u32>,
}

impl ProfileUpdate {
    /// Apply this update on top of existing settings
    pub fn apply_to(&self, settings: &PrivacySettings) -> PrivacySettings {
        PrivacySettings {
            mask_pii: self.mask_pii.unwrap_or(settings.mask_pii),
            mask_phi: self.mask_phi.unwrap_or(settings.mask_phi),
            mask_financial: self.mask_financial.unwrap_or(settings.mask_financial),
            ghost_mode: self.ghost_mode.unwrap_or(settings.ghost_mode),
            anonymous_chat: self.anonymous_chat.unwrap_or(settings.anonymous_chat),
            metadata_minimization: self
                .metadata_minimization
                .unwrap_or(settings.metadata_minimization),
            ephemeral_messages: self.ephemeral_messages.unwrap_or(settings.ephemeral_messages),
            ephemeral_duration_hours: self
                .ephemeral_duration_hours
                .unwrap_or(settings.ephemeral_duration_hours),
        }
    }
}

/// One detection inside a masking result. `position` is the byte offset of
/// the span in the original content.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Detection {
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub confidence: u8,
    pub original_value: String,
    pub masked_value: String,
    pub position: usize,
}

/// Result of masking one piece of content
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaskingResult {
    pub masked_content: String,
    pub detections: Vec<Detection>,
    pub risk_score: f64,
}

impl MaskingResult {
    /// Result for content with no detections
    pub fn clean(content: &str) -> Self {
        Self {
            masked_content: content.to_string(),
            detections: Vec::new(),
            risk_score: 0.0,
        }
    }
}

/// Review state of a stored detection event
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReviewStatus {
    Pending,
    Reviewed,
}

impl fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReviewStatus::Pending => write!(f, "pending"),
            ReviewStatus::Reviewed => write!(f, "reviewed"),
        }
    }
}

/// Audit record for one detection. The original span is stored only inside
/// the encrypted envelope; everything else is safe to display.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DetectionEvent {
    pub id: String,
    pub user_id: String,
    #[serde(rename = "type")]
    pub data_type: DataType,
    pub encrypted_original: String,
    pub masked_value: String,
    pub confidence: u8,
    pub review_status: ReviewStatus,
    pub detected_at: DateTime<Utc>,
}

/// Plaintext payload sealed inside an anonymous identity mapping
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IdentityMapping {
    pub real_user_id: String,
    pub session_id: String,
    pub created_at: DateTime<Utc>,
}

/// Stored anonymous identity. The real user id exists only inside
/// `encrypted_mapping`; resolution requires the decryption path.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnonymousIdentity {
    pub anonymous_id: String,
    pub session_id: String,
    pub encrypted_mapping: String,
    pub access_level: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// DLP incident severity
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum IncidentSeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl fmt::Display for IncidentSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IncidentSeverity::Low => write!(f, "low"),
            IncidentSeverity::Medium => write!(f, "medium"),
            IncidentSeverity::High => write!(f, "high"),
            IncidentSeverity::Critical => write!(f, "critical"),
        }
    }
}

/// Review state of a DLP incident
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum IncidentStatus {
    Open,
    Resolved,
}

/// Escalated data-loss-prevention incident. `detected_content` holds masked
/// text only; raw content never reaches this record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlpIncident {
    pub id: String,
    pub incident_type: String,
    pub severity: IncidentSeverity,
    pub user_id: String,
    pub message_id: Option<String>,
    pub file_id: Option<String>,
    pub department: Option<String>,
    pub detected_content: String,
    pub action_taken: String,
    pub review_status: IncidentStatus,
    pub created_at: DateTime<Utc>,
}
