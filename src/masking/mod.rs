//! Privacy masking and data loss prevention
//!
//! Provides automatic masking of sensitive data in message content and
//! the surrounding privacy machinery. Includes:
//! - Per-user privacy profiles with a strict default baseline
//! - Deterministic masks and weighted risk scoring
//! - An encrypted detection audit trail
//! - Anonymous session identities with sealed user mappings
//! - DLP incident escalation above configurable risk thresholds

mod engine;
mod store;
mod types;

pub use engine::MaskingEngine;
pub use store::{DetectionLog, IdentityVault, IncidentStore, ProfileStore};
pub use types::{
    AnonymousIdentity, Detection, DetectionEvent, DlpIncident, IdentityMapping, IncidentSeverity,
    IncidentStatus, MaskingResult, PrivacyProfile, PrivacySettings, ProfileUpdate, ReviewStatus,
};
