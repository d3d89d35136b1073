//! The masking engine
//!
//! Detects sensitive data in content, applies deterministic masks, scores
//! risk, writes the encrypted detection audit trail, issues anonymous
//! identities, and escalates DLP incidents. All collaborators are injected
//! at construction; the engine holds no global state.

use crate::config::{DlpConfig, MaskingConfig};
use crate::crypto::{self, KeyRing};
use crate::detect::{confidence_for, mask_spans, mask_value, DetectorSet};
use crate::error::Result;
use crate::masking::store::{DetectionLog, IdentityVault, IncidentStore, ProfileStore};
use crate::masking::types::*;
use chrono::{Duration, Utc};
use std::sync::Arc;

pub struct MaskingEngine {
    detectors: DetectorSet,
    keyring: Arc<KeyRing>,
    profiles: Arc<ProfileStore>,
    detections: Arc<DetectionLog>,
    vault: Arc<IdentityVault>,
    incidents: Arc<IncidentStore>,
    masking: MaskingConfig,
    dlp: DlpConfig,
}

impl MaskingEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        keyring: Arc<KeyRing>,
        profiles: Arc<ProfileStore>,
        detections: Arc<DetectionLog>,
        vault: Arc<IdentityVault>,
        incidents: Arc<IncidentStore>,
        masking: MaskingConfig,
        dlp: DlpConfig,
    ) -> Result<Self> {
        Ok(Self {
            detectors: DetectorSet::standard()?,
            keyring,
            profiles,
            detections,
            vault,
            incidents,
            masking,
            dlp,
        })
    }

    /// Detect and mask sensitive data in `content`.
    ///
    /// Settings come from `overrides` when given, otherwise from the user's
    /// stored profile (strict baseline when none exists). Every detection is
    /// encrypted and written to the audit log before the result is returned;
    /// a failed write aborts the call so no masked result exists without its
    /// audit record. Offsets in the returned detections index the original
    /// content.
    pub async fn mask_content(
        &self,
        content: &str,
        user_id: &str,
        overrides: Option<PrivacySettings>,
    ) -> Result<MaskingResult> {
        let settings = match overrides {
            Some(s) => s,
            None => self.user_settings(user_id).await,
        };

        let matches = self
            .detectors
            .find_matches(content, |dt| settings.allows(dt));
        if matches.is_empty() {
            return Ok(MaskingResult::clean(content));
        }

        let mut detections = Vec::with_capacity(matches.len());
        let mut spans = Vec::with_capacity(matches.len());
        let mut risk = 0.0f64;

        for m in &matches {
            let confidence = confidence_for(m.data_type, &m.text);
            let masked = mask_value(m.data_type, &m.text);
            risk += f64::from(m.data_type.risk_weight()) * f64::from(confidence) / 100.0;

            let sealed = self.keyring.seal_to_string(m.text.as_bytes())?;
            self.detections
                .log(user_id, m.data_type, sealed, masked.clone(), confidence)
                .await?;

            spans.push((m.start, m.end, masked.clone()));
            detections.push(Detection {
                data_type: m.data_type,
                confidence,
                original_value: m.text.clone(),
                masked_value: masked,
                position: m.start,
            });
        }

        let masked_content = mask_spans(content, &spans);
        let risk_score = risk.min(100.0);

        tracing::debug!(
            user = %user_id,
            detections = detections.len(),
            risk = risk_score,
            "content masked"
        );

        Ok(MaskingResult {
            masked_content,
            detections,
            risk_score,
        })
    }

    /// The user's stored settings, or the strict baseline when no profile
    /// exists
    pub async fn user_settings(&self, user_id: &str) -> PrivacySettings {
        match self.profiles.find(user_id).await {
            Some(profile) => profile.settings,
            None => PrivacySettings::strict(),
        }
    }

    /// Create or update a user's privacy profile
    pub async fn update_profile(
        &self,
        user_id: &str,
        update: ProfileUpdate,
    ) -> Result<PrivacyProfile> {
        let profile = self.profiles.upsert(user_id, &update).await?;
        tracing::info!(user = %user_id, "privacy profile updated");
        Ok(profile)
    }

    /// Issue an unguessable anonymous identity for a session. The mapping
    /// back to the real user is stored only inside an encrypted envelope.
    pub async fn create_anonymous_identity(
        &self,
        user_id: &str,
        session_id: &str,
    ) -> Result<String> {
        let now = Utc::now();
        let anonymous_id = format!("anon-{}", crypto::random_token());

        let mapping = IdentityMapping {
            real_user_id: user_id.to_string(),
            session_id: session_id.to_string(),
            created_at: now,
        };
        let sealed = self.keyring.seal_to_string(&serde_json::to_vec(&mapping)?)?;

        let identity = AnonymousIdentity {
            anonymous_id: anonymous_id.clone(),
            session_id: session_id.to_string(),
            encrypted_mapping: sealed,
            access_level: "standard".to_string(),
            created_at: now,
            expires_at: now + Duration::hours(i64::from(self.masking.identity_ttl_hours)),
        };
        self.vault.insert(identity).await?;

        tracing::debug!(session = %session_id, "anonymous identity issued");
        Ok(anonymous_id)
    }

    /// Resolve an anonymous identity back to the real user id.
    ///
    /// Unknown and expired tokens both resolve to `None`; a caller cannot
    /// distinguish a mapping that never existed from one past its TTL.
    pub async fn resolve_anonymous_identity(&self, anonymous_id: &str) -> Result<Option<String>> {
        let Some(identity) = self.vault.find(anonymous_id).await else {
            return Ok(None);
        };
        if identity.expires_at <= Utc::now() {
            return Ok(None);
        }

        let plaintext = self.keyring.open_from_string(&identity.encrypted_mapping)?;
        let mapping: IdentityMapping = serde_json::from_slice(&plaintext)?;
        Ok(Some(mapping.real_user_id))
    }

    /// Re-scan content and raise a DLP incident when the risk score crosses
    /// the configured threshold. The incident stores masked content only.
    pub async fn process_dlp_violation(
        &self,
        user_id: &str,
        content: &str,
        message_id: Option<&str>,
        file_id: Option<&str>,
    ) -> Result<Option<DlpIncident>> {
        let result = self.mask_content(content, user_id, None).await?;
        if result.risk_score <= self.dlp.high_risk_threshold {
            return Ok(None);
        }

        let severity = if result.risk_score > self.dlp.critical_risk_threshold {
            IncidentSeverity::Critical
        } else {
            IncidentSeverity::High
        };

        let incident = DlpIncident {
            id: format!("inc-{}", uuid::Uuid::new_v4()),
            incident_type: dominant_type(&result.detections),
            severity,
            user_id: user_id.to_string(),
            message_id: message_id.map(String::from),
            file_id: file_id.map(String::from),
            department: None,
            detected_content: result.masked_content.clone(),
            action_taken: "FLAGGED".to_string(),
            review_status: IncidentStatus::Open,
            created_at: Utc::now(),
        };
        self.incidents.insert(incident.clone()).await?;

        tracing::warn!(
            user = %user_id,
            risk = result.risk_score,
            severity = %severity,
            "DLP incident raised"
        );
        Ok(Some(incident))
    }
}

/// The detected type contributing the most risk, used as the incident type
fn dominant_type(detections: &[Detection]) -> String {
    detections
        .iter()
        .max_by_key(|d| u32::from(d.data_type.risk_weight()) * u32::from(d.confidence))
        .map(|d| d.data_type.to_string())
        .unwrap_or_else(|| "sensitive_data".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::MasterKey;
    use crate::detect::DataType;

    struct Harness {
        engine: MaskingEngine,
        keyring: Arc<KeyRing>,
        detections: Arc<DetectionLog>,
        incidents: Arc<IncidentStore>,
    }

    fn make_engine_with(masking: MaskingConfig, dlp: DlpConfig) -> Harness {
        let keyring = Arc::new(KeyRing::new(1, MasterKey::generate()));
        let detections = Arc::new(DetectionLog::memory());
        let incidents = Arc::new(IncidentStore::memory());
        let engine = MaskingEngine::new(
            Arc::clone(&keyring),
            Arc::new(ProfileStore::memory()),
            Arc::clone(&detections),
            Arc::new(IdentityVault::memory()),
            Arc::clone(&incidents),
            masking,
            dlp,
        )
        .unwrap();
        Harness {
            engine,
            keyring,
            detections,
            incidents,
        }
    }

    fn make_engine() -> Harness {
        make_engine_with(MaskingConfig::default(), DlpConfig::default())
    }

    #[tokio::test]
    async fn test_mask_content_email_and_phone() {
        let h = make_engine();
        let result = h
            .engine
            .mask_content(
                "Contact me at jane.doe@example.com or call 555-123-4567",
                "u-1",
                None,
            )
            .await
            .unwrap();

        assert_eq!(
            result.masked_content,
            "Contact me at j***@example.com or call ***-***-4567"
        );
        assert_eq!(result.detections.len(), 2);
        assert_eq!(result.detections[0].data_type, DataType::Email);
        assert_eq!(result.detections[0].confidence, 95);
        assert_eq!(result.detections[1].data_type, DataType::Phone);
        assert_eq!(result.detections[1].confidence, 85);
        assert_eq!(result.risk_score, 9.0);
    }

    #[tokio::test]
    async fn test_mask_content_without_matches_is_untouched() {
        let h = make_engine();
        let result = h
            .engine
            .mask_content("lunch at noon?", "u-1", None)
            .await
            .unwrap();

        assert_eq!(result.masked_content, "lunch at noon?");
        assert!(result.detections.is_empty());
        assert_eq!(result.risk_score, 0.0);

        // No audit records for clean content
        assert!(h.detections.for_user("u-1").await.is_empty());
    }

    #[tokio::test]
    async fn test_mask_content_writes_encrypted_audit_trail() {
        let h = make_engine();
        h.engine
            .mask_content("reach me at jane.doe@example.com", "u-1", None)
            .await
            .unwrap();

        let events = h.detections.for_user("u-1").await;
        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.data_type, DataType::Email);
        assert_eq!(event.masked_value, "j***@example.com");
        assert_eq!(event.review_status, ReviewStatus::Pending);

        // The original is recoverable only through the key ring
        let plaintext = h.keyring.open_from_string(&event.encrypted_original).unwrap();
        assert_eq!(plaintext, b"jane.doe@example.com");
        assert!(!event.encrypted_original.contains("jane.doe"));
    }

    #[tokio::test]
    async fn test_settings_override_disables_detection() {
        let h = make_engine();
        let mut settings = PrivacySettings::strict();
        settings.mask_pii = false;

        let result = h
            .engine
            .mask_content("reach me at jane.doe@example.com", "u-1", Some(settings))
            .await
            .unwrap();

        assert_eq!(result.masked_content, "reach me at jane.doe@example.com");
        assert!(result.detections.is_empty());
    }

    #[tokio::test]
    async fn test_stored_profile_gates_detection() {
        let h = make_engine();
        h.engine
            .update_profile(
                "u-1",
                ProfileUpdate {
                    mask_financial: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let result = h
            .engine
            .mask_content("card 4111-1111-1111-1111 and ssn 123-45-6789", "u-1", None)
            .await
            .unwrap();

        // Financial masking off: the card stays, the SSN is still masked
        assert!(result.masked_content.contains("4111-1111-1111-1111"));
        assert!(result.masked_content.contains("***-**-6789"));
        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].data_type, DataType::Ssn);
    }

    #[tokio::test]
    async fn test_risk_score_caps_at_100() {
        let h = make_engine();
        let content = "111-22-3333 222-33-4444 333-44-5555 444-55-6666 555-66-7777 666-77-8888";
        let result = h.engine.mask_content(content, "u-1", None).await.unwrap();

        assert_eq!(result.detections.len(), 6);
        assert_eq!(result.risk_score, 100.0);
    }

    #[tokio::test]
    async fn test_luhn_invalid_card_masked_with_base_confidence() {
        let h = make_engine();
        let result = h
            .engine
            .mask_content("card 1234-5678-9012-3456 on file", "u-1", None)
            .await
            .unwrap();

        assert_eq!(result.detections.len(), 1);
        assert_eq!(result.detections[0].confidence, 85);
        assert_eq!(result.masked_content, "card ****-****-****-3456 on file");
    }

    #[tokio::test]
    async fn test_default_settings_are_strict() {
        let h = make_engine();
        let settings = h.engine.user_settings("nobody").await;
        assert_eq!(settings, PrivacySettings::strict());
    }

    #[tokio::test]
    async fn test_anonymous_identity_roundtrip() {
        let h = make_engine();
        let a = h
            .engine
            .create_anonymous_identity("u-1", "sess-1")
            .await
            .unwrap();
        let b = h
            .engine
            .create_anonymous_identity("u-1", "sess-2")
            .await
            .unwrap();

        assert!(a.starts_with("anon-"));
        assert_ne!(a, b);

        assert_eq!(
            h.engine.resolve_anonymous_identity(&a).await.unwrap(),
            Some("u-1".to_string())
        );
        assert_eq!(
            h.engine.resolve_anonymous_identity("anon-unknown").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn test_expired_identity_resolves_to_none() {
        let h = make_engine_with(
            MaskingConfig {
                identity_ttl_hours: 0,
            },
            DlpConfig::default(),
        );
        let id = h
            .engine
            .create_anonymous_identity("u-1", "sess-1")
            .await
            .unwrap();

        assert_eq!(h.engine.resolve_anonymous_identity(&id).await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_dlp_violation_below_threshold_is_ignored() {
        let h = make_engine();
        // One email + one phone: risk 9.0
        let incident = h
            .engine
            .process_dlp_violation(
                "u-1",
                "Contact me at jane.doe@example.com or call 555-123-4567",
                Some("m-1"),
                None,
            )
            .await
            .unwrap();
        assert!(incident.is_none());

        let now = Utc::now();
        let stored = h
            .incidents
            .in_window(now - Duration::minutes(1), now + Duration::minutes(1))
            .await;
        assert!(stored.is_empty());
    }

    #[tokio::test]
    async fn test_dlp_violation_high_severity() {
        let h = make_engine();
        // Four strict SSNs: risk 4 * 19.6 = 78.4
        let incident = h
            .engine
            .process_dlp_violation(
                "u-1",
                "111-22-3333 222-33-4444 333-44-5555 444-55-6666",
                Some("m-1"),
                None,
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(incident.severity, IncidentSeverity::High);
        assert_eq!(incident.incident_type, "ssn");
        assert_eq!(incident.action_taken, "FLAGGED");
        assert_eq!(incident.review_status, IncidentStatus::Open);
        assert_eq!(incident.message_id.as_deref(), Some("m-1"));
        // Masked content only
        assert!(!incident.detected_content.contains("111-22-3333"));
        assert!(incident.detected_content.contains("***-**-3333"));
    }

    #[tokio::test]
    async fn test_dlp_violation_critical_severity() {
        let h = make_engine();
        // Five strict SSNs: risk 98.0
        let incident = h
            .engine
            .process_dlp_violation(
                "u-1",
                "111-22-3333 222-33-4444 333-44-5555 444-55-6666 555-66-7777",
                None,
                Some("f-1"),
            )
            .await
            .unwrap()
            .unwrap();

        assert_eq!(incident.severity, IncidentSeverity::Critical);
        assert_eq!(incident.file_id.as_deref(), Some("f-1"));
    }
}
