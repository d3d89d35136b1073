//! Masking engine stores
//!
//! Directory layout when a state dir is configured:
//! ```text
//! <state-dir>/
//! ├── profiles/<user-id>.json
//! ├── detections/det-<uuid>.json
//! ├── identities/anon-<token>.json
//! └── incidents/inc-<uuid>.json
//! ```

use crate::detect::DataType;
use crate::error::{Error, Result};
use crate::masking::types::*;
use crate::store::JsonCollection;
use chrono::{DateTime, Utc};
use std::path::PathBuf;

/// Privacy profiles, at most one record per user
pub struct ProfileStore {
    profiles: JsonCollection<PrivacyProfile>,
}

impl ProfileStore {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            profiles: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            profiles: JsonCollection::memory(),
        }
    }

    /// Look up a user's stored profile
    pub async fn find(&self, user_id: &str) -> Option<PrivacyProfile> {
        let profiles = self.profiles.read().await;
        profiles.iter().find(|p| p.user_id == user_id).cloned()
    }

    /// Create or update a user's profile. The update timestamp is stamped on
    /// every write; creation starts from the strict baseline.
    pub async fn upsert(&self, user_id: &str, update: &ProfileUpdate) -> Result<PrivacyProfile> {
        let now = Utc::now();
        let mut profiles = self.profiles.write().await;

        if let Some(idx) = profiles.iter().position(|p| p.user_id == user_id) {
            let mut updated = profiles[idx].clone();
            updated.settings = update.apply_to(&updated.settings);
            updated.updated_at = now;
            self.profiles.persist(user_id, &updated).await?;
            profiles[idx] = updated.clone();
            return Ok(updated);
        }

        let profile = PrivacyProfile {
            user_id: user_id.to_string(),
            settings: update.apply_to(&PrivacySettings::strict()),
            created_at: now,
            updated_at: now,
        };
        self.profiles.persist(user_id, &profile).await?;
        profiles.push(profile.clone());
        Ok(profile)
    }
}

/// Append-only audit log of detection events
pub struct DetectionLog {
    events: JsonCollection<DetectionEvent>,
}

impl DetectionLog {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            events: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            events: JsonCollection::memory(),
        }
    }

    /// Append one detection event. The caller supplies the already-encrypted
    /// original; plaintext never reaches this store.
    pub async fn log(
        &self,
        user_id: &str,
        data_type: DataType,
        encrypted_original: String,
        masked_value: String,
        confidence: u8,
    ) -> Result<DetectionEvent> {
        let event = DetectionEvent {
            id: format!("det-{}", uuid::Uuid::new_v4()),
            user_id: user_id.to_string(),
            data_type,
            encrypted_original,
            masked_value,
            confidence,
            review_status: ReviewStatus::Pending,
            detected_at: Utc::now(),
        };
        let id = event.id.clone();
        self.events.append(&id, event.clone()).await?;
        Ok(event)
    }

    /// All events for one user, newest first
    pub async fn for_user(&self, user_id: &str) -> Vec<DetectionEvent> {
        let events = self.events.read().await;
        let mut out: Vec<DetectionEvent> = events
            .iter()
            .filter(|e| e.user_id == user_id)
            .cloned()
            .collect();
        out.sort_by(|a, b| b.detected_at.cmp(&a.detected_at));
        out
    }

    /// Number of events detected inside `[start, end)`
    pub async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let events = self.events.read().await;
        events
            .iter()
            .filter(|e| e.detected_at >= start && e.detected_at < end)
            .count()
    }

    /// Flip one event from pending to reviewed
    pub async fn mark_reviewed(&self, id: &str) -> Result<DetectionEvent> {
        let mut events = self.events.write().await;
        let idx = events
            .iter()
            .position(|e| e.id == id)
            .ok_or_else(|| Error::NotFound(format!("detection event {}", id)))?;

        let mut updated = events[idx].clone();
        updated.review_status = ReviewStatus::Reviewed;
        self.events.persist(id, &updated).await?;
        events[idx] = updated.clone();
        Ok(updated)
    }
}

/// Encrypted anonymous identity mappings
pub struct IdentityVault {
    identities: JsonCollection<AnonymousIdentity>,
}

impl IdentityVault {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            identities: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            identities: JsonCollection::memory(),
        }
    }

    pub async fn insert(&self, identity: AnonymousIdentity) -> Result<()> {
        let id = identity.anonymous_id.clone();
        self.identities.append(&id, identity).await
    }

    pub async fn find(&self, anonymous_id: &str) -> Option<AnonymousIdentity> {
        let identities = self.identities.read().await;
        identities
            .iter()
            .find(|i| i.anonymous_id == anonymous_id)
            .cloned()
    }
}

/// Escalated DLP incidents
pub struct IncidentStore {
    incidents: JsonCollection<DlpIncident>,
}

impl IncidentStore {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            incidents: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            incidents: JsonCollection::memory(),
        }
    }

    pub async fn insert(&self, incident: DlpIncident) -> Result<()> {
        let id = incident.id.clone();
        self.incidents.append(&id, incident).await
    }

    pub async fn get(&self, id: &str) -> Option<DlpIncident> {
        let incidents = self.incidents.read().await;
        incidents.iter().find(|i| i.id == id).cloned()
    }

    /// Incidents created inside `[start, end)`
    pub async fn in_window(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> Vec<DlpIncident> {
        let incidents = self.incidents.read().await;
        incidents
            .iter()
            .filter(|i| i.created_at >= start && i.created_at < end)
            .cloned()
            .collect()
    }

    /// Mark an incident resolved. Reviewer-only transition.
    pub async fn resolve(&self, id: &str, reviewer: &str) -> Result<DlpIncident> {
        let mut incidents = self.incidents.write().await;
        let idx = incidents
            .iter()
            .position(|i| i.id == id)
            .ok_or_else(|| Error::NotFound(format!("DLP incident {}", id)))?;

        let mut updated = incidents[idx].clone();
        updated.review_status = IncidentStatus::Resolved;
        self.incidents.persist(id, &updated).await?;
        incidents[idx] = updated.clone();

        tracing::info!(incident = %id, reviewer = %reviewer, "DLP incident resolved");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_profile_upsert_creates_from_strict_baseline() {
        let store = ProfileStore::memory();
        assert!(store.find("u-1").await.is_none());

        let update = ProfileUpdate {
            ghost_mode: Some(true),
            ..Default::default()
        };
        let profile = store.upsert("u-1", &update).await.unwrap();

        assert!(profile.settings.ghost_mode);
        assert!(profile.settings.mask_pii);
        assert_eq!(profile.created_at, profile.updated_at);
    }

    #[tokio::test]
    async fn test_profile_upsert_updates_in_place() {
        let store = ProfileStore::memory();
        store.upsert("u-1", &ProfileUpdate::default()).await.unwrap();

        let update = ProfileUpdate {
            mask_financial: Some(false),
            ..Default::default()
        };
        let updated = store.upsert("u-1", &update).await.unwrap();

        assert!(!updated.settings.mask_financial);
        assert!(updated.updated_at >= updated.created_at);
        // Still a single record
        let again = store.find("u-1").await.unwrap();
        assert!(!again.settings.mask_financial);
    }

    #[tokio::test]
    async fn test_detection_log_append_and_count() {
        let log = DetectionLog::memory();
        let event = log
            .log(
                "u-1",
                DataType::Email,
                "sealed".to_string(),
                "j***@example.com".to_string(),
                95,
            )
            .await
            .unwrap();

        assert!(event.id.starts_with("det-"));
        assert_eq!(event.review_status, ReviewStatus::Pending);

        let now = Utc::now();
        let count = log
            .count_between(now - Duration::minutes(1), now + Duration::minutes(1))
            .await;
        assert_eq!(count, 1);
        assert_eq!(log.count_between(now + Duration::hours(1), now + Duration::hours(2)).await, 0);
    }

    #[tokio::test]
    async fn test_detection_log_mark_reviewed() {
        let log = DetectionLog::memory();
        let event = log
            .log("u-1", DataType::Ssn, "sealed".into(), "***-**-6789".into(), 98)
            .await
            .unwrap();

        let reviewed = log.mark_reviewed(&event.id).await.unwrap();
        assert_eq!(reviewed.review_status, ReviewStatus::Reviewed);

        let err = log.mark_reviewed("det-missing").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_detection_log_persistence_round_trip() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("detections");

        {
            let log = DetectionLog::open(Some(path.clone())).await.unwrap();
            log.log("u-1", DataType::Phone, "sealed".into(), "***-***-4567".into(), 85)
                .await
                .unwrap();
        }

        let log = DetectionLog::open(Some(path)).await.unwrap();
        let events = log.for_user("u-1").await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].masked_value, "***-***-4567");
    }

    #[tokio::test]
    async fn test_identity_vault_find() {
        let vault = IdentityVault::memory();
        let identity = AnonymousIdentity {
            anonymous_id: "anon-abc".to_string(),
            session_id: "sess-1".to_string(),
            encrypted_mapping: "sealed".to_string(),
            access_level: "standard".to_string(),
            created_at: Utc::now(),
            expires_at: Utc::now() + Duration::hours(24),
        };
        vault.insert(identity).await.unwrap();

        assert!(vault.find("anon-abc").await.is_some());
        assert!(vault.find("anon-missing").await.is_none());
    }

    #[tokio::test]
    async fn test_incident_store_window_and_resolve() {
        let store = IncidentStore::memory();
        let incident = DlpIncident {
            id: "inc-1".to_string(),
            incident_type: "ssn".to_string(),
            severity: IncidentSeverity::High,
            user_id: "u-1".to_string(),
            message_id: Some("m-1".to_string()),
            file_id: None,
            department: None,
            detected_content: "***-**-6789".to_string(),
            action_taken: "FLAGGED".to_string(),
            review_status: IncidentStatus::Open,
            created_at: Utc::now(),
        };
        store.insert(incident).await.unwrap();

        let stored = store.get("inc-1").await.unwrap();
        assert_eq!(stored.review_status, IncidentStatus::Open);
        assert!(store.get("inc-404").await.is_none());

        let now = Utc::now();
        let found = store
            .in_window(now - Duration::minutes(1), now + Duration::minutes(1))
            .await;
        assert_eq!(found.len(), 1);

        let resolved = store.resolve("inc-1", "reviewer-1").await.unwrap();
        assert_eq!(resolved.review_status, IncidentStatus::Resolved);
        assert_eq!(
            store.get("inc-1").await.unwrap().review_status,
            IncidentStatus::Resolved
        );

        assert!(store.resolve("inc-404", "reviewer-1").await.unwrap_err().is_not_found());
    }
}
