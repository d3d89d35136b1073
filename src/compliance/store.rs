//! Storage for the compliance side
//!
//! Same shape as the masking stores: each store wraps a [`JsonCollection`]
//! and owns the mutations on its records. Workflow rules that must hold
//! under concurrency (the unmasking state machine, the one-notification-per
//! policy/message guard) are enforced here, inside the write lock.

use chrono::{DateTime, Utc};
use std::path::PathBuf;

use crate::compliance::types::*;
use crate::error::{Error, Result};
use crate::store::JsonCollection;

// ============================================================================
// Organizational policies
// ============================================================================

#[derive(Clone)]
pub struct PolicyStore {
    policies: JsonCollection<OrganizationalPolicy>,
}

impl PolicyStore {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            policies: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            policies: JsonCollection::memory(),
        }
    }

    pub async fn insert(&self, policy: OrganizationalPolicy) -> Result<()> {
        let id = policy.id.clone();
        self.policies.append(&id, policy).await
    }

    pub async fn get(&self, id: &str) -> Option<OrganizationalPolicy> {
        let policies = self.policies.read().await;
        policies.iter().find(|p| p.id == id).cloned()
    }

    /// Flip a policy inactive. Policies are never removed.
    pub async fn deactivate(&self, id: &str) -> Result<OrganizationalPolicy> {
        let mut policies = self.policies.write().await;
        let idx = policies
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| Error::NotFound(format!("Policy {} not found", id)))?;

        let mut updated = policies[idx].clone();
        updated.is_active = false;
        updated.updated_at = Utc::now();
        self.policies.persist(id, &updated).await?;
        policies[idx] = updated.clone();
        Ok(updated)
    }
}

// ============================================================================
// Retention policies and notifications
// ============================================================================

#[derive(Clone)]
pub struct RetentionStore {
    policies: JsonCollection<RetentionPolicy>,
    notifications: JsonCollection<RetentionNotification>,
}

impl RetentionStore {
    pub async fn open(
        policies_dir: Option<PathBuf>,
        notifications_dir: Option<PathBuf>,
    ) -> Result<Self> {
        Ok(Self {
            policies: JsonCollection::open(policies_dir).await?,
            notifications: JsonCollection::open(notifications_dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            policies: JsonCollection::memory(),
            notifications: JsonCollection::memory(),
        }
    }

    pub async fn insert_policy(&self, policy: RetentionPolicy) -> Result<()> {
        let id = policy.id.clone();
        self.policies.append(&id, policy).await
    }

    pub async fn active_policies(&self) -> Vec<RetentionPolicy> {
        let policies = self.policies.read().await;
        policies.iter().filter(|p| p.is_active).cloned().collect()
    }

    /// Store a notification unless one already exists for the same
    /// (policy, message) pair. Returns whether a row was created. The check
    /// and the insert happen under one write lock, so concurrent sweeps
    /// cannot double-notify.
    pub async fn schedule_if_absent(&self, notification: RetentionNotification) -> Result<bool> {
        let mut notifications = self.notifications.write().await;
        let exists = notifications.iter().any(|n| {
            n.policy_id == notification.policy_id && n.message_id == notification.message_id
        });
        if exists {
            return Ok(false);
        }
        self.notifications
            .persist(&notification.id, &notification)
            .await?;
        notifications.push(notification);
        Ok(true)
    }

    /// Pending notifications whose deletion is scheduled at or before `end`
    pub async fn pending_scheduled_by(&self, end: DateTime<Utc>) -> Vec<RetentionNotification> {
        let notifications = self.notifications.read().await;
        notifications
            .iter()
            .filter(|n| n.status == NotificationStatus::Pending && n.scheduled_deletion <= end)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Unmasking requests
// ============================================================================

#[derive(Clone)]
pub struct RequestStore {
    requests: JsonCollection<UnmaskingRequest>,
}

impl RequestStore {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            requests: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            requests: JsonCollection::memory(),
        }
    }

    pub async fn insert(&self, request: UnmaskingRequest) -> Result<()> {
        let id = request.id.clone();
        self.requests.append(&id, request).await
    }

    pub async fn get(&self, id: &str) -> Option<UnmaskingRequest> {
        let requests = self.requests.read().await;
        requests.iter().find(|r| r.id == id).cloned()
    }

    pub async fn created_between(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<UnmaskingRequest> {
        let requests = self.requests.read().await;
        requests
            .iter()
            .filter(|r| r.created_at >= start && r.created_at < end)
            .cloned()
            .collect()
    }

    /// Pending -> Approved. Unknown ids are `NotFound` with no write;
    /// anything already past Pending is `Validation`.
    pub async fn approve(
        &self,
        id: &str,
        approver: &str,
        notes: Option<&str>,
    ) -> Result<UnmaskingRequest> {
        let mut requests = self.requests.write().await;
        let idx = requests
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("Unmasking request {} not found", id)))?;
        if requests[idx].status != RequestStatus::Pending {
            return Err(Error::Validation(format!(
                "Unmasking request {} is not pending",
                id
            )));
        }

        let mut updated = requests[idx].clone();
        updated.status = RequestStatus::Approved;
        updated.approved_by = Some(approver.to_string());
        updated.audit_trail.push(AuditEntry {
            action: "request_approved".to_string(),
            timestamp: Utc::now(),
            user_id: approver.to_string(),
            details: notes.map(String::from),
        });
        self.requests.persist(id, &updated).await?;
        requests[idx] = updated.clone();
        Ok(updated)
    }

    /// Pending -> Rejected, with the same guards as approval
    pub async fn reject(
        &self,
        id: &str,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<UnmaskingRequest> {
        let mut requests = self.requests.write().await;
        let idx = requests
            .iter()
            .position(|r| r.id == id)
            .ok_or_else(|| Error::NotFound(format!("Unmasking request {} not found", id)))?;
        if requests[idx].status != RequestStatus::Pending {
            return Err(Error::Validation(format!(
                "Unmasking request {} is not pending",
                id
            )));
        }

        let mut updated = requests[idx].clone();
        updated.status = RequestStatus::Rejected;
        updated.audit_trail.push(AuditEntry {
            action: "request_rejected".to_string(),
            timestamp: Utc::now(),
            user_id: reviewer.to_string(),
            details: reason.map(String::from),
        });
        self.requests.persist(id, &updated).await?;
        requests[idx] = updated.clone();
        Ok(updated)
    }

    /// Move every Pending request past its expiry to Expired
    pub async fn expire_stale(&self, now: DateTime<Utc>) -> Result<Vec<UnmaskingRequest>> {
        let mut requests = self.requests.write().await;
        let mut expired = Vec::new();
        for idx in 0..requests.len() {
            if requests[idx].status != RequestStatus::Pending || requests[idx].expires_at > now {
                continue;
            }
            let mut updated = requests[idx].clone();
            updated.status = RequestStatus::Expired;
            updated.audit_trail.push(AuditEntry {
                action: "request_expired".to_string(),
                timestamp: now,
                user_id: "system".to_string(),
                details: None,
            });
            let id = updated.id.clone();
            self.requests.persist(&id, &updated).await?;
            requests[idx] = updated.clone();
            expired.push(updated);
        }
        Ok(expired)
    }
}

// ============================================================================
// Metrics
// ============================================================================

#[derive(Clone)]
pub struct MetricStore {
    metrics: JsonCollection<ComplianceMetric>,
}

impl MetricStore {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            metrics: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            metrics: JsonCollection::memory(),
        }
    }

    /// Append-only; samples are never rewritten or deduplicated
    pub async fn record(&self, metric: ComplianceMetric) -> Result<()> {
        let id = metric.id.clone();
        self.metrics.append(&id, metric).await
    }

    pub async fn by_name(&self, name: &str) -> Vec<ComplianceMetric> {
        let metrics = self.metrics.read().await;
        metrics
            .iter()
            .filter(|m| m.metric_name == name)
            .cloned()
            .collect()
    }
}

// ============================================================================
// Messages
// ============================================================================

/// Stand-in for the host's message table; the compliance center only needs
/// creation times, owners and classifications.
#[derive(Clone)]
pub struct MessageStore {
    messages: JsonCollection<MessageRecord>,
}

impl MessageStore {
    pub async fn open(dir: Option<PathBuf>) -> Result<Self> {
        Ok(Self {
            messages: JsonCollection::open(dir).await?,
        })
    }

    pub fn memory() -> Self {
        Self {
            messages: JsonCollection::memory(),
        }
    }

    pub async fn insert(&self, message: MessageRecord) -> Result<()> {
        let id = message.id.clone();
        self.messages.append(&id, message).await
    }

    pub async fn count_between(&self, start: DateTime<Utc>, end: DateTime<Utc>) -> usize {
        let messages = self.messages.read().await;
        messages
            .iter()
            .filter(|m| m.created_at >= start && m.created_at < end)
            .count()
    }

    /// Messages created at or before `cutoff`, optionally restricted to one
    /// classification
    pub async fn find_older_than(
        &self,
        cutoff: DateTime<Utc>,
        classification: Option<&str>,
    ) -> Vec<MessageRecord> {
        let messages = self.messages.read().await;
        messages
            .iter()
            .filter(|m| m.created_at <= cutoff)
            .filter(|m| match classification {
                Some(wanted) => m.classification.as_deref() == Some(wanted),
                None => true,
            })
            .cloned()
            .collect()
    }
}
