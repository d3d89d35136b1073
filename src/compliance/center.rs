//! The compliance center
//!
//! Policy lifecycle, periodic reporting, retention sweeps and the
//! human-gated unmasking workflow. The center reads the masking side's
//! stored incidents and detection events through their stores, never the
//! masking engine itself.

use chrono::{DateTime, Duration, Utc};
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use crate::compliance::store::{
    MessageStore, MetricStore, PolicyStore, RequestStore, RetentionStore,
};
use crate::compliance::types::*;
use crate::config::ComplianceConfig;
use crate::error::Result;
use crate::masking::{
    DetectionEvent, DetectionLog, DlpIncident, IncidentSeverity, IncidentStatus, IncidentStore,
};

pub struct ComplianceCenter {
    policies: Arc<PolicyStore>,
    retention: Arc<RetentionStore>,
    requests: Arc<RequestStore>,
    metrics: Arc<MetricStore>,
    messages: Arc<MessageStore>,
    incidents: Arc<IncidentStore>,
    detections: Arc<DetectionLog>,
    config: ComplianceConfig,
}

impl ComplianceCenter {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        policies: Arc<PolicyStore>,
        retention: Arc<RetentionStore>,
        requests: Arc<RequestStore>,
        metrics: Arc<MetricStore>,
        messages: Arc<MessageStore>,
        incidents: Arc<IncidentStore>,
        detections: Arc<DetectionLog>,
        config: ComplianceConfig,
    ) -> Self {
        Self {
            policies,
            retention,
            requests,
            metrics,
            messages,
            incidents,
            detections,
            config,
        }
    }

    // ========================================================================
    // Policy lifecycle
    // ========================================================================

    /// Store a new organizational policy built from an admin-supplied rule
    pub async fn create_policy(&self, created_by: &str, rule: PolicyRule) -> Result<String> {
        let now = Utc::now();
        let policy = OrganizationalPolicy {
            id: format!("pol-{}", uuid::Uuid::new_v4()),
            policy_name: rule.name.clone(),
            policy_type: rule.policy_type,
            auto_enforce: rule.configuration.auto_enforce.unwrap_or(true),
            rule_configuration: rule.configuration,
            departments: rule.departments,
            user_roles: rule.user_roles,
            severity: PolicySeverity::Medium,
            is_active: true,
            requires_approval: false,
            created_by: created_by.to_string(),
            created_at: now,
            updated_at: now,
        };
        let id = policy.id.clone();
        self.policies.insert(policy).await?;
        self.record_metric("policy_created", 1.0, "count", Timeframe::Daily, None)
            .await?;

        tracing::info!(policy = %id, policy_type = %rule.policy_type, "organizational policy created");
        Ok(id)
    }

    pub async fn deactivate_policy(&self, id: &str) -> Result<()> {
        self.policies.deactivate(id).await?;
        tracing::info!(policy = %id, "organizational policy deactivated");
        Ok(())
    }

    // ========================================================================
    // Reporting
    // ========================================================================

    /// Aggregate compliance activity over a window. The violation breakdown
    /// compares each severity/type group against the preceding window of
    /// equal length. The optional department narrows the incident counts;
    /// messages and detections carry no department.
    pub async fn generate_compliance_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        department: Option<&str>,
    ) -> ComplianceReport {
        let total_messages = self.messages.count_between(start, end).await;
        let masked_detections = self.detections.count_between(start, end).await;
        let incidents = filter_department(self.incidents.in_window(start, end).await, department);
        let dlp_violations = incidents.len();
        let retention_items_due = self.retention.pending_scheduled_by(end).await.len();
        let unmasking_requests = self.requests.created_between(start, end).await.len();

        let window = end - start;
        let previous =
            filter_department(self.incidents.in_window(start - window, start).await, department);
        let violations = summarize_violations(&incidents, &previous);

        let mut recommendations = Vec::new();
        if dlp_violations > self.config.dlp_violation_threshold {
            recommendations.push(
                "Consider implementing stricter DLP policies to reduce violations".to_string(),
            );
        }
        if retention_items_due > self.config.retention_backlog_threshold {
            recommendations
                .push("Review data retention policies to address overdue items".to_string());
        }
        if unmasking_requests > self.config.unmasking_request_threshold {
            recommendations.push(
                "Consider additional privacy training to reduce unmasking requests".to_string(),
            );
        }
        if violations.iter().any(|v| {
            matches!(
                v.severity,
                IncidentSeverity::High | IncidentSeverity::Critical
            )
        }) {
            recommendations
                .push("High-severity violations require immediate attention".to_string());
        }
        if recommendations.is_empty() {
            recommendations.push("Compliance metrics are within acceptable ranges".to_string());
        }

        ComplianceReport {
            period_start: start,
            period_end: end,
            department: department.map(String::from),
            total_messages,
            masked_detections,
            dlp_violations,
            retention_items_due,
            unmasking_requests,
            violations,
            recommendations,
            generated_at: Utc::now(),
        }
    }

    /// Group DLP incidents in a window by severity and type
    pub async fn get_dlp_incident_summary(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        department: Option<&str>,
    ) -> DlpIncidentSummary {
        let incidents = filter_department(self.incidents.in_window(start, end).await, department);
        let total = incidents.len();

        let mut by_severity: HashMap<String, usize> = HashMap::new();
        let mut by_type: HashMap<String, usize> = HashMap::new();
        for incident in &incidents {
            *by_severity.entry(incident.severity.to_string()).or_default() += 1;
            *by_type.entry(incident.incident_type.clone()).or_default() += 1;
        }

        let mut top_violation_types: Vec<(String, usize)> =
            by_type.iter().map(|(k, v)| (k.clone(), *v)).collect();
        top_violation_types.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        top_violation_types.truncate(5);

        let resolved = incidents
            .iter()
            .filter(|i| i.review_status == IncidentStatus::Resolved)
            .count();
        let resolution_rate = if total == 0 {
            0.0
        } else {
            resolved as f64 / total as f64 * 100.0
        };

        DlpIncidentSummary {
            total,
            by_severity,
            by_type,
            top_violation_types,
            resolution_rate,
        }
    }

    // ========================================================================
    // Retention
    // ========================================================================

    /// Sweep every active retention policy and schedule a deletion notice
    /// for each message past its retention period. Safe to re-run: the
    /// (policy, message) guard in the store makes repeated sweeps no-ops
    /// against an unchanged world. Returns the number of notifications
    /// created.
    pub async fn check_retention_compliance(&self) -> Result<usize> {
        let now = Utc::now();
        let mut created = 0usize;

        for policy in self.retention.active_policies().await {
            let cutoff = now - Duration::days(i64::from(policy.retention_period_days));
            let matching = self
                .messages
                .find_older_than(cutoff, policy.message_classification.as_deref())
                .await;

            for message in matching {
                let notification = RetentionNotification {
                    id: format!("not-{}", uuid::Uuid::new_v4()),
                    policy_id: policy.id.clone(),
                    message_id: message.id.clone(),
                    notification_type: "retention_expiry".to_string(),
                    scheduled_deletion: now
                        + Duration::days(i64::from(policy.notify_before_expiry_days)),
                    notified_users: vec![message.user_id.clone()],
                    status: NotificationStatus::Pending,
                    created_at: now,
                };
                if self.retention.schedule_if_absent(notification).await? {
                    created += 1;
                }
            }
        }

        self.record_metric(
            "retention_notifications_created",
            created as f64,
            "count",
            Timeframe::Daily,
            None,
        )
        .await?;

        tracing::info!(created, "retention sweep finished");
        Ok(created)
    }

    // ========================================================================
    // Unmasking workflow
    // ========================================================================

    /// Open a Pending unmasking request with its first audit entry
    pub async fn process_unmasking_request(
        &self,
        requester: &str,
        target_message: &str,
        request_type: &str,
        justification: &str,
        urgency: UrgencyLevel,
    ) -> Result<UnmaskingRequest> {
        let now = Utc::now();
        let request = UnmaskingRequest {
            id: format!("req-{}", uuid::Uuid::new_v4()),
            requester_id: requester.to_string(),
            target_message_id: target_message.to_string(),
            request_type: request_type.to_string(),
            legal_justification: justification.to_string(),
            urgency,
            status: RequestStatus::Pending,
            approved_by: None,
            audit_trail: vec![AuditEntry {
                action: "request_created".to_string(),
                timestamp: now,
                user_id: requester.to_string(),
                details: None,
            }],
            created_at: now,
            expires_at: now + Duration::days(i64::from(self.config.unmasking_expiry_days)),
        };
        self.requests.insert(request.clone()).await?;
        self.record_metric("unmasking_requests", 1.0, "count", Timeframe::Daily, None)
            .await?;

        tracing::info!(request = %request.id, urgency = %urgency, "unmasking request created");
        Ok(request)
    }

    pub async fn approve_unmasking_request(
        &self,
        id: &str,
        approver: &str,
        notes: Option<&str>,
    ) -> Result<UnmaskingRequest> {
        let request = self.requests.approve(id, approver, notes).await?;
        self.record_metric("unmasking_approved", 1.0, "count", Timeframe::Daily, None)
            .await?;

        tracing::info!(request = %id, approver = %approver, "unmasking request approved");
        Ok(request)
    }

    pub async fn reject_unmasking_request(
        &self,
        id: &str,
        reviewer: &str,
        reason: Option<&str>,
    ) -> Result<UnmaskingRequest> {
        let request = self.requests.reject(id, reviewer, reason).await?;
        self.record_metric("unmasking_rejected", 1.0, "count", Timeframe::Daily, None)
            .await?;

        tracing::info!(request = %id, reviewer = %reviewer, "unmasking request rejected");
        Ok(request)
    }

    /// Expire every Pending request past its deadline, returning the count
    pub async fn expire_stale_requests(&self) -> Result<usize> {
        let expired = self.requests.expire_stale(Utc::now()).await?;
        if !expired.is_empty() {
            tracing::info!(expired = expired.len(), "stale unmasking requests expired");
        }
        Ok(expired.len())
    }

    // ========================================================================
    // Review actions and metrics
    // ========================================================================

    pub async fn resolve_incident(&self, id: &str, reviewer: &str) -> Result<DlpIncident> {
        self.incidents.resolve(id, reviewer).await
    }

    pub async fn mark_detection_reviewed(
        &self,
        id: &str,
        reviewer: &str,
    ) -> Result<DetectionEvent> {
        let event = self.detections.mark_reviewed(id).await?;
        tracing::info!(detection = %id, reviewer = %reviewer, "detection event reviewed");
        Ok(event)
    }

    /// Append-only metric write; readers aggregate on demand
    pub async fn record_metric(
        &self,
        name: &str,
        value: f64,
        unit: &str,
        timeframe: Timeframe,
        department: Option<&str>,
    ) -> Result<ComplianceMetric> {
        let metric = ComplianceMetric {
            id: format!("met-{}", uuid::Uuid::new_v4()),
            metric_type: "count".to_string(),
            metric_name: name.to_string(),
            value,
            unit: unit.to_string(),
            department: department.map(String::from),
            timeframe,
            metadata: HashMap::new(),
            recorded_at: Utc::now(),
        };
        self.metrics.record(metric.clone()).await?;
        Ok(metric)
    }
}

fn filter_department(incidents: Vec<DlpIncident>, department: Option<&str>) -> Vec<DlpIncident> {
    match department {
        Some(wanted) => incidents
            .into_iter()
            .filter(|i| i.department.as_deref() == Some(wanted))
            .collect(),
        None => incidents,
    }
}

fn severity_rank(severity: IncidentSeverity) -> u8 {
    match severity {
        IncidentSeverity::Critical => 0,
        IncidentSeverity::High => 1,
        IncidentSeverity::Medium => 2,
        IncidentSeverity::Low => 3,
    }
}

/// Group incidents by severity and type, most severe first, with a trend
/// against the same group in the preceding window
fn summarize_violations(
    current: &[DlpIncident],
    previous: &[DlpIncident],
) -> Vec<ViolationSummary> {
    let mut counts: BTreeMap<(u8, String), (IncidentSeverity, usize)> = BTreeMap::new();
    for incident in current {
        let key = (severity_rank(incident.severity), incident.incident_type.clone());
        counts.entry(key).or_insert((incident.severity, 0)).1 += 1;
    }

    let mut prior: HashMap<(IncidentSeverity, String), usize> = HashMap::new();
    for incident in previous {
        *prior
            .entry((incident.severity, incident.incident_type.clone()))
            .or_default() += 1;
    }

    counts
        .into_iter()
        .map(|((_, violation_type), (severity, count))| {
            let before = prior
                .get(&(severity, violation_type.clone()))
                .copied()
                .unwrap_or(0);
            let trend = match count.cmp(&before) {
                Ordering::Greater => Trend::Increasing,
                Ordering::Less => Trend::Decreasing,
                Ordering::Equal => Trend::Stable,
            };
            ViolationSummary {
                severity,
                violation_type,
                count,
                trend,
            }
        })
        .collect()
}
