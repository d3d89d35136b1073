//! Compliance data model
//!
//! Policies, retention artifacts, the unmasking workflow, metrics and the
//! report shapes produced for administrative surfaces. Everything here is
//! plain data; behavior lives in the stores and the center.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::masking::IncidentSeverity;

// ============================================================================
// Organizational policies
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicyType {
    Masking,
    Retention,
    Dlp,
}

impl fmt::Display for PolicyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PolicyType::Masking => write!(f, "masking"),
            PolicyType::Retention => write!(f, "retention"),
            PolicyType::Dlp => write!(f, "dlp"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PolicySeverity {
    Low,
    Medium,
    High,
    Critical,
}

impl Default for PolicySeverity {
    fn default() -> Self {
        PolicySeverity::Medium
    }
}

/// Knobs carried by a policy; which ones apply depends on the policy type
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RuleConfiguration {
    #[serde(default)]
    pub masking_level: Option<String>,
    #[serde(default)]
    pub retention_days: Option<u32>,
    #[serde(default)]
    pub auto_enforce: Option<bool>,
    #[serde(default)]
    pub alert_threshold: Option<f64>,
}

/// Input shape for policy creation
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyRule {
    pub name: String,
    #[serde(rename = "type")]
    pub policy_type: PolicyType,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub user_roles: Vec<String>,
    #[serde(default)]
    pub configuration: RuleConfiguration,
}

/// A stored policy. Policies are deactivated, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrganizationalPolicy {
    pub id: String,
    pub policy_name: String,
    pub policy_type: PolicyType,
    pub rule_configuration: RuleConfiguration,
    #[serde(default)]
    pub departments: Vec<String>,
    #[serde(default)]
    pub user_roles: Vec<String>,
    #[serde(default)]
    pub severity: PolicySeverity,
    #[serde(default = "default_true")]
    pub is_active: bool,
    #[serde(default = "default_true")]
    pub auto_enforce: bool,
    #[serde(default)]
    pub requires_approval: bool,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_true() -> bool {
    true
}

fn default_notify_days() -> u32 {
    30
}

// ============================================================================
// Retention
// ============================================================================

/// How long messages of a given classification may be kept
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionPolicy {
    pub id: String,
    pub policy_name: String,
    pub retention_period_days: u32,
    /// When set, the policy only applies to messages with this classification
    #[serde(default)]
    pub message_classification: Option<String>,
    #[serde(default = "default_notify_days")]
    pub notify_before_expiry_days: u32,
    #[serde(default = "default_true")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Sent,
    Executed,
}

/// Scheduled deletion notice for one message under one policy.
/// At most one exists per (policy, message) pair; the store enforces it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RetentionNotification {
    pub id: String,
    pub policy_id: String,
    pub message_id: String,
    pub notification_type: String,
    pub scheduled_deletion: DateTime<Utc>,
    pub notified_users: Vec<String>,
    pub status: NotificationStatus,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Unmasking workflow
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UrgencyLevel {
    Emergency,
    Urgent,
    Standard,
    Routine,
}

impl fmt::Display for UrgencyLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UrgencyLevel::Emergency => write!(f, "emergency"),
            UrgencyLevel::Urgent => write!(f, "urgent"),
            UrgencyLevel::Standard => write!(f, "standard"),
            UrgencyLevel::Routine => write!(f, "routine"),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
    Expired,
}

/// One append-only audit trail entry
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct AuditEntry {
    pub action: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    #[serde(default)]
    pub details: Option<String>,
}

/// A request to reveal original content, gated by human approval.
///
/// Pending requests move to Approved, Rejected or Expired; those states are
/// terminal. Every transition appends to `audit_trail` and never rewrites
/// prior entries.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnmaskingRequest {
    pub id: String,
    pub requester_id: String,
    pub target_message_id: String,
    pub request_type: String,
    pub legal_justification: String,
    pub urgency: UrgencyLevel,
    pub status: RequestStatus,
    #[serde(default)]
    pub approved_by: Option<String>,
    pub audit_trail: Vec<AuditEntry>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// Metrics and reports
// ============================================================================

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Timeframe {
    Daily,
    Weekly,
    Monthly,
    Quarterly,
}

/// Append-only metric sample; readers aggregate on demand
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceMetric {
    pub id: String,
    pub metric_type: String,
    pub metric_name: String,
    pub value: f64,
    pub unit: String,
    #[serde(default)]
    pub department: Option<String>,
    pub timeframe: Timeframe,
    #[serde(default)]
    pub metadata: HashMap<String, String>,
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Increasing,
    Decreasing,
    Stable,
}

/// One severity/type group of DLP incidents in a report window
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ViolationSummary {
    pub severity: IncidentSeverity,
    pub violation_type: String,
    pub count: usize,
    /// Compared against the preceding window of equal length
    pub trend: Trend,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComplianceReport {
    pub period_start: DateTime<Utc>,
    pub period_end: DateTime<Utc>,
    #[serde(default)]
    pub department: Option<String>,
    pub total_messages: usize,
    pub masked_detections: usize,
    pub dlp_violations: usize,
    pub retention_items_due: usize,
    pub unmasking_requests: usize,
    pub violations: Vec<ViolationSummary>,
    pub recommendations: Vec<String>,
    pub generated_at: DateTime<Utc>,
}

/// Grouped view of DLP incidents for a window
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DlpIncidentSummary {
    pub total: usize,
    pub by_severity: HashMap<String, usize>,
    pub by_type: HashMap<String, usize>,
    /// Up to five types, most frequent first
    pub top_violation_types: Vec<(String, usize)>,
    pub resolution_rate: f64,
}

/// The host's message table as seen by this crate: enough to count, match
/// retention policies and notify owners
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRecord {
    pub id: String,
    pub user_id: String,
    #[serde(default)]
    pub classification: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_rule_wire_shape() {
        let json = r#"{
            "name": "Strict retention",
            "type": "retention",
            "departments": ["legal"],
            "configuration": { "retentionDays": 90 }
        }"#;
        let rule: PolicyRule = serde_json::from_str(json).unwrap();
        assert_eq!(rule.policy_type, PolicyType::Retention);
        assert_eq!(rule.departments, vec!["legal"]);
        assert!(rule.user_roles.is_empty());
        assert_eq!(rule.configuration.retention_days, Some(90));
        assert_eq!(rule.configuration.auto_enforce, None);
    }

    #[test]
    fn test_policy_severity_defaults_to_medium() {
        assert_eq!(PolicySeverity::default(), PolicySeverity::Medium);
    }

    #[test]
    fn test_policy_serializes_camel_case() {
        let now = Utc::now();
        let policy = OrganizationalPolicy {
            id: "pol-1".to_string(),
            policy_name: "DLP baseline".to_string(),
            policy_type: PolicyType::Dlp,
            rule_configuration: RuleConfiguration::default(),
            departments: vec![],
            user_roles: vec![],
            severity: PolicySeverity::Medium,
            is_active: true,
            auto_enforce: true,
            requires_approval: false,
            created_by: "admin".to_string(),
            created_at: now,
            updated_at: now,
        };
        let json = serde_json::to_string(&policy).unwrap();
        assert!(json.contains("\"policyName\""));
        assert!(json.contains("\"policyType\":\"dlp\""));
        assert!(json.contains("\"requiresApproval\":false"));
    }

    #[test]
    fn test_retention_policy_defaults() {
        let json = r#"{
            "id": "ret-1",
            "policyName": "Default retention",
            "retentionPeriodDays": 365,
            "createdAt": "2026-01-01T00:00:00Z"
        }"#;
        let policy: RetentionPolicy = serde_json::from_str(json).unwrap();
        assert_eq!(policy.notify_before_expiry_days, 30);
        assert!(policy.is_active);
        assert_eq!(policy.message_classification, None);
    }

    #[test]
    fn test_audit_trail_order_survives_serde() {
        let now = Utc::now();
        let request = UnmaskingRequest {
            id: "req-1".to_string(),
            requester_id: "u-1".to_string(),
            target_message_id: "m-1".to_string(),
            request_type: "legal_hold".to_string(),
            legal_justification: "subpoena".to_string(),
            urgency: UrgencyLevel::Urgent,
            status: RequestStatus::Approved,
            approved_by: Some("u-2".to_string()),
            audit_trail: vec![
                AuditEntry {
                    action: "request_created".to_string(),
                    timestamp: now,
                    user_id: "u-1".to_string(),
                    details: None,
                },
                AuditEntry {
                    action: "request_approved".to_string(),
                    timestamp: now,
                    user_id: "u-2".to_string(),
                    details: Some("verified".to_string()),
                },
            ],
            created_at: now,
            expires_at: now,
        };
        let json = serde_json::to_string(&request).unwrap();
        let back: UnmaskingRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back.audit_trail.len(), 2);
        assert_eq!(back.audit_trail[0].action, "request_created");
        assert_eq!(back.audit_trail[1].action, "request_approved");
    }

    #[test]
    fn test_metric_metadata_defaults_empty() {
        let json = r#"{
            "id": "met-1",
            "metricType": "count",
            "metricName": "policy_created",
            "value": 1.0,
            "unit": "count",
            "timeframe": "daily",
            "recordedAt": "2026-01-01T00:00:00Z"
        }"#;
        let metric: ComplianceMetric = serde_json::from_str(json).unwrap();
        assert!(metric.metadata.is_empty());
        assert_eq!(metric.timeframe, Timeframe::Daily);
        assert_eq!(metric.department, None);
    }
}
