//! Compliance center
//!
//! The administrative half of the crate. Includes:
//! - Organizational policy lifecycle (create, deactivate)
//! - Compliance reports with violation trends and recommendations
//! - Idempotent retention sweeps producing deletion notifications
//! - The approval-gated unmasking request workflow with audit trails
//! - Append-only compliance metrics

mod center;
mod store;
mod types;

pub use center::ComplianceCenter;
pub use store::{MessageStore, MetricStore, PolicyStore, RequestStore, RetentionStore};
pub use types::{
    AuditEntry, ComplianceMetric, ComplianceReport, DlpIncidentSummary, MessageRecord,
    NotificationStatus, OrganizationalPolicy, PolicyRule, PolicySeverity, PolicyType,
    RequestStatus, RetentionNotification, RetentionPolicy, RuleConfiguration, Timeframe, Trend,
    UnmaskingRequest, UrgencyLevel, ViolationSummary,
};
