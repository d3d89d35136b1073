//! Privacore - Privacy masking and compliance for team messaging
//!
//! Privacore is the privacy core of a messaging platform: it detects and
//! masks sensitive data in message content before it is stored, keeps an
//! encrypted audit trail of what was masked, and runs the compliance
//! machinery around it - DLP incidents, organizational and retention
//! policies, reports and the approval-gated unmasking workflow.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────────┐
//! │                       Host messaging layer                       │
//! │        calls mask_content / process_dlp_violation inline         │
//! └───────────────┬──────────────────────────────────┬───────────────┘
//!                 │                                  │
//! ┌───────────────▼──────────────┐   ┌───────────────▼───────────────┐
//! │       Masking Engine         │   │       Compliance Center       │
//! │  - detection and masks       │   │  - policy lifecycle           │
//! │  - risk scoring and DLP      │   │  - reports and trends         │
//! │  - encrypted audit trail     │   │  - retention sweeps           │
//! │  - anonymous identities      │   │  - unmasking workflow         │
//! └───────────────┬──────────────┘   └───────────────┬───────────────┘
//!                 │                                  │
//! ┌───────────────▼──────────────────────────────────▼───────────────┐
//! │       JSON record stores (profiles, detections, incidents,       │
//! │           policies, notifications, requests, metrics)            │
//! │      + versioned AES-256-GCM key ring for sealed originals       │
//! └──────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Key Properties
//!
//! ### Masking
//! - Deterministic, per-type masks (emails keep their domain, numbers keep
//!   their last four digits)
//! - Confidence-weighted risk scoring, capped at 100
//! - Per-user privacy profiles with a strict default baseline
//!
//! ### Audit and recovery
//! - Every detection stores its original value encrypted, never in plaintext
//! - Original content is reachable only through the approval-gated
//!   unmasking workflow
//! - Anonymous identities seal the real user id inside an encrypted mapping
//!
//! ### Compliance
//! - DLP incidents above configurable risk thresholds
//! - Idempotent retention sweeps with scheduled deletion notices
//! - Windowed reports with violation trends and recommendations
//!
//! ## Modules
//!
//! - [`detect`]: Data types, patterns, validators and mask shapes
//! - [`masking`]: The masking engine, privacy profiles and DLP escalation
//! - [`compliance`]: Policies, reports, retention and unmasking workflow
//! - [`crypto`]: Master keys, the versioned key ring and token generation
//! - [`store`]: JSON-file record collections shared by both sides
//! - [`config`]: Configuration management
//! - [`error`]: The crate-wide error type

pub mod compliance;
pub mod config;
pub mod crypto;
pub mod detect;
pub mod error;
pub mod masking;
pub mod store;

pub use config::PrivacoreConfig;
pub use error::{Error, Result};
