//! Sensitive-data detection
//!
//! Compiled regex detectors with per-type risk weights, confidence scoring,
//! and the deterministic mask shapes applied by the masking engine. The
//! detector table, weights, and confidence constants live here as plain data
//! so they can be reviewed and tuned in one place.

mod patterns;
mod validators;

pub use patterns::{confidence_for, mask_spans, mask_value, Detector, DetectorSet, PatternMatch};
pub use validators::{digits_of, domain_has_dot, luhn_valid, strict_ssn_shape};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Category of sensitive data a detector can find
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Email,
    Phone,
    Ssn,
    CreditCard,
    IpAddress,
    Financial,
    Phi,
    Pii,
}

impl DataType {
    /// Weight of this type in the risk score. Risk is the sum of
    /// `weight * confidence / 100` over all detections, capped at 100.
    pub fn risk_weight(&self) -> u8 {
        match self {
            DataType::Phi => 25,
            DataType::Ssn => 20,
            DataType::CreditCard => 20,
            DataType::Financial => 15,
            DataType::Pii => 10,
            DataType::Email => 5,
            DataType::Phone => 5,
            DataType::IpAddress => 3,
        }
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DataType::Email => "email",
            DataType::Phone => "phone",
            DataType::Ssn => "ssn",
            DataType::CreditCard => "credit_card",
            DataType::IpAddress => "ip_address",
            DataType::Financial => "financial",
            DataType::Phi => "phi",
            DataType::Pii => "pii",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for DataType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "email" => Ok(DataType::Email),
            "phone" => Ok(DataType::Phone),
            "ssn" => Ok(DataType::Ssn),
            "credit_card" => Ok(DataType::CreditCard),
            "ip_address" => Ok(DataType::IpAddress),
            "financial" => Ok(DataType::Financial),
            "phi" => Ok(DataType::Phi),
            "pii" => Ok(DataType::Pii),
            other => Err(format!("unknown data type: {}", other)),
        }
    }
}
