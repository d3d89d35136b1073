//! Detector table, confidence scoring, and mask shapes

use super::validators::{digits_of, domain_has_dot, luhn_valid, strict_ssn_shape};
use super::DataType;
use crate::error::{Error, Result};
use regex::Regex;

/// Base confidence for any pattern match
pub const BASE_CONFIDENCE: u8 = 85;
/// Email whose domain contains a dot
pub const EMAIL_DOMAIN_CONFIDENCE: u8 = 95;
/// SSN in the strict `NNN-NN-NNNN` shape
pub const SSN_STRICT_CONFIDENCE: u8 = 98;
/// Credit card passing the Luhn checksum
pub const CARD_LUHN_CONFIDENCE: u8 = 97;
/// Health-information patterns
pub const PHI_CONFIDENCE: u8 = 90;

/// Longest mask emitted for types without a structural mask shape
const GENERIC_MASK_MAX: usize = 8;

/// Detection patterns in discovery order: matching walks this table top to
/// bottom and left to right within each pattern, and that order is visible
/// in masking results.
const STANDARD_PATTERNS: &[(DataType, &str)] = &[
    (
        DataType::Email,
        r"[A-Za-z0-9._%+-]+@[A-Za-z0-9-]+(?:\.[A-Za-z0-9-]+)*",
    ),
    (
        DataType::Phone,
        r"(?:\+1[-.\s]?)?\(?\b\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}\b",
    ),
    (DataType::Ssn, r"\b\d{3}[-\s]?\d{2}[-\s]?\d{4}\b"),
    (DataType::CreditCard, r"\b(?:\d{4}[-\s]?){3}\d{4}\b"),
    (
        DataType::IpAddress,
        r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\b",
    ),
    (
        DataType::Financial,
        r"(?i)\b(?:account|acct|routing|iban)\s*(?:number|no|num)?\s*[:#]?\s*\d{6,17}\b",
    ),
    (
        DataType::Phi,
        r"(?i)\b(?:mrn|medical\s+record(?:\s+number)?)\s*[:#]?\s*\d{6,10}\b",
    ),
    (DataType::Phi, r"\b[A-TV-Z]\d{2}\.\d{1,4}\b"),
    (
        DataType::Phi,
        r"(?i)\b(?:prescribed|prescription|taking|dosage|rx)\s*:?\s*\w+\s+\d+\s*(?:mg|ml|mcg|units?)\b",
    ),
    (
        DataType::Pii,
        r"(?i)\bpassport\s*(?:number|no)?\s*[:#]?\s*[A-Z0-9]{6,9}\b",
    ),
    (
        DataType::Pii,
        r"(?i)\b(?:date\s+of\s+birth|dob|born(?:\s+on)?)\s*[:#]?\s*\d{1,2}[/-]\d{1,2}[/-]\d{2,4}\b",
    ),
];

/// A compiled detection pattern
pub struct Detector {
    pub data_type: DataType,
    pub pattern: Regex,
}

/// One span of sensitive data found in content. Offsets are byte positions
/// into the original content.
#[derive(Debug, Clone)]
pub struct PatternMatch {
    pub data_type: DataType,
    pub start: usize,
    pub end: usize,
    pub text: String,
}

/// The compiled detector table
pub struct DetectorSet {
    detectors: Vec<Detector>,
}

impl DetectorSet {
    /// Compile the standard detector table
    pub fn standard() -> Result<Self> {
        let mut detectors = Vec::with_capacity(STANDARD_PATTERNS.len());
        for (data_type, pattern) in STANDARD_PATTERNS {
            let compiled = Regex::new(pattern).map_err(|e| {
                Error::Validation(format!("Invalid detection pattern for {}: {}", data_type, e))
            })?;
            detectors.push(Detector {
                data_type: *data_type,
                pattern: compiled,
            });
        }
        Ok(Self { detectors })
    }

    /// Compiled detectors in discovery order
    pub fn detectors(&self) -> &[Detector] {
        &self.detectors
    }

    /// Find all matches for enabled types, in discovery order. A match whose
    /// span overlaps one found earlier is dropped; with per-type replacement
    /// the earlier mask would have destroyed the later pattern anyway.
    pub fn find_matches<F>(&self, content: &str, enabled: F) -> Vec<PatternMatch>
    where
        F: Fn(DataType) -> bool,
    {
        let mut found: Vec<PatternMatch> = Vec::new();
        for detector in &self.detectors {
            if !enabled(detector.data_type) {
                continue;
            }
            for m in detector.pattern.find_iter(content) {
                let overlaps = found
                    .iter()
                    .any(|f| m.start() < f.end && f.start < m.end());
                if overlaps {
                    continue;
                }
                found.push(PatternMatch {
                    data_type: detector.data_type,
                    start: m.start(),
                    end: m.end(),
                    text: m.as_str().to_string(),
                });
            }
        }
        found
    }
}

/// Confidence assigned to a match, refined by shape and checksum validators
pub fn confidence_for(data_type: DataType, text: &str) -> u8 {
    match data_type {
        DataType::Email if domain_has_dot(text) => EMAIL_DOMAIN_CONFIDENCE,
        DataType::Ssn if strict_ssn_shape(text) => SSN_STRICT_CONFIDENCE,
        DataType::CreditCard if luhn_valid(&digits_of(text)) => CARD_LUHN_CONFIDENCE,
        DataType::Phi => PHI_CONFIDENCE,
        _ => BASE_CONFIDENCE,
    }
}

/// Deterministic mask for a matched span. Equal inputs produce equal masks.
pub fn mask_value(data_type: DataType, text: &str) -> String {
    match data_type {
        DataType::Email => mask_email(text),
        DataType::Phone | DataType::CreditCard => mask_keep_last_digits(text, 4),
        DataType::Ssn => mask_ssn(text),
        DataType::IpAddress => mask_ip(text),
        DataType::Financial => text
            .chars()
            .map(|c| if c.is_ascii_digit() { '*' } else { c })
            .collect(),
        DataType::Phi | DataType::Pii => generic_mask(text),
    }
}

/// Replace spans in `content`, right to left so byte offsets into the
/// original stay valid. Spans must not overlap.
pub fn mask_spans(content: &str, spans: &[(usize, usize, String)]) -> String {
    let mut ordered: Vec<&(usize, usize, String)> = spans.iter().collect();
    ordered.sort_by(|a, b| b.0.cmp(&a.0));

    let mut result = content.to_string();
    for (start, end, replacement) in ordered {
        result.replace_range(*start..*end, replacement);
    }
    result
}

fn mask_email(text: &str) -> String {
    match text.split_once('@') {
        Some((local, domain)) => match local.chars().next() {
            Some(first) => format!("{}***@{}", first, domain),
            None => generic_mask(text),
        },
        None => generic_mask(text),
    }
}

fn mask_keep_last_digits(text: &str, keep: usize) -> String {
    let total = text.chars().filter(|c| c.is_ascii_digit()).count();
    let masked_count = total.saturating_sub(keep);
    let mut seen = 0;
    text.chars()
        .map(|c| {
            if c.is_ascii_digit() {
                seen += 1;
                if seen <= masked_count {
                    '*'
                } else {
                    c
                }
            } else {
                c
            }
        })
        .collect()
}

fn mask_ssn(text: &str) -> String {
    let digits = digits_of(text);
    if digits.len() < 4 {
        return generic_mask(text);
    }
    format!("***-**-{}", &digits[digits.len() - 4..])
}

fn mask_ip(text: &str) -> String {
    let octets: Vec<&str> = text.split('.').collect();
    if octets.len() != 4 {
        return generic_mask(text);
    }
    format!("{}.*.*.{}", octets[0], octets[3])
}

fn generic_mask(text: &str) -> String {
    "*".repeat(text.chars().count().min(GENERIC_MASK_MAX))
}
