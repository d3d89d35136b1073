//! Checksum and shape validators that refine detection confidence

/// Extract the ASCII digits from a matched span
pub fn digits_of(text: &str) -> String {
    text.chars().filter(|c| c.is_ascii_digit()).collect()
}

/// Luhn checksum over a digit string. Empty or non-digit input fails.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return false;
    }

    let mut sum = 0u32;
    let mut alternate = false;
    for c in digits.chars().rev() {
        let mut d = c.to_digit(10).unwrap_or(0);
        if alternate {
            d *= 2;
            if d > 9 {
                d -= 9;
            }
        }
        sum += d;
        alternate = !alternate;
    }

    sum % 10 == 0
}

/// True for the strict `NNN-NN-NNNN` SSN shape
pub fn strict_ssn_shape(text: &str) -> bool {
    let bytes = text.as_bytes();
    if bytes.len() != 11 {
        return false;
    }
    bytes.iter().enumerate().all(|(i, b)| match i {
        3 | 6 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// True when the address has a dot somewhere in its domain part
pub fn domain_has_dot(email: &str) -> bool {
    email
        .split_once('@')
        .map(|(_, domain)| domain.contains('.'))
        .unwrap_or(false)
}
