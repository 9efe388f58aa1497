//! Input validation for call placement

use once_cell::sync::Lazy;
use regex::Regex;

// E.164: a leading + followed by 10 to 15 digits.
static PHONE_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+[0-9]{10,15}$").unwrap());

/// Validate an E.164-formatted phone number.
pub fn is_valid_phone_number(value: &str) -> bool {
    PHONE_REGEX.is_match(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_e164_numbers() {
        assert!(is_valid_phone_number("+15551234567"));
        assert!(is_valid_phone_number("+442071838750"));
        assert!(is_valid_phone_number("+123456789012345"));
    }

    #[test]
    fn rejects_malformed_numbers() {
        assert!(!is_valid_phone_number("15551234567")); // no plus
        assert!(!is_valid_phone_number("+1555123")); // too short
        assert!(!is_valid_phone_number("+1234567890123456")); // too long
        assert!(!is_valid_phone_number("+1555123456a"));
        assert!(!is_valid_phone_number("+1 555 123 4567"));
        assert!(!is_valid_phone_number(""));
    }
}
