//! Syntactic checks run before anything is handed to `signal-cli`.

use crate::{domain::Destination, errors::Error, Result};

const PHONE_MIN_LEN: usize = 8;
const PHONE_MAX_LEN: usize = 20;
const IDENTIFIER_MAX_LEN: usize = 100;

/// `+` followed by digits only, 8..=20 characters in total.
///
/// No E.164 correctness beyond that.
pub fn is_valid_phone_number(s: &str) -> bool {
    if !(PHONE_MIN_LEN..=PHONE_MAX_LEN).contains(&s.len()) {
        return false;
    }
    let Some(digits) = s.strip_prefix('+') else {
        return false;
    };
    digits.bytes().all(|b| b.is_ascii_digit())
}

/// 1..=100 characters from the base64 / base64url alphabets plus `=` padding.
pub fn is_valid_identifier(s: &str) -> bool {
    if s.is_empty() || s.len() > IDENTIFIER_MAX_LEN {
        return false;
    }
    s.bytes()
        .all(|b| b.is_ascii_alphanumeric() || matches!(b, b'-' | b'_' | b'=' | b'+' | b'/'))
}

/// Redact a phone number for logs, keeping the last four characters.
pub fn mask_phone_number(s: &str) -> String {
    let n = s.chars().count();
    if n <= 4 {
        return "****".to_string();
    }
    let tail: String = s.chars().skip(n - 4).collect();
    format!("****{tail}")
}

/// Reject destinations that must never reach a `signal-cli` argument list.
pub fn validate_destination(dest: &Destination) -> Result<()> {
    match dest {
        Destination::Group(id) if !is_valid_identifier(id) => Err(Error::InvalidDestination {
            kind: "group id",
            value: id.clone(),
        }),
        Destination::Direct(number) if !is_valid_phone_number(number) => {
            Err(Error::InvalidDestination {
                kind: "recipient",
                value: mask_phone_number(number),
            })
        }
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phone_numbers_accept_plus_and_digits_within_bounds() {
        assert!(is_valid_phone_number("+1234567"));
        assert!(is_valid_phone_number("+15551234567"));
        assert!(is_valid_phone_number(&format!("+{}", "9".repeat(19))));
    }

    #[test]
    fn phone_numbers_reject_each_violation() {
        // too short / too long
        assert!(!is_valid_phone_number("+123456"));
        assert!(!is_valid_phone_number(&format!("+{}", "9".repeat(20))));
        // wrong leading character
        assert!(!is_valid_phone_number("015551234567"));
        assert!(!is_valid_phone_number("15551234567"));
        // non-digit
        assert!(!is_valid_phone_number("+1555123456a"));
        assert!(!is_valid_phone_number("+1555 123 4567"));
        assert!(!is_valid_phone_number("+1555+1234567"));
        assert!(!is_valid_phone_number(""));
    }

    #[test]
    fn identifiers_accept_base64_alphabets() {
        assert!(is_valid_identifier("a"));
        assert!(is_valid_identifier("Zm9vYmFyYmF6cXV4Cg=="));
        assert!(is_valid_identifier("ab-_=+/09XY"));
        assert!(is_valid_identifier(&"x".repeat(100)));
    }

    #[test]
    fn identifiers_reject_empty_oversize_and_foreign_chars() {
        assert!(!is_valid_identifier(""));
        assert!(!is_valid_identifier(&"x".repeat(101)));
        assert!(!is_valid_identifier("group id"));
        assert!(!is_valid_identifier("abc;rm"));
        assert!(!is_valid_identifier("gr\u{fc}ppe"));
    }

    #[test]
    fn masking_keeps_last_four() {
        assert_eq!(mask_phone_number("+15551234567"), "****4567");
        assert_eq!(mask_phone_number("abcd"), "****");
        assert_eq!(mask_phone_number(""), "****");
        assert_eq!(mask_phone_number("12345"), "****2345");
    }

    #[test]
    fn destination_validation_names_the_kind() {
        assert!(validate_destination(&Destination::Group("abc=".into())).is_ok());
        assert!(validate_destination(&Destination::Direct("+15551234567".into())).is_ok());

        let err = validate_destination(&Destination::Group("bad group".into())).unwrap_err();
        assert!(matches!(err, Error::InvalidDestination { kind: "group id", .. }));

        let err = validate_destination(&Destination::Direct("5551234567".into())).unwrap_err();
        match err {
            Error::InvalidDestination { kind, value } => {
                assert_eq!(kind, "recipient");
                assert_eq!(value, "****4567");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
