//! Form-level checks shared by signup, tenant intake and notification
//! delivery.

use std::sync::LazyLock;

use regex::Regex;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9._%+\-]+@[A-Za-z0-9\-]+(\.[A-Za-z0-9\-]+)*\.[A-Za-z]{2,}$")
        .expect("email regex is valid")
});

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email.trim())
}

/// Strip spaces, dashes and parentheses; keep a leading `+`.
pub fn normalize_contact_number(raw: &str) -> String {
    let trimmed = raw.trim();
    let mut out = String::with_capacity(trimmed.len());
    for (i, c) in trimmed.chars().enumerate() {
        if c.is_ascii_digit() || (i == 0 && c == '+') {
            out.push(c);
        }
    }
    out
}

/// 7 to 15 digits, optionally prefixed with `+`, after normalization.
pub fn is_valid_contact_number(raw: &str) -> bool {
    if raw
        .trim()
        .chars()
        .any(|c| !(c.is_ascii_digit() || matches!(c, '+' | ' ' | '-' | '(' | ')')))
    {
        return false;
    }
    let normalized = normalize_contact_number(raw);
    let digits = normalized.trim_start_matches('+').len();
    (7..=15).contains(&digits)
}

/// Returns the trimmed value, or `None` when it is blank.
pub fn non_blank(value: &str) -> Option<&str> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then_some(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_emails() {
        assert!(is_valid_email("juan.dela.cruz@example.com"));
        assert!(is_valid_email("  tenant+1@mail.example.ph "));
    }

    #[test]
    fn rejects_malformed_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("no-at-sign.com"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("two@@example.com"));
    }

    #[test]
    fn contact_numbers() {
        assert!(is_valid_contact_number("0917 123 4567"));
        assert!(is_valid_contact_number("+63-917-123-4567"));
        assert!(!is_valid_contact_number("12345"));
        assert!(!is_valid_contact_number("call me"));
        assert_eq!(normalize_contact_number("(02) 8123-4567"), "0281234567");
    }

    #[test]
    fn blank_values() {
        assert_eq!(non_blank("  Ana "), Some("Ana"));
        assert_eq!(non_blank("   "), None);
    }
}
