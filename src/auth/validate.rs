use lazy_static::lazy_static;
use regex::Regex;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

/// Minimum password policy: 8+ characters with at least one letter
/// and one digit.
pub(crate) fn password_meets_policy(password: &str) -> bool {
    password.len() >= 8
        && password.chars().any(|c| c.is_ascii_alphabetic())
        && password.chars().any(|c| c.is_ascii_digit())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_plain_addresses() {
        assert!(is_valid_email("jane@x.com"));
        assert!(is_valid_email("jane.doe+tag@sub.example.org"));
    }

    #[test]
    fn rejects_malformed_addresses() {
        assert!(!is_valid_email("not-an-email"));
        assert!(!is_valid_email("two@@example.com"));
        assert!(!is_valid_email("spaces in@example.com"));
        assert!(!is_valid_email("missing@tld"));
    }

    #[test]
    fn password_policy_floor() {
        assert!(password_meets_policy("Secret123!"));
        assert!(password_meets_policy("abcdefg1"));
        assert!(!password_meets_policy(""));
        assert!(!password_meets_policy("short1"));
        assert!(!password_meets_policy("onlyletters"));
        assert!(!password_meets_policy("12345678"));
    }
}
