use validator::ValidateEmail;

/// Validates that the input looks like a valid email address.
pub fn is_valid_email(email: &str) -> bool {
    let email = email.trim();
    !email.is_empty() && email.validate_email()
}

/// Validates a mailbox local part.
/// Rules:
/// - 1-64 characters
/// - ASCII letters, digits, dot, hyphen, underscore, plus
/// - Must not start or end with a dot
pub fn is_valid_local_part(local_part: &str) -> bool {
    if local_part.is_empty() || local_part.len() > 64 {
        return false;
    }

    if local_part.starts_with('.') || local_part.ends_with('.') {
        return false;
    }

    local_part
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_' | '+'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn valid_emails() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("user.name@domain.co.uk"));
        assert!(is_valid_email("user+tag@example.org"));
    }

    #[test]
    fn invalid_emails() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("   "));
        assert!(!is_valid_email("notanemail"));
        assert!(!is_valid_email("@nodomain.com"));
        assert!(!is_valid_email("spaces in@email.com"));
    }

    #[test]
    fn valid_local_parts() {
        assert!(is_valid_local_part("alice"));
        assert!(is_valid_local_part("alice.w"));
        assert!(is_valid_local_part("alice-w"));
        assert!(is_valid_local_part("alice_w+work"));
        assert!(is_valid_local_part("a"));
    }

    #[test]
    fn invalid_local_parts() {
        assert!(!is_valid_local_part(""));
        assert!(!is_valid_local_part(".alice"));
        assert!(!is_valid_local_part("alice."));
        assert!(!is_valid_local_part("alice w"));
        assert!(!is_valid_local_part("alice@home"));
        assert!(!is_valid_local_part(&"a".repeat(65)));
    }
}
