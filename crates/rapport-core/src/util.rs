//! Shared utility functions used across multiple modules.

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Normalize an email address for identity matching.
///
/// Emails compare case-insensitively, so the lowercase trimmed form is used.
pub fn normalize_email(value: Option<&str>) -> Option<String> {
    normalize_text_option(value.map(str::to_string)).map(|email| email.to_lowercase())
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Parse an RFC 3339 timestamp into Unix milliseconds.
pub fn parse_rfc3339_millis(value: &str) -> Option<i64> {
    chrono::DateTime::parse_from_rfc3339(value.trim())
        .ok()
        .map(|date_time| date_time.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_text_option_rejects_empty() {
        assert_eq!(normalize_text_option(None), None);
        assert_eq!(normalize_text_option(Some("   ".to_string())), None);
    }

    #[test]
    fn normalize_text_option_trims_value() {
        assert_eq!(
            normalize_text_option(Some(" Jane ".to_string())),
            Some("Jane".to_string())
        );
    }

    #[test]
    fn normalize_email_lowercases_and_trims() {
        assert_eq!(
            normalize_email(Some("  J@X.com ")),
            Some("j@x.com".to_string())
        );
        assert_eq!(normalize_email(Some(" ")), None);
        assert_eq!(normalize_email(None), None);
    }

    #[test]
    fn parse_rfc3339_millis_accepts_offsets() {
        assert_eq!(parse_rfc3339_millis("1970-01-01T00:00:01Z"), Some(1000));
        assert_eq!(
            parse_rfc3339_millis("1970-01-01T01:00:01+01:00"),
            Some(1000)
        );
        assert_eq!(parse_rfc3339_millis("yesterday"), None);
    }
}
