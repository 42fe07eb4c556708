//! Small text helpers shared by the parser and the notifier.

use chrono::NaiveDate;

/// Truncate a string to at most `max` characters, on a char boundary.
pub fn truncate_chars(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        s.chars().take(max).collect()
    }
}

/// Truncate to at most `max` characters, appending `...` when shortened.
pub fn ellipsize(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max.saturating_sub(3)).collect();
        format!("{}...", kept.trim_end())
    }
}

/// Collapse runs of whitespace into single spaces and trim the ends.
pub fn normalize_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Format a `YYYY-MM-DD` date for display, e.g. "August 15, 2025".
///
/// Falls back to the input string when it does not parse.
pub fn format_publish_date(date: &str) -> String {
    NaiveDate::parse_from_str(date, "%Y-%m-%d")
        .map(|d| d.format("%B %d, %Y").to_string())
        .unwrap_or_else(|_| date.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_chars_short_string() {
        assert_eq!(truncate_chars("short", 100), "short");
    }

    #[test]
    fn test_truncate_chars_multibyte() {
        // Must cut on char boundaries, not bytes.
        let s = "sévérance".repeat(100);
        let out = truncate_chars(&s, 10);
        assert_eq!(out.chars().count(), 10);
    }

    #[test]
    fn test_ellipsize() {
        assert_eq!(ellipsize("short", 150), "short");
        let long = "a".repeat(200);
        let out = ellipsize(&long, 150);
        assert!(out.ends_with("..."));
        assert_eq!(out.chars().count(), 150);
    }

    #[test]
    fn test_normalize_whitespace() {
        assert_eq!(normalize_whitespace("  a \n b\t c  "), "a b c");
        assert_eq!(normalize_whitespace(""), "");
    }

    #[test]
    fn test_format_publish_date() {
        assert_eq!(format_publish_date("2025-08-15"), "August 15, 2025");
        assert_eq!(format_publish_date("not-a-date"), "not-a-date");
    }
}
