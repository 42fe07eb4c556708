//! Change detection: decides whether the newest article has been seen.
//!
//! Identity is the canonical URL path, never the headline. Titles get edited
//! after publication; the path does not. False negatives from URL redirects
//! are accepted and out of scope.

use url::Url;

/// Result of comparing the newest article against the processed ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Detection {
    New,
    AlreadySeen,
}

/// Derive the canonical article id from a URL: the lowercased path with any
/// trailing slash stripped. Query strings and fragments never participate.
pub fn article_id(url: &Url) -> String {
    let path = url.path().trim_end_matches('/');
    path.to_ascii_lowercase()
}

/// Compare the newest article id against the processed-articles ledger.
pub fn detect(processed_ids: &[String], id: &str) -> Detection {
    if processed_ids.iter().any(|p| p == id) {
        Detection::AlreadySeen
    } else {
        Detection::New
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_article_id_ignores_query_and_fragment() {
        let a = Url::parse("https://www.theguardian.com/tv-and-radio/2025/aug/15/picks?src=rss")
            .unwrap();
        let b =
            Url::parse("https://www.theguardian.com/tv-and-radio/2025/aug/15/picks#top").unwrap();
        assert_eq!(article_id(&a), article_id(&b));
        assert_eq!(article_id(&a), "/tv-and-radio/2025/aug/15/picks");
    }

    #[test]
    fn test_article_id_normalizes_trailing_slash_and_case() {
        let a = Url::parse("https://example.com/TV-And-Radio/2025/aug/15/Picks/").unwrap();
        assert_eq!(article_id(&a), "/tv-and-radio/2025/aug/15/picks");
    }

    #[test]
    fn test_detect_new_and_already_seen() {
        let ledger = vec![
            "/tv-and-radio/2025/aug/08/older".to_string(),
            "/tv-and-radio/2025/aug/15/newest".to_string(),
        ];
        assert_eq!(
            detect(&ledger, "/tv-and-radio/2025/aug/15/newest"),
            Detection::AlreadySeen
        );
        assert_eq!(
            detect(&ledger, "/tv-and-radio/2025/aug/22/fresh"),
            Detection::New
        );
        assert_eq!(detect(&[], "/anything"), Detection::New);
    }
}
