//! HTML parsing for the series index page and individual articles.
//!
//! Markup parsing is the fragile edge of the system, so it is isolated here
//! behind two narrow operations: an ordered list of article summaries, or an
//! ordered list of typed show entries. Everything downstream works on those
//! types and never touches markup. When the expected structural markers are
//! absent the parser fails with [`MonitorError::Parse`] rather than silently
//! returning nothing; a new article with zero extractable entries means the
//! page changed shape, not that there is no content.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::HashSet;
use tracing::{debug, info, instrument};
use url::Url;

use crate::detector;
use crate::error::{MonitorError, Result};
use crate::models::{ArticleSummary, ShowEntry};
use crate::utils::{normalize_whitespace, truncate_chars};

/// Guardian article paths embed the publish date as `/YYYY/mon/DD/`.
static URL_DATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/(\d{4})/([a-z]{3})/(\d{2})/").unwrap());
static YEAR_SEGMENT_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"/\d{4}/").unwrap());
static NUMBER_PREFIX_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\d+\.\s*").unwrap());
static PICK_PREFIX_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^pick of the week[:\s\u{2013}\u{2014}-]*").unwrap());

/// Known streaming platforms, checked in order against entry text. More
/// specific needles come before their prefixes ("hbo max" before "hbo").
const PLATFORMS: &[(&str, &str)] = &[
    ("netflix", "Netflix"),
    ("amazon prime", "Amazon Prime Video"),
    ("prime video", "Amazon Prime Video"),
    ("disney+", "Disney+"),
    ("disney plus", "Disney+"),
    ("hbo max", "HBO Max"),
    ("hbo", "HBO"),
    ("hulu", "Hulu"),
    ("apple tv", "Apple TV+"),
    ("paramount+", "Paramount+"),
    ("peacock", "Peacock"),
    ("bbc iplayer", "BBC iPlayer"),
    ("iplayer", "BBC iPlayer"),
    ("itv hub", "ITV Hub"),
    ("all 4", "All 4"),
    ("channel 4", "All 4"),
    ("now tv", "NOW TV"),
    ("sky", "Sky"),
    ("britbox", "BritBox"),
    ("youtube", "YouTube"),
    ("crunchyroll", "Crunchyroll"),
];

const FALLBACK_PLATFORM: &str = "Platform not specified";
const MAX_DESCRIPTION_CHARS: usize = 500;
const MAX_DESCRIPTION_PARAGRAPHS: usize = 3;

/// Parse the series index page into article summaries, newest first.
///
/// Relative hrefs are resolved against `base_url`. Fails with
/// [`MonitorError::Parse`] when no series article links are found, which is
/// treated as a layout change rather than an empty week.
#[instrument(level = "info", skip(html))]
pub fn parse_series_index(html: &str, base_url: &Url) -> Result<Vec<ArticleSummary>> {
    let document = Html::parse_document(html);
    let link_selector = Selector::parse("a[href]").unwrap();

    let mut seen = HashSet::new();
    let mut articles = Vec::new();
    for element in document.select(&link_selector) {
        let Some(href) = element.value().attr("href") else {
            continue;
        };
        if !is_series_article(href) {
            continue;
        }
        let Ok(resolved) = base_url.join(href) else {
            continue;
        };
        let Some(published_at) = date_from_path(resolved.path()) else {
            continue;
        };
        let id = detector::article_id(&resolved);
        if !seen.insert(id.clone()) {
            continue;
        }

        let mut title = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
        if title.is_empty() {
            title = format!("The seven best shows to stream this week – {published_at}");
        }

        articles.push(ArticleSummary {
            id,
            title,
            url: resolved.to_string(),
            published_at,
        });
    }

    if articles.is_empty() {
        return Err(MonitorError::Parse(
            "no series article links found on the index page".to_string(),
        ));
    }

    articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
    info!(count = articles.len(), "parsed series index");
    Ok(articles)
}

/// Parse the body of a single article into its ordered show entries.
///
/// An entry without a usable description paragraph is still emitted with an
/// empty description. Zero entries is a [`MonitorError::Parse`]: the article
/// exists, so an empty result means the markup no longer matches.
#[instrument(level = "info", skip(html))]
pub fn parse_show_entries(html: &str) -> Result<Vec<ShowEntry>> {
    let document = Html::parse_document(html);
    let body_selector = Selector::parse(r#"div[data-gu-name="body"], div.article-body"#).unwrap();
    let heading_selector = Selector::parse("h2").unwrap();

    let headings: Vec<ElementRef> = match document.select(&body_selector).next() {
        Some(body) => body.select(&heading_selector).collect(),
        None => document.select(&heading_selector).collect(),
    };

    let mut shows = Vec::new();
    for heading in headings {
        if let Some(entry) = parse_entry_from_heading(&heading, shows.len() + 1) {
            debug!(title = %entry.title, pick = entry.is_pick_of_week, "parsed show entry");
            shows.push(entry);
        }
    }

    if shows.is_empty() {
        return Err(MonitorError::Parse(
            "no show entries found in article body".to_string(),
        ));
    }

    info!(count = shows.len(), "parsed show entries");
    Ok(shows)
}

fn parse_entry_from_heading(heading: &ElementRef, position: usize) -> Option<ShowEntry> {
    let raw = normalize_whitespace(&heading.text().collect::<Vec<_>>().join(" "));
    if is_skip_heading(&raw) {
        return None;
    }

    let unnumbered = NUMBER_PREFIX_RE.replace(&raw, "").to_string();
    let (title, is_pick_of_week) = split_pick_prefix(&unnumbered);
    if title.chars().count() < 3 {
        return None;
    }

    let description = collect_description(heading);
    let platform = detect_platform(&format!("{description} {title}"));

    Some(ShowEntry {
        title,
        platform,
        description,
        is_pick_of_week,
        position,
    })
}

/// Headings that appear between shows but are not shows themselves.
fn is_skip_heading(text: &str) -> bool {
    let lower = text.to_lowercase();
    lower == "pick of the week"
        || lower == "advertisement"
        || lower == "related"
        || lower.starts_with("privacy notice")
        || lower.starts_with("related:")
        || lower.starts_with("more on this story")
        || lower.starts_with("sign up")
}

/// Split a "Pick of the week" prefix off a heading, returning the cleaned
/// title and whether the marker was present.
fn split_pick_prefix(title: &str) -> (String, bool) {
    if let Some(m) = PICK_PREFIX_RE.find(title) {
        if m.end() < title.len() {
            return (title[m.end()..].trim().to_string(), true);
        }
    }
    (title.trim().to_string(), false)
}

/// Gather up to three paragraphs following the heading, stopping at the next
/// heading. Link-only and "Related:" paragraphs are skipped.
fn collect_description(heading: &ElementRef) -> String {
    let mut parts: Vec<String> = Vec::new();
    for sibling in heading.next_siblings() {
        if parts.len() >= MAX_DESCRIPTION_PARAGRAPHS {
            break;
        }
        let Some(element) = ElementRef::wrap(sibling) else {
            continue;
        };
        match element.value().name() {
            "p" => {
                let text = normalize_whitespace(&element.text().collect::<Vec<_>>().join(" "));
                if !text.is_empty()
                    && !text.starts_with("http")
                    && !text.starts_with("www")
                    && !text.starts_with("Related:")
                    && !text.starts_with("More on this story")
                {
                    parts.push(text);
                }
            }
            "h1" | "h2" | "h3" => break,
            _ => {}
        }
    }
    truncate_chars(&parts.join(" "), MAX_DESCRIPTION_CHARS)
}

/// Match entry text against the known-platform table.
pub fn detect_platform(text: &str) -> String {
    let lower = text.to_lowercase();
    for (needle, name) in PLATFORMS {
        if lower.contains(needle) {
            return (*name).to_string();
        }
    }
    FALLBACK_PLATFORM.to_string()
}

fn is_series_article(href: &str) -> bool {
    let lower = href.to_lowercase();
    (lower.contains("seven-best") || lower.contains("best-shows-to-stream"))
        && !lower.contains("/series/")
        && YEAR_SEGMENT_RE.is_match(&lower)
}

/// Extract a `YYYY-MM-DD` date from a Guardian-style URL path.
fn date_from_path(path: &str) -> Option<String> {
    let lower = path.to_lowercase();
    let caps = URL_DATE_RE.captures(&lower)?;
    let month = match &caps[2] {
        "jan" => "01",
        "feb" => "02",
        "mar" => "03",
        "apr" => "04",
        "may" => "05",
        "jun" => "06",
        "jul" => "07",
        "aug" => "08",
        "sep" => "09",
        "oct" => "10",
        "nov" => "11",
        "dec" => "12",
        _ => return None,
    };
    Some(format!("{}-{}-{}", &caps[1], month, &caps[3]))
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX_FIXTURE: &str = r#"
        <html><body>
          <a href="/tv-and-radio/series/the-seven-best-shows-to-stream-this-week">Series home</a>
          <a href="/tv-and-radio/2025/aug/15/the-seven-best-shows-to-stream-this-week">
            <h3>Task, Slow Horses and more</h3>
          </a>
          <a href="/tv-and-radio/2025/aug/08/the-seven-best-shows-to-stream-this-week">
            Older week
          </a>
          <a href="/film/2025/aug/14/some-film-review">Unrelated review</a>
        </body></html>
    "#;

    fn base_url() -> Url {
        Url::parse("https://www.theguardian.com").unwrap()
    }

    #[test]
    fn test_index_articles_newest_first() {
        let articles = parse_series_index(INDEX_FIXTURE, &base_url()).unwrap();
        assert_eq!(articles.len(), 2);
        assert_eq!(articles[0].published_at, "2025-08-15");
        assert_eq!(articles[1].published_at, "2025-08-08");
        assert_eq!(
            articles[0].id,
            "/tv-and-radio/2025/aug/15/the-seven-best-shows-to-stream-this-week"
        );
        assert!(articles[0].url.starts_with("https://www.theguardian.com/"));
        assert_eq!(articles[0].title, "Task, Slow Horses and more");
    }

    #[test]
    fn test_index_skips_series_page_and_unrelated_links() {
        let articles = parse_series_index(INDEX_FIXTURE, &base_url()).unwrap();
        assert!(articles.iter().all(|a| !a.id.contains("/series/")));
        assert!(articles.iter().all(|a| !a.id.contains("film")));
    }

    #[test]
    fn test_index_without_article_links_is_a_parse_error() {
        let html = "<html><body><a href='/about'>About</a></body></html>";
        let err = parse_series_index(html, &base_url()).unwrap_err();
        assert!(matches!(err, MonitorError::Parse(_)));
    }

    #[test]
    fn test_index_dedupes_repeated_links() {
        let html = r#"
            <a href="/tv-and-radio/2025/aug/15/seven-best-shows-to-stream">First</a>
            <a href="/tv-and-radio/2025/aug/15/seven-best-shows-to-stream">Again</a>
        "#;
        let articles = parse_series_index(html, &base_url()).unwrap();
        assert_eq!(articles.len(), 1);
    }

    fn article_fixture() -> String {
        let mut body = String::from(r#"<html><body><div data-gu-name="body">"#);
        for i in 1..=6 {
            body.push_str(&format!(
                "<h2>Show {i}</h2><p>Description {i} on Netflix.</p>"
            ));
        }
        body.push_str("<h2>Pick of the week – The Crown</h2>");
        body.push_str("<p>Royal drama returns, streaming on Netflix.</p>");
        body.push_str("<h2>Privacy Notice: newsletters</h2><p>Boilerplate.</p>");
        body.push_str("</div></body></html>");
        body
    }

    #[test]
    fn test_article_yields_seven_entries_in_order() {
        let shows = parse_show_entries(&article_fixture()).unwrap();
        assert_eq!(shows.len(), 7);
        for (i, show) in shows.iter().enumerate() {
            assert_eq!(show.position, i + 1);
        }
        assert_eq!(shows[0].title, "Show 1");
        assert_eq!(shows[6].title, "The Crown");
    }

    #[test]
    fn test_pick_of_week_flag_and_prefix_stripping() {
        let shows = parse_show_entries(&article_fixture()).unwrap();
        let picks: Vec<_> = shows.iter().filter(|s| s.is_pick_of_week).collect();
        assert_eq!(picks.len(), 1);
        assert_eq!(picks[0].title, "The Crown");
        assert_eq!(picks[0].position, 7);
    }

    #[test]
    fn test_boilerplate_headings_are_skipped() {
        let shows = parse_show_entries(&article_fixture()).unwrap();
        assert!(shows.iter().all(|s| !s.title.contains("Privacy")));
    }

    #[test]
    fn test_entry_without_description_is_emitted_empty() {
        let html = r#"<div data-gu-name="body"><h2>Mystery Show</h2></div>"#;
        let shows = parse_show_entries(html).unwrap();
        assert_eq!(shows.len(), 1);
        assert_eq!(shows[0].description, "");
        assert_eq!(shows[0].platform, "Platform not specified");
    }

    #[test]
    fn test_zero_entries_is_a_parse_error_not_an_empty_list() {
        let html = "<html><body><div data-gu-name='body'><p>Layout changed.</p></div></body></html>";
        let err = parse_show_entries(html).unwrap_err();
        assert!(matches!(err, MonitorError::Parse(_)));
    }

    #[test]
    fn test_numbered_headings_lose_their_prefix() {
        let html = r#"<div data-gu-name="body">
            <h2>1. The Bear</h2><p>Kitchen stress on Disney+.</p>
        </div>"#;
        let shows = parse_show_entries(html).unwrap();
        assert_eq!(shows[0].title, "The Bear");
        assert_eq!(shows[0].platform, "Disney+");
    }

    #[test]
    fn test_description_stops_at_next_heading() {
        let html = r#"<div data-gu-name="body">
            <h2>First</h2><p>Belongs to first.</p>
            <h2>Second</h2><p>Belongs to second.</p>
        </div>"#;
        let shows = parse_show_entries(html).unwrap();
        assert_eq!(shows[0].description, "Belongs to first.");
        assert_eq!(shows[1].description, "Belongs to second.");
    }

    #[test]
    fn test_detect_platform_table() {
        assert_eq!(detect_platform("now on netflix"), "Netflix");
        assert_eq!(detect_platform("an HBO Max original"), "HBO Max");
        assert_eq!(detect_platform("watch on BBC iPlayer tonight"), "BBC iPlayer");
        assert_eq!(detect_platform("nothing recognisable"), "Platform not specified");
    }

    #[test]
    fn test_date_from_path() {
        assert_eq!(
            date_from_path("/tv-and-radio/2025/aug/15/whatever"),
            Some("2025-08-15".to_string())
        );
        assert_eq!(date_from_path("/tv-and-radio/no-date-here"), None);
        assert_eq!(date_from_path("/tv-and-radio/2025/xyz/15/whatever"), None);
    }

    #[test]
    fn test_is_series_article() {
        assert!(is_series_article(
            "/tv-and-radio/2025/aug/15/the-seven-best-shows-to-stream-this-week"
        ));
        assert!(!is_series_article(
            "/tv-and-radio/series/the-seven-best-shows-to-stream-this-week"
        ));
        assert!(!is_series_article("/film/2025/aug/14/some-review"));
        assert!(!is_series_article("/tv-and-radio/seven-best-undated"));
    }
}
