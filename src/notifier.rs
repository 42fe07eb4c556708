//! Webhook notifications for new show recommendations.
//!
//! Messages are Discord-style embeds: one field per show, with a star marker
//! on the pick of the week. Delivery is fire-and-forget from the pipeline's
//! point of view: a failed POST is logged by the caller but never rolls back
//! the archive append that already happened.

use std::time::Duration;

use chrono::Utc;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument};

use crate::config::Config;
use crate::error::{MonitorError, Result};
use crate::models::{Article, ShowEntry};
use crate::utils::{ellipsize, format_publish_date};

const EMBED_COLOR_NEW_SHOWS: u32 = 0x052962;
const EMBED_COLOR_ERROR: u32 = 0xff0000;
const EMBED_COLOR_TEST: u32 = 0x00ff00;
const FOOTER_TEXT: &str = "Seven Shows Monitor";
/// A week has seven shows; anything beyond that would blow past embed limits.
const MAX_SHOWS_PER_EMBED: usize = 7;
const MAX_FIELD_DESCRIPTION_CHARS: usize = 150;

#[derive(Debug, Serialize)]
struct WebhookPayload {
    embeds: Vec<Embed>,
}

#[derive(Debug, Serialize)]
struct Embed {
    title: String,
    description: String,
    color: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    url: Option<String>,
    fields: Vec<EmbedField>,
    footer: EmbedFooter,
    timestamp: String,
}

#[derive(Debug, Serialize)]
struct EmbedField {
    name: String,
    value: String,
    inline: bool,
}

#[derive(Debug, Serialize)]
struct EmbedFooter {
    text: String,
}

/// Destination for run notifications. The live implementation is
/// [`Notifier`]; orchestrator tests substitute a recording sink.
pub trait AlertSink {
    async fn send_new_shows_alert(&self, article: &Article, shows: &[ShowEntry]) -> Result<()>;
    async fn send_error_alert(&self, message: &str, context: &str) -> Result<()>;
    async fn send_test_message(&self) -> Result<()>;
}

pub struct Notifier {
    client: Client,
    webhook_url: String,
    source_name: String,
}

impl Notifier {
    pub fn new(webhook_url: String, config: &Config) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(|e| MonitorError::Config(format!("building webhook client: {e}")))?;
        Ok(Self {
            client,
            webhook_url,
            source_name: "The Guardian".to_string(),
        })
    }

    async fn execute(&self, payload: &WebhookPayload) -> Result<()> {
        let response = self
            .client
            .post(&self.webhook_url)
            .json(payload)
            .send()
            .await
            .map_err(|e| MonitorError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MonitorError::Delivery(format!(
                "webhook returned HTTP {status}"
            )));
        }
        Ok(())
    }
}

impl AlertSink for Notifier {
    /// Announce a newly recorded article and its shows.
    #[instrument(level = "info", skip_all, fields(article_id = %article.id))]
    async fn send_new_shows_alert(&self, article: &Article, shows: &[ShowEntry]) -> Result<()> {
        let payload = new_shows_payload(article, shows, &self.source_name);
        self.execute(&payload).await?;
        info!(shows = shows.len(), "notification delivered");
        Ok(())
    }

    /// Alert an operator that a run failed. Gated by configuration upstream.
    #[instrument(level = "info", skip(self))]
    async fn send_error_alert(&self, message: &str, context: &str) -> Result<()> {
        self.execute(&error_payload(message, context)).await
    }

    /// Verify the webhook end to end with a harmless message.
    async fn send_test_message(&self) -> Result<()> {
        self.execute(&test_payload()).await
    }
}

fn new_shows_payload(article: &Article, shows: &[ShowEntry], source_name: &str) -> WebhookPayload {
    let mut fields = vec![
        EmbedField {
            name: "Published".to_string(),
            value: format_publish_date(&article.published_at),
            inline: true,
        },
        EmbedField {
            name: "Source".to_string(),
            value: source_name.to_string(),
            inline: true,
        },
        EmbedField {
            name: "Read the full article".to_string(),
            value: format!("[Open link]({})", article.url),
            inline: false,
        },
    ];

    for show in shows.iter().take(MAX_SHOWS_PER_EMBED) {
        let display_title = if show.is_pick_of_week {
            format!("⭐ {} (Pick of the week)", show.title)
        } else {
            show.title.clone()
        };
        let description = if show.description.is_empty() {
            "No description available".to_string()
        } else {
            ellipsize(&show.description, MAX_FIELD_DESCRIPTION_CHARS)
        };
        fields.push(EmbedField {
            name: format!("{}. {}", show.position, display_title),
            value: format!("**Platform:** {}\n{}", show.platform, description),
            inline: false,
        });
    }

    WebhookPayload {
        embeds: vec![Embed {
            title: "🎬 New show recommendations!".to_string(),
            description: format!("**{} new shows** to stream this week", shows.len()),
            color: EMBED_COLOR_NEW_SHOWS,
            url: Some(article.url.clone()),
            fields,
            footer: EmbedFooter {
                text: FOOTER_TEXT.to_string(),
            },
            timestamp: Utc::now().to_rfc3339(),
        }],
    }
}

fn error_payload(message: &str, context: &str) -> WebhookPayload {
    WebhookPayload {
        embeds: vec![Embed {
            title: "⚠️ Monitor error".to_string(),
            description: context.to_string(),
            color: EMBED_COLOR_ERROR,
            url: None,
            fields: vec![EmbedField {
                name: "Error message".to_string(),
                value: ellipsize(message, 1000),
                inline: false,
            }],
            footer: EmbedFooter {
                text: format!("{FOOTER_TEXT} - Error Alert"),
            },
            timestamp: Utc::now().to_rfc3339(),
        }],
    }
}

fn test_payload() -> WebhookPayload {
    WebhookPayload {
        embeds: vec![Embed {
            title: "🧪 Test message".to_string(),
            description: "The monitor can reach its webhook.".to_string(),
            color: EMBED_COLOR_TEST,
            url: None,
            fields: Vec::new(),
            footer: EmbedFooter {
                text: format!("{FOOTER_TEXT} - Test"),
            },
            timestamp: Utc::now().to_rfc3339(),
        }],
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn article() -> Article {
        Article {
            id: "/tv-and-radio/2025/aug/15/picks".to_string(),
            title: "The seven best shows to stream this week".to_string(),
            url: "https://www.theguardian.com/tv-and-radio/2025/aug/15/picks".to_string(),
            published_at: "2025-08-15".to_string(),
            fetched_at: Utc::now(),
        }
    }

    fn shows() -> Vec<ShowEntry> {
        (1..=7)
            .map(|i| ShowEntry {
                title: format!("Show {i}"),
                platform: "Netflix".to_string(),
                description: "d".repeat(300),
                is_pick_of_week: i == 7,
                position: i,
            })
            .collect()
    }

    #[test]
    fn test_payload_has_one_field_per_show_plus_header_fields() {
        let payload = new_shows_payload(&article(), &shows(), "The Guardian");
        assert_eq!(payload.embeds.len(), 1);
        let embed = &payload.embeds[0];
        assert_eq!(embed.fields.len(), 3 + 7);
        assert_eq!(embed.description, "**7 new shows** to stream this week");
        assert_eq!(embed.fields[0].value, "August 15, 2025");
    }

    #[test]
    fn test_pick_of_week_is_marked() {
        let payload = new_shows_payload(&article(), &shows(), "The Guardian");
        let pick_field = &payload.embeds[0].fields[3 + 6];
        assert!(pick_field.name.starts_with("7. ⭐"));
        assert!(pick_field.name.contains("(Pick of the week)"));

        let normal_field = &payload.embeds[0].fields[3];
        assert!(!normal_field.name.contains('⭐'));
    }

    #[test]
    fn test_long_descriptions_are_ellipsized() {
        let payload = new_shows_payload(&article(), &shows(), "The Guardian");
        let field = &payload.embeds[0].fields[3];
        assert!(field.value.ends_with("..."));
        assert!(field.value.chars().count() < 200);
    }

    #[test]
    fn test_empty_description_gets_placeholder() {
        let mut entries = shows();
        entries[0].description = String::new();
        let payload = new_shows_payload(&article(), &entries, "The Guardian");
        assert!(payload.embeds[0].fields[3]
            .value
            .contains("No description available"));
    }

    #[test]
    fn test_error_payload_shape() {
        let payload = error_payload("boom", "while checking for new shows");
        let embed = &payload.embeds[0];
        assert_eq!(embed.color, EMBED_COLOR_ERROR);
        assert!(embed.url.is_none());
        assert_eq!(embed.fields[0].value, "boom");
    }

    #[test]
    fn test_notifier_builds_from_default_config() {
        let config = Config::default();
        let notifier = Notifier::new("https://discord.com/api/webhooks/1/x".to_string(), &config);
        assert!(notifier.is_ok());
    }

    #[test]
    fn test_payload_serializes_without_null_url() {
        let json = serde_json::to_string(&test_payload()).unwrap();
        assert!(!json.contains("\"url\""));
        assert!(json.contains("\"embeds\""));
    }
}
