// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Messaging-bot channel using the Telegram Bot API `sendMessage` call.

use crate::config::Config;
use crate::models::Channel;
use crate::services::channels::{
    check_response, ChannelError, ExpirySummary, Notice, NotificationChannel, Urgency,
};
use crate::time_utils::format_display_date;
use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct SendMessage<'a> {
    chat_id: &'a str,
    text: &'a str,
    parse_mode: &'static str,
    disable_web_page_preview: bool,
}

/// Telegram bot client. Delivers to every configured chat.
#[derive(Clone)]
pub struct TelegramChannel {
    http: reqwest::Client,
    api_url: String,
    bot_token: String,
    chat_ids: Vec<String>,
}

impl TelegramChannel {
    pub fn new(api_url: String, bot_token: String, chat_ids: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url: api_url.trim_end_matches('/').to_string(),
            bot_token,
            chat_ids,
        }
    }

    /// Build from configuration; `None` without a bot token or chat IDs.
    pub fn from_config(config: &Config) -> Option<Self> {
        let bot_token = config.telegram_bot_token.clone()?;
        if config.telegram_chat_ids.is_empty() {
            return None;
        }

        Some(Self::new(
            config.telegram_api_url.clone(),
            bot_token,
            config.telegram_chat_ids.clone(),
        ))
    }

    /// Send `text` to all chats. Succeeds if any chat accepted it.
    async fn broadcast(&self, text: &str) -> Result<(), ChannelError> {
        // URL embeds the token: never log it.
        let url = format!("{}/bot{}/sendMessage", self.api_url, self.bot_token);
        let mut delivered = 0usize;
        let mut last_error = None;

        for chat_id in &self.chat_ids {
            let body = SendMessage {
                chat_id,
                text,
                parse_mode: "HTML",
                disable_web_page_preview: true,
            };

            let result = match self.http.post(&url).json(&body).send().await {
                Ok(response) => check_response(response).await,
                Err(e) => Err(ChannelError::Request(e.without_url().to_string())),
            };

            match result {
                Ok(()) => delivered += 1,
                Err(e) => {
                    tracing::warn!(chat_id = %chat_id, error = %e, "Bot message rejected");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if delivered == 0 => Err(e),
            _ => Ok(()),
        }
    }
}

#[async_trait]
impl NotificationChannel for TelegramChannel {
    fn kind(&self) -> Channel {
        Channel::MessagingBot
    }

    async fn send_notice(&self, notice: &Notice) -> Result<(), ChannelError> {
        self.broadcast(&render_notice(notice)).await
    }

    async fn send_summary(&self, summary: &ExpirySummary) -> Result<(), ChannelError> {
        self.broadcast(&render_summary(summary)).await
    }
}

/// Escape text for Telegram's HTML parse mode.
pub fn escape_html(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

fn render_notice(notice: &Notice) -> String {
    let marker = match notice.urgency() {
        Urgency::Urgent => "🔴",
        Urgency::Attention => "🟠",
        Urgency::Notice => "🟡",
    };

    format!(
        "{} <b>{}: trademark renewal due</b>\n\n\
         <b>{}</b> ({})\n\
         Number: {}\n\
         Expires: {} ({} days)\n\
         Reminder: {} before expiry",
        marker,
        notice.urgency().label(),
        escape_html(&notice.trademark_name),
        escape_html(&notice.territory),
        escape_html(&notice.number),
        format_display_date(notice.expiry_date),
        notice.days_remaining,
        notice.threshold.label()
    )
}

fn render_summary(summary: &ExpirySummary) -> String {
    format!("<b>Daily summary</b>\n\n{}", escape_html(&summary.text_body()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Threshold;
    use crate::services::evaluator::ExpiryCounts;
    use chrono::NaiveDate;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("A&B <Co>"), "A&amp;B &lt;Co&gt;");
        assert_eq!(escape_html("plain"), "plain");
    }

    #[test]
    fn test_render_notice_escapes_fields() {
        let notice = Notice {
            registration_id: "r1".to_string(),
            trademark_name: "<SMITH & SONS>".to_string(),
            territory: "EU".to_string(),
            number: "018000001".to_string(),
            expiry_date: NaiveDate::from_ymd_opt(2027, 1, 15).unwrap(),
            days_remaining: 89,
            threshold: Threshold::ThreeMonths,
        };

        let text = render_notice(&notice);
        assert!(text.starts_with("🟠 <b>Attention"));
        assert!(text.contains("&lt;SMITH &amp; SONS&gt;"));
        assert!(text.contains("15.01.2027 (89 days)"));
    }

    #[test]
    fn test_render_summary() {
        let summary = ExpirySummary {
            date: NaiveDate::from_ymd_opt(2026, 10, 18).unwrap(),
            counts: ExpiryCounts {
                within_30: 1,
                within_90: 2,
                within_180: 4,
                expired: 0,
                missing_expiry: 3,
            },
        };
        let text = render_summary(&summary);
        assert!(text.contains("18.10.2026"));
        assert!(text.contains("Expiring within 180 days: 4"));
        assert!(text.contains("Missing expiry date: 3"));
    }

    #[test]
    fn test_from_config() {
        let mut config = Config::default();
        assert!(TelegramChannel::from_config(&config).is_none());
        config.telegram_bot_token = Some("123:abc".to_string());
        assert!(TelegramChannel::from_config(&config).is_none());
        config.telegram_chat_ids = vec!["-1001".to_string()];
        assert!(TelegramChannel::from_config(&config).is_some());
    }
}
