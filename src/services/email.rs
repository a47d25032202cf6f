// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Email channel backed by a transactional-mail HTTP API.

use crate::config::Config;
use crate::models::Channel;
use crate::services::channels::{check_response, ChannelError, Notice, NotificationChannel};
use async_trait::async_trait;
use serde::Serialize;

/// Outgoing message body accepted by the mail API.
#[derive(Debug, Serialize)]
struct EmailMessage<'a> {
    from: &'a str,
    to: &'a [String],
    subject: String,
    text: String,
}

/// Email client.
#[derive(Clone)]
pub struct EmailChannel {
    http: reqwest::Client,
    api_url: String,
    api_token: String,
    from: String,
    recipients: Vec<String>,
}

impl EmailChannel {
    pub fn new(api_url: String, api_token: String, from: String, recipients: Vec<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            api_url,
            api_token,
            from,
            recipients,
        }
    }

    /// Build from configuration.
    ///
    /// Returns `None` if the API endpoint, token or recipient list is missing.
    pub fn from_config(config: &Config) -> Option<Self> {
        let api_url = config.email_api_url.clone()?;
        let api_token = config.email_api_token.clone()?;
        if config.notify_emails.is_empty() {
            return None;
        }

        Some(Self::new(
            api_url,
            api_token,
            config.email_from.clone(),
            config.notify_emails.clone(),
        ))
    }
}

#[async_trait]
impl NotificationChannel for EmailChannel {
    fn kind(&self) -> Channel {
        Channel::Email
    }

    async fn send_notice(&self, notice: &Notice) -> Result<(), ChannelError> {
        let message = EmailMessage {
            from: &self.from,
            to: &self.recipients,
            subject: notice.subject(),
            text: notice.text_body(),
        };

        let response = self
            .http
            .post(&self.api_url)
            .bearer_auth(&self.api_token)
            .json(&message)
            .send()
            .await
            .map_err(|e| ChannelError::Request(e.to_string()))?;

        check_response(response).await?;

        tracing::debug!(
            registration_id = %notice.registration_id,
            threshold = %notice.threshold,
            recipients = self.recipients.len(),
            "Email notice accepted"
        );
        Ok(())
    }
}
