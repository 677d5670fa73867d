use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use blocks_common::record::BlockRecord;
use reqwest::header;
use serde::Serialize;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;

use crate::error::DeliveryError;
use crate::source::USER_AGENT;

/// Discord rejects message contents longer than this many characters.
pub const MAX_MESSAGE_CHARS: usize = 2000;

/// Where notifications go.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send_message(&self, content: &str) -> Result<(), DeliveryError>;

    /// Check that the configured credentials are accepted.
    async fn verify(&self) -> Result<(), DeliveryError>;

    /// Deliver one human readable message for `record`.
    async fn notify(&self, record: &BlockRecord) -> Result<(), DeliveryError> {
        self.send_message(&format_record(record)).await
    }
}

#[async_trait]
impl<T: Notifier + ?Sized> Notifier for Arc<T> {
    async fn send_message(&self, content: &str) -> Result<(), DeliveryError> {
        (**self).send_message(content).await
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        (**self).verify().await
    }

    async fn notify(&self, record: &BlockRecord) -> Result<(), DeliveryError> {
        (**self).notify(record).await
    }
}

/// Render a block record as a chat message carrying all of its fields.
pub fn format_record(record: &BlockRecord) -> String {
    let rendered = OffsetDateTime::from_unix_timestamp(record.created)
        .ok()
        .and_then(|created| created.format(&Rfc3339).ok());
    let created = match rendered {
        Some(rendered) => format!("{} ({})", record.created, rendered),
        None => record.created.to_string(),
    };

    let render = |reason: &str| {
        format!(
            "Failed to send mail:\nCreated at: {}\nEmail: {}\nReason: {}\nStatus: {}\n",
            created, record.email, reason, record.status
        )
    };

    // The reason is free text from the remote MTA, it gives way before the layout does.
    let fixed_chars = render("").chars().count();
    let reason = truncate_chars(
        record.reason.clone(),
        MAX_MESSAGE_CHARS.saturating_sub(fixed_chars),
    );

    truncate_chars(render(&reason), MAX_MESSAGE_CHARS)
}

fn truncate_chars(mut message: String, max_chars: usize) -> String {
    if let Some((index, _)) = message.char_indices().nth(max_chars) {
        message.truncate(index);
    }
    message
}

#[derive(Serialize)]
struct CreateMessage<'a> {
    content: &'a str,
}

/// Posts messages to a single Discord channel as a bot.
pub struct DiscordNotifier {
    client: reqwest::Client,
    base_url: String,
    authorization: String,
    channel_id: String,
}

impl DiscordNotifier {
    pub fn new(
        base_url: &str,
        token: &str,
        channel_id: &str,
        request_timeout: Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            authorization: format!("Bot {}", token),
            channel_id: channel_id.to_owned(),
        })
    }

    fn check_status(response: reqwest::Response) -> Result<reqwest::Response, DeliveryError> {
        let status = response.status();
        if status.is_success() {
            Ok(response)
        } else {
            Err(DeliveryError::Rejected { status })
        }
    }
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send_message(&self, content: &str) -> Result<(), DeliveryError> {
        let response = self
            .client
            .post(format!(
                "{}/channels/{}/messages",
                self.base_url, self.channel_id
            ))
            .header(header::AUTHORIZATION, &self.authorization)
            .json(&CreateMessage { content })
            .send()
            .await
            .map_err(DeliveryError::Request)?;

        Self::check_status(response).map(|_| ())
    }

    async fn verify(&self) -> Result<(), DeliveryError> {
        let response = self
            .client
            .get(format!("{}/users/@me", self.base_url))
            .header(header::AUTHORIZATION, &self.authorization)
            .send()
            .await
            .map_err(DeliveryError::Request)?;

        Self::check_status(response).map(|_| ())
    }
}
