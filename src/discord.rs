use std::fmt;
use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::{instrument, trace};

/// Discord rejects message content longer than this many characters.
pub const CONTENT_LIMIT: usize = 2000;

const TRUNCATION_MARKER: &str = "\n…";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Message {
    pub content: String,
}

impl Message {
    /// Build a message, cutting the content down to [`CONTENT_LIMIT`]
    /// characters if needed.
    pub fn new(content: impl ToString) -> Self {
        let content = content.to_string();
        if content.chars().count() <= CONTENT_LIMIT {
            return Self { content };
        }

        let keep = CONTENT_LIMIT - TRUNCATION_MARKER.chars().count();
        let mut truncated: String = content.chars().take(keep).collect();
        truncated.push_str(TRUNCATION_MARKER);

        Self { content: truncated }
    }
}

/// Why a webhook call did not succeed
#[derive(Debug)]
pub enum DispatchError {
    /// The request never got a response (connect, TLS, timeout, ...)
    Transport(reqwest::Error),

    /// Discord answered with anything but 204 No Content
    UnexpectedStatus { status: StatusCode, body: String },
}

impl fmt::Display for DispatchError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DispatchError::Transport(err) => write!(f, "failed to send Discord message: {}", err),
            DispatchError::UnexpectedStatus { status, body } if body.is_empty() => {
                write!(f, "Discord message failed with status: {}", status)
            }
            DispatchError::UnexpectedStatus { status, body } => {
                write!(f, "Discord message failed with status: {} ({})", status, body)
            }
        }
    }
}

impl std::error::Error for DispatchError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            DispatchError::Transport(err) => Some(err),
            DispatchError::UnexpectedStatus { .. } => None,
        }
    }
}

impl From<reqwest::Error> for DispatchError {
    fn from(err: reqwest::Error) -> Self {
        DispatchError::Transport(err)
    }
}

#[derive(Debug, Clone)]
pub struct DiscordWebhook {
    client: Client,
    url: String,
}

impl DiscordWebhook {
    pub fn new(url: impl Into<String>, timeout: Duration) -> anyhow::Result<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Post a single message. Only `204 No Content` counts as delivered.
    #[instrument(skip_all)]
    pub async fn send_message(&self, message: &Message) -> Result<(), DispatchError> {
        let response = self.client.post(&self.url).json(message).send().await?;

        let status = response.status();
        trace!("webhook answered with {status}");

        if status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        Err(DispatchError::UnexpectedStatus { status, body })
    }
}
