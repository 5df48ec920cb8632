use super::{PublishError, Publisher};
use crate::listing::Listing;
use crate::url::parse_http_url;
use crate::WatchError;
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use std::time::Duration;
use url::Url;

/// Response header carrying the message id, when the receiver sets one
pub const MESSAGE_ID_HEADER: &str = "x-message-id";

/// POSTs each batch as a JSON array
pub struct HttpPublisher {
    client: Client,
    url: Url,
}

impl HttpPublisher {
    pub fn new(url: &str, user_agent: &str) -> Result<Self, WatchError> {
        let url = parse_http_url(url)?;
        let client = Client::builder()
            .user_agent(user_agent.to_string())
            .timeout(Duration::from_secs(30))
            .build()?;

        Ok(Self { client, url })
    }
}

#[async_trait]
impl Publisher for HttpPublisher {
    async fn publish(&self, listings: &[Listing]) -> Result<String, PublishError> {
        let body = serde_json::to_vec(listings)?;
        let transport = |source| PublishError::Transport {
            url: self.url.to_string(),
            source,
        };

        let response = self
            .client
            .post(self.url.clone())
            .header(CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(transport)?;

        let status = response.status();
        let message_id = response
            .headers()
            .get(MESSAGE_ID_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let text = response.text().await.map_err(transport)?;

        if !status.is_success() {
            return Err(PublishError::Rejected {
                url: self.url.to_string(),
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(message_id.unwrap_or_else(|| {
            let text = text.trim();
            if text.is_empty() {
                status.as_u16().to_string()
            } else {
                text.to_string()
            }
        }))
    }

    fn name(&self) -> &str {
        "http"
    }
}
