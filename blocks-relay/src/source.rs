use std::sync::Arc;
use std::time;

use async_trait::async_trait;
use blocks_common::record::BlockRecord;
use reqwest::{header, StatusCode};

use crate::error::SourceError;

pub const USER_AGENT: &str = "blocks-relay";

const BLOCKS_PATH: &str = "/v3/suppression/blocks";
const SCOPES_PATH: &str = "/v3/scopes";

/// Where block records come from.
#[async_trait]
pub trait RecordSource: Send + Sync {
    /// Every record with `created >= timestamp`, in whatever order the provider returns them.
    async fn fetch_since(&self, timestamp: i64) -> Result<Vec<BlockRecord>, SourceError>;

    /// Check that the configured credentials are accepted.
    async fn verify(&self) -> Result<(), SourceError>;
}

#[async_trait]
impl<T: RecordSource + ?Sized> RecordSource for Arc<T> {
    async fn fetch_since(&self, timestamp: i64) -> Result<Vec<BlockRecord>, SourceError> {
        (**self).fetch_since(timestamp).await
    }

    async fn verify(&self) -> Result<(), SourceError> {
        (**self).verify().await
    }
}

/// Client for the SendGrid suppression blocks API.
pub struct SendgridClient {
    client: reqwest::Client,
    base_url: String,
    token: String,
}

impl SendgridClient {
    pub fn new(
        base_url: &str,
        token: &str,
        request_timeout: time::Duration,
    ) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(request_timeout)
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_owned(),
            token: token.to_owned(),
        })
    }

    async fn get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<reqwest::Response, SourceError> {
        let response = self
            .client
            .get(format!("{}{}", self.base_url, path))
            .bearer_auth(&self.token)
            .header(header::ACCEPT, "application/json")
            .query(query)
            .send()
            .await
            .map_err(SourceError::Request)?;

        match response.status() {
            status @ (StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN) => {
                Err(SourceError::Auth(status))
            }
            _ => response.error_for_status().map_err(SourceError::Request),
        }
    }
}

#[async_trait]
impl RecordSource for SendgridClient {
    async fn fetch_since(&self, timestamp: i64) -> Result<Vec<BlockRecord>, SourceError> {
        let response = self
            .get(BLOCKS_PATH, &[("start_time", timestamp.to_string())])
            .await?;

        // Read the body first so a truncated transfer is a request error rather than a decode error.
        let body = response.bytes().await.map_err(SourceError::Request)?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn verify(&self) -> Result<(), SourceError> {
        self.get(SCOPES_PATH, &[]).await.map(|_| ())
    }
}
