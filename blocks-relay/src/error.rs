use blocks_common::checkpoint::StoreError;
use blocks_common::policy::{Classify, ErrorPolicy};
use reqwest::StatusCode;
use thiserror::Error;

/// Enumeration of errors returned when fetching the block report.
#[derive(Error, Debug)]
pub enum SourceError {
    #[error("request to the block report failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("block report rejected our credentials with status {0}")]
    Auth(StatusCode),
    #[error("failed to decode the block report: {0}")]
    Decode(#[from] serde_json::Error),
}

impl SourceError {
    pub fn is_auth(&self) -> bool {
        matches!(self, SourceError::Auth(_))
    }
}

impl Classify for SourceError {
    fn policy(&self) -> ErrorPolicy {
        ErrorPolicy::Retryable
    }
}

/// Enumeration of errors returned when a notification could not be delivered.
#[derive(Error, Debug)]
pub enum DeliveryError {
    #[error("request to the chat channel failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("chat channel rejected the message with status {status}")]
    Rejected { status: StatusCode },
}

impl DeliveryError {
    pub fn is_auth(&self) -> bool {
        matches!(
            self,
            DeliveryError::Rejected {
                status: StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN
            }
        )
    }
}

impl Classify for DeliveryError {
    fn policy(&self) -> ErrorPolicy {
        ErrorPolicy::Ignorable
    }
}

/// Enumeration of errors that prevent the service from starting, or stop it once started.
#[derive(Error, Debug)]
pub enum StartupError {
    #[error("invalid configuration: {0}")]
    Config(#[from] envconfig::Error),
    #[error("failed to build http client: {0}")]
    HttpClient(#[source] reqwest::Error),
    #[error("failed to load checkpoint: {0}")]
    Store(#[from] StoreError),
    #[error("block report credentials are invalid: {0}")]
    SourceCredentials(#[source] SourceError),
    #[error("chat credentials are invalid: {0}")]
    SinkCredentials(#[source] DeliveryError),
    #[error("failed to install metrics recorder: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),
    #[error("http server exited: {0}")]
    Server(eyre::Report),
}

impl Classify for StartupError {
    fn policy(&self) -> ErrorPolicy {
        ErrorPolicy::Fatal
    }
}
