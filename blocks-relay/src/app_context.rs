use std::time::Duration;

use blocks_common::checkpoint::{CheckpointStore, FileCheckpointStore};
use blocks_common::health::{HealthHandle, HealthRegistry};
use blocks_common::record::{resolve_initial_checkpoint, Checkpoint};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::Config;
use crate::error::StartupError;
use crate::notifier::{DiscordNotifier, Notifier};
use crate::source::{RecordSource, SendgridClient};

pub const ONLINE_MESSAGE: &str = "blocks relay is online";

/// Everything the poll loop and the HTTP routes need, built once at startup.
pub struct AppContext {
    pub source: Box<dyn RecordSource>,
    pub notifier: Box<dyn Notifier>,
    pub store: Box<dyn CheckpointStore>,
    pub health: HealthRegistry,
    pub poller_liveness: HealthHandle,
    pub interval: Duration,
    pub metrics: bool,
}

impl AppContext {
    pub fn new(
        source: Box<dyn RecordSource>,
        notifier: Box<dyn Notifier>,
        store: Box<dyn CheckpointStore>,
        interval: Duration,
        metrics: bool,
    ) -> Self {
        let health = HealthRegistry::new("liveness");
        // A few missed cycles in a row means the loop is wedged on something.
        let deadline = time::Duration::try_from(interval.saturating_mul(4))
            .unwrap_or(time::Duration::MAX);
        let poller_liveness = health.register("poller", deadline);

        Self {
            source,
            notifier,
            store,
            health,
            poller_liveness,
            interval,
            metrics,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self, StartupError> {
        let source = SendgridClient::new(
            &config.sendgrid_url,
            config.sendgrid_token.as_str(),
            config.request_timeout.0,
        )
        .map_err(StartupError::HttpClient)?;

        let notifier = DiscordNotifier::new(
            &config.discord_url,
            config.discord_token.as_str(),
            config.discord_channel_id.as_str(),
            config.request_timeout.0,
        )
        .map_err(StartupError::HttpClient)?;

        let store = FileCheckpointStore::new(&config.state_path, config.state_template());

        Ok(Self::new(
            Box::new(source),
            Box::new(notifier),
            Box::new(store),
            config.interval.0,
            config.metrics,
        ))
    }

    /// Make sure both remote APIs accept our credentials.
    ///
    /// Only an explicit rejection is fatal: if a service is merely unreachable we start anyway
    /// and let the poll loop retry.
    pub async fn verify_credentials(&self) -> Result<(), StartupError> {
        match self.source.verify().await {
            Ok(()) => info!("block report credentials accepted"),
            Err(e) if e.is_auth() => return Err(StartupError::SourceCredentials(e)),
            Err(e) => warn!("could not verify block report credentials: {}", e),
        }

        match self.notifier.verify().await {
            Ok(()) => info!("chat credentials accepted"),
            Err(e) if e.is_auth() => return Err(StartupError::SinkCredentials(e)),
            Err(e) => warn!("could not verify chat credentials: {}", e),
        }

        Ok(())
    }

    /// Load the persisted checkpoint, reconcile it with the configured one, and persist the result
    /// so the state file exists from the first cycle on.
    pub async fn initial_checkpoint(&self, configured: i64) -> Result<Checkpoint, StartupError> {
        let stored = self.store.load().await?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        let checkpoint = resolve_initial_checkpoint(stored, configured, now);

        info!(
            stored = ?stored,
            configured,
            checkpoint = %checkpoint,
            "resolved initial checkpoint"
        );

        if let Err(e) = self.store.save(checkpoint.value()).await {
            error!("failed to persist initial checkpoint: {}", e);
        }

        Ok(checkpoint)
    }

    /// Tell the channel we are up. Best effort.
    pub async fn announce(&self) {
        if let Err(e) = self.notifier.send_message(ONLINE_MESSAGE).await {
            warn!("failed to announce startup: {}", e);
        }
    }
}
