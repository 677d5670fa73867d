//! Relay new SendGrid blocks to a Discord channel.
use std::sync::Arc;

use blocks_common::policy::Classify;
use blocks_common::record::Checkpoint;
use blocks_relay::{
    app_context::AppContext, config::Config, error::StartupError, http, poller::Poller,
    scheduler::IntervalScheduler,
};
use envconfig::Envconfig;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

fn setup_tracing() {
    let log_layer = tracing_subscriber::fmt::layer().with_filter(EnvFilter::from_default_env());
    tracing_subscriber::registry().with(log_layer).init();
}

async fn startup(config: &Config) -> Result<(Arc<AppContext>, Checkpoint), StartupError> {
    let context = AppContext::from_config(config)?;

    context.verify_credentials().await?;
    let checkpoint = context.initial_checkpoint(config.last_timestamp).await?;
    context.announce().await;

    Ok((Arc::new(context), checkpoint))
}

#[tokio::main]
async fn main() -> Result<(), StartupError> {
    setup_tracing();
    info!("Starting up...");

    let config = Config::init_from_env().inspect_err(|e| error!("invalid configuration: {}", e))?;

    let (context, checkpoint) = startup(&config)
        .await
        .inspect_err(|e| error!(policy = %e.policy(), "failed to start: {}", e))?;

    let app = http::app(context.clone())?;
    let http_server = tokio::spawn(http::listen(app, config.bind()));

    let mut poller = Poller::new(&context, checkpoint);
    let mut scheduler = IntervalScheduler::new(context.interval);

    info!(
        checkpoint = %checkpoint,
        interval_secs = context.interval.as_secs(),
        "polling block report"
    );

    tokio::select! {
        _ = poller.run(&mut scheduler) => {
            error!("poll loop exited");
        }
        res = http_server => {
            let e = http::exit_error(res);
            error!(policy = %e.policy(), "{}", e);
            return Err(e);
        }
    }

    info!("exiting");
    Ok(())
}
