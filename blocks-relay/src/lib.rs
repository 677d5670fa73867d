pub mod app_context;
pub mod config;
pub mod error;
pub mod http;
pub mod metrics_consts;
pub mod notifier;
pub mod poller;
pub mod scheduler;
pub mod source;
