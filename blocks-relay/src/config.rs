use std::str::FromStr;
use std::time;

use blocks_common::checkpoint::StateFile;
use envconfig::Envconfig;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "BIND_HOST", default = "0.0.0.0")]
    pub host: String,

    #[envconfig(from = "BIND_PORT", default = "3310")]
    pub port: u16,

    /// Seconds between two polls of the block report.
    #[envconfig(from = "INTERVAL", default = "60")]
    pub interval: EnvSecsDuration,

    #[envconfig(from = "SENDGRID_TOKEN")]
    pub sendgrid_token: NonEmptyString,

    #[envconfig(from = "DISCORD_TOKEN")]
    pub discord_token: NonEmptyString,

    #[envconfig(from = "DISCORD_CHANNEL_ID")]
    pub discord_channel_id: NonEmptyString,

    // Negative means "start from now" unless the state file says otherwise
    #[envconfig(from = "LAST_TIMESTAMP", default = "-1")]
    pub last_timestamp: i64,

    #[envconfig(from = "STATE_PATH", default = "blocks-state.json")]
    pub state_path: String,

    #[envconfig(from = "SENDGRID_URL", default = "https://api.sendgrid.com")]
    pub sendgrid_url: String,

    #[envconfig(from = "DISCORD_URL", default = "https://discord.com/api/v10")]
    pub discord_url: String,

    #[envconfig(from = "REQUEST_TIMEOUT_MS", default = "10000")]
    pub request_timeout: EnvMsDuration,

    #[envconfig(from = "METRICS", default = "true")]
    pub metrics: bool,
}

impl Config {
    /// Produce a host:port address for binding a TcpListener.
    pub fn bind(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// The settings snapshot written next to every checkpoint.
    pub fn state_template(&self) -> StateFile {
        StateFile {
            last_timestamp: self.last_timestamp,
            interval: self.interval.0.as_secs(),
            sendgrid_token: self.sendgrid_token.as_str().to_owned(),
            discord_token: self.discord_token.as_str().to_owned(),
            discord_channel_id: self.discord_channel_id.as_str().to_owned(),
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct EnvMsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvMsDurationError;

impl FromStr for EnvMsDuration {
    type Err = ParseEnvMsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let ms = s.parse::<u64>().map_err(|_| ParseEnvMsDurationError)?;

        Ok(EnvMsDuration(time::Duration::from_millis(ms)))
    }
}

/// A strictly positive number of seconds.
#[derive(Debug, Clone, Copy)]
pub struct EnvSecsDuration(pub time::Duration);

#[derive(Debug, PartialEq, Eq)]
pub struct ParseEnvSecsDurationError;

impl FromStr for EnvSecsDuration {
    type Err = ParseEnvSecsDurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.parse::<u64>() {
            Ok(secs) if secs > 0 => Ok(EnvSecsDuration(time::Duration::from_secs(secs))),
            _ => Err(ParseEnvSecsDurationError),
        }
    }
}

#[derive(Debug, Clone)]
pub struct NonEmptyString(pub String);

impl NonEmptyString {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

#[derive(Debug, PartialEq, Eq)]
pub struct StringIsEmptyError;

impl FromStr for NonEmptyString {
    type Err = StringIsEmptyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            Err(StringIsEmptyError)
        } else {
            Ok(NonEmptyString(s.to_owned()))
        }
    }
}
