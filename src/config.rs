use chrono_tz::Tz;
use serde::Deserialize;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

use crate::classify::DEFAULT_THRESHOLD_W;
use crate::error::{AppError, Result};
use crate::models::NewProject;
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub poll: PollConfig,
    #[serde(default)]
    pub alarm: AlarmConfig,
    /// IANA name of the timezone device timestamps are shown in.
    #[serde(default = "default_timezone")]
    pub timezone: String,
    /// Projects registered at startup.
    #[serde(default)]
    pub projects: Vec<NewProject>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PollConfig {
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AlarmConfig {
    #[serde(default = "default_threshold_w")]
    pub threshold_w: f64,
}

fn default_host() -> String {
    "0.0.0.0".into()
}

fn default_port() -> u16 {
    8050
}

fn default_interval_secs() -> u64 {
    60
}

fn default_request_timeout_secs() -> u64 {
    10
}

fn default_threshold_w() -> f64 {
    DEFAULT_THRESHOLD_W
}

fn default_timezone() -> String {
    "America/Santo_Domingo".into()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl Default for AlarmConfig {
    fn default() -> Self {
        Self {
            threshold_w: default_threshold_w(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerConfig::default(),
            poll: PollConfig::default(),
            alarm: AlarmConfig::default(),
            timezone: default_timezone(),
            projects: Vec::new(),
        }
    }
}

impl Config {
    /// Load YAML from disk, substitute $(VAR)/${VAR} with env vars, then parse.
    /// A missing file means built-in defaults. Environment overrides are
    /// applied last in both cases.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let cfg = if path.exists() {
            let raw = std::fs::read_to_string(path)?;
            Self::parse(&raw)?
        } else {
            tracing::warn!(path = %path.display(), "config file not found, using defaults");
            Self::default()
        };
        cfg.with_env_overrides()
    }

    fn parse(raw: &str) -> Result<Self> {
        let expanded = expand_env_placeholders(raw)?;
        Ok(serde_yaml::from_str(&expanded)?)
    }

    /// Apply PORT, SERVER_HOST, POLL_INTERVAL_SECS, REQUEST_TIMEOUT_SECS,
    /// ALARM_THRESHOLD_W and TIMEZONE, then validate.
    fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(host) = std::env::var("SERVER_HOST") {
            self.server.host = host;
        }
        if let Some(port) = env_override("PORT")? {
            self.server.port = port;
        }
        if let Some(secs) = env_override("POLL_INTERVAL_SECS")? {
            self.poll.interval_secs = secs;
        }
        if let Some(secs) = env_override("REQUEST_TIMEOUT_SECS")? {
            self.poll.request_timeout_secs = secs;
        }
        if let Some(threshold) = env_override("ALARM_THRESHOLD_W")? {
            self.alarm.threshold_w = threshold;
        }
        if let Ok(tz) = std::env::var("TIMEZONE") {
            self.timezone = tz;
        }

        self.validate()?;
        Ok(self)
    }

    fn validate(&self) -> Result<()> {
        if self.server.port == 0 {
            return Err(AppError::Config("Server port cannot be 0".to_string()));
        }
        if self.poll.interval_secs == 0 {
            return Err(AppError::Config(
                "Poll interval must be at least 1 second".to_string(),
            ));
        }
        if self.poll.request_timeout_secs == 0 {
            return Err(AppError::Config(
                "Request timeout must be at least 1 second".to_string(),
            ));
        }
        if !self.alarm.threshold_w.is_finite() {
            return Err(AppError::Config(format!(
                "Alarm threshold must be a finite number, got {}",
                self.alarm.threshold_w
            )));
        }
        self.timezone()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz> {
        Tz::from_str(&self.timezone)
            .map_err(|e| AppError::Config(format!("unknown timezone '{}': {}", self.timezone, e)))
    }

    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.poll.request_timeout_secs)
    }

    pub fn scheduler_config(&self) -> SchedulerConfig {
        SchedulerConfig {
            interval: Duration::from_secs(self.poll.interval_secs),
            threshold_w: self.alarm.threshold_w,
        }
    }
}

fn env_override<T>(name: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|e| AppError::Config(format!("invalid {} '{}': {}", name, raw, e))),
        Err(_) => Ok(None),
    }
}

/// Expand $(VAR) and ${VAR} placeholders using environment variables.
/// "$$" becomes a literal "$"; any other "$" is kept as-is.
fn expand_env_placeholders(input: &str) -> Result<String> {
    let mut out = String::with_capacity(input.len());
    let mut it = input.chars().peekable();

    while let Some(c) = it.next() {
        if c != '$' {
            out.push(c);
            continue;
        }
        let close = match it.peek() {
            Some('$') => {
                it.next();
                out.push('$');
                continue;
            }
            Some('(') => ')',
            Some('{') => '}',
            _ => {
                out.push('$');
                continue;
            }
        };
        it.next();

        let var = read_until(&mut it, close).ok_or_else(|| {
            AppError::Config(format!("unterminated env placeholder: missing '{}'", close))
        })?;
        let val = std::env::var(&var)
            .map_err(|_| AppError::Config(format!("missing environment variable: {}", var)))?;
        out.push_str(&val);
    }

    Ok(out)
}

/// Read characters until `end`, consuming it.
fn read_until<I>(it: &mut std::iter::Peekable<I>, end: char) -> Option<String>
where
    I: Iterator<Item = char>,
{
    let mut buf = String::new();
    for ch in it.by_ref() {
        if ch == end {
            return Some(buf);
        }
        buf.push(ch);
    }
    None
}
