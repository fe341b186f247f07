//! Configuration types for daily-basket
//!
//! A [`Config`] is built once at startup (normally via [`Config::from_env`]) and handed to the
//! fetcher, report builder, mailer and task. Nothing reads the environment after that.

use crate::error::{Error, Result};
use chrono::FixedOffset;
use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::net::SocketAddr;
use std::num::NonZeroU32;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

/// Main configuration for the report service
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote sales API
    #[serde(default)]
    pub sales_api: SalesApiConfig,

    /// Email provider and addressing
    #[serde(default)]
    pub mail: MailConfig,

    /// Where report files are written
    #[serde(default)]
    pub reports: ReportConfig,

    /// When the daily report runs
    #[serde(default)]
    pub schedule: ScheduleConfig,

    /// Retry policy of the report task
    #[serde(default)]
    pub retry: RetryConfig,

    /// Recipient database
    #[serde(default)]
    pub persistence: PersistenceConfig,

    /// HTTP API
    #[serde(default)]
    pub server: ServerConfig,
}

/// Remote sales API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SalesApiConfig {
    /// Base URL of the API, without the path prefix (e.g. "https://erp.example.com")
    #[serde(default)]
    pub base_url: String,

    /// Path prefix appended to the base URL (default: "foodbasket")
    #[serde(default = "default_path_prefix")]
    pub path_prefix: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_request_timeout", with = "duration_serde")]
    pub timeout: Duration,

    /// Records requested per page (default: 50)
    #[serde(default = "default_batch_size")]
    pub batch_size: NonZeroU32,
}

impl Default for SalesApiConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            path_prefix: default_path_prefix(),
            timeout: default_request_timeout(),
            batch_size: default_batch_size(),
        }
    }
}

/// Email provider settings (Resend-compatible HTTP API)
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MailConfig {
    /// Provider base URL (default: "https://api.resend.com")
    #[serde(default = "default_mail_api_url")]
    pub api_url: String,

    /// Provider API key, sent as a bearer token
    #[serde(default)]
    pub api_key: Option<String>,

    /// Sender address
    #[serde(default)]
    pub from_address: String,

    /// Display name shown with the sender address (default: "SynergyDailyBasket")
    #[serde(default = "default_sender_name")]
    pub sender_name: String,

    /// Fixed primary recipient; recipients from the database are added as CC
    #[serde(default)]
    pub to_address: String,

    /// Provider request timeout (default: 60 seconds)
    #[serde(default = "default_mail_timeout", with = "duration_serde")]
    pub timeout: Duration,
}

impl Default for MailConfig {
    fn default() -> Self {
        Self {
            api_url: default_mail_api_url(),
            api_key: None,
            from_address: String::new(),
            sender_name: default_sender_name(),
            to_address: String::new(),
            timeout: default_mail_timeout(),
        }
    }
}

impl MailConfig {
    /// `"Name <address>"` form of the sender
    pub fn sender(&self) -> String {
        format!("{} <{}>", self.sender_name, self.from_address)
    }
}

/// Report output settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportConfig {
    /// Directory report files are written to before dispatch (default: ".")
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            output_dir: default_output_dir(),
        }
    }
}

/// Daily trigger settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleConfig {
    /// Run the report automatically every day (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Hour of day, 0-23 (default: 6)
    #[serde(default = "default_hour")]
    pub hour: u32,

    /// Minute of hour, 0-59 (default: 0)
    #[serde(default)]
    pub minute: u32,

    /// Offset of the local business day from UTC, in minutes (default: 0)
    ///
    /// Also decides what "yesterday" and "today" mean for report dates.
    #[serde(default)]
    pub utc_offset_minutes: i32,
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            hour: default_hour(),
            minute: 0,
            utc_offset_minutes: 0,
        }
    }
}

impl ScheduleConfig {
    /// The configured offset as a chrono timezone
    pub fn utc_offset(&self) -> Result<FixedOffset> {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| Error::Config {
                message: format!(
                    "UTC offset of {} minutes is out of range",
                    self.utc_offset_minutes
                ),
                key: Some("utc_offset_minutes".to_string()),
            })
    }
}

/// Retry policy for the report task
///
/// The defaults retry twice more after the first attempt with a fixed 30 minute backoff.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries allowed after the first attempt (default: 2)
    #[serde(default = "default_max_retries")]
    pub max_attempts: u32,

    /// Delay before the first retry (default: 1800 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub initial_delay: Duration,

    /// Upper bound for any delay (default: 1800 seconds)
    #[serde(default = "default_retry_delay", with = "duration_serde")]
    pub max_delay: Duration,

    /// Multiplier applied to the delay after each retry (default: 1.0, fixed backoff)
    #[serde(default = "default_backoff_multiplier")]
    pub backoff_multiplier: f64,

    /// Add random jitter to delays (default: false)
    #[serde(default)]
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_retries(),
            initial_delay: default_retry_delay(),
            max_delay: default_retry_delay(),
            backoff_multiplier: default_backoff_multiplier(),
            jitter: false,
        }
    }
}

impl RetryConfig {
    /// A policy that makes exactly one attempt
    pub fn single_attempt() -> Self {
        Self {
            max_attempts: 0,
            ..Self::default()
        }
    }
}

/// Recipient database settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// SQLite database file (default: "./daily_basket.db")
    #[serde(default = "default_database_path")]
    pub database_path: PathBuf,
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

/// HTTP API settings
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Address to bind (default: 127.0.0.1:5000)
    #[serde(default = "default_bind_address")]
    pub bind_address: SocketAddr,

    /// Serve Swagger UI at /swagger-ui (default: true)
    #[serde(default = "default_true")]
    pub swagger_ui: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
            swagger_ui: true,
        }
    }
}

impl Config {
    /// Build the configuration from process environment variables
    ///
    /// Unset variables keep their defaults. The result is validated before it is returned.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build the configuration from an arbitrary key lookup
    ///
    /// Empty values are treated as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut config = Config::default();

        if let Some(url) = get("FOODBASKET_API_URL") {
            config.sales_api.base_url = url;
        }
        if let Some(prefix) = get("FOODBASKET_API_PREFIX") {
            config.sales_api.path_prefix = prefix;
        }
        if let Some(secs) = parse_var::<u64>(&get, "SALES_API_TIMEOUT_SECS")? {
            config.sales_api.timeout = Duration::from_secs(secs);
        }
        if let Some(size) = parse_var::<NonZeroU32>(&get, "SALES_API_BATCH_SIZE")? {
            config.sales_api.batch_size = size;
        }

        config.mail.api_key = get("RESEND_API_KEY");
        if let Some(url) = get("RESEND_API_URL") {
            config.mail.api_url = url;
        }
        if let Some(from) = get("FROM_EMAIL") {
            config.mail.from_address = from;
        }
        if let Some(to) = get("TO_EMAIL") {
            config.mail.to_address = to;
        }
        if let Some(name) = get("MAIL_SENDER_NAME") {
            config.mail.sender_name = name;
        }

        if let Some(dir) = get("REPORT_OUTPUT_DIR") {
            config.reports.output_dir = PathBuf::from(dir);
        }

        if let Some(enabled) = parse_var::<bool>(&get, "REPORT_SCHEDULE_ENABLED")? {
            config.schedule.enabled = enabled;
        }
        if let Some(hour) = parse_var::<u32>(&get, "REPORT_HOUR")? {
            config.schedule.hour = hour;
        }
        if let Some(minute) = parse_var::<u32>(&get, "REPORT_MINUTE")? {
            config.schedule.minute = minute;
        }
        if let Some(offset) = parse_var::<i32>(&get, "REPORT_UTC_OFFSET_MINUTES")? {
            config.schedule.utc_offset_minutes = offset;
        }

        if let Some(retries) = parse_var::<u32>(&get, "REPORT_MAX_RETRIES")? {
            config.retry.max_attempts = retries;
        }
        if let Some(secs) = parse_var::<u64>(&get, "REPORT_RETRY_DELAY_SECS")? {
            config.retry.initial_delay = Duration::from_secs(secs);
            config.retry.max_delay = config.retry.max_delay.max(config.retry.initial_delay);
        }

        if let Some(uri) = get("DATABASE_URI") {
            config.persistence.database_path = database_path_from_uri(&uri)?;
        }

        if let Some(addr) = parse_var::<SocketAddr>(&get, "BIND_ADDRESS")? {
            config.server.bind_address = addr;
        }
        if let Some(swagger) = parse_var::<bool>(&get, "SWAGGER_UI")? {
            config.server.swagger_ui = swagger;
        }

        config.validate()?;
        Ok(config)
    }

    /// Check that every setting needed to run the report is present and in range
    pub fn validate(&self) -> Result<()> {
        let base = Url::parse(&self.sales_api.base_url).map_err(|e| Error::Config {
            message: format!(
                "sales API URL '{}' is invalid: {}",
                self.sales_api.base_url, e
            ),
            key: Some("FOODBASKET_API_URL".to_string()),
        })?;
        if !matches!(base.scheme(), "http" | "https") {
            return Err(Error::Config {
                message: format!("sales API URL must be http(s), got '{}'", base.scheme()),
                key: Some("FOODBASKET_API_URL".to_string()),
            });
        }

        if self.mail.api_key.is_none() {
            return Err(Error::Config {
                message: "email provider API key is not set".to_string(),
                key: Some("RESEND_API_KEY".to_string()),
            });
        }
        check_address(&self.mail.from_address, "FROM_EMAIL")?;
        check_address(&self.mail.to_address, "TO_EMAIL")?;

        if self.schedule.hour > 23 {
            return Err(Error::Config {
                message: format!("report hour {} is not in 0-23", self.schedule.hour),
                key: Some("REPORT_HOUR".to_string()),
            });
        }
        if self.schedule.minute > 59 {
            return Err(Error::Config {
                message: format!("report minute {} is not in 0-59", self.schedule.minute),
                key: Some("REPORT_MINUTE".to_string()),
            });
        }
        self.schedule.utc_offset()?;

        let multiplier = self.retry.backoff_multiplier;
        if !(multiplier.is_finite() && multiplier >= 1.0) {
            return Err(Error::Config {
                message: "retry backoff multiplier must be at least 1.0".to_string(),
                key: Some("backoff_multiplier".to_string()),
            });
        }

        Ok(())
    }
}

fn check_address(address: &str, key: &str) -> Result<()> {
    if address.contains('@') {
        Ok(())
    } else {
        Err(Error::Config {
            message: format!("'{}' is not an email address", address),
            key: Some(key.to_string()),
        })
    }
}

fn parse_var<T>(get: &dyn Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    get(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| Error::Config {
                message: format!("invalid value '{}': {}", raw, e),
                key: Some(key.to_string()),
            })
        })
        .transpose()
}

/// Turn a SQLite connection URI into a database file path
///
/// Accepts `sqlite:///relative.db`, `sqlite:////absolute.db`, `sqlite://file.db`,
/// `sqlite:file.db` and bare paths.
fn database_path_from_uri(uri: &str) -> Result<PathBuf> {
    let path = if let Some(rest) = uri.strip_prefix("sqlite:///") {
        rest
    } else if let Some(rest) = uri.strip_prefix("sqlite://") {
        rest
    } else if let Some(rest) = uri.strip_prefix("sqlite:") {
        rest
    } else if uri.contains("://") {
        return Err(Error::Config {
            message: format!("only sqlite databases are supported, got '{}'", uri),
            key: Some("DATABASE_URI".to_string()),
        });
    } else {
        uri
    };

    if path.is_empty() {
        return Err(Error::Config {
            message: "database URI does not name a file".to_string(),
            key: Some("DATABASE_URI".to_string()),
        });
    }
    Ok(PathBuf::from(path))
}

fn default_path_prefix() -> String {
    "foodbasket".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_batch_size() -> NonZeroU32 {
    NonZeroU32::MIN.saturating_add(49)
}

fn default_mail_api_url() -> String {
    "https://api.resend.com".to_string()
}

fn default_sender_name() -> String {
    "SynergyDailyBasket".to_string()
}

fn default_mail_timeout() -> Duration {
    Duration::from_secs(60)
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

fn default_hour() -> u32 {
    6
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_secs(30 * 60)
}

fn default_backoff_multiplier() -> f64 {
    1.0
}

fn default_database_path() -> PathBuf {
    PathBuf::from("./daily_basket.db")
}

fn default_bind_address() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 5000))
}

// Duration serialization helper (as seconds)
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_secs())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
