use crate::error::{config_error, env_error, AppResult};
use chrono_tz::Tz;
use dotenvy::dotenv;
use serde::Deserialize;
use std::env;
use std::fs;
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

pub const DEFAULT_REDIRECT_URI: &str = "http://localhost:3000/authorize";
pub const DEFAULT_AUTHORITY: &str = "https://login.microsoftonline.com/common";
pub const DEFAULT_API_ENDPOINT: &str = "https://outlook.office.com/api/v2.0";
pub const DEFAULT_PREFERRED_TIMEZONE: &str = "Eastern Standard Time";
pub const DEFAULT_SYNC_TIMEZONE: &str = "America/New_York";
pub const DEFAULT_CONFIG_PATH: &str = "config/calsync.toml";

/// Minimum length of the cookie signing secret
const MIN_SESSION_SECRET_LEN: usize = 32;

const MAX_SYNC_WINDOW_DAYS: i64 = 366;
const MAX_SYNC_PAGE_SIZE: u32 = 1000;
const MAX_HTTP_TIMEOUT_SECS: u64 = 600;
const MIN_SESSION_TTL_SECS: u64 = 60;
const MAX_SESSION_TTL_SECS: u64 = 90 * 24 * 60 * 60;

/// Main configuration structure for the server
#[derive(Debug, Clone)]
pub struct Config {
    /// OAuth client ID registered with the identity provider
    pub client_id: String,
    /// OAuth client secret
    pub client_secret: String,
    /// Redirect URI registered for the authorization-code flow
    pub redirect_uri: Url,
    /// Identity provider authority, e.g. the `common` tenant
    pub authority: Url,
    /// Base URL of the calendar REST API
    pub api_endpoint: Url,
    /// Windows time zone name sent in the `outlook.timezone` preference
    pub preferred_timezone: String,
    /// Zone used to find midnight for the sync window
    pub sync_timezone: Tz,
    /// Number of days covered by a sync window
    pub sync_window_days: i64,
    /// Maximum number of changes per sync response
    pub sync_page_size: u32,
    /// Upper bound for every outbound HTTP call
    pub http_timeout: Duration,
    pub bind_addr: IpAddr,
    pub port: u16,
    /// Redis connection string for session storage, memory store when unset
    pub redis_url: Option<String>,
    /// Master key material for signed session cookies
    pub session_secret: String,
    pub session_ttl_secs: u64,
    /// Directory served under `/static`
    pub static_dir: String,
}

/// Non-secret settings that may come from the TOML config file
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    pub redirect_uri: Option<String>,
    pub authority: Option<String>,
    pub api_endpoint: Option<String>,
    pub preferred_timezone: Option<String>,
    pub sync_timezone: Option<String>,
    pub sync_window_days: Option<i64>,
    pub sync_page_size: Option<u32>,
    pub http_timeout_secs: Option<u64>,
    pub bind_addr: Option<String>,
    pub port: Option<u16>,
    pub session_ttl_secs: Option<u64>,
    pub static_dir: Option<String>,
}

impl FileConfig {
    /// Read overrides from a TOML file, an absent file yields no overrides
    pub fn read(path: &str) -> AppResult<Self> {
        match fs::read_to_string(path) {
            Ok(content) => Ok(toml::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(e.into()),
        }
    }
}

impl Config {
    /// Load configuration from environment and config file
    pub fn load() -> AppResult<Self> {
        // Load .env file if it exists
        dotenv().ok();

        let path = env::var("CALSYNC_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        let file = FileConfig::read(&path)?;

        Self::from_source(|key| env::var(key).ok(), file)
    }

    /// Build the configuration from a variable lookup and file overrides.
    ///
    /// Variables win over the file; secrets are only read from variables.
    pub fn from_source<F>(lookup: F, file: FileConfig) -> AppResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.trim().is_empty())
                .ok_or_else(|| env_error(key))
        };

        let client_id = required("OUTLOOK_CLIENT_ID")?;
        let client_secret = required("OUTLOOK_CLIENT_SECRET")?;
        let session_secret = required("SESSION_SECRET")?;
        if session_secret.len() < MIN_SESSION_SECRET_LEN {
            return Err(config_error(&format!(
                "SESSION_SECRET must be at least {} bytes",
                MIN_SESSION_SECRET_LEN
            )));
        }

        let redirect_uri = parse_url(
            "REDIRECT_URI",
            lookup("REDIRECT_URI")
                .or(file.redirect_uri)
                .unwrap_or_else(|| DEFAULT_REDIRECT_URI.to_string()),
        )?;
        let authority = parse_url(
            "OAUTH_AUTHORITY",
            lookup("OAUTH_AUTHORITY")
                .or(file.authority)
                .unwrap_or_else(|| DEFAULT_AUTHORITY.to_string()),
        )?;
        let api_endpoint = parse_url(
            "OUTLOOK_API_ENDPOINT",
            lookup("OUTLOOK_API_ENDPOINT")
                .or(file.api_endpoint)
                .unwrap_or_else(|| DEFAULT_API_ENDPOINT.to_string()),
        )?;

        let preferred_timezone = lookup("PREFERRED_TIMEZONE")
            .or(file.preferred_timezone)
            .unwrap_or_else(|| DEFAULT_PREFERRED_TIMEZONE.to_string());

        let sync_timezone = lookup("SYNC_TIMEZONE")
            .or(file.sync_timezone)
            .unwrap_or_else(|| DEFAULT_SYNC_TIMEZONE.to_string());
        let sync_timezone = sync_timezone
            .parse::<Tz>()
            .map_err(|_| config_error(&format!("Invalid SYNC_TIMEZONE: {}", sync_timezone)))?;

        let sync_window_days = parse_number("SYNC_WINDOW_DAYS", &lookup, file.sync_window_days, 7)?;
        check_range("SYNC_WINDOW_DAYS", sync_window_days, 1, MAX_SYNC_WINDOW_DAYS)?;
        let sync_page_size = parse_number("SYNC_PAGE_SIZE", &lookup, file.sync_page_size, 5)?;
        check_range("SYNC_PAGE_SIZE", sync_page_size, 1, MAX_SYNC_PAGE_SIZE)?;
        let http_timeout_secs =
            parse_number("HTTP_TIMEOUT_SECS", &lookup, file.http_timeout_secs, 30)?;
        check_range("HTTP_TIMEOUT_SECS", http_timeout_secs, 1, MAX_HTTP_TIMEOUT_SECS)?;
        let port = parse_number("PORT", &lookup, file.port, 3000)?;
        let session_ttl_secs =
            parse_number("SESSION_TTL_SECS", &lookup, file.session_ttl_secs, 24 * 60 * 60)?;
        check_range(
            "SESSION_TTL_SECS",
            session_ttl_secs,
            MIN_SESSION_TTL_SECS,
            MAX_SESSION_TTL_SECS,
        )?;

        let bind_addr = lookup("BIND_ADDR")
            .or(file.bind_addr)
            .unwrap_or_else(|| "127.0.0.1".to_string());
        let bind_addr = bind_addr
            .parse::<IpAddr>()
            .map_err(|_| config_error(&format!("Invalid BIND_ADDR: {}", bind_addr)))?;

        let redis_url = lookup("REDIS_URL").filter(|v| !v.trim().is_empty());
        let static_dir = lookup("STATIC_DIR")
            .or(file.static_dir)
            .unwrap_or_else(|| "static".to_string());

        Ok(Config {
            client_id,
            client_secret,
            redirect_uri,
            authority,
            api_endpoint,
            preferred_timezone,
            sync_timezone,
            sync_window_days,
            sync_page_size,
            http_timeout: Duration::from_secs(http_timeout_secs),
            bind_addr,
            port,
            redis_url,
            session_secret,
            session_ttl_secs,
            static_dir,
        })
    }
}

fn parse_url(key: &str, value: String) -> AppResult<Url> {
    Url::parse(&value).map_err(|e| config_error(&format!("Invalid {}: {}", key, e)))
}

fn check_range<T>(key: &str, value: T, min: T, max: T) -> AppResult<()>
where
    T: PartialOrd + std::fmt::Display,
{
    if value < min || value > max {
        return Err(config_error(&format!(
            "{} must be between {} and {}, got {}",
            key, min, max, value
        )));
    }
    Ok(())
}

fn parse_number<T, F>(key: &str, lookup: &F, file_value: Option<T>, default: T) -> AppResult<T>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map_err(|_| config_error(&format!("Invalid {} format", key))),
        None => Ok(file_value.unwrap_or(default)),
    }
}
