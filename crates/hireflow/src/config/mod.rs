use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use crate::workflows::resume::{SlaMonitorConfig, SlaPolicy};

/// Distinguishes runtime behavior for different stages of the service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppEnvironment {
    Development,
    Test,
    Production,
}

impl AppEnvironment {
    fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "prod" | "production" => Self::Production,
            "test" | "ci" => Self::Test,
            _ => Self::Development,
        }
    }
}

/// Top-level configuration for the application.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub environment: AppEnvironment,
    pub server: ServerConfig,
    pub telemetry: TelemetryConfig,
    pub sla: SlaConfig,
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let environment = AppEnvironment::from_str(
            &env::var("APP_ENV").unwrap_or_else(|_| "development".to_string()),
        );

        let host = env::var("APP_HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = env::var("APP_PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse::<u16>()
            .map_err(|_| ConfigError::InvalidPort)?;

        let log_level = env::var("APP_LOG_LEVEL").unwrap_or_else(|_| "info".to_string());

        let defaults = SlaConfig::default();
        let sla = SlaConfig {
            identify_hours: positive("APP_SLA_IDENTIFY_HOURS", defaults.identify_hours)?,
            connection_hours: positive("APP_SLA_CONNECTION_HOURS", defaults.connection_hours)?,
            feedback_hours: positive("APP_SLA_FEEDBACK_HOURS", defaults.feedback_hours)?,
            sweep_interval_minutes: positive(
                "APP_SLA_SWEEP_INTERVAL_MINUTES",
                defaults.sweep_interval_minutes,
            )?,
            lookahead_hours: positive("APP_SLA_LOOKAHEAD_HOURS", defaults.lookahead_hours)?,
        };

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            sla,
        })
    }
}

fn positive(key: &'static str, default: u32) -> Result<u32, ConfigError> {
    match env::var(key) {
        Ok(raw) => match raw.trim().parse::<u32>() {
            Ok(value) if value > 0 => Ok(value),
            _ => Err(ConfigError::InvalidSla { key }),
        },
        Err(_) => Ok(default),
    }
}

/// Settings controlling the HTTP server binding.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        if self.host.eq_ignore_ascii_case("localhost") {
            return Ok(SocketAddr::new(IpAddr::from([127, 0, 0, 1]), self.port));
        }

        let ip: IpAddr = self
            .host
            .parse()
            .map_err(|source| ConfigError::InvalidHost { source })?;

        Ok(SocketAddr::new(ip, self.port))
    }
}

/// Tracing and metrics controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Deadline windows and monitor cadence, all strictly positive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlaConfig {
    pub identify_hours: u32,
    pub connection_hours: u32,
    pub feedback_hours: u32,
    pub sweep_interval_minutes: u32,
    pub lookahead_hours: u32,
}

impl Default for SlaConfig {
    fn default() -> Self {
        Self {
            identify_hours: 24,
            connection_hours: 24,
            feedback_hours: 120,
            sweep_interval_minutes: 30,
            lookahead_hours: 4,
        }
    }
}

impl SlaConfig {
    pub fn policy(&self) -> SlaPolicy {
        SlaPolicy {
            identify: chrono::Duration::hours(i64::from(self.identify_hours)),
            connection: chrono::Duration::hours(i64::from(self.connection_hours)),
            feedback: chrono::Duration::hours(i64::from(self.feedback_hours)),
        }
    }

    pub fn monitor(&self) -> SlaMonitorConfig {
        SlaMonitorConfig {
            interval: std::time::Duration::from_secs(u64::from(self.sweep_interval_minutes) * 60),
            lookahead: chrono::Duration::hours(i64::from(self.lookahead_hours)),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidSla { key: &'static str },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidSla { key } => write!(f, "{key} must be a positive integer"),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidSla { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}
