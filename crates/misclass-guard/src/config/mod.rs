use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::time::Duration;

use crate::classification::{PolicyError, ScoringConfig};

/// One year; longer cadences are treated as misconfiguration.
pub const MAX_REASSESSMENT_INTERVAL_HOURS: u64 = 24 * 365;

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
    pub classification: ClassificationConfig,
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

        let reassessment_interval_hours = env::var("REASSESSMENT_INTERVAL_HOURS")
            .unwrap_or_else(|_| "24".to_string())
            .parse::<u64>()
            .ok()
            .filter(|hours| (1..=MAX_REASSESSMENT_INTERVAL_HOURS).contains(hours))
            .ok_or(ConfigError::InvalidReassessmentInterval)?;

        let dashboard_top_n = env::var("DASHBOARD_TOP_N")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<usize>()
            .ok()
            .filter(|top_n| *top_n >= 1)
            .ok_or(ConfigError::InvalidDashboardTopN)?;

        let policy_path = env::var("CLASSIFICATION_POLICY_PATH")
            .ok()
            .map(|raw| raw.trim().to_string())
            .filter(|raw| !raw.is_empty())
            .map(PathBuf::from);

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            classification: ClassificationConfig {
                reassessment_interval_hours,
                dashboard_top_n,
                policy_path,
            },
        })
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

/// Scoring policy source, reassessment cadence, and dashboard sizing.
#[derive(Debug, Clone)]
pub struct ClassificationConfig {
    pub reassessment_interval_hours: u64,
    pub dashboard_top_n: usize,
    pub policy_path: Option<PathBuf>,
}

impl ClassificationConfig {
    /// Hours outside `1..=MAX_REASSESSMENT_INTERVAL_HOURS` are clamped into range.
    pub fn reassessment_interval(&self) -> Duration {
        let hours = self
            .reassessment_interval_hours
            .clamp(1, MAX_REASSESSMENT_INTERVAL_HOURS);
        Duration::from_secs(hours * 60 * 60)
    }

    /// Default rubric unless a policy file is configured, in which case it must validate.
    pub fn scoring_config(&self) -> Result<ScoringConfig, ConfigError> {
        match &self.policy_path {
            Some(path) => ScoringConfig::from_json_file(path).map_err(ConfigError::Policy),
            None => Ok(ScoringConfig::default()),
        }
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidReassessmentInterval,
    InvalidDashboardTopN,
    Policy(PolicyError),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidReassessmentInterval => {
                write!(
                    f,
                    "REASSESSMENT_INTERVAL_HOURS must be a whole number between 1 and {}",
                    MAX_REASSESSMENT_INTERVAL_HOURS
                )
            }
            ConfigError::InvalidDashboardTopN => {
                write!(f, "DASHBOARD_TOP_N must be a whole number >= 1")
            }
            ConfigError::Policy(err) => write!(f, "CLASSIFICATION_POLICY_PATH: {}", err),
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::Policy(err) => Some(err),
            ConfigError::InvalidPort
            | ConfigError::InvalidReassessmentInterval
            | ConfigError::InvalidDashboardTopN => None,
        }
    }
}
