use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

use crate::draw::{DrawRules, IntakeRules};

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
    pub store: StoreConfig,
    pub draw: DrawConfig,
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

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            store: StoreConfig::from_env()?,
            draw: DrawConfig::from_env()?,
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

/// Tracing controls.
#[derive(Debug, Clone)]
pub struct TelemetryConfig {
    pub log_level: String,
}

/// Which record store backs the draw.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreConfig {
    Memory,
    Rest {
        url: String,
        api_key: String,
        timeout: Duration,
    },
}

impl StoreConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let backend = env::var("STORE_BACKEND").unwrap_or_else(|_| "memory".to_string());
        match backend.trim().to_ascii_lowercase().as_str() {
            "memory" | "in-memory" => Ok(Self::Memory),
            "rest" | "postgrest" => {
                let url = non_empty_var("STORE_URL").ok_or(ConfigError::MissingVar("STORE_URL"))?;
                let api_key =
                    non_empty_var("STORE_API_KEY").ok_or(ConfigError::MissingVar("STORE_API_KEY"))?;
                let timeout_secs = parse_var::<u64>("STORE_TIMEOUT_SECS")?.unwrap_or(10);
                Ok(Self::Rest {
                    url,
                    api_key,
                    timeout: Duration::from_secs(timeout_secs),
                })
            }
            other => Err(ConfigError::UnknownStoreBackend(other.to_string())),
        }
    }
}

/// Draw and intake limits plus the optional RNG seed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DrawConfig {
    pub seed: Option<u64>,
    pub rules: DrawRules,
}

impl DrawConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = DrawRules::default();
        let rules = DrawRules {
            max_mentors: parse_var("DRAW_MAX_MENTORS")?.unwrap_or(defaults.max_mentors),
            intake: IntakeRules {
                min_couples: parse_var("INTAKE_MIN_COUPLES")?
                    .unwrap_or(defaults.intake.min_couples),
                max_couples: parse_var("INTAKE_MAX_COUPLES")?
                    .unwrap_or(defaults.intake.max_couples),
            },
        };

        Ok(Self {
            seed: parse_var("DRAW_SEED")?,
            rules,
        })
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

fn parse_var<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    non_empty_var(name)
        .map(|value| value.parse::<T>().map_err(|_| ConfigError::InvalidNumber(name)))
        .transpose()
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidNumber(&'static str),
    MissingVar(&'static str),
    UnknownStoreBackend(String),
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidNumber(name) => {
                write!(f, "{name} must be a non-negative integer")
            }
            ConfigError::MissingVar(name) => {
                write!(f, "{name} is required when STORE_BACKEND=rest")
            }
            ConfigError::UnknownStoreBackend(value) => {
                write!(f, "STORE_BACKEND '{value}' is not one of memory, rest")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidHost { source } => Some(source),
            _ => None,
        }
    }
}
