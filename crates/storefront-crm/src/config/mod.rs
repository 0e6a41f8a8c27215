use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

use rust_decimal::Decimal;

use crate::engine::loyalty::TierPolicy;

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
    pub dispatch: DispatchConfig,
    pub loyalty: LoyaltyConfig,
    pub contact: ContactConfig,
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

        let concurrency = env::var("DISPATCH_CONCURRENCY")
            .unwrap_or_else(|_| DispatchConfig::DEFAULT_CONCURRENCY.to_string())
            .parse::<usize>()
            .ok()
            .filter(|value| DispatchConfig::CONCURRENCY_RANGE.contains(value))
            .ok_or(ConfigError::InvalidConcurrency)?;
        let email_subject = env::var("CAMPAIGN_EMAIL_SUBJECT")
            .unwrap_or_else(|_| DispatchConfig::DEFAULT_EMAIL_SUBJECT.to_string());

        let spend_per_point = env::var("LOYALTY_SPEND_PER_POINT")
            .unwrap_or_else(|_| "25".to_string())
            .parse::<Decimal>()
            .ok()
            .filter(|value| *value > Decimal::ZERO)
            .ok_or(ConfigError::InvalidSpendPerPoint)?;
        let silver_points = parse_points("TIER_SILVER_POINTS", 1_000)?;
        let gold_points = parse_points("TIER_GOLD_POINTS", 5_000)?;
        if gold_points <= silver_points {
            return Err(ConfigError::InvalidTierThresholds);
        }

        let per_minute = env::var("CONTACT_RATE_LIMIT_PER_MINUTE")
            .unwrap_or_else(|_| "5".to_string())
            .parse::<u32>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidRateLimit)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            dispatch: DispatchConfig {
                concurrency,
                email_subject,
            },
            loyalty: LoyaltyConfig {
                spend_per_point,
                tiers: TierPolicy {
                    silver_points,
                    gold_points,
                },
            },
            contact: ContactConfig {
                requests_per_minute: per_minute,
            },
        })
    }
}

fn parse_points(key: &'static str, default: i64) -> Result<i64, ConfigError> {
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<i64>()
            .ok()
            .filter(|value| *value > 0)
            .ok_or(ConfigError::InvalidTierThresholds),
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

/// Worker pool size for campaign runs and bulk rescoring, plus message defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DispatchConfig {
    pub concurrency: usize,
    pub email_subject: String,
}

impl DispatchConfig {
    pub const DEFAULT_CONCURRENCY: usize = 8;
    pub const CONCURRENCY_RANGE: std::ops::RangeInclusive<usize> = 1..=64;
    pub const DEFAULT_EMAIL_SUBJECT: &'static str = "News from the shop";
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            concurrency: Self::DEFAULT_CONCURRENCY,
            email_subject: Self::DEFAULT_EMAIL_SUBJECT.to_string(),
        }
    }
}

/// Point earning rate and tier thresholds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoyaltyConfig {
    pub spend_per_point: Decimal,
    pub tiers: TierPolicy,
}

impl Default for LoyaltyConfig {
    fn default() -> Self {
        Self {
            spend_per_point: Decimal::from(25),
            tiers: TierPolicy::default(),
        }
    }
}

/// Limits for the public contact channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ContactConfig {
    pub requests_per_minute: u32,
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidConcurrency,
    InvalidSpendPerPoint,
    InvalidTierThresholds,
    InvalidRateLimit,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidConcurrency => {
                write!(f, "DISPATCH_CONCURRENCY must be between 1 and 64")
            }
            ConfigError::InvalidSpendPerPoint => {
                write!(f, "LOYALTY_SPEND_PER_POINT must be a positive decimal")
            }
            ConfigError::InvalidTierThresholds => write!(
                f,
                "TIER_SILVER_POINTS and TIER_GOLD_POINTS must be positive with gold above silver"
            ),
            ConfigError::InvalidRateLimit => {
                write!(f, "CONTACT_RATE_LIMIT_PER_MINUTE must be a positive integer")
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
