use crate::workflows::income::{AssemblerSettings, CalendarKind};
use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

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
    pub income: IncomeConfig,
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
        let log_format = parse_var::<LogFormat>("APP_LOG_FORMAT")?.unwrap_or_default();

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig {
                log_level,
                format: log_format,
            },
            income: IncomeConfig::from_env()?,
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
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Compact,
    Json,
}

impl FromStr for LogFormat {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "compact" | "text" => Ok(Self::Compact),
            "json" => Ok(Self::Json),
            other => Err(format!("unknown log format '{other}'")),
        }
    }
}

/// Income report round trip, correlation housekeeping, and calendar choice.
#[derive(Debug, Clone)]
pub struct IncomeConfig {
    pub response_timeout: Duration,
    pub slot_grace_period: Duration,
    pub sweep_interval: Duration,
    pub max_benchmark_age_months: u32,
    pub calendar: CalendarKind,
    pub fixture_path: Option<PathBuf>,
}

impl Default for IncomeConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_millis(10_000),
            slot_grace_period: Duration::from_secs(300),
            sweep_interval: Duration::from_secs(60),
            max_benchmark_age_months: 2,
            calendar: CalendarKind::Norwegian,
            fixture_path: None,
        }
    }
}

impl IncomeConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let response_timeout = parse_var::<u64>("INCOME_RESPONSE_TIMEOUT_MS")?
            .map(Duration::from_millis)
            .unwrap_or(defaults.response_timeout);
        let slot_grace_period = parse_var::<u64>("INCOME_SLOT_GRACE_SECS")?
            .map(Duration::from_secs)
            .unwrap_or(defaults.slot_grace_period);
        let sweep_interval = parse_var::<u64>("INCOME_SWEEP_INTERVAL_SECS")?
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
            .unwrap_or(defaults.sweep_interval);
        let max_benchmark_age_months = parse_var::<u32>("INCOME_MAX_BENCHMARK_AGE_MONTHS")?
            .unwrap_or(defaults.max_benchmark_age_months);
        let calendar = parse_var::<CalendarKind>("INCOME_CALENDAR")?
            .unwrap_or(defaults.calendar);
        let fixture_path = env::var("INCOME_FIXTURE_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        Ok(Self {
            response_timeout,
            slot_grace_period,
            sweep_interval,
            max_benchmark_age_months,
            calendar,
            fixture_path,
        })
    }

    pub fn assembler_settings(&self) -> AssemblerSettings {
        AssemblerSettings {
            response_timeout: self.response_timeout,
            max_benchmark_age_months: self.max_benchmark_age_months,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) => value
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        Err(_) => Ok(None),
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    InvalidValue { name: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::InvalidValue { name, value } => {
                write!(f, "{name} has an invalid value '{value}'")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort | ConfigError::InvalidValue { .. } => None,
            ConfigError::InvalidHost { source } => Some(source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;
    use std::sync::{Mutex, OnceLock};

    fn env_guard() -> &'static Mutex<()> {
        static GUARD: OnceLock<Mutex<()>> = OnceLock::new();
        GUARD.get_or_init(|| Mutex::new(()))
    }

    fn reset_env() {
        for name in [
            "APP_ENV",
            "APP_HOST",
            "APP_PORT",
            "APP_LOG_LEVEL",
            "APP_LOG_FORMAT",
            "INCOME_RESPONSE_TIMEOUT_MS",
            "INCOME_SLOT_GRACE_SECS",
            "INCOME_SWEEP_INTERVAL_SECS",
            "INCOME_MAX_BENCHMARK_AGE_MONTHS",
            "INCOME_CALENDAR",
            "INCOME_FIXTURE_PATH",
        ] {
            env::remove_var(name);
        }
    }

    #[test]
    fn load_uses_defaults_when_env_missing() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        let config = AppConfig::load().expect("config loads with defaults");
        assert_eq!(config.environment, AppEnvironment::Development);
        assert_eq!(config.server.host, "127.0.0.1");
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.telemetry.log_level, "info");
        assert_eq!(config.telemetry.format, LogFormat::Compact);
        assert_eq!(config.income.response_timeout, Duration::from_secs(10));
        assert_eq!(config.income.max_benchmark_age_months, 2);
        assert_eq!(config.income.calendar, CalendarKind::Norwegian);
        assert!(config.income.fixture_path.is_none());
    }

    #[test]
    fn accepts_localhost_host() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("APP_HOST", "localhost");
        let config = AppConfig::load().expect("config loads");
        let addr = config.server.socket_addr().expect("localhost resolves");
        assert_eq!(addr, SocketAddr::new(IpAddr::from([127, 0, 0, 1]), 3000));
        reset_env();
    }

    #[test]
    fn reads_income_overrides() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INCOME_RESPONSE_TIMEOUT_MS", "2500");
        env::set_var("INCOME_CALENDAR", "weekday");
        env::set_var("INCOME_FIXTURE_PATH", "fixtures/income_facts.json");
        let config = AppConfig::load().expect("config loads");
        assert_eq!(config.income.response_timeout, Duration::from_millis(2500));
        assert_eq!(config.income.calendar, CalendarKind::Weekday);
        assert_eq!(
            config.income.fixture_path,
            Some(PathBuf::from("fixtures/income_facts.json"))
        );
        reset_env();
    }

    #[test]
    fn rejects_malformed_income_values() {
        let _lock = env_guard().lock().expect("env mutex poisoned");
        reset_env();
        env::set_var("INCOME_SLOT_GRACE_SECS", "soon");
        let error = AppConfig::load().expect_err("invalid grace period");
        assert!(matches!(
            error,
            ConfigError::InvalidValue {
                name: "INCOME_SLOT_GRACE_SECS",
                ..
            }
        ));
        reset_env();
    }
}
