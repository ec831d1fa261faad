use std::env;
use std::fmt;
use std::net::{IpAddr, SocketAddr};

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
    pub gateway: GatewaySettings,
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

        let gateway = GatewaySettings::load(environment)?;

        Ok(Self {
            environment,
            server: ServerConfig { host, port },
            telemetry: TelemetryConfig { log_level },
            gateway,
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

/// Payment gateway integration settings.
///
/// The shared secret keys the redirect/callback hash; outside development it
/// must come from the environment rather than the built-in placeholder.
#[derive(Debug, Clone)]
pub struct GatewaySettings {
    pub endpoint: String,
    pub secret: String,
    pub return_url: String,
    pub result_page: String,
    pub locale: String,
}

impl GatewaySettings {
    fn load(environment: AppEnvironment) -> Result<Self, ConfigError> {
        let endpoint = env::var("APP_GATEWAY_ENDPOINT")
            .unwrap_or_else(|_| "https://sandbox.gateway.example/pay".to_string());

        let secret = match env::var("APP_GATEWAY_SECRET") {
            Ok(value) if !value.trim().is_empty() => value,
            _ if environment == AppEnvironment::Production => {
                return Err(ConfigError::MissingGatewaySecret)
            }
            _ => "dev-gateway-secret".to_string(),
        };

        let return_url = env::var("APP_GATEWAY_RETURN_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/payments/callback".to_string());
        let result_page = env::var("APP_GATEWAY_RESULT_PAGE")
            .unwrap_or_else(|_| "http://127.0.0.1:3000/payments/result".to_string());
        let locale = env::var("APP_GATEWAY_LOCALE").unwrap_or_else(|_| "en".to_string());

        Ok(Self {
            endpoint,
            secret,
            return_url,
            result_page,
            locale,
        })
    }
}

#[derive(Debug)]
pub enum ConfigError {
    InvalidPort,
    InvalidHost { source: std::net::AddrParseError },
    MissingGatewaySecret,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidPort => write!(f, "APP_PORT must be a valid u16"),
            ConfigError::InvalidHost { .. } => {
                write!(f, "APP_HOST must parse to an IPv4 or IPv6 address")
            }
            ConfigError::MissingGatewaySecret => {
                write!(f, "APP_GATEWAY_SECRET is required outside development")
            }
        }
    }
}

impl std::error::Error for ConfigError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ConfigError::InvalidPort => None,
            ConfigError::InvalidHost { source } => Some(source),
            ConfigError::MissingGatewaySecret => None,
        }
    }
}
