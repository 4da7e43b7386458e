//! Application configuration loaded from environment variables.

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `CHECKOUT_TTL_MINUTES` — checkout session TTL (default: `30`)
/// - `SWEEP_INTERVAL_SECS` — expiry sweep period (default: `60`)
/// - `SUMMARY_INTERVAL_HOURS` — daily summary period (default: `24`)
/// - `CURRENCY` — ISO currency code for payment intents (default: `"usd"`)
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub checkout_ttl_minutes: i64,
    pub sweep_interval_secs: u64,
    pub summary_interval_hours: u64,
    pub currency: String,
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults.
    pub fn from_env() -> Self {
        Self {
            host: std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            port: env_parse("PORT", 3000),
            checkout_ttl_minutes: env_parse("CHECKOUT_TTL_MINUTES", 30),
            sweep_interval_secs: env_parse("SWEEP_INTERVAL_SECS", 60),
            summary_interval_hours: env_parse("SUMMARY_INTERVAL_HOURS", 24),
            currency: std::env::var("CURRENCY").unwrap_or_else(|_| "usd".to_string()),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            checkout_ttl_minutes: 30,
            sweep_interval_secs: 60,
            summary_interval_hours: 24,
            currency: "usd".to_string(),
        }
    }
}
