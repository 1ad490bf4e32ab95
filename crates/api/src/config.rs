//! Application configuration loaded from environment variables.

use std::time::Duration;

use domain::{DEFAULT_SHIPPING_FLAT_CENTS, DEFAULT_TAX_RATE_BASIS_POINTS, Money, PricingEngine};
use store::RetryPolicy;

/// Server configuration with sensible defaults.
///
/// Reads from environment variables:
/// - `HOST` — bind address (default: `"0.0.0.0"`)
/// - `PORT` — listen port (default: `3000`)
/// - `DATABASE_URL` — Postgres connection string; unset selects the
///   in-memory store
/// - `RUST_LOG` — tracing filter directive (default: `"info"`)
/// - `PLACEMENT_MAX_RETRIES` — transaction retries after the first
///   attempt (default: `3`)
/// - `PLACEMENT_RETRY_DELAY_MS` — base retry backoff (default: `50`)
/// - `SHIPPING_FLAT_CENTS` — flat shipping charge (default: `500`)
/// - `TAX_RATE_BASIS_POINTS` — tax rate, 800 = 8% (default: `800`)
/// - `SEED_DEMO_DATA` — `1`/`true` seeds demo users and books at boot
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub database_url: Option<String>,
    pub log_level: String,
    pub placement_max_retries: u32,
    pub placement_retry_delay: Duration,
    pub shipping_flat_cents: i64,
    pub tax_rate_basis_points: u32,
    pub seed_demo_data: bool,
}

impl Config {
    /// Loads configuration from environment variables, falling back to
    /// defaults for anything unset or unparseable.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            host: std::env::var("HOST").unwrap_or(defaults.host),
            port: parsed_var("PORT").unwrap_or(defaults.port),
            database_url: std::env::var("DATABASE_URL").ok(),
            log_level: std::env::var("RUST_LOG").unwrap_or(defaults.log_level),
            placement_max_retries: parsed_var("PLACEMENT_MAX_RETRIES")
                .unwrap_or(defaults.placement_max_retries),
            placement_retry_delay: parsed_var("PLACEMENT_RETRY_DELAY_MS")
                .map(Duration::from_millis)
                .unwrap_or(defaults.placement_retry_delay),
            shipping_flat_cents: parsed_var("SHIPPING_FLAT_CENTS")
                .unwrap_or(defaults.shipping_flat_cents),
            tax_rate_basis_points: parsed_var("TAX_RATE_BASIS_POINTS")
                .unwrap_or(defaults.tax_rate_basis_points),
            seed_demo_data: std::env::var("SEED_DEMO_DATA")
                .is_ok_and(|v| v == "1" || v.eq_ignore_ascii_case("true")),
        }
    }

    /// Returns the `"host:port"` bind address string.
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Returns the retry policy for checkout transactions.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_retries: self.placement_max_retries,
            retry_delay: self.placement_retry_delay,
        }
    }

    /// Returns the pricing engine built from the configured rates.
    pub fn pricing_engine(&self) -> PricingEngine {
        PricingEngine::new(
            Money::from_cents(self.shipping_flat_cents),
            self.tax_rate_basis_points,
        )
    }
}

fn parsed_var<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

impl Default for Config {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            database_url: None,
            log_level: "info".to_string(),
            placement_max_retries: retry.max_retries,
            placement_retry_delay: retry.retry_delay,
            shipping_flat_cents: DEFAULT_SHIPPING_FLAT_CENTS,
            tax_rate_basis_points: DEFAULT_TAX_RATE_BASIS_POINTS,
            seed_demo_data: false,
        }
    }
}
