//! Command-line interface for the quotegate server
//!
//! This module handles parsing of CLI arguments using clap, including the
//! upstream credential (flag or `QUOTEGATE_API_KEY` environment variable)
//! and the cache/rate-limit timing knobs.

use chrono::Duration;
use clap::Parser;
use thiserror::Error;

/// Error types for post-parse configuration validation
#[derive(Debug, Error)]
pub enum CliError {
    /// The symbol was empty after trimming
    #[error("Symbol must not be empty")]
    EmptySymbol,
    /// A zero TTL would make every read miss the cache
    #[error("Cache TTL must be at least 1 second")]
    ZeroTtl,
    /// A zero cooldown would make throttle handling a no-op
    #[error("Rate limit cooldown must be at least 1 second")]
    ZeroCooldown,
}

/// quotegate - cached read-through gateway for stock quotes
#[derive(Parser, Debug)]
#[command(name = "quotegate")]
#[command(about = "Rate-limit-aware caching gateway for stock quotes")]
#[command(version)]
pub struct Cli {
    /// Ticker symbol served by this instance
    #[arg(long, value_name = "SYMBOL", default_value = "AAPL")]
    pub symbol: String,

    /// Seconds a cached quote stays fresh
    #[arg(long, value_name = "SECONDS", default_value_t = 60)]
    pub ttl: u32,

    /// Seconds to back off after an upstream throttle signal
    #[arg(long, value_name = "SECONDS", default_value_t = 60)]
    pub cooldown: u32,

    /// Upstream API credential
    #[arg(
        long,
        value_name = "KEY",
        env = "QUOTEGATE_API_KEY",
        default_value = "",
        hide_env_values = true
    )]
    pub api_key: String,

    /// Address the HTTP server listens on
    #[arg(long, value_name = "ADDR", default_value = "127.0.0.1:3000")]
    pub bind: String,

    /// Override the upstream API base URL
    #[arg(long, value_name = "URL")]
    pub upstream_url: Option<String>,

    /// Keep quotes in memory only, skipping the on-disk cache
    #[arg(long)]
    pub no_disk_cache: bool,
}

/// Runtime configuration handed to the quote service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    /// Symbol every request resolves to, normalized to uppercase
    pub symbol: String,
    /// How long a cached quote counts as fresh
    pub cache_ttl: Duration,
    /// Upstream API credential; may be empty, in which case the service
    /// rejects requests until one is provided
    pub credential: String,
    /// Length of the back-off window opened by an upstream throttle signal
    pub limit_cooldown: Duration,
}

impl ServiceConfig {
    /// Validates and normalizes parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(ServiceConfig)` with the symbol uppercased
    /// * `Err(CliError)` if the symbol is empty or a timing knob is zero
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let symbol = cli.symbol.trim().to_uppercase();
        if symbol.is_empty() {
            return Err(CliError::EmptySymbol);
        }
        if cli.ttl == 0 {
            return Err(CliError::ZeroTtl);
        }
        if cli.cooldown == 0 {
            return Err(CliError::ZeroCooldown);
        }

        Ok(Self {
            symbol,
            cache_ttl: Duration::seconds(i64::from(cli.ttl)),
            credential: cli.api_key.clone(),
            limit_cooldown: Duration::seconds(i64::from(cli.cooldown)),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parse_defaults() {
        let cli = Cli::parse_from(["quotegate"]);
        assert_eq!(cli.symbol, "AAPL");
        assert_eq!(cli.ttl, 60);
        assert_eq!(cli.cooldown, 60);
        assert_eq!(cli.bind, "127.0.0.1:3000");
        assert!(cli.upstream_url.is_none());
        assert!(!cli.no_disk_cache);
    }

    #[test]
    fn test_cli_parse_custom_values() {
        let cli = Cli::parse_from([
            "quotegate",
            "--symbol",
            "msft",
            "--ttl",
            "30",
            "--cooldown",
            "120",
            "--bind",
            "0.0.0.0:8080",
            "--upstream-url",
            "http://localhost:9000",
            "--no-disk-cache",
        ]);
        assert_eq!(cli.symbol, "msft");
        assert_eq!(cli.ttl, 30);
        assert_eq!(cli.cooldown, 120);
        assert_eq!(cli.bind, "0.0.0.0:8080");
        assert_eq!(cli.upstream_url.as_deref(), Some("http://localhost:9000"));
        assert!(cli.no_disk_cache);
    }

    #[test]
    fn test_config_uppercases_symbol() {
        let cli = Cli::parse_from(["quotegate", "--symbol", " msft "]);
        let config = ServiceConfig::from_cli(&cli).unwrap();
        assert_eq!(config.symbol, "MSFT");
    }

    #[test]
    fn test_config_from_defaults() {
        let cli = Cli::parse_from(["quotegate"]);
        let config = ServiceConfig::from_cli(&cli).unwrap();
        assert_eq!(config.symbol, "AAPL");
        assert_eq!(config.cache_ttl, Duration::seconds(60));
        assert_eq!(config.limit_cooldown, Duration::seconds(60));
    }

    #[test]
    fn test_config_rejects_empty_symbol() {
        let cli = Cli::parse_from(["quotegate", "--symbol", "  "]);
        let result = ServiceConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::EmptySymbol)));
    }

    #[test]
    fn test_config_rejects_zero_ttl() {
        let cli = Cli::parse_from(["quotegate", "--ttl", "0"]);
        let result = ServiceConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::ZeroTtl)));
    }

    #[test]
    fn test_config_rejects_zero_cooldown() {
        let cli = Cli::parse_from(["quotegate", "--cooldown", "0"]);
        let result = ServiceConfig::from_cli(&cli);
        assert!(matches!(result, Err(CliError::ZeroCooldown)));
    }

    #[test]
    fn test_api_key_flag() {
        let cli = Cli::parse_from(["quotegate", "--api-key", "demo"]);
        let config = ServiceConfig::from_cli(&cli).unwrap();
        assert_eq!(config.credential, "demo");
    }

    #[test]
    fn test_empty_api_key_is_not_a_parse_error() {
        // Startup succeeds without a credential; requests are rejected at
        // serve time instead.
        let cli = Cli::parse_from(["quotegate"]);
        assert!(ServiceConfig::from_cli(&cli).is_ok());
    }
}
