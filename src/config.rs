//! Configuration types for the conversion service.
//!
//! All admission limits and pool sizing live in [`ServiceConfig`], built via
//! its [`ServiceConfigBuilder`]. The binary fills the builder from CLI flags
//! and environment variables; tests build one directly with tight limits.

use crate::error::ConvertError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Bytes per megabyte as used by `MAX_FILE_SIZE_MB`.
pub const MEGABYTE: u64 = 1024 * 1024;

/// Process-wide service configuration.
///
/// Built via [`ServiceConfig::builder()`] or using [`ServiceConfig::default()`].
///
/// # Example
/// ```rust
/// use pdf2md_server::ServiceConfig;
///
/// let config = ServiceConfig::builder()
///     .max_workers(8)
///     .max_file_size_mb(20)
///     .rate_limit("10/minute")
///     .build()
///     .unwrap();
/// assert_eq!(config.max_file_size, 20 * 1024 * 1024);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Interface to bind. Default: `127.0.0.1`.
    pub host: String,

    /// TCP port. Default: 8000.
    pub port: u16,

    /// Number of page workers in the shared pool. Default: 4.
    ///
    /// Fixed for the lifetime of the process. Pages beyond this many wait in
    /// the pool queue instead of oversubscribing the CPU.
    pub max_workers: usize,

    /// Maximum accepted request body size in bytes. Default: 50 MB.
    pub max_file_size: u64,

    /// Maximum number of pages per document. Default: 300.
    pub max_pages: usize,

    /// Per-client request quota. Default: `2/minute`.
    pub rate_limit: RateLimit,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            max_workers: 4,
            max_file_size: 50 * MEGABYTE,
            max_pages: 300,
            rate_limit: RateLimit::new(2, Duration::from_secs(60)),
        }
    }
}

impl ServiceConfig {
    /// Create a new builder for `ServiceConfig`.
    pub fn builder() -> ServiceConfigBuilder {
        ServiceConfigBuilder {
            config: Self::default(),
            rate_limit: None,
        }
    }

    /// `host:port` string suitable for a TCP listener.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Configured maximum body size in whole megabytes.
    pub fn max_file_size_mb(&self) -> u64 {
        self.max_file_size / MEGABYTE
    }
}

/// Builder for [`ServiceConfig`].
#[derive(Debug)]
pub struct ServiceConfigBuilder {
    config: ServiceConfig,
    rate_limit: Option<String>,
}

impl ServiceConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.config.host = host.into();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.config.port = port;
        self
    }

    pub fn max_workers(mut self, n: usize) -> Self {
        self.config.max_workers = n;
        self
    }

    pub fn max_file_size_mb(mut self, mb: u64) -> Self {
        self.config.max_file_size = mb.saturating_mul(MEGABYTE);
        self
    }

    /// Set the size limit in bytes. Mostly useful in tests.
    pub fn max_file_size_bytes(mut self, bytes: u64) -> Self {
        self.config.max_file_size = bytes;
        self
    }

    pub fn max_pages(mut self, n: usize) -> Self {
        self.config.max_pages = n;
        self
    }

    /// Rate limit in `N/unit` form, parsed during [`build`](Self::build).
    pub fn rate_limit(mut self, spec: impl Into<String>) -> Self {
        self.rate_limit = Some(spec.into());
        self
    }

    /// Build the configuration, validating constraints.
    pub fn build(mut self) -> Result<ServiceConfig, ConvertError> {
        if let Some(spec) = self.rate_limit.take() {
            self.config.rate_limit = spec.parse()?;
        }
        let c = &self.config;
        if c.max_workers == 0 {
            return Err(ConvertError::InvalidConfig(
                "MAX_WORKERS must be ≥ 1".into(),
            ));
        }
        if c.max_file_size == 0 {
            return Err(ConvertError::InvalidConfig(
                "MAX_FILE_SIZE_MB must be ≥ 1".into(),
            ));
        }
        Ok(self.config)
    }
}

// ── Rate limit ───────────────────────────────────────────────────────────

/// A request quota: at most `requests` per rolling `window`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimit {
    pub requests: u32,
    pub window: Duration,
}

impl RateLimit {
    pub fn new(requests: u32, window: Duration) -> Self {
        Self { requests, window }
    }
}

impl fmt::Display for RateLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let secs = self.window.as_secs();
        let (amount, unit) = if secs % 86_400 == 0 {
            (secs / 86_400, "day")
        } else if secs % 3_600 == 0 {
            (secs / 3_600, "hour")
        } else if secs % 60 == 0 {
            (secs / 60, "minute")
        } else {
            (secs, "second")
        };
        write!(f, "{} per {} {}", self.requests, amount, unit)
    }
}

impl FromStr for RateLimit {
    type Err = ConvertError;

    /// Accepts `2/minute`, `10/5 minutes`, `100 per hour` and similar.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || ConvertError::InvalidConfig(format!("Invalid RATE_LIMIT '{s}'"));
        let s = s.trim().to_ascii_lowercase();

        let (count, period) = s
            .split_once('/')
            .or_else(|| s.split_once(" per "))
            .ok_or_else(invalid)?;
        let requests: u32 = count.trim().parse().map_err(|_| invalid())?;
        if requests == 0 {
            return Err(invalid());
        }

        let period = period.trim();
        let (amount, unit) = match period.split_once(char::is_whitespace) {
            Some((n, unit)) => (n.parse::<u64>().map_err(|_| invalid())?, unit.trim()),
            None => {
                let digits: String = period.chars().take_while(char::is_ascii_digit).collect();
                if digits.is_empty() {
                    (1, period)
                } else {
                    (digits.parse().map_err(|_| invalid())?, &period[digits.len()..])
                }
            }
        };
        if amount == 0 {
            return Err(invalid());
        }

        let unit_secs = match unit.trim_end_matches('s') {
            "second" | "sec" => 1,
            "minute" | "min" => 60,
            "hour" => 3_600,
            "day" => 86_400,
            _ => return Err(invalid()),
        };

        Ok(Self::new(requests, Duration::from_secs(amount * unit_secs)))
    }
}
