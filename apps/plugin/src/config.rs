use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::reflow::{SearchOptions, WrapOptions, DEFAULT_SPACING, DEFAULT_WRAP_HEIGHT_PERCENT};

/// Host configuration loaded from environment variables.
/// Every value has a default; a value that is present but unparsable fails startup.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Spacing used when a UI message omits it.
    pub spacing: f64,
    /// Wrap-height percentage used when a UI message omits it.
    pub wrap_height_percent: i64,
    pub probe_settle_ms: u64,
    pub max_probes: Option<u32>,
    pub search_deadline_ms: Option<u64>,
    /// Simulated cost of each measurement in the metric renderer.
    pub render_latency_ms: u64,
    pub rust_log: String,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok(); // load .env if present; ignore if missing
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        Ok(Config {
            spacing: parse_or(&lookup, "WRAP_SPACING", DEFAULT_SPACING)?,
            wrap_height_percent: parse_or(
                &lookup,
                "WRAP_HEIGHT_PERCENT",
                DEFAULT_WRAP_HEIGHT_PERCENT,
            )?,
            probe_settle_ms: parse_or(&lookup, "PROBE_SETTLE_MS", 5)?,
            max_probes: parse_optional(&lookup, "MAX_PROBES")?,
            search_deadline_ms: parse_optional(&lookup, "SEARCH_DEADLINE_MS")?,
            render_latency_ms: parse_or(&lookup, "RENDER_LATENCY_MS", 0)?,
            rust_log: lookup("RUST_LOG").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Command defaults derived from this configuration.
    pub fn wrap_options(&self) -> WrapOptions {
        WrapOptions {
            spacing: self.spacing,
            wrap_height_percent: self.wrap_height_percent,
            search: SearchOptions {
                settle: Duration::from_millis(self.probe_settle_ms),
                max_probes: self.max_probes,
                deadline: self.search_deadline_ms.map(Duration::from_millis),
            },
        }
    }

    pub fn render_latency(&self) -> Duration {
        Duration::from_millis(self.render_latency_ms)
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    Ok(parse_optional(lookup, key)?.unwrap_or(default))
}

fn parse_optional<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    lookup(key)
        .map(|raw| {
            raw.trim()
                .parse::<T>()
                .with_context(|| format!("{key} must be a valid number, got '{raw}'"))
        })
        .transpose()
}
