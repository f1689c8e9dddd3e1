//! Optional TOML configuration file.
//!
//! Every section may be omitted; missing values fall back to the built-in
//! defaults. Example:
//!
//! ```toml
//! [overpass]
//! endpoint = "https://overpass.kumi.systems/api/interpreter"
//!
//! [fetch]
//! concurrency = 1
//!
//! [[regions]]
//! name = "silom"
//! scope = "city"
//! south = 13.71
//! west = 100.51
//! north = 13.74
//! east = 100.54
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::error::{DetectiveError, Result};
use crate::models::GeoArea;
use crate::overpass::{DEFAULT_ENDPOINT, DEFAULT_USER_AGENT};
use crate::pipeline::{InvestigationSettings, RetryPolicy};
use crate::regions::{RegionTable, Scope};
use crate::tiling::{Partitioner, DEFAULT_MAX_TILES, SINGLE_QUERY_AREA};

#[derive(Debug, Deserialize, Clone, Default, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub overpass: OverpassConfig,
    pub tiling: TilingConfig,
    pub retry: RetryConfig,
    pub fetch: FetchConfig,
    pub regions: Vec<RegionConfig>,
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct OverpassConfig {
    pub endpoint: String,
    pub user_agent: String,
}

impl Default for OverpassConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TilingConfig {
    pub max_tiles: usize,
    /// Square degrees below which an area is fetched in one request
    pub single_query_area: f64,
}

impl Default for TilingConfig {
    fn default() -> Self {
        Self {
            max_tiles: DEFAULT_MAX_TILES,
            single_query_area: SINGLE_QUERY_AREA,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RetryConfig {
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub backoff_multiplier: f64,
    pub max_backoff_ms: u64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff_ms: 1_000,
            backoff_multiplier: 2.0,
            max_backoff_ms: 30_000,
        }
    }
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct FetchConfig {
    pub concurrency: usize,
    pub request_delay_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            concurrency: 2,
            request_delay_ms: 500,
        }
    }
}

/// A region added to, or replacing one in, the built-in table.
#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RegionConfig {
    pub name: String,
    pub scope: Scope,
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Config {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            DetectiveError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&content)
            .map_err(|e| DetectiveError::Config(format!("{}: {}", path.display(), e)))
    }

    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)
            .map_err(|e| DetectiveError::Config(format!("failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.tiling.max_tiles == 0 {
            return Err(DetectiveError::Config("tiling.max_tiles must be at least 1".into()));
        }
        if self.fetch.concurrency == 0 {
            return Err(DetectiveError::Config("fetch.concurrency must be at least 1".into()));
        }
        if self.retry.max_attempts == 0 {
            return Err(DetectiveError::Config("retry.max_attempts must be at least 1".into()));
        }
        if !self.retry.backoff_multiplier.is_finite() || self.retry.backoff_multiplier < 1.0 {
            return Err(DetectiveError::Config(format!(
                "retry.backoff_multiplier must be >= 1.0, got {}",
                self.retry.backoff_multiplier
            )));
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            max_attempts: self.retry.max_attempts,
            initial_backoff: Duration::from_millis(self.retry.initial_backoff_ms),
            multiplier: self.retry.backoff_multiplier,
            max_backoff: Duration::from_millis(self.retry.max_backoff_ms),
        }
    }

    pub fn settings(&self) -> InvestigationSettings {
        InvestigationSettings {
            max_tiles: self.tiling.max_tiles,
            concurrency: self.fetch.concurrency,
            request_delay: Duration::from_millis(self.fetch.request_delay_ms),
            ..InvestigationSettings::default()
        }
    }

    pub fn partitioner(&self) -> Result<Partitioner> {
        Partitioner::new(self.tiling.single_query_area)
            .map_err(|e| DetectiveError::Config(format!("tiling.single_query_area: {}", e)))
    }

    /// Built-in regions with the file's `[[regions]]` entries layered on top.
    pub fn region_table(&self) -> Result<RegionTable> {
        let mut table = RegionTable::builtin()?;
        for region in &self.regions {
            let area = GeoArea::new(region.south, region.west, region.north, region.east)
                .map_err(|e| DetectiveError::Config(format!("region '{}': {}", region.name, e)))?;
            table.insert(&region.name, region.scope, area);
        }
        Ok(table)
    }
}
