//! Validated search parameters.

use serde::Serialize;
use std::time::Duration;

use crate::error::{DetectiveError, Result};

/// How the search term is matched against the `name` tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    /// `name` equals the term
    Exact,
    /// `name` contains the term, case-insensitively
    Partial,
}

/// One requested place type: a bare key (`amenity`) or a key/value pair
/// (`amenity=restaurant`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TypeFilter {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl TypeFilter {
    pub fn parse(raw: &str) -> Result<Self> {
        let (key, value) = match raw.split_once('=') {
            Some((k, v)) => (k.trim(), Some(v.trim())),
            None => (raw.trim(), None),
        };
        if key.is_empty() {
            return Err(DetectiveError::InvalidSearchSpec(format!(
                "type filter '{}' has an empty key",
                raw
            )));
        }
        if value.is_some_and(str::is_empty) {
            return Err(DetectiveError::InvalidSearchSpec(format!(
                "type filter '{}' has an empty value",
                raw
            )));
        }
        Ok(Self {
            key: key.to_string(),
            value: value.map(str::to_string),
        })
    }
}

impl std::fmt::Display for TypeFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.value {
            Some(v) => write!(f, "{}={}", self.key, v),
            None => write!(f, "{}", self.key),
        }
    }
}

/// Immutable description of one investigation request.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SearchSpec {
    term: String,
    mode: MatchMode,
    filters: Vec<TypeFilter>,
    timeout: Duration,
    fuzzy_enabled: bool,
    fuzzy_threshold: u8,
}

impl SearchSpec {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
    pub const DEFAULT_FUZZY_THRESHOLD: u8 = 85;

    /// A spec with default timeout and fuzzy matching enabled at the default threshold.
    pub fn new(term: &str, mode: MatchMode) -> Result<Self> {
        SearchSpecBuilder::new(term, mode).build()
    }

    pub fn builder(term: &str, mode: MatchMode) -> SearchSpecBuilder {
        SearchSpecBuilder::new(term, mode)
    }

    pub fn term(&self) -> &str {
        &self.term
    }

    pub fn mode(&self) -> MatchMode {
        self.mode
    }

    pub fn filters(&self) -> &[TypeFilter] {
        &self.filters
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn fuzzy_enabled(&self) -> bool {
        self.fuzzy_enabled
    }

    pub fn fuzzy_threshold(&self) -> u8 {
        self.fuzzy_threshold
    }
}

pub struct SearchSpecBuilder {
    term: String,
    mode: MatchMode,
    filters: Vec<TypeFilter>,
    timeout: Duration,
    fuzzy_enabled: bool,
    fuzzy_threshold: i64,
}

impl SearchSpecBuilder {
    fn new(term: &str, mode: MatchMode) -> Self {
        Self {
            term: term.to_string(),
            mode,
            filters: Vec::new(),
            timeout: SearchSpec::DEFAULT_TIMEOUT,
            fuzzy_enabled: true,
            fuzzy_threshold: SearchSpec::DEFAULT_FUZZY_THRESHOLD as i64,
        }
    }

    pub fn filter(mut self, filter: TypeFilter) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn filters(mut self, filters: impl IntoIterator<Item = TypeFilter>) -> Self {
        self.filters.extend(filters);
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn fuzzy(mut self, enabled: bool) -> Self {
        self.fuzzy_enabled = enabled;
        self
    }

    pub fn fuzzy_threshold(mut self, threshold: i64) -> Self {
        self.fuzzy_threshold = threshold;
        self
    }

    pub fn build(self) -> Result<SearchSpec> {
        if self.term.trim().is_empty() {
            return Err(DetectiveError::InvalidSearchSpec(
                "search term must not be empty".to_string(),
            ));
        }
        if !(0..=100).contains(&self.fuzzy_threshold) {
            return Err(DetectiveError::InvalidSearchSpec(format!(
                "fuzzy threshold {} is outside 0-100",
                self.fuzzy_threshold
            )));
        }
        if self.timeout.is_zero() {
            return Err(DetectiveError::InvalidSearchSpec(
                "timeout must be positive".to_string(),
            ));
        }

        let mut filters: Vec<TypeFilter> = Vec::with_capacity(self.filters.len());
        for filter in self.filters {
            if !filters.contains(&filter) {
                filters.push(filter);
            }
        }

        Ok(SearchSpec {
            term: self.term,
            mode: self.mode,
            filters,
            timeout: self.timeout,
            fuzzy_enabled: self.fuzzy_enabled,
            fuzzy_threshold: self.fuzzy_threshold as u8,
        })
    }
}
