use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::str::FromStr;

use crate::dsl::{DEFAULT_MAX_DEPTH, ParseOptions, TypePolicy};
use crate::mapping::MappingConfig;

/// Settings file contents. Every field is optional.
#[derive(Debug, Deserialize, Serialize)]
pub struct FilterConfig {
    #[serde(default)]
    pub filter: Option<String>,
    #[serde(default = "default_max_depth")]
    pub max_depth: usize,
    #[serde(default)]
    pub type_policy: TypePolicy,
    #[serde(default)]
    pub on_error: ErrorPolicy,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    #[serde(default)]
    pub mappings: BTreeMap<String, MappingConfig>,
}

impl FilterConfig {
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from(path))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    pub fn parse_options(&self) -> ParseOptions {
        ParseOptions {
            max_depth: self.max_depth,
        }
    }
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            filter: None,
            max_depth: default_max_depth(),
            type_policy: TypePolicy::default(),
            on_error: ErrorPolicy::default(),
            batch_size: default_batch_size(),
            mappings: BTreeMap::new(),
        }
    }
}

fn default_max_depth() -> usize {
    DEFAULT_MAX_DEPTH
}

fn default_batch_size() -> usize {
    1024
}

/// What to do with a record the filter cannot be evaluated against.
#[derive(Debug, Default, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ErrorPolicy {
    /// Log a warning and move on.
    #[default]
    Skip,
    /// Stop processing with an error.
    Abort,
}

impl FromStr for ErrorPolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "skip" => Ok(ErrorPolicy::Skip),
            "abort" => Ok(ErrorPolicy::Abort),
            _ => Err(format!("invalid on_error: {value}")),
        }
    }
}
