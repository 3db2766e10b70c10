//! Per-mock configuration and the document loading shared with
//! expectation scripts.

use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Parse a YAML document. Enum values are written the way JSON writes them,
/// as single-key maps (`{atMost: 1}`) or bare names (`anything`).
pub(crate) fn parse_yaml<T: DeserializeOwned>(contents: &str) -> Result<T, serde_yaml::Error> {
    serde_yaml::with::singleton_map_recursive::deserialize(serde_yaml::Deserializer::from_str(
        contents,
    ))
}

/// Read a document from `path`: JSON for `.json` files, YAML otherwise.
pub(crate) fn load_document<T: DeserializeOwned>(path: &Path, what: &str) -> anyhow::Result<T> {
    let contents = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {} {}", what, path.display()))?;
    let is_json = path
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
    let parsed = if is_json {
        serde_json::from_str(&contents).map_err(anyhow::Error::from)
    } else {
        parse_yaml(&contents).map_err(anyhow::Error::from)
    };
    parsed.with_context(|| format!("Invalid {} {}", what, path.display()))
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockConfig {
    /// Name used in log lines and usage errors. Defaults to the mocked
    /// type's name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    /// Keep a log of replay calls for assertions.
    #[serde(default = "default_true")]
    pub record_calls: bool,

    /// Hand out nested mocks from setup calls whose return type is mockable.
    #[serde(default = "default_true")]
    pub recursive_stubbing: bool,

    /// Cap on the call log; the oldest entries are dropped first.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_recorded_calls: Option<usize>,
}

fn default_true() -> bool {
    true
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: None,
            record_calls: true,
            recursive_stubbing: true,
            max_recorded_calls: None,
        }
    }
}

impl MockConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            ..Self::default()
        }
    }

    /// Load from a YAML (or JSON) file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, anyhow::Error> {
        let path = path.as_ref();
        let config: MockConfig = load_document(path, "mock config")?;
        config
            .validate()
            .with_context(|| format!("Invalid mock config {}", path.display()))?;
        Ok(config)
    }

    pub fn from_yaml_str(contents: &str) -> Result<Self, anyhow::Error> {
        let config: MockConfig = parse_yaml(contents)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.max_recorded_calls == Some(0) {
            anyhow::bail!("maxRecordedCalls must be greater than 0");
        }
        if self.name.as_deref().is_some_and(|name| name.trim().is_empty()) {
            anyhow::bail!("name must not be blank");
        }
        Ok(())
    }
}
