//! YAML configuration shared by the CLI and the desktop shell.
//!
//! ```yaml
//! source: json            # or legacy-script
//! base_url: https://example.org/gi
//! language: en            # en | chs | jp | kr
//! timeout_secs: 20
//! plan:
//!   - character_id: "10000002"
//!     level_from: 1
//!     level_to: 90
//!     talent_from: [1, 1, 1]
//!     talent_to: [10, 10, 10]
//! ```
//!
//! Every field is optional. `PLANNER_BASE_URL` overrides `base_url`.

use crate::{ConfiguredSource, DataError, HttpTransport, JsonSource, LegacyScriptSource};
use planner_core::PlanRequest;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info};

pub const DEFAULT_BASE_URL: &str =
    "https://cnb.cool/bling-team/yuhengbei/-/git/raw/main/output/hakush/gi";
pub const BASE_URL_ENV: &str = "PLANNER_BASE_URL";

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceKind {
    #[default]
    Json,
    LegacyScript,
}

/// Language of display names.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Chs,
    Jp,
    Kr,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlannerConfig {
    pub source: SourceKind,
    pub base_url: String,
    pub language: Language,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
    /// Where icons are stored; front ends pick a default when unset.
    pub image_cache_dir: Option<PathBuf>,
    /// Batch evaluated by `plan`.
    pub plan: Vec<PlanRequest>,
}

impl Default for PlannerConfig {
    fn default() -> Self {
        Self {
            source: SourceKind::Json,
            base_url: DEFAULT_BASE_URL.to_string(),
            language: Language::En,
            timeout_secs: 20,
            user_agent: concat!("material-planner/", env!("CARGO_PKG_VERSION")).to_string(),
            image_cache_dir: None,
            plan: Vec::new(),
        }
    }
}

impl PlannerConfig {
    pub fn from_yaml_str(text: &str) -> Result<Self, DataError> {
        let config: Self =
            serde_yaml::from_str(text).map_err(|e| DataError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self, DataError> {
        let text = std::fs::read_to_string(path)?;
        let config = Self::from_yaml_str(&text)?;
        info!(path = %path.display(), source = ?config.source, "configuration loaded");
        Ok(config)
    }

    fn validate(&self) -> Result<(), DataError> {
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(DataError::Config(format!(
                "base_url must be an http(s) URL, got `{}`",
                self.base_url
            )));
        }
        if self.timeout_secs == 0 {
            return Err(DataError::Config("timeout_secs must be positive".into()));
        }
        Ok(())
    }

    /// Apply `PLANNER_BASE_URL` when set and non-empty.
    pub fn apply_env(&mut self) -> Result<(), DataError> {
        self.apply_base_url_override(std::env::var(BASE_URL_ENV).ok())
    }

    fn apply_base_url_override(&mut self, value: Option<String>) -> Result<(), DataError> {
        if let Some(url) = value.filter(|v| !v.trim().is_empty()) {
            debug!(base_url = %url, "base url overridden from environment");
            self.base_url = url.trim().to_string();
            self.validate()?;
        }
        Ok(())
    }

    pub fn transport(&self) -> HttpTransport {
        HttpTransport::new(Duration::from_secs(self.timeout_secs), &self.user_agent)
    }

    pub fn build_source(&self) -> ConfiguredSource<HttpTransport> {
        let transport = self.transport();
        match self.source {
            SourceKind::Json => {
                ConfiguredSource::Json(JsonSource::new(&*self.base_url, self.language, transport))
            }
            SourceKind::LegacyScript => {
                ConfiguredSource::Legacy(LegacyScriptSource::new(&*self.base_url, transport))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::UpstreamSource;

    #[test]
    fn empty_document_gives_defaults() {
        let config = PlannerConfig::from_yaml_str("{}").unwrap();
        assert_eq!(config, PlannerConfig::default());
    }

    #[test]
    fn full_document() {
        let config = PlannerConfig::from_yaml_str(
            r#"
source: legacy-script
base_url: https://legacy.example/gi/
language: chs
plan:
  - character_id: "10000046"
    level_from: 1
    level_to: 90
    talent_from: [1, 1, 1]
    talent_to: [10, 10, 10]
"#,
        )
        .unwrap();
        assert_eq!(config.source, SourceKind::LegacyScript);
        assert_eq!(config.language, Language::Chs);
        assert_eq!(config.plan.len(), 1);
        assert_eq!(config.plan[0].targets.talent_to, [10, 10, 10]);

        let source = config.build_source();
        assert_eq!(source.name(), "legacy-script");
        assert_eq!(source.icon_url("x"), "https://legacy.example/gi/icon/x.png");
    }

    #[test]
    fn bad_values_are_rejected() {
        assert!(matches!(
            PlannerConfig::from_yaml_str("base_url: ftp://nope"),
            Err(DataError::Config(_))
        ));
        assert!(matches!(
            PlannerConfig::from_yaml_str("timeout_secs: 0"),
            Err(DataError::Config(_))
        ));
        assert!(matches!(
            PlannerConfig::from_yaml_str("source: carrier-pigeon"),
            Err(DataError::Config(_))
        ));
    }

    #[test]
    fn base_url_override() {
        let mut config = PlannerConfig::default();
        config.apply_base_url_override(Some("  ".into())).unwrap();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        config
            .apply_base_url_override(Some("http://mirror.local/gi".into()))
            .unwrap();
        assert_eq!(config.base_url, "http://mirror.local/gi");
        assert!(config.apply_base_url_override(Some("mirror".into())).is_err());
    }
}
