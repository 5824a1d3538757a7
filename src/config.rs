use serde::Deserialize;
use tracing::warn;

use crate::error::{Error, Result};
use crate::planner::PlanOptions;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    Json,
    #[default]
    Text,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PlanningConfig {
    #[serde(default)]
    pub force_physical: bool,
    #[serde(default)]
    pub allow_physical_fallback: bool,
    /// Inline size limit in bytes; overrides the dialect's own limit.
    #[serde(default)]
    pub inline_size_limit: Option<usize>,
}

impl PlanningConfig {
    pub fn plan_options(&self, force_physical: bool) -> PlanOptions {
        PlanOptions {
            force_physical: force_physical || self.force_physical,
            allow_physical_fallback: self.allow_physical_fallback,
            size_limit: self.inline_size_limit,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub format: LogFormat,
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            level: default_log_level(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct RunnerConfig {
    #[serde(default)]
    pub planning: PlanningConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

fn env_flag(val: &str) -> bool {
    matches!(val.to_lowercase().as_str(), "true" | "1" | "yes")
}

impl RunnerConfig {
    /// Builds the configuration from optional TOML text, then applies
    /// `SQL_TEST_*` environment overrides.
    pub fn load(toml_text: Option<&str>) -> Result<Self> {
        let mut config = match toml_text {
            Some(text) => toml::from_str(text)
                .map_err(|e| Error::InvalidRequest(format!("Invalid config: {}", e)))?,
            None => RunnerConfig::default(),
        };
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Ok(val) = std::env::var("SQL_TEST_FORCE_PHYSICAL") {
            self.planning.force_physical = env_flag(&val);
        }
        if let Ok(val) = std::env::var("SQL_TEST_PHYSICAL_FALLBACK") {
            self.planning.allow_physical_fallback = env_flag(&val);
        }
        if let Ok(val) = std::env::var("SQL_TEST_INLINE_LIMIT") {
            let limit = val.trim().parse::<usize>().map_err(|_| {
                Error::InvalidRequest(format!("SQL_TEST_INLINE_LIMIT is not a byte count: {}", val))
            })?;
            self.planning.inline_size_limit = Some(limit);
        }
        if let Ok(val) = std::env::var("SQL_TEST_LOG_FORMAT") {
            self.logging.format = match val.to_lowercase().as_str() {
                "json" => LogFormat::Json,
                _ => LogFormat::Text,
            };
        }
        if let Ok(val) = std::env::var("SQL_TEST_LOG_LEVEL") {
            self.logging.level = val;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        if self.planning.inline_size_limit == Some(0) {
            return Err(Error::InvalidRequest(
                "inline_size_limit must be greater than zero".into(),
            ));
        }
        if self.planning.force_physical && self.planning.allow_physical_fallback {
            warn!("allow_physical_fallback has no effect while force_physical is set");
        }
        Ok(())
    }
}
