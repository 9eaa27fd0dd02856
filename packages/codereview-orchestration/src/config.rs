//! Review configuration
//!
//! Three ways in, later ones overriding earlier ones:
//! - `ReviewConfig::default()` - local Ollama, sequential analysis, console approval
//! - YAML file (`version: 1`) via `ReviewConfig::from_yaml`
//! - environment (`CODEREVIEW_LLM_URL`, `CODEREVIEW_MODEL`, `CODEREVIEW_REPORT_MODEL`)
//!
//! ```yaml
//! version: 1
//! llm:
//!   base_url: http://127.0.0.1:11434
//!   analysis_model: llama3.2:1b
//! analysis:
//!   parallel: true
//!   stage_timeout_ms: 120000
//! decision:
//!   mode: interrupt
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

pub const SUPPORTED_VERSIONS: &[u32] = &[1];

pub const ENV_LLM_URL: &str = "CODEREVIEW_LLM_URL";
pub const ENV_MODEL: &str = "CODEREVIEW_MODEL";
pub const ENV_REPORT_MODEL: &str = "CODEREVIEW_REPORT_MODEL";

/// Configuration error type
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing 'version' field in configuration file. Add 'version: 1' to the top of your YAML file.")]
    MissingVersion,

    #[error("Unsupported configuration version {found}. Supported versions: {}", supported.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(", "))]
    UnsupportedVersion { found: u32, supported: Vec<u32> },

    #[error("Invalid range for field '{field}': {value} not in {min}..={max}. {hint}")]
    Range {
        field: String,
        value: String,
        min: String,
        max: String,
        hint: String,
    },

    #[error("Invalid value for field '{field}': {message}")]
    Invalid { field: String, message: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

pub type ConfigResult<T> = Result<T, ConfigError>;

impl ConfigError {
    pub fn range_with_hint(
        field: impl Into<String>,
        value: impl ToString,
        min: impl ToString,
        max: impl ToString,
        hint: impl Into<String>,
    ) -> Self {
        Self::Range {
            field: field.into(),
            value: value.to_string(),
            min: min.to_string(),
            max: max.to_string(),
            hint: hint.into(),
        }
    }

    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Invalid {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// How the decision stage obtains a verdict
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionMode {
    /// Ask the configured `DecisionSource` and wait for its answer
    Interactive,
    /// Suspend the session and wait for `resume`
    Interrupt,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct LlmConfig {
    pub base_url: String,
    pub analysis_model: String,
    pub report_model: String,
    pub timeout_secs: u64,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:11434".to_string(),
            analysis_model: "llama3.2:1b".to_string(),
            report_model: "llama3.2:1b".to_string(),
            timeout_secs: 300,
            temperature: 0.2,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct AnalysisConfig {
    /// Run the four analyses concurrently instead of as a chain
    pub parallel: bool,
    /// Per-call limit for analyzer calls; unset means unbounded
    pub stage_timeout_ms: Option<u64>,
}

impl AnalysisConfig {
    pub fn stage_timeout(&self) -> Option<Duration> {
        self.stage_timeout_ms.map(Duration::from_millis)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct DecisionConfig {
    pub mode: DecisionMode,
    /// Answers that count as approval; everything else rejects
    pub affirmatives: Vec<String>,
}

impl Default for DecisionConfig {
    fn default() -> Self {
        Self {
            mode: DecisionMode::Interactive,
            affirmatives: vec!["yes".to_string()],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct ReportConfig {
    /// Fail with `PrecursorMissing` instead of synthesizing from blank findings
    pub require_findings: bool,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            require_findings: true,
        }
    }
}

/// Complete review configuration (YAML schema v1)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ReviewConfig {
    pub version: u32,
    #[serde(default)]
    pub llm: LlmConfig,
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub decision: DecisionConfig,
    #[serde(default)]
    pub report: ReportConfig,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            version: 1,
            llm: LlmConfig::default(),
            analysis: AnalysisConfig::default(),
            decision: DecisionConfig::default(),
            report: ReportConfig::default(),
        }
    }
}

impl ReviewConfig {
    pub fn from_yaml(path: impl AsRef<Path>) -> ConfigResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&content)
    }

    pub fn from_yaml_str(content: &str) -> ConfigResult<Self> {
        let raw: serde_yaml::Value = serde_yaml::from_str(content)?;
        let version = raw
            .get("version")
            .ok_or(ConfigError::MissingVersion)?
            .as_u64()
            .ok_or_else(|| ConfigError::invalid("version", "must be an integer"))?;

        let version = u32::try_from(version)
            .map_err(|_| ConfigError::invalid("version", "out of range"))?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(ConfigError::UnsupportedVersion {
                found: version,
                supported: SUPPORTED_VERSIONS.to_vec(),
            });
        }

        let config: Self = serde_yaml::from_value(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply `CODEREVIEW_*` variables from the process environment
    pub fn with_env_overrides(self) -> ConfigResult<Self> {
        self.with_overrides_from(|key| std::env::var(key).ok())
    }

    /// Apply overrides from any key lookup (environment, test fixtures)
    pub fn with_overrides_from<F>(mut self, lookup: F) -> ConfigResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(url) = lookup(ENV_LLM_URL) {
            self.llm.base_url = url;
        }
        if let Some(model) = lookup(ENV_MODEL) {
            self.llm.analysis_model = model.clone();
            self.llm.report_model = model;
        }
        if let Some(model) = lookup(ENV_REPORT_MODEL) {
            self.llm.report_model = model;
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://"))
        {
            return Err(ConfigError::invalid(
                "llm.base_url",
                format!("'{}' is not an http(s) URL", self.llm.base_url),
            ));
        }
        if self.llm.analysis_model.trim().is_empty() || self.llm.report_model.trim().is_empty() {
            return Err(ConfigError::invalid("llm.*_model", "model name is empty"));
        }
        if !(1..=3600).contains(&self.llm.timeout_secs) {
            return Err(ConfigError::range_with_hint(
                "llm.timeout_secs",
                self.llm.timeout_secs,
                1,
                3600,
                "Small local models can take minutes per call; 300 is a safe default.",
            ));
        }
        if !(0.0..=2.0).contains(&self.llm.temperature) {
            return Err(ConfigError::range_with_hint(
                "llm.temperature",
                self.llm.temperature,
                0.0,
                2.0,
                "Use a low temperature for repeatable findings.",
            ));
        }
        if let Some(ms) = self.analysis.stage_timeout_ms {
            if ms == 0 {
                return Err(ConfigError::range_with_hint(
                    "analysis.stage_timeout_ms",
                    ms,
                    1,
                    u64::MAX,
                    "Remove the field for no limit.",
                ));
            }
        }
        if self
            .decision
            .affirmatives
            .iter()
            .all(|word| word.trim().is_empty())
        {
            return Err(ConfigError::invalid(
                "decision.affirmatives",
                "at least one non-blank answer must approve",
            ));
        }
        Ok(())
    }
}
