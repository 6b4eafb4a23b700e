use crate::logging::layers::console::ConsoleOutput;
use crate::Result;
use anyhow::{anyhow, Context};
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing_subscriber::filter::Directive;

const DEFAULT_LEVEL: &str = "info";

/// Environment variable overriding `logging.default_level`.
pub const LOG_LEVEL_ENV: &str = "SUPERPLANE_LOG_LEVEL";

/// Environment variable overriding `logging.console_output`.
pub const CONSOLE_OUTPUT_ENV: &str = "SUPERPLANE_LOG_CONSOLE";

/// Resolved logging configuration after reading the workspace file and env overrides.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub log_dir: Option<PathBuf>,
    pub default_level: String,
    pub enable_file: bool,
    pub console_output: Option<ConsoleOutput>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            log_dir: None,
            default_level: DEFAULT_LEVEL.to_string(),
            enable_file: true,
            console_output: None,
        }
    }
}

impl LoggingConfig {
    /// Defaults, then `<workspace>/.superplane/config/logging.toml`, then environment.
    pub fn load(workspace_root: Option<&Path>) -> Result<Self> {
        let mut config = LoggingConfig::default();
        if let Some(workspace) = workspace_root {
            let path = workspace
                .join(".superplane")
                .join("config")
                .join("logging.toml");
            if let Some(file) = Self::load_from_file(&path)? {
                config.apply(file);
            }
        }
        config.apply_env_overrides()?;
        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> Result<Option<LoggingFile>> {
        if !path.exists() {
            return Ok(None);
        }
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read logging config {}", path.display()))?;
        let parsed: LoggingFile = toml::from_str(&content)
            .with_context(|| format!("failed to parse logging config {}", path.display()))?;
        Ok(Some(parsed))
    }

    fn apply(&mut self, file: LoggingFile) {
        let Some(section) = file.logging else {
            return;
        };
        if let Some(log_dir) = section.log_dir {
            self.log_dir = Some(PathBuf::from(log_dir));
        }
        if let Some(default_level) = section.default_level {
            self.default_level = default_level;
        }
        if let Some(enable_file) = section.enable_file {
            self.enable_file = enable_file;
        }
        if section.console_output.is_some() {
            self.console_output = section.console_output;
        }
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        if let Some(level) = env_value(LOG_LEVEL_ENV) {
            self.default_level = level;
        }
        if let Some(output) = env_value(CONSOLE_OUTPUT_ENV) {
            self.console_output = Some(ConsoleOutput::from_str(&output).map_err(|err| anyhow!(err))?);
        }
        Ok(())
    }

    fn validate(&self) -> Result<()> {
        Directive::from_str(&self.default_level)
            .map_err(|_| anyhow!("logging.default_level must be a valid tracing directive"))?;
        Ok(())
    }
}

fn env_value(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

#[derive(Debug, Deserialize)]
struct LoggingFile {
    logging: Option<LoggingSection>,
}

#[derive(Debug, Deserialize)]
struct LoggingSection {
    log_dir: Option<String>,
    default_level: Option<String>,
    enable_file: Option<bool>,
    #[serde(default)]
    console_output: Option<ConsoleOutput>,
}
