use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const DEFAULT_INTERPRETER: &str = "osascript";
pub const DEFAULT_APPLICATION: &str = "OmniFocus";
pub const INTERPRETER_ENV: &str = "FOCUSBRIDGE_INTERPRETER";
pub const HOME_ENV: &str = "FOCUSBRIDGE_HOME";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Config IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),
    #[error("Invalid {INTERPRETER_ENV}: {0}")]
    Interpreter(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// Interpreter program, looked up on PATH.
    pub interpreter: Option<String>,
    /// Arguments placed before the script text.
    pub interpreter_args: Option<Vec<String>>,
    /// Application whose OmniJS evaluator runs the generated programs.
    pub application: Option<String>,
}

impl BridgeConfig {
    pub fn interpreter(&self) -> String {
        self.interpreter
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_INTERPRETER)
            .to_string()
    }

    pub fn interpreter_args(&self) -> Vec<String> {
        self.interpreter_args
            .clone()
            .unwrap_or_else(default_interpreter_args)
    }

    pub fn application(&self) -> String {
        self.application
            .as_deref()
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_APPLICATION)
            .to_string()
    }
}

pub fn default_interpreter_args() -> Vec<String> {
    vec!["-l".to_string(), "JavaScript".to_string(), "-e".to_string()]
}

pub fn resolve_user_home_dir() -> Option<PathBuf> {
    if let Ok(home) = std::env::var("HOME") {
        let trimmed = home.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    None
}

pub fn resolve_bridge_home_dir() -> Option<PathBuf> {
    if let Ok(value) = std::env::var(HOME_ENV) {
        let trimmed = value.trim();
        if !trimmed.is_empty() {
            return Some(PathBuf::from(trimmed));
        }
    }
    resolve_user_home_dir().map(|home| home.join(".focusbridge"))
}

pub fn global_config_path() -> Option<PathBuf> {
    resolve_bridge_home_dir().map(|home| home.join("config.toml"))
}

pub fn load_config_file(path: &Path) -> Result<Option<BridgeConfig>, ConfigError> {
    if !path.is_file() {
        return Ok(None);
    }
    let text = fs::read_to_string(path)?;
    Ok(Some(toml::from_str::<BridgeConfig>(&text)?))
}

pub fn write_config_file(path: &Path, config: &BridgeConfig) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, toml::to_string_pretty(config)?)?;
    Ok(())
}

/// Split an interpreter command line such as `osascript -l JavaScript -e`.
pub fn parse_interpreter_command(value: &str) -> Result<(String, Vec<String>), ConfigError> {
    let mut words =
        shell_words::split(value).map_err(|err| ConfigError::Interpreter(err.to_string()))?;
    if words.is_empty() {
        return Err(ConfigError::Interpreter("empty command".to_string()));
    }
    let program = words.remove(0);
    Ok((program, words))
}

/// Resolve the effective config: environment override, then the global config
/// file, then defaults. Also reports which layer supplied the interpreter.
pub fn resolve_config_with_source() -> Result<(BridgeConfig, &'static str), ConfigError> {
    let mut config = match global_config_path() {
        Some(path) => load_config_file(&path)?.unwrap_or_default(),
        None => BridgeConfig::default(),
    };
    let mut source = if config.interpreter.is_some() {
        "global"
    } else {
        "default"
    };
    if let Ok(value) = std::env::var(INTERPRETER_ENV) {
        if !value.trim().is_empty() {
            let (program, args) = parse_interpreter_command(&value)?;
            config.interpreter = Some(program);
            config.interpreter_args = Some(args);
            source = "env";
        }
    }
    Ok((config, source))
}

pub fn resolve_config() -> Result<BridgeConfig, ConfigError> {
    resolve_config_with_source().map(|(config, _)| config)
}
