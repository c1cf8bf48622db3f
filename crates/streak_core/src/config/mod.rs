use crate::error::AppError;
use crate::model::Weekday;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "STREAK_CONFIG_PATH";
const DEFAULT_TICK_INTERVAL_MS: u64 = 1000;

/// Which recurring tasks must be completed for a day to extend the streak.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObligationScope {
    /// Every recurring task that existed that day.
    #[default]
    AllRecurring,
    /// Only recurring tasks scheduled on that weekday and not excluded.
    ScheduledForDay,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    #[serde(default = "default_validate_on_start")]
    pub validate_on_start: bool,
    #[serde(default)]
    pub obligation_scope: ObligationScope,
    #[serde(default = "default_week_starts_on")]
    pub week_starts_on: Weekday,
}

fn default_tick_interval_ms() -> u64 {
    DEFAULT_TICK_INTERVAL_MS
}

fn default_validate_on_start() -> bool {
    true
}

fn default_week_starts_on() -> Weekday {
    Weekday::Sunday
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            store_dir: None,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
            validate_on_start: true,
            obligation_scope: ObligationScope::default(),
            week_starts_on: Weekday::Sunday,
        }
    }
}

impl EngineConfig {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.tick_interval_ms == 0 {
            return Err(AppError::invalid_data("tick_interval_ms must be positive"));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: EngineConfig,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub store_dir: Option<PathBuf>,
    pub tick_interval_ms: Option<u64>,
    pub validate_on_start: Option<bool>,
    pub obligation_scope: Option<ObligationScope>,
    pub week_starts_on: Option<Weekday>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata).join("streak").join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("streak")
            .join(CONFIG_FILE_NAME))
    }
}

/// Strict load: a missing file yields defaults, anything unreadable is an error.
pub fn load_config() -> Result<EngineConfig, AppError> {
    let path = config_path()?;
    if !path.exists() {
        return Ok(EngineConfig::default());
    }
    load_config_from_path(&path)
}

pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: EngineConfig::default(),
            error: Some(err),
        },
    }
}

fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    if !path.exists() {
        return ConfigLoad {
            config: EngineConfig::default(),
            error: None,
        };
    }

    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: EngineConfig::default(),
            error: Some(err),
        },
    }
}

fn load_config_from_path(path: &Path) -> Result<EngineConfig, AppError> {
    let content = std::fs::read_to_string(path)
        .map_err(|err| AppError::invalid_data(format!("{}: {}", path.display(), err)))?;
    let config: EngineConfig = serde_json::from_str(&content).map_err(|err| {
        AppError::invalid_data(format!("invalid JSON in {}: {}", path.display(), err))
    })?;
    config.validate()?;
    Ok(config)
}

pub fn merge_overrides(base: &EngineConfig, overrides: &ConfigOverrides) -> EngineConfig {
    let mut merged = base.clone();
    if let Some(store_dir) = overrides.store_dir.as_ref() {
        merged.store_dir = Some(store_dir.clone());
    }
    if let Some(tick_interval_ms) = overrides.tick_interval_ms
        && tick_interval_ms > 0
    {
        merged.tick_interval_ms = tick_interval_ms;
    }
    if let Some(validate_on_start) = overrides.validate_on_start {
        merged.validate_on_start = validate_on_start;
    }
    if let Some(scope) = overrides.obligation_scope {
        merged.obligation_scope = scope;
    }
    if let Some(week_starts_on) = overrides.week_starts_on {
        merged.week_starts_on = week_starts_on;
    }
    merged
}
