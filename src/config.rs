use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Settings as read from `config.toml`. Every key may also come from the environment.
#[derive(Debug, Deserialize, Default)]
pub struct FileConfig {
    pub token: Option<String>,
    pub base_url: Option<String>,
    pub workspace_gid: Option<String>,
    pub sprints_project_gid: Option<String>,
    pub backlog_section_gid: Option<String>,
    pub done_section_gid: Option<String>,
    #[serde(default)]
    pub in_flight_section_gids: Vec<String>,
    pub expected_cost_field_gid: Option<String>,
    pub actual_cost_field_gid: Option<String>,
    pub sprint_number_field_gid: Option<String>,
}

/// Validated identifiers for one sprint close.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SprintConfig {
    pub token: String,
    pub base_url: Option<String>,
    pub workspace_gid: String,
    pub sprints_project_gid: String,
    pub backlog_section_gid: String,
    pub done_section_gid: String,
    pub in_flight_section_gids: Vec<String>,
    pub expected_cost_field_gid: String,
    pub actual_cost_field_gid: String,
    pub sprint_number_field_gid: String,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required configuration: {}", .0.join(", "))]
    Missing(Vec<&'static str>),
}

pub const ENV_TOKEN: &str = "ASANA_TOKEN";
pub const ENV_BASE_URL: &str = "ASANA_BASE_URL";
pub const ENV_WORKSPACE: &str = "ASANA_WORKSPACE_GID";
pub const ENV_SPRINTS_PROJECT: &str = "SPRINTS_PROJECT_GID";
pub const ENV_BACKLOG: &str = "BACKLOG_SECTION_GID";
pub const ENV_DONE: &str = "DONE_SECTION_GID";
pub const ENV_IN_FLIGHT: &str = "IN_FLIGHT_SECTION_GIDS";
pub const ENV_EXPECTED_COST: &str = "EXPECTED_COST_FIELD_GID";
pub const ENV_ACTUAL_COST: &str = "ACTUAL_COST_FIELD_GID";
pub const ENV_SPRINT_NUMBER: &str = "SPRINT_NUMBER_FIELD_GID";

pub fn data_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".sprint-close")
}

fn default_config_path() -> PathBuf {
    data_dir().join("config.toml")
}

/// Read the TOML file. A missing default file is fine; a missing explicit one is not.
pub fn load_file_config(explicit: Option<&Path>) -> Result<FileConfig> {
    let path = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let path = default_config_path();
            if !path.exists() {
                return Ok(FileConfig::default());
            }
            path
        }
    };
    let contents = std::fs::read_to_string(&path)
        .with_context(|| format!("Failed to read config from {}", path.display()))?;
    let config: FileConfig = toml::from_str(&contents)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    Ok(config)
}

/// Load `.env`, the config file and the process environment, then validate.
pub fn load_config(explicit: Option<&Path>) -> Result<SprintConfig> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!(path = %path.display(), "loaded .env");
    }
    let file = load_file_config(explicit)?;
    let config = resolve(file, |key| std::env::var(key).ok())?;
    Ok(config)
}

/// Overlay environment values on the file config and check every key is present.
/// All missing keys are reported together.
pub fn resolve(
    file: FileConfig,
    env: impl Fn(&str) -> Option<String>,
) -> Result<SprintConfig, ConfigError> {
    let mut missing = Vec::new();

    let mut pick = |env_key: &'static str, file_value: Option<String>| -> String {
        let value = non_blank(env(env_key)).or_else(|| non_blank(file_value));
        match value {
            Some(value) => value,
            None => {
                missing.push(env_key);
                String::new()
            }
        }
    };

    let token = pick(ENV_TOKEN, file.token);
    let workspace_gid = pick(ENV_WORKSPACE, file.workspace_gid);
    let sprints_project_gid = pick(ENV_SPRINTS_PROJECT, file.sprints_project_gid);
    let backlog_section_gid = pick(ENV_BACKLOG, file.backlog_section_gid);
    let done_section_gid = pick(ENV_DONE, file.done_section_gid);
    let expected_cost_field_gid = pick(ENV_EXPECTED_COST, file.expected_cost_field_gid);
    let actual_cost_field_gid = pick(ENV_ACTUAL_COST, file.actual_cost_field_gid);
    let sprint_number_field_gid = pick(ENV_SPRINT_NUMBER, file.sprint_number_field_gid);

    let in_flight_section_gids = match env(ENV_IN_FLIGHT) {
        Some(list) if !list.trim().is_empty() => split_list(&list),
        _ => file
            .in_flight_section_gids
            .into_iter()
            .filter_map(|gid| non_blank(Some(gid)))
            .collect(),
    };
    if in_flight_section_gids.is_empty() {
        missing.push(ENV_IN_FLIGHT);
    }

    let base_url = non_blank(env(ENV_BASE_URL)).or_else(|| non_blank(file.base_url));

    if !missing.is_empty() {
        return Err(ConfigError::Missing(missing));
    }

    Ok(SprintConfig {
        token,
        base_url,
        workspace_gid,
        sprints_project_gid,
        backlog_section_gid,
        done_section_gid,
        in_flight_section_gids,
        expected_cost_field_gid,
        actual_cost_field_gid,
        sprint_number_field_gid,
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn split_list(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}
