//! Persistent CLI state: the bound account and the last remote request time.

use std::path::{Path, PathBuf};

use lpt_core::auth::Account;
use serde::{Deserialize, Serialize};

use crate::error::CliError;

const STATE_FILE_NAME: &str = "cli-state.json";
const DATA_FILE_NAME: &str = "data.json";
const APP_DIR_NAME: &str = "lpt";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CliState {
    #[serde(default = "default_state_version")]
    pub version: u32,
    #[serde(default)]
    pub account: Option<Account>,
    /// Unix ms of the last completed remote request, so the rate limit holds
    /// across invocations
    #[serde(default)]
    pub last_request_time: i64,
}

const fn default_state_version() -> u32 {
    1
}

pub fn default_state_path() -> Result<PathBuf, CliError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(STATE_FILE_NAME))
        .ok_or_else(|| CliError::State("Failed to resolve CLI config directory".to_string()))
}

pub fn default_data_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join(APP_DIR_NAME).join(DATA_FILE_NAME))
        .ok_or_else(|| CliError::State("Failed to resolve data directory".to_string()))
}

impl CliState {
    pub fn load_from_path(path: &Path) -> Result<Self, CliError> {
        if !path.exists() {
            return Ok(Self {
                version: default_state_version(),
                ..Self::default()
            });
        }

        let raw = std::fs::read_to_string(path).map_err(|error| {
            CliError::State(format!("Failed to read state at {}: {error}", path.display()))
        })?;
        serde_json::from_str::<Self>(&raw).map_err(|error| {
            CliError::State(format!("Failed to parse state at {}: {error}", path.display()))
        })
    }

    pub fn save_to_path(&self, path: &Path) -> Result<(), CliError> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|error| {
                CliError::State(format!(
                    "Failed to create state directory {}: {error}",
                    parent.display()
                ))
            })?;
        }

        let serialized = serde_json::to_string_pretty(self)?;
        std::fs::write(path, serialized).map_err(|error| {
            CliError::State(format!("Failed to write state at {}: {error}", path.display()))
        })
    }

    /// Keep the later of the stored and observed request times.
    pub fn record_request_time(&mut self, last_request_time: i64) {
        self.last_request_time = self.last_request_time.max(last_request_time);
    }
}
