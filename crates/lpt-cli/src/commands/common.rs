use std::path::PathBuf;
use std::sync::Arc;

use lpt_core::auth::StaticCredentials;
use lpt_core::config::SyncConfig;
use lpt_core::store::JsonFileStore;
use lpt_core::sync::{PantryClient, RateLimiter, RemoteStore, SyncOrchestrator};

use crate::error::CliError;
use crate::state::CliState;

/// Everything a command needs to reach local data and the cloud basket
pub struct CliContext {
    pub data_path: PathBuf,
    pub state_path: PathBuf,
    pub config: SyncConfig,
    remote: Arc<dyn RemoteStore>,
}

impl CliContext {
    pub fn new(
        data_path: PathBuf,
        state_path: PathBuf,
        config: SyncConfig,
    ) -> Result<Self, CliError> {
        let remote = Arc::new(PantryClient::new(&config.base_url, config.request_timeout)?);
        Ok(Self::with_remote(data_path, state_path, config, remote))
    }

    pub fn with_remote(
        data_path: PathBuf,
        state_path: PathBuf,
        config: SyncConfig,
        remote: Arc<dyn RemoteStore>,
    ) -> Self {
        Self {
            data_path,
            state_path,
            config,
            remote,
        }
    }

    pub fn load_state(&self) -> Result<CliState, CliError> {
        CliState::load_from_path(&self.state_path)
    }

    pub fn save_state(&self, state: &CliState) -> Result<(), CliError> {
        state.save_to_path(&self.state_path)
    }

    pub fn local_store(&self) -> JsonFileStore {
        JsonFileStore::new(&self.data_path)
    }

    /// Orchestrator for the account in `state`, with the rate limit resumed
    /// from the last recorded request.
    pub fn orchestrator(&self, state: &CliState) -> SyncOrchestrator {
        let limiter = RateLimiter::new(
            self.config.rate_limit_interval,
            self.config.request_timeout,
        )
        .resume_from(state.last_request_time);
        SyncOrchestrator::new(
            Arc::clone(&self.remote),
            limiter,
            Arc::new(StaticCredentials::from_option(state.account.clone())),
            self.config.basket_name.clone(),
        )
        .with_tag_comparison(self.config.tag_comparison)
        .with_isolation(self.config.isolation)
    }

    /// Persist the limiter's last request time after remote traffic.
    pub fn remember_rate_limit(
        &self,
        state: &mut CliState,
        orchestrator: &SyncOrchestrator,
    ) -> Result<(), CliError> {
        state.record_request_time(orchestrator.rate_limit_status().last_request_time);
        self.save_state(state)
    }
}

/// Write `rendered` to `output`, or print it when no path was given.
pub fn write_output(rendered: &str, output: Option<&std::path::Path>) -> Result<(), CliError> {
    if let Some(path) = output {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, rendered)?;
        println!("{}", path.display());
    } else {
        println!("{rendered}");
    }
    Ok(())
}
