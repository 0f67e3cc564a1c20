use std::path::PathBuf;

use anyhow::{bail, Context};
use bi_dashboard_core::models::settings::{DashboardVariant, Settings};
use bi_dashboard_core::models::state::ClientState;
use bi_dashboard_core::storage::manager::StorageManager;
use bi_dashboard_core::Dashboard;

/// Location and password of the encrypted client-state file.
pub struct StateFile {
    path: PathBuf,
    password: Option<String>,
}

impl StateFile {
    pub fn new(path: PathBuf, password: Option<String>) -> Self {
        Self { path, password }
    }

    /// Load the state (or start fresh from the environment) and connect a
    /// dashboard, applying command-line overrides on top.
    pub fn open(&self, api_url: Option<&str>, variant: Option<DashboardVariant>) -> anyhow::Result<Dashboard> {
        let mut state = if self.path.exists() {
            let password = self.password.as_deref().with_context(|| {
                format!(
                    "{} is encrypted; pass --state-password or set BI_DASHBOARD_STATE_PASSWORD",
                    self.path.display()
                )
            })?;
            StorageManager::load_from_file(&self.path, password)
                .with_context(|| format!("failed to open {}", self.path.display()))?
        } else {
            tracing::info!(path = %self.path.display(), "no state file yet, using environment settings");
            ClientState {
                settings: Settings::from_env()?,
                ..ClientState::default()
            }
        };

        if let Some(url) = api_url {
            state.settings.api_base_url = url.trim().trim_end_matches('/').to_string();
        }
        if let Some(variant) = variant {
            state.settings.variant = variant;
        }
        state.settings.validate()?;

        Ok(Dashboard::connect(state))
    }

    /// Persist session and bookmark changes made by the command.
    pub fn save_if_dirty(&self, dashboard: &mut Dashboard) -> anyhow::Result<()> {
        if !dashboard.has_unsaved_changes() {
            return Ok(());
        }
        let Some(password) = self.password.as_deref() else {
            bail!(
                "state changed but no password was given; pass --state-password to save {}",
                self.path.display()
            );
        };
        dashboard
            .save_to_file(&self.path, password)
            .with_context(|| format!("failed to save {}", self.path.display()))?;
        Ok(())
    }
}
