//! Feature settings (critical mode)
//!
//! A single row holds `critical_mode_enabled`. When no row exists one is
//! created with the flag off. What critical mode hides from responses is up
//! to the serving layer.

use serde::{Deserialize, Serialize};
use std::str::FromStr;
use tracing::info;

use crate::error::{Error, Result};
use crate::traits::SettingsStore;

/// The feature settings singleton
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSettings {
    pub critical_mode_enabled: bool,
}

/// Requested critical mode state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CriticalModeToggle {
    Enable,
    Disable,
}

impl CriticalModeToggle {
    pub fn enabled(self) -> bool {
        matches!(self, Self::Enable)
    }
}

impl FromStr for CriticalModeToggle {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "enable" => Ok(Self::Enable),
            "disable" => Ok(Self::Disable),
            _ => Err(Error::invalid_input("Invalid toggle value")),
        }
    }
}

/// Read the settings, creating the default row if none exists
pub async fn load_or_init(store: &dyn SettingsStore) -> Result<FeatureSettings> {
    if let Some(settings) = store.feature_settings().await? {
        return Ok(settings);
    }

    let settings = FeatureSettings::default();
    store.save_feature_settings(&settings).await?;
    Ok(settings)
}

/// Switch critical mode on or off and persist the result
pub async fn set_critical_mode(
    store: &dyn SettingsStore,
    toggle: CriticalModeToggle,
) -> Result<FeatureSettings> {
    let mut settings = load_or_init(store).await?;
    settings.critical_mode_enabled = toggle.enabled();
    store.save_feature_settings(&settings).await?;

    info!("Critical mode {}", if settings.critical_mode_enabled { "enabled" } else { "disabled" });
    Ok(settings)
}
