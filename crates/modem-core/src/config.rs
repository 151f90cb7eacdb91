//! Configuration types for the modem fleet
//!
//! This module defines all configuration structures used throughout the crate.

use serde::{Deserialize, Serialize};

/// Main fleet configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    /// Backing store for modems, messages, settings and schedules
    #[serde(default)]
    pub store: StoreConfig,

    /// Rotation beat settings
    #[serde(default)]
    pub beat: BeatConfig,

    /// Provision the demo fleet when the store holds no modems
    #[serde(default)]
    pub seed_fleet: bool,
}

impl FleetConfig {
    /// Create a new configuration with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        self.store.validate()?;
        self.beat.validate()?;
        Ok(())
    }
}

/// Store configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum StoreConfig {
    /// In-memory store (not persistent)
    #[default]
    Memory,

    /// JSON file store
    File {
        /// Path to the state file
        path: String,
    },
}

impl StoreConfig {
    /// Validate the store configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            StoreConfig::File { path } if path.trim().is_empty() => {
                Err(crate::Error::config("File store path cannot be empty"))
            }
            _ => Ok(()),
        }
    }

    /// Get the store type name
    pub fn type_name(&self) -> &str {
        match self {
            StoreConfig::Memory => "memory",
            StoreConfig::File { .. } => "file",
        }
    }
}

/// Rotation beat configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BeatConfig {
    /// Run the beat at all
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Seconds between checks for due schedules
    ///
    /// Schedules are minute-granular, so this only bounds how late a
    /// rotation may fire.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,

    /// Capacity of the beat event channel
    ///
    /// When full, new events are dropped (with a warning log).
    ///
    /// Default: 1000 events
    #[serde(default = "default_event_channel_capacity")]
    pub event_channel_capacity: usize,
}

impl BeatConfig {
    /// Validate the beat configuration
    pub fn validate(&self) -> Result<(), crate::Error> {
        if self.tick_secs == 0 {
            return Err(crate::Error::config("Beat tick interval must be > 0"));
        }
        if self.event_channel_capacity == 0 {
            return Err(crate::Error::config(
                "Beat event channel capacity must be > 0",
            ));
        }
        Ok(())
    }
}

impl Default for BeatConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            tick_secs: default_tick_secs(),
            event_channel_capacity: default_event_channel_capacity(),
        }
    }
}

fn default_enabled() -> bool {
    true
}

fn default_tick_secs() -> u64 {
    30
}

fn default_event_channel_capacity() -> usize {
    1000
}
