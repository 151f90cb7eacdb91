// # modemd - Modem Fleet Daemon
//
// The modemd daemon is responsible for:
// 1. Reading configuration from environment variables
// 2. Opening the fleet store (and seeding the demo fleet if asked)
// 3. Running the rotation beat until SIGTERM/SIGINT
//
// All rotation and scheduling logic lives in modem-core.
//
// ## Configuration
//
// All configuration is done via environment variables:
//
// ### Store
// - `MODEM_STORE_TYPE`: Type of store (memory, file)
// - `MODEM_STORE_PATH`: Path to state file (for file store)
// - `MODEM_SEED_FLEET`: Provision the demo fleet into an empty store (true/false)
//
// ### Beat
// - `MODEM_BEAT_ENABLED`: Run scheduled rotations (true/false)
// - `MODEM_BEAT_TICK_SECS`: Seconds between checks for due schedules (1-3600)
//
// ### Logging
// - `MODEM_LOG_LEVEL`: trace, debug, info, warn, error
//
// ## Example
//
// ```bash
// export MODEM_STORE_TYPE=file
// export MODEM_STORE_PATH=/var/lib/modemd/fleet.json
// export MODEM_BEAT_TICK_SECS=15
//
// modemd
// ```

use anyhow::Result;
use modem_core::beat::BeatEvent;
use modem_core::config::{BeatConfig, FleetConfig, StoreConfig};
use modem_core::seed::seed_demo_fleet;
use modem_core::store::{FileFleetStore, MemoryFleetStore};
use modem_core::traits::{ModemStore, RecurringJobs, SettingsStore, SmsStore};
use modem_core::Fleet;
use std::env;
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::oneshot;
use tracing::{Level, debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[cfg(unix)]
use tokio::signal::unix::{SignalKind, signal};

/// Exit codes for different termination scenarios
///
/// These codes follow systemd conventions:
/// - 0: Clean shutdown
/// - 1: Configuration or startup error
/// - 2: Runtime error (unexpected)
#[derive(Debug, Clone, Copy)]
enum ModemExitCode {
    /// Clean shutdown (normal exit)
    CleanShutdown = 0,
    /// Configuration error or startup failure
    ConfigError = 1,
    /// Runtime error (unexpected failure)
    RuntimeError = 2,
}

impl From<ModemExitCode> for ExitCode {
    fn from(code: ModemExitCode) -> Self {
        ExitCode::from(code as u8)
    }
}

/// Application configuration
#[derive(Debug)]
struct Config {
    store_type: String,
    store_path: Option<String>,
    seed_fleet: bool,
    beat_enabled: bool,
    beat_tick_secs: Option<u64>,
    log_level: String,
}

impl Config {
    /// Load configuration from environment variables
    fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Load configuration through `lookup`, which maps a variable name to its value
    fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        Ok(Self {
            store_type: lookup("MODEM_STORE_TYPE").unwrap_or_else(|| "memory".to_string()),
            store_path: lookup("MODEM_STORE_PATH"),
            seed_fleet: parse_flag("MODEM_SEED_FLEET", lookup("MODEM_SEED_FLEET"), false)?,
            beat_enabled: parse_flag("MODEM_BEAT_ENABLED", lookup("MODEM_BEAT_ENABLED"), true)?,
            beat_tick_secs: lookup("MODEM_BEAT_TICK_SECS")
                .map(|s| {
                    s.trim().parse().map_err(|_| {
                        anyhow::anyhow!("MODEM_BEAT_TICK_SECS must be a number. Got: {}", s)
                    })
                })
                .transpose()?,
            log_level: lookup("MODEM_LOG_LEVEL").unwrap_or_else(|| "info".to_string()),
        })
    }

    /// Validate the configuration
    fn validate(&self) -> Result<()> {
        match self.store_type.as_str() {
            "memory" => {}
            "file" => match self.store_path.as_deref() {
                None => anyhow::bail!(
                    "MODEM_STORE_PATH is required when MODEM_STORE_TYPE=file. \
                    Set it via: export MODEM_STORE_PATH=/var/lib/modemd/fleet.json"
                ),
                Some(path) if path.trim().is_empty() => anyhow::bail!(
                    "MODEM_STORE_PATH cannot be empty when MODEM_STORE_TYPE=file"
                ),
                Some(_) => {}
            },
            _ => anyhow::bail!(
                "MODEM_STORE_TYPE '{}' is not supported. \
                Supported types: memory, file",
                self.store_type
            ),
        }

        if let Some(tick) = self.beat_tick_secs
            && !(1..=3600).contains(&tick)
        {
            anyhow::bail!(
                "MODEM_BEAT_TICK_SECS must be between 1 and 3600 seconds. Got: {}",
                tick
            );
        }

        parse_log_level(&self.log_level)?;
        Ok(())
    }

    /// The library configuration this daemon configuration describes
    fn fleet_config(&self) -> FleetConfig {
        let store = match (self.store_type.as_str(), &self.store_path) {
            ("file", Some(path)) => StoreConfig::File { path: path.clone() },
            _ => StoreConfig::Memory,
        };

        let mut beat = BeatConfig {
            enabled: self.beat_enabled,
            ..BeatConfig::default()
        };
        if let Some(tick) = self.beat_tick_secs {
            beat.tick_secs = tick;
        }

        FleetConfig {
            store,
            beat,
            seed_fleet: self.seed_fleet,
        }
    }
}

fn parse_flag(name: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        _ => anyhow::bail!("{} must be true or false. Got: {}", name, value),
    }
}

fn parse_log_level(level: &str) -> Result<Level> {
    match level.to_lowercase().as_str() {
        "trace" => Ok(Level::TRACE),
        "debug" => Ok(Level::DEBUG),
        "info" => Ok(Level::INFO),
        "warn" => Ok(Level::WARN),
        "error" => Ok(Level::ERROR),
        _ => anyhow::bail!(
            "MODEM_LOG_LEVEL '{}' is not valid. \
            Valid levels: trace, debug, info, warn, error",
            level
        ),
    }
}

fn main() -> ExitCode {
    // Load configuration from environment
    let config = match Config::from_env() {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {}", e);
            return ModemExitCode::ConfigError.into();
        }
    };

    if let Err(e) = config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ModemExitCode::ConfigError.into();
    }

    let fleet_config = config.fleet_config();
    if let Err(e) = fleet_config.validate() {
        eprintln!("Configuration validation error: {}", e);
        return ModemExitCode::ConfigError.into();
    }

    let log_level = parse_log_level(&config.log_level).unwrap_or(Level::INFO);
    let subscriber = FmtSubscriber::builder().with_max_level(log_level).finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
        return ModemExitCode::ConfigError.into();
    }

    info!("Starting modemd daemon");

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to create tokio runtime: {}", e);
            return ModemExitCode::RuntimeError.into();
        }
    };

    let result = rt.block_on(async {
        if let Err(e) = run_daemon(fleet_config).await {
            error!("Daemon error: {}", e);
            ModemExitCode::RuntimeError
        } else {
            ModemExitCode::CleanShutdown
        }
    });

    result.into()
}

/// Open the configured store and run the daemon over it
async fn run_daemon(config: FleetConfig) -> Result<()> {
    info!("Store type: {}", config.store.type_name());

    match config.store.clone() {
        StoreConfig::Memory => serve(Arc::new(MemoryFleetStore::new()), config).await,
        StoreConfig::File { path } => {
            let store = FileFleetStore::new(&path).await?;
            info!("State file: {}", store.path().display());
            serve(Arc::new(store), config).await
        }
    }
}

async fn serve<S>(store: Arc<S>, config: FleetConfig) -> Result<()>
where
    S: ModemStore + SmsStore + SettingsStore + RecurringJobs + 'static,
{
    if config.seed_fleet {
        seed_demo_fleet(store.as_ref()).await?;
    }

    let fleet = Fleet::new(Arc::clone(&store));

    let settings = fleet.feature_settings().await?;
    info!(
        "Fleet loaded: {} modem(s), {} schedule(s), critical mode {}",
        fleet.modems().await?.len(),
        fleet.schedules().await?.len(),
        if settings.critical_mode_enabled { "on" } else { "off" }
    );

    if !config.beat.enabled {
        info!("Rotation beat disabled");
        let signal = wait_for_shutdown().await?;
        info!("Received shutdown signal: {}", signal);
        store.flush().await?;
        return Ok(());
    }

    let (beat, mut events) = fleet.beat(config.beat)?;

    let event_log = tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            log_event(&event);
        }
    });

    let (shutdown_tx, shutdown_rx) = oneshot::channel();
    let signals = async move {
        // Dropping the sender on error also stops the beat
        let signal = wait_for_shutdown().await?;
        info!("Received shutdown signal: {}", signal);
        let _ = shutdown_tx.send(());
        Ok::<_, anyhow::Error>(())
    };

    let (beat_result, signal_result) =
        tokio::join!(beat.run_with_shutdown(Some(shutdown_rx)), signals);

    // Closes the event channel so the logger finishes
    drop(beat);
    if let Err(e) = event_log.await {
        warn!("Event logger ended abnormally: {}", e);
    }

    beat_result?;
    signal_result?;
    info!("Shutting down daemon");
    Ok(())
}

fn log_event(event: &BeatEvent) {
    match event {
        BeatEvent::Started { schedules_count } => {
            debug!("Beat started with {} schedule(s)", schedules_count)
        }
        BeatEvent::RotationFired { key, public_ip, .. } => {
            info!("Scheduled rotation {} -> {}", key, public_ip)
        }
        BeatEvent::RotationFailed { key, error, .. } => {
            warn!("Scheduled rotation {} failed: {}", key, error)
        }
        BeatEvent::Stopped { reason } => debug!("Beat stopped: {}", reason),
    }
}

/// Wait for shutdown signals (SIGTERM, SIGINT)
///
/// # Returns
///
/// Returns the name of the signal received.
#[cfg(unix)]
async fn wait_for_shutdown() -> Result<&'static str> {
    let mut sigterm = signal(SignalKind::terminate())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGTERM handler: {}", e))?;
    let mut sigint = signal(SignalKind::interrupt())
        .map_err(|e| anyhow::anyhow!("Failed to setup SIGINT handler: {}", e))?;

    let signal = tokio::select! {
        _ = sigterm.recv() => "SIGTERM",
        _ = sigint.recv() => "SIGINT",
    };
    Ok(signal)
}

/// Wait for shutdown signals (SIGINT only)
///
/// Fallback implementation for non-Unix platforms.
#[cfg(not(unix))]
async fn wait_for_shutdown() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to wait for CTRL-C: {}", e))?;
    Ok("SIGINT")
}
