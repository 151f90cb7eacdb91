// # File Fleet Store
//
// File-based implementation of every fleet collaborator trait with crash
// recovery.
//
// ## Purpose
//
// Keeps modems, messages, settings and rotation schedules across daemon
// restarts.
//
// ## Crash Recovery
//
// - Atomic writes: Uses write-then-rename for atomicity
// - Corruption detection: Validates JSON on load
// - Automatic backup: Keeps .backup of last known good state
// - Recovery: Falls back to backup if corruption detected
//
// ## Consistency
//
// Every change is applied to a copy of the state, written to disk, and only
// then published in memory. A failed write leaves both disk and memory as
// they were.
//
// ## File Format
//
// ```json
// {
//   "version": "1.0",
//   "state": {
//     "modems": { "1": { "id": 1, "model": "USB", ... } },
//     "sms": {},
//     "feature_settings": { "critical_mode_enabled": false },
//     "schedules": { "rotate:1": { "interval_minutes": 5, ... } },
//     "interval_definitions": [5],
//     "next_modem_id": 1,
//     "next_sms_id": 0
//   }
// }
// ```

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{FleetState, StagedUpdates};
use crate::Error;
use crate::model::{Modem, ModemId, NewModem, NewSms, Sms};
use crate::settings::FeatureSettings;
use crate::traits::{
    ModemStore, ModemTransaction, RecurringJobs, ScheduleHandle, ScheduleKey, ScheduledRotation,
    SettingsStore, SmsStore,
};

/// State file format version
/// Used for future migration if format changes
const STATE_FILE_VERSION: &str = "1.0";

/// File-based fleet store with crash recovery
///
/// # Example
///
/// ```rust,no_run
/// use modem_core::store::FileFleetStore;
/// use modem_core::traits::RecurringJobs;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = FileFleetStore::new("/var/lib/modemd/fleet.json").await?;
///
///     // Schedules survive a restart
///     let schedules = store.list_schedules().await?;
///     println!("{} scheduled rotations", schedules.len());
///
///     Ok(())
/// }
/// ```
#[derive(Debug)]
pub struct FileFleetStore {
    path: PathBuf,
    state: Arc<RwLock<FleetState>>,
}

/// Serializable state file format
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct StateFileFormat {
    version: String,
    state: FleetState,
}

impl FileFleetStore {
    /// Create or load a file fleet store
    ///
    /// This will:
    /// 1. Create parent directories if needed
    /// 2. Try to load the existing state file
    /// 3. If corruption detected, try to load from backup
    /// 4. If both fail, start with empty state
    pub async fn new<P: AsRef<Path>>(path: P) -> Result<Self, Error> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            fs::create_dir_all(parent).await.map_err(|e| {
                Error::config(format!(
                    "Failed to create state directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let state = load_state_with_recovery(&path).await?;

        Ok(Self {
            path,
            state: Arc::new(RwLock::new(state)),
        })
    }

    /// Path of the state file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the state, persist it, then publish it
    async fn mutate<T, F>(&self, change: F) -> Result<T, Error>
    where
        F: FnOnce(&mut FleetState) -> Result<T, Error> + Send,
        T: Send,
    {
        let mut guard = self.state.write().await;
        let mut next = guard.clone();
        let out = change(&mut next)?;
        write_state(&self.path, &next)
            .await
            .inspect_err(|e| tracing::error!("Fleet state not saved: {}", e))?;
        *guard = next;
        Ok(out)
    }

    /// Force immediate write to disk
    pub async fn sync(&self) -> Result<(), Error> {
        let guard = self.state.read().await;
        write_state(&self.path, &guard).await
    }
}

/// Load state from file with automatic recovery
///
/// Recovery strategy:
/// 1. Try to load main state file
/// 2. If it does not parse, try loading backup (and restore it)
/// 3. If backup also fails, start with empty state
async fn load_state_with_recovery(path: &Path) -> Result<FleetState, Error> {
    let Some(content) = read_if_exists(path).await? else {
        tracing::debug!("State file does not exist: {}", path.display());
        return Ok(FleetState::default());
    };

    let err = match parse_state(path, &content) {
        Ok(state) => {
            tracing::debug!("Loaded fleet state: {} modems", state.modem_count());
            return Ok(state);
        }
        Err(e) => e,
    };

    tracing::warn!(
        "State file appears corrupted: {}. Attempting recovery from backup.",
        err
    );

    let backup_path = backup_path(path);
    let Some(backup_content) = read_if_exists(&backup_path).await? else {
        tracing::warn!("No backup file found. Starting with empty state.");
        return Ok(FleetState::default());
    };

    match parse_state(&backup_path, &backup_content) {
        Ok(state) => {
            tracing::info!("Recovered state from backup: {} modems", state.modem_count());

            if let Err(restore_err) = restore_from_backup(path, &backup_path).await {
                tracing::error!("Failed to restore state file from backup: {}", restore_err);
            }

            Ok(state)
        }
        Err(backup_err) => {
            tracing::error!(
                "Backup also corrupted: {}. Starting with empty state.",
                backup_err
            );
            Ok(FleetState::default())
        }
    }
}

async fn read_if_exists(path: &Path) -> Result<Option<String>, Error> {
    if !path.exists() {
        return Ok(None);
    }

    fs::read_to_string(path).await.map(Some).map_err(|e| {
        Error::state_store(format!(
            "Failed to read state file {}: {}",
            path.display(),
            e
        ))
    })
}

fn parse_state(path: &Path, content: &str) -> Result<FleetState, Error> {
    let state_file: StateFileFormat = serde_json::from_str(content).map_err(|e| {
        Error::state_store(format!(
            "Failed to parse state file {}: {}",
            path.display(),
            e
        ))
    })?;

    if state_file.version != STATE_FILE_VERSION {
        tracing::warn!(
            "State file version mismatch: expected {}, got {}. \
            Attempting to load anyway.",
            STATE_FILE_VERSION,
            state_file.version
        );
    }

    Ok(state_file.state)
}

/// Write state to file atomically
async fn write_state(path: &Path, state: &FleetState) -> Result<(), Error> {
    let state_file = StateFileFormat {
        version: STATE_FILE_VERSION.to_string(),
        state: state.clone(),
    };

    let json = serde_json::to_string_pretty(&state_file)
        .map_err(|e| Error::state_store(format!("Failed to serialize state: {}", e)))?;

    // Write to temporary file first
    let temp_path = temp_path(path);
    {
        let mut file = fs::File::create(&temp_path).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to create temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.write_all(json.as_bytes()).await.map_err(|e| {
            Error::state_store(format!(
                "Failed to write to temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;

        file.flush().await.map_err(|e| {
            Error::state_store(format!(
                "Failed to flush temp file {}: {}",
                temp_path.display(),
                e
            ))
        })?;
    }

    // Keep the previous state as backup
    if path.exists()
        && let Err(e) = fs::copy(path, backup_path(path)).await
    {
        tracing::warn!("Failed to create backup: {}", e);
    }

    fs::rename(&temp_path, path).await.map_err(|e| {
        Error::state_store(format!(
            "Failed to rename {} to {}: {}",
            temp_path.display(),
            path.display(),
            e
        ))
    })?;

    tracing::trace!("State written to file: {}", path.display());
    Ok(())
}

/// Restore state file from backup
async fn restore_from_backup(path: &Path, backup_path: &Path) -> Result<(), Error> {
    fs::copy(backup_path, path).await.map_err(|e| {
        Error::state_store(format!(
            "Failed to restore from backup {} to {}: {}",
            backup_path.display(),
            path.display(),
            e
        ))
    })?;

    tracing::info!("Restored state file from backup");
    Ok(())
}

/// Get path to temporary file for atomic writes
fn temp_path(path: &Path) -> PathBuf {
    let mut temp = path.to_path_buf();
    temp.set_extension("tmp");
    temp
}

/// Get path to backup file
fn backup_path(path: &Path) -> PathBuf {
    let mut backup = path.to_path_buf();
    backup.set_extension("backup");
    backup
}

#[async_trait]
impl ModemStore for FileFleetStore {
    async fn get(&self, id: ModemId) -> Result<Option<Modem>, Error> {
        Ok(self.state.read().await.modem(id))
    }

    async fn list_all(&self) -> Result<Vec<Modem>, Error> {
        Ok(self.state.read().await.modems())
    }

    async fn insert(&self, modem: NewModem) -> Result<Modem, Error> {
        self.mutate(move |state| state.insert_modem(modem)).await
    }

    async fn update(&self, modem: &Modem) -> Result<(), Error> {
        self.mutate(|state| state.update_modem(modem)).await
    }

    async fn delete(&self, id: ModemId) -> Result<(), Error> {
        self.mutate(|state| {
            state.delete_modem(id);
            Ok(())
        })
        .await
    }

    async fn begin(&self) -> Result<Box<dyn ModemTransaction>, Error> {
        let guard = Arc::clone(&self.state).write_owned().await;
        Ok(Box::new(FileTransaction {
            guard,
            staged: StagedUpdates::default(),
            path: self.path.clone(),
        }))
    }

    async fn flush(&self) -> Result<(), Error> {
        self.sync().await
    }
}

/// Transaction over a [`FileFleetStore`]
///
/// Holds the store's write lock until committed or dropped; commit writes
/// the file before publishing the new state.
struct FileTransaction {
    guard: OwnedRwLockWriteGuard<FleetState>,
    staged: StagedUpdates,
    path: PathBuf,
}

#[async_trait]
impl ModemTransaction for FileTransaction {
    async fn get(&mut self, id: ModemId) -> Result<Option<Modem>, Error> {
        Ok(self.staged.get(&self.guard, id))
    }

    async fn list_all(&mut self) -> Result<Vec<Modem>, Error> {
        Ok(self.staged.list_all(&self.guard))
    }

    async fn update(&mut self, modem: &Modem) -> Result<(), Error> {
        self.staged.stage(&self.guard, modem)
    }

    async fn commit(self: Box<Self>) -> Result<(), Error> {
        let FileTransaction {
            mut guard,
            staged,
            path,
        } = *self;

        if staged.is_empty() {
            return Ok(());
        }

        let mut next = guard.clone();
        next.apply(staged)?;
        write_state(&path, &next)
            .await
            .inspect_err(|e| tracing::error!("Transaction not committed: {}", e))?;
        *guard = next;
        Ok(())
    }
}

#[async_trait]
impl RecurringJobs for FileFleetStore {
    async fn get_schedule(&self, key: &ScheduleKey) -> Result<Option<ScheduledRotation>, Error> {
        Ok(self.state.read().await.schedule(key))
    }

    async fn upsert_schedule(
        &self,
        key: &ScheduleKey,
        modem_id: ModemId,
        interval_minutes: u32,
    ) -> Result<ScheduleHandle, Error> {
        self.mutate(|state| state.upsert_schedule(key, modem_id, interval_minutes))
            .await
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduledRotation>, Error> {
        Ok(self.state.read().await.schedules())
    }

    async fn interval_definitions(&self) -> Result<Vec<u32>, Error> {
        Ok(self.state.read().await.interval_definitions())
    }

    async fn delete_all_schedules(&self) -> Result<(), Error> {
        self.mutate(|state| {
            state.delete_all_schedules();
            Ok(())
        })
        .await
    }
}

#[async_trait]
impl SmsStore for FileFleetStore {
    async fn insert_sms(&self, sms: NewSms) -> Result<Sms, Error> {
        self.mutate(move |state| state.insert_sms(sms)).await
    }

    async fn list_sms(&self, modem_id: Option<ModemId>) -> Result<Vec<Sms>, Error> {
        Ok(self.state.read().await.list_sms(modem_id))
    }
}

#[async_trait]
impl SettingsStore for FileFleetStore {
    async fn feature_settings(&self) -> Result<Option<FeatureSettings>, Error> {
        Ok(self.state.read().await.feature_settings())
    }

    async fn save_feature_settings(&self, settings: &FeatureSettings) -> Result<(), Error> {
        let settings = *settings;
        self.mutate(move |state| {
            state.save_feature_settings(settings);
            Ok(())
        })
        .await
    }
}
