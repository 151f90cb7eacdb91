// # Memory Fleet Store
//
// In-memory implementation of every fleet collaborator trait.
//
// ## Purpose
//
// Provides a simple, fast store that doesn't persist across restarts.
// Useful for testing and for daemons that re-seed on start.
//
// ## Crash Behavior
//
// - All modems, messages and schedules are lost on restart/crash
// - Scheduled rotations must be re-registered after a restart

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{OwnedRwLockWriteGuard, RwLock};

use super::{FleetState, StagedUpdates};
use crate::Error;
use crate::model::{Modem, ModemId, NewModem, NewSms, Sms};
use crate::settings::FeatureSettings;
use crate::traits::{
    ModemStore, ModemTransaction, RecurringJobs, ScheduleHandle, ScheduleKey, ScheduledRotation,
    SettingsStore, SmsStore,
};

/// In-memory fleet store implementation
///
/// This implementation keeps the fleet in a `FleetState` protected by a
/// RwLock. Clones share the same state.
///
/// # Example
///
/// ```rust,no_run
/// use modem_core::store::MemoryFleetStore;
/// use modem_core::traits::ModemStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = MemoryFleetStore::new();
///
///     for modem in modem_core::seed::demo_fleet() {
///         store.insert(modem).await?;
///     }
///
///     assert_eq!(store.list_all().await?.len(), 3);
///     Ok(())
/// }
/// ```
#[derive(Debug, Clone, Default)]
pub struct MemoryFleetStore {
    inner: Arc<RwLock<FleetState>>,
}

impl MemoryFleetStore {
    /// Create a new empty memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of modems in the store
    pub async fn len(&self) -> usize {
        self.inner.read().await.modem_count()
    }

    /// Check if the store holds no modems
    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Drop everything: modems, messages, settings and schedules
    pub async fn clear(&self) -> Result<(), Error> {
        let mut guard = self.inner.write().await;
        *guard = FleetState::default();
        Ok(())
    }
}

#[async_trait]
impl ModemStore for MemoryFleetStore {
    async fn get(&self, id: ModemId) -> Result<Option<Modem>, Error> {
        Ok(self.inner.read().await.modem(id))
    }

    async fn list_all(&self) -> Result<Vec<Modem>, Error> {
        Ok(self.inner.read().await.modems())
    }

    async fn insert(&self, modem: NewModem) -> Result<Modem, Error> {
        self.inner.write().await.insert_modem(modem)
    }

    async fn update(&self, modem: &Modem) -> Result<(), Error> {
        self.inner.write().await.update_modem(modem)
    }

    async fn delete(&self, id: ModemId) -> Result<(), Error> {
        self.inner.write().await.delete_modem(id);
        Ok(())
    }

    async fn begin(&self) -> Result<Box<dyn ModemTransaction>, Error> {
        let guard = Arc::clone(&self.inner).write_owned().await;
        Ok(Box::new(MemoryTransaction {
            guard,
            staged: StagedUpdates::default(),
        }))
    }

    async fn flush(&self) -> Result<(), Error> {
        // Nothing to persist
        Ok(())
    }
}

/// Transaction over a [`MemoryFleetStore`]
///
/// Holds the store's write lock until committed or dropped.
struct MemoryTransaction {
    guard: OwnedRwLockWriteGuard<FleetState>,
    staged: StagedUpdates,
}

#[async_trait]
impl ModemTransaction for MemoryTransaction {
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
        let MemoryTransaction { mut guard, staged } = *self;
        guard.apply(staged)
    }
}

#[async_trait]
impl RecurringJobs for MemoryFleetStore {
    async fn get_schedule(&self, key: &ScheduleKey) -> Result<Option<ScheduledRotation>, Error> {
        Ok(self.inner.read().await.schedule(key))
    }

    async fn upsert_schedule(
        &self,
        key: &ScheduleKey,
        modem_id: ModemId,
        interval_minutes: u32,
    ) -> Result<ScheduleHandle, Error> {
        self.inner
            .write()
            .await
            .upsert_schedule(key, modem_id, interval_minutes)
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduledRotation>, Error> {
        Ok(self.inner.read().await.schedules())
    }

    async fn interval_definitions(&self) -> Result<Vec<u32>, Error> {
        Ok(self.inner.read().await.interval_definitions())
    }

    async fn delete_all_schedules(&self) -> Result<(), Error> {
        self.inner.write().await.delete_all_schedules();
        Ok(())
    }
}

#[async_trait]
impl SmsStore for MemoryFleetStore {
    async fn insert_sms(&self, sms: NewSms) -> Result<Sms, Error> {
        self.inner.write().await.insert_sms(sms)
    }

    async fn list_sms(&self, modem_id: Option<ModemId>) -> Result<Vec<Sms>, Error> {
        Ok(self.inner.read().await.list_sms(modem_id))
    }
}

#[async_trait]
impl SettingsStore for MemoryFleetStore {
    async fn feature_settings(&self) -> Result<Option<FeatureSettings>, Error> {
        Ok(self.inner.read().await.feature_settings())
    }

    async fn save_feature_settings(&self, settings: &FeatureSettings) -> Result<(), Error> {
        self.inner.write().await.save_feature_settings(*settings);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::demo_fleet;

    async fn seeded() -> MemoryFleetStore {
        let store = MemoryFleetStore::new();
        for modem in demo_fleet() {
            store.insert(modem).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_memory_store_basic() {
        let store = MemoryFleetStore::new();

        // Initially empty
        assert!(store.is_empty().await);

        let modem = store.insert(demo_fleet().remove(0)).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert_eq!(store.get(modem.id).await.unwrap(), Some(modem.clone()));

        // Delete
        store.delete(modem.id).await.unwrap();
        assert!(store.get(modem.id).await.unwrap().is_none());
        assert!(store.is_empty().await);
    }

    #[tokio::test]
    async fn test_update_unknown_modem_is_not_found() {
        let store = seeded().await;
        let mut ghost = store.list_all().await.unwrap().remove(0);
        ghost.id = ModemId(404);

        let err = store.update(&ghost).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_transaction_commit_publishes_updates() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let mut first = tx.get(ModemId(1)).await.unwrap().unwrap();
        first.public_ip = "8.8.8.8".to_string();
        tx.update(&first).await.unwrap();

        // Staged update is visible inside the transaction
        assert_eq!(tx.list_all().await.unwrap()[0].public_ip, "8.8.8.8");
        tx.commit().await.unwrap();

        assert_eq!(store.get(ModemId(1)).await.unwrap().unwrap().public_ip, "8.8.8.8");
    }

    #[tokio::test]
    async fn test_dropped_transaction_discards_updates() {
        let store = seeded().await;
        let before = store.list_all().await.unwrap();

        {
            let mut tx = store.begin().await.unwrap();
            let mut first = tx.get(ModemId(1)).await.unwrap().unwrap();
            first.ipv4 = "9.9.9.9".to_string();
            tx.update(&first).await.unwrap();
        }

        assert_eq!(store.list_all().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_readers_wait_for_open_transaction() {
        let store = seeded().await;

        let mut tx = store.begin().await.unwrap();
        let mut first = tx.get(ModemId(1)).await.unwrap().unwrap();
        first.ipv6 = "0000:0000:0000:0000:0000:0000:0000:0001".to_string();
        tx.update(&first).await.unwrap();

        let reader = {
            let store = store.clone();
            tokio::spawn(async move { store.get(ModemId(1)).await.unwrap().unwrap() })
        };

        tokio::time::sleep(tokio::time::Duration::from_millis(20)).await;
        assert!(!reader.is_finished(), "reader must block while the transaction is open");

        tx.commit().await.unwrap();
        let seen = reader.await.unwrap();
        assert_eq!(seen.ipv6, "0000:0000:0000:0000:0000:0000:0000:0001");
    }

    #[tokio::test]
    async fn test_clear_drops_everything() {
        let store = seeded().await;
        store
            .upsert_schedule(&ScheduleKey::for_modem(ModemId(1)), ModemId(1), 5)
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert!(store.is_empty().await);
        assert!(store.list_schedules().await.unwrap().is_empty());
    }
}
