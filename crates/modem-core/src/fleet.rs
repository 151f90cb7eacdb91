//! One handle over a store that implements every collaborator trait
//!
//! Both reference stores ([`MemoryFleetStore`](crate::store::MemoryFleetStore)
//! and [`FileFleetStore`](crate::store::FileFleetStore)) implement all four
//! traits, so a daemon or test can wire every component from one `Arc`.

use std::sync::Arc;
use tokio::sync::mpsc;

use crate::beat::{BeatEvent, RotationBeat};
use crate::config::BeatConfig;
use crate::error::Result;
use crate::inbox::SmsInbox;
use crate::model::{Modem, ModemId, NewModem, Sms};
use crate::registry::{ModemRegistry, RotateAllReport};
use crate::scheduler::{RotationScheduler, ScheduleReport, ScheduleTarget};
use crate::settings::{self, CriticalModeToggle, FeatureSettings};
use crate::traits::{ModemStore, RecurringJobs, ScheduledRotation, SettingsStore, SmsStore};

pub struct Fleet {
    registry: Arc<ModemRegistry>,
    scheduler: RotationScheduler,
    inbox: SmsInbox,
    jobs: Arc<dyn RecurringJobs>,
    settings: Arc<dyn SettingsStore>,
}

impl Fleet {
    pub fn new<S>(store: Arc<S>) -> Self
    where
        S: ModemStore + SmsStore + SettingsStore + RecurringJobs + 'static,
    {
        let modems: Arc<dyn ModemStore> = store.clone();
        let jobs: Arc<dyn RecurringJobs> = store.clone();
        let sms: Arc<dyn SmsStore> = store.clone();
        let settings: Arc<dyn SettingsStore> = store;

        Self {
            registry: Arc::new(ModemRegistry::new(Arc::clone(&modems))),
            scheduler: RotationScheduler::new(Arc::clone(&modems), Arc::clone(&jobs)),
            inbox: SmsInbox::new(modems, sms),
            jobs,
            settings,
        }
    }

    pub fn registry(&self) -> &Arc<ModemRegistry> {
        &self.registry
    }

    pub async fn modems(&self) -> Result<Vec<Modem>> {
        self.registry.list().await
    }

    pub async fn provision(&self, modem: NewModem) -> Result<Modem> {
        self.registry.provision(modem).await
    }

    pub async fn rotate_one(&self, modem_id: ModemId) -> Result<Modem> {
        self.registry.rotate_one(modem_id).await
    }

    pub async fn rotate_all(&self) -> Result<RotateAllReport> {
        self.registry.rotate_all().await
    }

    pub async fn schedule(&self, target: ScheduleTarget, interval_minutes: u32) -> Result<ScheduleReport> {
        self.scheduler.schedule(target, interval_minutes).await
    }

    pub async fn clear_schedules(&self) -> Result<()> {
        self.scheduler.clear_all().await
    }

    pub async fn schedules(&self) -> Result<Vec<ScheduledRotation>> {
        self.scheduler.list().await
    }

    pub async fn messages(&self, modem_id: Option<ModemId>) -> Result<Vec<Sms>> {
        self.inbox.messages(modem_id).await
    }

    pub async fn modems_by_phone(&self, phone_number: &str) -> Result<Vec<Modem>> {
        self.inbox.modems_by_phone(phone_number).await
    }

    pub async fn feature_settings(&self) -> Result<FeatureSettings> {
        settings::load_or_init(self.settings.as_ref()).await
    }

    pub async fn set_critical_mode(&self, toggle: CriticalModeToggle) -> Result<FeatureSettings> {
        settings::set_critical_mode(self.settings.as_ref(), toggle).await
    }

    /// Build a rotation beat over this fleet's registry and schedules
    pub fn beat(&self, config: BeatConfig) -> Result<(RotationBeat, mpsc::Receiver<BeatEvent>)> {
        RotationBeat::new(Arc::clone(&self.registry), Arc::clone(&self.jobs), config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::seed_demo_fleet;
    use crate::store::MemoryFleetStore;

    #[tokio::test]
    async fn test_fleet_wires_one_store() {
        let store = Arc::new(MemoryFleetStore::new());
        seed_demo_fleet(store.as_ref()).await.unwrap();
        let fleet = Fleet::new(Arc::clone(&store));

        fleet.schedule(ScheduleTarget::All, 10).await.unwrap();
        assert_eq!(store.list_schedules().await.unwrap().len(), 3);

        let rotated = fleet.rotate_one(ModemId(3)).await.unwrap();
        assert_eq!(store.get(ModemId(3)).await.unwrap(), Some(rotated));

        let settings = fleet.set_critical_mode(CriticalModeToggle::Enable).await.unwrap();
        assert!(settings.critical_mode_enabled);
        assert_eq!(fleet.feature_settings().await.unwrap(), settings);
    }
}
