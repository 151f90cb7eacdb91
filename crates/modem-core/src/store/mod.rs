// # Fleet Store Implementations
//
// This module provides implementations of the collaborator traits
// (`ModemStore`, `RecurringJobs`, `SmsStore`, `SettingsStore`) for
// different persistence strategies. Both keep the whole fleet in a
// `FleetState` behind a `tokio::sync::RwLock`; the file store also writes
// it to disk.
//
// Transactions hold the write lock for their whole lifetime and stage
// updates next to the state, so nothing is visible until commit.

pub mod file;
pub mod memory;

pub use file::FileFleetStore;
pub use memory::MemoryFleetStore;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use crate::error::{Error, Result};
use crate::model::{Modem, ModemId, NewModem, NewSms, Sms};
use crate::settings::FeatureSettings;
use crate::traits::{ScheduleHandle, ScheduleKey, ScheduledRotation};

/// Everything a fleet store holds
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub(crate) struct FleetState {
    #[serde(default)]
    modems: BTreeMap<ModemId, Modem>,
    #[serde(default)]
    sms: BTreeMap<u64, Sms>,
    #[serde(default)]
    feature_settings: Option<FeatureSettings>,
    #[serde(default)]
    schedules: BTreeMap<ScheduleKey, ScheduledRotation>,
    #[serde(default)]
    interval_definitions: BTreeSet<u32>,
    #[serde(default)]
    next_modem_id: u64,
    #[serde(default)]
    next_sms_id: u64,
}

impl FleetState {
    pub(crate) fn modem(&self, id: ModemId) -> Option<Modem> {
        self.modems.get(&id).cloned()
    }

    pub(crate) fn modems(&self) -> Vec<Modem> {
        self.modems.values().cloned().collect()
    }

    pub(crate) fn modem_count(&self) -> usize {
        self.modems.len()
    }

    pub(crate) fn insert_modem(&mut self, new: NewModem) -> Result<Modem> {
        new.validate()?;
        self.next_modem_id += 1;
        let modem = new.into_modem(ModemId(self.next_modem_id));
        self.modems.insert(modem.id, modem.clone());
        Ok(modem)
    }

    pub(crate) fn update_modem(&mut self, modem: &Modem) -> Result<()> {
        let slot = self
            .modems
            .get_mut(&modem.id)
            .ok_or_else(|| Error::not_found(format!("Modem {}", modem.id)))?;
        *slot = modem.clone();
        Ok(())
    }

    /// Removes the modem and its messages; schedules are left alone.
    pub(crate) fn delete_modem(&mut self, id: ModemId) {
        if self.modems.remove(&id).is_some() {
            self.sms.retain(|_, sms| sms.modem_id != id);
        }
    }

    pub(crate) fn insert_sms(&mut self, new: NewSms) -> Result<Sms> {
        new.validate()?;
        if !self.modems.contains_key(&new.modem_id) {
            return Err(Error::not_found(format!("Modem {}", new.modem_id)));
        }
        self.next_sms_id += 1;
        let sms = new.into_sms(self.next_sms_id);
        self.sms.insert(sms.id, sms.clone());
        Ok(sms)
    }

    pub(crate) fn list_sms(&self, modem_id: Option<ModemId>) -> Vec<Sms> {
        self.sms
            .values()
            .filter(|sms| modem_id.is_none_or(|id| sms.modem_id == id))
            .cloned()
            .collect()
    }

    pub(crate) fn feature_settings(&self) -> Option<FeatureSettings> {
        self.feature_settings
    }

    pub(crate) fn save_feature_settings(&mut self, settings: FeatureSettings) {
        self.feature_settings = Some(settings);
    }

    pub(crate) fn schedule(&self, key: &ScheduleKey) -> Option<ScheduledRotation> {
        self.schedules.get(key).cloned()
    }

    pub(crate) fn schedules(&self) -> Vec<ScheduledRotation> {
        self.schedules.values().cloned().collect()
    }

    pub(crate) fn interval_definitions(&self) -> Vec<u32> {
        self.interval_definitions.iter().copied().collect()
    }

    pub(crate) fn upsert_schedule(
        &mut self,
        key: &ScheduleKey,
        modem_id: ModemId,
        interval_minutes: u32,
    ) -> Result<ScheduleHandle> {
        if interval_minutes == 0 {
            return Err(Error::scheduler("Schedule interval must be greater than 0"));
        }

        self.interval_definitions.insert(interval_minutes);

        let now = chrono::Utc::now();
        let created = match self.schedules.get_mut(key) {
            Some(existing) => {
                existing.modem_id = modem_id;
                existing.interval_minutes = interval_minutes;
                existing.updated_at = now;
                false
            }
            None => {
                self.schedules.insert(
                    key.clone(),
                    ScheduledRotation {
                        key: key.clone(),
                        modem_id,
                        interval_minutes,
                        created_at: now,
                        updated_at: now,
                    },
                );
                true
            }
        };

        Ok(ScheduleHandle {
            key: key.clone(),
            interval_minutes,
            created,
        })
    }

    pub(crate) fn delete_all_schedules(&mut self) {
        self.schedules.clear();
        self.interval_definitions.clear();
    }

    /// Apply staged transaction updates; all or nothing.
    pub(crate) fn apply(&mut self, staged: StagedUpdates) -> Result<()> {
        if let Some(missing) = staged
            .modems
            .keys()
            .find(|id| !self.modems.contains_key(id))
        {
            return Err(Error::not_found(format!("Modem {}", missing)));
        }

        self.modems.extend(staged.modems);
        Ok(())
    }
}

/// Updates staged by an open transaction
#[derive(Debug, Default)]
pub(crate) struct StagedUpdates {
    modems: BTreeMap<ModemId, Modem>,
}

impl StagedUpdates {
    pub(crate) fn is_empty(&self) -> bool {
        self.modems.is_empty()
    }

    pub(crate) fn get(&self, state: &FleetState, id: ModemId) -> Option<Modem> {
        self.modems.get(&id).cloned().or_else(|| state.modem(id))
    }

    pub(crate) fn list_all(&self, state: &FleetState) -> Vec<Modem> {
        state
            .modems
            .values()
            .map(|modem| self.modems.get(&modem.id).unwrap_or(modem).clone())
            .collect()
    }

    pub(crate) fn stage(&mut self, state: &FleetState, modem: &Modem) -> Result<()> {
        if !state.modems.contains_key(&modem.id) {
            return Err(Error::not_found(format!("Modem {}", modem.id)));
        }
        self.modems.insert(modem.id, modem.clone());
        Ok(())
    }
}
