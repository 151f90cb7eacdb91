// # Recurring Jobs Trait
//
// Defines the keyed job table that recurring rotations live in.
//
// ## Purpose
//
// Every scheduled rotation is stored under a key derived only from the modem
// id. Looking the key up before writing is what keeps at most one schedule
// per modem; the table itself is a plain keyed map.
//
// The table also remembers the distinct interval values that have been
// registered ("interval definitions"), so a clear can remove them as well.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::model::ModemId;

/// Deterministic schedule key for one modem
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ScheduleKey(String);

impl ScheduleKey {
    const PREFIX: &'static str = "rotate:";

    /// Key for the rotation schedule of `modem_id`
    pub fn for_modem(modem_id: ModemId) -> Self {
        Self(format!("{}{}", Self::PREFIX, modem_id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ScheduleKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A recurring "rotate identifiers for this modem" job
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScheduledRotation {
    pub key: ScheduleKey,
    pub modem_id: ModemId,
    /// Always > 0
    pub interval_minutes: u32,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

impl ScheduledRotation {
    /// Create a new schedule stamped with the current time
    pub fn new(modem_id: ModemId, interval_minutes: u32) -> Self {
        let now = chrono::Utc::now();
        Self {
            key: ScheduleKey::for_modem(modem_id),
            modem_id,
            interval_minutes,
            created_at: now,
            updated_at: now,
        }
    }

    /// Interval as a chrono duration
    pub fn interval(&self) -> chrono::Duration {
        chrono::Duration::minutes(i64::from(self.interval_minutes))
    }
}

/// Result of an upsert
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleHandle {
    pub key: ScheduleKey,
    pub interval_minutes: u32,
    /// `true` when no schedule existed under the key before
    pub created: bool,
}

/// Trait for recurring job table implementations
///
/// Implementations must be thread-safe and usable across async tasks.
/// They store schedules; firing them is the job of `RotationBeat`.
#[async_trait]
pub trait RecurringJobs: Send + Sync {
    /// Get the schedule stored under `key`
    async fn get_schedule(
        &self,
        key: &ScheduleKey,
    ) -> Result<Option<ScheduledRotation>, crate::Error>;

    /// Create or replace the schedule stored under `key`
    ///
    /// An existing schedule keeps its `created_at`; `updated_at` is bumped.
    async fn upsert_schedule(
        &self,
        key: &ScheduleKey,
        modem_id: ModemId,
        interval_minutes: u32,
    ) -> Result<ScheduleHandle, crate::Error>;

    /// List every schedule, ordered by key
    async fn list_schedules(&self) -> Result<Vec<ScheduledRotation>, crate::Error>;

    /// Distinct interval values currently registered, ascending
    async fn interval_definitions(&self) -> Result<Vec<u32>, crate::Error>;

    /// Delete every schedule and every interval definition
    async fn delete_all_schedules(&self) -> Result<(), crate::Error>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_is_derived_from_modem_id() {
        assert_eq!(ScheduleKey::for_modem(ModemId(1)).as_str(), "rotate:1");
        assert_eq!(
            ScheduleKey::for_modem(ModemId(12)),
            ScheduleKey::for_modem(ModemId(12))
        );
        assert_ne!(
            ScheduleKey::for_modem(ModemId(1)),
            ScheduleKey::for_modem(ModemId(11))
        );
    }

    #[test]
    fn test_schedule_interval() {
        let schedule = ScheduledRotation::new(ModemId(3), 90);
        assert_eq!(schedule.interval(), chrono::Duration::minutes(90));
        assert_eq!(schedule.created_at, schedule.updated_at);
        assert_eq!(schedule.key.to_string(), "rotate:3");
    }
}
