//! Recurring rotation schedules
//!
//! Every modem has at most one schedule, stored under
//! [`ScheduleKey::for_modem`]. Scheduling a modem again looks that key up and
//! changes the interval in place; it never adds a second entry that would
//! fire twice.
//!
//! Scheduling "all" gives every modem its own schedule. There is no shared
//! fleet-wide job.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::ModemId;
use crate::traits::{ModemStore, RecurringJobs, ScheduleKey, ScheduledRotation};

/// Upper bound for the `days` interval unit
pub const MAX_DAYS: u32 = 29;
/// Upper bound for the `hours` interval unit
pub const MAX_HOURS: u32 = 22;
/// Upper bound for the `minutes` interval unit
pub const MAX_MINUTES: u32 = 58;

const MINUTES_PER_HOUR: u32 = 60;
const MINUTES_PER_DAY: u32 = 24 * MINUTES_PER_HOUR;

/// A rotation interval given in exactly one unit
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RotationInterval {
    Days(u32),
    Hours(u32),
    Minutes(u32),
}

impl RotationInterval {
    /// Build an interval from optional request parameters
    ///
    /// Exactly one of the three must be present, within its bound, and the
    /// resulting interval must not be zero.
    pub fn from_parts(days: Option<u32>, hours: Option<u32>, minutes: Option<u32>) -> Result<Self> {
        let interval = match (days, hours, minutes) {
            (Some(d), None, None) => Self::Days(check_bound("day", d, MAX_DAYS)?),
            (None, Some(h), None) => Self::Hours(check_bound("hour", h, MAX_HOURS)?),
            (None, None, Some(m)) => Self::Minutes(check_bound("min", m, MAX_MINUTES)?),
            _ => {
                return Err(Error::invalid_input(
                    "Please provide exactly one interval parameter.",
                ));
            }
        };

        if interval.total_minutes() == 0 {
            return Err(Error::invalid_input("Interval must be greater than 0"));
        }
        Ok(interval)
    }

    /// `days*24*60 + hours*60 + minutes`
    pub fn total_minutes(self) -> u32 {
        match self {
            Self::Days(d) => d * MINUTES_PER_DAY,
            Self::Hours(h) => h * MINUTES_PER_HOUR,
            Self::Minutes(m) => m,
        }
    }
}

fn check_bound(name: &str, value: u32, max: u32) -> Result<u32> {
    if value > max {
        return Err(Error::invalid_input(format!(
            "{} must be between 0 and {}, got {}",
            name, max, value
        )));
    }
    Ok(value)
}

/// Which modems a schedule request covers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleTarget {
    /// Every modem currently in the store, each with its own schedule
    All,
    Modem(ModemId),
}

impl FromStr for ScheduleTarget {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("all") {
            return Ok(Self::All);
        }
        s.parse::<ModemId>().map(Self::Modem).map_err(|_| {
            Error::invalid_input(format!("Target must be 'all' or a modem id, got '{}'", s))
        })
    }
}

impl From<ModemId> for ScheduleTarget {
    fn from(id: ModemId) -> Self {
        Self::Modem(id)
    }
}

/// What happened to one modem's schedule
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScheduleChange {
    Created,
    Updated { previous_minutes: u32 },
    /// Same interval requested again; nothing was written
    Unchanged,
}

/// Confirmation of a schedule request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleReport {
    pub target: ScheduleTarget,
    pub interval_minutes: u32,
    pub changes: Vec<(ModemId, ScheduleChange)>,
}

impl fmt::Display for ScheduleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.target {
            ScheduleTarget::All => write!(
                f,
                "IP Rotation scheduled every {} minutes for all modems",
                self.interval_minutes
            ),
            ScheduleTarget::Modem(id) => write!(
                f,
                "IP Rotation scheduled every {} minutes for Modem {}",
                self.interval_minutes, id
            ),
        }
    }
}

/// Maps modems to recurring rotation intervals
pub struct RotationScheduler {
    modems: Arc<dyn ModemStore>,
    jobs: Arc<dyn RecurringJobs>,
}

impl RotationScheduler {
    pub fn new(modems: Arc<dyn ModemStore>, jobs: Arc<dyn RecurringJobs>) -> Self {
        Self { modems, jobs }
    }

    /// Schedule recurring rotation for `target` every `interval_minutes`
    ///
    /// # Errors
    ///
    /// - `InvalidInput` if `interval_minutes` is 0
    /// - `NotFound` if a single target modem does not exist
    pub async fn schedule(
        &self,
        target: ScheduleTarget,
        interval_minutes: u32,
    ) -> Result<ScheduleReport> {
        if interval_minutes == 0 {
            return Err(Error::invalid_input("Interval must be greater than 0"));
        }

        let modem_ids = match target {
            ScheduleTarget::All => self
                .modems
                .list_all()
                .await?
                .into_iter()
                .map(|modem| modem.id)
                .collect(),
            ScheduleTarget::Modem(id) => {
                if self.modems.get(id).await?.is_none() {
                    return Err(Error::not_found(format!("Modem {}", id)));
                }
                vec![id]
            }
        };

        let mut changes = Vec::with_capacity(modem_ids.len());
        for modem_id in modem_ids {
            let change = self.schedule_modem(modem_id, interval_minutes).await?;
            changes.push((modem_id, change));
        }

        let report = ScheduleReport {
            target,
            interval_minutes,
            changes,
        };
        info!("{}", report);
        Ok(report)
    }

    /// Create or update the schedule of one modem
    async fn schedule_modem(&self, modem_id: ModemId, interval_minutes: u32) -> Result<ScheduleChange> {
        let key = ScheduleKey::for_modem(modem_id);

        match self.jobs.get_schedule(&key).await? {
            Some(existing) if existing.interval_minutes == interval_minutes => {
                debug!("Schedule {} already every {} minutes", key, interval_minutes);
                Ok(ScheduleChange::Unchanged)
            }
            Some(existing) => {
                self.jobs
                    .upsert_schedule(&key, modem_id, interval_minutes)
                    .await?;
                debug!(
                    "Schedule {} changed from {} to {} minutes",
                    key, existing.interval_minutes, interval_minutes
                );
                Ok(ScheduleChange::Updated {
                    previous_minutes: existing.interval_minutes,
                })
            }
            None => {
                self.jobs
                    .upsert_schedule(&key, modem_id, interval_minutes)
                    .await?;
                debug!("Schedule {} created every {} minutes", key, interval_minutes);
                Ok(ScheduleChange::Created)
            }
        }
    }

    /// Delete every schedule and interval definition
    pub async fn clear_all(&self) -> Result<()> {
        self.jobs.delete_all_schedules().await?;
        info!("IP rotation intervals cleared");
        Ok(())
    }

    /// Current schedules, ordered by key
    pub async fn list(&self) -> Result<Vec<ScheduledRotation>> {
        self.jobs.list_schedules().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_requires_exactly_one_unit() {
        assert!(matches!(
            RotationInterval::from_parts(None, None, None),
            Err(Error::InvalidInput(ref m)) if m == "Please provide exactly one interval parameter."
        ));
        assert!(RotationInterval::from_parts(Some(1), Some(1), None).is_err());
        assert!(RotationInterval::from_parts(Some(1), Some(1), Some(1)).is_err());
    }

    #[test]
    fn test_interval_zero_is_rejected() {
        assert!(matches!(
            RotationInterval::from_parts(None, None, Some(0)),
            Err(Error::InvalidInput(ref m)) if m == "Interval must be greater than 0"
        ));
        assert!(RotationInterval::from_parts(Some(0), None, None).is_err());
    }

    #[test]
    fn test_interval_bounds() {
        assert!(RotationInterval::from_parts(Some(30), None, None).is_err());
        assert!(RotationInterval::from_parts(None, Some(23), None).is_err());
        assert!(RotationInterval::from_parts(None, None, Some(59)).is_err());
        assert!(RotationInterval::from_parts(None, None, Some(58)).is_ok());
    }

    #[test]
    fn test_interval_total_minutes() {
        let days = RotationInterval::from_parts(Some(2), None, None).unwrap();
        let hours = RotationInterval::from_parts(None, Some(3), None).unwrap();
        let minutes = RotationInterval::from_parts(None, None, Some(5)).unwrap();
        assert_eq!(days.total_minutes(), 2 * 24 * 60);
        assert_eq!(hours.total_minutes(), 180);
        assert_eq!(minutes.total_minutes(), 5);
    }

    #[test]
    fn test_target_parse() {
        assert_eq!("all".parse::<ScheduleTarget>().unwrap(), ScheduleTarget::All);
        assert_eq!("ALL".parse::<ScheduleTarget>().unwrap(), ScheduleTarget::All);
        assert_eq!(
            "7".parse::<ScheduleTarget>().unwrap(),
            ScheduleTarget::Modem(ModemId(7))
        );
        assert!("".parse::<ScheduleTarget>().is_err());
        assert!("modem-7".parse::<ScheduleTarget>().is_err());
    }

    #[test]
    fn test_report_message() {
        let single = ScheduleReport {
            target: ScheduleTarget::Modem(ModemId(1)),
            interval_minutes: 5,
            changes: vec![(ModemId(1), ScheduleChange::Created)],
        };
        assert_eq!(
            single.to_string(),
            "IP Rotation scheduled every 5 minutes for Modem 1"
        );

        let all = ScheduleReport {
            target: ScheduleTarget::All,
            interval_minutes: 60,
            changes: Vec::new(),
        };
        assert_eq!(
            all.to_string(),
            "IP Rotation scheduled every 60 minutes for all modems"
        );
    }
}
