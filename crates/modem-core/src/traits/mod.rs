//! Collaborator traits for the modem fleet core
//!
//! The core never touches storage or timers directly; it goes through these
//! interfaces.
//!
//! - [`ModemStore`]: Modem records and transactional updates
//! - [`RecurringJobs`]: Keyed table of recurring rotation schedules
//! - [`SmsStore`] / [`SettingsStore`]: SMS records and the feature settings row

pub mod modem_store;
pub mod recurring_jobs;
pub mod sms_store;

pub use modem_store::{ModemStore, ModemTransaction};
pub use recurring_jobs::{RecurringJobs, ScheduleHandle, ScheduleKey, ScheduledRotation};
pub use sms_store::{SettingsStore, SmsStore};
