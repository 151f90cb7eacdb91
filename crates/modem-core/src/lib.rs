// # modem-core
//
// Core library for the modem fleet: identifier rotation, recurring rotation
// schedules, and the runner that fires them.
//
// ## Architecture Overview
//
// - **Identifier generator**: Random public IP, IPv4 and IPv6 strings
// - **ModemRegistry**: Rotates one modem, or redistributes the triples already
//   in use across the whole fleet inside one transaction
// - **RotationScheduler**: At most one recurring schedule per modem, keyed by
//   modem id
// - **RotationBeat**: Recurring job runner that fires due schedules
// - **ModemStore / RecurringJobs / SmsStore / SettingsStore**: Collaborator
//   traits, with in-memory and JSON file implementations
//
// ## Design Principles
//
// 1. **Consistency**: Bulk rotation commits every update or none
// 2. **Idempotency**: Scheduling the same modem twice updates, never duplicates
// 3. **Library-First**: The daemon is a thin shell over this crate
// 4. **Traits at the seams**: Storage and the job table are swappable

pub mod beat;
pub mod config;
pub mod error;
pub mod fleet;
pub mod identifiers;
pub mod inbox;
pub mod model;
pub mod registry;
pub mod scheduler;
pub mod seed;
pub mod settings;
pub mod store;
pub mod traits;

// Re-export core types for convenience
pub use beat::{BeatEvent, RotationBeat};
pub use config::{BeatConfig, FleetConfig, StoreConfig};
pub use error::{Error, Result};
pub use fleet::Fleet;
pub use identifiers::IdentifierTriple;
pub use model::{Carrier, Modem, ModemId, ModemModel, NewModem, Sms};
pub use registry::{ModemRegistry, RotateAllReport};
pub use scheduler::{RotationInterval, RotationScheduler, ScheduleReport, ScheduleTarget};
pub use store::{FileFleetStore, MemoryFleetStore};
pub use traits::{ModemStore, RecurringJobs, SettingsStore, SmsStore};
