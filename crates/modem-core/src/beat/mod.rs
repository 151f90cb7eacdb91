//! Rotation beat: the recurring job runner
//!
//! The beat wakes up every `tick_secs`, reads the schedule table and rotates
//! every modem whose schedule is due.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐
//! │  Interval   │─── tick ───┐
//! └─────────────┘            │
//!                            ▼
//!                   ┌──────────────┐
//!                   │ RotationBeat │
//!                   └──────────────┘
//!                            │
//!         ┌──────────────────┼──────────────────┐
//!         │                  │                  │
//!         ▼                  ▼                  ▼
//! ┌───────────────┐  ┌───────────────┐  ┌─────────────┐
//! │ RecurringJobs │  │ ModemRegistry │  │   Events    │
//! │ (due?)        │  │ (rotate_one)  │  │  (notify)   │
//! └───────────────┘  └───────────────┘  └─────────────┘
//! ```
//!
//! ## Due Schedules
//!
//! A schedule is due when `now - reference >= interval`. The reference is
//! the later of the schedule's `updated_at` and the last time this beat
//! fired it, so changing an interval restarts its countdown.
//!
//! Fire times live in memory only. After a restart every schedule counts
//! from its `updated_at` again.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, mpsc, oneshot};
use tokio_stream::StreamExt;
use tokio_stream::wrappers::IntervalStream;
use tracing::{debug, error, info, warn};

use crate::config::BeatConfig;
use crate::error::Result;
use crate::model::ModemId;
use crate::registry::ModemRegistry;
use crate::traits::{RecurringJobs, ScheduleKey, ScheduledRotation};

/// Events emitted by the RotationBeat
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BeatEvent {
    /// Beat started
    Started { schedules_count: usize },

    /// A due schedule rotated its modem
    RotationFired {
        key: ScheduleKey,
        modem_id: ModemId,
        public_ip: String,
    },

    /// A due schedule could not rotate its modem
    RotationFailed {
        key: ScheduleKey,
        modem_id: ModemId,
        error: String,
    },

    /// Beat stopped
    Stopped { reason: String },
}

/// Counts for one pass over the schedule table
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickSummary {
    pub due: usize,
    pub fired: usize,
    pub failed: usize,
}

/// Recurring job runner for rotation schedules
///
/// ## Lifecycle
///
/// 1. Create with [`RotationBeat::new()`]
/// 2. Start with [`RotationBeat::run()`] or [`RotationBeat::run_with_shutdown()`]
/// 3. Beat runs until the shutdown signal
/// 4. The modem store is flushed before returning
pub struct RotationBeat {
    registry: Arc<ModemRegistry>,

    jobs: Arc<dyn RecurringJobs>,

    tick_secs: u64,

    /// Last fire time per schedule key
    last_fired: Mutex<HashMap<ScheduleKey, DateTime<Utc>>>,

    /// Event sender for external monitoring
    event_tx: mpsc::Sender<BeatEvent>,
}

impl RotationBeat {
    /// Create a new rotation beat
    ///
    /// # Returns
    ///
    /// A tuple of (beat, event_receiver) where event_receiver yields beat events
    pub fn new(
        registry: Arc<ModemRegistry>,
        jobs: Arc<dyn RecurringJobs>,
        config: BeatConfig,
    ) -> Result<(Self, mpsc::Receiver<BeatEvent>)> {
        config.validate()?;

        let (tx, rx) = mpsc::channel(config.event_channel_capacity);

        let beat = Self {
            registry,
            jobs,
            tick_secs: config.tick_secs,
            last_fired: Mutex::new(HashMap::new()),
            event_tx: tx,
        };

        Ok((beat, rx))
    }

    /// Run the beat until Ctrl-C
    pub async fn run(&self) -> Result<()> {
        self.run_with_shutdown(None).await
    }

    /// Run the beat until `shutdown_rx` fires (or Ctrl-C when `None`)
    ///
    /// A tick in progress finishes before the shutdown is handled.
    pub async fn run_with_shutdown(&self, shutdown_rx: Option<oneshot::Receiver<()>>) -> Result<()> {
        let schedules_count = self.jobs.list_schedules().await?.len();
        info!(
            "Rotation beat started: {} schedule(s), tick every {}s",
            schedules_count, self.tick_secs
        );
        self.emit_event(BeatEvent::Started { schedules_count });

        let shutdown = async move {
            match shutdown_rx {
                Some(rx) => {
                    let _ = rx.await;
                }
                None => {
                    if let Err(e) = tokio::signal::ctrl_c().await {
                        error!("Failed to listen for Ctrl-C: {}", e);
                    }
                }
            }
        };
        tokio::pin!(shutdown);

        let mut ticks = IntervalStream::new(tokio::time::interval(
            tokio::time::Duration::from_secs(self.tick_secs),
        ));

        loop {
            tokio::select! {
                Some(_) = ticks.next() => {
                    if let Err(e) = self.tick_at(Utc::now()).await {
                        error!("Rotation beat tick failed: {}", e);
                        // Keep ticking; the next pass re-reads the table
                    }
                }

                _ = &mut shutdown => {
                    info!("Shutdown signal received");
                    self.emit_event(BeatEvent::Stopped {
                        reason: "Shutdown signal".to_string(),
                    });
                    break;
                }
            }
        }

        self.registry.store().flush().await?;
        info!("Store flushed, rotation beat stopped");

        Ok(())
    }

    /// Fire every schedule that is due at `now`
    ///
    /// A failed rotation counts as a fire, so a schedule whose modem was
    /// deleted fails once per interval rather than once per tick.
    ///
    /// # Errors
    ///
    /// Only a failure to read the schedule table; rotation failures are
    /// reported as [`BeatEvent::RotationFailed`].
    pub async fn tick_at(&self, now: DateTime<Utc>) -> Result<TickSummary> {
        let schedules = self.jobs.list_schedules().await?;

        let due: Vec<ScheduledRotation> = {
            let mut last_fired = self.last_fired.lock().await;
            last_fired.retain(|key, _| schedules.iter().any(|s| &s.key == key));
            schedules
                .into_iter()
                .filter(|s| is_due(s, last_fired.get(&s.key).copied(), now))
                .collect()
        };

        let mut summary = TickSummary {
            due: due.len(),
            ..TickSummary::default()
        };
        if due.is_empty() {
            debug!("No rotation schedules due");
            return Ok(summary);
        }

        for schedule in due {
            self.last_fired
                .lock()
                .await
                .insert(schedule.key.clone(), now);

            match self.registry.rotate_one(schedule.modem_id).await {
                Ok(modem) => {
                    summary.fired += 1;
                    self.emit_event(BeatEvent::RotationFired {
                        key: schedule.key,
                        modem_id: modem.id,
                        public_ip: modem.public_ip,
                    });
                }
                Err(e) => {
                    summary.failed += 1;
                    warn!("Scheduled rotation {} failed: {}", schedule.key, e);
                    self.emit_event(BeatEvent::RotationFailed {
                        key: schedule.key,
                        modem_id: schedule.modem_id,
                        error: e.to_string(),
                    });
                }
            }
        }

        Ok(summary)
    }

    /// Emit a beat event
    fn emit_event(&self, event: BeatEvent) {
        if self.event_tx.try_send(event).is_err() {
            warn!("Beat event channel full, dropping event. Consider increasing event_channel_capacity.");
        }
    }
}

fn is_due(schedule: &ScheduledRotation, last_fired: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let reference = match last_fired {
        Some(fired) if fired > schedule.updated_at => fired,
        _ => schedule.updated_at,
    };
    now.signed_duration_since(reference) >= schedule.interval()
}
