//! Test doubles and common utilities for contract tests
//!
//! The fleet fixture mirrors the demo fleet: three modems with known,
//! distinct identifier triples.

#![allow(dead_code)]

use modem_core::error::{Error, Result};
use modem_core::identifiers::IdentifierTriple;
use modem_core::model::{Modem, ModemId, NewModem};
use modem_core::seed::demo_fleet;
use modem_core::store::MemoryFleetStore;
use modem_core::traits::{
    ModemStore, ModemTransaction, RecurringJobs, ScheduleHandle, ScheduleKey, ScheduledRotation,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// Memory store holding the three demo modems (ids 1, 2, 3)
pub async fn seeded_store() -> Arc<MemoryFleetStore> {
    let store = Arc::new(MemoryFleetStore::new());
    for modem in demo_fleet() {
        store.insert(modem).await.unwrap();
    }
    store
}

/// Memory store holding the first `count` demo modems
pub async fn store_with(count: usize) -> Arc<MemoryFleetStore> {
    let store = Arc::new(MemoryFleetStore::new());
    for modem in demo_fleet().into_iter().take(count) {
        store.insert(modem).await.unwrap();
    }
    store
}

/// A modem with the given public IP, otherwise copied from the first demo modem
pub fn modem_with_public_ip(public_ip: &str) -> NewModem {
    let mut modem = demo_fleet().remove(0);
    modem.public_ip = public_ip.to_string();
    modem
}

/// Sorted identifier triples of a listing
pub fn sorted_triples(modems: &[Modem]) -> Vec<IdentifierTriple> {
    let mut triples: Vec<IdentifierTriple> = modems.iter().map(Modem::identifiers).collect();
    triples.sort();
    triples
}

/// Ids of a listing, in listing order
pub fn ids(modems: &[Modem]) -> Vec<ModemId> {
    modems.iter().map(|m| m.id).collect()
}

/// A store wrapper that counts calls and can abort every commit
pub struct InstrumentedStore {
    inner: Arc<MemoryFleetStore>,
    fail_commits: AtomicBool,
    flush_call_count: AtomicUsize,
    upsert_call_count: AtomicUsize,
}

impl InstrumentedStore {
    pub fn new(inner: Arc<MemoryFleetStore>) -> Self {
        Self {
            inner,
            fail_commits: AtomicBool::new(false),
            flush_call_count: AtomicUsize::new(0),
            upsert_call_count: AtomicUsize::new(0),
        }
    }

    /// Make every later commit fail with a store error
    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }

    /// Get the number of times flush() was called
    pub fn flush_call_count(&self) -> usize {
        self.flush_call_count.load(Ordering::SeqCst)
    }

    /// Get the number of times upsert_schedule() was called
    pub fn upsert_call_count(&self) -> usize {
        self.upsert_call_count.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl ModemStore for InstrumentedStore {
    async fn get(&self, id: ModemId) -> Result<Option<Modem>> {
        self.inner.get(id).await
    }

    async fn list_all(&self) -> Result<Vec<Modem>> {
        self.inner.list_all().await
    }

    async fn insert(&self, modem: NewModem) -> Result<Modem> {
        self.inner.insert(modem).await
    }

    async fn update(&self, modem: &Modem) -> Result<()> {
        self.inner.update(modem).await
    }

    async fn delete(&self, id: ModemId) -> Result<()> {
        self.inner.delete(id).await
    }

    async fn begin(&self) -> Result<Box<dyn ModemTransaction>> {
        let inner = self.inner.begin().await?;
        if self.fail_commits.load(Ordering::SeqCst) {
            return Ok(Box::new(AbortingTransaction { inner }));
        }
        Ok(inner)
    }

    async fn flush(&self) -> Result<()> {
        self.flush_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner.flush().await
    }
}

#[async_trait::async_trait]
impl RecurringJobs for InstrumentedStore {
    async fn get_schedule(&self, key: &ScheduleKey) -> Result<Option<ScheduledRotation>> {
        self.inner.get_schedule(key).await
    }

    async fn upsert_schedule(
        &self,
        key: &ScheduleKey,
        modem_id: ModemId,
        interval_minutes: u32,
    ) -> Result<ScheduleHandle> {
        self.upsert_call_count.fetch_add(1, Ordering::SeqCst);
        self.inner
            .upsert_schedule(key, modem_id, interval_minutes)
            .await
    }

    async fn list_schedules(&self) -> Result<Vec<ScheduledRotation>> {
        self.inner.list_schedules().await
    }

    async fn interval_definitions(&self) -> Result<Vec<u32>> {
        self.inner.interval_definitions().await
    }

    async fn delete_all_schedules(&self) -> Result<()> {
        self.inner.delete_all_schedules().await
    }
}

/// Transaction that stages normally but refuses to commit
struct AbortingTransaction {
    inner: Box<dyn ModemTransaction>,
}

#[async_trait::async_trait]
impl ModemTransaction for AbortingTransaction {
    async fn get(&mut self, id: ModemId) -> Result<Option<Modem>> {
        self.inner.get(id).await
    }

    async fn list_all(&mut self) -> Result<Vec<Modem>> {
        self.inner.list_all().await
    }

    async fn update(&mut self, modem: &Modem) -> Result<()> {
        self.inner.update(modem).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        // Inner transaction is dropped uncommitted
        Err(Error::state_store("transaction aborted"))
    }
}
