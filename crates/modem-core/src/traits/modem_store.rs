// # Modem Store Trait
//
// Defines the data store the rotation core consumes.
//
// ## Purpose
//
// The store owns the canonical set of modem records. The core only needs to
// read modems, update them, and group several updates into one transaction
// so a bulk rotation is never observed half-applied.
//
// ## Implementations
//
// - In-memory: `MemoryFleetStore`
// - File-based: `FileFleetStore` (JSON, atomic writes)
//
// ## Usage
//
// ```rust,ignore
// use modem_core::ModemStore;
//
// let mut tx = store.begin().await?;
// for mut modem in tx.list_all().await? {
//     modem.phone_number.clear();
//     tx.update(&modem).await?;
// }
// tx.commit().await?;
// ```

use async_trait::async_trait;

use crate::model::{Modem, ModemId, NewModem};

/// Trait for modem data store implementations
///
/// Implementations must be thread-safe and usable across async tasks.
///
/// # Ordering
///
/// `list_all()` returns modems ordered by id, both on the store and inside
/// a transaction.
///
/// # Transactions
///
/// [`ModemStore::begin`] opens a transaction with serialized isolation:
/// while it is open, no other reader or writer observes its staged updates,
/// and `commit()` publishes all of them or none. Dropping a transaction
/// without committing discards its updates.
#[async_trait]
pub trait ModemStore: Send + Sync {
    /// Get a modem by id
    ///
    /// # Returns
    ///
    /// - `Ok(Some(Modem))`: The modem
    /// - `Ok(None)`: No such modem
    /// - `Err(Error)`: Storage error
    async fn get(&self, id: ModemId) -> Result<Option<Modem>, crate::Error>;

    /// List every modem, ordered by id
    async fn list_all(&self) -> Result<Vec<Modem>, crate::Error>;

    /// Insert a new modem and assign its id
    async fn insert(&self, modem: NewModem) -> Result<Modem, crate::Error>;

    /// Overwrite an existing modem
    ///
    /// Fails with `NotFound` if the id is unknown.
    async fn update(&self, modem: &Modem) -> Result<(), crate::Error>;

    /// Delete a modem (no-op if it does not exist)
    async fn delete(&self, id: ModemId) -> Result<(), crate::Error>;

    /// Open a transaction
    async fn begin(&self) -> Result<Box<dyn ModemTransaction>, crate::Error>;

    /// Persist any pending changes
    async fn flush(&self) -> Result<(), crate::Error>;
}

/// An open store transaction
///
/// Reads inside the transaction see its own staged updates.
#[async_trait]
pub trait ModemTransaction: Send {
    /// Get a modem by id
    async fn get(&mut self, id: ModemId) -> Result<Option<Modem>, crate::Error>;

    /// List every modem, ordered by id
    async fn list_all(&mut self) -> Result<Vec<Modem>, crate::Error>;

    /// Stage an update
    ///
    /// Fails with `NotFound` if the id is unknown.
    async fn update(&mut self, modem: &Modem) -> Result<(), crate::Error>;

    /// Publish every staged update atomically
    async fn commit(self: Box<Self>) -> Result<(), crate::Error>;
}
