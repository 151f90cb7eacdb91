//! Modem registry: identifier rotation
//!
//! Two ways to rotate:
//!
//! - [`ModemRegistry::rotate_one`] gives one modem a freshly generated
//!   identifier triple.
//! - [`ModemRegistry::rotate_all`] mints nothing. It shuffles the triples
//!   already in use and hands them back out, so the set of triples in use
//!   is the same before and after.
//!
//! Both run inside a single store transaction.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use modem_core::registry::ModemRegistry;
//!
//! let registry = ModemRegistry::new(store);
//! let modem = registry.rotate_one(ModemId(1)).await?;
//! let report = registry.rotate_all().await?;
//! ```

use rand::seq::SliceRandom;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::identifiers::IdentifierTriple;
use crate::model::{Modem, ModemId, NewModem};
use crate::traits::ModemStore;

/// Outcome of [`ModemRegistry::rotate_all`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RotateAllReport {
    /// Modems in the snapshot
    pub modems: usize,
    /// Modems whose triple was reassigned (0 when the fleet has fewer than 2)
    pub rotated: usize,
}

/// Owner of the rotation operations over a [`ModemStore`]
pub struct ModemRegistry {
    store: Arc<dyn ModemStore>,
}

impl ModemRegistry {
    pub fn new(store: Arc<dyn ModemStore>) -> Self {
        Self { store }
    }

    /// The underlying store
    pub fn store(&self) -> &Arc<dyn ModemStore> {
        &self.store
    }

    /// All modems, ordered by id
    pub async fn list(&self) -> Result<Vec<Modem>> {
        self.store.list_all().await
    }

    /// Validate and insert a new modem
    pub async fn provision(&self, modem: NewModem) -> Result<Modem> {
        modem.validate()?;
        let modem = self.store.insert(modem).await?;
        info!("Provisioned modem {} ({:?}, {:?})", modem.id, modem.model, modem.carrier);
        Ok(modem)
    }

    /// Give one modem a freshly generated identifier triple
    ///
    /// # Errors
    ///
    /// - `NotFound` if no modem has this id
    /// - `StateStore` if the store fails; nothing is changed then
    pub async fn rotate_one(&self, modem_id: ModemId) -> Result<Modem> {
        let mut tx = self.store.begin().await?;

        let mut modem = tx
            .get(modem_id)
            .await?
            .ok_or_else(|| Error::not_found(format!("Modem {}", modem_id)))?;

        modem.assign_identifiers(IdentifierTriple::generate());
        tx.update(&modem).await?;
        tx.commit().await?;

        info!("Rotated modem {} -> public_ip {}", modem.id, modem.public_ip);
        Ok(modem)
    }

    /// Redistribute the identifier triples in use across the whole fleet
    ///
    /// Each modem, in id order, takes the triple of its partner in a random
    /// permutation of the fleet. A fleet of 0 or 1 modems is left untouched.
    ///
    /// # Errors
    ///
    /// - `StateStore` if the store fails; no modem is changed then
    pub async fn rotate_all(&self) -> Result<RotateAllReport> {
        let mut tx = self.store.begin().await?;
        let snapshot = tx.list_all().await?;

        if snapshot.len() < 2 {
            debug!("Fleet has {} modem(s), nothing to rotate", snapshot.len());
            return Ok(RotateAllReport {
                modems: snapshot.len(),
                rotated: 0,
            });
        }

        let reassigned = shuffle_identifiers(snapshot);
        let rotated = reassigned.len();
        for modem in &reassigned {
            tx.update(modem).await?;
        }
        tx.commit().await?;

        info!("Rotated identifiers across {} modems", rotated);
        Ok(RotateAllReport {
            modems: rotated,
            rotated,
        })
    }
}

/// Pair each modem with an entry of a shuffled copy and take its triple
fn shuffle_identifiers(snapshot: Vec<Modem>) -> Vec<Modem> {
    let mut donors: Vec<IdentifierTriple> = snapshot.iter().map(Modem::identifiers).collect();
    donors.shuffle(&mut rand::thread_rng());

    snapshot
        .into_iter()
        .zip(donors)
        .map(|(mut modem, triple)| {
            modem.assign_identifiers(triple);
            modem
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::seed::demo_fleet;
    use crate::store::MemoryFleetStore;

    async fn registry_with(count: usize) -> ModemRegistry {
        let store = Arc::new(MemoryFleetStore::new());
        let registry = ModemRegistry::new(store);
        for modem in demo_fleet().into_iter().take(count) {
            registry.provision(modem).await.unwrap();
        }
        registry
    }

    #[test]
    fn test_shuffle_keeps_ids_and_triples() {
        let modems: Vec<Modem> = demo_fleet()
            .into_iter()
            .enumerate()
            .map(|(i, m)| m.into_modem(ModemId(i as u64 + 1)))
            .collect();

        let shuffled = shuffle_identifiers(modems.clone());

        let ids: Vec<ModemId> = shuffled.iter().map(|m| m.id).collect();
        assert_eq!(ids, vec![ModemId(1), ModemId(2), ModemId(3)]);

        let mut before: Vec<IdentifierTriple> = modems.iter().map(Modem::identifiers).collect();
        let mut after: Vec<IdentifierTriple> = shuffled.iter().map(Modem::identifiers).collect();
        before.sort();
        after.sort();
        assert_eq!(before, after);

        // Only identifiers move
        for (old, new) in modems.iter().zip(&shuffled) {
            assert_eq!(old.model, new.model);
            assert_eq!(old.phone_number, new.phone_number);
        }
    }

    #[tokio::test]
    async fn test_rotate_one_unknown_modem() {
        let registry = registry_with(3).await;
        let err = registry.rotate_one(ModemId(999)).await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_rotate_all_single_modem_is_noop() {
        let registry = registry_with(1).await;
        let before = registry.list().await.unwrap();

        let report = registry.rotate_all().await.unwrap();
        assert_eq!(report, RotateAllReport { modems: 1, rotated: 0 });
        assert_eq!(registry.list().await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_provision_rejects_invalid_modem() {
        let registry = registry_with(0).await;
        let mut modem = demo_fleet().remove(0);
        modem.public_ip = "999.0.0.1".to_string();

        assert!(matches!(
            registry.provision(modem).await,
            Err(Error::InvalidInput(_))
        ));
        assert!(registry.list().await.unwrap().is_empty());
    }
}
