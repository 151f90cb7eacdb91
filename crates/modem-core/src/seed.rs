//! Demo fleet provisioning
//!
//! Three modems, one per model and carrier, each with a few example
//! messages. Used by `modemd` when `seed_fleet` is on and by tests.

use tracing::info;

use crate::error::Result;
use crate::model::{Carrier, ModemModel, NewModem, NewSms};
use crate::traits::{ModemStore, SmsStore};

const MESSAGES_PER_MODEM: usize = 3;

/// The demo modems, in provisioning order
pub fn demo_fleet() -> Vec<NewModem> {
    vec![
        NewModem {
            model: ModemModel::Usb,
            carrier: Carrier::Att,
            public_ip: "192.168.1.1".to_string(),
            ipv4: "192.168.1.10".to_string(),
            ipv6: "dc11:cd63:bb56:3e09:2ffc:b498:98b1:336c".to_string(),
            phone_number: "1234".to_string(),
        },
        NewModem {
            model: ModemModel::Android,
            carrier: Carrier::Verizon,
            public_ip: "192.168.1.2".to_string(),
            ipv4: "192.168.1.11".to_string(),
            ipv6: "dc11:cd63:bb56:3e09:2ffc:b498:98b1:336d".to_string(),
            phone_number: "5678".to_string(),
        },
        NewModem {
            model: ModemModel::IPhone,
            carrier: Carrier::TMobile,
            public_ip: "192.168.1.3".to_string(),
            ipv4: "192.168.1.12".to_string(),
            ipv6: "dc11:cd63:bb56:3e09:2ffc:b498:98b1:336e".to_string(),
            phone_number: "9101".to_string(),
        },
    ]
}

/// Provision the demo fleet if the store has no modems
///
/// Returns the number of modems created (0 when the store was not empty).
pub async fn seed_demo_fleet<S>(store: &S) -> Result<usize>
where
    S: ModemStore + SmsStore + ?Sized,
{
    if !store.list_all().await?.is_empty() {
        info!("Store already holds modems, skipping demo seed");
        return Ok(0);
    }

    let fleet = demo_fleet();
    let count = fleet.len();
    for new_modem in fleet {
        let modem = store.insert(new_modem).await?;
        for _ in 0..MESSAGES_PER_MODEM {
            store
                .insert_sms(NewSms {
                    modem_id: modem.id,
                    date: chrono::Utc::now(),
                    phone_number: "XXXXXXXXX".to_string(),
                    content: "Example API message".to_string(),
                    timestamp: 1675484514.0,
                })
                .await?;
        }
    }

    info!("Seeded demo fleet: {} modems", count);
    Ok(count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryFleetStore;

    #[test]
    fn test_demo_fleet_is_valid() {
        for modem in demo_fleet() {
            modem.validate().unwrap();
        }
    }

    #[tokio::test]
    async fn test_seed_only_runs_on_empty_store() {
        let store = MemoryFleetStore::new();

        assert_eq!(seed_demo_fleet(&store).await.unwrap(), 3);
        assert_eq!(store.list_sms(None).await.unwrap().len(), 9);

        assert_eq!(seed_demo_fleet(&store).await.unwrap(), 0);
        assert_eq!(store.list_all().await.unwrap().len(), 3);
    }
}
