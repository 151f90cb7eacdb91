//! Read-only SMS lookups

use std::sync::Arc;

use crate::error::{Error, Result};
use crate::model::{Modem, ModemId, Sms};
use crate::traits::{ModemStore, SmsStore};

/// Queries over received messages and the modems that hold a phone number
pub struct SmsInbox {
    modems: Arc<dyn ModemStore>,
    sms: Arc<dyn SmsStore>,
}

impl SmsInbox {
    pub fn new(modems: Arc<dyn ModemStore>, sms: Arc<dyn SmsStore>) -> Self {
        Self { modems, sms }
    }

    /// Messages of one modem, or of the whole fleet when `modem_id` is `None`
    ///
    /// # Errors
    ///
    /// - `NotFound` if `modem_id` names no modem
    pub async fn messages(&self, modem_id: Option<ModemId>) -> Result<Vec<Sms>> {
        if let Some(id) = modem_id
            && self.modems.get(id).await?.is_none()
        {
            return Err(Error::not_found(format!("Modem {}", id)));
        }
        self.sms.list_sms(modem_id).await
    }

    /// Modems whose phone number is exactly `phone_number`
    ///
    /// # Errors
    ///
    /// - `NotFound` if the number is empty or held by no modem
    pub async fn modems_by_phone(&self, phone_number: &str) -> Result<Vec<Modem>> {
        let phone_number = phone_number.trim();
        if phone_number.is_empty() {
            return Err(Error::not_found("Phone number not found"));
        }

        let matches: Vec<Modem> = self
            .modems
            .list_all()
            .await?
            .into_iter()
            .filter(|modem| modem.phone_number == phone_number)
            .collect();

        if matches.is_empty() {
            return Err(Error::not_found("Phone number not found"));
        }
        Ok(matches)
    }
}
