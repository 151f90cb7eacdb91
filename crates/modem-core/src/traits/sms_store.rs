// # SMS and Settings Store Traits
//
// Read-mostly collaborators: SMS records attached to modems, and the
// singleton feature settings row.

use async_trait::async_trait;

use crate::model::{ModemId, NewSms, Sms};
use crate::settings::FeatureSettings;

/// Trait for SMS record storage
#[async_trait]
pub trait SmsStore: Send + Sync {
    /// Store a message and assign its id
    async fn insert_sms(&self, sms: NewSms) -> Result<Sms, crate::Error>;

    /// List messages, optionally restricted to one modem, ordered by id
    async fn list_sms(&self, modem_id: Option<ModemId>) -> Result<Vec<Sms>, crate::Error>;
}

/// Trait for the feature settings singleton
#[async_trait]
pub trait SettingsStore: Send + Sync {
    /// The stored settings, if a row exists
    async fn feature_settings(&self) -> Result<Option<FeatureSettings>, crate::Error>;

    /// Create or overwrite the settings row
    async fn save_feature_settings(&self, settings: &FeatureSettings)
    -> Result<(), crate::Error>;
}
