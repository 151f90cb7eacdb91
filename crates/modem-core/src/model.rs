//! Domain records for the modem fleet
//!
//! [`Modem`] is the unit every rotation operates on; [`Sms`] records hang off
//! a modem and are only ever read by the core.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::identifiers::IdentifierTriple;

/// Maximum length of a phone number field
pub const MAX_PHONE_NUMBER_LEN: usize = 15;

/// Store-assigned modem identity
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ModemId(pub u64);

impl fmt::Display for ModemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ModemId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        s.trim()
            .parse::<u64>()
            .map(ModemId)
            .map_err(|_| Error::invalid_input(format!("Invalid modem id: '{}'", s)))
    }
}

impl From<u64> for ModemId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

/// Hardware model of a modem
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ModemModel {
    #[serde(rename = "USB")]
    Usb,
    #[serde(rename = "Android")]
    Android,
    #[serde(rename = "iPhone")]
    IPhone,
}

/// Mobile carrier a modem is attached to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Carrier {
    #[serde(rename = "AT&T")]
    Att,
    #[serde(rename = "Verizon")]
    Verizon,
    #[serde(rename = "T-Mobile")]
    TMobile,
}

/// A modem and its current network identifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Modem {
    pub id: ModemId,
    pub model: ModemModel,
    pub carrier: Carrier,
    pub public_ip: String,
    pub ipv4: String,
    pub ipv6: String,
    pub phone_number: String,
}

impl Modem {
    /// The identifier triple currently held by this modem
    pub fn identifiers(&self) -> IdentifierTriple {
        IdentifierTriple {
            public_ip: self.public_ip.clone(),
            ipv4: self.ipv4.clone(),
            ipv6: self.ipv6.clone(),
        }
    }

    /// Replace all three identifier fields at once
    pub fn assign_identifiers(&mut self, triple: IdentifierTriple) {
        self.public_ip = triple.public_ip;
        self.ipv4 = triple.ipv4;
        self.ipv6 = triple.ipv6;
    }
}

/// A modem that has not been given an id by the store yet
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewModem {
    pub model: ModemModel,
    pub carrier: Carrier,
    pub public_ip: String,
    pub ipv4: String,
    pub ipv6: String,
    pub phone_number: String,
}

impl NewModem {
    /// Check address syntax and phone number length
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [("public_ip", &self.public_ip), ("ipv4", &self.ipv4)] {
            if value.parse::<Ipv4Addr>().is_err() {
                return Err(Error::invalid_input(format!(
                    "{} is not a valid IPv4 address: '{}'",
                    field, value
                )));
            }
        }

        if self.ipv6.parse::<Ipv6Addr>().is_err() {
            return Err(Error::invalid_input(format!(
                "ipv6 is not a valid IPv6 address: '{}'",
                self.ipv6
            )));
        }

        validate_phone_number(&self.phone_number)
    }

    /// Attach the store-assigned id
    pub fn into_modem(self, id: ModemId) -> Modem {
        Modem {
            id,
            model: self.model,
            carrier: self.carrier,
            public_ip: self.public_ip,
            ipv4: self.ipv4,
            ipv6: self.ipv6,
            phone_number: self.phone_number,
        }
    }
}

/// An SMS message received by a modem
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sms {
    pub id: u64,
    pub modem_id: ModemId,
    pub date: chrono::DateTime<chrono::Utc>,
    pub phone_number: String,
    pub content: String,
    pub timestamp: f64,
}

/// An SMS message that has not been stored yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewSms {
    pub modem_id: ModemId,
    pub date: chrono::DateTime<chrono::Utc>,
    pub phone_number: String,
    pub content: String,
    pub timestamp: f64,
}

impl NewSms {
    pub fn validate(&self) -> Result<()> {
        validate_phone_number(&self.phone_number)
    }

    pub fn into_sms(self, id: u64) -> Sms {
        Sms {
            id,
            modem_id: self.modem_id,
            date: self.date,
            phone_number: self.phone_number,
            content: self.content,
            timestamp: self.timestamp,
        }
    }
}

fn validate_phone_number(phone_number: &str) -> Result<()> {
    if phone_number.chars().count() > MAX_PHONE_NUMBER_LEN {
        return Err(Error::invalid_input(format!(
            "Phone number longer than {} characters: '{}'",
            MAX_PHONE_NUMBER_LEN, phone_number
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn usb_modem() -> NewModem {
        NewModem {
            model: ModemModel::Usb,
            carrier: Carrier::Att,
            public_ip: "192.168.1.1".to_string(),
            ipv4: "192.168.1.10".to_string(),
            ipv6: "2001:0db8:85a3:0000:0000:8a2e:0370:7334".to_string(),
            phone_number: "1234".to_string(),
        }
    }

    #[test]
    fn test_new_modem_validation() {
        assert!(usb_modem().validate().is_ok());

        let mut bad_ipv4 = usb_modem();
        bad_ipv4.ipv4 = "300.1.1.1".to_string();
        assert!(matches!(bad_ipv4.validate(), Err(Error::InvalidInput(_))));

        let mut bad_ipv6 = usb_modem();
        bad_ipv6.ipv6 = "not-an-address".to_string();
        assert!(matches!(bad_ipv6.validate(), Err(Error::InvalidInput(_))));

        let mut long_phone = usb_modem();
        long_phone.phone_number = "1234567890123456".to_string();
        assert!(matches!(long_phone.validate(), Err(Error::InvalidInput(_))));
    }

    #[test]
    fn test_enum_wire_names() {
        assert_eq!(serde_json::to_string(&Carrier::Att).unwrap(), "\"AT&T\"");
        assert_eq!(serde_json::to_string(&Carrier::TMobile).unwrap(), "\"T-Mobile\"");
        assert_eq!(serde_json::to_string(&ModemModel::IPhone).unwrap(), "\"iPhone\"");
        let model: ModemModel = serde_json::from_str("\"USB\"").unwrap();
        assert_eq!(model, ModemModel::Usb);
    }

    #[test]
    fn test_modem_id_parse() {
        assert_eq!(" 42 ".parse::<ModemId>().unwrap(), ModemId(42));
        assert!("abc".parse::<ModemId>().is_err());
    }

    #[test]
    fn test_assign_identifiers() {
        let mut modem = usb_modem().into_modem(ModemId(1));
        let triple = IdentifierTriple {
            public_ip: "10.0.0.1".to_string(),
            ipv4: "10.0.0.2".to_string(),
            ipv6: "0001:0002:0003:0004:0005:0006:0007:0008".to_string(),
        };

        modem.assign_identifiers(triple.clone());
        assert_eq!(modem.identifiers(), triple);
        assert_eq!(modem.phone_number, "1234");
    }
}
