//! Synthetic network identifier generation
//!
//! Addresses are never fetched from real devices; they are drawn from
//! `rand` with no seeding requirement. Not suitable for anything
//! security-sensitive.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// The three identifiers a rotation moves together
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct IdentifierTriple {
    pub public_ip: String,
    pub ipv4: String,
    pub ipv6: String,
}

impl IdentifierTriple {
    /// Draw a fresh triple from the thread-local generator
    pub fn generate() -> Self {
        Self::generate_with(&mut rand::thread_rng())
    }

    /// Draw a fresh triple from the given generator
    pub fn generate_with<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self {
            public_ip: generate_public_ip_with(rng),
            ipv4: generate_ipv4_with(rng),
            ipv6: generate_ipv6_with(rng),
        }
    }
}

/// Random dotted-quad with every octet in 1..=255
pub fn generate_ipv4() -> String {
    generate_ipv4_with(&mut rand::thread_rng())
}

/// Random public address; same distribution as [`generate_ipv4`] today
pub fn generate_public_ip() -> String {
    generate_public_ip_with(&mut rand::thread_rng())
}

/// Random uncompressed IPv6 address, 8 groups of 4 lowercase hex digits
pub fn generate_ipv6() -> String {
    generate_ipv6_with(&mut rand::thread_rng())
}

pub fn generate_ipv4_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    dotted_quad(rng)
}

pub fn generate_public_ip_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    dotted_quad(rng)
}

pub fn generate_ipv6_with<R: Rng + ?Sized>(rng: &mut R) -> String {
    (0..8)
        .map(|_| format!("{:04x}", rng.gen_range(0..=u16::MAX)))
        .collect::<Vec<_>>()
        .join(":")
}

// Octet 0 is never produced.
fn dotted_quad<R: Rng + ?Sized>(rng: &mut R) -> String {
    let octets: [u8; 4] = [
        rng.gen_range(1..=255),
        rng.gen_range(1..=255),
        rng.gen_range(1..=255),
        rng.gen_range(1..=255),
    ];
    format!("{}.{}.{}.{}", octets[0], octets[1], octets[2], octets[3])
}
