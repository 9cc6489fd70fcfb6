//! In-process loopback implementations of every service trait.
//!
//! These behave like the hosted providers closely enough to drive the
//! coordinator end to end: ids are random, lobbies fill up, join codes
//! resolve, heartbeats are counted. Each one has an offline switch so
//! tests can make the next call fail with
//! [`ServiceError::Unavailable`](crate::ServiceError::Unavailable).
//!
//! They are not a lobby provider. There is no persistence, no rate
//! limiting, and no inactivity purge.

mod identity;
mod lobby;
mod network;
mod relay;

pub use identity::MemoryIdentityService;
pub use lobby::MemoryLobbyService;
pub use network::LoopbackNetwork;
pub use relay::MemoryRelayService;

use std::sync::atomic::{AtomicBool, Ordering};

use rand::Rng;

use crate::ServiceError;

/// Offline switch shared by the loopback services.
#[derive(Debug, Default)]
struct Outage {
    offline: AtomicBool,
}

impl Outage {
    fn set(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn check(&self, service: &str) -> Result<(), ServiceError> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(ServiceError::Unavailable(format!("{service} is offline")));
        }
        Ok(())
    }
}

/// Random lowercase hex string of `bytes * 2` characters.
fn random_hex(bytes: usize) -> String {
    let mut rng = rand::rng();
    (0..bytes)
        .map(|_| format!("{:02x}", rng.random::<u8>()))
        .collect()
}

/// Random uppercase alphanumeric code, the shape relay join codes take.
fn random_code(len: usize) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    let mut rng = rand::rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_hex_length_and_charset() {
        let s = random_hex(8);
        assert_eq!(s.len(), 16);
        assert!(s.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_random_code_is_uppercase_alnum() {
        let code = random_code(6);
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit()));
    }

    #[test]
    fn test_outage_switch() {
        let outage = Outage::default();
        assert!(outage.check("lobby").is_ok());
        outage.set(true);
        assert!(matches!(outage.check("lobby"), Err(ServiceError::Unavailable(_))));
        outage.set(false);
        assert!(outage.check("lobby").is_ok());
    }
}
