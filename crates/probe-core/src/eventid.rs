//! Event key generation.

use chrono::Utc;
use sha2::{Digest, Sha256};
use std::sync::atomic::{AtomicU64, Ordering};

/// Width of an event key in hex characters.
pub const EVENT_KEY_LEN: usize = 20;

/// Produces unique keys for history records and evidence directories.
pub trait EventIdGenerator: Send + Sync {
    fn generate(&self, category: &str, name: &str) -> String;
}

/// SHA-256 over category, name, wall clock and a process-local counter.
#[derive(Debug, Default)]
pub struct Sha256EventIds {
    counter: AtomicU64,
}

impl Sha256EventIds {
    pub fn new() -> Self {
        Self::default()
    }
}

impl EventIdGenerator for Sha256EventIds {
    fn generate(&self, category: &str, name: &str) -> String {
        let seq = self.counter.fetch_add(1, Ordering::Relaxed);
        let nanos = Utc::now().timestamp_nanos_opt().unwrap_or_default();

        let mut hasher = Sha256::new();
        hasher.update(category.as_bytes());
        hasher.update(name.as_bytes());
        hasher.update(nanos.to_le_bytes());
        hasher.update(seq.to_le_bytes());

        let mut key = hex::encode(hasher.finalize());
        key.truncate(EVENT_KEY_LEN);
        key
    }
}
