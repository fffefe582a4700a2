//! One-time codes for the password-reset flow.
//!
//! Entries expire after a fixed TTL and the store is capacity-bounded:
//! when full, the least recently issued or checked email is evicted.

use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;
use parking_lot::Mutex;
use serde::Serialize;
use tracing::debug;

use crate::core::config::CoachConfig;

struct OtpEntry {
    code: String,
    expires_at: Instant,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpVerdict {
    Valid,
    Mismatch,
    Expired,
    Missing,
}


pub struct OtpStore {
    entries: Mutex<LruCache<String, OtpEntry>>,
    ttl: Duration,
}

impl OtpStore {
    pub fn new(capacity: usize, ttl_secs: u64) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            entries: Mutex::new(LruCache::new(capacity)),
            ttl: Duration::from_secs(ttl_secs),
        }
    }


    pub fn from_config(config: &CoachConfig) -> Self {
        Self::new(config.otp_capacity, config.otp_ttl_secs)
    }

    /// Replaces any outstanding code for the same email.
    pub fn issue(&self, email: &str, code: &str) {
        self.issue_at(email, code, Instant::now());
    }

    fn issue_at(&self, email: &str, code: &str, now: Instant) {
        let entry = OtpEntry {
            code: code.to_string(),
            expires_at: now + self.ttl,
        };
        self.entries.lock().put(normalize(email), entry);
        debug!("OTP issued for {}", email);
    }

    /// A valid code is consumed; an expired one is dropped.
    pub fn verify(&self, email: &str, code: &str) -> OtpVerdict {
        self.verify_at(email, code, Instant::now())
    }

    fn verify_at(&self, email: &str, code: &str, now: Instant) -> OtpVerdict {
        let key = normalize(email);
        let mut entries = self.entries.lock();

        let verdict = match entries.peek(&key) {
            None => return OtpVerdict::Missing,
            Some(entry) if now >= entry.expires_at => OtpVerdict::Expired,
            Some(entry) if entry.code == code => OtpVerdict::Valid,
            Some(_) => OtpVerdict::Mismatch,
        };

        if verdict != OtpVerdict::Mismatch {
            entries.pop(&key);
        }
        verdict
    }


    pub fn purge_expired(&self) -> usize {
        self.purge_expired_at(Instant::now())
    }

    fn purge_expired_at(&self, now: Instant) -> usize {
        let mut entries = self.entries.lock();
        let expired: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| now >= entry.expires_at)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &expired {
            entries.pop(key);
        }
        expired.len()
    }


    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }


    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn normalize(email: &str) -> String {
    email.trim().to_lowercase()
}
