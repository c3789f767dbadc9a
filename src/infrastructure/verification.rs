//! In-process expiring stores for verification codes and OTPs.
//!
//! Expiry is lazy: there is no background sweeper, every read checks
//! `expires_at` and removes an expired entry on the spot. Successful
//! consumption must call `delete` so a code can never be replayed.
//!
//! The stores are plain injected values (bundled in [`VerificationStores`]),
//! not process-wide globals, so tests and multi-instance setups can own
//! their own maps.

use std::collections::HashMap;
use std::hash::Hash;

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rand::Rng;
use tokio::sync::Mutex;

/// Generate a 6-digit zero-padded verification code.
pub fn generate_code() -> String {
    format!("{:06}", rand::thread_rng().gen_range(0..1_000_000u32))
}

struct Entry<V> {
    payload: V,
    expires_at: DateTime<Utc>,
}

/// Expiring key -> payload map.
pub struct VerificationStore<K, V> {
    entries: Mutex<HashMap<K, Entry<V>>>,
}

impl<K, V> Default for VerificationStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

impl<K, V> VerificationStore<K, V>
where
    K: Eq + Hash,
    V: Clone,
{
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Store `payload` under `key` with `expires_at = now + ttl`, overwriting
    /// any existing entry.
    pub async fn put(&self, key: K, payload: V, ttl: Duration) {
        let mut entries = self.entries.lock().await;
        entries.insert(
            key,
            Entry {
                payload,
                expires_at: Utc::now() + ttl,
            },
        );
    }

    /// Return the payload while it is still live. An expired entry is
    /// deleted and reported absent.
    pub async fn get(&self, key: &K) -> Option<V> {
        let mut entries = self.entries.lock().await;
        match entries.get(key) {
            Some(entry) if Utc::now() <= entry.expires_at => Some(entry.payload.clone()),
            Some(_) => {
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Remove the entry unconditionally. Returns whether one was present.
    pub async fn delete(&self, key: &K) -> bool {
        self.entries.lock().await.remove(key).is_some()
    }
}

/// Staged signup held until the email address is verified. Nothing is
/// persisted until `complete-signup` succeeds.
#[derive(Debug, Clone)]
pub struct PendingSignup {
    pub username: String,
    pub password: String,
    pub firstname: String,
    pub lastname: String,
    pub birthdate: NaiveDate,
    pub gender: String,
    pub mobile_number: String,
    pub code: String,
}

/// Password-reset OTP keyed by email, carrying the resolved user id.
#[derive(Debug, Clone)]
pub struct PasswordResetOtp {
    pub user_id: i64,
    pub code: String,
}

/// Email-change OTP keyed by user id, carrying the target address.
#[derive(Debug, Clone)]
pub struct EmailChangeOtp {
    pub new_email: String,
    pub code: String,
}

/// The three stores the account workflows need, injected as one capability.
#[derive(Default)]
pub struct VerificationStores {
    pub signup: VerificationStore<String, PendingSignup>,
    pub password_reset: VerificationStore<String, PasswordResetOtp>,
    pub email_change: VerificationStore<i64, EmailChangeOtp>,
}
