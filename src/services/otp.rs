//! OTP issuance and verification.

use async_trait::async_trait;
use chrono::Duration;
use dashmap::DashMap;
use rand::Rng;
use sha2::{Digest, Sha256};

use crate::error::AuthError;
use crate::models::OtpRecord;

/// Generate a random 6-digit numeric code (100000-999999).
pub fn generate_code() -> String {
    let mut rng = rand::thread_rng();
    rng.gen_range(100_000..=999_999).to_string()
}

/// Hash a code for storage.
fn hash_code(code: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(code.as_bytes());
    hex::encode(hasher.finalize())
}

/// Time-bounded one-time-code store keyed by identifier (email).
///
/// The in-memory implementation is the default; a deployment can substitute
/// an external time-bounded cache behind the same trait.
#[async_trait]
pub trait OtpStore: Send + Sync {
    /// Insert or overwrite the record for `identifier`.
    async fn issue(&self, identifier: &str, code: &str, ttl: Duration) -> Result<(), AuthError>;

    /// Check `submitted` against the live record for `identifier`.
    ///
    /// Fails `OtpNotFound` when no record exists, `OtpExpired` when the TTL
    /// has elapsed (the record is removed), `OtpMismatch` when the codes
    /// differ (the record is retained so the user may retry until expiry).
    /// A successful match consumes the record.
    async fn verify(&self, identifier: &str, submitted: &str) -> Result<(), AuthError>;
}

#[derive(Default)]
pub struct InMemoryOtpStore {
    codes: DashMap<String, OtpRecord>,
}

impl InMemoryOtpStore {
    pub fn new() -> Self {
        Self {
            codes: DashMap::new(),
        }
    }
}

#[async_trait]
impl OtpStore for InMemoryOtpStore {
    async fn issue(&self, identifier: &str, code: &str, ttl: Duration) -> Result<(), AuthError> {
        self.codes
            .insert(identifier.to_string(), OtpRecord::new(hash_code(code), ttl));
        Ok(())
    }

    async fn verify(&self, identifier: &str, submitted: &str) -> Result<(), AuthError> {
        let record = match self.codes.get(identifier) {
            Some(record) => record.clone(),
            None => return Err(AuthError::OtpNotFound),
        };

        // Expiry is enforced lazily, here only.
        if record.is_expired() {
            self.codes.remove(identifier);
            return Err(AuthError::OtpExpired);
        }

        if hash_code(submitted) != record.code_hash {
            return Err(AuthError::OtpMismatch);
        }

        // Conditional removal makes the consume atomic: of two racing
        // verifications with the correct code, exactly one gets the record.
        self.codes
            .remove_if(identifier, |_, live| live.code_hash == record.code_hash)
            .map(|_| ())
            .ok_or(AuthError::OtpNotFound)
    }
}
