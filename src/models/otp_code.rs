//! OTP record - one-time passcode pending verification.

use chrono::{DateTime, Duration, Utc};

/// Stored verification state for one identifier.
///
/// Only the SHA-256 digest of the code is kept; the clear-text code exists
/// solely in the notification sent to the user. At most one live record per
/// identifier: reissuing overwrites.
#[derive(Debug, Clone)]
pub struct OtpRecord {
    pub code_hash: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl OtpRecord {
    pub fn new(code_hash: String, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            code_hash,
            expires_at: now + ttl,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}
