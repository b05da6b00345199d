use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use hourglass_rs::SafeTimeProvider;
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::config::VerificationConfig;
use crate::errors::{LedgerError, Result};
use crate::guest::normalize_email;

const MAX_CODE_LENGTH: u32 = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
struct PendingCode {
    code: String,
    expires_at: DateTime<Utc>,
}

/// short-lived email verification codes keyed by normalized email
#[derive(Debug)]
pub struct VerificationCodes {
    ttl: Duration,
    code_length: u32,
    pending: HashMap<String, PendingCode>,
}

impl VerificationCodes {
    pub fn new(config: &VerificationConfig) -> Self {
        Self {
            ttl: config.code_ttl(),
            code_length: config.code_length.clamp(1, MAX_CODE_LENGTH),
            pending: HashMap::new(),
        }
    }

    /// issue a fresh code, replacing any code already pending for the email
    pub fn issue(&mut self, email: &str, time: &SafeTimeProvider) -> Result<String> {
        let key = normalize_email(email)?;
        let code = generate_code(self.code_length);

        self.pending.insert(
            key,
            PendingCode {
                code: code.clone(),
                expires_at: time.now() + self.ttl,
            },
        );
        Ok(code)
    }

    /// check a code; a matching unexpired code is consumed
    pub fn verify(&mut self, email: &str, code: &str, time: &SafeTimeProvider) -> Result<()> {
        let key = normalize_email(email)?;
        let failed = |reason: &str| LedgerError::VerificationFailed {
            reason: reason.to_string(),
        };

        let pending = self.pending.get(&key).ok_or_else(|| failed("no code issued"))?;
        if time.now() >= pending.expires_at {
            self.pending.remove(&key);
            return Err(failed("code expired"));
        }
        if pending.code != code.trim() {
            return Err(failed("code does not match"));
        }

        self.pending.remove(&key);
        Ok(())
    }

    /// drop every expired code; returns how many were removed
    pub fn purge_expired(&mut self, time: &SafeTimeProvider) -> usize {
        let now = time.now();
        let before = self.pending.len();
        self.pending.retain(|_, pending| pending.expires_at > now);
        before - self.pending.len()
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }
}

impl Default for VerificationCodes {
    fn default() -> Self {
        Self::new(&VerificationConfig::default())
    }
}

/// numeric code, one os-random digit at a time
fn generate_code(length: u32) -> String {
    let mut rng = rand::rngs::OsRng;
    (0..length)
        .map(|_| char::from(b'0' + rng.gen_range(0..10u8)))
        .collect()
}

/// email and identity verification flags for one applicant
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationStatus {
    pub email: String,
    pub email_verified: bool,
    pub id_verified: bool,
}

impl VerificationStatus {
    pub fn is_verified(&self) -> bool {
        self.email_verified && self.id_verified
    }
}

#[derive(Debug, Default)]
pub struct VerificationRegistry {
    statuses: HashMap<String, VerificationStatus>,
}

impl VerificationRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn mark_email_verified(&mut self, email: &str) -> Result<()> {
        self.entry(email)?.email_verified = true;
        Ok(())
    }

    pub fn mark_id_verified(&mut self, email: &str) -> Result<()> {
        self.entry(email)?.id_verified = true;
        Ok(())
    }

    /// true only once both the email and the identity check passed
    pub fn is_verified(&self, email: &str) -> bool {
        self.status(email).map(|s| s.is_verified()).unwrap_or(false)
    }

    pub fn status(&self, email: &str) -> Option<&VerificationStatus> {
        let key = normalize_email(email).ok()?;
        self.statuses.get(&key)
    }

    fn entry(&mut self, email: &str) -> Result<&mut VerificationStatus> {
        let key = normalize_email(email)?;
        Ok(self
            .statuses
            .entry(key.clone())
            .or_insert_with(|| VerificationStatus {
                email: key,
                email_verified: false,
                id_verified: false,
            }))
    }
}
