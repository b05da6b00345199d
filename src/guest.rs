use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::types::{GuestId, Plan};

/// guest aggregate; payments live in the payment store keyed by `id`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guest {
    pub id: GuestId,
    /// always stored normalized (trimmed, lowercase)
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub first_payment_at: DateTime<Utc>,
    pub last_payment_at: DateTime<Utc>,
    pub room_number: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl Guest {
    /// create a guest from the payment that opened the account
    pub fn from_first_payment(
        email: &str,
        name: &str,
        plan: Plan,
        paid_at: DateTime<Utc>,
    ) -> Result<Self> {
        let email = normalize_email(email)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(LedgerError::MissingField {
                field: "name".to_string(),
            });
        }

        Ok(Self {
            id: Uuid::new_v4(),
            email,
            name: name.to_string(),
            plan,
            first_payment_at: paid_at,
            last_payment_at: paid_at,
            room_number: None,
            created_at: paid_at,
        })
    }

    /// record a later payment; returns the previous plan when it changed
    pub fn apply_payment(&mut self, plan: Plan, paid_at: DateTime<Utc>) -> Option<Plan> {
        if paid_at > self.last_payment_at {
            self.last_payment_at = paid_at;
        }
        if self.plan != plan {
            let previous = self.plan;
            self.plan = plan;
            Some(previous)
        } else {
            None
        }
    }
}

/// trim and lowercase an email, rejecting obviously malformed addresses
pub fn normalize_email(email: &str) -> Result<String> {
    let normalized = email.trim().to_lowercase();
    let invalid = || LedgerError::InvalidEmail {
        email: email.to_string(),
    };

    let (local, domain) = normalized.split_once('@').ok_or_else(invalid)?;
    if local.is_empty()
        || domain.contains('@')
        || !domain.contains('.')
        || domain.starts_with('.')
        || domain.ends_with('.')
        || normalized.chars().any(char::is_whitespace)
    {
        return Err(invalid());
    }

    Ok(normalized)
}
