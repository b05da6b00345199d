pub mod checkout;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::ledger::PaymentEntry;
use crate::types::{GuestId, PaymentId, Plan};

pub use checkout::{CheckoutMetadata, CheckoutQuote, CheckoutRequest};

/// stored payment; never mutated after it is recorded
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Payment {
    pub id: PaymentId,
    pub guest_id: GuestId,
    pub amount: Money,
    pub plan: Plan,
    pub occurred_at: DateTime<Utc>,
    pub external_reference: String,
    /// insertion order, breaks ties between equal timestamps
    pub sequence: u64,
}

impl Payment {
    pub fn entry(&self) -> PaymentEntry {
        PaymentEntry::new(self.amount, self.occurred_at)
    }
}

/// calculator input for a stored history, preserving order
pub fn ledger_entries(payments: &[Payment]) -> Vec<PaymentEntry> {
    payments.iter().map(Payment::entry).collect()
}

/// trailing run of payments made under `plan`
///
/// a plan change opens a new segment, so payments made under an earlier
/// plan are never repriced at the current plan's rates.
pub fn plan_segment(payments: &[Payment], plan: Plan) -> &[Payment] {
    let start = payments
        .iter()
        .rposition(|p| p.plan != plan)
        .map_or(0, |last_other| last_other + 1);
    &payments[start..]
}

/// payment insert request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewPayment {
    pub guest_id: GuestId,
    pub amount: Money,
    pub plan: Plan,
    pub occurred_at: DateTime<Utc>,
    pub external_reference: String,
}

impl NewPayment {
    pub fn validate(&self) -> Result<()> {
        if !self.amount.is_positive() {
            return Err(LedgerError::invalid_amount(self.amount));
        }
        if self.external_reference.trim().is_empty() {
            return Err(LedgerError::MissingField {
                field: "external_reference".to_string(),
            });
        }
        Ok(())
    }
}

/// completed payment reported by the payment provider, already normalized
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentNotification {
    pub amount: Money,
    pub plan: Plan,
    pub customer_email: String,
    pub customer_name: String,
    pub external_reference: String,
    pub is_first_payment: bool,
    pub room_number: Option<String>,
}

/// wire shape emitted by the provider adapter
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawNotification {
    amount: Decimal,
    plan: String,
    customer_email: String,
    customer_name: String,
    external_reference: String,
    #[serde(default)]
    is_first_payment: bool,
    #[serde(default)]
    room_number: Option<String>,
}

impl PaymentNotification {
    /// parse an adapter payload; amounts under `display_threshold` are dollars
    pub fn from_json(json: &str, display_threshold: Decimal) -> Result<Self> {
        let raw: RawNotification = serde_json::from_str(json)?;

        let notification = PaymentNotification {
            amount: normalize_amount(raw.amount, display_threshold)?,
            plan: raw.plan.parse()?,
            customer_email: raw.customer_email,
            customer_name: raw.customer_name,
            external_reference: raw.external_reference,
            is_first_payment: raw.is_first_payment,
            room_number: raw.room_number.filter(|r| !r.trim().is_empty()),
        };
        notification.validate()?;
        Ok(notification)
    }

    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("customer_email", &self.customer_email),
            ("customer_name", &self.customer_name),
            ("external_reference", &self.external_reference),
        ] {
            if value.trim().is_empty() {
                return Err(LedgerError::MissingField {
                    field: field.to_string(),
                });
            }
        }
        if !self.amount.is_positive() {
            return Err(LedgerError::invalid_amount(self.amount));
        }
        Ok(())
    }
}

/// normalize a caller-supplied amount to minor units
///
/// values below `display_threshold` are read as major units (350 -> 35000),
/// everything else must already be whole minor units.
pub fn normalize_amount(raw: Decimal, display_threshold: Decimal) -> Result<Money> {
    if raw.is_sign_negative() && !raw.is_zero() {
        return Err(LedgerError::InvalidAmount {
            amount: raw.to_string(),
        });
    }

    if raw < display_threshold {
        Money::from_decimal_major(raw)
    } else {
        Money::from_decimal_minor(raw)
    }
}
