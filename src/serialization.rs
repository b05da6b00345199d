/// serialization support for guest accounts
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::guest::Guest;
use crate::ledger::LedgerState;
use crate::payments::Payment;
use crate::service::AccountSummary;
use crate::types::{BillingStatus, GuestId, PaymentId, Plan};

/// serializable view of a guest account as shown in the customer portal
#[derive(Debug, Serialize, Deserialize)]
pub struct AccountView {
    pub guest: GuestView,
    pub ledger: LedgerView,
    pub payments: Vec<PaymentView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct GuestView {
    pub id: GuestId,
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub room_number: Option<String>,
    pub first_payment_at: DateTime<Utc>,
    pub last_payment_at: DateTime<Utc>,
}

/// ledger figures in minor units, with the display amounts alongside
#[derive(Debug, Serialize, Deserialize)]
pub struct LedgerView {
    pub status: BillingStatus,
    pub total_paid: Money,
    pub total_expected: Money,
    pub balance: Money,
    pub next_due_amount: Money,
    pub next_due_date: Option<DateTime<Utc>>,
    pub complete_periods: u32,
    pub display: DisplayAmounts,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisplayAmounts {
    pub total_paid: Decimal,
    pub balance: Decimal,
    pub credit: Decimal,
    pub debt: Decimal,
    pub next_due_amount: Decimal,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PaymentView {
    pub id: PaymentId,
    pub amount: Money,
    pub display_amount: Decimal,
    pub plan: Plan,
    pub occurred_at: DateTime<Utc>,
    pub external_reference: String,
}

impl GuestView {
    pub fn from_guest(guest: &Guest) -> Self {
        GuestView {
            id: guest.id,
            email: guest.email.clone(),
            name: guest.name.clone(),
            plan: guest.plan,
            room_number: guest.room_number.clone(),
            first_payment_at: guest.first_payment_at,
            last_payment_at: guest.last_payment_at,
        }
    }
}

impl LedgerView {
    pub fn from_ledger(ledger: &LedgerState) -> Self {
        LedgerView {
            status: ledger.status,
            total_paid: ledger.total_paid,
            total_expected: ledger.total_expected,
            balance: ledger.balance,
            next_due_amount: ledger.next_due_amount,
            next_due_date: ledger.next_due_date,
            complete_periods: ledger.complete_periods,
            display: DisplayAmounts {
                total_paid: ledger.total_paid.as_major(),
                balance: ledger.balance.as_major(),
                credit: ledger.credit().as_major(),
                debt: ledger.debt().as_major(),
                next_due_amount: ledger.next_due_amount.as_major(),
            },
        }
    }
}

impl PaymentView {
    pub fn from_payment(payment: &Payment) -> Self {
        PaymentView {
            id: payment.id,
            amount: payment.amount,
            display_amount: payment.amount.as_major(),
            plan: payment.plan,
            occurred_at: payment.occurred_at,
            external_reference: payment.external_reference.clone(),
        }
    }
}

impl AccountView {
    pub fn from_summary(summary: &AccountSummary) -> Self {
        AccountView {
            guest: GuestView::from_guest(&summary.guest),
            ledger: LedgerView::from_ledger(&summary.ledger),
            // newest first, the way the portal lists them
            payments: summary.payments.iter().rev().map(PaymentView::from_payment).collect(),
        }
    }

    /// convert to pretty-printed json string
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}
