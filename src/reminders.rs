use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::{PropertyInfo, ReminderConfig};
use crate::decimal::Money;
use crate::errors::Result;
use crate::guest::Guest;
use crate::ledger::period::days_between;
use crate::ledger::LedgerState;
use crate::types::{GuestId, Plan};

/// a rendered payment reminder
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reminder {
    pub guest_id: GuestId,
    pub email: String,
    pub name: String,
    pub plan: Plan,
    pub amount: Money,
    pub due_date: DateTime<Utc>,
    pub body: String,
}

impl Reminder {
    /// reminder for a guest's next charge, if the ledger has one to collect
    pub fn for_guest(guest: &Guest, ledger: &LedgerState, property: &PropertyInfo) -> Option<Self> {
        let due_date = ledger.next_due_date?;
        if !ledger.next_due_amount.is_positive() {
            return None;
        }

        Some(Self {
            guest_id: guest.id,
            email: guest.email.clone(),
            name: guest.name.clone(),
            plan: ledger.plan,
            amount: ledger.next_due_amount,
            due_date,
            body: render_body(&guest.name, ledger.plan, ledger.next_due_amount, due_date, property),
        })
    }
}

fn render_body(
    name: &str,
    plan: Plan,
    amount: Money,
    due_date: DateTime<Utc>,
    property: &PropertyInfo,
) -> String {
    format!(
        "Dear {name},\n\n\
         This is a friendly reminder that your {plan} payment of ${amount} is due on {date}.\n\n\
         Please visit {property} to make your payment:\n{url}\n\n\
         If you have any questions, please contact us at {phone}.\n\n\
         Thank you,\n{property} Team\n",
        date = due_date.format("%B %-d, %Y"),
        property = property.name,
        url = property.payment_url,
        phone = property.contact_phone,
    )
}

/// true when `due_date` is between `lead_days_min` and `lead_days_max`
/// calendar days after `now`, both ends included
pub fn is_within_window(due_date: DateTime<Utc>, now: DateTime<Utc>, window: &ReminderConfig) -> bool {
    let days = days_between(now, due_date);
    days >= i64::from(window.lead_days_min) && days <= i64::from(window.lead_days_max)
}

/// delivery channel for reminders
pub trait Notifier: Send + Sync {
    fn send(&self, reminder: &Reminder) -> Result<()>;
}

/// writes reminders to the log instead of delivering them
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn send(&self, reminder: &Reminder) -> Result<()> {
        tracing::info!(
            email = %reminder.email,
            plan = %reminder.plan,
            amount = %reminder.amount,
            due_date = %reminder.due_date,
            "payment reminder"
        );
        tracing::debug!(body = %reminder.body, "reminder content");
        Ok(())
    }
}

/// outcome of one reminder scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRun {
    pub sent: Vec<Reminder>,
    pub failed: usize,
    /// guests scanned with nothing due inside the window
    pub skipped: usize,
}
