use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::decimal::Money;
use crate::types::{BillingStatus, GuestId, PaymentId, Plan};

/// all events that can be emitted by the ledger service
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Event {
    // guest events
    GuestCreated {
        guest_id: GuestId,
        email: String,
        plan: Plan,
        timestamp: DateTime<Utc>,
    },
    PlanChanged {
        guest_id: GuestId,
        old_plan: Plan,
        new_plan: Plan,
        timestamp: DateTime<Utc>,
    },

    // payment events
    PaymentRecorded {
        guest_id: GuestId,
        payment_id: PaymentId,
        amount: Money,
        external_reference: String,
        timestamp: DateTime<Utc>,
    },
    DuplicatePaymentIgnored {
        external_reference: String,
        timestamp: DateTime<Utc>,
    },
    BillingStatusChanged {
        guest_id: GuestId,
        old_status: BillingStatus,
        new_status: BillingStatus,
        timestamp: DateTime<Utc>,
    },

    // room events
    RoomAssigned {
        guest_id: GuestId,
        room_number: String,
        timestamp: DateTime<Utc>,
    },
    RoomAssignmentFailed {
        guest_id: GuestId,
        room_number: String,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // reminder events
    ReminderSent {
        guest_id: GuestId,
        amount: Money,
        due_date: DateTime<Utc>,
        timestamp: DateTime<Utc>,
    },
    ReminderFailed {
        guest_id: GuestId,
        reason: String,
        timestamp: DateTime<Utc>,
    },

    // administrative events
    DataCleared {
        guests_removed: usize,
        payments_removed: usize,
        timestamp: DateTime<Utc>,
    },
}

/// events collected by the service, oldest first
#[derive(Debug, Default)]
pub struct EventStore {
    events: Vec<Event>,
}

impl EventStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn emit(&mut self, event: Event) {
        tracing::trace!(?event, "event emitted");
        self.events.push(event);
    }

    /// hand the collected events to the caller, leaving the store empty
    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.drain(..).collect()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}
