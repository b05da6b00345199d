use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hourglass_rs::SafeTimeProvider;
use serde::{Deserialize, Serialize};

use crate::config::LedgerConfig;
use crate::decimal::Money;
use crate::errors::{LedgerError, Result};
use crate::events::{Event, EventStore};
use crate::guest::{normalize_email, Guest};
use crate::ledger::{LedgerCalculator, LedgerState};
use crate::payments::{
    ledger_entries, plan_segment, CheckoutMetadata, CheckoutQuote, CheckoutRequest, NewPayment, Payment,
    PaymentNotification,
};
use crate::reminders::{is_within_window, Notifier, Reminder, ReminderRun};
use crate::rooms::{assign_room, release_all_rooms};
use crate::store::LedgerStore;
use crate::types::{BillingStatus, GuestId, PaymentId, Plan};

/// result of recording a provider notification
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordOutcome {
    Recorded {
        guest_id: GuestId,
        payment_id: PaymentId,
        is_new_guest: bool,
        ledger: LedgerState,
    },
    /// the external reference was seen before; nothing changed
    AlreadyRecorded { external_reference: String },
}

impl RecordOutcome {
    pub fn is_recorded(&self) -> bool {
        matches!(self, RecordOutcome::Recorded { .. })
    }
}

/// a guest with their full payment history and derived ledger
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub guest: Guest,
    pub payments: Vec<Payment>,
    pub ledger: LedgerState,
}

/// counts from an administrative wipe
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClearedData {
    pub guests_removed: usize,
    pub payments_removed: usize,
    pub rooms_released: usize,
}

/// ties the stores to the ledger calculator
///
/// every balance or due date reported here is recomputed from the stored
/// payment history, segmented at the guest's latest plan change.
pub struct GuestLedgerService<S: LedgerStore> {
    store: S,
    config: LedgerConfig,
    calculator: LedgerCalculator,
    events: EventStore,
}

impl<S: LedgerStore> GuestLedgerService<S> {
    pub fn new(store: S, config: LedgerConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            calculator: LedgerCalculator::new(&config),
            store,
            config,
            events: EventStore::new(),
        })
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    pub fn events(&self) -> &[Event] {
        self.events.events()
    }

    pub fn take_events(&mut self) -> Vec<Event> {
        self.events.take_events()
    }

    /// price breakdown for a checkout form
    pub fn quote_checkout(&self, request: &CheckoutRequest) -> Result<CheckoutQuote> {
        request.quote(self.calculator.rates())
    }

    /// record a completed checkout session from its stored metadata
    pub fn complete_checkout(
        &mut self,
        metadata: &BTreeMap<String, String>,
        amount: Money,
        session_id: &str,
        time: &SafeTimeProvider,
    ) -> Result<RecordOutcome> {
        let notification =
            CheckoutMetadata::from_map(metadata)?.into_notification(amount, session_id.to_string());
        self.record_payment(notification, time)
    }

    /// record a provider-confirmed payment
    ///
    /// recording is idempotent on the external reference: a reference that
    /// is already stored returns `AlreadyRecorded` and changes nothing.
    /// a room is only assigned on a new guest's first payment.
    pub fn record_payment(
        &mut self,
        notification: PaymentNotification,
        time: &SafeTimeProvider,
    ) -> Result<RecordOutcome> {
        notification.validate()?;
        let email = normalize_email(&notification.customer_email)?;
        let reference = notification.external_reference.trim().to_string();

        if self.store.find_by_reference(&reference)?.is_some() {
            return Ok(self.already_recorded(reference, time));
        }

        let now = time.now();
        let (mut guest, is_new_guest) = match self.store.find_guest_by_email(&email)? {
            Some(guest) => (guest, false),
            None => self.create_or_attach_guest(&email, &notification, now)?,
        };
        let previous_status = if is_new_guest {
            BillingStatus::NoHistory
        } else {
            self.ledger_for(&guest)?.status
        };

        let recorded = self.store.record_payment(NewPayment {
            guest_id: guest.id,
            amount: notification.amount,
            plan: notification.plan,
            occurred_at: now,
            external_reference: reference.clone(),
        });
        let payment = match recorded {
            Ok(payment) => payment,
            Err(e) => {
                if is_new_guest {
                    self.discard_unpaid_guest(guest.id);
                }
                return match e {
                    LedgerError::DuplicateReference { .. } => Ok(self.already_recorded(reference, time)),
                    e => Err(e),
                };
            }
        };
        if is_new_guest {
            self.events.emit(Event::GuestCreated {
                guest_id: guest.id,
                email: guest.email.clone(),
                plan: guest.plan,
                timestamp: now,
            });
        }

        self.events.emit(Event::PaymentRecorded {
            guest_id: guest.id,
            payment_id: payment.id,
            amount: payment.amount,
            external_reference: payment.external_reference.clone(),
            timestamp: now,
        });

        if !is_new_guest {
            if let Some(old_plan) = guest.apply_payment(notification.plan, now) {
                self.events.emit(Event::PlanChanged {
                    guest_id: guest.id,
                    old_plan,
                    new_plan: guest.plan,
                    timestamp: now,
                });
            }
            self.store.update_guest(&guest)?;
        } else if let Some(room_number) = notification.room_number.as_deref() {
            self.assign_requested_room(guest.id, room_number, time);
        }

        let ledger = self.ledger_for(&guest)?;
        if previous_status != ledger.status {
            self.events.emit(Event::BillingStatusChanged {
                guest_id: guest.id,
                old_status: previous_status,
                new_status: ledger.status,
                timestamp: now,
            });
        }

        tracing::info!(
            guest_id = %guest.id,
            payment_id = %payment.id,
            amount = %payment.amount,
            balance = %ledger.balance,
            is_new_guest,
            "payment recorded"
        );

        Ok(RecordOutcome::Recorded {
            guest_id: guest.id,
            payment_id: payment.id,
            is_new_guest,
            ledger,
        })
    }

    /// insert a guest for a first payment; a guest inserted concurrently
    /// under the same email is reused instead
    fn create_or_attach_guest(
        &self,
        email: &str,
        notification: &PaymentNotification,
        now: DateTime<Utc>,
    ) -> Result<(Guest, bool)> {
        let guest = Guest::from_first_payment(email, &notification.customer_name, notification.plan, now)?;
        match self.store.insert_guest(&guest) {
            Ok(()) => {
                tracing::info!(guest_id = %guest.id, plan = %guest.plan, "guest created");
                Ok((guest, true))
            }
            Err(LedgerError::DuplicateGuest { .. }) => {
                let existing = self
                    .store
                    .find_guest_by_email(email)?
                    .ok_or_else(|| LedgerError::GuestNotFound { key: email.to_string() })?;
                tracing::debug!(guest_id = %existing.id, "guest created concurrently, attaching payment");
                Ok((existing, false))
            }
            Err(e) => Err(e),
        }
    }

    /// undo a guest insert whose first payment never landed
    fn discard_unpaid_guest(&self, guest_id: GuestId) {
        match self.store.delete_guest_if_unpaid(guest_id) {
            Ok(true) => tracing::debug!(%guest_id, "removed guest without payments"),
            Ok(false) => {}
            Err(e) => tracing::error!(%guest_id, error = %e, "failed to remove guest without payments"),
        }
    }

    fn already_recorded(&mut self, external_reference: String, time: &SafeTimeProvider) -> RecordOutcome {
        tracing::info!(external_reference = %external_reference, "payment already recorded, ignoring");
        self.events.emit(Event::DuplicatePaymentIgnored {
            external_reference: external_reference.clone(),
            timestamp: time.now(),
        });
        RecordOutcome::AlreadyRecorded { external_reference }
    }

    /// room assignment never fails the payment that triggered it
    fn assign_requested_room(&mut self, guest_id: GuestId, room_number: &str, time: &SafeTimeProvider) {
        let now = time.now();
        match assign_room(&self.store, guest_id, room_number, now) {
            Ok(()) => self.events.emit(Event::RoomAssigned {
                guest_id,
                room_number: room_number.to_string(),
                timestamp: now,
            }),
            Err(e) => {
                tracing::warn!(%guest_id, room_number, error = %e, "room assignment failed");
                self.events.emit(Event::RoomAssignmentFailed {
                    guest_id,
                    room_number: room_number.to_string(),
                    reason: e.to_string(),
                    timestamp: now,
                });
            }
        }
    }

    fn ledger_for(&self, guest: &Guest) -> Result<LedgerState> {
        let payments = self.store.list_payments_for_guest(guest.id)?;
        self.ledger_over(guest.plan, &payments)
    }

    /// ledger over the segment paid under the current plan; only a segment
    /// that starts the guest's history carries the move-in fee
    fn ledger_over(&self, plan: Plan, payments: &[Payment]) -> Result<LedgerState> {
        let segment = plan_segment(payments, plan);
        let entries = ledger_entries(segment);
        if segment.len() == payments.len() {
            self.calculator.compute(plan, &entries)
        } else {
            self.calculator.compute_after_plan_change(plan, &entries)
        }
    }

    fn summary_for(&self, guest: Guest) -> Result<AccountSummary> {
        let payments = self.store.list_payments_for_guest(guest.id)?;
        let ledger = self.ledger_over(guest.plan, &payments)?;
        Ok(AccountSummary {
            guest,
            payments,
            ledger,
        })
    }

    /// guest, payment history and ledger for an email address
    pub fn account_summary(&self, email: &str) -> Result<AccountSummary> {
        let email = normalize_email(email)?;
        let guest = self
            .store
            .find_guest_by_email(&email)?
            .ok_or(LedgerError::GuestNotFound { key: email })?;
        self.summary_for(guest)
    }

    pub fn guest_ledger(&self, guest_id: GuestId) -> Result<LedgerState> {
        let guest = self
            .store
            .get_guest(guest_id)?
            .ok_or_else(|| LedgerError::GuestNotFound {
                key: guest_id.to_string(),
            })?;
        self.ledger_for(&guest)
    }

    /// every guest with their ledger, oldest account first
    pub fn list_accounts(&self) -> Result<Vec<AccountSummary>> {
        self.store
            .list_guests()?
            .into_iter()
            .map(|guest| self.summary_for(guest))
            .collect()
    }

    /// delete every payment and guest and free all rooms
    pub fn clear_all_data(&mut self, time: &SafeTimeProvider) -> Result<ClearedData> {
        let payments_removed = self.store.delete_all_payments()?;
        let guests_removed = self.store.delete_all_guests()?;
        let rooms_released = release_all_rooms(&self.store)?;

        self.events.emit(Event::DataCleared {
            guests_removed,
            payments_removed,
            timestamp: time.now(),
        });
        tracing::warn!(guests_removed, payments_removed, rooms_released, "all guest data cleared");

        Ok(ClearedData {
            guests_removed,
            payments_removed,
            rooms_released,
        })
    }

    /// send reminders to guests whose next charge is due inside the lead window
    ///
    /// a notifier failure is logged and counted; the scan carries on.
    pub fn due_reminders(&mut self, time: &SafeTimeProvider, notifier: &dyn Notifier) -> Result<ReminderRun> {
        let now = time.now();
        let mut run = ReminderRun::default();

        for account in self.list_accounts()? {
            let reminder = Reminder::for_guest(&account.guest, &account.ledger, &self.config.property)
                .filter(|r| is_within_window(r.due_date, now, &self.config.reminders));
            let Some(reminder) = reminder else {
                run.skipped += 1;
                continue;
            };

            match notifier.send(&reminder) {
                Ok(()) => {
                    self.events.emit(Event::ReminderSent {
                        guest_id: reminder.guest_id,
                        amount: reminder.amount,
                        due_date: reminder.due_date,
                        timestamp: now,
                    });
                    run.sent.push(reminder);
                }
                Err(e) => {
                    tracing::error!(guest_id = %reminder.guest_id, error = %e, "reminder delivery failed");
                    self.events.emit(Event::ReminderFailed {
                        guest_id: reminder.guest_id,
                        reason: e.to_string(),
                        timestamp: now,
                    });
                    run.failed += 1;
                }
            }
        }

        tracing::info!(sent = run.sent.len(), failed = run.failed, skipped = run.skipped, "reminder scan finished");
        Ok(run)
    }
}
