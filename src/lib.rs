pub mod config;
pub mod decimal;
pub mod errors;
pub mod events;
pub mod guest;
pub mod ledger;
pub mod payments;
pub mod reminders;
pub mod rooms;
pub mod serialization;
pub mod service;
pub mod store;
pub mod types;
pub mod verification;

// re-export key types
pub use config::{LedgerConfig, PartialPeriodPolicy, PropertyInfo, RateTable, ReminderConfig, VerificationConfig};
pub use decimal::Money;
pub use errors::{LedgerError, Result};
pub use events::{Event, EventStore};
pub use guest::Guest;
pub use ledger::{compute_ledger, LedgerCalculator, LedgerState, PaymentEntry};
pub use payments::{
    normalize_amount, CheckoutMetadata, CheckoutQuote, CheckoutRequest, NewPayment, Payment,
    PaymentNotification,
};
pub use reminders::{LogNotifier, Notifier, Reminder, ReminderRun};
pub use rooms::Room;
pub use serialization::AccountView;
pub use service::{AccountSummary, ClearedData, GuestLedgerService, RecordOutcome};
pub use store::{GuestStore, InMemoryStore, LedgerStore, PaymentStore, RoomStore};
pub use types::{BillingStatus, GuestId, PaymentId, Plan, RoomStatus};
pub use verification::{VerificationCodes, VerificationRegistry, VerificationStatus};

// re-export external dependencies that users will need
pub use chrono;
pub use hourglass_rs::{SafeTimeProvider, TimeSource};
pub use rust_decimal::Decimal;
pub use uuid::Uuid;
