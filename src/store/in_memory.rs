use std::collections::{BTreeMap, HashMap};
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use uuid::Uuid;

use crate::errors::{LedgerError, Result};
use crate::guest::Guest;
use crate::payments::{NewPayment, Payment};
use crate::rooms::Room;
use crate::types::GuestId;

use super::{GuestStore, PaymentStore, RoomStore};

#[derive(Debug, Default)]
struct StoreState {
    guests: HashMap<GuestId, Guest>,
    /// normalized email -> guest
    emails: HashMap<String, GuestId>,
    payments: Vec<Payment>,
    /// external reference -> index into `payments`
    references: HashMap<String, usize>,
    rooms: BTreeMap<String, Room>,
    next_sequence: u64,
}

/// in-memory store for tests, demos and single-process deployments
///
/// one `RwLock` guards all tables, so every write (including the
/// reference-uniqueness check on payments) is atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    state: RwLock<StoreState>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// store pre-loaded with the given rooms, all available
    pub fn with_rooms<I, S>(room_numbers: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let store = Self::new();
        for number in room_numbers {
            store.insert_room(&Room::standard(number))?;
        }
        Ok(store)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, StoreState>> {
        self.state
            .read()
            .map_err(|_| LedgerError::store("in-memory store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state
            .write()
            .map_err(|_| LedgerError::store("in-memory store lock poisoned"))
    }
}

fn email_key(email: &str) -> String {
    email.trim().to_lowercase()
}

impl GuestStore for InMemoryStore {
    fn insert_guest(&self, guest: &Guest) -> Result<()> {
        let mut state = self.write()?;
        let key = email_key(&guest.email);

        if state.emails.contains_key(&key) {
            return Err(LedgerError::DuplicateGuest { email: key });
        }

        state.emails.insert(key, guest.id);
        state.guests.insert(guest.id, guest.clone());
        tracing::debug!(guest_id = %guest.id, "guest inserted");
        Ok(())
    }

    fn get_guest(&self, guest_id: GuestId) -> Result<Option<Guest>> {
        Ok(self.read()?.guests.get(&guest_id).cloned())
    }

    fn find_guest_by_email(&self, email: &str) -> Result<Option<Guest>> {
        let state = self.read()?;
        Ok(state
            .emails
            .get(&email_key(email))
            .and_then(|id| state.guests.get(id))
            .cloned())
    }

    fn update_guest(&self, guest: &Guest) -> Result<()> {
        let mut state = self.write()?;
        let existing_email = match state.guests.get(&guest.id) {
            Some(existing) => email_key(&existing.email),
            None => {
                return Err(LedgerError::GuestNotFound {
                    key: guest.id.to_string(),
                })
            }
        };

        let new_email = email_key(&guest.email);
        if new_email != existing_email {
            if state.emails.contains_key(&new_email) {
                return Err(LedgerError::DuplicateGuest { email: new_email });
            }
            state.emails.remove(&existing_email);
            state.emails.insert(new_email, guest.id);
        }

        state.guests.insert(guest.id, guest.clone());
        Ok(())
    }

    fn list_guests(&self) -> Result<Vec<Guest>> {
        let mut guests: Vec<Guest> = self.read()?.guests.values().cloned().collect();
        guests.sort_by(|a, b| a.created_at.cmp(&b.created_at).then_with(|| a.email.cmp(&b.email)));
        Ok(guests)
    }

    fn delete_guest_if_unpaid(&self, guest_id: GuestId) -> Result<bool> {
        let mut state = self.write()?;
        if state.payments.iter().any(|p| p.guest_id == guest_id) {
            return Ok(false);
        }
        match state.guests.remove(&guest_id) {
            Some(guest) => {
                state.emails.remove(&email_key(&guest.email));
                tracing::debug!(%guest_id, "unpaid guest removed");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete_all_guests(&self) -> Result<usize> {
        let mut state = self.write()?;
        let removed = state.guests.len();
        state.guests.clear();
        state.emails.clear();
        Ok(removed)
    }
}

impl PaymentStore for InMemoryStore {
    fn record_payment(&self, payment: NewPayment) -> Result<Payment> {
        payment.validate()?;

        let mut state = self.write()?;
        if state.references.contains_key(&payment.external_reference) {
            return Err(LedgerError::DuplicateReference {
                reference: payment.external_reference,
            });
        }
        if !state.guests.contains_key(&payment.guest_id) {
            return Err(LedgerError::GuestNotFound {
                key: payment.guest_id.to_string(),
            });
        }

        let sequence = state.next_sequence;
        state.next_sequence += 1;

        let stored = Payment {
            id: Uuid::new_v4(),
            guest_id: payment.guest_id,
            amount: payment.amount,
            plan: payment.plan,
            occurred_at: payment.occurred_at,
            external_reference: payment.external_reference,
            sequence,
        };

        let index = state.payments.len();
        state.references.insert(stored.external_reference.clone(), index);
        state.payments.push(stored.clone());

        tracing::debug!(
            payment_id = %stored.id,
            guest_id = %stored.guest_id,
            amount = stored.amount.minor(),
            "payment recorded"
        );
        Ok(stored)
    }

    fn find_by_reference(&self, external_reference: &str) -> Result<Option<Payment>> {
        let state = self.read()?;
        Ok(state
            .references
            .get(external_reference)
            .and_then(|index| state.payments.get(*index))
            .cloned())
    }

    fn list_payments_for_guest(&self, guest_id: GuestId) -> Result<Vec<Payment>> {
        let mut payments: Vec<Payment> = self
            .read()?
            .payments
            .iter()
            .filter(|p| p.guest_id == guest_id)
            .cloned()
            .collect();
        payments.sort_by_key(|p| (p.occurred_at, p.sequence));
        Ok(payments)
    }

    fn delete_all_payments(&self) -> Result<usize> {
        let mut state = self.write()?;
        let removed = state.payments.len();
        state.payments.clear();
        state.references.clear();
        Ok(removed)
    }
}

impl RoomStore for InMemoryStore {
    fn insert_room(&self, room: &Room) -> Result<()> {
        let mut state = self.write()?;
        state.rooms.insert(room.room_number.clone(), room.clone());
        Ok(())
    }

    fn get_room(&self, room_number: &str) -> Result<Option<Room>> {
        Ok(self.read()?.rooms.get(room_number).cloned())
    }

    fn list_rooms(&self) -> Result<Vec<Room>> {
        Ok(self.read()?.rooms.values().cloned().collect())
    }

    fn update_room(&self, room: &Room) -> Result<()> {
        let mut state = self.write()?;
        match state.rooms.get_mut(&room.room_number) {
            Some(existing) => {
                *existing = room.clone();
                Ok(())
            }
            None => Err(LedgerError::RoomUnavailable {
                room_number: room.room_number.clone(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decimal::Money;
    use crate::ledger::compute_ledger;
    use crate::payments::ledger_entries;
    use crate::types::Plan;
    use chrono::{DateTime, Duration, TimeZone, Utc};
    use std::sync::Arc;
    use std::thread;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 2, 10, 8, 0, 0).unwrap()
    }

    fn guest(store: &InMemoryStore, email: &str) -> Guest {
        let guest = Guest::from_first_payment(email, "Sam", Plan::Weekly, t0()).unwrap();
        store.insert_guest(&guest).unwrap();
        guest
    }

    fn new_payment(guest_id: GuestId, minor: i64, at: DateTime<Utc>, reference: &str) -> NewPayment {
        NewPayment {
            guest_id,
            amount: Money::from_minor(minor),
            plan: Plan::Weekly,
            occurred_at: at,
            external_reference: reference.to_string(),
        }
    }

    #[test]
    fn test_email_lookup_is_case_insensitive() {
        let store = InMemoryStore::new();
        let stored = guest(&store, "sam@example.com");

        let found = store.find_guest_by_email(" SAM@Example.com").unwrap().unwrap();
        assert_eq!(found.id, stored.id);

        let duplicate = Guest::from_first_payment("Sam@example.com", "Other", Plan::Monthly, t0()).unwrap();
        assert!(matches!(
            store.insert_guest(&duplicate),
            Err(LedgerError::DuplicateGuest { .. })
        ));
    }

    #[test]
    fn test_duplicate_reference_rejected() {
        let store = InMemoryStore::new();
        let g = guest(&store, "sam@example.com");

        store.record_payment(new_payment(g.id, 35_000, t0(), "cs_1")).unwrap();
        let again = store.record_payment(new_payment(g.id, 35_000, t0(), "cs_1"));

        assert!(matches!(again, Err(LedgerError::DuplicateReference { reference }) if reference == "cs_1"));
        assert_eq!(store.list_payments_for_guest(g.id).unwrap().len(), 1);
    }

    #[test]
    fn test_payment_for_unknown_guest_rejected() {
        let store = InMemoryStore::new();
        let result = store.record_payment(new_payment(Uuid::new_v4(), 100, t0(), "cs_x"));
        assert!(matches!(result, Err(LedgerError::GuestNotFound { .. })));
        assert!(store.find_by_reference("cs_x").unwrap().is_none());
    }

    #[test]
    fn test_listing_is_chronological_with_stable_ties() {
        let store = InMemoryStore::new();
        let g = guest(&store, "sam@example.com");
        let other = guest(&store, "other@example.com");

        store.record_payment(new_payment(g.id, 100, t0() + Duration::days(3), "late")).unwrap();
        store.record_payment(new_payment(g.id, 200, t0(), "tie_a")).unwrap();
        store.record_payment(new_payment(other.id, 999, t0(), "elsewhere")).unwrap();
        store.record_payment(new_payment(g.id, 300, t0(), "tie_b")).unwrap();

        let references: Vec<String> = store
            .list_payments_for_guest(g.id)
            .unwrap()
            .into_iter()
            .map(|p| p.external_reference)
            .collect();
        assert_eq!(references, vec!["tie_a", "tie_b", "late"]);
    }

    #[test]
    fn test_store_round_trip_matches_direct_ledger() {
        let store = InMemoryStore::new();
        let g = guest(&store, "sam@example.com");

        let requests = vec![
            new_payment(g.id, 20_000, t0(), "cs_a"),
            new_payment(g.id, 15_000, t0() + Duration::days(1), "cs_b"),
            new_payment(g.id, 30_000, t0() + Duration::days(8), "cs_c"),
        ];
        let direct: Vec<_> = requests
            .iter()
            .map(|p| crate::ledger::PaymentEntry::new(p.amount, p.occurred_at))
            .collect();

        for request in requests {
            store.record_payment(request).unwrap();
        }
        let listed = store.list_payments_for_guest(g.id).unwrap();

        assert_eq!(
            compute_ledger(Plan::Weekly, &ledger_entries(&listed)).unwrap(),
            compute_ledger(Plan::Weekly, &direct).unwrap()
        );
    }

    #[test]
    fn test_concurrent_same_reference_recorded_once() {
        let store = Arc::new(InMemoryStore::new());
        let g = guest(&store, "sam@example.com");

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = Arc::clone(&store);
                thread::spawn(move || store.record_payment(new_payment(g.id, 35_000, t0(), "cs_race")))
            })
            .collect();
        let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

        assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(LedgerError::DuplicateReference { .. })))
                .count(),
            7
        );
        assert_eq!(store.list_payments_for_guest(g.id).unwrap().len(), 1);
    }

    #[test]
    fn test_delete_guest_if_unpaid() {
        let store = InMemoryStore::new();
        let paid = guest(&store, "paid@example.com");
        let unpaid = guest(&store, "unpaid@example.com");
        store.record_payment(new_payment(paid.id, 100, t0(), "cs_1")).unwrap();

        assert!(!store.delete_guest_if_unpaid(paid.id).unwrap());
        assert!(store.delete_guest_if_unpaid(unpaid.id).unwrap());
        assert!(store.find_guest_by_email("unpaid@example.com").unwrap().is_none());
        assert!(store.get_guest(paid.id).unwrap().is_some());
    }

    #[test]
    fn test_delete_all() {
        let store = InMemoryStore::new();
        let g = guest(&store, "sam@example.com");
        store.record_payment(new_payment(g.id, 100, t0(), "cs_1")).unwrap();

        assert_eq!(store.delete_all_payments().unwrap(), 1);
        assert_eq!(store.delete_all_guests().unwrap(), 1);
        assert!(store.find_guest_by_email("sam@example.com").unwrap().is_none());
        assert!(store.find_by_reference("cs_1").unwrap().is_none());
    }
}
