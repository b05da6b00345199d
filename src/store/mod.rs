pub mod in_memory;

use std::sync::Arc;

use crate::errors::Result;
use crate::guest::Guest;
use crate::payments::{NewPayment, Payment};
use crate::rooms::Room;
use crate::types::GuestId;

pub use in_memory::InMemoryStore;

/// guest record storage
pub trait GuestStore: Send + Sync {
    /// insert a new guest; fails with `DuplicateGuest` if the email is taken
    fn insert_guest(&self, guest: &Guest) -> Result<()>;

    fn get_guest(&self, guest_id: GuestId) -> Result<Option<Guest>>;

    /// case-insensitive lookup
    fn find_guest_by_email(&self, email: &str) -> Result<Option<Guest>>;

    /// replace a stored guest; fails with `GuestNotFound` if absent
    fn update_guest(&self, guest: &Guest) -> Result<()>;

    /// all guests ordered by creation time
    fn list_guests(&self) -> Result<Vec<Guest>>;

    /// remove a guest only if no payment references it; returns whether it was removed
    fn delete_guest_if_unpaid(&self, guest_id: GuestId) -> Result<bool>;

    /// returns the number of guests removed
    fn delete_all_guests(&self) -> Result<usize>;
}

/// payment record storage
pub trait PaymentStore: Send + Sync {
    /// insert a payment
    ///
    /// the reference check and the insert are one atomic step; a reference
    /// that already exists fails with `DuplicateReference`.
    fn record_payment(&self, payment: NewPayment) -> Result<Payment>;

    fn find_by_reference(&self, external_reference: &str) -> Result<Option<Payment>>;

    /// every payment for the guest, ascending by `occurred_at`, ties in insertion order
    fn list_payments_for_guest(&self, guest_id: GuestId) -> Result<Vec<Payment>>;

    /// returns the number of payments removed
    fn delete_all_payments(&self) -> Result<usize>;
}

/// room inventory storage
pub trait RoomStore: Send + Sync {
    fn insert_room(&self, room: &Room) -> Result<()>;

    fn get_room(&self, room_number: &str) -> Result<Option<Room>>;

    fn list_rooms(&self) -> Result<Vec<Room>>;

    /// replace a stored room; fails with `RoomUnavailable` if absent
    fn update_room(&self, room: &Room) -> Result<()>;
}

/// everything the ledger service needs from persistence
///
/// implementations must keep external references unique and must return a
/// guest's complete payment history, never a truncated page of it.
pub trait LedgerStore: GuestStore + PaymentStore + RoomStore {}

impl<T: GuestStore + PaymentStore + RoomStore> LedgerStore for T {}

// shared stores, so several services can work against one backend
impl<T: GuestStore + ?Sized> GuestStore for Arc<T> {
    fn insert_guest(&self, guest: &Guest) -> Result<()> {
        (**self).insert_guest(guest)
    }

    fn get_guest(&self, guest_id: GuestId) -> Result<Option<Guest>> {
        (**self).get_guest(guest_id)
    }

    fn find_guest_by_email(&self, email: &str) -> Result<Option<Guest>> {
        (**self).find_guest_by_email(email)
    }

    fn update_guest(&self, guest: &Guest) -> Result<()> {
        (**self).update_guest(guest)
    }

    fn list_guests(&self) -> Result<Vec<Guest>> {
        (**self).list_guests()
    }

    fn delete_guest_if_unpaid(&self, guest_id: GuestId) -> Result<bool> {
        (**self).delete_guest_if_unpaid(guest_id)
    }

    fn delete_all_guests(&self) -> Result<usize> {
        (**self).delete_all_guests()
    }
}

impl<T: PaymentStore + ?Sized> PaymentStore for Arc<T> {
    fn record_payment(&self, payment: NewPayment) -> Result<Payment> {
        (**self).record_payment(payment)
    }

    fn find_by_reference(&self, external_reference: &str) -> Result<Option<Payment>> {
        (**self).find_by_reference(external_reference)
    }

    fn list_payments_for_guest(&self, guest_id: GuestId) -> Result<Vec<Payment>> {
        (**self).list_payments_for_guest(guest_id)
    }

    fn delete_all_payments(&self) -> Result<usize> {
        (**self).delete_all_payments()
    }
}

impl<T: RoomStore + ?Sized> RoomStore for Arc<T> {
    fn insert_room(&self, room: &Room) -> Result<()> {
        (**self).insert_room(room)
    }

    fn get_room(&self, room_number: &str) -> Result<Option<Room>> {
        (**self).get_room(room_number)
    }

    fn list_rooms(&self) -> Result<Vec<Room>> {
        (**self).list_rooms()
    }

    fn update_room(&self, room: &Room) -> Result<()> {
        (**self).update_room(room)
    }
}
