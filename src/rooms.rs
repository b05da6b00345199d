use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{LedgerError, Result};
use crate::store::{GuestStore, RoomStore};
use crate::types::{GuestId, RoomStatus};

/// a rentable room
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Room {
    pub room_number: String,
    pub room_type: String,
    pub status: RoomStatus,
    pub guest_id: Option<GuestId>,
    pub check_in_at: Option<DateTime<Utc>>,
}

impl Room {
    /// an available standard room
    pub fn standard(room_number: impl Into<String>) -> Self {
        Self {
            room_number: room_number.into(),
            room_type: "standard".to_string(),
            status: RoomStatus::Available,
            guest_id: None,
            check_in_at: None,
        }
    }

    pub fn is_available(&self) -> bool {
        self.status == RoomStatus::Available
    }

    fn occupy(&mut self, guest_id: GuestId, at: DateTime<Utc>) {
        self.status = RoomStatus::Occupied;
        self.guest_id = Some(guest_id);
        self.check_in_at = Some(at);
    }

    fn vacate(&mut self) {
        self.status = RoomStatus::Available;
        self.guest_id = None;
        self.check_in_at = None;
    }
}

/// numeric room numbers sort as numbers ("2" before "10")
fn room_order(room: &Room) -> (Option<u32>, String) {
    (room.room_number.parse().ok(), room.room_number.clone())
}

/// available rooms ordered by room number
pub fn available_rooms<S: RoomStore + ?Sized>(store: &S) -> Result<Vec<Room>> {
    let mut rooms: Vec<Room> = store
        .list_rooms()?
        .into_iter()
        .filter(Room::is_available)
        .collect();
    rooms.sort_by_key(room_order);
    Ok(rooms)
}

/// mark a room occupied by a guest and record it on the guest
///
/// the room is put back to available if the guest cannot be updated.
pub fn assign_room<S>(store: &S, guest_id: GuestId, room_number: &str, now: DateTime<Utc>) -> Result<()>
where
    S: GuestStore + RoomStore + ?Sized,
{
    let unavailable = || LedgerError::RoomUnavailable {
        room_number: room_number.to_string(),
    };

    let mut room = store
        .get_room(room_number)?
        .filter(Room::is_available)
        .ok_or_else(unavailable)?;
    let mut guest = store
        .get_guest(guest_id)?
        .ok_or_else(|| LedgerError::GuestNotFound { key: guest_id.to_string() })?;

    room.occupy(guest_id, now);
    store.update_room(&room)?;

    guest.room_number = Some(room_number.to_string());
    if let Err(e) = store.update_guest(&guest) {
        tracing::error!(%guest_id, room_number, error = %e, "guest update failed, releasing room");
        room.vacate();
        if let Err(revert) = store.update_room(&room) {
            tracing::error!(room_number, error = %revert, "failed to release room after assignment error");
        }
        return Err(e);
    }

    tracing::info!(%guest_id, room_number, "room assigned");
    Ok(())
}

/// reset every room to available; returns how many were occupied
pub fn release_all_rooms<S: RoomStore + ?Sized>(store: &S) -> Result<usize> {
    let mut released = 0;
    for mut room in store.list_rooms()? {
        if !room.is_available() {
            room.vacate();
            store.update_room(&room)?;
            released += 1;
        }
    }
    Ok(released)
}
