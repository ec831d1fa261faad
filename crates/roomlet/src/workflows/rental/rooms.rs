use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use super::domain::{Actor, Room, RoomId, RoomStatus};
use super::policy;
use super::store::{RentalStore, StoreError};
use super::RentalError;

static ROOM_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_room_id() -> RoomId {
    let id = ROOM_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    RoomId(format!("room-{id:06}"))
}

/// Stand-in for the external room registry at its interface: the engine only
/// needs a room shell (owner, price, status) to run the lifecycle against.
pub struct RoomRegistry<S> {
    store: Arc<S>,
}

impl<S: RentalStore> RoomRegistry<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Register a draft room shell owned by the calling host.
    pub fn register(
        &self,
        actor: &Actor,
        room_id: Option<String>,
        rent_price: u64,
    ) -> Result<Room, RentalError> {
        if !policy::can_register_room(actor) {
            return Err(RentalError::NotAuthorized);
        }
        if rent_price == 0 {
            return Err(RentalError::Validation(
                "rentPrice must be greater than zero".to_string(),
            ));
        }

        let room = Room {
            id: room_id.map(RoomId).unwrap_or_else(next_room_id),
            host: actor.id.clone(),
            rent_price,
            status: RoomStatus::Draft,
        };

        match self.store.insert_room(room) {
            Ok(room) => Ok(room),
            Err(StoreError::Duplicate) => Err(RentalError::AlreadyRegistered),
            Err(other) => Err(RentalError::from_store(other, "room")),
        }
    }

    pub fn get(&self, room_id: &RoomId) -> Result<Room, RentalError> {
        self.store
            .fetch_room(room_id)?
            .ok_or(RentalError::NotFound("room"))
    }

    /// Pull the room from circulation for upkeep.
    pub fn flag_maintenance(&self, actor: &Actor, room_id: &RoomId) -> Result<Room, RentalError> {
        let room = self.get(room_id)?;
        if !policy::can_flag_maintenance(actor, &room) {
            return Err(RentalError::NotAuthorized);
        }
        self.store
            .flag_maintenance(room_id)
            .map_err(|err| RentalError::from_store(err, "room"))
    }
}
