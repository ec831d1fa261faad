use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::info;

use super::contracts::ContractService;
use super::domain::{
    Actor, Booking, BookingDecision, BookingId, BookingStatus, Contract, RoomId, RoomStatus,
};
use super::policy;
use super::store::{RentalStore, StoreError};
use super::RentalError;

static BOOKING_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_booking_id() -> BookingId {
    let id = BOOKING_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    BookingId(format!("bkg-{id:06}"))
}

/// Intake payload for a tenant booking request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingRequest {
    pub room_id: RoomId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    #[serde(default)]
    pub note: String,
}

/// Result of resolving a booking; acceptance carries the contract created in
/// the same logical operation.
#[derive(Debug, Clone, Serialize)]
pub struct BookingResolution {
    pub booking: Booking,
    pub contract: Option<Contract>,
}

/// Tenant-initiated request workflow, resolved by the room's host or an
/// admin.
pub struct BookingService<S> {
    store: Arc<S>,
    contracts: Arc<ContractService<S>>,
}

impl<S: RentalStore> BookingService<S> {
    pub fn new(store: Arc<S>, contracts: Arc<ContractService<S>>) -> Self {
        Self { store, contracts }
    }

    /// Create a pending booking against an available room.
    pub fn create(&self, actor: &Actor, request: BookingRequest) -> Result<Booking, RentalError> {
        if !policy::can_create_booking(actor) {
            return Err(RentalError::NotAuthorized);
        }
        if request.end_date <= request.start_date {
            return Err(RentalError::Validation(
                "endDate must fall after startDate".to_string(),
            ));
        }

        let room = self
            .store
            .fetch_room(&request.room_id)?
            .ok_or(RentalError::NotFound("room"))?;
        if room.status != RoomStatus::Available {
            return Err(RentalError::RoomNotAvailable);
        }

        let booking = Booking {
            id: next_booking_id(),
            room_id: request.room_id,
            tenant: actor.id.clone(),
            start_date: request.start_date,
            end_date: request.end_date,
            note: request.note,
            status: BookingStatus::Pending,
        };

        let booking = self
            .store
            .insert_booking(booking)
            .map_err(|err| RentalError::from_store(err, "booking"))?;
        info!(booking = %booking.id.0, room = %booking.room_id.0, "booking requested");
        Ok(booking)
    }

    /// Resolve a pending booking.
    ///
    /// Acceptance delegates to the contract manager inside the same logical
    /// operation: when contract creation fails nothing is applied and the
    /// booking stays pending. A booking already resolved fails
    /// `InvalidTransition` either way.
    pub fn resolve(
        &self,
        actor: &Actor,
        booking_id: &BookingId,
        decision: BookingDecision,
    ) -> Result<BookingResolution, RentalError> {
        let booking = self.get(booking_id)?;
        let room = self
            .store
            .fetch_room(&booking.room_id)?
            .ok_or(RentalError::NotFound("room"))?;
        // Authorization comes first so an outside caller cannot probe the
        // booking's state through the transition guard.
        if !policy::can_resolve_booking(actor, &room) {
            return Err(RentalError::NotAuthorized);
        }
        if booking.status != BookingStatus::Pending {
            return Err(RentalError::InvalidTransition);
        }

        match decision {
            BookingDecision::Rejected => match self.store.reject_booking(booking_id) {
                Ok(booking) => {
                    info!(booking = %booking.id.0, "booking rejected");
                    Ok(BookingResolution {
                        booking,
                        contract: None,
                    })
                }
                Err(StoreError::StalePending) => Err(RentalError::InvalidTransition),
                Err(other) => Err(RentalError::from_store(other, "booking")),
            },
            BookingDecision::Accepted => {
                let contract = self.contracts.create_from_booking(actor, &booking)?;
                let booking = self.get(booking_id)?;
                info!(booking = %booking.id.0, contract = %contract.id.0, "booking accepted");
                Ok(BookingResolution {
                    booking,
                    contract: Some(contract),
                })
            }
        }
    }

    pub fn get(&self, booking_id: &BookingId) -> Result<Booking, RentalError> {
        self.store
            .fetch_booking(booking_id)?
            .ok_or(RentalError::NotFound("booking"))
    }
}
