use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tracing::info;

use super::domain::{Actor, Booking, Contract, ContractId, ContractStatus, Room};
use super::policy;
use super::store::{RentalStore, StoreError};
use super::RentalError;

static CONTRACT_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_contract_id() -> ContractId {
    let id = CONTRACT_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ContractId(format!("ctr-{id:06}"))
}

/// Converts accepted bookings into binding contracts and enforces the
/// one-active-contract-per-room invariant.
pub struct ContractService<S> {
    store: Arc<S>,
}

impl<S: RentalStore> ContractService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Turn a pending booking into an active contract.
    ///
    /// The booking flip, the contract insert, and the room status change are
    /// committed as one conditional unit keyed by the room; of two racing
    /// calls for the same room exactly one succeeds and the other observes
    /// `RoomAlreadyRented` with no partial effect.
    pub fn create_from_booking(
        &self,
        actor: &Actor,
        booking: &Booking,
    ) -> Result<Contract, RentalError> {
        let room = self
            .store
            .fetch_room(&booking.room_id)?
            .ok_or(RentalError::NotFound("room"))?;
        if !policy::can_resolve_booking(actor, &room) {
            return Err(RentalError::NotAuthorized);
        }

        let duration_days = (booking.end_date - booking.start_date).num_days();
        let contract = Contract {
            id: next_contract_id(),
            booking_id: booking.id.clone(),
            room_id: booking.room_id.clone(),
            tenant: booking.tenant.clone(),
            start_date: booking.start_date,
            end_date: booking.end_date,
            duration_days,
            rent_price: room.rent_price,
            terms: standard_terms(booking, &room),
            status: ContractStatus::Active,
        };

        match self.store.commit_contract(&booking.id, contract) {
            Ok(contract) => {
                info!(
                    contract = %contract.id.0,
                    room = %contract.room_id.0,
                    tenant = %contract.tenant.0,
                    "contract activated"
                );
                Ok(contract)
            }
            Err(StoreError::RoomOccupied) => Err(RentalError::RoomAlreadyRented),
            Err(StoreError::StalePending) => Err(RentalError::InvalidTransition),
            Err(other) => Err(RentalError::from_store(other, "booking")),
        }
    }

    /// End an active contract and release the room unless it was
    /// independently moved to maintenance.
    pub fn end(&self, actor: &Actor, contract_id: &ContractId) -> Result<Contract, RentalError> {
        let (contract, room) = self.fetch_with_room(contract_id)?;
        if !policy::can_end_contract(actor, &contract, &room) {
            return Err(RentalError::NotAuthorized);
        }

        match self.store.end_contract(contract_id) {
            Ok((ended, room)) => {
                info!(
                    contract = %ended.id.0,
                    room = %ended.room_id.0,
                    room_status = room.status.label(),
                    "contract ended"
                );
                Ok(ended)
            }
            Err(StoreError::StalePending) => Err(RentalError::InvalidTransition),
            Err(other) => Err(RentalError::from_store(other, "contract")),
        }
    }

    /// Fetch a contract, restricted to an admin, the room's host, or the
    /// contract's tenant.
    pub fn get(&self, actor: &Actor, contract_id: &ContractId) -> Result<Contract, RentalError> {
        let (contract, room) = self.fetch_with_room(contract_id)?;
        if !policy::can_view_contract(actor, &contract, &room) {
            return Err(RentalError::NotAuthorized);
        }
        Ok(contract)
    }

    pub fn active_for_room(
        &self,
        room_id: &super::domain::RoomId,
    ) -> Result<Option<Contract>, RentalError> {
        Ok(self.store.active_contract_for_room(room_id)?)
    }

    fn fetch_with_room(&self, contract_id: &ContractId) -> Result<(Contract, Room), RentalError> {
        let contract = self
            .store
            .fetch_contract(contract_id)?
            .ok_or(RentalError::NotFound("contract"))?;
        let room = self
            .store
            .fetch_room(&contract.room_id)?
            .ok_or(RentalError::NotFound("room"))?;
        Ok((contract, room))
    }
}

fn standard_terms(booking: &Booking, room: &Room) -> String {
    format!(
        "Rental of room {} from {} to {} at {} per term.",
        room.id.0, booking.start_date, booking.end_date, room.rent_price
    )
}
