use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};

use super::domain::{
    Approval, ApprovalDecision, ApprovalId, ApprovalStatus, Booking, BookingId, BookingStatus,
    Contract, ContractId, ContractStatus, GatewayRef, Payment, PaymentStatus, Room, RoomId,
    RoomStatus,
};

/// Storage abstraction whose methods are the atomic transitions of the
/// lifecycle. Compound operations (approval + room flip, booking acceptance +
/// contract insert + room flip, payment compare-and-set) must execute as a
/// single all-or-nothing unit; two racing callers observe exactly one winner.
pub trait RentalStore: Send + Sync {
    fn insert_room(&self, room: Room) -> Result<Room, StoreError>;
    fn fetch_room(&self, id: &RoomId) -> Result<Option<Room>, StoreError>;
    /// Take the room out of circulation; an ended contract will no longer
    /// flip it back to `available`.
    fn flag_maintenance(&self, id: &RoomId) -> Result<Room, StoreError>;

    /// Record a listing submission unless one is already pending for the
    /// room. Fails `StalePending` when the room is not in a submittable
    /// state (`draft` or `rejected`): an `available` room must never sit
    /// behind a pending approval.
    fn submit_approval(&self, approval: Approval) -> Result<Approval, StoreError>;
    fn fetch_approval(&self, id: &ApprovalId) -> Result<Option<Approval>, StoreError>;
    /// Apply the verdict and the resulting room status in one unit. Fails
    /// `StalePending` when the approval was already decided.
    fn decide_approval(
        &self,
        id: &ApprovalId,
        decision: ApprovalDecision,
    ) -> Result<Approval, StoreError>;

    fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError>;
    fn fetch_booking(&self, id: &BookingId) -> Result<Option<Booking>, StoreError>;
    /// Move a pending booking to `rejected`. Fails `StalePending` otherwise.
    fn reject_booking(&self, id: &BookingId) -> Result<Booking, StoreError>;

    /// The acceptance triad: booking `pending -> accepted`, contract
    /// inserted `active`, room `-> rented`, all conditional on no active
    /// contract existing for the room. Fails `RoomOccupied` without any
    /// partial effect when the invariant check loses.
    fn commit_contract(
        &self,
        booking_id: &BookingId,
        contract: Contract,
    ) -> Result<Contract, StoreError>;
    fn fetch_contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError>;
    fn active_contract_for_room(&self, room_id: &RoomId) -> Result<Option<Contract>, StoreError>;
    /// Contract `active -> ended` plus the room back to `available` unless it
    /// was independently moved to `maintenance`.
    fn end_contract(&self, id: &ContractId) -> Result<(Contract, Room), StoreError>;

    /// Persist a pending payment attempt; the gateway reference is unique.
    fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError>;
    fn fetch_payment(&self, gateway_ref: &GatewayRef) -> Result<Option<Payment>, StoreError>;
    /// Compare-and-set `pending -> paid|failed`. A payment that is already
    /// terminal is returned unchanged with `replayed = true`; duplicate
    /// notifications collapse to one effective transition.
    fn settle_payment(
        &self,
        gateway_ref: &GatewayRef,
        outcome: PaymentOutcome,
    ) -> Result<Settlement, StoreError>;
}

/// Terminal result a verified callback resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PaymentOutcome {
    Success {
        response_code: String,
        bank_ref: Option<String>,
        paid_at: DateTime<Utc>,
    },
    Failure {
        response_code: String,
    },
}

/// Stored payment after a settlement attempt, flagged when the notification
/// was a replay of one already applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settlement {
    pub payment: Payment,
    pub replayed: bool,
}

/// Error enumeration for store failures.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum StoreError {
    #[error("record not found")]
    NotFound,
    #[error("record already exists")]
    Duplicate,
    #[error("record is no longer pending")]
    StalePending,
    #[error("room already has an active contract")]
    RoomOccupied,
}

#[derive(Default)]
struct StoreState {
    rooms: HashMap<RoomId, Room>,
    approvals: HashMap<ApprovalId, Approval>,
    bookings: HashMap<BookingId, Booking>,
    contracts: HashMap<ContractId, Contract>,
    payments: HashMap<GatewayRef, Payment>,
}

impl StoreState {
    fn active_contract(&self, room_id: &RoomId) -> Option<&Contract> {
        self.contracts
            .values()
            .find(|contract| contract.room_id == *room_id && contract.status == ContractStatus::Active)
    }
}

/// In-memory store backing the service and the test suites. One mutex over
/// the whole state makes every trait method a single critical section, which
/// is what gives the compound transitions their atomicity.
#[derive(Default, Clone)]
pub struct MemoryRentalStore {
    state: Arc<Mutex<StoreState>>,
}

impl MemoryRentalStore {
    fn locked(&self) -> std::sync::MutexGuard<'_, StoreState> {
        self.state.lock().expect("rental store mutex poisoned")
    }
}

impl RentalStore for MemoryRentalStore {
    fn insert_room(&self, room: Room) -> Result<Room, StoreError> {
        let mut state = self.locked();
        if state.rooms.contains_key(&room.id) {
            return Err(StoreError::Duplicate);
        }
        state.rooms.insert(room.id.clone(), room.clone());
        Ok(room)
    }

    fn fetch_room(&self, id: &RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.locked().rooms.get(id).cloned())
    }

    fn flag_maintenance(&self, id: &RoomId) -> Result<Room, StoreError> {
        let mut state = self.locked();
        let room = state.rooms.get_mut(id).ok_or(StoreError::NotFound)?;
        room.status = RoomStatus::Maintenance;
        Ok(room.clone())
    }

    fn submit_approval(&self, approval: Approval) -> Result<Approval, StoreError> {
        let mut state = self.locked();
        let room = state
            .rooms
            .get(&approval.room_id)
            .ok_or(StoreError::NotFound)?;
        if !matches!(room.status, RoomStatus::Draft | RoomStatus::Rejected) {
            return Err(StoreError::StalePending);
        }
        let pending_exists = state
            .approvals
            .values()
            .any(|existing| {
                existing.room_id == approval.room_id && existing.status == ApprovalStatus::Pending
            });
        if pending_exists {
            return Err(StoreError::Duplicate);
        }
        state
            .approvals
            .insert(approval.id.clone(), approval.clone());
        Ok(approval)
    }

    fn fetch_approval(&self, id: &ApprovalId) -> Result<Option<Approval>, StoreError> {
        Ok(self.locked().approvals.get(id).cloned())
    }

    fn decide_approval(
        &self,
        id: &ApprovalId,
        decision: ApprovalDecision,
    ) -> Result<Approval, StoreError> {
        let mut state = self.locked();
        let room_id = {
            let approval = state.approvals.get(id).ok_or(StoreError::NotFound)?;
            if approval.status != ApprovalStatus::Pending {
                return Err(StoreError::StalePending);
            }
            approval.room_id.clone()
        };
        if !state.rooms.contains_key(&room_id) {
            return Err(StoreError::NotFound);
        }

        let approval = state
            .approvals
            .get_mut(id)
            .ok_or(StoreError::NotFound)?;
        approval.status = match decision {
            ApprovalDecision::Approved => ApprovalStatus::Approved,
            ApprovalDecision::Rejected => ApprovalStatus::Rejected,
        };
        let decided = approval.clone();

        let room = state.rooms.get_mut(&room_id).ok_or(StoreError::NotFound)?;
        room.status = match decision {
            ApprovalDecision::Approved => RoomStatus::Available,
            ApprovalDecision::Rejected => RoomStatus::Rejected,
        };

        Ok(decided)
    }

    fn insert_booking(&self, booking: Booking) -> Result<Booking, StoreError> {
        let mut state = self.locked();
        if state.bookings.contains_key(&booking.id) {
            return Err(StoreError::Duplicate);
        }
        state.bookings.insert(booking.id.clone(), booking.clone());
        Ok(booking)
    }

    fn fetch_booking(&self, id: &BookingId) -> Result<Option<Booking>, StoreError> {
        Ok(self.locked().bookings.get(id).cloned())
    }

    fn reject_booking(&self, id: &BookingId) -> Result<Booking, StoreError> {
        let mut state = self.locked();
        let booking = state.bookings.get_mut(id).ok_or(StoreError::NotFound)?;
        if booking.status != BookingStatus::Pending {
            return Err(StoreError::StalePending);
        }
        booking.status = BookingStatus::Rejected;
        Ok(booking.clone())
    }

    fn commit_contract(
        &self,
        booking_id: &BookingId,
        contract: Contract,
    ) -> Result<Contract, StoreError> {
        let mut state = self.locked();

        match state.bookings.get(booking_id) {
            None => return Err(StoreError::NotFound),
            Some(booking) if booking.status != BookingStatus::Pending => {
                return Err(StoreError::StalePending)
            }
            Some(_) => {}
        }
        if !state.rooms.contains_key(&contract.room_id) {
            return Err(StoreError::NotFound);
        }
        if state.active_contract(&contract.room_id).is_some() {
            return Err(StoreError::RoomOccupied);
        }

        // All checks passed; apply the triad under the same lock.
        if let Some(booking) = state.bookings.get_mut(booking_id) {
            booking.status = BookingStatus::Accepted;
        }
        if let Some(room) = state.rooms.get_mut(&contract.room_id) {
            room.status = RoomStatus::Rented;
        }
        state
            .contracts
            .insert(contract.id.clone(), contract.clone());
        Ok(contract)
    }

    fn fetch_contract(&self, id: &ContractId) -> Result<Option<Contract>, StoreError> {
        Ok(self.locked().contracts.get(id).cloned())
    }

    fn active_contract_for_room(&self, room_id: &RoomId) -> Result<Option<Contract>, StoreError> {
        Ok(self.locked().active_contract(room_id).cloned())
    }

    fn end_contract(&self, id: &ContractId) -> Result<(Contract, Room), StoreError> {
        let mut state = self.locked();
        let room_id = {
            let contract = state.contracts.get(id).ok_or(StoreError::NotFound)?;
            if contract.status != ContractStatus::Active {
                return Err(StoreError::StalePending);
            }
            contract.room_id.clone()
        };
        if !state.rooms.contains_key(&room_id) {
            return Err(StoreError::NotFound);
        }

        let contract = state.contracts.get_mut(id).ok_or(StoreError::NotFound)?;
        contract.status = ContractStatus::Ended;
        let ended = contract.clone();

        let room = state.rooms.get_mut(&room_id).ok_or(StoreError::NotFound)?;
        if room.status != RoomStatus::Maintenance {
            room.status = RoomStatus::Available;
        }

        Ok((ended, room.clone()))
    }

    fn insert_payment(&self, payment: Payment) -> Result<Payment, StoreError> {
        let mut state = self.locked();
        if state.payments.contains_key(&payment.gateway_ref) {
            return Err(StoreError::Duplicate);
        }
        state
            .payments
            .insert(payment.gateway_ref.clone(), payment.clone());
        Ok(payment)
    }

    fn fetch_payment(&self, gateway_ref: &GatewayRef) -> Result<Option<Payment>, StoreError> {
        Ok(self.locked().payments.get(gateway_ref).cloned())
    }

    fn settle_payment(
        &self,
        gateway_ref: &GatewayRef,
        outcome: PaymentOutcome,
    ) -> Result<Settlement, StoreError> {
        let mut state = self.locked();
        let payment = state
            .payments
            .get_mut(gateway_ref)
            .ok_or(StoreError::NotFound)?;

        if payment.status.is_terminal() {
            return Ok(Settlement {
                payment: payment.clone(),
                replayed: true,
            });
        }

        match outcome {
            PaymentOutcome::Success {
                response_code,
                bank_ref,
                paid_at,
            } => {
                payment.status = PaymentStatus::Paid;
                payment.response_code = Some(response_code);
                payment.bank_ref = bank_ref;
                payment.paid_at = Some(paid_at);
            }
            PaymentOutcome::Failure { response_code } => {
                payment.status = PaymentStatus::Failed;
                payment.response_code = Some(response_code);
            }
        }

        Ok(Settlement {
            payment: payment.clone(),
            replayed: false,
        })
    }
}
