//! Rental lifecycle and payment-settlement engine.
//!
//! Four linked state machines (listing approval, booking request, contract,
//! payment) plus the signed redirect / verified callback protocol against the
//! external payment gateway. Everything outside this module consumes the
//! engine through the services and the HTTP router defined here.

pub mod approvals;
pub mod bookings;
pub mod contracts;
pub mod domain;
pub mod gateway;
mod policy;
pub mod rooms;
pub mod router;
pub mod store;

#[cfg(test)]
mod tests;

use axum::http::StatusCode;

use store::StoreError;

pub use approvals::ApprovalService;
pub use bookings::{BookingRequest, BookingResolution, BookingService};
pub use contracts::ContractService;
pub use domain::{
    Actor, ActorRole, Approval, ApprovalDecision, ApprovalId, ApprovalStatus, Booking,
    BookingDecision, BookingId, BookingStatus, Contract, ContractId, ContractStatus, GatewayRef,
    Payment, PaymentId, PaymentStatus, Room, RoomId, RoomStatus, UserId,
};
pub use gateway::{CallbackOutcome, GatewayConfig, InitiatedPayment, PaymentService};
pub use rooms::RoomRegistry;
pub use router::{rental_router, RentalApi};
pub use store::{MemoryRentalStore, PaymentOutcome, RentalStore, Settlement};

/// Error surface shared by every workflow operation.
///
/// Conflict variants are kept distinct so a client can refresh and retry
/// against current state instead of blindly resubmitting.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum RentalError {
    #[error("invalid request: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("operation not permitted for this actor")]
    NotAuthorized,
    #[error("roomId is already registered")]
    AlreadyRegistered,
    #[error("a pending approval already exists for this room")]
    AlreadySubmitted,
    #[error("approval has already been decided")]
    AlreadyDecided,
    #[error("room is not open for booking")]
    RoomNotAvailable,
    #[error("current state does not permit this transition")]
    InvalidTransition,
    #[error("room already has an active contract")]
    RoomAlreadyRented,
    #[error("callback signature verification failed")]
    GatewayVerification,
}

impl RentalError {
    /// HTTP mapping used by the router and the crate-level error type.
    pub fn status_code(&self) -> StatusCode {
        match self {
            RentalError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RentalError::NotFound(_) => StatusCode::NOT_FOUND,
            RentalError::NotAuthorized => StatusCode::FORBIDDEN,
            RentalError::AlreadyRegistered
            | RentalError::AlreadySubmitted
            | RentalError::AlreadyDecided
            | RentalError::InvalidTransition
            | RentalError::RoomAlreadyRented => StatusCode::CONFLICT,
            RentalError::RoomNotAvailable => StatusCode::CONFLICT,
            RentalError::GatewayVerification => StatusCode::BAD_REQUEST,
        }
    }

    /// Fallback mapping for store errors the call site has no more specific
    /// translation for.
    pub(crate) fn from_store(err: StoreError, entity: &'static str) -> Self {
        match err {
            StoreError::NotFound => RentalError::NotFound(entity),
            StoreError::Duplicate => {
                RentalError::Validation(format!("{entity} already exists"))
            }
            StoreError::StalePending => RentalError::InvalidTransition,
            StoreError::RoomOccupied => RentalError::RoomAlreadyRented,
        }
    }
}

impl From<StoreError> for RentalError {
    fn from(err: StoreError) -> Self {
        RentalError::from_store(err, "record")
    }
}
