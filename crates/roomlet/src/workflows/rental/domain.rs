use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Identifier wrapper for rooms owned by the external registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoomId(pub String);

/// Identifier wrapper for listing approval submissions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ApprovalId(pub String);

/// Identifier wrapper for tenant booking requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookingId(pub String);

/// Identifier wrapper for binding rental contracts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContractId(pub String);

/// Identifier wrapper for payment attempts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PaymentId(pub String);

/// Correlation reference handed to the external gateway, unique per attempt.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GatewayRef(pub String);

/// Identifier wrapper for marketplace users (tenants, hosts, admins).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct UserId(pub String);

/// Role an authenticated caller acts under for a single request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    Tenant,
    Host,
    Admin,
}

impl ActorRole {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "tenant" => Some(Self::Tenant),
            "host" => Some(Self::Host),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }
}

/// The caller identity every workflow operation is authorized against.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Actor {
    pub id: UserId,
    pub role: ActorRole,
}

impl Actor {
    pub fn new(id: impl Into<String>, role: ActorRole) -> Self {
        Self {
            id: UserId(id.into()),
            role,
        }
    }
}

/// Visibility state of a room in the external registry.
///
/// The engine is the single writer of the transitions it performs; a room is
/// never observable in an intermediate value between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    Draft,
    Available,
    Rented,
    Maintenance,
    Rejected,
}

impl RoomStatus {
    pub const fn label(self) -> &'static str {
        match self {
            RoomStatus::Draft => "draft",
            RoomStatus::Available => "available",
            RoomStatus::Rented => "rented",
            RoomStatus::Maintenance => "maintenance",
            RoomStatus::Rejected => "rejected",
        }
    }
}

/// The slice of a registry room record this engine reads and writes. Listing
/// content (title, photos, amenities) stays with the registry; the engine
/// only needs the owner, the advertised price, and the status it mutates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: RoomId,
    pub host: UserId,
    pub rent_price: u64,
    pub status: RoomStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ApprovalStatus::Pending => "pending",
            ApprovalStatus::Approved => "approved",
            ApprovalStatus::Rejected => "rejected",
        }
    }
}

/// A listing submission awaiting an admin decision. Terminal once decided.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Approval {
    pub id: ApprovalId,
    pub room_id: RoomId,
    pub requested_by: UserId,
    pub status: ApprovalStatus,
    pub note: String,
    pub requested_at: DateTime<Utc>,
}

/// Admin verdict on a pending listing submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approved,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    Pending,
    Accepted,
    Rejected,
}

impl BookingStatus {
    pub const fn label(self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Accepted => "accepted",
            BookingStatus::Rejected => "rejected",
        }
    }
}

/// A tenant's request to rent a room for a date range. Terminal once resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    pub id: BookingId,
    pub room_id: RoomId,
    pub tenant: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub note: String,
    pub status: BookingStatus,
}

/// Host/admin verdict on a pending booking request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookingDecision {
    Accepted,
    Rejected,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractStatus {
    Active,
    Ended,
}

impl ContractStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ContractStatus::Active => "active",
            ContractStatus::Ended => "ended",
        }
    }
}

/// The binding agreement created from exactly one accepted booking.
///
/// At most one contract per room is `active` at any observable instant; the
/// contract is the source of truth for room occupancy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: ContractId,
    pub booking_id: BookingId,
    pub room_id: RoomId,
    pub tenant: UserId,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub duration_days: i64,
    pub rent_price: u64,
    pub terms: String,
    pub status: ContractStatus,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentStatus {
    Pending,
    Paid,
    Failed,
}

impl PaymentStatus {
    pub const fn label(self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, PaymentStatus::Paid | PaymentStatus::Failed)
    }
}

/// One settlement attempt against an active contract.
///
/// Amount is immutable after creation; status moves `pending -> paid|failed`
/// exactly once and the record is kept forever as the audit trail.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Payment {
    pub id: PaymentId,
    pub contract_id: ContractId,
    pub tenant: UserId,
    pub amount: u64,
    pub gateway_ref: GatewayRef,
    pub status: PaymentStatus,
    pub response_code: Option<String>,
    pub bank_ref: Option<String>,
    pub paid_at: Option<DateTime<Utc>>,
}
