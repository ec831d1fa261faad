use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use chrono::NaiveDate;

use crate::workflows::rental::domain::{Actor, ActorRole, Room, RoomId, RoomStatus, UserId};
use crate::workflows::rental::gateway::service::params;
use crate::workflows::rental::gateway::{signing, GatewayConfig, PaymentService};
use crate::workflows::rental::store::{MemoryRentalStore, RentalStore};
use crate::workflows::rental::{ApprovalService, BookingService, ContractService, RoomRegistry};

pub(super) const TEST_SECRET: &str = "test-gateway-secret";

pub(super) fn admin() -> Actor {
    Actor::new("admin-1", ActorRole::Admin)
}

pub(super) fn host() -> Actor {
    Actor::new("host-1", ActorRole::Host)
}

pub(super) fn tenant() -> Actor {
    Actor::new("tenant-1", ActorRole::Tenant)
}

pub(super) fn other_tenant() -> Actor {
    Actor::new("tenant-2", ActorRole::Tenant)
}

pub(super) fn stay_dates() -> (NaiveDate, NaiveDate) {
    let start = NaiveDate::from_ymd_opt(2026, 9, 1).expect("valid start date");
    let end = NaiveDate::from_ymd_opt(2026, 12, 1).expect("valid end date");
    (start, end)
}

pub(super) fn gateway_config() -> GatewayConfig {
    GatewayConfig {
        endpoint: "https://gateway.test/pay".to_string(),
        secret: TEST_SECRET.to_string(),
        return_url: "http://127.0.0.1:3000/payments/callback".to_string(),
        result_page: "http://127.0.0.1:3000/payments/result".to_string(),
        locale: "en".to_string(),
    }
}

pub(super) struct Fixture {
    pub store: Arc<MemoryRentalStore>,
    pub rooms: RoomRegistry<MemoryRentalStore>,
    pub approvals: ApprovalService<MemoryRentalStore>,
    pub bookings: BookingService<MemoryRentalStore>,
    pub contracts: Arc<ContractService<MemoryRentalStore>>,
    pub payments: PaymentService<MemoryRentalStore>,
}

pub(super) fn fixture() -> Fixture {
    let store = Arc::new(MemoryRentalStore::default());
    let contracts = Arc::new(ContractService::new(store.clone()));
    Fixture {
        rooms: RoomRegistry::new(store.clone()),
        approvals: ApprovalService::new(store.clone()),
        bookings: BookingService::new(store.clone(), contracts.clone()),
        contracts,
        payments: PaymentService::new(store.clone(), gateway_config()),
        store,
    }
}

/// Seed a room directly in the store, bypassing the approval workflow.
pub(super) fn seed_room(
    store: &MemoryRentalStore,
    id: &str,
    host: &Actor,
    status: RoomStatus,
) -> Room {
    seed_priced_room(store, id, host, status, 4_500_000)
}

pub(super) fn seed_priced_room(
    store: &MemoryRentalStore,
    id: &str,
    host: &Actor,
    status: RoomStatus,
    rent_price: u64,
) -> Room {
    let room = Room {
        id: RoomId(id.to_string()),
        host: UserId(host.id.0.clone()),
        rent_price,
        status,
    };
    store.insert_room(room).expect("room seeds")
}

/// A callback payload signed the way the gateway would sign it.
pub(super) fn signed_callback(
    gateway_ref: &str,
    response_code: &str,
    bank_ref: Option<&str>,
) -> HashMap<String, String> {
    let mut fields = BTreeMap::new();
    fields.insert(params::REF.to_string(), gateway_ref.to_string());
    fields.insert(params::RESPONSE_CODE.to_string(), response_code.to_string());
    if let Some(bank_ref) = bank_ref {
        fields.insert(params::BANK_REF.to_string(), bank_ref.to_string());
    }

    let mac = signing::sign(&signing::canonical_query(&fields), TEST_SECRET);
    let mut payload: HashMap<String, String> = fields.into_iter().collect();
    payload.insert(signing::SIGNATURE_PARAM.to_string(), mac);
    payload
}
