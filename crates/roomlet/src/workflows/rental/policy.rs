//! Per-operation authorization checks.
//!
//! Every workflow entry point funnels its role/ownership precondition through
//! one small `(actor, resource) -> bool` function here instead of inlining
//! role conditionals at call sites.

use super::domain::{Actor, ActorRole, Contract, Payment, Room};

pub(crate) fn can_register_room(actor: &Actor) -> bool {
    matches!(actor.role, ActorRole::Host | ActorRole::Admin)
}

pub(crate) fn can_flag_maintenance(actor: &Actor, room: &Room) -> bool {
    match actor.role {
        ActorRole::Admin => true,
        ActorRole::Host => actor.id == room.host,
        ActorRole::Tenant => false,
    }
}

pub(crate) fn can_submit_listing(actor: &Actor, room: &Room) -> bool {
    match actor.role {
        ActorRole::Admin => true,
        ActorRole::Host => actor.id == room.host,
        ActorRole::Tenant => false,
    }
}

/// Listing decisions are admin-only regardless of who submitted.
pub(crate) fn can_decide_listing(actor: &Actor) -> bool {
    matches!(actor.role, ActorRole::Admin)
}

pub(crate) fn can_create_booking(actor: &Actor) -> bool {
    matches!(actor.role, ActorRole::Tenant)
}

pub(crate) fn can_resolve_booking(actor: &Actor, room: &Room) -> bool {
    match actor.role {
        ActorRole::Admin => true,
        ActorRole::Host => actor.id == room.host,
        ActorRole::Tenant => false,
    }
}

pub(crate) fn can_end_contract(actor: &Actor, contract: &Contract, room: &Room) -> bool {
    match actor.role {
        ActorRole::Admin => true,
        ActorRole::Host => actor.id == room.host,
        ActorRole::Tenant => actor.id == contract.tenant,
    }
}

pub(crate) fn can_view_contract(actor: &Actor, contract: &Contract, room: &Room) -> bool {
    can_end_contract(actor, contract, room)
}

pub(crate) fn can_initiate_payment(actor: &Actor, contract: &Contract) -> bool {
    matches!(actor.role, ActorRole::Tenant) && actor.id == contract.tenant
}

/// A gateway reference is not an authorization token; display reads stay
/// restricted to the owning tenant or an admin.
pub(crate) fn can_view_payment(actor: &Actor, payment: &Payment) -> bool {
    match actor.role {
        ActorRole::Admin => true,
        ActorRole::Tenant => actor.id == payment.tenant,
        ActorRole::Host => false,
    }
}
