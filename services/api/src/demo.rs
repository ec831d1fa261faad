use crate::infra::gateway_config;
use chrono::{Local, NaiveDate};
use clap::Args;
use roomlet::config::AppConfig;
use roomlet::error::AppError;
use roomlet::workflows::rental::gateway::service::{params, SUCCESS_CODE};
use roomlet::workflows::rental::gateway::signing;
use roomlet::workflows::rental::{
    Actor, ActorRole, ApprovalDecision, BookingDecision, BookingRequest, MemoryRentalStore,
    Payment, RentalApi,
};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

#[derive(Args, Debug, Default)]
pub(crate) struct DemoArgs {
    /// Stay start date (YYYY-MM-DD). Defaults to today.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) start_date: Option<NaiveDate>,
    /// Stay end date (YYYY-MM-DD). Defaults to start_date + 90 days.
    #[arg(long, value_parser = crate::infra::parse_date)]
    pub(crate) end_date: Option<NaiveDate>,
    /// Monthly rent for the demo room, in currency units.
    #[arg(long, default_value_t = 4_500_000)]
    pub(crate) rent_price: u64,
    /// Simulate a declined payment instead of a successful one.
    #[arg(long)]
    pub(crate) declined: bool,
}

/// Walk the whole lifecycle in-process: a host lists a room, an admin
/// approves it, a tenant books and the host accepts, then a payment is
/// initiated and reconciled from a simulated gateway callback.
pub(crate) fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs {
        start_date,
        end_date,
        rent_price,
        declined,
    } = args;

    let start_date = start_date.unwrap_or_else(|| Local::now().date_naive());
    let end_date = end_date.unwrap_or(start_date + chrono::Duration::days(90));

    let config = AppConfig::load()?;
    let store = Arc::new(MemoryRentalStore::default());
    let api = RentalApi::new(store, gateway_config(&config.gateway));

    let host = Actor::new("host-demo", ActorRole::Host);
    let admin = Actor::new("admin-demo", ActorRole::Admin);
    let tenant = Actor::new("tenant-demo", ActorRole::Tenant);

    println!("Rental lifecycle demo");

    let room = api.rooms.register(&host, None, rent_price)?;
    println!(
        "- {} registered room {} at {} / month ({})",
        host.id.0,
        room.id.0,
        room.rent_price,
        room.status.label()
    );

    let approval = api
        .approvals
        .submit(&host, &room.id, "Ready for listing review")?;
    println!("- listing submitted for review as {}", approval.id.0);

    let approval = api
        .approvals
        .decide(&admin, &approval.id, ApprovalDecision::Approved)?;
    let room = api.rooms.get(&room.id)?;
    println!(
        "- {} approved {}; room is now {}",
        admin.id.0,
        approval.id.0,
        room.status.label()
    );

    let booking = api.bookings.create(
        &tenant,
        BookingRequest {
            room_id: room.id.clone(),
            start_date,
            end_date,
            note: "Looking forward to the stay".to_string(),
        },
    )?;
    println!(
        "- {} requested {} from {} to {}",
        tenant.id.0, booking.id.0, booking.start_date, booking.end_date
    );

    let resolution = api
        .bookings
        .resolve(&host, &booking.id, BookingDecision::Accepted)?;
    let Some(contract) = resolution.contract else {
        println!("- acceptance produced no contract; nothing left to settle");
        return Ok(());
    };
    println!(
        "- {} accepted the booking; contract {} active for {} days",
        host.id.0, contract.id.0, contract.duration_days
    );

    let initiated = api.payments.initiate(
        &tenant,
        &contract.id,
        contract.rent_price,
        Some("First month's rent".to_string()),
        Some("203.0.113.10".to_string()),
    )?;
    println!(
        "- payment {} initiated (gateway ref {})",
        initiated.payment.id.0, initiated.payment.gateway_ref.0
    );
    println!("  redirect: {}", initiated.pay_url);

    let response_code = if declined { "54" } else { SUCCESS_CODE };
    let callback = signed_callback(
        &initiated.payment,
        response_code,
        &config.gateway.secret,
    );
    let outcome = api.payments.handle_callback(&callback)?;
    println!(
        "- gateway callback reconciled: payment is {}",
        outcome.payment.status.label()
    );

    let replay = api.payments.handle_callback(&callback)?;
    println!(
        "- same callback delivered again: replayed={}, status still {}",
        replay.replayed,
        replay.payment.status.label()
    );

    let settled = api
        .payments
        .query_result(&tenant, &initiated.payment.gateway_ref)?;
    match serde_json::to_string_pretty(&settled) {
        Ok(json) => println!("Final settlement record:\n{}", json),
        Err(err) => println!("Final settlement record unavailable: {}", err),
    }

    Ok(())
}

fn signed_callback(
    payment: &Payment,
    response_code: &str,
    secret: &str,
) -> HashMap<String, String> {
    let mut sorted = BTreeMap::new();
    sorted.insert(params::REF.to_string(), payment.gateway_ref.0.clone());
    sorted.insert(
        params::RESPONSE_CODE.to_string(),
        response_code.to_string(),
    );
    sorted.insert(
        params::AMOUNT.to_string(),
        (payment.amount * 100).to_string(),
    );
    if response_code == SUCCESS_CODE {
        sorted.insert(params::BANK_REF.to_string(), "DEMO-BANK-REF".to_string());
    }

    let mac = signing::sign(&signing::canonical_query(&sorted), secret);
    let mut callback: HashMap<String, String> = sorted.into_iter().collect();
    callback.insert(signing::SIGNATURE_PARAM.to_string(), mac);
    callback
}
