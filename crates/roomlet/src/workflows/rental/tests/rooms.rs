use super::common::*;
use crate::workflows::rental::domain::RoomStatus;
use crate::workflows::rental::RentalError;

#[test]
fn register_creates_draft_room_for_host() {
    let f = fixture();
    let host = host();

    let room = f
        .rooms
        .register(&host, Some("room42".to_string()), 900)
        .expect("registration succeeds");

    assert_eq!(room.status, RoomStatus::Draft);
    assert_eq!(room.host, host.id);
    assert_eq!(room.rent_price, 900);
}

#[test]
fn register_rejects_zero_rent() {
    let f = fixture();
    match f.rooms.register(&host(), None, 0) {
        Err(RentalError::Validation(_)) => {}
        other => panic!("expected validation failure, got {other:?}"),
    }
}

#[test]
fn duplicate_room_id_conflicts() {
    let f = fixture();
    f.rooms
        .register(&host(), Some("room42".to_string()), 900)
        .expect("first registration succeeds");

    match f.rooms.register(&host(), Some("room42".to_string()), 1200) {
        Err(RentalError::AlreadyRegistered) => {}
        other => panic!("expected registration conflict, got {other:?}"),
    }
    assert_eq!(
        RentalError::AlreadyRegistered.status_code(),
        axum::http::StatusCode::CONFLICT
    );
}

#[test]
fn register_rejected_for_tenants() {
    let f = fixture();
    match f.rooms.register(&tenant(), None, 900) {
        Err(RentalError::NotAuthorized) => {}
        other => panic!("expected authorization failure, got {other:?}"),
    }
}
