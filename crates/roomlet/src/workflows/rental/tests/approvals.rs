use super::common::*;
use crate::workflows::rental::domain::{ApprovalDecision, ApprovalStatus, RoomId, RoomStatus};
use crate::workflows::rental::store::RentalStore;
use crate::workflows::rental::RentalError;

#[test]
fn submit_creates_pending_approval() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Draft);

    let approval = f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "ready to list")
        .expect("submission succeeds");

    assert_eq!(approval.status, ApprovalStatus::Pending);
    assert_eq!(approval.room_id.0, "room42");
    assert_eq!(approval.requested_by, host.id);
    assert_eq!(approval.note, "ready to list");
}

#[test]
fn listed_room_cannot_be_resubmitted() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Available);

    match f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "relist")
    {
        Err(RentalError::InvalidTransition) => {}
        other => panic!("expected transition guard, got {other:?}"),
    }
    // The room stays bookable; no approval was recorded against it.
    let room = f
        .store
        .fetch_room(&RoomId("room42".to_string()))
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::Available);
}

#[test]
fn rejected_room_may_be_resubmitted() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Rejected);

    let approval = f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "fixed the listing")
        .expect("resubmission succeeds");
    assert_eq!(approval.status, ApprovalStatus::Pending);
}

#[test]
fn submit_rejects_unknown_room() {
    let f = fixture();
    match f
        .approvals
        .submit(&host(), &RoomId("missing".to_string()), "")
    {
        Err(RentalError::NotFound("room")) => {}
        other => panic!("expected room not found, got {other:?}"),
    }
}

#[test]
fn submit_rejects_foreign_host() {
    let f = fixture();
    seed_room(&f.store, "room42", &host(), RoomStatus::Draft);
    let outsider = crate::workflows::rental::Actor::new(
        "host-9",
        crate::workflows::rental::ActorRole::Host,
    );

    match f.approvals.submit(&outsider, &RoomId("room42".to_string()), "") {
        Err(RentalError::NotAuthorized) => {}
        other => panic!("expected authorization failure, got {other:?}"),
    }
}

#[test]
fn duplicate_pending_submission_conflicts() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Draft);
    let room_id = RoomId("room42".to_string());

    f.approvals
        .submit(&host, &room_id, "first")
        .expect("first submission succeeds");
    match f.approvals.submit(&host, &room_id, "second") {
        Err(RentalError::AlreadySubmitted) => {}
        other => panic!("expected duplicate submission conflict, got {other:?}"),
    }
}

#[test]
fn decide_requires_admin() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Draft);
    let approval = f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "")
        .expect("submission succeeds");

    match f
        .approvals
        .decide(&host, &approval.id, ApprovalDecision::Approved)
    {
        Err(RentalError::NotAuthorized) => {}
        other => panic!("expected authorization failure, got {other:?}"),
    }
}

#[test]
fn approval_flips_room_to_available() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Draft);
    let approval = f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "")
        .expect("submission succeeds");

    let decided = f
        .approvals
        .decide(&admin(), &approval.id, ApprovalDecision::Approved)
        .expect("decision succeeds");

    assert_eq!(decided.status, ApprovalStatus::Approved);
    let room = f
        .store
        .fetch_room(&RoomId("room42".to_string()))
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::Available);
}

#[test]
fn rejection_flips_room_to_rejected() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Draft);
    let approval = f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "")
        .expect("submission succeeds");

    f.approvals
        .decide(&admin(), &approval.id, ApprovalDecision::Rejected)
        .expect("decision succeeds");

    let room = f
        .store
        .fetch_room(&RoomId("room42".to_string()))
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::Rejected);
}

#[test]
fn decided_approval_is_terminal() {
    let f = fixture();
    let host = host();
    seed_room(&f.store, "room42", &host, RoomStatus::Draft);
    let approval = f
        .approvals
        .submit(&host, &RoomId("room42".to_string()), "")
        .expect("submission succeeds");

    f.approvals
        .decide(&admin(), &approval.id, ApprovalDecision::Rejected)
        .expect("first decision succeeds");
    match f
        .approvals
        .decide(&admin(), &approval.id, ApprovalDecision::Approved)
    {
        Err(RentalError::AlreadyDecided) => {}
        other => panic!("expected terminal approval conflict, got {other:?}"),
    }

    // The losing decision must not have touched the room.
    let room = f
        .store
        .fetch_room(&RoomId("room42".to_string()))
        .expect("fetch succeeds")
        .expect("room present");
    assert_eq!(room.status, RoomStatus::Rejected);
}
