use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use tracing::info;

use super::domain::{Actor, Approval, ApprovalDecision, ApprovalId, ApprovalStatus, RoomId};
use super::policy;
use super::store::{RentalStore, StoreError};
use super::RentalError;

static APPROVAL_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_approval_id() -> ApprovalId {
    let id = APPROVAL_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    ApprovalId(format!("apv-{id:06}"))
}

/// Workflow gating a room's public visibility behind an admin decision.
pub struct ApprovalService<S> {
    store: Arc<S>,
}

impl<S: RentalStore> ApprovalService<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    /// Submit a room for listing review. Only `draft` and `rejected` rooms
    /// are submittable, and at most one submission per room may be pending
    /// at a time.
    pub fn submit(
        &self,
        actor: &Actor,
        room_id: &RoomId,
        note: impl Into<String>,
    ) -> Result<Approval, RentalError> {
        let room = self
            .store
            .fetch_room(room_id)?
            .ok_or(RentalError::NotFound("room"))?;
        if !policy::can_submit_listing(actor, &room) {
            return Err(RentalError::NotAuthorized);
        }

        let approval = Approval {
            id: next_approval_id(),
            room_id: room_id.clone(),
            requested_by: actor.id.clone(),
            status: ApprovalStatus::Pending,
            note: note.into(),
            requested_at: Utc::now(),
        };

        match self.store.submit_approval(approval) {
            Ok(approval) => {
                info!(approval = %approval.id.0, room = %room_id.0, "listing submitted for review");
                Ok(approval)
            }
            Err(StoreError::Duplicate) => Err(RentalError::AlreadySubmitted),
            Err(other) => Err(RentalError::from_store(other, "room")),
        }
    }

    /// Decide a pending submission. The verdict and the resulting room status
    /// are applied as one unit; a decided approval is terminal.
    pub fn decide(
        &self,
        actor: &Actor,
        approval_id: &ApprovalId,
        decision: ApprovalDecision,
    ) -> Result<Approval, RentalError> {
        if !policy::can_decide_listing(actor) {
            return Err(RentalError::NotAuthorized);
        }

        match self.store.decide_approval(approval_id, decision) {
            Ok(approval) => {
                info!(
                    approval = %approval.id.0,
                    room = %approval.room_id.0,
                    verdict = approval.status.label(),
                    "listing decided"
                );
                Ok(approval)
            }
            Err(StoreError::StalePending) => Err(RentalError::AlreadyDecided),
            Err(other) => Err(RentalError::from_store(other, "approval")),
        }
    }

    pub fn get(&self, approval_id: &ApprovalId) -> Result<Approval, RentalError> {
        self.store
            .fetch_approval(approval_id)?
            .ok_or(RentalError::NotFound("approval"))
    }
}
