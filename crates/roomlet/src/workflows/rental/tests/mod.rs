mod approvals;
mod common;
mod rooms;
