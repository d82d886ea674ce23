//! # Entity State Machines
//!
//! Status definitions and transition rules for the fulfillment entities.
//! States persist as snake_case strings; rows carry `String` columns and the
//! logic layer parses them into these enums at the boundary.
//!
//! Transition legality lives here as pure functions so handlers and tests
//! share one source of truth. The actual race-closing happens at the storage
//! layer with conditional updates, not in process.

pub mod states;
pub mod transitions;

pub use states::{ApprovalStatus, JobStatus, OrderStatus, RetryItemStatus, SongStatus};
pub use transitions::{order_target_state, OrderEvent, TransitionError};
