//! Staffdesk Domain Types
//!
//! This crate defines the domain types for the Staffdesk request
//! lifecycle platform: monetized requests (compensation claims, expense
//! reimbursements, support tickets) that move through role-gated
//! approval stages.
//!
//! # Key Concepts
//!
//! - **Request**: a Compensation, Expense, or Ticket instance subject to
//!   the lifecycle engine. Its `state` only moves along the directed
//!   transition graph defined for its kind.
//! - **Role**: the closed set of domain roles: collaborator (owner),
//!   reviewer (first-line approval, community-scoped) and admin
//!   (final approval, unscoped).
//! - **HistoryEntry**: one immutable audit record per transition. The
//!   ordered `new_state` sequence of a request's history is a valid walk
//!   of its kind's transition graph.
//! - **Notification / NotificationSetting**: in-app and email delivery
//!   preferences keyed by `(event, role)`; a missing row means both
//!   channels are enabled (fail-open).
//!
//! # Design Principles
//!
//! 1. Closed enumerations everywhere. Unknown role/state/event strings
//!    are rejected at the serde boundary, never deep inside the engine.
//! 2. This is a pure types crate with no runtime dependencies. All types
//!    implement `Clone`, `Debug`, `Serialize`, `Deserialize`. IDs use the
//!    newtype pattern and implement `Display`, `generate()`, and `new()`.

#![deny(unsafe_code)]

mod attachment;
mod errors;
mod history;
mod ids;
mod notification;
mod request;
mod role;

pub use attachment::*;
pub use errors::*;
pub use history::*;
pub use ids::*;
pub use notification::*;
pub use request::*;
pub use role::*;
