//! Staffdesk Request Lifecycle Engine
//!
//! The state machine shared by every request kind. It decides which
//! role may move a request along which edge, enforces the side
//! constraints tied to state (attachments only while editable), writes
//! one immutable audit record per transition, and hands committed
//! transitions to the notification dispatcher without waiting for
//! delivery.
//!
//! # Design Principles
//!
//! 1. Permissions are data, not code. Every edge lives in one
//!    declarative [`TransitionTable`] row: `(kind, from, to)` with its
//!    role allow-list and event key. Adding a role or an edge is a
//!    table change.
//! 2. One writer per request. State compare-and-swap and the audit
//!    append share a per-request critical section; different requests
//!    proceed fully in parallel.
//! 3. Authorization happens here, once. Whatever the underlying store
//!    also checks, the engine never relies on it alone.

#![deny(unsafe_code)]

mod engine;
mod store;
mod table;

pub use engine::*;
pub use store::*;
pub use table::*;
