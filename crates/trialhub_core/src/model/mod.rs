//! Domain model for ownership and project lifecycle bookkeeping.
//!
//! # Responsibility
//! - Define canonical records shared by repositories and services.
//! - Keep owner targets and dependent kinds closed, typed sets.
//!
//! # Invariants
//! - Every record is identified by a typed UUID newtype.
//! - Lifecycle rules live here, not in storage.

pub mod account;
pub mod ids;
pub mod lifecycle;
pub mod owner;
pub mod project;
pub mod validation;
pub mod version;
