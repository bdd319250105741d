//! Outbound collaborator seams.
//!
//! # Responsibility
//! - Describe what the core hands to external systems: stop commands for
//!   the scheduler, audit events for trackers and activity logs, and
//!   artifact cleanup requests.
//! - Provide in-process implementations used by the CLI and tests.
//!
//! # Invariants
//! - Services depend on the traits only; transports stay replaceable.

pub mod artifacts;
pub mod auditor;
pub mod dispatcher;
