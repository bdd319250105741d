//! Core use-case services.
//!
//! # Responsibility
//! - Orchestrate repository calls and outbound collaborators into
//!   use-case level APIs.
//! - Own authorization and validation decisions; repositories stay
//!   storage-only.

pub mod account_service;
pub mod dependent_service;
pub mod ownership_service;
pub mod project_service;
pub mod version_service;
