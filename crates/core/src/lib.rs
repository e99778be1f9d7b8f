//! Shared domain types for the Persona avatar pipeline.
//!
//! This crate holds the pieces every other crate depends on and has no
//! internal dependencies of its own:
//!
//! - [`job::AvatarJob`] — the immutable payload describing one
//!   avatar-creation request.
//! - [`staging`] — staged source-image lifecycle helpers (enqueue-time
//!   invariant check, idempotent removal).
//! - [`error::CoreError`] — the shared validation/IO error type.

pub mod error;
pub mod job;
pub mod staging;
pub mod types;

pub use error::CoreError;
pub use job::{AgeGroup, AvatarJob, Gender};
