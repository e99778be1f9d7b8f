//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod avatar_repo;
pub mod job_queue;

pub use avatar_repo::AvatarRepo;
pub use job_queue::{JobQueue, QueueError};
