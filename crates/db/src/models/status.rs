//! Status helper enum mapping to the SMALLINT column on `avatar_jobs`.

/// Status ID type matching SMALLINT in the database.
pub type StatusId = i16;

/// Lifecycle status of a queued avatar job.
///
/// Discriminants match the values written by the migration default and
/// the queue repository.
#[repr(i16)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending = 1,
    Running = 2,
    Completed = 3,
    Failed = 4,
}

impl JobStatus {
    /// Return the database status ID.
    pub fn id(self) -> StatusId {
        self as StatusId
    }
}

impl From<JobStatus> for StatusId {
    fn from(value: JobStatus) -> Self {
        value as StatusId
    }
}
