//! Repository traits implemented by each metadata backend.

pub mod batches;
pub mod stats;
pub mod submissions;
pub mod workers;

pub use batches::BatchRepo;
pub use stats::StatsRepo;
pub use submissions::{SubmissionKind, SubmissionRepo};
pub use workers::WorkerRepo;
