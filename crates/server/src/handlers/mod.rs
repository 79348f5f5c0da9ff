//! HTTP request handlers.

pub mod batches;
pub mod commit;
pub mod common;
pub mod finalize;
pub mod pages;
pub mod stats;
pub mod submit;
pub mod workers;

pub use batches::*;
pub use commit::*;
pub use finalize::*;
pub use pages::*;
pub use stats::*;
pub use submit::*;
pub use workers::*;
