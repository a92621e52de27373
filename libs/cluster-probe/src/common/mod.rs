//! Error taxonomy and helpers shared by the connection layer and the probe

pub mod error;
pub mod retry;

pub use error::{ProbeError, ProbeResult};
pub use retry::{Backoff, retry_with_backoff};
