use std::time::Duration;

/// Error taxonomy of the diagnostic probe.
///
/// Only [`ProbeError::Connection`] (and [`ProbeError::Config`], which happens
/// even earlier) may abort construction of a probe. The other variants are
/// absorbed into the report by the health check.
#[derive(Debug, thiserror::Error)]
pub enum ProbeError {
    /// Opening the diagnostic connection failed: unresolvable contact point,
    /// authentication failure, or the initial metadata read failed.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// Part of the cluster metadata could not be read.
    #[error("Metadata unavailable: {0}")]
    MetadataUnavailable(String),

    /// The liveness query failed or could not be iterated.
    #[error("Liveness query failed: {0}")]
    LivenessFailure(String),

    /// The liveness query did not complete in time.
    #[error("Liveness query timed out after {0:?}")]
    LivenessTimeout(Duration),

    /// Invalid probe configuration
    #[error("Configuration error: {0}")]
    Config(String),
}

impl ProbeError {
    /// Whether the error must abort probe construction.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ProbeError::Connection(_) | ProbeError::Config(_))
    }
}

/// Result type alias for probe operations
pub type ProbeResult<T> = Result<T, ProbeError>;
