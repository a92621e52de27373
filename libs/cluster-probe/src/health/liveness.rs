use std::time::{Duration, Instant};
use tracing::{debug, warn};

use crate::cassandra::{CLUSTER_NAME_QUERY, DiagnosticSession};
use crate::common::ProbeError;

/// Outcome of the liveness query
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LivenessResult {
    /// The query ran and its rows were iterated
    Reachable { rows: usize },
    /// The query failed or timed out
    Unreachable { error: String },
}

impl LivenessResult {
    pub fn is_reachable(&self) -> bool {
        matches!(self, Self::Reachable { .. })
    }

    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Reachable { .. } => None,
            Self::Unreachable { error } => Some(error),
        }
    }
}

/// Run the liveness query, bounded by `timeout`.
///
/// Never fails: errors and timeouts become [`LivenessResult::Unreachable`].
pub async fn probe<S>(session: &S, timeout: Duration) -> LivenessResult
where
    S: DiagnosticSession + ?Sized,
{
    let start = Instant::now();

    let query = session.execute_liveness_query(CLUSTER_NAME_QUERY);
    let outcome = match tokio::time::timeout(timeout, query).await {
        Ok(result) => result,
        Err(_) => Err(ProbeError::LivenessTimeout(timeout)),
    };

    match outcome {
        Ok(rows) => {
            debug!(
                rows,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Liveness query succeeded"
            );
            LivenessResult::Reachable { rows }
        }
        Err(e) => {
            warn!(
                error = %e,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Liveness query failed"
            );
            LivenessResult::Unreachable {
                error: e.to_string(),
            }
        }
    }
}
