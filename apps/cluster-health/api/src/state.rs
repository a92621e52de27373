//! Shared application state passed to the request handlers.

use cluster_probe::{CassandraHealthCheck, DiagnosticSession};
use core_config::AppInfo;

/// Cloned per request; the health check shares one diagnostic connection.
#[derive(Clone)]
pub struct AppState {
    pub app: AppInfo,
    pub cassandra: CassandraHealthCheck<dyn DiagnosticSession>,
}
