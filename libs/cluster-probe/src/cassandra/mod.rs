//! Connection layer of the probe
//!
//! Owns the dedicated diagnostic session (separate from the application's
//! data-access session) and exposes it through [`DiagnosticSession`]. Uses the
//! `scylla` driver, which speaks to both Apache Cassandra and ScyllaDB.
//!
//! # Example
//!
//! ```ignore
//! use cluster_probe::cassandra::{CassandraHealthConfig, open};
//!
//! let config = CassandraHealthConfig::new(vec!["127.0.0.1"])
//!     .with_datacenter("datacenter1")
//!     .with_keyspace("test");
//! let connection = open(&config).await?;
//! // ... hand `Arc::new(connection)` to the health check ...
//! ```

mod config;
mod connector;
mod metadata;
mod policy;

pub use config::{CassandraHealthConfig, DEFAULT_PORT};
pub use connector::{CLUSTER_NAME_QUERY, ClusterConnection, open};
pub use metadata::{ClusterMetadata, DiagnosticSession, NEVER_UP, NodeMetadata, NodeState};
pub use policy::{
    ExecutionProfileInfo, LoadBalancingPolicyKind, ReconnectionPolicyKind, RetryPolicyKind,
};

// Re-export scylla types for convenience
pub use scylla::client::session::Session;
