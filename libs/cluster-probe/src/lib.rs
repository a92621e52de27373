//! Cassandra cluster health probe
//!
//! Opens a dedicated diagnostic connection to a Cassandra (or ScyllaDB)
//! cluster and turns what it sees into a [`HealthReport`]: cluster name,
//! hosts, keyspaces, driver policies, per-node details and an UP/DOWN status
//! decided by a bounded liveness query.
//!
//! # Features
//!
//! - `config` - `core_config::FromEnv` support for [`CassandraHealthConfig`]
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use cluster_probe::{CassandraHealthCheck, CassandraHealthConfig, open};
//!
//! let config = CassandraHealthConfig::new(vec!["127.0.0.1"]).with_datacenter("datacenter1");
//! let connection = Arc::new(open(&config).await?);
//!
//! let check = CassandraHealthCheck::new(connection, config.liveness_timeout());
//! let report = check.check().await;
//! println!("{}", serde_json::to_string_pretty(&report)?);
//! ```

pub mod cassandra;
pub mod common;
pub mod health;

pub use cassandra::{CassandraHealthConfig, ClusterConnection, DiagnosticSession, open};
pub use common::{Backoff, ProbeError, ProbeResult, retry_with_backoff};
pub use health::{CHECK_NAME, CassandraHealthCheck, HealthReport, HealthStatus};
