//! The diagnostic probe
//!
//! A check runs three independent reads against one [`DiagnosticSession`]
//! (topology, per-node details, liveness query), waits for all of them and
//! merges the results into a [`HealthReport`]. Only the liveness query
//! touches the network; the other two read the connection's cached metadata.
//!
//! [`DiagnosticSession`]: crate::cassandra::DiagnosticSession

mod check;
pub mod liveness;
mod nodes;
mod report;
mod topology;

#[cfg(test)]
pub(crate) mod fake;

pub use check::{CHECK_NAME, CassandraHealthCheck};
pub use liveness::LivenessResult;
pub use nodes::{
    NodeDistance, NodeRecord, UNKNOWN, UNKNOWN_ADDRESS, collect_nodes, format_up_since,
    node_record,
};
pub use report::{HealthDetails, HealthReport, HealthStatus, assemble};
pub use topology::{TopologySnapshot, effective_local_datacenter, read_topology, snapshot_from};
