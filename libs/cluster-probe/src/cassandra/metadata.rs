use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use uuid::Uuid;

use super::policy::{ExecutionProfileInfo, ReconnectionPolicyKind};
use crate::common::ProbeResult;

/// `upSinceMillis` value for a node that was never observed up
pub const NEVER_UP: i64 = -1;

/// Lifecycle state of a node as seen by the diagnostic connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeState {
    Up,
    Down,
    /// The driver does not track the node (e.g. filtered out of routing)
    Unknown,
}

/// A node as reported by the connection layer, before normalization.
///
/// Everything the driver or the system tables may not know is an `Option`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeMetadata {
    pub host_id: Uuid,
    /// Address the driver connects to
    pub end_point: SocketAddr,
    pub broadcast_address: Option<SocketAddr>,
    pub broadcast_rpc_address: Option<SocketAddr>,
    pub listen_address: Option<SocketAddr>,
    pub datacenter: Option<String>,
    pub rack: Option<String>,
    pub release_version: Option<String>,
    pub schema_version: Option<Uuid>,
    /// Further system-table columns, keyed by column name
    pub extras: BTreeMap<String, String>,
    pub open_connections: Option<usize>,
    pub state: NodeState,
    /// Whether the driver routes requests to this node
    pub enabled: bool,
    /// Epoch millis of the first observation as up, or [`NEVER_UP`]
    pub up_since_millis: i64,
}

/// The connection's current view of the cluster.
///
/// Produced from cached state only; building one never touches the network.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ClusterMetadata {
    pub cluster_name: Option<String>,
    pub keyspaces: Vec<String>,
    pub nodes: Vec<NodeMetadata>,
    pub execution_profiles: Vec<ExecutionProfileInfo>,
    pub reconnection_policy: ReconnectionPolicyKind,
    /// Local datacenter the connection was configured with
    pub local_datacenter: Option<String>,
}

/// Read-only seam between the health check and a cluster connection.
///
/// Implementations must be safe to share between concurrent probes; none of
/// these methods may mutate the connection.
#[async_trait]
pub trait DiagnosticSession: Send + Sync {
    /// Snapshot of the cached cluster metadata.
    async fn metadata(&self) -> ClusterMetadata;

    /// Identifier of this session, reported as `sessionName`.
    fn session_name(&self) -> &str;

    /// Run `cql`, iterate every returned row and report how many there were.
    ///
    /// No timeout is applied here; callers bound the call.
    async fn execute_liveness_query(&self, cql: &str) -> ProbeResult<usize>;
}
