use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Serialize, Serializer};
use std::collections::BTreeMap;
use std::net::SocketAddr;
use tracing::debug;
use uuid::Uuid;

use super::topology::effective_local_datacenter;
use crate::cassandra::{DiagnosticSession, NodeMetadata, NodeState};

/// Stands in for any address the connection does not know
pub const UNKNOWN_ADDRESS: &str = "0.0.0.0:0";

/// Stands in for unknown versions and counts
pub const UNKNOWN: &str = "unknown";

/// Routing distance of a node relative to the diagnostic connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NodeDistance {
    Local,
    Remote,
    /// The driver does not route to this node
    Ignored,
}

/// Normalized, fixed-schema description of one node.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NodeRecord {
    pub broadcast_address: String,
    pub broadcast_rpc_address: String,
    pub cassandra_version: String,
    pub datacenter: String,
    pub distance: NodeDistance,
    pub end_point: String,
    pub extras: BTreeMap<String, String>,
    pub host_id: Uuid,
    pub listen_address: String,
    #[serde(serialize_with = "count_or_unknown")]
    pub open_connections: Option<usize>,
    pub rack: String,
    pub schema_version: String,
    pub state: NodeState,
    pub up_since_millis: String,
}

/// Collect a record for every node the connection knows, keyed by host id.
pub async fn collect_nodes<S>(session: &S) -> BTreeMap<Uuid, NodeRecord>
where
    S: DiagnosticSession + ?Sized,
{
    let metadata = session.metadata().await;
    let local_dc = effective_local_datacenter(&metadata);

    let nodes: BTreeMap<Uuid, NodeRecord> = metadata
        .nodes
        .iter()
        .map(|node| (node.host_id, node_record(node, local_dc.as_deref())))
        .collect();

    debug!(nodes = nodes.len(), "Node details collected");
    nodes
}

/// Build the record of one node. Every optional attribute gets its sentinel.
pub fn node_record(node: &NodeMetadata, local_dc: Option<&str>) -> NodeRecord {
    NodeRecord {
        broadcast_address: address_or_unknown(node.broadcast_address),
        broadcast_rpc_address: address_or_unknown(node.broadcast_rpc_address),
        cassandra_version: node
            .release_version
            .clone()
            .unwrap_or_else(|| UNKNOWN.to_string()),
        datacenter: node.datacenter.clone().unwrap_or_default(),
        distance: distance(node, local_dc),
        end_point: node.end_point.to_string(),
        extras: node.extras.clone(),
        host_id: node.host_id,
        listen_address: address_or_unknown(node.listen_address),
        open_connections: node.open_connections,
        rack: node.rack.clone().unwrap_or_default(),
        schema_version: node
            .schema_version
            .map(|v| v.to_string())
            .unwrap_or_else(|| UNKNOWN.to_string()),
        state: node.state,
        up_since_millis: format_up_since(node.up_since_millis),
    }
}

fn distance(node: &NodeMetadata, local_dc: Option<&str>) -> NodeDistance {
    if !node.enabled {
        return NodeDistance::Ignored;
    }
    match local_dc {
        None => NodeDistance::Local,
        Some(local) if node.datacenter.as_deref() == Some(local) => NodeDistance::Local,
        Some(_) => NodeDistance::Remote,
    }
}

fn address_or_unknown(address: Option<SocketAddr>) -> String {
    address
        .map(|a| a.to_string())
        .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string())
}

/// RFC 3339 timestamp of `millis`, or `""` for the never-up sentinel.
///
/// Any negative or out-of-range value is treated as never observed.
pub fn format_up_since(millis: i64) -> String {
    if millis < 0 {
        return String::new();
    }
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}

fn count_or_unknown<S>(count: &Option<usize>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match count {
        Some(n) => serializer.serialize_u64(*n as u64),
        None => serializer.serialize_str(UNKNOWN),
    }
}
