use tracing::debug;

use crate::cassandra::{ClusterMetadata, DiagnosticSession, NodeMetadata};

/// Cluster-level metadata at one point in time.
///
/// Every field falls back to an empty value when the connection does not
/// know it; missing metadata is reported, never raised.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologySnapshot {
    pub cluster_name: String,
    /// Driver-facing `ip:port` of every known node, in node-id order
    pub hosts: Vec<String>,
    /// User keyspaces, sorted, CQL-quoted where needed
    pub keyspaces: Vec<String>,
    pub execution_profiles: Vec<String>,
    pub load_balancing_policies: Vec<String>,
    pub retry_policies: Vec<String>,
    pub reconnection_policy: String,
    pub local_datacenter: String,
    pub session_name: String,
}

/// Read the topology from the connection's cached metadata.
pub async fn read_topology<S>(session: &S) -> TopologySnapshot
where
    S: DiagnosticSession + ?Sized,
{
    let metadata = session.metadata().await;
    let snapshot = snapshot_from(&metadata, session.session_name());
    debug!(
        cluster_name = %snapshot.cluster_name,
        hosts = snapshot.hosts.len(),
        keyspaces = snapshot.keyspaces.len(),
        "Topology read"
    );
    snapshot
}

/// Pure conversion from the connection's view to a snapshot.
pub fn snapshot_from(metadata: &ClusterMetadata, session_name: &str) -> TopologySnapshot {
    let hosts = nodes_in_id_order(&metadata.nodes)
        .into_iter()
        .map(|node| node.end_point.to_string())
        .collect();

    let mut keyspaces: Vec<String> = metadata
        .keyspaces
        .iter()
        .filter(|name| !is_system_keyspace(name))
        .map(|name| as_cql_identifier(name))
        .collect();
    keyspaces.sort();
    keyspaces.dedup();

    let profiles = &metadata.execution_profiles;

    TopologySnapshot {
        cluster_name: metadata.cluster_name.clone().unwrap_or_default(),
        hosts,
        keyspaces,
        execution_profiles: profiles.iter().map(|p| p.name.clone()).collect(),
        load_balancing_policies: unique(profiles.iter().map(|p| p.load_balancing.identifier())),
        retry_policies: unique(profiles.iter().map(|p| p.retry.identifier())),
        reconnection_policy: metadata.reconnection_policy.identifier().to_string(),
        local_datacenter: effective_local_datacenter(metadata).unwrap_or_default(),
        session_name: session_name.to_string(),
    }
}

/// The configured local datacenter, or the first known node's datacenter.
pub fn effective_local_datacenter(metadata: &ClusterMetadata) -> Option<String> {
    metadata
        .local_datacenter
        .clone()
        .filter(|dc| !dc.is_empty())
        .or_else(|| {
            nodes_in_id_order(&metadata.nodes)
                .into_iter()
                .find_map(|node| node.datacenter.clone())
        })
}

pub(crate) fn nodes_in_id_order(nodes: &[NodeMetadata]) -> Vec<&NodeMetadata> {
    let mut sorted: Vec<&NodeMetadata> = nodes.iter().collect();
    sorted.sort_by_key(|node| node.host_id);
    sorted
}

fn is_system_keyspace(name: &str) -> bool {
    name == "system" || name.starts_with("system_")
}

/// Render a keyspace name the way CQL needs it: bare when it is a plain
/// lower-case identifier, double-quoted otherwise.
fn as_cql_identifier(name: &str) -> String {
    let mut chars = name.chars();
    let plain = matches!(chars.next(), Some(c) if c.is_ascii_lowercase())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if plain {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\"\""))
    }
}

fn unique<'a>(items: impl Iterator<Item = &'a str>) -> Vec<String> {
    let mut seen: Vec<String> = Vec::new();
    for item in items {
        if !seen.iter().any(|s| s == item) {
            seen.push(item.to_string());
        }
    }
    seen
}
