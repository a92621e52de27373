use async_trait::async_trait;
use scylla::client::PoolSize;
use scylla::client::execution_profile::ExecutionProfile;
use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use scylla::cluster::{ClusterState, Node};
use scylla::policies::load_balancing::{DefaultPolicy, LoadBalancingPolicy};
use scylla::policies::retry::{
    DefaultRetryPolicy, DowngradingConsistencyRetryPolicy, FallthroughRetryPolicy, RetryPolicy,
};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::{IpAddr, SocketAddr};
use std::num::NonZeroUsize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::CassandraHealthConfig;
use super::metadata::{ClusterMetadata, DiagnosticSession, NEVER_UP, NodeMetadata, NodeState};
use super::policy::{
    ExecutionProfileInfo, LoadBalancingPolicyKind, ReconnectionPolicyKind, RetryPolicyKind,
};
use crate::common::{ProbeError, ProbeResult};

/// Single local-node read used both to learn the cluster name and as the
/// liveness query.
pub const CLUSTER_NAME_QUERY: &str = "SELECT cluster_name FROM system.local";

const LOCAL_NODE_QUERY: &str = "SELECT host_id, broadcast_address, listen_address, rpc_address, \
     release_version, schema_version, cql_version, native_protocol_version FROM system.local";

const PEERS_QUERY: &str = "SELECT host_id, peer, rpc_address, release_version, schema_version, \
     preferred_ip FROM system.peers";

type LocalRow = (
    Option<Uuid>,
    Option<IpAddr>,
    Option<IpAddr>,
    Option<IpAddr>,
    Option<String>,
    Option<Uuid>,
    Option<String>,
    Option<String>,
);

type PeerRow = (
    Option<Uuid>,
    Option<IpAddr>,
    Option<IpAddr>,
    Option<String>,
    Option<Uuid>,
    Option<IpAddr>,
);

/// Per-node attributes the driver does not track, read from the system tables.
#[derive(Debug, Clone, Default, PartialEq)]
struct CatalogEntry {
    broadcast_address: Option<IpAddr>,
    rpc_address: Option<IpAddr>,
    listen_address: Option<IpAddr>,
    release_version: Option<String>,
    schema_version: Option<Uuid>,
    /// Remaining system-table columns, reported as-is
    extras: BTreeMap<String, String>,
}

/// Cached node attributes plus the first instant each node was seen up.
///
/// Written only by `open` and the background refresher.
#[derive(Debug, Default)]
struct NodeCatalog {
    entries: HashMap<Uuid, CatalogEntry>,
    up_since: HashMap<Uuid, i64>,
}

impl NodeCatalog {
    /// Merge freshly read rows and re-derive up-since markers from the
    /// driver's `(host_id, is_up)` view. Nodes missing from it are forgotten.
    fn apply<I>(&mut self, rows: Vec<(Uuid, CatalogEntry)>, nodes: I, now_millis: i64)
    where
        I: IntoIterator<Item = (Uuid, bool)>,
    {
        self.entries.extend(rows);

        let mut known = HashSet::new();
        for (host_id, up) in nodes {
            known.insert(host_id);
            if up {
                self.up_since.entry(host_id).or_insert(now_millis);
            } else {
                self.up_since.remove(&host_id);
            }
        }

        self.entries.retain(|host_id, _| known.contains(host_id));
        self.up_since.retain(|host_id, _| known.contains(host_id));
    }
}

/// Whether the driver currently routes to `node` over a live pool.
fn is_up(node: &Node) -> bool {
    node.is_enabled() && node.is_connected()
}

fn node_liveness(state: &ClusterState) -> Vec<(Uuid, bool)> {
    state
        .get_nodes_info()
        .iter()
        .map(|node| (node.host_id, is_up(node)))
        .collect()
}

/// The dedicated diagnostic connection.
///
/// Owns its own driver session, separate from any session the application
/// uses for data access. Construct it once at startup with [`open`], share it
/// behind an `Arc`, and release it with [`ClusterConnection::close`]. Dropping
/// it also stops the metadata refresher.
pub struct ClusterConnection {
    session: Arc<Session>,
    catalog: Arc<RwLock<NodeCatalog>>,
    refresher: Option<JoinHandle<()>>,
    cluster_name: Option<String>,
    profiles: Vec<ExecutionProfileInfo>,
    local_datacenter: Option<String>,
    session_name: String,
    pool_size: usize,
}

impl std::fmt::Debug for ClusterConnection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClusterConnection")
            .field("session_name", &self.session_name)
            .field("cluster_name", &self.cluster_name)
            .field("local_datacenter", &self.local_datacenter)
            .finish_non_exhaustive()
    }
}

fn load_balancing_policy(
    kind: LoadBalancingPolicyKind,
    local_datacenter: Option<&str>,
) -> Arc<dyn LoadBalancingPolicy> {
    let mut builder = DefaultPolicy::builder().token_aware(kind.is_token_aware());
    if kind.prefers_local_datacenter()
        && let Some(dc) = local_datacenter
    {
        builder = builder.prefer_datacenter(dc.to_string());
    }
    builder.build()
}

fn retry_policy(kind: RetryPolicyKind) -> Arc<dyn RetryPolicy> {
    match kind {
        RetryPolicyKind::Default => Arc::new(DefaultRetryPolicy::new()),
        RetryPolicyKind::Fallthrough => Arc::new(FallthroughRetryPolicy::new()),
        RetryPolicyKind::DowngradingConsistency => {
            Arc::new(DowngradingConsistencyRetryPolicy::new())
        }
    }
}

/// Open the diagnostic connection.
///
/// Builds a session from `config`, reads the cluster name and the initial
/// node catalog, then starts the background catalog refresher. Every failure
/// is a [`ProbeError::Connection`] (or [`ProbeError::Config`] for an invalid
/// config); nothing is retried here.
///
/// # Example
/// ```ignore
/// use cluster_probe::cassandra::{CassandraHealthConfig, open};
///
/// let config = CassandraHealthConfig::new(vec!["127.0.0.1"]).with_datacenter("datacenter1");
/// let connection = open(&config).await?;
/// ```
pub async fn open(config: &CassandraHealthConfig) -> ProbeResult<ClusterConnection> {
    config.validate()?;

    let addresses = config.contact_addresses();
    info!(contact_points = ?addresses, "Opening diagnostic Cassandra connection");

    let profile = ExecutionProfileInfo::default_profile(config.load_balancing, config.retry_policy);
    let handle = ExecutionProfile::builder()
        .load_balancing_policy(load_balancing_policy(
            profile.load_balancing,
            config.local_datacenter(),
        ))
        .retry_policy(retry_policy(profile.retry))
        .request_timeout(Some(config.request_timeout()))
        .build()
        .into_handle();

    let pool_size = NonZeroUsize::new(config.connections_per_host)
        .ok_or_else(|| ProbeError::Config("connections per host must be at least 1".to_string()))?;

    let mut builder = SessionBuilder::new()
        .known_nodes(&addresses)
        .connection_timeout(config.connect_timeout())
        .pool_size(PoolSize::PerHost(pool_size))
        .default_execution_profile_handle(handle);

    if let Some((username, password)) = config.credentials() {
        builder = builder.user(username, password);
    }

    if let Some(keyspace) = config.keyspace() {
        builder = builder.use_keyspace(keyspace, true);
    }

    let session = builder
        .build()
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;
    let session = Arc::new(session);

    // Cluster names cannot change while a cluster is running.
    let cluster_name = read_cluster_names(&session, CLUSTER_NAME_QUERY)
        .await
        .map_err(ProbeError::Connection)?
        .into_iter()
        .next();

    let rows = read_catalog(&session)
        .await
        .map_err(|e| ProbeError::Connection(e.to_string()))?;
    let mut catalog = NodeCatalog::default();
    catalog.apply(rows, node_liveness(&session.get_cluster_state()), now_millis());
    let catalog = Arc::new(RwLock::new(catalog));

    let refresher = tokio::spawn(refresh_catalog(
        Arc::clone(&session),
        Arc::clone(&catalog),
        config.metadata_refresh_interval(),
    ));

    info!(
        cluster_name = cluster_name.as_deref().unwrap_or(""),
        session_name = %config.session_name,
        "Diagnostic Cassandra connection ready"
    );

    Ok(ClusterConnection {
        session,
        catalog,
        refresher: Some(refresher),
        cluster_name,
        profiles: vec![profile],
        local_datacenter: config.local_datacenter().map(str::to_string),
        session_name: config.session_name.clone(),
        pool_size: config.connections_per_host,
    })
}

impl ClusterConnection {
    /// Stop the refresher and release the driver session.
    pub async fn close(mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
            // The task owns a session handle; wait until it is gone.
            let _ = refresher.await;
        }
        info!(session_name = %self.session_name, "Diagnostic Cassandra connection closed");
    }

    /// The underlying driver session, for callers that need raw access
    /// (e.g. test fixtures creating a keyspace).
    pub fn session(&self) -> &Session {
        &self.session
    }

    fn describe_node(&self, node: &Node, catalog: &NodeCatalog) -> NodeMetadata {
        let end_point = SocketAddr::new(node.address.ip(), node.address.port());
        let entry = catalog.entries.get(&node.host_id).cloned().unwrap_or_default();

        let state = if !node.is_enabled() {
            NodeState::Unknown
        } else if !node.is_connected() {
            NodeState::Down
        } else {
            NodeState::Up
        };
        // The driver keeps `pool_size` connections to every node it routes to.
        let open_connections = match state {
            NodeState::Up => self.pool_size,
            NodeState::Down | NodeState::Unknown => 0,
        };

        NodeMetadata {
            host_id: node.host_id,
            end_point,
            // Storage ports are not exposed by the v1 system tables.
            broadcast_address: entry.broadcast_address.map(|ip| SocketAddr::new(ip, 0)),
            broadcast_rpc_address: entry
                .rpc_address
                .map(|ip| SocketAddr::new(ip, end_point.port())),
            listen_address: entry.listen_address.map(|ip| SocketAddr::new(ip, 0)),
            datacenter: node.datacenter.clone(),
            rack: node.rack.clone(),
            release_version: entry.release_version,
            schema_version: entry.schema_version,
            extras: entry.extras,
            open_connections: Some(open_connections),
            state,
            enabled: node.is_enabled(),
            up_since_millis: catalog
                .up_since
                .get(&node.host_id)
                .copied()
                .unwrap_or(NEVER_UP),
        }
    }
}

impl Drop for ClusterConnection {
    fn drop(&mut self) {
        if let Some(refresher) = self.refresher.take() {
            refresher.abort();
        }
    }
}

#[async_trait]
impl DiagnosticSession for ClusterConnection {
    async fn metadata(&self) -> ClusterMetadata {
        let catalog = self.catalog.read().await;
        let state = self.session.get_cluster_state();

        let nodes = state
            .get_nodes_info()
            .iter()
            .map(|node| self.describe_node(node, &catalog))
            .collect();
        let keyspaces = state
            .keyspaces_iter()
            .map(|(name, _)| name.to_string())
            .collect();

        ClusterMetadata {
            cluster_name: self.cluster_name.clone(),
            keyspaces,
            nodes,
            execution_profiles: self.profiles.clone(),
            reconnection_policy: ReconnectionPolicyKind::ExponentialBackoff,
            local_datacenter: self.local_datacenter.clone(),
        }
    }

    fn session_name(&self) -> &str {
        &self.session_name
    }

    async fn execute_liveness_query(&self, cql: &str) -> ProbeResult<usize> {
        let names = read_cluster_names(&self.session, cql)
            .await
            .map_err(ProbeError::LivenessFailure)?;
        for name in &names {
            debug!(cluster_name = %name, "Liveness row");
        }
        Ok(names.len())
    }
}

/// Run a single-text-column query and collect every non-null value.
async fn read_cluster_names(session: &Session, cql: &str) -> Result<Vec<String>, String> {
    let result = session
        .query_unpaged(cql, ())
        .await
        .map_err(|e| e.to_string())?;
    let rows = result.into_rows_result().map_err(|e| e.to_string())?;

    let mut names = Vec::new();
    for row in rows.rows::<(Option<String>,)>().map_err(|e| e.to_string())? {
        let (name,) = row.map_err(|e| e.to_string())?;
        names.extend(name);
    }
    Ok(names)
}

fn unavailable(e: impl std::fmt::Display) -> ProbeError {
    ProbeError::MetadataUnavailable(e.to_string())
}

async fn read_catalog(session: &Session) -> ProbeResult<Vec<(Uuid, CatalogEntry)>> {
    let mut entries = Vec::new();

    let local = session
        .query_unpaged(LOCAL_NODE_QUERY, ())
        .await
        .map_err(unavailable)?
        .into_rows_result()
        .map_err(unavailable)?;
    for row in local.rows::<LocalRow>().map_err(unavailable)? {
        let (host_id, broadcast, listen, rpc, version, schema, cql, protocol) =
            row.map_err(unavailable)?;
        if let Some(host_id) = host_id {
            entries.push((
                host_id,
                CatalogEntry {
                    broadcast_address: broadcast,
                    rpc_address: rpc,
                    listen_address: listen,
                    release_version: version,
                    schema_version: schema,
                    extras: extras([
                        ("cql_version", cql),
                        ("native_protocol_version", protocol),
                    ]),
                },
            ));
        }
    }

    let peers = session
        .query_unpaged(PEERS_QUERY, ())
        .await
        .map_err(unavailable)?
        .into_rows_result()
        .map_err(unavailable)?;
    for row in peers.rows::<PeerRow>().map_err(unavailable)? {
        let (host_id, peer, rpc, version, schema, preferred_ip) = row.map_err(unavailable)?;
        if let Some(host_id) = host_id {
            // Listen addresses of peers are only known to the peers themselves.
            entries.push((
                host_id,
                CatalogEntry {
                    broadcast_address: peer,
                    rpc_address: rpc,
                    listen_address: None,
                    release_version: version,
                    schema_version: schema,
                    extras: extras([("preferred_ip", preferred_ip.map(|ip| ip.to_string()))]),
                },
            ));
        }
    }

    Ok(entries)
}

/// Keep the named columns that carry a value.
fn extras<const N: usize>(columns: [(&str, Option<String>); N]) -> BTreeMap<String, String> {
    columns
        .into_iter()
        .filter_map(|(name, value)| value.map(|v| (name.to_string(), v)))
        .collect()
}

async fn refresh_catalog(
    session: Arc<Session>,
    catalog: Arc<RwLock<NodeCatalog>>,
    every: Duration,
) {
    let mut ticker = tokio::time::interval(every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately and `open` has just refreshed.
    ticker.tick().await;

    loop {
        ticker.tick().await;
        match read_catalog(&session).await {
            Ok(rows) => {
                let count = rows.len();
                let nodes = node_liveness(&session.get_cluster_state());
                catalog.write().await.apply(rows, nodes, now_millis());
                debug!(nodes = count, "Refreshed node catalog");
            }
            Err(e) => warn!(error = %e, "Node catalog refresh failed, keeping previous view"),
        }
    }
}

fn now_millis() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
