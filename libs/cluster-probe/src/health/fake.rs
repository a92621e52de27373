//! In-memory cluster used by the unit tests.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicUsize, Ordering};
use uuid::Uuid;

use crate::cassandra::{
    ClusterMetadata, DiagnosticSession, ExecutionProfileInfo, LoadBalancingPolicyKind, NodeMetadata,
    NodeState, ReconnectionPolicyKind, RetryPolicyKind,
};
use crate::common::{ProbeError, ProbeResult};

#[derive(Debug, Clone)]
enum Liveness {
    Rows(usize),
    Fail(String),
    Hang,
}

#[derive(Debug)]
pub(crate) struct FakeCluster {
    metadata: ClusterMetadata,
    session_name: String,
    liveness: Liveness,
    liveness_calls: AtomicUsize,
}

impl FakeCluster {
    /// One healthy node in `datacenter1` holding the `test` keyspace.
    pub(crate) fn single_node() -> Self {
        Self::with_metadata(ClusterMetadata {
            cluster_name: Some("Test Cluster".to_string()),
            keyspaces: ["system", "system_auth", "system_schema", "test"]
                .map(String::from)
                .to_vec(),
            nodes: vec![fake_node(1, Some("datacenter1"))],
            execution_profiles: vec![ExecutionProfileInfo::default_profile(
                LoadBalancingPolicyKind::TokenAware,
                RetryPolicyKind::Default,
            )],
            reconnection_policy: ReconnectionPolicyKind::ExponentialBackoff,
            local_datacenter: Some("datacenter1".to_string()),
        })
    }

    pub(crate) fn with_metadata(metadata: ClusterMetadata) -> Self {
        Self {
            metadata,
            session_name: "s0".to_string(),
            liveness: Liveness::Rows(1),
            liveness_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn failing_liveness(mut self, message: &str) -> Self {
        self.liveness = Liveness::Fail(message.to_string());
        self
    }

    pub(crate) fn hanging_liveness(mut self) -> Self {
        self.liveness = Liveness::Hang;
        self
    }

    pub(crate) fn liveness_calls(&self) -> usize {
        self.liveness_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl DiagnosticSession for FakeCluster {
    async fn metadata(&self) -> ClusterMetadata {
        self.metadata.clone()
    }

    fn session_name(&self) -> &str {
        &self.session_name
    }

    async fn execute_liveness_query(&self, _cql: &str) -> ProbeResult<usize> {
        self.liveness_calls.fetch_add(1, Ordering::SeqCst);
        match &self.liveness {
            Liveness::Rows(rows) => Ok(*rows),
            Liveness::Fail(message) => Err(ProbeError::LivenessFailure(message.clone())),
            Liveness::Hang => std::future::pending().await,
        }
    }
}

/// A healthy node `n` listening on `127.0.0.n:9042`.
pub(crate) fn fake_node(n: u128, datacenter: Option<&str>) -> NodeMetadata {
    let ip = IpAddr::V4(Ipv4Addr::new(127, 0, 0, n as u8));
    NodeMetadata {
        host_id: Uuid::from_u128(n),
        end_point: SocketAddr::new(ip, 9042),
        broadcast_address: Some(SocketAddr::new(ip, 7000)),
        broadcast_rpc_address: Some(SocketAddr::new(ip, 9042)),
        listen_address: Some(SocketAddr::new(ip, 7000)),
        datacenter: datacenter.map(String::from),
        rack: Some("rack1".to_string()),
        release_version: Some("4.1.3".to_string()),
        schema_version: Some(Uuid::from_u128(0x5c4e_0000 + n)),
        extras: BTreeMap::from([("cql_version".to_string(), "3.4.6".to_string())]),
        open_connections: Some(1),
        state: NodeState::Up,
        enabled: true,
        up_since_millis: 1_700_000_000_000,
    }
}
