use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, info_span, warn};

use super::liveness;
use super::nodes::collect_nodes;
use super::report::{HealthReport, assemble};
use super::topology::read_topology;
use crate::cassandra::DiagnosticSession;

/// Name the check is registered under
pub const CHECK_NAME: &str = "cassandra-health-check";

/// Named diagnostic check over a shared cluster connection.
///
/// Cheap to clone; every clone probes the same connection. Concurrent calls to
/// [`CassandraHealthCheck::check`] are independent and never mutate it.
pub struct CassandraHealthCheck<S: ?Sized> {
    session: Arc<S>,
    liveness_timeout: Duration,
}

impl<S: ?Sized> Clone for CassandraHealthCheck<S> {
    fn clone(&self) -> Self {
        Self {
            session: Arc::clone(&self.session),
            liveness_timeout: self.liveness_timeout,
        }
    }
}

impl<S> CassandraHealthCheck<S>
where
    S: DiagnosticSession + ?Sized,
{
    pub fn new(session: Arc<S>, liveness_timeout: Duration) -> Self {
        Self {
            session,
            liveness_timeout,
        }
    }

    pub fn name(&self) -> &'static str {
        CHECK_NAME
    }

    pub fn session(&self) -> &Arc<S> {
        &self.session
    }

    /// Probe the cluster and build a report. Never fails: an unreachable
    /// cluster yields a DOWN report.
    pub async fn check(&self) -> HealthReport {
        let span = info_span!("health_check", check = CHECK_NAME);

        async {
            let session = self.session.as_ref();
            let (topology, nodes, liveness) = tokio::join!(
                read_topology(session),
                collect_nodes(session),
                liveness::probe(session, self.liveness_timeout),
            );

            let report = assemble(topology, nodes, liveness);
            if let Some(error) = report.error() {
                warn!(error, "Cassandra reported DOWN");
            }
            report
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::health::fake::FakeCluster;
    use crate::health::report::HealthStatus;
    use uuid::Uuid;

    fn check_for(cluster: FakeCluster) -> CassandraHealthCheck<FakeCluster> {
        CassandraHealthCheck::new(Arc::new(cluster), Duration::from_secs(1))
    }

    #[tokio::test]
    async fn test_single_node_cluster_is_up() {
        let report = check_for(FakeCluster::single_node()).check().await;

        assert_eq!(report.status(), HealthStatus::Up);
        assert_eq!(report.details().hosts.len(), 1);
        assert_eq!(report.details().nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_test_cluster_scenario() {
        let report = check_for(FakeCluster::single_node()).check().await;
        let details = report.details();

        assert!(report.is_up());
        assert_eq!(details.cluster_name, "Test Cluster");
        assert_eq!(details.key_spaces, vec!["test"]);
        assert_eq!(details.local_dc, "datacenter1");
        assert_eq!(details.nodes[&Uuid::from_u128(1)].datacenter, "datacenter1");
    }

    #[tokio::test]
    async fn test_liveness_failure_keeps_topology() {
        let cluster = FakeCluster::single_node().failing_liveness("Connection refused");
        let report = check_for(cluster).check().await;

        assert_eq!(report.status(), HealthStatus::Down);
        assert!(report.error().unwrap().contains("Connection refused"));
        assert_eq!(report.details().cluster_name, "Test Cluster");
        assert!(!report.details().key_spaces.is_empty());
        assert_eq!(report.details().nodes.len(), 1);
    }

    #[tokio::test]
    async fn test_liveness_timeout_reports_down() {
        let check = CassandraHealthCheck::new(
            Arc::new(FakeCluster::single_node().hanging_liveness()),
            Duration::from_millis(20),
        );
        let report = check.check().await;

        assert_eq!(report.status(), HealthStatus::Down);
        assert!(report.error().unwrap().contains("timed out"));
        assert_eq!(report.details().hosts, vec!["127.0.0.1:9042"]);
    }

    #[tokio::test]
    async fn test_repeated_checks_are_stable() {
        let check = check_for(FakeCluster::single_node());
        let first = check.check().await;
        let second = check.check().await;

        assert_eq!(first.details().cluster_name, second.details().cluster_name);
        assert_eq!(first.details().hosts, second.details().hosts);
        assert_eq!(first.details().local_dc, second.details().local_dc);
        assert_eq!(check.session().liveness_calls(), 2);
    }

    #[tokio::test]
    async fn test_concurrent_checks_share_connection() {
        let check = check_for(FakeCluster::single_node());

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let check = check.clone();
                tokio::spawn(async move { check.check().await })
            })
            .collect();

        for handle in handles {
            let report = handle.await.unwrap();
            assert!(report.is_up());
        }
        assert_eq!(check.session().liveness_calls(), 8);
    }

    #[tokio::test]
    async fn test_works_through_trait_object() {
        let session: Arc<dyn DiagnosticSession> = Arc::new(FakeCluster::single_node());
        let check = CassandraHealthCheck::new(session, Duration::from_secs(1));

        assert_eq!(check.name(), "cassandra-health-check");
        assert!(check.check().await.is_up());
    }
}
