//! Integration tests for the Cassandra health probe
//!
//! These run against a real single-node Cassandra in a container and check:
//! - The report of a healthy cluster
//! - Read stability across repeated checks
//! - Closing the connection once the checks are done

use cluster_probe::{
    CassandraHealthCheck, CassandraHealthConfig, ClusterConnection, HealthStatus, open,
};
use std::sync::Arc;
use test_utils::{CLUSTER_NAME, DATACENTER, TestCassandra};

async fn check_for(cassandra: &TestCassandra) -> CassandraHealthCheck<ClusterConnection> {
    let config = CassandraHealthConfig::new(vec![cassandra.contact_point()])
        .with_datacenter(DATACENTER);
    let connection = open(&config).await.expect("diagnostic connection should open");
    CassandraHealthCheck::new(Arc::new(connection), config.liveness_timeout())
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_single_node_cluster_report() {
    let cassandra = TestCassandra::new().await;
    cassandra.create_keyspace("test").await;

    let check = check_for(&cassandra).await;
    let report = check.check().await;
    let details = report.details();

    assert_eq!(report.status(), HealthStatus::Up);
    assert_eq!(details.cluster_name, CLUSTER_NAME);
    assert_eq!(details.key_spaces, vec!["test"]);
    assert_eq!(details.local_dc, DATACENTER);
    assert_eq!(details.hosts.len(), 1);
    assert_eq!(details.nodes.len(), 1);

    let node = details.nodes.values().next().unwrap();
    assert_eq!(node.datacenter, DATACENTER);
    assert!(node.cassandra_version.starts_with("4.1"));
    assert!(!node.up_since_millis.is_empty());
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_repeated_checks_are_stable() {
    let cassandra = TestCassandra::new().await;
    let check = check_for(&cassandra).await;

    let first = check.check().await;
    let second = check.check().await;

    assert_eq!(first.details().cluster_name, second.details().cluster_name);
    assert_eq!(first.details().hosts, second.details().hosts);
    assert_eq!(first.details().local_dc, second.details().local_dc);
}

#[tokio::test]
#[ignore] // Requires Docker
async fn test_close_after_checks() {
    let cassandra = TestCassandra::new().await;
    let config = CassandraHealthConfig::new(vec![cassandra.contact_point()]);
    let connection = Arc::new(open(&config).await.unwrap());

    let check = CassandraHealthCheck::new(Arc::clone(&connection), config.liveness_timeout());
    assert!(check.check().await.is_up());
    drop(check);

    let connection = Arc::try_unwrap(connection).unwrap();
    connection.close().await;
}
