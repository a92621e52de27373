//! Cassandra test infrastructure
//!
//! Provides a `TestCassandra` helper that starts a single-node Cassandra
//! container. Startup takes a while (the image runs a full JVM node), so tests
//! using it are expected to be `#[ignore]`d by default.

use scylla::client::session::Session;
use scylla::client::session_builder::SessionBuilder;
use testcontainers::core::{IntoContainerPort, WaitFor};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};

const IMAGE: &str = "cassandra";
const TAG: &str = "4.1";
const CQL_PORT: u16 = 9042;

/// Cluster name and datacenter the image starts with unless overridden
pub const CLUSTER_NAME: &str = "Test Cluster";
pub const DATACENTER: &str = "datacenter1";

/// Test Cassandra wrapper that ensures proper cleanup
///
/// The container is automatically stopped and removed when this struct is dropped.
pub struct TestCassandra {
    #[allow(dead_code)]
    container: ContainerAsync<GenericImage>,
    port: u16,
}

impl TestCassandra {
    /// Start a Cassandra 4.1 node and wait until it accepts CQL clients.
    pub async fn new() -> Self {
        let image = GenericImage::new(IMAGE, TAG)
            .with_exposed_port(CQL_PORT.tcp())
            .with_wait_for(WaitFor::message_on_stdout(
                "Starting listening for CQL clients",
            ))
            .with_env_var("CASSANDRA_CLUSTER_NAME", CLUSTER_NAME)
            .with_env_var("CASSANDRA_DC", DATACENTER)
            .with_env_var("CASSANDRA_ENDPOINT_SNITCH", "GossipingPropertyFileSnitch")
            .with_env_var("MAX_HEAP_SIZE", "512M")
            .with_env_var("HEAP_NEWSIZE", "128M");

        let container = image
            .start()
            .await
            .expect("Failed to start Cassandra container");

        let port = container
            .get_host_port_ipv4(CQL_PORT.tcp())
            .await
            .expect("Failed to get Cassandra port");

        tracing::info!(port, "Test Cassandra ready ({IMAGE}:{TAG})");

        Self { container, port }
    }

    /// Host-side address of the CQL port
    pub fn contact_point(&self) -> String {
        format!("127.0.0.1:{}", self.port)
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// Open a plain session to the container, for test setup.
    pub async fn session(&self) -> Session {
        SessionBuilder::new()
            .known_node(self.contact_point())
            .build()
            .await
            .expect("Failed to connect to test Cassandra")
    }

    /// Create `name` with `SimpleStrategy` and replication factor 1.
    pub async fn create_keyspace(&self, name: &str) {
        let cql = format!(
            "CREATE KEYSPACE IF NOT EXISTS {name} \
             WITH replication = {{'class': 'SimpleStrategy', 'replication_factor': 1}}"
        );
        self.session()
            .await
            .query_unpaged(cql, ())
            .await
            .expect("Failed to create keyspace");
    }
}

// Container is automatically cleaned up when TestCassandra is dropped
impl Drop for TestCassandra {
    fn drop(&mut self) {
        tracing::debug!("Cleaning up test Cassandra container");
    }
}
