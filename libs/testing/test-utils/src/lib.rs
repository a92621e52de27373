//! Shared test utilities for the probe's integration tests
//!
//! - `TestCassandra`: single-node Cassandra container with automatic cleanup
//!
//! # Usage
//!
//! ```rust,ignore
//! use test_utils::TestCassandra;
//!
//! #[tokio::test]
//! #[ignore] // Requires Docker
//! async fn my_cassandra_test() {
//!     let cassandra = TestCassandra::new().await;
//!     cassandra.create_keyspace("test").await;
//!
//!     let contact_point = cassandra.contact_point();
//!     // Point the code under test at `contact_point`
//! }
//! ```

mod cassandra;

pub use cassandra::{CLUSTER_NAME, DATACENTER, TestCassandra};
