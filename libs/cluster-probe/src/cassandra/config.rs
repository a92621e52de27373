use std::net::{IpAddr, SocketAddr};
use std::time::Duration;

#[cfg(feature = "config")]
use core_config::{ConfigError, FromEnv, env_list, env_non_blank, env_or_default, env_parse_or};

use super::policy::{LoadBalancingPolicyKind, RetryPolicyKind};
use crate::common::{ProbeError, ProbeResult};

/// Default CQL native transport port
pub const DEFAULT_PORT: u16 = 9042;

/// Settings for the dedicated diagnostic connection.
///
/// This is deliberately a separate value from whatever configures the
/// application's data-access session: the health check opens its own session
/// from it.
///
/// # Example
///
/// ```ignore
/// use cluster_probe::cassandra::CassandraHealthConfig;
///
/// let config = CassandraHealthConfig::new(vec!["cassandra-1", "cassandra-2"])
///     .with_port(9042)
///     .with_datacenter("datacenter1")
///     .with_keyspace("test")
///     .with_credentials("cassandra", "cassandra");
///
/// // From environment variables (requires `config` feature)
/// let config = CassandraHealthConfig::from_env()?;
/// ```
#[derive(Clone, Debug)]
pub struct CassandraHealthConfig {
    /// Contact point hosts; the port is appended unless one is given
    pub contact_points: Vec<String>,

    /// Native transport port used for contact points without one
    pub port: u16,

    /// Keyspace the session switches to after connecting
    pub keyspace: Option<String>,

    /// Local datacenter for DC-aware routing and distance classification
    pub local_datacenter: Option<String>,

    pub username: Option<String>,
    pub password: Option<String>,

    pub connect_timeout_secs: u64,

    /// Per-request timeout of the default execution profile
    pub request_timeout_secs: u64,

    /// Upper bound on the liveness query, in milliseconds
    pub liveness_timeout_ms: u64,

    /// How often the node catalog is re-read from the system tables
    pub metadata_refresh_secs: u64,

    pub connections_per_host: usize,

    pub load_balancing: LoadBalancingPolicyKind,

    pub retry_policy: RetryPolicyKind,

    /// Name reported as `sessionName`
    pub session_name: String,
}

impl CassandraHealthConfig {
    /// Create a config with the given contact points and defaults elsewhere
    pub fn new<S: Into<String>>(contact_points: Vec<S>) -> Self {
        Self {
            contact_points: contact_points.into_iter().map(|s| s.into()).collect(),
            ..Self::default()
        }
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_keyspace(mut self, keyspace: impl Into<String>) -> Self {
        self.keyspace = Some(keyspace.into());
        self
    }

    pub fn with_datacenter(mut self, datacenter: impl Into<String>) -> Self {
        self.local_datacenter = Some(datacenter.into());
        self
    }

    pub fn with_credentials(
        mut self,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        self.username = Some(username.into());
        self.password = Some(password.into());
        self
    }

    pub fn with_connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout_secs = secs;
        self
    }

    pub fn with_request_timeout(mut self, secs: u64) -> Self {
        self.request_timeout_secs = secs;
        self
    }

    pub fn with_liveness_timeout(mut self, millis: u64) -> Self {
        self.liveness_timeout_ms = millis;
        self
    }

    pub fn with_metadata_refresh(mut self, secs: u64) -> Self {
        self.metadata_refresh_secs = secs;
        self
    }

    pub fn with_connections_per_host(mut self, count: usize) -> Self {
        self.connections_per_host = count;
        self
    }

    pub fn with_load_balancing(mut self, kind: LoadBalancingPolicyKind) -> Self {
        self.load_balancing = kind;
        self
    }

    pub fn with_retry_policy(mut self, kind: RetryPolicyKind) -> Self {
        self.retry_policy = kind;
        self
    }

    pub fn with_session_name(mut self, name: impl Into<String>) -> Self {
        self.session_name = name.into();
        self
    }

    /// Credentials to authenticate with, only when both are non-blank.
    pub fn credentials(&self) -> Option<(&str, &str)> {
        let username = self.username.as_deref().filter(|u| !u.trim().is_empty())?;
        let password = self.password.as_deref().filter(|p| !p.trim().is_empty())?;
        Some((username, password))
    }

    /// Local datacenter, ignoring a blank value.
    pub fn local_datacenter(&self) -> Option<&str> {
        self.local_datacenter
            .as_deref()
            .filter(|dc| !dc.trim().is_empty())
    }

    /// Keyspace, ignoring a blank value.
    pub fn keyspace(&self) -> Option<&str> {
        self.keyspace.as_deref().filter(|ks| !ks.trim().is_empty())
    }

    /// Contact points as `host:port` strings ready for the driver.
    pub fn contact_addresses(&self) -> Vec<String> {
        self.contact_points
            .iter()
            .map(|point| point.trim())
            .filter(|point| !point.is_empty())
            .map(|point| with_default_port(point, self.port))
            .collect()
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn metadata_refresh_interval(&self) -> Duration {
        Duration::from_secs(self.metadata_refresh_secs)
    }

    /// Reject configurations the driver would only fail on later.
    pub fn validate(&self) -> ProbeResult<()> {
        if self.contact_points.iter().all(|p| p.trim().is_empty()) {
            return Err(ProbeError::Config("no contact points configured".to_string()));
        }
        if self.port == 0 {
            return Err(ProbeError::Config("port must be non-zero".to_string()));
        }
        if self.connections_per_host == 0 {
            return Err(ProbeError::Config(
                "connections per host must be at least 1".to_string(),
            ));
        }
        if self.liveness_timeout_ms == 0 || self.metadata_refresh_secs == 0 {
            return Err(ProbeError::Config(
                "liveness timeout and metadata refresh interval must be non-zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Append `port` unless the contact point already names one.
fn with_default_port(point: &str, port: u16) -> String {
    if point.parse::<SocketAddr>().is_ok() {
        return point.to_string();
    }
    match point.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{ip}]:{port}"),
        Ok(IpAddr::V4(ip)) => format!("{ip}:{port}"),
        Err(_) => match point.rsplit_once(':') {
            Some((host, p)) if !host.contains(':') && p.parse::<u16>().is_ok() => {
                point.to_string()
            }
            _ => format!("{point}:{port}"),
        },
    }
}

impl Default for CassandraHealthConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["127.0.0.1".to_string()],
            port: DEFAULT_PORT,
            keyspace: None,
            local_datacenter: None,
            username: None,
            password: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 30,
            liveness_timeout_ms: 5_000,
            metadata_refresh_secs: 30,
            connections_per_host: 1,
            load_balancing: LoadBalancingPolicyKind::default(),
            retry_policy: RetryPolicyKind::default(),
            session_name: "s0".to_string(),
        }
    }
}

/// Load CassandraHealthConfig from environment variables
///
/// Environment variables:
/// - `CASSANDRA_CONTACT_POINTS` (required) - Comma-separated hosts
/// - `CASSANDRA_PORT` (optional, default: 9042)
/// - `CASSANDRA_LOCAL_DATACENTER` (optional)
/// - `CASSANDRA_KEYSPACE` (optional)
/// - `CASSANDRA_USERNAME` / `CASSANDRA_PASSWORD` (optional, used only when both are non-blank)
/// - `CASSANDRA_CONNECT_TIMEOUT_SECS` (optional, default: 10)
/// - `CASSANDRA_REQUEST_TIMEOUT_SECS` (optional, default: 30)
/// - `CASSANDRA_LIVENESS_TIMEOUT_MS` (optional, default: 5000)
/// - `CASSANDRA_METADATA_REFRESH_SECS` (optional, default: 30)
/// - `CASSANDRA_CONNECTIONS_PER_HOST` (optional, default: 1)
/// - `CASSANDRA_LOAD_BALANCING` (optional: token-aware | dc-aware | round-robin)
/// - `CASSANDRA_RETRY_POLICY` (optional: default | fallthrough | downgrading-consistency)
/// - `CASSANDRA_SESSION_NAME` (optional, default: s0)
#[cfg(feature = "config")]
impl FromEnv for CassandraHealthConfig {
    fn from_env() -> Result<Self, ConfigError> {
        let contact_points = env_list("CASSANDRA_CONTACT_POINTS");
        if contact_points.is_empty() {
            return Err(ConfigError::MissingEnvVar(
                "CASSANDRA_CONTACT_POINTS".to_string(),
            ));
        }

        let defaults = Self::default();

        Ok(Self {
            contact_points,
            port: env_parse_or("CASSANDRA_PORT", defaults.port)?,
            keyspace: env_non_blank("CASSANDRA_KEYSPACE"),
            local_datacenter: env_non_blank("CASSANDRA_LOCAL_DATACENTER"),
            username: env_non_blank("CASSANDRA_USERNAME"),
            password: env_non_blank("CASSANDRA_PASSWORD"),
            connect_timeout_secs: env_parse_or(
                "CASSANDRA_CONNECT_TIMEOUT_SECS",
                defaults.connect_timeout_secs,
            )?,
            request_timeout_secs: env_parse_or(
                "CASSANDRA_REQUEST_TIMEOUT_SECS",
                defaults.request_timeout_secs,
            )?,
            liveness_timeout_ms: env_parse_or(
                "CASSANDRA_LIVENESS_TIMEOUT_MS",
                defaults.liveness_timeout_ms,
            )?,
            metadata_refresh_secs: env_parse_or(
                "CASSANDRA_METADATA_REFRESH_SECS",
                defaults.metadata_refresh_secs,
            )?,
            connections_per_host: env_parse_or(
                "CASSANDRA_CONNECTIONS_PER_HOST",
                defaults.connections_per_host,
            )?,
            load_balancing: env_parse_or("CASSANDRA_LOAD_BALANCING", defaults.load_balancing)?,
            retry_policy: env_parse_or("CASSANDRA_RETRY_POLICY", defaults.retry_policy)?,
            session_name: env_or_default("CASSANDRA_SESSION_NAME", &defaults.session_name),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_new_uses_defaults() {
        let config = CassandraHealthConfig::new(vec!["10.0.0.1"]);
        assert_eq!(config.contact_points, vec!["10.0.0.1"]);
        assert_eq!(config.port, 9042);
        assert!(config.keyspace.is_none());
        assert_eq!(config.liveness_timeout(), Duration::from_secs(5));
        assert_eq!(config.session_name, "s0");
    }

    #[test]
    fn test_config_builder_pattern() {
        let config = CassandraHealthConfig::new(vec!["cassandra"])
            .with_port(19042)
            .with_datacenter("dc1")
            .with_keyspace("test")
            .with_credentials("user", "pass")
            .with_liveness_timeout(750)
            .with_request_timeout(12)
            .with_metadata_refresh(5)
            .with_session_name("diagnostics")
            .with_load_balancing(LoadBalancingPolicyKind::DcAware)
            .with_retry_policy(RetryPolicyKind::Fallthrough);

        assert_eq!(config.local_datacenter(), Some("dc1"));
        assert_eq!(config.keyspace(), Some("test"));
        assert_eq!(config.credentials(), Some(("user", "pass")));
        assert_eq!(config.liveness_timeout(), Duration::from_millis(750));
        assert_eq!(config.request_timeout(), Duration::from_secs(12));
        assert_eq!(config.metadata_refresh_interval(), Duration::from_secs(5));
        assert_eq!(config.session_name, "diagnostics");
        assert_eq!(config.contact_addresses(), vec!["cassandra:19042"]);
    }

    #[test]
    fn test_credentials_require_both_non_blank() {
        let config = CassandraHealthConfig::default().with_credentials("user", "  ");
        assert_eq!(config.credentials(), None);

        let config = CassandraHealthConfig::default().with_credentials("", "secret");
        assert_eq!(config.credentials(), None);

        let mut config = CassandraHealthConfig::default();
        config.username = Some("user".to_string());
        assert_eq!(config.credentials(), None);
    }

    #[test]
    fn test_contact_addresses_keep_explicit_ports() {
        let config = CassandraHealthConfig::new(vec![
            "10.0.0.1",
            "10.0.0.2:9142",
            "node-3",
            "node-4:9242",
            "::1",
            "[::1]:9343",
        ])
        .with_port(9042);

        assert_eq!(
            config.contact_addresses(),
            vec![
                "10.0.0.1:9042",
                "10.0.0.2:9142",
                "node-3:9042",
                "node-4:9242",
                "[::1]:9042",
                "[::1]:9343",
            ]
        );
    }

    #[test]
    fn test_validate_rejects_empty_contact_points() {
        let config = CassandraHealthConfig::new(vec![" "]);
        let err = config.validate().unwrap_err();
        assert!(err.is_fatal());
        assert!(err.to_string().contains("contact points"));
    }

    #[test]
    fn test_validate_rejects_zero_pool() {
        let config = CassandraHealthConfig::default().with_connections_per_host(0);
        assert!(config.validate().is_err());
        assert!(CassandraHealthConfig::default().validate().is_ok());
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_config_from_env() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("node1, node2")),
                ("CASSANDRA_PORT", Some("19042")),
                ("CASSANDRA_KEYSPACE", Some("test")),
                ("CASSANDRA_LOCAL_DATACENTER", Some("datacenter1")),
                ("CASSANDRA_USERNAME", Some("cassandra")),
                ("CASSANDRA_PASSWORD", Some("")),
                ("CASSANDRA_LOAD_BALANCING", Some("round-robin")),
                ("CASSANDRA_RETRY_POLICY", None::<&str>),
            ],
            || {
                let config = CassandraHealthConfig::from_env().unwrap();
                assert_eq!(config.contact_points, vec!["node1", "node2"]);
                assert_eq!(config.port, 19042);
                assert_eq!(config.keyspace(), Some("test"));
                assert_eq!(config.local_datacenter(), Some("datacenter1"));
                assert_eq!(config.credentials(), None);
                assert_eq!(config.load_balancing, LoadBalancingPolicyKind::RoundRobin);
                assert_eq!(config.retry_policy, RetryPolicyKind::Default);
            },
        );
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_config_from_env_missing_contact_points() {
        temp_env::with_var("CASSANDRA_CONTACT_POINTS", Some(" , "), || {
            let err = CassandraHealthConfig::from_env().unwrap_err();
            assert!(err.to_string().contains("CASSANDRA_CONTACT_POINTS"));
        });
    }

    #[cfg(feature = "config")]
    #[test]
    fn test_config_from_env_unknown_policy() {
        temp_env::with_vars(
            [
                ("CASSANDRA_CONTACT_POINTS", Some("node1")),
                ("CASSANDRA_RETRY_POLICY", Some("forever")),
            ],
            || {
                let err = CassandraHealthConfig::from_env().unwrap_err();
                assert!(err.to_string().contains("CASSANDRA_RETRY_POLICY"));
            },
        );
    }
}
