use cluster_probe::{Backoff, CassandraHealthConfig};
use core_config::{AppInfo, FromEnv, app_info, env_parse_or, server::ServerConfig};
use std::time::Duration;

// Re-export Environment for use in other modules
pub use core_config::Environment;

/// Application configuration, composed from the shared config components
#[derive(Clone, Debug)]
pub struct Config {
    pub app: AppInfo,
    pub cassandra: CassandraHealthConfig,
    pub server: ServerConfig,
    pub environment: Environment,
    /// Attempts at opening the diagnostic connection before giving up
    pub startup_attempts: u32,
}

impl Config {
    pub fn from_env() -> eyre::Result<Self> {
        let environment = Environment::from_env();
        let cassandra = CassandraHealthConfig::from_env()?;
        let server = ServerConfig::from_env()?;
        let startup_attempts = env_parse_or("CASSANDRA_STARTUP_ATTEMPTS", 1)?;

        Ok(Self {
            app: app_info!(),
            cassandra,
            server,
            environment,
            startup_attempts,
        })
    }

    pub fn startup_backoff(&self) -> Backoff {
        Backoff::attempts(self.startup_attempts)
            .with_initial_delay(Duration::from_secs(1))
            .with_max_delay(Duration::from_secs(15))
    }
}
