use serde::Serialize;
use std::collections::BTreeMap;
use uuid::Uuid;

use super::liveness::LivenessResult;
use super::nodes::NodeRecord;
use super::topology::TopologySnapshot;

/// Overall status of a health report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum HealthStatus {
    Up,
    Down,
}

/// Detail map of a report. Populated for both UP and DOWN reports.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthDetails {
    pub cluster_name: String,
    pub driver_execution_profiles: Vec<String>,
    pub hosts: Vec<String>,
    pub key_spaces: Vec<String>,
    pub load_balancing_policies: Vec<String>,
    pub local_dc: String,
    pub nodes: BTreeMap<Uuid, NodeRecord>,
    pub reconnection_policy: String,
    pub retry_policies: Vec<String>,
    pub session_name: String,
}

/// Point-in-time health of the cluster.
///
/// Built once per check and not modifiable afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    status: HealthStatus,
    details: HealthDetails,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl HealthReport {
    pub fn status(&self) -> HealthStatus {
        self.status
    }

    pub fn is_up(&self) -> bool {
        self.status == HealthStatus::Up
    }

    pub fn details(&self) -> &HealthDetails {
        &self.details
    }

    /// Failure description, present only on DOWN reports
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }
}

/// Merge the three probe outputs into one report.
///
/// Status is UP exactly when the liveness query succeeded; topology and node
/// details are carried either way.
pub fn assemble(
    topology: TopologySnapshot,
    nodes: BTreeMap<Uuid, NodeRecord>,
    liveness: LivenessResult,
) -> HealthReport {
    let details = HealthDetails {
        cluster_name: topology.cluster_name,
        driver_execution_profiles: topology.execution_profiles,
        hosts: topology.hosts,
        key_spaces: topology.keyspaces,
        load_balancing_policies: topology.load_balancing_policies,
        local_dc: topology.local_datacenter,
        nodes,
        reconnection_policy: topology.reconnection_policy,
        retry_policies: topology.retry_policies,
        session_name: topology.session_name,
    };

    match liveness {
        LivenessResult::Reachable { .. } => HealthReport {
            status: HealthStatus::Up,
            details,
            error: None,
        },
        LivenessResult::Unreachable { error } => HealthReport {
            status: HealthStatus::Down,
            details,
            error: Some(error),
        },
    }
}
