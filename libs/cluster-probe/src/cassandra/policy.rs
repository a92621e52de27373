use strum::{EnumString, IntoStaticStr};

/// Load-balancing strategy applied to an execution profile.
///
/// Parsed from kebab-case configuration values (`token-aware`, `dc-aware`,
/// `round-robin`). The report uses [`LoadBalancingPolicyKind::identifier`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum LoadBalancingPolicyKind {
    /// Token-aware routing, preferring replicas in the local datacenter
    #[default]
    TokenAware,
    /// Round-robin over the local datacenter first, remote datacenters after
    DcAware,
    /// Plain round-robin over every node
    RoundRobin,
}

impl LoadBalancingPolicyKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::TokenAware => "TokenAwarePolicy",
            Self::DcAware => "DcAwareRoundRobinPolicy",
            Self::RoundRobin => "RoundRobinPolicy",
        }
    }

    pub fn is_token_aware(&self) -> bool {
        matches!(self, Self::TokenAware)
    }

    pub fn prefers_local_datacenter(&self) -> bool {
        !matches!(self, Self::RoundRobin)
    }
}

/// Driver-level retry strategy applied to an execution profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, EnumString, IntoStaticStr)]
#[strum(serialize_all = "kebab-case")]
pub enum RetryPolicyKind {
    #[default]
    Default,
    Fallthrough,
    DowngradingConsistency,
}

impl RetryPolicyKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::Default => "DefaultRetryPolicy",
            Self::Fallthrough => "FallthroughRetryPolicy",
            Self::DowngradingConsistency => "DowngradingConsistencyRetryPolicy",
        }
    }
}

/// How the driver re-establishes connections to a node it lost.
///
/// The scylla driver refills its per-node pools with a doubling delay; it is
/// not configurable, so there is a single identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReconnectionPolicyKind {
    #[default]
    ExponentialBackoff,
}

impl ReconnectionPolicyKind {
    pub fn identifier(&self) -> &'static str {
        match self {
            Self::ExponentialBackoff => "ExponentialReconnectionPolicy",
        }
    }
}

/// An execution profile registered on the diagnostic session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionProfileInfo {
    pub name: String,
    pub load_balancing: LoadBalancingPolicyKind,
    pub retry: RetryPolicyKind,
}

impl ExecutionProfileInfo {
    /// Name of the profile every statement uses unless told otherwise.
    pub const DEFAULT_PROFILE: &'static str = "default";

    pub fn default_profile(
        load_balancing: LoadBalancingPolicyKind,
        retry: RetryPolicyKind,
    ) -> Self {
        Self {
            name: Self::DEFAULT_PROFILE.to_string(),
            load_balancing,
            retry,
        }
    }
}
