//! # Replication Policy
//!
//! Resolves the single replication policy applied to every secret created in a
//! run. The caller picks exactly one mode: automatic (`--global`) or an explicit
//! comma-separated list of locations.

use std::fmt;

use crate::config::ConfigError;

/// Where the backend stores a secret's data. Fixed when the container is created.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReplicationPolicy {
    /// Backend chooses replica placement
    Automatic,
    /// Replicas pinned to these locations, in the order given
    UserManaged { locations: Vec<String> },
}

impl ReplicationPolicy {
    /// Resolve the run's policy from the `global` toggle and the location list.
    ///
    /// An empty `location_list` means no locations were given. Supplying both
    /// modes, or neither, is a [`ConfigError::ReplicationMode`].
    pub fn resolve(global: bool, location_list: &str) -> Result<Self, ConfigError> {
        match (global, location_list.is_empty()) {
            (true, true) => Ok(Self::Automatic),
            (false, false) => Ok(Self::UserManaged {
                locations: location_list.split(',').map(str::to_string).collect(),
            }),
            _ => Err(ConfigError::ReplicationMode),
        }
    }

    /// Locations for user-managed replication; empty for automatic
    pub fn locations(&self) -> &[String] {
        match self {
            Self::Automatic => &[],
            Self::UserManaged { locations } => locations,
        }
    }

    pub fn is_automatic(&self) -> bool {
        matches!(self, Self::Automatic)
    }
}

impl fmt::Display for ReplicationPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Automatic => write!(f, "automatic"),
            Self::UserManaged { locations } => write!(f, "user-managed[{}]", locations.join(",")),
        }
    }
}
