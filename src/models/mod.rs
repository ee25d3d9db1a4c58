mod cables;
mod connections;
mod equipment;
mod patch_panels;
mod switches;

pub use cables::*;
pub use connections::*;
pub use equipment::*;
pub use patch_panels::*;
pub use switches::*;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Derived status shared by switch ports and patch panel ports
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PortStatus {
    Free,
    Occupied,
    Mapped,
}

impl std::fmt::Display for PortStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Free => "free",
            Self::Occupied => "occupied",
            Self::Mapped => "mapped",
        };
        f.write_str(s)
    }
}

/// PingLog is one reachability probe result
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PingLog {
    pub id: i64,
    pub equipment_id: i64,
    pub equipment_name: String,
    pub ip: String,
    pub success: bool,
    pub output: String,
    pub checked_at: DateTime<Utc>,
}

/// NewPingLog is a probe result waiting to be recorded
#[derive(Debug, Clone)]
pub struct NewPingLog {
    pub equipment_id: i64,
    pub equipment_name: String,
    pub ip: String,
    pub success: bool,
    pub output: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingLogQuery {
    #[serde(default = "default_ping_log_limit")]
    pub limit: i32,
}

fn default_ping_log_limit() -> i32 {
    100
}

/// SweepSummary is returned after a reachability sweep
#[derive(Debug, Clone, Default, Serialize)]
pub struct SweepSummary {
    pub probed: usize,
    pub reachable: usize,
    pub unreachable: usize,
    pub results: Vec<PingLog>,
}

/// Violation is one broken connectivity invariant found by the audit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "violation", rename_all = "snake_case")]
pub enum Violation {
    /// Equipment holds an active direct connection and a patch port link
    DualLink {
        equipment_id: i64,
        connection_id: i64,
        patch_port_id: i64,
    },
    MultipleActiveConnections {
        equipment_id: i64,
        connection_ids: Vec<i64>,
    },
    MultiplePatchPorts {
        equipment_id: i64,
        patch_port_ids: Vec<i64>,
    },
    DuplicateMapping {
        switch_id: i64,
        switch_port: i32,
        patch_port_ids: Vec<i64>,
    },
    ConnectionOnMissingPort {
        connection_id: i64,
        port_id: i64,
    },
    MappingToMissingSwitch {
        patch_port_id: i64,
        switch_id: i64,
    },
    /// A switch port carries a direct connection and patched equipment at once
    SharedSwitchPort {
        switch_id: i64,
        switch_port: i32,
        connection_id: i64,
        patch_port_id: i64,
    },
}

/// ConsistencyReport lists every violation; nothing is repaired
#[derive(Debug, Clone, Default, Serialize)]
pub struct ConsistencyReport {
    pub checked_at: Option<DateTime<Utc>>,
    pub violations: Vec<Violation>,
}

impl ConsistencyReport {
    pub fn is_clean(&self) -> bool {
        self.violations.is_empty()
    }
}
