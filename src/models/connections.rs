use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::EquipmentSummary;

/// Lifecycle of a direct equipment-to-switch-port link
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectionStatus {
    Active,
    Inactive,
}

impl ConnectionStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Inactive => "inactive",
        }
    }

    pub fn parse(s: &str) -> Self {
        if s == "active" {
            Self::Active
        } else {
            Self::Inactive
        }
    }
}

/// DirectConnection links equipment straight to a switch port
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DirectConnection {
    pub id: i64,
    pub port_id: i64,
    pub equipment_id: i64,
    pub connected_at: DateTime<Utc>,
    pub status: ConnectionStatus,
}

impl DirectConnection {
    pub fn is_active(&self) -> bool {
        self.status == ConnectionStatus::Active
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateConnectionRequest {
    pub port_id: i64,
    pub equipment_id: i64,
}

/// ConnectionView is an active connection resolved for display
#[derive(Debug, Clone, Serialize)]
pub struct ConnectionView {
    pub id: i64,
    pub connected_at: DateTime<Utc>,
    pub port_id: i64,
    pub port_number: i32,
    pub switch_id: i64,
    pub switch_name: String,
    pub switch_brand: String,
    pub equipment: EquipmentSummary,
}

/// Which kind of link already holds an equipment
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LinkKind {
    DirectConnection,
    PatchPort,
}

impl std::fmt::Display for LinkKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DirectConnection => write!(f, "a direct switch connection"),
            Self::PatchPort => write!(f, "a patch panel port"),
        }
    }
}

/// SwitchPortDisconnect reports what a port-level disconnect cleared
#[derive(Debug, Clone, Default, Serialize)]
pub struct SwitchPortDisconnect {
    pub port_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_connection_id: Option<i64>,
    pub unmapped_patch_ports: Vec<i64>,
}
