use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EquipmentSummary, PortStatus};

/// Canonical switch port labels, assigned by port number at creation time
pub mod port_role {
    pub const UPLINK: &str = "uplink";
    pub const POE: &str = "PoE";
    pub const ACCESS: &str = "access";

    /// Ports 1-4 are uplinks, 5-8 PoE, everything above is access
    pub fn label_for(number: i32) -> &'static str {
        match number {
            1..=4 => UPLINK,
            5..=8 => POE,
            _ => ACCESS,
        }
    }
}

/// Switch is a physical network switch
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Switch {
    pub id: i64,
    pub name: String,
    pub brand: String,
    pub model: String,
    pub created_at: DateTime<Utc>,
}

/// SwitchPort is the stored row; status is never persisted
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchPort {
    pub id: i64,
    pub switch_id: i64,
    pub number: i32,
    pub description: String,
}

/// SwitchPortView is a port with its projected status and whatever occupies it
#[derive(Debug, Clone, Serialize)]
pub struct SwitchPortView {
    pub id: i64,
    pub switch_id: i64,
    pub number: i32,
    pub description: String,
    pub status: PortStatus,
    /// Equipment attached through an active direct connection
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connection_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_link: Option<PatchLink>,
}

/// PatchLink describes the patch panel port mapped onto a switch port
#[derive(Debug, Clone, Serialize)]
pub struct PatchLink {
    pub patch_panel_id: i64,
    pub patch_panel_name: String,
    pub patch_port_id: i64,
    pub patch_port_number: i32,
    pub keystone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentSummary>,
}

/// CreateSwitchRequest creates a switch and its ports in one step
#[derive(Debug, Clone, Deserialize)]
pub struct CreateSwitchRequest {
    pub name: String,
    pub brand: String,
    pub model: String,
    pub port_count: i32,
}

/// UpdateSwitchRequest edits the descriptive fields only
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateSwitchRequest {
    pub name: String,
    pub brand: String,
    pub model: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RecreatePortsRequest {
    pub port_count: i32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddPortsRequest {
    pub extra_count: i32,
}

/// PortRebuildOutcome reports what a destructive switch operation retired
#[derive(Debug, Clone, Default, Serialize)]
pub struct PortRebuildOutcome {
    pub switch_id: i64,
    pub port_count: i32,
    pub deactivated_connections: u64,
    pub cleared_mappings: u64,
}
