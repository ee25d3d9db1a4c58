use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{EquipmentSummary, PortStatus};

/// Canonical patch panel administrative status values
pub mod panel_status {
    pub const ACTIVE: &str = "active";
    pub const INACTIVE: &str = "inactive";

    pub fn is_valid(status: &str) -> bool {
        status == ACTIVE || status == INACTIVE
    }
}

/// PatchPanel is a passive cross-connect panel on a floor
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchPanel {
    pub id: i64,
    pub code: String,
    pub name: String,
    pub floor: i32,
    pub port_start: i32,
    pub port_count: i32,
    pub keystone_prefix: String,
    pub status: String,
    pub description: String,
    pub created_at: DateTime<Utc>,
}

impl PatchPanel {
    pub fn port_end(&self) -> i32 {
        self.port_start.saturating_add(self.port_count.saturating_sub(1))
    }

    /// Prefix used for keystone labels; blank prefixes fall back to the floor default
    pub fn effective_prefix(&self) -> String {
        if self.keystone_prefix.trim().is_empty() {
            format!("PT{}", 20 + self.floor)
        } else {
            self.keystone_prefix.trim().to_string()
        }
    }

    /// Human-readable termination label for one of this panel's ports
    pub fn keystone(&self, number: i32) -> String {
        keystone_label(&self.effective_prefix(), number)
    }
}

/// Format a keystone label as `PREFIX-NNNN`
pub fn keystone_label(prefix: &str, number: i32) -> String {
    format!("{}-{:04}", prefix, number)
}

/// PatchPanelView adds derived numbering to a panel
#[derive(Debug, Clone, Serialize)]
pub struct PatchPanelView {
    #[serde(flatten)]
    pub panel: PatchPanel,
    pub port_end: i32,
}

impl From<PatchPanel> for PatchPanelView {
    fn from(panel: PatchPanel) -> Self {
        let port_end = panel.port_end();
        Self { panel, port_end }
    }
}

/// PatchPanelPort is the stored row.
/// The switch mapping is a loose (switch id, port number) pair, not a port id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchPanelPort {
    pub id: i64,
    pub patch_panel_id: i64,
    pub number: i32,
    pub mapped_switch_id: Option<i64>,
    pub mapped_switch_port: Option<i32>,
    pub equipment_id: Option<i64>,
    pub connected_at: Option<DateTime<Utc>>,
}

impl PatchPanelPort {
    pub fn mapping(&self) -> Option<(i64, i32)> {
        match (self.mapped_switch_id, self.mapped_switch_port) {
            (Some(switch_id), Some(number)) => Some((switch_id, number)),
            _ => None,
        }
    }

    pub fn status(&self) -> PortStatus {
        crate::engine::projection::patch_port_status(self)
    }
}

/// PatchPortView is a patch port with derived status and resolved references
#[derive(Debug, Clone, Serialize)]
pub struct PatchPortView {
    pub id: i64,
    pub patch_panel_id: i64,
    pub number: i32,
    pub status: PortStatus,
    pub keystone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_switch_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_switch_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mapped_switch_port: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<EquipmentSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub connected_at: Option<DateTime<Utc>>,
}

/// CreatePatchPanelRequest creates a panel and eagerly numbers its ports
#[derive(Debug, Clone, Deserialize)]
pub struct CreatePatchPanelRequest {
    pub name: String,
    pub floor: i32,
    #[serde(default = "default_port_start")]
    pub port_start: i32,
    pub port_count: i32,
    #[serde(default)]
    pub keystone_prefix: String,
    #[serde(default)]
    pub description: String,
}

/// UpdatePatchPanelRequest; changing the numbering rebuilds every port
#[derive(Debug, Clone, Deserialize)]
pub struct UpdatePatchPanelRequest {
    pub name: String,
    pub floor: i32,
    #[serde(default = "default_port_start")]
    pub port_start: i32,
    pub port_count: i32,
    #[serde(default)]
    pub keystone_prefix: Option<String>,
    #[serde(default = "default_panel_status")]
    pub status: String,
    #[serde(default)]
    pub description: String,
}

fn default_port_start() -> i32 {
    1
}

fn default_panel_status() -> String {
    panel_status::ACTIVE.to_string()
}

/// MapPatchPortRequest; both fields empty clears the mapping
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MapPatchPortRequest {
    #[serde(default)]
    pub switch_id: Option<i64>,
    #[serde(default)]
    pub switch_port: Option<i32>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ConnectEquipmentRequest {
    pub equipment_id: i64,
}

/// PatchPanelListQuery filters the panel list by floor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PatchPanelListQuery {
    #[serde(default)]
    pub floor: Option<i32>,
}

/// EquipmentPatchInfo locates the patch port an equipment terminates on
#[derive(Debug, Clone, Serialize)]
pub struct EquipmentPatchInfo {
    pub equipment_id: i64,
    pub patch_panel_id: i64,
    pub patch_panel_name: String,
    pub floor: i32,
    pub patch_port_id: i64,
    pub patch_port_number: i32,
    pub keystone: String,
}
