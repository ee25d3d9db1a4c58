use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Extra data keys surfaced in equipment summaries
pub mod data_key {
    pub const IP1: &str = "ip1";
    pub const IP2: &str = "ip2";
    pub const MAC1: &str = "mac1";
    pub const MAC2: &str = "mac2";
}

/// Room is a physical space equipment can be assigned to
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub floor: Option<i32>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub floor: Option<i32>,
}

/// UpdateRoomRequest edits a room; `equipment_ids`, when present, becomes
/// the room's exact equipment set
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateRoomRequest {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub floor: Option<i32>,
    #[serde(default)]
    pub equipment_ids: Option<Vec<i64>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RoomUpdateOutcome {
    pub room: Room,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub equipment: Option<ReassignOutcome>,
}

/// One switch port carrying a room's equipment
#[derive(Debug, Clone, Serialize)]
pub struct RoomPortUse {
    pub port_number: i32,
    pub link: super::LinkKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub patch_port_id: Option<i64>,
    pub equipment: EquipmentSummary,
}

/// A switch serving a room, with the ports that reach its equipment
#[derive(Debug, Clone, Serialize)]
pub struct RoomSwitchUsage {
    pub switch: super::Switch,
    pub ports: Vec<RoomPortUse>,
}

/// Equipment holds a weak room reference and never owns ports
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Equipment {
    pub id: i64,
    pub name: String,
    pub kind: String,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub room_id: Option<i64>,
    pub defective: bool,
    /// IP/MAC addresses and other free-form attributes
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Equipment {
    /// Non-empty extra data value for a key
    pub fn data(&self, key: &str) -> Option<&str> {
        self.extra_data
            .get(key)
            .map(|v| v.trim())
            .filter(|v| !v.is_empty())
    }

    pub fn summary(&self, room_name: Option<String>) -> EquipmentSummary {
        EquipmentSummary {
            id: self.id,
            name: self.name.clone(),
            kind: self.kind.clone(),
            room_id: self.room_id,
            room_name,
            ip1: self.data(data_key::IP1).map(str::to_string),
            ip2: self.data(data_key::IP2).map(str::to_string),
            mac1: self.data(data_key::MAC1).map(str::to_string),
            mac2: self.data(data_key::MAC2).map(str::to_string),
        }
    }
}

/// EquipmentSummary is the compact form embedded in port views
#[derive(Debug, Clone, Serialize)]
pub struct EquipmentSummary {
    pub id: i64,
    pub name: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ip2: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac1: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mac2: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateEquipmentRequest {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
}

/// UpdateEquipmentRequest; extra data keys are merged, empty values remove a key
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateEquipmentRequest {
    pub name: String,
    #[serde(default)]
    pub kind: String,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub extra_data: BTreeMap<String, String>,
}

/// EquipmentFilter selects which equipment a list call returns
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentFilter {
    #[default]
    All,
    /// Not assigned to any room
    Unassigned,
    /// In a room, addressable, not linked to any port, not defective
    Connectable,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct EquipmentListQuery {
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub filter: EquipmentFilter,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkDefectiveRequest {
    pub defective: bool,
}

/// AssignRoomRequest moves equipment to a room; `None` unlinks it
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AssignRoomRequest {
    #[serde(default)]
    pub room_id: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ReassignRoomRequest {
    #[serde(default)]
    pub equipment_ids: Vec<i64>,
}

/// UnlinkOutcome reports the cascade triggered by removing equipment from its room
#[derive(Debug, Clone, Serialize)]
pub struct UnlinkOutcome {
    pub equipment: Equipment,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub deactivated_connection_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub freed_port_id: Option<i64>,
    /// Patch ports whose equipment link was cleared (deletion only)
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub released_patch_ports: Vec<i64>,
}

/// ItemFailure records one failed item of a bulk operation
#[derive(Debug, Clone, Serialize)]
pub struct ItemFailure {
    pub id: i64,
    pub kind: crate::error::ErrorKind,
    pub error: String,
}

/// ReassignOutcome reports a room equipment-set diff
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReassignOutcome {
    pub room_id: i64,
    pub linked: Vec<i64>,
    pub unlinked: Vec<UnlinkOutcome>,
    pub failures: Vec<ItemFailure>,
}
