use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Physical condition of a cable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum CableStatus {
    InService,
    InStock,
    Defective,
}

impl CableStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InService => "in-service",
            Self::InStock => "in-stock",
            Self::Defective => "defective",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in-service" => Some(Self::InService),
            "in-stock" => Some(Self::InStock),
            "defective" => Some(Self::Defective),
            _ => None,
        }
    }
}

impl Default for CableStatus {
    fn default() -> Self {
        Self::InService
    }
}

/// Cable is one physical cable in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Cable {
    pub id: i64,
    pub unique_code: String,
    pub kind: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub length: Option<i32>,
    pub brand: String,
    pub model: String,
    pub description: String,
    pub status: CableStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// CableView adds whether the cable currently has an open connection
#[derive(Debug, Clone, Serialize)]
pub struct CableView {
    #[serde(flatten)]
    pub cable: Cable,
    pub connected: bool,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterCableRequest {
    pub unique_code: String,
    pub kind: String,
    #[serde(default)]
    pub length: Option<i32>,
    #[serde(default)]
    pub brand: String,
    #[serde(default)]
    pub model: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: CableStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CableListQuery {
    #[serde(default)]
    pub status: Option<CableStatus>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub connected: Option<bool>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MarkCableDefectiveRequest {
    #[serde(default = "default_defect_reason")]
    pub reason: String,
}

fn default_defect_reason() -> String {
    "replacement".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct RepairCableRequest {
    #[serde(default)]
    pub status: CableStatus,
    #[serde(default = "default_repair_justification")]
    pub justification: String,
}

fn default_repair_justification() -> String {
    "repair completed".to_string()
}

/// CableConnection is an audit row of where a cable was physically plugged.
/// It never drives switch or patch port status.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CableConnection {
    pub id: i64,
    pub cable_id: i64,
    pub from_equipment_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_equipment_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_port: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub room_id: Option<i64>,
    pub note: String,
    pub connected_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub disconnected_at: Option<DateTime<Utc>>,
}

impl CableConnection {
    pub fn is_open(&self) -> bool {
        self.disconnected_at.is_none()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CreateCableConnectionRequest {
    pub cable_id: i64,
    pub from_equipment_id: i64,
    #[serde(default)]
    pub to_equipment_id: Option<i64>,
    #[serde(default)]
    pub from_port: Option<String>,
    #[serde(default)]
    pub to_port: Option<String>,
    #[serde(default)]
    pub room_id: Option<i64>,
    #[serde(default)]
    pub note: String,
}
