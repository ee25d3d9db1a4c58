use sqlx::{sqlite::SqliteRow, Row};
use std::collections::BTreeMap;

use crate::models::*;

/// Filter empty strings to None; the schema stores '' for unset text
pub fn none_if_empty(opt: Option<String>) -> Option<String> {
    opt.filter(|s| !s.is_empty())
}

/// `?, ?, ?` placeholder list for an IN clause
pub fn placeholders(n: usize) -> String {
    vec!["?"; n].join(", ")
}

pub fn map_switch_row(row: &SqliteRow) -> Switch {
    Switch {
        id: row.get("id"),
        name: row.get("name"),
        brand: row.get("brand"),
        model: row.get("model"),
        created_at: row.get("created_at"),
    }
}

pub fn map_switch_port_row(row: &SqliteRow) -> SwitchPort {
    SwitchPort {
        id: row.get("id"),
        switch_id: row.get("switch_id"),
        number: row.get("number"),
        description: row.get("description"),
    }
}

pub fn map_connection_row(row: &SqliteRow) -> DirectConnection {
    let status: String = row.get("status");
    DirectConnection {
        id: row.get("id"),
        port_id: row.get("port_id"),
        equipment_id: row.get("equipment_id"),
        connected_at: row.get("connected_at"),
        status: ConnectionStatus::parse(&status),
    }
}

pub fn map_patch_panel_row(row: &SqliteRow) -> PatchPanel {
    PatchPanel {
        id: row.get("id"),
        code: row.get("code"),
        name: row.get("name"),
        floor: row.get("floor"),
        port_start: row.get("port_start"),
        port_count: row.get("port_count"),
        keystone_prefix: row.get("keystone_prefix"),
        status: row.get("status"),
        description: row.get("description"),
        created_at: row.get("created_at"),
    }
}

pub fn map_patch_port_row(row: &SqliteRow) -> PatchPanelPort {
    PatchPanelPort {
        id: row.get("id"),
        patch_panel_id: row.get("patch_panel_id"),
        number: row.get("number"),
        mapped_switch_id: row.get("mapped_switch_id"),
        mapped_switch_port: row.get("mapped_switch_port"),
        equipment_id: row.get("equipment_id"),
        connected_at: row.get("connected_at"),
    }
}

pub fn map_room_row(row: &SqliteRow) -> Room {
    Room {
        id: row.get("id"),
        name: row.get("name"),
        kind: row.get("kind"),
        description: row.get("description"),
        floor: row.get("floor"),
        created_at: row.get("created_at"),
    }
}

/// Equipment rows carry no extra data; the repo attaches it afterwards
pub fn map_equipment_row(row: &SqliteRow) -> Equipment {
    let defective: i32 = row.get("defective");
    Equipment {
        id: row.get("id"),
        name: row.get("name"),
        kind: row.get("kind"),
        brand: row.get("brand"),
        model: row.get("model"),
        description: row.get("description"),
        room_id: row.get("room_id"),
        defective: defective != 0,
        extra_data: BTreeMap::new(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub fn map_cable_row(row: &SqliteRow) -> Cable {
    let status: String = row.get("status");
    Cable {
        id: row.get("id"),
        unique_code: row.get("unique_code"),
        kind: row.get("kind"),
        length: row.get("length"),
        brand: row.get("brand"),
        model: row.get("model"),
        description: row.get("description"),
        status: CableStatus::parse(&status).unwrap_or_default(),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

pub fn map_cable_connection_row(row: &SqliteRow) -> CableConnection {
    CableConnection {
        id: row.get("id"),
        cable_id: row.get("cable_id"),
        from_equipment_id: row.get("from_equipment_id"),
        to_equipment_id: row.get("to_equipment_id"),
        from_port: none_if_empty(row.get("from_port")),
        to_port: none_if_empty(row.get("to_port")),
        room_id: row.get("room_id"),
        note: row.get("note"),
        connected_at: row.get("connected_at"),
        disconnected_at: row.get("disconnected_at"),
    }
}

pub fn map_ping_log_row(row: &SqliteRow) -> PingLog {
    let success: i32 = row.get("success");
    PingLog {
        id: row.get("id"),
        equipment_id: row.get("equipment_id"),
        equipment_name: row.get("equipment_name"),
        ip: row.get("ip"),
        success: success != 0,
        output: row.get("output"),
        checked_at: row.get("checked_at"),
    }
}
