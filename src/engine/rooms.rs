//! Rooms, equipment, and the cascades that keep equipment links consistent
//! when equipment leaves a room, turns defective or is deleted.

use chrono::Utc;
use std::collections::{BTreeMap, HashSet};

use crate::db::{Store, StorageTx};
use crate::error::{Error, Result};
use crate::models::*;

use super::connections::deactivate_for_equipment;
use super::mapping::release_equipment;
use super::projection::MappingIndex;
use super::{require_equipment, require_text, Directory};

pub async fn get_room(tx: &mut dyn StorageTx, id: i64) -> Result<Room> {
    tx.get_room(id)
        .await?
        .ok_or_else(|| Error::not_found("room", id))
}

/// Room names compare trimmed and case-folded, the same on every backend
async fn ensure_unique_name(tx: &mut dyn StorageTx, name: &str, except: Option<i64>) -> Result<()> {
    let wanted = name.trim().to_lowercase();
    let clash = tx
        .list_rooms()
        .await?
        .into_iter()
        .any(|r| Some(r.id) != except && r.name.trim().to_lowercase() == wanted);
    if clash {
        return Err(Error::conflict(format!(
            "a room named {} already exists",
            name.trim()
        )));
    }
    Ok(())
}

pub async fn list_rooms(tx: &mut dyn StorageTx) -> Result<Vec<Room>> {
    let mut rooms = tx.list_rooms().await?;
    rooms.sort_by_cached_key(|r| (r.name.to_lowercase(), r.id));
    Ok(rooms)
}

pub async fn create_room(tx: &mut dyn StorageTx, req: &CreateRoomRequest) -> Result<Room> {
    require_text("name", &req.name)?;
    ensure_unique_name(tx, &req.name, None).await?;
    Ok(tx.insert_room(req).await?)
}

/// Edit the room's details and, when given, replace its equipment set
pub async fn update_room(
    tx: &mut dyn StorageTx,
    id: i64,
    req: &UpdateRoomRequest,
) -> Result<RoomUpdateOutcome> {
    require_text("name", &req.name)?;
    let mut room = get_room(tx, id).await?;
    ensure_unique_name(tx, &req.name, Some(id)).await?;

    room.name = req.name.trim().to_string();
    room.kind = req.kind.clone();
    room.description = req.description.clone();
    room.floor = req.floor;
    tx.update_room(&room).await?;

    let equipment = match &req.equipment_ids {
        Some(ids) => Some(reassign_equipment_set(tx, id, ids).await?),
        None => None,
    };
    Ok(RoomUpdateOutcome { room, equipment })
}

/// Switches reaching the room's equipment, by direct connection or through
/// a patch mapping, ordered by switch id and port number
pub async fn switches_for_room(tx: &mut dyn StorageTx, room_id: i64) -> Result<Vec<RoomSwitchUsage>> {
    get_room(tx, room_id).await?;
    let members: HashSet<i64> = tx
        .list_equipment_in_room(room_id)
        .await?
        .iter()
        .map(|e| e.id)
        .collect();
    if members.is_empty() {
        return Ok(Vec::new());
    }

    // (switch id, port number, link, patch port, equipment)
    let mut uses: Vec<(i64, i32, LinkKind, Option<i64>, i64)> = Vec::new();

    let direct: Vec<DirectConnection> = tx
        .list_active_connections()
        .await?
        .into_iter()
        .filter(|c| members.contains(&c.equipment_id))
        .collect();
    let port_ids: Vec<i64> = direct.iter().map(|c| c.port_id).collect();
    let ports: BTreeMap<i64, SwitchPort> = tx
        .switch_ports_by_ids(&port_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    for conn in &direct {
        if let Some(port) = ports.get(&conn.port_id) {
            uses.push((port.switch_id, port.number, LinkKind::DirectConnection, None, conn.equipment_id));
        }
    }

    let patch_ports = tx.list_all_patch_ports().await?;
    let index = MappingIndex::build(patch_ports.iter().cloned());
    for pp in &patch_ports {
        let (Some((switch_id, number)), Some(equipment_id)) = (pp.mapping(), pp.equipment_id) else {
            continue;
        };
        let wins = index.lookup(switch_id, number).map(|w| w.id) == Some(pp.id);
        if wins && members.contains(&equipment_id) {
            uses.push((switch_id, number, LinkKind::PatchPort, Some(pp.id), equipment_id));
        }
    }

    let directory = Directory::load(tx, uses.iter().map(|u| u.4)).await?;
    let mut by_switch: BTreeMap<i64, Vec<RoomPortUse>> = BTreeMap::new();
    for (switch_id, port_number, link, patch_port_id, equipment_id) in uses {
        let Some(equipment) = directory.summary(equipment_id) else {
            continue;
        };
        by_switch.entry(switch_id).or_default().push(RoomPortUse {
            port_number,
            link,
            patch_port_id,
            equipment,
        });
    }

    let mut usage = Vec::with_capacity(by_switch.len());
    for (switch_id, mut ports) in by_switch {
        // mappings may point at a switch that no longer exists
        let Some(switch) = tx.get_switch(switch_id).await? else {
            continue;
        };
        ports.sort_by_key(|p| p.port_number);
        usage.push(RoomSwitchUsage { switch, ports });
    }
    Ok(usage)
}

/// Unlink every equipment in the room, then remove it
pub async fn delete_room(tx: &mut dyn StorageTx, id: i64) -> Result<Vec<UnlinkOutcome>> {
    get_room(tx, id).await?;
    let mut outcomes = Vec::new();
    for equipment in tx.list_equipment_in_room(id).await? {
        outcomes.push(unlink(tx, equipment).await?);
    }
    tx.delete_room(id).await?;
    Ok(outcomes)
}

/// Drop the room and the direct connection; the patch port link stays
async fn unlink(tx: &mut dyn StorageTx, mut equipment: Equipment) -> Result<UnlinkOutcome> {
    equipment.room_id = None;
    equipment.updated_at = Utc::now();
    tx.update_equipment(&equipment).await?;

    let retired = deactivate_for_equipment(tx, equipment.id).await?;
    Ok(UnlinkOutcome {
        equipment,
        deactivated_connection_id: retired.as_ref().map(|c| c.id),
        freed_port_id: retired.map(|c| c.port_id),
        released_patch_ports: Vec::new(),
    })
}

pub async fn unlink_from_room(tx: &mut dyn StorageTx, equipment_id: i64) -> Result<UnlinkOutcome> {
    let equipment = require_equipment(tx, equipment_id).await?;
    unlink(tx, equipment).await
}

/// Marking defective unlinks; clearing the flag touches nothing else
pub async fn mark_defective(
    tx: &mut dyn StorageTx,
    equipment_id: i64,
    defective: bool,
) -> Result<UnlinkOutcome> {
    let mut equipment = require_equipment(tx, equipment_id).await?;
    equipment.defective = defective;
    if defective {
        return unlink(tx, equipment).await;
    }

    equipment.updated_at = Utc::now();
    tx.update_equipment(&equipment).await?;
    Ok(UnlinkOutcome {
        equipment,
        deactivated_connection_id: None,
        freed_port_id: None,
        released_patch_ports: Vec::new(),
    })
}

/// Move equipment to a room, or unlink it when no room is given
pub async fn assign_room(
    tx: &mut dyn StorageTx,
    equipment_id: i64,
    room_id: Option<i64>,
) -> Result<UnlinkOutcome> {
    let Some(room_id) = room_id else {
        return unlink_from_room(tx, equipment_id).await;
    };
    get_room(tx, room_id).await?;
    let mut equipment = require_equipment(tx, equipment_id).await?;
    if equipment.defective {
        return Err(Error::validation(format!(
            "equipment {} is defective and cannot be assigned to a room",
            equipment_id
        )));
    }
    equipment.room_id = Some(room_id);
    equipment.updated_at = Utc::now();
    tx.update_equipment(&equipment).await?;
    Ok(UnlinkOutcome {
        equipment,
        deactivated_connection_id: None,
        freed_port_id: None,
        released_patch_ports: Vec::new(),
    })
}

/// Make `equipment_ids` the exact membership of the room.
///
/// Equipment dropped from the set goes through the unlink cascade; added
/// equipment is moved in without touching its links. Items that cannot be
/// added are reported individually and do not stop the rest.
pub async fn reassign_equipment_set(
    tx: &mut dyn StorageTx,
    room_id: i64,
    equipment_ids: &[i64],
) -> Result<ReassignOutcome> {
    get_room(tx, room_id).await?;
    let wanted: HashSet<i64> = equipment_ids.iter().copied().collect();
    let current = tx.list_equipment_in_room(room_id).await?;
    let present: HashSet<i64> = current.iter().map(|e| e.id).collect();

    let mut outcome = ReassignOutcome {
        room_id,
        ..Default::default()
    };
    for equipment in current {
        if !wanted.contains(&equipment.id) {
            outcome.unlinked.push(unlink(tx, equipment).await?);
        }
    }

    let mut seen = HashSet::new();
    for &id in equipment_ids {
        if present.contains(&id) || !seen.insert(id) {
            continue;
        }
        match assign_room(tx, id, Some(room_id)).await {
            Ok(_) => outcome.linked.push(id),
            Err(e @ (Error::NotFound { .. } | Error::Validation(_))) => {
                tracing::warn!(room_id, equipment_id = id, "Skipping equipment: {}", e);
                outcome.failures.push(ItemFailure {
                    id,
                    kind: e.kind(),
                    error: e.to_string(),
                });
            }
            Err(e) => return Err(e),
        }
    }
    Ok(outcome)
}

pub async fn create_equipment(tx: &mut dyn StorageTx, req: &CreateEquipmentRequest) -> Result<Equipment> {
    require_text("name", &req.name)?;
    if let Some(room_id) = req.room_id {
        get_room(tx, room_id).await?;
    }
    Ok(tx.insert_equipment(req).await?)
}

pub async fn update_equipment(
    tx: &mut dyn StorageTx,
    id: i64,
    req: &UpdateEquipmentRequest,
) -> Result<Equipment> {
    require_text("name", &req.name)?;
    let mut equipment = require_equipment(tx, id).await?;
    equipment.name = req.name.trim().to_string();
    equipment.kind = req.kind.clone();
    equipment.brand = req.brand.clone();
    equipment.model = req.model.clone();
    equipment.description = req.description.clone();
    for (key, value) in &req.extra_data {
        let value = value.trim();
        if value.is_empty() {
            equipment.extra_data.remove(key);
        } else {
            equipment.extra_data.insert(key.clone(), value.to_string());
        }
    }
    equipment.updated_at = Utc::now();
    tx.update_equipment(&equipment).await?;
    Ok(equipment)
}

/// Retire every link the equipment holds, then remove it
pub async fn delete_equipment(tx: &mut dyn StorageTx, id: i64) -> Result<UnlinkOutcome> {
    let equipment = require_equipment(tx, id).await?;
    let retired = deactivate_for_equipment(tx, id).await?;
    let released = release_equipment(tx, id).await?;
    tx.delete_equipment(id).await?;
    Ok(UnlinkOutcome {
        equipment,
        deactivated_connection_id: retired.as_ref().map(|c| c.id),
        freed_port_id: retired.map(|c| c.port_id),
        released_patch_ports: released,
    })
}

pub async fn list_equipment(tx: &mut dyn StorageTx, query: &EquipmentListQuery) -> Result<Vec<Equipment>> {
    let items = match query.room_id {
        Some(room_id) => tx.list_equipment_in_room(room_id).await?,
        None => tx.list_equipment().await?,
    };

    match query.filter {
        EquipmentFilter::All => Ok(items),
        EquipmentFilter::Unassigned => Ok(items.into_iter().filter(|e| e.room_id.is_none()).collect()),
        EquipmentFilter::Connectable => {
            let mut linked: HashSet<i64> = tx
                .list_active_connections()
                .await?
                .into_iter()
                .map(|c| c.equipment_id)
                .collect();
            linked.extend(
                tx.list_all_patch_ports()
                    .await?
                    .into_iter()
                    .filter_map(|p| p.equipment_id),
            );
            Ok(items
                .into_iter()
                .filter(|e| {
                    e.room_id.is_some()
                        && !e.defective
                        && (e.data(data_key::IP1).is_some() || e.data(data_key::MAC1).is_some())
                        && !linked.contains(&e.id)
                })
                .collect())
        }
    }
}

impl Store {
    pub async fn create_room(&self, req: &CreateRoomRequest) -> Result<Room> {
        let mut tx = self.begin().await?;
        let room = create_room(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(room_id = room.id, "Created room {}", room.name);
        Ok(room)
    }

    pub async fn get_room(&self, id: i64) -> Result<Room> {
        let mut tx = self.begin().await?;
        get_room(tx.as_mut(), id).await
    }

    pub async fn list_rooms(&self) -> Result<Vec<Room>> {
        let mut tx = self.begin().await?;
        list_rooms(tx.as_mut()).await
    }

    pub async fn update_room(&self, id: i64, req: &UpdateRoomRequest) -> Result<RoomUpdateOutcome> {
        let mut tx = self.begin().await?;
        let outcome = update_room(tx.as_mut(), id, req).await?;
        tx.commit().await?;
        tracing::info!(
            room_id = id,
            reassigned = outcome.equipment.is_some(),
            "Updated room {}",
            outcome.room.name
        );
        Ok(outcome)
    }

    pub async fn switches_for_room(&self, room_id: i64) -> Result<Vec<RoomSwitchUsage>> {
        let mut tx = self.begin().await?;
        switches_for_room(tx.as_mut(), room_id).await
    }

    pub async fn delete_room(&self, id: i64) -> Result<Vec<UnlinkOutcome>> {
        let mut tx = self.begin().await?;
        let outcomes = delete_room(tx.as_mut(), id).await?;
        tx.commit().await?;
        tracing::info!(room_id = id, unlinked = outcomes.len(), "Deleted room");
        Ok(outcomes)
    }

    pub async fn create_equipment(&self, req: &CreateEquipmentRequest) -> Result<Equipment> {
        let mut tx = self.begin().await?;
        let equipment = create_equipment(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(equipment_id = equipment.id, room_id = ?equipment.room_id, "Created equipment {}", equipment.name);
        Ok(equipment)
    }

    pub async fn get_equipment(&self, id: i64) -> Result<Equipment> {
        let mut tx = self.begin().await?;
        require_equipment(tx.as_mut(), id).await
    }

    pub async fn list_equipment(&self, query: &EquipmentListQuery) -> Result<Vec<Equipment>> {
        let mut tx = self.begin().await?;
        list_equipment(tx.as_mut(), query).await
    }

    pub async fn update_equipment(&self, id: i64, req: &UpdateEquipmentRequest) -> Result<Equipment> {
        let mut tx = self.begin().await?;
        let equipment = update_equipment(tx.as_mut(), id, req).await?;
        tx.commit().await?;
        tracing::info!(equipment_id = id, "Updated equipment {}", equipment.name);
        Ok(equipment)
    }

    pub async fn delete_equipment(&self, id: i64) -> Result<UnlinkOutcome> {
        let mut tx = self.begin().await?;
        let outcome = delete_equipment(tx.as_mut(), id).await?;
        tx.commit().await?;
        tracing::info!(
            equipment_id = id,
            connection_id = ?outcome.deactivated_connection_id,
            patch_ports = outcome.released_patch_ports.len(),
            "Deleted equipment {}",
            outcome.equipment.name
        );
        Ok(outcome)
    }

    pub async fn unlink_equipment_from_room(&self, equipment_id: i64) -> Result<UnlinkOutcome> {
        let mut tx = self.begin().await?;
        let outcome = unlink_from_room(tx.as_mut(), equipment_id).await?;
        tx.commit().await?;
        tracing::info!(
            equipment_id,
            connection_id = ?outcome.deactivated_connection_id,
            freed_port_id = ?outcome.freed_port_id,
            "Unlinked equipment from room"
        );
        Ok(outcome)
    }

    pub async fn assign_equipment_room(&self, equipment_id: i64, room_id: Option<i64>) -> Result<UnlinkOutcome> {
        let mut tx = self.begin().await?;
        let outcome = assign_room(tx.as_mut(), equipment_id, room_id).await?;
        tx.commit().await?;
        tracing::info!(equipment_id, room_id = ?room_id, "Assigned equipment room");
        Ok(outcome)
    }

    pub async fn mark_equipment_defective(&self, equipment_id: i64, defective: bool) -> Result<UnlinkOutcome> {
        let mut tx = self.begin().await?;
        let outcome = mark_defective(tx.as_mut(), equipment_id, defective).await?;
        tx.commit().await?;
        tracing::info!(
            equipment_id,
            defective,
            connection_id = ?outcome.deactivated_connection_id,
            "Marked equipment defective state"
        );
        Ok(outcome)
    }

    pub async fn reassign_room_equipment(&self, room_id: i64, equipment_ids: &[i64]) -> Result<ReassignOutcome> {
        let mut tx = self.begin().await?;
        let outcome = reassign_equipment_set(tx.as_mut(), room_id, equipment_ids).await?;
        tx.commit().await?;
        tracing::info!(
            room_id,
            linked = outcome.linked.len(),
            unlinked = outcome.unlinked.len(),
            failed = outcome.failures.len(),
            "Reassigned room equipment"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::stores;
    use crate::engine::fixtures;
    use std::collections::BTreeMap;

    async fn connect(store: &Store, port_id: i64, equipment_id: i64) -> DirectConnection {
        store
            .create_direct_connection(&CreateConnectionRequest { port_id, equipment_id })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_scenario_defective_equipment_frees_port() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 24).await;
            let r1 = fixtures::room(store, "R1").await;
            let e3 = fixtures::equipment(store, "E3", Some(r1.id)).await;
            let port7 = fixtures::port(store, sw.id, 7).await;
            let conn = connect(store, port7.id, e3.id).await;
            assert_eq!(fixtures::port(store, sw.id, 7).await.status, PortStatus::Occupied);

            let outcome = store.mark_equipment_defective(e3.id, true).await.unwrap();
            assert_eq!(outcome.deactivated_connection_id, Some(conn.id), "{backend}");
            assert_eq!(outcome.freed_port_id, Some(port7.id));

            let e3 = store.get_equipment(e3.id).await.unwrap();
            assert!(e3.room_id.is_none(), "{backend}");
            assert!(e3.defective);
            assert_eq!(fixtures::port(store, sw.id, 7).await.status, PortStatus::Free, "{backend}");
            let mut tx = store.begin().await.unwrap();
            assert_eq!(
                tx.get_connection(conn.id).await.unwrap().unwrap().status,
                ConnectionStatus::Inactive
            );
        }
    }

    #[tokio::test]
    async fn test_clearing_defect_only_clears_flag() {
        let (_dir, stores) = stores().await;
        for (_, store) in &stores {
            let r1 = fixtures::room(store, "R1").await;
            let e1 = fixtures::equipment(store, "E1", Some(r1.id)).await;
            store.mark_equipment_defective(e1.id, true).await.unwrap();
            let outcome = store.mark_equipment_defective(e1.id, false).await.unwrap();
            assert!(!outcome.equipment.defective);
            assert!(outcome.equipment.room_id.is_none());
        }
    }

    #[tokio::test]
    async fn test_unlink_keeps_patch_link() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let r1 = fixtures::room(store, "R1").await;
            let e1 = fixtures::equipment(store, "E1", Some(r1.id)).await;
            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 1).await;
            store.connect_equipment_to_patch_port(pp.id, e1.id).await.unwrap();

            let outcome = store.unlink_equipment_from_room(e1.id).await.unwrap();
            assert!(outcome.deactivated_connection_id.is_none(), "{backend}");
            assert!(outcome.equipment.room_id.is_none());
            assert_eq!(fixtures::patch_port(store, panel.id, 1).await.status, PortStatus::Occupied);
        }
    }

    #[tokio::test]
    async fn test_reassign_room_equipment_set() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let r1 = fixtures::room(store, "R1").await;
            let r2 = fixtures::room(store, "R2").await;
            let stay = fixtures::equipment(store, "stay", Some(r1.id)).await;
            let leave = fixtures::equipment(store, "leave", Some(r1.id)).await;
            let mover = fixtures::equipment(store, "mover", Some(r2.id)).await;
            let broken = fixtures::equipment(store, "broken", None).await;
            store.mark_equipment_defective(broken.id, true).await.unwrap();

            let p1 = fixtures::port(store, sw.id, 1).await;
            let p2 = fixtures::port(store, sw.id, 2).await;
            connect(store, p1.id, leave.id).await;
            connect(store, p2.id, mover.id).await;

            let outcome = store
                .reassign_room_equipment(r1.id, &[stay.id, mover.id, broken.id, 424242])
                .await
                .unwrap();
            assert_eq!(outcome.linked, vec![mover.id], "{backend}");
            assert_eq!(outcome.unlinked.len(), 1);
            assert_eq!(outcome.unlinked[0].equipment.id, leave.id);
            assert_eq!(outcome.unlinked[0].freed_port_id, Some(p1.id));
            let failed: Vec<(i64, crate::error::ErrorKind)> = outcome.failures.iter().map(|f| (f.id, f.kind)).collect();
            assert_eq!(
                failed,
                vec![
                    (broken.id, crate::error::ErrorKind::Validation),
                    (424242, crate::error::ErrorKind::NotFound)
                ]
            );

            // moving between rooms keeps the connection
            assert_eq!(fixtures::port(store, sw.id, 2).await.status, PortStatus::Occupied, "{backend}");
            assert_eq!(fixtures::port(store, sw.id, 1).await.status, PortStatus::Free, "{backend}");

            let members: Vec<i64> = store
                .list_equipment(&EquipmentListQuery {
                    room_id: Some(r1.id),
                    filter: EquipmentFilter::All,
                })
                .await
                .unwrap()
                .iter()
                .map(|e| e.id)
                .collect();
            let mut expected = vec![stay.id, mover.id];
            expected.sort();
            let mut members = members;
            members.sort();
            assert_eq!(members, expected);
        }
    }

    #[tokio::test]
    async fn test_delete_room_unlinks_members() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let r1 = fixtures::room(store, "R1").await;
            let e1 = fixtures::equipment(store, "E1", Some(r1.id)).await;
            let port = fixtures::port(store, sw.id, 4).await;
            connect(store, port.id, e1.id).await;

            let outcomes = store.delete_room(r1.id).await.unwrap();
            assert_eq!(outcomes.len(), 1, "{backend}");
            assert!(store.get_equipment(e1.id).await.unwrap().room_id.is_none());
            assert_eq!(fixtures::port(store, sw.id, 4).await.status, PortStatus::Free);
            assert!(matches!(store.get_room(r1.id).await, Err(Error::NotFound { .. })));
        }
    }

    #[tokio::test]
    async fn test_room_names_are_unique() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            fixtures::room(store, "Server Room").await;
            let err = store
                .create_room(&CreateRoomRequest {
                    name: "server room ".into(),
                    kind: String::new(),
                    description: String::new(),
                    floor: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Conflict(_)), "{backend}");

            fixtures::room(store, "Sala Técnica").await;
            let err = store
                .create_room(&CreateRoomRequest {
                    name: "SALA TÉCNICA".into(),
                    kind: String::new(),
                    description: String::new(),
                    floor: None,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Conflict(_)), "{backend}");

            fixtures::room(store, "écran").await;
            let names: Vec<String> = store.list_rooms().await.unwrap().into_iter().map(|r| r.name).collect();
            assert_eq!(names, vec!["Sala Técnica", "Server Room", "écran"], "{backend}");
        }
    }

    #[tokio::test]
    async fn test_update_room_details_and_members() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let r1 = fixtures::room(store, "Sala Técnica").await;
            fixtures::room(store, "Almoxarifado").await;
            let keep = fixtures::equipment(store, "keep", Some(r1.id)).await;
            let leaving = fixtures::equipment(store, "leaving", Some(r1.id)).await;
            let port = fixtures::port(store, sw.id, 3).await;
            connect(store, port.id, leaving.id).await;

            let req = |name: &str, equipment_ids: Option<Vec<i64>>| UpdateRoomRequest {
                name: name.into(),
                kind: "datacenter".into(),
                description: "rack room".into(),
                floor: Some(2),
                equipment_ids,
            };

            let err = store.update_room(r1.id, &req("ALMOXARIFADO", None)).await.unwrap_err();
            assert!(matches!(err, Error::Conflict(_)), "{backend}");
            let err = store.update_room(424242, &req("Nova", None)).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }), "{backend}");

            // renaming to a case variant of its own name is allowed
            let outcome = store.update_room(r1.id, &req("SALA TÉCNICA", None)).await.unwrap();
            assert_eq!(outcome.room.name, "SALA TÉCNICA", "{backend}");
            assert!(outcome.equipment.is_none());

            let outcome = store
                .update_room(r1.id, &req("Sala Técnica 2", Some(vec![keep.id])))
                .await
                .unwrap();
            let reassigned = outcome.equipment.unwrap();
            assert_eq!(reassigned.unlinked.len(), 1, "{backend}");
            assert_eq!(reassigned.unlinked[0].freed_port_id, Some(port.id));

            let room = store.get_room(r1.id).await.unwrap();
            assert_eq!(room.name, "Sala Técnica 2", "{backend}");
            assert_eq!(room.kind, "datacenter");
            assert_eq!(room.floor, Some(2));
            assert!(store.get_equipment(leaving.id).await.unwrap().room_id.is_none());
            assert_eq!(fixtures::port(store, sw.id, 3).await.status, PortStatus::Free, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_switches_for_room() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw1 = fixtures::switch(store, "SW-01", 8).await;
            let sw2 = fixtures::switch(store, "SW-02", 8).await;
            let sw3 = fixtures::switch(store, "SW-03", 8).await;
            let r1 = fixtures::room(store, "R1").await;
            let r2 = fixtures::room(store, "R2").await;
            let direct = fixtures::equipment(store, "direct", Some(r1.id)).await;
            let patched = fixtures::equipment(store, "patched", Some(r1.id)).await;
            let other = fixtures::equipment(store, "other", Some(r2.id)).await;

            let port = fixtures::port(store, sw1.id, 6).await;
            connect(store, port.id, direct.id).await;
            let other_port = fixtures::port(store, sw3.id, 1).await;
            connect(store, other_port.id, other.id).await;

            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 2).await;
            store
                .map_patch_port(pp.id, &MapPatchPortRequest {
                    switch_id: Some(sw2.id),
                    switch_port: Some(4),
                })
                .await
                .unwrap();
            store.connect_equipment_to_patch_port(pp.id, patched.id).await.unwrap();

            let usage = store.switches_for_room(r1.id).await.unwrap();
            let switches: Vec<i64> = usage.iter().map(|u| u.switch.id).collect();
            assert_eq!(switches, vec![sw1.id, sw2.id], "{backend}");

            let first = &usage[0].ports;
            assert_eq!(first.len(), 1);
            assert_eq!(first[0].port_number, 6);
            assert_eq!(first[0].link, LinkKind::DirectConnection);
            assert_eq!(first[0].equipment.id, direct.id);

            let second = &usage[1].ports;
            assert_eq!(second[0].port_number, 4, "{backend}");
            assert_eq!(second[0].link, LinkKind::PatchPort);
            assert_eq!(second[0].patch_port_id, Some(pp.id));
            assert_eq!(second[0].equipment.id, patched.id);

            let empty = fixtures::room(store, "R3").await;
            assert!(store.switches_for_room(empty.id).await.unwrap().is_empty());
            let err = store.switches_for_room(424242).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }), "{backend}");
        }
    }

    #[tokio::test]
    async fn test_equipment_crud_and_filters() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let r1 = fixtures::room(store, "R1").await;
            let free = fixtures::equipment(store, "a-free", Some(r1.id)).await;
            let wired = fixtures::equipment(store, "b-wired", Some(r1.id)).await;
            let loose = fixtures::equipment(store, "c-loose", None).await;
            let no_addr = store
                .create_equipment(&CreateEquipmentRequest {
                    name: "d-noaddr".into(),
                    room_id: Some(r1.id),
                    ..Default::default()
                })
                .await
                .unwrap();
            let port = fixtures::port(store, sw.id, 1).await;
            connect(store, port.id, wired.id).await;

            let query = |filter| EquipmentListQuery { room_id: None, filter };
            let ids = |items: Vec<Equipment>| items.into_iter().map(|e| e.id).collect::<Vec<_>>();

            let all = ids(store.list_equipment(&query(EquipmentFilter::All)).await.unwrap());
            assert_eq!(all, vec![free.id, wired.id, loose.id, no_addr.id], "{backend}");
            let unassigned = ids(store.list_equipment(&query(EquipmentFilter::Unassigned)).await.unwrap());
            assert_eq!(unassigned, vec![loose.id]);
            let connectable = ids(store.list_equipment(&query(EquipmentFilter::Connectable)).await.unwrap());
            assert_eq!(connectable, vec![free.id], "{backend}");

            let mut extra_data = BTreeMap::new();
            extra_data.insert(data_key::IP1.to_string(), String::new());
            extra_data.insert(data_key::MAC1.to_string(), " aa:bb:cc:dd:ee:ff ".to_string());
            let updated = store
                .update_equipment(
                    free.id,
                    &UpdateEquipmentRequest {
                        name: "a-free".into(),
                        kind: "printer".into(),
                        extra_data,
                        ..Default::default()
                    },
                )
                .await
                .unwrap();
            assert!(updated.data(data_key::IP1).is_none(), "{backend}");
            assert_eq!(updated.data(data_key::MAC1), Some("aa:bb:cc:dd:ee:ff"));
            let reread = store.get_equipment(free.id).await.unwrap();
            assert_eq!(reread.extra_data, updated.extra_data, "{backend}");
            assert_eq!(reread.kind, "printer");

            let err = store
                .create_equipment(&CreateEquipmentRequest {
                    name: "ghost".into(),
                    room_id: Some(424242),
                    ..Default::default()
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NotFound { resource: "room", .. }));
        }
    }

    #[tokio::test]
    async fn test_delete_equipment_releases_links() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let e2 = fixtures::equipment(store, "E2", None).await;
            let port = fixtures::port(store, sw.id, 3).await;
            connect(store, port.id, e1.id).await;
            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 4).await;
            store.connect_equipment_to_patch_port(pp.id, e2.id).await.unwrap();

            let outcome = store.delete_equipment(e1.id).await.unwrap();
            assert_eq!(outcome.freed_port_id, Some(port.id), "{backend}");
            let outcome = store.delete_equipment(e2.id).await.unwrap();
            assert_eq!(outcome.released_patch_ports, vec![pp.id], "{backend}");

            assert_eq!(fixtures::port(store, sw.id, 3).await.status, PortStatus::Free);
            assert_eq!(fixtures::patch_port(store, panel.id, 4).await.status, PortStatus::Free);
            assert!(matches!(store.get_equipment(e1.id).await, Err(Error::NotFound { .. })));
        }
    }
}
