//! Patch panel and patch port lifecycle.

use std::collections::HashMap;

use crate::db::{Store, StorageTx};
use crate::error::{Error, Result};
use crate::models::*;

use super::{require_equipment, require_port_count, require_text, Directory, MAX_PORT_NUMBER};

/// Code prefix shared by every panel created on a floor
fn code_prefix(floor: i32) -> String {
    format!("PP{}-", 20 + floor)
}

/// Next free `PP{20+floor}-NN` code
async fn next_code(tx: &mut dyn StorageTx, floor: i32) -> Result<String> {
    let prefix = code_prefix(floor);
    let highest = tx
        .list_patch_panels(None)
        .await?
        .iter()
        .filter_map(|p| p.code.strip_prefix(&prefix))
        .filter_map(|seq| seq.parse::<u32>().ok())
        .max()
        .unwrap_or(0);
    Ok(format!("{}{:02}", prefix, highest + 1))
}

fn validate_numbering(port_start: i32, port_count: i32) -> Result<()> {
    if port_start < 1 {
        return Err(Error::validation("port_start must be at least 1"));
    }
    require_port_count("port_count", port_count)?;
    match port_start.checked_add(port_count - 1) {
        Some(end) if end <= MAX_PORT_NUMBER => Ok(()),
        _ => Err(Error::validation(format!(
            "patch panel ports must end at or below {}",
            MAX_PORT_NUMBER
        ))),
    }
}

async fn ensure_unique_name(
    tx: &mut dyn StorageTx,
    name: &str,
    floor: i32,
    except: Option<i64>,
) -> Result<()> {
    let wanted = name.trim().to_lowercase();
    let clash = tx
        .list_patch_panels(Some(floor))
        .await?
        .into_iter()
        .any(|p| Some(p.id) != except && p.name.trim().to_lowercase() == wanted);
    if clash {
        return Err(Error::conflict(format!(
            "a patch panel named {} already exists on floor {}",
            name.trim(),
            floor
        )));
    }
    Ok(())
}

async fn create_ports(tx: &mut dyn StorageTx, panel: &PatchPanel) -> Result<()> {
    for number in panel.port_start..=panel.port_end() {
        tx.insert_patch_port(panel.id, number).await?;
    }
    Ok(())
}

async fn ensure_no_equipment(tx: &mut dyn StorageTx, panel_id: i64) -> Result<()> {
    let linked = tx
        .list_patch_ports(panel_id)
        .await?
        .iter()
        .filter(|p| p.equipment_id.is_some())
        .count();
    if linked > 0 {
        return Err(Error::state(format!(
            "patch panel {} has active connections on {} port(s)",
            panel_id, linked
        )));
    }
    Ok(())
}

pub async fn get_panel(tx: &mut dyn StorageTx, id: i64) -> Result<PatchPanel> {
    tx.get_patch_panel(id)
        .await?
        .ok_or_else(|| Error::not_found("patch panel", id))
}

pub async fn create_panel(tx: &mut dyn StorageTx, req: &CreatePatchPanelRequest) -> Result<PatchPanel> {
    require_text("name", &req.name)?;
    validate_numbering(req.port_start, req.port_count)?;
    ensure_unique_name(tx, &req.name, req.floor, None).await?;

    let code = next_code(tx, req.floor).await?;
    let mut req = req.clone();
    req.name = req.name.trim().to_string();
    let panel = tx.insert_patch_panel(&code, &req).await?;
    create_ports(tx, &panel).await?;
    Ok(panel)
}

/// Update a panel; changing the numbering rebuilds every port and is
/// refused while equipment is terminated on any of them
pub async fn update_panel(
    tx: &mut dyn StorageTx,
    id: i64,
    req: &UpdatePatchPanelRequest,
) -> Result<PatchPanel> {
    require_text("name", &req.name)?;
    validate_numbering(req.port_start, req.port_count)?;
    if !panel_status::is_valid(&req.status) {
        return Err(Error::validation(format!("invalid patch panel status: {}", req.status)));
    }

    let mut panel = get_panel(tx, id).await?;
    ensure_unique_name(tx, &req.name, req.floor, Some(id)).await?;

    let renumber = panel.port_start != req.port_start || panel.port_count != req.port_count;
    if renumber {
        ensure_no_equipment(tx, id).await?;
    }

    panel.name = req.name.trim().to_string();
    panel.floor = req.floor;
    panel.port_start = req.port_start;
    panel.port_count = req.port_count;
    if let Some(prefix) = &req.keystone_prefix {
        panel.keystone_prefix = prefix.trim().to_string();
    }
    panel.status = req.status.clone();
    panel.description = req.description.clone();
    tx.update_patch_panel(&panel).await?;

    if renumber {
        tx.delete_patch_ports(id).await?;
        create_ports(tx, &panel).await?;
    }
    Ok(panel)
}

pub async fn delete_panel(tx: &mut dyn StorageTx, id: i64) -> Result<PatchPanel> {
    let panel = get_panel(tx, id).await?;
    ensure_no_equipment(tx, id).await?;
    tx.delete_patch_ports(id).await?;
    tx.delete_patch_panel(id).await?;
    Ok(panel)
}

fn build_view(
    panel: &PatchPanel,
    port: PatchPanelPort,
    switch_names: &HashMap<i64, String>,
    directory: &Directory,
) -> PatchPortView {
    PatchPortView {
        id: port.id,
        patch_panel_id: port.patch_panel_id,
        number: port.number,
        status: port.status(),
        keystone: panel.keystone(port.number),
        mapped_switch_id: port.mapping().map(|m| m.0),
        mapped_switch_name: port
            .mapping()
            .and_then(|(switch_id, _)| switch_names.get(&switch_id).cloned()),
        mapped_switch_port: port.mapping().map(|m| m.1),
        equipment: port.equipment_id.and_then(|id| directory.summary(id)),
        connected_at: port.connected_at,
    }
}

async fn switch_names(tx: &mut dyn StorageTx) -> Result<HashMap<i64, String>> {
    Ok(tx
        .list_switches()
        .await?
        .into_iter()
        .map(|s| (s.id, s.name))
        .collect())
}

/// Ports of a panel with status, keystone label and resolved references
pub async fn list_ports(tx: &mut dyn StorageTx, panel_id: i64) -> Result<Vec<PatchPortView>> {
    let panel = get_panel(tx, panel_id).await?;
    let ports = tx.list_patch_ports(panel_id).await?;
    let names = switch_names(tx).await?;
    let directory = Directory::load(tx, ports.iter().filter_map(|p| p.equipment_id)).await?;

    Ok(ports
        .into_iter()
        .map(|port| build_view(&panel, port, &names, &directory))
        .collect())
}

pub(crate) async fn port_view(tx: &mut dyn StorageTx, port: PatchPanelPort) -> Result<PatchPortView> {
    let panel = get_panel(tx, port.patch_panel_id).await?;
    let names = switch_names(tx).await?;
    let directory = Directory::load(tx, port.equipment_id).await?;
    Ok(build_view(&panel, port, &names, &directory))
}

/// Where an equipment terminates on a patch panel, if anywhere
pub async fn equipment_patch_info(
    tx: &mut dyn StorageTx,
    equipment_id: i64,
) -> Result<Option<EquipmentPatchInfo>> {
    require_equipment(tx, equipment_id).await?;
    let Some(port) = tx.patch_ports_for_equipment(equipment_id).await?.into_iter().next() else {
        return Ok(None);
    };
    let panel = get_panel(tx, port.patch_panel_id).await?;
    Ok(Some(EquipmentPatchInfo {
        equipment_id,
        patch_panel_id: panel.id,
        patch_panel_name: panel.name.clone(),
        floor: panel.floor,
        patch_port_id: port.id,
        patch_port_number: port.number,
        keystone: panel.keystone(port.number),
    }))
}

impl Store {
    pub async fn create_patch_panel(&self, req: &CreatePatchPanelRequest) -> Result<PatchPanelView> {
        let mut tx = self.begin().await?;
        let panel = create_panel(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(
            patch_panel_id = panel.id,
            code = %panel.code,
            ports = panel.port_count,
            "Created patch panel {}",
            panel.name
        );
        Ok(panel.into())
    }

    pub async fn get_patch_panel(&self, id: i64) -> Result<PatchPanelView> {
        let mut tx = self.begin().await?;
        Ok(get_panel(tx.as_mut(), id).await?.into())
    }

    pub async fn list_patch_panels(&self, floor: Option<i32>) -> Result<Vec<PatchPanelView>> {
        let mut tx = self.begin().await?;
        let panels = tx.list_patch_panels(floor).await?;
        Ok(panels.into_iter().map(PatchPanelView::from).collect())
    }

    pub async fn update_patch_panel(&self, id: i64, req: &UpdatePatchPanelRequest) -> Result<PatchPanelView> {
        let mut tx = self.begin().await?;
        let panel = update_panel(tx.as_mut(), id, req).await?;
        tx.commit().await?;
        tracing::info!(patch_panel_id = id, "Updated patch panel {}", panel.name);
        Ok(panel.into())
    }

    pub async fn delete_patch_panel(&self, id: i64) -> Result<()> {
        let mut tx = self.begin().await?;
        let panel = delete_panel(tx.as_mut(), id).await?;
        tx.commit().await?;
        tracing::info!(patch_panel_id = id, "Deleted patch panel {}", panel.name);
        Ok(())
    }

    pub async fn list_patch_ports(&self, panel_id: i64) -> Result<Vec<PatchPortView>> {
        let mut tx = self.begin().await?;
        list_ports(tx.as_mut(), panel_id).await
    }

    pub async fn equipment_patch_info(&self, equipment_id: i64) -> Result<Option<EquipmentPatchInfo>> {
        let mut tx = self.begin().await?;
        equipment_patch_info(tx.as_mut(), equipment_id).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::stores;
    use crate::engine::fixtures;
    use tokio_test::assert_ok;

    fn panel_req(name: &str, floor: i32, start: i32, count: i32) -> CreatePatchPanelRequest {
        CreatePatchPanelRequest {
            name: name.into(),
            floor,
            port_start: start,
            port_count: count,
            keystone_prefix: String::new(),
            description: String::new(),
        }
    }

    fn update_req(panel: &PatchPanel, start: i32, count: i32) -> UpdatePatchPanelRequest {
        UpdatePatchPanelRequest {
            name: panel.name.clone(),
            floor: panel.floor,
            port_start: start,
            port_count: count,
            keystone_prefix: None,
            status: panel.status.clone(),
            description: panel.description.clone(),
        }
    }

    #[test]
    fn test_keystone_label() {
        assert_eq!(keystone_label("PT21", 3), "PT21-0003");
        assert_eq!(keystone_label("PT21", 1234), "PT21-1234");
    }

    #[tokio::test]
    async fn test_codes_and_numbering() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let a = store.create_patch_panel(&panel_req("Rack A", 1, 1, 24)).await.unwrap();
            let b = store.create_patch_panel(&panel_req("Rack B", 1, 25, 24)).await.unwrap();
            let c = store.create_patch_panel(&panel_req("Rack A", 2, 1, 12)).await.unwrap();
            assert_eq!(a.panel.code, "PP21-01", "{backend}");
            assert_eq!(b.panel.code, "PP21-02", "{backend}");
            assert_eq!(c.panel.code, "PP22-01", "{backend}");
            assert_eq!(b.port_end, 48);

            let ports = store.list_patch_ports(b.panel.id).await.unwrap();
            assert_eq!(ports.first().map(|p| p.number), Some(25));
            assert_eq!(ports.last().map(|p| p.number), Some(48));
            // blank prefix falls back to the floor default
            assert_eq!(ports[0].keystone, "PT21-0025");

            let floor1 = store.list_patch_panels(Some(1)).await.unwrap();
            assert_eq!(floor1.len(), 2);
            let all = store.list_patch_panels(None).await.unwrap();
            let order: Vec<(i32, String)> = all.iter().map(|p| (p.panel.floor, p.panel.name.clone())).collect();
            assert_eq!(
                order,
                vec![(1, "Rack A".into()), (1, "Rack B".into()), (2, "Rack A".into())]
            );

            let err = store.create_patch_panel(&panel_req("rack a", 1, 1, 4)).await.unwrap_err();
            assert!(matches!(err, Error::Conflict(_)), "{backend}");
            let err = store.create_patch_panel(&panel_req("Rack Z", 1, 0, 4)).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
        }
    }

    #[tokio::test]
    async fn test_numbering_limits() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            for (start, count) in [(i32::MAX, 2), (1, i32::MAX), (MAX_PORT_NUMBER, 2)] {
                let err = store
                    .create_patch_panel(&panel_req("Rack A", 1, start, count))
                    .await
                    .unwrap_err();
                assert!(matches!(err, Error::Validation(_)), "{backend} {start}+{count}");
            }
            assert!(store.list_patch_panels(None).await.unwrap().is_empty(), "{backend}");

            let last = store
                .create_patch_panel(&panel_req("Rack A", 1, MAX_PORT_NUMBER, 1))
                .await
                .unwrap();
            assert_eq!(last.port_end, MAX_PORT_NUMBER, "{backend}");
            assert_eq!(store.list_patch_ports(last.panel.id).await.unwrap().len(), 1);

            let err = store
                .update_patch_panel(last.panel.id, &update_req(&last.panel, i32::MAX, 2))
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{backend}");
            let stored = store.get_patch_panel(last.panel.id).await.unwrap();
            assert_eq!(stored.panel.port_start, MAX_PORT_NUMBER, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_renumbering_blocked_by_equipment() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let panel = fixtures::panel(store, "PP-A", 1, 8).await;
            let pp1 = fixtures::patch_port(store, panel.id, 1).await;
            let pp2 = fixtures::patch_port(store, panel.id, 2).await;
            store
                .map_patch_port(pp1.id, &MapPatchPortRequest {
                    switch_id: Some(sw.id),
                    switch_port: Some(5),
                })
                .await
                .unwrap();
            store.connect_equipment_to_patch_port(pp2.id, e1.id).await.unwrap();

            let err = store.update_patch_panel(panel.id, &update_req(&panel, 1, 12)).await.unwrap_err();
            assert!(matches!(err, Error::State(_)), "{backend}");
            let err = store.delete_patch_panel(panel.id).await.unwrap_err();
            assert!(matches!(err, Error::State(_)), "{backend}");

            // descriptive edits are fine while equipment is attached
            let mut rename = update_req(&panel, 1, 8);
            rename.name = "PP-A2".into();
            rename.keystone_prefix = Some("WALL".into());
            let renamed = store.update_patch_panel(panel.id, &rename).await.unwrap();
            assert_eq!(renamed.panel.name, "PP-A2");
            assert_eq!(fixtures::patch_port(store, panel.id, 2).await.keystone, "WALL-0002");

            store.disconnect_equipment_from_patch_port(pp2.id).await.unwrap();
            let resized = store.update_patch_panel(panel.id, &update_req(&renamed.panel, 5, 4)).await.unwrap();
            assert_eq!(resized.port_end, 8);
            let ports = store.list_patch_ports(panel.id).await.unwrap();
            assert_eq!(ports.iter().map(|p| p.number).collect::<Vec<_>>(), vec![5, 6, 7, 8]);
            assert!(ports.iter().all(|p| p.status == PortStatus::Free), "{backend}");
            // the old mapping went away with the rebuilt ports
            assert_eq!(fixtures::port(store, sw.id, 5).await.status, PortStatus::Free, "{backend}");

            assert_ok!(store.delete_patch_panel(panel.id).await);
            let err = store.get_patch_panel(panel.id).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_equipment_patch_info() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let e1 = fixtures::equipment(store, "E1", None).await;
            let panel = fixtures::panel(store, "PP-A", 3, 8).await;
            assert!(store.equipment_patch_info(e1.id).await.unwrap().is_none());

            let pp = fixtures::patch_port(store, panel.id, 7).await;
            store.connect_equipment_to_patch_port(pp.id, e1.id).await.unwrap();
            let info = store.equipment_patch_info(e1.id).await.unwrap().unwrap();
            assert_eq!(info.patch_panel_id, panel.id, "{backend}");
            assert_eq!(info.floor, 3);
            assert_eq!(info.patch_port_number, 7);
            assert_eq!(info.keystone, "PT23-0007");

            let err = store.equipment_patch_info(424242).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
        }
    }
}
