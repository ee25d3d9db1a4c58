//! Switch and switch port lifecycle.

use std::collections::{HashMap, HashSet};

use crate::db::{Store, StorageTx};
use crate::error::{Error, Result};
use crate::models::*;

use super::projection::{switch_port_status, MappingIndex};
use super::{require_port_count, require_text, Directory, PanelCache, MAX_PORT_NUMBER};

pub async fn create_switch(tx: &mut dyn StorageTx, req: &CreateSwitchRequest) -> Result<Switch> {
    require_text("name", &req.name)?;
    require_text("brand", &req.brand)?;
    require_text("model", &req.model)?;
    require_port_count("port_count", req.port_count)?;

    let switch = tx.insert_switch(req).await?;
    for number in 1..=req.port_count {
        tx.insert_switch_port(switch.id, number, port_role::label_for(number))
            .await?;
    }
    Ok(switch)
}

pub async fn get_switch(tx: &mut dyn StorageTx, id: i64) -> Result<Switch> {
    tx.get_switch(id)
        .await?
        .ok_or_else(|| Error::not_found("switch", id))
}

pub async fn update_switch(
    tx: &mut dyn StorageTx,
    id: i64,
    req: &UpdateSwitchRequest,
) -> Result<Switch> {
    require_text("name", &req.name)?;
    require_text("brand", &req.brand)?;
    require_text("model", &req.model)?;

    let mut switch = get_switch(tx, id).await?;
    switch.name = req.name.trim().to_string();
    switch.brand = req.brand.trim().to_string();
    switch.model = req.model.trim().to_string();
    tx.update_switch(&switch).await?;
    Ok(switch)
}

/// Ports of a switch with their projected status, in port order
pub async fn list_ports(tx: &mut dyn StorageTx, switch_id: i64) -> Result<Vec<SwitchPortView>> {
    get_switch(tx, switch_id).await?;
    let ports = tx.list_switch_ports(switch_id).await?;

    let port_ids: Vec<i64> = ports.iter().map(|p| p.id).collect();
    let direct: HashMap<i64, DirectConnection> = tx
        .active_connections_for_ports(&port_ids)
        .await?
        .into_iter()
        .map(|c| (c.port_id, c))
        .collect();
    let index = MappingIndex::for_switch(tx, switch_id).await?;
    tracing::debug!(
        switch_id,
        ports = ports.len(),
        direct = direct.len(),
        mapped = index.len(),
        "projecting switch port status"
    );

    let equipment_ids = direct.values().map(|c| c.equipment_id).chain(
        ports
            .iter()
            .filter_map(|p| index.lookup(switch_id, p.number))
            .filter_map(|pp| pp.equipment_id),
    );
    let directory = Directory::load(tx, equipment_ids).await?;
    let mut panels = PanelCache::default();

    let mut views = Vec::with_capacity(ports.len());
    for port in ports {
        let connection = direct.get(&port.id);
        let mapped = index.lookup(switch_id, port.number);
        let status = switch_port_status(connection.is_some(), mapped);

        let patch_link = match mapped {
            Some(pp) => match panels.get(tx, pp.patch_panel_id).await? {
                Some(panel) => Some(PatchLink {
                    patch_panel_id: panel.id,
                    patch_panel_name: panel.name.clone(),
                    patch_port_id: pp.id,
                    patch_port_number: pp.number,
                    keystone: panel.keystone(pp.number),
                    equipment: pp.equipment_id.and_then(|id| directory.summary(id)),
                }),
                None => None,
            },
            None => None,
        };

        views.push(SwitchPortView {
            id: port.id,
            switch_id: port.switch_id,
            number: port.number,
            description: port.description,
            status,
            connection_id: connection.map(|c| c.id),
            equipment: connection.and_then(|c| directory.summary(c.equipment_id)),
            patch_link,
        });
    }
    Ok(views)
}

/// Deactivate every active direct connection on the switch's ports
async fn retire_connections(tx: &mut dyn StorageTx, switch_id: i64) -> Result<u64> {
    let port_ids: Vec<i64> = tx
        .list_switch_ports(switch_id)
        .await?
        .iter()
        .map(|p| p.id)
        .collect();
    let active = tx.active_connections_for_ports(&port_ids).await?;
    for conn in &active {
        tx.set_connection_status(conn.id, ConnectionStatus::Inactive)
            .await?;
    }
    Ok(active.len() as u64)
}

/// Clear every patch port mapping onto the switch; equipment links stay
async fn clear_mappings(tx: &mut dyn StorageTx, switch_id: i64, number: Option<i32>) -> Result<Vec<i64>> {
    let mut cleared = Vec::new();
    for mut pp in tx.patch_ports_mapped_to_switch(switch_id).await? {
        if number.is_some() && pp.mapped_switch_port != number {
            continue;
        }
        pp.mapped_switch_id = None;
        pp.mapped_switch_port = None;
        tx.update_patch_port(&pp).await?;
        cleared.push(pp.id);
    }
    Ok(cleared)
}

/// Destroy every port of the switch and recreate `1..=new_count`
pub async fn recreate_all_ports(
    tx: &mut dyn StorageTx,
    switch_id: i64,
    new_count: i32,
) -> Result<PortRebuildOutcome> {
    require_port_count("port_count", new_count)?;
    get_switch(tx, switch_id).await?;

    let deactivated = retire_connections(tx, switch_id).await?;
    let cleared = clear_mappings(tx, switch_id, None).await?;
    tx.delete_switch_ports(switch_id).await?;
    for number in 1..=new_count {
        tx.insert_switch_port(switch_id, number, port_role::label_for(number))
            .await?;
    }

    Ok(PortRebuildOutcome {
        switch_id,
        port_count: new_count,
        deactivated_connections: deactivated,
        cleared_mappings: cleared.len() as u64,
    })
}

/// Append `extra_count` ports numbered after the current highest port
pub async fn add_ports(
    tx: &mut dyn StorageTx,
    switch_id: i64,
    extra_count: i32,
) -> Result<Vec<SwitchPort>> {
    require_port_count("extra_count", extra_count)?;
    get_switch(tx, switch_id).await?;

    let existing = tx.list_switch_ports(switch_id).await?;
    let taken: HashSet<i32> = existing.iter().map(|p| p.number).collect();
    let start = existing.iter().map(|p| p.number).max().unwrap_or(0) + 1;
    let end = start
        .checked_add(extra_count - 1)
        .filter(|end| *end <= MAX_PORT_NUMBER)
        .ok_or_else(|| {
            Error::validation(format!(
                "switch {} cannot exceed port number {}",
                switch_id, MAX_PORT_NUMBER
            ))
        })?;

    let mut added = Vec::new();
    for number in start..=end {
        if taken.contains(&number) {
            return Err(Error::conflict(format!(
                "port {} already exists on switch {}",
                number, switch_id
            )));
        }
        added.push(
            tx.insert_switch_port(switch_id, number, port_role::label_for(number))
                .await?,
        );
    }
    Ok(added)
}

/// Remove the switch and its ports, retiring connections and mappings onto it
pub async fn delete_switch(tx: &mut dyn StorageTx, switch_id: i64) -> Result<PortRebuildOutcome> {
    get_switch(tx, switch_id).await?;

    let deactivated = retire_connections(tx, switch_id).await?;
    let cleared = clear_mappings(tx, switch_id, None).await?;
    tx.delete_switch_ports(switch_id).await?;
    tx.delete_switch(switch_id).await?;

    Ok(PortRebuildOutcome {
        switch_id,
        port_count: 0,
        deactivated_connections: deactivated,
        cleared_mappings: cleared.len() as u64,
    })
}

/// Free a single switch port: drop its direct connection and any mapping onto it
pub async fn disconnect_port(tx: &mut dyn StorageTx, port_id: i64) -> Result<SwitchPortDisconnect> {
    let port = tx
        .get_switch_port(port_id)
        .await?
        .ok_or_else(|| Error::not_found("switch port", port_id))?;

    let mut outcome = SwitchPortDisconnect {
        port_id,
        ..Default::default()
    };
    for conn in tx.active_connections_for_ports(&[port_id]).await? {
        tx.set_connection_status(conn.id, ConnectionStatus::Inactive)
            .await?;
        outcome.deactivated_connection_id.get_or_insert(conn.id);
    }
    outcome.unmapped_patch_ports = clear_mappings(tx, port.switch_id, Some(port.number)).await?;
    Ok(outcome)
}

impl Store {
    pub async fn create_switch(&self, req: &CreateSwitchRequest) -> Result<Switch> {
        let mut tx = self.begin().await?;
        let switch = create_switch(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(switch_id = switch.id, ports = req.port_count, "Created switch {}", switch.name);
        Ok(switch)
    }

    pub async fn get_switch(&self, id: i64) -> Result<Switch> {
        let mut tx = self.begin().await?;
        get_switch(tx.as_mut(), id).await
    }

    pub async fn list_switches(&self) -> Result<Vec<Switch>> {
        let mut tx = self.begin().await?;
        Ok(tx.list_switches().await?)
    }

    pub async fn update_switch(&self, id: i64, req: &UpdateSwitchRequest) -> Result<Switch> {
        let mut tx = self.begin().await?;
        let switch = update_switch(tx.as_mut(), id, req).await?;
        tx.commit().await?;
        tracing::info!(switch_id = id, "Updated switch {}", switch.name);
        Ok(switch)
    }

    pub async fn list_switch_ports(&self, switch_id: i64) -> Result<Vec<SwitchPortView>> {
        let mut tx = self.begin().await?;
        list_ports(tx.as_mut(), switch_id).await
    }

    pub async fn recreate_switch_ports(&self, switch_id: i64, new_count: i32) -> Result<PortRebuildOutcome> {
        let mut tx = self.begin().await?;
        let outcome = recreate_all_ports(tx.as_mut(), switch_id, new_count).await?;
        tx.commit().await?;
        tracing::info!(
            switch_id,
            ports = new_count,
            deactivated = outcome.deactivated_connections,
            cleared_mappings = outcome.cleared_mappings,
            "Recreated switch ports"
        );
        Ok(outcome)
    }

    pub async fn add_switch_ports(&self, switch_id: i64, extra_count: i32) -> Result<Vec<SwitchPort>> {
        let mut tx = self.begin().await?;
        let added = add_ports(tx.as_mut(), switch_id, extra_count).await?;
        tx.commit().await?;
        tracing::info!(switch_id, added = added.len(), "Added switch ports");
        Ok(added)
    }

    pub async fn delete_switch(&self, switch_id: i64) -> Result<PortRebuildOutcome> {
        let mut tx = self.begin().await?;
        let outcome = delete_switch(tx.as_mut(), switch_id).await?;
        tx.commit().await?;
        tracing::info!(
            switch_id,
            deactivated = outcome.deactivated_connections,
            cleared_mappings = outcome.cleared_mappings,
            "Deleted switch"
        );
        Ok(outcome)
    }

    pub async fn disconnect_switch_port(&self, port_id: i64) -> Result<SwitchPortDisconnect> {
        let mut tx = self.begin().await?;
        let outcome = disconnect_port(tx.as_mut(), port_id).await?;
        tx.commit().await?;
        tracing::info!(
            port_id,
            connection_id = ?outcome.deactivated_connection_id,
            unmapped = outcome.unmapped_patch_ports.len(),
            "Disconnected switch port"
        );
        Ok(outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::stores;
    use crate::engine::fixtures;
    use tokio_test::{assert_err, assert_ok};

    fn counts(views: &[SwitchPortView]) -> (usize, usize, usize) {
        let count = |s: PortStatus| views.iter().filter(|v| v.status == s).count();
        (
            count(PortStatus::Free),
            count(PortStatus::Occupied),
            count(PortStatus::Mapped),
        )
    }

    #[tokio::test]
    async fn test_create_switch_labels_ports() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 48).await;
            let ports = store.list_switch_ports(sw.id).await.unwrap();
            assert_eq!(ports.len(), 48, "{backend}");
            assert!(ports.iter().all(|p| p.status == PortStatus::Free), "{backend}");
            assert_eq!(ports[0].description, "uplink");
            assert_eq!(ports[3].description, "uplink");
            assert_eq!(ports[4].description, "PoE");
            assert_eq!(ports[7].description, "PoE");
            assert_eq!(ports[8].description, "access");
            let numbers: Vec<i32> = ports.iter().map(|p| p.number).collect();
            assert_eq!(numbers, (1..=48).collect::<Vec<_>>(), "{backend}");
        }
    }

    #[tokio::test]
    async fn test_create_switch_validation() {
        let (_dir, stores) = stores().await;
        for (_, store) in &stores {
            let err = store
                .create_switch(&CreateSwitchRequest {
                    name: " ".into(),
                    brand: "Acme".into(),
                    model: "X".into(),
                    port_count: 8,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));

            let err = store
                .create_switch(&CreateSwitchRequest {
                    name: "SW".into(),
                    brand: "Acme".into(),
                    model: "X".into(),
                    port_count: 0,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)));
            assert!(store.list_switches().await.unwrap().is_empty());
        }
    }

    #[tokio::test]
    async fn test_port_counts_are_bounded() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let err = store
                .create_switch(&CreateSwitchRequest {
                    name: "SW".into(),
                    brand: "Acme".into(),
                    model: "X".into(),
                    port_count: i32::MAX,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{backend}");
            assert!(store.list_switches().await.unwrap().is_empty(), "{backend}");

            let sw = fixtures::switch(store, "SW-01", 8).await;
            let err = store.add_switch_ports(sw.id, i32::MAX).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{backend}");
            let err = store.recreate_switch_ports(sw.id, i32::MAX).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{backend}");

            // within the count ceiling but past the highest port number
            let err = store.add_switch_ports(sw.id, MAX_PORT_NUMBER).await.unwrap_err();
            assert!(matches!(err, Error::Validation(_)), "{backend}");
            assert_eq!(store.list_switch_ports(sw.id).await.unwrap().len(), 8, "{backend}");

            let added = store.add_switch_ports(sw.id, MAX_PORT_NUMBER - 8).await.unwrap();
            assert_eq!(added.last().map(|p| p.number), Some(MAX_PORT_NUMBER), "{backend}");
            assert_err!(store.add_switch_ports(sw.id, 1).await);
        }
    }

    #[tokio::test]
    async fn test_scenario_direct_connection_round_trip() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 48).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let port5 = fixtures::port(store, sw.id, 5).await;

            let conn = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port5.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();

            let view = fixtures::port(store, sw.id, 5).await;
            assert_eq!(view.status, PortStatus::Occupied, "{backend}");
            assert_eq!(view.equipment.as_ref().map(|e| e.id), Some(e1.id));
            assert_eq!(view.equipment.as_ref().and_then(|e| e.ip1.clone()).as_deref(), Some("10.0.0.10"));

            assert_ok!(store.remove_direct_connection(conn.id).await);
            let view = fixtures::port(store, sw.id, 5).await;
            assert_eq!(view.status, PortStatus::Free, "{backend}");
            assert!(view.equipment.is_none());
        }
    }

    #[tokio::test]
    async fn test_recreate_ports_shrinks_and_relabels() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 48).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let port30 = fixtures::port(store, sw.id, 30).await;
            let conn = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port30.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();
            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 1).await;
            store
                .map_patch_port(pp.id, &MapPatchPortRequest {
                    switch_id: Some(sw.id),
                    switch_port: Some(40),
                })
                .await
                .unwrap();

            let outcome = store.recreate_switch_ports(sw.id, 24).await.unwrap();
            assert_eq!(outcome.deactivated_connections, 1, "{backend}");
            assert_eq!(outcome.cleared_mappings, 1, "{backend}");

            let ports = store.list_switch_ports(sw.id).await.unwrap();
            assert_eq!(ports.len(), 24);
            assert_eq!(ports.iter().map(|p| p.number).collect::<Vec<_>>(), (1..=24).collect::<Vec<_>>());
            assert!(ports[..4].iter().all(|p| p.description == "uplink"));
            assert!(ports[4..8].iter().all(|p| p.description == "PoE"));
            assert!(ports[8..].iter().all(|p| p.description == "access"));
            assert!(ports.iter().all(|p| p.status == PortStatus::Free), "{backend}");

            let mut tx = store.begin().await.unwrap();
            let stored = tx.get_connection(conn.id).await.unwrap().unwrap();
            assert_eq!(stored.status, ConnectionStatus::Inactive);
            let stored_pp = tx.get_patch_port(pp.id).await.unwrap().unwrap();
            assert!(stored_pp.mapping().is_none());
        }
    }

    #[tokio::test]
    async fn test_add_ports_appends_after_highest() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-02", 8).await;
            let added = store.add_switch_ports(sw.id, 4).await.unwrap();
            assert_eq!(added.iter().map(|p| p.number).collect::<Vec<_>>(), vec![9, 10, 11, 12], "{backend}");
            assert!(added.iter().all(|p| p.description == "access"));
            assert_eq!(store.list_switch_ports(sw.id).await.unwrap().len(), 12);

            assert_err!(store.add_switch_ports(sw.id, 0).await);
            let err = store.add_switch_ports(9999, 1).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_delete_switch_cascades() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 24).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let e2 = fixtures::equipment(store, "E2", None).await;
            let port2 = fixtures::port(store, sw.id, 2).await;
            let conn = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port2.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();

            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp1 = fixtures::patch_port(store, panel.id, 1).await;
            let pp2 = fixtures::patch_port(store, panel.id, 2).await;
            for (pp, number) in [(&pp1, 10), (&pp2, 11)] {
                store
                    .map_patch_port(pp.id, &MapPatchPortRequest {
                        switch_id: Some(sw.id),
                        switch_port: Some(number),
                    })
                    .await
                    .unwrap();
            }
            store.connect_equipment_to_patch_port(pp2.id, e2.id).await.unwrap();

            let outcome = store.delete_switch(sw.id).await.unwrap();
            assert_eq!(outcome.deactivated_connections, 1, "{backend}");
            assert_eq!(outcome.cleared_mappings, 2, "{backend}");

            let err = store.get_switch(sw.id).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));

            let after1 = fixtures::patch_port(store, panel.id, 1).await;
            let after2 = fixtures::patch_port(store, panel.id, 2).await;
            assert!(after1.mapped_switch_id.is_none() && after1.mapped_switch_port.is_none());
            assert_eq!(after1.status, PortStatus::Free);
            // equipment stays terminated on the patch port
            assert!(after2.mapped_switch_id.is_none());
            assert_eq!(after2.status, PortStatus::Occupied);

            let mut tx = store.begin().await.unwrap();
            let stored = tx.get_connection(conn.id).await.unwrap().unwrap();
            assert_eq!(stored.status, ConnectionStatus::Inactive, "{backend}");
        }
    }

    #[tokio::test]
    async fn test_disconnect_switch_port_frees_it() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 12).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let port10 = fixtures::port(store, sw.id, 10).await;
            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 3).await;
            store
                .map_patch_port(pp.id, &MapPatchPortRequest {
                    switch_id: Some(sw.id),
                    switch_port: Some(10),
                })
                .await
                .unwrap();
            let conn = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port10.id,
                    equipment_id: e1.id,
                })
                .await;
            // mapped ports are not free
            assert!(matches!(conn, Err(Error::PortNotFree { status: PortStatus::Mapped, .. })), "{backend}");

            let outcome = store.disconnect_switch_port(port10.id).await.unwrap();
            assert_eq!(outcome.unmapped_patch_ports, vec![pp.id]);
            assert!(outcome.deactivated_connection_id.is_none());
            assert_eq!(fixtures::port(store, sw.id, 10).await.status, PortStatus::Free);
            assert_eq!(fixtures::patch_port(store, panel.id, 3).await.status, PortStatus::Free);
        }
    }

    #[tokio::test]
    async fn test_status_partition_holds() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 16).await;
            let panel = fixtures::panel(store, "PP-A", 2, 8).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let e2 = fixtures::equipment(store, "E2", None).await;

            let check = |views: &[SwitchPortView]| {
                let (free, occupied, mapped) = counts(views);
                assert_eq!(free + occupied + mapped, views.len(), "{backend}");
                (free, occupied, mapped)
            };

            let port1 = fixtures::port(store, sw.id, 1).await;
            store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port1.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();
            for (number, target) in [(1, 2), (2, 3)] {
                let pp = fixtures::patch_port(store, panel.id, number).await;
                store
                    .map_patch_port(pp.id, &MapPatchPortRequest {
                        switch_id: Some(sw.id),
                        switch_port: Some(target),
                    })
                    .await
                    .unwrap();
            }
            let pp2 = fixtures::patch_port(store, panel.id, 2).await;
            store.connect_equipment_to_patch_port(pp2.id, e2.id).await.unwrap();

            let views = store.list_switch_ports(sw.id).await.unwrap();
            assert_eq!(check(&views), (13, 2, 1), "{backend}");

            store.add_switch_ports(sw.id, 4).await.unwrap();
            let views = store.list_switch_ports(sw.id).await.unwrap();
            assert_eq!(check(&views), (17, 2, 1), "{backend}");

            store.recreate_switch_ports(sw.id, 8).await.unwrap();
            let views = store.list_switch_ports(sw.id).await.unwrap();
            assert_eq!(check(&views), (8, 0, 0), "{backend}");
        }
    }
}
