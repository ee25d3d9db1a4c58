//! Direct equipment to switch port links.

use std::collections::HashMap;

use crate::db::{Store, StorageTx};
use crate::error::{Error, Result};
use crate::models::*;

use super::projection::{switch_port_status, MappingIndex};
use super::{require_equipment, Directory};

/// Projected status of one switch port
pub(crate) async fn port_status(tx: &mut dyn StorageTx, port: &SwitchPort) -> Result<PortStatus> {
    let has_direct = !tx.active_connections_for_ports(&[port.id]).await?.is_empty();
    let index = MappingIndex::for_switch(tx, port.switch_id).await?;
    Ok(switch_port_status(has_direct, index.lookup(port.switch_id, port.number)))
}

/// Reject equipment that already holds either kind of link
pub(crate) async fn ensure_unlinked(tx: &mut dyn StorageTx, equipment_id: i64) -> Result<()> {
    if !tx.active_connections_for_equipment(equipment_id).await?.is_empty() {
        return Err(Error::EquipmentAlreadyConnected {
            equipment_id,
            link: LinkKind::DirectConnection,
        });
    }
    if !tx.patch_ports_for_equipment(equipment_id).await?.is_empty() {
        return Err(Error::EquipmentAlreadyConnected {
            equipment_id,
            link: LinkKind::PatchPort,
        });
    }
    Ok(())
}

pub async fn create_direct_connection(
    tx: &mut dyn StorageTx,
    req: &CreateConnectionRequest,
) -> Result<DirectConnection> {
    let port = tx
        .get_switch_port(req.port_id)
        .await?
        .ok_or_else(|| Error::not_found("switch port", req.port_id))?;
    require_equipment(tx, req.equipment_id).await?;

    let status = port_status(tx, &port).await?;
    if status != PortStatus::Free {
        return Err(Error::PortNotFree {
            port_id: port.id,
            status,
        });
    }
    ensure_unlinked(tx, req.equipment_id).await?;

    Ok(tx.insert_connection(port.id, req.equipment_id).await?)
}

/// Mark a connection inactive; removing an already inactive one is a no-op
pub async fn remove_direct_connection(tx: &mut dyn StorageTx, id: i64) -> Result<DirectConnection> {
    let mut conn = tx
        .get_connection(id)
        .await?
        .ok_or_else(|| Error::not_found("connection", id))?;
    if conn.is_active() {
        tx.set_connection_status(id, ConnectionStatus::Inactive).await?;
        conn.status = ConnectionStatus::Inactive;
    }
    Ok(conn)
}

/// Deactivate whatever direct connections the equipment holds, returning the first
pub(crate) async fn deactivate_for_equipment(
    tx: &mut dyn StorageTx,
    equipment_id: i64,
) -> Result<Option<DirectConnection>> {
    let active = tx.active_connections_for_equipment(equipment_id).await?;
    for conn in &active {
        tx.set_connection_status(conn.id, ConnectionStatus::Inactive)
            .await?;
    }
    Ok(active.into_iter().next())
}

/// Active connections ordered by switch name then port number
pub async fn list_active_connections(tx: &mut dyn StorageTx) -> Result<Vec<ConnectionView>> {
    let active = tx.list_active_connections().await?;
    let port_ids: Vec<i64> = active.iter().map(|c| c.port_id).collect();
    let ports: HashMap<i64, SwitchPort> = tx
        .switch_ports_by_ids(&port_ids)
        .await?
        .into_iter()
        .map(|p| (p.id, p))
        .collect();
    let switches: HashMap<i64, Switch> = tx
        .list_switches()
        .await?
        .into_iter()
        .map(|s| (s.id, s))
        .collect();
    let directory = Directory::load(tx, active.iter().map(|c| c.equipment_id)).await?;

    let mut views = Vec::with_capacity(active.len());
    for conn in active {
        let Some(port) = ports.get(&conn.port_id) else {
            tracing::debug!(connection_id = conn.id, port_id = conn.port_id, "active connection on missing port");
            continue;
        };
        let (Some(switch), Some(equipment)) = (switches.get(&port.switch_id), directory.summary(conn.equipment_id))
        else {
            continue;
        };
        views.push(ConnectionView {
            id: conn.id,
            connected_at: conn.connected_at,
            port_id: port.id,
            port_number: port.number,
            switch_id: switch.id,
            switch_name: switch.name.clone(),
            switch_brand: switch.brand.clone(),
            equipment,
        });
    }
    views.sort_by(|a, b| {
        a.switch_name
            .cmp(&b.switch_name)
            .then(a.port_number.cmp(&b.port_number))
    });
    Ok(views)
}

impl Store {
    pub async fn create_direct_connection(&self, req: &CreateConnectionRequest) -> Result<DirectConnection> {
        let mut tx = self.begin().await?;
        let conn = create_direct_connection(tx.as_mut(), req).await?;
        tx.commit().await?;
        tracing::info!(
            connection_id = conn.id,
            port_id = conn.port_id,
            equipment_id = conn.equipment_id,
            "Connected equipment to switch port"
        );
        Ok(conn)
    }

    pub async fn remove_direct_connection(&self, id: i64) -> Result<DirectConnection> {
        let mut tx = self.begin().await?;
        let conn = remove_direct_connection(tx.as_mut(), id).await?;
        tx.commit().await?;
        tracing::info!(connection_id = id, port_id = conn.port_id, "Removed direct connection");
        Ok(conn)
    }

    pub async fn list_active_connections(&self) -> Result<Vec<ConnectionView>> {
        let mut tx = self.begin().await?;
        list_active_connections(tx.as_mut()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::testing::stores;
    use crate::engine::fixtures;

    #[tokio::test]
    async fn test_second_connection_on_port_is_rejected() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let e2 = fixtures::equipment(store, "E2", None).await;
            let port = fixtures::port(store, sw.id, 5).await;

            store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();
            let err = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port.id,
                    equipment_id: e2.id,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::PortNotFree { port_id, status: PortStatus::Occupied } if port_id == port.id),
                "{backend}: {err}"
            );
        }
    }

    #[tokio::test]
    async fn test_equipment_holds_one_link() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 8).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let p1 = fixtures::port(store, sw.id, 1).await;
            let p2 = fixtures::port(store, sw.id, 2).await;

            store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: p1.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();
            let err = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: p2.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::EquipmentAlreadyConnected { link: LinkKind::DirectConnection, .. }),
                "{backend}"
            );

            // a patch port link blocks a direct connection too
            let e2 = fixtures::equipment(store, "E2", None).await;
            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 1).await;
            store.connect_equipment_to_patch_port(pp.id, e2.id).await.unwrap();
            let err = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: p2.id,
                    equipment_id: e2.id,
                })
                .await
                .unwrap_err();
            assert!(
                matches!(err, Error::EquipmentAlreadyConnected { link: LinkKind::PatchPort, .. }),
                "{backend}"
            );
            assert_eq!(fixtures::port(store, sw.id, 2).await.status, PortStatus::Free);
        }
    }

    #[tokio::test]
    async fn test_missing_port_and_equipment() {
        let (_dir, stores) = stores().await;
        for (_, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 2).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let port = fixtures::port(store, sw.id, 1).await;

            let err = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: 424242,
                    equipment_id: e1.id,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NotFound { resource: "switch port", .. }));

            let err = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port.id,
                    equipment_id: 424242,
                })
                .await
                .unwrap_err();
            assert!(matches!(err, Error::NotFound { resource: "equipment", .. }));

            let err = store.remove_direct_connection(424242).await.unwrap_err();
            assert!(matches!(err, Error::NotFound { .. }));
        }
    }

    #[tokio::test]
    async fn test_removal_falls_back_to_mapped() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let sw = fixtures::switch(store, "SW-01", 12).await;
            let e1 = fixtures::equipment(store, "E1", None).await;
            let port = fixtures::port(store, sw.id, 10).await;
            let conn = store
                .create_direct_connection(&CreateConnectionRequest {
                    port_id: port.id,
                    equipment_id: e1.id,
                })
                .await
                .unwrap();

            let panel = fixtures::panel(store, "PP-A", 1, 4).await;
            let pp = fixtures::patch_port(store, panel.id, 3).await;
            store
                .map_patch_port(pp.id, &MapPatchPortRequest {
                    switch_id: Some(sw.id),
                    switch_port: Some(10),
                })
                .await
                .unwrap();
            assert_eq!(fixtures::port(store, sw.id, 10).await.status, PortStatus::Occupied);

            let removed = store.remove_direct_connection(conn.id).await.unwrap();
            assert_eq!(removed.status, ConnectionStatus::Inactive);
            assert_eq!(fixtures::port(store, sw.id, 10).await.status, PortStatus::Mapped, "{backend}");

            // removing twice is harmless
            let again = store.remove_direct_connection(conn.id).await.unwrap();
            assert_eq!(again.status, ConnectionStatus::Inactive);
        }
    }

    #[tokio::test]
    async fn test_list_active_connections_order() {
        let (_dir, stores) = stores().await;
        for (backend, store) in &stores {
            let b = fixtures::switch(store, "SW-B", 8).await;
            let a = fixtures::switch(store, "SW-A", 8).await;
            let mut pairs = Vec::new();
            for (i, (sw, number)) in [(&b, 2), (&a, 7), (&a, 3)].into_iter().enumerate() {
                let e = fixtures::equipment(store, &format!("E{}", i), None).await;
                let port = fixtures::port(store, sw.id, number).await;
                let conn = store
                    .create_direct_connection(&CreateConnectionRequest {
                        port_id: port.id,
                        equipment_id: e.id,
                    })
                    .await
                    .unwrap();
                pairs.push(conn.id);
            }
            store.remove_direct_connection(pairs[0]).await.unwrap();

            let views = store.list_active_connections().await.unwrap();
            let order: Vec<(String, i32)> = views.iter().map(|v| (v.switch_name.clone(), v.port_number)).collect();
            assert_eq!(order, vec![("SW-A".to_string(), 3), ("SW-A".to_string(), 7)], "{backend}");
        }
    }
}
