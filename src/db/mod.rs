mod cables;
mod connections;
mod equipment;
pub mod file;
mod patch_panels;
mod ping_logs;
mod rooms;
pub(crate) mod row_helpers;
pub mod sqlite;
mod switches;

use anyhow::{bail, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::sync::Arc;

use crate::config::Config;
use crate::models::*;

/// Storage opens transactions against one backing store.
///
/// Exactly one implementation is selected at startup; the connectivity
/// engine never learns which one it is talking to.
#[async_trait]
pub trait Storage: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn StorageTx>>;
}

/// StorageTx is one read-validate-write unit of work.
///
/// Dropping a transaction without calling [`StorageTx::commit`] discards
/// every write made through it.
#[async_trait]
pub trait StorageTx: Send {
    // Switches
    async fn insert_switch(&mut self, req: &CreateSwitchRequest) -> Result<Switch>;
    async fn get_switch(&mut self, id: i64) -> Result<Option<Switch>>;
    /// Newest first
    async fn list_switches(&mut self) -> Result<Vec<Switch>>;
    async fn update_switch(&mut self, switch: &Switch) -> Result<()>;
    async fn delete_switch(&mut self, id: i64) -> Result<()>;

    // Switch ports
    async fn insert_switch_port(
        &mut self,
        switch_id: i64,
        number: i32,
        description: &str,
    ) -> Result<SwitchPort>;
    async fn get_switch_port(&mut self, id: i64) -> Result<Option<SwitchPort>>;
    /// Ordered by port number
    async fn list_switch_ports(&mut self, switch_id: i64) -> Result<Vec<SwitchPort>>;
    async fn switch_ports_by_ids(&mut self, ids: &[i64]) -> Result<Vec<SwitchPort>>;
    async fn delete_switch_ports(&mut self, switch_id: i64) -> Result<u64>;

    // Direct connections
    async fn insert_connection(&mut self, port_id: i64, equipment_id: i64)
        -> Result<DirectConnection>;
    async fn get_connection(&mut self, id: i64) -> Result<Option<DirectConnection>>;
    async fn active_connections_for_equipment(
        &mut self,
        equipment_id: i64,
    ) -> Result<Vec<DirectConnection>>;
    async fn active_connections_for_ports(
        &mut self,
        port_ids: &[i64],
    ) -> Result<Vec<DirectConnection>>;
    async fn list_active_connections(&mut self) -> Result<Vec<DirectConnection>>;
    async fn set_connection_status(&mut self, id: i64, status: ConnectionStatus) -> Result<()>;

    // Patch panels
    async fn insert_patch_panel(
        &mut self,
        code: &str,
        req: &CreatePatchPanelRequest,
    ) -> Result<PatchPanel>;
    async fn get_patch_panel(&mut self, id: i64) -> Result<Option<PatchPanel>>;
    /// Ordered by floor then name
    async fn list_patch_panels(&mut self, floor: Option<i32>) -> Result<Vec<PatchPanel>>;
    async fn update_patch_panel(&mut self, panel: &PatchPanel) -> Result<()>;
    async fn delete_patch_panel(&mut self, id: i64) -> Result<()>;

    // Patch panel ports
    async fn insert_patch_port(&mut self, patch_panel_id: i64, number: i32)
        -> Result<PatchPanelPort>;
    async fn get_patch_port(&mut self, id: i64) -> Result<Option<PatchPanelPort>>;
    /// Ordered by port number
    async fn list_patch_ports(&mut self, patch_panel_id: i64) -> Result<Vec<PatchPanelPort>>;
    async fn list_all_patch_ports(&mut self) -> Result<Vec<PatchPanelPort>>;
    async fn patch_ports_mapped_to_switch(&mut self, switch_id: i64)
        -> Result<Vec<PatchPanelPort>>;
    async fn patch_ports_for_equipment(&mut self, equipment_id: i64)
        -> Result<Vec<PatchPanelPort>>;
    async fn update_patch_port(&mut self, port: &PatchPanelPort) -> Result<()>;
    async fn delete_patch_ports(&mut self, patch_panel_id: i64) -> Result<u64>;

    // Rooms
    async fn insert_room(&mut self, req: &CreateRoomRequest) -> Result<Room>;
    async fn get_room(&mut self, id: i64) -> Result<Option<Room>>;
    /// Insertion order; name ordering and uniqueness are decided by the engine
    async fn list_rooms(&mut self) -> Result<Vec<Room>>;
    async fn update_room(&mut self, room: &Room) -> Result<()>;
    async fn delete_room(&mut self, id: i64) -> Result<()>;

    // Equipment
    async fn insert_equipment(&mut self, req: &CreateEquipmentRequest) -> Result<Equipment>;
    async fn get_equipment(&mut self, id: i64) -> Result<Option<Equipment>>;
    async fn equipment_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Equipment>>;
    /// Ordered by name
    async fn list_equipment(&mut self) -> Result<Vec<Equipment>>;
    async fn list_equipment_in_room(&mut self, room_id: i64) -> Result<Vec<Equipment>>;
    /// Rewrites every column and replaces the extra data set
    async fn update_equipment(&mut self, equipment: &Equipment) -> Result<()>;
    async fn delete_equipment(&mut self, id: i64) -> Result<()>;

    // Cables
    async fn insert_cable(&mut self, req: &RegisterCableRequest) -> Result<Cable>;
    async fn get_cable(&mut self, id: i64) -> Result<Option<Cable>>;
    async fn find_cable_by_code(&mut self, unique_code: &str) -> Result<Option<Cable>>;
    async fn list_cables(&mut self) -> Result<Vec<Cable>>;
    async fn update_cable(&mut self, cable: &Cable) -> Result<()>;
    async fn delete_cable(&mut self, id: i64) -> Result<()>;

    // Cable connection ledger
    async fn insert_cable_connection(
        &mut self,
        req: &CreateCableConnectionRequest,
    ) -> Result<CableConnection>;
    async fn get_cable_connection(&mut self, id: i64) -> Result<Option<CableConnection>>;
    async fn open_cable_connection(&mut self, cable_id: i64) -> Result<Option<CableConnection>>;
    /// Newest first
    async fn list_open_cable_connections(&mut self) -> Result<Vec<CableConnection>>;
    /// Newest first, open and closed
    async fn list_cable_connections_for_room(&mut self, room_id: i64)
        -> Result<Vec<CableConnection>>;
    async fn close_cable_connection(&mut self, id: i64, at: DateTime<Utc>) -> Result<()>;

    // Reachability log
    async fn insert_ping_log(&mut self, log: &NewPingLog) -> Result<PingLog>;
    /// Newest first
    async fn list_ping_logs(&mut self, limit: i32) -> Result<Vec<PingLog>>;
    async fn clear_ping_logs(&mut self) -> Result<u64>;

    async fn commit(self: Box<Self>) -> Result<()>;
}

/// Store is the handle every operation goes through.
///
/// Operations are implemented in `crate::engine`; each opens one transaction,
/// runs its read-validate-write sequence and commits.
#[derive(Clone)]
pub struct Store {
    backend: Arc<dyn Storage>,
}

impl Store {
    pub fn new(backend: Arc<dyn Storage>) -> Self {
        Self { backend }
    }

    /// Open the backend named by the configuration
    pub async fn open(cfg: &Config) -> Result<Self> {
        let backend: Arc<dyn Storage> = match cfg.storage_backend.as_str() {
            "sqlite" => {
                Arc::new(sqlite::SqliteStorage::with_pool_size(&cfg.db_path, cfg.db_max_connections).await?)
            }
            "file" => Arc::new(file::FileStorage::open(&cfg.data_file).await?),
            other => bail!("unknown STORAGE_BACKEND {:?} (expected sqlite or file)", other),
        };
        Ok(Self::new(backend))
    }

    pub async fn begin(&self) -> Result<Box<dyn StorageTx>> {
        self.backend.begin().await
    }
}
