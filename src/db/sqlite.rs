use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{sqlite::SqlitePoolOptions, Pool, Sqlite, Transaction};
use std::sync::Arc;
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::models::*;

use super::cables::{CableConnectionRepo, CableRepo};
use super::connections::ConnectionRepo;
use super::equipment::EquipmentRepo;
use super::patch_panels::{PatchPanelRepo, PatchPortRepo};
use super::ping_logs::PingLogRepo;
use super::rooms::RoomRepo;
use super::switches::{SwitchPortRepo, SwitchRepo};
use super::{Storage, StorageTx};

/// Relational backend over a SQLite pool.
///
/// `gate` serialises transactions so a read-validate-write sequence never
/// interleaves with another one.
pub struct SqliteStorage {
    pool: Pool<Sqlite>,
    gate: Arc<Mutex<()>>,
}

impl SqliteStorage {
    /// Connect to the database file (creating it if needed) and run migrations
    pub async fn with_pool_size(db_path: &str, max_connections: u32) -> Result<Self> {
        let db_url = format!("sqlite:{}?mode=rwc", db_path);

        let pool = SqlitePoolOptions::new()
            .max_connections(max_connections)
            .connect(&db_url)
            .await
            .context("Failed to connect to database")?;

        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("Failed to run database migrations")?;

        Ok(Self {
            pool,
            gate: Arc::new(Mutex::new(())),
        })
    }
}

#[async_trait]
impl Storage for SqliteStorage {
    async fn begin(&self) -> Result<Box<dyn StorageTx>> {
        let guard = self.gate.clone().lock_owned().await;
        let tx = self.pool.begin().await.context("Failed to begin transaction")?;
        Ok(Box::new(SqliteTx { tx, _guard: guard }))
    }
}

/// SqliteTx wraps one sqlx transaction; dropping it rolls back
pub struct SqliteTx {
    tx: Transaction<'static, Sqlite>,
    _guard: OwnedMutexGuard<()>,
}

#[async_trait]
impl StorageTx for SqliteTx {
    async fn insert_switch(&mut self, req: &CreateSwitchRequest) -> Result<Switch> {
        SwitchRepo::create(&mut self.tx, req).await
    }

    async fn get_switch(&mut self, id: i64) -> Result<Option<Switch>> {
        SwitchRepo::get(&mut self.tx, id).await
    }

    async fn list_switches(&mut self) -> Result<Vec<Switch>> {
        SwitchRepo::list(&mut self.tx).await
    }

    async fn update_switch(&mut self, switch: &Switch) -> Result<()> {
        SwitchRepo::update(&mut self.tx, switch).await
    }

    async fn delete_switch(&mut self, id: i64) -> Result<()> {
        SwitchRepo::delete(&mut self.tx, id).await
    }

    async fn insert_switch_port(
        &mut self,
        switch_id: i64,
        number: i32,
        description: &str,
    ) -> Result<SwitchPort> {
        SwitchPortRepo::create(&mut self.tx, switch_id, number, description).await
    }

    async fn get_switch_port(&mut self, id: i64) -> Result<Option<SwitchPort>> {
        SwitchPortRepo::get(&mut self.tx, id).await
    }

    async fn list_switch_ports(&mut self, switch_id: i64) -> Result<Vec<SwitchPort>> {
        SwitchPortRepo::list_for_switch(&mut self.tx, switch_id).await
    }

    async fn switch_ports_by_ids(&mut self, ids: &[i64]) -> Result<Vec<SwitchPort>> {
        SwitchPortRepo::by_ids(&mut self.tx, ids).await
    }

    async fn delete_switch_ports(&mut self, switch_id: i64) -> Result<u64> {
        SwitchPortRepo::delete_for_switch(&mut self.tx, switch_id).await
    }

    async fn insert_connection(&mut self, port_id: i64, equipment_id: i64) -> Result<DirectConnection> {
        ConnectionRepo::create(&mut self.tx, port_id, equipment_id).await
    }

    async fn get_connection(&mut self, id: i64) -> Result<Option<DirectConnection>> {
        ConnectionRepo::get(&mut self.tx, id).await
    }

    async fn active_connections_for_equipment(&mut self, equipment_id: i64) -> Result<Vec<DirectConnection>> {
        ConnectionRepo::active_for_equipment(&mut self.tx, equipment_id).await
    }

    async fn active_connections_for_ports(&mut self, port_ids: &[i64]) -> Result<Vec<DirectConnection>> {
        ConnectionRepo::active_for_ports(&mut self.tx, port_ids).await
    }

    async fn list_active_connections(&mut self) -> Result<Vec<DirectConnection>> {
        ConnectionRepo::list_active(&mut self.tx).await
    }

    async fn set_connection_status(&mut self, id: i64, status: ConnectionStatus) -> Result<()> {
        ConnectionRepo::set_status(&mut self.tx, id, status).await
    }

    async fn insert_patch_panel(&mut self, code: &str, req: &CreatePatchPanelRequest) -> Result<PatchPanel> {
        PatchPanelRepo::create(&mut self.tx, code, req).await
    }

    async fn get_patch_panel(&mut self, id: i64) -> Result<Option<PatchPanel>> {
        PatchPanelRepo::get(&mut self.tx, id).await
    }

    async fn list_patch_panels(&mut self, floor: Option<i32>) -> Result<Vec<PatchPanel>> {
        PatchPanelRepo::list(&mut self.tx, floor).await
    }

    async fn update_patch_panel(&mut self, panel: &PatchPanel) -> Result<()> {
        PatchPanelRepo::update(&mut self.tx, panel).await
    }

    async fn delete_patch_panel(&mut self, id: i64) -> Result<()> {
        PatchPanelRepo::delete(&mut self.tx, id).await
    }

    async fn insert_patch_port(&mut self, patch_panel_id: i64, number: i32) -> Result<PatchPanelPort> {
        PatchPortRepo::create(&mut self.tx, patch_panel_id, number).await
    }

    async fn get_patch_port(&mut self, id: i64) -> Result<Option<PatchPanelPort>> {
        PatchPortRepo::get(&mut self.tx, id).await
    }

    async fn list_patch_ports(&mut self, patch_panel_id: i64) -> Result<Vec<PatchPanelPort>> {
        PatchPortRepo::list_for_panel(&mut self.tx, patch_panel_id).await
    }

    async fn list_all_patch_ports(&mut self) -> Result<Vec<PatchPanelPort>> {
        PatchPortRepo::list_all(&mut self.tx).await
    }

    async fn patch_ports_mapped_to_switch(&mut self, switch_id: i64) -> Result<Vec<PatchPanelPort>> {
        PatchPortRepo::mapped_to_switch(&mut self.tx, switch_id).await
    }

    async fn patch_ports_for_equipment(&mut self, equipment_id: i64) -> Result<Vec<PatchPanelPort>> {
        PatchPortRepo::for_equipment(&mut self.tx, equipment_id).await
    }

    async fn update_patch_port(&mut self, port: &PatchPanelPort) -> Result<()> {
        PatchPortRepo::update(&mut self.tx, port).await
    }

    async fn delete_patch_ports(&mut self, patch_panel_id: i64) -> Result<u64> {
        PatchPortRepo::delete_for_panel(&mut self.tx, patch_panel_id).await
    }

    async fn insert_room(&mut self, req: &CreateRoomRequest) -> Result<Room> {
        RoomRepo::create(&mut self.tx, req).await
    }

    async fn get_room(&mut self, id: i64) -> Result<Option<Room>> {
        RoomRepo::get(&mut self.tx, id).await
    }

    async fn list_rooms(&mut self) -> Result<Vec<Room>> {
        RoomRepo::list(&mut self.tx).await
    }

    async fn update_room(&mut self, room: &Room) -> Result<()> {
        RoomRepo::update(&mut self.tx, room).await
    }

    async fn delete_room(&mut self, id: i64) -> Result<()> {
        RoomRepo::delete(&mut self.tx, id).await
    }

    async fn insert_equipment(&mut self, req: &CreateEquipmentRequest) -> Result<Equipment> {
        EquipmentRepo::create(&mut self.tx, req).await
    }

    async fn get_equipment(&mut self, id: i64) -> Result<Option<Equipment>> {
        EquipmentRepo::get(&mut self.tx, id).await
    }

    async fn equipment_by_ids(&mut self, ids: &[i64]) -> Result<Vec<Equipment>> {
        EquipmentRepo::by_ids(&mut self.tx, ids).await
    }

    async fn list_equipment(&mut self) -> Result<Vec<Equipment>> {
        EquipmentRepo::list(&mut self.tx).await
    }

    async fn list_equipment_in_room(&mut self, room_id: i64) -> Result<Vec<Equipment>> {
        EquipmentRepo::list_in_room(&mut self.tx, room_id).await
    }

    async fn update_equipment(&mut self, equipment: &Equipment) -> Result<()> {
        EquipmentRepo::update(&mut self.tx, equipment).await
    }

    async fn delete_equipment(&mut self, id: i64) -> Result<()> {
        EquipmentRepo::delete(&mut self.tx, id).await
    }

    async fn insert_cable(&mut self, req: &RegisterCableRequest) -> Result<Cable> {
        CableRepo::create(&mut self.tx, req).await
    }

    async fn get_cable(&mut self, id: i64) -> Result<Option<Cable>> {
        CableRepo::get(&mut self.tx, id).await
    }

    async fn find_cable_by_code(&mut self, unique_code: &str) -> Result<Option<Cable>> {
        CableRepo::find_by_code(&mut self.tx, unique_code).await
    }

    async fn list_cables(&mut self) -> Result<Vec<Cable>> {
        CableRepo::list(&mut self.tx).await
    }

    async fn update_cable(&mut self, cable: &Cable) -> Result<()> {
        CableRepo::update(&mut self.tx, cable).await
    }

    async fn delete_cable(&mut self, id: i64) -> Result<()> {
        CableRepo::delete(&mut self.tx, id).await
    }

    async fn insert_cable_connection(&mut self, req: &CreateCableConnectionRequest) -> Result<CableConnection> {
        CableConnectionRepo::create(&mut self.tx, req).await
    }

    async fn get_cable_connection(&mut self, id: i64) -> Result<Option<CableConnection>> {
        CableConnectionRepo::get(&mut self.tx, id).await
    }

    async fn open_cable_connection(&mut self, cable_id: i64) -> Result<Option<CableConnection>> {
        CableConnectionRepo::open_for_cable(&mut self.tx, cable_id).await
    }

    async fn list_open_cable_connections(&mut self) -> Result<Vec<CableConnection>> {
        CableConnectionRepo::list_open(&mut self.tx).await
    }

    async fn list_cable_connections_for_room(&mut self, room_id: i64) -> Result<Vec<CableConnection>> {
        CableConnectionRepo::list_for_room(&mut self.tx, room_id).await
    }

    async fn close_cable_connection(&mut self, id: i64, at: DateTime<Utc>) -> Result<()> {
        CableConnectionRepo::close(&mut self.tx, id, at).await
    }

    async fn insert_ping_log(&mut self, log: &NewPingLog) -> Result<PingLog> {
        PingLogRepo::create(&mut self.tx, log).await
    }

    async fn list_ping_logs(&mut self, limit: i32) -> Result<Vec<PingLog>> {
        PingLogRepo::list(&mut self.tx, limit).await
    }

    async fn clear_ping_logs(&mut self) -> Result<u64> {
        PingLogRepo::clear(&mut self.tx).await
    }

    async fn commit(self: Box<Self>) -> Result<()> {
        let SqliteTx { tx, _guard } = *self;
        tx.commit().await.context("Failed to commit transaction")
    }
}
