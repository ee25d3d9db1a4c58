use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;

use super::row_helpers::{map_patch_panel_row, map_patch_port_row};

const SELECT_PANEL: &str = r#"
    SELECT id, code, name, floor, port_start, port_count, keystone_prefix, status, description, created_at
    FROM patch_panels
"#;

const SELECT_PATCH_PORT: &str = r#"
    SELECT id, patch_panel_id, number, mapped_switch_id, mapped_switch_port, equipment_id, connected_at
    FROM patch_panel_ports
"#;

/// Patch panel database operations
pub struct PatchPanelRepo;

impl PatchPanelRepo {
    pub async fn create(
        conn: &mut SqliteConnection,
        code: &str,
        req: &CreatePatchPanelRequest,
    ) -> Result<PatchPanel> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO patch_panels (code, name, floor, port_start, port_count, keystone_prefix,
                                      status, description, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(code)
        .bind(&req.name)
        .bind(req.floor)
        .bind(req.port_start)
        .bind(req.port_count)
        .bind(req.keystone_prefix.trim())
        .bind(panel_status::ACTIVE)
        .bind(&req.description)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to insert patch panel")?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Patch panel not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<PatchPanel>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PANEL))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_patch_panel_row))
    }

    pub async fn list(conn: &mut SqliteConnection, floor: Option<i32>) -> Result<Vec<PatchPanel>> {
        let rows = match floor {
            Some(floor) => {
                sqlx::query(&format!("{} WHERE floor = ? ORDER BY floor, name, id", SELECT_PANEL))
                    .bind(floor)
                    .fetch_all(&mut *conn)
                    .await?
            }
            None => {
                sqlx::query(&format!("{} ORDER BY floor, name, id", SELECT_PANEL))
                    .fetch_all(&mut *conn)
                    .await?
            }
        };
        Ok(rows.iter().map(map_patch_panel_row).collect())
    }

    pub async fn update(conn: &mut SqliteConnection, panel: &PatchPanel) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE patch_panels SET name = ?, floor = ?, port_start = ?, port_count = ?,
                                    keystone_prefix = ?, status = ?, description = ?
            WHERE id = ?
            "#,
        )
        .bind(&panel.name)
        .bind(panel.floor)
        .bind(panel.port_start)
        .bind(panel.port_count)
        .bind(&panel.keystone_prefix)
        .bind(&panel.status)
        .bind(&panel.description)
        .bind(panel.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM patch_panels WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Patch panel port database operations
pub struct PatchPortRepo;

impl PatchPortRepo {
    pub async fn create(
        conn: &mut SqliteConnection,
        patch_panel_id: i64,
        number: i32,
    ) -> Result<PatchPanelPort> {
        let result = sqlx::query("INSERT INTO patch_panel_ports (patch_panel_id, number) VALUES (?, ?)")
            .bind(patch_panel_id)
            .bind(number)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to insert port {} on patch panel {}", number, patch_panel_id))?;

        Ok(PatchPanelPort {
            id: result.last_insert_rowid(),
            patch_panel_id,
            number,
            mapped_switch_id: None,
            mapped_switch_port: None,
            equipment_id: None,
            connected_at: None,
        })
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<PatchPanelPort>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PATCH_PORT))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_patch_port_row))
    }

    pub async fn list_for_panel(
        conn: &mut SqliteConnection,
        patch_panel_id: i64,
    ) -> Result<Vec<PatchPanelPort>> {
        let rows = sqlx::query(&format!("{} WHERE patch_panel_id = ? ORDER BY number", SELECT_PATCH_PORT))
            .bind(patch_panel_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_patch_port_row).collect())
    }

    pub async fn list_all(conn: &mut SqliteConnection) -> Result<Vec<PatchPanelPort>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_PATCH_PORT))
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_patch_port_row).collect())
    }

    pub async fn mapped_to_switch(
        conn: &mut SqliteConnection,
        switch_id: i64,
    ) -> Result<Vec<PatchPanelPort>> {
        let rows = sqlx::query(&format!(
            "{} WHERE mapped_switch_id = ? AND mapped_switch_port IS NOT NULL ORDER BY id",
            SELECT_PATCH_PORT
        ))
        .bind(switch_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(map_patch_port_row).collect())
    }

    pub async fn for_equipment(
        conn: &mut SqliteConnection,
        equipment_id: i64,
    ) -> Result<Vec<PatchPanelPort>> {
        let rows = sqlx::query(&format!("{} WHERE equipment_id = ? ORDER BY id", SELECT_PATCH_PORT))
            .bind(equipment_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_patch_port_row).collect())
    }

    pub async fn update(conn: &mut SqliteConnection, port: &PatchPanelPort) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE patch_panel_ports SET mapped_switch_id = ?, mapped_switch_port = ?,
                                         equipment_id = ?, connected_at = ?
            WHERE id = ?
            "#,
        )
        .bind(port.mapped_switch_id)
        .bind(port.mapped_switch_port)
        .bind(port.equipment_id)
        .bind(port.connected_at)
        .bind(port.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete_for_panel(conn: &mut SqliteConnection, patch_panel_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM patch_panel_ports WHERE patch_panel_id = ?")
            .bind(patch_panel_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
