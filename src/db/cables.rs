use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use sqlx::SqliteConnection;

use crate::models::*;

use super::row_helpers::{map_cable_connection_row, map_cable_row};

const SELECT_CABLE: &str = r#"
    SELECT id, unique_code, kind, length, brand, model, description, status, created_at, updated_at
    FROM cables
"#;

const SELECT_CABLE_CONNECTION: &str = r#"
    SELECT id, cable_id, from_equipment_id, to_equipment_id, from_port, to_port, room_id, note,
           connected_at, disconnected_at
    FROM cable_connections
"#;

/// Cable inventory database operations
pub struct CableRepo;

impl CableRepo {
    pub async fn create(conn: &mut SqliteConnection, req: &RegisterCableRequest) -> Result<Cable> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO cables (unique_code, kind, length, brand, model, description, status, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(req.unique_code.trim())
        .bind(&req.kind)
        .bind(req.length)
        .bind(&req.brand)
        .bind(&req.model)
        .bind(&req.description)
        .bind(req.status.as_str())
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to insert cable")?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Cable not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Cable>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_CABLE))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_cable_row))
    }

    pub async fn find_by_code(conn: &mut SqliteConnection, unique_code: &str) -> Result<Option<Cable>> {
        let row = sqlx::query(&format!("{} WHERE unique_code = ?", SELECT_CABLE))
            .bind(unique_code.trim())
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_cable_row))
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Cable>> {
        let rows = sqlx::query(&format!("{} ORDER BY unique_code", SELECT_CABLE))
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_cable_row).collect())
    }

    pub async fn update(conn: &mut SqliteConnection, cable: &Cable) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE cables SET unique_code = ?, kind = ?, length = ?, brand = ?, model = ?,
                              description = ?, status = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&cable.unique_code)
        .bind(&cable.kind)
        .bind(cable.length)
        .bind(&cable.brand)
        .bind(&cable.model)
        .bind(&cable.description)
        .bind(cable.status.as_str())
        .bind(cable.updated_at)
        .bind(cable.id)
        .execute(&mut *conn)
        .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM cables WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

/// Cable connection ledger database operations
pub struct CableConnectionRepo;

impl CableConnectionRepo {
    pub async fn create(
        conn: &mut SqliteConnection,
        req: &CreateCableConnectionRequest,
    ) -> Result<CableConnection> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO cable_connections (cable_id, from_equipment_id, to_equipment_id, from_port, to_port,
                                           room_id, note, connected_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(req.cable_id)
        .bind(req.from_equipment_id)
        .bind(req.to_equipment_id)
        .bind(&req.from_port)
        .bind(&req.to_port)
        .bind(req.room_id)
        .bind(&req.note)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to insert cable connection")?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Cable connection not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<CableConnection>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_CABLE_CONNECTION))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_cable_connection_row))
    }

    pub async fn open_for_cable(
        conn: &mut SqliteConnection,
        cable_id: i64,
    ) -> Result<Option<CableConnection>> {
        let row = sqlx::query(&format!(
            "{} WHERE cable_id = ? AND disconnected_at IS NULL ORDER BY id DESC LIMIT 1",
            SELECT_CABLE_CONNECTION
        ))
        .bind(cable_id)
        .fetch_optional(&mut *conn)
        .await?;
        Ok(row.as_ref().map(map_cable_connection_row))
    }

    pub async fn list_open(conn: &mut SqliteConnection) -> Result<Vec<CableConnection>> {
        let rows = sqlx::query(&format!(
            "{} WHERE disconnected_at IS NULL ORDER BY connected_at DESC, id DESC",
            SELECT_CABLE_CONNECTION
        ))
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(map_cable_connection_row).collect())
    }

    pub async fn list_for_room(conn: &mut SqliteConnection, room_id: i64) -> Result<Vec<CableConnection>> {
        let rows = sqlx::query(&format!(
            "{} WHERE room_id = ? ORDER BY connected_at DESC, id DESC",
            SELECT_CABLE_CONNECTION
        ))
        .bind(room_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(map_cable_connection_row).collect())
    }

    pub async fn close(conn: &mut SqliteConnection, id: i64, at: DateTime<Utc>) -> Result<()> {
        sqlx::query("UPDATE cable_connections SET disconnected_at = ? WHERE id = ?")
            .bind(at)
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
