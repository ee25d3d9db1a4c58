use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;

use super::row_helpers::{map_connection_row, placeholders};

const SELECT_CONNECTION: &str =
    "SELECT id, port_id, equipment_id, connected_at, status FROM direct_connections";

/// Direct connection database operations
pub struct ConnectionRepo;

impl ConnectionRepo {
    pub async fn create(
        conn: &mut SqliteConnection,
        port_id: i64,
        equipment_id: i64,
    ) -> Result<DirectConnection> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO direct_connections (port_id, equipment_id, connected_at, status) VALUES (?, ?, ?, ?)",
        )
        .bind(port_id)
        .bind(equipment_id)
        .bind(now)
        .bind(ConnectionStatus::Active.as_str())
        .execute(&mut *conn)
        .await
        .context("Failed to insert direct connection")?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Connection not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<DirectConnection>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_CONNECTION))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_connection_row))
    }

    pub async fn active_for_equipment(
        conn: &mut SqliteConnection,
        equipment_id: i64,
    ) -> Result<Vec<DirectConnection>> {
        let rows = sqlx::query(&format!(
            "{} WHERE equipment_id = ? AND status = 'active' ORDER BY id",
            SELECT_CONNECTION
        ))
        .bind(equipment_id)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(map_connection_row).collect())
    }

    pub async fn active_for_ports(
        conn: &mut SqliteConnection,
        port_ids: &[i64],
    ) -> Result<Vec<DirectConnection>> {
        if port_ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "{} WHERE status = 'active' AND port_id IN ({}) ORDER BY id",
            SELECT_CONNECTION,
            placeholders(port_ids.len())
        );
        let mut query = sqlx::query(&sql);
        for id in port_ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(map_connection_row).collect())
    }

    pub async fn list_active(conn: &mut SqliteConnection) -> Result<Vec<DirectConnection>> {
        let rows = sqlx::query(&format!("{} WHERE status = 'active' ORDER BY id", SELECT_CONNECTION))
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_connection_row).collect())
    }

    pub async fn set_status(
        conn: &mut SqliteConnection,
        id: i64,
        status: ConnectionStatus,
    ) -> Result<()> {
        sqlx::query("UPDATE direct_connections SET status = ? WHERE id = ?")
            .bind(status.as_str())
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
