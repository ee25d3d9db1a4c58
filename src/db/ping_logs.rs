use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;

use super::row_helpers::map_ping_log_row;

/// Reachability log database operations
pub struct PingLogRepo;

impl PingLogRepo {
    pub async fn create(conn: &mut SqliteConnection, log: &NewPingLog) -> Result<PingLog> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO ping_logs (equipment_id, equipment_name, ip, success, output, checked_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(log.equipment_id)
        .bind(&log.equipment_name)
        .bind(&log.ip)
        .bind(if log.success { 1 } else { 0 })
        .bind(&log.output)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to record ping result")?;

        Ok(PingLog {
            id: result.last_insert_rowid(),
            equipment_id: log.equipment_id,
            equipment_name: log.equipment_name.clone(),
            ip: log.ip.clone(),
            success: log.success,
            output: log.output.clone(),
            checked_at: now,
        })
    }

    pub async fn list(conn: &mut SqliteConnection, limit: i32) -> Result<Vec<PingLog>> {
        let rows = sqlx::query(
            r#"
            SELECT id, equipment_id, equipment_name, ip, success, output, checked_at
            FROM ping_logs ORDER BY checked_at DESC, id DESC LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(map_ping_log_row).collect())
    }

    pub async fn clear(conn: &mut SqliteConnection) -> Result<u64> {
        let result = sqlx::query("DELETE FROM ping_logs").execute(&mut *conn).await?;
        Ok(result.rows_affected())
    }
}
