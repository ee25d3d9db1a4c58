use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;

use super::row_helpers::{map_switch_port_row, map_switch_row, placeholders};

/// Switch database operations
pub struct SwitchRepo;

impl SwitchRepo {
    pub async fn create(conn: &mut SqliteConnection, req: &CreateSwitchRequest) -> Result<Switch> {
        let now = Utc::now();
        let result = sqlx::query("INSERT INTO switches (name, brand, model, created_at) VALUES (?, ?, ?, ?)")
            .bind(&req.name)
            .bind(&req.brand)
            .bind(&req.model)
            .bind(now)
            .execute(&mut *conn)
            .await
            .context("Failed to insert switch")?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Switch not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Switch>> {
        let row = sqlx::query("SELECT id, name, brand, model, created_at FROM switches WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_switch_row))
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Switch>> {
        let rows = sqlx::query(
            "SELECT id, name, brand, model, created_at FROM switches ORDER BY created_at DESC, id DESC",
        )
        .fetch_all(&mut *conn)
        .await?;
        Ok(rows.iter().map(map_switch_row).collect())
    }

    pub async fn update(conn: &mut SqliteConnection, switch: &Switch) -> Result<()> {
        sqlx::query("UPDATE switches SET name = ?, brand = ?, model = ? WHERE id = ?")
            .bind(&switch.name)
            .bind(&switch.brand)
            .bind(&switch.model)
            .bind(switch.id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM switches WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}

const SELECT_PORT: &str = "SELECT id, switch_id, number, description FROM switch_ports";

/// Switch port database operations
pub struct SwitchPortRepo;

impl SwitchPortRepo {
    pub async fn create(
        conn: &mut SqliteConnection,
        switch_id: i64,
        number: i32,
        description: &str,
    ) -> Result<SwitchPort> {
        let result = sqlx::query("INSERT INTO switch_ports (switch_id, number, description) VALUES (?, ?, ?)")
            .bind(switch_id)
            .bind(number)
            .bind(description)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to insert port {} on switch {}", number, switch_id))?;

        Ok(SwitchPort {
            id: result.last_insert_rowid(),
            switch_id,
            number,
            description: description.to_string(),
        })
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<SwitchPort>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_PORT))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_switch_port_row))
    }

    pub async fn list_for_switch(conn: &mut SqliteConnection, switch_id: i64) -> Result<Vec<SwitchPort>> {
        let rows = sqlx::query(&format!("{} WHERE switch_id = ? ORDER BY number", SELECT_PORT))
            .bind(switch_id)
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_switch_port_row).collect())
    }

    pub async fn by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> Result<Vec<SwitchPort>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{} WHERE id IN ({}) ORDER BY id", SELECT_PORT, placeholders(ids.len()));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        Ok(rows.iter().map(map_switch_port_row).collect())
    }

    pub async fn delete_for_switch(conn: &mut SqliteConnection, switch_id: i64) -> Result<u64> {
        let result = sqlx::query("DELETE FROM switch_ports WHERE switch_id = ?")
            .bind(switch_id)
            .execute(&mut *conn)
            .await?;
        Ok(result.rows_affected())
    }
}
