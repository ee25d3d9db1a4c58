use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::{Row, SqliteConnection};
use std::collections::HashMap;

use crate::models::*;

use super::row_helpers::{map_equipment_row, placeholders};

const SELECT_EQUIPMENT: &str = r#"
    SELECT id, name, kind, brand, model, description, room_id, defective, created_at, updated_at
    FROM equipment
"#;

/// Equipment database operations; extra data lives in `equipment_data`
pub struct EquipmentRepo;

impl EquipmentRepo {
    pub async fn create(conn: &mut SqliteConnection, req: &CreateEquipmentRequest) -> Result<Equipment> {
        let now = Utc::now();
        let result = sqlx::query(
            r#"
            INSERT INTO equipment (name, kind, brand, model, description, room_id, defective, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(req.name.trim())
        .bind(&req.kind)
        .bind(&req.brand)
        .bind(&req.model)
        .bind(&req.description)
        .bind(req.room_id)
        .bind(now)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to insert equipment")?;

        let id = result.last_insert_rowid();
        for (key, value) in &req.extra_data {
            if value.trim().is_empty() {
                continue;
            }
            Self::insert_data(conn, id, key, value.trim()).await?;
        }

        Self::get(conn, id)
            .await?
            .context("Equipment not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Equipment>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_EQUIPMENT))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut items = vec![map_equipment_row(&row)];
        Self::attach_data(conn, &mut items).await?;
        Ok(items.pop())
    }

    pub async fn by_ids(conn: &mut SqliteConnection, ids: &[i64]) -> Result<Vec<Equipment>> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!("{} WHERE id IN ({}) ORDER BY id", SELECT_EQUIPMENT, placeholders(ids.len()));
        let mut query = sqlx::query(&sql);
        for id in ids {
            query = query.bind(id);
        }
        let rows = query.fetch_all(&mut *conn).await?;
        let mut items: Vec<Equipment> = rows.iter().map(map_equipment_row).collect();
        Self::attach_data(conn, &mut items).await?;
        Ok(items)
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Equipment>> {
        let rows = sqlx::query(&format!("{} ORDER BY name, id", SELECT_EQUIPMENT))
            .fetch_all(&mut *conn)
            .await?;
        let mut items: Vec<Equipment> = rows.iter().map(map_equipment_row).collect();
        Self::attach_data(conn, &mut items).await?;
        Ok(items)
    }

    pub async fn list_in_room(conn: &mut SqliteConnection, room_id: i64) -> Result<Vec<Equipment>> {
        let rows = sqlx::query(&format!("{} WHERE room_id = ? ORDER BY name, id", SELECT_EQUIPMENT))
            .bind(room_id)
            .fetch_all(&mut *conn)
            .await?;
        let mut items: Vec<Equipment> = rows.iter().map(map_equipment_row).collect();
        Self::attach_data(conn, &mut items).await?;
        Ok(items)
    }

    pub async fn update(conn: &mut SqliteConnection, equipment: &Equipment) -> Result<()> {
        sqlx::query(
            r#"
            UPDATE equipment SET name = ?, kind = ?, brand = ?, model = ?, description = ?,
                                 room_id = ?, defective = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(&equipment.name)
        .bind(&equipment.kind)
        .bind(&equipment.brand)
        .bind(&equipment.model)
        .bind(&equipment.description)
        .bind(equipment.room_id)
        .bind(if equipment.defective { 1 } else { 0 })
        .bind(equipment.updated_at)
        .bind(equipment.id)
        .execute(&mut *conn)
        .await?;

        sqlx::query("DELETE FROM equipment_data WHERE equipment_id = ?")
            .bind(equipment.id)
            .execute(&mut *conn)
            .await?;
        for (key, value) in &equipment.extra_data {
            Self::insert_data(conn, equipment.id, key, value).await?;
        }
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM equipment_data WHERE equipment_id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        sqlx::query("DELETE FROM equipment WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }

    async fn insert_data(conn: &mut SqliteConnection, id: i64, key: &str, value: &str) -> Result<()> {
        sqlx::query("INSERT INTO equipment_data (equipment_id, key, value) VALUES (?, ?, ?)")
            .bind(id)
            .bind(key)
            .bind(value)
            .execute(&mut *conn)
            .await
            .with_context(|| format!("Failed to store {} for equipment {}", key, id))?;
        Ok(())
    }

    /// Load the extra data rows for every item in one query
    async fn attach_data(conn: &mut SqliteConnection, items: &mut [Equipment]) -> Result<()> {
        if items.is_empty() {
            return Ok(());
        }
        let sql = format!(
            "SELECT equipment_id, key, value FROM equipment_data WHERE equipment_id IN ({})",
            placeholders(items.len())
        );
        let mut query = sqlx::query(&sql);
        for item in items.iter() {
            query = query.bind(item.id);
        }
        let rows = query.fetch_all(&mut *conn).await?;

        let mut by_id: HashMap<i64, Vec<(String, String)>> = HashMap::new();
        for row in &rows {
            by_id
                .entry(row.get("equipment_id"))
                .or_default()
                .push((row.get("key"), row.get("value")));
        }
        for item in items.iter_mut() {
            if let Some(pairs) = by_id.remove(&item.id) {
                item.extra_data.extend(pairs);
            }
        }
        Ok(())
    }
}
