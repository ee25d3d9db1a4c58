use anyhow::{Context, Result};
use chrono::Utc;
use sqlx::SqliteConnection;

use crate::models::*;

use super::row_helpers::map_room_row;

const SELECT_ROOM: &str = "SELECT id, name, kind, description, floor, created_at FROM rooms";

/// Room database operations
pub struct RoomRepo;

impl RoomRepo {
    pub async fn create(conn: &mut SqliteConnection, req: &CreateRoomRequest) -> Result<Room> {
        let now = Utc::now();
        let result = sqlx::query(
            "INSERT INTO rooms (name, kind, description, floor, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(req.name.trim())
        .bind(&req.kind)
        .bind(&req.description)
        .bind(req.floor)
        .bind(now)
        .execute(&mut *conn)
        .await
        .context("Failed to insert room")?;

        Self::get(conn, result.last_insert_rowid())
            .await?
            .context("Room not found after creation")
    }

    pub async fn get(conn: &mut SqliteConnection, id: i64) -> Result<Option<Room>> {
        let row = sqlx::query(&format!("{} WHERE id = ?", SELECT_ROOM))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
        Ok(row.as_ref().map(map_room_row))
    }

    pub async fn list(conn: &mut SqliteConnection) -> Result<Vec<Room>> {
        let rows = sqlx::query(&format!("{} ORDER BY id", SELECT_ROOM))
            .fetch_all(&mut *conn)
            .await?;
        Ok(rows.iter().map(map_room_row).collect())
    }

    pub async fn update(conn: &mut SqliteConnection, room: &Room) -> Result<()> {
        sqlx::query("UPDATE rooms SET name = ?, kind = ?, description = ?, floor = ? WHERE id = ?")
            .bind(&room.name)
            .bind(&room.kind)
            .bind(&room.description)
            .bind(room.floor)
            .bind(room.id)
            .execute(&mut *conn)
            .await
            .context("Failed to update room")?;
        Ok(())
    }

    pub async fn delete(conn: &mut SqliteConnection, id: i64) -> Result<()> {
        sqlx::query("DELETE FROM rooms WHERE id = ?")
            .bind(id)
            .execute(&mut *conn)
            .await?;
        Ok(())
    }
}
