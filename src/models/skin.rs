use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::DbPool;

#[derive(Debug, Serialize, Clone)]
pub struct BoardSkin {
    pub id: i64,
    pub name: String,
    pub directory: String,
    pub description: Option<String>,
    pub is_active: bool,
}

impl BoardSkin {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(BoardSkin {
            id: row.get("id")?,
            name: row.get("name")?,
            directory: row.get("directory")?,
            description: row.get("description")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM board_skins WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool, active_only: bool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let sql = if active_only {
            "SELECT * FROM board_skins WHERE is_active = 1 ORDER BY id"
        } else {
            "SELECT * FROM board_skins ORDER BY id"
        };
        let mut stmt = match conn.prepare(sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }
}
