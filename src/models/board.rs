use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::DbPool;

#[derive(Debug, Serialize, Clone)]
pub struct Board {
    pub id: i64,
    pub template_id: i64,
    pub template_name: String,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
    pub post_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone)]
pub struct BoardForm {
    pub template_id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: bool,
}

const SELECT_SQL: &str = "SELECT b.*, t.name AS template_name,
        (SELECT COUNT(*) FROM board_posts p WHERE p.board_id = b.id) AS post_count
     FROM boards b JOIN board_templates t ON t.id = b.template_id";

impl Board {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Board {
            id: row.get("id")?,
            template_id: row.get("template_id")?,
            template_name: row.get("template_name")?,
            name: row.get("name")?,
            slug: row.get("slug")?,
            is_active: row.get::<_, i64>("is_active")? != 0,
            post_count: row.get("post_count")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("{} WHERE b.id = ?1", SELECT_SQL),
            params![id],
            Self::from_row,
        )
        .ok()
    }

    pub fn list(pool: &DbPool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(&format!("{} ORDER BY b.id DESC", SELECT_SQL)) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count(pool: &DbPool) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row("SELECT COUNT(*) FROM boards", [], |row| row.get(0))
            .unwrap_or(0)
    }

    pub fn create(pool: &DbPool, form: &BoardForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO boards (template_id, name, slug, is_active) VALUES (?1, ?2, ?3, ?4)",
            params![form.template_id, form.name, form.slug, form.is_active],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    /// Removes the board and, through the foreign key cascade, its posts.
    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM boards WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
