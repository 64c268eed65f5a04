use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rusqlite::{params, Row};
use serde::Serialize;

use crate::db::DbPool;

#[derive(Debug, Serialize, Clone)]
pub struct BoardPost {
    pub id: i64,
    pub board_id: i64,
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub is_notice: bool,
    pub is_secret: bool,
    pub custom_fields: BTreeMap<String, String>,
    pub view_count: i64,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BoardPostForm {
    pub board_id: i64,
    pub title: String,
    pub content: String,
    pub author_name: Option<String>,
    pub is_notice: bool,
    pub is_secret: bool,
    pub custom_fields: BTreeMap<String, String>,
}

impl BoardPost {
    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let custom: Option<String> = row.get("custom_fields")?;
        Ok(BoardPost {
            id: row.get("id")?,
            board_id: row.get("board_id")?,
            title: row.get("title")?,
            content: row.get("content")?,
            author_name: row.get("author_name")?,
            is_notice: row.get::<_, i64>("is_notice")? != 0,
            is_secret: row.get::<_, i64>("is_secret")? != 0,
            custom_fields: custom
                .and_then(|c| serde_json::from_str(&c).ok())
                .unwrap_or_default(),
            view_count: row.get("view_count")?,
            created_at: row.get("created_at")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM board_posts WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .ok()
    }

    /// Notices first, then newest first.
    pub fn list_for_board(pool: &DbPool, board_id: i64, limit: i64, offset: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(
            "SELECT * FROM board_posts WHERE board_id = ?1
             ORDER BY is_notice DESC, id DESC LIMIT ?2 OFFSET ?3",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map(params![board_id, limit, offset], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count_for_board(pool: &DbPool, board_id: Option<i64>) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        match board_id {
            Some(id) => conn
                .query_row(
                    "SELECT COUNT(*) FROM board_posts WHERE board_id = ?1",
                    params![id],
                    |row| row.get(0),
                )
                .unwrap_or(0),
            None => conn
                .query_row("SELECT COUNT(*) FROM board_posts", [], |row| row.get(0))
                .unwrap_or(0),
        }
    }

    pub fn create(pool: &DbPool, form: &BoardPostForm) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let custom = if form.custom_fields.is_empty() {
            None
        } else {
            Some(serde_json::to_string(&form.custom_fields).map_err(|e| e.to_string())?)
        };
        conn.execute(
            "INSERT INTO board_posts (board_id, title, content, author_name, is_notice, is_secret, custom_fields)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                form.board_id,
                form.title,
                form.content,
                form.author_name,
                form.is_notice,
                form.is_secret,
                custom
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    /// Deletes the listed posts that belong to `board_id` in one transaction.
    /// Ids from other boards are skipped. Returns how many were removed.
    pub fn delete_many(pool: &DbPool, board_id: i64, ids: &[i64]) -> Result<usize, String> {
        let mut conn = pool.get().map_err(|e| e.to_string())?;
        let tx = conn.transaction().map_err(|e| e.to_string())?;
        let mut removed = 0;
        {
            let mut stmt = tx
                .prepare("DELETE FROM board_posts WHERE board_id = ?1 AND id = ?2")
                .map_err(|e| e.to_string())?;
            for id in ids {
                removed += stmt.execute(params![board_id, id]).map_err(|e| e.to_string())?;
            }
        }
        tx.commit().map_err(|e| e.to_string())?;
        Ok(removed)
    }
}
