use std::collections::HashMap;

use rusqlite::params;

use crate::db::DbPool;
use crate::models::audit::AuditEntry;
use crate::models::board::{Board, BoardForm};
use crate::models::board_post::{BoardPost, BoardPostForm};
use crate::models::board_template::{BoardTemplate, TemplateDraft, TemplateFilter};
use crate::models::category::Category;
use crate::models::settings::Setting;
use crate::models::skin::BoardSkin;
use crate::models::user::{AdminFilter, AdminForm, User};

use super::Store;

/// SQLite-backed implementation of the Store trait.
/// Wraps the r2d2 connection pool and delegates to model methods.
pub struct SqliteStore {
    pub pool: DbPool,
}

impl SqliteStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

impl Store for SqliteStore {
    // ── Lifecycle ───────────────────────────────────────────────────

    fn run_migrations(&self) -> Result<(), String> {
        crate::db::run_migrations(&self.pool).map_err(|e| e.to_string())
    }

    fn seed_defaults(&self) -> Result<(), String> {
        crate::db::seed_defaults(&self.pool).map_err(|e| e.to_string())
    }

    // ── Settings ────────────────────────────────────────────────────

    fn setting_get(&self, key: &str) -> Option<String> {
        Setting::get(&self.pool, key)
    }

    fn setting_set(&self, key: &str, value: &str) -> Result<(), String> {
        Setting::set(&self.pool, key, value)
    }

    fn setting_all(&self) -> HashMap<String, String> {
        Setting::all(&self.pool)
    }

    // ── Users ───────────────────────────────────────────────────────

    fn user_get_by_id(&self, id: i64) -> Option<User> {
        User::get_by_id(&self.pool, id)
    }

    fn user_get_by_login(&self, ident: &str) -> Option<User> {
        User::get_by_login(&self.pool, ident)
    }

    fn user_list_filtered(&self, filter: &AdminFilter, limit: i64, offset: i64) -> Vec<User> {
        User::list_filtered(&self.pool, filter, limit, offset)
    }

    fn user_count_filtered(&self, filter: &AdminFilter) -> i64 {
        User::count_filtered(&self.pool, filter)
    }

    fn user_count_by_role(&self, role: &str) -> i64 {
        User::count_by_role(&self.pool, role)
    }

    fn user_create(&self, form: &AdminForm, password_hash: &str) -> Result<i64, String> {
        User::create(&self.pool, form, password_hash)
    }

    fn user_update(&self, id: i64, form: &AdminForm) -> Result<(), String> {
        User::update(&self.pool, id, form)
    }

    fn user_update_password(&self, id: i64, password_hash: &str) -> Result<(), String> {
        User::update_password(&self.pool, id, password_hash)
    }

    fn user_touch_last_login(&self, id: i64) -> Result<(), String> {
        User::touch_last_login(&self.pool, id)
    }

    fn user_delete(&self, id: i64) -> Result<(), String> {
        User::delete(&self.pool, id)
    }

    // ── Sessions ────────────────────────────────────────────────────

    fn session_create(
        &self,
        user_id: i64,
        session_id: &str,
        expires_at: &str,
        ip_hash: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO sessions (id, user_id, expires_at, ip_hash, user_agent)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            params![session_id, user_id, expires_at, ip_hash, user_agent],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn session_get_user(&self, session_id: &str) -> Option<User> {
        let conn = self.pool.get().ok()?;
        let user_id: i64 = conn
            .query_row(
                "SELECT user_id FROM sessions WHERE id = ?1 AND expires_at > datetime('now')",
                params![session_id],
                |row| row.get(0),
            )
            .ok()?;
        drop(conn);
        User::get_by_id(&self.pool, user_id)
    }

    fn session_delete(&self, session_id: &str) -> Result<(), String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![session_id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn session_delete_for_user(&self, user_id: i64) -> Result<(), String> {
        let conn = self.pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }

    fn session_cleanup_expired(&self) -> usize {
        match self.pool.get() {
            Ok(conn) => conn
                .execute("DELETE FROM sessions WHERE expires_at <= datetime('now')", [])
                .unwrap_or(0),
            Err(_) => 0,
        }
    }

    // ── Skins ───────────────────────────────────────────────────────

    fn skin_find_by_id(&self, id: i64) -> Option<BoardSkin> {
        BoardSkin::find_by_id(&self.pool, id)
    }

    fn skin_list(&self) -> Vec<BoardSkin> {
        BoardSkin::list(&self.pool, false)
    }

    fn skin_list_active(&self) -> Vec<BoardSkin> {
        BoardSkin::list(&self.pool, true)
    }

    // ── Board templates ─────────────────────────────────────────────

    fn template_find_by_id(&self, id: i64) -> Option<BoardTemplate> {
        BoardTemplate::find_by_id(&self.pool, id)
    }

    fn template_list(&self, filter: &TemplateFilter, limit: i64, offset: i64) -> Vec<BoardTemplate> {
        BoardTemplate::list_filtered(&self.pool, filter, limit, offset)
    }

    fn template_count(&self, filter: &TemplateFilter) -> i64 {
        BoardTemplate::count_filtered(&self.pool, filter)
    }

    fn template_list_active(&self) -> Vec<BoardTemplate> {
        BoardTemplate::list_active(&self.pool)
    }

    fn template_create(&self, draft: &TemplateDraft, is_system: bool) -> Result<i64, String> {
        BoardTemplate::create(&self.pool, draft, is_system)
    }

    fn template_update(&self, id: i64, draft: &TemplateDraft) -> Result<(), String> {
        BoardTemplate::update(&self.pool, id, draft)
    }

    fn template_set_active(&self, id: i64, active: bool) -> Result<(), String> {
        BoardTemplate::set_active(&self.pool, id, active)
    }

    fn template_delete(&self, id: i64) -> Result<bool, String> {
        BoardTemplate::delete_unused(&self.pool, id)
    }

    fn template_count_boards(&self, id: i64) -> i64 {
        BoardTemplate::count_boards(&self.pool, id)
    }

    // ── Categories ──────────────────────────────────────────────────

    fn category_groups(&self) -> Vec<String> {
        Category::groups(&self.pool)
    }

    // ── Boards ──────────────────────────────────────────────────────

    fn board_find_by_id(&self, id: i64) -> Option<Board> {
        Board::find_by_id(&self.pool, id)
    }

    fn board_list(&self) -> Vec<Board> {
        Board::list(&self.pool)
    }

    fn board_count(&self) -> i64 {
        Board::count(&self.pool)
    }

    fn board_create(&self, form: &BoardForm) -> Result<i64, String> {
        Board::create(&self.pool, form)
    }

    fn board_delete(&self, id: i64) -> Result<(), String> {
        Board::delete(&self.pool, id)
    }

    // ── Board posts ─────────────────────────────────────────────────

    fn post_find_by_id(&self, id: i64) -> Option<BoardPost> {
        BoardPost::find_by_id(&self.pool, id)
    }

    fn post_list_for_board(&self, board_id: i64, limit: i64, offset: i64) -> Vec<BoardPost> {
        BoardPost::list_for_board(&self.pool, board_id, limit, offset)
    }

    fn post_count(&self, board_id: Option<i64>) -> i64 {
        BoardPost::count_for_board(&self.pool, board_id)
    }

    fn post_create(&self, form: &BoardPostForm) -> Result<i64, String> {
        BoardPost::create(&self.pool, form)
    }

    fn post_delete_many(&self, board_id: i64, ids: &[i64]) -> Result<usize, String> {
        BoardPost::delete_many(&self.pool, board_id, ids)
    }

    // ── Audit ───────────────────────────────────────────────────────

    fn audit_log(
        &self,
        user_id: Option<i64>,
        user_name: Option<&str>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        entity_title: Option<&str>,
        details: Option<&str>,
    ) {
        AuditEntry::log(
            &self.pool,
            user_id,
            user_name,
            action,
            entity_type,
            entity_id,
            entity_title,
            details,
        )
    }

    fn audit_recent(&self, limit: i64) -> Vec<AuditEntry> {
        AuditEntry::recent(&self.pool, limit)
    }
}
