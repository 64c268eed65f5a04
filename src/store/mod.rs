use std::collections::HashMap;

use crate::models::audit::AuditEntry;
use crate::models::board::{Board, BoardForm};
use crate::models::board_post::{BoardPost, BoardPostForm};
use crate::models::board_template::{BoardTemplate, TemplateDraft, TemplateFilter};
use crate::models::skin::BoardSkin;
use crate::models::user::{AdminFilter, AdminForm, User};

pub mod sqlite;

/// Unified data-access trait. Every database operation goes through here.
pub trait Store: Send + Sync {
    // ── Lifecycle ───────────────────────────────────────────────────
    fn run_migrations(&self) -> Result<(), String>;
    fn seed_defaults(&self) -> Result<(), String>;

    // ── Settings ────────────────────────────────────────────────────
    fn setting_get(&self, key: &str) -> Option<String>;
    fn setting_get_or(&self, key: &str, default: &str) -> String {
        self.setting_get(key).unwrap_or_else(|| default.to_string())
    }
    fn setting_get_i64(&self, key: &str) -> i64 {
        self.setting_get(key)
            .and_then(|v| v.parse().ok())
            .unwrap_or(0)
    }
    fn setting_set(&self, key: &str, value: &str) -> Result<(), String>;
    fn setting_all(&self) -> HashMap<String, String>;

    // ── Users ───────────────────────────────────────────────────────
    fn user_get_by_id(&self, id: i64) -> Option<User>;
    fn user_get_by_login(&self, ident: &str) -> Option<User>;
    fn user_list_filtered(&self, filter: &AdminFilter, limit: i64, offset: i64) -> Vec<User>;
    fn user_count_filtered(&self, filter: &AdminFilter) -> i64;
    fn user_count_by_role(&self, role: &str) -> i64;
    fn user_create(&self, form: &AdminForm, password_hash: &str) -> Result<i64, String>;
    fn user_update(&self, id: i64, form: &AdminForm) -> Result<(), String>;
    fn user_update_password(&self, id: i64, password_hash: &str) -> Result<(), String>;
    fn user_touch_last_login(&self, id: i64) -> Result<(), String>;
    fn user_delete(&self, id: i64) -> Result<(), String>;

    // ── Sessions ────────────────────────────────────────────────────
    fn session_create(
        &self,
        user_id: i64,
        session_id: &str,
        expires_at: &str,
        ip_hash: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(), String>;
    fn session_get_user(&self, session_id: &str) -> Option<User>;
    fn session_delete(&self, session_id: &str) -> Result<(), String>;
    fn session_delete_for_user(&self, user_id: i64) -> Result<(), String>;
    fn session_cleanup_expired(&self) -> usize;

    // ── Skins ───────────────────────────────────────────────────────
    fn skin_find_by_id(&self, id: i64) -> Option<BoardSkin>;
    fn skin_list(&self) -> Vec<BoardSkin>;
    fn skin_list_active(&self) -> Vec<BoardSkin>;

    // ── Board templates ─────────────────────────────────────────────
    fn template_find_by_id(&self, id: i64) -> Option<BoardTemplate>;
    fn template_list(&self, filter: &TemplateFilter, limit: i64, offset: i64) -> Vec<BoardTemplate>;
    fn template_count(&self, filter: &TemplateFilter) -> i64;
    fn template_list_active(&self) -> Vec<BoardTemplate>;
    fn template_create(&self, draft: &TemplateDraft, is_system: bool) -> Result<i64, String>;
    fn template_update(&self, id: i64, draft: &TemplateDraft) -> Result<(), String>;
    fn template_set_active(&self, id: i64, active: bool) -> Result<(), String>;
    fn template_delete(&self, id: i64) -> Result<bool, String>;
    fn template_count_boards(&self, id: i64) -> i64;

    // ── Categories ──────────────────────────────────────────────────
    fn category_groups(&self) -> Vec<String>;

    // ── Boards ──────────────────────────────────────────────────────
    fn board_find_by_id(&self, id: i64) -> Option<Board>;
    fn board_list(&self) -> Vec<Board>;
    fn board_count(&self) -> i64;
    fn board_create(&self, form: &BoardForm) -> Result<i64, String>;
    fn board_delete(&self, id: i64) -> Result<(), String>;

    // ── Board posts ─────────────────────────────────────────────────
    fn post_find_by_id(&self, id: i64) -> Option<BoardPost>;
    fn post_list_for_board(&self, board_id: i64, limit: i64, offset: i64) -> Vec<BoardPost>;
    fn post_count(&self, board_id: Option<i64>) -> i64;
    fn post_create(&self, form: &BoardPostForm) -> Result<i64, String>;
    fn post_delete_many(&self, board_id: i64, ids: &[i64]) -> Result<usize, String>;

    // ── Audit ───────────────────────────────────────────────────────
    #[allow(clippy::too_many_arguments)]
    fn audit_log(
        &self,
        user_id: Option<i64>,
        user_name: Option<&str>,
        action: &str,
        entity_type: Option<&str>,
        entity_id: Option<i64>,
        entity_title: Option<&str>,
        details: Option<&str>,
    );
    fn audit_recent(&self, limit: i64) -> Vec<AuditEntry>;
}
