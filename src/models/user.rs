use rusqlite::params;
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

pub const ROLES: [&str; 4] = ["super_admin", "admin", "manager", "user"];
pub const ADMIN_ROLES: [&str; 3] = ["super_admin", "admin", "manager"];

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct User {
    pub id: i64,
    pub login_id: Option<String>,
    pub role: String, // super_admin, admin, manager, user
    pub is_active: bool,
    pub last_login_at: Option<String>,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub department: Option<String>,
    pub position: Option<String>,
    pub contact: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Profile fields written by the admin create/edit forms.
#[derive(Debug, Clone)]
pub struct AdminForm {
    pub login_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub department: Option<String>,
    pub position: Option<String>,
    pub contact: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct AdminFilter {
    pub keyword: Option<String>,
    pub role: Option<String>,
    pub is_active: Option<bool>,
}

impl User {
    fn from_row(row: &rusqlite::Row) -> rusqlite::Result<Self> {
        let active: i64 = row.get(3)?;
        Ok(User {
            id: row.get(0)?,
            login_id: row.get(1)?,
            role: row.get(2)?,
            is_active: active != 0,
            last_login_at: row.get(4)?,
            name: row.get(5)?,
            email: row.get(6)?,
            password_hash: row.get(7)?,
            department: row.get(8)?,
            position: row.get(9)?,
            contact: row.get(10)?,
            created_at: row.get(11)?,
            updated_at: row.get(12)?,
        })
    }

    const SELECT_COLS: &'static str =
        "id, login_id, role, is_active, last_login_at, name, email, password_hash, department, position, contact, created_at, updated_at";

    // ── Role helpers ──

    pub fn is_super_admin(&self) -> bool {
        self.role == "super_admin"
    }

    pub fn is_admin(&self) -> bool {
        self.role == "super_admin" || self.role == "admin"
    }

    pub fn is_backoffice_user(&self) -> bool {
        ADMIN_ROLES.contains(&self.role.as_str())
    }

    /// Serializable view without the password hash.
    pub fn safe_json(&self) -> serde_json::Value {
        serde_json::json!({
            "id": self.id,
            "login_id": self.login_id,
            "role": self.role,
            "is_active": self.is_active,
            "last_login_at": self.last_login_at,
            "name": self.name,
            "email": self.email,
            "department": self.department,
            "position": self.position,
            "contact": self.contact,
            "created_at": self.created_at,
            "updated_at": self.updated_at,
        })
    }

    // ── Lookups ──

    pub fn get_by_id(pool: &DbPool, id: i64) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!("SELECT {} FROM users WHERE id = ?1", Self::SELECT_COLS),
            params![id],
            Self::from_row,
        )
        .ok()
    }

    /// Matches either the login id or the email address.
    pub fn get_by_login(pool: &DbPool, ident: &str) -> Option<User> {
        let conn = pool.get().ok()?;
        conn.query_row(
            &format!(
                "SELECT {} FROM users WHERE login_id = ?1 OR email = ?1 LIMIT 1",
                Self::SELECT_COLS
            ),
            params![ident],
            Self::from_row,
        )
        .ok()
    }

    fn filter_sql(filter: &AdminFilter) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut sql = String::from(" WHERE role != 'user'");
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref kw) = filter.keyword {
            params_vec.push(Box::new(format!("%{}%", kw)));
            let idx = params_vec.len();
            sql.push_str(&format!(
                " AND (name LIKE ?{0} OR email LIKE ?{0} OR login_id LIKE ?{0})",
                idx
            ));
        }
        if let Some(ref role) = filter.role {
            params_vec.push(Box::new(role.clone()));
            sql.push_str(&format!(" AND role = ?{}", params_vec.len()));
        }
        if let Some(active) = filter.is_active {
            params_vec.push(Box::new(active as i64));
            sql.push_str(&format!(" AND is_active = ?{}", params_vec.len()));
        }
        (sql, params_vec)
    }

    pub fn list_filtered(pool: &DbPool, filter: &AdminFilter, limit: i64, offset: i64) -> Vec<User> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let (where_sql, mut params_vec) = Self::filter_sql(filter);
        let idx = params_vec.len();
        let sql = format!(
            "SELECT {} FROM users{} ORDER BY id DESC LIMIT ?{} OFFSET ?{}",
            Self::SELECT_COLS,
            where_sql,
            idx + 1,
            idx + 2
        );
        params_vec.push(Box::new(limit));
        params_vec.push(Box::new(offset));
        let mut stmt = match conn.prepare(&sql) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        stmt.query_map(params_refs.as_slice(), Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count_filtered(pool: &DbPool, filter: &AdminFilter) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        let (where_sql, params_vec) = Self::filter_sql(filter);
        let params_refs: Vec<&dyn rusqlite::types::ToSql> =
            params_vec.iter().map(|p| p.as_ref()).collect();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM users{}", where_sql),
            params_refs.as_slice(),
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    pub fn count_by_role(pool: &DbPool, role: &str) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM users WHERE role = ?1",
            params![role],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    // ── Mutations ──

    pub fn create(pool: &DbPool, form: &AdminForm, password_hash: &str) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "INSERT INTO users (login_id, role, is_active, name, email, password_hash, department, position, contact)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                form.login_id,
                form.role,
                form.is_active,
                form.name,
                form.email,
                password_hash,
                form.department,
                form.position,
                form.contact
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    pub fn update(pool: &DbPool, id: i64, form: &AdminForm) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET login_id = ?1, role = ?2, is_active = ?3, name = ?4, email = ?5,
                department = ?6, position = ?7, contact = ?8, updated_at = CURRENT_TIMESTAMP
             WHERE id = ?9",
            params![
                form.login_id,
                form.role,
                form.is_active,
                form.name,
                form.email,
                form.department,
                form.position,
                form.contact,
                id
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn update_password(pool: &DbPool, id: i64, password_hash: &str) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET password_hash = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
            params![password_hash, id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn touch_last_login(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute(
            "UPDATE users SET last_login_at = CURRENT_TIMESTAMP WHERE id = ?1",
            params![id],
        )
        .map_err(|e| e.to_string())?;
        Ok(())
    }

    pub fn delete(pool: &DbPool, id: i64) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        conn.execute("DELETE FROM users WHERE id = ?1", params![id])
            .map_err(|e| e.to_string())?;
        Ok(())
    }
}
