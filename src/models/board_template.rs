use std::collections::BTreeMap;

use chrono::NaiveDateTime;
use rusqlite::types::Type;
use rusqlite::{params, Row};
use serde::{Deserialize, Serialize};

use crate::db::DbPool;

// ── Field configuration ────────────────────────────────

/// The closed set of standard post fields a template can switch on or off.
/// Declaration order is display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StandardField {
    Title,
    Content,
    Category,
    AuthorName,
    Password,
    Attachments,
    Thumbnail,
    IsSecret,
    CreatedAt,
}

impl StandardField {
    pub fn as_str(&self) -> &'static str {
        match self {
            StandardField::Title => "title",
            StandardField::Content => "content",
            StandardField::Category => "category",
            StandardField::AuthorName => "author_name",
            StandardField::Password => "password",
            StandardField::Attachments => "attachments",
            StandardField::Thumbnail => "thumbnail",
            StandardField::IsSecret => "is_secret",
            StandardField::CreatedAt => "created_at",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldSetting {
    pub enabled: bool,
    pub required: bool,
    pub label: String,
}

/// Per-field settings keyed by field, stored as a JSON object on the template row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FieldConfig(BTreeMap<StandardField, FieldSetting>);

impl FieldConfig {
    pub fn insert(&mut self, field: StandardField, setting: FieldSetting) {
        self.0.insert(field, setting);
    }

    pub fn get(&self, field: StandardField) -> Option<&FieldSetting> {
        self.0.get(&field)
    }

    pub fn is_enabled(&self, field: StandardField) -> bool {
        self.get(field).map(|s| s.enabled).unwrap_or(false)
    }

    pub fn is_required(&self, field: StandardField) -> bool {
        self.get(field).map(|s| s.enabled && s.required).unwrap_or(false)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&StandardField, &FieldSetting)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// An admin-defined extra input on posts of boards using the template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomFieldSpec {
    pub name: String,
    pub label: String,
    #[serde(rename = "type")]
    pub field_type: String,
    pub max_length: Option<u32>,
    pub required: bool,
    pub options: Option<String>,
    pub placeholder: Option<String>,
}

impl CustomFieldSpec {
    /// Comma separated `options`, trimmed, empties removed.
    pub fn option_list(&self) -> Vec<&str> {
        self.options
            .as_deref()
            .map(|o| o.split(',').map(str::trim).filter(|s| !s.is_empty()).collect())
            .unwrap_or_default()
    }
}

// ── Permissions ────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    All,
    Member,
    Admin,
}

impl Permission {
    pub fn as_str(&self) -> &'static str {
        match self {
            Permission::All => "all",
            Permission::Member => "member",
            Permission::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "all" => Some(Permission::All),
            "member" => Some(Permission::Member),
            "admin" => Some(Permission::Admin),
            _ => None,
        }
    }
}

// ── Template ───────────────────────────────────────────

/// System templates ship with the backoffice; only their activation can change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateKind {
    System,
    User,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct BoardTemplate {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub skin_id: i64,
    pub is_system: bool,
    pub is_active: bool,
    pub field_config: FieldConfig,
    pub custom_fields_config: Option<Vec<CustomFieldSpec>>,
    pub category_group: Option<String>,
    pub enable_notice: bool,
    pub enable_sorting: bool,
    pub enable_category: bool,
    pub list_count: i64,
    pub permission_read: Permission,
    pub permission_write: Permission,
    pub permission_comment: Permission,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
}

/// Everything a full save writes. `is_system` is chosen at insert time only.
#[derive(Debug, Clone, PartialEq)]
pub struct TemplateDraft {
    pub name: String,
    pub description: Option<String>,
    pub skin_id: i64,
    pub is_active: bool,
    pub field_config: FieldConfig,
    pub custom_fields_config: Option<Vec<CustomFieldSpec>>,
    pub category_group: Option<String>,
    pub enable_notice: bool,
    pub enable_sorting: bool,
    pub enable_category: bool,
    pub list_count: i64,
    pub permission_read: Permission,
    pub permission_write: Permission,
    pub permission_comment: Permission,
}

pub const DEFAULT_LIST_COUNT: i64 = 15;

impl Default for TemplateDraft {
    fn default() -> Self {
        TemplateDraft {
            name: String::new(),
            description: None,
            skin_id: 0,
            is_active: true,
            field_config: FieldConfig::default(),
            custom_fields_config: None,
            category_group: None,
            enable_notice: false,
            enable_sorting: false,
            enable_category: false,
            list_count: DEFAULT_LIST_COUNT,
            permission_read: Permission::All,
            permission_write: Permission::Member,
            permission_comment: Permission::Member,
        }
    }
}

impl From<&BoardTemplate> for TemplateDraft {
    fn from(t: &BoardTemplate) -> Self {
        TemplateDraft {
            name: t.name.clone(),
            description: t.description.clone(),
            skin_id: t.skin_id,
            is_active: t.is_active,
            field_config: t.field_config.clone(),
            custom_fields_config: t.custom_fields_config.clone(),
            category_group: t.category_group.clone(),
            enable_notice: t.enable_notice,
            enable_sorting: t.enable_sorting,
            enable_category: t.enable_category,
            list_count: t.list_count,
            permission_read: t.permission_read,
            permission_write: t.permission_write,
            permission_comment: t.permission_comment,
        }
    }
}

/// List filters from the template index page. `None` means "any".
#[derive(Debug, Clone, Default)]
pub struct TemplateFilter {
    pub name: Option<String>,
    pub is_active: Option<bool>,
    pub skin_id: Option<i64>,
    pub is_system: Option<bool>,
}

fn json_column<T: serde::de::DeserializeOwned>(row: &Row, col: &str) -> rusqlite::Result<T> {
    let raw: String = row.get(col)?;
    let idx = row.as_ref().column_index(col)?;
    serde_json::from_str(&raw)
        .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
}

fn permission_column(row: &Row, col: &str) -> rusqlite::Result<Permission> {
    let raw: String = row.get(col)?;
    let idx = row.as_ref().column_index(col)?;
    Permission::parse(&raw).ok_or_else(|| {
        rusqlite::Error::FromSqlConversionFailure(
            idx,
            Type::Text,
            format!("unknown permission '{}'", raw).into(),
        )
    })
}

fn to_json<T: Serialize>(value: &T) -> Result<String, String> {
    serde_json::to_string(value).map_err(|e| e.to_string())
}

impl BoardTemplate {
    pub fn kind(&self) -> TemplateKind {
        if self.is_system {
            TemplateKind::System
        } else {
            TemplateKind::User
        }
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let custom_raw: Option<String> = row.get("custom_fields_config")?;
        let custom_fields_config = match custom_raw {
            Some(raw) if !raw.is_empty() => {
                let idx = row.as_ref().column_index("custom_fields_config")?;
                serde_json::from_str(&raw).map_err(|e| {
                    rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e))
                })?
            }
            _ => None,
        };
        Ok(BoardTemplate {
            id: row.get("id")?,
            name: row.get("name")?,
            description: row.get("description")?,
            skin_id: row.get("skin_id")?,
            is_system: row.get::<_, i64>("is_system")? != 0,
            is_active: row.get::<_, i64>("is_active")? != 0,
            field_config: json_column(row, "field_config")?,
            custom_fields_config,
            category_group: row.get("category_group")?,
            enable_notice: row.get::<_, i64>("enable_notice")? != 0,
            enable_sorting: row.get::<_, i64>("enable_sorting")? != 0,
            enable_category: row.get::<_, i64>("enable_category")? != 0,
            list_count: row.get("list_count")?,
            permission_read: permission_column(row, "permission_read")?,
            permission_write: permission_column(row, "permission_write")?,
            permission_comment: permission_column(row, "permission_comment")?,
            created_at: row.get("created_at")?,
            updated_at: row.get("updated_at")?,
        })
    }

    pub fn find_by_id(pool: &DbPool, id: i64) -> Option<Self> {
        let conn = pool.get().ok()?;
        conn.query_row(
            "SELECT * FROM board_templates WHERE id = ?1",
            params![id],
            Self::from_row,
        )
        .ok()
    }

    fn filter_sql(filter: &TemplateFilter) -> (String, Vec<Box<dyn rusqlite::types::ToSql>>) {
        let mut sql = String::from(" WHERE 1=1");
        let mut params_vec: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

        if let Some(ref name) = filter.name {
            params_vec.push(Box::new(format!("%{}%", name)));
            sql.push_str(&format!(" AND name LIKE ?{}", params_vec.len()));
        }
        if let Some(active) = filter.is_active {
            params_vec.push(Box::new(active as i64));
            sql.push_str(&format!(" AND is_active = ?{}", params_vec.len()));
        }
        if let Some(skin_id) = filter.skin_id {
            params_vec.push(Box::new(skin_id));
            sql.push_str(&format!(" AND skin_id = ?{}", params_vec.len()));
        }
        if let Some(system) = filter.is_system {
            params_vec.push(Box::new(system as i64));
            sql.push_str(&format!(" AND is_system = ?{}", params_vec.len()));
        }
        (sql, params_vec)
    }

    /// System templates first, then newest first.
    pub fn list_filtered(pool: &DbPool, filter: &TemplateFilter, limit: i64, offset: i64) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let (where_sql, mut params_vec) = Self::filter_sql(filter);
        let idx = params_vec.len();
        let sql = format!(
            "SELECT * FROM board_templates{} ORDER BY is_system DESC, id DESC LIMIT ?{} OFFSET ?{}",
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
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        stmt.query_map(param_refs.as_slice(), Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn count_filtered(pool: &DbPool, filter: &TemplateFilter) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        let (where_sql, params_vec) = Self::filter_sql(filter);
        let param_refs: Vec<&dyn rusqlite::types::ToSql> = params_vec.iter().map(|p| p.as_ref()).collect();
        conn.query_row(
            &format!("SELECT COUNT(*) FROM board_templates{}", where_sql),
            param_refs.as_slice(),
            |row| row.get(0),
        )
        .unwrap_or(0)
    }

    /// Active templates for board creation: system first, then by name.
    pub fn list_active(pool: &DbPool) -> Vec<Self> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(
            "SELECT * FROM board_templates WHERE is_active = 1 ORDER BY is_system DESC, name ASC",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], Self::from_row)
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }

    pub fn create(pool: &DbPool, draft: &TemplateDraft, is_system: bool) -> Result<i64, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let field_config = to_json(&draft.field_config)?;
        let custom_fields = match draft.custom_fields_config {
            Some(ref c) => Some(to_json(c)?),
            None => None,
        };
        conn.execute(
            "INSERT INTO board_templates (name, description, skin_id, is_system, is_active,
                field_config, custom_fields_config, category_group,
                enable_notice, enable_sorting, enable_category, list_count,
                permission_read, permission_write, permission_comment)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
            params![
                draft.name,
                draft.description,
                draft.skin_id,
                is_system,
                draft.is_active,
                field_config,
                custom_fields,
                draft.category_group,
                draft.enable_notice,
                draft.enable_sorting,
                draft.enable_category,
                draft.list_count,
                draft.permission_read.as_str(),
                draft.permission_write.as_str(),
                draft.permission_comment.as_str(),
            ],
        )
        .map_err(|e| e.to_string())?;
        Ok(conn.last_insert_rowid())
    }

    /// Full rewrite of a non-system template. System rows are never matched.
    pub fn update(pool: &DbPool, id: i64, draft: &TemplateDraft) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let field_config = to_json(&draft.field_config)?;
        let custom_fields = match draft.custom_fields_config {
            Some(ref c) => Some(to_json(c)?),
            None => None,
        };
        let changed = conn
            .execute(
                "UPDATE board_templates SET name = ?1, description = ?2, skin_id = ?3, is_active = ?4,
                    field_config = ?5, custom_fields_config = ?6, category_group = ?7,
                    enable_notice = ?8, enable_sorting = ?9, enable_category = ?10, list_count = ?11,
                    permission_read = ?12, permission_write = ?13, permission_comment = ?14,
                    updated_at = CURRENT_TIMESTAMP
                 WHERE id = ?15 AND is_system = 0",
                params![
                    draft.name,
                    draft.description,
                    draft.skin_id,
                    draft.is_active,
                    field_config,
                    custom_fields,
                    draft.category_group,
                    draft.enable_notice,
                    draft.enable_sorting,
                    draft.enable_category,
                    draft.list_count,
                    draft.permission_read.as_str(),
                    draft.permission_write.as_str(),
                    draft.permission_comment.as_str(),
                    id,
                ],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Err("Template not found or not editable".to_string());
        }
        Ok(())
    }

    pub fn set_active(pool: &DbPool, id: i64, active: bool) -> Result<(), String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let changed = conn
            .execute(
                "UPDATE board_templates SET is_active = ?1, updated_at = CURRENT_TIMESTAMP WHERE id = ?2",
                params![active, id],
            )
            .map_err(|e| e.to_string())?;
        if changed == 0 {
            return Err("Template not found".to_string());
        }
        Ok(())
    }

    /// Deletes a non-system template no board uses. Returns whether a row went away.
    pub fn delete_unused(pool: &DbPool, id: i64) -> Result<bool, String> {
        let conn = pool.get().map_err(|e| e.to_string())?;
        let removed = conn
            .execute(
                "DELETE FROM board_templates
                 WHERE id = ?1 AND is_system = 0
                   AND NOT EXISTS (SELECT 1 FROM boards WHERE template_id = ?1)",
                params![id],
            )
            .map_err(|e| e.to_string())?;
        Ok(removed > 0)
    }

    pub fn count_boards(pool: &DbPool, id: i64) -> i64 {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return 0,
        };
        conn.query_row(
            "SELECT COUNT(*) FROM boards WHERE template_id = ?1",
            params![id],
            |row| row.get(0),
        )
        .unwrap_or(0)
    }
}
