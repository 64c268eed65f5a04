use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::params;

use crate::board_templates::builder;
use crate::board_templates::input::RawInput;
use crate::models::board_template::{BoardTemplate, Permission, TemplateDraft};

pub type DbPool = Pool<SqliteConnectionManager>;

pub const DEFAULT_DB_PATH: &str = "website/db/backoffice.db";

pub fn init_pool() -> Result<DbPool, Box<dyn std::error::Error>> {
    let path = std::env::var("BACKOFFICE_DB").unwrap_or_else(|_| DEFAULT_DB_PATH.to_string());
    init_pool_at(&path)
}

pub fn init_pool_at(path: &str) -> Result<DbPool, Box<dyn std::error::Error>> {
    let manager = SqliteConnectionManager::file(path)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON;"));
    let pool = Pool::builder().max_size(10).build(manager)?;

    let conn = pool.get()?;
    conn.execute_batch("PRAGMA journal_mode=WAL;")?;

    Ok(pool)
}

pub fn run_migrations(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    conn.execute_batch(
        "
        -- Key/value settings
        CREATE TABLE IF NOT EXISTS settings (
            key TEXT PRIMARY KEY,
            value TEXT
        );

        -- Backoffice accounts
        CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY,
            login_id TEXT UNIQUE,
            role TEXT NOT NULL DEFAULT 'user',
            is_active INTEGER NOT NULL DEFAULT 1,
            last_login_at DATETIME,
            name TEXT NOT NULL,
            email TEXT UNIQUE NOT NULL,
            password_hash TEXT NOT NULL,
            department TEXT,
            position TEXT,
            contact TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            user_id INTEGER NOT NULL,
            created_at DATETIME NOT NULL DEFAULT CURRENT_TIMESTAMP,
            expires_at DATETIME NOT NULL,
            ip_hash TEXT,
            user_agent TEXT,
            FOREIGN KEY (user_id) REFERENCES users(id) ON DELETE CASCADE
        );

        -- Display skins for boards
        CREATE TABLE IF NOT EXISTS board_skins (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            directory TEXT UNIQUE NOT NULL,
            description TEXT,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        -- Reusable board configurations
        CREATE TABLE IF NOT EXISTS board_templates (
            id INTEGER PRIMARY KEY,
            name TEXT NOT NULL,
            description TEXT,
            skin_id INTEGER NOT NULL,
            is_system INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1,
            field_config TEXT NOT NULL DEFAULT '{}',
            custom_fields_config TEXT,
            category_group TEXT,
            enable_notice INTEGER NOT NULL DEFAULT 0,
            enable_sorting INTEGER NOT NULL DEFAULT 0,
            enable_category INTEGER NOT NULL DEFAULT 0,
            list_count INTEGER NOT NULL DEFAULT 15,
            permission_read TEXT NOT NULL DEFAULT 'all',
            permission_write TEXT NOT NULL DEFAULT 'member',
            permission_comment TEXT NOT NULL DEFAULT 'member',
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            updated_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (skin_id) REFERENCES board_skins(id)
        );

        CREATE TABLE IF NOT EXISTS boards (
            id INTEGER PRIMARY KEY,
            template_id INTEGER NOT NULL,
            name TEXT NOT NULL,
            slug TEXT UNIQUE NOT NULL,
            is_active INTEGER NOT NULL DEFAULT 1,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (template_id) REFERENCES board_templates(id)
        );

        CREATE TABLE IF NOT EXISTS board_posts (
            id INTEGER PRIMARY KEY,
            board_id INTEGER NOT NULL,
            title TEXT NOT NULL,
            content TEXT NOT NULL,
            author_name TEXT,
            is_notice INTEGER NOT NULL DEFAULT 0,
            is_secret INTEGER NOT NULL DEFAULT 0,
            custom_fields TEXT,
            view_count INTEGER NOT NULL DEFAULT 0,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP,
            FOREIGN KEY (board_id) REFERENCES boards(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_board_posts_board ON board_posts(board_id);
        CREATE INDEX IF NOT EXISTS idx_boards_template ON boards(template_id);

        -- Categories, grouped; templates reference a group by name
        CREATE TABLE IF NOT EXISTS categories (
            id INTEGER PRIMARY KEY,
            group_name TEXT NOT NULL,
            name TEXT NOT NULL,
            sort_order INTEGER NOT NULL DEFAULT 0,
            is_active INTEGER NOT NULL DEFAULT 1
        );

        CREATE TABLE IF NOT EXISTS audit_log (
            id INTEGER PRIMARY KEY,
            user_id INTEGER,
            user_name TEXT,
            action TEXT NOT NULL,
            entity_type TEXT,
            entity_id INTEGER,
            entity_title TEXT,
            details TEXT,
            created_at DATETIME DEFAULT CURRENT_TIMESTAMP
        );

        CREATE INDEX IF NOT EXISTS idx_audit_created ON audit_log(created_at);
        ",
    )?;

    Ok(())
}

pub fn seed_defaults(pool: &DbPool) -> Result<(), Box<dyn std::error::Error>> {
    let conn = pool.get()?;

    let defaults = [
        ("site_name", "Board Backoffice"),
        ("admin_slug", "backoffice"),
        ("session_expiry_hours", "12"),
        ("login_rate_limit", "5"),
        ("templates_per_page", "10"),
        ("posts_per_page", "20"),
        ("admins_per_page", "20"),
    ];

    for (key, value) in defaults {
        conn.execute(
            "INSERT OR IGNORE INTO settings (key, value) VALUES (?1, ?2)",
            params![key, value],
        )?;
    }

    let skin_count: i64 = conn.query_row("SELECT COUNT(*) FROM board_skins", [], |row| row.get(0))?;
    if skin_count == 0 {
        let skins = [
            ("기본", "basic", "목록형 기본 스킨"),
            ("갤러리", "gallery", "썸네일 그리드 스킨"),
            ("FAQ", "faq", "질문/답변 아코디언 스킨"),
        ];
        for (name, dir, desc) in skins {
            conn.execute(
                "INSERT INTO board_skins (name, directory, description) VALUES (?1, ?2, ?3)",
                params![name, dir, desc],
            )?;
        }
    }

    let category_count: i64 = conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?;
    if category_count == 0 {
        let categories = [
            ("notice", "공지", 1),
            ("notice", "이벤트", 2),
            ("faq", "회원", 1),
            ("faq", "결제", 2),
        ];
        for (group, name, order) in categories {
            conn.execute(
                "INSERT INTO categories (group_name, name, sort_order) VALUES (?1, ?2, ?3)",
                params![group, name, order],
            )?;
        }
    }

    let system_count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM board_templates WHERE is_system = 1",
        [],
        |row| row.get(0),
    )?;
    // Release the connection; template creation takes its own
    drop(conn);

    if system_count == 0 {
        for draft in system_template_drafts() {
            BoardTemplate::create(pool, &draft, true)?;
        }
    }

    let conn = pool.get()?;
    let user_count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
    if user_count == 0 {
        // Default password: "admin1234", to be changed after first login
        let hash = bcrypt::hash("admin1234", bcrypt::DEFAULT_COST)?;
        conn.execute(
            "INSERT INTO users (login_id, role, name, email, password_hash)
             VALUES ('admin', 'super_admin', '최고관리자', 'admin@example.com', ?1)",
            params![hash],
        )?;
        log::warn!("Seeded default super admin 'admin'; change its password");
    }

    Ok(())
}

/// Built-in templates: a notice board, a gallery and an FAQ.
fn system_template_drafts() -> Vec<TemplateDraft> {
    let notice = RawInput::new()
        .with("field_title_enabled", "1")
        .with("field_title_required", "1")
        .with("field_content_enabled", "1")
        .with("field_content_required", "1")
        .with("field_author_name_enabled", "1")
        .with("field_attachments_enabled", "1")
        .with("field_created_at_enabled", "1");
    let gallery = RawInput::new()
        .with("field_title_enabled", "1")
        .with("field_title_required", "1")
        .with("field_content_enabled", "1")
        .with("field_thumbnail_enabled", "1")
        .with("field_thumbnail_required", "1")
        .with("field_created_at_enabled", "1");
    let faq = RawInput::new()
        .with("field_title_enabled", "1")
        .with("field_title_required", "1")
        .with("field_title_label", "질문")
        .with("field_content_enabled", "1")
        .with("field_content_required", "1")
        .with("field_content_label", "답변")
        .with("field_category_enabled", "1");

    vec![
        TemplateDraft {
            name: "공지사항".to_string(),
            description: Some("기본 공지사항 게시판".to_string()),
            skin_id: 1,
            field_config: builder::build_field_config(&notice),
            enable_notice: true,
            permission_write: Permission::Admin,
            ..TemplateDraft::default()
        },
        TemplateDraft {
            name: "갤러리".to_string(),
            description: Some("이미지 중심 게시판".to_string()),
            skin_id: 2,
            field_config: builder::build_field_config(&gallery),
            list_count: 12,
            ..TemplateDraft::default()
        },
        TemplateDraft {
            name: "FAQ".to_string(),
            description: Some("자주 묻는 질문".to_string()),
            skin_id: 3,
            field_config: builder::build_field_config(&faq),
            category_group: Some("faq".to_string()),
            enable_category: true,
            enable_sorting: true,
            permission_write: Permission::Admin,
            permission_comment: Permission::Admin,
            ..TemplateDraft::default()
        },
    ]
}
