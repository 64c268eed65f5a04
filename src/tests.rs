#![cfg(test)]

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;
use std::time::Duration;

use crate::board_templates::input::RawInput;
use crate::board_templates::lifecycle::{self, DeleteBlock, COPY_SUFFIX};
use crate::board_templates::post_rules::prepare_post;
use crate::board_templates::TemplateError;
use crate::db::{run_migrations, seed_defaults, DbPool};
use crate::models::board::BoardForm;
use crate::models::board_template::{Permission, StandardField, TemplateFilter};
use crate::models::settings::Setting;
use crate::models::user::{AdminFilter, AdminForm};
use crate::rate_limit::RateLimiter;
use crate::security::auth;
use crate::store::sqlite::SqliteStore;
use crate::store::Store;

/// Atomic counter for unique shared-cache DB names so parallel tests don't collide.
static TEST_DB_COUNTER: std::sync::atomic::AtomicU64 = std::sync::atomic::AtomicU64::new(0);

/// Fresh in-memory SQLite pool with migrations and seed data applied.
/// A named shared-cache DB lets every pooled connection see the same data.
/// A super admin with a cheap bcrypt hash is inserted first so seeding skips
/// the DEFAULT_COST hash (slow in debug builds).
fn test_pool() -> DbPool {
    let id = TEST_DB_COUNTER.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    let uri = format!("file:backoffice_test_{}?mode=memory&cache=shared", id);
    let manager = SqliteConnectionManager::file(uri)
        .with_init(|c| c.execute_batch("PRAGMA foreign_keys=ON;"));
    let pool = Pool::builder()
        .max_size(4)
        .build(manager)
        .expect("Failed to create test pool");
    run_migrations(&pool).expect("Failed to run migrations");
    {
        let conn = pool.get().unwrap();
        conn.execute(
            "INSERT INTO users (login_id, role, name, email, password_hash)
             VALUES ('root', 'super_admin', 'Root', 'root@example.com', ?1)",
            rusqlite::params![fast_hash("rootpass1")],
        )
        .unwrap();
    }
    seed_defaults(&pool).expect("Failed to seed defaults");
    pool
}

fn test_store() -> SqliteStore {
    SqliteStore::new(test_pool())
}

/// Fast bcrypt hash for tests (cost=4 instead of DEFAULT_COST=12).
fn fast_hash(password: &str) -> String {
    bcrypt::hash(password, 4).unwrap()
}

/// Minimal valid template form: title and content on, skin 1.
fn template_input(name: &str) -> RawInput {
    RawInput::new()
        .with("name", name)
        .with("skin_id", "1")
        .with("field_title_enabled", "1")
        .with("field_title_required", "1")
        .with("field_content_enabled", "1")
        .with("field_content_required", "1")
}

fn system_template_id(store: &dyn Store) -> i64 {
    let filter = TemplateFilter {
        is_system: Some(true),
        ..Default::default()
    };
    store.template_list(&filter, 1, 0)[0].id
}

fn make_board(store: &dyn Store, template_id: i64, slug: &str) -> i64 {
    store
        .board_create(&BoardForm {
            template_id,
            name: slug.to_string(),
            slug: slug.to_string(),
            is_active: true,
        })
        .unwrap()
}

// ═══════════════════════════════════════════════════════════
// Seeding
// ═══════════════════════════════════════════════════════════

#[test]
fn seed_creates_skins_and_system_templates() {
    let store = test_store();
    assert_eq!(store.skin_list().len(), 3);

    let filter = TemplateFilter {
        is_system: Some(true),
        ..Default::default()
    };
    let system = store.template_list(&filter, 100, 0);
    assert_eq!(system.len(), 3);
    for t in &system {
        assert_eq!(t.field_config.len(), 9);
        assert!(t.field_config.is_enabled(StandardField::Title));
        assert!(t.field_config.is_enabled(StandardField::Content));
    }
    assert_eq!(store.category_groups(), vec!["faq".to_string(), "notice".to_string()]);
}

#[test]
fn seed_is_idempotent() {
    let pool = test_pool();
    seed_defaults(&pool).unwrap();
    let store = SqliteStore::new(pool);
    assert_eq!(store.template_count(&TemplateFilter::default()), 3);
    assert_eq!(store.skin_list().len(), 3);
    // pre-inserted root stays the only account
    assert_eq!(store.user_count_filtered(&AdminFilter::default()), 1);
}

#[test]
fn settings_defaults_and_upsert() {
    let pool = test_pool();
    assert_eq!(Setting::get_or(&pool, "admin_slug", "x"), "backoffice");
    Setting::set(&pool, "templates_per_page", "50").unwrap();
    let store = SqliteStore::new(pool);
    assert_eq!(store.setting_get_i64("templates_per_page"), 50);
    assert_eq!(store.setting_get_i64("missing"), 0);
}

// ═══════════════════════════════════════════════════════════
// Template lifecycle: create
// ═══════════════════════════════════════════════════════════

#[test]
fn create_builds_both_configs() {
    let store = test_store();
    let input = RawInput::new()
        .with("name", "QnA")
        .with("skin_id", "3")
        .with("field_title_enabled", "1")
        .with("field_content_enabled", "1")
        .with("field_author_name_enabled", "1")
        .with("field_author_name_label", "Writer")
        .with("permission_write", "all")
        .with("list_count", "20")
        .with_custom_field(&[("name", "phone"), ("label", "Phone"), ("type", "text"), ("max_length", "20")])
        .with_custom_field(&[("name", ""), ("label", "Dropped"), ("type", "text")]);

    let t = lifecycle::create(&store, &input).unwrap();

    assert!(!t.is_system);
    assert!(t.is_active);
    assert_eq!(t.skin_id, 3);
    assert_eq!(t.list_count, 20);
    assert_eq!(t.permission_read, Permission::All);
    assert_eq!(t.permission_write, Permission::All);
    assert_eq!(t.permission_comment, Permission::Member);
    assert_eq!(t.field_config.len(), 9);
    assert_eq!(t.field_config.get(StandardField::AuthorName).unwrap().label, "Writer");
    assert!(!t.field_config.is_required(StandardField::Title));
    assert!(!t.field_config.is_enabled(StandardField::Password));
    assert_eq!(t.field_config.get(StandardField::Password).unwrap().label, "비밀번호");

    let custom = t.custom_fields_config.unwrap();
    assert_eq!(custom.len(), 1);
    assert_eq!(custom[0].name, "phone");
    assert_eq!(custom[0].max_length, Some(20));
}

#[test]
fn create_without_custom_rows_stores_none() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Plain")).unwrap();
    assert!(t.custom_fields_config.is_none());

    let all_invalid = template_input("Invalid rows")
        .with_custom_field(&[("name", "x"), ("label", ""), ("type", "text")]);
    let t = lifecycle::create(&store, &all_invalid).unwrap();
    assert!(t.custom_fields_config.is_none());
}

#[test]
fn create_rejects_missing_content_and_persists_nothing() {
    let store = test_store();
    let before = store.template_count(&TemplateFilter::default());
    let input = RawInput::new()
        .with("name", "Broken")
        .with("skin_id", "1")
        .with("field_title_enabled", "1");

    match lifecycle::create(&store, &input) {
        Err(TemplateError::Invalid(errors)) => {
            assert!(errors.iter().any(|e| e.contains("Title and content")));
        }
        other => panic!("expected validation error, got {:?}", other),
    }
    assert_eq!(store.template_count(&TemplateFilter::default()), before);
}

#[test]
fn create_rejects_unknown_skin() {
    let store = test_store();
    let input = template_input("Skinless").with("skin_id", "99");
    let err = lifecycle::create(&store, &input).unwrap_err();
    assert!(err.messages()[0].contains("skin"));
}

// ═══════════════════════════════════════════════════════════
// Template lifecycle: update
// ═══════════════════════════════════════════════════════════

#[test]
fn update_user_template_rewrites_everything() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Before")).unwrap();

    let input = template_input("After")
        .with("skin_id", "2")
        .with("is_active", "0")
        .with("enable_notice", "1")
        .with("field_thumbnail_enabled", "1");
    lifecycle::update(&store, &t, &input).unwrap();

    let after = store.template_find_by_id(t.id).unwrap();
    assert_eq!(after.name, "After");
    assert_eq!(after.skin_id, 2);
    assert!(!after.is_active);
    assert!(after.enable_notice);
    assert!(after.field_config.is_enabled(StandardField::Thumbnail));
    assert!(!after.is_system);
}

#[test]
fn update_rejects_disabling_title() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Keep")).unwrap();

    let input = RawInput::new()
        .with("name", "Renamed")
        .with("skin_id", "1")
        .with("field_content_enabled", "1");
    assert!(lifecycle::update(&store, &t, &input).is_err());
    assert_eq!(store.template_find_by_id(t.id).unwrap().name, "Keep");
}

#[test]
fn update_system_template_only_touches_is_active() {
    let store = test_store();
    let id = system_template_id(&store);
    let original = store.template_find_by_id(id).unwrap();

    let input = RawInput::new()
        .with("name", "Hijacked")
        .with("skin_id", "2")
        .with("is_active", "0")
        .with("field_title_enabled", "0");
    lifecycle::update(&store, &original, &input).unwrap();

    let after = store.template_find_by_id(id).unwrap();
    assert!(!after.is_active);
    assert!(after.is_system);
    assert_eq!(after.name, original.name);
    assert_eq!(after.skin_id, original.skin_id);
    assert_eq!(after.field_config, original.field_config);
}

#[test]
fn update_system_template_without_flag_keeps_state() {
    let store = test_store();
    let id = system_template_id(&store);
    let original = store.template_find_by_id(id).unwrap();

    lifecycle::update(&store, &original, &RawInput::new().with("name", "x")).unwrap();
    assert_eq!(store.template_find_by_id(id).unwrap().is_active, original.is_active);
}

// ═══════════════════════════════════════════════════════════
// Template lifecycle: delete / duplicate
// ═══════════════════════════════════════════════════════════

#[test]
fn delete_refuses_system_template() {
    let store = test_store();
    let t = store.template_find_by_id(system_template_id(&store)).unwrap();

    assert_eq!(lifecycle::deletion_block(&store, &t), Some(DeleteBlock::System));
    assert!(!lifecycle::delete(&store, &t));
    assert!(store.template_find_by_id(t.id).is_some());
}

#[test]
fn delete_refuses_template_in_use() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Used")).unwrap();
    make_board(&store, t.id, "free");
    make_board(&store, t.id, "qna");

    assert_eq!(lifecycle::deletion_block(&store, &t), Some(DeleteBlock::InUse(2)));
    assert!(!lifecycle::delete(&store, &t));
    assert!(store.template_find_by_id(t.id).is_some());
}

#[test]
fn delete_removes_unused_template() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Unused")).unwrap();

    assert_eq!(lifecycle::deletion_block(&store, &t), None);
    assert!(lifecycle::delete(&store, &t));
    assert!(store.template_find_by_id(t.id).is_none());
}

#[test]
fn duplicate_copies_configuration_as_user_template() {
    let store = test_store();
    let source = store.template_find_by_id(system_template_id(&store)).unwrap();

    let copy = lifecycle::duplicate(&store, &source).unwrap();
    assert_ne!(copy.id, source.id);
    assert_eq!(copy.name, format!("{}{}", source.name, COPY_SUFFIX));
    assert!(!copy.is_system);
    assert_eq!(copy.field_config, source.field_config);
    assert_eq!(copy.custom_fields_config, source.custom_fields_config);
    assert_eq!(copy.skin_id, source.skin_id);
    assert_eq!(copy.permission_write, source.permission_write);

    // the copy is an ordinary template and can go away again
    assert!(lifecycle::delete(&store, &copy));
}

// ═══════════════════════════════════════════════════════════
// Template listing
// ═══════════════════════════════════════════════════════════

#[test]
fn list_puts_system_first_then_newest() {
    let store = test_store();
    let a = lifecycle::create(&store, &template_input("Alpha")).unwrap();
    let b = lifecycle::create(&store, &template_input("Beta")).unwrap();

    let all = store.template_list(&TemplateFilter::default(), 100, 0);
    assert_eq!(all.len(), 5);
    assert!(all[..3].iter().all(|t| t.is_system));
    assert_eq!(all[3].id, b.id);
    assert_eq!(all[4].id, a.id);
}

#[test]
fn list_filters_combine() {
    let store = test_store();
    lifecycle::create(&store, &template_input("Event board").with("skin_id", "2")).unwrap();
    lifecycle::create(&store, &template_input("Event archive").with("is_active", "0")).unwrap();

    let by_name = TemplateFilter {
        name: Some("Event".to_string()),
        ..Default::default()
    };
    assert_eq!(store.template_count(&by_name), 2);

    let active_events = TemplateFilter {
        is_active: Some(true),
        ..by_name.clone()
    };
    assert_eq!(store.template_count(&active_events), 1);

    let skin_two_user = TemplateFilter {
        skin_id: Some(2),
        is_system: Some(false),
        ..Default::default()
    };
    let found = store.template_list(&skin_two_user, 10, 0);
    assert_eq!(found.len(), 1);
    assert_eq!(found[0].name, "Event board");

    // paging
    let page = store.template_list(&TemplateFilter::default(), 2, 4);
    assert_eq!(page.len(), 1);
}

#[test]
fn list_active_skips_inactive() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Hidden").with("is_active", "0")).unwrap();
    assert!(store.template_list_active().iter().all(|a| a.id != t.id));
}

// ═══════════════════════════════════════════════════════════
// Boards and posts
// ═══════════════════════════════════════════════════════════

#[test]
fn board_reports_template_and_post_count() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Board tpl")).unwrap();
    let board_id = make_board(&store, t.id, "news");

    let input = RawInput::new().with("title", "Hello").with("content", "World");
    let form = prepare_post(&t, board_id, &input).unwrap();
    store.post_create(&form).unwrap();

    let board = store.board_find_by_id(board_id).unwrap();
    assert_eq!(board.template_name, "Board tpl");
    assert_eq!(board.post_count, 1);
    assert_eq!(store.board_count(), 1);
}

#[test]
fn duplicate_board_slug_is_rejected() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Slugs")).unwrap();
    make_board(&store, t.id, "same");
    let again = store.board_create(&BoardForm {
        template_id: t.id,
        name: "Same".to_string(),
        slug: "same".to_string(),
        is_active: true,
    });
    assert!(again.is_err());
}

#[test]
fn prepare_post_follows_field_config() {
    let store = test_store();
    let input = template_input("Rules")
        .with("enable_notice", "1")
        .with("field_author_name_enabled", "1")
        .with("field_author_name_required", "1")
        .with_custom_field(&[
            ("name", "grade"),
            ("label", "Grade"),
            ("type", "select"),
            ("options", "A,B,C"),
            ("required", "1"),
        ]);
    let t = lifecycle::create(&store, &input).unwrap();

    // missing author and custom value
    let errors = prepare_post(&t, 1, &RawInput::new().with("title", "t").with("content", "c")).unwrap_err();
    assert_eq!(errors.len(), 2);

    // option outside the list
    let bad = RawInput::new()
        .with("title", "t")
        .with("content", "c")
        .with("author_name", "kim")
        .with("custom[grade]", "Z");
    assert!(prepare_post(&t, 1, &bad).is_err());

    let good = RawInput::new()
        .with("title", "t")
        .with("content", "c")
        .with("author_name", "kim")
        .with("is_notice", "1")
        .with("is_secret", "1")
        .with("custom[grade]", "B");
    let form = prepare_post(&t, 1, &good).unwrap();
    assert!(form.is_notice);
    // secret field is not enabled on this template
    assert!(!form.is_secret);
    assert_eq!(form.author_name.as_deref(), Some("kim"));
    assert_eq!(form.custom_fields.get("grade").map(String::as_str), Some("B"));
}

#[test]
fn prepare_post_enforces_max_length() {
    let store = test_store();
    let input = template_input("Lengths")
        .with_custom_field(&[("name", "code"), ("label", "Code"), ("type", "text"), ("max_length", "3")]);
    let t = lifecycle::create(&store, &input).unwrap();

    let base = RawInput::new().with("title", "t").with("content", "c");
    assert!(prepare_post(&t, 1, &base.clone().with("custom[code]", "가나다")).is_ok());
    assert!(prepare_post(&t, 1, &base.with("custom[code]", "ABCD")).is_err());
}

#[test]
fn bulk_delete_only_touches_the_given_board() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Bulk")).unwrap();
    let first = make_board(&store, t.id, "first");
    let second = make_board(&store, t.id, "second");

    let post = |board_id: i64, title: &str| {
        let input = RawInput::new().with("title", title).with("content", "body");
        store.post_create(&prepare_post(&t, board_id, &input).unwrap()).unwrap()
    };
    let a = post(first, "a");
    let b = post(first, "b");
    let c = post(first, "c");
    let other = post(second, "other");

    let removed = store.post_delete_many(first, &[a, b, other, 9999]).unwrap();
    assert_eq!(removed, 2);
    assert_eq!(store.post_count(Some(first)), 1);
    assert_eq!(store.post_count(Some(second)), 1);
    assert_eq!(store.post_count(None), 2);
    assert!(store.post_find_by_id(c).is_some());
    assert!(store.post_find_by_id(other).is_some());
}

#[test]
fn notices_are_listed_first() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Notices").with("enable_notice", "1")).unwrap();
    let board_id = make_board(&store, t.id, "notices");

    let notice = RawInput::new().with("title", "pinned").with("content", "x").with("is_notice", "1");
    store.post_create(&prepare_post(&t, board_id, &notice).unwrap()).unwrap();
    let plain = RawInput::new().with("title", "latest").with("content", "x");
    store.post_create(&prepare_post(&t, board_id, &plain).unwrap()).unwrap();

    let posts = store.post_list_for_board(board_id, 10, 0);
    assert_eq!(posts[0].title, "pinned");
    assert_eq!(posts[1].title, "latest");
}

#[test]
fn deleting_board_cascades_posts() {
    let store = test_store();
    let t = lifecycle::create(&store, &template_input("Cascade")).unwrap();
    let board_id = make_board(&store, t.id, "gone");
    let input = RawInput::new().with("title", "t").with("content", "c");
    store.post_create(&prepare_post(&t, board_id, &input).unwrap()).unwrap();

    store.board_delete(board_id).unwrap();
    assert_eq!(store.post_count(None), 0);
    // template is free again
    assert!(lifecycle::delete(&store, &t));
}

// ═══════════════════════════════════════════════════════════
// Admins
// ═══════════════════════════════════════════════════════════

fn admin_form(login: &str, role: &str, active: bool) -> AdminForm {
    AdminForm {
        login_id: login.to_string(),
        name: format!("{} name", login),
        email: format!("{}@example.com", login),
        role: role.to_string(),
        is_active: active,
        department: None,
        position: None,
        contact: None,
    }
}

#[test]
fn admin_filters_exclude_members() {
    let store = test_store();
    store.user_create(&admin_form("editor1", "admin", true), &fast_hash("password1")).unwrap();
    store.user_create(&admin_form("staff1", "manager", false), &fast_hash("password1")).unwrap();
    store.user_create(&admin_form("member1", "user", true), &fast_hash("password1")).unwrap();

    assert_eq!(store.user_count_filtered(&AdminFilter::default()), 3);

    let managers = AdminFilter {
        role: Some("manager".to_string()),
        ..Default::default()
    };
    assert_eq!(store.user_list_filtered(&managers, 10, 0)[0].login_id.as_deref(), Some("staff1"));

    let inactive = AdminFilter {
        is_active: Some(false),
        ..Default::default()
    };
    assert_eq!(store.user_count_filtered(&inactive), 1);

    let keyword = AdminFilter {
        keyword: Some("editor".to_string()),
        ..Default::default()
    };
    assert_eq!(store.user_count_filtered(&keyword), 1);

    let members = AdminFilter {
        keyword: Some("member1".to_string()),
        ..Default::default()
    };
    assert_eq!(store.user_count_filtered(&members), 0);
}

#[test]
fn admin_login_lookup_and_password_change() {
    let store = test_store();
    let id = store.user_create(&admin_form("kim", "manager", true), &fast_hash("oldpassword")).unwrap();

    let by_login = store.user_get_by_login("kim").unwrap();
    let by_email = store.user_get_by_login("kim@example.com").unwrap();
    assert_eq!(by_login.id, id);
    assert_eq!(by_email.id, id);
    assert!(auth::verify_password("oldpassword", &by_login.password_hash));

    store.user_update_password(id, &fast_hash("newpassword")).unwrap();
    let user = store.user_get_by_id(id).unwrap();
    assert!(auth::verify_password("newpassword", &user.password_hash));
    assert!(!auth::verify_password("oldpassword", &user.password_hash));

    let json = user.safe_json();
    assert!(json.get("password_hash").is_none());
}

#[test]
fn duplicate_admin_email_is_rejected() {
    let store = test_store();
    store.user_create(&admin_form("lee", "admin", true), "x").unwrap();
    let mut clash = admin_form("lee2", "admin", true);
    clash.email = "lee@example.com".to_string();
    assert!(store.user_create(&clash, "x").is_err());
}

// ═══════════════════════════════════════════════════════════
// Sessions, rate limiting, audit
// ═══════════════════════════════════════════════════════════

#[test]
fn session_roundtrip_and_revocation() {
    let store = test_store();
    let id = store.user_create(&admin_form("park", "manager", true), "x").unwrap();

    let sid = auth::create_session(&store, id, Some("127.0.0.1"), None).unwrap();
    assert_eq!(store.session_get_user(&sid).unwrap().id, id);

    store.session_delete_for_user(id).unwrap();
    assert!(store.session_get_user(&sid).is_none());
}

#[test]
fn expired_sessions_are_ignored_and_cleaned() {
    let store = test_store();
    let id = store.user_create(&admin_form("choi", "manager", true), "x").unwrap();
    store
        .session_create(id, "stale", "2000-01-01 00:00:00", None, None)
        .unwrap();

    assert!(store.session_get_user("stale").is_none());
    assert_eq!(store.session_cleanup_expired(), 1);
}

#[test]
fn deleting_admin_drops_sessions() {
    let store = test_store();
    let id = store.user_create(&admin_form("han", "manager", true), "x").unwrap();
    let sid = auth::create_session(&store, id, None, None).unwrap();
    store.user_delete(id).unwrap();
    assert!(store.session_get_user(&sid).is_none());
}

#[test]
fn ip_hash_is_stable_hex() {
    let a = auth::hash_ip("10.0.0.1");
    assert_eq!(a, auth::hash_ip("10.0.0.1"));
    assert_ne!(a, auth::hash_ip("10.0.0.2"));
    assert_eq!(a.len(), 64);
}

#[test]
fn rate_limiter_blocks_after_max_and_resets() {
    let limiter = RateLimiter::new();
    let window = Duration::from_secs(60);
    for _ in 0..3 {
        assert!(limiter.check_and_record("login:a", 3, window));
    }
    assert!(!limiter.check_and_record("login:a", 3, window));
    assert!(limiter.check_and_record("login:b", 3, window));

    limiter.reset("login:a");
    assert!(limiter.check_and_record("login:a", 3, window));
}

#[test]
fn rate_limiter_window_expires() {
    let limiter = RateLimiter::new();
    let window = Duration::from_millis(20);
    assert!(limiter.check_and_record("k", 1, window));
    assert!(!limiter.check_and_record("k", 1, window));
    std::thread::sleep(Duration::from_millis(40));
    assert!(limiter.check_and_record("k", 1, window));
}

#[test]
fn audit_log_records_newest_first() {
    let store = test_store();
    store.audit_log(Some(1), Some("Root"), "create", Some("board_template"), Some(7), Some("A"), None);
    store.audit_log(Some(1), Some("Root"), "delete", Some("board_template"), Some(7), Some("A"), None);

    let recent = store.audit_recent(10);
    assert_eq!(recent.len(), 2);
    assert_eq!(recent[0].action, "delete");
    assert_eq!(recent[1].entity_id, Some(7));
}
