use std::sync::Arc;

use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::json;

use crate::models::board_template::TemplateFilter;
use crate::models::user::AdminFilter;
use crate::security::auth::ManagerUser;
use crate::store::Store;
use crate::AdminSlug;

#[get("/")]
pub fn dashboard(admin: ManagerUser, store: &State<Arc<dyn Store>>, slug: &State<AdminSlug>) -> Template {
    let system_only = TemplateFilter {
        is_system: Some(true),
        ..TemplateFilter::default()
    };
    let context = json!({
        "page_title": "Dashboard",
        "admin_slug": slug.0,
        "current_user": admin.user.safe_json(),
        "template_count": store.template_count(&TemplateFilter::default()),
        "system_template_count": store.template_count(&system_only),
        "board_count": store.board_count(),
        "post_count": store.post_count(None),
        "admin_count": store.user_count_filtered(&AdminFilter::default()),
        "recent_activity": store.audit_recent(10),
        "settings": store.setting_all(),
    });
    Template::render("admin/dashboard", &context)
}
