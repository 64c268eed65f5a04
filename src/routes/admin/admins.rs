use std::sync::Arc;

use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

use super::{admin_base, flag_param, opt_flag, opt_text, page_offset, total_pages};
use crate::models::user::{AdminFilter, AdminForm, User, ADMIN_ROLES};
use crate::security::auth::{self, AdminUser};
use crate::store::Store;
use crate::AdminSlug;

const MIN_PASSWORD_LEN: usize = 8;

// ── Admins Management ─────────────────────────────────────────

#[get("/admins?<keyword>&<role>&<is_active>&<page>")]
#[allow(clippy::too_many_arguments)]
pub fn admins_list(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    keyword: Option<String>,
    role: Option<String>,
    is_active: Option<String>,
    page: Option<i64>,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    let per_page = store.setting_get_i64("admins_per_page").max(1);
    let (current_page, offset) = page_offset(page, per_page);

    let filter = AdminFilter {
        keyword: opt_text(keyword),
        role: opt_text(role).filter(|r| ADMIN_ROLES.contains(&r.as_str())),
        is_active: opt_flag(is_active.as_deref()),
    };
    let admins: Vec<Value> = store
        .user_list_filtered(&filter, per_page, offset)
        .iter()
        .map(User::safe_json)
        .collect();
    let total = store.user_count_filtered(&filter);

    let mut context = json!({
        "page_title": "Admins",
        "admin_slug": slug.0,
        "admins": admins,
        "current_user": admin.user.safe_json(),
        "roles": ADMIN_ROLES,
        "filter": {
            "keyword": filter.keyword.clone().unwrap_or_default(),
            "role": filter.role.clone().unwrap_or_default(),
            "is_active": flag_param(filter.is_active),
        },
        "current_page": current_page,
        "total_pages": total_pages(total, per_page),
        "total": total,
        "settings": store.setting_all(),
    });
    if let Some(ref f) = flash {
        context["flash_kind"] = json!(f.kind());
        context["flash_msg"] = json!(f.message());
    }
    Template::render("admin/admins/list", &context)
}

#[derive(FromForm)]
pub struct AdminFormData {
    pub login_id: String,
    pub name: String,
    pub email: String,
    pub role: String,
    pub is_active: bool,
    pub password: Option<String>,
    pub password_confirmation: Option<String>,
    pub department: Option<String>,
    pub position: Option<String>,
    pub contact: Option<String>,
}

impl AdminFormData {
    fn to_admin_form(&self) -> AdminForm {
        AdminForm {
            login_id: self.login_id.trim().to_string(),
            name: self.name.trim().to_string(),
            email: self.email.trim().to_string(),
            role: self.role.trim().to_string(),
            is_active: self.is_active,
            department: opt_text(self.department.clone()),
            position: opt_text(self.position.clone()),
            contact: opt_text(self.contact.clone()),
        }
    }

    fn password(&self) -> Option<&str> {
        self.password.as_deref().filter(|p| !p.is_empty())
    }
}

/// Form-level checks shared by create and update. `existing_id` excludes the
/// account being edited from the uniqueness checks.
fn validate_admin(
    store: &dyn Store,
    form: &AdminForm,
    data: &AdminFormData,
    existing_id: Option<i64>,
) -> Vec<String> {
    let mut errors = Vec::new();

    if form.login_id.is_empty() {
        errors.push("Login ID is required.".to_string());
    }
    if form.name.is_empty() {
        errors.push("Name is required.".to_string());
    }
    if form.email.is_empty() || !form.email.contains('@') {
        errors.push("A valid email is required.".to_string());
    }
    if !ADMIN_ROLES.contains(&form.role.as_str()) {
        errors.push("Invalid role.".to_string());
    }

    for ident in [&form.login_id, &form.email] {
        if ident.is_empty() {
            continue;
        }
        if let Some(other) = store.user_get_by_login(ident) {
            if Some(other.id) != existing_id {
                errors.push(format!("'{}' is already in use.", ident));
            }
        }
    }

    match (data.password(), existing_id) {
        (None, None) => errors.push("Password is required.".to_string()),
        (Some(pw), _) => {
            if pw.chars().count() < MIN_PASSWORD_LEN {
                errors.push(format!(
                    "Password must be at least {} characters.",
                    MIN_PASSWORD_LEN
                ));
            }
            if data.password_confirmation.as_deref() != Some(pw) {
                errors.push("Password confirmation does not match.".to_string());
            }
        }
        (None, Some(_)) => {}
    }
    errors
}

fn render_form(
    store: &dyn Store,
    slug: &AdminSlug,
    admin: Value,
    is_new: bool,
    errors: &[String],
) -> Template {
    let context = json!({
        "page_title": if is_new { "New admin" } else { "Edit admin" },
        "admin_slug": slug.0,
        "admin": admin,
        "is_new": is_new,
        "roles": ADMIN_ROLES,
        "errors": errors,
        "settings": store.setting_all(),
    });
    Template::render("admin/admins/form", &context)
}

fn form_json(form: &AdminForm, id: Option<i64>) -> Value {
    json!({
        "id": id,
        "login_id": form.login_id,
        "name": form.name,
        "email": form.email,
        "role": form.role,
        "is_active": form.is_active,
        "department": form.department,
        "position": form.position,
        "contact": form.contact,
    })
}

// ── Create ─────────────────────────────────────────────

#[get("/admins/new")]
pub fn admin_new(_admin: AdminUser, store: &State<Arc<dyn Store>>, slug: &State<AdminSlug>) -> Template {
    let blank = json!({"id": null, "role": "manager", "is_active": true});
    render_form(&**store.inner(), slug, blank, true, &[])
}

#[post("/admins/new", data = "<data>")]
pub fn admin_create(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    data: Form<AdminFormData>,
) -> Result<Flash<Redirect>, Template> {
    let s: &dyn Store = &**store.inner();
    let form = data.to_admin_form();
    let mut errors = validate_admin(s, &form, &data, None);

    if errors.is_empty() {
        let created = data
            .password()
            .ok_or_else(|| "Password is required.".to_string())
            .and_then(auth::hash_password)
            .and_then(|hash| s.user_create(&form, &hash));
        match created {
            Ok(id) => {
                s.audit_log(
                    Some(admin.user.id),
                    Some(&admin.user.name),
                    "create",
                    Some("admin"),
                    Some(id),
                    Some(&form.name),
                    Some(&form.role),
                );
                return Ok(Flash::success(
                    Redirect::to(format!("{}/admins", admin_base(slug))),
                    "관리자가 생성되었습니다.",
                ));
            }
            Err(e) => {
                log::warn!("Admin create failed: {}", e);
                errors.push("The admin could not be saved.".to_string());
            }
        }
    }
    Err(render_form(s, slug, form_json(&form, None), true, &errors))
}

// ── Show / Update ──────────────────────────────────────

#[get("/admins/<id>")]
pub fn admin_show(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
    flash: Option<FlashMessage<'_>>,
) -> Option<Template> {
    let user = store.user_get_by_id(id).filter(User::is_backoffice_user)?;
    let mut context = json!({
        "page_title": user.name,
        "admin_slug": slug.0,
        "admin": user.safe_json(),
        "is_self": user.id == admin.user.id,
        "settings": store.setting_all(),
    });
    if let Some(ref f) = flash {
        context["flash_kind"] = json!(f.kind());
        context["flash_msg"] = json!(f.message());
    }
    Some(Template::render("admin/admins/show", &context))
}

#[get("/admins/<id>/edit")]
pub fn admin_edit(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Option<Template> {
    let user = store.user_get_by_id(id).filter(User::is_backoffice_user)?;
    Some(render_form(&**store.inner(), slug, user.safe_json(), false, &[]))
}

#[post("/admins/<id>/edit", data = "<data>")]
pub fn admin_update(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
    data: Form<AdminFormData>,
) -> Result<Flash<Redirect>, Template> {
    let s: &dyn Store = &**store.inner();
    let list_url = format!("{}/admins", admin_base(slug));
    let existing = match s.user_get_by_id(id).filter(User::is_backoffice_user) {
        Some(u) => u,
        None => return Ok(Flash::error(Redirect::to(list_url), "Admin not found.")),
    };

    let form = data.to_admin_form();
    let mut errors = validate_admin(s, &form, &data, Some(id));

    // The last super admin keeps both the role and the active flag
    if existing.is_super_admin()
        && (form.role != "super_admin" || !form.is_active)
        && s.user_count_by_role("super_admin") <= 1
    {
        errors.push("The last super admin cannot be demoted or deactivated.".to_string());
    }
    if id == admin.user.id && !form.is_active {
        errors.push("You cannot deactivate your own account.".to_string());
    }

    if errors.is_empty() {
        let saved = s.user_update(id, &form).and_then(|_| match data.password() {
            Some(pw) => auth::hash_password(pw).and_then(|hash| s.user_update_password(id, &hash)),
            None => Ok(()),
        });
        match saved {
            Ok(()) => {
                if !form.is_active {
                    if let Err(e) = s.session_delete_for_user(id) {
                        log::warn!("Could not revoke sessions for admin {}: {}", id, e);
                    }
                }
                s.audit_log(
                    Some(admin.user.id),
                    Some(&admin.user.name),
                    "update",
                    Some("admin"),
                    Some(id),
                    Some(&form.name),
                    data.password().map(|_| "password changed"),
                );
                return Ok(Flash::success(
                    Redirect::to(format!("{}/{}", list_url, id)),
                    "관리자 정보가 수정되었습니다.",
                ));
            }
            Err(e) => {
                log::warn!("Admin update failed for {}: {}", id, e);
                errors.push("The admin could not be saved.".to_string());
            }
        }
    }
    Err(render_form(s, slug, form_json(&form, Some(id)), false, &errors))
}

// ── Delete ─────────────────────────────────────────────

#[post("/admins/<id>/delete")]
pub fn admin_delete(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let list_url = format!("{}/admins", admin_base(slug));
    let user = match store.user_get_by_id(id).filter(User::is_backoffice_user) {
        Some(u) => u,
        None => return Flash::error(Redirect::to(list_url), "Admin not found."),
    };

    if user.id == admin.user.id {
        return Flash::error(Redirect::to(list_url), "자기 자신은 삭제할 수 없습니다.");
    }
    if user.is_super_admin() && store.user_count_by_role("super_admin") <= 1 {
        return Flash::error(Redirect::to(list_url), "마지막 최고 관리자는 삭제할 수 없습니다.");
    }

    match store.user_delete(id) {
        Ok(()) => {
            store.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "delete",
                Some("admin"),
                Some(id),
                Some(&user.name),
                None,
            );
            Flash::success(Redirect::to(list_url), "관리자가 삭제되었습니다.")
        }
        Err(e) => {
            log::warn!("Admin delete failed for {}: {}", id, e);
            Flash::error(Redirect::to(list_url), "The admin could not be deleted.")
        }
    }
}
