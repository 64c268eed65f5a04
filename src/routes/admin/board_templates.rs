use std::sync::Arc;

use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::{json, Value};

use super::{admin_base, flag_param, opt_flag, opt_text, page_offset, total_pages};
use crate::board_templates::builder::{self, STANDARD_FIELDS};
use crate::board_templates::input::RawInput;
use crate::board_templates::lifecycle;
use crate::models::board_template::{BoardTemplate, FieldConfig, TemplateFilter};
use crate::security::auth::AdminUser;
use crate::store::Store;
use crate::AdminSlug;

const PER_PAGE_CHOICES: [i64; 4] = [10, 20, 50, 100];

fn field_rows(config: &FieldConfig) -> Vec<Value> {
    STANDARD_FIELDS
        .iter()
        .map(|keys| {
            let setting = config.get(keys.field);
            json!({
                "key": keys.field.as_str(),
                "default_label": keys.default_label,
                "label": setting.map(|s| s.label.as_str()).unwrap_or(keys.default_label),
                "enabled": setting.map(|s| s.enabled).unwrap_or(false),
                "required": setting.map(|s| s.required).unwrap_or(false),
            })
        })
        .collect()
}

fn template_form_json(t: &BoardTemplate) -> Value {
    json!({
        "id": t.id,
        "is_system": t.is_system,
        "name": t.name,
        "description": t.description,
        "skin_id": t.skin_id,
        "is_active": t.is_active,
        "category_group": t.category_group,
        "enable_notice": t.enable_notice,
        "enable_sorting": t.enable_sorting,
        "enable_category": t.enable_category,
        "list_count": t.list_count,
        "permission_read": t.permission_read.as_str(),
        "permission_write": t.permission_write.as_str(),
        "permission_comment": t.permission_comment.as_str(),
        "fields": field_rows(&t.field_config),
        "custom_fields": t.custom_fields_config.clone().unwrap_or_default(),
    })
}

/// Re-fill the form from rejected input.
fn input_form_json(input: &RawInput, existing: Option<&BoardTemplate>) -> Value {
    let skin_id: Option<i64> = input.get("skin_id").and_then(|s| s.parse().ok());
    json!({
        "id": existing.map(|t| t.id),
        "is_system": existing.map(|t| t.is_system).unwrap_or(false),
        "name": input.get("name").unwrap_or_default(),
        "description": input.get("description"),
        "skin_id": skin_id,
        "is_active": input.flag("is_active").unwrap_or(true),
        "category_group": input.get("category_group"),
        "enable_notice": input.is_set("enable_notice"),
        "enable_sorting": input.is_set("enable_sorting"),
        "enable_category": input.is_set("enable_category"),
        "list_count": input.get("list_count"),
        "permission_read": input.get("permission_read").unwrap_or("all"),
        "permission_write": input.get("permission_write").unwrap_or("member"),
        "permission_comment": input.get("permission_comment").unwrap_or("member"),
        "fields": field_rows(&builder::build_field_config(input)),
        "custom_fields": builder::build_custom_fields_config(input).unwrap_or_default(),
    })
}

fn render_form(store: &dyn Store, slug: &AdminSlug, form: Value, errors: &[String]) -> Template {
    let is_new = form["id"].is_null();
    let context = json!({
        "page_title": if is_new { "New board template" } else { "Edit board template" },
        "admin_slug": slug.0,
        "form": form,
        "errors": errors,
        "skins": store.skin_list_active(),
        "category_groups": store.category_groups(),
        "settings": store.setting_all(),
    });
    Template::render("admin/board_templates/form", &context)
}

// ── List ───────────────────────────────────────────────

#[get("/board-templates?<name>&<is_active>&<skin_id>&<is_system>&<per_page>&<page>")]
#[allow(clippy::too_many_arguments)]
pub fn templates_list(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    name: Option<String>,
    is_active: Option<String>,
    skin_id: Option<String>,
    is_system: Option<String>,
    per_page: Option<i64>,
    page: Option<i64>,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    let per_page = per_page
        .filter(|n| PER_PAGE_CHOICES.contains(n))
        .unwrap_or_else(|| store.setting_get_i64("templates_per_page"))
        .clamp(PER_PAGE_CHOICES[0], PER_PAGE_CHOICES[3]);
    let (current_page, offset) = page_offset(page, per_page);

    let filter = TemplateFilter {
        name: opt_text(name),
        is_active: opt_flag(is_active.as_deref()),
        skin_id: skin_id.as_deref().and_then(|s| s.trim().parse().ok()),
        is_system: opt_flag(is_system.as_deref()),
    };

    let skins = store.skin_list();
    let templates: Vec<Value> = store
        .template_list(&filter, per_page, offset)
        .iter()
        .map(|t| {
            json!({
                "id": t.id,
                "name": t.name,
                "description": t.description,
                "skin_name": skins.iter().find(|s| s.id == t.skin_id).map(|s| s.name.clone()),
                "is_system": t.is_system,
                "is_active": t.is_active,
                "board_count": store.template_count_boards(t.id),
                "custom_field_count": t.custom_fields_config.as_ref().map(Vec::len).unwrap_or(0),
                "created_at": t.created_at,
            })
        })
        .collect();
    let total = store.template_count(&filter);

    let mut context = json!({
        "page_title": "Board templates",
        "admin_slug": slug.0,
        "templates": templates,
        "skins": skins,
        "filter": {
            "name": filter.name.clone().unwrap_or_default(),
            "is_active": flag_param(filter.is_active),
            "skin_id": filter.skin_id.unwrap_or(0),
            "is_system": flag_param(filter.is_system),
        },
        "per_page": per_page,
        "per_page_choices": PER_PAGE_CHOICES,
        "current_page": current_page,
        "total_pages": total_pages(total, per_page),
        "total": total,
        "settings": store.setting_all(),
    });
    if let Some(ref f) = flash {
        context["flash_kind"] = json!(f.kind());
        context["flash_msg"] = json!(f.message());
    }
    Template::render("admin/board_templates/list", &context)
}

// ── Create ─────────────────────────────────────────────

#[get("/board-templates/new")]
pub fn template_new(_admin: AdminUser, store: &State<Arc<dyn Store>>, slug: &State<AdminSlug>) -> Template {
    let s: &dyn Store = &**store.inner();
    let form = input_form_json(
        &RawInput::new()
            .with("field_title_enabled", "1")
            .with("field_title_required", "1")
            .with("field_content_enabled", "1")
            .with("field_content_required", "1"),
        None,
    );
    render_form(s, slug, form, &[])
}

#[post("/board-templates", data = "<body>")]
pub fn template_create(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    body: String,
) -> Result<Flash<Redirect>, Template> {
    let s: &dyn Store = &**store.inner();
    let input = RawInput::from_urlencoded(&body);

    match lifecycle::create(s, &input) {
        Ok(template) => {
            s.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "create",
                Some("board_template"),
                Some(template.id),
                Some(&template.name),
                None,
            );
            Ok(Flash::success(
                Redirect::to(format!("{}/board-templates", admin_base(slug))),
                "게시판 템플릿이 생성되었습니다.",
            ))
        }
        Err(e) => Err(render_form(s, slug, input_form_json(&input, None), &e.messages())),
    }
}

// ── Update ─────────────────────────────────────────────

#[get("/board-templates/<id>/edit")]
pub fn template_edit(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Option<Template> {
    let s: &dyn Store = &**store.inner();
    let template = s.template_find_by_id(id)?;
    Some(render_form(s, slug, template_form_json(&template), &[]))
}

#[post("/board-templates/<id>/edit", data = "<body>")]
pub fn template_update(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
    body: String,
) -> Result<Flash<Redirect>, Template> {
    let s: &dyn Store = &**store.inner();
    let list_url = format!("{}/board-templates", admin_base(slug));
    let template = match s.template_find_by_id(id) {
        Some(t) => t,
        None => return Ok(Flash::error(Redirect::to(list_url), "Template not found.")),
    };
    let input = RawInput::from_urlencoded(&body);

    match lifecycle::update(s, &template, &input) {
        Ok(()) => {
            s.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "update",
                Some("board_template"),
                Some(template.id),
                Some(&template.name),
                template.is_system.then_some("activation only"),
            );
            Ok(Flash::success(Redirect::to(list_url), "게시판 템플릿이 수정되었습니다."))
        }
        Err(e) if template.is_system => Err(render_form(s, slug, template_form_json(&template), &e.messages())),
        Err(e) => Err(render_form(s, slug, input_form_json(&input, Some(&template)), &e.messages())),
    }
}

// ── Delete / Duplicate ─────────────────────────────────

#[post("/board-templates/<id>/delete")]
pub fn template_delete(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let s: &dyn Store = &**store.inner();
    let list_url = format!("{}/board-templates", admin_base(slug));
    let template = match s.template_find_by_id(id) {
        Some(t) => t,
        None => return Flash::error(Redirect::to(list_url), "Template not found."),
    };

    if let Some(block) = lifecycle::deletion_block(s, &template) {
        return Flash::error(Redirect::to(list_url), block.message());
    }
    if !lifecycle::delete(s, &template) {
        return Flash::error(Redirect::to(list_url), "The template could not be deleted.");
    }
    s.audit_log(
        Some(admin.user.id),
        Some(&admin.user.name),
        "delete",
        Some("board_template"),
        Some(template.id),
        Some(&template.name),
        None,
    );
    Flash::success(Redirect::to(list_url), "게시판 템플릿이 삭제되었습니다.")
}

#[post("/board-templates/<id>/duplicate")]
pub fn template_duplicate(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let s: &dyn Store = &**store.inner();
    let base = admin_base(slug);
    let template = match s.template_find_by_id(id) {
        Some(t) => t,
        None => return Flash::error(Redirect::to(format!("{}/board-templates", base)), "Template not found."),
    };

    match lifecycle::duplicate(s, &template) {
        Ok(copy) => {
            s.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "duplicate",
                Some("board_template"),
                Some(copy.id),
                Some(&copy.name),
                Some(&format!("from #{}", template.id)),
            );
            Flash::success(
                Redirect::to(format!("{}/board-templates/{}/edit", base, copy.id)),
                "게시판 템플릿이 복제되었습니다.",
            )
        }
        Err(e) => Flash::error(Redirect::to(format!("{}/board-templates", base)), e.to_string()),
    }
}
