use std::collections::HashMap;
use std::sync::Arc;

use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::serde::json::Json;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Deserialize;
use serde_json::{json, Value};

use super::{admin_base, page_offset, total_pages};
use crate::board_templates::input::RawInput;
use crate::board_templates::post_rules;
use crate::models::board::Board;
use crate::models::board_template::BoardTemplate;
use crate::security::auth::ManagerUser;
use crate::store::Store;
use crate::AdminSlug;

fn board_and_template(store: &dyn Store, board_id: i64) -> Option<(Board, BoardTemplate)> {
    let board = store.board_find_by_id(board_id)?;
    let template = store.template_find_by_id(board.template_id)?;
    Some((board, template))
}

// ── List ───────────────────────────────────────────────

#[get("/boards/<board_id>/posts?<page>")]
pub fn posts_list(
    _admin: ManagerUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    board_id: i64,
    page: Option<i64>,
    flash: Option<FlashMessage<'_>>,
) -> Option<Template> {
    let s: &dyn Store = &**store.inner();
    let (board, template) = board_and_template(s, board_id)?;

    let per_page = s.setting_get_i64("posts_per_page").max(1);
    let (current_page, offset) = page_offset(page, per_page);
    let total = s.post_count(Some(board_id));

    let mut context = json!({
        "page_title": board.name,
        "admin_slug": slug.0,
        "board": board,
        "template": template,
        "posts": s.post_list_for_board(board_id, per_page, offset),
        "current_page": current_page,
        "total_pages": total_pages(total, per_page),
        "total": total,
        "settings": s.setting_all(),
    });
    if let Some(ref f) = flash {
        context["flash_kind"] = json!(f.kind());
        context["flash_msg"] = json!(f.message());
    }
    Some(Template::render("admin/board_posts/list", &context))
}

// ── Create ─────────────────────────────────────────────

fn render_post_form(
    s: &dyn Store,
    slug: &AdminSlug,
    board: &Board,
    template: &BoardTemplate,
    values: &RawInput,
    errors: &[String],
) -> Template {
    let custom_values: HashMap<&str, &str> = template
        .custom_fields_config
        .iter()
        .flatten()
        .map(|spec| {
            let value = values.get(&format!("custom[{}]", spec.name)).unwrap_or_default();
            (spec.name.as_str(), value)
        })
        .collect();
    let context = json!({
        "page_title": format!("{}: new post", board.name),
        "admin_slug": slug.0,
        "board": board,
        "template": template,
        "values": values.values(),
        "custom_values": custom_values,
        "errors": errors,
        "settings": s.setting_all(),
    });
    Template::render("admin/board_posts/form", &context)
}

#[get("/boards/<board_id>/posts/new")]
pub fn post_new(
    _admin: ManagerUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    board_id: i64,
) -> Option<Template> {
    let s: &dyn Store = &**store.inner();
    let (board, template) = board_and_template(s, board_id)?;
    Some(render_post_form(s, slug, &board, &template, &RawInput::new(), &[]))
}

#[post("/boards/<board_id>/posts/new", data = "<body>")]
pub fn post_create(
    admin: ManagerUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    board_id: i64,
    body: String,
) -> Option<Result<Flash<Redirect>, Template>> {
    let s: &dyn Store = &**store.inner();
    let (board, template) = board_and_template(s, board_id)?;
    let input = RawInput::from_urlencoded(&body);
    let list_url = format!("{}/boards/{}/posts", admin_base(slug), board_id);

    let form = match post_rules::prepare_post(&template, board_id, &input) {
        Ok(f) => f,
        Err(errors) => return Some(Err(render_post_form(s, slug, &board, &template, &input, &errors))),
    };
    let result = match s.post_create(&form) {
        Ok(id) => {
            s.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "create",
                Some("board_post"),
                Some(id),
                Some(&form.title),
                Some(&board.name),
            );
            Ok(Flash::success(Redirect::to(list_url), "게시글이 등록되었습니다."))
        }
        Err(e) => {
            log::warn!("Post create failed on board {}: {}", board_id, e);
            Err(render_post_form(
                s,
                slug,
                &board,
                &template,
                &input,
                &["The post could not be saved.".to_string()],
            ))
        }
    };
    Some(result)
}

// ── Delete ─────────────────────────────────────────────

#[post("/boards/<board_id>/posts/<id>/delete")]
pub fn post_delete(
    admin: ManagerUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    board_id: i64,
    id: i64,
) -> Flash<Redirect> {
    let list_url = format!("{}/boards/{}/posts", admin_base(slug), board_id);
    let title = match store.post_find_by_id(id) {
        Some(p) if p.board_id == board_id => p.title,
        _ => return Flash::error(Redirect::to(list_url), "Post not found."),
    };
    match store.post_delete_many(board_id, &[id]) {
        Ok(n) if n > 0 => {
            store.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "delete",
                Some("board_post"),
                Some(id),
                Some(&title),
                None,
            );
            Flash::success(Redirect::to(list_url), "게시글이 삭제되었습니다.")
        }
        Ok(_) => Flash::error(Redirect::to(list_url), "Post not found."),
        Err(e) => {
            log::warn!("Post delete failed: {}", e);
            Flash::error(Redirect::to(list_url), "The post could not be deleted.")
        }
    }
}

#[derive(Deserialize)]
pub struct BulkDeleteRequest {
    pub ids: Vec<i64>,
}

/// Called by the list page's bulk action; the page reloads on success.
#[post("/api/boards/<board_id>/posts/bulk-delete", format = "json", data = "<req>")]
pub fn api_posts_bulk_delete(
    admin: ManagerUser,
    store: &State<Arc<dyn Store>>,
    board_id: i64,
    req: Json<BulkDeleteRequest>,
) -> Json<Value> {
    if req.ids.is_empty() {
        return Json(json!({"success": false, "message": "삭제할 게시글을 선택해주세요."}));
    }
    if store.board_find_by_id(board_id).is_none() {
        return Json(json!({"success": false, "message": "Board not found."}));
    }
    match store.post_delete_many(board_id, &req.ids) {
        Ok(deleted) => {
            store.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "bulk_delete",
                Some("board_post"),
                None,
                None,
                Some(&format!("board #{}: {} of {} posts", board_id, deleted, req.ids.len())),
            );
            Json(json!({
                "success": true,
                "deleted": deleted,
                "message": format!("{}개의 게시글이 삭제되었습니다.", deleted),
            }))
        }
        Err(e) => {
            log::warn!("Bulk delete failed on board {}: {}", board_id, e);
            Json(json!({"success": false, "message": "삭제 중 오류가 발생했습니다."}))
        }
    }
}
