use std::sync::Arc;

use rocket::form::Form;
use rocket::request::FlashMessage;
use rocket::response::{Flash, Redirect};
use rocket::State;
use rocket_dyn_templates::Template;
use serde_json::json;

use super::admin_base;
use crate::models::board::BoardForm;
use crate::security::auth::AdminUser;
use crate::store::Store;
use crate::AdminSlug;

#[get("/boards")]
pub fn boards_list(
    _admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    flash: Option<FlashMessage<'_>>,
) -> Template {
    let mut context = json!({
        "page_title": "Boards",
        "admin_slug": slug.0,
        "boards": store.board_list(),
        "templates": store.template_list_active(),
        "settings": store.setting_all(),
    });
    if let Some(ref f) = flash {
        context["flash_kind"] = json!(f.kind());
        context["flash_msg"] = json!(f.message());
    }
    Template::render("admin/boards/list", &context)
}

#[derive(FromForm)]
pub struct BoardFormData {
    pub template_id: i64,
    pub name: String,
    pub slug: String,
    pub is_active: Option<bool>,
}

#[post("/boards/new", data = "<form>")]
pub fn board_create(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    admin_slug: &State<AdminSlug>,
    form: Form<BoardFormData>,
) -> Flash<Redirect> {
    let list_url = format!("{}/boards", admin_base(admin_slug));
    let name = form.name.trim().to_string();
    if name.is_empty() {
        return Flash::error(Redirect::to(list_url), "Board name is required.");
    }
    match store.template_find_by_id(form.template_id) {
        Some(t) if t.is_active => {}
        _ => return Flash::error(Redirect::to(list_url), "Choose an active template."),
    }
    let board_slug = if form.slug.trim().is_empty() {
        slug::slugify(&name)
    } else {
        slug::slugify(form.slug.trim())
    };
    if board_slug.is_empty() {
        return Flash::error(Redirect::to(list_url), "Board slug is required.");
    }

    let board = BoardForm {
        template_id: form.template_id,
        name: name.clone(),
        slug: board_slug,
        is_active: form.is_active.unwrap_or(true),
    };
    match store.board_create(&board) {
        Ok(id) => {
            store.audit_log(
                Some(admin.user.id),
                Some(&admin.user.name),
                "create",
                Some("board"),
                Some(id),
                Some(&name),
                None,
            );
            Flash::success(Redirect::to(list_url), "게시판이 생성되었습니다.")
        }
        Err(e) => {
            log::warn!("Board create failed: {}", e);
            Flash::error(Redirect::to(list_url), "The board could not be created (is the slug taken?).")
        }
    }
}

#[post("/boards/<id>/delete")]
pub fn board_delete(
    admin: AdminUser,
    store: &State<Arc<dyn Store>>,
    slug: &State<AdminSlug>,
    id: i64,
) -> Flash<Redirect> {
    let list_url = format!("{}/boards", admin_base(slug));
    let board = match store.board_find_by_id(id) {
        Some(b) => b,
        None => return Flash::error(Redirect::to(list_url), "Board not found."),
    };
    if let Err(e) = store.board_delete(id) {
        log::warn!("Board delete failed: {}", e);
        return Flash::error(Redirect::to(list_url), "The board could not be deleted.");
    }
    store.audit_log(
        Some(admin.user.id),
        Some(&admin.user.name),
        "delete",
        Some("board"),
        Some(id),
        Some(&board.name),
        Some(&format!("{} posts removed", board.post_count)),
    );
    Flash::success(Redirect::to(list_url), "게시판이 삭제되었습니다.")
}
