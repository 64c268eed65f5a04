use crate::AdminSlug;

pub mod admins;
pub mod board_posts;
pub mod board_templates;
pub mod boards;
pub mod dashboard;

/// Helper: get the admin base path from managed state
pub(crate) fn admin_base(slug: &AdminSlug) -> String {
    format!("/{}", slug.0)
}

/// 1-based page number to (page, offset).
pub(crate) fn page_offset(page: Option<i64>, per_page: i64) -> (i64, i64) {
    let current = page.unwrap_or(1).max(1);
    (current, (current - 1) * per_page)
}

pub(crate) fn total_pages(total: i64, per_page: i64) -> i64 {
    ((total as f64) / (per_page as f64)).ceil() as i64
}

/// Select-box filters send "" for "any".
pub(crate) fn opt_flag(raw: Option<&str>) -> Option<bool> {
    match raw.map(str::trim) {
        Some("1") | Some("true") => Some(true),
        Some("0") | Some("false") => Some(false),
        _ => None,
    }
}

/// Inverse of `opt_flag`, for echoing a filter back into the form.
pub(crate) fn flag_param(flag: Option<bool>) -> &'static str {
    match flag {
        Some(true) => "1",
        Some(false) => "0",
        None => "",
    }
}

pub(crate) fn opt_text(raw: Option<String>) -> Option<String> {
    raw.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

pub fn routes() -> Vec<rocket::Route> {
    routes![
        dashboard::dashboard,
        board_templates::templates_list,
        board_templates::template_new,
        board_templates::template_create,
        board_templates::template_edit,
        board_templates::template_update,
        board_templates::template_delete,
        board_templates::template_duplicate,
        boards::boards_list,
        boards::board_create,
        boards::board_delete,
        board_posts::posts_list,
        board_posts::post_new,
        board_posts::post_create,
        board_posts::post_delete,
        board_posts::api_posts_bulk_delete,
        admins::admins_list,
        admins::admin_new,
        admins::admin_create,
        admins::admin_show,
        admins::admin_edit,
        admins::admin_update,
        admins::admin_delete,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn paging_helpers() {
        assert_eq!(page_offset(None, 10), (1, 0));
        assert_eq!(page_offset(Some(0), 10), (1, 0));
        assert_eq!(page_offset(Some(3), 20), (3, 40));
        assert_eq!(total_pages(0, 10), 0);
        assert_eq!(total_pages(21, 10), 3);
    }

    #[test]
    fn select_filters() {
        assert_eq!(opt_flag(Some("1")), Some(true));
        assert_eq!(opt_flag(Some("0")), Some(false));
        assert_eq!(opt_flag(Some("")), None);
        assert_eq!(opt_flag(None), None);
        assert_eq!(flag_param(opt_flag(Some("0"))), "0");
        assert_eq!(flag_param(None), "");
        assert_eq!(opt_text(Some("  ".to_string())), None);
        assert_eq!(opt_text(Some(" qna ".to_string())), Some("qna".to_string()));
    }
}
