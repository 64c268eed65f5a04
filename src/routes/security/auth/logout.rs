use rocket::response::Redirect;
use rocket::State;
use std::sync::Arc;

use crate::security::auth;
use crate::store::Store;
use crate::AdminSlug;

#[get("/logout")]
pub fn logout(
    store: &State<Arc<dyn Store>>,
    admin_slug: &State<AdminSlug>,
    cookies: &rocket::http::CookieJar<'_>,
) -> Redirect {
    if let Some(cookie) = cookies.get_private(auth::SESSION_COOKIE) {
        if let Err(e) = auth::destroy_session(&**store.inner(), cookie.value()) {
            log::warn!("Session delete failed on logout: {}", e);
        }
    }
    auth::clear_session_cookie(cookies);
    Redirect::to(format!("/{}/login", admin_slug.0))
}

/// Catch-all for any /<admin_slug>/* route whose user guard forwarded.
#[get("/<_path..>", rank = 99)]
pub fn admin_redirect_to_login(_path: std::path::PathBuf, admin_slug: &State<AdminSlug>) -> Redirect {
    Redirect::to(format!("/{}/login", admin_slug.0))
}
