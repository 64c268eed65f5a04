use rocket::form::Form;
use rocket::http::CookieJar;
use rocket::request::FlashMessage;
use rocket::response::Redirect;
use rocket::State;
use rocket_dyn_templates::Template;
use serde::Deserialize;
use serde_json::json;

use std::sync::Arc;

use crate::rate_limit::RateLimiter;
use crate::routes::security::NoCacheTemplate;
use crate::security::auth;
use crate::store::Store;
use crate::AdminSlug;

const LOGIN_WINDOW_SECS: u64 = 15 * 60;

#[derive(Debug, FromForm, Deserialize)]
pub struct LoginForm {
    /// Login id or email.
    pub login: String,
    pub password: String,
}

fn render_login(store: &dyn Store, slug: &str, login: Option<&str>, error: Option<&str>) -> Template {
    let context = json!({
        "admin_slug": slug,
        "site_name": store.setting_get_or("site_name", "Board Backoffice"),
        "login": login,
        "error": error,
    });
    Template::render("admin/login", &context)
}

#[get("/login")]
pub fn login_page(
    store: &State<Arc<dyn Store>>,
    admin_slug: &State<AdminSlug>,
    flash: Option<FlashMessage<'_>>,
) -> NoCacheTemplate {
    let error = flash.as_ref().map(|f| f.message().to_string());
    NoCacheTemplate(render_login(&**store.inner(), &admin_slug.0, None, error.as_deref()))
}

#[post("/login", data = "<form>")]
pub fn login_submit(
    form: Form<LoginForm>,
    store: &State<Arc<dyn Store>>,
    admin_slug: &State<AdminSlug>,
    limiter: &State<RateLimiter>,
    cookies: &CookieJar<'_>,
    client_ip: auth::ClientIp,
) -> Result<Redirect, Template> {
    let s: &dyn Store = &**store.inner();
    let slug = &admin_slug.0;
    let ip = &client_ip.0;
    let login = form.login.trim();
    let rate_key = format!("login:{}", auth::hash_ip(ip));
    let max_attempts = s.setting_get_i64("login_rate_limit").max(1) as u64;
    let window = std::time::Duration::from_secs(LOGIN_WINDOW_SECS);

    let fail = |msg: &str| render_login(s, slug, Some(login), Some(msg));

    if !limiter.check_and_record(&rate_key, max_attempts, window) {
        log::warn!("Login rate limit hit for {}", auth::hash_ip(ip));
        return Err(fail("Too many login attempts. Please try again in 15 minutes."));
    }

    let user = match s.user_get_by_login(login) {
        Some(u) => u,
        None => return Err(fail("Invalid credentials")),
    };

    if !auth::verify_password(&form.password, &user.password_hash) {
        s.audit_log(
            Some(user.id),
            Some(&user.name),
            "login_failed",
            Some("admin"),
            Some(user.id),
            Some(&user.email),
            Some("Wrong password"),
        );
        return Err(fail("Invalid credentials"));
    }

    if !user.is_active {
        return Err(fail("This account is deactivated. Contact an administrator."));
    }
    // Plain members have no backoffice access
    if !user.is_backoffice_user() {
        return Err(fail("Your account does not have backoffice access."));
    }

    match auth::create_session(s, user.id, Some(ip), None) {
        Ok(session_id) => {
            auth::set_session_cookie(cookies, &session_id);
            limiter.reset(&rate_key);
            if let Err(e) = s.user_touch_last_login(user.id) {
                log::warn!("Could not record last login for {}: {}", user.id, e);
            }
            s.audit_log(
                Some(user.id),
                Some(&user.name),
                "login",
                Some("admin"),
                Some(user.id),
                Some(&user.email),
                None,
            );
            log::info!("Admin {} logged in", user.id);
            Ok(Redirect::to(format!("/{}", slug)))
        }
        Err(e) => {
            log::error!("Session creation failed: {}", e);
            Err(fail("Session creation failed"))
        }
    }
}
