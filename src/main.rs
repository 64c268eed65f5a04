#[macro_use]
extern crate rocket;

use std::sync::Arc;

use rocket::fs::FileServer;
use rocket_dyn_templates::Template;

mod board_templates;
mod boot;
mod db;
mod models;
mod rate_limit;
mod routes;
mod security;
mod store;

#[cfg(test)]
mod tests;

use rocket::fairing::{Fairing, Info, Kind};
use rocket::http::Header;
use rocket::response::content::RawHtml;

use store::sqlite::SqliteStore;
use store::Store;

/// Holds the backoffice URL slug, read from settings at startup.
/// Shared via Rocket managed state so routes, fairings, and templates can access it.
pub struct AdminSlug(pub String);

pub struct NoCacheAdmin;

#[rocket::async_trait]
impl Fairing for NoCacheAdmin {
    fn info(&self) -> Info {
        Info { name: "No-Cache Backoffice Pages", kind: Kind::Response }
    }

    async fn on_response<'r>(&self, req: &'r rocket::Request<'_>, res: &mut rocket::Response<'r>) {
        let slug = req.rocket().state::<AdminSlug>()
            .map(|s| s.0.as_str())
            .unwrap_or("backoffice");
        let prefix = format!("/{}", slug);
        if req.uri().path().starts_with(&*prefix) {
            res.set_header(Header::new("Cache-Control", "no-store, no-cache, must-revalidate, max-age=0"));
            res.set_header(Header::new("Pragma", "no-cache"));
        }
    }
}

#[catch(403)]
fn forbidden() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>403</h1><p>You do not have permission to view this page.</p></body></html>".to_string())
}

#[catch(404)]
fn not_found() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>404</h1><p>Page not found.</p><a href='/'>← Home</a></body></html>".to_string())
}

#[catch(500)]
fn server_error() -> RawHtml<String> {
    RawHtml("<html><body style='font-family:sans-serif;text-align:center;padding:80px'><h1>500</h1><p>Internal server error.</p><a href='/'>← Home</a></body></html>".to_string())
}

#[get("/")]
fn root(slug: &rocket::State<AdminSlug>) -> rocket::response::Redirect {
    rocket::response::Redirect::to(format!("/{}", slug.0))
}

#[launch]
fn rocket() -> _ {
    env_logger::init();

    // Boot check: verify/create directories, validate critical files
    boot::run();

    let pool = db::init_pool().expect("Failed to initialize database pool");
    let store: Arc<dyn Store> = Arc::new(SqliteStore::new(pool));
    store.run_migrations().expect("Failed to run database migrations");
    store.seed_defaults().expect("Failed to seed defaults");

    let expired = store.session_cleanup_expired();
    if expired > 0 {
        log::info!("Removed {} expired sessions", expired);
    }

    let admin_slug = store.setting_get_or("admin_slug", "backoffice");
    let admin_mount = format!("/{}", admin_slug);
    log::info!("Backoffice mounted at: {}", admin_mount);

    rocket::build()
        .manage(store)
        .manage(AdminSlug(admin_slug))
        .manage(rate_limit::RateLimiter::new())
        .attach(Template::fairing())
        .attach(NoCacheAdmin)
        .mount("/static", FileServer::from("website/static"))
        .mount("/", routes![root])
        .mount(&admin_mount, routes::admin::routes())
        .mount(&admin_mount, routes::security::routes())
        .register("/", catchers![forbidden, not_found, server_error])
}
