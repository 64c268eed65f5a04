use log::{error, info, warn};
use std::fs;
use std::path::Path;
use std::process;

/// Directories created on startup when missing.
const REQUIRED_DIRS: &[&str] = &[
    "website",
    "website/db",
    "website/static",
    "website/static/css",
    "website/static/js/backoffice",
    "website/templates",
    "website/templates/admin",
];

/// Without these the backoffice cannot render at all.
const CRITICAL_TEMPLATES: &[&str] = &[
    "website/templates/admin/base.html.tera",
    "website/templates/admin/login.html.tera",
    "website/templates/admin/dashboard.html.tera",
    "website/templates/admin/board_templates/list.html.tera",
    "website/templates/admin/board_templates/form.html.tera",
];

const TEMPLATE_SUBDIRS: &[&str] = &[
    "website/templates/admin/board_templates",
    "website/templates/admin/boards",
    "website/templates/admin/board_posts",
    "website/templates/admin/admins",
];

const STATIC_ASSETS: &[&str] = &[
    "website/static/css/admin.css",
    "website/static/js/backoffice/board-templates.js",
    "website/static/js/backoffice/board-posts.js",
];

#[derive(Debug, Default)]
pub struct BootReport {
    pub warnings: u32,
    pub errors: u32,
}

fn has_tera_files(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|entries| {
            entries
                .filter_map(|e| e.ok())
                .any(|e| e.path().extension().map(|ext| ext == "tera").unwrap_or(false))
        })
        .unwrap_or(false)
}

/// Check the working tree under `root`, creating missing directories.
pub fn check(root: &Path) -> BootReport {
    let mut report = BootReport::default();

    // ── 1. Directories ─────────────────────────────────
    for dir in REQUIRED_DIRS {
        let path = root.join(dir);
        if !path.exists() {
            match fs::create_dir_all(&path) {
                Ok(_) => info!("  Created directory: {}", dir),
                Err(e) => {
                    error!("  FAILED to create directory {}: {}", dir, e);
                    report.errors += 1;
                }
            }
        }
    }

    // ── 2. Critical templates ──────────────────────────
    for file in CRITICAL_TEMPLATES {
        if !root.join(file).exists() {
            error!("  MISSING critical template: {}", file);
            report.errors += 1;
        }
    }

    // ── 3. Template subdirectories ─────────────────────
    for dir in TEMPLATE_SUBDIRS {
        let path = root.join(dir);
        if !path.exists() {
            warn!("  Missing template directory: {} (some pages will 500)", dir);
            report.warnings += 1;
        } else if !has_tera_files(&path) {
            warn!("  Template directory empty: {}", dir);
            report.warnings += 1;
        }
    }

    // ── 4. Static assets ───────────────────────────────
    for file in STATIC_ASSETS {
        if !root.join(file).exists() {
            warn!("  Missing static asset: {}", file);
            report.warnings += 1;
        }
    }

    // ── 5. Database directory writable ─────────────────
    let db_dir = root.join("website/db");
    if db_dir.exists() {
        let test_file = db_dir.join(".write_test");
        match fs::write(&test_file, "test") {
            Ok(_) => {
                let _ = fs::remove_file(&test_file);
            }
            Err(e) => {
                error!("  Database directory not writable: {}", e);
                report.errors += 1;
            }
        }
    }

    // ── 6. Rocket.toml exists ──────────────────────────
    if !root.join("Rocket.toml").exists() {
        warn!("  Rocket.toml not found, using default config");
        report.warnings += 1;
    }

    report
}

/// Run all boot checks before Rocket launches; aborts on errors.
pub fn run() {
    info!("Backoffice boot check starting...");
    let report = check(Path::new("."));

    if report.errors > 0 {
        error!(
            "Boot check FAILED: {} error(s), {} warning(s). Aborting.",
            report.errors, report.warnings
        );
        process::exit(1);
    }

    if report.warnings > 0 {
        warn!(
            "Boot check passed with {} warning(s). Some pages may not work correctly.",
            report.warnings
        );
    } else {
        info!("Boot check passed.");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_tree_reports_missing_templates() {
        let root = std::env::temp_dir().join(format!("backoffice-boot-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&root).unwrap();

        let report = check(&root);
        assert_eq!(report.errors, CRITICAL_TEMPLATES.len() as u32);
        assert!(report.warnings > 0);
        assert!(root.join("website/static/js/backoffice").is_dir());

        fs::remove_dir_all(&root).unwrap();
    }
}
