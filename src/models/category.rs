use crate::db::DbPool;

pub struct Category;

impl Category {
    /// Distinct group names of active categories, offered to templates.
    pub fn groups(pool: &DbPool) -> Vec<String> {
        let conn = match pool.get() {
            Ok(c) => c,
            Err(_) => return vec![],
        };
        let mut stmt = match conn.prepare(
            "SELECT DISTINCT group_name FROM categories WHERE is_active = 1 ORDER BY group_name",
        ) {
            Ok(s) => s,
            Err(_) => return vec![],
        };
        stmt.query_map([], |row| row.get(0))
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
    }
}
