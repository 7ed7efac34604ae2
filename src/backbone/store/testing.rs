use sqlx::any::AnyPoolOptions;
use sqlx::AnyPool;
use tempfile::TempDir;

use super::schema::migrate;

// ============================================================================
// Test Support - temporary SQLite databases behind the same AnyPool
// ============================================================================

pub struct TestDatabase {
    pub pool: AnyPool,
    _dir: TempDir,
}

impl TestDatabase {
    pub async fn new() -> Self {
        sqlx::any::install_default_drivers();

        let dir = tempfile::tempdir().unwrap();
        let url = format!("sqlite://{}?mode=rwc", dir.path().join("test.db").display());
        let pool = AnyPoolOptions::new()
            .max_connections(4)
            .connect(&url)
            .await
            .unwrap();
        migrate(&pool).await.unwrap();

        Self { pool, _dir: dir }
    }

    pub async fn count(&self, table: &str) -> i64 {
        let row: (i64,) = sqlx::query_as(&format!("SELECT COUNT(*) FROM {table}"))
            .fetch_one(&self.pool)
            .await
            .unwrap();
        row.0
    }
}

/// Pool that never connects, for tests that only need a context value
pub fn lazy_pool() -> AnyPool {
    sqlx::any::install_default_drivers();
    AnyPool::connect_lazy("sqlite::memory:").unwrap()
}
