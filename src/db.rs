use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

static MIGRATOR: sqlx::migrate::Migrator = sqlx::migrate!("./migrations");

pub async fn establish_connection(database_url: &str) -> Result<SqlitePool, sqlx::Error> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;

    run_migrations(&pool).await?;

    Ok(pool)
}

/// Creates the base `users` and `todos` tables. The `todos` table starts out
/// without an owner column; see [`enable_task_ownership`].
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    MIGRATOR.run(pool).await?;
    tracing::info!("migrations executed successfully");
    Ok(())
}

/// Returns true when `todos` has the `user_id` owner column.
pub async fn has_task_owner_column(pool: &SqlitePool) -> Result<bool, sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as(
        "SELECT COUNT(*) FROM pragma_table_info('todos') WHERE name = 'user_id'",
    )
    .fetch_one(pool)
    .await?;

    Ok(count > 0)
}

/// Adds the `user_id` owner column to `todos` if it is missing. Tasks that
/// already exist keep a NULL owner and are invisible in ownership mode.
pub async fn enable_task_ownership(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    if has_task_owner_column(pool).await? {
        return Ok(());
    }

    sqlx::query("ALTER TABLE todos ADD COLUMN user_id INTEGER REFERENCES users(id)")
        .execute(pool)
        .await?;
    sqlx::query("CREATE INDEX IF NOT EXISTS idx_todos_user_id ON todos(user_id)")
        .execute(pool)
        .await?;

    tracing::info!("added user_id owner column to todos");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn memory_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn fresh_schema_has_no_owner_column() {
        let pool = memory_pool().await;
        assert!(!has_task_owner_column(&pool).await.unwrap());
    }

    #[tokio::test]
    async fn enabling_ownership_is_idempotent() {
        let pool = memory_pool().await;

        enable_task_ownership(&pool).await.unwrap();
        enable_task_ownership(&pool).await.unwrap();

        assert!(has_task_owner_column(&pool).await.unwrap());
    }
}
