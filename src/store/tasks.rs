use sqlx::SqlitePool;

use crate::{
    db,
    error::AppError,
    models::{PrincipalId, Task},
};

/// What the current `todos` schema supports. Probed again on every store
/// call so a migration applied while the server runs takes effect at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SchemaCapabilities {
    pub task_ownership: bool,
}

impl SchemaCapabilities {
    pub async fn probe(pool: &SqlitePool) -> Result<Self, sqlx::Error> {
        Ok(Self {
            task_ownership: db::has_task_owner_column(pool).await?,
        })
    }

    fn scope(self, caller: PrincipalId) -> TaskScope {
        if self.task_ownership {
            TaskScope::Owner(caller)
        } else {
            TaskScope::Global
        }
    }
}

/// Which rows a caller may see and touch.
#[derive(Debug, Clone, Copy)]
enum TaskScope {
    Owner(PrincipalId),
    /// Legacy schema without owners: every task is shared.
    Global,
}

#[derive(Clone)]
pub struct TaskStore {
    pool: SqlitePool,
}

impl TaskStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn capabilities(&self) -> Result<SchemaCapabilities, AppError> {
        Ok(SchemaCapabilities::probe(&self.pool).await?)
    }

    async fn scope_for(&self, caller: PrincipalId) -> Result<TaskScope, AppError> {
        Ok(self.capabilities().await?.scope(caller))
    }

    pub async fn list(&self, caller: PrincipalId) -> Result<Vec<Task>, AppError> {
        let tasks = match self.scope_for(caller).await? {
            TaskScope::Owner(owner) => {
                sqlx::query_as::<_, Task>(
                    "SELECT id, title, completed FROM todos WHERE user_id = ? ORDER BY id",
                )
                .bind(owner)
                .fetch_all(&self.pool)
                .await?
            }
            TaskScope::Global => {
                sqlx::query_as::<_, Task>("SELECT id, title, completed FROM todos ORDER BY id")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        Ok(tasks)
    }

    pub async fn add(&self, title: &str, caller: PrincipalId) -> Result<Task, AppError> {
        validate_title(title)?;

        let result = match self.scope_for(caller).await? {
            TaskScope::Owner(owner) => {
                sqlx::query("INSERT INTO todos (title, completed, user_id) VALUES (?, ?, ?)")
                    .bind(title)
                    .bind(false)
                    .bind(owner)
                    .execute(&self.pool)
                    .await?
            }
            TaskScope::Global => {
                sqlx::query("INSERT INTO todos (title, completed) VALUES (?, ?)")
                    .bind(title)
                    .bind(false)
                    .execute(&self.pool)
                    .await?
            }
        };

        Ok(Task {
            id: result.last_insert_rowid(),
            title: title.to_string(),
            completed: false,
        })
    }

    /// Replaces title and completion flag. In legacy mode a missing id is not
    /// detected and the submitted values are echoed back.
    pub async fn update(
        &self,
        id: i64,
        title: &str,
        completed: bool,
        caller: PrincipalId,
    ) -> Result<Task, AppError> {
        validate_title(title)?;

        match self.scope_for(caller).await? {
            TaskScope::Owner(owner) => {
                let result = sqlx::query(
                    "UPDATE todos SET title = ?, completed = ? WHERE id = ? AND user_id = ?",
                )
                .bind(title)
                .bind(completed)
                .bind(id)
                .bind(owner)
                .execute(&self.pool)
                .await?;

                if result.rows_affected() == 0 {
                    return Err(not_found());
                }
            }
            TaskScope::Global => {
                let result = sqlx::query("UPDATE todos SET title = ?, completed = ? WHERE id = ?")
                    .bind(title)
                    .bind(completed)
                    .bind(id)
                    .execute(&self.pool)
                    .await?;

                if result.rows_affected() == 0 {
                    tracing::warn!(id, "legacy-mode update matched no task");
                }
            }
        }

        Ok(Task {
            id,
            title: title.to_string(),
            completed,
        })
    }

    pub async fn delete(&self, id: i64, caller: PrincipalId) -> Result<(), AppError> {
        match self.scope_for(caller).await? {
            TaskScope::Owner(owner) => {
                let result = sqlx::query("DELETE FROM todos WHERE id = ? AND user_id = ?")
                    .bind(id)
                    .bind(owner)
                    .execute(&self.pool)
                    .await?;

                if result.rows_affected() == 0 {
                    return Err(not_found());
                }
            }
            TaskScope::Global => {
                let result = sqlx::query("DELETE FROM todos WHERE id = ?")
                    .bind(id)
                    .execute(&self.pool)
                    .await?;

                if result.rows_affected() == 0 {
                    tracing::warn!(id, "legacy-mode delete matched no task");
                }
            }
        }

        Ok(())
    }
}

fn validate_title(title: &str) -> Result<(), AppError> {
    if title.trim().is_empty() {
        return Err(AppError::ValidationError(
            "Task title cannot be empty".to_string(),
        ));
    }
    Ok(())
}

fn not_found() -> AppError {
    AppError::NotFound("Todo not found or not owned by you".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::PrincipalStore;
    use sqlx::sqlite::SqlitePoolOptions;

    const ALICE: PrincipalId = PrincipalId(1);
    const BOB: PrincipalId = PrincipalId(2);

    async fn pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .unwrap();
        db::run_migrations(&pool).await.unwrap();
        pool
    }

    #[tokio::test]
    async fn probe_follows_schema_changes_without_restart() {
        let pool = pool().await;
        let store = TaskStore::new(pool.clone());

        assert!(!store.capabilities().await.unwrap().task_ownership);
        db::enable_task_ownership(&pool).await.unwrap();
        assert!(store.capabilities().await.unwrap().task_ownership);
    }

    #[tokio::test]
    async fn owner_scoping_hides_other_principals_tasks() {
        let pool = pool().await;
        db::enable_task_ownership(&pool).await.unwrap();
        // user_id references users(id), so owners must exist.
        let principals = PrincipalStore::new(pool.clone());
        let alice = principals.create("alice", "h1").await.unwrap().id;
        let bob = principals.create("bob", "h2").await.unwrap().id;
        let store = TaskStore::new(pool);

        let mine = store.add("alice's", alice).await.unwrap();
        store.add("bob's", bob).await.unwrap();

        assert_eq!(store.list(alice).await.unwrap(), vec![mine.clone()]);
        assert!(matches!(
            store.update(mine.id, "stolen", true, bob).await,
            Err(AppError::NotFound(_))
        ));
        assert!(matches!(
            store.delete(mine.id, bob).await,
            Err(AppError::NotFound(_))
        ));
        assert_eq!(store.list(alice).await.unwrap(), vec![mine]);
    }

    #[tokio::test]
    async fn owner_must_be_a_registered_principal() {
        let pool = pool().await;
        db::enable_task_ownership(&pool).await.unwrap();
        let store = TaskStore::new(pool);

        assert!(matches!(
            store.add("orphan", PrincipalId(99)).await,
            Err(AppError::StorageError(_))
        ));
    }

    #[tokio::test]
    async fn legacy_schema_shares_every_task() {
        let store = TaskStore::new(pool().await);

        let task = store.add("shared", ALICE).await.unwrap();
        let updated = store.update(task.id, "shared", true, BOB).await.unwrap();

        assert!(updated.completed);
        assert_eq!(store.list(ALICE).await.unwrap(), vec![updated.clone()]);
        assert_eq!(store.list(BOB).await.unwrap(), vec![updated]);
    }

    #[tokio::test]
    async fn legacy_update_of_missing_id_echoes_input() {
        let store = TaskStore::new(pool().await);

        let echoed = store.update(99, "ghost", true, ALICE).await.unwrap();
        assert_eq!(
            echoed,
            Task {
                id: 99,
                title: "ghost".into(),
                completed: true
            }
        );
        assert!(store.delete(99, ALICE).await.is_ok());
        assert!(store.list(ALICE).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_titles_are_rejected() {
        let store = TaskStore::new(pool().await);

        assert!(matches!(
            store.add("   ", ALICE).await,
            Err(AppError::ValidationError(_))
        ));
        assert!(matches!(
            store.update(1, "", false, ALICE).await,
            Err(AppError::ValidationError(_))
        ));
    }
}
