//! Persistence ports and in-memory adaptors.
//!
//! Handlers depend on the [`TaskStore`]/[`UserStore`] traits, never on a
//! concrete backend. The in-memory adaptors below are the only backends this
//! crate ships — a relational adaptor would implement the same traits and
//! return the same `AppError` statuses (404 on missing, 409 on duplicate).

use async_trait::async_trait;
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::{Task, User};
use crate::error::AppError;

// ── Ports ─────────────────────────────────────────────────────────────────────

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create(&self, task: Task) -> Result<Task, AppError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Task, AppError>;
    async fn update(&self, task: Task) -> Result<Task, AppError>;
    async fn delete(&self, id: Uuid) -> Result<(), AppError>;
    async fn list(&self) -> Result<Vec<Task>, AppError>;
}

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Fails with `409` when a user of the same name exists.
    async fn create(&self, user: User) -> Result<User, AppError>;
    async fn find_by_name(&self, name: &str) -> Result<User, AppError>;
}

fn task_not_found(id: Uuid) -> AppError {
    AppError::not_found(format!("task {id} does not exist"))
}

// ── In-memory adaptors ────────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemoryTaskStore {
    tasks: DashMap<Uuid, Task>,
}

impl MemoryTaskStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task, AppError> {
        self.tasks.insert(task.id, task.clone());
        tracing::debug!(task_id = %task.id, "task created");
        Ok(task)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Task, AppError> {
        self.tasks
            .get(&id)
            .map(|entry| entry.clone())
            .ok_or_else(|| task_not_found(id))
    }

    async fn update(&self, task: Task) -> Result<Task, AppError> {
        // Entry-based update so a concurrent delete cannot resurrect the row.
        match self.tasks.entry(task.id) {
            dashmap::mapref::entry::Entry::Occupied(mut entry) => {
                entry.insert(task.clone());
                Ok(task)
            }
            dashmap::mapref::entry::Entry::Vacant(_) => Err(task_not_found(task.id)),
        }
    }

    async fn delete(&self, id: Uuid) -> Result<(), AppError> {
        self.tasks
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| task_not_found(id))
    }

    async fn list(&self) -> Result<Vec<Task>, AppError> {
        let mut tasks: Vec<Task> =
            self.tasks.iter().map(|entry| entry.value().clone()).collect();
        tasks.sort_by_key(|t| t.created_at);
        Ok(tasks)
    }
}

/// Keyed by lowercase name: registration conflicts are case-insensitive.
#[derive(Default)]
pub struct MemoryUserStore {
    users: DashMap<String, User>,
}

impl MemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl UserStore for MemoryUserStore {
    async fn create(&self, user: User) -> Result<User, AppError> {
        match self.users.entry(user.name.to_lowercase()) {
            dashmap::mapref::entry::Entry::Occupied(_) => Err(AppError::conflict(format!(
                "user {} already exists",
                user.name
            ))),
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(user.clone());
                tracing::debug!(user_id = %user.id, "user registered");
                Ok(user)
            }
        }
    }

    async fn find_by_name(&self, name: &str) -> Result<User, AppError> {
        self.users
            .get(&name.to_lowercase())
            .map(|entry| entry.clone())
            .ok_or_else(|| AppError::not_found(format!("user {name} does not exist")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn task_round_trip_and_delete() {
        let store = MemoryTaskStore::new();
        let task = store
            .create(Task::new("write tests", None).unwrap())
            .await
            .unwrap();

        let found = store.find_by_id(task.id).await.unwrap();
        assert_eq!(found.title, "write tests");

        store.delete(task.id).await.unwrap();
        let err = store.find_by_id(task.id).await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn updating_a_deleted_task_is_not_found() {
        let store = MemoryTaskStore::new();
        let task = store
            .create(Task::new("ephemeral", None).unwrap())
            .await
            .unwrap();
        store.delete(task.id).await.unwrap();

        let err = store.update(task).await.unwrap_err();
        assert_eq!(err.status(), 404);
    }

    #[tokio::test]
    async fn list_is_ordered_by_creation_time() {
        let store = MemoryTaskStore::new();
        for title in ["first", "second", "third"] {
            store.create(Task::new(title, None).unwrap()).await.unwrap();
            // Keep creation timestamps strictly increasing.
            tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        }
        let titles: Vec<String> = store
            .list()
            .await
            .unwrap()
            .into_iter()
            .map(|t| t.title)
            .collect();
        assert_eq!(titles, ["first", "second", "third"]);
    }

    #[tokio::test]
    async fn duplicate_registration_conflicts_case_insensitively() {
        let store = MemoryUserStore::new();
        store.create(User::new("Tecchu").unwrap()).await.unwrap();

        let err = store
            .create(User::new("tecchu").unwrap())
            .await
            .unwrap_err();
        assert_eq!(err.status(), 409);

        let found = store.find_by_name("TECCHU").await.unwrap();
        assert_eq!(found.name, "Tecchu");
    }
}
