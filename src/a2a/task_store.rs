//! In-memory task registry.

use std::collections::HashMap;

use tokio::sync::RwLock;

use super::types::Task;

/// Process-lifetime store of request/response exchanges.
///
/// Nothing is persisted; a restart forgets all tasks.
pub struct InMemoryTaskStore {
    tasks: RwLock<HashMap<String, Task>>,
}

impl InMemoryTaskStore {
    pub fn new() -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
        }
    }

    /// Insert (or replace) a task.
    pub async fn insert(&self, task: Task) {
        self.tasks.write().await.insert(task.id.clone(), task);
    }

    /// Fetch a task by id.
    pub async fn get(&self, id: &str) -> Option<Task> {
        self.tasks.read().await.get(id).cloned()
    }

    /// Apply an update to a stored task and return the new value.
    pub async fn update(
        &self,
        id: &str,
        updates: impl FnOnce(&mut Task),
    ) -> anyhow::Result<Task> {
        let mut tasks = self.tasks.write().await;
        let task = tasks
            .get_mut(id)
            .ok_or_else(|| anyhow::anyhow!("Task {} not found", id))?;

        updates(task);
        Ok(task.clone())
    }

    /// Number of stored tasks.
    pub async fn len(&self) -> usize {
        self.tasks.read().await.len()
    }
}

impl Default for InMemoryTaskStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::a2a::types::{Message, TaskState, TaskStatus};

    #[tokio::test]
    async fn test_insert_and_get() {
        let store = InMemoryTaskStore::new();
        let task = Task::submitted(Message::user("hello"));
        let id = task.id.clone();

        store.insert(task).await;

        let fetched = store.get(&id).await.unwrap();
        assert_eq!(fetched.id, id);
        assert_eq!(fetched.status.state, TaskState::Submitted);
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_update_transitions_state() {
        let store = InMemoryTaskStore::new();
        let task = Task::submitted(Message::user("hello"));
        let id = task.id.clone();
        store.insert(task).await;

        let updated = store
            .update(&id, |t| t.status = TaskStatus::new(TaskState::Working))
            .await
            .unwrap();

        assert_eq!(updated.status.state, TaskState::Working);
        assert_eq!(store.get(&id).await.unwrap().status.state, TaskState::Working);
    }

    #[tokio::test]
    async fn test_update_unknown_task_errors() {
        let store = InMemoryTaskStore::new();
        let result = store.update("missing", |_| {}).await;
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_get_unknown_task_is_none() {
        let store = InMemoryTaskStore::new();
        assert!(store.get("missing").await.is_none());
    }
}
