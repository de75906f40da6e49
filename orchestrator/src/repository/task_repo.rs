//! TaskItem CRUD: backs the Task Monitor's eligibility sweep (`scheduled ∧ ¬completed ∧
//! due_date <= now`) and deletion of a task that poisoned a sweep.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use uuid::Uuid;

use crate::domain::TaskItem;
use crate::error::OrchestratorError;

#[async_trait]
pub trait TaskItemRepository: Send + Sync {
    async fn add(&self, item: TaskItem) -> Result<(), OrchestratorError>;
    async fn get(&self, id: Uuid) -> Result<Option<TaskItem>, OrchestratorError>;
    /// Rows eligible for a sweep: scheduled, not completed, due at or before `now`.
    async fn eligible(&self, now: DateTime<Utc>) -> Result<Vec<TaskItem>, OrchestratorError>;
    async fn mark_completed(&self, id: Uuid) -> Result<(), OrchestratorError>;
    async fn delete(&self, id: Uuid) -> Result<(), OrchestratorError>;
}

#[derive(Default)]
pub struct InMemoryTaskItemRepository {
    items: DashMap<Uuid, TaskItem>,
}

impl InMemoryTaskItemRepository {
    pub fn new() -> Self {
        Self::default()
    }

    fn not_found(id: Uuid) -> OrchestratorError {
        OrchestratorError::NotFound(format!("task item {id}"))
    }
}

#[async_trait]
impl TaskItemRepository for InMemoryTaskItemRepository {
    async fn add(&self, item: TaskItem) -> Result<(), OrchestratorError> {
        self.items.insert(item.id, item);
        Ok(())
    }

    async fn get(&self, id: Uuid) -> Result<Option<TaskItem>, OrchestratorError> {
        Ok(self.items.get(&id).map(|i| i.clone()))
    }

    async fn eligible(&self, now: DateTime<Utc>) -> Result<Vec<TaskItem>, OrchestratorError> {
        Ok(self
            .items
            .iter()
            .map(|e| e.value().clone())
            .filter(|item| item.is_eligible(now))
            .collect())
    }

    async fn mark_completed(&self, id: Uuid) -> Result<(), OrchestratorError> {
        let mut item = self.items.get_mut(&id).ok_or_else(|| Self::not_found(id))?;
        item.mark_completed();
        Ok(())
    }

    async fn delete(&self, id: Uuid) -> Result<(), OrchestratorError> {
        self.items.remove(&id).map(|_| ()).ok_or_else(|| Self::not_found(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::UserId;
    use chrono::Duration;
    use serde_json::json;

    fn item(due_offset_secs: i64) -> TaskItem {
        TaskItem::new(UserId("u1".into()), "do the thing", Utc::now() + Duration::seconds(due_offset_secs), json!({}))
    }

    #[tokio::test]
    async fn eligible_excludes_future_due_dates() {
        let repo = InMemoryTaskItemRepository::new();
        let due_now = item(-10);
        let due_later = item(3600);
        repo.add(due_now.clone()).await.unwrap();
        repo.add(due_later).await.unwrap();

        let eligible = repo.eligible(Utc::now()).await.unwrap();
        assert_eq!(eligible.len(), 1);
        assert_eq!(eligible[0].id, due_now.id);
    }

    #[tokio::test]
    async fn mark_completed_removes_item_from_eligibility() {
        let repo = InMemoryTaskItemRepository::new();
        let due_now = item(-10);
        repo.add(due_now.clone()).await.unwrap();
        repo.mark_completed(due_now.id).await.unwrap();
        let eligible = repo.eligible(Utc::now()).await.unwrap();
        assert!(eligible.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_item_is_not_found() {
        let repo = InMemoryTaskItemRepository::new();
        let err = repo.delete(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::NotFound);
    }
}
