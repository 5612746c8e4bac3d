//! TaskRepository trait definition.

use aichat_types::error::RepositoryError;
use aichat_types::generation::{GenerationTask, TaskResult, TaskStatus, WorkQuery};

/// Repository trait for generation task persistence.
///
/// Implementations live in aichat-infra (e.g., `SqliteTaskRepository`).
pub trait TaskRepository: Send + Sync {
    /// Persist a newly submitted task.
    fn create(
        &self,
        task: &GenerationTask,
    ) -> impl std::future::Future<Output = Result<(), RepositoryError>> + Send;

    /// Find a task by upstream id, scoped to its owner.
    fn find(
        &self,
        task_id: &str,
        owner_id: &str,
    ) -> impl std::future::Future<Output = Result<Option<GenerationTask>, RepositoryError>> + Send;

    /// Move a task from `from` to `to`, storing `result`.
    ///
    /// Compare-and-set: returns `false` without writing when the stored
    /// status is no longer `from`.
    fn transition(
        &self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
        result: Option<&TaskResult>,
    ) -> impl std::future::Future<Output = Result<bool, RepositoryError>> + Send;

    /// One page of the owner's works, newest first, plus the total row count.
    ///
    /// Only pending and succeeded tasks are listed.
    fn list_works(
        &self,
        owner_id: &str,
        query: &WorkQuery,
    ) -> impl std::future::Future<Output = Result<(Vec<GenerationTask>, u64), RepositoryError>> + Send;
}
