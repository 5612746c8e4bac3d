//! SQLite generation task repository implementation.
//!
//! Status changes go through `transition`, a conditional UPDATE that only
//! matches rows still in the expected status. Combined with the single
//! writer connection this gives each task a race-free compare-and-set.

use aichat_core::generation::repository::TaskRepository;
use aichat_types::error::RepositoryError;
use aichat_types::generation::{
    GenerationTask, KindFilter, TaskKind, TaskResult, TaskStatus, WorkQuery,
};
use chrono::Utc;
use serde_json::Value;
use sqlx::Row;

use super::pool::DatabasePool;
use super::{format_datetime, parse_datetime};

/// SQLite-backed implementation of `TaskRepository`.
pub struct SqliteTaskRepository {
    pool: DatabasePool,
}

impl SqliteTaskRepository {
    /// Create a new repository backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }
}

/// Internal row type for mapping SQLite rows to domain GenerationTask.
struct TaskRow {
    task_id: String,
    owner_id: String,
    kind: i64,
    params: String,
    status: i64,
    result: Option<String>,
    created_at: String,
    updated_at: String,
}

impl TaskRow {
    fn from_row(row: &sqlx::sqlite::SqliteRow) -> Result<Self, sqlx::Error> {
        Ok(Self {
            task_id: row.try_get("task_id")?,
            owner_id: row.try_get("owner_id")?,
            kind: row.try_get("kind")?,
            params: row.try_get("params")?,
            status: row.try_get("status")?,
            result: row.try_get("result")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }

    fn into_task(self) -> Result<GenerationTask, RepositoryError> {
        let kind = TaskKind::from_code(self.kind).map_err(RepositoryError::Query)?;
        let status = TaskStatus::from_code(self.status).map_err(RepositoryError::Query)?;
        let params: Value = serde_json::from_str(&self.params)
            .map_err(|e| RepositoryError::Query(format!("invalid params json: {e}")))?;
        let result = self
            .result
            .as_deref()
            .map(serde_json::from_str::<TaskResult>)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("invalid result json: {e}")))?;

        Ok(GenerationTask {
            task_id: self.task_id,
            owner_id: self.owner_id,
            kind,
            params,
            status,
            result,
            created_at: parse_datetime(&self.created_at)?,
            updated_at: parse_datetime(&self.updated_at)?,
        })
    }
}

const TASK_COLUMNS: &str =
    "task_id, owner_id, kind, params, status, result, created_at, updated_at";

/// WHERE clause for the work list. Only fixed fragments are interpolated;
/// values are bound in the order: owner, then kind when filtered.
fn works_filter(query: &WorkQuery) -> String {
    let mut clause = String::from("owner_id = ? AND status IN (0, 1)");
    if matches!(query.kind, KindFilter::Only(_)) {
        clause.push_str(" AND kind = ?");
    }
    if query.hide_personal_uploads {
        clause.push_str(" AND params != '{}'");
    }
    clause
}

impl TaskRepository for SqliteTaskRepository {
    async fn create(&self, task: &GenerationTask) -> Result<(), RepositoryError> {
        let params = serde_json::to_string(&task.params)
            .map_err(|e| RepositoryError::Query(format!("failed to encode params: {e}")))?;
        let result = task
            .result
            .as_ref()
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("failed to encode result: {e}")))?;

        sqlx::query(&format!(
            "INSERT INTO generation_tasks ({TASK_COLUMNS}) VALUES (?, ?, ?, ?, ?, ?, ?, ?)"
        ))
        .bind(&task.task_id)
        .bind(&task.owner_id)
        .bind(task.kind.code())
        .bind(&params)
        .bind(task.status.code())
        .bind(result)
        .bind(format_datetime(&task.created_at))
        .bind(format_datetime(&task.updated_at))
        .execute(&self.pool.writer)
        .await
        .map_err(|e| {
            if e.to_string().contains("UNIQUE constraint failed") {
                RepositoryError::Conflict(format!("task '{}' already exists", task.task_id))
            } else {
                RepositoryError::Query(e.to_string())
            }
        })?;

        Ok(())
    }

    async fn find(
        &self,
        task_id: &str,
        owner_id: &str,
    ) -> Result<Option<GenerationTask>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {TASK_COLUMNS} FROM generation_tasks WHERE task_id = ? AND owner_id = ?"
        ))
        .bind(task_id)
        .bind(owner_id)
        .fetch_optional(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        match row {
            Some(row) => {
                let task_row =
                    TaskRow::from_row(&row).map_err(|e| RepositoryError::Query(e.to_string()))?;
                Ok(Some(task_row.into_task()?))
            }
            None => Ok(None),
        }
    }

    async fn transition(
        &self,
        task_id: &str,
        from: TaskStatus,
        to: TaskStatus,
        result: Option<&TaskResult>,
    ) -> Result<bool, RepositoryError> {
        let encoded = result
            .map(serde_json::to_string)
            .transpose()
            .map_err(|e| RepositoryError::Query(format!("failed to encode result: {e}")))?;

        let outcome = sqlx::query(
            "UPDATE generation_tasks
             SET status = ?, result = COALESCE(?, result), updated_at = ?
             WHERE task_id = ? AND status = ?",
        )
        .bind(to.code())
        .bind(encoded)
        .bind(format_datetime(&Utc::now()))
        .bind(task_id)
        .bind(from.code())
        .execute(&self.pool.writer)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        Ok(outcome.rows_affected() == 1)
    }

    async fn list_works(
        &self,
        owner_id: &str,
        query: &WorkQuery,
    ) -> Result<(Vec<GenerationTask>, u64), RepositoryError> {
        let filter = works_filter(query);
        let kind_code = match query.kind {
            KindFilter::Only(kind) => Some(kind.code()),
            KindFilter::All => None,
        };

        let count_sql = format!("SELECT COUNT(*) AS total FROM generation_tasks WHERE {filter}");
        let mut count_query = sqlx::query(&count_sql).bind(owner_id);
        if let Some(code) = kind_code {
            count_query = count_query.bind(code);
        }
        let total: i64 = count_query
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .try_get("total")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let page_sql = format!(
            "SELECT {TASK_COLUMNS} FROM generation_tasks WHERE {filter}
             ORDER BY created_at DESC, rowid DESC LIMIT ? OFFSET ?"
        );
        let offset = i64::from(query.page.saturating_sub(1)) * i64::from(query.page_size);
        let mut page_query = sqlx::query(&page_sql).bind(owner_id);
        if let Some(code) = kind_code {
            page_query = page_query.bind(code);
        }
        let rows = page_query
            .bind(i64::from(query.page_size))
            .bind(offset)
            .fetch_all(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in &rows {
            let task_row =
                TaskRow::from_row(row).map_err(|e| RepositoryError::Query(e.to_string()))?;
            tasks.push(task_row.into_task()?);
        }

        Ok((tasks, total.max(0) as u64))
    }
}
