use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: i64,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Outcome of an owner-scoped task lookup. A task that exists but belongs to
/// another user is `Denied`, never `Missing` — callers surface the two as
/// different errors.
#[derive(Debug, Clone)]
pub enum TaskLookup {
    Found(Task),
    Missing,
    Denied,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusFilter {
    All,
    Completed,
    Pending,
}

impl StatusFilter {
    pub fn from_arg(value: Option<&str>) -> Self {
        match value {
            Some("completed") => StatusFilter::Completed,
            Some("pending") => StatusFilter::Pending,
            _ => StatusFilter::All,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateTaskRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub completed: Option<bool>,
}

impl Task {
    pub async fn create(
        pool: &sqlx::MySqlPool,
        user_id: &str,
        title: &str,
        description: Option<&str>,
    ) -> Result<Task, sqlx::Error> {
        let now = Utc::now();

        let result = sqlx::query(
            r#"
            INSERT INTO tasks (user_id, title, description, completed, created_at, updated_at)
            VALUES (?, ?, ?, FALSE, ?, ?)
            "#,
        )
        .bind(user_id)
        .bind(title)
        .bind(description)
        .bind(now)
        .bind(now)
        .execute(pool)
        .await?;

        Ok(Task {
            id: result.last_insert_id() as i64,
            user_id: user_id.to_string(),
            title: title.to_string(),
            description: description.map(|d| d.to_string()),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub async fn list_for_owner(
        pool: &sqlx::MySqlPool,
        user_id: &str,
        filter: StatusFilter,
    ) -> Result<Vec<Task>, sqlx::Error> {
        let mut sql = String::from(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE user_id = ?
            "#,
        );
        match filter {
            StatusFilter::Completed => sql.push_str(" AND completed = TRUE"),
            StatusFilter::Pending => sql.push_str(" AND completed = FALSE"),
            StatusFilter::All => {}
        }
        sql.push_str(" ORDER BY created_at ASC, id ASC");

        sqlx::query_as::<_, Task>(&sql)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn find_for_owner(
        pool: &sqlx::MySqlPool,
        id: i64,
        user_id: &str,
    ) -> Result<TaskLookup, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(
            r#"
            SELECT id, user_id, title, description, completed, created_at, updated_at
            FROM tasks
            WHERE id = ?
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(match task {
            None => TaskLookup::Missing,
            Some(task) if task.user_id != user_id => TaskLookup::Denied,
            Some(task) => TaskLookup::Found(task),
        })
    }

    /// Apply the provided fields to an owned task. The write is one UPDATE
    /// statement scoped to (id, user_id), so a failure leaves the row as it
    /// was.
    pub async fn update_for_owner(
        pool: &sqlx::MySqlPool,
        id: i64,
        user_id: &str,
        req: &UpdateTaskRequest,
    ) -> Result<TaskLookup, sqlx::Error> {
        let mut task = match Self::find_for_owner(pool, id, user_id).await? {
            TaskLookup::Found(task) => task,
            other => return Ok(other),
        };

        if let Some(title) = &req.title {
            task.title = title.clone();
        }
        if let Some(description) = &req.description {
            task.description = Some(description.clone());
        }
        if let Some(completed) = req.completed {
            task.completed = completed;
        }

        let now = Utc::now();
        sqlx::query(
            r#"
            UPDATE tasks SET title = ?, description = ?, completed = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.completed)
        .bind(now)
        .bind(task.id)
        .bind(user_id)
        .execute(pool)
        .await?;

        task.updated_at = now;
        Ok(TaskLookup::Found(task))
    }

    /// Delete an owned task; returns the deleted row on success.
    pub async fn delete_for_owner(
        pool: &sqlx::MySqlPool,
        id: i64,
        user_id: &str,
    ) -> Result<TaskLookup, sqlx::Error> {
        let task = match Self::find_for_owner(pool, id, user_id).await? {
            TaskLookup::Found(task) => task,
            other => return Ok(other),
        };

        sqlx::query(r#"DELETE FROM tasks WHERE id = ? AND user_id = ?"#)
            .bind(task.id)
            .bind(user_id)
            .execute(pool)
            .await?;

        Ok(TaskLookup::Found(task))
    }
}
