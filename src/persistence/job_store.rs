//! Job repository for `SQLite` persistence.
//!
//! Status transitions are compare-and-swap updates: the write only lands if
//! the row still carries the status the caller last observed.

use std::collections::HashMap;
use std::sync::Arc;

use crate::models::job::{Job, JobStatus};
use crate::models::now_millis;
use crate::{Result, StoreError};

use super::db::Database;
use super::dialect::{decode_error, Dialect};

/// Repository wrapping `SQLite` queries for background jobs.
#[derive(Clone)]
pub struct JobStore {
    db: Arc<Database>,
    dialect: Dialect,
}

/// Internal row struct for `SQLite` deserialization.
#[derive(sqlx::FromRow)]
#[sqlx(rename_all = "PascalCase")]
struct JobRow {
    id: String,
    #[sqlx(rename = "Type")]
    job_type: String,
    priority: i64,
    create_at: i64,
    start_at: i64,
    last_activity_at: i64,
    status: String,
    progress: i64,
    data: Option<String>,
}

impl JobRow {
    /// Convert a database row into the domain model.
    fn into_job(self) -> Result<Job> {
        let status = JobStatus::parse(&self.status)
            .ok_or_else(|| decode_error(format!("invalid job status: {}", self.status)))?;
        let data = match self.data.as_deref() {
            None | Some("" | "null") => HashMap::new(),
            Some(raw) => serde_json::from_str(raw).map_err(|err| {
                decode_error(format!("invalid job data for {}: {err}", self.id))
            })?,
        };
        Ok(Job {
            id: self.id,
            job_type: self.job_type,
            priority: self.priority,
            create_at: self.create_at,
            start_at: self.start_at,
            last_activity_at: self.last_activity_at,
            status,
            progress: self.progress,
            data,
        })
    }
}

fn into_jobs(rows: Vec<JobRow>) -> Result<Vec<Job>> {
    rows.into_iter().map(JobRow::into_job).collect()
}

impl JobStore {
    /// Create a new repository instance.
    #[must_use]
    pub fn new(db: Arc<Database>, dialect: Dialect) -> Self {
        Self { db, dialect }
    }

    /// Insert a new job.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the job is invalid and
    /// `StoreError::Conflict` if the id is taken.
    pub async fn save(&self, job: &Job) -> Result<Job> {
        job.is_valid()?;
        sqlx::query(
            "INSERT INTO Jobs (Id, Type, Priority, CreateAt, StartAt, LastActivityAt, Status, Progress, Data)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )
        .bind(&job.id)
        .bind(&job.job_type)
        .bind(job.priority)
        .bind(job.create_at)
        .bind(job.start_at)
        .bind(job.last_activity_at)
        .bind(job.status.as_str())
        .bind(job.progress)
        .bind(job.data_json()?)
        .execute(self.db.as_ref())
        .await
        .map_err(|err| {
            self.dialect
                .write_error(err, || format!("job {} already exists", job.id))
        })?;
        Ok(job.clone())
    }

    /// Write the job's status, data and progress if its stored status is
    /// still `current_status`.
    ///
    /// Returns `false` when the row was missing or had moved on.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn update_optimistically(&self, job: &Job, current_status: JobStatus) -> Result<bool> {
        let result = sqlx::query(
            "UPDATE Jobs SET LastActivityAt = ?1, Status = ?2, Data = ?3, Progress = ?4
             WHERE Id = ?5 AND Status = ?6",
        )
        .bind(now_millis())
        .bind(job.status.as_str())
        .bind(job.data_json()?)
        .bind(job.progress)
        .bind(&job.id)
        .bind(current_status.as_str())
        .execute(self.db.as_ref())
        .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Set the job's status unconditionally and return the updated job.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job does not exist.
    pub async fn update_status(&self, id: &str, status: JobStatus) -> Result<Job> {
        sqlx::query("UPDATE Jobs SET Status = ?1, LastActivityAt = ?2 WHERE Id = ?3")
            .bind(status.as_str())
            .bind(now_millis())
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        self.get(id).await
    }

    /// Move the job from `current` to `new` if it still has `current`.
    ///
    /// Entering [`JobStatus::InProgress`] also stamps `StartAt`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the update fails.
    pub async fn update_status_optimistically(
        &self,
        id: &str,
        current: JobStatus,
        new: JobStatus,
    ) -> Result<bool> {
        let now = now_millis();
        let sql = if new == JobStatus::InProgress {
            "UPDATE Jobs SET LastActivityAt = ?1, Status = ?2, StartAt = ?1 WHERE Id = ?3 AND Status = ?4"
        } else {
            "UPDATE Jobs SET LastActivityAt = ?1, Status = ?2 WHERE Id = ?3 AND Status = ?4"
        };
        let result = sqlx::query(sql)
            .bind(now)
            .bind(new.as_str())
            .bind(id)
            .bind(current.as_str())
            .execute(self.db.as_ref())
            .await?;
        Ok(result.rows_affected() == 1)
    }

    /// Retrieve a job by identifier.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the job does not exist.
    pub async fn get(&self, id: &str) -> Result<Job> {
        let row: Option<JobRow> = sqlx::query_as("SELECT * FROM Jobs WHERE Id = ?1")
            .bind(id)
            .fetch_optional(self.db.as_ref())
            .await?;
        row.ok_or_else(|| StoreError::not_found("job", id))?.into_job()
    }

    /// A page of all jobs, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_page(&self, offset: i64, limit: i64) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> =
            sqlx::query_as("SELECT * FROM Jobs ORDER BY CreateAt DESC LIMIT ?1 OFFSET ?2")
                .bind(limit)
                .bind(offset)
                .fetch_all(self.db.as_ref())
                .await?;
        into_jobs(rows)
    }

    /// Every job of `job_type`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_by_type(&self, job_type: &str) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> =
            sqlx::query_as("SELECT * FROM Jobs WHERE Type = ?1 ORDER BY CreateAt DESC")
                .bind(job_type)
                .fetch_all(self.db.as_ref())
                .await?;
        into_jobs(rows)
    }

    /// A page of jobs of `job_type`, newest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_by_type_page(
        &self,
        job_type: &str,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT * FROM Jobs WHERE Type = ?1 ORDER BY CreateAt DESC LIMIT ?2 OFFSET ?3",
        )
        .bind(job_type)
        .bind(limit)
        .bind(offset)
        .fetch_all(self.db.as_ref())
        .await?;
        into_jobs(rows)
    }

    /// Every job with `status`, oldest first.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_all_by_status(&self, status: JobStatus) -> Result<Vec<Job>> {
        let rows: Vec<JobRow> =
            sqlx::query_as("SELECT * FROM Jobs WHERE Status = ?1 ORDER BY CreateAt ASC")
                .bind(status.as_str())
                .fetch_all(self.db.as_ref())
                .await?;
        into_jobs(rows)
    }

    /// The most recently created job with `status` and `job_type`, if any.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_newest_job_by_status_and_type(
        &self,
        status: JobStatus,
        job_type: &str,
    ) -> Result<Option<Job>> {
        let row: Option<JobRow> = sqlx::query_as(
            "SELECT * FROM Jobs WHERE Status = ?1 AND Type = ?2 ORDER BY CreateAt DESC LIMIT 1",
        )
        .bind(status.as_str())
        .bind(job_type)
        .fetch_optional(self.db.as_ref())
        .await?;
        row.map(JobRow::into_job).transpose()
    }

    /// Number of jobs with `status` and `job_type`.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the query fails.
    pub async fn get_count_by_status_and_type(
        &self,
        status: JobStatus,
        job_type: &str,
    ) -> Result<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM Jobs WHERE Status = ?1 AND Type = ?2")
                .bind(status.as_str())
                .bind(job_type)
                .fetch_one(self.db.as_ref())
                .await?;
        Ok(count)
    }

    /// Remove a job; returns the id that was passed in.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Db` if the delete fails.
    pub async fn delete(&self, id: &str) -> Result<String> {
        sqlx::query("DELETE FROM Jobs WHERE Id = ?1")
            .bind(id)
            .execute(self.db.as_ref())
            .await?;
        Ok(id.to_owned())
    }
}
