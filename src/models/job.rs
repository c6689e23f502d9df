//! Background job model.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::{Result, StoreError};

use super::{char_len, is_valid_id, new_id, now_millis};

/// Maximum job type length.
pub const JOB_TYPE_MAX_LENGTH: usize = 32;
/// Maximum serialized data length.
pub const JOB_DATA_MAX_LENGTH: usize = 1024;

/// Job lifecycle status.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Waiting for a worker.
    Pending,
    /// Claimed by a worker.
    InProgress,
    /// Finished successfully.
    Success,
    /// Finished with an error.
    Error,
    /// Cancellation requested, not yet honoured.
    CancelRequested,
    /// Cancelled.
    Canceled,
    /// Finished with warnings.
    Warning,
}

impl JobStatus {
    /// Column encoding.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in_progress",
            Self::Success => "success",
            Self::Error => "error",
            Self::CancelRequested => "cancel_requested",
            Self::Canceled => "canceled",
            Self::Warning => "warning",
        }
    }

    /// Parse the column encoding.
    #[must_use]
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(Self::Pending),
            "in_progress" => Some(Self::InProgress),
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            "cancel_requested" => Some(Self::CancelRequested),
            "canceled" => Some(Self::Canceled),
            "warning" => Some(Self::Warning),
            _ => None,
        }
    }
}

/// A unit of background work.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub struct Job {
    /// Identifier.
    pub id: String,
    /// Job type, e.g. `data_retention`.
    #[serde(rename = "type")]
    pub job_type: String,
    /// Scheduling priority.
    pub priority: i64,
    /// Creation time (ms).
    pub create_at: i64,
    /// Time a worker started the job (ms); zero until started.
    pub start_at: i64,
    /// Last progress or status change (ms).
    pub last_activity_at: i64,
    /// Lifecycle status.
    pub status: JobStatus,
    /// Completion percentage.
    pub progress: i64,
    /// Free-form parameters and results.
    pub data: HashMap<String, String>,
}

impl Job {
    /// Construct a pending job of `job_type`.
    #[must_use]
    pub fn new(job_type: impl Into<String>, data: HashMap<String, String>) -> Self {
        let now = now_millis();
        Self {
            id: new_id(),
            job_type: job_type.into(),
            priority: 0,
            create_at: now,
            start_at: 0,
            last_activity_at: now,
            status: JobStatus::Pending,
            progress: 0,
            data,
        }
    }

    /// Serialized form of [`Job::data`].
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` if the map cannot be serialized.
    pub fn data_json(&self) -> Result<String> {
        serde_json::to_string(&self.data)
            .map_err(|err| StoreError::Validation(format!("job data is not serializable: {err}")))
    }

    /// Validate the job before any statement is issued.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` naming the first invalid field.
    pub fn is_valid(&self) -> Result<()> {
        if !is_valid_id(&self.id) {
            return Err(StoreError::Validation(format!("job id is invalid: {}", self.id)));
        }
        if self.create_at == 0 {
            return Err(StoreError::Validation(format!(
                "job create_at is invalid (id={})",
                self.id
            )));
        }
        if self.job_type.is_empty() || char_len(&self.job_type) > JOB_TYPE_MAX_LENGTH {
            return Err(StoreError::Validation(format!(
                "job type is invalid (id={})",
                self.id
            )));
        }
        if self.data_json()?.len() > JOB_DATA_MAX_LENGTH {
            return Err(StoreError::Validation(format!(
                "job data too long (id={})",
                self.id
            )));
        }
        Ok(())
    }
}
