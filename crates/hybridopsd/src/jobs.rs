//! In-memory job store
//!
//! Jobs are process-lifetime only. Approve and reject are the only guarded
//! transitions: both require `needs_approval`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

pub const DEFAULT_LIST_LIMIT: usize = 100;
pub const MAX_LIST_LIMIT: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    NeedsApproval,
    Approved,
    Rejected,
    Failed,
    Completed,
    Done,
}

impl JobStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::NeedsApproval => "needs_approval",
            JobStatus::Approved => "approved",
            JobStatus::Rejected => "rejected",
            JobStatus::Failed => "failed",
            JobStatus::Completed => "completed",
            JobStatus::Done => "done",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: String,
    pub title: String,
    pub status: JobStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub payload: Option<Value>,
    pub result: Option<Value>,
    pub source: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum JobError {
    #[error("Job not found")]
    NotFound,

    #[error("Cannot {action} job with status '{status}'. Must be 'needs_approval'.")]
    NotAwaitingApproval {
        action: &'static str,
        status: JobStatus,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    #[default]
    CreatedAt,
    UpdatedAt,
    Title,
    Status,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

/// Query string of `GET /jobs`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobQuery {
    pub status: Option<JobStatus>,
    pub search: Option<String>,
    #[serde(default)]
    pub sort: SortField,
    #[serde(default)]
    pub order: SortOrder,
    pub limit: Option<usize>,
    #[serde(default)]
    pub offset: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobCreate {
    pub title: String,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobUpdate {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub payload: Option<Value>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobStatusUpdate {
    pub status: JobStatus,
}

/// Shared job store; clones see the same jobs
#[derive(Clone, Default)]
pub struct JobStore {
    jobs: Arc<RwLock<HashMap<String, Job>>>,
}

impl JobStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn create(&self, title: &str, payload: Option<Value>, source: &str) -> Job {
        let now = Utc::now();
        let job = Job {
            id: Uuid::new_v4().to_string(),
            title: title.to_string(),
            status: JobStatus::Queued,
            created_at: now,
            updated_at: now,
            payload,
            result: None,
            source: source.to_string(),
        };
        self.jobs.write().await.insert(job.id.clone(), job.clone());
        job
    }

    pub async fn get(&self, id: &str) -> Result<Job, JobError> {
        self.jobs.read().await.get(id).cloned().ok_or(JobError::NotFound)
    }

    pub async fn list(&self, query: &JobQuery) -> Vec<Job> {
        let mut jobs: Vec<Job> = {
            let store = self.jobs.read().await;
            store.values().cloned().collect()
        };

        if let Some(status) = query.status {
            jobs.retain(|j| j.status == status);
        }
        if let Some(search) = query.search.as_deref().filter(|s| !s.is_empty()) {
            let needle = search.to_lowercase();
            jobs.retain(|j| j.title.to_lowercase().contains(&needle));
        }

        jobs.sort_by(|a, b| match query.sort {
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
            SortField::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortField::Title => a.title.cmp(&b.title),
            SortField::Status => a.status.as_str().cmp(b.status.as_str()),
        });
        if query.order == SortOrder::Desc {
            jobs.reverse();
        }

        let limit = query
            .limit
            .unwrap_or(DEFAULT_LIST_LIMIT)
            .clamp(1, MAX_LIST_LIMIT);
        jobs.into_iter().skip(query.offset).take(limit).collect()
    }

    pub async fn update(&self, id: &str, update: JobUpdate) -> Result<Job, JobError> {
        self.modify(id, |job| {
            if let Some(title) = update.title {
                job.title = title;
            }
            if let Some(payload) = update.payload {
                job.payload = Some(payload);
            }
            Ok(())
        })
        .await
    }

    /// Unconditional status change (admin control)
    pub async fn set_status(&self, id: &str, status: JobStatus) -> Result<Job, JobError> {
        self.modify(id, |job| {
            job.status = status;
            Ok(())
        })
        .await
    }

    pub async fn approve(&self, id: &str) -> Result<Job, JobError> {
        self.decide(id, "approve", JobStatus::Approved).await
    }

    pub async fn reject(&self, id: &str) -> Result<Job, JobError> {
        self.decide(id, "reject", JobStatus::Rejected).await
    }

    async fn decide(
        &self,
        id: &str,
        action: &'static str,
        outcome: JobStatus,
    ) -> Result<Job, JobError> {
        self.modify(id, |job| {
            if job.status != JobStatus::NeedsApproval {
                return Err(JobError::NotAwaitingApproval {
                    action,
                    status: job.status,
                });
            }
            job.status = outcome;
            Ok(())
        })
        .await
    }

    async fn modify(
        &self,
        id: &str,
        change: impl FnOnce(&mut Job) -> Result<(), JobError>,
    ) -> Result<Job, JobError> {
        let mut jobs = self.jobs.write().await;
        let job = jobs.get_mut(id).ok_or(JobError::NotFound)?;
        change(job)?;
        job.updated_at = Utc::now();
        Ok(job.clone())
    }

    pub async fn len(&self) -> usize {
        self.jobs.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_create_and_get() {
        let store = JobStore::new();
        let job = store.create("Backup", Some(json!({"k": 1})), "api").await;
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(store.get(&job.id).await.unwrap(), job);
        assert_eq!(store.get("missing").await.unwrap_err(), JobError::NotFound);
    }

    #[tokio::test]
    async fn test_approve_requires_needs_approval() {
        let store = JobStore::new();
        let job = store.create("Deploy", None, "api").await;

        let err = store.approve(&job.id).await.unwrap_err();
        assert_eq!(
            err.to_string(),
            "Cannot approve job with status 'queued'. Must be 'needs_approval'."
        );

        store.set_status(&job.id, JobStatus::NeedsApproval).await.unwrap();
        assert_eq!(store.approve(&job.id).await.unwrap().status, JobStatus::Approved);
        assert!(store.reject(&job.id).await.is_err());
    }

    #[tokio::test]
    async fn test_update_keeps_unset_fields() {
        let store = JobStore::new();
        let job = store.create("Old", Some(json!({"a": 1})), "api").await;
        let updated = store
            .update(
                &job.id,
                JobUpdate {
                    title: Some("New".into()),
                    payload: None,
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.title, "New");
        assert_eq!(updated.payload, Some(json!({"a": 1})));
        assert!(updated.updated_at >= job.updated_at);
    }

    #[tokio::test]
    async fn test_list_filter_search_sort_page() {
        let store = JobStore::new();
        for title in ["beta", "Alpha", "gamma", "alphabet"] {
            store.create(title, None, "api").await;
        }
        let first = store.list(&JobQuery::default()).await;
        store.set_status(&first[0].id, JobStatus::Failed).await.unwrap();

        let query = JobQuery {
            search: Some("ALPHA".into()),
            sort: SortField::Title,
            order: SortOrder::Asc,
            ..JobQuery::default()
        };
        let titles: Vec<String> = store.list(&query).await.into_iter().map(|j| j.title).collect();
        assert_eq!(titles, vec!["Alpha", "alphabet"]);

        let failed = JobQuery {
            status: Some(JobStatus::Failed),
            ..JobQuery::default()
        };
        assert_eq!(store.list(&failed).await.len(), 1);

        let page = JobQuery {
            limit: Some(2),
            offset: 3,
            ..JobQuery::default()
        };
        assert_eq!(store.list(&page).await.len(), 1);

        let clamped = JobQuery {
            limit: Some(0),
            ..JobQuery::default()
        };
        assert_eq!(store.list(&clamped).await.len(), 1);
    }

    #[test]
    fn test_status_wire_names() {
        assert_eq!(serde_json::to_value(JobStatus::NeedsApproval).unwrap(), json!("needs_approval"));
        let parsed: JobStatus = serde_json::from_value(json!("done")).unwrap();
        assert_eq!(parsed, JobStatus::Done);
    }
}
