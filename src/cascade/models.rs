use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use strum::Display;
use thiserror::Error;
use uuid::Uuid;

use crate::db::StoreError;
use crate::models::{BlobKind, EntityKind};

/// One delete request sent to the blob store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobOutcome {
    pub entity: EntityKind,
    pub entity_id: String,
    pub kind: BlobKind,
    pub key: String,
    pub error: Option<String>,
}

impl BlobOutcome {
    pub fn succeeded(&self) -> bool {
        self.error.is_none()
    }
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    StructuralRead,
    StructuralWrite,
    OwnerRetained,
}

/// A non-fatal document-store failure recorded during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CascadeWarning {
    pub failure: FailureKind,
    pub entity: EntityKind,
    pub entity_id: String,
    pub operation: String,
    pub message: String,
}


#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChildCounts {
    pub notes: usize,
    pub assignments: usize,
    pub quizzes: usize,
    pub messages: usize,
}

impl ChildCounts {
    pub fn total(&self) -> usize {
        self.notes + self.assignments + self.quizzes + self.messages
    }
}


#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CascadeReport {
    pub run_id: Uuid,
    pub root: EntityKind,
    pub root_id: String,
    pub root_deleted: bool,
    pub batches_deleted: Vec<String>,
    pub batches_failed: Vec<String>,
    pub students_deleted: Vec<String>,
    pub students_detached: Vec<String>,
    pub children_deleted: ChildCounts,
    pub blob_outcomes: Vec<BlobOutcome>,
    pub warnings: Vec<CascadeWarning>,
    pub started_at: DateTime<Utc>,
    pub finished_at: Option<DateTime<Utc>>,
}

impl CascadeReport {
    pub fn new(root: EntityKind, root_id: &str) -> Self {
        Self {
            run_id: Uuid::new_v4(),
            root,
            root_id: root_id.to_string(),
            root_deleted: false,
            batches_deleted: Vec::new(),
            batches_failed: Vec::new(),
            students_deleted: Vec::new(),
            students_detached: Vec::new(),
            children_deleted: ChildCounts::default(),
            blob_outcomes: Vec::new(),
            warnings: Vec::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }


    pub fn attempted_blob_keys(&self) -> Vec<&str> {
        self.blob_outcomes.iter().map(|o| o.key.as_str()).collect()
    }


    pub fn failed_blobs(&self) -> Vec<&BlobOutcome> {
        self.blob_outcomes.iter().filter(|o| !o.succeeded()).collect()
    }


    pub fn failed_blob_keys(&self) -> Vec<&str> {
        self.failed_blobs().into_iter().map(|o| o.key.as_str()).collect()
    }

    /// No blob failure and no structural warning.
    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty() && self.blob_outcomes.iter().all(BlobOutcome::succeeded)
    }


    pub fn message(&self) -> String {
        let mut msg = if self.root_deleted {
            format!("{} {} deleted", self.root, self.root_id)
        } else {
            format!("{} {} retained", self.root, self.root_id)
        };
        msg.push_str(&format!(
            ": {} batch(es), {} student(s) removed, {} detached, {} child record(s), {} blob(s)",
            self.batches_deleted.len(),
            self.students_deleted.len(),
            self.students_detached.len(),
            self.children_deleted.total(),
            self.blob_outcomes.len(),
        ));

        let failed_blobs = self.failed_blobs().len();
        if failed_blobs > 0 || !self.warnings.is_empty() {
            msg.push_str(&format!(
                " ({} blob failure(s), {} warning(s); check logs for run {})",
                failed_blobs,
                self.warnings.len(),
                self.run_id
            ));
        }
        msg
    }

    pub(crate) fn finish(mut self) -> Self {
        self.finished_at = Some(Utc::now());
        self
    }
}


#[derive(Debug, Error)]
pub enum CascadeError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: EntityKind, id: String },
    #[error("Document store failure during {operation}: {source}")]
    Store {
        operation: String,
        #[source]
        source: StoreError,
    },
}

impl CascadeError {
    pub fn not_found(entity: EntityKind, id: &str) -> Self {
        Self::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn store(operation: impl Into<String>, source: StoreError) -> Self {
        Self::Store {
            operation: operation.into(),
            source,
        }
    }


    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// What a teacher deletion would touch, computed without side effects.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DeletionPlan {
    pub teacher_id: String,
    pub batches: Vec<String>,
    pub students_to_delete: Vec<String>,
    pub students_to_detach: Vec<String>,
    pub children: ChildCounts,
    pub blob_keys: Vec<String>,
}


#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepStats {
    pub dry_run: bool,
    pub orphaned_students: usize,
    pub orphaned_batches: usize,
    pub deleted_students: usize,
    pub deleted_batches: usize,
    pub blob_failures: usize,
    pub warnings: Vec<CascadeWarning>,
}
