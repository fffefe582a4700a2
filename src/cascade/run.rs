

use std::collections::HashSet;
use std::sync::Arc;

use tracing::error;

use super::janitor::BlobJanitor;
use super::models::{CascadeReport, CascadeWarning, FailureKind};
use crate::db::{DocumentStore, StoreError};
use crate::models::EntityKind;
use crate::storage::BlobStore;


#[derive(Debug, Clone, Copy)]
pub struct CascadeOptions {
    pub blob_concurrency: usize,
    /// Keep the owning record when a dependent unit failed, so a re-run can resume.
    pub retain_owner_on_partial_failure: bool,
}

impl Default for CascadeOptions {
    fn default() -> Self {
        Self {
            blob_concurrency: 4,
            retain_owner_on_partial_failure: true,
        }
    }
}

/// State of a single cascade invocation. Work sets are always re-derived
/// from the store; only dedup bookkeeping lives here.
pub struct CascadeRun<'a> {
    pub(crate) docs: &'a dyn DocumentStore,
    pub(crate) janitor: BlobJanitor,
    pub(crate) report: CascadeReport,
    pub(crate) options: CascadeOptions,
    finalized: HashSet<(String, String)>,
    deleted_students: HashSet<String>,
}

impl<'a> CascadeRun<'a> {
    pub fn new(
        docs: &'a dyn DocumentStore,
        blobs: Arc<dyn BlobStore>,
        options: CascadeOptions,
        root: EntityKind,
        root_id: &str,
    ) -> Self {
        Self {
            docs,
            janitor: BlobJanitor::new(blobs, options.blob_concurrency),
            report: CascadeReport::new(root, root_id),
            options,
            finalized: HashSet::new(),
            deleted_students: HashSet::new(),
        }
    }


    pub async fn flush_blobs(&mut self) {
        let outcomes = self.janitor.flush().await;
        self.report.blob_outcomes.extend(outcomes);
    }


    pub fn is_finalized(&self, student_id: &str, batch_id: &str) -> bool {
        self.is_deleted(student_id)
            || self
                .finalized
                .contains(&(student_id.to_string(), batch_id.to_string()))
    }


    pub fn is_deleted(&self, student_id: &str) -> bool {
        self.deleted_students.contains(student_id)
    }


    pub fn mark_detached(&mut self, student_id: &str, batch_id: &str) {
        self.finalized
            .insert((student_id.to_string(), batch_id.to_string()));
        self.report.students_detached.push(student_id.to_string());
    }


    pub fn mark_deleted(&mut self, student_id: &str) {
        if self.deleted_students.insert(student_id.to_string()) {
            self.report.students_deleted.push(student_id.to_string());
        }
    }


    pub fn record_failure(
        &mut self,
        failure: FailureKind,
        entity: EntityKind,
        entity_id: &str,
        operation: &str,
        err: &StoreError,
    ) {
        error!(
            "{} failed: {} {} during {}: {}",
            failure, entity, entity_id, operation, err
        );
        self.report.warnings.push(CascadeWarning {
            failure,
            entity,
            entity_id: entity_id.to_string(),
            operation: operation.to_string(),
            message: err.to_string(),
        });
    }


    pub fn into_report(self) -> CascadeReport {
        self.report.finish()
    }
}
