use std::sync::Arc;
use tracing::info;

use super::batch::delete_batch;
use super::models::{CascadeError, CascadeReport, DeletionPlan, SweepStats};
use super::plan::plan_teacher_deletion;
use super::run::CascadeOptions;
use super::student::delete_student;
use super::sweep::sweep_orphans;
use super::teacher::delete_teacher;
use crate::core::config::CoachConfig;
use crate::db::DocumentStore;
use crate::storage::BlobStore;


pub struct CascadeManager {
    docs: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    options: CascadeOptions,
}

impl CascadeManager {
    pub fn new(docs: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, options: CascadeOptions) -> Self {
        info!("Initializing CascadeManager (bucket {})", blobs.bucket());
        Self { docs, blobs, options }
    }


    pub fn from_config(docs: Arc<dyn DocumentStore>, blobs: Arc<dyn BlobStore>, config: &CoachConfig) -> Self {
        Self::new(
            docs,
            blobs,
            CascadeOptions {
                blob_concurrency: config.blob_concurrency(),
                retain_owner_on_partial_failure: config.retain_teacher_on_partial_failure,
            },
        )
    }


    pub fn options(&self) -> CascadeOptions {
        self.options
    }


    pub async fn delete_teacher(&self, teacher_id: &str) -> Result<CascadeReport, CascadeError> {
        delete_teacher(self.docs.as_ref(), Arc::clone(&self.blobs), self.options, teacher_id).await
    }


    pub async fn delete_batch(&self, batch_id: &str) -> Result<CascadeReport, CascadeError> {
        delete_batch(self.docs.as_ref(), Arc::clone(&self.blobs), self.options, batch_id).await
    }


    pub async fn delete_student(&self, student_id: &str) -> Result<CascadeReport, CascadeError> {
        delete_student(self.docs.as_ref(), Arc::clone(&self.blobs), self.options, student_id).await
    }


    pub async fn plan_teacher_deletion(&self, teacher_id: &str) -> Result<DeletionPlan, CascadeError> {
        plan_teacher_deletion(self.docs.as_ref(), self.blobs.bucket(), teacher_id).await
    }


    pub async fn sweep_orphans(&self, dry_run: bool) -> Result<SweepStats, CascadeError> {
        sweep_orphans(self.docs.as_ref(), Arc::clone(&self.blobs), self.options, dry_run).await
    }
}
