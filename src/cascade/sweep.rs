use std::collections::HashMap;
use std::sync::Arc;

use tracing::{debug, info};

use super::batch::unwind_batch;
use super::models::{CascadeError, SweepStats};
use super::run::{CascadeOptions, CascadeRun};
use super::student::purge_student;
use crate::db::{fetch_many, Collection, DocumentStore, Filter};
use crate::models::{Batch, EntityKind, Student};
use crate::storage::BlobStore;

const MEMBERSHIP_LIST_FIELD: &str = "teachersInfo";

/// Reconciles what an interrupted cascade can leave behind: students with
/// no memberships and batches whose teacher is gone.
pub async fn sweep_orphans(
    docs: &dyn DocumentStore,
    blobs: Arc<dyn BlobStore>,
    options: CascadeOptions,
    dry_run: bool,
) -> Result<SweepStats, CascadeError> {
    info!("Starting orphan sweep (dry_run: {})", dry_run);

    let mut stats = SweepStats {
        dry_run,
        ..Default::default()
    };

    debug!("Finding orphaned batches...");
    let orphaned_batches = find_orphaned_batches(docs).await?;
    stats.orphaned_batches = orphaned_batches.len();

    debug!("Finding orphaned students...");
    let orphaned_students = fetch_many::<Student>(docs, &Filter::is_empty(MEMBERSHIP_LIST_FIELD))
        .await
        .map_err(|e| CascadeError::store("find orphaned students", e))?;
    stats.orphaned_students = orphaned_students.len();

    if dry_run {
        info!("Orphan sweep dry run: {:?}", stats);
        return Ok(stats);
    }

    // The run's report stays internal; callers get the sweep stats.
    let mut run = CascadeRun::new(docs, blobs, options, EntityKind::Batch, "orphans");

    for batch in &orphaned_batches {
        if unwind_batch(&mut run, batch).await {
            stats.deleted_batches += 1;
        }
    }

    for student in &orphaned_students {
        if run.is_deleted(&student.id) {
            continue;
        }
        match purge_student(&mut run, student).await {
            Ok(()) => stats.deleted_students += 1,
            Err((failure, operation, e)) => {
                run.record_failure(failure, EntityKind::Student, &student.id, operation, &e);
            }
        }
    }

    let report = run.into_report();
    stats.blob_failures = report.failed_blobs().len();
    stats.warnings = report.warnings;

    info!("Orphan sweep completed: {:?}", stats);
    Ok(stats)
}

async fn find_orphaned_batches(docs: &dyn DocumentStore) -> Result<Vec<Batch>, CascadeError> {
    let batches = fetch_many::<Batch>(docs, &Filter::All)
        .await
        .map_err(|e| CascadeError::store("list batches", e))?;

    let mut teacher_exists: HashMap<String, bool> = HashMap::new();
    let mut orphans = Vec::new();

    for batch in batches {
        let exists = match teacher_exists.get(&batch.teacher) {
            Some(exists) => *exists,
            None => {
                let exists = docs
                    .find_by_id(Collection::Teachers, &batch.teacher)
                    .await
                    .map_err(|e| CascadeError::store("load teacher", e))?
                    .is_some();
                teacher_exists.insert(batch.teacher.clone(), exists);
                exists
            }
        };
        if !exists {
            debug!("Batch {} references missing teacher {}", batch.id, batch.teacher);
            orphans.push(batch);
        }
    }

    orphans.sort_by(|a, b| a.id.cmp(&b.id));
    Ok(orphans)
}
