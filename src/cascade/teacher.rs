use std::sync::Arc;

use tracing::{debug, info, warn};

use super::batch::unwind_batch;
use super::models::{CascadeError, CascadeReport, CascadeWarning, FailureKind};
use super::run::{CascadeOptions, CascadeRun};
use crate::db::{fetch, fetch_many, remove, DocumentStore, Filter};
use crate::models::batch::TEACHER_REF_FIELD;
use crate::models::{Batch, EntityKind, Teacher};
use crate::storage::BlobStore;

/// Deletes a teacher and everything it transitively owns.
///
/// Only a failed teacher load or teacher delete (or a failed read of the
/// teacher's batch list) is an error; everything below that is recorded in
/// the report. The batch list is read before any blob is touched, so a
/// failing store leaves no side effects.
pub async fn delete_teacher(
    docs: &dyn DocumentStore,
    blobs: Arc<dyn BlobStore>,
    options: CascadeOptions,
    teacher_id: &str,
) -> Result<CascadeReport, CascadeError> {
    warn!("Teacher cascade requested for {} - THIS IS IRREVERSIBLE!", teacher_id);

    let teacher = fetch::<Teacher>(docs, teacher_id)
        .await
        .map_err(|e| CascadeError::store("load teacher", e))?
        .ok_or_else(|| CascadeError::not_found(EntityKind::Teacher, teacher_id))?;

    let mut batches = fetch_many::<Batch>(docs, &Filter::eq(TEACHER_REF_FIELD, teacher_id))
        .await
        .map_err(|e| CascadeError::store("load batches", e))?;
    batches.sort_by(|a, b| a.id.cmp(&b.id));
    debug!("Teacher {} owns {} batch(es)", teacher_id, batches.len());

    let mut run = CascadeRun::new(docs, blobs, options, EntityKind::Teacher, teacher_id);

    for batch in &batches {
        unwind_batch(&mut run, batch).await;
    }

    let failed = run.report.batches_failed.len();
    if failed > 0 && options.retain_owner_on_partial_failure {
        warn!(
            "Teacher {} retained: {} batch(es) could not be unwound; re-run to resume",
            teacher_id, failed
        );
        run.report.warnings.push(CascadeWarning {
            failure: FailureKind::OwnerRetained,
            entity: EntityKind::Teacher,
            entity_id: teacher_id.to_string(),
            operation: "delete teacher".to_string(),
            message: format!("{} batch(es) failed; teacher kept so a re-run can resume", failed),
        });
        let report = run.into_report();
        info!("{}", report.message());
        return Ok(report);
    }

    for (kind, blob) in teacher.personal_blobs() {
        run.janitor.queue(EntityKind::Teacher, &teacher.id, kind, blob);
    }
    run.flush_blobs().await;

    let removed = remove(docs, &teacher)
        .await
        .map_err(|e| CascadeError::store("delete teacher", e))?;
    if !removed {
        debug!("Teacher {} was already gone at delete time", teacher_id);
    }
    run.report.root_deleted = true;

    let report = run.into_report();
    info!("{}", report.message());
    Ok(report)
}
