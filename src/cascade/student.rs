use std::sync::Arc;

use tracing::{info, warn};

use super::models::{CascadeError, CascadeReport, FailureKind};
use super::run::{CascadeOptions, CascadeRun};
use crate::db::{fetch, fetch_many, persist, remove, DocumentStore, Filter, StoreError};
use crate::models::{Assignment, BlobKind, EntityKind, Student};
use crate::storage::BlobStore;

const SUBMISSION_STUDENT_FIELD: &str = "assignments.submissions.studentId";

/// Removes one student outright: picture, every receipt, every submission.
/// Submission entries are pulled from their assignment documents; a failed
/// pull is a warning, a failed record delete is an error.
pub(crate) async fn purge_student(
    run: &mut CascadeRun<'_>,
    student: &Student,
) -> Result<(), (FailureKind, &'static str, StoreError)> {
    let mut assignment_docs =
        fetch_many::<Assignment>(run.docs, &Filter::eq(SUBMISSION_STUDENT_FIELD, student.id.as_str()))
            .await
            .map_err(|e| (FailureKind::StructuralRead, "load submissions", e))?;

    if let Some(pic) = &student.profile_pic {
        run.janitor
            .queue(EntityKind::Student, &student.id, BlobKind::ProfilePicture, pic);
    }
    for membership in &student.teachers_info {
        for receipt in membership.receipts() {
            run.janitor
                .queue(EntityKind::Student, &student.id, BlobKind::PaymentReceipt, receipt);
        }
    }
    for doc in &assignment_docs {
        for submission in doc.submissions_by(&student.id) {
            run.janitor.queue(
                EntityKind::Student,
                &student.id,
                BlobKind::SubmissionFile,
                &submission.blob(),
            );
        }
    }
    run.flush_blobs().await;

    for doc in &mut assignment_docs {
        if doc.withdraw_submissions(&student.id) == 0 {
            continue;
        }
        if let Err(e) = persist(run.docs, &*doc).await {
            run.record_failure(
                FailureKind::StructuralWrite,
                EntityKind::Assignment,
                &doc.id,
                "withdraw submissions",
                &e,
            );
        }
    }

    remove(run.docs, student)
        .await
        .map_err(|e| (FailureKind::StructuralWrite, "delete student", e))?;
    run.mark_deleted(&student.id);
    Ok(())
}


pub async fn delete_student(
    docs: &dyn DocumentStore,
    blobs: Arc<dyn BlobStore>,
    options: CascadeOptions,
    student_id: &str,
) -> Result<CascadeReport, CascadeError> {
    warn!("Student removal requested for {} - THIS IS IRREVERSIBLE!", student_id);

    let student = fetch::<Student>(docs, student_id)
        .await
        .map_err(|e| CascadeError::store("load student", e))?
        .ok_or_else(|| CascadeError::not_found(EntityKind::Student, student_id))?;

    let mut run = CascadeRun::new(docs, blobs, options, EntityKind::Student, student_id);
    purge_student(&mut run, &student)
        .await
        .map_err(|(_, operation, e)| CascadeError::store(operation, e))?;
    run.report.root_deleted = true;

    let report = run.into_report();
    info!("{}", report.message());
    Ok(report)
}
