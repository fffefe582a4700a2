//! Per-batch unit of work.
//!
//! Order within a batch: structural reads, student finalisation (blobs,
//! then the membership write or record delete), batch-level blobs, child
//! records, and finally the batch record. A failed unit keeps its batch
//! record so a later run re-derives the remaining work from the store.

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::models::{CascadeError, CascadeReport, FailureKind};
use super::run::{CascadeOptions, CascadeRun};
use crate::db::{fetch, fetch_many, persist, remove, Collection, DocumentStore, Filter, StoreError};
use crate::models::student::MEMBERSHIP_BATCH_FIELD;
use crate::models::{
    Assignment, Batch, BlobKind, EntityKind, Note, Student, BATCH_REF_FIELD,
};
use crate::storage::BlobStore;

const CHILD_COLLECTIONS: [Collection; 4] = [
    Collection::Notes,
    Collection::Assignments,
    Collection::Quizzes,
    Collection::Messages,
];

struct BatchSnapshot {
    students: Vec<Student>,
    assignments: Vec<Assignment>,
    notes: Vec<Note>,
}

enum StudentAction {
    Delete(Student),
    Detach(Student),
}

async fn load_snapshot(
    docs: &dyn DocumentStore,
    batch_id: &str,
) -> Result<BatchSnapshot, (&'static str, StoreError)> {
    let students = fetch_many::<Student>(docs, &Filter::eq(MEMBERSHIP_BATCH_FIELD, batch_id))
        .await
        .map_err(|e| ("load students", e))?;
    let by_batch = Filter::eq(BATCH_REF_FIELD, batch_id);
    let assignments = fetch_many::<Assignment>(docs, &by_batch)
        .await
        .map_err(|e| ("load assignments", e))?;
    let notes = fetch_many::<Note>(docs, &by_batch)
        .await
        .map_err(|e| ("load notes", e))?;

    Ok(BatchSnapshot {
        students,
        assignments,
        notes,
    })
}

/// Runs the batch unit. Returns whether the batch record was deleted.
pub async fn unwind_batch(run: &mut CascadeRun<'_>, batch: &Batch) -> bool {
    info!("Unwinding batch {} (teacher {})", batch.id, batch.teacher);

    let snapshot = match load_snapshot(run.docs, &batch.id).await {
        Ok(snapshot) => snapshot,
        Err((operation, e)) => {
            run.record_failure(FailureKind::StructuralRead, EntityKind::Batch, &batch.id, operation, &e);
            run.report.batches_failed.push(batch.id.clone());
            return false;
        }
    };
    debug!(
        "Batch {}: {} student(s), {} assignment doc(s), {} note(s)",
        batch.id,
        snapshot.students.len(),
        snapshot.assignments.len(),
        snapshot.notes.len()
    );

    let (actions, mut failed) = plan_students(run, batch, &snapshot).await;
    run.flush_blobs().await;
    failed |= !apply_student_actions(run, &batch.id, actions).await;

    if failed {
        warn!("Batch {} kept: student finalisation incomplete", batch.id);
        run.report.batches_failed.push(batch.id.clone());
        return false;
    }

    if let Some(qr) = &batch.qr_code {
        run.janitor.queue(EntityKind::Batch, &batch.id, BlobKind::QrCode, qr);
    }
    for note in &snapshot.notes {
        run.janitor.queue(EntityKind::Note, &note.id, BlobKind::NoteFile, &note.blob());
    }
    for doc in &snapshot.assignments {
        for item in &doc.assignments {
            if let Some(file) = item.file_blob() {
                run.janitor.queue(EntityKind::Assignment, &doc.id, BlobKind::AssignmentFile, &file);
            }
        }
        // Submissions from students no longer in the batch.
        for submission in doc.all_submissions() {
            run.janitor.queue(
                EntityKind::Assignment,
                &doc.id,
                BlobKind::SubmissionFile,
                &submission.blob(),
            );
        }
    }
    run.flush_blobs().await;

    if !delete_children(run, &batch.id).await {
        run.report.batches_failed.push(batch.id.clone());
        return false;
    }

    match remove(run.docs, batch).await {
        Ok(_) => {
            info!("Batch {} deleted", batch.id);
            run.report.batches_deleted.push(batch.id.clone());
            true
        }
        Err(e) => {
            run.record_failure(FailureKind::StructuralWrite, EntityKind::Batch, &batch.id, "delete batch", &e);
            run.report.batches_failed.push(batch.id.clone());
            false
        }
    }
}

/// Re-reads each listed student and decides its fate, queueing the blobs it releases.
async fn plan_students(
    run: &mut CascadeRun<'_>,
    batch: &Batch,
    snapshot: &BatchSnapshot,
) -> (Vec<StudentAction>, bool) {
    let mut actions = Vec::new();
    let mut failed = false;

    for listed in &snapshot.students {
        if run.is_finalized(&listed.id, &batch.id) {
            debug!("Student {} already finalised for batch {}", listed.id, batch.id);
            continue;
        }

        let student = match fetch::<Student>(run.docs, &listed.id).await {
            Ok(Some(student)) => student,
            Ok(None) => {
                debug!("Student {} vanished before finalisation", listed.id);
                continue;
            }
            Err(e) => {
                run.record_failure(FailureKind::StructuralRead, EntityKind::Student, &listed.id, "load student", &e);
                failed = true;
                continue;
            }
        };
        if !student.is_member_of(&batch.id) {
            debug!("Student {} no longer in batch {}", student.id, batch.id);
            continue;
        }

        for membership in student.memberships_in(&batch.id) {
            for receipt in membership.receipts() {
                run.janitor
                    .queue(EntityKind::Student, &student.id, BlobKind::PaymentReceipt, receipt);
            }
        }
        for doc in &snapshot.assignments {
            for submission in doc.submissions_by(&student.id) {
                run.janitor.queue(
                    EntityKind::Student,
                    &student.id,
                    BlobKind::SubmissionFile,
                    &submission.blob(),
                );
            }
        }

        if student.only_member_of(&batch.id) {
            if let Some(pic) = &student.profile_pic {
                run.janitor
                    .queue(EntityKind::Student, &student.id, BlobKind::ProfilePicture, pic);
            }
            actions.push(StudentAction::Delete(student));
        } else {
            actions.push(StudentAction::Detach(student));
        }
    }

    (actions, failed)
}

async fn apply_student_actions(run: &mut CascadeRun<'_>, batch_id: &str, actions: Vec<StudentAction>) -> bool {
    let mut ok = true;

    for action in actions {
        match action {
            StudentAction::Delete(student) => match remove(run.docs, &student).await {
                Ok(_) => {
                    debug!("Student {} deleted (last membership was batch {})", student.id, batch_id);
                    run.mark_deleted(&student.id);
                }
                Err(e) => {
                    run.record_failure(FailureKind::StructuralWrite, EntityKind::Student, &student.id, "delete student", &e);
                    ok = false;
                }
            },
            StudentAction::Detach(mut student) => {
                student.detach(batch_id);
                match persist(run.docs, &student).await {
                    Ok(()) => {
                        debug!(
                            "Student {} detached from batch {} ({} membership(s) left)",
                            student.id,
                            batch_id,
                            student.teachers_info.len()
                        );
                        run.mark_detached(&student.id, batch_id);
                    }
                    Err(e) => {
                        run.record_failure(FailureKind::StructuralWrite, EntityKind::Student, &student.id, "detach student", &e);
                        ok = false;
                    }
                }
            }
        }
    }

    ok
}

async fn delete_children(run: &mut CascadeRun<'_>, batch_id: &str) -> bool {
    let filter = Filter::eq(BATCH_REF_FIELD, batch_id);
    let mut ok = true;

    for collection in CHILD_COLLECTIONS {
        match run.docs.delete_many(collection, &filter).await {
            Ok(count) => {
                let counts = &mut run.report.children_deleted;
                match collection {
                    Collection::Notes => counts.notes += count,
                    Collection::Assignments => counts.assignments += count,
                    Collection::Quizzes => counts.quizzes += count,
                    Collection::Messages => counts.messages += count,
                    _ => {}
                }
            }
            Err(e) => {
                let operation = format!("delete {}", collection);
                run.record_failure(FailureKind::StructuralWrite, EntityKind::Batch, batch_id, &operation, &e);
                ok = false;
            }
        }
    }

    ok
}


pub async fn delete_batch(
    docs: &dyn DocumentStore,
    blobs: Arc<dyn BlobStore>,
    options: CascadeOptions,
    batch_id: &str,
) -> Result<CascadeReport, CascadeError> {
    warn!("Batch cascade requested for {} - THIS IS IRREVERSIBLE!", batch_id);

    let batch = fetch::<Batch>(docs, batch_id)
        .await
        .map_err(|e| CascadeError::store("load batch", e))?
        .ok_or_else(|| CascadeError::not_found(EntityKind::Batch, batch_id))?;

    let mut run = CascadeRun::new(docs, blobs, options, EntityKind::Batch, batch_id);
    run.report.root_deleted = unwind_batch(&mut run, &batch).await;

    let report = run.into_report();
    info!("{}", report.message());
    Ok(report)
}
