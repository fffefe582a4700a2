//! Dry run of the teacher cascade: the same traversal, reads only.

use std::collections::{BTreeSet, HashMap, HashSet};

use tracing::debug;

use super::models::{CascadeError, DeletionPlan};
use crate::db::{fetch, fetch_many, DocumentStore, Filter, StoreError};
use crate::models::batch::TEACHER_REF_FIELD;
use crate::models::student::MEMBERSHIP_BATCH_FIELD;
use crate::models::{Assignment, Batch, EntityKind, Message, Note, Quiz, Student, Teacher, BATCH_REF_FIELD};
use crate::storage::BlobRef;

struct KeyCollector<'b> {
    bucket: &'b str,
    seen: HashSet<String>,
    keys: Vec<String>,
}

impl<'b> KeyCollector<'b> {
    fn new(bucket: &'b str) -> Self {
        Self {
            bucket,
            seen: HashSet::new(),
            keys: Vec::new(),
        }
    }

    fn add(&mut self, blob: &BlobRef) {
        if let Some(key) = blob.resolve_key(self.bucket) {
            if self.seen.insert(key.clone()) {
                self.keys.push(key);
            }
        }
    }
}

fn read(operation: &'static str) -> impl FnOnce(StoreError) -> CascadeError {
    move |e| CascadeError::store(operation, e)
}


pub async fn plan_teacher_deletion(
    docs: &dyn DocumentStore,
    bucket: &str,
    teacher_id: &str,
) -> Result<DeletionPlan, CascadeError> {
    let teacher = fetch::<Teacher>(docs, teacher_id)
        .await
        .map_err(read("load teacher"))?
        .ok_or_else(|| CascadeError::not_found(EntityKind::Teacher, teacher_id))?;

    let mut batches = fetch_many::<Batch>(docs, &Filter::eq(TEACHER_REF_FIELD, teacher_id))
        .await
        .map_err(read("load batches"))?;
    batches.sort_by(|a, b| a.id.cmp(&b.id));

    let mut plan = DeletionPlan {
        teacher_id: teacher_id.to_string(),
        ..Default::default()
    };
    let mut keys = KeyCollector::new(bucket);
    let mut states: HashMap<String, Student> = HashMap::new();
    let mut deleted: BTreeSet<String> = BTreeSet::new();
    let mut detached: BTreeSet<String> = BTreeSet::new();

    for batch in &batches {
        let by_batch = Filter::eq(BATCH_REF_FIELD, batch.id.as_str());
        let students = fetch_many::<Student>(docs, &Filter::eq(MEMBERSHIP_BATCH_FIELD, batch.id.as_str()))
            .await
            .map_err(read("load students"))?;
        let assignments = fetch_many::<Assignment>(docs, &by_batch)
            .await
            .map_err(read("load assignments"))?;
        let notes = fetch_many::<Note>(docs, &by_batch)
            .await
            .map_err(read("load notes"))?;
        let quizzes = fetch_many::<Quiz>(docs, &by_batch)
            .await
            .map_err(read("load quizzes"))?;
        let messages = fetch_many::<Message>(docs, &by_batch)
            .await
            .map_err(read("load messages"))?;

        // Carry each student's membership state across batches, as the real run would.
        for listed in students {
            if deleted.contains(&listed.id) {
                continue;
            }
            let student = states.entry(listed.id.clone()).or_insert(listed);
            if !student.is_member_of(&batch.id) {
                continue;
            }

            for membership in student.memberships_in(&batch.id) {
                membership.receipts().for_each(|r| keys.add(r));
            }
            for doc in &assignments {
                doc.submissions_by(&student.id).for_each(|s| keys.add(&s.blob()));
            }

            if student.only_member_of(&batch.id) {
                if let Some(pic) = &student.profile_pic {
                    keys.add(pic);
                }
                deleted.insert(student.id.clone());
            } else {
                student.detach(&batch.id);
                detached.insert(student.id.clone());
            }
        }

        if let Some(qr) = &batch.qr_code {
            keys.add(qr);
        }
        notes.iter().for_each(|n| keys.add(&n.blob()));
        for doc in &assignments {
            doc.assignments
                .iter()
                .filter_map(|item| item.file_blob())
                .for_each(|f| keys.add(&f));
            doc.all_submissions().for_each(|s| keys.add(&s.blob()));
        }

        plan.batches.push(batch.id.clone());
        plan.children.notes += notes.len();
        plan.children.assignments += assignments.len();
        plan.children.quizzes += quizzes.len();
        plan.children.messages += messages.len();
    }

    for (_, blob) in teacher.personal_blobs() {
        keys.add(blob);
    }

    plan.students_to_detach = detached.difference(&deleted).cloned().collect();
    plan.students_to_delete = deleted.into_iter().collect();
    plan.blob_keys = keys.keys;

    debug!(
        "Plan for teacher {}: {} batch(es), {} student deletion(s), {} blob(s)",
        teacher_id,
        plan.batches.len(),
        plan.students_to_delete.len(),
        plan.blob_keys.len()
    );
    Ok(plan)
}
