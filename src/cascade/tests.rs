use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{json, Value};
use strum::IntoEnumIterator;

use super::*;
use crate::db::{Collection, Document, DocumentStore, Filter, MemoryStore, StoreError};
use crate::models::EntityKind;
use crate::storage::MemoryBlobStore;

const BUCKET: &str = "coachhub-files";
const FILE_HOST: &str = "https://coachhub-files.s3.ap-south-1.amazonaws.com";

fn world() -> (Arc<MemoryStore>, Arc<MemoryBlobStore>) {
    (Arc::new(MemoryStore::new()), Arc::new(MemoryBlobStore::new(BUCKET)))
}

fn manager(store: &Arc<MemoryStore>, blobs: &Arc<MemoryBlobStore>, options: CascadeOptions) -> CascadeManager {
    CascadeManager::new(store.clone(), blobs.clone(), options)
}

fn teacher(store: &MemoryStore, id: &str) {
    store.insert(
        Collection::Teachers,
        json!({
            "_id": id,
            "name": format!("Teacher {}", id),
            "profilePic": {"key": format!("profiles/{}.png", id)},
            "subscription": {"plan": "pro", "paymentReceipt": {"key": format!("receipts/{}-active.jpg", id)}},
            "newSubscription": {"plan": "max", "paymentReceipt": {"url": format!("{}/receipts/{}-pending.jpg", FILE_HOST, id)}}
        }),
    );
}

fn batch(store: &MemoryStore, id: &str, teacher: &str) {
    store.insert(
        Collection::Batches,
        json!({
            "_id": id,
            "teacher": teacher,
            "name": format!("Batch {}", id),
            "qrCode": {"key": format!("qr/{}.png", id)}
        }),
    );
}

/// `memberships` are (batch, teacher) pairs; each carries one receipt.
fn student_doc(id: &str, memberships: &[(&str, &str)]) -> Value {
    let teachers_info: Vec<Value> = memberships
        .iter()
        .map(|(batch, teacher)| {
            json!({
                "batchId": batch,
                "teacherId": teacher,
                "coachingName": "Bright Minds",
                "payments": [{"receipt": {"key": format!("receipts/{}-{}.jpg", id, batch)}, "month": "2026-09"}]
            })
        })
        .collect();
    json!({
        "_id": id,
        "name": format!("Student {}", id),
        "profilePic": {"key": format!("profiles/{}.png", id)},
        "teachersInfo": teachers_info
    })
}

fn student(store: &MemoryStore, id: &str, memberships: &[(&str, &str)]) {
    store.insert(Collection::Students, student_doc(id, memberships));
}

fn note(store: &MemoryStore, id: &str, batch: &str) {
    store.insert(
        Collection::Notes,
        json!({"_id": id, "batchId": batch, "title": "Notes", "s3Key": format!("notes/{}.pdf", id)}),
    );
}

fn assignment(store: &MemoryStore, id: &str, batch: &str, submitters: &[&str]) {
    let submissions: Vec<Value> = submitters
        .iter()
        .map(|s| json!({"studentId": s, "fileUrl": format!("{}/subs/{}-{}.pdf", FILE_HOST, s, id)}))
        .collect();
    store.insert(
        Collection::Assignments,
        json!({
            "_id": id,
            "batchId": batch,
            "assignments": [{
                "_id": format!("{}-1", id),
                "title": "Worksheet",
                "fileUrl": format!("{}/assignments/{}.pdf", FILE_HOST, id),
                "fileName": "worksheet.pdf",
                "submissions": submissions
            }]
        }),
    );
}

fn quiz_and_message(store: &MemoryStore, batch: &str) {
    store.insert(Collection::Quizzes, json!({"_id": format!("q-{}", batch), "batchId": batch, "title": "Weekly"}));
    store.insert(Collection::Messages, json!({"_id": format!("m-{}", batch), "batchId": batch, "text": "hello"}));
}

fn populated_batch(store: &MemoryStore, id: &str, teacher: &str) {
    batch(store, id, teacher);
    note(store, &format!("n-{}", id), id);
    quiz_and_message(store, id);
}

fn sorted(keys: Vec<&str>) -> Vec<String> {
    let mut keys: Vec<String> = keys.into_iter().map(str::to_string).collect();
    keys.sort();
    keys
}

#[tokio::test]
async fn test_teacher_without_batches() {
    let (store, blobs) = world();
    teacher(&store, "t1");

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert!(report.is_clean());
    assert_eq!(store.count(Collection::Teachers), 0);
    assert_eq!(store.reads(Collection::Students), 0);
    assert_eq!(
        sorted(report.attempted_blob_keys()),
        vec!["profiles/t1.png", "receipts/t1-active.jpg", "receipts/t1-pending.jpg"]
    );
}

#[tokio::test]
async fn test_missing_teacher_is_not_found() {
    let (store, blobs) = world();

    let err = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("ghost")
        .await
        .unwrap_err();

    assert!(err.is_not_found());
    assert!(blobs.attempts().is_empty());
}

#[tokio::test]
async fn test_teacher_load_failure_has_no_side_effects() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    store.fail_reads(Collection::Teachers, true);

    let err = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap_err();

    assert!(matches!(err, CascadeError::Store { .. }));
    assert!(blobs.attempts().is_empty());
}

#[tokio::test]
async fn test_batch_list_failure_aborts_before_any_delete() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    store.fail_reads(Collection::Batches, true);

    let err = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap_err();

    assert!(matches!(err, CascadeError::Store { .. }));
    assert_eq!(store.count(Collection::Teachers), 1);
    assert!(blobs.attempts().is_empty());
}

#[tokio::test]
async fn test_sole_member_student_is_deleted() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(store.get(Collection::Students, "s1").is_none());
    assert_eq!(report.students_deleted, vec!["s1"]);
    assert_eq!(blobs.attempt_count("profiles/s1.png"), 1);
    assert_eq!(blobs.attempt_count("receipts/s1-a.jpg"), 1);
}

#[tokio::test]
async fn test_multi_member_student_is_detached() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    teacher(&store, "t2");
    populated_batch(&store, "a", "t1");
    batch(&store, "x", "t2");
    batch(&store, "y", "t2");
    student(&store, "s4", &[("a", "t1"), ("x", "t2"), ("y", "t2")]);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    let survivor = store.get(Collection::Students, "s4").unwrap();
    let memberships = survivor["teachersInfo"].as_array().unwrap();
    assert_eq!(memberships.len(), 2);
    assert!(memberships.iter().all(|m| m["batchId"] != "a"));
    assert_eq!(survivor["teachersInfo"][0]["coachingName"], "Bright Minds");

    assert_eq!(report.students_detached, vec!["s4"]);
    assert!(report.students_deleted.is_empty());
    assert_eq!(blobs.attempt_count("receipts/s4-a.jpg"), 1);
    assert_eq!(blobs.attempt_count("receipts/s4-x.jpg"), 0);
    assert_eq!(blobs.attempt_count("profiles/s4.png"), 0);
    assert_eq!(store.count(Collection::Batches), 2);
}

#[tokio::test]
async fn test_notes_and_their_files_are_removed() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "b", "t1");

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(store.get(Collection::Notes, "n-b").is_none());
    assert_eq!(blobs.attempt_count("notes/n-b.pdf"), 1);
    assert_eq!(blobs.attempt_count("qr/b.png"), 1);
    assert_eq!(report.children_deleted.notes, 1);
    assert_eq!(report.children_deleted.quizzes, 1);
    assert_eq!(report.children_deleted.messages, 1);
    assert_eq!(store.count(Collection::Quizzes), 0);
    assert_eq!(store.count(Collection::Messages), 0);
}

#[tokio::test]
async fn test_second_run_is_not_found_without_new_attempts() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);
    let manager = manager(&store, &blobs, CascadeOptions::default());

    manager.delete_teacher("t1").await.unwrap();
    let attempts = blobs.attempts().len();

    let err = manager.delete_teacher("t1").await.unwrap_err();
    assert!(err.is_not_found());
    assert_eq!(blobs.attempts().len(), attempts);
}

#[tokio::test]
async fn test_blob_outage_still_removes_every_record() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);
    assignment(&store, "as-a", "a", &["s1"]);
    blobs.fail_all(true);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert!(report.warnings.is_empty());
    for collection in Collection::iter() {
        assert_eq!(store.count(collection), 0, "{} not emptied", collection);
    }

    let failed = sorted(report.failed_blob_keys());
    assert_eq!(failed, sorted(report.attempted_blob_keys()));
    let mut seen = blobs.attempts();
    seen.sort();
    assert_eq!(failed, seen);
    for key in [
        "profiles/t1.png",
        "receipts/t1-pending.jpg",
        "profiles/s1.png",
        "receipts/s1-a.jpg",
        "subs/s1-as-a.pdf",
        "assignments/as-a.pdf",
        "qr/a.png",
        "notes/n-a.pdf",
    ] {
        assert!(failed.iter().any(|k| k == key), "{} missing from failures", key);
    }
    assert!(report.message().contains("blob failure(s)"));
}

#[tokio::test]
async fn test_student_in_two_cascaded_batches_ends_deleted() {
    let (store, blobs) = world();
    teacher(&store, "t");
    populated_batch(&store, "a", "t");
    populated_batch(&store, "b", "t");
    student(&store, "s1", &[("a", "t")]);
    student(&store, "s2", &[("a", "t"), ("b", "t")]);
    student(&store, "s3", &[("b", "t")]);
    assignment(&store, "as-a", "a", &["s1", "s2"]);
    assignment(&store, "as-b", "b", &["s2", "s3"]);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert!(report.is_clean());
    assert_eq!(store.count(Collection::Students), 0);
    assert_eq!(store.count(Collection::Batches), 0);
    assert_eq!(store.count(Collection::Teachers), 0);
    assert_eq!(store.count(Collection::Assignments), 0);
    assert_eq!(report.batches_deleted, vec!["a", "b"]);
    assert_eq!(report.students_detached, vec!["s2"]);

    let deleted: BTreeSet<&str> = report.students_deleted.iter().map(String::as_str).collect();
    assert_eq!(deleted, BTreeSet::from(["s1", "s2", "s3"]));

    assert_eq!(blobs.attempt_count("profiles/s2.png"), 1);
    assert_eq!(blobs.attempt_count("receipts/s2-a.jpg"), 1);
    assert_eq!(blobs.attempt_count("receipts/s2-b.jpg"), 1);
    assert_eq!(blobs.attempt_count("subs/s2-as-a.pdf"), 1);
    assert_eq!(blobs.attempt_count("subs/s2-as-b.pdf"), 1);
    let attempts = blobs.attempts();
    let unique: BTreeSet<&String> = attempts.iter().collect();
    assert_eq!(unique.len(), attempts.len());
}

#[tokio::test]
async fn test_submission_of_departed_student_is_cleaned() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    assignment(&store, "as-a", "a", &["gone"]);

    manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert_eq!(blobs.attempt_count("subs/gone-as-a.pdf"), 1);
    assert_eq!(blobs.attempt_count("assignments/as-a.pdf"), 1);
}

#[tokio::test]
async fn test_student_read_failure_retains_teacher_then_resumes() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);
    let manager = manager(&store, &blobs, CascadeOptions::default());

    store.fail_reads(Collection::Students, true);
    let report = manager.delete_teacher("t1").await.unwrap();

    assert!(!report.root_deleted);
    assert_eq!(report.batches_failed, vec!["a"]);
    assert!(report.warnings.iter().any(|w| w.failure == FailureKind::StructuralRead));
    assert!(report.warnings.iter().any(|w| w.failure == FailureKind::OwnerRetained));
    assert_eq!(store.count(Collection::Teachers), 1);
    assert_eq!(store.count(Collection::Batches), 1);
    assert_eq!(store.count(Collection::Notes), 1);
    assert!(blobs.attempts().is_empty());

    store.fail_reads(Collection::Students, false);
    let report = manager.delete_teacher("t1").await.unwrap();

    assert!(report.root_deleted);
    assert!(report.is_clean());
    assert_eq!(store.count(Collection::Teachers), 0);
    assert_eq!(store.count(Collection::Students), 0);
    assert_eq!(store.count(Collection::Notes), 0);
}

#[tokio::test]
async fn test_partial_failure_without_retention_deletes_teacher() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);
    store.fail_reads(Collection::Students, true);

    let options = CascadeOptions {
        retain_owner_on_partial_failure: false,
        ..CascadeOptions::default()
    };
    let report = manager(&store, &blobs, options).delete_teacher("t1").await.unwrap();

    assert!(report.root_deleted);
    assert_eq!(report.batches_failed, vec!["a"]);
    assert_eq!(store.count(Collection::Teachers), 0);
}

#[tokio::test]
async fn test_student_write_failure_keeps_batch() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    populated_batch(&store, "b", "t1");
    student(&store, "s1", &[("a", "t1")]);
    store.fail_writes(Collection::Students, true);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert_eq!(report.batches_failed, vec!["a"]);
    assert_eq!(report.batches_deleted, vec!["b"]);
    assert!(report
        .warnings
        .iter()
        .any(|w| w.failure == FailureKind::StructuralWrite && w.entity == EntityKind::Student));
    assert!(store.get(Collection::Batches, "a").is_some());
    assert!(store.get(Collection::Notes, "n-a").is_some());
    assert!(store.get(Collection::Batches, "b").is_none());
    assert_eq!(blobs.attempt_count("qr/a.png"), 0);
    assert_eq!(blobs.attempt_count("qr/b.png"), 1);
    assert_eq!(store.count(Collection::Teachers), 1);
}

#[tokio::test]
async fn test_child_delete_failure_keeps_batch_record() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    store.fail_writes(Collection::Quizzes, true);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert_eq!(report.batches_failed, vec!["a"]);
    assert!(store.get(Collection::Batches, "a").is_some());
    assert!(report.warnings.iter().any(|w| w.operation == "delete quizzes"));
}

#[tokio::test]
async fn test_delete_single_batch() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    populated_batch(&store, "b", "t1");
    student(&store, "s1", &[("a", "t1"), ("b", "t1")]);

    let manager = manager(&store, &blobs, CascadeOptions::default());
    let report = manager.delete_batch("a").await.unwrap();

    assert!(report.root_deleted);
    assert_eq!(report.root, EntityKind::Batch);
    assert!(store.get(Collection::Batches, "a").is_none());
    assert!(store.get(Collection::Batches, "b").is_some());
    assert!(store.get(Collection::Teachers, "t1").is_some());
    let s1 = store.get(Collection::Students, "s1").unwrap();
    assert_eq!(s1["teachersInfo"].as_array().unwrap().len(), 1);

    assert!(manager.delete_batch("a").await.unwrap_err().is_not_found());
}

#[tokio::test]
async fn test_delete_student_withdraws_submissions() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);
    student(&store, "s2", &[("a", "t1")]);
    assignment(&store, "as-a", "a", &["s1", "s2"]);

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_student("s1")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert!(store.get(Collection::Students, "s1").is_none());
    assert!(store.get(Collection::Students, "s2").is_some());
    let doc = store.get(Collection::Assignments, "as-a").unwrap();
    let submissions = doc["assignments"][0]["submissions"].as_array().unwrap();
    assert_eq!(submissions.len(), 1);
    assert_eq!(submissions[0]["studentId"], "s2");
    assert_eq!(
        sorted(report.attempted_blob_keys()),
        vec!["profiles/s1.png", "receipts/s1-a.jpg", "subs/s1-as-a.pdf"]
    );
}

#[tokio::test]
async fn test_plan_matches_run_and_has_no_side_effects() {
    let (store, blobs) = world();
    teacher(&store, "t");
    populated_batch(&store, "a", "t");
    populated_batch(&store, "b", "t");
    teacher(&store, "other");
    batch(&store, "x", "other");
    student(&store, "s1", &[("a", "t")]);
    student(&store, "s2", &[("a", "t"), ("b", "t")]);
    student(&store, "s3", &[("b", "t"), ("x", "other")]);
    assignment(&store, "as-a", "a", &["s1", "s2"]);

    let manager = manager(&store, &blobs, CascadeOptions::default());
    let plan = manager.plan_teacher_deletion("t").await.unwrap();

    assert!(blobs.attempts().is_empty());
    assert_eq!(store.count(Collection::Students), 3);
    assert_eq!(plan.batches, vec!["a", "b"]);
    assert_eq!(plan.students_to_delete, vec!["s1", "s2"]);
    assert_eq!(plan.students_to_detach, vec!["s3"]);
    assert_eq!(plan.children.notes, 2);
    assert_eq!(plan.children.assignments, 1);

    let report = manager.delete_teacher("t").await.unwrap();
    let mut planned = plan.blob_keys.clone();
    planned.sort();
    assert_eq!(planned, sorted(report.attempted_blob_keys()));
    assert!(store.get(Collection::Students, "s3").is_some());
}

#[tokio::test]
async fn test_sweep_orphans() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    populated_batch(&store, "z", "ghost");
    student(&store, "s1", &[("a", "t1")]);
    student(&store, "s10", &[("z", "ghost")]);
    student(&store, "s9", &[]);

    let manager = manager(&store, &blobs, CascadeOptions::default());

    let dry = manager.sweep_orphans(true).await.unwrap();
    assert!(dry.dry_run);
    assert_eq!(dry.orphaned_students, 1);
    assert_eq!(dry.orphaned_batches, 1);
    assert_eq!(dry.deleted_batches, 0);
    assert!(blobs.attempts().is_empty());
    assert_eq!(store.count(Collection::Students), 3);

    let stats = manager.sweep_orphans(false).await.unwrap();
    assert_eq!(stats.deleted_batches, 1);
    assert_eq!(stats.deleted_students, 1);
    assert_eq!(stats.blob_failures, 0);
    assert!(store.get(Collection::Students, "s9").is_none());
    assert!(store.get(Collection::Students, "s10").is_none());
    assert!(store.get(Collection::Batches, "z").is_none());
    assert!(store.get(Collection::Students, "s1").is_some());
    assert!(store.get(Collection::Batches, "a").is_some());
    assert_eq!(blobs.attempt_count("profiles/s9.png"), 1);
    assert_eq!(blobs.attempt_count("qr/z.png"), 1);
}

#[tokio::test]
async fn test_receipt_less_payment_and_key_only_submission() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    store.insert(
        Collection::Students,
        json!({
            "_id": "s1",
            "teachersInfo": [{
                "batchId": "a",
                "payments": [
                    {"month": "2026-08", "status": "cash"},
                    {"month": "2026-09", "receipt": {"key": "receipts/s1-a.jpg"}}
                ]
            }]
        }),
    );
    store.insert(
        Collection::Assignments,
        json!({
            "_id": "as-a",
            "batchId": "a",
            "assignments": [{"_id": "as-a-1", "submissions": [{"studentId": "s1", "s3Key": "subs/s1-key.pdf"}]}]
        }),
    );

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert!(report.is_clean());
    assert!(store.get(Collection::Students, "s1").is_none());
    assert_eq!(blobs.attempt_count("subs/s1-key.pdf"), 1);
    assert_eq!(blobs.attempt_count("receipts/s1-a.jpg"), 1);
}

#[tokio::test]
async fn test_undecodable_student_keeps_batch_for_next_run() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    store.insert(
        Collection::Students,
        json!({"_id": "s5", "name": 42, "teachersInfo": [{"batchId": "a"}]}),
    );

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(!report.root_deleted);
    assert_eq!(report.batches_failed, vec!["a"]);
    let warning = report
        .warnings
        .iter()
        .find(|w| w.failure == FailureKind::StructuralRead)
        .unwrap();
    assert_eq!(warning.operation, "load students");
    assert!(warning.message.contains("s5"));
    assert!(store.get(Collection::Batches, "a").is_some());
}

#[tokio::test]
async fn test_encoded_file_url_deletes_decoded_key() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    batch(&store, "a", "t1");
    store.insert(
        Collection::Notes,
        json!({"_id": "n1", "batchId": "a", "fileUrl": format!("{}/notes/Chapter%201%20Notes.pdf", FILE_HOST)}),
    );

    let report = manager(&store, &blobs, CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert_eq!(blobs.attempt_count("notes/Chapter 1 Notes.pdf"), 1);
    assert!(report.attempted_blob_keys().iter().all(|k| !k.contains('%')));
}

/// Change applied to a student right after a batch's membership query
/// and before the per-student read.
enum Interleave {
    Replace(Value),
    Vanish(&'static str),
}

/// Delegates to a `MemoryStore`, applying one queued change after the
/// next student listing.
struct InterleavedStore {
    inner: Arc<MemoryStore>,
    pending: Mutex<Option<Interleave>>,
}

impl InterleavedStore {
    fn new(inner: Arc<MemoryStore>, change: Interleave) -> Self {
        Self {
            inner,
            pending: Mutex::new(Some(change)),
        }
    }
}

#[async_trait]
impl DocumentStore for InterleavedStore {
    async fn find_by_id(&self, collection: Collection, id: &str) -> Result<Option<Document>, StoreError> {
        self.inner.find_by_id(collection, id).await
    }

    async fn find_many(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError> {
        let docs = self.inner.find_many(collection, filter).await?;
        if collection == Collection::Students {
            let change = self.pending.lock().take();
            match change {
                Some(Interleave::Replace(doc)) => self.inner.insert(Collection::Students, doc),
                Some(Interleave::Vanish(id)) => {
                    self.inner.delete_one(Collection::Students, id).await?;
                }
                None => {}
            }
        }
        Ok(docs)
    }

    async fn delete_one(&self, collection: Collection, id: &str) -> Result<bool, StoreError> {
        self.inner.delete_one(collection, id).await
    }

    async fn delete_many(&self, collection: Collection, filter: &Filter) -> Result<usize, StoreError> {
        self.inner.delete_many(collection, filter).await
    }

    async fn save(&self, collection: Collection, doc: Document) -> Result<(), StoreError> {
        self.inner.save(collection, doc).await
    }
}

#[tokio::test]
async fn test_fresh_read_sees_new_membership() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    teacher(&store, "t2");
    populated_batch(&store, "a", "t1");
    batch(&store, "x", "t2");
    student(&store, "s1", &[("a", "t1")]);

    let joined = student_doc("s1", &[("a", "t1"), ("x", "t2")]);
    let docs = Arc::new(InterleavedStore::new(store.clone(), Interleave::Replace(joined)));
    let report = CascadeManager::new(docs, blobs.clone(), CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert_eq!(report.students_detached, vec!["s1"]);
    assert!(report.students_deleted.is_empty());
    let s1 = store.get(Collection::Students, "s1").unwrap();
    let memberships = s1["teachersInfo"].as_array().unwrap();
    assert_eq!(memberships.len(), 1);
    assert_eq!(memberships[0]["batchId"], "x");
    assert_eq!(blobs.attempt_count("profiles/s1.png"), 0);
    assert_eq!(blobs.attempt_count("receipts/s1-a.jpg"), 1);
    assert_eq!(blobs.attempt_count("receipts/s1-x.jpg"), 0);
}

#[tokio::test]
async fn test_fresh_read_skips_vanished_student() {
    let (store, blobs) = world();
    teacher(&store, "t1");
    populated_batch(&store, "a", "t1");
    student(&store, "s1", &[("a", "t1")]);

    let docs = Arc::new(InterleavedStore::new(store.clone(), Interleave::Vanish("s1")));
    let report = CascadeManager::new(docs, blobs.clone(), CascadeOptions::default())
        .delete_teacher("t1")
        .await
        .unwrap();

    assert!(report.root_deleted);
    assert!(report.is_clean());
    assert!(report.students_deleted.is_empty());
    assert!(report.students_detached.is_empty());
    assert_eq!(blobs.attempt_count("profiles/s1.png"), 0);
    assert_eq!(blobs.attempt_count("receipts/s1-a.jpg"), 0);
    assert_eq!(store.count(Collection::Batches), 0);
}
