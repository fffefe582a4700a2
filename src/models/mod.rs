//! Records owned by the surrounding CRUD layer, as the cascade sees them.
//! Only the fields the cascade reads are typed; everything else is kept
//! verbatim in `extra` so a read-modify-write never drops data.

pub mod activity;
pub mod assignment;
pub mod batch;
pub mod note;
pub mod student;
pub mod teacher;

use serde::{Deserialize, Serialize};
use strum::{AsRefStr, Display};

pub use activity::{Message, Quiz};
pub use assignment::{Assignment, AssignmentItem, Submission};
pub use batch::Batch;
pub use note::Note;
pub use student::{MembershipEntry, PaymentRecord, Student};
pub use teacher::{Subscription, Teacher};

/// Field name every batch-owned child uses to point at its batch.
pub const BATCH_REF_FIELD: &str = "batchId";


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Teacher,
    Batch,
    Student,
    Assignment,
    Note,
}


#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, AsRefStr, Serialize, Deserialize)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum BlobKind {
    ProfilePicture,
    SubscriptionReceipt,
    PendingSubscriptionReceipt,
    PaymentReceipt,
    SubmissionFile,
    AssignmentFile,
    QrCode,
    NoteFile,
}
