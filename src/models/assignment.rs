use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{Collection, Record};
use crate::storage::BlobRef;


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Submission {
    pub student_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s3_key: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Submission {
    pub fn blob(&self) -> BlobRef {
        BlobRef {
            url: self.file_url.clone(),
            key: self.s3_key.clone(),
        }
    }
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssignmentItem {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,
    #[serde(default)]
    pub submissions: Vec<Submission>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl AssignmentItem {
    pub fn file_blob(&self) -> Option<BlobRef> {
        self.file_url.as_ref().map(|url| BlobRef::with_url(url.clone()))
    }
}

/// The per-batch assignment document holding every assignment item.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assignment {
    #[serde(rename = "_id")]
    pub id: String,
    pub batch_id: String,
    #[serde(default)]
    pub assignments: Vec<AssignmentItem>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Assignment {
    pub fn submissions_by<'a>(&'a self, student_id: &'a str) -> impl Iterator<Item = &'a Submission> {
        self.assignments
            .iter()
            .flat_map(|item| item.submissions.iter())
            .filter(move |s| s.student_id == student_id)
    }


    pub fn all_submissions(&self) -> impl Iterator<Item = &Submission> {
        self.assignments.iter().flat_map(|item| item.submissions.iter())
    }

    /// Pulls every submission by `student_id`; returns how many were removed.
    pub fn withdraw_submissions(&mut self, student_id: &str) -> usize {
        let mut removed = 0;
        for item in &mut self.assignments {
            let before = item.submissions.len();
            item.submissions.retain(|s| s.student_id != student_id);
            removed += before - item.submissions.len();
        }
        removed
    }
}

impl Record for Assignment {
    const COLLECTION: Collection = Collection::Assignments;

    fn id(&self) -> &str {
        &self.id
    }
}
