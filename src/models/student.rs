use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{Collection, Record};
use crate::storage::BlobRef;


pub const MEMBERSHIP_BATCH_FIELD: &str = "teachersInfo.batchId";


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentRecord {
    /// Absent for cash or still-pending payments.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt: Option<BlobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub month: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
}

/// One batch a student belongs to, with that relationship's payment history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MembershipEntry {
    pub batch_id: String,
    #[serde(default)]
    pub teacher_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coaching_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(default)]
    pub payments: Vec<PaymentRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl MembershipEntry {
    pub fn receipts(&self) -> impl Iterator<Item = &BlobRef> {
        self.payments.iter().filter_map(|p| p.receipt.as_ref())
    }
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Student {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<BlobRef>,
    #[serde(default)]
    pub teachers_info: Vec<MembershipEntry>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Student {
    pub fn memberships_in<'a>(&'a self, batch_id: &'a str) -> impl Iterator<Item = &'a MembershipEntry> {
        self.teachers_info.iter().filter(move |m| m.batch_id == batch_id)
    }


    pub fn is_member_of(&self, batch_id: &str) -> bool {
        self.memberships_in(batch_id).next().is_some()
    }

    /// True when `batch_id` is the only batch left, i.e. detaching it would leave an empty shell.
    pub fn only_member_of(&self, batch_id: &str) -> bool {
        !self.teachers_info.is_empty() && self.teachers_info.iter().all(|m| m.batch_id == batch_id)
    }

    /// Drops every membership pointing at `batch_id`, returning them.
    pub fn detach(&mut self, batch_id: &str) -> Vec<MembershipEntry> {
        let (removed, kept): (Vec<_>, Vec<_>) = std::mem::take(&mut self.teachers_info)
            .into_iter()
            .partition(|m| m.batch_id == batch_id);
        self.teachers_info = kept;
        removed
    }


    pub fn is_orphaned(&self) -> bool {
        self.teachers_info.is_empty()
    }
}

impl Record for Student {
    const COLLECTION: Collection = Collection::Students;

    fn id(&self) -> &str {
        &self.id
    }
}
