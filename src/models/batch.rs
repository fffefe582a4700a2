use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::db::{Collection, Record};
use crate::storage::BlobRef;


pub const TEACHER_REF_FIELD: &str = "teacher";


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Batch {
    #[serde(rename = "_id")]
    pub id: String,
    pub teacher: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    /// Payment instructions shown to students.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<BlobRef>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Record for Batch {
    const COLLECTION: Collection = Collection::Batches;

    fn id(&self) -> &str {
        &self.id
    }
}
