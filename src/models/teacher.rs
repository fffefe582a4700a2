use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::BlobKind;
use crate::db::{Collection, Record};
use crate::storage::BlobRef;


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub plan: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payment_receipt: Option<BlobRef>,
}


#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Teacher {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile_pic: Option<BlobRef>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscription: Option<Subscription>,
    /// Plan change awaiting admin approval.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_subscription: Option<Subscription>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Teacher {
    /// Profile picture plus the active and pending subscription receipts.
    pub fn personal_blobs(&self) -> Vec<(BlobKind, &BlobRef)> {
        let mut blobs = Vec::with_capacity(3);
        if let Some(pic) = &self.profile_pic {
            blobs.push((BlobKind::ProfilePicture, pic));
        }
        if let Some(receipt) = self.subscription.as_ref().and_then(|s| s.payment_receipt.as_ref()) {
            blobs.push((BlobKind::SubscriptionReceipt, receipt));
        }
        if let Some(receipt) = self
            .new_subscription
            .as_ref()
            .and_then(|s| s.payment_receipt.as_ref())
        {
            blobs.push((BlobKind::PendingSubscriptionReceipt, receipt));
        }
        blobs
    }
}

impl Record for Teacher {
    const COLLECTION: Collection = Collection::Teachers;

    fn id(&self) -> &str {
        &self.id
    }
}
