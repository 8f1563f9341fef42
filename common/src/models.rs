use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::db::Document;
use crate::utils::{DonationStatus, RequestStatus, ReviewStatus};

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct User {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub photo: Option<String>,
    // Open set: "user", "charity", "admin", or whatever an admin assigns.
    pub role: String,
}

/// Donor supplied fields of a donation, kept as sent. Only `email`, the
/// lookup key, has a fixed type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DonationDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub food_type: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quantity: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pickup_time: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<Value>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Donation {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(flatten)]
    pub details: DonationDetails,
    pub status: DonationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charity_email: Option<String>,
    pub create_at: DateTime<Utc>,
}

impl Donation {
    pub fn new(details: DonationDetails) -> Self {
        Self {
            id: None,
            details,
            status: DonationStatus::Pending,
            charity_email: None,
            create_at: Utc::now(),
        }
    }
}

/// A charity's claim on a donation. Any extra fields the client sends are
/// stored alongside the known ones.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharityRequest {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub restaurant_email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub donation_id: Option<String>,
    #[serde(default)]
    pub request_status: RequestStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub charity_email: Option<String>,
    #[serde(flatten)]
    pub extra: Document,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CharityRoleRequest {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub user_email: String,
    pub org_name: String,
    pub mission: String,
    pub transaction_id: String,
    pub status: ReviewStatus,
    pub create_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    #[serde(rename = "_id", default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub transaction_id: String,
    pub amount: f64,
    pub date: DateTime<Utc>,
    pub user_email: String,
    pub purpose: String,
    pub status: ReviewStatus,
}
