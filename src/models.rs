//! Request/response types for the backend HTTP API. Shapes mirror the
//! server's schemas; everything crosses the wire as JSON except the
//! multipart upload endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserResponse {
    pub email: String,
    pub token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Contact {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContactDraft {
    pub name: String,
    pub email: String,
}

/// Partial update; omitted fields are left untouched by the server.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ContactPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Group {
    pub id: String,
    pub group_name: String,
    pub contact_ids: Vec<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct GroupDraft {
    pub group_name: String,
    pub contact_ids: Vec<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct GroupPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_ids: Option<Vec<String>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct EmailSend {
    pub subject: String,
    pub body: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_emails: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SendReport {
    #[serde(default)]
    pub message: Option<String>,
    pub recipients: Vec<String>,
    #[serde(default)]
    pub inline_images: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailLog {
    #[serde(default)]
    pub id: Option<String>,
    pub subject: String,
    pub sent_to: Vec<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct AiEmailRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub subject_hint: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audience: Option<String>,
    pub key_points: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AiEmailResponse {
    pub subject: String,
    pub body: String,
}

/// Server-side parse of an uploaded contact file, shown to the user before
/// anything is created.
#[derive(Debug, Clone, Deserialize)]
pub struct ImportPreview {
    pub count: usize,
    pub contacts: Vec<ContactDraft>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BulkCreateRequest {
    pub contacts: Vec<ContactDraft>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub group_id: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct BulkCreateReport {
    pub added_count: usize,
    pub total_processed: usize,
    #[serde(default)]
    pub skipped_count: Option<usize>,
}

/// Recipient selection for the multipart send endpoints.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NewsletterAudience {
    Groups(Vec<String>),
    AllSubscribers,
}
