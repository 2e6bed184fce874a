use chrono::{DateTime, Utc};
use hl7_parser::{ParsedMessage, SegmentSummary};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilePathRequest {
    pub file_path: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RawMessageRequest {
    pub hl7_data: String,
}

/// Envelope shared by every endpoint that returns a parsed message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Hl7Response {
    pub request_id: Uuid,
    pub parsed_at: DateTime<Utc>,
    pub file_path: Option<String>,
    pub message_type: String,
    /// Every line in input order, recognised or not
    pub segments: Vec<SegmentSummary>,
    pub parsed_data: ParsedMessage,
}

impl Hl7Response {
    pub fn new(parsed_data: ParsedMessage, file_path: Option<String>) -> Self {
        Self {
            request_id: Uuid::new_v4(),
            parsed_at: Utc::now(),
            file_path,
            message_type: parsed_data.message_type.clone(),
            segments: parsed_data.segments.clone(),
            parsed_data,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceInfo {
    pub message: String,
    pub version: String,
    pub status: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "lowercase")]
pub enum TestParseResponse {
    Success {
        message_type: String,
        segments: usize,
        test: String,
    },
    Error {
        message: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SftpStatusResponse {
    pub status: String,
    pub username_set: bool,
    pub password_set: bool,
    pub username_preview: String,
    pub hostname: String,
}

impl SftpStatusResponse {
    pub fn new(username: Option<&str>, password_set: bool, hostname: &str) -> Self {
        let username_preview = match username {
            Some(name) => format!("{}***", name.chars().take(3).collect::<String>()),
            None => "Not set".to_string(),
        };

        Self {
            status: "ok".to_string(),
            username_set: username.is_some(),
            password_set,
            username_preview,
            hostname: hostname.to_string(),
        }
    }
}
