use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Sentinel used for `messageType` when no MSH segment was seen
pub const UNKNOWN_MESSAGE_TYPE: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageType {
    pub id: String,
    pub trigger_event: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageHeader {
    pub sending_application: String,
    pub sending_facility: String,
    pub timestamp: String,
    pub message_type: MessageType,
    pub control_id: String,
    pub processing_id: String,
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub character_set: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Address {
    pub street: String,
    pub city: String,
    pub state: String,
    pub zip: String,
    pub country: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Patient {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigning_authority: Option<String>,
    pub last_name: String,
    pub first_name: String,
    pub birth_date: String,
    pub sex: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<Address>,
}

/// Ordering provider as carried in ORC-12 / OBR-16
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Provider {
    pub id: String,
    pub last_name: String,
    pub first_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authority: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub order_control: String,
    pub placer_order_number: String,
    pub filler_order_number: String,
    pub order_date_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_provider: Option<Provider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservationRequest {
    pub panel_code: String,
    pub panel_text: String,
    pub request_date_time: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_date_time: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ordering_provider: Option<Provider>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub set_id: i32,
    pub value_type: String,
    pub code: String,
    pub text: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub coding_system: Option<String>,
    /// Raw OBX-5, no coercion by value type or units
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reference_range: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub abnormal_flags: Option<String>,
    pub status: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub observation_date_time: Option<String>,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// One non-empty field of a segment line
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldSummary {
    pub field_number: usize,
    pub value: String,
    /// Only present when the field carries a `^`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subfields: Option<Vec<String>>,
}

/// Generic view of a segment line, kept for every tag including unrecognised ones
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SegmentSummary {
    pub segment_type: String,
    /// 1-based occurrence of this tag within the message
    pub segment_number: usize,
    pub fields: Vec<FieldSummary>,
}

/// NTE that arrived with no observation to attach to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Note {
    pub set_id: i32,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub header: Option<MessageHeader>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub patient: Option<Patient>,
    pub orders: Vec<Order>,
    pub observation_requests: Vec<ObservationRequest>,
    pub observations: Vec<Observation>,
    pub notes: Vec<Note>,
    pub message_type: String,
    pub total_segments: usize,
    pub segment_counts: BTreeMap<String, usize>,
    pub segments: Vec<SegmentSummary>,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("Empty HL7 message")]
    EmptyMessage,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Message is not valid UTF-8: {0}")]
    InvalidUtf8(#[from] std::string::FromUtf8Error),
}
