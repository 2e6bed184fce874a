use crate::fields::RawSegment;
use crate::segments::{decode, summarize, Segment};
use crate::types::{
    MessageHeader, Note, Observation, ObservationRequest, Order, ParseError, ParsedMessage,
    Patient, SegmentSummary, UNKNOWN_MESSAGE_TYPE,
};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Parse one HL7 v2.x message into a [`ParsedMessage`].
///
/// Fails only when the text holds no non-blank lines.
pub fn parse_message(text: &str) -> Result<ParsedMessage, ParseError> {
    let lines = normalize_lines(text);
    if lines.is_empty() {
        return Err(ParseError::EmptyMessage);
    }

    info!("Parsing HL7 message with {} segments", lines.len());

    let mut assembler = MessageAssembler::new();
    for line in &lines {
        assembler.push(line);
    }
    let message = assembler.finish();

    info!(
        "HL7 parsing complete: type={}, orders={}, requests={}, observations={}, orphan notes={}",
        message.message_type,
        message.orders.len(),
        message.observation_requests.len(),
        message.observations.len(),
        message.notes.len()
    );

    Ok(message)
}

/// Splits on any of `\r\n`, `\r`, `\n`, trims each line and drops blanks.
pub fn normalize_lines(text: &str) -> Vec<&str> {
    text.split(['\r', '\n'])
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect()
}

/// Single-pass accumulator for one message.
///
/// `current_observation` indexes into `observations`. Only an OBX line moves
/// it, so NTE lines keep attaching to the last observation even when ORC,
/// OBR or unknown segments sit in between.
#[derive(Debug, Default)]
pub struct MessageAssembler {
    header: Option<MessageHeader>,
    patient: Option<Patient>,
    current_observation: Option<usize>,
    orders: Vec<Order>,
    observation_requests: Vec<ObservationRequest>,
    observations: Vec<Observation>,
    notes: Vec<Note>,
    total_segments: usize,
    segment_counts: BTreeMap<String, usize>,
    segments: Vec<SegmentSummary>,
}

impl MessageAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one already-trimmed, non-blank segment line.
    pub fn push(&mut self, line: &str) {
        let raw = RawSegment::split(line);
        self.total_segments += 1;
        let count = self.segment_counts.entry(raw.tag().to_string()).or_insert(0);
        *count += 1;
        self.segments.push(summarize(&raw, *count));

        match decode(&raw) {
            // Repeated MSH lines overwrite, the last one wins.
            Segment::Header(header) => self.header = Some(header),
            Segment::Patient(patient) => self.patient = Some(patient),
            Segment::Order(order) => self.orders.push(order),
            Segment::ObservationRequest(request) => self.observation_requests.push(request),
            Segment::Observation(observation) => {
                self.observations.push(observation);
                self.current_observation = Some(self.observations.len() - 1);
            }
            Segment::Note(note) => self.attach_note(note),
            Segment::Other => debug!("Skipping unrecognized segment '{}'", raw.tag()),
        }
    }

    fn attach_note(&mut self, note: Note) {
        if note.text.is_empty() {
            debug!("Ignoring NTE {} without text", note.set_id);
            return;
        }

        match self.current_observation.and_then(|idx| self.observations.get_mut(idx)) {
            Some(observation) => observation.notes.push(note.text),
            None => self.notes.push(note),
        }
    }

    pub fn finish(self) -> ParsedMessage {
        let message_type = self
            .header
            .as_ref()
            .map(|h| h.message_type.id.clone())
            .unwrap_or_else(|| UNKNOWN_MESSAGE_TYPE.to_string());

        ParsedMessage {
            header: self.header,
            patient: self.patient,
            orders: self.orders,
            observation_requests: self.observation_requests,
            observations: self.observations,
            notes: self.notes,
            message_type,
            total_segments: self.total_segments,
            segment_counts: self.segment_counts,
            segments: self.segments,
        }
    }
}
