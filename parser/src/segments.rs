use crate::datetime::{format_date, format_date_time};
use crate::fields::{present, RawSegment, COMPONENT_SEPARATOR};
use crate::types::{
    Address, FieldSummary, MessageHeader, MessageType, Note, Observation, ObservationRequest,
    Order, Patient, Provider, SegmentSummary,
};
use tracing::warn;

/// Segment types the assembler understands.
///
/// Every other tag (PV1, SPM, Z-segments, typos) maps to `Other` and is
/// skipped without error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SegmentKind {
    Header,
    Patient,
    Order,
    ObservationRequest,
    Observation,
    Note,
    Other,
}

impl SegmentKind {
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "MSH" => SegmentKind::Header,
            "PID" => SegmentKind::Patient,
            "ORC" => SegmentKind::Order,
            "OBR" => SegmentKind::ObservationRequest,
            "OBX" => SegmentKind::Observation,
            "NTE" => SegmentKind::Note,
            _ => SegmentKind::Other,
        }
    }
}

/// A decoded segment line
#[derive(Debug, Clone, PartialEq)]
pub enum Segment {
    Header(MessageHeader),
    Patient(Patient),
    Order(Order),
    ObservationRequest(ObservationRequest),
    Observation(Observation),
    Note(Note),
    Other,
}

pub fn decode(raw: &RawSegment) -> Segment {
    match SegmentKind::from_tag(raw.tag()) {
        SegmentKind::Header => Segment::Header(decode_header(raw)),
        SegmentKind::Patient => Segment::Patient(decode_patient(raw)),
        SegmentKind::Order => Segment::Order(decode_order(raw)),
        SegmentKind::ObservationRequest => {
            Segment::ObservationRequest(decode_observation_request(raw))
        }
        SegmentKind::Observation => Segment::Observation(decode_observation(raw)),
        SegmentKind::Note => Segment::Note(decode_note(raw)),
        SegmentKind::Other => Segment::Other,
    }
}

pub fn decode_header(raw: &RawSegment) -> MessageHeader {
    MessageHeader {
        sending_application: raw.field(3).to_string(),
        sending_facility: raw.field(4).to_string(),
        timestamp: format_date_time(raw.field(7)),
        message_type: MessageType {
            id: raw.component(9, 0).to_string(),
            trigger_event: raw.component(9, 1).to_string(),
        },
        control_id: raw.field(10).to_string(),
        processing_id: raw.field(11).to_string(),
        version: raw.field(12).to_string(),
        character_set: raw.optional(18),
    }
}

pub fn decode_patient(raw: &RawSegment) -> Patient {
    let address = if raw.field(11).is_empty() {
        None
    } else {
        Some(Address {
            street: raw.component(11, 0).to_string(),
            city: raw.component(11, 2).to_string(),
            state: raw.component(11, 3).to_string(),
            zip: raw.component(11, 4).to_string(),
            country: raw.component(11, 5).to_string(),
        })
    };

    Patient {
        id: raw.component(3, 0).to_string(),
        assigning_authority: raw.optional_component(3, 5),
        last_name: raw.component(5, 0).to_string(),
        first_name: raw.component(5, 1).to_string(),
        birth_date: format_date(raw.field(7)),
        sex: raw.field(8).to_string(),
        phone: raw.optional(13),
        address,
    }
}

pub fn decode_order(raw: &RawSegment) -> Order {
    Order {
        order_control: raw.field(1).to_string(),
        placer_order_number: raw.component(2, 0).to_string(),
        filler_order_number: raw.component(3, 0).to_string(),
        order_date_time: format_date_time(raw.component(7, 3)),
        ordering_provider: decode_provider(raw, 12),
    }
}

pub fn decode_observation_request(raw: &RawSegment) -> ObservationRequest {
    ObservationRequest {
        panel_code: raw.component(4, 0).to_string(),
        panel_text: raw.component(4, 1).to_string(),
        request_date_time: format_date_time(raw.field(7)),
        result_date_time: present(raw.component(27, 3)).map(|ts| format_date_time(&ts)),
        ordering_provider: decode_provider(raw, 16),
    }
}

pub fn decode_observation(raw: &RawSegment) -> Observation {
    Observation {
        set_id: parse_set_id(raw),
        value_type: raw.field(2).to_string(),
        code: raw.component(3, 0).to_string(),
        text: raw.component(3, 1).to_string(),
        coding_system: raw.optional_component(3, 2),
        value: raw.field(5).to_string(),
        units: raw.optional_component(6, 0),
        reference_range: raw.optional(7),
        abnormal_flags: raw.optional(8),
        status: raw.field(11).to_string(),
        observation_date_time: present(raw.field(14)).map(|ts| format_date_time(&ts)),
        notes: Vec::new(),
    }
}

pub fn decode_note(raw: &RawSegment) -> Note {
    Note {
        set_id: parse_set_id(raw),
        text: raw.field(3).to_string(),
    }
}

/// Tag-agnostic view of a line: its non-empty fields, split on `^` where present.
pub fn summarize(raw: &RawSegment, segment_number: usize) -> SegmentSummary {
    let fields = raw
        .numbered_fields()
        .filter(|(_, value)| !value.is_empty())
        .map(|(field_number, value)| FieldSummary {
            field_number,
            value: value.to_string(),
            subfields: value
                .contains(COMPONENT_SEPARATOR)
                .then(|| value.split(COMPONENT_SEPARATOR).map(str::to_string).collect()),
        })
        .collect();

    SegmentSummary {
        segment_type: raw.tag().to_string(),
        segment_number,
        fields,
    }
}

/// XCN layout shared by ORC-12 and OBR-16: id, family, given, ..., authority at 7
fn decode_provider(raw: &RawSegment, n: usize) -> Option<Provider> {
    if raw.field(n).is_empty() {
        return None;
    }
    Some(Provider {
        id: raw.component(n, 0).to_string(),
        last_name: raw.component(n, 1).to_string(),
        first_name: raw.component(n, 2).to_string(),
        authority: raw.optional_component(n, 7),
    })
}

/// Set id from field 1, falling back to 0 when it is not an integer.
fn parse_set_id(raw: &RawSegment) -> i32 {
    let token = raw.field(1).trim();
    if token.is_empty() {
        return 0;
    }
    match token.parse::<i32>() {
        Ok(id) => id,
        Err(e) => {
            warn!("Malformed set id '{}' in {} segment ({}), using 0", token, raw.tag(), e);
            0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn seg(line: &str) -> RawSegment<'_> {
        RawSegment::split(line)
    }

    #[test]
    fn test_segment_kind_from_tag() {
        assert_eq!(SegmentKind::from_tag("MSH"), SegmentKind::Header);
        assert_eq!(SegmentKind::from_tag("NTE"), SegmentKind::Note);
        assert_eq!(SegmentKind::from_tag("PV1"), SegmentKind::Other);
        assert_eq!(SegmentKind::from_tag("obx"), SegmentKind::Other);
        assert_eq!(SegmentKind::from_tag(""), SegmentKind::Other);
    }

    #[test]
    fn test_decode_header() {
        let header = decode_header(&seg(
            "MSH|^~\\&|ANALYTICA|ANALYTICA|||20250925120306||ORU^R01|27061608|P|2.4||||||8859",
        ));
        assert_eq!(header.sending_application, "ANALYTICA");
        assert_eq!(header.sending_facility, "ANALYTICA");
        assert_eq!(header.timestamp, "2025-09-25T12:03:06");
        assert_eq!(header.message_type.id, "ORU");
        assert_eq!(header.message_type.trigger_event, "R01");
        assert_eq!(header.control_id, "27061608");
        assert_eq!(header.processing_id, "P");
        assert_eq!(header.version, "2.4");
        assert_eq!(header.character_set.as_deref(), Some("8859"));
    }

    #[test]
    fn test_decode_header_without_character_set() {
        let header = decode_header(&seg("MSH|^~\\&|TEST|TEST|||20250101120000||ORU^R01|123|P|2.4"));
        assert_eq!(header.character_set, None);
    }

    #[test]
    fn test_decode_patient() {
        let patient = decode_patient(&seg(
            "PID|1||2149273^^^^^ANALYTICA||KALINOVIC^GORAN||19960401|M|||ADR^^CITY^STATE^ZIP^COUNTRY||TEL||",
        ));
        assert_eq!(patient.id, "2149273");
        assert_eq!(patient.assigning_authority.as_deref(), Some("ANALYTICA"));
        assert_eq!(patient.last_name, "KALINOVIC");
        assert_eq!(patient.first_name, "GORAN");
        assert_eq!(patient.birth_date, "1996-04-01");
        assert_eq!(patient.sex, "M");
        assert_eq!(patient.phone.as_deref(), Some("TEL"));

        let address = patient.address.unwrap();
        assert_eq!(address.street, "ADR");
        assert_eq!(address.city, "CITY");
        assert_eq!(address.state, "STATE");
        assert_eq!(address.zip, "ZIP");
        assert_eq!(address.country, "COUNTRY");
    }

    #[test]
    fn test_decode_patient_omits_missing_groups() {
        let patient = decode_patient(&seg("PID|1||12345||DOE^JANE||19800101|F"));
        assert_eq!(patient.assigning_authority, None);
        assert_eq!(patient.address, None);
        assert_eq!(patient.phone, None);
    }

    #[test]
    fn test_decode_order() {
        let order = decode_order(&seg(
            "ORC|NW|0125395972MISC^ANALYTICA|0125395972MISC^ANALYTICA|0125395972^ANALYTICA|CM||^^^20250924183444^^R|||||NICHR^NIEHUS^CHRISTIAN^^^^^ANALYTICA|||",
        ));
        assert_eq!(order.order_control, "NW");
        assert_eq!(order.placer_order_number, "0125395972MISC");
        assert_eq!(order.filler_order_number, "0125395972MISC");
        assert_eq!(order.order_date_time, "2025-09-24T18:34:44");

        let provider = order.ordering_provider.unwrap();
        assert_eq!(provider.id, "NICHR");
        assert_eq!(provider.last_name, "NIEHUS");
        assert_eq!(provider.first_name, "CHRISTIAN");
        assert_eq!(provider.authority.as_deref(), Some("ANALYTICA"));
    }

    #[test]
    fn test_decode_order_without_provider() {
        let order = decode_order(&seg("ORC|NW|123"));
        assert_eq!(order.ordering_provider, None);
        assert_eq!(order.order_date_time, "");
    }

    #[test]
    fn test_decode_observation_request() {
        let request = decode_observation_request(&seg(
            "OBR|0|0125395972MISC^ANALYTICA|0125395972MISC^ANALYTICA|MISC^ANALYTICA||20250924183444|20250924190000|||||||||NICHR^NIEHUS^CHRISTIAN^^^^^ANALYTICA|||||||||||^^^20250924183444^^R",
        ));
        assert_eq!(request.panel_code, "MISC");
        assert_eq!(request.panel_text, "ANALYTICA");
        assert_eq!(request.request_date_time, "2025-09-24T19:00:00");
        assert_eq!(request.result_date_time.as_deref(), Some("2025-09-24T18:34:44"));
        assert_eq!(request.ordering_provider.unwrap().id, "NICHR");
    }

    #[test]
    fn test_decode_observation_request_without_optional_groups() {
        let request = decode_observation_request(&seg("OBR|1|||CBC^Blood count||20250101|20250102"));
        assert_eq!(request.panel_code, "CBC");
        assert_eq!(request.request_date_time, "2025-01-02");
        assert_eq!(request.ordering_provider, None);
        assert_eq!(request.result_date_time, None);
    }

    #[test]
    fn test_decode_observation() {
        let obs = decode_observation(&seg(
            "OBX|1|NM|TEST^Test Result^TEST||10.5|mg/dl^^L|5.0-15.0|H|||F|||20250101120000",
        ));
        assert_eq!(obs.set_id, 1);
        assert_eq!(obs.value_type, "NM");
        assert_eq!(obs.code, "TEST");
        assert_eq!(obs.text, "Test Result");
        assert_eq!(obs.coding_system.as_deref(), Some("TEST"));
        assert_eq!(obs.value, "10.5");
        assert_eq!(obs.units.as_deref(), Some("mg/dl"));
        assert_eq!(obs.reference_range.as_deref(), Some("5.0-15.0"));
        assert_eq!(obs.abnormal_flags.as_deref(), Some("H"));
        assert_eq!(obs.status, "F");
        assert_eq!(obs.observation_date_time.as_deref(), Some("2025-01-01T12:00:00"));
        assert!(obs.notes.is_empty());
    }

    #[test]
    fn test_observation_value_is_kept_raw() {
        let obs = decode_observation(&seg("OBX|10|NM|CRP^CRP^ANALYTICA||<0.6|mg/l^^L|<5||||F"));
        assert_eq!(obs.value, "<0.6");
        assert_eq!(obs.reference_range.as_deref(), Some("<5"));
        assert_eq!(obs.abnormal_flags, None);
    }

    #[test]
    fn test_malformed_set_id_defaults_to_zero() {
        assert_eq!(decode_observation(&seg("OBX|x|NM|A")).set_id, 0);
        assert_eq!(decode_observation(&seg("OBX|1.5|NM|A")).set_id, 0);
        assert_eq!(decode_observation(&seg("OBX||NM|A")).set_id, 0);
        assert_eq!(decode_note(&seg("NTE|abc||text")).set_id, 0);
    }

    #[test]
    fn test_negative_set_id_is_kept() {
        assert_eq!(decode_observation(&seg("OBX|-3|NM|A")).set_id, -3);
        assert_eq!(decode_note(&seg("NTE|-3||text")).set_id, -3);
    }

    #[test]
    fn test_malformed_set_id_logs_warning() {
        use std::io::Write;
        use std::sync::{Arc, Mutex};

        struct Capture(Arc<Mutex<Vec<u8>>>);

        impl Write for Capture {
            fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> std::io::Result<()> {
                Ok(())
            }
        }

        let logs = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&logs);
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || Capture(Arc::clone(&sink)))
            .with_ansi(false)
            .finish();

        let obs = tracing::subscriber::with_default(subscriber, || {
            decode_observation(&seg("OBX|abc|NM|A"))
        });
        assert_eq!(obs.set_id, 0);

        let output = String::from_utf8(logs.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"));
        assert!(output.contains("Malformed set id 'abc' in OBX segment"));
    }

    #[test]
    fn test_summarize() {
        let summary = summarize(&seg("PV1|1||U|ward^bed"), 2);
        assert_eq!(summary.segment_type, "PV1");
        assert_eq!(summary.segment_number, 2);
        assert_eq!(
            summary.fields,
            vec![
                FieldSummary {
                    field_number: 1,
                    value: "1".to_string(),
                    subfields: None,
                },
                FieldSummary {
                    field_number: 3,
                    value: "U".to_string(),
                    subfields: None,
                },
                FieldSummary {
                    field_number: 4,
                    value: "ward^bed".to_string(),
                    subfields: Some(vec!["ward".to_string(), "bed".to_string()]),
                },
            ]
        );
    }

    #[test]
    fn test_summarize_header_uses_hl7_numbers() {
        let summary = summarize(&seg("MSH|^~\\&|TEST|FAC|||20250101||ORU^R01"), 1);
        let numbers: Vec<_> = summary.fields.iter().map(|f| f.field_number).collect();
        assert_eq!(numbers, vec![2, 3, 4, 7, 9]);
        assert_eq!(summary.fields[4].subfields.as_deref(), Some(&["ORU".to_string(), "R01".to_string()][..]));
    }

    #[test]
    fn test_decode_note() {
        let note = decode_note(&seg("NTE|2||Werte < 30 ug/l|R"));
        assert_eq!(note.set_id, 2);
        assert_eq!(note.text, "Werte < 30 ug/l");
    }

    #[test]
    fn test_decode_dispatch() {
        assert!(matches!(decode(&seg("OBX|1|NM|A")), Segment::Observation(_)));
        assert!(matches!(decode(&seg("PV1|1|U")), Segment::Other));
    }
}
