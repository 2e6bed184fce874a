// Parser crate for HL7 v2.x messages
// Field access, date normalization, per-segment decoders and the message assembler

pub mod types;
pub mod fields;
pub mod datetime;
pub mod segments;
pub mod assembler;
pub mod base_parser;

pub mod hl7_parser;

// Re-export main types
pub use types::*;
pub use assembler::{parse_message, MessageAssembler};
pub use base_parser::Parser;
pub use datetime::{format_date, format_date_time};
pub use fields::RawSegment;
pub use segments::SegmentKind;

pub use hl7_parser::Hl7Parser;

/// Core entry point, same as [`parse_message`]
pub fn parse(text: &str) -> Result<ParsedMessage, ParseError> {
    parse_message(text)
}
