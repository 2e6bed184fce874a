use crate::{assembler::parse_message, base_parser::Parser, ParseError, ParsedMessage};
use std::io::Read;
use tracing::{error, info};

/// HL7 v2.x parser - handles pipe-delimited, segment-per-line messages
pub struct Hl7Parser;

impl Parser for Hl7Parser {
    fn name(&self) -> &'static str {
        "hl7v2"
    }

    fn extensions(&self) -> &'static [&'static str] {
        &["hl7", "txt", "oru"]
    }

    fn can_parse(&self, data: &[u8]) -> bool {
        let sample = String::from_utf8_lossy(data);

        // First non-blank line must be a header segment
        sample
            .lines()
            .map(str::trim)
            .find(|line| !line.is_empty())
            .map(|line| line.starts_with("MSH|"))
            .unwrap_or(false)
    }

    fn parse(&self, mut reader: Box<dyn Read>) -> Result<ParsedMessage, ParseError> {
        let mut buffer = Vec::new();

        if let Err(e) = reader.read_to_end(&mut buffer) {
            error!("Failed to read HL7 data: {}", e);
            return Err(e.into());
        }

        info!("Read {} bytes of HL7 data", buffer.len());

        let text = String::from_utf8(buffer).map_err(|e| {
            error!("HL7 data is not valid UTF-8: {}", e);
            ParseError::from(e)
        })?;

        parse_message(&text)
    }
}
