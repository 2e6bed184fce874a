use crate::{ParseError, ParsedMessage};
use std::io::Read;

/// Byte-level entry point for collaborators that hold a reader rather than
/// decoded text (uploads, file handles).
/// Uses Box<dyn Read> to be object-safe (dyn compatible)
pub trait Parser: Send + Sync {
    /// Returns the name of this parser (e.g., "hl7v2")
    fn name(&self) -> &'static str;

    /// Returns the file extensions this parser supports (e.g., ["hl7", "txt"])
    fn extensions(&self) -> &'static [&'static str];

    /// Checks if this parser can handle the given data by inspecting content
    fn can_parse(&self, data: &[u8]) -> bool;

    /// Parse one message from a reader
    fn parse(&self, reader: Box<dyn Read>) -> Result<ParsedMessage, ParseError>;

    fn supports_extension(&self, filename: &str) -> bool {
        filename
            .rsplit_once('.')
            .map(|(_, ext)| {
                self.extensions()
                    .iter()
                    .any(|known| known.eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}
