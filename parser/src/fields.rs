//! Indexed field and component lookup over one segment line.
//!
//! Positions follow HL7's own 1-based numbering, with position 0 holding the
//! segment tag. Anything out of range reads as an empty string.

pub const FIELD_SEPARATOR: char = '|';
pub const COMPONENT_SEPARATOR: char = '^';

const HEADER_TAG: &str = "MSH";

/// One segment line split on `|`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawSegment<'a> {
    fields: Vec<&'a str>,
}

impl<'a> RawSegment<'a> {
    pub fn split(line: &'a str) -> Self {
        Self {
            fields: line.split(FIELD_SEPARATOR).collect(),
        }
    }

    pub fn tag(&self) -> &'a str {
        self.fields.first().copied().unwrap_or("")
    }

    /// Returns field `n`, or `""` when the segment is shorter than that.
    ///
    /// MSH-1 is the field separator itself, so in a header the separator
    /// occupies position 1 and every later field sits one split slot to the
    /// left of its HL7 number.
    pub fn field(&self, n: usize) -> &'a str {
        if n == 0 {
            return self.tag();
        }

        let slot = if self.tag() == HEADER_TAG {
            if n == 1 {
                return "|";
            }
            n - 1
        } else {
            n
        };

        self.fields.get(slot).copied().unwrap_or("")
    }

    pub fn component(&self, n: usize, index: usize) -> &'a str {
        subfield(self.field(n), index)
    }

    /// `None` when field `n` is absent or blank
    pub fn optional(&self, n: usize) -> Option<String> {
        present(self.field(n))
    }

    pub fn optional_component(&self, n: usize, index: usize) -> Option<String> {
        present(self.component(n, index))
    }

    /// Every slot after the tag, paired with its HL7 field number.
    ///
    /// For a header the first pair is MSH-2; MSH-1 has no slot of its own.
    pub fn numbered_fields(&self) -> impl Iterator<Item = (usize, &'a str)> + '_ {
        let offset = usize::from(self.tag() == HEADER_TAG);
        self.fields
            .iter()
            .enumerate()
            .skip(1)
            .map(move |(slot, value)| (slot + offset, *value))
    }
}

/// Splits `field` on `^` and returns component `index`, or `""`.
pub fn subfield(field: &str, index: usize) -> &str {
    if field.is_empty() {
        return "";
    }
    field.split(COMPONENT_SEPARATOR).nth(index).unwrap_or("")
}

pub(crate) fn present(value: &str) -> Option<String> {
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}
