//! HL7 `TS`/`DT` tokens to ISO-8601 strings.
//!
//! Purely positional: no range checks and no timezone handling. Anything
//! too short to carry a date comes back untouched.

const DATE_LEN: usize = 8;
const TIME_LEN: usize = 6;

/// `YYYYMMDD` -> `YYYY-MM-DD`; any other length passes through.
pub fn format_date(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() != DATE_LEN {
        return token.to_string();
    }
    iso_date(&chars)
}

/// `YYYYMMDD[hhmmss...]` -> `YYYY-MM-DDThh:mm:ss` or `YYYY-MM-DD`.
///
/// Digits past the seconds, fractional seconds and offsets are dropped. A
/// time part shorter than six characters yields the date-only form.
pub fn format_date_time(token: &str) -> String {
    let chars: Vec<char> = token.chars().collect();
    if chars.len() < DATE_LEN {
        return token.to_string();
    }

    let (date, time) = chars.split_at(DATE_LEN);
    let date = iso_date(date);
    if time.len() < TIME_LEN {
        return date;
    }

    format!(
        "{}T{}:{}:{}",
        date,
        collect(&time[0..2]),
        collect(&time[2..4]),
        collect(&time[4..6])
    )
}

fn iso_date(chars: &[char]) -> String {
    format!(
        "{}-{}-{}",
        collect(&chars[0..4]),
        collect(&chars[4..6]),
        collect(&chars[6..8])
    )
}

fn collect(chars: &[char]) -> String {
    chars.iter().collect()
}
