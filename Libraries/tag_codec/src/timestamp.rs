//! Truncated-precision timestamps used by major-4 date frames.

use std::fmt;

use crate::error::{TagError, TagResult};

/// A timestamp with the precision the tag actually recorded: `YYYY`,
/// `YYYY-MM`, `YYYY-MM-DD`, `YYYY-MM-DDTHH`, `YYYY-MM-DDTHH:MM` or
/// `YYYY-MM-DDTHH:MM:SS`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Timestamp {
    pub year: u16,
    pub month: Option<u8>,
    pub day: Option<u8>,
    pub hour: Option<u8>,
    pub minute: Option<u8>,
    pub second: Option<u8>,
}

// Offsets of the separator characters inside a full-precision timestamp.
const SEPARATORS: [(usize, u8); 5] = [(4, b'-'), (7, b'-'), (10, b'T'), (13, b':'), (16, b':')];

impl Timestamp {
    /// Parses a timestamp, rejecting any string whose length is not one of
    /// the six valid truncation points or whose components are out of range.
    pub fn parse(text: &str) -> TagResult<Timestamp> {
        let bad = || TagError::BadTimestamp(text.to_string());
        if ![4, 7, 10, 13, 16, 19].contains(&text.len()) {
            return Err(bad());
        }
        let bytes = text.as_bytes();
        for (at, sep) in SEPARATORS {
            if bytes.len() > at && bytes[at] != sep {
                return Err(bad());
            }
        }

        let number = |start: usize, len: usize| -> TagResult<u16> {
            let digits = &bytes[start..start + len];
            if !digits.iter().all(u8::is_ascii_digit) {
                return Err(bad());
            }
            Ok(digits.iter().fold(0u16, |acc, &d| acc * 10 + (d - b'0') as u16))
        };
        let component = |start: usize, min: u8, max: u8| -> TagResult<Option<u8>> {
            if bytes.len() <= start {
                return Ok(None);
            }
            let value = number(start + 1, 2)? as u8;
            if value < min || value > max {
                return Err(bad());
            }
            Ok(Some(value))
        };

        Ok(Timestamp {
            year: number(0, 4)?,
            month: component(4, 1, 12)?,
            day: component(7, 1, 31)?,
            hour: component(10, 0, 23)?,
            minute: component(13, 0, 59)?,
            second: component(16, 0, 59)?,
        })
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}", self.year)?;
        let Some(month) = self.month else { return Ok(()) };
        write!(f, "-{month:02}")?;
        let Some(day) = self.day else { return Ok(()) };
        write!(f, "-{day:02}")?;
        let Some(hour) = self.hour else { return Ok(()) };
        write!(f, "T{hour:02}")?;
        let Some(minute) = self.minute else { return Ok(()) };
        write!(f, ":{minute:02}")?;
        let Some(second) = self.second else { return Ok(()) };
        write!(f, ":{second:02}")
    }
}
