//! Heuristic receipt-date check.
//!
//! Chat transports frequently strip image metadata, so a receipt without a
//! readable capture time is accepted provisionally and flagged for the
//! reviewer. Only a receipt that carries a timestamp from another day is
//! rejected without review.

use chrono::{Local, NaiveDate, NaiveDateTime};
use exif::{In, Reader, Tag, Value};
use std::io::Cursor;
use std::sync::Arc;
use tracing::debug;

/// Timestamp fields consulted, in priority order.
const TIMESTAMP_TAGS: [Tag; 3] = [Tag::DateTimeOriginal, Tag::DateTimeDigitized, Tag::DateTime];

const EXIF_DATETIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReceiptCheck {
    pub is_today: bool,
    pub metadata_missing: bool,
}

impl ReceiptCheck {
    /// A dated receipt from another day is the only automatic rejection.
    pub fn auto_reject(&self) -> bool {
        !self.is_today && !self.metadata_missing
    }
}

#[derive(Clone)]
pub struct ReceiptInspector {
    today: Arc<dyn Fn() -> NaiveDate + Send + Sync>,
}

impl Default for ReceiptInspector {
    fn default() -> Self {
        Self {
            today: Arc::new(|| Local::now().date_naive()),
        }
    }
}

impl ReceiptInspector {
    /// Creates an inspector that compares against a fixed calendar date.
    pub fn fixed(today: NaiveDate) -> Self {
        Self {
            today: Arc::new(move || today),
        }
    }

    pub fn inspect(&self, image: &[u8]) -> ReceiptCheck {
        match capture_timestamp(image) {
            Some(taken) => {
                let is_today = taken.date() == (self.today)();
                debug!(%taken, is_today, "Receipt timestamp found");
                ReceiptCheck {
                    is_today,
                    metadata_missing: false,
                }
            }
            None => ReceiptCheck {
                is_today: true,
                metadata_missing: true,
            },
        }
    }
}

/// Returns the first timestamp field that parses.
pub fn capture_timestamp(image: &[u8]) -> Option<NaiveDateTime> {
    let exif = Reader::new()
        .read_from_container(&mut Cursor::new(image))
        .ok()?;
    TIMESTAMP_TAGS.iter().find_map(|tag| {
        let field = exif.get_field(*tag, In::PRIMARY)?;
        match &field.value {
            Value::Ascii(parts) => parts.iter().find_map(|raw| parse_exif_datetime(raw)),
            _ => None,
        }
    })
}

fn parse_exif_datetime(raw: &[u8]) -> Option<NaiveDateTime> {
    let text = std::str::from_utf8(raw).ok()?;
    let text = text.trim_matches(|c: char| c == '\0' || c.is_whitespace());
    NaiveDateTime::parse_from_str(text, EXIF_DATETIME_FORMAT).ok()
}
