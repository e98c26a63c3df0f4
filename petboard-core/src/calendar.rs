//! Health-log aggregation into a date-keyed calendar index.
//!
//! Records arrive as flat, schema-flexible property maps; this module
//! projects them into the `YYYY-MM-DD -> entries` index the widget embeds.
//! The index is rebuilt from scratch every run and never persisted.

use notion::{PropertyValue, Record};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

/// Title fragment identifying the health-log collection.
pub const HEALTH_LOG_MARKER: &str = "Health Log";

/// Glyph used when a record has no emoji icon of its own.
const DEFAULT_GLYPH: &str = "📝";

/// Title used when a record has no usable title property.
const UNTITLED: &str = "Untitled";

/// One calendar-worthy item, immutable once built.
///
/// Field names match the snapshot format the widget script reads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CalendarEntry {
    /// Id of the source record.
    pub id: String,
    pub title: String,
    pub emoji: String,
    /// Pre-joined `emoji title` hover text.
    pub display: String,
}

/// Date-keyed projection of records. Buckets keep arrival order; the map
/// itself has no ordering guarantee.
pub type CalendarIndex = HashMap<String, Vec<CalendarEntry>>;

/// Truncate a raw date or datetime value to its bucket key.
///
/// This is a plain substring operation, not calendar validation: malformed
/// upstream values propagate unchanged as under-sized or odd keys rather
/// than raising. Applying it twice is a no-op.
pub fn date_key(raw: &str) -> String {
    raw.chars().take(10).collect()
}

/// Project records into a calendar index, in arrival order.
///
/// A record with no resolvable date by any path is silently dropped.
pub fn aggregate(records: &[Record]) -> CalendarIndex {
    let mut index = CalendarIndex::new();

    for record in records {
        let Some(raw_date) = extract_date(record) else {
            debug!(record = %record.id, "record has no resolvable date, skipping");
            continue;
        };

        let title = extract_title(record);
        let emoji = record
            .icon_emoji
            .clone()
            .unwrap_or_else(|| DEFAULT_GLYPH.to_string());
        let display = format!("{emoji} {title}");

        index.entry(date_key(&raw_date)).or_default().push(CalendarEntry {
            id: record.id.clone(),
            title,
            emoji,
            display,
        });
    }

    index
}

/// Resolve a record's date: a date-typed property's start value, then a
/// created-timestamp-typed property, then the record's own creation time.
fn extract_date(record: &Record) -> Option<String> {
    for value in record.properties.values() {
        if let PropertyValue::Date { start: Some(start) } = value {
            return Some(start.clone());
        }
    }
    for value in record.properties.values() {
        if let PropertyValue::CreatedTime { timestamp } = value {
            if !timestamp.is_empty() {
                return Some(timestamp.clone());
            }
        }
    }
    if record.created_time.is_empty() {
        None
    } else {
        Some(record.created_time.clone())
    }
}

fn extract_title(record: &Record) -> String {
    for value in record.properties.values() {
        if let PropertyValue::Title { text } = value {
            if !text.is_empty() {
                return text.clone();
            }
        }
    }
    UNTITLED.to_string()
}
