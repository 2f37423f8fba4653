//! Turns the raw cache mappings into [`Meeting`] and [`Transcript`] values.
//!
//! Every record is handled on its own: a malformed one becomes a [`Skipped`]
//! entry with a reason and the rest of the batch carries on.

use crate::importer::CacheState;
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use log::{debug, warn};
use serde::Deserialize;
use serde_json::Value;
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

pub const UNTITLED: &str = "Untitled Meeting";
pub const DEFAULT_KIND: &str = "meeting";

/// Normalized metadata for one recorded meeting.
#[derive(Debug, Clone, PartialEq)]
pub struct Meeting {
    pub id: String,
    pub title: String,
    pub date: DateTime<Utc>,
    /// Non-empty names in cache order, duplicates kept.
    pub participants: Vec<String>,
    /// Granola's document `type`, `"meeting"` when absent.
    pub kind: String,
}

/// Spoken text of one meeting, joined from its segments.
#[derive(Debug, Clone, PartialEq)]
pub struct Transcript {
    pub id: String,
    pub content: String,
    pub speakers: BTreeSet<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SkipReason {
    #[error("record is not an object")]
    NotAnObject,

    #[error("malformed record: {0}")]
    Malformed(String),

    #[error("participant #{0} is not an object")]
    PersonNotObject(usize),

    #[error("transcript is not a list of segments")]
    NotASequence,

    #[error("segment #{0} has an unsupported source")]
    InvalidSource(usize),

    #[error("transcript has no text")]
    Empty,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Skipped {
    pub id: String,
    pub reason: SkipReason,
}

/// Result of one extraction pass: what was read plus what was left out and why.
#[derive(Debug, Clone, PartialEq)]
pub struct Extraction<C> {
    pub items: C,
    pub skipped: Vec<Skipped>,
}

#[derive(Deserialize)]
struct DocumentRecord {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    created_at: Option<Value>,
    #[serde(default)]
    people: Option<Value>,
    #[serde(default, rename = "type")]
    kind: Option<Value>,
}

/// Extract meetings from `documents`, in cache order.
pub fn extract_meetings(state: &CacheState) -> Extraction<Vec<Meeting>> {
    let now = Utc::now();
    let mut items = Vec::with_capacity(state.documents.len());
    let mut skipped = Vec::new();

    for (id, record) in &state.documents {
        match parse_meeting(id, record, now) {
            Ok(meeting) => items.push(meeting),
            Err(reason) => {
                warn!("Error parsing meeting {}: {}", id, reason);
                skipped.push(Skipped {
                    id: id.clone(),
                    reason,
                });
            }
        }
    }

    Extraction { items, skipped }
}

fn parse_meeting(id: &str, record: &Value, now: DateTime<Utc>) -> Result<Meeting, SkipReason> {
    if !record.is_object() {
        return Err(SkipReason::NotAnObject);
    }
    let record =
        DocumentRecord::deserialize(record).map_err(|e| SkipReason::Malformed(e.to_string()))?;

    let mut participants = Vec::new();
    if let Some(Value::Array(people)) = &record.people {
        for (index, person) in people.iter().enumerate() {
            let person = person.as_object().ok_or(SkipReason::PersonNotObject(index))?;
            if let Some(name) = person.get("name").and_then(Value::as_str)
                && !name.is_empty()
            {
                participants.push(name.to_string());
            }
        }
    }

    let date = match &record.created_at {
        None | Some(Value::Null) => now,
        Some(Value::String(raw)) if raw.is_empty() => now,
        Some(Value::String(raw)) => parse_timestamp(raw).unwrap_or_else(|| {
            warn!("Meeting {}: unparseable created_at {:?}, using current time", id, raw);
            now
        }),
        Some(other) => {
            warn!("Meeting {}: created_at is not a string ({}), using current time", id, other);
            now
        }
    };

    Ok(Meeting {
        id: id.to_string(),
        title: record.title.unwrap_or_else(|| UNTITLED.to_string()),
        date,
        participants,
        kind: record
            .kind
            .as_ref()
            .and_then(Value::as_str)
            .unwrap_or(DEFAULT_KIND)
            .to_string(),
    })
}

const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M%:z",
    "%Y%m%dT%H%M%S%.f%:z",
    "%Y%m%dT%H%M%S%.f%z",
];

const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
    "%Y%m%dT%H%M%S%.f",
];

/// Parse an ISO-8601 timestamp as Granola writes it.
///
/// A trailing `Z` means `+00:00`. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    let normalized = match raw.strip_suffix('Z') {
        Some(head) => format!("{head}+00:00"),
        None => raw.to_string(),
    };

    if let Ok(dt) = DateTime::parse_from_rfc3339(&normalized) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in OFFSET_FORMATS {
        if let Ok(dt) = DateTime::parse_from_str(&normalized, fmt) {
            return Some(dt.with_timezone(&Utc));
        }
    }
    for fmt in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(&normalized, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(&normalized, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

/// Extract transcripts from `transcripts`, keyed by meeting id.
///
/// Transcripts with no text at all are skipped rather than kept empty.
pub fn extract_transcripts(state: &CacheState) -> Extraction<HashMap<String, Transcript>> {
    let mut items = HashMap::with_capacity(state.transcripts.len());
    let mut skipped = Vec::new();

    for (id, value) in &state.transcripts {
        let result = match value.as_array() {
            Some(segments) => collect_segments(id, segments),
            None => Err(SkipReason::NotASequence),
        };
        match result {
            Ok(transcript) => {
                items.insert(id.clone(), transcript);
            }
            Err(reason) => {
                match reason {
                    SkipReason::Empty | SkipReason::NotASequence => {
                        debug!("Skipping transcript {}: {}", id, reason)
                    }
                    _ => warn!("Error parsing transcript {}: {}", id, reason),
                }
                skipped.push(Skipped {
                    id: id.clone(),
                    reason,
                });
            }
        }
    }

    Extraction { items, skipped }
}

fn collect_segments(id: &str, segments: &[Value]) -> Result<Transcript, SkipReason> {
    let mut parts = Vec::new();
    let mut speakers = BTreeSet::new();

    for (index, segment) in segments.iter().enumerate() {
        let Some(segment) = segment.as_object() else {
            continue;
        };
        let Some(text) = segment.get("text") else {
            continue;
        };
        if let Some(text) = text.as_str().map(str::trim)
            && !text.is_empty()
        {
            parts.push(text);
        }
        match segment.get("source") {
            None | Some(Value::Null) => {}
            Some(Value::String(source)) => {
                if !source.is_empty() {
                    speakers.insert(source.clone());
                }
            }
            Some(_) => return Err(SkipReason::InvalidSource(index)),
        }
    }

    if parts.is_empty() {
        return Err(SkipReason::Empty);
    }

    Ok(Transcript {
        id: id.to_string(),
        content: parts.join(" "),
        speakers,
    })
}
