/// Loader for Granola's local cache file (`cache-v3.json`).
///
/// Two layouts are seen in the wild:
///
/// ```json
/// { "documents": { ... }, "transcripts": { ... } }
/// ```
///
/// and the double-encoded envelope written by current app versions, where the
/// payload is a JSON *string* that optionally nests the state one level deeper:
///
/// ```json
/// { "cache": "{\"state\": {\"documents\": {...}, \"transcripts\": {...}}}" }
/// ```
///
/// Both `documents` and `transcripts` are keyed by the same opaque meeting id.
use serde_json::{Map, Value};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Reasons the cache could not be loaded. All of them end the run.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("cache file not found at {}", .0.display())]
    NotFound(PathBuf),

    #[error("failed to read cache file {}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cache file is not valid JSON")]
    Parse(#[source] serde_json::Error),

    #[error("`cache` envelope does not hold valid JSON")]
    EnvelopeParse(#[source] serde_json::Error),

    #[error("{0} is not a JSON object")]
    NotAnObject(&'static str),

    #[error("cache contains no data")]
    Empty,
}

/// Where the state object was found inside the file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheLayout {
    /// `documents`/`transcripts` at the top level.
    Flat,
    /// String-encoded `cache` payload without a `state` field.
    Envelope,
    /// String-encoded `cache` payload with everything under `state`.
    EnvelopeState,
}

/// The two id-keyed mappings the backup cares about. Values are kept as raw
/// JSON so one malformed record cannot fail the whole file.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct CacheState {
    pub documents: Map<String, Value>,
    pub transcripts: Map<String, Value>,
}

impl CacheState {
    fn from_object(mut state: Map<String, Value>) -> Self {
        Self {
            documents: take_mapping(&mut state, "documents"),
            transcripts: take_mapping(&mut state, "transcripts"),
        }
    }
}

fn take_mapping(state: &mut Map<String, Value>, key: &str) -> Map<String, Value> {
    match state.remove(key) {
        Some(Value::Object(map)) => map,
        Some(other) => {
            log::warn!("Ignoring `{}`: expected an object, found {}", key, kind_of(&other));
            Map::new()
        }
        None => Map::new(),
    }
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "a list",
        Value::Object(_) => "an object",
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct LoadedCache {
    pub layout: CacheLayout,
    pub state: CacheState,
}

/// Read and decode the cache file at `path`.
pub fn load_cache(path: &Path) -> Result<LoadedCache, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            LoadError::NotFound(path.to_path_buf())
        } else {
            LoadError::Read {
                path: path.to_path_buf(),
                source,
            }
        }
    })?;
    decode_cache(&raw)
}

/// Decode cache file contents, unwrapping the string envelope when present.
pub fn decode_cache(raw: &str) -> Result<LoadedCache, LoadError> {
    let Value::Object(outer) = serde_json::from_str::<Value>(raw).map_err(LoadError::Parse)? else {
        return Err(LoadError::NotAnObject("cache file"));
    };

    // Only a string-valued `cache` field is an envelope; anything else is plain state.
    let inner = match outer.get("cache") {
        Some(Value::String(encoded)) => {
            Some(serde_json::from_str::<Value>(encoded).map_err(LoadError::EnvelopeParse)?)
        }
        _ => None,
    };

    let (layout, state) = match inner {
        None => (CacheLayout::Flat, outer),
        Some(Value::Object(mut envelope)) => match envelope.remove("state") {
            Some(Value::Object(state)) => (CacheLayout::EnvelopeState, state),
            Some(_) => return Err(LoadError::NotAnObject("cache `state`")),
            None => (CacheLayout::Envelope, envelope),
        },
        Some(_) => return Err(LoadError::NotAnObject("cache envelope")),
    };

    if state.is_empty() {
        return Err(LoadError::Empty);
    }

    Ok(LoadedCache {
        layout,
        state: CacheState::from_object(state),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn flat_state() -> Value {
        json!({
            "documents": { "m1": { "title": "Standup" } },
            "transcripts": { "m1": [{ "text": "hello" }] },
        })
    }

    #[test]
    fn flat_cache_is_returned_as_is() {
        let loaded = decode_cache(&flat_state().to_string()).unwrap();
        assert_eq!(loaded.layout, CacheLayout::Flat);
        assert!(loaded.state.documents.contains_key("m1"));
        assert!(loaded.state.transcripts.contains_key("m1"));
    }

    #[test]
    fn envelope_with_state_is_unwrapped_twice() {
        let inner = json!({ "state": flat_state(), "version": 3 }).to_string();
        let raw = json!({ "cache": inner }).to_string();

        let loaded = decode_cache(&raw).unwrap();
        assert_eq!(loaded.layout, CacheLayout::EnvelopeState);
        assert_eq!(loaded.state.documents["m1"]["title"], "Standup");
    }

    #[test]
    fn envelope_without_state_uses_inner_object() {
        let raw = json!({ "cache": flat_state().to_string() }).to_string();

        let loaded = decode_cache(&raw).unwrap();
        assert_eq!(loaded.layout, CacheLayout::Envelope);
        assert_eq!(loaded.state.transcripts.len(), 1);
    }

    #[test]
    fn non_string_cache_field_is_not_an_envelope() {
        let raw = json!({ "cache": { "state": {} }, "documents": {} }).to_string();

        let loaded = decode_cache(&raw).unwrap();
        assert_eq!(loaded.layout, CacheLayout::Flat);
        assert!(loaded.state.documents.is_empty());
    }

    #[test]
    fn broken_envelope_is_an_error() {
        let raw = json!({ "cache": "{not json" }).to_string();
        assert!(matches!(decode_cache(&raw), Err(LoadError::EnvelopeParse(_))));

        let raw = json!({ "cache": "[1, 2]" }).to_string();
        assert!(matches!(decode_cache(&raw), Err(LoadError::NotAnObject(_))));
    }

    #[test]
    fn invalid_or_empty_cache_is_an_error() {
        assert!(matches!(decode_cache("{"), Err(LoadError::Parse(_))));
        assert!(matches!(decode_cache("[]"), Err(LoadError::NotAnObject(_))));
        assert!(matches!(decode_cache("{}"), Err(LoadError::Empty)));
    }

    #[test]
    fn mappings_of_the_wrong_type_are_treated_as_empty() {
        let raw = json!({ "documents": [1, 2], "transcripts": { "m1": [] } }).to_string();

        let loaded = decode_cache(&raw).unwrap();
        assert!(loaded.state.documents.is_empty());
        assert_eq!(loaded.state.transcripts.len(), 1);
    }

    #[test]
    fn missing_file_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache-v3.json");
        assert!(matches!(load_cache(&path), Err(LoadError::NotFound(p)) if p == path));

        std::fs::write(&path, flat_state().to_string()).unwrap();
        assert_eq!(load_cache(&path).unwrap().layout, CacheLayout::Flat);
    }
}
