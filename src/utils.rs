use chrono_tz::Tz;
use log::{debug, warn};
use std::path::PathBuf;

/// Configuration required to run a backup.
/// This decouples the pipeline from how the arguments were gathered (CLI/env/config file).
#[derive(Clone, Debug)]
pub struct BackupConfig {
    pub cache_path: PathBuf,
    pub output_dir: PathBuf,
    pub timezone: Tz,
    pub quiet: bool,
}

/// Outcome of writing one meeting that did not fail.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ProcessResult {
    Saved,
    AlreadyExists,
}

impl ProcessResult {
    pub fn is_saved(self) -> bool {
        matches!(self, ProcessResult::Saved)
    }
}

/// Granola's cache location, e.g. `~/Library/Application Support/Granola/cache-v3.json` on macOS.
pub fn default_cache_path() -> Option<PathBuf> {
    dirs::data_dir().map(|d| d.join("Granola/cache-v3.json"))
}

pub fn default_output_dir() -> PathBuf {
    dirs::document_dir()
        .or_else(|| dirs::home_dir().map(|h| h.join("Documents")))
        .map(|d| d.join("granola-transcripts"))
        .unwrap_or_else(|| PathBuf::from("granola-transcripts"))
}

/// Pick the timezone used for filenames and the Date line.
///
/// An explicit IANA name wins. A blank name counts as unset. A name `chrono-tz`
/// does not know is reported and ignored. Otherwise the platform zone is used.
pub fn resolve_timezone(requested: Option<&str>) -> Tz {
    match requested_timezone(requested) {
        RequestedTimezone::Named(tz) => tz,
        RequestedTimezone::Invalid(name) => {
            warn!("Invalid timezone '{}', using auto-detection", name);
            detect_timezone()
        }
        RequestedTimezone::Unset => detect_timezone(),
    }
}

#[derive(Debug, PartialEq)]
enum RequestedTimezone<'a> {
    Unset,
    Named(Tz),
    Invalid(&'a str),
}

fn requested_timezone(requested: Option<&str>) -> RequestedTimezone<'_> {
    let Some(name) = requested.map(str::trim).filter(|n| !n.is_empty()) else {
        return RequestedTimezone::Unset;
    };
    match name.parse::<Tz>() {
        Ok(tz) => RequestedTimezone::Named(tz),
        Err(_) => RequestedTimezone::Invalid(name),
    }
}

fn detect_timezone() -> Tz {
    match iana_time_zone::get_timezone() {
        Ok(name) => match name.parse::<Tz>() {
            Ok(tz) => {
                debug!("Detected system timezone {}", tz);
                tz
            }
            Err(_) => {
                warn!("Unknown system timezone '{}', falling back to UTC", name);
                Tz::UTC
            }
        },
        Err(e) => {
            warn!("Could not detect system timezone ({}), falling back to UTC", e);
            Tz::UTC
        }
    }
}
