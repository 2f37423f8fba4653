use crate::exporter::{backup_filename, write_transcript_markdown};
use crate::extract::{Meeting, Skipped, Transcript, extract_meetings, extract_transcripts};
use crate::importer::{CacheLayout, load_cache};
use crate::utils::{BackupConfig, ProcessResult};
use eyre::{Context, Result};
use log::{debug, error, info};
use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::PathBuf;

/// A meeting whose file could not be written.
#[derive(Debug)]
pub struct WriteFailure {
    pub meeting_id: String,
    pub title: String,
    pub error: eyre::Report,
}

/// Everything one run did, item by item.
#[derive(Debug)]
pub struct BackupReport {
    pub layout: CacheLayout,
    pub meetings_found: usize,
    pub transcripts_found: usize,
    pub saved: Vec<PathBuf>,
    pub existing: Vec<PathBuf>,
    pub failed: Vec<WriteFailure>,
    /// Ids of meetings that have no transcript; never written, never counted.
    pub without_transcript: Vec<String>,
    pub skipped_meetings: Vec<Skipped>,
    pub skipped_transcripts: Vec<Skipped>,
}

/// Load the cache, extract meetings and transcripts, and write every pair
/// that is not backed up yet. Only a cache that cannot be loaded is an error.
pub fn execute(config: &BackupConfig) -> Result<BackupReport> {
    if !config.quiet {
        println!("Loading Granola cache...");
    }
    let cache = load_cache(&config.cache_path).wrap_err("Failed to load cache")?;
    debug!(
        "Loaded {} ({:?} layout)",
        config.cache_path.display(),
        cache.layout
    );

    if !config.quiet {
        println!("Parsing meetings and transcripts...");
    }
    let meetings = extract_meetings(&cache.state);
    let transcripts = extract_transcripts(&cache.state);

    if !config.quiet {
        println!(
            "Found {} meetings and {} transcripts\n",
            meetings.items.len(),
            transcripts.items.len()
        );
    }

    let mut report = BackupReport {
        layout: cache.layout,
        meetings_found: meetings.items.len(),
        transcripts_found: transcripts.items.len(),
        saved: Vec::new(),
        existing: Vec::new(),
        failed: Vec::new(),
        without_transcript: Vec::new(),
        skipped_meetings: meetings.skipped,
        skipped_transcripts: transcripts.skipped,
    };

    for meeting in &meetings.items {
        let Some(transcript) = transcripts.items.get(&meeting.id) else {
            report.without_transcript.push(meeting.id.clone());
            continue;
        };

        match save_transcript(meeting, transcript, config) {
            Ok((ProcessResult::Saved, path)) => {
                if !config.quiet {
                    println!("  Saved: {}", display_name(&path));
                }
                report.saved.push(path);
            }
            Ok((ProcessResult::AlreadyExists, path)) => {
                if !config.quiet {
                    println!("  Already exists: {}", display_name(&path));
                }
                report.existing.push(path);
            }
            Err(e) => {
                error!("Error saving {}: {:#}", meeting.title, e);
                report.failed.push(WriteFailure {
                    meeting_id: meeting.id.clone(),
                    title: meeting.title.clone(),
                    error: e,
                });
            }
        }
    }

    info!(
        "{} saved, {} already present, {} failed",
        report.saved.len(),
        report.existing.len(),
        report.failed.len()
    );
    Ok(report)
}

fn display_name(path: &std::path::Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

/// Write one meeting's markdown unless a file with its name is already there.
/// Returns the outcome together with the path that was checked or written.
pub fn save_transcript(
    meeting: &Meeting,
    transcript: &Transcript,
    config: &BackupConfig,
) -> Result<(ProcessResult, PathBuf)> {
    fs::create_dir_all(&config.output_dir).wrap_err_with(|| {
        format!(
            "Failed to create output directory: {}",
            config.output_dir.display()
        )
    })?;

    let path = config
        .output_dir
        .join(backup_filename(&meeting.title, meeting.date, config.timezone));
    if path.exists() {
        return Ok((ProcessResult::AlreadyExists, path));
    }

    // create_new closes the gap between the check above and the write.
    let file = match OpenOptions::new().write(true).create_new(true).open(&path) {
        Ok(file) => file,
        Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
            return Ok((ProcessResult::AlreadyExists, path));
        }
        Err(e) => {
            return Err(e).wrap_err_with(|| format!("Failed to create: {}", path.display()));
        }
    };

    let mut writer = BufWriter::new(file);
    let written = write_transcript_markdown(&mut writer, meeting, transcript, config.timezone)
        .and_then(|()| writer.flush());
    drop(writer);

    if let Err(e) = written {
        // Leave no half-written file behind, or the next run would treat it as backed up.
        let _ = fs::remove_file(&path);
        return Err(e).wrap_err_with(|| format!("Failed to write: {}", path.display()));
    }

    Ok((ProcessResult::Saved, path))
}

impl BackupReport {
    pub fn print_summary(&self) {
        println!("\n=== Backup Complete ===");
        println!("Saved: {} new transcripts", self.saved.len());
        println!("Skipped: {} existing files", self.existing.len());
        if !self.failed.is_empty() {
            println!("Failed: {} transcripts", self.failed.len());
        }
        println!("Total: {} transcripts in cache\n", self.transcripts_found);
    }
}
