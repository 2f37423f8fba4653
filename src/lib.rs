//! # granola-backup
//!
//! A CLI tool that backs up [Granola](https://granola.ai) meeting transcripts to local
//! Markdown files.
//!
//! ## What it does
//!
//! Granola keeps recent meetings and their transcripts in a JSON cache file
//! (`cache-v3.json`). This tool reads that file, joins each meeting with its
//! transcript, and writes one Markdown file per meeting containing the title, date,
//! participants, speakers and the full transcript text.
//!
//! The cache is opened **read-only**. Your data is never modified.
//!
//! ## Incremental backup
//!
//! Files are named `YYYY-MM-DD_HHMM_<Title>.md` using your local timezone. A meeting
//! whose file already exists is skipped, so the tool can run daily from cron or
//! launchd. Existence is checked by name only: renaming a meeting in Granola, or
//! changing the timezone, produces a new file next to the old one.
//!
//! ## Usage
//!
//! ```sh
//! # Back up to the default location (~/Documents/granola-transcripts)
//! granola-backup
//!
//! # Custom target directory and timezone
//! granola-backup ~/notes/meetings --timezone Europe/Berlin
//! ```
//!
//! The output directory, cache path and timezone can also be set with
//! `GRANOLA_BACKUP_DIR`, `GRANOLA_CACHE_PATH` and `GRANOLA_TIMEZONE`, or persisted in
//! `~/.config/granola-backup/config.toml`.
//!
//! ## Compatibility
//!
//! Tracks Granola's internal (undocumented) cache format. Both the flat layout and the
//! string-encoded `cache` envelope are understood.

pub mod exporter;
pub mod extract;
pub mod importer;
pub mod sequential;
pub mod utils;
