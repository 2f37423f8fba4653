use crate::extract::{Meeting, Transcript};
use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::io::Write;

pub const MAX_TITLE_CHARS: usize = 100;

/// Reduce a title to a filesystem-safe stem: alphanumerics, `-` and `_` only,
/// spaces turned into `_`, at most [`MAX_TITLE_CHARS`] characters.
pub fn sanitize_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    kept.trim()
        .replace(' ', "_")
        .chars()
        .take(MAX_TITLE_CHARS)
        .collect()
}

/// `YYYY-MM-DD_HHMM_<title>.md`, with date and time in `tz`.
pub fn backup_filename(title: &str, date: DateTime<Utc>, tz: Tz) -> String {
    let local = date.with_timezone(&tz);
    format!("{}_{}.md", local.format("%Y-%m-%d_%H%M"), sanitize_title(title))
}

pub fn write_transcript_markdown<W: Write>(
    writer: &mut W,
    meeting: &Meeting,
    transcript: &Transcript,
    tz: Tz,
) -> std::io::Result<()> {
    let local = meeting.date.with_timezone(&tz);

    writeln!(writer, "# {}", meeting.title)?;
    writeln!(writer)?;
    writeln!(writer, "**Date:** {}", local.format("%Y-%m-%d %H:%M %Z"))?;
    writeln!(writer, "**Meeting ID:** {}", meeting.id)?;

    if !meeting.participants.is_empty() {
        writeln!(writer, "**Participants:** {}", meeting.participants.join(", "))?;
    }

    if !transcript.speakers.is_empty() {
        let speakers: Vec<&str> = transcript.speakers.iter().map(String::as_str).collect();
        writeln!(writer, "**Speakers:** {}", speakers.join(", "))?;
    }

    writeln!(writer)?;
    writeln!(writer, "---")?;
    writeln!(writer)?;
    writeln!(writer, "## Transcript")?;
    writeln!(writer)?;
    writeln!(writer, "{}", transcript.content)?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use std::collections::BTreeSet;

    fn meeting(participants: &[&str]) -> Meeting {
        Meeting {
            id: "m1".into(),
            title: "Standup".into(),
            date: Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap(),
            participants: participants.iter().map(|p| p.to_string()).collect(),
            kind: "meeting".into(),
        }
    }

    fn transcript(speakers: &[&str]) -> Transcript {
        Transcript {
            id: "m1".into(),
            content: "hello".into(),
            speakers: speakers.iter().map(|s| s.to_string()).collect::<BTreeSet<_>>(),
        }
    }

    fn render(meeting: &Meeting, transcript: &Transcript, tz: Tz) -> String {
        let mut out = Vec::new();
        write_transcript_markdown(&mut out, meeting, transcript, tz).unwrap();
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn sanitize_strips_and_underscores() {
        assert_eq!(sanitize_title("  Q3 planning: budget/hiring! "), "Q3_planning_budgethiring");
        assert_eq!(sanitize_title("1:1 — Ana & José"), "11__Ana__José");
        assert_eq!(sanitize_title("already_safe-name"), "already_safe-name");
        assert_eq!(sanitize_title("???"), "");
    }

    #[test]
    fn sanitize_is_idempotent_and_bounded() {
        let long = "Weekly sync with the platform team ".repeat(10);
        for title in ["Standup", " a  b ", "ümlaut-Überblick 2024", long.as_str(), "x/y\\z"] {
            let once = sanitize_title(title);
            assert_eq!(sanitize_title(&once), once);
            assert!(once.chars().count() <= MAX_TITLE_CHARS);
        }
        assert_eq!(sanitize_title(&long).chars().count(), MAX_TITLE_CHARS);
    }

    #[test]
    fn filename_uses_local_time() {
        let date = Utc.with_ymd_and_hms(2024, 1, 1, 15, 0, 0).unwrap();
        assert_eq!(
            backup_filename("Standup", date, Tz::UTC),
            "2024-01-01_1500_Standup.md"
        );
        assert_eq!(
            backup_filename("Standup", date, Tz::America__New_York),
            "2024-01-01_1000_Standup.md"
        );
        let late = Utc.with_ymd_and_hms(2024, 1, 1, 2, 5, 0).unwrap();
        assert_eq!(
            backup_filename("Late call", late, Tz::America__Los_Angeles),
            "2023-12-31_1805_Late_call.md"
        );
    }

    #[test]
    fn markdown_has_all_sections() {
        let out = render(
            &meeting(&["Alice", "Bob"]),
            &transcript(&["microphone", "Alice"]),
            Tz::UTC,
        );
        assert_eq!(
            out,
            "# Standup\n\n\
             **Date:** 2024-01-01 15:00 UTC\n\
             **Meeting ID:** m1\n\
             **Participants:** Alice, Bob\n\
             **Speakers:** Alice, microphone\n\
             \n---\n\n## Transcript\n\nhello\n"
        );
    }

    #[test]
    fn empty_participants_and_speakers_are_omitted() {
        let out = render(&meeting(&[]), &transcript(&[]), Tz::America__Chicago);
        assert!(out.contains("**Date:** 2024-01-01 09:00 CST\n"));
        assert!(!out.contains("Participants"));
        assert!(!out.contains("Speakers"));
        assert!(out.ends_with("**Meeting ID:** m1\n\n---\n\n## Transcript\n\nhello\n"));
    }
}
