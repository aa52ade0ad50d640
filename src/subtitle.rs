//! SRT subtitle model and the recovery parser for raw whisper output.
//!
//! Transcription tools print loosely structured lines such as
//! `[00:00:01.000 --> 00:00:02.500]   - Hello there`. The parser here pulls
//! out anything that looks like a timed cue and drops everything else, so it
//! never fails: the worst case is an empty track.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use tracing::debug;

const ARROW: &str = "-->";

static TIMING_LINE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[?(\d{2}:\d{2}:\d{2}[,.]\d{3})\s*-->\s*(\d{2}:\d{2}:\d{2}[,.]\d{3})\]?\s*(.*)")
        .expect("timing line pattern is valid")
});

/// A cue boundary in SRT form (`hh:mm:ss,mmm`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct Timestamp {
    hours: u8,
    minutes: u8,
    seconds: u8,
    millis: u16,
}

impl Timestamp {
    /// Parse `hh:mm:ss,mmm` or `hh:mm:ss.mmm`.
    pub fn parse(s: &str) -> Option<Self> {
        let (clock, millis) = s.split_once([',', '.'])?;
        let mut parts = clock.splitn(3, ':');
        let hours = parts.next()?.parse().ok()?;
        let minutes = parts.next()?.parse().ok()?;
        let seconds = parts.next()?.parse().ok()?;
        let millis = millis.parse().ok()?;
        Some(Self {
            hours,
            minutes,
            seconds,
            millis,
        })
    }

    pub fn total_millis(&self) -> u64 {
        ((self.hours as u64 * 60 + self.minutes as u64) * 60 + self.seconds as u64) * 1000
            + self.millis as u64
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:02}:{:02}:{:02},{:03}",
            self.hours, self.minutes, self.seconds, self.millis
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubtitleCue {
    pub index: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    pub text: String,
}

/// Ordered cues, numbered from 1 without gaps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubtitleTrack {
    cues: Vec<SubtitleCue>,
}

impl SubtitleTrack {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a cue, numbering it after the last one.
    pub fn push(&mut self, start: Timestamp, end: Timestamp, text: impl Into<String>) {
        let index = self.cues.len() + 1;
        self.cues.push(SubtitleCue {
            index,
            start,
            end,
            text: text.into(),
        });
    }

    pub fn cues(&self) -> &[SubtitleCue] {
        &self.cues
    }

    pub fn len(&self) -> usize {
        self.cues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cues.is_empty()
    }

    /// Render as SRT: number, time range, text and a blank line per cue.
    pub fn to_srt(&self) -> String {
        let mut srt_content = String::new();

        for cue in &self.cues {
            srt_content.push_str(&format!(
                "{}\n{} --> {}\n{}\n\n",
                cue.index, cue.start, cue.end, cue.text
            ));
        }

        srt_content
    }
}

/// Remove leading bullets, dashes and speaker markers plus surrounding whitespace.
pub fn strip_decoration(text: &str) -> &str {
    text.trim_start_matches(|c: char| !c.is_alphanumeric()).trim_end()
}

/// Repair raw timestamped transcript text into a strictly numbered track.
///
/// Only lines containing `-->` with two well-formed timestamps are considered.
/// A timing line without inline text borrows the next line as its text unless
/// that line is empty or itself a timing line. Cues whose text is empty after
/// decoration stripping are dropped without consuming a number.
pub fn normalize_transcript(raw: &str) -> SubtitleTrack {
    let lines: Vec<&str> = raw.lines().collect();
    let mut track = SubtitleTrack::new();
    let mut i = 0;

    while i < lines.len() {
        let line = lines[i].trim();
        i += 1;

        if line.is_empty() || !line.contains(ARROW) {
            continue;
        }

        let Some(caps) = TIMING_LINE.captures(line) else {
            debug!(line, "Skipping malformed timing line");
            continue;
        };
        let (Some(start), Some(end)) = (Timestamp::parse(&caps[1]), Timestamp::parse(&caps[2])) else {
            continue;
        };

        let mut text = caps.get(3).map_or("", |m| m.as_str()).trim();
        if text.is_empty() {
            if let Some(next) = lines.get(i).filter(|l| !l.is_empty() && !l.contains(ARROW)) {
                text = next.trim();
                i += 1;
            }
        }

        let text = strip_decoration(text);
        if text.is_empty() {
            continue;
        }

        track.push(start, end, text);
    }

    track
}
