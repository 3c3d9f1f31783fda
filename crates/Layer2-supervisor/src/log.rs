//! Log System - captured output lines, per-run log files, merged feed history
//!
//! Provides:
//! - `LogLine`: one line of tool output (or a supervisor diagnostic)
//! - `LineAssembler`: byte chunks -> complete lines (lossy UTF-8, ANSI stripped)
//! - `RunLog`: append-only file for a single run
//! - `LogFeed`: bounded history of the merged feed

use chrono::{DateTime, Local, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fs::{File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};

/// Longest partial line buffered before it is emitted without a newline
const MAX_PENDING_BYTES: usize = 64 * 1024;

/// Default history size of the merged feed
pub const DEFAULT_HISTORY_LIMIT: usize = 5000;

// ============================================================================
// LogStream / LogLine
// ============================================================================

/// Origin of a log line
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogStream {
    /// Child standard output
    Stdout,
    /// Child standard error
    Stderr,
    /// Markers and diagnostics written by the supervisor itself
    Supervisor,
}

impl LogStream {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogStream::Stdout => "stdout",
            LogStream::Stderr => "stderr",
            LogStream::Supervisor => "launcher",
        }
    }
}

impl std::fmt::Display for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single log line, tagged with the tool that produced it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLine {
    pub tool_id: String,
    pub timestamp: DateTime<Utc>,
    pub stream: LogStream,
    pub text: String,
}

impl LogLine {
    pub fn new(tool_id: impl Into<String>, stream: LogStream, text: impl Into<String>) -> Self {
        Self {
            tool_id: tool_id.into(),
            timestamp: Utc::now(),
            stream,
            text: text.into(),
        }
    }

    /// `<local RFC3339 timestamp> [<stream>] <text>`
    pub fn format_for_file(&self) -> String {
        format!(
            "{} [{}] {}",
            self.timestamp
                .with_timezone(&Local)
                .to_rfc3339_opts(SecondsFormat::Millis, false),
            self.stream,
            self.text
        )
    }

    /// `[<label>] <text>` for a combined console view
    pub fn format_prefixed(&self, label: &str) -> String {
        format!("[{}] {}", label, self.text)
    }
}

// ============================================================================
// LineAssembler
// ============================================================================

/// Reassembles raw pipe reads into text lines
///
/// Splits on `\n`, drops a trailing `\r`, decodes lossily and optionally
/// strips terminal escape sequences.
#[derive(Debug, Default)]
pub struct LineAssembler {
    pending: Vec<u8>,
    strip_ansi: bool,
}

impl LineAssembler {
    pub fn new(strip_ansi: bool) -> Self {
        Self {
            pending: Vec::new(),
            strip_ansi,
        }
    }

    /// Feed a chunk, returning every line it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(chunk);

        let mut lines = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.pending[start..].iter().position(|b| *b == b'\n') {
            let end = start + pos;
            lines.push(decode(&self.pending[start..end], self.strip_ansi));
            start = end + 1;
        }
        self.pending.drain(..start);

        if self.pending.len() >= MAX_PENDING_BYTES {
            // Keep a character split by the read boundary for the next chunk
            let cut = self.pending.len() - incomplete_suffix(&self.pending);
            lines.push(decode(&self.pending[..cut], self.strip_ansi));
            self.pending.drain(..cut);
        }

        lines
    }

    /// Flush the partial line left at end-of-stream, if any
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let line = decode(&self.pending, self.strip_ansi);
        self.pending.clear();
        Some(line)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }
}

/// Length of a UTF-8 sequence cut short at the end of `bytes` (0 if none)
fn incomplete_suffix(bytes: &[u8]) -> usize {
    for back in 1..=bytes.len().min(3) {
        let byte = bytes[bytes.len() - back];
        if byte & 0xC0 == 0x80 {
            continue;
        }
        let width = match byte {
            0xC0..=0xDF => 2,
            0xE0..=0xEF => 3,
            0xF0..=0xF7 => 4,
            _ => 1,
        };
        return if width > back { back } else { 0 };
    }
    0
}

fn decode(bytes: &[u8], strip_ansi: bool) -> String {
    let bytes = bytes.strip_suffix(b"\r").unwrap_or(bytes);
    let text = String::from_utf8_lossy(bytes);
    if strip_ansi {
        strip_ansi_escapes::strip_str(&text).to_string()
    } else {
        text.into_owned()
    }
}

// ============================================================================
// RunLog
// ============================================================================

/// Append-only log file for one run of a tool
///
/// Opened when the run starts, dropped (closed) when the run ends.
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
    writer: LineWriter<File>,
}

impl RunLog {
    /// Open for append, creating the parent directory if needed
    pub fn open(path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        let file = OpenOptions::new().create(true).append(true).open(path)?;
        Ok(Self {
            path: path.to_path_buf(),
            writer: LineWriter::new(file),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn write_line(&mut self, line: &LogLine) -> std::io::Result<()> {
        writeln!(self.writer, "{}", line.format_for_file())
    }
}

// ============================================================================
// LogFeed
// ============================================================================

/// Bounded history of the merged feed
///
/// Oldest lines are evicted first.
#[derive(Debug)]
pub struct LogFeed {
    entries: VecDeque<LogLine>,
    max_entries: usize,
}

impl Default for LogFeed {
    fn default() -> Self {
        Self::new(DEFAULT_HISTORY_LIMIT)
    }
}

impl LogFeed {
    pub fn new(max_entries: usize) -> Self {
        let max_entries = max_entries.max(1);
        Self {
            entries: VecDeque::with_capacity(max_entries.min(1024)),
            max_entries,
        }
    }

    /// Add a line
    pub fn push(&mut self, line: LogLine) {
        if self.entries.len() >= self.max_entries {
            self.entries.pop_front();
        }
        self.entries.push_back(line);
    }

    /// All retained lines, oldest first
    pub fn entries(&self) -> impl Iterator<Item = &LogLine> {
        self.entries.iter()
    }

    /// Retained lines of one tool, oldest first
    pub fn for_tool(&self, tool_id: &str) -> Vec<LogLine> {
        self.entries
            .iter()
            .filter(|l| l.tool_id == tool_id)
            .cloned()
            .collect()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_assembler_splits_and_keeps_partial() {
        let mut asm = LineAssembler::new(false);
        assert_eq!(asm.push(b"one\ntw"), vec!["one"]);
        assert!(asm.has_pending());
        assert_eq!(asm.push(b"o\r\nthree\n"), vec!["two", "three"]);
        assert_eq!(asm.finish(), None);
    }

    #[test]
    fn test_assembler_flushes_partial_at_eof() {
        let mut asm = LineAssembler::new(false);
        assert!(asm.push(b"no newline").is_empty());
        assert_eq!(asm.finish().as_deref(), Some("no newline"));
        assert_eq!(asm.finish(), None);
    }

    #[test]
    fn test_assembler_keeps_blank_lines() {
        let mut asm = LineAssembler::new(false);
        assert_eq!(asm.push(b"a\n\nb\n"), vec!["a", "", "b"]);
    }

    #[test]
    fn test_assembler_lossy_and_ansi() {
        let mut asm = LineAssembler::new(true);
        let lines = asm.push(b"\x1b[31mred\x1b[0m \xff\n");
        assert_eq!(lines, vec!["red \u{FFFD}"]);

        let mut raw = LineAssembler::new(false);
        let lines = raw.push(b"\x1b[31mred\x1b[0m\n");
        assert_eq!(lines, vec!["\x1b[31mred\x1b[0m"]);
    }

    #[test]
    fn test_assembler_caps_runaway_line() {
        let mut asm = LineAssembler::new(false);
        let chunk = vec![b'x'; MAX_PENDING_BYTES];
        let lines = asm.push(&chunk);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_PENDING_BYTES);
        assert!(!asm.has_pending());
    }

    #[test]
    fn test_assembler_cap_keeps_split_character() {
        let mut asm = LineAssembler::new(false);
        let e_acute = "é".as_bytes();

        let mut chunk = vec![b'x'; MAX_PENDING_BYTES - 1];
        chunk.push(e_acute[0]);
        let lines = asm.push(&chunk);
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].len(), MAX_PENDING_BYTES - 1);
        assert!(asm.has_pending());

        let mut rest = vec![e_acute[1]];
        rest.extend_from_slice(b" tail\n");
        assert_eq!(asm.push(&rest), vec!["é tail"]);
        assert!(!asm.has_pending());
    }

    #[test]
    fn test_incomplete_suffix() {
        assert_eq!(incomplete_suffix(b"abc"), 0);
        assert_eq!(incomplete_suffix("aé".as_bytes()), 0);
        assert_eq!(incomplete_suffix(&"a€".as_bytes()[..3]), 2);
        assert_eq!(incomplete_suffix(&[b'a', 0xF0, 0x9F, 0x98]), 3);
        // 잘못된 바이트는 그대로 디코딩 단계로 넘김
        assert_eq!(incomplete_suffix(&[b'a', 0xFF]), 0);
        assert_eq!(incomplete_suffix(&[0x80, 0x80, 0x80]), 0);
    }

    #[test]
    fn test_run_log_appends() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logs").join("launcher_dash.log");

        {
            let mut log = RunLog::open(&path).unwrap();
            log.write_line(&LogLine::new("dash1", LogStream::Stdout, "first"))
                .unwrap();
        }
        {
            let mut log = RunLog::open(&path).unwrap();
            log.write_line(&LogLine::new("dash1", LogStream::Stderr, "second"))
                .unwrap();
        }

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<_> = content.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("[stdout] first"));
        assert!(lines[1].ends_with("[stderr] second"));
    }

    #[test]
    fn test_feed_evicts_oldest() {
        let mut feed = LogFeed::new(3);
        for i in 0..5 {
            feed.push(LogLine::new(
                if i % 2 == 0 { "a" } else { "b" },
                LogStream::Stdout,
                format!("line {}", i),
            ));
        }

        assert_eq!(feed.len(), 3);
        let texts: Vec<_> = feed.entries().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["line 2", "line 3", "line 4"]);
        assert_eq!(feed.for_tool("a").len(), 2);
    }

    #[test]
    fn test_format_prefixed() {
        let line = LogLine::new("dash1", LogStream::Stdout, "ready");
        assert_eq!(line.format_prefixed("Dash"), "[Dash] ready");
        assert_eq!(LogStream::Supervisor.to_string(), "launcher");
    }
}
