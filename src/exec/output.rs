//! Incremental output accumulation for one command invocation.
//!
//! The buffer retains the full transcript of both streams for the final
//! report; it is intentionally unbounded. Only the rendered snippet shown
//! while the command runs is truncated, and always from the head so the
//! operator sees the most recent output.

/// Which child stream a chunk came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// Marker prefixed to every stderr line in the combined rendering.
pub const STDERR_TAG: &str = "[stderr] ";

/// Accumulates stdout and stderr text for one invocation.
///
/// The combined rendering is a pure function of the two buffers: the full
/// stdout text followed by the full stderr text, each stderr line tagged
/// with [`STDERR_TAG`]. Chunks always start at a line boundary because the
/// runner only emits complete lines.
#[derive(Debug, Default)]
pub struct OutputBuffer {
    stdout: String,
    stderr: String,
    chars: usize,
}

impl OutputBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&mut self, stream: StreamKind, chunk: &str) {
        if chunk.is_empty() {
            return;
        }
        match stream {
            StreamKind::Stdout => {
                self.chars += chunk.chars().count();
                self.stdout.push_str(chunk);
            }
            StreamKind::Stderr => {
                for line in chunk.split_inclusive('\n') {
                    self.chars += STDERR_TAG.len() + line.chars().count();
                    self.stderr.push_str(STDERR_TAG);
                    self.stderr.push_str(line);
                }
            }
        }
    }

    /// Total accumulated chars (tags included), for the publisher's
    /// size-pressure rule.
    pub fn accumulated_chars(&self) -> usize {
        self.chars
    }

    pub fn is_empty(&self) -> bool {
        self.stdout.is_empty() && self.stderr.is_empty()
    }

    /// Untruncated combined rendering: stdout first, then tagged stderr.
    pub fn render_full(&self) -> String {
        let mut combined = String::with_capacity(self.stdout.len() + self.stderr.len());
        combined.push_str(&self.stdout);
        combined.push_str(&self.stderr);
        combined
    }

    /// Tail of the combined rendering, at most `max_chars` characters.
    pub fn render_snippet(&self, max_chars: usize) -> String {
        let full = self.render_full();
        tail_chars(&full, max_chars).to_string()
    }
}

/// Last `max_chars` characters of `s`, on a char boundary.
pub fn tail_chars(s: &str, max_chars: usize) -> &str {
    let count = s.chars().count();
    if count <= max_chars {
        return s;
    }
    s.char_indices()
        .nth(count - max_chars)
        .map(|(idx, _)| &s[idx..])
        .unwrap_or(s)
}

/// First `max_chars` characters of `s`, on a char boundary.
pub fn head_chars(s: &str, max_chars: usize) -> &str {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}
