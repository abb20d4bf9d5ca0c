//! Progress update throttling for the display channel.
//!
//! The remote surface is rate limited, so mid-run updates are pushed at
//! most every [`MIN_PUBLISH_INTERVAL`] — unless enough new output has
//! accumulated to cross [`SIZE_PRESSURE_CHARS`], which overrides the
//! interval (time OR size, whichever unlocks first). Identical content is
//! never re-sent.

use std::time::{Duration, Instant};

use crate::sink::{DisplaySink, RenderMode, SinkError};
use crate::{olog_debug, olog_warn};

/// Minimum time between consecutive progress pushes.
pub const MIN_PUBLISH_INTERVAL: Duration = Duration::from_secs(2);

/// Accumulated-output size above which the interval no longer applies.
pub const SIZE_PRESSURE_CHARS: usize = 3500;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    /// Candidate is exactly what was last sent.
    Unchanged,
    /// Inside the throttle window with no size pressure.
    Throttled,
}

/// Outcome of one publish attempt. `Sent` means a transmission was
/// attempted; a failed attempt is logged, never propagated, and still
/// advances the throttle clock so the retry waits out the window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PublishDecision {
    Sent,
    Skipped(SkipReason),
}

/// Tracks what was last pushed to the display surface. Reset per invocation.
#[derive(Debug)]
pub struct ProgressPublisher {
    last_sent_text: String,
    last_sent_at: Option<Instant>,
    min_interval: Duration,
    pressure_threshold: usize,
}

impl Default for ProgressPublisher {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgressPublisher {
    pub fn new() -> Self {
        Self::with_limits(MIN_PUBLISH_INTERVAL, SIZE_PRESSURE_CHARS)
    }

    pub fn with_limits(min_interval: Duration, pressure_threshold: usize) -> Self {
        Self {
            last_sent_text: String::new(),
            last_sent_at: None,
            min_interval,
            pressure_threshold,
        }
    }

    /// Decide whether to push `candidate` to the sink, and push it if so.
    ///
    /// `accumulated_chars` is the total accumulated output size, used for
    /// the size-pressure override. `now` is injected so tests control time.
    pub async fn maybe_publish(
        &mut self,
        sink: &mut dyn DisplaySink,
        candidate: &str,
        accumulated_chars: usize,
        now: Instant,
    ) -> PublishDecision {
        if candidate == self.last_sent_text {
            return PublishDecision::Skipped(SkipReason::Unchanged);
        }

        if let Some(at) = self.last_sent_at {
            let elapsed = now.saturating_duration_since(at);
            if elapsed < self.min_interval && accumulated_chars <= self.pressure_threshold {
                return PublishDecision::Skipped(SkipReason::Throttled);
            }
        }

        match sink.update(candidate, RenderMode::Monospace).await {
            Ok(()) => {
                self.last_sent_text = candidate.to_string();
                self.last_sent_at = Some(now);
            }
            Err(SinkError::Unchanged) => {
                // The surface already shows this content.
                olog_debug!("progress update skipped by channel: content unchanged");
                self.last_sent_text = candidate.to_string();
                self.last_sent_at = Some(now);
            }
            Err(SinkError::Channel(e)) => {
                olog_warn!("progress update failed, command continues: {e}");
                self.last_sent_at = Some(now);
            }
        }
        PublishDecision::Sent
    }
}
