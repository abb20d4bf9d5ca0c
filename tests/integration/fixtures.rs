//! Test fixtures for integration tests.
//!
//! Provides an in-memory [`DisplaySink`] that records everything the
//! pipeline pushes, so tests can assert on the operator-visible stream.

use async_trait::async_trait;

use opsbot::sink::{DisplaySink, RenderMode, SinkError, SinkResult};

/// Records every post and update pushed to the display surface.
#[derive(Default)]
pub struct RecordingSink {
    pub posts: Vec<String>,
    pub updates: Vec<String>,
    /// When set, `update` fails with this channel error message.
    pub fail_updates_with: Option<String>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// The last text the operator would see in the progress bubble.
    pub fn final_text(&self) -> Option<&str> {
        self.updates.last().map(|s| s.as_str())
    }

    /// Total number of messages pushed, posts and updates combined.
    pub fn push_count(&self) -> usize {
        self.posts.len() + self.updates.len()
    }
}

#[async_trait]
impl DisplaySink for RecordingSink {
    async fn post(&mut self, text: &str, _mode: RenderMode) -> SinkResult {
        self.posts.push(text.to_string());
        Ok(())
    }

    async fn update(&mut self, text: &str, _mode: RenderMode) -> SinkResult {
        if let Some(msg) = &self.fail_updates_with {
            return Err(SinkError::Channel(msg.clone()));
        }
        self.updates.push(text.to_string());
        Ok(())
    }
}
