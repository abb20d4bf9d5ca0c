//! Display sink abstraction.
//!
//! A [`DisplaySink`] is the remote surface progress and final reports are
//! pushed to. The command execution core only knows this trait; the
//! Telegram implementation lives in [`crate::bot`].

use async_trait::async_trait;
use thiserror::Error;

/// How the sink should render pushed text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderMode {
    Plain,
    /// Text contains preformatted/monospace markup.
    Monospace,
}

/// Errors from pushing text to the display surface.
///
/// `Unchanged` is the one subtype callers treat as success: the surface
/// already shows exactly this content.
#[derive(Error, Debug)]
pub enum SinkError {
    #[error("content identical to what is displayed")]
    Unchanged,

    #[error("display channel error: {0}")]
    Channel(String),
}

pub type SinkResult = std::result::Result<(), SinkError>;

/// The remote display surface for one invocation.
///
/// `post` sends a fresh message and remembers it as the edit target;
/// `update` edits that message in place. Latency or failure here must never
/// block or abort the command being executed, so callers handle errors
/// locally instead of propagating them.
#[async_trait]
pub trait DisplaySink: Send {
    async fn post(&mut self, text: &str, mode: RenderMode) -> SinkResult;

    async fn update(&mut self, text: &str, mode: RenderMode) -> SinkResult;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sink_error_display() {
        assert_eq!(
            format!("{}", SinkError::Unchanged),
            "content identical to what is displayed"
        );
        assert_eq!(
            format!("{}", SinkError::Channel("offline".to_string())),
            "display channel error: offline"
        );
    }
}
