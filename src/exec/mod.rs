//! Command execution pipeline.
//!
//! The pipeline has four pieces, orchestrated per invocation:
//! - [`runner`]: subprocess lifecycle and bounded-timeout stream reads
//! - [`output`]: unbounded transcript accumulation and tail rendering
//! - [`publish`]: throttled progress pushes to the display channel
//! - [`session`]: the state machine driving the other three

pub mod output;
pub mod publish;
pub mod runner;
pub mod session;

pub use output::{OutputBuffer, StreamKind};
pub use publish::{ProgressPublisher, PublishDecision, SkipReason};
pub use runner::RunningProcess;
pub use session::{CommandSession, ExecutionResult, SessionState};

use crate::sink::DisplaySink;
use crate::Result;

/// Execute one operator-issued command and stream progress to `sink`.
///
/// This is the single operation the transport layer calls; authorization
/// has already happened by the time a command reaches it.
pub async fn run(
    shell: &str,
    command_text: &str,
    sink: &mut dyn DisplaySink,
) -> Result<ExecutionResult> {
    CommandSession::new(shell, command_text).run(sink).await
}
