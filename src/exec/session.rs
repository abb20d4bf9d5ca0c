//! One end-to-end command invocation: spawn, poll, publish, finalize.
//!
//! A session owns exactly one [`RunningProcess`] for its lifetime and
//! drives it on a single cooperative task: bounded-timeout reads on both
//! streams, a short yield between iterations, a non-blocking exit check.
//! Every invocation ends with exactly one terminal message to the
//! operator — a finalized report or an error report, never silence.

use std::time::{Duration, Instant};

use crate::exec::output::{head_chars, OutputBuffer, StreamKind};
use crate::exec::publish::ProgressPublisher;
use crate::exec::runner::RunningProcess;
use crate::sink::{DisplaySink, RenderMode, SinkError};
use crate::{olog, olog_error, olog_warn, Error, Result};

/// Bounded wait for the first read of a stream inside one poll.
const STREAM_WAIT: Duration = Duration::from_millis(100);

/// Bounded wait for follow-up reads once a stream has produced a line.
const FOLLOWUP_WAIT: Duration = Duration::from_millis(5);

/// Cap on lines taken from one stream per poll, so a verbose producer
/// cannot starve the other stream or the exit check.
const MAX_CHUNKS_PER_POLL: usize = 128;

/// Yield between poll iterations to avoid busy-spinning.
const LOOP_YIELD: Duration = Duration::from_millis(200);

/// Tail of accumulated output shown in mid-run progress updates.
pub const SNIPPET_CHARS: usize = 3800;

/// Char budget for the final message; leaves room for the 4096-char
/// display limit overhead.
pub const MESSAGE_BUDGET: usize = 4090;

/// Appended whenever the final message had to be cut.
pub const TRUNCATION_MARKER: &str = "\n... (output truncated)";

/// Terminal artifact of one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionResult {
    pub exit_code: i32,
    pub combined_output: String,
}

impl ExecutionResult {
    pub fn is_success(&self) -> bool {
        self.exit_code == 0
    }
}

/// Session lifecycle. `Failed` is terminal and reachable from `Starting`
/// (spawn error) or `Draining` (the child could not be reaped).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Draining,
    Finalizing,
    Done,
    Failed,
}

/// Orchestrates runner, buffer, and publisher for one invocation.
pub struct CommandSession {
    shell: String,
    command: String,
    state: SessionState,
}

impl CommandSession {
    pub fn new(shell: &str, command_text: &str) -> Self {
        Self {
            shell: shell.to_string(),
            command: command_text.to_string(),
            state: SessionState::Starting,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Run the command to completion, streaming progress to `sink`.
    ///
    /// Progress-channel failures never abort the command; only a spawn
    /// failure or a failure to reap the child ends the invocation early,
    /// and both are reported to the operator exactly once.
    pub async fn run(&mut self, sink: &mut dyn DisplaySink) -> Result<ExecutionResult> {
        olog!("Running command: {}", self.command);

        let mut proc = match RunningProcess::spawn(&self.shell, &self.command) {
            Ok(proc) => proc,
            Err(e) => {
                self.state = SessionState::Failed;
                self.report_error(sink, &e).await;
                return Err(e);
            }
        };

        if let Err(e) = sink
            .post(
                &format!("⏳ Running:\n`{}`", self.command),
                RenderMode::Monospace,
            )
            .await
        {
            olog_warn!("failed to post placeholder message: {e}");
        }

        self.state = SessionState::Running;
        let mut buffer = OutputBuffer::new();
        let mut publisher = ProgressPublisher::new();

        loop {
            poll_stream(&mut proc, &mut buffer, StreamKind::Stdout).await;
            poll_stream(&mut proc, &mut buffer, StreamKind::Stderr).await;

            if !buffer.is_empty() {
                let status = self.running_status(&buffer);
                publisher
                    .maybe_publish(sink, &status, buffer.accumulated_chars(), Instant::now())
                    .await;
            }

            tokio::time::sleep(LOOP_YIELD).await;
            if proc.has_exited() {
                break;
            }
        }

        self.state = SessionState::Draining;
        let finalized = match proc.finalize().await {
            Ok(finalized) => finalized,
            Err(e) => {
                self.state = SessionState::Failed;
                self.report_error(sink, &e).await;
                return Err(e);
            }
        };
        buffer.append(StreamKind::Stdout, &finalized.residual_stdout);
        buffer.append(StreamKind::Stderr, &finalized.residual_stderr);

        self.state = SessionState::Finalizing;
        let result = ExecutionResult {
            exit_code: finalized.exit_code,
            combined_output: buffer.render_full(),
        };

        let final_text = self.final_report(&result);
        match sink.update(&final_text, RenderMode::Monospace).await {
            Ok(()) | Err(SinkError::Unchanged) => {}
            Err(SinkError::Channel(e)) => {
                // One attempt only; the result is still returned to the caller.
                olog_error!("failed to send final report for `{}`: {e}", self.command);
            }
        }

        self.state = SessionState::Done;
        olog!(
            "Command `{}` finished with exit code {}",
            self.command,
            result.exit_code
        );
        Ok(result)
    }

    fn running_status(&self, buffer: &OutputBuffer) -> String {
        format!(
            "⏳ Running:\n`{}`\n\nOutput:\n```\n{}\n```",
            self.command,
            buffer.render_snippet(SNIPPET_CHARS)
        )
    }

    fn final_report(&self, result: &ExecutionResult) -> String {
        let banner = if result.is_success() {
            "✅ Success".to_string()
        } else {
            format!("❌ Failed (exit code {})", result.exit_code)
        };
        let text = format!(
            "{banner} executing:\n`{}`\n\nOutput:\n```\n{}\n```",
            self.command, result.combined_output
        );
        if text.chars().count() > MESSAGE_BUDGET {
            olog_warn!("output for `{}` was truncated", self.command);
            let mut cut = head_chars(&text, MESSAGE_BUDGET).to_string();
            cut.push_str(TRUNCATION_MARKER);
            cut
        } else {
            text
        }
    }

    async fn report_error(&self, sink: &mut dyn DisplaySink, err: &Error) {
        olog_error!("command `{}` failed: {err}", self.command);
        let text = format!("❌ Error running:\n`{}`\n\nDetails: {err}", self.command);
        if let Err(e) = sink.post(&text, RenderMode::Monospace).await {
            olog_error!("failed to send error report: {e}");
        }
    }
}

/// Take every chunk the stream has ready, up to [`MAX_CHUNKS_PER_POLL`].
async fn poll_stream(proc: &mut RunningProcess, buffer: &mut OutputBuffer, stream: StreamKind) {
    let mut wait = STREAM_WAIT;
    for _ in 0..MAX_CHUNKS_PER_POLL {
        match proc.read_chunk(stream, wait).await {
            Some(chunk) => {
                buffer.append(stream, &chunk);
                wait = FOLLOWUP_WAIT;
            }
            None => break,
        }
    }
}
