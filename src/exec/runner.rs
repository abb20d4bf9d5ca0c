//! Subprocess lifecycle for one shell command.
//!
//! The runner owns the child process and both pipe readers. Reads are
//! bounded-timeout attempts so polling stdout, stderr, and exit status can
//! be interleaved on a single task; a hung child never hangs the poll loop.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdout, Command};
use tokio::time::timeout;

use crate::exec::output::StreamKind;
use crate::{olog_warn, Error, Result};

/// Line reader with a carry-over buffer.
///
/// `read_until` is cancel safe: when the bounded wait expires, partially
/// read bytes stay appended to `pending` and complete on a later poll, so
/// no output is ever lost to a timeout.
struct LineReader<R> {
    reader: BufReader<R>,
    pending: Vec<u8>,
    eof: bool,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            reader: BufReader::new(inner),
            pending: Vec::new(),
            eof: false,
        }
    }

    /// Try to read one complete line within `wait`. Returns `None` on
    /// timeout, EOF, or read error; timeouts are a normal outcome here.
    async fn read_line(&mut self, wait: Duration) -> Option<String> {
        if self.eof {
            return None;
        }
        match timeout(wait, self.reader.read_until(b'\n', &mut self.pending)).await {
            // Timeout: partial line stays in pending.
            Err(_) => None,
            Ok(Ok(0)) => {
                self.eof = true;
                if self.pending.is_empty() {
                    None
                } else {
                    Some(self.take_pending())
                }
            }
            Ok(Ok(_)) => {
                if self.pending.last() == Some(&b'\n') {
                    Some(self.take_pending())
                } else {
                    // EOF without trailing newline.
                    self.eof = true;
                    Some(self.take_pending())
                }
            }
            Ok(Err(e)) => {
                olog_warn!("stream read error, treating as end of stream: {e}");
                self.eof = true;
                if self.pending.is_empty() {
                    None
                } else {
                    Some(self.take_pending())
                }
            }
        }
    }

    /// Malformed bytes become U+FFFD placeholders; accumulation continues.
    fn take_pending(&mut self) -> String {
        let chunk = String::from_utf8_lossy(&self.pending).into_owned();
        self.pending.clear();
        chunk
    }

    /// Read the rest of the stream to EOF, including any carried-over bytes.
    async fn drain(mut self) -> Result<String> {
        if !self.eof {
            self.reader.read_to_end(&mut self.pending).await?;
        }
        Ok(String::from_utf8_lossy(&self.pending).into_owned())
    }
}

/// Terminal artifact of [`RunningProcess::finalize`].
#[derive(Debug)]
pub struct Finalized {
    pub exit_code: i32,
    pub residual_stdout: String,
    pub residual_stderr: String,
}

/// One live subprocess plus its two stream readers.
///
/// Owned exclusively by the session that spawned it; consumed by
/// [`finalize`](Self::finalize) once the child has been observed to exit.
pub struct RunningProcess {
    child: Child,
    stdout: LineReader<ChildStdout>,
    stderr: LineReader<ChildStderr>,
}

impl RunningProcess {
    /// Spawn `command_text` under the system shell. The operator is
    /// trusted; the text is passed to the shell verbatim.
    pub fn spawn(shell: &str, command_text: &str) -> Result<Self> {
        let spawn_err = |source| Error::Spawn {
            command: command_text.to_string(),
            source,
        };

        let mut child = Command::new(shell)
            .arg("-c")
            .arg(command_text)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(spawn_err)?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stdout pipe not captured")))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| spawn_err(std::io::Error::other("stderr pipe not captured")))?;

        Ok(Self {
            child,
            stdout: LineReader::new(stdout),
            stderr: LineReader::new(stderr),
        })
    }

    /// Attempt to read one line from the selected stream within `wait`.
    pub async fn read_chunk(&mut self, stream: StreamKind, wait: Duration) -> Option<String> {
        match stream {
            StreamKind::Stdout => self.stdout.read_line(wait).await,
            StreamKind::Stderr => self.stderr.read_line(wait).await,
        }
    }

    /// Non-blocking check of whether the child has terminated.
    pub fn has_exited(&mut self) -> bool {
        match self.child.try_wait() {
            Ok(status) => status.is_some(),
            Err(e) => {
                olog_warn!("try_wait failed, assuming child exited: {e}");
                true
            }
        }
    }

    /// Reap the child, drain both pipes to EOF, and release the handle.
    ///
    /// Exit code is -1 when the child was killed by a signal.
    pub async fn finalize(mut self) -> Result<Finalized> {
        let status = self.child.wait().await?;
        let residual_stdout = self.stdout.drain().await?;
        let residual_stderr = self.stderr.drain().await?;
        Ok(Finalized {
            exit_code: status.code().unwrap_or(-1),
            residual_stdout,
            residual_stderr,
        })
    }
}
