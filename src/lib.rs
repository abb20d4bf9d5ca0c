pub mod bot;
pub mod config;
pub mod error;
pub mod exec;
pub mod files;
pub mod log;
pub mod sink;

pub use error::{Error, Result};
pub use exec::{CommandSession, ExecutionResult, SessionState};
pub use sink::{DisplaySink, RenderMode, SinkError};
