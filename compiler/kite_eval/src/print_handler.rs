//! Print handler for configurable output.
//!
//! The `print` operation writes through a handler chosen by the embedder:
//! - Stdout: the `kite run` default
//! - Buffer: tests and embedders that inspect output
//! - Silent: `kite check`
//!
//! Workers share their parent's handler, so output from spawned code lands
//! in the same place.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::EvalMode;

/// Handler that captures output to a buffer.
#[derive(Default)]
pub struct BufferPrintHandler {
    buffer: Mutex<String>,
}

impl BufferPrintHandler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a line (with newline).
    pub fn println(&self, msg: &str) {
        let mut buf = self.buffer.lock();
        buf.push_str(msg);
        buf.push('\n');
    }

    /// Everything printed so far.
    pub fn output(&self) -> String {
        self.buffer.lock().clone()
    }

    pub fn clear(&self) {
        self.buffer.lock().clear();
    }
}

/// Print handler, dispatched by enum.
pub enum PrintHandler {
    /// Writes to stdout.
    Stdout,
    /// Captures to a buffer.
    Buffer(BufferPrintHandler),
    /// Discards all output.
    Silent,
}

impl PrintHandler {
    /// Print a line (with newline).
    pub fn println(&self, msg: &str) {
        match self {
            Self::Stdout => println!("{msg}"),
            Self::Buffer(h) => h.println(msg),
            Self::Silent => {}
        }
    }

    /// Captured output. Empty for handlers that don't capture.
    pub fn output(&self) -> String {
        match self {
            Self::Buffer(h) => h.output(),
            Self::Stdout | Self::Silent => String::new(),
        }
    }

    pub fn clear(&self) {
        if let Self::Buffer(h) = self {
            h.clear();
        }
    }
}

/// Shared print handler that can be passed to workers.
pub type SharedPrintHandler = Arc<PrintHandler>;

pub fn stdout_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Stdout)
}

pub fn buffer_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Buffer(BufferPrintHandler::new()))
}

pub fn silent_handler() -> SharedPrintHandler {
    Arc::new(PrintHandler::Silent)
}

/// The handler an evaluation mode prints through.
pub fn handler_for(mode: EvalMode) -> SharedPrintHandler {
    match mode {
        EvalMode::Interpret => stdout_handler(),
        EvalMode::Capture => buffer_handler(),
        EvalMode::Check => silent_handler(),
    }
}
