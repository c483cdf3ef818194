//! Terminal rendering target.

use std::io::{self, Write};

use parking_lot::Mutex;
use tracing::warn;

use overlay_sdk::Surface;

/// Prints overlay frames to stdout, skipping repeats.
#[derive(Default)]
pub struct TerminalSurface {
    last_frame: Mutex<Option<String>>,
}

impl TerminalSurface {
    pub fn new() -> Self {
        Self::default()
    }

    fn write(&self, text: &str) {
        let mut stdout = io::stdout().lock();
        if let Err(e) = writeln!(stdout, "{text}").and_then(|_| stdout.flush()) {
            warn!("Failed to write frame: {}", e);
        }
    }
}

impl Surface for TerminalSurface {
    fn present(&self, frame: &str) {
        let mut last = self.last_frame.lock();
        if last.as_deref() == Some(frame) {
            return;
        }
        *last = Some(frame.to_string());
        self.write(&format!("┌── overlay\n{frame}\n└──"));
    }

    fn clear(&self) {
        if self.last_frame.lock().take().is_some() {
            self.write("── overlay cleared");
        }
    }
}
