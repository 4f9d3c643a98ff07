//! Splits decoded SSE text into event frames.

/// Blank line terminating one SSE event.
pub const FRAME_DELIMITER: &str = "\n\n";

/// Text buffer that yields complete frames and keeps the trailing partial one.
#[derive(Debug, Default)]
pub struct FrameBuffer {
    buffer: String,
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append decoded text and return every frame completed by it, in order.
    pub fn push(&mut self, text: &str) -> Vec<String> {
        self.buffer.push_str(text);

        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.find(FRAME_DELIMITER) {
            frames.push(self.buffer[..pos].to_string());
            self.buffer.drain(..pos + FRAME_DELIMITER.len());
        }
        frames
    }

    /// Take whatever is left once the source is exhausted.
    pub fn finish(&mut self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(std::mem::take(&mut self.buffer))
        }
    }

    /// The incomplete frame carried to the next read.
    pub fn pending(&self) -> &str {
        &self.buffer
    }
}
