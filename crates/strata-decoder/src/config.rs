use serde::Deserialize;

/// Tuning knobs for a [`Reader`](crate::Reader).
///
/// ```text
/// ┌──────────────────────┬─────────┬──────────────────────────────────────┐
/// │ Field                │ Default │ Purpose                              │
/// ├──────────────────────┼─────────┼──────────────────────────────────────┤
/// │ chunk_size           │ 64 KiB  │ Bytes per read from the input        │
/// │ input_queue_capacity │ 20      │ Chunks buffered ahead of the parser  │
/// └──────────────────────┴─────────┴──────────────────────────────────────┘
/// ```
///
/// A full input queue blocks the chunk source, so at most
/// `chunk_size * input_queue_capacity` bytes of raw input are held in
/// memory at once. A capacity of zero makes every chunk a rendezvous
/// between source and parser.
///
/// Can be deserialized from any serde format; missing fields take their
/// defaults.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
pub struct ReaderConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    #[serde(default = "default_input_queue_capacity")]
    pub input_queue_capacity: usize,
}

fn default_chunk_size() -> usize {
    64 * 1024
}

fn default_input_queue_capacity() -> usize {
    20
}

impl Default for ReaderConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            input_queue_capacity: default_input_queue_capacity(),
        }
    }
}

impl ReaderConfig {
    #[must_use]
    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self
    }

    #[must_use]
    pub fn with_input_queue_capacity(mut self, capacity: usize) -> Self {
        self.input_queue_capacity = capacity;
        self
    }
}
