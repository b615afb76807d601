/// A block of decoded entity records.
///
/// Concrete parsers append the records they decode from a run of input
/// chunks and hand the finished buffer to the pipeline, which moves it
/// to the consumer. The record layout inside is owned by the parser;
/// the pipeline only looks at whether a buffer is empty.
///
/// An empty buffer (the `Default`) is the end-of-stream sentinel on a
/// reader's output queue. Parsers never need to send it themselves.
///
/// ```text
///   data: [ rec0 bytes | rec1 bytes | rec2 bytes ]
///   ends: [        e0,          e1,          e2 ]
/// ```
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Buffer {
    data: Vec<u8>,
    ends: Vec<usize>,
}

impl Buffer {
    /// Create an empty buffer with room for `bytes` bytes of records.
    #[must_use]
    pub fn with_capacity(bytes: usize) -> Self {
        Self {
            data: Vec::with_capacity(bytes),
            ends: Vec::new(),
        }
    }

    /// Append one record.
    pub fn push_record(&mut self, record: &[u8]) {
        self.data.extend_from_slice(record);
        self.ends.push(self.data.len());
    }

    /// Number of records in the buffer.
    #[must_use]
    pub fn len(&self) -> usize {
        self.ends.len()
    }

    /// Whether the buffer holds no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ends.is_empty()
    }

    /// Total size of all records in bytes.
    #[must_use]
    pub fn byte_len(&self) -> usize {
        self.data.len()
    }

    /// The raw record bytes, concatenated.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Iterate over the records in insertion order.
    pub fn records(&self) -> impl Iterator<Item = &[u8]> {
        let starts = std::iter::once(0).chain(self.ends.iter().copied());
        starts
            .zip(self.ends.iter().copied())
            .map(|(start, end)| &self.data[start..end])
    }
}
