use std::io::{self, Read};
use std::thread::{self, JoinHandle};

use bytes::Bytes;

use crate::parser::ChunkQueue;

/// Producer side of a decode run: cuts raw input into chunks.
///
/// Whatever happens, the source finishes the queue with exactly one
/// empty chunk and pushes nothing after it:
///
/// ```text
///   ok run:      [c1] [c2] ... [cn] [""]
///   read error:  [c1] ... [Err(e)] [""]
/// ```
///
/// When the queue is bounded, pushing blocks until the parser catches
/// up, so a slow parser throttles disk reads instead of buffering the
/// whole file.
pub struct ChunkSource;

impl ChunkSource {
    /// Start a thread that feeds `reader` into `queue`.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the thread cannot be spawned. Nothing has
    /// been pushed to the queue in that case.
    pub fn spawn<R>(reader: R, chunk_size: usize, queue: ChunkQueue) -> io::Result<JoinHandle<u64>>
    where
        R: Read + Send + 'static,
    {
        thread::Builder::new()
            .name("strata-source".to_string())
            .spawn(move || Self::pump(reader, chunk_size, &queue))
    }

    /// Feed `reader` into `queue` on the current thread.
    ///
    /// Returns the number of bytes read.
    pub fn pump<R: Read>(mut reader: R, chunk_size: usize, queue: &ChunkQueue) -> u64 {
        let chunk_size = chunk_size.max(1);
        let mut total = 0u64;

        loop {
            let mut buf = vec![0u8; chunk_size];
            match reader.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => {
                    buf.truncate(n);
                    total += n as u64;
                    queue.push(Ok(Bytes::from(buf)));
                }
                Err(err) if err.kind() == io::ErrorKind::Interrupted => {}
                Err(err) => {
                    tracing::warn!(error = %err, bytes_read = total, "chunk source read failed");
                    queue.push(Err(err));
                    break;
                }
            }
        }

        queue.push(Ok(Bytes::new()));
        tracing::debug!(bytes_read = total, "chunk source finished");
        total
    }

    /// Feed an in-memory buffer into `queue`, `chunk_size` bytes at a time.
    ///
    /// Chunks are slices of `data`; nothing is copied.
    pub fn from_bytes(data: &Bytes, chunk_size: usize, queue: &ChunkQueue) {
        let chunk_size = chunk_size.max(1);
        let mut offset = 0;
        while offset < data.len() {
            let end = (offset + chunk_size).min(data.len());
            queue.push(Ok(data.slice(offset..end)));
            offset = end;
        }
        queue.push(Ok(Bytes::new()));
    }
}
