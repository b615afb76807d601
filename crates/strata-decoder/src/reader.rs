use std::fs;
use std::io::{self, Read};
use std::sync::{Mutex, OnceLock, PoisonError};
use std::thread::{self, JoinHandle};

use bytes::Bytes;
use strata_sync::{Abandoned, Pending, oneshot};
use strata_types::{Buffer, EntityBits, File, Header};

use crate::config::ReaderConfig;
use crate::error::{Failure, OpenError};
use crate::factory::{ParserConstructor, ParserFactory};
use crate::parser::{BufferQueue, ChunkQueue, RunSummary};
use crate::source::ChunkSource;

/// An open decode run over one input.
///
/// Opening a reader starts two threads and wires them together:
///
/// ```text
///   input ──▶ [strata-source] ──chunks──▶ [strata-parser] ──buffers──▶ Reader::read
///                                               │
///                                               └──header──▶ Reader::header().get()
/// ```
///
/// The input queue is bounded by [`ReaderConfig::input_queue_capacity`];
/// the output queue is not, so the parser never waits on the consumer.
///
/// Dropping the reader (or calling [`close`](Self::close)) discards
/// unread buffers and joins both threads. The parser drains the input up
/// to its end, so closing early still reads the rest of the input.
pub struct Reader {
    file: File,
    header: HeaderHandle,
    buffers: BufferStream,
    source: Option<JoinHandle<u64>>,
    parser: Option<JoinHandle<RunSummary>>,
}

impl Reader {
    /// Open `file` and start decoding it with the parser registered for
    /// its format. A filename of `-` reads standard input.
    ///
    /// # Errors
    ///
    /// - [`OpenError::UnsupportedFormat`] if no parser is registered for
    ///   the file's format. Checked before the file is touched.
    /// - [`OpenError::Io`] if the file cannot be opened.
    /// - [`OpenError::Spawn`] if a worker thread cannot be started.
    pub fn open(
        factory: &ParserFactory,
        file: File,
        read_types: EntityBits,
        config: &ReaderConfig,
    ) -> Result<Self, OpenError> {
        let constructor = factory.resolve(&file)?;

        let input: Box<dyn Read + Send> = if file.is_stdin() {
            Box::new(io::stdin())
        } else {
            let handle = fs::File::open(file.filename()).map_err(|source| OpenError::Io {
                path: file.filename().to_string(),
                source,
            })?;
            Box::new(handle)
        };

        Self::start(&constructor, file, input, read_types, config)
    }

    /// Start decoding `source` as if it were the content of `file`.
    ///
    /// Only the format of `file` is used; nothing is opened.
    ///
    /// # Errors
    ///
    /// [`OpenError::UnsupportedFormat`] or [`OpenError::Spawn`], as for
    /// [`open`](Self::open).
    pub fn from_reader<R>(
        factory: &ParserFactory,
        file: File,
        source: R,
        read_types: EntityBits,
        config: &ReaderConfig,
    ) -> Result<Self, OpenError>
    where
        R: Read + Send + 'static,
    {
        let constructor = factory.resolve(&file)?;
        Self::start(&constructor, file, source, read_types, config)
    }

    fn start<R>(
        constructor: &ParserConstructor,
        file: File,
        source: R,
        read_types: EntityBits,
        config: &ReaderConfig,
    ) -> Result<Self, OpenError>
    where
        R: Read + Send + 'static,
    {
        let input = ChunkQueue::bounded(config.input_queue_capacity);
        let output = BufferQueue::unbounded();
        let (promise, pending_header) = oneshot();

        let worker = constructor.build(input.clone(), output.clone(), promise, read_types);
        let parser = thread::Builder::new()
            .name("strata-parser".to_string())
            .spawn(move || worker.run())
            .map_err(|source| OpenError::Spawn {
                thread: "parser",
                source,
            })?;

        let source = match ChunkSource::spawn(source, config.chunk_size, input.clone()) {
            Ok(handle) => handle,
            Err(err) => {
                tracing::error!(error = %err, "failed to start chunk source");
                // The parser is already waiting for input. Fail it and let
                // it shut down before reporting the error.
                input.push(Err(io::Error::new(err.kind(), err.to_string())));
                input.push(Ok(Bytes::new()));
                BufferStream::new(output).drain();
                if parser.join().is_err() {
                    tracing::warn!("parser thread panicked");
                }
                return Err(OpenError::Spawn {
                    thread: "source",
                    source: err,
                });
            }
        };

        tracing::debug!(
            filename = file.filename(),
            format = %file.format(),
            chunk_size = config.chunk_size,
            input_queue_capacity = config.input_queue_capacity,
            "reader opened"
        );

        Ok(Self {
            file,
            header: HeaderHandle::new(pending_header),
            buffers: BufferStream::new(output),
            source: Some(source),
            parser: Some(parser),
        })
    }

    #[must_use]
    pub fn file(&self) -> &File {
        &self.file
    }

    /// The header of the input, available once the parser has read it.
    #[must_use]
    pub fn header(&self) -> &HeaderHandle {
        &self.header
    }

    /// Block until the next buffer is decoded.
    ///
    /// Returns `Ok(None)` at end of stream, and on every call after that.
    ///
    /// # Errors
    ///
    /// The [`Failure`] that stopped the parser. Buffers decoded before
    /// the failure have already been returned; the next call returns
    /// `Ok(None)`.
    pub fn read(&mut self) -> Result<Option<Buffer>, Failure> {
        self.buffers.next_buffer()
    }

    /// The decoded buffers, as an iterator.
    pub fn buffers(&mut self) -> &mut BufferStream {
        &mut self.buffers
    }

    /// Stop reading and wait for both threads to finish.
    ///
    /// Unread buffers are discarded.
    pub fn close(mut self) -> RunSummary {
        self.shutdown().unwrap_or_default()
    }

    fn shutdown(&mut self) -> Option<RunSummary> {
        let parser = self.parser.take()?;

        let discarded = self.buffers.drain();
        if discarded > 0 {
            tracing::debug!(discarded, "discarded unread buffers");
        }

        let summary = match parser.join() {
            Ok(summary) => Some(summary),
            Err(_) => {
                tracing::warn!("parser thread panicked");
                None
            }
        };

        if let Some(source) = self.source.take() {
            match source.join() {
                Ok(bytes_read) => tracing::debug!(bytes_read, "chunk source joined"),
                Err(_) => tracing::warn!("chunk source thread panicked"),
            }
        }

        tracing::debug!(filename = self.file.filename(), "reader closed");
        summary
    }
}

impl Drop for Reader {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Consumer side of a run's header result.
///
/// The first [`get`](Self::get) blocks until the parser resolves the
/// header; later calls return the cached result. Safe to share between
/// threads.
pub struct HeaderHandle {
    pending: Mutex<Option<Pending<Header, Failure>>>,
    value: OnceLock<Result<Header, Failure>>,
}

impl HeaderHandle {
    #[must_use]
    pub fn new(pending: Pending<Header, Failure>) -> Self {
        Self {
            pending: Mutex::new(Some(pending)),
            value: OnceLock::new(),
        }
    }

    /// The header, blocking until it is available.
    ///
    /// # Errors
    ///
    /// The [`Failure`] the parser stopped with, if it stopped before
    /// producing a header.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous runtime context,
    /// where blocking the thread is not allowed. Use
    /// `tokio::task::spawn_blocking` there.
    pub fn get(&self) -> Result<Header, Failure> {
        self.value
            .get_or_init(|| {
                // The lock must be released before `read` blocks.
                let pending = self.lock().take();
                match pending {
                    Some(pending) => pending.read(),
                    None => Err(Abandoned.into()),
                }
            })
            .clone()
    }

    /// Whether [`get`](Self::get) would return without blocking.
    #[must_use]
    pub fn is_resolved(&self) -> bool {
        if self.value.get().is_some() {
            return true;
        }
        self.lock().as_mut().is_some_and(Pending::is_resolved)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Option<Pending<Header, Failure>>> {
        self.pending.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for HeaderHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HeaderHandle")
            .field("value", &self.value.get())
            .finish_non_exhaustive()
    }
}

/// Consumer side of the output queue.
///
/// Reading stops at the end-of-stream marker. After that nothing is
/// popped again, so the stream never blocks once finished.
#[derive(Debug)]
pub struct BufferStream {
    output: BufferQueue,
    finished: bool,
}

impl BufferStream {
    #[must_use]
    pub fn new(output: BufferQueue) -> Self {
        Self {
            output,
            finished: false,
        }
    }

    /// Block until the next buffer arrives.
    ///
    /// # Errors
    ///
    /// A failed entry on the output queue. The stream continues after it;
    /// the next entry is the end-of-stream marker.
    pub fn next_buffer(&mut self) -> Result<Option<Buffer>, Failure> {
        if self.finished {
            return Ok(None);
        }
        match self.output.wait_and_pop().read() {
            Ok(buffer) if buffer.is_empty() => {
                self.finished = true;
                Ok(None)
            }
            Ok(buffer) => Ok(Some(buffer)),
            Err(failure) => Err(failure),
        }
    }

    /// Whether the end-of-stream marker has been read.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Pop and discard everything up to and including the end marker.
    ///
    /// Returns the number of entries discarded, failures included.
    pub fn drain(&mut self) -> usize {
        let mut discarded = 0;
        while !self.finished {
            if let Ok(None) = self.next_buffer() {
                break;
            }
            discarded += 1;
        }
        discarded
    }
}

impl Iterator for BufferStream {
    type Item = Result<Buffer, Failure>;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_buffer().transpose()
    }
}
