use std::any::Any;
use std::io;
use std::panic::{self, AssertUnwindSafe};

use bytes::Bytes;
use strata_sync::{BlockingQueue, Pending, Promise};
use strata_types::{Buffer, EntityBits, Header};

use crate::error::{DecodeError, Failure, ProtocolViolation};

/// One item on the input queue.
///
/// `Ok` carries raw bytes; an empty `Ok` chunk marks the end of input.
/// `Err` reports that the chunk source could not read further. The
/// source still terminates the queue with an empty chunk afterwards.
pub type Chunk = Result<Bytes, io::Error>;

/// Queue of raw chunks, chunk source → parser.
pub type ChunkQueue = BlockingQueue<Chunk>;

/// One decoded buffer, or the failure that ended the run.
pub type BufferResult = Pending<Buffer, Failure>;

/// Queue of buffer results, parser → consumer.
pub type BufferQueue = BlockingQueue<BufferResult>;

/// Write end of a run's header result.
pub type HeaderPromise = Promise<Header, Failure>;

/// Format-specific decoding logic.
///
/// `run` pulls chunks with [`ParserContext::next_chunk`], decodes them,
/// hands finished buffers to [`ParserContext::emit`] and resolves the
/// header once with [`ParserContext::set_header`]. It may fail at any
/// point, or even panic.
///
/// A parser never runs on its own. It is always driven by a
/// [`ParserWorker`], which turns failures into data, terminates the
/// output stream and drains unread input regardless of what `run` did.
///
/// # Example
///
/// ```rust
/// use strata_decoder::{DecodeError, Parser, ParserContext};
/// use strata_types::{Buffer, Header};
///
/// /// Emits one record per chunk.
/// struct ChunkPerRecord;
///
/// impl Parser for ChunkPerRecord {
///     fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
///         ctx.set_header(Header::new().with_generator("example"))?;
///         while let Some(chunk) = ctx.next_chunk()? {
///             let mut buffer = Buffer::default();
///             buffer.push_record(&chunk);
///             ctx.emit(buffer);
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Parser: Send {
    /// Decode the whole input.
    ///
    /// # Errors
    ///
    /// Any [`DecodeError`]. It reaches the consumer through the header
    /// result (if not yet resolved) and as a failed entry on the output
    /// queue.
    fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError>;
}

/// Everything a [`Parser`] may touch during a run.
///
/// Holds the two queue handles, the header promise until it is used,
/// the caller's entity filter, and whether the terminal chunk has been
/// read. Only the pipeline can build one, so a parser cannot be run
/// outside of a [`ParserWorker`].
pub struct ParserContext {
    input: ChunkQueue,
    output: BufferQueue,
    /// `None` once the header has been resolved, by the parser or by
    /// the worker.
    header: Option<HeaderPromise>,
    read_types: EntityBits,
    input_drained: bool,
    emitted: usize,
}

impl ParserContext {
    pub(crate) fn new(
        input: ChunkQueue,
        output: BufferQueue,
        header: HeaderPromise,
        read_types: EntityBits,
    ) -> Self {
        Self {
            input,
            output,
            header: Some(header),
            read_types,
            input_drained: false,
            emitted: 0,
        }
    }

    /// Block until the next chunk arrives.
    ///
    /// Returns `Ok(None)` once the terminal empty chunk has been read,
    /// and on every call after that.
    ///
    /// # Errors
    ///
    /// Returns [`DecodeError::Io`] if the chunk source reported a read
    /// failure.
    pub fn next_chunk(&mut self) -> Result<Option<Bytes>, DecodeError> {
        if self.input_drained {
            return Ok(None);
        }
        match self.input.wait_and_pop() {
            Ok(chunk) if chunk.is_empty() => {
                self.input_drained = true;
                Ok(None)
            }
            Ok(chunk) => Ok(Some(chunk)),
            Err(err) => Err(DecodeError::Io(err)),
        }
    }

    /// Send a decoded buffer to the consumer.
    ///
    /// Empty buffers are dropped here: on the output queue an empty
    /// buffer means end of stream, and only the worker sends that.
    pub fn emit(&mut self, buffer: Buffer) {
        if buffer.is_empty() {
            tracing::trace!("skipping empty buffer");
            return;
        }
        self.output.push(Pending::ready(buffer));
        self.emitted += 1;
    }

    /// Resolve the run's header.
    ///
    /// # Errors
    ///
    /// Returns [`ProtocolViolation::HeaderAlreadySet`] if the header has
    /// already been resolved.
    pub fn set_header(&mut self, header: Header) -> Result<(), DecodeError> {
        let promise = self
            .header
            .take()
            .ok_or(ProtocolViolation::HeaderAlreadySet)?;
        promise.write_value(header);
        Ok(())
    }

    /// The entity kinds the caller asked for. Passed through unchanged.
    #[must_use]
    pub fn read_types(&self) -> EntityBits {
        self.read_types
    }

    #[must_use]
    pub fn header_done(&self) -> bool {
        self.header.is_none()
    }

    /// Whether the terminal empty chunk has been read.
    #[must_use]
    pub fn input_drained(&self) -> bool {
        self.input_drained
    }

    /// Number of buffers sent so far.
    #[must_use]
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Pop and discard chunks up to and including the terminal one.
    fn drain_input(&mut self) -> usize {
        let mut discarded = 0;
        loop {
            match self.input.wait_and_pop() {
                Ok(chunk) if chunk.is_empty() => break,
                _ => discarded += 1,
            }
        }
        self.input_drained = true;
        discarded
    }
}

/// What happened during one [`ParserWorker::run`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RunSummary {
    /// Buffers emitted by the parser, not counting the end marker.
    pub buffers: usize,
    /// Chunks thrown away while draining unread input.
    pub discarded_chunks: usize,
    /// Whether the parser failed or panicked.
    pub failed: bool,
}

/// A parser bound to the queues and header slot of one decode run.
///
/// Built by `ParserConstructor::build`. Its only operation is
/// [`run`](Self::run), which wraps the parser in the fixed shutdown
/// protocol:
///
/// ```text
///   1. parser.run(ctx)                 (panics are caught)
///   2. on failure:  header ← failure   (if not resolved yet)
///                   output ← failure
///   3. on success without header:
///                   header ← HeaderNotSet
///   4. output ← end of stream          (always, always last)
///   5. drain input up to the terminal chunk, if the parser did not
/// ```
///
/// Step 5 matters when the chunk source feeds a bounded queue: without
/// it, a parser that stops early would leave the source blocked on a
/// full queue forever.
pub struct ParserWorker {
    parser: Box<dyn Parser>,
    ctx: ParserContext,
}

impl ParserWorker {
    pub(crate) fn new(parser: Box<dyn Parser>, ctx: ParserContext) -> Self {
        Self { parser, ctx }
    }

    /// Drive the parser to completion. Usually called on its own thread.
    pub fn run(self) -> RunSummary {
        let Self {
            mut parser,
            mut ctx,
        } = self;
        tracing::debug!(read_types = ?ctx.read_types, "parser started");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| parser.run(&mut ctx)))
            .unwrap_or_else(|payload| Err(DecodeError::Panicked(panic_message(payload.as_ref()))));

        let failed = match outcome {
            Ok(()) => {
                if let Some(promise) = ctx.header.take() {
                    tracing::warn!("parser finished without resolving the header");
                    promise.write_failure(ProtocolViolation::HeaderNotSet.into());
                }
                false
            }
            Err(err) => {
                let failure = Failure::from(err);
                tracing::warn!(error = %failure, emitted = ctx.emitted, "parser failed");
                if let Some(promise) = ctx.header.take() {
                    promise.write_failure(failure.clone());
                }
                ctx.output.push(Pending::failed(failure));
                true
            }
        };

        // End of stream. Nothing is pushed to the output after this.
        ctx.output.push(Pending::ready(Buffer::default()));

        let discarded_chunks = if ctx.input_drained {
            0
        } else {
            let discarded = ctx.drain_input();
            tracing::debug!(discarded, "drained unread input");
            discarded
        };

        let summary = RunSummary {
            buffers: ctx.emitted,
            discarded_chunks,
            failed,
        };
        tracing::debug!(?summary, "parser finished");
        summary
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_sync::oneshot;

    struct Harness {
        input: ChunkQueue,
        output: BufferQueue,
        header: Pending<Header, Failure>,
    }

    fn bind_worker(parser: impl Parser + 'static, chunks: &[&'static [u8]]) -> (ParserWorker, Harness) {
        let input = ChunkQueue::unbounded();
        for chunk in chunks {
            input.push(Ok(Bytes::from_static(chunk)));
        }
        let output = BufferQueue::unbounded();
        let (promise, header) = oneshot();
        let ctx = ParserContext::new(input.clone(), output.clone(), promise, EntityBits::ALL);
        (
            ParserWorker::new(Box::new(parser), ctx),
            Harness {
                input,
                output,
                header,
            },
        )
    }

    fn collect_output(output: &BufferQueue) -> Vec<Result<Buffer, Failure>> {
        std::iter::from_fn(|| output.try_pop()).map(Pending::read).collect()
    }

    fn record(bytes: &[u8]) -> Buffer {
        let mut buffer = Buffer::default();
        buffer.push_record(bytes);
        buffer
    }

    struct Echo;

    impl Parser for Echo {
        fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
            ctx.set_header(Header::new().with_generator("echo"))?;
            while let Some(chunk) = ctx.next_chunk()? {
                ctx.emit(record(&chunk));
            }
            Ok(())
        }
    }

    struct FailAfterFirst;

    impl Parser for FailAfterFirst {
        fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
            ctx.next_chunk()?;
            Err(DecodeError::malformed(0, "unexpected tag"))
        }
    }

    #[test]
    fn success_emits_buffers_then_end_marker() {
        let (worker, h) = bind_worker(Echo, &[b"a", b"b", b""]);
        let summary = worker.run();

        assert_eq!(
            summary,
            RunSummary {
                buffers: 2,
                discarded_chunks: 0,
                failed: false
            }
        );
        let out = collect_output(&h.output);
        assert_eq!(out.len(), 3);
        assert_eq!(out[0].as_ref().unwrap().as_bytes(), b"a");
        assert_eq!(out[1].as_ref().unwrap().as_bytes(), b"b");
        assert!(out[2].as_ref().unwrap().is_empty());
        assert_eq!(h.header.read().unwrap().generator(), "echo");
    }

    #[test]
    fn failure_reaches_header_and_output_and_input_is_drained() {
        let (worker, h) = bind_worker(FailAfterFirst, &[b"c1", b"c2", b"c3", b""]);
        let summary = worker.run();

        assert!(summary.failed);
        assert_eq!(summary.discarded_chunks, 2);
        assert!(h.input.is_empty());

        let out = collect_output(&h.output);
        assert_eq!(out.len(), 2);
        let item_failure = out[0].as_ref().unwrap_err();
        assert!(matches!(item_failure.error(), DecodeError::Malformed { .. }));
        assert!(out[1].as_ref().unwrap().is_empty());

        let header_failure = h.header.read().unwrap_err();
        assert!(header_failure.same_as(item_failure));
    }

    #[test]
    fn panic_is_reported_as_failure() {
        struct Explodes;
        impl Parser for Explodes {
            fn run(&mut self, _ctx: &mut ParserContext) -> Result<(), DecodeError> {
                panic!("index out of range");
            }
        }

        let (worker, h) = bind_worker(Explodes, &[b"x", b""]);
        assert!(worker.run().failed);

        let out = collect_output(&h.output);
        assert_eq!(out.len(), 2);
        let failure = out[0].as_ref().unwrap_err();
        assert!(
            matches!(failure.error(), DecodeError::Panicked(msg) if msg == "index out of range")
        );
        assert!(h.input.is_empty());
        assert!(h.header.read().is_err());
    }

    #[test]
    fn late_failure_leaves_header_untouched() {
        struct FailAfterHeader;
        impl Parser for FailAfterHeader {
            fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
                ctx.set_header(Header::new().with_generator("early"))?;
                ctx.emit(record(b"n1"));
                Err(DecodeError::Truncated { expected: "way nodes" })
            }
        }

        let (worker, h) = bind_worker(FailAfterHeader, &[b""]);
        worker.run();

        assert_eq!(h.header.read().unwrap().generator(), "early");
        let out = collect_output(&h.output);
        assert_eq!(out.len(), 3);
        assert!(out[0].is_ok());
        assert!(out[1].is_err());
        assert!(out[2].as_ref().unwrap().is_empty());
    }

    #[test]
    fn missing_header_is_resolved_by_the_worker() {
        struct Silent;
        impl Parser for Silent {
            fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
                while ctx.next_chunk()?.is_some() {}
                Ok(())
            }
        }

        let (worker, h) = bind_worker(Silent, &[b"x", b""]);
        assert!(!worker.run().failed);

        let failure = h.header.read().unwrap_err();
        assert!(matches!(
            failure.error(),
            DecodeError::Protocol(ProtocolViolation::HeaderNotSet)
        ));
        // Only the end marker: a missing header is not a stream failure.
        let out = collect_output(&h.output);
        assert_eq!(out.len(), 1);
    }

    #[test]
    fn setting_header_twice_is_a_violation() {
        struct Twice;
        impl Parser for Twice {
            fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
                ctx.set_header(Header::new())?;
                ctx.set_header(Header::new())
            }
        }

        let (worker, h) = bind_worker(Twice, &[b""]);
        worker.run();

        // The first header stands; the violation shows up on the stream.
        assert_eq!(h.header.read().unwrap(), Header::new());
        let out = collect_output(&h.output);
        let failure = out[0].as_ref().unwrap_err();
        assert!(matches!(
            failure.error(),
            DecodeError::Protocol(ProtocolViolation::HeaderAlreadySet)
        ));
    }

    #[test]
    fn io_error_from_source_fails_the_run() {
        let input = ChunkQueue::unbounded();
        input.push(Ok(Bytes::from_static(b"n1")));
        input.push(Err(io::Error::other("disk went away")));
        input.push(Ok(Bytes::new()));
        let output = BufferQueue::unbounded();
        let (promise, header) = oneshot();
        let ctx = ParserContext::new(input.clone(), output.clone(), promise, EntityBits::ALL);

        let summary = ParserWorker::new(Box::new(Echo), ctx).run();

        assert!(summary.failed);
        assert_eq!(summary.buffers, 1);
        assert!(input.is_empty());
        assert_eq!(header.read().unwrap().generator(), "echo");
        let out = collect_output(&output);
        assert!(matches!(
            out[1].as_ref().unwrap_err().error(),
            DecodeError::Io(_)
        ));
    }

    #[test]
    fn empty_buffers_are_not_forwarded() {
        struct EmitsEmpty;
        impl Parser for EmitsEmpty {
            fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
                ctx.set_header(Header::new())?;
                ctx.emit(Buffer::default());
                ctx.emit(record(b"r"));
                while ctx.next_chunk()?.is_some() {}
                Ok(())
            }
        }

        let (worker, h) = bind_worker(EmitsEmpty, &[b""]);
        assert_eq!(worker.run().buffers, 1);
        assert_eq!(collect_output(&h.output).len(), 2);
    }

    #[test]
    fn next_chunk_after_end_keeps_returning_none() {
        struct ReadsPastEnd;
        impl Parser for ReadsPastEnd {
            fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
                assert_eq!(ctx.read_types(), EntityBits::ALL);
                assert!(!ctx.header_done());
                ctx.set_header(Header::new())?;
                assert!(ctx.header_done());
                while ctx.next_chunk()?.is_some() {}
                assert!(ctx.input_drained());
                assert!(ctx.next_chunk()?.is_none());
                Ok(())
            }
        }

        let (worker, h) = bind_worker(ReadsPastEnd, &[b"a", b""]);
        assert!(!worker.run().failed);
        assert!(h.input.is_empty());
    }
}
