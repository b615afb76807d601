//! Fixture parsers shared by the integration tests and benches.
//!
//! ```text
//! ┌──────────────┬──────────────────────────────────────────────────────┐
//! │ Parser       │ Behaviour                                            │
//! ├──────────────┼──────────────────────────────────────────────────────┤
//! │ LineParser   │ Header from a `@generator` line, one record per line │
//! │ Scripted     │ Replays a fixed list of steps, ignoring the input    │
//! └──────────────┴──────────────────────────────────────────────────────┘
//! ```

use std::sync::Once;

use bytes::BytesMut;
use strata_decoder::{DecodeError, Parser, ParserContext, ParserFactory};
use strata_types::{Buffer, EntityBits, FileFormat, Header};

/// Install a test-friendly `tracing` subscriber once per process.
///
/// Honours `RUST_LOG`; output goes through the test harness so it only
/// shows for failing tests.
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

/// A line-oriented text format.
///
/// The first line must be `@<generator>`; it resolves the header. Every
/// following non-empty line is one record. Records are grouped into
/// buffers of at most `records_per_buffer`. A line starting with `!` is
/// a decode error at that line's byte offset.
///
/// Lines starting with `n`, `w` or `r` are nodes, ways or relations and
/// are only kept if the reader asked for that kind. Other lines are
/// always kept.
pub struct LineParser {
    records_per_buffer: usize,
    read_types: EntityBits,
}

impl LineParser {
    #[must_use]
    pub fn new(read_types: EntityBits, records_per_buffer: usize) -> Self {
        Self {
            records_per_buffer: records_per_buffer.max(1),
            read_types,
        }
    }

    fn wanted(&self, line: &[u8]) -> bool {
        let kind = match line.first() {
            Some(b'n') => EntityBits::NODE,
            Some(b'w') => EntityBits::WAY,
            Some(b'r') => EntityBits::RELATION,
            _ => return true,
        };
        self.read_types.contains(kind)
    }
}

impl Parser for LineParser {
    fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
        let mut pending = BytesMut::new();
        let mut offset = 0u64;
        let mut buffer = Buffer::default();
        let mut at_eof = false;

        loop {
            let Some(newline) = pending.iter().position(|&b| b == b'\n') else {
                if at_eof {
                    break;
                }
                match ctx.next_chunk()? {
                    Some(chunk) => pending.extend_from_slice(&chunk),
                    None => {
                        at_eof = true;
                        if !pending.is_empty() {
                            pending.extend_from_slice(b"\n");
                        }
                    }
                }
                continue;
            };

            let line = pending.split_to(newline + 1);
            let text = &line[..newline];
            let line_offset = offset;
            offset += line.len() as u64;

            if !ctx.header_done() {
                let generator = text
                    .strip_prefix(b"@")
                    .ok_or_else(|| DecodeError::malformed(line_offset, "missing @generator line"))?;
                let header = Header::new().with_generator(String::from_utf8_lossy(generator));
                ctx.set_header(header)?;
                continue;
            }

            if text.starts_with(b"!") {
                return Err(DecodeError::malformed(line_offset, "error marker"));
            }
            if text.is_empty() || !self.wanted(text) {
                continue;
            }

            buffer.push_record(text);
            if buffer.len() == self.records_per_buffer {
                ctx.emit(std::mem::take(&mut buffer));
            }
        }

        if !ctx.header_done() {
            return Err(DecodeError::Truncated {
                expected: "the @generator line",
            });
        }
        ctx.emit(buffer);
        Ok(())
    }
}

/// One step of a [`Scripted`] parser.
#[derive(Clone, Debug)]
pub enum Step {
    /// Resolve the header with this generator.
    Header(&'static str),
    /// Emit a buffer with one record.
    Emit(&'static [u8]),
    /// Read this many chunks and throw them away.
    Consume(usize),
    /// Return a decode error.
    Fail(&'static str),
    /// Panic with this message.
    Panic(&'static str),
}

/// Replays a fixed script regardless of the input.
#[derive(Clone, Debug)]
pub struct Scripted(pub Vec<Step>);

impl Parser for Scripted {
    fn run(&mut self, ctx: &mut ParserContext) -> Result<(), DecodeError> {
        for step in &self.0 {
            match *step {
                Step::Header(generator) => ctx.set_header(Header::new().with_generator(generator))?,
                Step::Emit(record) => ctx.emit(record_buffer(record)),
                Step::Consume(n) => {
                    for _ in 0..n {
                        ctx.next_chunk()?;
                    }
                }
                Step::Fail(reason) => return Err(DecodeError::malformed(0, reason)),
                Step::Panic(message) => panic!("{message}"),
            }
        }
        Ok(())
    }
}

/// A buffer holding `record` as its only record.
#[must_use]
pub fn record_buffer(record: &[u8]) -> Buffer {
    let mut buffer = Buffer::default();
    buffer.push_record(record);
    buffer
}

/// Registry with [`LineParser`] registered for OPL, two records per buffer.
#[must_use]
pub fn line_factory() -> ParserFactory {
    let factory = ParserFactory::new();
    factory.register_fn(FileFormat::Opl, |read_types| Box::new(LineParser::new(read_types, 2)));
    factory
}

/// Records of every buffer, flattened, as strings.
#[must_use]
pub fn record_strings<'a>(buffers: impl IntoIterator<Item = &'a Buffer>) -> Vec<String> {
    buffers
        .into_iter()
        .flat_map(|buffer| buffer.records())
        .map(|record| String::from_utf8_lossy(record).into_owned())
        .collect()
}
