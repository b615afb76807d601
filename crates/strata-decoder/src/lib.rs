#![warn(clippy::pedantic)]

//! Asynchronous decode pipeline for map data files.
//!
//! A [`Reader`] runs a chunk source and a format-specific [`Parser`] on
//! background threads and hands the decoded buffers and the file header
//! to the caller. Parsers are looked up by file format in a
//! [`ParserFactory`].

pub mod config;
pub mod error;
pub mod factory;
pub mod parser;
pub mod reader;
pub mod source;

pub use config::ReaderConfig;
pub use error::{DecodeError, Failure, OpenError, ProtocolViolation};
pub use factory::{ParserConstructor, ParserFactory};
pub use parser::{
    BufferQueue, BufferResult, Chunk, ChunkQueue, HeaderPromise, Parser, ParserContext,
    ParserWorker, RunSummary,
};
pub use reader::{BufferStream, HeaderHandle, Reader};
pub use source::ChunkSource;
