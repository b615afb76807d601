use std::collections::HashMap;
use std::collections::hash_map::Entry;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use strata_types::{EntityBits, File, FileFormat};

use crate::error::OpenError;
use crate::parser::{BufferQueue, ChunkQueue, HeaderPromise, Parser, ParserContext, ParserWorker};

type CreateFn = dyn Fn(EntityBits) -> Box<dyn Parser> + Send + Sync;

/// Creates parsers for one file format.
///
/// Cloning is cheap and clones compare equal under
/// [`same_as`](Self::same_as).
#[derive(Clone)]
pub struct ParserConstructor {
    create: Arc<CreateFn>,
}

impl ParserConstructor {
    /// Wrap a function that creates a parser for the given entity filter.
    pub fn new<F>(create: F) -> Self
    where
        F: Fn(EntityBits) -> Box<dyn Parser> + Send + Sync + 'static,
    {
        Self {
            create: Arc::new(create),
        }
    }

    /// Create a parser and bind it to the queues and header slot of a
    /// decode run. The returned worker is ready to [`run`](ParserWorker::run).
    #[must_use]
    pub fn build(
        &self,
        input: ChunkQueue,
        output: BufferQueue,
        header: HeaderPromise,
        read_types: EntityBits,
    ) -> ParserWorker {
        let parser = (self.create)(read_types);
        ParserWorker::new(parser, ParserContext::new(input, output, header, read_types))
    }

    /// Whether both constructors wrap the same function instance.
    #[must_use]
    pub fn same_as(&self, other: &ParserConstructor) -> bool {
        Arc::ptr_eq(&self.create, &other.create)
    }
}

impl fmt::Debug for ParserConstructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserConstructor").finish_non_exhaustive()
    }
}

/// Registry mapping file formats to parser constructors.
///
/// Concrete decoders register themselves once at startup; readers look
/// them up by the format of the file being opened. The registry is an
/// ordinary value: create one, register the decoders the program
/// supports, and share it (typically in an `Arc`) with whatever opens
/// files.
///
/// The first registration for a format wins. Both [`register`] and
/// [`resolve`] take an internal lock, so registration may overlap with
/// lookups from other threads.
///
/// [`register`]: Self::register
/// [`resolve`]: Self::resolve
#[derive(Default)]
pub struct ParserFactory {
    callbacks: Mutex<HashMap<FileFormat, ParserConstructor>>,
}

impl ParserFactory {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a constructor for `format`.
    ///
    /// Returns `false`, leaving the existing entry in place, if the
    /// format is already registered.
    pub fn register(&self, format: FileFormat, constructor: ParserConstructor) -> bool {
        match self.callbacks().entry(format) {
            Entry::Occupied(_) => {
                tracing::warn!(%format, "parser already registered, keeping the first one");
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(constructor);
                tracing::debug!(%format, "parser registered");
                true
            }
        }
    }

    /// Register a closure as the constructor for `format`.
    ///
    /// Same semantics as [`register`](Self::register).
    pub fn register_fn<F>(&self, format: FileFormat, create: F) -> bool
    where
        F: Fn(EntityBits) -> Box<dyn Parser> + Send + Sync + 'static,
    {
        self.register(format, ParserConstructor::new(create))
    }

    /// Find the constructor for the format of `file`.
    ///
    /// # Errors
    ///
    /// Returns [`OpenError::UnsupportedFormat`] naming the file and its
    /// format if no parser is registered for it.
    pub fn resolve(&self, file: &File) -> Result<ParserConstructor, OpenError> {
        self.callbacks()
            .get(&file.format())
            .cloned()
            .ok_or_else(|| OpenError::UnsupportedFormat {
                filename: file.filename().to_string(),
                format: file.format(),
            })
    }

    #[must_use]
    pub fn is_registered(&self, format: FileFormat) -> bool {
        self.callbacks().contains_key(&format)
    }

    /// Registered formats, sorted.
    #[must_use]
    pub fn formats(&self) -> Vec<FileFormat> {
        let mut formats: Vec<_> = self.callbacks().keys().copied().collect();
        formats.sort();
        formats
    }

    fn callbacks(&self) -> MutexGuard<'_, HashMap<FileFormat, ParserConstructor>> {
        // Entries are inserted whole, so a poisoned map is still consistent.
        self.callbacks.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for ParserFactory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParserFactory")
            .field("formats", &self.formats())
            .finish()
    }
}
