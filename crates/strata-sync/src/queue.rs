use std::fmt;

use crossbeam_channel::{Receiver, Sender};

/// Thread-safe FIFO with a blocking pop.
///
/// Used for both directions of a decode run: raw chunks flow from the
/// chunk source to the parser, and decoded buffer results flow from the
/// parser to the consumer.
///
/// ```text
///   producer ──push──▶ [ c1 | c2 | c3 | ... ] ──wait_and_pop──▶ consumer
/// ```
///
/// A `BlockingQueue` is a handle: cloning it yields another handle to
/// the same queue. Every handle owns both the sending and the receiving
/// end of the underlying channel, so the channel cannot become
/// disconnected while any handle is alive. That is what makes
/// [`push`](Self::push) infallible.
///
/// A queue built with [`bounded`](Self::bounded) applies back-pressure:
/// `push` blocks while the queue is full, until some other thread pops.
pub struct BlockingQueue<T> {
    tx: Sender<T>,
    rx: Receiver<T>,
}

impl<T> BlockingQueue<T> {
    /// Create a queue without a size limit. `push` never blocks.
    #[must_use]
    pub fn unbounded() -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self { tx, rx }
    }

    /// Create a queue holding at most `capacity` items.
    ///
    /// A capacity of zero makes every `push` rendezvous with a
    /// `wait_and_pop` on another thread.
    #[must_use]
    pub fn bounded(capacity: usize) -> Self {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        Self { tx, rx }
    }

    /// Append an item, waking one blocked popper.
    ///
    /// Blocks only if the queue is bounded and currently full.
    pub fn push(&self, item: T) {
        if self.tx.send(item).is_err() {
            unreachable!("a queue handle always owns a live receiver");
        }
    }

    /// Remove and return the oldest item, blocking until one exists.
    pub fn wait_and_pop(&self) -> T {
        match self.rx.recv() {
            Ok(item) => item,
            Err(_) => unreachable!("a queue handle always owns a live sender"),
        }
    }

    /// Remove and return the oldest item if there is one.
    pub fn try_pop(&self) -> Option<T> {
        self.rx.try_recv().ok()
    }

    /// Number of items currently queued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rx.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rx.is_empty()
    }

    /// The size limit, or `None` for an unbounded queue.
    #[must_use]
    pub fn capacity(&self) -> Option<usize> {
        self.tx.capacity()
    }
}

impl<T> Clone for BlockingQueue<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
            rx: self.rx.clone(),
        }
    }
}

impl<T> Default for BlockingQueue<T> {
    fn default() -> Self {
        Self::unbounded()
    }
}

impl<T> fmt::Debug for BlockingQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BlockingQueue")
            .field("len", &self.len())
            .field("capacity", &self.capacity())
            .finish()
    }
}
