use std::fmt;

use tokio::sync::oneshot::{self as channel, error::TryRecvError};

use crate::error::Abandoned;

/// Create a one-shot result slot.
///
/// The slot hands exactly one `Result<T, E>` from a single writer to a
/// single reader:
///
/// ```text
///   worker thread                         consumer thread
///   ─────────────                         ───────────────
///   Promise::write_value(v)   ───────▶    Pending::read() -> Ok(v)
///   Promise::write_failure(e) ───────▶    Pending::read() -> Err(e)
///   (promise dropped)         ───────▶    Pending::read() -> Err(Abandoned.into())
/// ```
///
/// Both write methods consume the [`Promise`], so writing twice is
/// rejected at compile time rather than at run time.
#[must_use]
pub fn oneshot<T, E>() -> (Promise<T, E>, Pending<T, E>) {
    let (tx, rx) = channel::channel();
    (
        Promise { tx },
        Pending {
            state: State::Waiting(rx),
        },
    )
}

/// Write end of a one-shot result slot.
pub struct Promise<T, E> {
    tx: channel::Sender<Result<T, E>>,
}

impl<T, E> Promise<T, E> {
    /// Resolve the slot with a value.
    pub fn write_value(self, value: T) {
        self.write(Ok(value));
    }

    /// Resolve the slot with a failure.
    pub fn write_failure(self, failure: E) {
        self.write(Err(failure));
    }

    fn write(self, result: Result<T, E>) {
        // A reader that has been dropped is no longer waiting.
        let _ = self.tx.send(result);
    }
}

impl<T, E> fmt::Debug for Promise<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Promise")
            .field("reader_alive", &!self.tx.is_closed())
            .finish()
    }
}

/// Read end of a one-shot result slot.
///
/// Either waiting on a [`Promise`] or already resolved (see
/// [`ready`](Self::ready) and [`failed`](Self::failed)).
pub struct Pending<T, E> {
    state: State<T, E>,
}

enum State<T, E> {
    Waiting(channel::Receiver<Result<T, E>>),
    Resolved(Result<T, E>),
}

impl<T, E> Pending<T, E> {
    /// A slot that is already resolved with `value`.
    #[must_use]
    pub fn ready(value: T) -> Self {
        Self {
            state: State::Resolved(Ok(value)),
        }
    }

    /// A slot that is already resolved with `failure`.
    #[must_use]
    pub fn failed(failure: E) -> Self {
        Self {
            state: State::Resolved(Err(failure)),
        }
    }
}

impl<T, E: From<Abandoned>> Pending<T, E> {
    /// Block until the slot is resolved and return its content.
    ///
    /// # Errors
    ///
    /// Returns the failure the writer stored, or `E::from(Abandoned)` if
    /// the promise was dropped without being written.
    ///
    /// # Panics
    ///
    /// Panics when called from inside an asynchronous runtime context,
    /// where blocking the thread is not allowed.
    pub fn read(self) -> Result<T, E> {
        match self.state {
            State::Resolved(result) => result,
            State::Waiting(rx) => match rx.blocking_recv() {
                Ok(result) => result,
                Err(_) => Err(E::from(Abandoned)),
            },
        }
    }

    /// Check whether the slot has been resolved, without blocking.
    ///
    /// A dropped promise counts as resolved (with `Abandoned`).
    pub fn is_resolved(&mut self) -> bool {
        let State::Waiting(rx) = &mut self.state else {
            return true;
        };
        let resolved = match rx.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => Err(E::from(Abandoned)),
        };
        self.state = State::Resolved(resolved);
        true
    }
}

impl<T, E> fmt::Debug for Pending<T, E> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match &self.state {
            State::Waiting(_) => "waiting",
            State::Resolved(Ok(_)) => "value",
            State::Resolved(Err(_)) => "failure",
        };
        f.debug_struct("Pending").field("state", &state).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Duration;

    #[derive(Debug, PartialEq)]
    enum TestError {
        Abandoned,
        Bad(&'static str),
    }

    impl From<Abandoned> for TestError {
        fn from(_: Abandoned) -> Self {
            Self::Abandoned
        }
    }

    #[test]
    fn read_returns_written_value() {
        let (promise, pending) = oneshot::<u32, TestError>();
        promise.write_value(7);
        assert_eq!(pending.read(), Ok(7));
    }

    #[test]
    fn read_returns_written_failure() {
        let (promise, pending) = oneshot::<u32, TestError>();
        promise.write_failure(TestError::Bad("truncated"));
        assert_eq!(pending.read(), Err(TestError::Bad("truncated")));
    }

    #[test]
    fn dropped_promise_reads_as_abandoned() {
        let (promise, pending) = oneshot::<u32, TestError>();
        drop(promise);
        assert_eq!(pending.read(), Err(TestError::Abandoned));
    }

    #[test]
    fn read_blocks_until_written_from_another_thread() {
        let (promise, pending) = oneshot::<String, TestError>();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            promise.write_value("header".to_string());
        });
        assert_eq!(pending.read().unwrap(), "header");
        handle.join().unwrap();
    }

    #[test]
    fn prebuilt_slots_are_resolved() {
        let mut ready = Pending::<u8, TestError>::ready(1);
        let mut failed = Pending::<u8, TestError>::failed(TestError::Bad("x"));
        assert!(ready.is_resolved());
        assert!(failed.is_resolved());
        assert_eq!(ready.read(), Ok(1));
        assert_eq!(failed.read(), Err(TestError::Bad("x")));
    }

    #[test]
    fn is_resolved_tracks_the_writer() {
        let (promise, mut pending) = oneshot::<u8, TestError>();
        assert!(!pending.is_resolved());
        promise.write_value(3);
        assert!(pending.is_resolved());
        // The probed value is kept for the later read.
        assert_eq!(pending.read(), Ok(3));
    }

    #[test]
    fn is_resolved_after_drop_reports_abandoned() {
        let (promise, mut pending) = oneshot::<u8, TestError>();
        drop(promise);
        assert!(pending.is_resolved());
        assert_eq!(pending.read(), Err(TestError::Abandoned));
    }
}
