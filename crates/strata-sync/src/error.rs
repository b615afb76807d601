/// The write end of a one-shot slot was dropped without being written.
///
/// This is what a reader observes when the writer went away (a thread
/// died, a worker forgot to resolve its slot) instead of a value or a
/// failure. It is a contract breach on the writer's side, never an
/// ordinary runtime condition, so it carries no further detail.
///
/// Failure types carried through a slot must implement
/// `From<Abandoned>` so [`Pending::read`](crate::Pending::read) can
/// report it in the reader's own error type.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("one-shot result was dropped before it was written")]
pub struct Abandoned;
