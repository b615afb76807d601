#![warn(clippy::pedantic)]

pub mod error;
pub mod oneshot;
pub mod queue;

pub use error::Abandoned;
pub use oneshot::{Pending, Promise, oneshot};
pub use queue::BlockingQueue;
