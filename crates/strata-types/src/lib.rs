#![warn(clippy::pedantic)]

pub mod bounds;
pub mod buffer;
pub mod entity_bits;
pub mod error;
pub mod file;
pub mod header;

pub use bounds::{Bounds, Location};
pub use buffer::Buffer;
pub use entity_bits::EntityBits;
pub use error::TypeError;
pub use file::{File, FileCompression, FileFormat};
pub use header::Header;
