//! Dump file input: compression detection and streaming line reading.

mod compression;
mod reader;

pub use compression::Compression;
pub use reader::LineSource;
