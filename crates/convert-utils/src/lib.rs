//! Shared helpers for the conversion crates: XML building, ZIP packaging,
//! text decoding, MIME mapping and filesystem utilities.

pub mod archive;
pub mod encoding;
pub mod fs;
pub mod mime;
pub mod xml;
