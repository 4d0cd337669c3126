//! A vertical block is the unit of on-disk storage for a sorted run of
//! `(user_key, sequence, type, value)` records: instead of interleaving
//! the four fields record-by-record, each field gets its own column
//! stream, split further into fixed-size *sections* so a point lookup can
//! binary-search a bit-packed section index down to one section and then
//! binary-search that section's bit-packed key-delta column, without ever
//! decoding a column it doesn't need.
//!
//! Module map, leaves first: [`bitpack`] (pack/unpack and binary search
//! over bit-packed `u32` streams), [`varint`] (LEB128 helpers for the
//! run-length-varint codec), [`codec`] (the per-column encoder/decoder
//! catalog), [`section`] (four parallel column streams sharing a record
//! count), [`meta`] (the bit-packed section index), [`record`] (the
//! logical record shape and composite key), [`block`] (`BlockReader` +
//! `BlockIterator`, the read path), [`builder`] (`BlockBuilder`, the
//! write path).

pub mod bitpack;
pub mod block;
pub mod builder;
pub mod codec;
pub mod error;
pub mod meta;
pub mod record;
pub mod section;
mod util;
mod varint;

/// Trailer magic identifying a finished vertical block. Arbitrary beyond
/// "builder and reader must agree" (spec.md leaves the exact value to the
/// host store); chosen here as an ASCII-ish reading of "Vblk".
pub const MAGIC: u32 = 0x5662_6c6b;

pub use block::{BlockIterator, BlockReader, OwnedBlock};
pub use builder::{BlockBuilder, BlockBuilderOptions};
pub use codec::ValueEncoding;
pub use error::{BlockError, IteratorStatus};
pub use record::{compose_key, parse_key, InternalRecord, COMPOSITE_KEY_LEN};
