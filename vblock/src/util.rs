//! Tiny little-endian fixed-field helpers shared by the section, meta, and
//! builder layouts (the per-codec payload helpers live next to their codecs
//! in `codec.rs` instead, since those are purely internal to one stream).

pub(crate) fn put_u32(out: &mut [u8], pos: usize, v: u32) {
    out[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
}
pub(crate) fn get_u32(data: &[u8], pos: usize) -> u32 {
    u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap())
}
pub(crate) fn put_i32(out: &mut [u8], pos: usize, v: i32) {
    out[pos..pos + 4].copy_from_slice(&v.to_le_bytes());
}
pub(crate) fn get_i32(data: &[u8], pos: usize) -> i32 {
    i32::from_le_bytes(data[pos..pos + 4].try_into().unwrap())
}
pub(crate) fn put_u64(out: &mut [u8], pos: usize, v: u64) {
    out[pos..pos + 8].copy_from_slice(&v.to_le_bytes());
}
pub(crate) fn get_u64(data: &[u8], pos: usize) -> u64 {
    u64::from_le_bytes(data[pos..pos + 8].try_into().unwrap())
}
