//! Error surface: corruption detected while parsing a block is a real
//! `Result::Err`, logged once at construction via the workspace's ambient
//! `vblock_base::err` convention. `not_found`/`not_supported` are iterator
//! *status*, not errors — callers read `iter.status()` instead of matching
//! on a `Result`, mirroring the iterator's seek/scan contract.

pub use vblock_base::{Error as BlockError, Result};

/// A block or section failed a structural check: trailer magic mismatch,
/// meta-size disagreement, an offset out of range, or a column tagged with
/// an encoding its position in the layout doesn't allow.
pub fn corrupt(reason: impl Into<std::borrow::Cow<'static, str>>) -> BlockError {
    let reason = reason.into();
    tracing::warn!(target: "vblock", "corrupt block: {reason}");
    vblock_base::err(reason)
}

/// The outcome of the most recent iterator operation. `Ok` carries no
/// payload; it just means the last `seek`/`next` landed on a real entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum IteratorStatus {
    #[default]
    Ok,
    NotFound { target_user_key: i32 },
    NotSupported { op: &'static str },
}
