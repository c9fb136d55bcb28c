use std::io;

use thiserror::Error;

/// An error that occured while deserializing a bitmap
#[derive(Debug, Error)]
pub enum DeserializeError {
    /// An invalid cookie was detected. This is likely not a bitmap. Contains the found value
    #[error("invalid cookie: {0}")]
    InvalidCookie(u32),

    /// An invalid container count was detected. Contains the value found
    #[error("invalid container count: {0}")]
    InvalidContainerCount(u32),

    /// The buffer ended before the structure it describes
    #[error("unexpected end of buffer: needed {needed} bytes, {available} available")]
    UnexpectedEof {
        needed: usize,
        available: usize
    },

    /// Keys must be strictly increasing. Contains the index of the offending key
    #[error("keys are not strictly increasing at index {0}")]
    UnsortedKeys(usize),

    /// The offset header disagrees with the sizes of the container bodies
    #[error("container {index} has offset {found}, expected {expected}")]
    InvalidOffset {
        index: usize,
        found: u32,
        expected: u32
    },

    /// A container body contradicts its header entry
    #[error("malformed container for key {key}: {reason}")]
    InvalidContainer {
        key: u16,
        reason: &'static str
    },

    /// An IO error occured during deserialization, Contains the underlying error
    #[error(transparent)]
    Io(#[from] io::Error)
}

/// A range argument that falls outside of the 32 bit domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RangeError {
    /// `start` must lie in `[0, 2^32)` and `end` in `[0, 2^32]`
    #[error("range [{start}, {end}) is outside of [0, 2^32)")]
    OutOfDomain {
        start: i64,
        end: i64
    }
}
