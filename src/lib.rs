#![deny(bare_trait_objects)]

//! Mapped Roaring is a port of the Roaring bitmap format with a few differences
//!
//! - An idiomatic and safe Rust API
//! - Zero-copy views over serialized bitmaps, including memory mapped files
//! - Every query and set operation is shared between owned bitmaps and views
//! - Copy-on-Write is unsupported
//!
//! ```
//! use mapped_roaring::{ImmutableBitmap, RoaringBitmap, RoaringView};
//!
//! let mut bitmap = RoaringBitmap::from_range(0..100_000);
//! bitmap.add(1 << 31);
//! bitmap.run_optimize();
//!
//! let mut bytes = Vec::new();
//! bitmap.serialize(&mut bytes).unwrap();
//!
//! let view = RoaringView::new(&bytes).unwrap();
//! assert!(view.contains(1 << 31));
//! assert_eq!(view.and(&RoaringBitmap::from_range(99_990..200_000)).cardinality(), 10);
//! ```

mod container;
mod error;
mod immutable;
mod roaring;
mod serialization;
mod statistics;
mod utils;
mod view;

pub mod aggregate;

#[cfg(feature = "serde")]
mod serde_impl;


pub use container::{
    ArrayContainer, ArrayRef, BitsetContainer, BitsetRef, Container, ContainerIter, ContainerKind,
    ContainerRef, Rle16, RunContainer, RunRef, SpanIter, BITSET_SIZE_IN_WORDS, DEFAULT_MAX_SIZE
};
pub use error::{DeserializeError, RangeError};
pub use immutable::{ImmutableBitmap, Iter};
pub use roaring::RoaringBitmap;
pub use serialization::{NO_OFFSET_THRESHOLD, SERIAL_COOKIE, SERIAL_COOKIE_NO_RUNCONTAINER};
pub use statistics::RoaringStatistics;
pub use view::RoaringView;
