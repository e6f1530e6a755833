//! Splitting application messages into fragments and putting them back together.

pub mod fragment;
pub mod reassembler;
pub mod splitter;

pub use fragment::{FRAGMENT_MARKER, Fragment, FragmentError};
pub use reassembler::ChunkReassembler;
pub use splitter::{ChunkSplitter, DEFAULT_MAX_FRAGMENT_LEN};
