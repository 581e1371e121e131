//! Hand-built containers used as lookup and ordering indexes.
//!
//! - [`ChainingHashTable`]: separate-chaining hash map, O(1) average lookups.
//! - [`Bst`]: unbalanced binary search tree ordered by a caller comparator.
//! - [`quicksort`]: in-place median-of-three quicksort.

pub mod bst;
pub mod hash_table;
pub mod quicksort;

pub use bst::Bst;
pub use hash_table::ChainingHashTable;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CollectionError {
    InvalidArgument(&'static str),
}

impl std::fmt::Display for CollectionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CollectionError::InvalidArgument(msg) => write!(f, "invalid argument: {msg}"),
        }
    }
}

impl std::error::Error for CollectionError {}
