//! Index structures for fuzzy subsequence search
//!
//! - Trie: character tree over normalized key terms, traversed bottom-up
//! - Distance trees: prioritized multi-tree search with weighted ranking

pub mod distance_trees;
pub mod trie;

pub use distance_trees::{DistanceResult, DistanceTrees, Fuzzable};
pub use trie::{BoxError, LoadError, NodeRef, Tree};
