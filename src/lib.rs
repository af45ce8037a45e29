//! fuzzytrie - Trie-backed fuzzy subsequence search
//!
//! A ranking engine for interactive autocomplete over large corpora: given a
//! short phrase, return every record whose key term contains the phrase's
//! characters as an in-order subsequence, ranked by edit distance and by
//! cross-field priority.
//!
//! # Features
//! - Compressed prefix index traversed bottom-up, pruning whole ancestries
//! - Multi-tree search with lexicographic priority between fields
//! - Record-supplied ranking knobs (distance factor, secondary tie-breakers)
//! - Cooperative cancellation and a pluggable timing recorder
//!
//! # Quick start
//!
//! ```
//! use fuzzytrie::{CancelToken, DistanceTrees, Fuzzable, Tree};
//!
//! #[derive(PartialEq, Eq, Hash)]
//! struct Asset {
//!     symbol: String,
//! }
//!
//! impl Fuzzable for Asset {}
//!
//! let assets = vec![
//!     Asset { symbol: "BTC".into() },
//!     Asset { symbol: "BCH".into() },
//!     Asset { symbol: "ETH".into() },
//! ];
//!
//! let cancel = CancelToken::new();
//! let tree = Tree::load(&assets, |a| Ok(a.symbol.clone()), &cancel).unwrap();
//! let search = DistanceTrees::new(vec![tree]);
//!
//! let results = search.search("bt", &cancel).unwrap();
//! assert_eq!(results.len(), 1);
//! assert_eq!(results[0].record.symbol, "BTC");
//! ```

pub mod algorithms;
pub mod cancel;
pub mod indexing;
pub mod metrics;

pub use algorithms::{levenshtein, normalize_term};
pub use cancel::{CancelToken, Cancelled};
pub use indexing::{BoxError, DistanceResult, DistanceTrees, Fuzzable, LoadError, NodeRef, Tree};
pub use metrics::{CollectingTimer, NoOpTimer, RecordError, SignalSummary, Timer, TimingSummary};
