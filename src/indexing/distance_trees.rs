//! Multi-tree fuzzy distance ranking
//!
//! [`DistanceTrees`] searches one or more [`Tree`]s for a phrase, each tree
//! weighed lower in priority than the one before it. This allows, for
//! example, searching assets by symbol and then by name, with a name match
//! always ranking below a symbol match. Per-tree Levenshtein distances are
//! fused into one distance vector per record; results sort lexicographically
//! over that vector, with record-supplied secondary distances breaking ties.

use crate::algorithms::levenshtein::levenshtein;
use crate::algorithms::normalize::normalize_term;
use crate::cancel::{CancelToken, Cancelled};
use crate::metrics::{NoOpTimer, Timer};
use ahash::AHashMap;
use rayon::prelude::*;
use serde::Serialize;
use std::hash::Hash;
use std::time::Instant;

use super::trie::{NodeId, Tree};

/// Capability set through which records influence their own ranking.
///
/// Records also need `Eq + Hash` to participate in a search: hits for the
/// same record across trees are merged through a map keyed by the record.
pub trait Fuzzable {
    /// Multiplier applied to this record's Levenshtein distance before tree
    /// weighting, e.g. to down-rank deprecated records. The engine does not
    /// validate the factor.
    fn primary_distance_factor(&self) -> Option<f64> {
        None
    }

    /// Distances appended after the per-tree slots to break ties between
    /// otherwise equally ranked records (string length, a stable hash, ...).
    fn secondary_distances(&self) -> Vec<Option<i64>> {
        Vec::new()
    }

    /// Coarse bucket tag for downstream consumers. The ranker does not
    /// consult it; read it through [`DistanceResult::record`].
    fn sorting_group(&self) -> i64 {
        0
    }
}

/// One ranked hit: the record plus its fused distance vector.
///
/// `distances` holds one slot per searched tree (in priority order) followed
/// by the record's secondary distances. `None` in slot *i* means the record
/// did not match in tree *i*.
#[derive(Debug, Clone, Serialize)]
pub struct DistanceResult<'a, T> {
    /// Weighted per-tree distances, then secondary distances.
    pub distances: Vec<Option<i64>>,
    /// The matched record.
    pub record: &'a T,
}

/// Fuzzy search across prioritized trees.
///
/// Tree order fixes priority: index 0 dominates. The weighted slot value for
/// a match in tree *i* is `10^i + distance`, so any match in a
/// higher-priority tree outranks any match in a lower-priority one as long
/// as callers keep the tree count modest (≤ 9 trees keeps every weight
/// inside comfortable integer range for realistic distances).
pub struct DistanceTrees<'a, T> {
    trees: Vec<Tree<'a, T>>,
    timer: Box<dyn Timer>,
}

impl<'a, T: Fuzzable + Eq + Hash> DistanceTrees<'a, T> {
    /// Create a searcher over `trees`, highest priority first. Starts with
    /// the no-op timer.
    #[must_use]
    pub fn new(trees: Vec<Tree<'a, T>>) -> Self {
        Self {
            trees,
            timer: Box::new(NoOpTimer),
        }
    }

    /// Install a [`Timer`] to receive this searcher's timing signals.
    pub fn set_timer<M>(&mut self, timer: M)
    where
        M: Timer + 'static,
    {
        self.timer = Box::new(timer);
    }

    /// Search every tree for `phrase`, returning ranked results.
    ///
    /// The phrase is normalized once up front; `search(p)` and
    /// `search(normalize(p))` return identical sequences. Fails only when
    /// `cancel` fires, in which case partial work is discarded.
    pub fn search(
        &self,
        phrase: &str,
        cancel: &CancelToken,
    ) -> Result<Vec<DistanceResult<'a, T>>, Cancelled> {
        let normalized = normalize_term(phrase);
        let phrase_runes: Vec<char> = normalized.chars().collect();
        let tree_count = self.trees.len();

        let mut results: AHashMap<&'a T, Vec<Option<i64>>> = AHashMap::new();
        for (tree_index, tree) in self.trees.iter().enumerate() {
            let started = Instant::now();
            let outcome = self.sweep_tree(
                tree,
                tree_index,
                tree_count,
                &normalized,
                &phrase_runes,
                &mut results,
                cancel,
            );
            self.record_timing(|t| t.record_tree_search(started.elapsed()));
            outcome?;
        }

        let mut ranked: Vec<DistanceResult<'a, T>> = results
            .into_iter()
            .map(|(record, mut distances)| {
                distances.extend(record.secondary_distances());
                DistanceResult { distances, record }
            })
            .collect();

        let started = Instant::now();
        ranked.sort_by(|a, b| compare_distances(&a.distances, &b.distances));
        self.record_timing(|t| t.record_sort_time(started.elapsed()));

        tracing::debug!(
            phrase = %normalized,
            results = ranked.len(),
            trees = tree_count,
            "fuzzy search complete"
        );
        Ok(ranked)
    }

    /// Run one independent search per phrase in parallel.
    ///
    /// Trees are immutable once loaded, so concurrent searches share them
    /// freely; each individual search still runs on a single thread. All
    /// searches poll the same `cancel` token.
    pub fn batch_search<S>(
        &self,
        phrases: &[S],
        cancel: &CancelToken,
    ) -> Vec<Result<Vec<DistanceResult<'a, T>>, Cancelled>>
    where
        S: AsRef<str> + Sync,
        T: Sync,
    {
        phrases
            .par_iter()
            .map(|phrase| self.search(phrase.as_ref(), cancel))
            .collect()
    }

    /// Bottom-up frontier sweep of one tree.
    ///
    /// Starts at the leaf frontier and climbs: valued nodes are evaluated
    /// (and pruned together with their whole ancestry when the containment
    /// check fails), valueless nodes just forward their parent. Repeat
    /// visits are cheap no-ops thanks to the skip rule, so duplicate
    /// frontier entries are tolerated rather than deduplicated.
    #[allow(clippy::too_many_arguments)]
    fn sweep_tree(
        &self,
        tree: &Tree<'a, T>,
        tree_index: usize,
        tree_count: usize,
        phrase: &str,
        phrase_runes: &[char],
        results: &mut AHashMap<&'a T, Vec<Option<i64>>>,
        cancel: &CancelToken,
    ) -> Result<(), Cancelled> {
        let mut frontier = tree.leaf_ids().to_vec();

        while !frontier.is_empty() {
            cancel.check()?;

            let mut next = Vec::new();
            for id in frontier {
                let node = tree.node(id);
                if !node.values.is_empty() {
                    // If the first value already has a distance for this
                    // tree, every value here does, and some other path has
                    // already taken care of the ancestry. Skip entirely.
                    let first = node.values[0];
                    if results
                        .get(first)
                        .is_some_and(|distances| distances[tree_index].is_some())
                    {
                        continue;
                    }

                    if let Some(parent) = self.evaluate(
                        tree,
                        id,
                        tree_index,
                        tree_count,
                        phrase,
                        phrase_runes,
                        results,
                    ) {
                        next.push(parent);
                    }
                } else if let Some(parent) = node.parent {
                    // Valueless interior nodes carry no distance to record
                    // but must not block ancestral evaluation.
                    next.push(parent);
                }
            }

            frontier = next;
        }

        Ok(())
    }

    /// Evaluate one node against the phrase, timed per the recorder
    /// contract. Returns the next node to examine, if any.
    #[allow(clippy::too_many_arguments)]
    fn evaluate(
        &self,
        tree: &Tree<'a, T>,
        id: NodeId,
        tree_index: usize,
        tree_count: usize,
        phrase: &str,
        phrase_runes: &[char],
        results: &mut AHashMap<&'a T, Vec<Option<i64>>>,
    ) -> Option<NodeId> {
        let started = Instant::now();
        let next = self.evaluate_node(
            tree,
            id,
            tree_index,
            tree_count,
            phrase,
            phrase_runes,
            results,
        );
        self.record_timing(|t| t.record_node_search_iteration(started.elapsed()));
        next
    }

    #[allow(clippy::too_many_arguments)]
    fn evaluate_node(
        &self,
        tree: &Tree<'a, T>,
        id: NodeId,
        tree_index: usize,
        tree_count: usize,
        phrase: &str,
        phrase_runes: &[char],
        results: &mut AHashMap<&'a T, Vec<Option<i64>>>,
    ) -> Option<NodeId> {
        // A node that can never contain the phrase prunes its whole
        // ancestry: ancestors are strict prefixes of it.
        if !tree.contains_at(id, phrase_runes) {
            return None;
        }

        let key_term = tree.key_term_of(id);
        let base_distance = levenshtein(phrase, &key_term) as i64;
        let tree_weight = 10_i64.pow(tree_index as u32);

        for &record in &tree.node(id).values {
            let distances = results
                .entry(record)
                .or_insert_with(|| vec![None; tree_count]);
            if distances[tree_index].is_some() {
                // Written when this node was reached from a deeper
                // descendant; first writer wins.
                continue;
            }

            let distance = match record.primary_distance_factor() {
                Some(factor) => (base_distance as f64 * factor) as i64,
                None => base_distance,
            };
            distances[tree_index] = Some(tree_weight + distance);
        }

        tree.parent_above_root(id)
    }

    /// Recorder failures never fail a search; they are logged and dropped.
    fn record_timing<F>(&self, record: F)
    where
        F: FnOnce(&dyn Timer) -> Result<(), crate::metrics::RecordError>,
    {
        if let Err(err) = record(self.timer.as_ref()) {
            tracing::debug!(error = %err, "timing recorder failed; measurement dropped");
        }
    }
}

/// Lexicographic comparison of distance vectors, position by position.
///
/// `None` ranks after any concrete value at the same position: a
/// non-match in a tree loses to any match there, regardless of how the
/// remaining positions compare. Two `None`s tie and the comparison moves
/// on. Exhausting either vector with every compared position tied is
/// equality; the surrounding sort is stable.
fn compare_distances(a: &[Option<i64>], b: &[Option<i64>]) -> std::cmp::Ordering {
    use std::cmp::Ordering;

    for (left, right) in a.iter().zip(b.iter()) {
        match (left, right) {
            (None, None) => continue,
            (None, Some(_)) => return Ordering::Greater,
            (Some(_), None) => return Ordering::Less,
            (Some(left), Some(right)) => match left.cmp(right) {
                Ordering::Equal => continue,
                decided => return decided,
            },
        }
    }

    std::cmp::Ordering::Equal
}
