//! Character trie with bottom-up traversal
//!
//! The tree only exposes its leaf frontier: searches start at the leaves and
//! walk parent links toward the root. When a search phrase does not
//! sufficiently exist in a node, it cannot exist in any ancestor either
//! (ancestors are strict prefixes), so entire ancestries drop out of
//! consideration in one step.
//!
//! Nodes live in an arena owned by the tree and reference each other by
//! index, which keeps parent back-links cycle-free and cache-friendly.

use crate::algorithms::normalize::normalize_term;
use crate::cancel::{CancelToken, Cancelled};
use smallvec::SmallVec;
use thiserror::Error;

/// Boxed error returned by key term extractors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Error raised while building a [`Tree`].
#[derive(Debug, Error)]
pub enum LoadError {
    /// The key term extractor failed for the record at `index`.
    #[error("failed to extract key term from record at index {index}")]
    KeyExtraction {
        /// Position of the offending record in the input slice.
        index: usize,
        /// The extractor's error.
        #[source]
        source: BoxError,
    },

    /// The cancellation token fired mid-build.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Index of a node in a tree's arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct NodeId(usize);

const ROOT: NodeId = NodeId(0);

pub(crate) struct Node<'a, T> {
    /// The single code point this node contributes to its key term.
    /// `None` only for the root.
    pub(crate) key_rune: Option<char>,
    pub(crate) parent: Option<NodeId>,
    /// Flat child map; fan-out is small enough that a scan beats hashing.
    pub(crate) children: SmallVec<[(char, NodeId); 4]>,
    /// Records whose full key term ends exactly at this node, in input order.
    pub(crate) values: SmallVec<[&'a T; 2]>,
}

impl<'a, T> Node<'a, T> {
    fn root() -> Self {
        Self {
            key_rune: None,
            parent: None,
            children: SmallVec::new(),
            values: SmallVec::new(),
        }
    }

    fn child(key_rune: char, parent: NodeId) -> Self {
        Self {
            key_rune: Some(key_rune),
            parent: Some(parent),
            children: SmallVec::new(),
            values: SmallVec::new(),
        }
    }
}

/// An immutable character trie over borrowed records.
///
/// Built once from a batch with [`Tree::load`]; the records must outlive the
/// tree. Only the leaf frontier is exposed; see the module docs for why
/// traversal runs bottom-up.
pub struct Tree<'a, T> {
    nodes: Vec<Node<'a, T>>,
    leaf_nodes: Vec<NodeId>,
}

impl<'a, T> Tree<'a, T> {
    /// Build a tree from `records`, placing each under the normalized key
    /// term produced by `extract_key`.
    ///
    /// Records with identical normalized keys share a node, preserving input
    /// order. An extractor failure aborts the build with the record's
    /// position; a fired `cancel` token aborts it between records. Either
    /// way no tree is produced.
    pub fn load<F>(
        records: &'a [T],
        mut extract_key: F,
        cancel: &CancelToken,
    ) -> Result<Self, LoadError>
    where
        F: FnMut(&T) -> Result<String, BoxError>,
    {
        let mut nodes: Vec<Node<'a, T>> = vec![Node::root()];

        for (index, record) in records.iter().enumerate() {
            cancel.check()?;

            let key = extract_key(record)
                .map_err(|source| LoadError::KeyExtraction { index, source })?;
            let key = normalize_term(&key);

            let mut current = ROOT;
            for rune in key.chars() {
                let existing = nodes[current.0]
                    .children
                    .iter()
                    .find(|&&(c, _)| c == rune)
                    .map(|&(_, id)| id);
                current = match existing {
                    Some(id) => id,
                    None => {
                        let id = NodeId(nodes.len());
                        nodes.push(Node::child(rune, current));
                        nodes[current.0].children.push((rune, id));
                        id
                    }
                };
            }
            nodes[current.0].values.push(record);
        }

        let leaf_nodes = collect_leaves(&nodes);
        tracing::debug!(
            records = records.len(),
            nodes = nodes.len(),
            leaves = leaf_nodes.len(),
            "loaded trie index"
        );

        Ok(Self { nodes, leaf_nodes })
    }

    /// The leaf frontier: every node with no children.
    pub fn leaf_nodes(&self) -> impl ExactSizeIterator<Item = NodeRef<'_, 'a, T>> {
        self.leaf_nodes.iter().map(move |&id| NodeRef { tree: self, id })
    }

    pub(crate) fn leaf_ids(&self) -> &[NodeId] {
        &self.leaf_nodes
    }

    pub(crate) fn node(&self, id: NodeId) -> &Node<'a, T> {
        &self.nodes[id.0]
    }

    /// Parent of `id`, excluding the root (which can hold no values and
    /// never needs evaluation).
    pub(crate) fn parent_above_root(&self, id: NodeId) -> Option<NodeId> {
        let parent = self.nodes[id.0].parent?;
        self.nodes[parent.0].key_rune.map(|_| parent)
    }

    /// Reconstruct the full normalized key term of `id` by walking parent
    /// links and reversing. Costs O(depth).
    pub(crate) fn key_term_of(&self, id: NodeId) -> String {
        let mut runes: SmallVec<[char; 24]> = SmallVec::new();
        let mut current = Some(id);
        while let Some(node) = current.map(|c| &self.nodes[c.0]) {
            match node.key_rune {
                Some(rune) => runes.push(rune),
                None => break,
            }
            current = node.parent;
        }
        runes.iter().rev().collect()
    }

    /// Whether the key term at `id` contains `phrase` as an in-order,
    /// not-necessarily-contiguous subsequence.
    ///
    /// Both the key term and the phrase are read right to left: the walk
    /// starts at the node's own rune and the phrase's last character, and
    /// each upward step consumes the cursor character when it matches. A
    /// node that fails here guarantees every ancestor fails too, which is
    /// what lets the bottom-up sweep prune whole ancestries.
    pub(crate) fn contains_at(&self, id: NodeId, phrase_runes: &[char]) -> bool {
        let mut remaining = phrase_runes.len();
        let mut current = Some(id);

        while remaining > 0 {
            let Some(node) = current.map(|c| &self.nodes[c.0]) else {
                break;
            };
            let Some(rune) = node.key_rune else {
                break; // reached the root
            };
            if rune == phrase_runes[remaining - 1] {
                remaining -= 1;
            }
            current = node.parent;
        }

        remaining == 0
    }
}

/// Leaf collection runs iteratively: keys can be long, and recursing per
/// character would put tree depth on the call stack.
fn collect_leaves<T>(nodes: &[Node<'_, T>]) -> Vec<NodeId> {
    let mut leaves = Vec::new();
    let mut frontier = vec![ROOT];

    while !frontier.is_empty() {
        let mut next = Vec::new();
        for id in frontier {
            let node = &nodes[id.0];
            if node.children.is_empty() {
                leaves.push(id);
            } else {
                next.extend(node.children.iter().map(|&(_, child)| child));
            }
        }
        frontier = next;
    }

    leaves
}

/// A borrowed handle to one node of a [`Tree`].
pub struct NodeRef<'t, 'a, T> {
    tree: &'t Tree<'a, T>,
    id: NodeId,
}

impl<T> Clone for NodeRef<'_, '_, T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for NodeRef<'_, '_, T> {}

impl<'t, 'a, T> NodeRef<'t, 'a, T> {
    /// The full normalized key term of this node ("" for the root).
    #[must_use]
    pub fn key_term(&self) -> String {
        self.tree.key_term_of(self.id)
    }

    /// The records whose key term ends at this node, in input order.
    #[must_use]
    pub fn values(&self) -> &'t [&'a T] {
        self.tree.node(self.id).values.as_slice()
    }

    /// The code point this node contributes to its key term; `None` for the
    /// root.
    #[must_use]
    pub fn key_rune(&self) -> Option<char> {
        self.tree.node(self.id).key_rune
    }

    /// This node's parent; `None` for the root.
    #[must_use]
    pub fn parent(&self) -> Option<NodeRef<'t, 'a, T>> {
        self.tree
            .node(self.id)
            .parent
            .map(|id| NodeRef { tree: self.tree, id })
    }

    /// Whether this node's key term contains `phrase` as an in-order
    /// subsequence. The phrase is normalized before the check; an empty
    /// phrase matches every node.
    #[must_use]
    pub fn contains(&self, phrase: &str) -> bool {
        let normalized = normalize_term(phrase);
        let runes: SmallVec<[char; 16]> = normalized.chars().collect();
        self.tree.contains_at(self.id, &runes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq, Eq)]
    struct TestItem {
        text: &'static str,
    }

    fn item(text: &'static str) -> TestItem {
        TestItem { text }
    }

    fn load(items: &[TestItem]) -> Tree<'_, TestItem> {
        Tree::load(items, |i| Ok(i.text.to_string()), &CancelToken::new())
            .expect("load should succeed")
    }

    /// Climb from the leaves until a node with the given (normalized) key
    /// term appears.
    fn find_node<'t, 'a>(
        tree: &'t Tree<'a, TestItem>,
        term: &str,
    ) -> NodeRef<'t, 'a, TestItem> {
        let want = term.to_uppercase();
        let mut current: Vec<NodeRef<'t, 'a, TestItem>> = tree.leaf_nodes().collect();
        loop {
            assert!(!current.is_empty(), "no node with key term {want:?}");
            let mut parents = Vec::new();
            for node in current {
                if node.key_term() == want {
                    return node;
                }
                if let Some(parent) = node.parent() {
                    parents.push(parent);
                }
            }
            current = parents;
        }
    }

    #[test]
    fn test_load_places_records_at_their_terms() {
        let items = [item("cat"), item("cat"), item("cataracts"), item("dog")];
        let tree = load(&items);

        let cat = find_node(&tree, "cat");
        assert_eq!(cat.key_term(), "CAT");
        assert_eq!(cat.values(), [&items[0], &items[1]]);

        let cataracts = find_node(&tree, "cataracts");
        assert_eq!(cataracts.key_term(), "CATARACTS");
        assert_eq!(cataracts.values(), [&items[2]]);

        let dog = find_node(&tree, "dog");
        assert_eq!(dog.key_term(), "DOG");
        assert_eq!(dog.values(), [&items[3]]);
    }

    #[test]
    fn test_every_record_is_reachable_from_a_leaf() {
        let items = [item("cat"), item("cataracts"), item("catfish"), item("dog")];
        let tree = load(&items);

        let mut seen = Vec::new();
        for leaf in tree.leaf_nodes() {
            let mut node = Some(leaf);
            while let Some(current) = node {
                for &value in current.values() {
                    if !seen.iter().any(|&s| std::ptr::eq(s, value)) {
                        seen.push(value);
                    }
                }
                node = current.parent();
            }
        }
        assert_eq!(seen.len(), items.len());
    }

    #[test]
    fn test_leaves_have_no_children_and_interior_nodes_do() {
        let items = [item("cat"), item("cataracts")];
        let tree = load(&items);

        // CAT gained a child through CATARACTS, so the only leaf is the
        // longer term's end.
        let leaves: Vec<String> = tree.leaf_nodes().map(|n| n.key_term()).collect();
        assert_eq!(leaves, ["CATARACTS"]);

        let cat = find_node(&tree, "cat");
        assert_eq!(cat.values().len(), 1);
    }

    #[test]
    fn test_empty_batch_exposes_only_the_root() {
        let items: [TestItem; 0] = [];
        let tree = load(&items);

        let leaves: Vec<_> = tree.leaf_nodes().collect();
        assert_eq!(leaves.len(), 1);
        assert_eq!(leaves[0].key_term(), "");
        assert_eq!(leaves[0].key_rune(), None);
        assert!(leaves[0].values().is_empty());
        assert!(leaves[0].parent().is_none());
    }

    #[test]
    fn test_contains_matches_subsequences() {
        let items = [item("catapult"), item("cat")];
        let tree = load(&items);

        let catapult = find_node(&tree, "catapult");
        assert!(catapult.contains("cal"));
        assert!(catapult.contains("CAL"));
        assert!(catapult.contains("catapult"));
        assert!(!catapult.contains("catapults"));
        assert!(!catapult.contains("z"));

        let cat = find_node(&tree, "cat");
        assert!(!cat.contains("cal"));
        assert!(cat.contains("ct"));
    }

    #[test]
    fn test_contains_empty_phrase_matches_every_node() {
        let items = [item("cat")];
        let tree = load(&items);

        let mut node = Some(find_node(&tree, "cat"));
        while let Some(current) = node {
            assert!(current.contains(""));
            node = current.parent();
        }
    }

    #[test]
    fn test_contains_failure_is_monotonic_up_the_ancestry() {
        let items = [item("catapult")];
        let tree = load(&items);

        let mut node = Some(find_node(&tree, "catapult"));
        let mut failed_below = false;
        while let Some(current) = node {
            let matches = current.contains("cal");
            if failed_below {
                assert!(
                    !matches,
                    "ancestor {:?} matched after a failure below it",
                    current.key_term()
                );
            }
            if !matches {
                failed_below = true;
            }
            node = current.parent();
        }
        assert!(failed_below, "the root never matches a non-empty phrase");
    }

    #[test]
    fn test_extraction_failure_reports_the_record_position() {
        let items = [item("cat"), item("dog")];
        let result = Tree::load(
            &items,
            |i| {
                if i.text == "dog" {
                    Err("no key for dogs".into())
                } else {
                    Ok(i.text.to_string())
                }
            },
            &CancelToken::new(),
        );

        let err = result.err().expect("expected extraction failure");
        match err {
            LoadError::KeyExtraction { index, .. } => assert_eq!(index, 1),
            other => panic!("expected extraction failure, got {other:?}"),
        }
    }

    #[test]
    fn test_cancelled_load_returns_the_cancellation() {
        let items = [item("cat")];
        let cancel = CancelToken::new();
        cancel.cancel();

        let result = Tree::load(&items, |i| Ok(i.text.to_string()), &cancel);
        assert!(matches!(result, Err(LoadError::Cancelled(_))));
    }
}
