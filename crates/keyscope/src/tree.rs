//! Prefix tree of key metrics with bounded fan-out
//!
//! Every key is split into segments and walked from the root; each node on
//! the path accumulates the key's metrics. A node holds at most
//! `max_children` literal children. Once that bound is reached, any new
//! segment arriving at the node is routed into a single synthetic
//! *aggregated* child that absorbs the metrics of everything else under the
//! node and never grows children of its own.
//!
//! Totals are exact regardless of collapsing; only the shape of the
//! collapsed region is lost. Because node totals are plain sums the final
//! totals do not depend on insertion order, although which segments end up
//! collapsed does.

use crate::metric::{Metric, Metrics};
use crate::segment::Segmenter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Segment name renderers use for an aggregated child.
pub const AGGREGATED_SEGMENT: &str = "*";

/// Fan-out bound used when none is configured.
pub const DEFAULT_MAX_CHILDREN: usize = 10;

/// A vertex of the prefix tree.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Node {
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    children: HashMap<String, Node>,
    #[serde(default)]
    metrics: Metrics,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    aggregated: Option<Box<Node>>,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    is_aggregated: bool,
}

impl Node {
    fn new_aggregated() -> Self {
        Self {
            is_aggregated: true,
            ..Self::default()
        }
    }

    /// Literal children, in no particular order.
    pub fn children(&self) -> impl Iterator<Item = (&str, &Node)> {
        self.children.iter().map(|(segment, node)| (segment.as_str(), node))
    }

    pub fn child(&self, segment: &str) -> Option<&Node> {
        self.children.get(segment)
    }

    /// Number of literal children; never exceeds the tree's `max_children`.
    pub fn children_len(&self) -> usize {
        self.children.len()
    }

    /// The summary child absorbing segments beyond the fan-out bound.
    pub fn aggregated(&self) -> Option<&Node> {
        self.aggregated.as_deref()
    }

    pub fn is_aggregated(&self) -> bool {
        self.is_aggregated
    }

    pub fn is_leaf(&self) -> bool {
        self.children.is_empty() && self.aggregated.is_none()
    }

    pub fn metrics(&self) -> &Metrics {
        &self.metrics
    }

    pub fn metric(&self, metric: Metric) -> u64 {
        self.metrics.get(metric)
    }

    /// Children ordered by `metric` descending, ties broken by segment.
    /// The aggregated child, if any, comes last under [`AGGREGATED_SEGMENT`].
    pub fn sorted_children(&self, metric: Metric) -> Vec<(&str, &Node)> {
        let mut ordered: Vec<(&str, &Node)> = self.children().collect();
        ordered.sort_by(|(a_name, a), (b_name, b)| {
            b.metric(metric)
                .cmp(&a.metric(metric))
                .then_with(|| a_name.cmp(b_name))
        });
        if let Some(aggregated) = self.aggregated() {
            ordered.push((AGGREGATED_SEGMENT, aggregated));
        }
        ordered
    }

    /// Depth-first pre-order traversal below this node, largest `BytesSize`
    /// first. The visitor receives the segment path from this node, so the
    /// path length is the depth. Descends at most `max_depth` levels.
    pub fn walk<F>(&self, max_depth: usize, mut visit: F)
    where
        F: FnMut(&[&str], &Node),
    {
        let mut path = Vec::new();
        self.walk_inner(max_depth, &mut path, &mut visit);
    }

    fn walk_inner<'a, F>(&'a self, max_depth: usize, path: &mut Vec<&'a str>, visit: &mut F)
    where
        F: FnMut(&[&str], &Node),
    {
        if path.len() >= max_depth {
            return;
        }
        for (segment, child) in self.sorted_children(Metric::BytesSize) {
            path.push(segment);
            visit(path.as_slice(), child);
            child.walk_inner(max_depth, path, visit);
            path.pop();
        }
    }

    /// Total number of nodes in this subtree, including this one.
    pub fn node_count(&self) -> usize {
        1 + self.children.values().map(Node::node_count).sum::<usize>()
            + self.aggregated.as_ref().map_or(0, |node| node.node_count())
    }
}

/// Prefix tree owning its root, segmenter and fan-out bound.
#[derive(Debug, Clone)]
pub struct Tree {
    root: Node,
    segmenter: Segmenter,
    max_children: usize,
}

impl Tree {
    pub fn new(segmenter: Segmenter, max_children: usize) -> Self {
        Self {
            root: Node::default(),
            segmenter,
            max_children,
        }
    }

    /// Add one key's metric values along its segment path.
    ///
    /// A key with no segments is attributed to the root alone. Adding the
    /// same key twice counts it twice.
    pub fn add(&mut self, key: &str, values: &[(Metric, u64)]) {
        let mut node = &mut self.root;
        node.metrics.add_all(values);

        for segment in self.segmenter.split(key) {
            if !node.children.contains_key(segment) && node.children.len() >= self.max_children {
                let overflow = node
                    .aggregated
                    .get_or_insert_with(|| Box::new(Node::new_aggregated()));
                overflow.metrics.add_all(values);
                return;
            }
            node = node.children.entry(segment.to_owned()).or_default();
            node.metrics.add_all(values);
        }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn into_root(self) -> Node {
        self.root
    }

    pub fn segmenter(&self) -> &Segmenter {
        &self.segmenter
    }

    pub fn max_children(&self) -> usize {
        self.max_children
    }
}

impl Default for Tree {
    fn default() -> Self {
        Self::new(Segmenter::default(), DEFAULT_MAX_CHILDREN)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::key_sample;
    use proptest::prelude::*;

    fn tree(max_children: usize) -> Tree {
        Tree::new(Segmenter::default(), max_children)
    }

    fn bytes(node: &Node) -> u64 {
        node.metric(Metric::BytesSize)
    }

    fn keys(node: &Node) -> u64 {
        node.metric(Metric::KeysCount)
    }

    fn assert_fan_out(node: &Node, max_children: usize) {
        assert!(node.children_len() <= max_children);
        for (_, child) in node.children() {
            assert_fan_out(child, max_children);
        }
    }

    /// Children plus aggregated child never exceed the parent; the gap is keys ending at the parent.
    fn assert_conservation(node: &Node) {
        let mut below = Metrics::new();
        for (_, child) in node.children() {
            below.merge(child.metrics());
            assert_conservation(child);
        }
        if let Some(aggregated) = node.aggregated() {
            assert!(aggregated.is_leaf());
            below.merge(aggregated.metrics());
        }
        assert!(below.get(Metric::BytesSize) <= bytes(node));
        assert!(below.get(Metric::KeysCount) <= keys(node));
    }

    #[test]
    fn test_collapse_example() {
        let mut tree = tree(2);
        tree.add("a:1", &key_sample(10));
        tree.add("a:2", &key_sample(20));
        tree.add("a:3", &key_sample(30));
        tree.add("b:1", &key_sample(5));

        let root = tree.root();
        assert_eq!(root.children_len(), 2);
        assert!(root.aggregated().is_none());
        assert_eq!((bytes(root), keys(root)), (65, 4));

        let a = root.child("a").unwrap();
        assert_eq!((bytes(a), keys(a)), (60, 3));
        assert_eq!(a.children_len(), 2);
        assert_eq!(bytes(a.child("1").unwrap()), 10);
        assert_eq!(bytes(a.child("2").unwrap()), 20);
        assert!(a.child("3").is_none());

        let overflow = a.aggregated().unwrap();
        assert!(overflow.is_aggregated());
        assert_eq!((bytes(overflow), keys(overflow)), (30, 1));

        let b = root.child("b").unwrap();
        assert_eq!((bytes(b), keys(b)), (5, 1));
    }

    #[test]
    fn test_collapsed_node_conserves_totals_exactly() {
        let mut tree = tree(1);
        tree.add("a", &key_sample(100));
        tree.add("a:1", &key_sample(1));
        tree.add("a:2", &key_sample(2));
        tree.add("a:3", &key_sample(3));

        let a = tree.root().child("a").unwrap();
        let literal = a.child("1").unwrap();
        let overflow = a.aggregated().unwrap();
        assert_eq!(bytes(literal) + bytes(overflow), bytes(a) - 100);
        assert_eq!(keys(literal) + keys(overflow), keys(a) - 1);
    }

    #[test]
    fn test_empty_key_counts_at_root_only() {
        let mut tree = tree(2);
        tree.add("", &key_sample(8));
        tree.add(":::", &key_sample(2));
        assert_eq!((bytes(tree.root()), keys(tree.root())), (10, 2));
        assert!(tree.root().is_leaf());
    }

    #[test]
    fn test_re_adding_key_counts_twice() {
        let mut tree = tree(4);
        tree.add("user:1", &key_sample(7));
        tree.add("user:1", &key_sample(7));
        let leaf = tree.root().child("user").unwrap().child("1").unwrap();
        assert_eq!((bytes(leaf), keys(leaf)), (14, 2));
    }

    #[test]
    fn test_existing_child_still_reachable_after_overflow() {
        let mut tree = tree(1);
        tree.add("a", &key_sample(1));
        tree.add("b", &key_sample(2));
        tree.add("a", &key_sample(4));
        let root = tree.root();
        assert_eq!(bytes(root.child("a").unwrap()), 5);
        assert_eq!(bytes(root.aggregated().unwrap()), 2);
    }

    #[test]
    fn test_aggregated_child_is_terminal() {
        let mut tree = tree(1);
        tree.add("a:x:y", &key_sample(1));
        tree.add("b:x:y", &key_sample(1));
        tree.add("c:x:y", &key_sample(1));
        let overflow = tree.root().aggregated().unwrap();
        assert!(overflow.is_leaf());
        assert_eq!(keys(overflow), 2);
        assert_eq!(tree.root().node_count(), 5);
    }

    #[test]
    fn test_high_cardinality_stays_bounded() {
        let mut tree = tree(10);
        for i in 0..10_000u64 {
            tree.add(&format!("session:{i:08x}:data"), &key_sample(i));
        }
        let session = tree.root().child("session").unwrap();
        assert_eq!(session.children_len(), 10);
        assert_eq!(keys(session), 10_000);
        assert_eq!(keys(session.aggregated().unwrap()), 9_990);
        assert_fan_out(tree.root(), 10);
        assert_conservation(tree.root());
    }

    #[test]
    fn test_zero_fan_out_collapses_everything() {
        let mut tree = tree(0);
        tree.add("a:b", &key_sample(3));
        tree.add("c", &key_sample(4));
        let root = tree.root();
        assert_eq!(root.children_len(), 0);
        assert_eq!(bytes(root.aggregated().unwrap()), 7);
    }

    #[test]
    fn test_walk_orders_by_size_and_limits_depth() {
        let mut tree = tree(1);
        tree.add("small:1", &key_sample(1));
        tree.add("big:1", &key_sample(100));
        tree.add("small:2", &key_sample(1));

        let mut visited = Vec::new();
        tree.root().walk(1, |path, node| visited.push((path.join(":"), bytes(node))));
        assert_eq!(visited, vec![("small".to_string(), 2), ("*".to_string(), 100)]);

        let mut deep = Vec::new();
        tree.root().walk(usize::MAX, |path, _| deep.push(path.join(":")));
        assert_eq!(deep, vec!["small", "small:1", "small:*", "*"]);
    }

    proptest! {
        #[test]
        fn test_totals_and_bound_hold_for_any_input(
            entries in prop::collection::vec(("[a-d]{1,2}(:[a-d]{1,2}){0,3}", 0u64..1_000), 0..200),
            max_children in 1usize..4,
        ) {
            let mut tree = tree(max_children);
            for (key, cost) in &entries {
                tree.add(key, &key_sample(*cost));
            }
            let root = tree.root();
            prop_assert_eq!(keys(root), entries.len() as u64);
            prop_assert_eq!(bytes(root), entries.iter().map(|(_, c)| c).sum::<u64>());
            assert_fan_out(root, max_children);
            assert_conservation(root);
        }

        #[test]
        fn test_root_totals_are_order_independent(
            entries in prop::collection::vec(("[a-f](:[a-f]){0,2}", 0u64..500), 1..100),
            seed in any::<u64>(),
        ) {
            let mut forward = tree(2);
            for (key, cost) in &entries {
                forward.add(key, &key_sample(*cost));
            }

            let mut shuffled = entries.clone();
            let len = shuffled.len();
            for i in 0..len {
                let j = (seed.wrapping_mul(i as u64 + 1) % len as u64) as usize;
                shuffled.swap(i, j);
            }
            let mut permuted = tree(2);
            for (key, cost) in &shuffled {
                permuted.add(key, &key_sample(*cost));
            }

            prop_assert_eq!(forward.root().metrics(), permuted.root().metrics());
        }
    }
}
