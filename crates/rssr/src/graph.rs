// File: src/graph.rs
// Purpose: Depth-first walk over import graphs

use std::collections::HashSet;
use std::hash::Hash;

/// Visits `roots` and everything reachable from them, depth-first and pre-order
///
/// Each node is yielded once, so cycles and shared dependencies are harmless.
/// Roots share the visited set: a root already reached from an earlier root
/// is not repeated.
pub fn walk<N, F, I>(roots: impl IntoIterator<Item = N>, mut edges: F) -> Vec<N>
where
    N: Clone + Eq + Hash,
    F: FnMut(&N) -> I,
    I: IntoIterator<Item = N>,
{
    let mut visited = HashSet::new();
    let mut order = Vec::new();
    let mut stack: Vec<N> = roots.into_iter().collect();
    stack.reverse();

    while let Some(node) = stack.pop() {
        if !visited.insert(node.clone()) {
            continue;
        }
        let mut next: Vec<N> = edges(&node).into_iter().collect();
        next.reverse();
        stack.extend(next);
        order.push(node);
    }

    order
}
