//! Dependency graph for formula cells.
//!
//! Stores a set of ordered pairs `(s, t)` meaning "t's formula reads s, so s
//! must be evaluated before t". Both directions are indexed so that either
//! question can be answered without a scan.
//!
//! # Edge Direction
//!
//! ```text
//! (s, t)  means  "t depends on s"  (s is a dependee of t, t is a dependent of s)
//! ```
//!
//! For example, with pairs `{(a, b), (a, c), (b, d), (d, d)}`:
//!
//! ```text
//! dependents(a) = {b, c}     dependees(a) = {}
//! dependents(b) = {d}        dependees(b) = {a}
//! dependents(c) = {}         dependees(c) = {a}
//! dependents(d) = {d}        dependees(d) = {b, d}
//! ```

use rustc_hash::{FxHashMap, FxHashSet};

use crate::recalc::CycleReport;

/// Dependency graph keyed by cell name.
///
/// Maintains bidirectional adjacency:
/// - `dependees[t]` = names t depends on
/// - `dependents[s]` = names that depend on s
///
/// # Invariants
///
/// 1. **Bidirectional consistency:** s ∈ dependees[t] iff t ∈ dependents[s].
/// 2. **No dangling entries:** Empty sets are removed, not stored.
/// 3. **No duplicate edges:** Set semantics enforced by FxHashSet.
/// 4. **Exact size:** `len()` equals the number of distinct pairs.
#[derive(Default, Debug, Clone)]
pub struct DepGraph {
    /// t -> {s1, s2, ...}
    dependees: FxHashMap<String, FxHashSet<String>>,

    /// s -> {t1, t2, ...}
    dependents: FxHashMap<String, FxHashSet<String>>,

    /// Number of distinct pairs.
    size: usize,
}

impl DepGraph {
    /// Create an empty dependency graph.
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of ordered pairs in the graph.
    pub fn len(&self) -> usize {
        self.size
    }

    pub fn is_empty(&self) -> bool {
        self.size == 0
    }

    /// Names that depend on `s`. Unknown names have no dependents.
    pub fn dependents(&self, s: &str) -> impl Iterator<Item = &str> + '_ {
        self.dependents
            .get(s)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Names that `s` depends on. Unknown names have no dependees.
    pub fn dependees(&self, s: &str) -> impl Iterator<Item = &str> + '_ {
        self.dependees
            .get(s)
            .into_iter()
            .flat_map(|set| set.iter().map(String::as_str))
    }

    /// Size of `dependents(s)`.
    pub fn dependent_count(&self, s: &str) -> usize {
        self.dependents.get(s).map_or(0, |set| set.len())
    }

    /// Size of `dependees(s)`, i.e. the number of things `s` depends on.
    pub fn dependee_count(&self, s: &str) -> usize {
        self.dependees.get(s).map_or(0, |set| set.len())
    }

    pub fn has_dependents(&self, s: &str) -> bool {
        self.dependents.contains_key(s)
    }

    pub fn has_dependees(&self, s: &str) -> bool {
        self.dependees.contains_key(s)
    }

    /// Returns true if the pair `(s, t)` is present.
    pub fn contains(&self, s: &str, t: &str) -> bool {
        self.dependents.get(s).is_some_and(|set| set.contains(t))
    }

    /// Add the pair `(s, t)`: t depends on s. No-op if already present.
    pub fn add_dependency(&mut self, s: &str, t: &str) {
        let inserted = self
            .dependents
            .entry(s.to_string())
            .or_default()
            .insert(t.to_string());
        if !inserted {
            return;
        }
        self.dependees
            .entry(t.to_string())
            .or_default()
            .insert(s.to_string());
        self.size += 1;
    }

    /// Remove the pair `(s, t)`. No-op if absent.
    pub fn remove_dependency(&mut self, s: &str, t: &str) {
        let Some(succs) = self.dependents.get_mut(s) else {
            return;
        };
        if !succs.remove(t) {
            return;
        }
        if succs.is_empty() {
            self.dependents.remove(s);
        }

        if let Some(preds) = self.dependees.get_mut(t) {
            preds.remove(s);
            if preds.is_empty() {
                self.dependees.remove(t);
            }
        }
        self.size -= 1;
    }

    /// Remove every pair `(s, *)`, then add `(s, t)` for each t in `new_dependents`.
    pub fn replace_dependents<I, T>(&mut self, s: &str, new_dependents: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        if let Some(old) = self.dependents.remove(s) {
            for t in &old {
                if let Some(preds) = self.dependees.get_mut(t) {
                    preds.remove(s);
                    if preds.is_empty() {
                        self.dependees.remove(t);
                    }
                }
            }
            self.size -= old.len();
        }

        for t in new_dependents {
            self.add_dependency(s, t.as_ref());
        }
    }

    /// Remove every pair `(*, s)`, then add `(t, s)` for each t in `new_dependees`.
    ///
    /// This is the primary mutation used by the spreadsheet: a formula cell's
    /// dependees are exactly the variables of its formula.
    pub fn replace_dependees<I, T>(&mut self, s: &str, new_dependees: I)
    where
        I: IntoIterator<Item = T>,
        T: AsRef<str>,
    {
        if let Some(old) = self.dependees.remove(s) {
            for t in &old {
                if let Some(succs) = self.dependents.get_mut(t) {
                    succs.remove(s);
                    if succs.is_empty() {
                        self.dependents.remove(t);
                    }
                }
            }
            self.size -= old.len();
        }

        for t in new_dependees {
            self.add_dependency(t.as_ref(), s);
        }
    }

    // =========================================================================
    // Recalculation Order + Cycle Detection
    // =========================================================================

    /// Compute the order in which `start` and everything downstream of it must
    /// be re-evaluated.
    ///
    /// Returns `start` followed by every transitive dependent, in an order where
    /// no name appears before any of its dependees that are also in the list.
    ///
    /// # Algorithm
    ///
    /// Depth-first traversal over dependent edges, emitting names in reverse
    /// postorder. A name reached again while it is still on the traversal
    /// stack closes a cycle (self-loops included). Dependents are visited in
    /// sorted order so the result is deterministic for a given graph.
    ///
    /// # Returns
    ///
    /// - `Ok(order)` - Valid recalculation order, `start` first
    /// - `Err(CycleReport)` - A cycle is reachable from `start`
    pub fn recalc_order(&self, start: &str) -> Result<Vec<String>, CycleReport> {
        // Iterative DFS to avoid stack overflow on long chains.
        struct DfsFrame<'a> {
            name: &'a str,
            next: Vec<&'a str>,
            next_idx: usize,
        }

        let mut visited: FxHashSet<&str> = FxHashSet::default();
        let mut on_stack: FxHashSet<&str> = FxHashSet::default();
        let mut postorder: Vec<&str> = Vec::new();

        visited.insert(start);
        on_stack.insert(start);
        let mut dfs_stack = vec![DfsFrame {
            name: start,
            next: self.sorted_dependents(start),
            next_idx: 0,
        }];

        while let Some(frame) = dfs_stack.last_mut() {
            if frame.next_idx < frame.next.len() {
                let w = frame.next[frame.next_idx];
                frame.next_idx += 1;

                if on_stack.contains(w) {
                    // Path from w down to the current frame, then back to w.
                    let pos = dfs_stack
                        .iter()
                        .position(|f| f.name == w)
                        .unwrap_or(0);
                    let mut path: Vec<String> =
                        dfs_stack[pos..].iter().map(|f| f.name.to_string()).collect();
                    if path.len() == 1 {
                        return Err(CycleReport::self_reference(w));
                    }
                    path.push(w.to_string());
                    return Err(CycleReport::cycle(path));
                }

                if visited.insert(w) {
                    on_stack.insert(w);
                    dfs_stack.push(DfsFrame {
                        name: w,
                        next: self.sorted_dependents(w),
                        next_idx: 0,
                    });
                }
            } else if let Some(finished) = dfs_stack.pop() {
                on_stack.remove(finished.name);
                postorder.push(finished.name);
            }
        }

        Ok(postorder.into_iter().rev().map(str::to_string).collect())
    }

    fn sorted_dependents(&self, name: &str) -> Vec<&str> {
        let mut next: Vec<&str> = self.dependents(name).collect();
        next.sort_unstable();
        next
    }

    /// Check all invariants. Panics if any are violated.
    ///
    /// Only available in test builds.
    #[cfg(test)]
    pub fn assert_consistent(&self) {
        // Invariant 1: dependents -> dependees
        for (s, succs) in &self.dependents {
            for t in succs {
                assert!(
                    self.dependees.get(t).is_some_and(|p| p.contains(s)),
                    "Missing dependee edge: {:?} should have {:?} in dependees",
                    t,
                    s
                );
            }
        }

        // Invariant 1: dependees -> dependents
        for (t, preds) in &self.dependees {
            for s in preds {
                assert!(
                    self.dependents.get(s).is_some_and(|d| d.contains(t)),
                    "Missing dependent edge: {:?} should have {:?} in dependents",
                    s,
                    t
                );
            }
        }

        // Invariant 2: No empty sets stored
        for (name, set) in self.dependents.iter().chain(self.dependees.iter()) {
            assert!(!set.is_empty(), "Empty set stored for {:?}", name);
        }

        // Invariant 4: size matches
        let counted: usize = self.dependents.values().map(|s| s.len()).sum();
        assert_eq!(counted, self.size, "Edge count out of sync");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;

    fn sorted<'a>(it: impl Iterator<Item = &'a str>) -> Vec<&'a str> {
        let set: BTreeSet<&str> = it.collect();
        set.into_iter().collect()
    }

    /// {(a, b), (a, c), (b, d), (d, d)}
    fn sample() -> DepGraph {
        let mut graph = DepGraph::new();
        graph.add_dependency("a", "b");
        graph.add_dependency("a", "c");
        graph.add_dependency("b", "d");
        graph.add_dependency("d", "d");
        graph
    }

    #[test]
    fn test_empty_graph() {
        let graph = DepGraph::new();

        assert_eq!(graph.len(), 0);
        assert!(graph.is_empty());
        assert_eq!(graph.dependents("a").count(), 0);
        assert_eq!(graph.dependees("a").count(), 0);
        assert!(!graph.has_dependents("a"));
        assert!(!graph.has_dependees("a"));

        graph.assert_consistent();
    }

    #[test]
    fn test_sample_queries() {
        let graph = sample();
        graph.assert_consistent();

        assert_eq!(graph.len(), 4);
        assert_eq!(sorted(graph.dependents("a")), vec!["b", "c"]);
        assert_eq!(sorted(graph.dependents("b")), vec!["d"]);
        assert!(sorted(graph.dependents("c")).is_empty());
        assert_eq!(sorted(graph.dependents("d")), vec!["d"]);
        assert!(sorted(graph.dependees("a")).is_empty());
        assert_eq!(sorted(graph.dependees("b")), vec!["a"]);
        assert_eq!(sorted(graph.dependees("c")), vec!["a"]);
        assert_eq!(sorted(graph.dependees("d")), vec!["b", "d"]);

        assert_eq!(graph.dependee_count("d"), 2);
        assert_eq!(graph.dependent_count("a"), 2);
        assert!(graph.has_dependents("a"));
        assert!(!graph.has_dependees("a"));
    }

    #[test]
    fn test_duplicate_add_is_noop() {
        let mut graph = DepGraph::new();
        graph.add_dependency("x", "y");
        graph.add_dependency("x", "y");
        graph.assert_consistent();

        assert_eq!(graph.len(), 1);
        assert_eq!(graph.dependent_count("x"), 1);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut graph = sample();
        graph.remove_dependency("c", "a");
        graph.remove_dependency("zz", "a");
        graph.assert_consistent();
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_remove_cleans_up() {
        let mut graph = DepGraph::new();
        graph.add_dependency("x", "y");
        graph.remove_dependency("x", "y");
        graph.assert_consistent();

        assert!(graph.is_empty());
        assert!(!graph.has_dependents("x"));
        assert!(!graph.has_dependees("y"));
    }

    #[test]
    fn test_replace_dependents() {
        let mut graph = sample();
        graph.replace_dependents("a", ["x", "y", "x"]);
        graph.assert_consistent();

        assert_eq!(sorted(graph.dependents("a")), vec!["x", "y"]);
        assert!(sorted(graph.dependees("b")).is_empty());
        assert_eq!(sorted(graph.dependees("x")), vec!["a"]);
        assert_eq!(graph.len(), 4);
    }

    #[test]
    fn test_replace_dependees() {
        let mut graph = sample();
        graph.replace_dependees("d", ["a"]);
        graph.assert_consistent();

        assert_eq!(sorted(graph.dependees("d")), vec!["a"]);
        assert!(sorted(graph.dependents("b")).is_empty());
        assert_eq!(sorted(graph.dependents("a")), vec!["b", "c", "d"]);
        assert_eq!(graph.len(), 3);
    }

    #[test]
    fn test_replace_with_empty_clears() {
        let mut graph = sample();
        graph.replace_dependees("d", Vec::<String>::new());
        graph.replace_dependents("a", Vec::<String>::new());
        graph.assert_consistent();

        assert!(graph.is_empty());
    }

    #[test]
    fn test_replace_unknown_node() {
        let mut graph = DepGraph::new();
        graph.replace_dependees("q", ["r", "s"]);
        graph.assert_consistent();

        assert_eq!(sorted(graph.dependees("q")), vec!["r", "s"]);
        assert_eq!(graph.len(), 2);
    }

    #[test]
    fn test_recalc_order_single() {
        let graph = DepGraph::new();
        assert_eq!(graph.recalc_order("A1").unwrap(), vec!["A1"]);
    }

    #[test]
    fn test_recalc_order_chain() {
        // B1 = A1, C1 = B1
        let mut graph = DepGraph::new();
        graph.replace_dependees("B1", ["A1"]);
        graph.replace_dependees("C1", ["B1"]);

        assert_eq!(graph.recalc_order("A1").unwrap(), vec!["A1", "B1", "C1"]);
        assert_eq!(graph.recalc_order("B1").unwrap(), vec!["B1", "C1"]);
    }

    #[test]
    fn test_recalc_order_diamond() {
        // B1 = A1, C1 = A1, D1 = B1 + C1
        let mut graph = DepGraph::new();
        graph.replace_dependees("B1", ["A1"]);
        graph.replace_dependees("C1", ["A1"]);
        graph.replace_dependees("D1", ["B1", "C1"]);

        let order = graph.recalc_order("A1").unwrap();
        assert_eq!(order.len(), 4);
        let pos = |n: &str| order.iter().position(|c| c == n).unwrap();
        assert_eq!(pos("A1"), 0);
        assert!(pos("B1") < pos("D1"));
        assert!(pos("C1") < pos("D1"));
    }

    #[test]
    fn test_recalc_order_stable() {
        let mut graph = DepGraph::new();
        for name in ["E1", "B1", "D1", "C1"] {
            graph.replace_dependees(name, ["A1"]);
        }
        let first = graph.recalc_order("A1").unwrap();
        for _ in 0..5 {
            assert_eq!(graph.recalc_order("A1").unwrap(), first);
        }
    }

    #[test]
    fn test_recalc_order_self_loop() {
        let mut graph = DepGraph::new();
        graph.add_dependency("B12", "B12");

        let report = graph.recalc_order("B12").unwrap_err();
        assert_eq!(report.cells, vec!["B12".to_string()]);
        assert!(report.message.contains("references itself"));
    }

    #[test]
    fn test_recalc_order_two_cell_cycle() {
        let mut graph = DepGraph::new();
        graph.replace_dependees("A1", ["B1"]);
        graph.replace_dependees("B1", ["A1"]);

        let report = graph.recalc_order("A1").unwrap_err();
        assert_eq!(report.cells, vec!["A1", "B1", "A1"]);
    }

    #[test]
    fn test_recalc_order_indirect_cycle() {
        // A1 -> B1 -> C1 -> A1
        let mut graph = DepGraph::new();
        graph.replace_dependees("B1", ["A1"]);
        graph.replace_dependees("C1", ["B1"]);
        graph.replace_dependees("A1", ["C1"]);

        assert!(graph.recalc_order("B1").is_err());
    }

    #[test]
    fn test_recalc_order_cycle_downstream() {
        // X feeds a cycle it is not part of: still rejected.
        let mut graph = DepGraph::new();
        graph.replace_dependees("B1", ["X1", "C1"]);
        graph.replace_dependees("C1", ["B1"]);

        assert!(graph.recalc_order("X1").is_err());
    }

    #[test]
    fn test_recalc_order_shared_descendant_is_not_a_cycle() {
        // Two paths to the same node must not be mistaken for a cycle.
        let mut graph = DepGraph::new();
        graph.replace_dependees("B1", ["A1"]);
        graph.replace_dependees("C1", ["A1", "B1"]);

        assert_eq!(graph.recalc_order("A1").unwrap(), vec!["A1", "B1", "C1"]);
    }

    #[test]
    fn test_recalc_order_long_chain() {
        let mut graph = DepGraph::new();
        for i in 1..5000 {
            graph.replace_dependees(&format!("A{}", i + 1), [format!("A{}", i)]);
        }
        let order = graph.recalc_order("A1").unwrap();
        assert_eq!(order.len(), 5000);
        assert_eq!(order.last().map(String::as_str), Some("A5000"));
    }
}
