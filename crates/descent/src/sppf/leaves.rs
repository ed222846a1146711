//! Ordered leaf traversal: read the recognized word back out of a
//! derivation.
//!
//! Walking the cheapest alternative under every parent node and emitting
//! terminal leaves left to right yields the input as recovery repaired
//! it: skipped terminals are absent, inserted ones present. Comparing
//! that word against the original input is the natural way to check what
//! a recovered parse actually recognized.

use hashbrown::HashSet;

use crate::input::Vertex;
use crate::rsm::Terminal;
use crate::sppf::{Sppf, SppfId, SppfNode};

/// Left-to-right iterator over the terminal leaves of one derivation.
///
/// Each parent node is expanded at most once, so derivations that recurse
/// into themselves terminate.
pub struct OrderedLeaves<'a, V, T> {
    sppf: &'a Sppf<V, T>,
    stack: Vec<SppfId>,
    expanded: HashSet<SppfId>,
}

impl<'a, V: Vertex, T: Terminal> Iterator for OrderedLeaves<'a, V, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        while let Some(id) = self.stack.pop() {
            match self.sppf.node(id) {
                SppfNode::Terminal { terminal, .. } => {
                    // A None terminal is an empty derivation, no leaf.
                    if let Some(t) = terminal {
                        return Some(t);
                    }
                }
                SppfNode::Packed { left, right, .. } => {
                    // Right below left so the left subrange pops first.
                    if let Some(r) = *right {
                        self.stack.push(r);
                    }
                    if let Some(l) = *left {
                        self.stack.push(l);
                    }
                }
                SppfNode::Intermediate { .. } | SppfNode::Symbol { .. } => {
                    if self.expanded.insert(id) {
                        if let Some(alt) = self.sppf.cheapest_alternative(id) {
                            self.stack.push(alt);
                        }
                    }
                }
            }
        }
        None
    }
}

impl<V: Vertex, T: Terminal> Sppf<V, T> {
    /// Terminal leaves of the cheapest derivation below `root`, in input
    /// order.
    #[must_use]
    pub fn leaves(&self, root: SppfId) -> OrderedLeaves<'_, V, T> {
        OrderedLeaves {
            sppf: self,
            stack: vec![root],
            expanded: HashSet::new(),
        }
    }

    /// Eager form of [`Sppf::leaves`].
    #[must_use]
    pub fn collect_leaves(&self, root: SppfId) -> Vec<T> {
        self.leaves(root).cloned().collect()
    }
}
