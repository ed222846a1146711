//! Shared packed parse forest (SPPF).
//!
//! All derivations of all substrings live in one arena of nodes, shared
//! by hash-consing: structurally equal nodes are interned to a single
//! [`SppfId`]. Symbol and intermediate nodes own their packed children;
//! parent links point the other way and carry no ownership, which is what
//! lets [`Sppf::invalidate`] unhook a subforest bottom-up without
//! reference-count ceremony.
//!
//! Weights implement error recovery: a node's weight is the cheapest
//! number of edits among the derivations below it. Parent-node weights
//! start unknown (`None`, compares as +infinity) and only ever decrease
//! as packed alternatives attach.

pub mod leaves;

pub use leaves::OrderedLeaves;

use std::collections::VecDeque;

use hashbrown::{HashMap, HashSet};

use crate::input::Vertex;
use crate::rsm::{NonterminalId, Rsm, StateId, Terminal};

/// Handle to a forest node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SppfId(pub(crate) u32);

impl SppfId {
    /// Position of the node in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// One forest node.
///
/// `Terminal` leaves match one input edge (or, with a `None` terminal, an
/// empty derivation). `Symbol` nodes cover a complete nonterminal
/// derivation over an input range, `Intermediate` nodes a partial one up
/// to an automaton state. `Packed` nodes are the alternatives: each packed
/// child of a parent is one way to split the parent's range at `pivot`.
#[derive(Debug)]
pub enum SppfNode<V, T> {
    Terminal {
        terminal: Option<T>,
        left: V,
        right: V,
        weight: u32,
        parents: HashSet<SppfId>,
    },
    Intermediate {
        state: StateId,
        left: V,
        right: V,
        weight: Option<u32>,
        children: HashSet<SppfId>,
        parents: HashSet<SppfId>,
    },
    Symbol {
        nonterminal: NonterminalId,
        left: V,
        right: V,
        weight: Option<u32>,
        children: HashSet<SppfId>,
        parents: HashSet<SppfId>,
    },
    Packed {
        pivot: V,
        state: StateId,
        left: Option<SppfId>,
        right: Option<SppfId>,
        weight: u32,
        parents: HashSet<SppfId>,
    },
}

/// Intern key of a node. Terminal keys include the weight: a recovered
/// terminal and a matched one over the same range are distinct leaves.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum NodeKey<V, T> {
    Terminal {
        terminal: Option<T>,
        left: V,
        right: V,
        weight: u32,
    },
    Intermediate {
        state: StateId,
        left: V,
        right: V,
    },
    Symbol {
        nonterminal: NonterminalId,
        left: V,
        right: V,
    },
    Packed {
        pivot: V,
        state: StateId,
        left: Option<SppfId>,
        right: Option<SppfId>,
    },
}

/// The forest arena plus its intern tables.
#[derive(Debug, Default)]
pub struct Sppf<V, T> {
    nodes: Vec<SppfNode<V, T>>,
    interned: HashMap<NodeKey<V, T>, SppfId>,
    /// Terminal nodes indexed by left extent; the seed set for
    /// [`Sppf::invalidate`].
    terminals_by_left: HashMap<V, HashSet<SppfId>>,
}

impl<V: Vertex, T: Terminal> Sppf<V, T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            interned: HashMap::new(),
            terminals_by_left: HashMap::new(),
        }
    }

    /// Look up a node by handle. Handles stay valid across `invalidate`;
    /// detached nodes merely leave the intern tables.
    #[must_use]
    pub fn node(&self, id: SppfId) -> &SppfNode<V, T> {
        &self.nodes[id.index()]
    }

    /// Number of nodes currently interned (detached nodes excluded).
    #[must_use]
    pub fn live_node_count(&self) -> usize {
        self.interned.len()
    }

    /// Left extent of a node's input range.
    #[must_use]
    pub fn left_extent(&self, id: SppfId) -> V {
        match &self.nodes[id.index()] {
            SppfNode::Terminal { left, .. }
            | SppfNode::Intermediate { left, .. }
            | SppfNode::Symbol { left, .. } => *left,
            SppfNode::Packed { pivot, left, .. } => {
                left.map_or(*pivot, |l| self.left_extent(l))
            }
        }
    }

    /// Right extent of a node's input range.
    #[must_use]
    pub fn right_extent(&self, id: SppfId) -> V {
        match &self.nodes[id.index()] {
            SppfNode::Terminal { right, .. }
            | SppfNode::Intermediate { right, .. }
            | SppfNode::Symbol { right, .. } => *right,
            SppfNode::Packed { pivot, right, .. } => {
                right.map_or(*pivot, |r| self.right_extent(r))
            }
        }
    }

    /// Weight of a node; an unknown parent weight reads as +infinity.
    #[must_use]
    pub fn weight(&self, id: SppfId) -> u32 {
        match &self.nodes[id.index()] {
            SppfNode::Terminal { weight, .. } | SppfNode::Packed { weight, .. } => *weight,
            SppfNode::Intermediate { weight, .. } | SppfNode::Symbol { weight, .. } => {
                weight.unwrap_or(u32::MAX)
            }
        }
    }

    fn intern(&mut self, key: NodeKey<V, T>, node: SppfNode<V, T>) -> SppfId {
        let id = SppfId(self.nodes.len() as u32);
        self.nodes.push(node);
        self.interned.insert(key, id);
        id
    }

    /// Leaf for one matched (or recovered) input edge. A `None` terminal
    /// is an empty derivation over a single vertex.
    pub fn get_or_create_terminal(
        &mut self,
        terminal: Option<T>,
        left: V,
        right: V,
        weight: u32,
    ) -> SppfId {
        let key = NodeKey::Terminal {
            terminal: terminal.clone(),
            left,
            right,
            weight,
        };
        let id = match self.interned.get(&key) {
            Some(&id) => id,
            None => self.intern(
                key,
                SppfNode::Terminal {
                    terminal,
                    left,
                    right,
                    weight,
                    parents: HashSet::new(),
                },
            ),
        };
        self.terminals_by_left.entry(left).or_default().insert(id);
        id
    }

    /// Partial-derivation node for `state` over `[left, right]`. A hit
    /// lowers the stored weight if the given one is smaller.
    pub fn get_or_create_intermediate(
        &mut self,
        state: StateId,
        left: V,
        right: V,
        weight: Option<u32>,
    ) -> SppfId {
        let key = NodeKey::Intermediate { state, left, right };
        match self.interned.get(&key) {
            Some(&id) => {
                self.lower_weight(id, weight);
                id
            }
            None => self.intern(
                key,
                SppfNode::Intermediate {
                    state,
                    left,
                    right,
                    weight,
                    children: HashSet::new(),
                    parents: HashSet::new(),
                },
            ),
        }
    }

    /// Complete-derivation node for `nonterminal` over `[left, right]`.
    /// A hit lowers the stored weight if the given one is smaller.
    pub fn get_or_create_symbol(
        &mut self,
        nonterminal: NonterminalId,
        left: V,
        right: V,
        weight: Option<u32>,
    ) -> SppfId {
        let key = NodeKey::Symbol {
            nonterminal,
            left,
            right,
        };
        match self.interned.get(&key) {
            Some(&id) => {
                self.lower_weight(id, weight);
                id
            }
            None => self.intern(
                key,
                SppfNode::Symbol {
                    nonterminal,
                    left,
                    right,
                    weight,
                    children: HashSet::new(),
                    parents: HashSet::new(),
                },
            ),
        }
    }

    fn get_or_create_packed(
        &mut self,
        pivot: V,
        state: StateId,
        left: Option<SppfId>,
        right: Option<SppfId>,
        weight: u32,
    ) -> SppfId {
        let key = NodeKey::Packed {
            pivot,
            state,
            left,
            right,
        };
        match self.interned.get(&key) {
            Some(&id) => {
                if let SppfNode::Packed { weight: w, .. } = &mut self.nodes[id.index()] {
                    *w = (*w).min(weight);
                }
                id
            }
            None => self.intern(
                key,
                SppfNode::Packed {
                    pivot,
                    state,
                    left,
                    right,
                    weight,
                    parents: HashSet::new(),
                },
            ),
        }
    }

    fn lower_weight(&mut self, id: SppfId, weight: Option<u32>) {
        let Some(w) = weight else { return };
        if let SppfNode::Intermediate { weight: slot, .. }
        | SppfNode::Symbol { weight: slot, .. } = &mut self.nodes[id.index()]
        {
            *slot = Some(slot.map_or(w, |old| old.min(w)));
        }
    }

    /// Combine a left subforest (possibly absent) and a right subforest
    /// into their parent, attaching the pair as one packed alternative.
    ///
    /// The parent is a symbol node when `state` is final (the box just
    /// completed a nonterminal) and an intermediate node otherwise. When
    /// `left` is absent and the parent would coincide with `right`, the
    /// packed child is skipped so the forest cannot grow a
    /// parent → packed → parent loop of length zero.
    pub fn get_parent_node(
        &mut self,
        rsm: &Rsm<T>,
        state: StateId,
        left: Option<SppfId>,
        right: SppfId,
    ) -> SppfId {
        let pivot = self.left_extent(right);
        let left_ext = left.map_or(pivot, |l| self.left_extent(l));
        let right_ext = self.right_extent(right);
        let packed_weight = left
            .map_or(0, |l| self.weight(l))
            .saturating_add(self.weight(right));

        let rsm_state = rsm.state(state);
        let parent = if rsm_state.is_final() {
            self.get_or_create_symbol(
                rsm_state.nonterminal(),
                left_ext,
                right_ext,
                Some(packed_weight),
            )
        } else {
            self.get_or_create_intermediate(state, left_ext, right_ext, Some(packed_weight))
        };

        if left.is_some() || parent != right {
            let packed = self.get_or_create_packed(pivot, state, left, Some(right), packed_weight);
            if let Some(l) = left {
                self.parents_mut(l).insert(packed);
            }
            self.parents_mut(right).insert(packed);
            self.parents_mut(packed).insert(parent);
            if let SppfNode::Intermediate { children, .. }
            | SppfNode::Symbol { children, .. } = &mut self.nodes[parent.index()]
            {
                children.insert(packed);
            }
        }

        parent
    }

    fn parents_mut(&mut self, id: SppfId) -> &mut HashSet<SppfId> {
        match &mut self.nodes[id.index()] {
            SppfNode::Terminal { parents, .. }
            | SppfNode::Intermediate { parents, .. }
            | SppfNode::Symbol { parents, .. }
            | SppfNode::Packed { parents, .. } => parents,
        }
    }

    /// Unintern a packed node and drop its child references. Called when
    /// one of its children is about to go away; the stale alternative must
    /// not be findable (or reachable) afterwards.
    fn detach_packed(&mut self, id: SppfId) {
        if let SppfNode::Packed {
            pivot,
            state,
            left,
            right,
            ..
        } = &mut self.nodes[id.index()]
        {
            if left.is_some() || right.is_some() {
                let key = NodeKey::Packed {
                    pivot: *pivot,
                    state: *state,
                    left: *left,
                    right: *right,
                };
                *left = None;
                *right = None;
                self.interned.remove(&key);
            }
        }
    }

    /// Unintern a non-packed node and drop it from the terminal index.
    fn remove_node(&mut self, id: SppfId) {
        let key = match &self.nodes[id.index()] {
            SppfNode::Terminal {
                terminal,
                left,
                right,
                weight,
                ..
            } => {
                if let Some(at_left) = self.terminals_by_left.get_mut(left) {
                    at_left.remove(&id);
                    if at_left.is_empty() {
                        let left = *left;
                        self.terminals_by_left.remove(&left);
                    }
                }
                NodeKey::Terminal {
                    terminal: terminal.clone(),
                    left: *left,
                    right: *right,
                    weight: *weight,
                }
            }
            SppfNode::Intermediate {
                state, left, right, ..
            } => NodeKey::Intermediate {
                state: *state,
                left: *left,
                right: *right,
            },
            SppfNode::Symbol {
                nonterminal,
                left,
                right,
                ..
            } => NodeKey::Symbol {
                nonterminal: *nonterminal,
                left: *left,
                right: *right,
            },
            SppfNode::Packed { .. } => return,
        };
        self.interned.remove(&key);
    }

    /// Tear down every derivation that touches `vertex`, bottom-up.
    ///
    /// Starts from the terminal nodes whose left extent is `vertex` and
    /// walks parent links, unhooking packed alternatives and removing
    /// parent nodes whose last alternative disappeared. `keep` (usually
    /// the previous parse result) retains its parent links so a later
    /// reparse can still hang it back into a larger derivation.
    pub fn invalidate(&mut self, vertex: V, keep: Option<SppfId>) {
        let mut queue: VecDeque<SppfId> = VecDeque::new();
        let mut added: HashSet<SppfId> = HashSet::new();
        if let Some(seeds) = self.terminals_by_left.get(&vertex) {
            for &id in seeds {
                queue.push_back(id);
                added.insert(id);
            }
        }

        while let Some(id) = queue.pop_front() {
            match &self.nodes[id.index()] {
                SppfNode::Packed { parents, .. } => {
                    let parents: Vec<SppfId> = parents.iter().copied().collect();
                    for p in parents {
                        let removed = match &mut self.nodes[p.index()] {
                            SppfNode::Intermediate { children, .. }
                            | SppfNode::Symbol { children, .. } => children.remove(&id),
                            _ => false,
                        };
                        if removed && added.insert(p) {
                            queue.push_back(p);
                        }
                    }
                }
                SppfNode::Terminal { parents, .. } => {
                    let parents: Vec<SppfId> = parents.iter().copied().collect();
                    for &p in &parents {
                        if added.insert(p) {
                            queue.push_back(p);
                        }
                        self.detach_packed(p);
                    }
                    self.remove_node(id);
                }
                SppfNode::Intermediate {
                    children, parents, ..
                }
                | SppfNode::Symbol {
                    children, parents, ..
                } => {
                    if children.is_empty() {
                        let parents: Vec<SppfId> = parents.iter().copied().collect();
                        for &p in &parents {
                            if added.insert(p) {
                                queue.push_back(p);
                            }
                            self.detach_packed(p);
                        }
                        self.remove_node(id);
                    }
                }
            }

            if keep != Some(id) {
                self.parents_mut(id).clear();
            }
        }
    }

    /// Cheapest packed alternative below a parent node, excluding
    /// zero-length self references.
    pub(crate) fn cheapest_alternative(&self, parent: SppfId) -> Option<SppfId> {
        let children = match &self.nodes[parent.index()] {
            SppfNode::Intermediate { children, .. } | SppfNode::Symbol { children, .. } => {
                children
            }
            _ => return None,
        };
        children
            .iter()
            .copied()
            .filter(|&c| !self.packed_references(c, parent))
            .min_by_key(|&c| self.weight(c))
    }

    fn packed_references(&self, packed: SppfId, node: SppfId) -> bool {
        match &self.nodes[packed.index()] {
            SppfNode::Packed { left, right, .. } => {
                *left == Some(node) || *right == Some(node)
            }
            _ => false,
        }
    }

    /// Total weight of the cheapest derivation below `root`: the number
    /// of edits recovery spent on it, 0 for an exact match.
    ///
    /// Iterative depth-first walk; `cycle` keeps the walk out of
    /// derivations that recurse into themselves, and at every parent node
    /// only the cheapest alternative is descended into.
    #[must_use]
    pub fn min_distance(&self, root: SppfId) -> u32 {
        let mut cycle: HashSet<SppfId> = HashSet::new();
        let mut visited: HashSet<SppfId> = HashSet::new();
        let mut stack: Vec<SppfId> = vec![root];
        let mut distance: u32 = 0;

        while let Some(&cur) = stack.last() {
            visited.insert(cur);
            if cycle.insert(cur) {
                match &self.nodes[cur.index()] {
                    SppfNode::Terminal { weight, .. } => {
                        distance = distance.saturating_add(*weight);
                    }
                    SppfNode::Packed { left, right, .. } => {
                        if let Some(r) = *right {
                            stack.push(r);
                        }
                        if let Some(l) = *left {
                            stack.push(l);
                        }
                    }
                    SppfNode::Intermediate { children, .. }
                    | SppfNode::Symbol { children, .. } => {
                        let pick = children
                            .iter()
                            .copied()
                            .filter(|&c| {
                                !visited.contains(&c) && !self.packed_references(c, cur)
                            })
                            .min_by_key(|&c| self.weight(c));
                        if let Some(c) = pick {
                            stack.push(c);
                        }
                        let children: Vec<SppfId> = children.iter().copied().collect();
                        visited.extend(children);
                    }
                }
            }
            if stack.last() == Some(&cur) {
                stack.pop();
                cycle.remove(&cur);
            }
        }

        distance
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsm::builder::RsmBuilder;
    use crate::rsm::regex::Rule;

    // S -> a; returns the machine and the final state after 'a'.
    fn single_terminal_rsm() -> (Rsm<char>, StateId) {
        let mut builder = RsmBuilder::new();
        let s = builder.nonterminal("S");
        builder.rule(s, Rule::terminal('a'));
        let rsm = builder.build(s).unwrap();
        let fin = rsm.state(rsm.start_state()).terminal_edges()[&'a'][0];
        (rsm, fin)
    }

    #[test]
    fn terminal_nodes_are_hash_consed() {
        let mut sppf: Sppf<u32, char> = Sppf::new();
        let a = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        let b = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        assert_eq!(a, b);
        // A recovered copy of the same terminal is a different leaf.
        let c = sppf.get_or_create_terminal(Some('a'), 0, 1, 1);
        assert_ne!(a, c);
    }

    #[test]
    fn parent_node_attaches_one_packed_alternative() {
        let (rsm, fin) = single_terminal_rsm();
        let mut sppf: Sppf<u32, char> = Sppf::new();
        let t = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);

        let parent = sppf.get_parent_node(&rsm, fin, None, t);
        let again = sppf.get_parent_node(&rsm, fin, None, t);
        assert_eq!(parent, again);

        match sppf.node(parent) {
            SppfNode::Symbol {
                children, weight, ..
            } => {
                assert_eq!(children.len(), 1);
                assert_eq!(*weight, Some(0));
            }
            other => panic!("expected symbol node, got {other:?}"),
        }
        assert_eq!(sppf.left_extent(parent), 0);
        assert_eq!(sppf.right_extent(parent), 1);
    }

    #[test]
    fn zero_length_self_loop_is_not_packed() {
        let (rsm, fin) = single_terminal_rsm();
        let mut sppf: Sppf<u32, char> = Sppf::new();
        let t = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        let parent = sppf.get_parent_node(&rsm, fin, None, t);

        // Recombining the parent with itself as the only child would form
        // a parent -> packed -> parent loop; the guard drops it.
        let looped = sppf.get_parent_node(&rsm, fin, None, parent);
        assert_eq!(looped, parent);
        match sppf.node(parent) {
            SppfNode::Symbol { children, .. } => assert_eq!(children.len(), 1),
            other => panic!("expected symbol node, got {other:?}"),
        }
    }

    #[test]
    fn weights_only_decrease() {
        let mut sppf: Sppf<u32, char> = Sppf::new();
        let s = NonterminalId(0);
        let id = sppf.get_or_create_symbol(s, 0, 1, None);
        assert_eq!(sppf.weight(id), u32::MAX);
        sppf.get_or_create_symbol(s, 0, 1, Some(5));
        assert_eq!(sppf.weight(id), 5);
        sppf.get_or_create_symbol(s, 0, 1, Some(7));
        assert_eq!(sppf.weight(id), 5);
        sppf.get_or_create_symbol(s, 0, 1, Some(2));
        assert_eq!(sppf.weight(id), 2);
    }

    #[test]
    fn min_distance_sums_recovered_terminal_weights() {
        let (rsm, fin) = single_terminal_rsm();
        let mut sppf: Sppf<u32, char> = Sppf::new();

        let exact = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        let root = sppf.get_parent_node(&rsm, fin, None, exact);
        assert_eq!(sppf.min_distance(root), 0);

        let mut sppf: Sppf<u32, char> = Sppf::new();
        let recovered = sppf.get_or_create_terminal(Some('a'), 0, 1, 1);
        let root = sppf.get_parent_node(&rsm, fin, None, recovered);
        assert_eq!(sppf.min_distance(root), 1);
    }

    #[test]
    fn min_distance_prefers_the_cheap_alternative() {
        let (rsm, fin) = single_terminal_rsm();
        let mut sppf: Sppf<u32, char> = Sppf::new();

        let costly = sppf.get_or_create_terminal(Some('a'), 0, 1, 3);
        let root = sppf.get_parent_node(&rsm, fin, None, costly);
        let cheap = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        assert_eq!(sppf.get_parent_node(&rsm, fin, None, cheap), root);

        match sppf.node(root) {
            SppfNode::Symbol { children, .. } => assert_eq!(children.len(), 2),
            other => panic!("expected symbol node, got {other:?}"),
        }
        assert_eq!(sppf.min_distance(root), 0);
    }

    #[test]
    fn invalidate_tears_down_to_the_root() {
        let (rsm, fin) = single_terminal_rsm();
        let mut sppf: Sppf<u32, char> = Sppf::new();
        let t = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        let root = sppf.get_parent_node(&rsm, fin, None, t);
        let before = sppf.live_node_count();

        sppf.invalidate(0, None);
        assert!(sppf.live_node_count() < before);

        // The terminal and the root both left the intern tables.
        let t2 = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        assert_ne!(t, t2);
        let root2 = sppf.get_parent_node(&rsm, fin, None, t2);
        assert_ne!(root, root2);
    }

    #[test]
    fn invalidate_of_untouched_vertex_is_a_no_op() {
        let (rsm, fin) = single_terminal_rsm();
        let mut sppf: Sppf<u32, char> = Sppf::new();
        let t = sppf.get_or_create_terminal(Some('a'), 0, 1, 0);
        let root = sppf.get_parent_node(&rsm, fin, None, t);
        let before = sppf.live_node_count();

        sppf.invalidate(7, Some(root));
        assert_eq!(sppf.live_node_count(), before);
    }
}
