//! Graph-structured stack (GSS).
//!
//! Every pending nonterminal call is a node, interned by (callee, input
//! position) so all simultaneous parses that call the same nonterminal at
//! the same position share one frame. Edges are return addresses: the
//! automaton state to resume in and the forest node accumulated so far at
//! the call site. The same node also remembers which descriptors were
//! already processed through it, which is what descriptor deduplication
//! and incremental re-activation hang off.

use hashbrown::{HashMap, HashSet};

use crate::input::Vertex;
use crate::rsm::{NonterminalId, StateId};
use crate::sppf::SppfId;

/// Handle to a GSS node.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct GssId(pub(crate) u32);

impl GssId {
    /// Position of the node in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Identity of a descriptor as seen from the GSS node it runs on:
/// automaton state, forest node, input position.
pub type HandledKey<V> = (StateId, Option<SppfId>, V);

/// One call frame: a nonterminal being parsed from a given input vertex.
#[derive(Debug)]
pub struct GssNode<V> {
    nonterminal: NonterminalId,
    vertex: V,
    /// Cheapest recovery weight spent left of the call. Only ever
    /// decreases.
    min_weight: u32,
    /// Return addresses, each pointing at the caller frames to resume.
    edges: HashMap<(StateId, Option<SppfId>), HashSet<GssId>>,
    /// Descriptors already processed on this frame, with the least weight
    /// they were processed at.
    handled: HashMap<HandledKey<V>, u32>,
}

impl<V: Vertex> GssNode<V> {
    /// The nonterminal this frame is parsing.
    #[must_use]
    pub const fn nonterminal(&self) -> NonterminalId {
        self.nonterminal
    }

    /// The input position the call started at.
    #[must_use]
    pub const fn vertex(&self) -> V {
        self.vertex
    }

    /// Cheapest recovery weight left of this call.
    #[must_use]
    pub const fn min_weight(&self) -> u32 {
        self.min_weight
    }

    /// Return addresses grouped by (resume state, forest node at the
    /// call site).
    #[must_use]
    pub const fn edges(&self) -> &HashMap<(StateId, Option<SppfId>), HashSet<GssId>> {
        &self.edges
    }
}

/// The stack arena plus its intern table.
#[derive(Debug, Default)]
pub struct Gss<V> {
    nodes: Vec<GssNode<V>>,
    interned: HashMap<(NonterminalId, V), GssId>,
}

impl<V: Vertex> Gss<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            nodes: Vec::new(),
            interned: HashMap::new(),
        }
    }

    /// Look up a node by handle.
    #[must_use]
    pub fn node(&self, id: GssId) -> &GssNode<V> {
        &self.nodes[id.index()]
    }

    /// Intern a frame for (nonterminal, vertex). A hit lowers the stored
    /// weight if the given one is smaller.
    pub fn get_or_create(&mut self, nonterminal: NonterminalId, vertex: V, weight: u32) -> GssId {
        match self.interned.get(&(nonterminal, vertex)) {
            Some(&id) => {
                let node = &mut self.nodes[id.index()];
                node.min_weight = node.min_weight.min(weight);
                id
            }
            None => {
                let id = GssId(self.nodes.len() as u32);
                self.nodes.push(GssNode {
                    nonterminal,
                    vertex,
                    min_weight: weight,
                    edges: HashMap::new(),
                    handled: HashMap::new(),
                });
                self.interned.insert((nonterminal, vertex), id);
                id
            }
        }
    }

    /// Add a return edge from `from` to `to`. Returns whether the edge
    /// is new; a new edge on an already-popped frame means the pop must
    /// be replayed across it.
    pub fn add_edge(
        &mut self,
        from: GssId,
        state: StateId,
        sppf: Option<SppfId>,
        to: GssId,
    ) -> bool {
        self.nodes[from.index()]
            .edges
            .entry((state, sppf))
            .or_default()
            .insert(to)
    }

    /// Record that a descriptor was processed on this frame at `weight`
    /// (keeping the least weight seen).
    pub fn mark_handled(&mut self, id: GssId, key: HandledKey<V>, weight: u32) {
        let handled = &mut self.nodes[id.index()].handled;
        match handled.get_mut(&key) {
            Some(stored) => *stored = (*stored).min(weight),
            None => {
                handled.insert(key, weight);
            }
        }
    }

    /// Whether an equal-or-cheaper descriptor was already processed on
    /// this frame. A strictly cheaper newcomer is not considered handled.
    #[must_use]
    pub fn is_handled(&self, id: GssId, key: &HandledKey<V>, weight: u32) -> bool {
        self.nodes[id.index()]
            .handled
            .get(key)
            .is_some_and(|&stored| stored <= weight)
    }

    /// Forget that a descriptor was processed, so it can run again after
    /// the input changed under it.
    pub fn unmark_handled(&mut self, id: GssId, key: &HandledKey<V>) {
        self.nodes[id.index()].handled.remove(key);
    }
}
