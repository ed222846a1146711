//! The GLL driver.
//!
//! Parsing is a worklist fixpoint over descriptors. Each descriptor
//! resumes an automaton state at an input position on a GSS frame;
//! processing it expands input edges, calls into nonterminal boxes, pops
//! completed frames and, with recovery on, queues repaired continuations
//! at their edit cost. Forest and stack interning make re-derived work
//! collapse onto existing nodes, and the handled registry on GSS frames
//! keeps each descriptor from running twice at the same or higher weight.
//!
//! The driver stays alive after [`Gll::parse`]: edit the input through
//! [`Gll::input_mut`], then [`Gll::reparse`] only the work that depended
//! on the changed vertex.

pub mod descriptor;
pub mod recovery;

pub use descriptor::{Descriptor, DescriptorStack};
pub use recovery::RecoveryMode;

use hashbrown::{HashMap, HashSet};

use crate::gss::{Gss, GssId};
use crate::input::{InputEdge, InputGraph};
use crate::parser::recovery::recovery_edges;
use crate::rsm::{NonterminalId, Rsm, StateId};
use crate::sppf::{Sppf, SppfId, SppfNode};

/// Outcome of a parse: the root of the cheapest accepted derivation (if
/// any) and, per (start, final) vertex pair reached, the least recovery
/// weight spent reaching it (0 for an exact match).
#[derive(Debug, Clone)]
pub struct ParseResult<V> {
    pub root: Option<SppfId>,
    pub reachable: HashMap<(V, V), u32>,
}

/// The parsing session: grammar, input, and all state shared across
/// parse and reparse runs.
pub struct Gll<'g, G: InputGraph> {
    rsm: &'g Rsm<G::Token>,
    input: G,
    recovery: RecoveryMode,
    sppf: Sppf<G::Vertex, G::Token>,
    gss: Gss<G::Vertex>,
    stack: DescriptorStack<G::Vertex>,
    /// Forest nodes each frame has been popped with; replayed when a new
    /// return edge arrives after the pop.
    popped: HashMap<GssId, HashSet<SppfId>>,
    parse_result: Option<SppfId>,
    reachable: HashMap<(G::Vertex, G::Vertex), u32>,
}

impl<'g, G: InputGraph> Gll<'g, G> {
    #[must_use]
    pub fn new(rsm: &'g Rsm<G::Token>, input: G, recovery: RecoveryMode) -> Self {
        Self {
            rsm,
            input,
            recovery,
            sppf: Sppf::new(),
            gss: Gss::new(),
            stack: DescriptorStack::new(),
            popped: HashMap::new(),
            parse_result: None,
            reachable: HashMap::new(),
        }
    }

    /// The input graph.
    #[must_use]
    pub fn input(&self) -> &G {
        &self.input
    }

    /// Mutable access to the input graph, for edits between [`Gll::parse`]
    /// and [`Gll::reparse`].
    pub fn input_mut(&mut self) -> &mut G {
        &mut self.input
    }

    /// The forest built so far.
    #[must_use]
    pub fn sppf(&self) -> &Sppf<G::Vertex, G::Token> {
        &self.sppf
    }

    /// Run the parse from the input's start vertices.
    pub fn parse(&mut self) -> ParseResult<G::Vertex> {
        let rsm = self.rsm;
        for vertex in self.input.start_vertices() {
            let frame = self.gss.get_or_create(rsm.start_nonterminal(), vertex, 0);
            self.add_descriptor(Descriptor {
                state: rsm.start_state(),
                gss: frame,
                sppf: None,
                pos: vertex,
            });
        }
        tracing::debug!(states = rsm.state_count(), "parse started");
        self.run();
        self.result()
    }

    /// Re-run only the work that depended on `changed` after an input
    /// edit at that vertex.
    ///
    /// Descriptors processed at or across `changed` are re-activated, the
    /// forest below it is invalidated, and the fixpoint resumes; work
    /// whose derivations never touched the vertex is reused as is.
    pub fn reparse(&mut self, changed: G::Vertex) -> ParseResult<G::Vertex> {
        tracing::debug!(?changed, "reparse after edit");
        for d in self.stack.take_handled_at(changed) {
            self.gss.unmark_handled(d.gss, &d.handled_key());
            let weight = self.descriptor_weight(&d);
            self.stack.push(d, weight);
        }
        self.sppf.invalidate(changed, self.parse_result);
        self.parse_result = None;
        self.run();
        self.result()
    }

    /// Drain zero-weight work, then (recovery on) ascending-weight work
    /// until the first accepted derivation.
    fn run(&mut self) {
        while self.stack.has_default() {
            let Some(d) = self.stack.next() else { break };
            self.process(d);
        }
        if self.recovery == RecoveryMode::On {
            while self.parse_result.is_none() {
                let Some(d) = self.stack.next() else { break };
                self.process(d);
            }
        }
    }

    fn result(&self) -> ParseResult<G::Vertex> {
        ParseResult {
            root: self.parse_result,
            reachable: self.reachable.clone(),
        }
    }

    /// Weight a descriptor runs at: recovery cost accumulated in its
    /// forest plus the cheapest cost left of its frame.
    fn descriptor_weight(&self, d: &Descriptor<G::Vertex>) -> u32 {
        d.sppf
            .map_or(0, |s| self.sppf.weight(s))
            .saturating_add(self.gss.node(d.gss).min_weight())
    }

    fn process(&mut self, d: Descriptor<G::Vertex>) {
        let rsm = self.rsm;
        let pos = d.pos;
        let st = rsm.state(d.state);

        let weight = self.descriptor_weight(&d);
        self.gss.mark_handled(d.gss, d.handled_key(), weight);
        self.stack.register_handled(pos, d);

        // A box that is start and final accepts epsilon here.
        let mut cur = d.sppf;
        if st.is_start() && st.is_final() {
            let eps = self
                .sppf
                .get_or_create_intermediate(d.state, pos, pos, Some(0));
            cur = Some(self.sppf.get_parent_node(rsm, d.state, d.sppf, eps));
        }

        if let Some(node) = cur {
            self.check_acceptance(node);
        }

        let input_edges: Vec<InputEdge<G::Vertex, G::Token>> = self.input.edges(pos).to_vec();
        for edge in &input_edges {
            match &edge.label {
                None => {
                    let leaf = self.sppf.get_or_create_terminal(None, pos, edge.head, 0);
                    let node = self.sppf.get_parent_node(rsm, d.state, cur, leaf);
                    self.add_descriptor(Descriptor {
                        state: d.state,
                        gss: d.gss,
                        sppf: Some(node),
                        pos: edge.head,
                    });
                }
                Some(t) => {
                    if let Some(targets) = st.terminal_edges().get(t) {
                        for &target in targets {
                            let leaf =
                                self.sppf
                                    .get_or_create_terminal(Some(t.clone()), pos, edge.head, 0);
                            let node = self.sppf.get_parent_node(rsm, target, cur, leaf);
                            self.add_descriptor(Descriptor {
                                state: target,
                                gss: d.gss,
                                sppf: Some(node),
                                pos: edge.head,
                            });
                        }
                    }
                }
            }
        }

        for (&callee, targets) in st.nonterminal_edges() {
            for &target in targets {
                let frame = self.create_gss_node(callee, target, d.gss, cur, pos);
                self.add_descriptor(Descriptor {
                    state: rsm.box_start(callee),
                    gss: frame,
                    sppf: None,
                    pos,
                });
            }
        }

        if self.recovery == RecoveryMode::On {
            // Recovery continues from the descriptor's own forest node,
            // not the epsilon-extended one.
            for redge in recovery_edges(st, &input_edges, pos) {
                match &redge.label {
                    None => {
                        self.handle_recovery_edge(&d, None, redge.head, redge.weight, d.state);
                    }
                    Some(t) => {
                        if let Some(targets) = st.terminal_edges().get(t) {
                            for &target in targets {
                                self.handle_recovery_edge(
                                    &d,
                                    Some(t.clone()),
                                    redge.head,
                                    redge.weight,
                                    target,
                                );
                            }
                        }
                    }
                }
            }
        }

        if st.is_final() {
            self.pop(d.gss, cur, pos);
        }
    }

    /// Consume one (possibly synthetic) terminal edge and queue the
    /// continuation in `target`.
    fn handle_recovery_edge(
        &mut self,
        d: &Descriptor<G::Vertex>,
        label: Option<G::Token>,
        head: G::Vertex,
        weight: u32,
        target: StateId,
    ) {
        let leaf = self.sppf.get_or_create_terminal(label, d.pos, head, weight);
        let node = self.sppf.get_parent_node(self.rsm, target, d.sppf, leaf);
        self.add_descriptor(Descriptor {
            state: target,
            gss: d.gss,
            sppf: Some(node),
            pos: head,
        });
    }

    /// If `node` is a complete start-nonterminal derivation over a
    /// start-to-final input range, record it as the parse result (when
    /// cheapest so far) and update the reachability map.
    fn check_acceptance(&mut self, node: SppfId) {
        let (nt, left, right) = match self.sppf.node(node) {
            SppfNode::Symbol {
                nonterminal,
                left,
                right,
                ..
            } => (*nonterminal, *left, *right),
            _ => return,
        };
        if nt != self.rsm.start_nonterminal()
            || !self.input.is_start(left)
            || !self.input.is_final(right)
        {
            return;
        }

        let better = self
            .parse_result
            .map_or(true, |r| self.sppf.weight(r) > self.sppf.weight(node));
        if better {
            tracing::debug!(weight = self.sppf.weight(node), "accepted derivation");
            self.parse_result = Some(node);
        }

        let distance = self.sppf.min_distance(node);
        let entry = self.reachable.entry((left, right)).or_insert(distance);
        *entry = (*entry).min(distance);
    }

    fn add_descriptor(&mut self, d: Descriptor<G::Vertex>) {
        // After an invalidation the old acceptance must be allowed to run
        // again even though the previous parse already handled it.
        if self.parse_result.is_none() {
            if let Some(node) = d.sppf {
                if let SppfNode::Symbol {
                    nonterminal,
                    left,
                    right,
                    ..
                } = self.sppf.node(node)
                {
                    if *nonterminal == self.rsm.start_nonterminal()
                        && self.input.is_start(*left)
                        && self.input.is_final(*right)
                    {
                        self.gss.unmark_handled(d.gss, &d.handled_key());
                    }
                }
            }
        }

        let weight = self.descriptor_weight(&d);
        if self.gss.is_handled(d.gss, &d.handled_key(), weight) {
            return;
        }
        self.stack.push(d, weight);
    }

    /// Intern the callee frame for a nonterminal call and wire the return
    /// edge. A new edge on an already-popped frame replays every recorded
    /// pop across it.
    fn create_gss_node(
        &mut self,
        callee: NonterminalId,
        target: StateId,
        caller: GssId,
        sppf: Option<SppfId>,
        pos: G::Vertex,
    ) -> GssId {
        let rsm = self.rsm;
        let weight = self
            .gss
            .node(caller)
            .min_weight()
            .saturating_add(sppf.map_or(0, |s| self.sppf.weight(s)));
        let frame = self.gss.get_or_create(callee, pos, weight);

        if self.gss.add_edge(frame, target, sppf, caller) {
            if let Some(set) = self.popped.get(&frame) {
                let popped: Vec<SppfId> = set.iter().copied().collect();
                for p in popped {
                    let node = self.sppf.get_parent_node(rsm, target, sppf, p);
                    let pos = self.sppf.right_extent(p);
                    self.add_descriptor(Descriptor {
                        state: target,
                        gss: caller,
                        sppf: Some(node),
                        pos,
                    });
                }
            }
        }

        frame
    }

    /// A box completed: resume every caller recorded on the frame.
    fn pop(&mut self, frame: GssId, sppf: Option<SppfId>, pos: G::Vertex) {
        let Some(sppf) = sppf else { return };
        let rsm = self.rsm;
        self.popped.entry(frame).or_default().insert(sppf);

        let edges: Vec<((StateId, Option<SppfId>), Vec<GssId>)> = self
            .gss
            .node(frame)
            .edges()
            .iter()
            .map(|(&key, targets)| (key, targets.iter().copied().collect()))
            .collect();
        for ((state, left), targets) in edges {
            for caller in targets {
                let node = self.sppf.get_parent_node(rsm, state, left, sppf);
                self.add_descriptor(Descriptor {
                    state,
                    gss: caller,
                    sppf: Some(node),
                    pos,
                });
            }
        }
    }
}
