//! Recursive state machines: per-nonterminal finite automata ("boxes").
//!
//! A grammar compiles into one automaton per nonterminal. States carry
//! outgoing edges partitioned into terminal edges and nonterminal edges;
//! a nonterminal edge is a *call* into the referenced nonterminal's box,
//! resumed at the edge's destination state when the callee completes.
//! Every state belongs to exactly one box, and the whole machine is
//! immutable once [`builder::RsmBuilder::build`] returns: the driver only
//! ever reads it.
//!
//! States live in an arena owned by [`Rsm`] and are addressed by
//! [`StateId`] handles; boxes never share states.

pub mod builder;
pub mod regex;

use std::fmt;
use std::hash::Hash;

use hashbrown::HashMap;
use smallvec::SmallVec;

/// Marker for terminal symbol types usable as grammar tokens and input
/// edge labels.
pub trait Terminal: Clone + Eq + Hash + fmt::Debug {}

impl<T> Terminal for T where T: Clone + Eq + Hash + fmt::Debug {}

/// Handle to a nonterminal in an [`Rsm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NonterminalId(pub(crate) u32);

impl NonterminalId {
    /// Position of the nonterminal in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Handle to an automaton state in an [`Rsm`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateId(pub(crate) u32);

impl StateId {
    /// Position of the state in the arena.
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Destination states of one labeled edge. Almost always one or two.
pub type StateSet = SmallVec<[StateId; 2]>;

/// One automaton state of a nonterminal's box.
#[derive(Debug)]
pub struct RsmState<T> {
    nonterminal: NonterminalId,
    is_start: bool,
    is_final: bool,
    terminal_edges: HashMap<T, StateSet>,
    nonterminal_edges: HashMap<NonterminalId, StateSet>,
    recovery_labels: Vec<T>,
}

impl<T: Terminal> RsmState<T> {
    fn new(nonterminal: NonterminalId, is_start: bool, is_final: bool) -> Self {
        Self {
            nonterminal,
            is_start,
            is_final,
            terminal_edges: HashMap::new(),
            nonterminal_edges: HashMap::new(),
            recovery_labels: Vec::new(),
        }
    }

    /// The box this state belongs to.
    #[must_use]
    pub const fn nonterminal(&self) -> NonterminalId {
        self.nonterminal
    }

    /// Whether this is the box's start state.
    #[must_use]
    pub const fn is_start(&self) -> bool {
        self.is_start
    }

    /// Whether the box accepts here.
    #[must_use]
    pub const fn is_final(&self) -> bool {
        self.is_final
    }

    /// Outgoing terminal edges: terminal → destination states.
    #[must_use]
    pub const fn terminal_edges(&self) -> &HashMap<T, StateSet> {
        &self.terminal_edges
    }

    /// Outgoing nonterminal ("call") edges: callee → destination states
    /// resumed after the call returns.
    #[must_use]
    pub const fn nonterminal_edges(&self) -> &HashMap<NonterminalId, StateSet> {
        &self.nonterminal_edges
    }

    /// Terminals this state could legally consume, in edge insertion
    /// order. Drives recovery-edge synthesis.
    #[must_use]
    pub fn recovery_labels(&self) -> &[T] {
        &self.recovery_labels
    }

    fn add_terminal_edge(&mut self, terminal: T, dest: StateId) {
        let targets = self
            .terminal_edges
            .entry(terminal.clone())
            .or_insert_with(|| {
                self.recovery_labels.push(terminal);
                StateSet::new()
            });
        if !targets.contains(&dest) {
            targets.push(dest);
        }
    }

    fn add_nonterminal_edge(&mut self, callee: NonterminalId, dest: StateId) {
        let targets = self.nonterminal_edges.entry(callee).or_default();
        if !targets.contains(&dest) {
            targets.push(dest);
        }
    }
}

#[derive(Debug)]
struct NonterminalEntry {
    name: String,
    start_state: StateId,
}

/// A compiled recursive state machine: the state arena, the nonterminal
/// table, and the designated start nonterminal.
#[derive(Debug)]
pub struct Rsm<T> {
    nonterminals: Vec<NonterminalEntry>,
    states: Vec<RsmState<T>>,
    start: NonterminalId,
}

impl<T: Terminal> Rsm<T> {
    /// The grammar's start nonterminal.
    #[must_use]
    pub const fn start_nonterminal(&self) -> NonterminalId {
        self.start
    }

    /// The start state of the start nonterminal's box.
    #[must_use]
    pub fn start_state(&self) -> StateId {
        self.box_start(self.start)
    }

    /// The start state of a nonterminal's box.
    #[must_use]
    pub fn box_start(&self, nt: NonterminalId) -> StateId {
        self.nonterminals[nt.index()].start_state
    }

    /// Display name of a nonterminal.
    #[must_use]
    pub fn nonterminal_name(&self, nt: NonterminalId) -> &str {
        &self.nonterminals[nt.index()].name
    }

    /// Look up a state by handle.
    #[must_use]
    pub fn state(&self, id: StateId) -> &RsmState<T> {
        &self.states[id.index()]
    }

    /// Number of states across all boxes.
    #[must_use]
    pub fn state_count(&self) -> usize {
        self.states.len()
    }

    /// All states of a nonterminal's box, reachable from its start state.
    ///
    /// Breadth-first over both edge kinds' destinations; since boxes never
    /// share states, the result is exactly the box. Sufficient, together
    /// with the edge accessors on [`RsmState`], for external serialization
    /// or visualization.
    #[must_use]
    pub fn reachable_states(&self, nt: NonterminalId) -> Vec<StateId> {
        let mut seen = hashbrown::HashSet::new();
        let mut queue = std::collections::VecDeque::new();
        let mut out = Vec::new();
        let start = self.box_start(nt);
        queue.push_back(start);
        seen.insert(start);
        while let Some(id) = queue.pop_front() {
            out.push(id);
            let state = self.state(id);
            let dests = state
                .terminal_edges
                .values()
                .chain(state.nonterminal_edges.values())
                .flatten();
            for &dest in dests {
                if seen.insert(dest) {
                    queue.push_back(dest);
                }
            }
        }
        out
    }
}
