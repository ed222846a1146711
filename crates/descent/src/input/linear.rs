//! The common case: a token sequence as a single-path graph.
//!
//! [`LinearGraph`] keeps its edges in a mutable adjacency map so a caller
//! can splice edges in and out between parses; together with
//! [`Gll::reparse`](crate::parser::Gll::reparse) that is the incremental
//! editing story. Vertices are plain `u32` positions; a vertex with no
//! outgoing edges is final.

use hashbrown::{HashMap, HashSet};

use crate::input::{InputEdge, InputGraph};
use crate::rsm::Terminal;

/// A mutable edge-labeled graph over `u32` vertices.
///
/// Despite the name this type is not restricted to chains; `add_edge`
/// accepts arbitrary tails and heads. The name reflects its main use,
/// [`LinearGraph::from_tokens`].
#[derive(Debug, Clone, Default)]
pub struct LinearGraph<T> {
    edges: HashMap<u32, Vec<InputEdge<u32, T>>>,
    start: HashSet<u32>,
    vertices: HashSet<u32>,
}

impl<T: Terminal> LinearGraph<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            edges: HashMap::new(),
            start: HashSet::new(),
            vertices: HashSet::new(),
        }
    }

    /// Chain the tokens into a path `0 -> 1 -> ... -> n`, with `0` the
    /// start vertex and `n` final.
    pub fn from_tokens(tokens: impl IntoIterator<Item = T>) -> Self {
        let mut graph = Self::new();
        graph.add_start_vertex(0);
        let mut pos = 0;
        for token in tokens {
            graph.add_edge(pos, Some(token), pos + 1);
            pos += 1;
        }
        graph
    }

    pub fn add_vertex(&mut self, v: u32) {
        self.vertices.insert(v);
    }

    pub fn add_start_vertex(&mut self, v: u32) {
        self.vertices.insert(v);
        self.start.insert(v);
    }

    /// Insert an edge, creating either endpoint as needed. A `None` label
    /// is an epsilon edge.
    pub fn add_edge(&mut self, tail: u32, label: Option<T>, head: u32) {
        self.add_vertex(tail);
        self.add_vertex(head);
        let edge = InputEdge { label, head };
        let out = self.edges.entry(tail).or_default();
        if !out.contains(&edge) {
            out.push(edge);
        }
    }

    /// Remove a matching edge if present.
    pub fn remove_edge(&mut self, tail: u32, label: Option<T>, head: u32) {
        if let Some(out) = self.edges.get_mut(&tail) {
            out.retain(|e| !(e.head == head && e.label == label));
            if out.is_empty() {
                self.edges.remove(&tail);
            }
        }
    }

    /// Remove a vertex together with all edges touching it.
    pub fn remove_vertex(&mut self, v: u32) {
        self.vertices.remove(&v);
        self.start.remove(&v);
        self.edges.remove(&v);
        for out in self.edges.values_mut() {
            out.retain(|e| e.head != v);
        }
        self.edges.retain(|_, out| !out.is_empty());
    }
}

impl<T: Terminal> InputGraph for LinearGraph<T> {
    type Vertex = u32;
    type Token = T;

    fn start_vertices(&self) -> Vec<u32> {
        self.start.iter().copied().collect()
    }

    fn is_start(&self, v: u32) -> bool {
        self.start.contains(&v)
    }

    fn is_final(&self, v: u32) -> bool {
        self.edges.get(&v).map_or(true, Vec::is_empty)
    }

    fn edges(&self, v: u32) -> &[InputEdge<u32, T>] {
        self.edges.get(&v).map_or(&[], Vec::as_slice)
    }
}
