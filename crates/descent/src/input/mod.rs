//! Input abstraction: parsing runs over a directed, edge-labeled graph.
//!
//! Plain strings are the one-path special case ([`linear::LinearGraph`]);
//! the driver itself only ever sees the [`InputGraph`] trait, so reachability
//! queries over arbitrary graphs and ordinary parsing share one code path.
//! Vertices are caller-chosen lightweight handles, not owned structures.

pub mod linear;

use std::fmt;
use std::hash::Hash;

use crate::rsm::Terminal;

/// Marker for input vertex handles.
pub trait Vertex: Copy + Eq + Hash + fmt::Debug {}

impl<V> Vertex for V where V: Copy + Eq + Hash + fmt::Debug {}

/// One outgoing edge of an input vertex. A `None` label is an epsilon
/// edge: traversable without consuming a terminal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputEdge<V, T> {
    pub label: Option<T>,
    pub head: V,
}

/// A directed, edge-labeled input graph.
///
/// Implementations decide which vertices are start and final; a parse
/// succeeds when some start-to-final path spells a word of the grammar.
pub trait InputGraph {
    type Vertex: Vertex;
    type Token: Terminal;

    /// Vertices parsing starts from.
    fn start_vertices(&self) -> Vec<Self::Vertex>;

    /// Whether `v` is a start vertex.
    fn is_start(&self, v: Self::Vertex) -> bool;

    /// Whether a parse may end at `v`.
    fn is_final(&self, v: Self::Vertex) -> bool;

    /// Outgoing edges of `v`. Empty for unknown vertices.
    fn edges(&self, v: Self::Vertex) -> &[InputEdge<Self::Vertex, Self::Token>];
}
