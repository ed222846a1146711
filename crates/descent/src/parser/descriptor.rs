//! Descriptors and the weight-ordered worklist.
//!
//! A descriptor is one unit of pending parse work: resume the automaton
//! in `state`, on stack frame `gss`, with forest `sppf` accumulated so
//! far, at input position `pos`. The worklist keeps zero-weight work on a
//! plain LIFO stack and recovery work in weight buckets drained in
//! ascending order, so no descriptor of weight `w` runs while cheaper
//! work is still pending.

use std::collections::{BTreeMap, VecDeque};

use hashbrown::{HashMap, HashSet};

use crate::gss::{GssId, HandledKey};
use crate::input::Vertex;
use crate::rsm::StateId;
use crate::sppf::SppfId;

/// One unit of pending parse work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Descriptor<V> {
    pub state: StateId,
    pub gss: GssId,
    pub sppf: Option<SppfId>,
    pub pos: V,
}

impl<V: Vertex> Descriptor<V> {
    /// Identity of this descriptor on its GSS frame.
    #[must_use]
    pub const fn handled_key(&self) -> HandledKey<V> {
        (self.state, self.sppf, self.pos)
    }
}

/// The worklist: default stack for weight-0 descriptors, ascending
/// weight buckets for recovery descriptors, and a registry of processed
/// descriptors by input vertex for incremental re-activation.
#[derive(Debug)]
pub struct DescriptorStack<V> {
    default_stack: Vec<Descriptor<V>>,
    buckets: BTreeMap<u32, VecDeque<Descriptor<V>>>,
    handled_by_vertex: HashMap<V, HashSet<Descriptor<V>>>,
}

impl<V: Vertex> DescriptorStack<V> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            default_stack: Vec::new(),
            buckets: BTreeMap::new(),
            handled_by_vertex: HashMap::new(),
        }
    }

    /// Queue a descriptor at the given weight.
    pub fn push(&mut self, descriptor: Descriptor<V>, weight: u32) {
        if weight == 0 {
            self.default_stack.push(descriptor);
        } else {
            self.buckets.entry(weight).or_default().push_back(descriptor);
        }
    }

    /// Whether zero-weight work remains.
    #[must_use]
    pub fn has_default(&self) -> bool {
        !self.default_stack.is_empty()
    }

    /// Next descriptor: zero-weight work first, then the lightest bucket.
    pub fn next(&mut self) -> Option<Descriptor<V>> {
        if let Some(descriptor) = self.default_stack.pop() {
            return Some(descriptor);
        }
        loop {
            let (&weight, bucket) = self.buckets.iter_mut().next()?;
            match bucket.pop_front() {
                Some(descriptor) => return Some(descriptor),
                None => {
                    self.buckets.remove(&weight);
                }
            }
        }
    }

    /// Record a processed descriptor under the vertex it ran at, so an
    /// edit there re-activates it.
    pub fn register_handled(&mut self, vertex: V, descriptor: Descriptor<V>) {
        self.handled_by_vertex
            .entry(vertex)
            .or_default()
            .insert(descriptor);
    }

    /// Remove and return the processed descriptors registered at `vertex`.
    pub fn take_handled_at(&mut self, vertex: V) -> Vec<Descriptor<V>> {
        self.handled_by_vertex
            .remove(&vertex)
            .map_or_else(Vec::new, |set| set.into_iter().collect())
    }
}

impl<V: Vertex> Default for DescriptorStack<V> {
    fn default() -> Self {
        Self::new()
    }
}
