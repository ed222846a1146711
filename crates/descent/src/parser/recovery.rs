//! Recovery-edge synthesis.
//!
//! When a descriptor reaches a position where the automaton cannot make
//! progress on the real input, parsing can continue over synthetic edges
//! at unit cost: insert a terminal the state expects, skip the input
//! terminal, or read one terminal as another (a substitution, still one
//! edit). The driver queues the resulting descriptors at their
//! accumulated weight, so repaired parses surface only after every
//! cheaper alternative is exhausted.

use crate::input::{InputEdge, Vertex};
use crate::rsm::{RsmState, Terminal};

/// Whether the driver synthesizes recovery edges when stuck.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecoveryMode {
    On,
    Off,
}

/// One synthetic input edge. A `None` label skips the underlying real
/// edge without consuming anything grammar-visible.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct RecoveryEdge<V, T> {
    pub label: Option<T>,
    pub head: V,
    pub weight: u32,
}

/// Synthesize the recovery edges for one state at one input position.
///
/// At a dead end (no outgoing input edges) every terminal the state
/// expects can be inserted in place. Over real edges, each edge can be
/// skipped, and for every expected terminal that actually leads
/// somewhere new the edge's terminal can be read as it, or the expected
/// terminal can be inserted before the edge (leaving the real edge to
/// be consumed for free).
pub(crate) fn recovery_edges<V: Vertex, T: Terminal>(
    state: &RsmState<T>,
    input_edges: &[InputEdge<V, T>],
    pos: V,
) -> Vec<RecoveryEdge<V, T>> {
    let mut out: Vec<RecoveryEdge<V, T>> = Vec::new();
    let mut push = |edge: RecoveryEdge<V, T>| {
        let dup = out.iter().any(|e| e.label == edge.label && e.head == edge.head);
        if !dup {
            out.push(edge);
        }
    };

    if input_edges.is_empty() {
        for label in state.recovery_labels() {
            if !state.terminal_edges()[label].is_empty() {
                push(RecoveryEdge {
                    label: Some(label.clone()),
                    head: pos,
                    weight: 1,
                });
            }
        }
        return out;
    }

    for edge in input_edges {
        if let Some(current) = &edge.label {
            let current_targets = state.terminal_edges().get(current);
            for label in state.recovery_labels() {
                if label == current {
                    continue;
                }
                let targets = &state.terminal_edges()[label];
                let covered = current_targets
                    .map_or(false, |cur| targets.iter().all(|t| cur.contains(t)));
                if targets.is_empty() || covered {
                    continue;
                }
                // Insert the expected terminal before the mismatched
                // edge, or read the edge as that terminal outright.
                push(RecoveryEdge {
                    label: Some(label.clone()),
                    head: pos,
                    weight: 1,
                });
                push(RecoveryEdge {
                    label: Some(label.clone()),
                    head: edge.head,
                    weight: 1,
                });
            }
        }
        push(RecoveryEdge {
            label: None,
            head: edge.head,
            weight: 1,
        });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rsm::builder::RsmBuilder;
    use crate::rsm::regex::Rule;
    use crate::rsm::Rsm;

    fn two_terminal_rsm() -> Rsm<char> {
        // S -> a | b
        let mut builder = RsmBuilder::new();
        let s = builder.nonterminal("S");
        builder.rule(s, Rule::alt([Rule::terminal('a'), Rule::terminal('b')]));
        builder.build(s).unwrap()
    }

    #[test]
    fn dead_end_offers_insertions_in_place() {
        let rsm = two_terminal_rsm();
        let state = rsm.state(rsm.start_state());
        let edges = recovery_edges::<u32, char>(state, &[], 5);

        assert_eq!(edges.len(), 2);
        for edge in &edges {
            assert_eq!(edge.head, 5);
            assert_eq!(edge.weight, 1);
            assert!(edge.label.is_some());
        }
    }

    fn forked_rsm() -> Rsm<char> {
        // S -> a x | b y
        let mut builder = RsmBuilder::new();
        let s = builder.nonterminal("S");
        builder.rule(
            s,
            Rule::alt([
                Rule::concat([Rule::terminal('a'), Rule::terminal('x')]),
                Rule::concat([Rule::terminal('b'), Rule::terminal('y')]),
            ]),
        );
        builder.build(s).unwrap()
    }

    #[test]
    fn unknown_terminal_offers_every_expected_repair() {
        let rsm = two_terminal_rsm();
        let state = rsm.state(rsm.start_state());
        let input = [InputEdge {
            label: Some('x'),
            head: 1u32,
        }];
        let edges = recovery_edges(state, &input, 0);

        // Skip the 'x', or per expected terminal: read the 'x' as it, or
        // insert it before the 'x'.
        assert_eq!(edges.len(), 5);
        for label in ['a', 'b'] {
            assert!(edges.iter().any(|e| e.label == Some(label) && e.head == 0));
            assert!(edges.iter().any(|e| e.label == Some(label) && e.head == 1));
        }
        assert!(edges.iter().any(|e| e.label.is_none() && e.head == 1));
    }

    #[test]
    fn mismatch_offers_insertion_substitution_and_skip() {
        let rsm = forked_rsm();
        let state = rsm.state(rsm.start_state());
        let input = [InputEdge {
            label: Some('a'),
            head: 1u32,
        }];
        let edges = recovery_edges(state, &input, 0);

        // 'a' matches for real; 'b' leads to a different state, so it can
        // be inserted in place or read from the 'a' edge.
        assert_eq!(edges.len(), 3);
        assert!(edges.iter().any(|e| e.label == Some('b') && e.head == 0));
        assert!(edges.iter().any(|e| e.label == Some('b') && e.head == 1));
        assert!(edges.iter().any(|e| e.label.is_none() && e.head == 1));
        assert!(edges.iter().all(|e| e.label != Some('a')));
    }

    #[test]
    fn labels_covered_by_the_real_edge_are_suppressed() {
        // Both terminals derive to the same accepting state, so reading
        // the 'a' as 'b' buys nothing and only the skip remains.
        let rsm = two_terminal_rsm();
        let state = rsm.state(rsm.start_state());
        let input = [InputEdge {
            label: Some('a'),
            head: 1u32,
        }];
        let edges = recovery_edges(state, &input, 0);

        assert_eq!(edges.len(), 1);
        assert_eq!(edges[0].label, None);
        assert_eq!(edges[0].head, 1);
    }
}
