//! Error types for grammar construction.
//!
//! Only *configuration* problems are errors: a grammar that references a
//! nonterminal without a rule, or an invalid start symbol, aborts
//! [`RsmBuilder::build`](crate::rsm::builder::RsmBuilder::build). Parse-time
//! outcomes — found, not found, found with recovery cost N — are values
//! returned by the driver, never errors.

use thiserror::Error;

/// A grammar could not be compiled into an automaton.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GrammarError {
    /// A rule body references a nonterminal that was declared but never
    /// given a rule of its own.
    #[error("nonterminal `{name}` is referenced but has no rule")]
    UnresolvedNonterminal { name: String },

    /// The designated start nonterminal has no rule.
    #[error("start nonterminal `{name}` has no rule")]
    InvalidStartSymbol { name: String },
}
