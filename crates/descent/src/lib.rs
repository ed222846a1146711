//! Generalized LL (GLL) parsing over graph-structured inputs.
//!
//! `descent` parses any context-free grammar, ambiguity and left
//! recursion included, against a string or an arbitrary edge-labeled
//! graph. Grammars are written as regular-expression rule bodies and
//! compiled into recursive state machines; every derivation of every
//! recognized substring lands in one shared packed parse forest. With
//! recovery enabled the engine repairs unparseable input at minimal edit
//! cost, and after an input edit [`Gll::reparse`] redoes only the work
//! that depended on the changed vertex.
//!
//! ```
//! use descent::{Gll, LinearGraph, RecoveryMode, Rule, RsmBuilder};
//!
//! // S -> a S | a
//! let mut grammar = RsmBuilder::new();
//! let s = grammar.nonterminal("S");
//! grammar.rule(
//!     s,
//!     Rule::alt([
//!         Rule::concat([Rule::terminal('a'), Rule::nonterminal(s)]),
//!         Rule::terminal('a'),
//!     ]),
//! );
//! let rsm = grammar.build(s).expect("well-formed grammar");
//!
//! let input = LinearGraph::from_tokens("aaa".chars());
//! let mut parser = Gll::new(&rsm, input, RecoveryMode::Off);
//! let result = parser.parse();
//! assert!(result.root.is_some());
//! ```

pub mod error;
pub mod gss;
pub mod input;
pub mod parser;
pub mod rsm;
pub mod sppf;

pub use error::GrammarError;
pub use gss::{Gss, GssId, GssNode};
pub use input::linear::LinearGraph;
pub use input::{InputEdge, InputGraph, Vertex};
pub use parser::{Descriptor, DescriptorStack, Gll, ParseResult, RecoveryMode};
pub use rsm::builder::RsmBuilder;
pub use rsm::regex::Rule;
pub use rsm::{NonterminalId, Rsm, RsmState, StateId, Terminal};
pub use sppf::{OrderedLeaves, Sppf, SppfId, SppfNode};
