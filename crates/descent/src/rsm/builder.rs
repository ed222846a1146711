//! Grammar construction and compilation to automata.
//!
//! Declare nonterminals, attach one [`Rule`] body to each, then
//! [`RsmBuilder::build`] the whole grammar at once. Each body is turned
//! into its box by Brzozowski derivation: states are (memoized) rules, the
//! start state is the body itself, and a state is final iff its rule is
//! nullable.

use hashbrown::HashMap;

use crate::error::GrammarError;
use crate::rsm::regex::{Rule, Symbol};
use crate::rsm::{NonterminalId, NonterminalEntry, Rsm, RsmState, StateId, Terminal};

/// Accumulates a grammar one nonterminal at a time.
///
/// ```
/// use descent::rsm::builder::RsmBuilder;
/// use descent::rsm::regex::Rule;
///
/// let mut builder = RsmBuilder::new();
/// let s = builder.nonterminal("S");
/// builder.rule(s, Rule::alt([
///     Rule::concat([Rule::terminal('a'), Rule::nonterminal(s)]),
///     Rule::terminal('a'),
/// ]));
/// let rsm = builder.build(s).unwrap();
/// assert_eq!(rsm.nonterminal_name(rsm.start_nonterminal()), "S");
/// ```
#[derive(Debug, Default)]
pub struct RsmBuilder<T> {
    names: Vec<String>,
    rules: Vec<Option<Rule<T>>>,
}

impl<T: Terminal> RsmBuilder<T> {
    #[must_use]
    pub fn new() -> Self {
        Self {
            names: Vec::new(),
            rules: Vec::new(),
        }
    }

    /// Declare a nonterminal. The returned handle can be referenced from
    /// rule bodies before its own rule is attached, so mutually recursive
    /// grammars need no forward-declaration ceremony.
    pub fn nonterminal(&mut self, name: impl Into<String>) -> NonterminalId {
        let id = NonterminalId(self.names.len() as u32);
        self.names.push(name.into());
        self.rules.push(None);
        id
    }

    /// Attach (or replace) the rule body of a nonterminal.
    pub fn rule(&mut self, nt: NonterminalId, body: Rule<T>) {
        self.rules[nt.index()] = Some(body);
    }

    /// Compile every nonterminal's body into its box.
    ///
    /// Fails if the start nonterminal or any referenced nonterminal has no
    /// rule attached.
    pub fn build(self, start: NonterminalId) -> Result<Rsm<T>, GrammarError> {
        if self.rules[start.index()].is_none() {
            return Err(GrammarError::InvalidStartSymbol {
                name: self.names[start.index()].clone(),
            });
        }
        for (idx, rule) in self.rules.iter().enumerate() {
            let Some(rule) = rule else {
                return Err(GrammarError::UnresolvedNonterminal {
                    name: self.names[idx].clone(),
                });
            };
            let mut symbols = Vec::new();
            rule.alphabet(&mut symbols);
            for sym in symbols {
                if let Symbol::Nonterminal(nt) = sym {
                    if self.rules[nt.index()].is_none() {
                        return Err(GrammarError::UnresolvedNonterminal {
                            name: self.names[nt.index()].clone(),
                        });
                    }
                }
            }
        }

        let mut states: Vec<RsmState<T>> = Vec::new();
        let mut entries = Vec::with_capacity(self.names.len());
        for (idx, name) in self.names.iter().enumerate() {
            let nt = NonterminalId(idx as u32);
            let body = self.rules[idx].clone().unwrap_or(Rule::Empty);
            let start_state = compile_box(nt, &body, &mut states);
            tracing::debug!(
                nonterminal = %name,
                states = states.len() - start_state.index(),
                "compiled box"
            );
            entries.push(NonterminalEntry {
                name: name.clone(),
                start_state,
            });
        }

        Ok(Rsm {
            nonterminals: entries,
            states,
            start,
        })
    }
}

/// Derive one nonterminal's automaton into the shared state arena and
/// return its start state.
fn compile_box<T: Terminal>(
    nt: NonterminalId,
    body: &Rule<T>,
    states: &mut Vec<RsmState<T>>,
) -> StateId {
    let mut memo: HashMap<Rule<T>, StateId> = HashMap::new();
    let mut worklist: Vec<(Rule<T>, StateId)> = Vec::new();

    let start = StateId(states.len() as u32);
    states.push(RsmState::new(nt, true, body.nullable()));
    memo.insert(body.clone(), start);
    worklist.push((body.clone(), start));

    while let Some((rule, sid)) = worklist.pop() {
        let mut symbols = Vec::new();
        rule.alphabet(&mut symbols);
        for sym in symbols {
            let derived = rule.derive(&sym);
            if derived == Rule::Empty {
                continue;
            }
            let dest = match memo.get(&derived) {
                Some(&dest) => dest,
                None => {
                    let dest = StateId(states.len() as u32);
                    states.push(RsmState::new(nt, false, derived.nullable()));
                    memo.insert(derived.clone(), dest);
                    worklist.push((derived, dest));
                    dest
                }
            };
            match sym {
                Symbol::Terminal(t) => states[sid.index()].add_terminal_edge(t, dest),
                Symbol::Nonterminal(callee) => {
                    states[sid.index()].add_nonterminal_edge(callee, dest);
                }
            }
        }
    }

    start
}
