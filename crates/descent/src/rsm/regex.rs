//! Regular-expression rule descriptions and their symbolic derivatives.
//!
//! A nonterminal's body is a [`Rule`]: a regular expression over terminals
//! and nonterminal references. The builder compiles each body into a finite
//! automaton by Brzozowski derivation — the derivative of a rule with
//! respect to a symbol is again a rule, and structurally equal rules are
//! shared, so the derivation worklist terminates without state explosion.
//!
//! The smart constructors ([`Rule::concat`], [`Rule::alt`], [`Rule::star`])
//! normalize as they build: concatenations are flattened and stripped of
//! epsilon, alternations are flattened and deduplicated, and the empty
//! language annihilates. Normalization is what makes the derivative memo
//! table effective.

use crate::rsm::{NonterminalId, Terminal};

/// A regular-expression description of a nonterminal body.
///
/// Build values with the smart constructors rather than the raw variants;
/// the constructors keep the representation canonical enough for derivative
/// memoization to share states.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Rule<T> {
    /// The empty language (matches nothing).
    Empty,
    /// The empty string.
    Epsilon,
    /// A single terminal.
    Terminal(T),
    /// A call into another nonterminal's box.
    Ref(NonterminalId),
    /// Sequence. Invariant (maintained by [`Rule::concat`]): at least two
    /// parts, none of them `Epsilon`, `Empty` or nested `Concat`.
    Concat(Vec<Rule<T>>),
    /// Choice. Invariant (maintained by [`Rule::alt`]): at least two parts,
    /// none of them `Empty` or nested `Alt`, no structural duplicates.
    Alt(Vec<Rule<T>>),
    /// Kleene star.
    Star(Box<Rule<T>>),
}

/// An edge label of the automaton under construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub(crate) enum Symbol<T> {
    Terminal(T),
    Nonterminal(NonterminalId),
}

impl<T: Terminal> Rule<T> {
    /// A single terminal.
    pub fn terminal(t: T) -> Self {
        Rule::Terminal(t)
    }

    /// A reference to (a call into) another nonterminal.
    #[must_use]
    pub fn nonterminal(nt: NonterminalId) -> Self {
        Rule::Ref(nt)
    }

    /// Sequence of parts, in order.
    pub fn concat(parts: impl IntoIterator<Item = Rule<T>>) -> Self {
        let mut flat = Vec::new();
        for part in parts {
            match part {
                Rule::Epsilon => {}
                Rule::Empty => return Rule::Empty,
                Rule::Concat(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        match flat.len() {
            0 => Rule::Epsilon,
            1 => flat.pop().unwrap_or(Rule::Epsilon),
            _ => Rule::Concat(flat),
        }
    }

    /// Choice between alternatives.
    pub fn alt(parts: impl IntoIterator<Item = Rule<T>>) -> Self {
        let mut flat: Vec<Rule<T>> = Vec::new();
        for part in parts {
            match part {
                Rule::Empty => {}
                Rule::Alt(inner) => {
                    for p in inner {
                        if !flat.contains(&p) {
                            flat.push(p);
                        }
                    }
                }
                other => {
                    if !flat.contains(&other) {
                        flat.push(other);
                    }
                }
            }
        }
        match flat.len() {
            0 => Rule::Empty,
            1 => flat.pop().unwrap_or(Rule::Empty),
            _ => Rule::Alt(flat),
        }
    }

    /// Zero or more repetitions.
    #[must_use]
    pub fn star(inner: Rule<T>) -> Self {
        match inner {
            Rule::Empty | Rule::Epsilon => Rule::Epsilon,
            star @ Rule::Star(_) => star,
            other => Rule::Star(Box::new(other)),
        }
    }

    /// One or more repetitions.
    #[must_use]
    pub fn plus(inner: Rule<T>) -> Self {
        Rule::concat([inner.clone(), Rule::star(inner)])
    }

    /// Zero or one occurrence.
    #[must_use]
    pub fn opt(inner: Rule<T>) -> Self {
        Rule::alt([inner, Rule::Epsilon])
    }

    /// Whether the rule accepts the empty string. A derivation state is
    /// final iff the rule it was reached with is nullable.
    pub(crate) fn nullable(&self) -> bool {
        match self {
            Rule::Empty | Rule::Terminal(_) | Rule::Ref(_) => false,
            Rule::Epsilon | Rule::Star(_) => true,
            Rule::Concat(parts) => parts.iter().all(Rule::nullable),
            Rule::Alt(parts) => parts.iter().any(Rule::nullable),
        }
    }

    /// Collect the symbols occurring in the rule, first occurrence first.
    pub(crate) fn alphabet(&self, out: &mut Vec<Symbol<T>>) {
        match self {
            Rule::Empty | Rule::Epsilon => {}
            Rule::Terminal(t) => {
                let sym = Symbol::Terminal(t.clone());
                if !out.contains(&sym) {
                    out.push(sym);
                }
            }
            Rule::Ref(nt) => {
                let sym = Symbol::Nonterminal(*nt);
                if !out.contains(&sym) {
                    out.push(sym);
                }
            }
            Rule::Concat(parts) | Rule::Alt(parts) => {
                for part in parts {
                    part.alphabet(out);
                }
            }
            Rule::Star(inner) => inner.alphabet(out),
        }
    }

    /// Brzozowski derivative with respect to a symbol. Nonterminal
    /// references are opaque: the derivative by a nonterminal symbol
    /// consumes the whole reference, which is exactly a "call" edge.
    pub(crate) fn derive(&self, sym: &Symbol<T>) -> Rule<T> {
        match self {
            Rule::Empty | Rule::Epsilon => Rule::Empty,
            Rule::Terminal(t) => match sym {
                Symbol::Terminal(s) if s == t => Rule::Epsilon,
                _ => Rule::Empty,
            },
            Rule::Ref(nt) => match sym {
                Symbol::Nonterminal(m) if m == nt => Rule::Epsilon,
                _ => Rule::Empty,
            },
            Rule::Concat(parts) => {
                let first = &parts[0];
                let rest = Rule::concat(parts[1..].iter().cloned());
                let through_first = Rule::concat([first.derive(sym), rest.clone()]);
                if first.nullable() {
                    Rule::alt([through_first, rest.derive(sym)])
                } else {
                    through_first
                }
            }
            Rule::Alt(parts) => Rule::alt(parts.iter().map(|p| p.derive(sym))),
            Rule::Star(inner) => {
                Rule::concat([inner.derive(sym), Rule::Star(inner.clone())])
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn t(c: char) -> Rule<char> {
        Rule::terminal(c)
    }

    #[test]
    fn concat_normalizes() {
        assert_eq!(Rule::concat([Rule::Epsilon, t('a'), Rule::Epsilon]), t('a'));
        assert_eq!(Rule::<char>::concat([]), Rule::Epsilon);
        assert_eq!(Rule::concat([t('a'), Rule::Empty, t('b')]), Rule::Empty);
        assert_eq!(
            Rule::concat([Rule::concat([t('a'), t('b')]), t('c')]),
            Rule::Concat(vec![t('a'), t('b'), t('c')]),
        );
    }

    #[test]
    fn alt_deduplicates() {
        assert_eq!(Rule::alt([t('a'), t('a')]), t('a'));
        assert_eq!(Rule::alt([Rule::Empty, t('a')]), t('a'));
        assert_eq!(Rule::<char>::alt([]), Rule::Empty);
    }

    #[test]
    fn star_collapses() {
        assert_eq!(Rule::<char>::star(Rule::Epsilon), Rule::Epsilon);
        let s = Rule::star(t('a'));
        assert_eq!(Rule::star(s.clone()), s);
    }

    #[test]
    fn nullability() {
        assert!(Rule::<char>::Epsilon.nullable());
        assert!(!t('a').nullable());
        assert!(Rule::star(t('a')).nullable());
        assert!(Rule::alt([t('a'), Rule::Epsilon]).nullable());
        assert!(!Rule::concat([Rule::star(t('a')), t('b')]).nullable());
    }

    #[test]
    fn derivative_of_terminal() {
        let sym = Symbol::Terminal('a');
        assert_eq!(t('a').derive(&sym), Rule::Epsilon);
        assert_eq!(t('b').derive(&sym), Rule::Empty);
    }

    #[test]
    fn derivative_of_star_unrolls_once() {
        let sym = Symbol::Terminal('a');
        let star = Rule::star(t('a'));
        // d/da (a*) = a*
        assert_eq!(star.derive(&sym), star);
    }

    #[test]
    fn derivative_through_nullable_prefix() {
        // d/db (a* b) = epsilon
        let rule = Rule::concat([Rule::star(t('a')), t('b')]);
        assert_eq!(rule.derive(&Symbol::Terminal('b')), Rule::Epsilon);
        // d/da (a* b) = a* b
        assert_eq!(rule.derive(&Symbol::Terminal('a')), rule);
    }
}
