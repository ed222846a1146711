//! Error recovery tests: insertion, deletion, substitution, and the
//! minimality of the repaired parse.

use descent::{Gll, LinearGraph, ParseResult, RecoveryMode, Rsm, RsmBuilder, Rule};

fn recover<'g>(
    rsm: &'g Rsm<char>,
    input: &str,
) -> (ParseResult<u32>, Gll<'g, LinearGraph<char>>) {
    let graph = LinearGraph::from_tokens(input.chars());
    let mut parser = Gll::new(rsm, graph, RecoveryMode::On);
    let result = parser.parse();
    (result, parser)
}

/// Cost of the cheapest repaired parse, with the word it recognized.
fn repair(rsm: &Rsm<char>, input: &str) -> Option<(u32, String)> {
    let (result, parser) = recover(rsm, input);
    let root = result.root?;
    let word: String = parser.sppf().leaves(root).collect();
    Some((parser.sppf().min_distance(root), word))
}

fn brackets() -> Rsm<char> {
    // S -> ( S ) S | epsilon
    let mut builder = RsmBuilder::new();
    let s = builder.nonterminal("S");
    builder.rule(
        s,
        Rule::opt(Rule::concat([
            Rule::terminal('('),
            Rule::nonterminal(s),
            Rule::terminal(')'),
            Rule::nonterminal(s),
        ])),
    );
    builder.build(s).unwrap()
}

fn single_a() -> Rsm<char> {
    let mut builder = RsmBuilder::new();
    let s = builder.nonterminal("S");
    builder.rule(s, Rule::terminal('a'));
    builder.build(s).unwrap()
}

#[test]
fn exact_input_costs_nothing() {
    let rsm = brackets();
    assert_eq!(repair(&rsm, "(())"), Some((0, "(())".to_owned())));

    let (result, _) = recover(&rsm, "(())");
    assert_eq!(result.reachable.get(&(0, 4)), Some(&0));
}

#[test]
fn missing_terminal_is_inserted() {
    // "(" repairs at cost 1, to "()" or to "" depending on which unit
    // edit the forest surfaces first.
    let rsm = brackets();
    let (cost, word) = repair(&rsm, "(").unwrap();
    assert_eq!(cost, 1);
    assert!(word == "()" || word.is_empty(), "unexpected repair {word:?}");
}

#[test]
fn stray_terminal_is_deleted() {
    let rsm = single_a();
    let (cost, word) = repair(&rsm, "ab").unwrap();
    assert_eq!(cost, 1);
    assert_eq!(word, "a");
}

#[test]
fn wrong_terminal_is_substituted() {
    let rsm = single_a();
    let (cost, word) = repair(&rsm, "b").unwrap();
    assert_eq!(cost, 1);
    assert_eq!(word, "a");
}

#[test]
fn reachability_reports_the_edit_cost() {
    let rsm = single_a();
    let (result, _) = recover(&rsm, "b");
    assert_eq!(result.reachable.get(&(0, 1)), Some(&1));
}

#[test]
fn missing_terminal_before_a_real_edge_is_inserted() {
    // "b" repairs to "ab" at cost 1: insert the 'a' in place, then
    // consume the real 'b' for free.
    let mut builder = RsmBuilder::new();
    let s = builder.nonterminal("S");
    builder.rule(s, Rule::concat([Rule::terminal('a'), Rule::terminal('b')]));
    let rsm = builder.build(s).unwrap();

    let (cost, word) = repair(&rsm, "b").unwrap();
    assert_eq!(cost, 1);
    assert_eq!(word, "ab");
}

#[test]
fn misread_bracket_repairs_at_cost_one() {
    // "((" reads the second '(' as ')'.
    let rsm = brackets();
    let (cost, word) = repair(&rsm, "((").unwrap();
    assert_eq!(cost, 1);
    assert_eq!(word, "()");
}

#[test]
fn two_errors_cost_two() {
    let rsm = brackets();
    let (cost, _) = repair(&rsm, "(((").unwrap();
    assert_eq!(cost, 2);
}

#[test]
fn cheapest_repair_wins_over_deeper_ones() {
    // ")(" repairs at cost 2 (drop both, or balance each); never more.
    let rsm = brackets();
    let (cost, _) = repair(&rsm, ")(").unwrap();
    assert_eq!(cost, 2);
}

#[test]
fn repaired_words_parse_cleanly() {
    // Whatever recovery recognized must be a real word of the grammar.
    let rsm = brackets();
    for broken in ["(", "((", "(()", "())", ")("] {
        let (_, word) = repair(&rsm, broken).unwrap();
        let graph = LinearGraph::from_tokens(word.chars());
        let mut parser = Gll::new(&rsm, graph, RecoveryMode::Off);
        let reparsed = parser.parse();
        assert!(reparsed.root.is_some(), "recovered word {word:?} does not parse");
    }
}

#[test]
fn recovery_off_still_rejects() {
    let rsm = single_a();
    let graph = LinearGraph::from_tokens("b".chars());
    let mut parser = Gll::new(&rsm, graph, RecoveryMode::Off);
    assert!(parser.parse().root.is_none());
}
