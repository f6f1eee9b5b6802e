//! Calculation of First and Follow sets.
//!
//! Both sets are least fixed points, computed by repeated full passes over
//! the production list until a pass adds nothing. The empty string is
//! recorded in First sets as [`TerminalID::EPSILON`].

use crate::{
    grammar::{Grammar, NonterminalID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::{display_fn, write_joined},
};
use std::fmt;

#[derive(Debug, Clone, PartialEq)]
pub struct FirstFollow {
    first: Map<NonterminalID, TerminalSet>,
    follow: Map<NonterminalID, TerminalSet>,
}

impl FirstFollow {
    /// Run both computations to convergence.
    pub fn compute(g: &Grammar) -> Self {
        let span = tracing::trace_span!("first_follow");
        let _entered = span.enter();

        let first = first_sets(g);
        let follow = follow_sets(g, &first);
        Self { first, follow }
    }

    /// `First(n)`, including `λ` when `n` derives the empty string.
    pub fn first(&self, n: NonterminalID) -> &TerminalSet {
        &self.first[&n]
    }

    /// `Follow(n)`.
    pub fn follow(&self, n: NonterminalID) -> &TerminalSet {
        &self.follow[&n]
    }

    pub fn nullable(&self, n: NonterminalID) -> bool {
        self.first[&n].contains(TerminalID::EPSILON)
    }

    /// `First(α)` for a symbol sequence.
    pub fn first_of(&self, sequence: &[SymbolID]) -> TerminalSet {
        first_of_sequence(&self.first, sequence)
    }

    /// `First(β la1) ∪ ... ∪ First(β lak)` for the lookaheads `{la1, ..., lak}`.
    pub fn first_of_followed_by(&self, beta: &[SymbolID], lookaheads: &TerminalSet) -> TerminalSet {
        let mut res = self.first_of(beta);
        if res.remove(TerminalID::EPSILON) {
            res.union_with(lookaheads);
        }
        res
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, first) in &self.first {
                write!(f, "{}\n\tFirst: {{", g.nonterminal_name(*n))?;
                write_joined(f, ", ", first.iter().map(|t| g.terminal_name(t)))?;
                write!(f, "}}\n\tFollow: {{")?;
                write_joined(f, ", ", self.follow[n].iter().map(|t| g.terminal_name(t)))?;
                writeln!(f, "}}")?;
            }
            Ok(())
        })
    }
}

fn first_of_sequence(first: &Map<NonterminalID, TerminalSet>, sequence: &[SymbolID]) -> TerminalSet {
    let mut res = TerminalSet::new();
    for symbol in sequence {
        match symbol {
            SymbolID::T(t) => {
                res.insert(*t);
                return res;
            }
            SymbolID::N(n) => {
                let added = &first[n];
                res.extend(added.iter().filter(|t| *t != TerminalID::EPSILON));
                if !added.contains(TerminalID::EPSILON) {
                    return res;
                }
            }
        }
    }
    // 全ての記号が λ を導出する（もしくは空列）
    res.insert(TerminalID::EPSILON);
    res
}

fn first_sets(g: &Grammar) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = g
        .nonterminals()
        .map(|n| (n.id(), TerminalSet::new()))
        .collect();

    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        for production in g.productions() {
            let added = first_of_sequence(&map, production.right());
            changed |= map[&production.left()].absorb(&added);
        }
        if !changed {
            break;
        }
    }
    tracing::debug!("First sets converged after {} passes", passes);

    map
}

fn follow_sets(
    g: &Grammar,
    first: &Map<NonterminalID, TerminalSet>,
) -> Map<NonterminalID, TerminalSet> {
    let mut map: Map<NonterminalID, TerminalSet> = g
        .nonterminals()
        .map(|n| (n.id(), TerminalSet::new()))
        .collect();
    map[&g.start_symbol()].insert(TerminalID::EOI);

    let mut passes = 0;
    loop {
        passes += 1;
        let mut changed = false;
        for production in g.productions() {
            // A -> α B β
            for (i, symbol) in production.right().iter().enumerate() {
                let b = match symbol {
                    SymbolID::N(b) => *b,
                    SymbolID::T(..) => continue,
                };
                let mut added = first_of_sequence(first, &production.right()[i + 1..]);
                if added.remove(TerminalID::EPSILON) {
                    added.union_with(&map[&production.left()]);
                }
                changed |= map[&b].absorb(&added);
            }
        }
        if !changed {
            break;
        }
    }
    tracing::debug!("Follow sets converged after {} passes", passes);

    map
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(g: &Grammar, set: &TerminalSet) -> Vec<String> {
        set.iter().map(|t| g.terminal_name(t).to_owned()).collect()
    }

    fn expr() -> Grammar {
        Grammar::from_text(
            "E|T|F",
            "+|*|(|)|id",
            "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id",
        )
        .unwrap()
    }

    #[test]
    fn single_chain() {
        let g = Grammar::from_text("S|A", "a", "S -> A\nA -> a").unwrap();
        let ff = FirstFollow::compute(&g);
        let s = g.nonterminal("S").unwrap();
        let a = g.nonterminal("A").unwrap();
        assert_eq!(names(&g, ff.first(s)), ["a"]);
        assert_eq!(names(&g, ff.first(a)), ["a"]);
        assert_eq!(names(&g, ff.follow(s)), ["$"]);
        assert_eq!(names(&g, ff.follow(a)), ["$"]);
    }

    #[test]
    fn expression_grammar() {
        let g = expr();
        let ff = FirstFollow::compute(&g);
        let e = g.nonterminal("E").unwrap();
        let t = g.nonterminal("T").unwrap();
        let f = g.nonterminal("F").unwrap();
        for n in [e, t, f] {
            assert_eq!(names(&g, ff.first(n)), ["(", "id"]);
        }
        assert_eq!(names(&g, ff.follow(e)), ["$", "+", ")"]);
        assert_eq!(names(&g, ff.follow(t)), ["$", "+", "*", ")"]);
        assert_eq!(names(&g, ff.follow(f)), ["$", "+", "*", ")"]);
    }

    #[test]
    fn nullable_symbols() {
        let g = Grammar::from_text("S|A|B", "a|b|c", "S -> A B c\nA -> a | λ\nB -> b | λ").unwrap();
        let ff = FirstFollow::compute(&g);
        let s = g.nonterminal("S").unwrap();
        let a = g.nonterminal("A").unwrap();
        let b = g.nonterminal("B").unwrap();

        assert!(ff.nullable(a));
        assert!(ff.nullable(b));
        assert!(!ff.nullable(s));
        assert_eq!(names(&g, ff.first(s)), ["a", "b", "c"]);
        assert_eq!(names(&g, ff.first(a)), ["λ", "a"]);
        assert_eq!(names(&g, ff.follow(a)), ["b", "c"]);
        assert_eq!(names(&g, ff.follow(b)), ["c"]);

        let empty = ff.first_of(&[]);
        assert_eq!(names(&g, &empty), ["λ"]);

        let la: TerminalSet = Some(TerminalID::EOI).into_iter().collect();
        let ab = [SymbolID::N(a), SymbolID::N(b)];
        assert_eq!(names(&g, &ff.first_of_followed_by(&ab, &la)), ["$", "a", "b"]);
    }

    #[test]
    fn idempotent() {
        let g = expr();
        assert_eq!(FirstFollow::compute(&g), FirstFollow::compute(&g));
    }

    #[test]
    fn augmented_grammar_keeps_sets() {
        let g = expr();
        let before = FirstFollow::compute(&g);
        let e = g.nonterminal("E").unwrap();
        let expected = names(&g, before.follow(e));

        let g = g.augment().unwrap();
        let after = FirstFollow::compute(&g);
        assert_eq!(names(&g, after.follow(e)), expected);
        assert_eq!(names(&g, after.follow(g.start_symbol())), ["$"]);
    }
}
