//! LL(1) predictive parse table.

use crate::{
    first_follow::FirstFollow,
    grammar::{Grammar, NonterminalID, ProductionID, TerminalID},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// A cell predicting more than one production.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ll1Conflict {
    pub nonterminal: NonterminalID,
    pub terminal: TerminalID,
    /// All the productions written into the cell, in the order they were recorded.
    pub productions: Vec<ProductionID>,
}

#[derive(Debug, Clone)]
pub struct Ll1Table {
    cells: Map<NonterminalID, Map<TerminalID, Vec<ProductionID>>>,
    conflicts: Vec<Ll1Conflict>,
}

impl Ll1Table {
    /// Fill the table by walking every production `A -> β`.
    pub fn build(g: &Grammar, first_follow: &FirstFollow) -> Self {
        let span = tracing::trace_span!("make_ll1_table");
        let _entered = span.enter();

        let mut cells: Map<NonterminalID, Map<TerminalID, Vec<ProductionID>>> = g
            .nonterminals()
            .map(|n| (n.id(), Map::default()))
            .collect();

        for production in g.productions() {
            let row = &mut cells[&production.left()];
            let mut write = |t: TerminalID| {
                let cell = row.entry(t).or_default();
                if !cell.contains(&production.id()) {
                    cell.push(production.id());
                }
            };

            let first = first_follow.first_of(production.right());
            for t in first.iter().filter(|t| *t != TerminalID::EPSILON) {
                write(t);
            }
            if first.contains(TerminalID::EPSILON) {
                for t in first_follow.follow(production.left()).iter() {
                    write(t);
                }
            }
        }

        let mut conflicts = vec![];
        for (n, row) in &cells {
            for (t, productions) in row {
                if productions.len() > 1 {
                    tracing::warn!(
                        "LL(1) conflict on [{}, {}]: {} productions",
                        g.nonterminal_name(*n),
                        g.terminal_name(*t),
                        productions.len()
                    );
                    conflicts.push(Ll1Conflict {
                        nonterminal: *n,
                        terminal: *t,
                        productions: productions.clone(),
                    });
                }
            }
        }

        Self { cells, conflicts }
    }

    /// Every production recorded for the cell `[n, t]`.
    pub fn get(&self, n: NonterminalID, t: TerminalID) -> Option<&[ProductionID]> {
        self.cells.get(&n)?.get(&t).map(|cell| &cell[..])
    }

    /// The production the parser expands `n` with on lookahead `t`.
    ///
    /// For conflicting cells this is the first recorded production.
    pub fn production(&self, n: NonterminalID, t: TerminalID) -> Option<ProductionID> {
        self.get(n, t)?.first().copied()
    }

    /// The row heads in nonterminal order.
    pub fn nonterminals(&self) -> impl Iterator<Item = NonterminalID> + '_ {
        self.cells.keys().copied()
    }

    /// The filled cells of the row `n`.
    pub fn row(&self, n: NonterminalID) -> impl Iterator<Item = (TerminalID, &[ProductionID])> + '_ {
        self.cells
            .get(&n)
            .into_iter()
            .flat_map(|row| row.iter().map(|(t, productions)| (*t, &productions[..])))
    }

    pub fn conflicts(&self) -> &[Ll1Conflict] {
        &self.conflicts[..]
    }

    /// Whether every cell predicts at most one production.
    pub fn is_ll1(&self) -> bool {
        self.conflicts.is_empty()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (n, row) in &self.cells {
                writeln!(f, "#### {}", g.nonterminal_name(*n))?;
                for (t, productions) in row {
                    write!(f, "- {} =>", g.terminal_name(*t))?;
                    for p in productions {
                        write!(f, " [{}]", g.production(*p).display(g))?;
                    }
                    writeln!(f)?;
                }
            }
            Ok(())
        })
    }
}
