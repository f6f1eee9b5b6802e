//! Calculation of LR parse tables with conflict bookkeeping.

use crate::{
    automaton::{Automaton, Kind, StateID},
    build::{BuildError, Variant},
    first_follow::FirstFollow,
    grammar::{Grammar, ProductionID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The content of a table cell.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Action {
    /// Read the lookahead symbol and transition to the specified state.
    Shift(StateID),

    /// Reduce by the specified production.
    Reduce(ProductionID),

    /// Transition after a reduction to the nonterminal of this column.
    Goto(StateID),

    Accept,

    /// Every action written into the cell, in the order they were recorded.
    Conflict(Vec<Action>),
}

impl Action {
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict(..))
    }

    /// Write another action into the cell holding `self`.
    ///
    /// Writing the same action again is a no-op; a different one turns the
    /// cell into a conflict or grows the existing one.
    fn record(&mut self, action: Action) {
        if *self == action {
            return;
        }
        match self {
            Self::Conflict(actions) => {
                if !actions.contains(&action) {
                    actions.push(action);
                }
            }
            _ => {
                let current = std::mem::replace(self, Self::Conflict(vec![]));
                *self = Self::Conflict(vec![current, action]);
            }
        }
    }

    /// `s3`, `r2`, `3` for gotos, `acc`, and `s3/r2` for conflicts.
    pub fn display<'t>(&'t self, table: &'t Table) -> impl fmt::Display + 't {
        display_fn(move |f| match self {
            Self::Shift(to) => write!(f, "s{}", table.label(*to)),
            Self::Reduce(p) => write!(f, "r{}", p),
            Self::Goto(to) => f.write_str(table.label(*to)),
            Self::Accept => f.write_str("acc"),
            Self::Conflict(actions) => {
                for (i, action) in actions.iter().enumerate() {
                    if i > 0 {
                        f.write_str("/")?;
                    }
                    write!(f, "{}", action.display(table))?;
                }
                Ok(())
            }
        })
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::ShiftReduce => "shift/reduce",
            Self::ReduceReduce => "reduce/reduce",
        })
    }
}

/// A cell holding more than one action.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateID,
    pub symbol: SymbolID,
    pub kind: ConflictKind,
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone)]
pub struct Row {
    label: String,
    actions: Map<SymbolID, Action>,
}

impl Row {
    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn actions(&self) -> impl Iterator<Item = (SymbolID, &Action)> + '_ {
        self.actions.iter().map(|(symbol, action)| (*symbol, action))
    }

    pub fn action(&self, symbol: SymbolID) -> Option<&Action> {
        self.actions.get(&symbol)
    }
}

/// The action/goto table of an LR automaton.
#[derive(Debug, Clone)]
pub struct Table {
    variant: Variant,
    rows: Map<StateID, Row>,
    conflicts: Vec<Conflict>,
}

/// The terminals a completed item reduces on.
#[derive(Debug, Copy, Clone)]
enum ReduceOn {
    Everything,
    Follow,
    Lookaheads,
}

impl Table {
    /// Build the table of `variant` from an automaton of the matching kind.
    pub fn build(
        g: &Grammar,
        first_follow: &FirstFollow,
        automaton: &Automaton,
        variant: Variant,
    ) -> Result<Self, BuildError> {
        let (expected, reduce_on) = match variant {
            Variant::Lr0 => (Kind::Lr0, ReduceOn::Everything),
            Variant::Slr1 => (Kind::Lr0, ReduceOn::Follow),
            Variant::Clr1 => (Kind::Canonical, ReduceOn::Lookaheads),
            Variant::Lalr1 => (Kind::Lalr, ReduceOn::Lookaheads),
            Variant::Ll1 => return Err(BuildError::NotLr(variant)),
        };
        if automaton.kind() != expected {
            return Err(BuildError::AutomatonMismatch {
                expected,
                found: automaton.kind(),
            });
        }

        let span = tracing::trace_span!("make_table", %variant);
        let _entered = span.enter();

        let all_terminals: TerminalSet = g.input_terminals().collect();

        let mut rows = Map::<StateID, Row>::default();
        for state in automaton.states() {
            let mut actions = Map::<SymbolID, Action>::default();
            let mut write = |symbol: SymbolID, action: Action| match actions.get_mut(&symbol) {
                Some(cell) => cell.record(action),
                None => {
                    actions.insert(symbol, action);
                }
            };

            for (core, lookaheads) in state.items().iter() {
                if let Some(symbol) = core.next_symbol(g) {
                    // shift, goto
                    if let Some(to) = state.transition(symbol) {
                        let action = match symbol {
                            SymbolID::T(..) => Action::Shift(to),
                            SymbolID::N(..) => Action::Goto(to),
                        };
                        write(symbol, action);
                    }
                    continue;
                }

                // reduce, accept
                if core.production == ProductionID::ACCEPT {
                    write(SymbolID::T(TerminalID::EOI), Action::Accept);
                    continue;
                }
                let production = g.production(core.production);
                let on = match reduce_on {
                    ReduceOn::Everything => &all_terminals,
                    ReduceOn::Follow => first_follow.follow(production.left()),
                    ReduceOn::Lookaheads => lookaheads,
                };
                for t in on.iter() {
                    write(SymbolID::T(t), Action::Reduce(core.production));
                }
            }

            rows.insert(
                state.id(),
                Row {
                    label: state.label().to_owned(),
                    actions,
                },
            );
        }

        let mut conflicts = vec![];
        for (state, row) in &rows {
            for (symbol, action) in &row.actions {
                let actions = match action {
                    Action::Conflict(actions) => actions,
                    _ => continue,
                };
                // accept is the reduction by production 0
                let kind = if actions.iter().any(|a| matches!(a, Action::Shift(..))) {
                    ConflictKind::ShiftReduce
                } else {
                    ConflictKind::ReduceReduce
                };
                tracing::warn!(
                    "{} conflict in state {} on `{}'",
                    kind,
                    row.label,
                    g.symbol_name(*symbol)
                );
                conflicts.push(Conflict {
                    state: *state,
                    symbol: *symbol,
                    kind,
                    actions: actions.clone(),
                });
            }
        }

        let table = Self {
            variant,
            rows,
            conflicts,
        };
        tracing::debug!(
            "{} table: {} rows, {} shift/reduce and {} reduce/reduce conflicts",
            variant,
            table.rows.len(),
            table.shift_reduce_count(),
            table.reduce_reduce_count()
        );
        Ok(table)
    }

    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The rows in state order.
    pub fn rows(&self) -> impl Iterator<Item = (StateID, &Row)> + '_ {
        self.rows.iter().map(|(id, row)| (*id, row))
    }

    pub fn row(&self, state: StateID) -> Option<&Row> {
        self.rows.get(&state)
    }

    pub fn action(&self, state: StateID, symbol: SymbolID) -> Option<&Action> {
        self.rows.get(&state)?.action(symbol)
    }

    pub fn label(&self, state: StateID) -> &str {
        self.rows.get(&state).map_or("<unknown>", |row| row.label())
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts[..]
    }

    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }

    pub fn shift_reduce_count(&self) -> usize {
        self.count(ConflictKind::ShiftReduce)
    }

    pub fn reduce_reduce_count(&self) -> usize {
        self.count(ConflictKind::ReduceReduce)
    }

    fn count(&self, kind: ConflictKind) -> usize {
        self.conflicts.iter().filter(|c| c.kind == kind).count()
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, row) in self.rows.values().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {}", row.label)?;
                for (symbol, action) in &row.actions {
                    writeln!(
                        f,
                        "- {} => {}",
                        g.symbol_name(*symbol),
                        action.display(self)
                    )?;
                }
            }
            Ok(())
        })
    }
}
