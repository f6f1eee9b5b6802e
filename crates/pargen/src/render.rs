//! Plain-text rendering of the computed structures for presentation layers.
//!
//! Every renderer only reads the structures it is given. Symbol names go
//! through an [`Aliases`] mapping, applied alike to item bodies, lookaheads
//! and table headers.

use crate::{
    automaton::{Automaton, State},
    first_follow::FirstFollow,
    grammar::{Grammar, Production, SymbolID, TerminalID, TerminalSet, EMPTY_MARKERS},
    item::{ItemCore, DOT},
    ll1::Ll1Table,
    table::Table,
    types::Map,
    util::{display_fn, write_joined},
};
use std::fmt;

/// Display texts for internal symbol names.
#[derive(Debug, Clone, Default)]
pub struct Aliases {
    map: Map<String, String>,
}

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, code: impl Into<String>, text: impl Into<String>) -> &mut Self {
        self.map.insert(code.into(), text.into());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }

    /// The display text of `name`, or `name` itself if it has no alias.
    pub fn get<'a>(&'a self, name: &'a str) -> &'a str {
        self.map.get(name).map_or(name, String::as_str)
    }

    fn symbol<'a>(&'a self, g: &'a Grammar, symbol: SymbolID) -> &'a str {
        self.get(g.symbol_name(symbol))
    }

    fn terminal<'a>(&'a self, g: &'a Grammar, t: TerminalID) -> &'a str {
        self.get(g.terminal_name(t))
    }
}

impl<K, V> FromIterator<(K, V)> for Aliases
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            map: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// `A → X Y Z`, or `A → λ`.
pub fn production<'a>(g: &'a Grammar, aliases: &'a Aliases, p: &'a Production) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        write!(f, "{} → ", aliases.symbol(g, SymbolID::N(p.left())))?;
        if p.right().is_empty() {
            return f.write_str(EMPTY_MARKERS[0]);
        }
        write_joined(f, " ", p.right().iter().map(|s| aliases.symbol(g, *s)))
    })
}

/// `[ A → α ● β , a | b ]`; the lookahead part is left out when empty.
pub fn item<'a>(
    g: &'a Grammar,
    aliases: &'a Aliases,
    core: ItemCore,
    lookaheads: &'a TerminalSet,
) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        let p = g.production(core.production);
        write!(f, "[ {} →", aliases.symbol(g, SymbolID::N(p.left())))?;
        for (i, symbol) in p.right().iter().enumerate() {
            if i == usize::from(core.dot) {
                write!(f, " {}", DOT)?;
            }
            write!(f, " {}", aliases.symbol(g, *symbol))?;
        }
        if usize::from(core.dot) == p.right().len() {
            write!(f, " {}", DOT)?;
        }
        if !lookaheads.is_empty() {
            f.write_str(" , ")?;
            write_joined(f, " | ", lookaheads.iter().map(|t| aliases.terminal(g, t)))?;
        }
        f.write_str(" ]")
    })
}

/// `I<label> { ... }` with one item per line.
pub fn state<'a>(g: &'a Grammar, aliases: &'a Aliases, state: &'a State) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        writeln!(f, "I{} {{", state.label())?;
        for (core, lookaheads) in state.items().iter() {
            writeln!(f, "    {}", item(g, aliases, core, lookaheads))?;
        }
        writeln!(f, "}}")
    })
}

/// Every state of the collection, in enumeration order.
pub fn collection<'a>(
    g: &'a Grammar,
    aliases: &'a Aliases,
    automaton: &'a Automaton,
) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        for s in automaton.states() {
            write!(f, "{}", state(g, aliases, s))?;
        }
        Ok(())
    })
}

/// One row per state; columns are the terminals, `$`, then the nonterminals.
pub fn lr_table<'a>(g: &'a Grammar, aliases: &'a Aliases, table: &'a Table) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        let columns: Vec<SymbolID> = g
            .input_terminals()
            .map(SymbolID::T)
            .chain(
                g.nonterminals()
                    .map(|n| n.id())
                    .filter(|n| !(g.is_augmented() && *n == g.start_symbol()))
                    .map(SymbolID::N),
            )
            .collect();

        let mut grid = vec![];
        grid.push(
            Some("State".to_owned())
                .into_iter()
                .chain(columns.iter().map(|s| aliases.symbol(g, *s).to_owned()))
                .collect::<Vec<_>>(),
        );
        for (_, row) in table.rows() {
            grid.push(
                Some(row.label().to_owned())
                    .into_iter()
                    .chain(columns.iter().map(|s| {
                        row.action(*s)
                            .map(|action| action.display(table).to_string())
                            .unwrap_or_default()
                    }))
                    .collect(),
            );
        }
        write_grid(f, &grid)
    })
}

/// One row per nonterminal; a cell shows the predicted body, all of them
/// separated by ` / ` for conflicting cells.
pub fn ll1_table<'a>(g: &'a Grammar, aliases: &'a Aliases, table: &'a Ll1Table) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        let columns: Vec<TerminalID> = g.input_terminals().collect();

        let mut grid = vec![];
        grid.push(
            Some(String::new())
                .into_iter()
                .chain(columns.iter().map(|t| aliases.terminal(g, *t).to_owned()))
                .collect::<Vec<_>>(),
        );
        for n in table.nonterminals() {
            let mut row = vec![aliases.symbol(g, SymbolID::N(n)).to_owned()];
            for t in &columns {
                let cell = table
                    .get(n, *t)
                    .unwrap_or_default()
                    .iter()
                    .map(|p| body(g, aliases, g.production(*p)))
                    .collect::<Vec<_>>()
                    .join(" / ");
                row.push(cell);
            }
            grid.push(row);
        }
        write_grid(f, &grid)
    })
}

fn body(g: &Grammar, aliases: &Aliases, p: &Production) -> String {
    if p.right().is_empty() {
        return EMPTY_MARKERS[0].to_owned();
    }
    p.right()
        .iter()
        .map(|s| aliases.symbol(g, *s))
        .collect::<Vec<_>>()
        .join(" ")
}

/// `Nonterminal | First | Follow`, the sets written as `{a, b}`.
pub fn first_follow<'a>(
    g: &'a Grammar,
    aliases: &'a Aliases,
    first_follow: &'a FirstFollow,
) -> impl fmt::Display + 'a {
    display_fn(move |f| {
        let set = |set: &TerminalSet| {
            let names: Vec<_> = set.iter().map(|t| aliases.terminal(g, t)).collect();
            format!("{{{}}}", names.join(", "))
        };

        let mut grid = vec![vec![
            "Nonterminal".to_owned(),
            "First".to_owned(),
            "Follow".to_owned(),
        ]];
        for n in g.nonterminals() {
            grid.push(vec![
                aliases.get(n.name()).to_owned(),
                set(first_follow.first(n.id())),
                set(first_follow.follow(n.id())),
            ]);
        }
        write_grid(f, &grid)
    })
}

fn write_grid(f: &mut fmt::Formatter<'_>, grid: &[Vec<String>]) -> fmt::Result {
    let mut widths = vec![0; grid.iter().map(Vec::len).max().unwrap_or(0)];
    for row in grid {
        for (width, cell) in widths.iter_mut().zip(row) {
            *width = (*width).max(cell.chars().count());
        }
    }
    for row in grid {
        let mut line = String::new();
        for (i, (cell, width)) in row.iter().zip(&widths).enumerate() {
            if i > 0 {
                line.push_str(" | ");
            }
            line.push_str(cell);
            line.extend(std::iter::repeat(' ').take(width - cell.chars().count()));
        }
        writeln!(f, "{}", line.trim_end())?;
    }
    Ok(())
}
