//! Dotted items and the closure/goto operators.

use crate::{
    first_follow::FirstFollow,
    grammar::{is_empty_marker, Grammar, ProductionID, SymbolID, TerminalID, TerminalSet},
    types::Map,
    util::display_fn,
};
use std::fmt;

/// The marker rendered at the dot position of an item.
pub const DOT: &str = "●";

/// The equality notion used when comparing item sets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Mode {
    /// Items are compared by their cores only and carry no lookaheads.
    Lr0,
    /// Items are compared by their cores and lookahead sets.
    Lr1,
}

/// LR(0) item, a production with a marker position.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ItemCore {
    pub production: ProductionID,
    pub dot: u16,
}

impl ItemCore {
    /// The augmented start item `S' -> ● S`.
    pub const START: Self = Self {
        production: ProductionID::ACCEPT,
        dot: 0,
    };

    pub fn new(g: &Grammar, production: ProductionID, dot: u16) -> Result<Self, ItemError> {
        let p = g
            .production_by_index(production.index())
            .ok_or_else(|| ItemError::UnknownProduction(production.to_string()))?;
        if usize::from(dot) > p.right().len() {
            return Err(ItemError::DotOutOfRange {
                production: production.index(),
                dot: dot.into(),
            });
        }
        Ok(Self { production, dot })
    }

    /// Parse the textual form `A → α ● β` back into an item core.
    ///
    /// Both `●` and `.` are accepted as the dot marker, and `->` as the arrow.
    pub fn from_text(g: &Grammar, text: &str) -> Result<Self, ItemError> {
        let normalized = text.replace("->", "→");
        let (head, body) = normalized
            .split_once('→')
            .ok_or_else(|| ItemError::UnknownProduction(text.into()))?;

        let tokens: Vec<&str> = body.split_whitespace().collect();
        let dot = tokens
            .iter()
            .position(|t| *t == DOT || *t == ".")
            .ok_or_else(|| ItemError::MissingDot(text.into()))?;
        let body: Vec<&str> = tokens
            .iter()
            .enumerate()
            .filter(|(i, t)| *i != dot && !is_empty_marker(t))
            .map(|(_, t)| *t)
            .collect();

        let left = g
            .nonterminal(head.trim())
            .ok_or_else(|| ItemError::UnknownProduction(text.into()))?;
        let production = g
            .productions_of(left)
            .find(|p| {
                p.right().len() == body.len()
                    && p.right()
                        .iter()
                        .zip(&body)
                        .all(|(s, name)| g.symbol_name(*s) == *name)
            })
            .ok_or_else(|| ItemError::UnknownProduction(text.into()))?;

        // λ tokens before the dot do not count as recognized symbols
        let dot = tokens[..dot].iter().filter(|t| !is_empty_marker(t)).count();
        Self::new(
            g,
            production.id(),
            u16::try_from(dot).map_err(|_| ItemError::UnknownProduction(text.into()))?,
        )
    }

    /// The symbol immediately after the dot, if any.
    pub fn next_symbol(&self, g: &Grammar) -> Option<SymbolID> {
        g.production(self.production)
            .right()
            .get(usize::from(self.dot))
            .copied()
    }

    /// Whether the dot has reached the end of the body.
    pub fn is_complete(&self, g: &Grammar) -> bool {
        usize::from(self.dot) >= g.production(self.production).right().len()
    }

    /// The item with the dot moved one symbol to the right.
    pub fn advance(self) -> Self {
        Self {
            dot: self.dot + 1,
            ..self
        }
    }

    /// `"A → α ● β"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let production = g.production(self.production);
            write!(f, "{} →", g.nonterminal_name(production.left()))?;
            for (i, symbol) in production.right().iter().enumerate() {
                if i == usize::from(self.dot) {
                    write!(f, " {}", DOT)?;
                }
                write!(f, " {}", g.symbol_name(*symbol))?;
            }
            if usize::from(self.dot) == production.right().len() {
                write!(f, " {}", DOT)?;
            }
            Ok(())
        })
    }
}

/// An item core paired with its lookahead set.
///
/// In [`Mode::Lr0`] the lookahead set is always empty.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Item {
    pub core: ItemCore,
    pub lookaheads: TerminalSet,
}

impl Item {
    /// Compare two items ignoring the lookaheads.
    pub fn core_eq(&self, other: &Self) -> bool {
        self.core == other.core
    }
}

/// A set of items, enumerated in the order the items were discovered.
///
/// Items sharing a core are kept as one entry whose lookahead set is the
/// union of the contributions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ItemSet {
    items: Map<ItemCore, TerminalSet>,
}

/// The identity of an item set under one of the [`Mode`]s.
///
/// Independent of the order in which the items were discovered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ItemSetKey(Vec<(ItemCore, Vec<TerminalID>)>);

impl ItemSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an item, merging the lookaheads into an existing item with the
    /// same core. Returns whether the set changed.
    pub fn insert(&mut self, core: ItemCore, lookaheads: &TerminalSet) -> bool {
        match self.items.get_mut(&core) {
            Some(current) => current.absorb(lookaheads),
            None => {
                self.items.insert(core, lookaheads.clone());
                true
            }
        }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn contains(&self, core: &ItemCore) -> bool {
        self.items.contains_key(core)
    }

    pub fn lookaheads(&self, core: &ItemCore) -> Option<&TerminalSet> {
        self.items.get(core)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemCore, &TerminalSet)> + '_ {
        self.items.iter().map(|(core, lookaheads)| (*core, lookaheads))
    }

    pub fn cores(&self) -> impl Iterator<Item = ItemCore> + '_ {
        self.items.keys().copied()
    }

    pub fn items(&self) -> impl Iterator<Item = Item> + '_ {
        self.iter().map(|(core, lookaheads)| Item {
            core,
            lookaheads: lookaheads.clone(),
        })
    }

    /// The sorted item cores, ignoring lookaheads.
    pub fn sorted_cores(&self) -> Vec<ItemCore> {
        let mut cores: Vec<_> = self.cores().collect();
        cores.sort();
        cores
    }

    pub fn key(&self, mode: Mode) -> ItemSetKey {
        let mut key: Vec<_> = self
            .iter()
            .map(|(core, lookaheads)| match mode {
                Mode::Lr0 => (core, vec![]),
                Mode::Lr1 => (core, lookaheads.iter().collect()),
            })
            .collect();
        key.sort();
        ItemSetKey(key)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (core, lookaheads) in self.iter() {
                write!(f, "[ {}", core.display(g))?;
                if !lookaheads.is_empty() {
                    f.write_str(" ,")?;
                    for (i, t) in lookaheads.iter().enumerate() {
                        if i > 0 {
                            f.write_str(" |")?;
                        }
                        write!(f, " {}", g.terminal_name(t))?;
                    }
                }
                f.write_str(" ]\n")?;
            }
            Ok(())
        })
    }
}

impl FromIterator<Item> for ItemSet {
    fn from_iter<I: IntoIterator<Item = Item>>(iter: I) -> Self {
        let mut set = Self::new();
        for item in iter {
            set.insert(item.core, &item.lookaheads);
        }
        set
    }
}

/// The closure and goto operators over a fixed grammar.
#[derive(Debug)]
pub struct ItemEngine<'g> {
    grammar: &'g Grammar,
    first_follow: &'g FirstFollow,
    mode: Mode,
}

impl<'g> ItemEngine<'g> {
    pub fn new(grammar: &'g Grammar, first_follow: &'g FirstFollow, mode: Mode) -> Self {
        Self {
            grammar,
            first_follow,
            mode,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    /// The closure of the augmented start item.
    pub fn start(&self) -> ItemSet {
        let mut lookaheads = TerminalSet::new();
        if self.mode == Mode::Lr1 {
            lookaheads.insert(TerminalID::EOI);
        }
        let mut items = ItemSet::new();
        items.insert(ItemCore::START, &lookaheads);
        self.expand(&mut items);
        items
    }

    pub fn closure(&self, items: &ItemSet) -> ItemSet {
        let mut items = items.clone();
        self.expand(&mut items);
        items
    }

    /// Advance the dot over `symbol` in every item that allows it and close
    /// the result. Empty if no item has `symbol` after its dot.
    pub fn goto(&self, items: &ItemSet, symbol: SymbolID) -> ItemSet {
        let mut kernels = ItemSet::new();
        for (core, lookaheads) in items.iter() {
            if core.next_symbol(self.grammar) == Some(symbol) {
                kernels.insert(core.advance(), lookaheads);
            }
        }
        if !kernels.is_empty() {
            self.expand(&mut kernels);
        }
        kernels
    }

    /// クロージャ展開
    fn expand(&self, items: &mut ItemSet) {
        let mut changed = true;
        while changed {
            changed = false;

            let mut added: Map<ItemCore, TerminalSet> = Map::default();
            for (core, lookaheads) in items.iter() {
                let production = self.grammar.production(core.production);

                // [X -> ... @ Y beta]
                let (y_symbol, beta) = match &production.right()[usize::from(core.dot)..] {
                    [SymbolID::N(y_symbol), beta @ ..] => (*y_symbol, beta),
                    _ => continue,
                };

                // lookaheads = {x1,...,xk} のとき First(beta x1) ∪ ... ∪ First(beta xk)
                let x = match self.mode {
                    Mode::Lr0 => TerminalSet::new(),
                    Mode::Lr1 => self.first_follow.first_of_followed_by(beta, lookaheads),
                };
                for production in self.grammar.productions_of(y_symbol) {
                    added
                        .entry(ItemCore {
                            production: production.id(),
                            dot: 0,
                        })
                        .or_default()
                        .union_with(&x);
                }
            }

            for (core, lookaheads) in added {
                changed |= items.insert(core, &lookaheads);
            }
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ItemError {
    #[error("malformed item without a dot position: `{}'", _0)]
    MissingDot(String),

    #[error("the item does not correspond to any production: `{}'", _0)]
    UnknownProduction(String),

    #[error("dot position {dot} is out of range for production {production}")]
    DotOutOfRange { production: usize, dot: usize },
}
