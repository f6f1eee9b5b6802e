//! Grammar types.

use crate::{types::Map, util::display_fn};
use std::{
    fmt, fs,
    hash::{Hash, Hasher},
    io,
    path::Path,
};

/// The reserved name of the end-of-input marker.
pub const END_MARKER: &str = "$";

/// The reserved names denoting the empty string.
pub const EMPTY_MARKERS: [&str; 2] = ["λ", "ε"];

pub(crate) fn is_empty_marker(s: &str) -> bool {
    EMPTY_MARKERS.contains(&s)
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::new(0);

    /// Reserved symbol that stands for the empty string inside First sets.
    pub const EPSILON: Self = Self::new(1);

    const OFFSET: u16 = 2;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    pub const fn from_raw(raw: u16) -> Self {
        Self::new(raw)
    }

    pub const fn is_reserved(self) -> bool {
        self.raw < Self::OFFSET
    }
}

impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EOI => write!(f, "T#End"),
            Self::EPSILON => write!(f, "T#Empty"),
            _ => write!(f, "T#{:03}", self.raw),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "N#{:03}", self.raw)
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

/// The index of a production in the grammar's production list.
#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The augmented start production `S' -> S`.
    ///
    /// Only meaningful after [`Grammar::augment`].
    pub const ACCEPT: Self = Self::new(0);

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }

    pub const fn index(self) -> usize {
        self.raw as usize
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P#{:03}", self.raw)
    }
}

impl fmt::Display for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// A set of terminal symbols, used for First/Follow and lookahead sets.
///
/// Iteration follows the terminal ids, i.e. the declaration order.
#[derive(Default, Clone)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    /// Add every element of `other`, reporting whether this set grew.
    pub fn absorb(&mut self, other: &Self) -> bool {
        let before = self.inner.len();
        self.inner.union_with(&other.inner);
        self.inner.len() > before
    }
    pub fn is_superset(&self, other: &Self) -> bool {
        self.inner.is_superset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .filter_map(|raw| u16::try_from(raw).ok().map(TerminalID::from_raw))
    }
}

impl PartialEq for TerminalSet {
    fn eq(&self, other: &Self) -> bool {
        self.iter().eq(other.iter())
    }
}
impl Eq for TerminalSet {}

impl Hash for TerminalSet {
    fn hash<H: Hasher>(&self, state: &mut H) {
        for t in self.iter() {
            t.hash(state);
        }
    }
}

impl fmt::Debug for TerminalSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

impl Extend<TerminalID> for TerminalSet {
    fn extend<I: IntoIterator<Item = TerminalID>>(&mut self, iter: I) {
        for t in iter {
            self.insert(t);
        }
    }
}

#[derive(Debug, Clone)]
pub struct Terminal {
    id: TerminalID,
    name: String,
}
impl Terminal {
    pub fn id(&self) -> TerminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

#[derive(Debug, Clone)]
pub struct Nonterminal {
    id: NonterminalID,
    name: String,
}
impl Nonterminal {
    pub fn id(&self) -> NonterminalID {
        self.id
    }
    pub fn name(&self) -> &str {
        &self.name
    }
}
impl fmt::Display for Nonterminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone, PartialEq)]
pub struct Production {
    id: ProductionID,
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Production {
    pub fn id(&self) -> ProductionID {
        self.id
    }

    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production. Empty for `A -> λ`.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS → R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            write!(f, "{} → {}", g.nonterminal_name(self.left), self.display_body(g))
        })
    }

    /// Render only the right-hand side, `λ` when empty.
    pub fn display_body<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            if self.right.is_empty() {
                return f.write_str(EMPTY_MARKERS[0]);
            }
            for (i, symbol) in self.right.iter().enumerate() {
                if i > 0 {
                    f.write_str(" ")?;
                }
                f.write_str(g.symbol_name(*symbol))?;
            }
            Ok(())
        })
    }
}

/// The grammar definition used to derive the parser tables.
///
/// A grammar is immutable once defined. [`Grammar::augment`] consumes it and
/// returns the augmented grammar.
#[derive(Debug, Clone)]
pub struct Grammar {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Vec<Production>,
    names: Map<String, SymbolID>,
    start_symbol: NonterminalID,
    augmented: bool,
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "## terminals:")?;
        for terminal in self.input_terminals() {
            writeln!(f, "{}", self.terminal_name(terminal))?;
        }

        writeln!(f, "\n## nonterminals:")?;
        for nonterminal in self.nonterminals.values() {
            write!(f, "{}", nonterminal)?;
            if nonterminal.id() == self.start_symbol {
                write!(f, " (start)")?;
            }
            writeln!(f)?;
        }

        writeln!(f, "\n## productions:")?;
        for production in &self.productions {
            writeln!(f, "{}: {}", production.id(), production.display(self))?;
        }

        Ok(())
    }
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        Self::from_str(&source)
    }

    /// Parse a grammar file with `%nonterminals`/`%terminals` headers.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        let grammar = crate::syntax::parse(source)?;
        crate::syntax::define(grammar)
    }

    /// Define a grammar from `|`-separated symbol lists and production lines.
    pub fn from_text(
        nonterminals: &str,
        terminals: &str,
        productions: &str,
    ) -> Result<Grammar, GrammarError> {
        let grammar = crate::syntax::parse_parts(nonterminals, terminals, productions)?;
        crate::syntax::define(grammar)
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: vec![],
            names: Map::default(),
            start: None,
            next_terminal_id: TerminalID::OFFSET,
            next_nonterminal_id: 0,
        };

        def.terminals.insert(
            TerminalID::EOI,
            Terminal {
                id: TerminalID::EOI,
                name: END_MARKER.into(),
            },
        );
        def.terminals.insert(
            TerminalID::EPSILON,
            Terminal {
                id: TerminalID::EPSILON,
                name: EMPTY_MARKERS[0].into(),
            },
        );
        def.names
            .insert(END_MARKER.into(), SymbolID::T(TerminalID::EOI));

        f(&mut def)?;

        def.end()
    }

    /// Prepend the production `S' -> S` with a fresh single-letter `S'`.
    ///
    /// Candidate names are tried from `Z` down to `A`; a letter already used
    /// by any terminal or nonterminal is skipped.
    pub fn augment(mut self) -> Result<Grammar, GrammarError> {
        if self.augmented {
            return Err(GrammarError::AlreadyAugmented);
        }

        let name = ('A'..='Z')
            .rev()
            .map(String::from)
            .find(|name| !self.names.contains_key(name))
            .ok_or(GrammarError::AugmentExhausted)?;

        let raw = u16::try_from(self.nonterminals.len()).map_err(|_| GrammarError::TooLarge)?;
        let id = NonterminalID::new(raw);
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.clone(),
            },
        );
        self.names.insert(name, SymbolID::N(id));

        self.productions.insert(
            0,
            Production {
                id: ProductionID::ACCEPT,
                left: id,
                right: vec![SymbolID::N(self.start_symbol)],
            },
        );
        for (i, production) in self.productions.iter_mut().enumerate().skip(1) {
            production.id = ProductionID::new(u16::try_from(i).map_err(|_| GrammarError::TooLarge)?);
        }

        tracing::debug!(
            "augmented the grammar with {} → {}",
            self.nonterminal_name(id),
            self.nonterminal_name(self.start_symbol),
        );

        self.start_symbol = id;
        self.augmented = true;
        Ok(self)
    }

    pub fn is_augmented(&self) -> bool {
        self.augmented
    }

    /// The start symbol. After augmentation this is the fresh `S'`.
    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions[..]
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[id.index()]
    }

    pub fn production_by_index(&self, index: usize) -> Option<&Production> {
        self.productions.get(index)
    }

    /// Iterate the productions whose head is `n`, in grammar order.
    pub fn productions_of(&self, n: NonterminalID) -> impl Iterator<Item = &Production> + '_ {
        self.productions.iter().filter(move |p| p.left == n)
    }

    pub fn terminals(&self) -> impl Iterator<Item = &Terminal> + '_ {
        self.terminals.values()
    }

    /// The terminals that may appear in an input: declared ones first, then `$`.
    pub fn input_terminals(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.terminals
            .keys()
            .copied()
            .filter(|t| !t.is_reserved())
            .chain(Some(TerminalID::EOI))
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals.values()
    }

    /// All grammar symbols: nonterminals, then terminals, then `$`.
    pub fn symbols(&self) -> impl Iterator<Item = SymbolID> + '_ {
        self.nonterminals
            .keys()
            .map(|n| SymbolID::N(*n))
            .chain(self.input_terminals().map(SymbolID::T))
    }

    /// Look a symbol up by its name.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        self.names.get(name).copied()
    }

    pub fn terminal(&self, name: &str) -> Option<TerminalID> {
        match self.symbol(name)? {
            SymbolID::T(t) => Some(t),
            SymbolID::N(..) => None,
        }
    }

    pub fn nonterminal(&self, name: &str) -> Option<NonterminalID> {
        match self.symbol(name)? {
            SymbolID::N(n) => Some(n),
            SymbolID::T(..) => None,
        }
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        self.terminals.get(&id).map_or("<unknown>", |t| t.name())
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        self.nonterminals.get(&id).map_or("<unknown>", |n| n.name())
    }

    pub fn symbol_name(&self, symbol: SymbolID) -> &str {
        match symbol {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    /// Nonterminals that never appear as the head of a production.
    pub fn unproductive_nonterminals(&self) -> impl Iterator<Item = &Nonterminal> + '_ {
        self.nonterminals
            .values()
            .filter(|n| self.productions.iter().all(|p| p.left != n.id()))
    }
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, Terminal>,
    nonterminals: Map<NonterminalID, Nonterminal>,
    productions: Vec<Production>,
    names: Map<String, SymbolID>,
    start: Option<NonterminalID>,
    next_terminal_id: u16,
    next_nonterminal_id: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    ///
    /// Declaring the same terminal twice returns the existing id.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        verify_name(name)?;
        if is_empty_marker(name) {
            return Err(GrammarError::ReservedName(name.into()));
        }
        match self.names.get(name) {
            Some(SymbolID::T(t)) => return Ok(*t),
            Some(SymbolID::N(..)) => return Err(GrammarError::SymbolKindMismatch(name.into())),
            None => (),
        }

        let id = TerminalID::new(self.next_terminal_id);
        self.next_terminal_id = self
            .next_terminal_id
            .checked_add(1)
            .ok_or(GrammarError::TooLarge)?;
        self.terminals.insert(
            id,
            Terminal {
                id,
                name: name.into(),
            },
        );
        self.names.insert(name.into(), SymbolID::T(id));

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    ///
    /// Declaring the same nonterminal twice returns the existing id.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        verify_name(name)?;
        if name == END_MARKER || is_empty_marker(name) {
            return Err(GrammarError::ReservedName(name.into()));
        }
        match self.names.get(name) {
            Some(SymbolID::N(n)) => return Ok(*n),
            Some(SymbolID::T(..)) => return Err(GrammarError::SymbolKindMismatch(name.into())),
            None => (),
        }

        let id = NonterminalID::new(self.next_nonterminal_id);
        self.next_nonterminal_id = self
            .next_nonterminal_id
            .checked_add(1)
            .ok_or(GrammarError::TooLarge)?;
        self.nonterminals.insert(
            id,
            Nonterminal {
                id,
                name: name.into(),
            },
        );
        self.names.insert(name.into(), SymbolID::N(id));

        Ok(id)
    }

    /// Look up a symbol declared so far.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        self.names.get(name).copied()
    }

    /// Specify a production rule into this grammer.
    ///
    /// `λ` occurrences in `right` are dropped, so `[λ]` defines `A -> λ`.
    pub fn production<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        let right: Vec<SymbolID> = right
            .into_iter()
            .filter(|s| *s != SymbolID::T(TerminalID::EPSILON))
            .collect();
        if self
            .productions
            .iter()
            .any(|p| p.left == left && p.right == right)
        {
            return Err(GrammarError::DuplicateProduction(
                self.nonterminals[&left].name.clone(),
            ));
        }

        let raw = u16::try_from(self.productions.len()).map_err(|_| GrammarError::TooLarge)?;
        let id = ProductionID::new(raw);
        self.productions.push(Production { id, left, right });
        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) {
        self.start.replace(symbol);
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // 指定されていない場合は最初の構文規則の左辺を用いる
        let start_symbol = match self.start.take() {
            Some(start) => start,
            None => self
                .productions
                .first()
                .map(|p| p.left)
                .ok_or(GrammarError::NoProductions)?,
        };

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions: self.productions,
            names: self.names,
            start_symbol,
            augmented: false,
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error at line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("invalid symbol name: `{}'", _0)]
    InvalidName(String),

    #[error("`{}' is reserved and cannot be declared here", _0)]
    ReservedName(String),

    #[error("`{}' is declared as both a terminal and a nonterminal", _0)]
    SymbolKindMismatch(String),

    #[error("duplicate production rule detected for `{}'", _0)]
    DuplicateProduction(String),

    #[error("the grammar has no production rules")]
    NoProductions,

    #[error("the grammar has already been augmented")]
    AlreadyAugmented,

    #[error("grammar too large to augment: every single-letter start name is taken")]
    AugmentExhausted,

    #[error("too many symbols or productions")]
    TooLarge,
}

fn verify_name(s: &str) -> Result<(), GrammarError> {
    if s.is_empty() || s.chars().any(char::is_whitespace) || s == "|" {
        return Err(GrammarError::InvalidName(s.into()));
    }
    if s == "->" || s == "→" {
        return Err(GrammarError::InvalidName(s.into()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use SymbolID::*;

    fn simple() -> Grammar {
        Grammar::define(|g| {
            let a = g.terminal("a")?;
            let s = g.nonterminal("S")?;
            let n = g.nonterminal("A")?;
            g.production(s, [N(n)])?;
            g.production(n, [T(a)])?;
            Ok(())
        })
        .unwrap()
    }

    #[test]
    fn augment_prepends_one_production() {
        let grammar = simple();
        let before: Vec<_> = grammar
            .productions()
            .iter()
            .map(|p| (p.left(), p.right().to_vec()))
            .collect();
        let old_start = grammar.start_symbol();

        let grammar = grammar.augment().unwrap();
        assert_eq!(grammar.productions().len(), before.len() + 1);

        let accept = grammar.production(ProductionID::ACCEPT);
        assert_eq!(accept.left(), grammar.start_symbol());
        assert_eq!(accept.right(), &[N(old_start)]);
        assert_eq!(grammar.nonterminal_name(grammar.start_symbol()), "Z");

        for (i, (left, right)) in before.iter().enumerate() {
            let p = &grammar.productions()[i + 1];
            assert_eq!(p.id().index(), i + 1);
            assert_eq!(p.left(), *left);
            assert_eq!(p.right(), &right[..]);
        }
    }

    #[test]
    fn augment_skips_taken_letters() {
        let grammar = Grammar::define(|g| {
            let z = g.terminal("Z")?;
            let y = g.nonterminal("Y")?;
            g.production(y, [T(z)])?;
            Ok(())
        })
        .unwrap()
        .augment()
        .unwrap();
        assert_eq!(grammar.nonterminal_name(grammar.start_symbol()), "X");
    }

    #[test]
    fn augment_twice_is_rejected() {
        let grammar = simple().augment().unwrap();
        assert!(matches!(grammar.augment(), Err(GrammarError::AlreadyAugmented)));
    }

    #[test]
    fn augment_exhausted() {
        let grammar = Grammar::define(|g| {
            let t = g.terminal("t")?;
            for c in 'A'..='Z' {
                let n = g.nonterminal(&c.to_string())?;
                g.production(n, [T(t)])?;
            }
            Ok(())
        })
        .unwrap();
        assert!(matches!(grammar.augment(), Err(GrammarError::AugmentExhausted)));
    }

    #[test]
    fn symbol_kinds_are_exclusive() {
        let res = Grammar::define(|g| {
            g.terminal("x")?;
            g.nonterminal("x")?;
            Ok(())
        });
        assert!(matches!(res, Err(GrammarError::SymbolKindMismatch(..))));
    }

    #[test]
    fn lambda_is_dropped_from_bodies() {
        let grammar = Grammar::define(|g| {
            let s = g.nonterminal("S")?;
            g.production(s, [T(TerminalID::EPSILON)])?;
            Ok(())
        })
        .unwrap();
        assert!(grammar.productions()[0].right().is_empty());
        assert_eq!(
            grammar.productions()[0].display(&grammar).to_string(),
            "S → λ"
        );
    }

    #[test]
    fn terminal_set_equality_ignores_insertion_history() {
        let mut a = TerminalSet::new();
        a.insert(TerminalID::from_raw(40));
        a.remove(TerminalID::from_raw(40));
        a.insert(TerminalID::EOI);
        let b: TerminalSet = Some(TerminalID::EOI).into_iter().collect();
        assert_eq!(a, b);
    }
}
