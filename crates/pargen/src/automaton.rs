//! The canonical collection of LR item sets.

use crate::{
    build::BuildError,
    first_follow::FirstFollow,
    grammar::{Grammar, SymbolID},
    item::{ItemEngine, ItemSet, ItemSetKey, Mode},
    types::{Map, Set},
    util::display_fn,
};
use std::{collections::VecDeque, fmt};

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StateID(u16);

impl StateID {
    /// The state containing the augmented start item.
    pub const START: Self = Self(0);

    pub const fn from_raw(raw: u16) -> Self {
        Self(raw)
    }

    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Debug for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "S#{:03}", self.0)
    }
}

impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// How the states of an automaton were obtained.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Kind {
    /// LR(0) item sets, identified by their cores.
    Lr0,
    /// Canonical LR(1) item sets, identified by cores and lookaheads.
    Canonical,
    /// Canonical LR(1) states merged by their cores.
    Lalr,
}

impl Kind {
    pub fn mode(self) -> Mode {
        match self {
            Self::Lr0 => Mode::Lr0,
            Self::Canonical | Self::Lalr => Mode::Lr1,
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Lr0 => "LR(0)",
            Self::Canonical => "canonical LR(1)",
            Self::Lalr => "LALR(1)",
        })
    }
}

#[derive(Debug, Clone)]
pub struct State {
    pub(crate) id: StateID,
    pub(crate) label: String,
    pub(crate) items: ItemSet,
    pub(crate) transitions: Map<SymbolID, StateID>,
    pub(crate) merged_from: Vec<StateID>,
}

impl State {
    pub fn id(&self) -> StateID {
        self.id
    }

    /// The state name shown to users.
    ///
    /// The decimal id for LR(0) and canonical LR(1) states; for LALR(1)
    /// states, the ids of the merged canonical states in ascending order.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// The closed item set, kernel items first.
    pub fn items(&self) -> &ItemSet {
        &self.items
    }

    pub fn transitions(&self) -> impl Iterator<Item = (SymbolID, StateID)> + '_ {
        self.transitions.iter().map(|(symbol, to)| (*symbol, *to))
    }

    pub fn transition(&self, symbol: SymbolID) -> Option<StateID> {
        self.transitions.get(&symbol).copied()
    }

    /// The canonical states this state was built from.
    pub fn merged_from(&self) -> &[StateID] {
        &self.merged_from[..]
    }
}

#[derive(Debug)]
pub struct Automaton {
    kind: Kind,
    states: Vec<State>,
}

impl Automaton {
    /// Calculate the LR(0) collection of the augmented grammar.
    pub fn lr0(g: &Grammar, first_follow: &FirstFollow) -> Result<Self, BuildError> {
        calc_states(g, first_follow, Kind::Lr0)
    }

    /// Calculate the canonical LR(1) collection of the augmented grammar.
    pub fn canonical(g: &Grammar, first_follow: &FirstFollow) -> Result<Self, BuildError> {
        calc_states(g, first_follow, Kind::Canonical)
    }

    pub(crate) fn from_states(kind: Kind, states: Vec<State>) -> Self {
        Self { kind, states }
    }

    pub fn kind(&self) -> Kind {
        self.kind
    }

    pub fn states(&self) -> &[State] {
        &self.states[..]
    }

    pub fn state(&self, id: StateID) -> &State {
        &self.states[id.index()]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn initial(&self) -> StateID {
        StateID::START
    }

    /// Look a state up by its label.
    pub fn find(&self, label: &str) -> Option<&State> {
        self.states.iter().find(|s| s.label == label)
    }

    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            for (i, state) in self.states.iter().enumerate() {
                if i > 0 {
                    writeln!(f)?;
                }
                writeln!(f, "#### State {}", state.label)?;
                write!(f, "{}", state.items.display(g))?;
                for (symbol, to) in &state.transitions {
                    writeln!(
                        f,
                        "- {} => {}",
                        g.symbol_name(*symbol),
                        self.state(*to).label
                    )?;
                }
            }
            Ok(())
        })
    }
}

fn calc_states(g: &Grammar, first_follow: &FirstFollow, kind: Kind) -> Result<Automaton, BuildError> {
    if !g.is_augmented() {
        return Err(BuildError::NotAugmented);
    }

    let span = tracing::trace_span!("calc_states", ?kind);
    let _entered = span.enter();

    let mode = kind.mode();
    let engine = ItemEngine::new(g, first_follow, mode);

    // 状態番号は構築ごとに 0 から振り直す
    let mut state_id = {
        let mut next_state_id: u16 = 0;
        move || -> Result<StateID, BuildError> {
            let id = StateID(next_state_id);
            next_state_id = next_state_id
                .checked_add(1)
                .ok_or(BuildError::TooManyStates)?;
            Ok(id)
        }
    };

    let mut states: Vec<State> = vec![];
    let mut known = Map::<ItemSetKey, StateID>::default();
    let mut pending = VecDeque::<(StateID, ItemSet)>::new();

    let start = engine.start();
    let id = state_id()?;
    known.insert(start.key(mode), id);
    pending.push_back((id, start));

    let mut next_symbols = Set::<SymbolID>::default();
    while let Some((current, items)) = pending.pop_front() {
        next_symbols.clear();
        next_symbols.extend(items.cores().filter_map(|core| core.next_symbol(g)));

        let mut transitions = Map::default();
        for symbol in g.symbols().filter(|s| next_symbols.contains(s)) {
            let target = engine.goto(&items, symbol);
            if target.is_empty() {
                continue;
            }
            let key = target.key(mode);
            let next = match known.get(&key) {
                Some(id) => *id,
                None => {
                    let id = state_id()?;
                    known.insert(key, id);
                    pending.push_back((id, target));
                    id
                }
            };
            transitions.insert(symbol, next);
        }

        states.push(State {
            id: current,
            label: current.to_string(),
            items,
            transitions,
            merged_from: vec![current],
        });
    }

    tracing::debug!("{} collection: {} states", kind, states.len());

    Ok(Automaton::from_states(kind, states))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn expr() -> Grammar {
        Grammar::from_text(
            "E|T|F",
            "+|*|(|)|id",
            "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id",
        )
        .unwrap()
        .augment()
        .unwrap()
    }

    #[test]
    fn classic_state_counts() {
        let g = expr();
        let ff = FirstFollow::compute(&g);
        assert_eq!(Automaton::lr0(&g, &ff).unwrap().len(), 12);
        assert_eq!(Automaton::canonical(&g, &ff).unwrap().len(), 22);
    }

    #[test]
    fn ids_follow_discovery_order() {
        let g = expr();
        let ff = FirstFollow::compute(&g);
        let automaton = Automaton::canonical(&g, &ff).unwrap();
        for (i, state) in automaton.states().iter().enumerate() {
            assert_eq!(state.id().index(), i);
            assert_eq!(state.label(), i.to_string());
        }

        // the first transition of the start state is on the first nonterminal
        let e = SymbolID::N(g.nonterminal("E").unwrap());
        assert_eq!(
            automaton.state(StateID::START).transition(e),
            Some(StateID::from_raw(1))
        );
    }

    #[test]
    fn states_are_unique() {
        let g = expr();
        let ff = FirstFollow::compute(&g);
        for automaton in [
            Automaton::lr0(&g, &ff).unwrap(),
            Automaton::canonical(&g, &ff).unwrap(),
        ] {
            let mode = automaton.kind().mode();
            let keys: Set<_> = automaton.states().iter().map(|s| s.items().key(mode)).collect();
            assert_eq!(keys.len(), automaton.len());
        }
    }

    #[test]
    fn rebuilding_restarts_numbering() {
        let g = expr();
        let ff = FirstFollow::compute(&g);
        let first = Automaton::lr0(&g, &ff).unwrap();
        let second = Automaton::lr0(&g, &ff).unwrap();
        let labels = |a: &Automaton| a.states().iter().map(|s| s.label().to_owned()).collect::<Vec<_>>();
        assert_eq!(labels(&first), labels(&second));
    }

    #[test]
    fn requires_augmentation() {
        let g = Grammar::from_text("S", "a", "S -> a").unwrap();
        let ff = FirstFollow::compute(&g);
        assert!(matches!(
            Automaton::lr0(&g, &ff),
            Err(BuildError::NotAugmented)
        ));
    }
}
