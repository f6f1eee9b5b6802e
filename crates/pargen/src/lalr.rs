//! LALR(1) construction by merging canonical LR(1) states with equal cores.

use crate::{
    automaton::{Automaton, Kind, State, StateID},
    build::BuildError,
    item::ItemCore,
    types::{Map, Set},
};

/// Merge the states of a canonical LR(1) collection whose item cores are equal.
///
/// Every merged state holds, for each core, the union of the lookaheads of
/// all its members. States are enumerated by their smallest member, so the
/// state holding the start item stays first.
pub fn merge(canonical: &Automaton) -> Result<Automaton, BuildError> {
    if canonical.kind() != Kind::Canonical {
        return Err(BuildError::AutomatonMismatch {
            expected: Kind::Canonical,
            found: canonical.kind(),
        });
    }

    let span = tracing::trace_span!("lalr_merge");
    let _entered = span.enter();

    // canonical states are visited in id order, so every group is keyed
    // by the first occurrence of its smallest member
    let mut groups = Map::<Vec<ItemCore>, Vec<StateID>>::default();
    for state in canonical.states() {
        groups
            .entry(state.items().sorted_cores())
            .or_default()
            .push(state.id());
    }

    let mut remap = Map::<StateID, StateID>::default();
    for (i, members) in groups.values().enumerate() {
        let id = u16::try_from(i)
            .map(StateID::from_raw)
            .map_err(|_| BuildError::TooManyStates)?;
        for member in members {
            remap.insert(*member, id);
        }
    }

    let labels = merged_labels(groups.values());

    let mut states = Vec::with_capacity(groups.len());
    for (members, label) in groups.values().zip(labels) {
        let (first, rest) = match members.split_first() {
            Some(split) => split,
            None => continue,
        };
        let id = remap[first];
        let first = canonical.state(*first);

        let mut items = first.items().clone();
        for member in rest {
            for (core, lookaheads) in canonical.state(*member).items().iter() {
                items.insert(core, lookaheads);
            }
        }

        // 同じコアを持つ状態の遷移先は同じグループに属する
        let transitions = first
            .transitions()
            .map(|(symbol, to)| (symbol, remap[&to]))
            .collect();

        if rest.is_empty() {
            tracing::trace!("state {} kept as {}", first.label(), label);
        } else {
            tracing::trace!("merged {} canonical states into {}", members.len(), label);
        }

        states.push(State {
            id,
            label,
            items,
            transitions,
            merged_from: members.clone(),
        });
    }

    tracing::debug!(
        "LALR(1) collection: {} states merged from {}",
        states.len(),
        canonical.len()
    );

    Ok(Automaton::from_states(Kind::Lalr, states))
}

/// Concatenate the member ids of each group.
///
/// Plain concatenation is ambiguous once ids reach two digits (`1`+`12`
/// and `11`+`2` both read `112`); if any two labels coincide, every label
/// is joined with `-` instead.
fn merged_labels<'a, I>(groups: I) -> Vec<String>
where
    I: Iterator<Item = &'a Vec<StateID>> + Clone,
{
    let join = |sep: &str| -> Vec<String> {
        groups
            .clone()
            .map(|members| {
                members
                    .iter()
                    .map(|id| id.to_string())
                    .collect::<Vec<_>>()
                    .join(sep)
            })
            .collect()
    };

    let labels = join("");
    let unique: Set<&String> = labels.iter().collect();
    if unique.len() == labels.len() {
        return labels;
    }
    tracing::debug!("merged state labels collide, joining member ids with `-'");
    join("-")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{first_follow::FirstFollow, grammar::Grammar};

    fn automata(nonterminals: &str, terminals: &str, productions: &str) -> (Grammar, Automaton, Automaton) {
        let g = Grammar::from_text(nonterminals, terminals, productions)
            .unwrap()
            .augment()
            .unwrap();
        let ff = FirstFollow::compute(&g);
        let canonical = Automaton::canonical(&g, &ff).unwrap();
        let lalr = merge(&canonical).unwrap();
        (g, canonical, lalr)
    }

    #[test]
    fn expression_grammar_collapses_to_lr0_size() {
        let (g, canonical, lalr) = automata(
            "E|T|F",
            "+|*|(|)|id",
            "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id",
        );
        let ff = FirstFollow::compute(&g);
        assert!(lalr.len() <= canonical.len());
        assert_eq!(lalr.len(), Automaton::lr0(&g, &ff).unwrap().len());
        assert_eq!(lalr.kind(), Kind::Lalr);
    }

    #[test]
    fn labels_concatenate_members() {
        // S -> C C, C -> c C | d: canonical states 3/6, 4/7 and 8/9 merge.
        let (_, canonical, lalr) = automata("S|C", "c|d", "S -> C C\nC -> c C | d");
        assert_eq!(canonical.len(), 10);
        assert_eq!(lalr.len(), 7);

        let labels: Vec<_> = lalr.states().iter().map(|s| s.label()).collect();
        assert_eq!(labels, ["0", "1", "2", "36", "47", "5", "89"]);
        assert_eq!(lalr.state(StateID::START).merged_from(), &[StateID::START]);
        assert!(lalr.find("36").is_some());
    }

    #[test]
    fn lookaheads_are_unioned() {
        let (g, _, lalr) = automata("S|C", "c|d", "S -> C C\nC -> c C | d");
        let state = lalr.find("47").unwrap();
        let core = ItemCore::from_text(&g, "C → d ●").unwrap();
        let lookaheads: Vec<_> = state
            .items()
            .lookaheads(&core)
            .unwrap()
            .iter()
            .map(|t| g.terminal_name(t))
            .collect();
        assert_eq!(lookaheads, ["$", "c", "d"]);
    }

    #[test]
    fn rejects_non_canonical_input() {
        let g = Grammar::from_text("S", "a", "S -> a").unwrap().augment().unwrap();
        let ff = FirstFollow::compute(&g);
        let lr0 = Automaton::lr0(&g, &ff).unwrap();
        assert!(matches!(
            merge(&lr0),
            Err(BuildError::AutomatonMismatch { .. })
        ));
    }

    #[test]
    fn colliding_labels_fall_back_to_separators() {
        let groups = vec![
            vec![StateID::from_raw(1), StateID::from_raw(12)],
            vec![StateID::from_raw(112)],
        ];
        assert_eq!(merged_labels(groups.iter()), ["1-12", "112"]);

        let groups = vec![vec![StateID::from_raw(3), StateID::from_raw(6)]];
        assert_eq!(merged_labels(groups.iter()), ["36"]);
    }
}
