//! The single entry point running every phase of one build.

use crate::{
    automaton::{Automaton, Kind},
    engine,
    first_follow::FirstFollow,
    grammar::{Grammar, GrammarError},
    lalr,
    ll1::Ll1Table,
    predictive,
    table::Table,
    trace::{SimulateConfig, Trace},
};
use std::{fmt, str::FromStr};

/// The parsing algorithm a build targets.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum Variant {
    Ll1,
    Lr0,
    Slr1,
    Lalr1,
    Clr1,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::Ll1,
        Variant::Lr0,
        Variant::Slr1,
        Variant::Lalr1,
        Variant::Clr1,
    ];

    /// The short name accepted by [`FromStr`].
    pub fn name(self) -> &'static str {
        match self {
            Self::Ll1 => "ll1",
            Self::Lr0 => "lr0",
            Self::Slr1 => "slr1",
            Self::Lalr1 => "lalr1",
            Self::Clr1 => "clr1",
        }
    }

    pub fn is_lr(self) -> bool {
        !matches!(self, Self::Ll1)
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ll1 => "LL(1)",
            Self::Lr0 => "LR(0)",
            Self::Slr1 => "SLR(1)",
            Self::Lalr1 => "LALR(1)",
            Self::Clr1 => "CLR(1)",
        })
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown algorithm `{}' (expected one of ll1, lr0, slr1, lalr1, clr1)", _0)]
pub struct UnknownVariant(String);

impl FromStr for Variant {
    type Err = UnknownVariant;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| c.is_ascii_alphanumeric())
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "ll1" | "ll" => Ok(Self::Ll1),
            "lr0" => Ok(Self::Lr0),
            "slr1" | "slr" => Ok(Self::Slr1),
            "lalr1" | "lalr" => Ok(Self::Lalr1),
            "clr1" | "clr" | "lr1" => Ok(Self::Clr1),
            _ => Err(UnknownVariant(s.into())),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("grammar error")]
    Grammar(
        #[from]
        #[source]
        GrammarError,
    ),

    #[error("the item sets must be computed on the augmented grammar")]
    NotAugmented,

    #[error("too many states")]
    TooManyStates,

    #[error("expected the {expected} collection, found the {found} one")]
    AutomatonMismatch { expected: Kind, found: Kind },

    #[error("{} is not an LR algorithm", _0)]
    NotLr(Variant),
}

#[derive(Debug)]
enum Tables {
    Ll1(Ll1Table),
    Lr {
        automaton: Automaton,
        canonical: Option<Automaton>,
        table: Table,
    },
}

/// Everything computed by one build.
#[derive(Debug)]
pub struct BuiltArtifacts {
    variant: Variant,
    grammar: Grammar,
    first_follow: FirstFollow,
    tables: Tables,
}

/// Run every phase for `variant` on `grammar`.
///
/// LR variants augment the grammar first. Each phase runs to completion
/// before the next reads its result.
pub fn build(grammar: Grammar, variant: Variant) -> Result<BuiltArtifacts, BuildError> {
    let span = tracing::trace_span!("build", %variant);
    let _entered = span.enter();

    for n in grammar.unproductive_nonterminals() {
        tracing::warn!("nonterminal `{}' has no production", n.name());
    }

    let grammar = if variant.is_lr() && !grammar.is_augmented() {
        grammar.augment()?
    } else {
        grammar
    };

    let first_follow = FirstFollow::compute(&grammar);

    let tables = match variant {
        Variant::Ll1 => Tables::Ll1(Ll1Table::build(&grammar, &first_follow)),
        Variant::Lr0 | Variant::Slr1 => {
            let automaton = Automaton::lr0(&grammar, &first_follow)?;
            let table = Table::build(&grammar, &first_follow, &automaton, variant)?;
            Tables::Lr {
                automaton,
                canonical: None,
                table,
            }
        }
        Variant::Clr1 => {
            let automaton = Automaton::canonical(&grammar, &first_follow)?;
            let table = Table::build(&grammar, &first_follow, &automaton, variant)?;
            Tables::Lr {
                automaton,
                canonical: None,
                table,
            }
        }
        Variant::Lalr1 => {
            let canonical = Automaton::canonical(&grammar, &first_follow)?;
            let automaton = lalr::merge(&canonical)?;
            let table = Table::build(&grammar, &first_follow, &automaton, variant)?;
            Tables::Lr {
                automaton,
                canonical: Some(canonical),
                table,
            }
        }
    };

    Ok(BuiltArtifacts {
        variant,
        grammar,
        first_follow,
        tables,
    })
}

impl BuiltArtifacts {
    pub fn variant(&self) -> Variant {
        self.variant
    }

    /// The grammar the tables refer to, augmented for LR variants.
    pub fn grammar(&self) -> &Grammar {
        &self.grammar
    }

    pub fn first_follow(&self) -> &FirstFollow {
        &self.first_follow
    }

    /// The collection the LR table was built from.
    pub fn automaton(&self) -> Option<&Automaton> {
        match &self.tables {
            Tables::Lr { automaton, .. } => Some(automaton),
            Tables::Ll1(..) => None,
        }
    }

    /// The canonical LR(1) collection an LALR(1) build merged.
    pub fn canonical(&self) -> Option<&Automaton> {
        match &self.tables {
            Tables::Lr { canonical, .. } => canonical.as_ref(),
            Tables::Ll1(..) => None,
        }
    }

    pub fn table(&self) -> Option<&Table> {
        match &self.tables {
            Tables::Lr { table, .. } => Some(table),
            Tables::Ll1(..) => None,
        }
    }

    pub fn ll1_table(&self) -> Option<&Ll1Table> {
        match &self.tables {
            Tables::Ll1(table) => Some(table),
            Tables::Lr { .. } => None,
        }
    }

    /// The number of conflicting cells.
    pub fn conflict_count(&self) -> usize {
        match &self.tables {
            Tables::Lr { table, .. } => table.conflicts().len(),
            Tables::Ll1(table) => table.conflicts().len(),
        }
    }

    /// Simulate the built table on the whitespace-separated `input`.
    pub fn parse(&self, input: &str, config: &SimulateConfig) -> Trace {
        match &self.tables {
            Tables::Lr { table, .. } => engine::simulate(&self.grammar, table, input, config),
            Tables::Ll1(table) => predictive::simulate(&self.grammar, table, input, config),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::Outcome;

    fn expr() -> Grammar {
        Grammar::from_text(
            "E|T|F",
            "+|*|(|)|id",
            "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id",
        )
        .unwrap()
    }

    #[test]
    fn variant_names() {
        for variant in Variant::ALL {
            assert_eq!(variant.name().parse::<Variant>().unwrap(), variant);
        }
        assert_eq!("LALR(1)".parse::<Variant>().unwrap(), Variant::Lalr1);
        assert!("lr2".parse::<Variant>().is_err());
    }

    #[test]
    fn lr_builds_augment() {
        let artifacts = build(expr(), Variant::Lalr1).unwrap();
        assert!(artifacts.grammar().is_augmented());
        assert!(artifacts.canonical().is_some());
        assert_eq!(artifacts.conflict_count(), 0);
        assert!(artifacts.parse("id * ( id + id )", &SimulateConfig::default()).is_accepted());
    }

    #[test]
    fn ll1_build_keeps_grammar() {
        let g = Grammar::from_text("S", "a", "S -> a S | λ").unwrap();
        let artifacts = build(g, Variant::Ll1).unwrap();
        assert!(!artifacts.grammar().is_augmented());
        assert!(artifacts.automaton().is_none());
        assert!(artifacts.ll1_table().is_some());
        let trace = artifacts.parse("a a", &SimulateConfig::default());
        assert_eq!(trace.outcome(), Outcome::Accepted);
    }

    #[test]
    fn all_variants_agree_on_expressions() {
        let inputs = [("id + id * id", true), ("id + + id", false), ("( id", false)];
        for variant in [Variant::Slr1, Variant::Lalr1, Variant::Clr1] {
            let artifacts = build(expr(), variant).unwrap();
            for (input, accepted) in inputs {
                let trace = artifacts.parse(input, &SimulateConfig::default());
                assert_eq!(trace.is_accepted(), accepted, "{} on {:?}", variant, input);
            }
        }
    }

    #[test]
    fn augmentation_errors_abort() {
        let g = Grammar::define(|g| {
            let t = g.terminal("t")?;
            for c in 'A'..='Z' {
                let n = g.nonterminal(&c.to_string())?;
                g.production(n, [crate::grammar::SymbolID::T(t)])?;
            }
            Ok(())
        })
        .unwrap();
        assert!(matches!(
            build(g, Variant::Clr1),
            Err(BuildError::Grammar(GrammarError::AugmentExhausted))
        ));
    }
}
