//! The shift-reduce driver that replays an LR table against an input.

use crate::{
    automaton::StateID,
    grammar::{Grammar, SymbolID, TerminalID},
    table::{Action, Table},
    trace::{tokenize, Outcome, ParseError, SimulateConfig, Step, StepAction, Trace},
};

/// Run the table over the whitespace-separated `input`.
///
/// Input errors and table inconsistencies are recorded as the last step of
/// the returned trace.
pub fn simulate(g: &Grammar, table: &Table, input: &str, config: &SimulateConfig) -> Trace {
    let span = tracing::trace_span!("simulate", variant = %table.variant());
    let _entered = span.enter();

    let mut engine = ParseEngine {
        grammar: g,
        table,
        states_stack: vec![StateID::START],
        symbols_stack: vec![],
        tokens: vec![],
        names: vec![],
        cursor: 0,
    };

    let (tokens, names) = match tokenize(g, input) {
        Ok(tokens) => tokens,
        Err(err) => {
            engine.names = input.split_whitespace().map(String::from).collect();
            let step = engine.snapshot(StepAction::Error(err));
            return Trace {
                steps: vec![step],
                outcome: Outcome::Rejected,
                tree: None,
            };
        }
    };
    engine.tokens = tokens;
    engine.names = names;

    let mut steps = vec![];
    let outcome = loop {
        if steps.len() >= config.max_steps {
            tracing::debug!("gave up after {} steps", steps.len());
            steps.push(engine.snapshot(StepAction::StepLimit));
            break Outcome::StepLimit;
        }

        let snapshot = engine.snapshot(StepAction::Accept);
        let (action, outcome) = engine.step();
        steps.push(Step { action, ..snapshot });
        if let Some(outcome) = outcome {
            break outcome;
        }
    };

    tracing::debug!("{:?} after {} steps", outcome, steps.len());
    Trace {
        steps,
        outcome,
        tree: None,
    }
}

/// Pick the action to perform from a cell: `Accept`, then the shift, then
/// the reduction by the production with the lowest index.
pub fn choose(action: &Action) -> Option<&Action> {
    match action {
        Action::Conflict(actions) => actions
            .iter()
            .find(|a| matches!(a, Action::Accept))
            .or_else(|| actions.iter().find(|a| matches!(a, Action::Shift(..))))
            .or_else(|| {
                actions
                    .iter()
                    .filter_map(|a| match a {
                        Action::Reduce(p) => Some((p, a)),
                        _ => None,
                    })
                    .min_by_key(|(p, _)| **p)
                    .map(|(_, a)| a)
            }),
        Action::Goto(..) => None,
        action => Some(action),
    }
}

#[derive(Debug)]
struct ParseEngine<'t> {
    grammar: &'t Grammar,
    table: &'t Table,
    states_stack: Vec<StateID>,
    symbols_stack: Vec<SymbolID>,
    tokens: Vec<TerminalID>,
    names: Vec<String>,
    cursor: usize,
}

impl ParseEngine<'_> {
    fn snapshot(&self, action: StepAction) -> Step {
        Step {
            stack: self
                .states_stack
                .iter()
                .rev()
                .map(|s| self.table.label(*s).to_owned())
                .collect(),
            symbols: self
                .symbols_stack
                .iter()
                .rev()
                .map(|s| self.grammar.symbol_name(*s).to_owned())
                .collect(),
            input: self.names.get(self.cursor..).unwrap_or_default().to_vec(),
            action,
        }
    }

    fn lookahead(&self) -> TerminalID {
        self.tokens
            .get(self.cursor)
            .copied()
            .unwrap_or(TerminalID::EOI)
    }

    fn current(&self) -> StateID {
        self.states_stack.last().copied().unwrap_or(StateID::START)
    }

    /// Perform one action. Returns the outcome when the run is over.
    fn step(&mut self) -> (StepAction, Option<Outcome>) {
        let current = self.current();
        let lookahead = self.lookahead();

        let cell = self.table.action(current, SymbolID::T(lookahead));
        let (performed, outcome) = match cell.and_then(choose) {
            Some(Action::Accept) => (StepAction::Accept, Some(Outcome::Accepted)),

            Some(Action::Shift(next)) => {
                self.states_stack.push(*next);
                self.symbols_stack.push(SymbolID::T(lookahead));
                self.cursor += 1;
                let label = self.table.label(*next).to_owned();
                (StepAction::Shift { state: *next, label }, None)
            }

            Some(Action::Reduce(p)) => {
                let production = self.grammar.production(*p);
                let n = production.right().len();
                let reduce = StepAction::Reduce {
                    production: *p,
                    text: production.display(self.grammar).to_string(),
                };

                // 状態スタックの底は残す
                let goto = if self.states_stack.len() > n {
                    self.states_stack.truncate(self.states_stack.len() - n);
                    self.symbols_stack
                        .truncate(self.symbols_stack.len().saturating_sub(n));
                    let top = self.current();
                    match self.table.action(top, SymbolID::N(production.left())) {
                        Some(Action::Goto(next)) => Ok(*next),
                        _ => Err(top),
                    }
                } else {
                    Err(self.current())
                };

                match goto {
                    Ok(next) => {
                        self.states_stack.push(next);
                        self.symbols_stack.push(SymbolID::N(production.left()));
                        (reduce, None)
                    }
                    Err(top) => {
                        let err = ParseError::MissingGoto {
                            state: self.table.label(top).to_owned(),
                            nonterminal: self
                                .grammar
                                .nonterminal_name(production.left())
                                .to_owned(),
                            production: *p,
                        };
                        tracing::error!("{}", err);
                        (StepAction::Error(err), Some(Outcome::InconsistentTable))
                    }
                }
            }

            Some(Action::Goto(..) | Action::Conflict(..)) | None => {
                let err = ParseError::NoAction {
                    state: self.table.label(current).to_owned(),
                    token: self.grammar.terminal_name(lookahead).to_owned(),
                    position: self.cursor,
                };
                tracing::trace!("{}", err);
                return (StepAction::Error(err), Some(Outcome::Rejected));
            }
        };

        match cell {
            Some(cell @ Action::Conflict(..)) => {
                let conflict = StepAction::Conflict {
                    chosen: Box::new(performed),
                    alternatives: cell.display(self.table).to_string(),
                };
                (conflict, outcome)
            }
            _ => (performed, outcome),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        automaton::Automaton, build::Variant, first_follow::FirstFollow, grammar::ProductionID,
        lalr,
    };

    fn expr() -> (Grammar, FirstFollow) {
        let g = Grammar::from_text(
            "E|T|F",
            "+|*|(|)|id",
            "E -> E + T | T\nT -> T * F | F\nF -> ( E ) | id",
        )
        .unwrap()
        .augment()
        .unwrap();
        let ff = FirstFollow::compute(&g);
        (g, ff)
    }

    #[test]
    fn clr_accepts_and_rejects() {
        let (g, ff) = expr();
        let canonical = Automaton::canonical(&g, &ff).unwrap();
        let table = Table::build(&g, &ff, &canonical, Variant::Clr1).unwrap();
        let config = SimulateConfig::default();

        let trace = simulate(&g, &table, "id + id * id", &config);
        assert_eq!(trace.outcome(), Outcome::Accepted);
        assert_eq!(trace.steps().last().map(|s| &s.action), Some(&StepAction::Accept));

        let first = &trace.steps()[0];
        assert_eq!(first.stack, ["0"]);
        assert!(first.symbols.is_empty());
        assert_eq!(first.input, ["id", "+", "id", "*", "id", "$"]);
        assert!(matches!(first.action, StepAction::Shift { .. }));

        let trace = simulate(&g, &table, "id + + id", &config);
        assert_eq!(trace.outcome(), Outcome::Rejected);
        assert!(matches!(
            trace.error(),
            Some(ParseError::NoAction { token, position: 2, .. }) if token == "+"
        ));
    }

    #[test]
    fn lalr_agrees_with_clr() {
        let (g, ff) = expr();
        let canonical = Automaton::canonical(&g, &ff).unwrap();
        let lalr = lalr::merge(&canonical).unwrap();
        let clr_table = Table::build(&g, &ff, &canonical, Variant::Clr1).unwrap();
        let lalr_table = Table::build(&g, &ff, &lalr, Variant::Lalr1).unwrap();
        assert!(lalr.len() <= canonical.len());

        let config = SimulateConfig::default();
        for input in [
            "id",
            "id + id * id",
            "( id + id ) * id",
            "( ( id ) )",
            "id + + id",
            "( id",
            "id id",
            "",
        ] {
            let clr = simulate(&g, &clr_table, input, &config);
            let lalr = simulate(&g, &lalr_table, input, &config);
            assert_eq!(clr.is_accepted(), lalr.is_accepted(), "input: {:?}", input);
        }
    }

    #[test]
    fn reductions_are_reported() {
        let (g, ff) = expr();
        let lr0 = Automaton::lr0(&g, &ff).unwrap();
        let table = Table::build(&g, &ff, &lr0, Variant::Slr1).unwrap();
        let trace = simulate(&g, &table, "id", &SimulateConfig::default());
        let actions: Vec<_> = trace.steps().iter().map(|s| s.action.to_string()).collect();
        assert_eq!(
            actions,
            [
                "Shift 5",
                "Reduce 6: F → id",
                "Reduce 4: T → F",
                "Reduce 2: E → T",
                "Accept",
            ]
        );
    }

    #[test]
    fn step_limit() {
        let (g, ff) = expr();
        let lr0 = Automaton::lr0(&g, &ff).unwrap();
        let table = Table::build(&g, &ff, &lr0, Variant::Slr1).unwrap();
        let trace = simulate(&g, &table, "id + id", SimulateConfig::new().max_steps(3));
        assert_eq!(trace.outcome(), Outcome::StepLimit);
        assert_eq!(trace.steps().len(), 4);
        assert_eq!(trace.steps()[3].action, StepAction::StepLimit);
    }

    #[test]
    fn unknown_tokens_are_rejected() {
        let (g, ff) = expr();
        let lr0 = Automaton::lr0(&g, &ff).unwrap();
        let table = Table::build(&g, &ff, &lr0, Variant::Slr1).unwrap();
        let trace = simulate(&g, &table, "id - id", &SimulateConfig::default());
        assert_eq!(trace.outcome(), Outcome::Rejected);
        assert_eq!(trace.steps().len(), 1);
        assert!(matches!(trace.error(), Some(ParseError::UnknownToken { .. })));
    }

    #[test]
    fn conflicts_prefer_shift() {
        // dangling else: `i i a e a` shifts `e` onto the inner `i`
        let g = Grammar::from_text("S", "i|e|a", "S -> i S e S | i S | a")
            .unwrap()
            .augment()
            .unwrap();
        let ff = FirstFollow::compute(&g);
        let lr0 = Automaton::lr0(&g, &ff).unwrap();
        let table = Table::build(&g, &ff, &lr0, Variant::Lr0).unwrap();

        let trace = simulate(&g, &table, "i i a e a", &SimulateConfig::default());
        assert!(trace.is_accepted());
        let conflict = trace
            .steps()
            .iter()
            .find(|s| matches!(s.action, StepAction::Conflict { .. }))
            .unwrap();
        assert!(matches!(
            conflict.action.performed(),
            StepAction::Shift { .. }
        ));
    }

    #[test]
    fn tie_break_order() {
        let g = Grammar::from_text("S", "a|b|c", "S -> a\nS -> b\nS -> c").unwrap();
        let (r1, r2) = (g.productions()[1].id(), g.productions()[2].id());
        let s = |raw| Action::Shift(StateID::from_raw(raw));

        let cell = Action::Conflict(vec![Action::Reduce(r2), Action::Reduce(r1)]);
        assert_eq!(choose(&cell), Some(&Action::Reduce(r1)));

        let cell = Action::Conflict(vec![Action::Reduce(r1), s(4)]);
        assert_eq!(choose(&cell), Some(&s(4)));

        let cell = Action::Conflict(vec![Action::Reduce(ProductionID::ACCEPT), Action::Accept]);
        assert_eq!(choose(&cell), Some(&Action::Accept));

        assert_eq!(choose(&Action::Goto(StateID::START)), None);
    }
}
