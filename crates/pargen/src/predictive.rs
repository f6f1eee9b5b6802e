//! The predictive driver for LL(1) tables.

use crate::{
    grammar::{Grammar, SymbolID, TerminalID},
    ll1::Ll1Table,
    trace::{
        tokenize, NodeID, NodeLabel, Outcome, ParseError, ParseTree, SimulateConfig, Step,
        StepAction, Trace,
    },
};

/// Run the table over the whitespace-separated `input`, building the parse
/// tree in lockstep.
pub fn simulate(g: &Grammar, table: &Ll1Table, input: &str, config: &SimulateConfig) -> Trace {
    let span = tracing::trace_span!("simulate", variant = "LL(1)");
    let _entered = span.enter();

    let start = SymbolID::N(g.start_symbol());
    let mut tree = ParseTree::new(start);
    let mut stack: Vec<(SymbolID, Option<NodeID>)> = vec![
        (SymbolID::T(TerminalID::EOI), None),
        (start, Some(tree.root())),
    ];

    let snapshot = |stack: &[(SymbolID, Option<NodeID>)], names: &[String], action| Step {
        stack: stack
            .iter()
            .rev()
            .map(|(symbol, _)| g.symbol_name(*symbol).to_owned())
            .collect(),
        symbols: vec![],
        input: names.to_vec(),
        action,
    };

    let (tokens, names) = match tokenize(g, input) {
        Ok(tokens) => tokens,
        Err(err) => {
            let names: Vec<String> = input.split_whitespace().map(String::from).collect();
            return Trace {
                steps: vec![snapshot(&stack, &names, StepAction::Error(err))],
                outcome: Outcome::Rejected,
                tree: Some(tree),
            };
        }
    };

    let mut cursor = 0;
    let mut steps = vec![];
    let outcome = loop {
        let remaining = names.get(cursor..).unwrap_or_default();
        if steps.len() >= config.max_steps {
            steps.push(snapshot(&stack, remaining, StepAction::StepLimit));
            break Outcome::StepLimit;
        }

        let lookahead = tokens.get(cursor).copied().unwrap_or(TerminalID::EOI);
        let (top, node) = match stack.last() {
            Some(top) => *top,
            None => {
                // `$` は入力の末尾でのみ照合されるため、ここには到達しない
                break Outcome::Rejected;
            }
        };

        let (action, outcome) = match top {
            SymbolID::T(TerminalID::EOI) if lookahead == TerminalID::EOI => {
                (StepAction::Accept, Some(Outcome::Accepted))
            }

            SymbolID::T(t) if t == lookahead => (
                StepAction::Match {
                    terminal: t,
                    name: g.terminal_name(t).to_owned(),
                },
                None,
            ),

            SymbolID::T(t) => {
                let err = ParseError::UnexpectedToken {
                    expected: g.terminal_name(t).to_owned(),
                    found: g.terminal_name(lookahead).to_owned(),
                    position: cursor,
                };
                (StepAction::Error(err), Some(Outcome::Rejected))
            }

            SymbolID::N(n) => match table.get(n, lookahead) {
                Some(&[p, ref rest @ ..]) => {
                    let production = g.production(p);
                    let expand = StepAction::Expand {
                        production: p,
                        text: production.display(g).to_string(),
                    };
                    if rest.is_empty() {
                        (expand, None)
                    } else {
                        let alternatives = table
                            .get(n, lookahead)
                            .unwrap_or_default()
                            .iter()
                            .map(|p| g.production(*p).display(g).to_string())
                            .collect::<Vec<_>>()
                            .join(" / ");
                        let conflict = StepAction::Conflict {
                            chosen: Box::new(expand),
                            alternatives,
                        };
                        (conflict, None)
                    }
                }
                _ => {
                    let err = ParseError::NoEntry {
                        nonterminal: g.nonterminal_name(n).to_owned(),
                        token: g.terminal_name(lookahead).to_owned(),
                        position: cursor,
                    };
                    (StepAction::Error(err), Some(Outcome::Rejected))
                }
            },
        };

        steps.push(snapshot(&stack, remaining, action.clone()));
        if let Some(outcome) = outcome {
            break outcome;
        }

        // 次の状態へ
        stack.pop();
        match action.performed() {
            StepAction::Match { .. } => cursor += 1,
            StepAction::Expand { production, .. } => {
                let parent = node.unwrap_or_else(|| tree.root());
                let body = g.production(*production).right();
                if body.is_empty() {
                    tree.add_child(parent, NodeLabel::Empty);
                }
                let children: Vec<_> = body
                    .iter()
                    .map(|symbol| (*symbol, Some(tree.add_child(parent, NodeLabel::Symbol(*symbol)))))
                    .collect();
                stack.extend(children.into_iter().rev());
            }
            _ => (),
        }
    };

    tracing::debug!("{:?} after {} steps", outcome, steps.len());
    Trace {
        steps,
        outcome,
        tree: Some(tree),
    }
}
