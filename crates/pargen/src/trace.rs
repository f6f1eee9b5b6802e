//! Step traces produced by the parse simulators.

use crate::{
    automaton::StateID,
    grammar::{Grammar, ProductionID, SymbolID, TerminalID, EMPTY_MARKERS},
    util::{display_fn, write_joined},
};
use std::fmt;

/// Configuration of a simulation run.
#[derive(Debug, Clone)]
pub struct SimulateConfig {
    pub(crate) max_steps: usize,
}

impl Default for SimulateConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl SimulateConfig {
    pub const fn new() -> Self {
        Self { max_steps: 1000 }
    }

    /// Set the upper bound of steps before the run is cut off.
    pub fn max_steps(&mut self, max_steps: usize) -> &mut Self {
        self.max_steps = max_steps;
        self
    }

    pub fn step_limit(&self) -> usize {
        self.max_steps
    }
}

/// Recoverable input errors and table inconsistencies met while simulating.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("unknown token `{token}' at position {position}")]
    UnknownToken { token: String, position: usize },

    #[error("`$' at position {position} is followed by more input")]
    TrailingInput { position: usize },

    #[error("no action for input `{token}' in state {state}")]
    NoAction {
        state: String,
        token: String,
        position: usize,
    },

    #[error("no entry for [{nonterminal}, {token}]")]
    NoEntry {
        nonterminal: String,
        token: String,
        position: usize,
    },

    #[error("expected `{expected}' but found `{found}'")]
    UnexpectedToken {
        expected: String,
        found: String,
        position: usize,
    },

    #[error("inconsistent table: no goto on [{state}, {nonterminal}] after reducing by production {production}")]
    MissingGoto {
        state: String,
        nonterminal: String,
        production: ProductionID,
    },
}

/// What the simulator did in one step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepAction {
    Shift { state: StateID, label: String },
    Reduce { production: ProductionID, text: String },
    Accept,
    /// LL(1): the terminal on top of the stack matched the input.
    Match { terminal: TerminalID, name: String },
    /// LL(1): the nonterminal on top of the stack was expanded.
    Expand { production: ProductionID, text: String },
    /// A conflicting cell was met; `chosen` was taken and the rest dropped.
    Conflict {
        chosen: Box<StepAction>,
        alternatives: String,
    },
    Error(ParseError),
    StepLimit,
}

impl StepAction {
    /// The action actually performed, looking through conflict choices.
    pub fn performed(&self) -> &StepAction {
        match self {
            Self::Conflict { chosen, .. } => chosen,
            action => action,
        }
    }
}

impl fmt::Display for StepAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shift { label, .. } => write!(f, "Shift {}", label),
            Self::Reduce { production, text } => write!(f, "Reduce {}: {}", production, text),
            Self::Accept => f.write_str("Accept"),
            Self::Match { name, .. } => write!(f, "Match {}", name),
            Self::Expand { text, .. } => f.write_str(text),
            Self::Conflict {
                chosen,
                alternatives,
            } => write!(f, "Conflict {{{}}}, chose {}", alternatives, chosen),
            Self::Error(err) => write!(f, "Error: {}", err),
            Self::StepLimit => f.write_str("Terminated: step limit reached"),
        }
    }
}

/// A snapshot of the simulator before performing `action`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    /// The state stack for LR tables, the symbol stack for LL(1), top first.
    pub stack: Vec<String>,
    /// The recognized symbols, top first. Always empty for LL(1).
    pub symbols: Vec<String>,
    /// The remaining input including the trailing `$`.
    pub input: Vec<String>,
    pub action: StepAction,
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    Rejected,
    /// A reduction found no goto, i.e. the table is malformed.
    InconsistentTable,
    StepLimit,
}

#[derive(Debug, Clone)]
pub struct Trace {
    pub(crate) steps: Vec<Step>,
    pub(crate) outcome: Outcome,
    pub(crate) tree: Option<ParseTree>,
}

impl Trace {
    pub fn steps(&self) -> &[Step] {
        &self.steps[..]
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }

    pub fn is_accepted(&self) -> bool {
        self.outcome == Outcome::Accepted
    }

    /// The parse tree built so far by the LL(1) driver.
    pub fn tree(&self) -> Option<&ParseTree> {
        self.tree.as_ref()
    }

    /// The error that stopped the run, if any.
    pub fn error(&self) -> Option<&ParseError> {
        self.steps.last().and_then(|step| match &step.action {
            StepAction::Error(err) => Some(err),
            _ => None,
        })
    }
}

impl fmt::Display for Trace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, step) in self.steps.iter().enumerate() {
            write!(f, "{:>4} | ", i + 1)?;
            write_joined(f, " ", &step.stack)?;
            f.write_str(" | ")?;
            write_joined(f, " ", &step.symbols)?;
            f.write_str(" | ")?;
            write_joined(f, " ", &step.input)?;
            writeln!(f, " | {}", step.action)?;
        }
        Ok(())
    }
}

#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct NodeID(usize);

impl NodeID {
    pub const ROOT: Self = Self(0);
}

/// The label of a parse tree node.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum NodeLabel {
    Symbol(SymbolID),
    /// The leaf attached to a nonterminal expanded by an empty production.
    Empty,
}

#[derive(Debug, Clone)]
pub struct Node {
    label: NodeLabel,
    children: Vec<NodeID>,
}

impl Node {
    pub fn label(&self) -> NodeLabel {
        self.label
    }

    pub fn children(&self) -> &[NodeID] {
        &self.children[..]
    }
}

/// A parse tree stored as an arena; the root is the start symbol.
#[derive(Debug, Clone)]
pub struct ParseTree {
    nodes: Vec<Node>,
}

impl ParseTree {
    pub(crate) fn new(root: SymbolID) -> Self {
        Self {
            nodes: vec![Node {
                label: NodeLabel::Symbol(root),
                children: vec![],
            }],
        }
    }

    pub(crate) fn add_child(&mut self, parent: NodeID, label: NodeLabel) -> NodeID {
        let id = NodeID(self.nodes.len());
        self.nodes.push(Node {
            label,
            children: vec![],
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    pub fn root(&self) -> NodeID {
        NodeID::ROOT
    }

    pub fn node(&self, id: NodeID) -> &Node {
        &self.nodes[id.0]
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// One node per line, children indented under their parent.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(move |f| {
            let mut stack = vec![(NodeID::ROOT, 0)];
            while let Some((id, depth)) = stack.pop() {
                let node = self.node(id);
                let name = match node.label {
                    NodeLabel::Symbol(symbol) => g.symbol_name(symbol),
                    NodeLabel::Empty => EMPTY_MARKERS[0],
                };
                writeln!(f, "{:indent$}{}", "", name, indent = depth * 2)?;
                stack.extend(node.children.iter().rev().map(|child| (*child, depth + 1)));
            }
            Ok(())
        })
    }
}

/// Split the input on whitespace and resolve every token to a terminal.
///
/// `$` is appended unless the input already ends with it.
pub(crate) fn tokenize(g: &Grammar, input: &str) -> Result<(Vec<TerminalID>, Vec<String>), ParseError> {
    let mut tokens = vec![];
    let mut names = vec![];
    for (position, token) in input.split_whitespace().enumerate() {
        let t = g.terminal(token).ok_or_else(|| ParseError::UnknownToken {
            token: token.to_owned(),
            position,
        })?;
        if tokens.last() == Some(&TerminalID::EOI) {
            return Err(ParseError::TrailingInput {
                position: position - 1,
            });
        }
        tokens.push(t);
        names.push(token.to_owned());
    }
    if tokens.last() != Some(&TerminalID::EOI) {
        tokens.push(TerminalID::EOI);
        names.push(g.terminal_name(TerminalID::EOI).to_owned());
    }
    Ok((tokens, names))
}
