//! Syntax support for textual grammar definitions.
//!
//! A definition consists of `|`-separated lists of nonterminal and terminal
//! names plus one production per line:
//!
//! ```text
//! %nonterminals E | T | F
//! %terminals + | * | ( | ) | id
//! E -> E + T | T
//! T -> T * F | F
//! F -> ( E ) | id
//! ```
//!
//! `->` and `→` are interchangeable. An empty alternative, or one made only
//! of `λ`/`ε`, denotes the empty string.

use crate::grammar::{is_empty_marker, Grammar, GrammarError, SymbolID, END_MARKER};

const ARROW: char = '→';

/// The parsed but not yet resolved grammar text.
#[derive(Debug, Default)]
pub struct GrammarText {
    pub nonterminals: Vec<String>,
    pub terminals: Vec<String>,
    pub rules: Vec<RuleText>,
}

/// One production line, possibly holding several alternatives.
#[derive(Debug)]
pub struct RuleText {
    pub line: usize,
    pub head: String,
    pub alternatives: Vec<Vec<String>>,
}

/// Parse a grammar file.
pub fn parse(source: &str) -> Result<GrammarText, GrammarError> {
    let span = tracing::trace_span!("parse");
    let _entered = span.enter();

    let mut text = GrammarText::default();
    for (i, line) in source.lines().enumerate() {
        let line_no = i + 1;
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        if let Some(rest) = line.strip_prefix("%nonterminals") {
            text.nonterminals.extend(split_list(rest));
        } else if let Some(rest) = line.strip_prefix("%terminals") {
            text.terminals.extend(split_list(rest));
        } else if line.starts_with('%') {
            return Err(GrammarError::Syntax {
                line: line_no,
                msg: format!("unknown directive `{}'", line),
            });
        } else {
            text.rules.push(parse_rule(line_no, line)?);
        }
    }

    tracing::trace!(
        "parsed {} nonterminals, {} terminals, {} rule lines",
        text.nonterminals.len(),
        text.terminals.len(),
        text.rules.len()
    );
    Ok(text)
}

/// Parse the three parts of a definition given separately.
pub fn parse_parts(
    nonterminals: &str,
    terminals: &str,
    productions: &str,
) -> Result<GrammarText, GrammarError> {
    let mut text = GrammarText {
        nonterminals: split_list(nonterminals).collect(),
        terminals: split_list(terminals).collect(),
        rules: vec![],
    };
    for (i, line) in productions.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        text.rules.push(parse_rule(i + 1, line)?);
    }
    Ok(text)
}

fn split_list(s: &str) -> impl Iterator<Item = String> + '_ {
    s.split('|')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
}

// `HEAD SEP BODY ( | BODY )*`
fn parse_rule(line: usize, source: &str) -> Result<RuleText, GrammarError> {
    let normalized = source.replace("->", &ARROW.to_string());
    let (head, body) = normalized
        .split_once(ARROW)
        .ok_or_else(|| GrammarError::Syntax {
            line,
            msg: format!("missing `->' in `{}'", source),
        })?;

    let head = head.trim();
    if head.is_empty() || head.split_whitespace().count() != 1 {
        return Err(GrammarError::Syntax {
            line,
            msg: format!("the left-hand side must be a single symbol: `{}'", head),
        });
    }

    let alternatives = body
        .split('|')
        .map(|alt| {
            alt.split_whitespace()
                .filter(|s| !is_empty_marker(s))
                .map(String::from)
                .collect()
        })
        .collect();

    Ok(RuleText {
        line,
        head: head.to_owned(),
        alternatives,
    })
}

/// Resolve the symbol names and build the grammar.
///
/// Undeclared names that appear as the head of some production are
/// nonterminals; every other undeclared name is a terminal.
pub fn define(text: GrammarText) -> Result<Grammar, GrammarError> {
    Grammar::define(|g| {
        for name in &text.nonterminals {
            g.nonterminal(name)?;
        }
        for name in &text.terminals {
            if name == END_MARKER || is_empty_marker(name) {
                continue;
            }
            g.terminal(name)?;
        }

        // 左辺に現れる記号は非終端記号として登録する
        for rule in &text.rules {
            if rule.head == END_MARKER || is_empty_marker(&rule.head) {
                return Err(GrammarError::ReservedName(rule.head.clone()));
            }
            g.nonterminal(&rule.head)?;
        }

        for rule in &text.rules {
            let left = g.nonterminal(&rule.head)?;
            for alternative in &rule.alternatives {
                let mut right = Vec::with_capacity(alternative.len());
                for name in alternative {
                    let symbol = match g.symbol(name) {
                        Some(symbol) => symbol,
                        None => {
                            tracing::trace!("implicitly declared terminal `{}'", name);
                            SymbolID::T(g.terminal(name)?)
                        }
                    };
                    right.push(symbol);
                }
                g.production(left, right)?;
            }
        }

        Ok(())
    })
}
