//! Parses template text into a [`Template`].
//!
//! Parsing happens in two passes: the first reads values and compiles every
//! rule, the second resolves state names once all states are known.

use std::iter::Peekable;

use indexmap::IndexMap;
use regex::Regex;

use super::Template;
use super::rule::{Action, RecordOp, Rule, State, Target};
use super::value::{ValueDefinition, ValueOption, is_valid_name};
use crate::error::TemplateError;

/// Longest state name a template may declare.
pub const MAX_STATE_NAME_LEN: usize = 32;

const START: &str = "Start";
const END: &str = "End";
const EOF: &str = "EOF";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LineOp {
    Next,
    Continue,
    Error,
}

impl LineOp {
    fn parse(s: &str) -> Option<Self> {
        match s {
            "Next" => Some(Self::Next),
            "Continue" => Some(Self::Continue),
            "Error" => Some(Self::Error),
            _ => None,
        }
    }
}

/// A rule whose target state has not been resolved yet.
struct PendingRule {
    regex: Regex,
    captures: Vec<usize>,
    line_op: LineOp,
    record: RecordOp,
    new_state: Option<String>,
    line: usize,
}

struct PendingState {
    name: String,
    line: usize,
    rules: Vec<PendingRule>,
}

pub(crate) fn parse(text: &str) -> Result<Template, TemplateError> {
    let mut lines = text
        .lines()
        .enumerate()
        .map(|(i, l)| (i + 1, l.trim_end()))
        .peekable();

    let values = parse_values(&mut lines)?;
    let states = parse_states(&mut lines, &values)?;
    resolve(values, states)
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

fn split_token(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], &s[i..]),
        None => (s, ""),
    }
}

fn is_word(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn parse_values<'a, I>(lines: &mut Peekable<I>) -> Result<Vec<ValueDefinition>, TemplateError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut values: Vec<ValueDefinition> = Vec::new();
    let mut last = 0;

    while let Some((n, line)) = lines.next() {
        last = n;
        if line.is_empty() {
            if values.is_empty() {
                continue;
            }
            break;
        }
        if is_comment(line) {
            continue;
        }

        if let Some(rest) = line.strip_prefix("Value ") {
            let value = parse_value(n, rest)?;
            if values.iter().any(|v| v.name == value.name) {
                return Err(TemplateError::DuplicateValue {
                    line: n,
                    name: value.name,
                });
            }
            values.push(value);
        } else if values.is_empty() {
            return Err(TemplateError::NoValues { line: n });
        } else {
            return Err(TemplateError::InvalidValue {
                line: n,
                message: "expected a blank line after the last Value".to_string(),
            });
        }
    }

    if values.is_empty() {
        return Err(TemplateError::NoValues { line: last });
    }
    Ok(values)
}

fn parse_value(n: usize, rest: &str) -> Result<ValueDefinition, TemplateError> {
    let invalid = |message: &str| TemplateError::InvalidValue {
        line: n,
        message: message.to_string(),
    };

    let (first, after_first) = split_token(rest.trim_start());
    let after_first = after_first.trim_start();
    if first.is_empty() || after_first.is_empty() {
        return Err(invalid("expected 'Value [Options] Name (regex)'"));
    }

    let (options, name, pattern) = if after_first.starts_with('(') {
        (Vec::new(), first, after_first)
    } else {
        let (second, after_second) = split_token(after_first);
        let pattern = after_second.trim_start();
        if pattern.is_empty() {
            return Err(invalid("expected 'Value [Options] Name (regex)'"));
        }
        (parse_options(n, first)?, second, pattern)
    };

    if !is_valid_name(name) {
        return Err(invalid(&format!("invalid value name '{name}'")));
    }
    if !pattern.starts_with('(') || !pattern.ends_with(')') || pattern.ends_with("\\)") {
        return Err(invalid(&format!(
            "pattern of '{name}' must be enclosed in '()'"
        )));
    }

    Regex::new(pattern).map_err(|source| TemplateError::InvalidRegex { line: n, source })?;

    Ok(ValueDefinition {
        name: name.to_string(),
        pattern: pattern.to_string(),
        options,
    })
}

fn parse_options(n: usize, list: &str) -> Result<Vec<ValueOption>, TemplateError> {
    let mut options = Vec::new();
    for raw in list.split(',') {
        let option: ValueOption = raw.parse().map_err(|_| TemplateError::UnknownOption {
            line: n,
            option: raw.to_string(),
        })?;
        if options.contains(&option) {
            return Err(TemplateError::DuplicateOption {
                line: n,
                option: raw.to_string(),
            });
        }
        options.push(option);
    }
    Ok(options)
}

fn parse_states<'a, I>(
    lines: &mut Peekable<I>,
    values: &[ValueDefinition],
) -> Result<Vec<PendingState>, TemplateError>
where
    I: Iterator<Item = (usize, &'a str)>,
{
    let mut states: Vec<PendingState> = Vec::new();

    while let Some((n, line)) = lines.next() {
        if line.is_empty() || is_comment(line) {
            continue;
        }

        if !is_word(line) || line.len() > MAX_STATE_NAME_LEN {
            return Err(TemplateError::InvalidState {
                line: n,
                name: line.trim().to_string(),
                message: format!(
                    "state names are word characters, at most {MAX_STATE_NAME_LEN} long"
                ),
            });
        }
        if states.iter().any(|s| s.name == line) {
            return Err(TemplateError::DuplicateState {
                line: n,
                name: line.to_string(),
            });
        }

        let mut rules = Vec::new();
        while let Some(&(rn, rule_line)) = lines.peek() {
            if rule_line.is_empty() {
                break;
            }
            lines.next();
            if is_comment(rule_line) {
                continue;
            }
            if !(rule_line.starts_with(" ^")
                || rule_line.starts_with("  ^")
                || rule_line.starts_with("\t^"))
            {
                return Err(TemplateError::InvalidRule {
                    line: rn,
                    message: "missing white space or '^' before rule".to_string(),
                });
            }
            rules.push(parse_rule(rn, rule_line.trim_start(), values)?);
        }

        states.push(PendingState {
            name: line.to_string(),
            line: n,
            rules,
        });
    }

    Ok(states)
}

/// Split `^regex -> Action` at the last arrow that has white space on
/// either side.
///
/// Only a single whitespace character before the arrow is removed; any
/// further trailing space stays part of the regex.
fn split_action(text: &str) -> (&str, Option<&str>) {
    for (i, _) in text.rmatch_indices("->") {
        if let Some(ws) = text[..i].chars().next_back().filter(|c| c.is_whitespace()) {
            return (&text[..i - ws.len_utf8()], Some(&text[i + 2..]));
        }
        if text[i + 2..].starts_with(char::is_whitespace) {
            return (&text[..i], Some(&text[i + 2..]));
        }
    }
    (text, None)
}

/// Expand `$Name` and `${Name}` into named groups; `$$` is a literal `$`.
fn substitute(
    n: usize,
    source: &str,
    values: &[ValueDefinition],
) -> Result<(String, Vec<usize>), TemplateError> {
    let mut out = String::with_capacity(source.len());
    let mut captures = Vec::new();
    let mut rest = source;

    while let Some(pos) = rest.find('$') {
        out.push_str(&rest[..pos]);
        let after = &rest[pos + 1..];

        let (name, remainder) = if let Some(tail) = after.strip_prefix('$') {
            out.push('$');
            rest = tail;
            continue;
        } else if let Some(braced) = after.strip_prefix('{') {
            let close = braced.find('}').ok_or_else(|| TemplateError::InvalidRule {
                line: n,
                message: "unterminated '${'".to_string(),
            })?;
            (&braced[..close], &braced[close + 1..])
        } else {
            let end = after
                .find(|c: char| !(c.is_ascii_alphanumeric() || c == '_'))
                .unwrap_or(after.len());
            (&after[..end], &after[end..])
        };

        if !is_valid_name(name) {
            return Err(TemplateError::InvalidRule {
                line: n,
                message: "invalid '$' substitution, use '$$' for a literal '$'".to_string(),
            });
        }

        let idx = values
            .iter()
            .position(|v| v.name == name)
            .ok_or_else(|| TemplateError::UndeclaredValue {
                line: n,
                name: name.to_string(),
            })?;
        out.push_str(&values[idx].named_group());
        captures.push(idx);
        rest = remainder;
    }
    out.push_str(rest);

    captures.sort_unstable();
    Ok((out, captures))
}

fn parse_rule(
    n: usize,
    text: &str,
    values: &[ValueDefinition],
) -> Result<PendingRule, TemplateError> {
    let (source, action) = split_action(text);
    let (expanded, captures) = substitute(n, source, values)?;
    let regex = Regex::new(&format!("^(?:{expanded})"))
        .map_err(|source| TemplateError::InvalidRegex { line: n, source })?;

    let (line_op, record, new_state) = match action {
        Some(action) => parse_action(n, action)?,
        None => (LineOp::Next, RecordOp::NoRecord, None),
    };

    Ok(PendingRule {
        regex,
        captures,
        line_op,
        record,
        new_state,
        line: n,
    })
}

fn parse_action(
    n: usize,
    action: &str,
) -> Result<(LineOp, RecordOp, Option<String>), TemplateError> {
    let invalid = |message: String| TemplateError::InvalidRule { line: n, message };

    let action = action.trim();
    if action.is_empty() {
        return Ok((LineOp::Next, RecordOp::NoRecord, None));
    }

    let (op, rest) = split_token(action);
    let rest = rest.trim();

    let (line_op, record, state) = if let Some((l, r)) = op.split_once('.') {
        let line_op = LineOp::parse(l).ok_or_else(|| invalid(format!("unknown line action '{l}'")))?;
        let record =
            RecordOp::parse(r).ok_or_else(|| invalid(format!("unknown record action '{r}'")))?;
        (line_op, record, rest)
    } else if let Some(line_op) = LineOp::parse(op) {
        (line_op, RecordOp::NoRecord, rest)
    } else if let Some(record) = RecordOp::parse(op) {
        (LineOp::Next, record, rest)
    } else {
        if !rest.is_empty() {
            return Err(invalid(format!("unexpected '{rest}' after '{op}'")));
        }
        (LineOp::Next, RecordOp::NoRecord, op)
    };

    if state.is_empty() {
        return Ok((line_op, record, None));
    }

    let quoted = state.len() >= 2 && state.starts_with('"') && state.ends_with('"');
    let new_state = if line_op == LineOp::Error {
        if quoted {
            state[1..state.len() - 1].to_string()
        } else if is_word(state) {
            state.to_string()
        } else {
            return Err(invalid(format!("invalid error message '{state}'")));
        }
    } else if is_word(state) {
        state.to_string()
    } else {
        return Err(invalid(format!("invalid state '{state}'")));
    };

    if line_op == LineOp::Continue {
        return Err(invalid("'Continue' cannot change state".to_string()));
    }

    Ok((line_op, record, Some(new_state)))
}

fn resolve(
    values: Vec<ValueDefinition>,
    pending: Vec<PendingState>,
) -> Result<Template, TemplateError> {
    let mut eof_declared = false;
    let mut names: IndexMap<String, usize> = IndexMap::new();

    for state in &pending {
        match state.name.as_str() {
            END | EOF => {
                if !state.rules.is_empty() {
                    return Err(TemplateError::InvalidState {
                        line: state.line,
                        name: state.name.clone(),
                        message: "reserved state must be empty".to_string(),
                    });
                }
                if state.name == EOF {
                    eof_declared = true;
                }
            }
            _ => {
                let next = names.len();
                names.insert(state.name.clone(), next);
            }
        }
    }

    let start = *names.get(START).ok_or(TemplateError::MissingStart)?;

    let mut states = IndexMap::with_capacity(names.len());
    for state in pending {
        if state.name == END || state.name == EOF {
            continue;
        }

        let mut rules = Vec::with_capacity(state.rules.len());
        for rule in state.rules {
            let action = match rule.line_op {
                LineOp::Continue => Action::Continue {
                    record: rule.record,
                },
                LineOp::Error => Action::Error {
                    record: rule.record,
                    message: rule.new_state,
                },
                LineOp::Next => {
                    let target = match rule.new_state.as_deref() {
                        None => Target::Stay,
                        Some(END) => Target::End,
                        Some(EOF) => Target::Eof,
                        Some(name) => names.get(name).copied().map(Target::State).ok_or_else(
                            || TemplateError::UnknownState {
                                line: rule.line,
                                name: name.to_string(),
                            },
                        )?,
                    };
                    Action::Next {
                        record: rule.record,
                        target,
                    }
                }
            };

            rules.push(Rule {
                regex: rule.regex,
                captures: rule.captures,
                action,
                line: rule.line,
            });
        }

        states.insert(
            state.name.clone(),
            State {
                name: state.name,
                rules,
            },
        );
    }

    Ok(Template {
        values,
        states,
        start,
        eof_declared,
    })
}
