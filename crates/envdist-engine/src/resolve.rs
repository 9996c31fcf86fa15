//! Variable resolution over a sanitized document.
//!
//! Substitution draws on an explicit, locally scoped key/value table built
//! from the document itself. The process environment is never consulted,
//! so resolution is pure and deterministic.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// How `${KEY}` references are expanded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// One substitution pass against literal-at-scan-time bindings. A chain
    /// whose intermediate value still contains a reference resolves only
    /// one hop, depending on file order.
    SinglePass,
    /// Iterate the binding table to a fixed point before substituting,
    /// bounded by `max_depth` so reference cycles terminate. Resolves
    /// multi-level chains regardless of file order.
    FixedPoint { max_depth: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::SinglePass
    }
}

/// A sanitized document after variable substitution.
#[derive(Debug, Clone)]
pub struct ResolvedDocument {
    pub lines: Vec<String>,
    /// Names that were referenced but never bound. Their references remain
    /// literal in `lines`; callers surface them as warnings, not errors.
    pub unresolved: Vec<String>,
}

impl ResolvedDocument {
    /// Serialized artifact content: newline-joined lines with a trailing
    /// newline, or empty for an empty document.
    pub fn content(&self) -> String {
        if self.lines.is_empty() {
            String::new()
        } else {
            let mut out = self.lines.join("\n");
            out.push('\n');
            out
        }
    }
}

/// Resolve `${KEY}` references in `lines`.
///
/// The binding table is built by scanning the lines in order; only *simple*
/// assignments bind (identifier key, value without embedded whitespace), so
/// shell-sensitive multi-word values never feed the substitution step.
/// Later bindings overwrite earlier ones (last-write-wins across merged
/// tiers). References to unbound keys stay literal.
pub fn resolve(lines: &[String], strategy: Strategy) -> ResolvedDocument {
    let mut table: HashMap<String, String> = HashMap::new();
    for line in lines {
        if let Some((key, value)) = split_simple_assignment(line) {
            table.insert(key.to_string(), value.to_string());
        }
    }

    if let Strategy::FixedPoint { max_depth } = strategy {
        iterate_table(&mut table, max_depth);
    }

    let mut unresolved = Vec::new();
    let resolved = lines
        .iter()
        .map(|line| substitute(line, &table, &mut unresolved))
        .collect();
    unresolved.sort();
    unresolved.dedup();

    ResolvedDocument {
        lines: resolved,
        unresolved,
    }
}

/// Split a strict `KEY=TOKEN` line: identifier key, non-empty value with no
/// embedded whitespace. Anything looser does not bind.
fn split_simple_assignment(line: &str) -> Option<(&str, &str)> {
    let (key, value) = line.split_once('=')?;
    if !is_identifier(key) {
        return None;
    }
    if value.is_empty() || value.chars().any(char::is_whitespace) {
        return None;
    }
    Some((key, value))
}

fn is_identifier(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Substitute table values into the values of the table itself until no
/// value changes, or `max_depth` passes have run.
fn iterate_table(table: &mut HashMap<String, String>, max_depth: usize) {
    for _ in 0..max_depth {
        let snapshot = table.clone();
        let mut changed = false;
        for value in table.values_mut() {
            let mut sink = Vec::new();
            let next = substitute(value, &snapshot, &mut sink);
            if next != *value {
                *value = next;
                changed = true;
            }
        }
        if !changed {
            break;
        }
    }
}

/// Replace `${KEY}` occurrences in `input` from `table`. Unbound references
/// are recorded in `unresolved` and emitted literally, as are malformed
/// ones (non-identifier name, or `${` never closed).
fn substitute(input: &str, table: &HashMap<String, String>, unresolved: &mut Vec<String>) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find('}') {
            Some(end) => {
                let name = &after[..end];
                let literal = &rest[start..start + 2 + end + 1];
                if is_identifier(name) {
                    if let Some(value) = table.get(name) {
                        out.push_str(value);
                    } else {
                        unresolved.push(name.to_string());
                        out.push_str(literal);
                    }
                } else {
                    out.push_str(literal);
                }
                rest = &after[end + 1..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}
