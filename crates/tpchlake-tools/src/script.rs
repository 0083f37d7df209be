//! SQL script loading, placeholder substitution and statement splitting.
//!
//! Scripts are plain SQL files with `__KEY__` placeholders. Processing is
//! line oriented: `--` comments are dropped and the remaining text is split
//! on `;`. Single- and double-quoted text is respected by both steps; block
//! comments are not recognised.

use std::fs;
use std::path::Path;

use crate::error::{LakeError, Result};

/// Placeholder key whose value is qualified with the catalog alias.
pub const QUALIFIED_TABLE_KEY: &str = "TABLE";

/// Statement prefixes that establish the session (extension + catalog attach).
const SESSION_SETUP_PREFIXES: [&str; 4] = ["INSTALL", "LOAD", "ATTACH", "USE"];

/// Read `<dir>/<name>`.
pub fn load_script(dir: &Path, name: &str) -> Result<String> {
    let path = dir.join(name);
    if !path.is_file() {
        return Err(LakeError::ScriptNotFound(path));
    }
    Ok(fs::read_to_string(&path)?)
}

/// Ordered set of placeholder values.
#[derive(Debug, Clone, Default)]
pub struct Variables {
    entries: Vec<(String, String)>,
}

impl Variables {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a placeholder, replacing any previous value for the same key.
    pub fn set(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        let key = key.into();
        let value = value.to_string();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

/// Replace every `__KEY__` in `sql`. `TABLE` becomes `<alias>.<value>`.
pub fn substitute(sql: &str, vars: &Variables, alias: &str) -> String {
    let mut rendered = sql.to_string();
    for (key, value) in vars.iter() {
        let placeholder = format!("__{}__", key);
        if key == QUALIFIED_TABLE_KEY {
            rendered = rendered.replace(&placeholder, &format!("{}.{}", alias, value));
        } else {
            rendered = rendered.replace(&placeholder, value);
        }
    }
    rendered
}

/// Drop blank and comment-only lines and cut trailing `--` comments.
pub fn strip_comments(sql: &str) -> String {
    let mut kept = Vec::new();
    let mut quote = None;
    for line in sql.lines() {
        let (code, open_quote) = cut_line_comment(line, quote);
        quote = open_quote;
        let code = code.trim_end();
        if code.trim().is_empty() {
            continue;
        }
        kept.push(code);
    }
    kept.join("\n")
}

/// Split on `;` outside quotes, returning trimmed non-empty statements.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut quote: Option<char> = None;
    let mut start = 0;

    for (idx, ch) in sql.char_indices() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (None, '\'') | (None, '"') => quote = Some(ch),
            (None, ';') => {
                push_statement(&mut statements, &sql[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    push_statement(&mut statements, &sql[start..]);
    statements
}

/// Comment stripping followed by splitting.
pub fn parse_statements(sql: &str) -> Vec<String> {
    split_statements(&strip_comments(sql))
}

/// Whether the statement installs, loads, attaches or selects a catalog.
pub fn is_session_setup(statement: &str) -> bool {
    let head = statement.trim_start();
    SESSION_SETUP_PREFIXES.iter().any(|prefix| {
        head.get(..prefix.len())
            .is_some_and(|start| start.eq_ignore_ascii_case(prefix))
    })
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    let statement = raw.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
}

fn cut_line_comment(line: &str, mut quote: Option<char>) -> (&str, Option<char>) {
    let mut chars = line.char_indices().peekable();
    while let Some((idx, ch)) = chars.next() {
        match (quote, ch) {
            (Some(q), c) if c == q => quote = None,
            (None, '\'') | (None, '"') => quote = Some(ch),
            (None, '-') if matches!(chars.peek(), Some((_, '-'))) => return (&line[..idx], None),
            _ => {}
        }
    }
    (line, quote)
}
