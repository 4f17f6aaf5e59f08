//! Resolution of textual entry indices (`active`, `end`, `none`, numbers and
//! label patterns) against a menu.

use std::fmt;
use std::str::FromStr;

use regex::Regex;

use super::error::{MenuError, Result};
use super::system::MenuSystem;
use super::MenuId;

/// A parsed entry index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MenuIndex {
    Active,
    /// `end` or `last`.
    End,
    None,
    Number(i64),
    /// A glob pattern matched against entry labels.
    Pattern(String),
}

impl FromStr for MenuIndex {
    type Err = MenuError;

    fn from_str(s: &str) -> Result<Self> {
        if s.is_empty() {
            return Err(MenuError::InvalidIndex(String::new()));
        }
        Ok(match s {
            "active" => MenuIndex::Active,
            "end" | "last" => MenuIndex::End,
            "none" => MenuIndex::None,
            _ => match s.parse::<i64>() {
                Ok(number) => MenuIndex::Number(number),
                Err(_) => MenuIndex::Pattern(s.to_string()),
            },
        })
    }
}

impl fmt::Display for MenuIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MenuIndex::Active => f.write_str("active"),
            MenuIndex::End => f.write_str("end"),
            MenuIndex::None => f.write_str("none"),
            MenuIndex::Number(number) => write!(f, "{number}"),
            MenuIndex::Pattern(pattern) => f.write_str(pattern),
        }
    }
}

impl From<usize> for MenuIndex {
    fn from(index: usize) -> Self {
        MenuIndex::Number(index as i64)
    }
}

/// Translates a glob (`*`, `?`, `[...]`, `\x`) into an anchored regex.
pub fn glob_to_regex(pattern: &str) -> Result<Regex> {
    let invalid = || MenuError::InvalidIndex(pattern.to_string());
    let mut source = String::from("^");
    let mut chars = pattern.chars();
    while let Some(c) = chars.next() {
        match c {
            '*' => source.push_str(".*"),
            '?' => source.push('.'),
            '[' => {
                source.push('[');
                let mut closed = false;
                for inner in chars.by_ref() {
                    if inner == ']' {
                        closed = true;
                        break;
                    }
                    if inner == '\\' || inner == '^' || inner == '[' {
                        source.push('\\');
                    }
                    source.push(inner);
                }
                if !closed {
                    return Err(invalid());
                }
                source.push(']');
            }
            '\\' => match chars.next() {
                Some(escaped) => source.push_str(&regex::escape(&escaped.to_string())),
                None => source.push_str(&regex::escape("\\")),
            },
            other => source.push_str(&regex::escape(&other.to_string())),
        }
    }
    source.push('$');
    Regex::new(&source).map_err(|_| invalid())
}

impl MenuSystem {
    /// Resolves `index` against `menu`. `Ok(None)` stands for "no entry".
    ///
    /// With `last_ok`, `end` and numbers past the end resolve to the slot
    /// just after the last entry, which is where an insertion appends.
    pub fn resolve_index(
        &self,
        menu: MenuId,
        index: &MenuIndex,
        last_ok: bool,
    ) -> Result<Option<usize>> {
        let menu_ref = self.menu(menu).ok_or(MenuError::StaleMenu)?;
        let len = menu_ref.len();
        let past_end = if last_ok { Some(len) } else { len.checked_sub(1) };

        match index {
            MenuIndex::Active => Ok(menu_ref.active()),
            MenuIndex::None => Ok(None),
            MenuIndex::End => Ok(past_end),
            MenuIndex::Number(number) if *number < 0 => Ok(None),
            MenuIndex::Number(number) => {
                let number = *number as usize;
                Ok(if number >= len { past_end } else { Some(number) })
            }
            MenuIndex::Pattern(pattern) => {
                let matcher = glob_to_regex(pattern)?;
                menu_ref
                    .entry_ids()
                    .iter()
                    .filter_map(|id| self.entry(*id))
                    .find(|entry| entry.label().is_some_and(|label| matcher.is_match(label)))
                    .map(|entry| Some(entry.index()))
                    .ok_or_else(|| MenuError::InvalidIndex(pattern.clone()))
            }
        }
    }

    /// Parses and resolves a textual index in one step.
    pub fn index_of(&self, menu: MenuId, index: &str, last_ok: bool) -> Result<Option<usize>> {
        self.resolve_index(menu, &index.parse()?, last_ok)
    }
}
