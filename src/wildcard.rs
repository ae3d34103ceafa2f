// SPDX-License-Identifier: AGPL-3.0-or-later
// Copyright (C) 2012-2025 Andrei Maltsev

//! Glob-style pattern matching for `KEYS`: `?` matches one character,
//! `*` any run (possibly empty), `[...]` a character set with optional
//! `^` negation and `a-z` ranges.

/// A compiled pattern. Compilation happens once per `KEYS` call; matching
/// borrows the pattern immutably, so a compiled pattern is safe to share
/// across threads.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pattern {
    items: Vec<Item>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Item {
    /// `?`
    Any,
    /// `*`
    AnyRun,
    Char(char),
    Set {
        negate: bool,
        chars: Vec<char>,
        ranges: Vec<(char, char)>,
    },
}

impl Item {
    fn matches(&self, c: char) -> bool {
        match self {
            Item::Any => true,
            Item::AnyRun => true,
            Item::Char(expected) => *expected == c,
            Item::Set { negate, chars, ranges } => {
                let inside = chars.contains(&c)
                    || ranges.iter().any(|(lo, hi)| (*lo..=*hi).contains(&c));
                inside != *negate
            },
        }
    }
}

impl Pattern {
    /// Compiles a pattern. Malformed sets (an unterminated `[`) degrade
    /// to matching their literal characters rather than failing.
    pub fn compile(src: &str) -> Self {
        let mut items = Vec::new();
        let mut chars = src.chars().peekable();
        while let Some(c) = chars.next() {
            match c {
                '?' => items.push(Item::Any),
                '*' => items.push(Item::AnyRun),
                '[' => {
                    let mut negate = false;
                    let mut set_chars = Vec::new();
                    let mut ranges = Vec::new();
                    if chars.peek() == Some(&'^') {
                        negate = true;
                        chars.next();
                    }
                    let mut closed = false;
                    while let Some(c) = chars.next() {
                        match c {
                            ']' => {
                                closed = true;
                                break;
                            },
                            lo if chars.peek() == Some(&'-') => {
                                chars.next();
                                match chars.next() {
                                    Some(']') => {
                                        // trailing '-' is literal
                                        set_chars.push(lo);
                                        set_chars.push('-');
                                        closed = true;
                                        break;
                                    },
                                    Some(hi) => ranges.push((lo, hi)),
                                    None => {
                                        set_chars.push(lo);
                                        set_chars.push('-');
                                    },
                                }
                            },
                            other => set_chars.push(other),
                        }
                    }
                    if closed || !set_chars.is_empty() || !ranges.is_empty() {
                        items.push(Item::Set { negate, chars: set_chars, ranges });
                    }
                },
                literal => items.push(Item::Char(literal)),
            }
        }
        Self { items }
    }

    /// Whether the whole candidate matches the whole pattern.
    pub fn is_match(&self, candidate: &str) -> bool {
        let text: Vec<char> = candidate.chars().collect();
        let n = self.items.len();
        let m = text.len();

        // table[i][j]: items[..i] match text[..j]
        let mut table = vec![vec![false; m + 1]; n + 1];
        table[0][0] = true;
        for i in 1..=n {
            match &self.items[i - 1] {
                Item::AnyRun => {
                    for j in 0..=m {
                        table[i][j] = table[i - 1][j] || (j > 0 && table[i][j - 1]);
                    }
                },
                item => {
                    for j in 1..=m {
                        table[i][j] = table[i - 1][j - 1] && item.matches(text[j - 1]);
                    }
                },
            }
        }
        table[n][m]
    }
}
