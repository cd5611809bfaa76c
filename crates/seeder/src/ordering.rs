//! File-name matching and the natural order seeders execute in.

use std::cmp::Ordering;

use regex::Regex;

/// A compiled file-name pattern.
///
/// Only `*` (any run of characters, possibly empty) and `?` (exactly one
/// character) are wildcards. Every other character matches literally and the
/// match always spans the whole name.
#[derive(Debug, Clone)]
pub struct Pattern {
    source: String,
    regex: Regex,
}

impl Pattern {
    pub fn new(pattern: &str) -> Result<Self, regex::Error> {
        let mut expr = String::with_capacity(pattern.len() + 8);
        expr.push_str("^(?s:");
        let mut literal = [0u8; 4];
        for c in pattern.chars() {
            match c {
                '*' => expr.push_str(".*"),
                '?' => expr.push('.'),
                _ => expr.push_str(&regex::escape(c.encode_utf8(&mut literal))),
            }
        }
        expr.push_str(")$");

        Ok(Self {
            source: pattern.to_string(),
            regex: Regex::new(&expr)?,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub fn matches(&self, filename: &str) -> bool {
        self.regex.is_match(filename)
    }
}

/// Returns whether `filename` matches the glob `pattern` in full.
///
/// A pattern that cannot be compiled matches nothing.
pub fn matches_pattern(filename: &str, pattern: &str) -> bool {
    Pattern::new(pattern).is_ok_and(|p| p.matches(filename))
}

/// Case-insensitive natural comparison of two seeder names.
///
/// Runs of ASCII digits compare by numeric value, so `"2_seed"` sorts before
/// `"10_seed"`. Leading zeros do not affect the value. Characters rank the
/// way the default Unicode collation ranks them: whitespace, then
/// punctuation and symbols (`_` < `-` < `.`), then digits, then letters.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    let mut left = Chunks { rest: a };
    let mut right = Chunks { rest: b };

    loop {
        match (left.next(), right.next()) {
            (None, None) => return Ordering::Equal,
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(x), Some(y)) => match x.compare(&y) {
                Ordering::Equal => continue,
                ord => return ord,
            },
        }
    }
}

/// Punctuation and symbols in default collation order. Anything else that is
/// neither whitespace nor alphanumeric ranks after these, by code point.
const PUNCTUATION_ORDER: &str = "_-,;:!?.'\"()[]{}@*/\\&#%`^+<=>|~$";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Class {
    Whitespace,
    Punctuation,
    Digit,
    Letter,
}

fn class(c: char) -> Class {
    if c.is_whitespace() {
        Class::Whitespace
    } else if c.is_ascii_digit() {
        Class::Digit
    } else if c.is_alphanumeric() {
        Class::Letter
    } else {
        Class::Punctuation
    }
}

fn punctuation_rank(c: char) -> u32 {
    match PUNCTUATION_ORDER.chars().position(|p| p == c) {
        Some(index) => index as u32,
        None => PUNCTUATION_ORDER.len() as u32 + u32::from(c),
    }
}

#[derive(Debug, Clone, Copy)]
enum Chunk<'a> {
    Digits(&'a str),
    Char(char),
}

impl Chunk<'_> {
    fn compare(&self, other: &Self) -> Ordering {
        match (*self, *other) {
            (Chunk::Digits(x), Chunk::Digits(y)) => compare_numeric(x, y),
            (Chunk::Digits(_), Chunk::Char(c)) => Class::Digit.cmp(&class(c)),
            (Chunk::Char(c), Chunk::Digits(_)) => class(c).cmp(&Class::Digit),
            (Chunk::Char(x), Chunk::Char(y)) => compare_chars(x, y),
        }
    }
}

fn compare_chars(x: char, y: char) -> Ordering {
    let (cx, cy) = (class(x), class(y));
    if cx != cy {
        return cx.cmp(&cy);
    }
    match cx {
        Class::Punctuation => punctuation_rank(x).cmp(&punctuation_rank(y)),
        Class::Letter => x.to_lowercase().cmp(y.to_lowercase()),
        Class::Whitespace | Class::Digit => x.cmp(&y),
    }
}

/// Compares two digit runs by value without parsing, so arbitrarily long
/// runs cannot overflow.
fn compare_numeric(x: &str, y: &str) -> Ordering {
    let x = x.trim_start_matches('0');
    let y = y.trim_start_matches('0');
    x.len().cmp(&y.len()).then_with(|| x.cmp(y))
}

/// Splits a name into digit runs and single other characters.
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Iterator for Chunks<'a> {
    type Item = Chunk<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        let first = self.rest.chars().next()?;
        if !first.is_ascii_digit() {
            self.rest = &self.rest[first.len_utf8()..];
            return Some(Chunk::Char(first));
        }

        let end = self
            .rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(self.rest.len());
        let (digits, tail) = self.rest.split_at(end);
        self.rest = tail;
        Some(Chunk::Digits(digits))
    }
}
