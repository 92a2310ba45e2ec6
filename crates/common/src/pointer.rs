// JSON-Pointer-style paths into a document tree.
//
// Tokens are `/`-separated and escaped (`~1` → `/`, `~0` → `~`). The empty
// pointer addresses the root. A final `-` token on an array addresses the
// slot one past the end and is only meaningful as a write target.

use std::fmt;

use serde_json::Value;
use thiserror::Error;

/// The append token for arrays.
pub const APPEND_TOKEN: &str = "-";

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PointerError {
    #[error("pointer `{0}` must be empty or start with `/`")]
    MissingLeadingSlash(String),
    #[error("pointer `{0}` contains an invalid `~` escape")]
    InvalidEscape(String),
}

/// A parsed pointer: the unescaped token list.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct Pointer {
    tokens: Vec<String>,
}

impl Pointer {
    pub fn root() -> Self {
        Self::default()
    }

    pub fn parse(raw: &str) -> Result<Self, PointerError> {
        if raw.is_empty() {
            return Ok(Self::root());
        }
        let Some(rest) = raw.strip_prefix('/') else {
            return Err(PointerError::MissingLeadingSlash(raw.to_owned()));
        };

        let tokens = rest
            .split('/')
            .map(|segment| {
                unescape(segment).ok_or_else(|| PointerError::InvalidEscape(raw.to_owned()))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { tokens })
    }

    pub fn from_tokens<I, S>(tokens: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { tokens: tokens.into_iter().map(Into::into).collect() }
    }

    pub fn tokens(&self) -> &[String] {
        &self.tokens
    }

    pub fn is_root(&self) -> bool {
        self.tokens.is_empty()
    }

    /// Last token, or `None` for the root.
    pub fn last(&self) -> Option<&str> {
        self.tokens.last().map(String::as_str)
    }

    /// Pointer to the containing node, or `None` for the root.
    pub fn parent(&self) -> Option<Pointer> {
        let (_, head) = self.tokens.split_last()?;
        Some(Self { tokens: head.to_vec() })
    }

    /// Child pointer with one more token appended.
    pub fn child(&self, token: impl Into<String>) -> Pointer {
        let mut tokens = self.tokens.clone();
        tokens.push(token.into());
        Self { tokens }
    }
}

impl fmt::Display for Pointer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for token in &self.tokens {
            write!(f, "/{}", escape(token))?;
        }
        Ok(())
    }
}

/// Escape a single token for inclusion in a pointer string.
pub fn escape(token: &str) -> String {
    token.replace('~', "~0").replace('/', "~1")
}

fn unescape(segment: &str) -> Option<String> {
    if !segment.contains('~') {
        return Some(segment.to_owned());
    }

    let mut out = String::with_capacity(segment.len());
    let mut chars = segment.chars();
    while let Some(ch) = chars.next() {
        if ch != '~' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('0') => out.push('~'),
            Some('1') => out.push('/'),
            _ => return None,
        }
    }
    Some(out)
}

// ── Array tokens ───────────────────────────────────────────────────

/// How a token addresses an array of a given length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArraySlot {
    /// An existing element.
    Index(usize),
    /// One past the end: `-`, or an index equal to the length.
    End,
    /// Numeric but past the end.
    OutOfBounds(usize),
    /// Not an array index at all.
    NotAnIndex,
}

/// Parse an array index token. Leading zeros are rejected.
pub fn parse_index(token: &str) -> Option<usize> {
    if token.is_empty() || !token.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if token.len() > 1 && token.starts_with('0') {
        return None;
    }
    token.parse().ok()
}

/// Whether a token looks like an array position (numeric or `-`).
pub fn is_index_like(token: &str) -> bool {
    token == APPEND_TOKEN || parse_index(token).is_some()
}

pub fn array_slot(token: &str, len: usize) -> ArraySlot {
    if token == APPEND_TOKEN {
        return ArraySlot::End;
    }
    match parse_index(token) {
        Some(index) if index < len => ArraySlot::Index(index),
        Some(index) if index == len => ArraySlot::End,
        Some(index) => ArraySlot::OutOfBounds(index),
        None => ArraySlot::NotAnIndex,
    }
}

// ── Resolution ─────────────────────────────────────────────────────

/// Outcome of resolving a pointer for reading.
///
/// `parent` and `key` are populated whenever the parent container exists,
/// even if the final token does not resolve, so a caller can tell
/// "missing leaf" apart from "missing parent".
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Resolution<'a> {
    pub value: Option<&'a Value>,
    pub parent: Option<&'a Value>,
    pub key: Option<&'a str>,
}

impl Resolution<'_> {
    pub fn resolves(&self) -> bool {
        self.value.is_some()
    }
}

/// Resolve `pointer` against `doc` for reading.
///
/// `-` never resolves for reading. Type mismatches and out-of-bounds
/// indices yield an unresolved result rather than an error.
pub fn resolve<'a>(doc: &'a Value, pointer: &'a Pointer) -> Resolution<'a> {
    let Some((last, head)) = pointer.tokens.split_last() else {
        return Resolution { value: Some(doc), parent: None, key: None };
    };

    let mut parent = doc;
    for token in head {
        match child(parent, token) {
            Some(next) => parent = next,
            None => return Resolution { value: None, parent: None, key: None },
        }
    }

    let parent_is_container = parent.is_object() || parent.is_array();
    Resolution {
        value: child(parent, last),
        parent: parent_is_container.then_some(parent),
        key: parent_is_container.then_some(last.as_str()),
    }
}

/// Read the value at `pointer`, if it resolves.
pub fn get<'a>(doc: &'a Value, pointer: &Pointer) -> Option<&'a Value> {
    pointer.tokens.iter().try_fold(doc, |node, token| child(node, token))
}

/// Mutable access to the value at `pointer`, if it resolves.
pub fn get_mut<'a>(doc: &'a mut Value, pointer: &Pointer) -> Option<&'a mut Value> {
    pointer.tokens.iter().try_fold(doc, |node, token| child_mut(node, token))
}

/// Mutable access to the container that holds the last token.
///
/// Returns `None` for the root pointer or when the parent does not
/// resolve to a mapping or sequence.
pub fn parent_mut<'a>(doc: &'a mut Value, pointer: &'a Pointer) -> Option<(&'a mut Value, &'a str)> {
    let (last, head) = pointer.tokens.split_last()?;
    let parent = head.iter().try_fold(doc, |node, token| child_mut(node, token))?;
    if parent.is_object() || parent.is_array() {
        Some((parent, last.as_str()))
    } else {
        None
    }
}

fn child<'a>(node: &'a Value, token: &str) -> Option<&'a Value> {
    match node {
        Value::Object(map) => map.get(token),
        Value::Array(items) => match array_slot(token, items.len()) {
            ArraySlot::Index(index) => items.get(index),
            _ => None,
        },
        _ => None,
    }
}

fn child_mut<'a>(node: &'a mut Value, token: &str) -> Option<&'a mut Value> {
    match node {
        Value::Object(map) => map.get_mut(token),
        Value::Array(items) => match array_slot(token, items.len()) {
            ArraySlot::Index(index) => items.get_mut(index),
            _ => None,
        },
        _ => None,
    }
}
