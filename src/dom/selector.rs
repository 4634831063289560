use std::fmt;

use crate::dom::tree::{DocumentInner, NodeId};
use crate::error::NavError;

// ============================================================================
// Selector model
// ============================================================================

/// Compiled CSS selector (the subset used for message discovery).
///
/// Supported: type selectors, `*`, `#id`, `.class`, `[attr]`, `[attr="v"]`,
/// `[attr^="v"]`, `[attr*="v"]`, descendant and child (`>`) combinators, and
/// comma-separated groups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Complex>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Complex {
    /// Each compound carries the combinator linking it to the one on its left.
    parts: Vec<(Combinator, Compound)>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Combinator {
    Descendant,
    Child,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    conditions: Vec<Condition>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Condition {
    Id(String),
    Class(String),
    Attr { name: String, op: AttrOp },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum AttrOp {
    Exists,
    Equals(String),
    Prefix(String),
    Contains(String),
}

impl Selector {
    pub fn parse(source: &str) -> Result<Self, NavError> {
        let mut parser = Parser {
            chars: source.chars().collect(),
            pos: 0,
            source,
        };
        let groups = parser.parse_groups()?;
        Ok(Self {
            source: source.trim().to_string(),
            groups,
        })
    }

    /// `[name="value"]`
    pub fn attr_equals(name: &str, value: &str) -> Self {
        Self {
            source: format!("[{name}=\"{value}\"]"),
            groups: vec![Complex {
                parts: vec![(
                    Combinator::Descendant,
                    Compound {
                        tag: None,
                        conditions: vec![Condition::Attr {
                            name: name.to_ascii_lowercase(),
                            op: AttrOp::Equals(value.to_string()),
                        }],
                    },
                )],
            }],
        }
    }

    /// A chain of type selectors joined by descendant combinators, e.g.
    /// `["main", "article"]` for `main article`.
    pub fn tag_path(tags: &[&str]) -> Self {
        let parts = tags
            .iter()
            .map(|tag| {
                (
                    Combinator::Descendant,
                    Compound {
                        tag: Some(tag.to_ascii_lowercase()),
                        conditions: vec![],
                    },
                )
            })
            .collect();
        Self {
            source: tags.join(" "),
            groups: vec![Complex { parts }],
        }
    }

    /// Selector group matching anything either side matches.
    pub fn union(mut self, other: Selector) -> Self {
        self.source = format!("{}, {}", self.source, other.source);
        self.groups.extend(other.groups);
        self
    }

    pub fn as_str(&self) -> &str {
        &self.source
    }

    pub(crate) fn matches(&self, doc: &DocumentInner, node: NodeId) -> bool {
        self.groups.iter().any(|complex| complex.matches(doc, node))
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

impl std::str::FromStr for Selector {
    type Err = NavError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

// ============================================================================
// Matching (right to left)
// ============================================================================

impl Complex {
    fn matches(&self, doc: &DocumentInner, node: NodeId) -> bool {
        match self.parts.len() {
            0 => false,
            n => self.matches_at(doc, node, n - 1),
        }
    }

    fn matches_at(&self, doc: &DocumentInner, node: NodeId, idx: usize) -> bool {
        let (combinator, compound) = &self.parts[idx];
        if !compound.matches(doc, node) {
            return false;
        }
        if idx == 0 {
            return true;
        }
        match combinator {
            Combinator::Child => doc
                .parent(node)
                .is_some_and(|parent| self.matches_at(doc, parent, idx - 1)),
            Combinator::Descendant => {
                let mut current = doc.parent(node);
                while let Some(ancestor) = current {
                    if self.matches_at(doc, ancestor, idx - 1) {
                        return true;
                    }
                    current = doc.parent(ancestor);
                }
                false
            }
        }
    }
}

impl Compound {
    fn matches(&self, doc: &DocumentInner, node: NodeId) -> bool {
        let Some(tag) = doc.tag(node) else {
            return false;
        };
        if let Some(expected) = &self.tag {
            if !expected.eq_ignore_ascii_case(tag) {
                return false;
            }
        }
        self.conditions.iter().all(|condition| match condition {
            Condition::Id(id) => doc.attr(node, "id") == Some(id.as_str()),
            Condition::Class(class) => doc
                .attr(node, "class")
                .is_some_and(|classes| classes.split_whitespace().any(|c| c == class)),
            Condition::Attr { name, op } => match (doc.attr(node, name), op) {
                (None, _) => false,
                (Some(_), AttrOp::Exists) => true,
                (Some(value), AttrOp::Equals(expected)) => value == expected,
                (Some(value), AttrOp::Prefix(prefix)) => {
                    !prefix.is_empty() && value.starts_with(prefix.as_str())
                }
                (Some(value), AttrOp::Contains(needle)) => {
                    !needle.is_empty() && value.contains(needle.as_str())
                }
            },
        })
    }
}

// ============================================================================
// Parser
// ============================================================================

struct Parser<'a> {
    chars: Vec<char>,
    pos: usize,
    source: &'a str,
}

impl Parser<'_> {
    fn error(&self, reason: impl Into<String>) -> NavError {
        NavError::Selector {
            selector: self.source.to_string(),
            reason: reason.into(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos > start
    }

    fn expect(&mut self, expected: char) -> Result<(), NavError> {
        match self.peek() {
            Some(c) if c == expected => {
                self.pos += 1;
                Ok(())
            }
            Some(c) => Err(self.error(format!("expected '{expected}', found '{c}'"))),
            None => Err(self.error(format!("expected '{expected}', found end of input"))),
        }
    }

    fn parse_groups(&mut self) -> Result<Vec<Complex>, NavError> {
        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            groups.push(self.parse_complex()?);
            self.skip_ws();
            match self.peek() {
                Some(',') => self.pos += 1,
                None => return Ok(groups),
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
    }

    fn parse_complex(&mut self) -> Result<Complex, NavError> {
        let mut parts = vec![(Combinator::Descendant, self.parse_compound()?)];
        loop {
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some('>') => {
                    self.pos += 1;
                    self.skip_ws();
                    parts.push((Combinator::Child, self.parse_compound()?));
                }
                Some(_) if had_ws => {
                    parts.push((Combinator::Descendant, self.parse_compound()?));
                }
                Some(c) => return Err(self.error(format!("unexpected '{c}'"))),
            }
        }
        Ok(Complex { parts })
    }

    fn parse_compound(&mut self) -> Result<Compound, NavError> {
        let mut compound = Compound::default();
        let mut universal = false;

        match self.peek() {
            Some('*') => {
                self.pos += 1;
                universal = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
            }
            _ => {}
        }

        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Id(self.ident()?));
                }
                Some('.') => {
                    self.pos += 1;
                    compound.conditions.push(Condition::Class(self.ident()?));
                }
                Some('[') => {
                    self.pos += 1;
                    compound.conditions.push(self.parse_attr()?);
                }
                _ => break,
            }
        }

        if !universal && compound.tag.is_none() && compound.conditions.is_empty() {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected selector, found '{c}'")),
                None => self.error("expected selector, found end of input"),
            });
        }
        Ok(compound)
    }

    fn parse_attr(&mut self) -> Result<Condition, NavError> {
        self.skip_ws();
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();

        let op = match self.peek() {
            Some(']') => {
                self.pos += 1;
                return Ok(Condition::Attr {
                    name,
                    op: AttrOp::Exists,
                });
            }
            Some('=') => {
                self.pos += 1;
                AttrOp::Equals(self.attr_value()?)
            }
            Some('^') => {
                self.pos += 1;
                self.expect('=')?;
                AttrOp::Prefix(self.attr_value()?)
            }
            Some('*') => {
                self.pos += 1;
                self.expect('=')?;
                AttrOp::Contains(self.attr_value()?)
            }
            Some(c) => return Err(self.error(format!("unsupported attribute operator '{c}'"))),
            None => return Err(self.error("unterminated attribute selector")),
        };

        self.skip_ws();
        self.expect(']')?;
        Ok(Condition::Attr { name, op })
    }

    fn attr_value(&mut self) -> Result<String, NavError> {
        self.skip_ws();
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut value = String::new();
                loop {
                    match self.peek() {
                        Some('\\') => {
                            self.pos += 1;
                            if let Some(escaped) = self.peek() {
                                value.push(escaped);
                                self.pos += 1;
                            }
                        }
                        Some(c) if c == quote => {
                            self.pos += 1;
                            return Ok(value);
                        }
                        Some(c) => {
                            value.push(c);
                            self.pos += 1;
                        }
                        None => return Err(self.error("unterminated string")),
                    }
                }
            }
            _ => self.ident(),
        }
    }

    fn ident(&mut self) -> Result<String, NavError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(match self.peek() {
                Some(c) => self.error(format!("expected identifier, found '{c}'")),
                None => self.error("expected identifier, found end of input"),
            });
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
