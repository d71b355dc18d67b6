#![forbid(unsafe_code)]

//! A small CSS selector engine over [`Document`].
//!
//! Supported grammar:
//!
//! ```text
//! selector  := complex ("," complex)*
//! complex   := compound (whitespace compound)*      // descendant combinator
//! compound  := (tag | "*")? (("#" ident) | ("." ident) | attribute)*
//! attribute := "[" ident ("=" (ident | quoted))? "]"
//! ```
//!
//! Pseudo-classes and the child/sibling combinators are not supported.
//!
//! # Example
//!
//! ```
//! use sift_core::dom::Document;
//! use sift_core::selector::Selector;
//!
//! let mut doc = Document::new();
//! let ul = doc.create_element("ul");
//! doc.append_root(ul).unwrap();
//! let li = doc.create_text_element("li", "apple");
//! doc.add_class(li, "fruit");
//! doc.append_child(ul, li).unwrap();
//!
//! let sel = Selector::parse("ul li.fruit").unwrap();
//! assert_eq!(sel.select(&doc, ul), vec![li]);
//! ```

use crate::dom::{Document, NodeId};

/// Errors from [`Selector::parse`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SelectorError {
    /// The selector (or one comma-separated group) is empty.
    Empty,
    /// A character that cannot start or continue a selector component.
    UnexpectedChar { position: usize, found: char },
    /// An attribute test is missing its closing `]`.
    UnterminatedAttribute,
}

impl std::fmt::Display for SelectorError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Empty => write!(f, "empty selector"),
            Self::UnexpectedChar { position, found } => {
                write!(f, "unexpected character '{found}' at position {position}")
            }
            Self::UnterminatedAttribute => write!(f, "unterminated attribute selector"),
        }
    }
}

impl std::error::Error for SelectorError {}

#[derive(Debug, Clone, PartialEq, Eq)]
struct AttrTest {
    name: String,
    value: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
struct Compound {
    tag: Option<String>,
    id: Option<String>,
    classes: Vec<String>,
    attrs: Vec<AttrTest>,
}

impl Compound {
    fn matches(&self, doc: &Document, node: NodeId) -> bool {
        if let Some(tag) = &self.tag
            && doc.tag(node) != Some(tag.as_str())
        {
            return false;
        }
        if let Some(id) = &self.id
            && doc.element_id(node) != Some(id.as_str())
        {
            return false;
        }
        if !self.classes.iter().all(|c| doc.has_class(node, c)) {
            return false;
        }
        self.attrs.iter().all(|a| match (&a.value, doc.attr(node, &a.name)) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(want), Some(got)) => want == got,
        })
    }
}

/// A parsed selector list.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    source: String,
    groups: Vec<Vec<Compound>>,
}

impl Selector {
    /// Parse a selector list.
    pub fn parse(input: &str) -> Result<Self, SelectorError> {
        let mut parser = Parser {
            chars: input.char_indices().collect(),
            pos: 0,
        };
        let groups = parser.selector_list()?;
        Ok(Self {
            source: input.trim().to_owned(),
            groups,
        })
    }

    /// The selector text as given (trimmed).
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Whether `node` matches any group.
    ///
    /// Ancestor compounds may match anywhere above `node`, not only inside a
    /// particular scope.
    #[must_use]
    pub fn matches(&self, doc: &Document, node: NodeId) -> bool {
        self.groups.iter().any(|g| matches_complex(doc, node, g))
    }

    /// Matching strict descendants of `scope`, in document order.
    #[must_use]
    pub fn select(&self, doc: &Document, scope: NodeId) -> Vec<NodeId> {
        doc.descendants(scope)
            .into_iter()
            .filter(|&n| self.matches(doc, n))
            .collect()
    }

    /// Matching attached nodes across the whole document, in document order.
    #[must_use]
    pub fn select_all(&self, doc: &Document) -> Vec<NodeId> {
        doc.attached_nodes()
            .into_iter()
            .filter(|&n| self.matches(doc, n))
            .collect()
    }
}

impl std::str::FromStr for Selector {
    type Err = SelectorError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl std::fmt::Display for Selector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.source)
    }
}

fn matches_complex(doc: &Document, node: NodeId, chain: &[Compound]) -> bool {
    let Some((last, ancestors)) = chain.split_last() else {
        return false;
    };
    if !last.matches(doc, node) {
        return false;
    }
    // Descendant-only chains: nearest matching ancestor is always a valid pick.
    let mut current = doc.parent(node);
    for compound in ancestors.iter().rev() {
        loop {
            let Some(candidate) = current else {
                return false;
            };
            current = doc.parent(candidate);
            if compound.matches(doc, candidate) {
                break;
            }
        }
    }
    true
}

struct Parser {
    chars: Vec<(usize, char)>,
    pos: usize,
}

impl Parser {
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).map(|&(_, c)| c)
    }

    fn offset(&self) -> usize {
        self.chars.get(self.pos).map(|&(i, _)| i).unwrap_or_default()
    }

    fn unexpected(&self) -> SelectorError {
        match self.peek() {
            Some(found) => SelectorError::UnexpectedChar {
                position: self.offset(),
                found,
            },
            None => SelectorError::Empty,
        }
    }

    fn skip_ws(&mut self) -> bool {
        let start = self.pos;
        while self.peek().is_some_and(char::is_whitespace) {
            self.pos += 1;
        }
        self.pos != start
    }

    fn selector_list(&mut self) -> Result<Vec<Vec<Compound>>, SelectorError> {
        let mut groups = Vec::new();
        loop {
            self.skip_ws();
            let group = self.complex()?;
            if group.is_empty() {
                return Err(SelectorError::Empty);
            }
            groups.push(group);
            match self.peek() {
                None => return Ok(groups),
                Some(',') => self.pos += 1,
                Some(_) => return Err(self.unexpected()),
            }
        }
    }

    fn complex(&mut self) -> Result<Vec<Compound>, SelectorError> {
        let mut chain = Vec::new();
        while let Some(compound) = self.compound()? {
            chain.push(compound);
            let had_ws = self.skip_ws();
            match self.peek() {
                None | Some(',') => break,
                Some(_) if had_ws => continue,
                Some(_) => return Err(self.unexpected()),
            }
        }
        Ok(chain)
    }

    fn compound(&mut self) -> Result<Option<Compound>, SelectorError> {
        let mut compound = Compound::default();
        let mut any = false;
        match self.peek() {
            Some('*') => {
                self.pos += 1;
                any = true;
            }
            Some(c) if is_ident_char(c) => {
                compound.tag = Some(self.ident()?.to_ascii_lowercase());
                any = true;
            }
            _ => {}
        }
        loop {
            match self.peek() {
                Some('#') => {
                    self.pos += 1;
                    compound.id = Some(self.ident()?);
                }
                Some('.') => {
                    self.pos += 1;
                    compound.classes.push(self.ident()?);
                }
                Some('[') => {
                    self.pos += 1;
                    compound.attrs.push(self.attribute()?);
                }
                _ => break,
            }
            any = true;
        }
        Ok(any.then_some(compound))
    }

    fn ident(&mut self) -> Result<String, SelectorError> {
        let start = self.pos;
        while self.peek().is_some_and(is_ident_char) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(self.unexpected());
        }
        Ok(self.chars[start..self.pos].iter().map(|&(_, c)| c).collect())
    }

    fn attribute(&mut self) -> Result<AttrTest, SelectorError> {
        self.skip_ws();
        if self.peek().is_none() {
            return Err(SelectorError::UnterminatedAttribute);
        }
        let name = self.ident()?.to_ascii_lowercase();
        self.skip_ws();
        let value = match self.peek() {
            Some('=') => {
                self.pos += 1;
                self.skip_ws();
                Some(self.attr_value()?)
            }
            _ => None,
        };
        self.skip_ws();
        match self.peek() {
            Some(']') => {
                self.pos += 1;
                Ok(AttrTest { name, value })
            }
            None => Err(SelectorError::UnterminatedAttribute),
            Some(_) => Err(self.unexpected()),
        }
    }

    fn attr_value(&mut self) -> Result<String, SelectorError> {
        match self.peek() {
            Some(quote @ ('"' | '\'')) => {
                self.pos += 1;
                let mut out = String::new();
                loop {
                    match self.peek() {
                        None => return Err(SelectorError::UnterminatedAttribute),
                        Some(c) if c == quote => {
                            self.pos += 1;
                            return Ok(out);
                        }
                        Some(c) => {
                            out.push(c);
                            self.pos += 1;
                        }
                    }
                }
            }
            None => Err(SelectorError::UnterminatedAttribute),
            Some(_) => self.ident(),
        }
    }
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
