#![forbid(unsafe_code)]

//! Visibility predicates.
//!
//! A [`Predicate`] decides whether an item stays visible for a query. It is a
//! plain two-argument function: the [`Query`] (values of every bound input)
//! and an [`ItemView`] giving read access to the candidate element.
//!
//! The default, [`regex_match`], tests the query as a case-insensitive
//! regular expression against the item's text content. Queries that are not
//! valid patterns (`"("`, `"[a-"`, ...) are matched literally instead.

use std::cell::RefCell;
use std::rc::Rc;

use regex::{Regex, RegexBuilder};
use sift_core::{Document, NodeId};

/// Shared visibility test: `true` keeps the item visible.
pub type Predicate = Rc<dyn Fn(&Query, &ItemView<'_>) -> bool>;

/// The current values of a filterable's bound inputs.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Query {
    values: Vec<String>,
}

impl Query {
    /// Build a query from input values in binding order.
    #[must_use]
    pub fn new(values: Vec<String>) -> Self {
        Self { values }
    }

    /// A query with a single value.
    #[must_use]
    pub fn single(text: impl Into<String>) -> Self {
        Self {
            values: vec![text.into()],
        }
    }

    /// The value of the first bound input, or `""` without inputs.
    #[must_use]
    pub fn text(&self) -> &str {
        self.values.first().map_or("", String::as_str)
    }

    /// Values of every bound input.
    #[must_use]
    pub fn values(&self) -> &[String] {
        &self.values
    }

    /// Whether the primary text is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.text().is_empty()
    }
}

/// Read-only view of a candidate item.
#[derive(Clone, Copy)]
pub struct ItemView<'a> {
    doc: &'a Document,
    node: NodeId,
}

impl<'a> ItemView<'a> {
    #[must_use]
    pub fn new(doc: &'a Document, node: NodeId) -> Self {
        Self { doc, node }
    }

    /// The item's handle.
    #[must_use]
    pub fn node(&self) -> NodeId {
        self.node
    }

    /// The whole document, for predicates that look around the item.
    #[must_use]
    pub fn document(&self) -> &'a Document {
        self.doc
    }

    /// Concatenated text of the item and its descendants.
    #[must_use]
    pub fn text(&self) -> String {
        self.doc.text_content(self.node)
    }

    #[must_use]
    pub fn attr(&self, name: &str) -> Option<&'a str> {
        self.doc.attr(self.node, name)
    }

    #[must_use]
    pub fn has_class(&self, class: &str) -> bool {
        self.doc.has_class(self.node, class)
    }
}

impl std::fmt::Debug for ItemView<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ItemView").field("node", &self.node).finish()
    }
}

/// Wrap a closure as a [`Predicate`].
pub fn from_fn(f: impl Fn(&Query, &ItemView<'_>) -> bool + 'static) -> Predicate {
    Rc::new(f)
}

#[derive(Debug)]
enum Matcher {
    Pattern(Regex),
    Literal { needle: String, fold: bool },
}

impl Matcher {
    fn compile(query: &str, case_sensitive: bool) -> Self {
        let build = |pattern: &str| {
            RegexBuilder::new(pattern)
                .case_insensitive(!case_sensitive)
                .build()
        };
        match build(query) {
            Ok(re) => Self::Pattern(re),
            Err(err) => {
                tracing::debug!(query, %err, "query is not a valid pattern, matching literally");
                match build(&regex::escape(query)) {
                    Ok(re) => Self::Pattern(re),
                    // Escaped patterns only fail on size limits.
                    Err(_) if case_sensitive => Self::Literal {
                        needle: query.to_owned(),
                        fold: false,
                    },
                    Err(_) => Self::Literal {
                        needle: query.to_lowercase(),
                        fold: true,
                    },
                }
            }
        }
    }

    fn is_match(&self, text: &str) -> bool {
        match self {
            Self::Pattern(re) => re.is_match(text),
            Self::Literal { needle, fold: true } => text.to_lowercase().contains(needle.as_str()),
            Self::Literal { needle, fold: false } => text.contains(needle.as_str()),
        }
    }
}

/// Case-insensitive regular expression test of the query against item text.
///
/// The compiled pattern is cached per predicate and rebuilt only when the
/// query text changes.
#[must_use]
pub fn regex_match() -> Predicate {
    regex_match_with(false)
}

/// Regular expression test with explicit case handling.
#[must_use]
pub fn regex_match_with(case_sensitive: bool) -> Predicate {
    let cache: RefCell<Option<(String, Rc<Matcher>)>> = RefCell::new(None);
    Rc::new(move |query: &Query, item: &ItemView<'_>| {
        let text = query.text();
        let matcher = {
            let mut slot = cache.borrow_mut();
            match slot.as_ref() {
                Some((cached, m)) if cached == text => Rc::clone(m),
                _ => {
                    let m = Rc::new(Matcher::compile(text, case_sensitive));
                    *slot = Some((text.to_owned(), Rc::clone(&m)));
                    m
                }
            }
        };
        matcher.is_match(&item.text())
    })
}

/// Plain substring test of the query against item text.
#[must_use]
pub fn substring(case_sensitive: bool) -> Predicate {
    Rc::new(move |query: &Query, item: &ItemView<'_>| {
        let text = item.text();
        if case_sensitive {
            text.contains(query.text())
        } else {
            text.to_lowercase().contains(&query.text().to_lowercase())
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn check(pred: &Predicate, query: &str, text: &str) -> bool {
        let mut doc = Document::new();
        let n = doc.create_text_element("li", text);
        pred(&Query::single(query), &ItemView::new(&doc, n))
    }

    #[test]
    fn regex_is_case_insensitive() {
        let p = regex_match();
        assert!(check(&p, "AN", "banana"));
        assert!(!check(&p, "an", "cherry"));
    }

    #[test]
    fn regex_supports_patterns() {
        let p = regex_match();
        assert!(check(&p, "^ch", "Cherry"));
        assert!(!check(&p, "^ch", "peach"));
        assert!(check(&p, "a.p", "apple"), "'.' is a wildcard");
    }

    #[test]
    fn invalid_pattern_falls_back_to_literal() {
        let p = regex_match();
        assert!(check(&p, "F(x", "call f(x) now"));
        assert!(!check(&p, "f(x", "fx"));
        assert!(check(&p, "(", "f(x)"));
        assert!(check(&p, "[a-", "range [A-Z]"));
    }

    #[test]
    fn case_sensitive_regex() {
        let p = regex_match_with(true);
        assert!(check(&p, "^Ch", "Cherry"));
        assert!(!check(&p, "^ch", "Cherry"));
        assert!(check(&p, "(", "f(x)"));
    }

    #[test]
    fn empty_query_matches_everything() {
        let p = regex_match();
        assert!(check(&p, "", "anything"));
        assert!(check(&p, "", ""));
        let s = substring(false);
        assert!(check(&s, "", "anything"));
    }

    #[test]
    fn substring_case_modes() {
        let insensitive = substring(false);
        let sensitive = substring(true);
        assert!(check(&insensitive, "APP", "apple"));
        assert!(!check(&sensitive, "APP", "apple"));
        assert!(check(&sensitive, "app", "apple"));
        assert!(!check(&insensitive, "a.p", "apple"), "no pattern syntax");
    }

    #[test]
    fn cached_matcher_follows_query_changes() {
        let p = regex_match();
        let mut doc = Document::new();
        let n = doc.create_text_element("li", "apple");
        let view = ItemView::new(&doc, n);
        assert!(p(&Query::single("app"), &view));
        assert!(!p(&Query::single("pear"), &view));
        assert!(p(&Query::single("app"), &view));
    }

    #[test]
    fn query_primary_text() {
        assert_eq!(Query::default().text(), "");
        assert!(Query::default().is_empty());
        let q = Query::new(vec!["first".into(), "second".into()]);
        assert_eq!(q.text(), "first");
        assert_eq!(q.values().len(), 2);
    }

    #[test]
    fn item_view_reads_element() {
        let mut doc = Document::new();
        let li = doc.create_text_element("li", "Red ");
        let b = doc.create_text_element("b", "apple");
        doc.append_child(li, b).unwrap();
        doc.set_attr(li, "data-color", "red").unwrap();
        doc.add_class(li, "fruit");
        let view = ItemView::new(&doc, li);
        assert_eq!(view.text(), "Red apple");
        assert_eq!(view.attr("data-color"), Some("red"));
        assert!(view.has_class("fruit"));
        assert_eq!(view.node(), li);
        assert_eq!(view.document().tag(li), Some("li"));
    }

    #[test]
    fn from_fn_wraps_closure() {
        let p = from_fn(|q, item| item.text().len() > q.text().len());
        assert!(check(&p, "ab", "abc"));
        assert!(!check(&p, "abcd", "abc"));
    }
}
