#![forbid(unsafe_code)]

//! Arena-backed element tree.
//!
//! [`Document`] stores every element it ever created in a flat arena and hands
//! out copyable [`NodeId`] handles. Elements form a forest: a node is either a
//! root, a child of another node, or detached (freshly created or removed).
//!
//! # Invariants
//!
//! 1. A node has at most one parent, and appears exactly once in that
//!    parent's child list (or once in the root list).
//! 2. The tree is acyclic: a node can never be appended under itself or one
//!    of its descendants.
//! 3. Class lists never contain duplicates; insertion order is preserved.
//! 4. [`Document::descendants`] and [`Document::text_content`] walk in
//!    document (pre-order) order.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown id | Handle from another document | Accessors return `None`/empty, mutators return [`DomError::UnknownNode`] |
//! | Cycle | Appending an ancestor under its descendant | [`DomError::HierarchyCycle`] |
//! | Bad reference | `insert_before` reference is detached | [`DomError::NotAttached`] |
//! | Arena full | More than `u32::MAX + 1` elements created | [`Document::try_create_element`] returns [`DomError::CapacityExceeded`]; [`Document::create_element`] panics |

use ahash::AHashMap;

/// Handle to an element inside a [`Document`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Arena index of this node.
    #[inline]
    #[must_use]
    pub const fn index(self) -> usize {
        self.0 as usize
    }

    /// Handle for arena slot `index`, if it fits the id space.
    fn from_index(index: usize) -> Result<Self, DomError> {
        u32::try_from(index)
            .map(Self)
            .map_err(|_| DomError::CapacityExceeded)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Errors from tree mutations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DomError {
    /// The handle does not belong to this document.
    UnknownNode(NodeId),
    /// The mutation would make a node its own ancestor.
    HierarchyCycle { parent: NodeId, child: NodeId },
    /// The reference node is not attached anywhere.
    NotAttached(NodeId),
    /// Every node id is already in use.
    CapacityExceeded,
}

impl std::fmt::Display for DomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::UnknownNode(id) => write!(f, "unknown node {id}"),
            Self::HierarchyCycle { parent, child } => {
                write!(f, "cannot append {child} under its own descendant {parent}")
            }
            Self::NotAttached(id) => write!(f, "reference node {id} is not attached"),
            Self::CapacityExceeded => f.write_str("document has no node ids left"),
        }
    }
}

impl std::error::Error for DomError {}

/// What kind of form control an element is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlKind {
    /// `<input>` without a type, or with `type="text"`.
    TextInput,
    /// `<textarea>`.
    TextArea,
    /// Any other form control (checkbox, radio, `<select>`, ...).
    OtherInput,
    /// Not a form control.
    NotAControl,
}

impl ControlKind {
    /// Whether keystrokes edit the control's value.
    #[must_use]
    pub const fn is_text_entry(self) -> bool {
        matches!(self, Self::TextInput | Self::TextArea)
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    id: Option<String>,
    classes: Vec<String>,
    attrs: AHashMap<String, String>,
    text: String,
    value: String,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl Node {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            id: None,
            classes: Vec::new(),
            attrs: AHashMap::new(),
            text: String::new(),
            value: String::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// A forest of elements.
#[derive(Debug, Clone, Default)]
pub struct Document {
    nodes: Vec<Node>,
    roots: Vec<NodeId>,
}

impl Document {
    /// Create an empty document.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a detached element. Tag names are stored lowercase.
    ///
    /// # Panics
    ///
    /// If the document already holds `u32::MAX + 1` elements. Use
    /// [`try_create_element`](Self::try_create_element) to handle that case.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        match self.try_create_element(tag) {
            Ok(id) => id,
            Err(e) => panic!("create_element({tag:?}): {e}"),
        }
    }

    /// Create a detached element, or fail once the id space is exhausted.
    pub fn try_create_element(&mut self, tag: &str) -> Result<NodeId, DomError> {
        let id = NodeId::from_index(self.nodes.len())?;
        self.nodes.push(Node::new(tag));
        Ok(id)
    }

    /// Create a detached element with its own text.
    pub fn create_text_element(&mut self, tag: &str, text: impl Into<String>) -> NodeId {
        let id = self.create_element(tag);
        self.nodes[id.index()].text = text.into();
        id
    }

    /// Number of elements ever created (attached or not).
    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no element was ever created.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Whether `node` is a handle issued by this document.
    #[must_use]
    pub fn exists(&self, node: NodeId) -> bool {
        node.index() < self.nodes.len()
    }

    fn node(&self, node: NodeId) -> Result<&Node, DomError> {
        self.nodes.get(node.index()).ok_or(DomError::UnknownNode(node))
    }

    fn node_mut(&mut self, node: NodeId) -> Result<&mut Node, DomError> {
        self.nodes
            .get_mut(node.index())
            .ok_or(DomError::UnknownNode(node))
    }

    // -----------------------------------------------------------------------
    // Structure
    // -----------------------------------------------------------------------

    /// Root elements in order.
    #[must_use]
    pub fn roots(&self) -> &[NodeId] {
        &self.roots
    }

    /// Parent of `node`, if it has one.
    #[must_use]
    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.node(node).ok().and_then(|n| n.parent)
    }

    /// Direct children of `node` in order.
    #[must_use]
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        self.node(node).map(|n| n.children.as_slice()).unwrap_or(&[])
    }

    /// Whether `node` is reachable from a root.
    #[must_use]
    pub fn contains(&self, node: NodeId) -> bool {
        if !self.exists(node) {
            return false;
        }
        let mut current = node;
        while let Some(parent) = self.parent(current) {
            current = parent;
        }
        self.roots.contains(&current)
    }

    /// Whether `ancestor` is a strict ancestor of `node`.
    #[must_use]
    pub fn is_ancestor(&self, ancestor: NodeId, node: NodeId) -> bool {
        let mut current = self.parent(node);
        while let Some(p) = current {
            if p == ancestor {
                return true;
            }
            current = self.parent(p);
        }
        false
    }

    /// Append `node` to the root list, detaching it first.
    pub fn append_root(&mut self, node: NodeId) -> Result<(), DomError> {
        self.node(node)?;
        self.detach(node);
        self.roots.push(node);
        Ok(())
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) -> Result<(), DomError> {
        self.node(parent)?;
        self.node(child)?;
        if parent == child || self.is_ancestor(child, parent) {
            return Err(DomError::HierarchyCycle { parent, child });
        }
        self.detach(child);
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Insert `node` immediately before `reference` among its siblings (or
    /// among the roots when `reference` is a root).
    pub fn insert_before(&mut self, node: NodeId, reference: NodeId) -> Result<(), DomError> {
        self.node(node)?;
        self.node(reference)?;
        if node == reference {
            return Ok(());
        }
        match self.parent(reference) {
            Some(parent) => {
                if self.is_ancestor(node, parent) || node == parent {
                    return Err(DomError::HierarchyCycle { parent, child: node });
                }
                self.detach(node);
                let siblings = &mut self.node_mut(parent)?.children;
                let at = siblings
                    .iter()
                    .position(|&c| c == reference)
                    .unwrap_or(siblings.len());
                siblings.insert(at, node);
                self.node_mut(node)?.parent = Some(parent);
            }
            None => {
                if !self.roots.contains(&reference) {
                    return Err(DomError::NotAttached(reference));
                }
                self.detach(node);
                let at = self
                    .roots
                    .iter()
                    .position(|&r| r == reference)
                    .unwrap_or(self.roots.len());
                self.roots.insert(at, node);
            }
        }
        Ok(())
    }

    /// Detach `node` (and its subtree) from the tree.
    ///
    /// Returns `false` if the node was already detached or unknown.
    pub fn remove(&mut self, node: NodeId) -> bool {
        if !self.exists(node) {
            return false;
        }
        let was_attached = self.parent(node).is_some() || self.roots.contains(&node);
        self.detach(node);
        was_attached
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.index()].parent.take() {
            self.nodes[parent.index()].children.retain(|&c| c != node);
        } else {
            self.roots.retain(|&r| r != node);
        }
    }

    /// All strict descendants of `node` in document order.
    #[must_use]
    pub fn descendants(&self, node: NodeId) -> Vec<NodeId> {
        let mut out = Vec::new();
        let mut stack: Vec<NodeId> = self.children(node).iter().rev().copied().collect();
        while let Some(next) = stack.pop() {
            out.push(next);
            stack.extend(self.children(next).iter().rev().copied());
        }
        out
    }

    /// Every attached node in document order.
    #[must_use]
    pub fn attached_nodes(&self) -> Vec<NodeId> {
        let mut out = Vec::new();
        for &root in &self.roots {
            out.push(root);
            out.extend(self.descendants(root));
        }
        out
    }

    // -----------------------------------------------------------------------
    // Content
    // -----------------------------------------------------------------------

    /// Lowercase tag name.
    #[must_use]
    pub fn tag(&self, node: NodeId) -> Option<&str> {
        self.node(node).ok().map(|n| n.tag.as_str())
    }

    /// The element's id attribute.
    #[must_use]
    pub fn element_id(&self, node: NodeId) -> Option<&str> {
        self.node(node).ok().and_then(|n| n.id.as_deref())
    }

    /// Set the element's id attribute.
    pub fn set_element_id(&mut self, node: NodeId, id: impl Into<String>) -> Result<(), DomError> {
        self.node_mut(node)?.id = Some(id.into());
        Ok(())
    }

    /// Replace the element's own text.
    pub fn set_text(&mut self, node: NodeId, text: impl Into<String>) -> Result<(), DomError> {
        self.node_mut(node)?.text = text.into();
        Ok(())
    }

    /// Own text followed by the text of every descendant, in document order.
    #[must_use]
    pub fn text_content(&self, node: NodeId) -> String {
        let Ok(n) = self.node(node) else {
            return String::new();
        };
        let mut out = n.text.clone();
        for d in self.descendants(node) {
            out.push_str(&self.nodes[d.index()].text);
        }
        out
    }

    /// Current value of a form control (empty for other elements).
    #[must_use]
    pub fn value(&self, node: NodeId) -> &str {
        self.node(node).map(|n| n.value.as_str()).unwrap_or("")
    }

    /// Set the value of a form control.
    pub fn set_value(&mut self, node: NodeId, value: impl Into<String>) -> Result<(), DomError> {
        self.node_mut(node)?.value = value.into();
        Ok(())
    }

    /// Attribute lookup. Names are case-insensitive.
    #[must_use]
    pub fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        let n = self.node(node).ok()?;
        let name = name.to_ascii_lowercase();
        if name == "id" {
            return n.id.as_deref();
        }
        n.attrs.get(&name).map(String::as_str)
    }

    /// Set an attribute. `id` is routed to the element id.
    pub fn set_attr(
        &mut self,
        node: NodeId,
        name: &str,
        value: impl Into<String>,
    ) -> Result<(), DomError> {
        let name = name.to_ascii_lowercase();
        let n = self.node_mut(node)?;
        if name == "id" {
            n.id = Some(value.into());
        } else {
            n.attrs.insert(name, value.into());
        }
        Ok(())
    }

    /// Classify the element as a form control.
    #[must_use]
    pub fn control_kind(&self, node: NodeId) -> ControlKind {
        match self.tag(node) {
            Some("input") => match self.attr(node, "type") {
                None => ControlKind::TextInput,
                Some(t) if t.eq_ignore_ascii_case("text") => ControlKind::TextInput,
                Some(_) => ControlKind::OtherInput,
            },
            Some("textarea") => ControlKind::TextArea,
            Some("select") => ControlKind::OtherInput,
            _ => ControlKind::NotAControl,
        }
    }

    // -----------------------------------------------------------------------
    // Classes
    // -----------------------------------------------------------------------

    /// Classes in insertion order.
    #[must_use]
    pub fn classes(&self, node: NodeId) -> &[String] {
        self.node(node).map(|n| n.classes.as_slice()).unwrap_or(&[])
    }

    /// Whether the element carries `class`.
    #[must_use]
    pub fn has_class(&self, node: NodeId, class: &str) -> bool {
        self.classes(node).iter().any(|c| c == class)
    }

    /// Add `class`; returns `true` if it was not present before.
    pub fn add_class(&mut self, node: NodeId, class: &str) -> bool {
        let Ok(n) = self.node_mut(node) else {
            return false;
        };
        if n.classes.iter().any(|c| c == class) {
            return false;
        }
        n.classes.push(class.to_owned());
        #[cfg(feature = "tracing")]
        tracing::trace!(%node, class, "class added");
        true
    }

    /// Remove `class`; returns `true` if it was present.
    pub fn remove_class(&mut self, node: NodeId, class: &str) -> bool {
        let Ok(n) = self.node_mut(node) else {
            return false;
        };
        let before = n.classes.len();
        n.classes.retain(|c| c != class);
        let removed = n.classes.len() != before;
        #[cfg(feature = "tracing")]
        if removed {
            tracing::trace!(%node, class, "class removed");
        }
        removed
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(doc: &mut Document, items: &[&str]) -> (NodeId, Vec<NodeId>) {
        let ul = doc.create_element("ul");
        doc.append_root(ul).unwrap();
        let ids = items
            .iter()
            .map(|t| {
                let li = doc.create_text_element("li", *t);
                doc.append_child(ul, li).unwrap();
                li
            })
            .collect();
        (ul, ids)
    }

    #[test]
    fn tags_are_lowercased() {
        let mut doc = Document::new();
        let n = doc.create_element("DIV");
        assert_eq!(doc.tag(n), Some("div"));
    }

    #[test]
    fn append_child_orders_children() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b", "c"]);
        assert_eq!(doc.children(ul), ids.as_slice());
        assert_eq!(doc.parent(ids[1]), Some(ul));
    }

    #[test]
    fn append_child_moves_existing_child() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b"]);
        let other = doc.create_element("ol");
        doc.append_root(other).unwrap();
        doc.append_child(other, ids[0]).unwrap();
        assert_eq!(doc.children(ul), &[ids[1]]);
        assert_eq!(doc.children(other), &[ids[0]]);
    }

    #[test]
    fn append_under_descendant_is_rejected() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a"]);
        let err = doc.append_child(ids[0], ul).unwrap_err();
        assert_eq!(
            err,
            DomError::HierarchyCycle {
                parent: ids[0],
                child: ul
            }
        );
        assert_eq!(doc.append_child(ul, ul), Err(DomError::HierarchyCycle { parent: ul, child: ul }));
    }

    #[test]
    fn insert_before_sibling_and_root() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b"]);
        let x = doc.create_element("li");
        doc.insert_before(x, ids[1]).unwrap();
        assert_eq!(doc.children(ul), &[ids[0], x, ids[1]]);

        let input = doc.create_element("input");
        doc.insert_before(input, ul).unwrap();
        assert_eq!(doc.roots(), &[input, ul]);
    }

    #[test]
    fn insert_before_detached_reference_fails() {
        let mut doc = Document::new();
        let a = doc.create_element("div");
        let b = doc.create_element("div");
        assert_eq!(doc.insert_before(a, b), Err(DomError::NotAttached(b)));
    }

    #[test]
    fn remove_detaches_subtree() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["a", "b"]);
        assert!(doc.contains(ids[0]));
        assert!(doc.remove(ul));
        assert!(!doc.contains(ul));
        assert!(!doc.contains(ids[0]));
        assert!(!doc.remove(ul), "second remove is a no-op");
        // Subtree survives detached.
        assert_eq!(doc.children(ul).len(), 2);
    }

    #[test]
    fn descendants_are_preorder() {
        let mut doc = Document::new();
        let root = doc.create_element("div");
        doc.append_root(root).unwrap();
        let a = doc.create_element("p");
        let a1 = doc.create_element("span");
        let b = doc.create_element("p");
        doc.append_child(root, a).unwrap();
        doc.append_child(a, a1).unwrap();
        doc.append_child(root, b).unwrap();
        assert_eq!(doc.descendants(root), vec![a, a1, b]);
        assert_eq!(doc.attached_nodes(), vec![root, a, a1, b]);
    }

    #[test]
    fn text_content_concatenates_descendants() {
        let mut doc = Document::new();
        let li = doc.create_text_element("li", "Fresh ");
        let b = doc.create_text_element("b", "apples");
        doc.append_child(li, b).unwrap();
        assert_eq!(doc.text_content(li), "Fresh apples");
    }

    #[test]
    fn classes_are_deduplicated() {
        let mut doc = Document::new();
        let n = doc.create_element("div");
        assert!(doc.add_class(n, "x"));
        assert!(!doc.add_class(n, "x"));
        assert!(doc.add_class(n, "y"));
        assert_eq!(doc.classes(n), &["x".to_string(), "y".to_string()]);
        assert!(doc.remove_class(n, "x"));
        assert!(!doc.remove_class(n, "x"));
        assert!(!doc.has_class(n, "x"));
    }

    #[test]
    fn control_kinds() {
        let mut doc = Document::new();
        let plain = doc.create_element("input");
        let text = doc.create_element("input");
        doc.set_attr(text, "TYPE", "Text").unwrap();
        let checkbox = doc.create_element("input");
        doc.set_attr(checkbox, "type", "checkbox").unwrap();
        let area = doc.create_element("textarea");
        let select = doc.create_element("select");
        let div = doc.create_element("div");
        assert_eq!(doc.control_kind(plain), ControlKind::TextInput);
        assert_eq!(doc.control_kind(text), ControlKind::TextInput);
        assert_eq!(doc.control_kind(checkbox), ControlKind::OtherInput);
        assert_eq!(doc.control_kind(area), ControlKind::TextArea);
        assert_eq!(doc.control_kind(select), ControlKind::OtherInput);
        assert_eq!(doc.control_kind(div), ControlKind::NotAControl);
        assert!(ControlKind::TextArea.is_text_entry());
        assert!(!ControlKind::OtherInput.is_text_entry());
    }

    #[test]
    fn id_attribute_is_element_id() {
        let mut doc = Document::new();
        let n = doc.create_element("div");
        doc.set_attr(n, "id", "main").unwrap();
        assert_eq!(doc.element_id(n), Some("main"));
        assert_eq!(doc.attr(n, "id"), Some("main"));
    }

    #[test]
    fn unknown_node_is_harmless() {
        let mut doc = Document::new();
        let mut other = Document::new();
        other.create_element("a");
        let foreign = other.create_element("b");
        assert!(!doc.exists(foreign));
        assert_eq!(doc.text_content(foreign), "");
        assert!(doc.children(foreign).is_empty());
        assert!(!doc.add_class(foreign, "x"));
        assert_eq!(doc.set_value(foreign, "v"), Err(DomError::UnknownNode(foreign)));
        assert_eq!(doc.set_text(foreign, "t"), Err(DomError::UnknownNode(foreign)));
    }

    #[test]
    fn set_text_replaces_own_text_only() {
        let mut doc = Document::new();
        let (ul, ids) = list(&mut doc, &["apple", "pear"]);
        doc.set_text(ids[0], "kiwi").unwrap();
        assert_eq!(doc.text_content(ids[0]), "kiwi");
        assert_eq!(doc.text_content(ul), "kiwipear");
    }

    #[test]
    fn node_ids_stop_at_the_u32_range() {
        assert_eq!(NodeId::from_index(7), Ok(NodeId(7)));
        assert_eq!(NodeId::from_index(u32::MAX as usize), Ok(NodeId(u32::MAX)));
        #[cfg(target_pointer_width = "64")]
        assert_eq!(
            NodeId::from_index(u32::MAX as usize + 1),
            Err(DomError::CapacityExceeded)
        );
        assert_eq!(
            DomError::CapacityExceeded.to_string(),
            "document has no node ids left"
        );
    }

    #[test]
    fn try_create_element_hands_out_sequential_ids() {
        let mut doc = Document::new();
        let a = doc.try_create_element("div").unwrap();
        let b = doc.try_create_element("span").unwrap();
        assert_eq!((a.index(), b.index()), (0, 1));
        assert_eq!(doc.len(), 2);
    }

    mod props {
        use super::*;
        use proptest::prelude::*;

        fn tree(parents: &[usize]) -> (Document, Vec<NodeId>) {
            let mut doc = Document::new();
            let root = doc.create_element("div");
            doc.append_root(root).unwrap();
            let mut nodes = vec![root];
            for (i, &p) in parents.iter().enumerate() {
                let n = doc.create_text_element("span", i.to_string());
                doc.append_child(nodes[p % nodes.len()], n).unwrap();
                nodes.push(n);
            }
            (doc, nodes)
        }

        proptest! {
            #[test]
            fn descendants_cover_every_node(parents in proptest::collection::vec(0usize..64, 0..40)) {
                let (doc, nodes) = tree(&parents);
                prop_assert_eq!(doc.descendants(nodes[0]).len(), nodes.len() - 1);
                prop_assert_eq!(doc.attached_nodes().len(), nodes.len());
            }

            #[test]
            fn ancestors_never_move_below_descendants(
                parents in proptest::collection::vec(0usize..64, 1..40),
                pick in 0usize..64,
            ) {
                let (mut doc, nodes) = tree(&parents);
                let node = nodes[pick % nodes.len()];
                let err = doc.append_child(node, nodes[0]);
                let is_cycle = matches!(err, Err(DomError::HierarchyCycle { .. }));
                prop_assert!(is_cycle);
                prop_assert_eq!(doc.roots(), &[nodes[0]]);
            }
        }
    }
}
