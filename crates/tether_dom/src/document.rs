//! Element tree storage
//!
//! Elements live in a [`SlotMap`] owned by the [`Document`]. Handles are
//! generational, so an [`ElementId`] kept after its element was removed
//! never aliases a newer element; it simply stops resolving.
//!
//! ```text
//! Document
//!   root (html)
//!     ├── div#app.panel
//!     │     └── button[data-controls=app]
//!     └── footer
//! ```

use indexmap::IndexMap;
use slotmap::{new_key_type, Key, SlotMap};

use crate::error::{DomError, DomResult};
use crate::event::ListenerTable;

new_key_type! {
    /// Handle to an element in a [`Document`]
    pub struct ElementId;
}

impl ElementId {
    /// Convert to a raw u64 representation
    ///
    /// Used when an element handle has to travel inside a serialized value,
    /// such as an event field.
    pub fn to_raw(self) -> u64 {
        self.data().as_ffi()
    }

    /// Create from a raw u64 representation produced by [`ElementId::to_raw`]
    pub fn from_raw(raw: u64) -> Self {
        Self::from(slotmap::KeyData::from_ffi(raw))
    }
}

/// Internal element storage
#[derive(Debug, Clone)]
struct ElementNode {
    tag: String,
    attributes: IndexMap<String, String>,
    parent: Option<ElementId>,
    children: Vec<ElementId>,
}

impl ElementNode {
    fn new(tag: &str) -> Self {
        Self {
            tag: tag.to_ascii_lowercase(),
            attributes: IndexMap::new(),
            parent: None,
            children: Vec::new(),
        }
    }
}

/// An element tree with attached event listeners
pub struct Document {
    elements: SlotMap<ElementId, ElementNode>,
    root: ElementId,
    pub(crate) listeners: ListenerTable,
}

impl Document {
    /// Create a document containing only its root element
    pub fn new() -> Self {
        let mut elements = SlotMap::with_key();
        let root = elements.insert(ElementNode::new("html"));
        Self {
            elements,
            root,
            listeners: ListenerTable::default(),
        }
    }

    /// The document root element
    pub fn root(&self) -> ElementId {
        self.root
    }

    /// Number of live elements, root included
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// A document always holds its root, so this is never true
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Check whether a handle still refers to a live element
    pub fn contains(&self, element: ElementId) -> bool {
        self.elements.contains_key(element)
    }

    fn node(&self, element: ElementId) -> DomResult<&ElementNode> {
        self.elements
            .get(element)
            .ok_or(DomError::ElementNotFound(element))
    }

    fn node_mut(&mut self, element: ElementId) -> DomResult<&mut ElementNode> {
        self.elements
            .get_mut(element)
            .ok_or(DomError::ElementNotFound(element))
    }

    // =========================================================================
    // Tree structure
    // =========================================================================

    /// Create a detached element
    pub fn create_element(&mut self, tag: &str) -> ElementId {
        self.elements.insert(ElementNode::new(tag))
    }

    /// Append `child` as the last child of `parent`
    ///
    /// A child that is already attached elsewhere is moved.
    pub fn append_child(&mut self, parent: ElementId, child: ElementId) -> DomResult<()> {
        self.node(parent)?;
        self.node(child)?;
        if child == self.root {
            return Err(DomError::CannotRemoveRoot);
        }
        if parent == child || self.is_descendant_of(parent, child) {
            return Err(DomError::HierarchyCycle { parent, child });
        }

        self.detach(child);
        self.node_mut(child)?.parent = Some(parent);
        self.node_mut(parent)?.children.push(child);
        Ok(())
    }

    /// Create an element and append it to `parent` in one step
    pub fn append_element(&mut self, parent: ElementId, tag: &str) -> DomResult<ElementId> {
        self.node(parent)?;
        let element = self.create_element(tag);
        self.append_child(parent, element)?;
        Ok(element)
    }

    fn detach(&mut self, element: ElementId) {
        let Some(parent) = self.elements.get(element).and_then(|n| n.parent) else {
            return;
        };
        if let Some(parent_node) = self.elements.get_mut(parent) {
            parent_node.children.retain(|&c| c != element);
        }
        if let Some(node) = self.elements.get_mut(element) {
            node.parent = None;
        }
    }

    /// Remove an element and its whole subtree
    ///
    /// Returns every removed handle, the element itself first. Listeners
    /// attached to removed elements are dropped with them.
    pub fn remove(&mut self, element: ElementId) -> DomResult<Vec<ElementId>> {
        if element == self.root {
            return Err(DomError::CannotRemoveRoot);
        }
        self.node(element)?;
        self.detach(element);

        let mut removed = vec![element];
        removed.extend(self.descendants(element));
        for &id in &removed {
            self.elements.remove(id);
            self.listeners.remove_element(id);
        }

        tracing::trace!("removed {} element(s) rooted at {:?}", removed.len(), element);
        Ok(removed)
    }

    /// Lowercased tag name
    pub fn tag(&self, element: ElementId) -> Option<&str> {
        self.elements.get(element).map(|n| n.tag.as_str())
    }

    pub fn parent(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(element).and_then(|n| n.parent)
    }

    pub fn children(&self, element: ElementId) -> &[ElementId] {
        self.elements
            .get(element)
            .map(|n| n.children.as_slice())
            .unwrap_or(&[])
    }

    /// All ancestors of an element, from its parent up to the root
    pub fn ancestors(&self, element: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut current = element;

        while let Some(parent) = self.parent(current) {
            result.push(parent);
            current = parent;
        }

        result
    }

    /// Check if `element` lies strictly inside `ancestor`
    pub fn is_descendant_of(&self, element: ElementId, ancestor: ElementId) -> bool {
        let mut current = element;
        while let Some(parent) = self.parent(current) {
            if parent == ancestor {
                return true;
            }
            current = parent;
        }
        false
    }

    /// Descendants of `root` in document order (depth-first pre-order)
    ///
    /// `root` itself is not included.
    pub fn descendants(&self, root: ElementId) -> Vec<ElementId> {
        let mut result = Vec::new();
        let mut stack: Vec<ElementId> = self.children(root).iter().rev().copied().collect();

        while let Some(current) = stack.pop() {
            result.push(current);
            stack.extend(self.children(current).iter().rev().copied());
        }

        result
    }

    // =========================================================================
    // Attributes
    // =========================================================================

    pub fn set_attribute(
        &mut self,
        element: ElementId,
        name: &str,
        value: impl Into<String>,
    ) -> DomResult<()> {
        let name = name.to_ascii_lowercase();
        let value = value.into();

        #[cfg(debug_assertions)]
        {
            if name == "id" {
                if let Some(existing) = self.element_by_id(&value) {
                    if existing != element {
                        tracing::warn!("Duplicate element id assigned: {}", value);
                    }
                }
            }
        }

        self.node_mut(element)?.attributes.insert(name, value);
        Ok(())
    }

    pub fn attribute(&self, element: ElementId, name: &str) -> Option<&str> {
        self.elements
            .get(element)?
            .attributes
            .get(name.to_ascii_lowercase().as_str())
            .map(String::as_str)
    }

    pub fn has_attribute(&self, element: ElementId, name: &str) -> bool {
        self.attribute(element, name).is_some()
    }

    /// Remove an attribute, returning its previous value
    pub fn remove_attribute(&mut self, element: ElementId, name: &str) -> Option<String> {
        self.elements
            .get_mut(element)?
            .attributes
            .shift_remove(name.to_ascii_lowercase().as_str())
    }

    /// Attribute names and values in insertion order
    pub fn attributes(&self, element: ElementId) -> impl Iterator<Item = (&str, &str)> + '_ {
        self.elements
            .get(element)
            .into_iter()
            .flat_map(|n| n.attributes.iter())
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// First element in document order whose `id` attribute equals `id`
    pub fn element_by_id(&self, id: &str) -> Option<ElementId> {
        std::iter::once(self.root)
            .chain(self.descendants(self.root))
            .find(|&e| self.attribute(e, "id") == Some(id))
    }

    // =========================================================================
    // Classes
    // =========================================================================

    pub fn classes(&self, element: ElementId) -> impl Iterator<Item = &str> + '_ {
        self.attribute(element, "class")
            .into_iter()
            .flat_map(str::split_ascii_whitespace)
    }

    pub fn has_class(&self, element: ElementId, class: &str) -> bool {
        self.classes(element).any(|c| c == class)
    }

    pub fn add_class(&mut self, element: ElementId, class: &str) -> DomResult<()> {
        self.node(element)?;
        if self.has_class(element, class) {
            return Ok(());
        }
        let mut classes: Vec<&str> = self.classes(element).collect();
        classes.push(class);
        let joined = classes.join(" ");
        self.set_attribute(element, "class", joined)
    }

    pub fn remove_class(&mut self, element: ElementId, class: &str) -> DomResult<()> {
        self.node(element)?;
        if !self.has_class(element, class) {
            return Ok(());
        }
        let joined = self
            .classes(element)
            .filter(|&c| c != class)
            .collect::<Vec<_>>()
            .join(" ");
        self.set_attribute(element, "class", joined)
    }

    /// Toggle a class, returning whether it is present afterwards
    pub fn toggle_class(&mut self, element: ElementId, class: &str) -> DomResult<bool> {
        if self.has_class(element, class) {
            self.remove_class(element, class)?;
            Ok(false)
        } else {
            self.add_class(element, class)?;
            Ok(true)
        }
    }
}

impl Default for Document {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.root)
            .field("elements", &self.elements.len())
            .field("listeners", &self.listeners.len())
            .finish()
    }
}
