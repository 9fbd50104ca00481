//! Arena-backed XML element tree.
//!
//! A [`Document`] owns every node it contains; nodes are addressed by
//! [`NodeId`] and are only meaningful for the document that produced them.
//! Text follows the `text`/`tail` model: the text of an element is the
//! character data before its first child, and the tail of an element is the
//! character data between its end tag and the next sibling (or the end tag of
//! its parent).
//!
//! Detaching a node never frees it. A detached node remains addressable and
//! may be re-attached elsewhere within the same document, or copied into a
//! different document via [`Document::import`].

use std::fmt::Debug;

/// Handle to an element within a [`Document`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u32);

impl NodeId {
    fn index(self) -> usize {
        self.0 as usize
    }
}

/// A single `name="value"` pair of an element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Attribute {
    name: String,
    value: String,
}

impl Attribute {
    pub(crate) fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }

    /// The qualified attribute name (e.g., `id`, `xlink:href`).
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The unescaped attribute value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Clone, Debug, Default)]
struct NodeData {
    tag: String,
    attributes: Vec<Attribute>,
    text: Option<String>,
    tail: Option<String>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

impl NodeData {
    fn new(tag: impl Into<String>) -> Self {
        Self {
            tag: tag.into(),
            ..Default::default()
        }
    }
}

/// An owned XML element tree.
#[derive(Clone)]
pub struct Document {
    nodes: Vec<NodeData>,
    root: NodeId,
}

impl Document {
    /// Creates a document containing only a root element named `root_tag`.
    pub fn new(root_tag: impl Into<String>) -> Self {
        Self {
            nodes: vec![NodeData::new(root_tag)],
            root: NodeId(0),
        }
    }

    /// The root element.
    pub fn root(&self) -> NodeId {
        self.root
    }

    pub(crate) fn set_root(&mut self, root: NodeId) {
        self.root = root;
    }

    fn data(&self, node: NodeId) -> &NodeData {
        &self.nodes[node.index()]
    }

    fn data_mut(&mut self, node: NodeId) -> &mut NodeData {
        &mut self.nodes[node.index()]
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Construction
    ////////////////////////////////////////////////////////////////////////////////

    /// Creates a detached element.
    pub fn create_element(&mut self, tag: impl Into<String>) -> NodeId {
        let id = NodeId(self.nodes.len() as u32);
        self.nodes.push(NodeData::new(tag));
        id
    }

    /// Creates a detached element containing the given `text`.
    pub fn create_text_element(&mut self, tag: impl Into<String>, text: impl Into<String>) -> NodeId {
        let id = self.create_element(tag);
        self.data_mut(id).text = Some(text.into());
        id
    }

    /// Deep-copies `node` (including its tail) from `source` into this document,
    /// returning the detached copy.
    pub fn import(&mut self, source: &Document, node: NodeId) -> NodeId {
        let data = source.data(node);
        let copy = self.create_element(data.tag.clone());
        {
            let copy_data = self.data_mut(copy);
            copy_data.attributes = data.attributes.clone();
            copy_data.text = data.text.clone();
            copy_data.tail = data.tail.clone();
        }
        for &child in &data.children {
            let child_copy = self.import(source, child);
            self.link(copy, None, child_copy);
        }
        copy
    }

    /// Deep-copies `node` within this document, returning the detached copy.
    pub fn duplicate(&mut self, node: NodeId) -> NodeId {
        let NodeData {
            tag,
            attributes,
            text,
            tail,
            children,
            ..
        } = self.data(node).clone();

        let copy = self.create_element(tag);
        {
            let copy_data = self.data_mut(copy);
            copy_data.attributes = attributes;
            copy_data.text = text;
            copy_data.tail = tail;
        }
        for child in children {
            let child_copy = self.duplicate(child);
            self.link(copy, None, child_copy);
        }
        copy
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Element data
    ////////////////////////////////////////////////////////////////////////////////

    /// The tag name of `node`.
    pub fn tag(&self, node: NodeId) -> &str {
        &self.data(node).tag
    }

    /// Returns `true` if the tag name of `node` equals `tag`.
    pub fn is(&self, node: NodeId, tag: &str) -> bool {
        self.data(node).tag == tag
    }

    /// The value of the attribute `name`, if present.
    pub fn attribute(&self, node: NodeId, name: &str) -> Option<&str> {
        self.data(node)
            .attributes
            .iter()
            .find(|attribute| attribute.name == name)
            .map(Attribute::value)
    }

    /// All attributes of `node` in document order.
    pub fn attributes(&self, node: NodeId) -> &[Attribute] {
        &self.data(node).attributes
    }

    /// Sets the attribute `name`, replacing the previous value in place if present.
    pub fn set_attribute(&mut self, node: NodeId, name: &str, value: impl Into<String>) {
        let value = value.into();
        let attributes = &mut self.data_mut(node).attributes;

        match attributes.iter_mut().find(|attribute| attribute.name == name) {
            Some(attribute) => attribute.value = value,
            None => attributes.push(Attribute::new(name, value)),
        }
    }

    /// Removes and returns the attribute value of `name`, if present.
    pub fn remove_attribute(&mut self, node: NodeId, name: &str) -> Option<String> {
        let attributes = &mut self.data_mut(node).attributes;
        let position = attributes.iter().position(|attribute| attribute.name == name)?;
        Some(attributes.remove(position).value)
    }

    pub(crate) fn push_attribute(&mut self, node: NodeId, attribute: Attribute) {
        self.data_mut(node).attributes.push(attribute);
    }

    /// The leading text of `node`.
    pub fn text(&self, node: NodeId) -> Option<&str> {
        self.data(node).text.as_deref()
    }

    pub fn set_text(&mut self, node: NodeId, text: Option<String>) {
        self.data_mut(node).text = text;
    }

    /// The trailing text of `node` (following its end tag).
    pub fn tail(&self, node: NodeId) -> Option<&str> {
        self.data(node).tail.as_deref()
    }

    pub fn set_tail(&mut self, node: NodeId, tail: Option<String>) {
        self.data_mut(node).tail = tail;
    }

    /// Appends `text` to the leading text of `node`.
    pub fn append_text(&mut self, node: NodeId, text: &str) {
        self.data_mut(node)
            .text
            .get_or_insert_with(String::new)
            .push_str(text);
    }

    /// Appends `text` to the trailing text of `node`.
    pub fn append_tail(&mut self, node: NodeId, text: &str) {
        self.data_mut(node)
            .tail
            .get_or_insert_with(String::new)
            .push_str(text);
    }

    /// Concatenated character data of `node` and all of its descendants,
    /// excluding the tail of `node` itself.
    pub fn text_content(&self, node: NodeId) -> String {
        let mut content = String::new();
        self.collect_text(node, &mut content);
        content
    }

    fn collect_text(&self, node: NodeId, content: &mut String) {
        let data = self.data(node);
        content.push_str(data.text.as_deref().unwrap_or_default());

        for &child in &data.children {
            self.collect_text(child, content);
            content.push_str(self.data(child).tail.as_deref().unwrap_or_default());
        }
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Navigation
    ////////////////////////////////////////////////////////////////////////////////

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.data(node).parent
    }

    /// The children of `node` in document order.
    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.data(node).children
    }

    pub fn has_children(&self, node: NodeId) -> bool {
        !self.data(node).children.is_empty()
    }

    /// The position of `node` within its parent.
    pub fn index_in_parent(&self, node: NodeId) -> Option<usize> {
        let parent = self.parent(node)?;
        self.children(parent).iter().position(|&child| child == node)
    }

    pub fn previous_sibling(&self, node: NodeId) -> Option<NodeId> {
        let parent = self.parent(node)?;
        let index = self.index_in_parent(node)?;
        index
            .checked_sub(1)
            .map(|previous| self.children(parent)[previous])
    }

    /// The first child of `node` named `tag`.
    pub fn find_child(&self, node: NodeId, tag: &str) -> Option<NodeId> {
        self.children(node)
            .iter()
            .copied()
            .find(|&child| self.is(child, tag))
    }

    /// All children of `node` named `tag`.
    pub fn find_children<'a>(
        &'a self,
        node: NodeId,
        tag: &'a str,
    ) -> impl Iterator<Item = NodeId> + 'a {
        self.children(node)
            .iter()
            .copied()
            .filter(move |&child| self.is(child, tag))
    }

    /// Evaluates a child-axis path starting at `node`, returning every match in
    /// document order.
    ///
    /// `["description", "title-info", "author"]` is equivalent to the XPath
    /// expression `description/title-info/author`.
    pub fn select(&self, node: NodeId, path: &[&str]) -> Vec<NodeId> {
        let mut current = vec![node];

        for step in path {
            current = current
                .into_iter()
                .flat_map(|parent| self.find_children(parent, step).collect::<Vec<_>>())
                .collect();
        }
        current
    }

    /// The first match of [`Self::select`].
    pub fn select_first(&self, node: NodeId, path: &[&str]) -> Option<NodeId> {
        self.select(node, path).into_iter().next()
    }

    /// Pre-order traversal of `node` and all of its descendants.
    pub fn descendants(&self, node: NodeId) -> Descendants<'_> {
        Descendants {
            document: self,
            stack: vec![node],
        }
    }

    ////////////////////////////////////////////////////////////////////////////////
    // Mutation
    ////////////////////////////////////////////////////////////////////////////////

    /// Inserts `child` under `parent` at `index` (`None` appends).
    /// The index is clamped to the number of children.
    fn link(&mut self, parent: NodeId, index: Option<usize>, child: NodeId) {
        debug_assert_ne!(parent, child, "an element cannot contain itself");

        let children = &mut self.data_mut(parent).children;
        let index = index.unwrap_or(children.len()).min(children.len());
        children.insert(index, child);
        self.data_mut(child).parent = Some(parent);
    }

    /// Appends `child` as the last child of `parent`,
    /// detaching it from its current parent first.
    pub fn append(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.link(parent, None, child);
    }

    /// Inserts `child` at `index` within `parent`,
    /// detaching it from its current parent first.
    ///
    /// Indices past the end append.
    pub fn insert(&mut self, parent: NodeId, index: usize, child: NodeId) {
        self.detach(child);
        self.link(parent, Some(index), child);
    }

    /// Removes `node` from its parent. The tail of `node` stays with `node`.
    pub fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.data_mut(node).parent.take() {
            self.data_mut(parent).children.retain(|&child| child != node);
        }
    }

    /// Puts `new` at the position of `old`, detaching `old`.
    pub fn replace(&mut self, old: NodeId, new: NodeId) {
        let Some(parent) = self.parent(old) else {
            return;
        };
        let index = self.index_in_parent(old).unwrap_or_default();
        self.detach(old);
        self.insert(parent, index, new);
    }
}

impl Debug for Document {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Document")
            .field("root", &self.tag(self.root))
            .field("nodes", &self.nodes.len())
            .finish()
    }
}

/// Pre-order iterator returned by [`Document::descendants`].
pub struct Descendants<'doc> {
    document: &'doc Document,
    stack: Vec<NodeId>,
}

impl Iterator for Descendants<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<Self::Item> {
        let node = self.stack.pop()?;
        self.stack
            .extend(self.document.children(node).iter().rev().copied());
        Some(node)
    }
}
