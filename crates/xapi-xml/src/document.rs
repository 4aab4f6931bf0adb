//! Arena backed XML tree.

use crate::XmlError;

/// Handle to an element inside the [`Document`] that created it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ElementId(usize);

impl ElementId {
    pub const fn index(self) -> usize {
        self.0
    }
}

/// Keyword/value pair attached to one element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    keyword: String,
    value: String,
}

impl Attribute {
    pub fn keyword(&self) -> &str {
        &self.keyword
    }

    pub fn value(&self) -> &str {
        &self.value
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Element {
    name: String,
    content: Option<String>,
    attributes: Vec<Attribute>,
    children: Vec<ElementId>,
    parent: Option<ElementId>,
}

impl Element {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn content(&self) -> Option<&str> {
        self.content.as_deref()
    }

    pub fn attributes(&self) -> &[Attribute] {
        &self.attributes
    }

    pub fn children(&self) -> &[ElementId] {
        &self.children
    }

    pub fn parent(&self) -> Option<ElementId> {
        self.parent
    }
}

/// One XML tree. Dropping the document releases every node at once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    elements: Vec<Element>,
    root: Option<ElementId>,
    declarations: Vec<String>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new element as the last child of `parent`, or create the root
    /// when `parent` is `None`.
    pub fn add_element(
        &mut self,
        parent: Option<ElementId>,
        name: &str,
        content: Option<&str>,
    ) -> Result<ElementId, XmlError> {
        if name.is_empty() || name.bytes().any(|b| b.is_ascii_whitespace() || b == b'<' || b == b'>') {
            return Err(XmlError::InvalidName(name.to_string()));
        }
        match parent {
            None if self.root.is_some() => return Err(XmlError::RootExists),
            Some(id) if id.0 >= self.elements.len() => return Err(XmlError::UnknownElement(id)),
            _ => {}
        }

        let id = ElementId(self.elements.len());
        self.elements.push(Element {
            name: name.to_string(),
            content: content.map(str::to_string),
            attributes: Vec::new(),
            children: Vec::new(),
            parent,
        });
        match parent {
            Some(parent) => self.elements[parent.0].children.push(id),
            None => self.root = Some(id),
        }
        Ok(id)
    }

    /// Append an attribute to `element`.
    ///
    /// Trailing blanks are trimmed from `value`; a value that is empty after
    /// trimming is rejected.
    pub fn add_attribute(
        &mut self,
        element: ElementId,
        keyword: &str,
        value: &str,
    ) -> Result<(), XmlError> {
        if keyword.is_empty() {
            return Err(XmlError::InvalidName(keyword.to_string()));
        }
        let value = value.trim_end_matches(' ');
        if value.is_empty() {
            return Err(XmlError::EmptyAttribute(keyword.to_string()));
        }
        let target = self
            .elements
            .get_mut(element.0)
            .ok_or(XmlError::UnknownElement(element))?;
        target.attributes.push(Attribute {
            keyword: keyword.to_string(),
            value: value.to_string(),
        });
        Ok(())
    }

    /// Parsed attributes are kept verbatim, blank values included.
    pub(crate) fn push_parsed_attribute(&mut self, element: ElementId, keyword: String, value: String) {
        if let Some(target) = self.elements.get_mut(element.0) {
            target.attributes.push(Attribute { keyword, value });
        }
    }

    /// Append text to the content of `element`.
    pub(crate) fn append_content(&mut self, element: ElementId, text: &str) {
        if let Some(target) = self.elements.get_mut(element.0) {
            match &mut target.content {
                Some(content) => content.push_str(text),
                None => target.content = Some(text.to_string()),
            }
        }
    }

    /// Record a declaration such as `<?xml version="1.0"?>`, emitted ahead of the root.
    pub fn add_declaration(&mut self, declaration: &str) {
        self.declarations.push(declaration.to_string());
    }

    pub fn declarations(&self) -> &[String] {
        &self.declarations
    }

    pub fn root(&self) -> Option<ElementId> {
        self.root
    }

    pub fn element(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(id.0)
    }

    pub fn name(&self, id: ElementId) -> Option<&str> {
        self.element(id).map(Element::name)
    }

    pub fn content(&self, id: ElementId) -> Option<&str> {
        self.element(id).and_then(Element::content)
    }

    pub fn children(&self, id: ElementId) -> &[ElementId] {
        self.element(id).map(Element::children).unwrap_or(&[])
    }

    pub fn parent(&self, id: ElementId) -> Option<ElementId> {
        self.element(id).and_then(Element::parent)
    }

    pub fn attributes(&self, id: ElementId) -> &[Attribute] {
        self.element(id).map(Element::attributes).unwrap_or(&[])
    }

    /// Number of elements in the document.
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Depth-first pre-order walk of `scope` and its descendants.
    pub fn descendants(&self, scope: ElementId) -> Descendants<'_> {
        let stack = if scope.0 < self.elements.len() {
            vec![scope]
        } else {
            Vec::new()
        };
        Descendants { doc: self, stack }
    }
}

/// Iterator returned by [`Document::descendants`].
pub struct Descendants<'a> {
    doc: &'a Document,
    stack: Vec<ElementId>,
}

impl Iterator for Descendants<'_> {
    type Item = ElementId;

    fn next(&mut self) -> Option<ElementId> {
        let next = self.stack.pop()?;
        self.stack
            .extend(self.doc.children(next).iter().rev().copied());
        Some(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn single_root_and_ordered_children() {
        let mut doc = Document::new();
        let root = doc.add_element(None, "libtrans", None).expect("root");
        let a = doc.add_element(Some(root), "a", Some("1")).expect("a");
        let b = doc.add_element(Some(root), "b", None).expect("b");
        let c = doc.add_element(Some(a), "c", None).expect("c");

        assert_eq!(doc.add_element(None, "other", None), Err(XmlError::RootExists));
        assert_eq!(doc.children(root), &[a, b]);
        assert_eq!(doc.children(a), &[c]);
        assert_eq!(doc.parent(c), Some(a));

        let parentless = (0..doc.len())
            .map(ElementId)
            .filter(|id| doc.parent(*id).is_none())
            .count();
        assert_eq!(parentless, 1);
        for id in (0..doc.len()).map(ElementId).filter(|id| *id != root) {
            let parent = doc.parent(id).expect("parent");
            let hits = doc.children(parent).iter().filter(|child| **child == id).count();
            assert_eq!(hits, 1);
        }
    }

    #[test]
    fn attribute_values_are_trimmed_and_must_not_be_blank() {
        let mut doc = Document::new();
        let root = doc.add_element(None, "r", None).expect("root");
        doc.add_attribute(root, "k", "v  ").expect("attribute");
        doc.add_attribute(root, "k", "second").expect("duplicate keyword");
        assert_eq!(doc.attributes(root)[0].value(), "v");
        assert_eq!(doc.attributes(root).len(), 2);
        assert_eq!(
            doc.add_attribute(root, "blank", "   "),
            Err(XmlError::EmptyAttribute("blank".into()))
        );
        assert!(matches!(doc.add_attribute(root, "", "v"), Err(XmlError::InvalidName(_))));
        assert!(matches!(
            doc.add_attribute(ElementId(42), "k", "v"),
            Err(XmlError::UnknownElement(_))
        ));
    }

    #[test]
    fn unknown_parent_is_rejected() {
        let mut doc = Document::new();
        doc.add_element(None, "r", None).expect("root");
        assert!(matches!(
            doc.add_element(Some(ElementId(9)), "x", None),
            Err(XmlError::UnknownElement(_))
        ));
        assert!(matches!(
            doc.add_element(Some(ElementId(0)), "", None),
            Err(XmlError::InvalidName(_))
        ));
    }

    #[test]
    fn descendants_are_pre_order() {
        let mut doc = Document::new();
        let root = doc.add_element(None, "r", None).expect("root");
        let a = doc.add_element(Some(root), "a", None).expect("a");
        let a1 = doc.add_element(Some(a), "a1", None).expect("a1");
        let b = doc.add_element(Some(root), "b", None).expect("b");
        let order: Vec<_> = doc.descendants(root).collect();
        assert_eq!(order, vec![root, a, a1, b]);
    }
}
