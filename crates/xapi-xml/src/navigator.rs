//! Name based lookups over a [`Document`].

use crate::{Attribute, Document, ElementId};

impl Document {
    /// First element named `name` in depth-first pre-order, starting at
    /// `scope` (or the root) and descending into children before siblings.
    pub fn find_first_by_name(&self, scope: Option<ElementId>, name: &str) -> Option<ElementId> {
        let scope = scope.or(self.root())?;
        self.descendants(scope)
            .find(|id| self.name(*id).is_some_and(|candidate| candidate == name))
    }

    /// Next sibling named `name` after `current` among the children of
    /// `parent`, or the first matching child when `current` is `None`.
    /// Descendants are never visited.
    pub fn find_next_sibling_by_name(
        &self,
        parent: ElementId,
        current: Option<ElementId>,
        name: &str,
    ) -> Option<ElementId> {
        let children = self.children(parent);
        let start = match current {
            Some(current) => children.iter().position(|child| *child == current)? + 1,
            None => 0,
        };
        children[start..]
            .iter()
            .copied()
            .find(|id| self.name(*id).is_some_and(|candidate| candidate == name))
    }

    /// First attribute on `element` whose keyword equals `keyword`.
    pub fn find_attribute(&self, element: ElementId, keyword: &str) -> Option<&Attribute> {
        self.attributes(element)
            .iter()
            .find(|attr| attr.keyword() == keyword)
    }

    /// First depth-first match of `name` under `scope` whose parent element is
    /// named `parent`.
    pub fn find_first_with_parent(
        &self,
        scope: ElementId,
        parent: &str,
        name: &str,
    ) -> Option<ElementId> {
        self.descendants(scope).find(|id| {
            self.name(*id) == Some(name)
                && self
                    .parent(*id)
                    .and_then(|p| self.name(p))
                    .is_some_and(|candidate| candidate == parent)
        })
    }
}
