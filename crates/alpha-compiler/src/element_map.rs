//! The element registry.
//!
//! Owns every element, keyed by stable id, with a secondary index from
//! kind to id list so the pipeline can fetch "all elements of kind K" in
//! insertion order. Removal cascades over owned children unless a child
//! is marked non-owning or has been re-parented elsewhere.

use crate::elements::{Element, ElementId, ElementKind};
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

#[derive(Debug, Default)]
pub struct ElementMap {
    elements: FxHashMap<ElementId, Element>,
    by_kind: IndexMap<ElementKind, Vec<ElementId>>,
}

impl ElementMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, element: Element) -> ElementId {
        let id = element.id;
        self.by_kind.entry(element.kind()).or_default().push(id);
        self.elements.insert(id, element);
        id
    }

    pub fn get(&self, id: ElementId) -> Option<&Element> {
        self.elements.get(&id)
    }

    pub fn get_mut(&mut self, id: ElementId) -> Option<&mut Element> {
        self.elements.get_mut(&id)
    }

    pub fn contains(&self, id: ElementId) -> bool {
        self.elements.contains_key(&id)
    }

    pub fn kind_of(&self, id: ElementId) -> Option<ElementKind> {
        self.elements.get(&id).map(Element::kind)
    }

    /// All live elements of `kind`, in insertion order.
    pub fn find_by_kind(&self, kind: ElementKind) -> Vec<ElementId> {
        self.by_kind.get(&kind).cloned().unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn ids(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.elements.keys().copied()
    }

    /// Remove `id` and cascade over its owned children. A child survives
    /// when it is non-owning or its parent-element link points elsewhere.
    pub fn remove(&mut self, id: ElementId) {
        let Some(element) = self.elements.remove(&id) else {
            return;
        };
        if let Some(ids) = self.by_kind.get_mut(&element.kind()) {
            ids.retain(|&existing| existing != id);
        }
        for child in element.owned_children() {
            let removable = self.elements.get(&child).is_some_and(|child_element| {
                !child_element.non_owning && child_element.parent_element == Some(id)
            });
            if removable {
                self.remove(child);
            }
        }
    }

    /// Remove a batch, deferring cascades until each entry is processed.
    pub fn remove_all(&mut self, ids: &[ElementId]) {
        for &id in ids {
            self.remove(id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::elements::{ElementData, StatementData};
    use alpha_common::{next_id, SourceLocation};
    use indexmap::IndexMap as AttrMap;

    fn statement(expression: Option<ElementId>) -> Element {
        Element {
            id: next_id(),
            parent_scope: None,
            parent_element: None,
            module: None,
            location: SourceLocation::default(),
            attributes: AttrMap::new(),
            comments: Vec::new(),
            non_owning: false,
            data: ElementData::Statement(StatementData {
                labels: Vec::new(),
                expression,
            }),
        }
    }

    fn literal(value: u64) -> Element {
        Element {
            id: next_id(),
            parent_scope: None,
            parent_element: None,
            module: None,
            location: SourceLocation::default(),
            attributes: AttrMap::new(),
            comments: Vec::new(),
            non_owning: false,
            data: ElementData::IntegerLiteral { value },
        }
    }

    #[test]
    fn find_by_kind_preserves_insertion_order() {
        let mut map = ElementMap::new();
        let a = map.insert(literal(1));
        let b = map.insert(literal(2));
        let c = map.insert(literal(3));
        assert_eq!(map.find_by_kind(ElementKind::IntegerLiteral), vec![a, b, c]);
        map.remove(b);
        assert_eq!(map.find_by_kind(ElementKind::IntegerLiteral), vec![a, c]);
    }

    #[test]
    fn removal_cascades_to_owned_children() {
        let mut map = ElementMap::new();
        let child = map.insert(literal(7));
        let parent = map.insert(statement(Some(child)));
        map.get_mut(child).unwrap().parent_element = Some(parent);
        map.remove(parent);
        assert!(!map.contains(child));
    }

    #[test]
    fn non_owning_children_survive_removal() {
        let mut map = ElementMap::new();
        let child = map.insert(literal(7));
        let parent = map.insert(statement(Some(child)));
        map.get_mut(child).unwrap().parent_element = Some(parent);
        map.get_mut(child).unwrap().make_non_owning();
        map.remove(parent);
        assert!(map.contains(child));
    }

    #[test]
    fn reparented_children_survive_removal() {
        let mut map = ElementMap::new();
        let child = map.insert(literal(7));
        let old_parent = map.insert(statement(Some(child)));
        let new_parent = map.insert(statement(Some(child)));
        map.get_mut(child).unwrap().parent_element = Some(new_parent);
        map.remove(old_parent);
        assert!(map.contains(child));
        map.remove(new_parent);
        assert!(!map.contains(child));
    }
}
