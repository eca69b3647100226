//! The scope manager.
//!
//! Tracks the lexical block stack and module stack during evaluation, the
//! two pending-resolution worklists the pipeline drains, and performs the
//! scope-chain lookups for types and identifiers.
//!
//! Lookup ordering: innermost scope first, then each enclosing scope, out
//! to the program scope. Ties within one scope preserve insertion order.
//! Qualified names resolve their namespace prefix first and then search
//! only that namespace's block.

use crate::element_map::ElementMap;
use crate::elements::{ElementData, ElementId};
use alpha_common::limits::MAX_SCOPE_WALK_DEPTH;
use alpha_common::QualifiedSymbol;

#[derive(Debug, Default)]
pub struct ScopeManager {
    block_stack: Vec<ElementId>,
    module_stack: Vec<ElementId>,
    identifiers_with_unknown_types: Vec<ElementId>,
    unresolved_identifier_references: Vec<ElementId>,
}

impl ScopeManager {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // stacks

    pub fn push_block(&mut self, block: ElementId) {
        self.block_stack.push(block);
    }

    pub fn pop_block(&mut self) -> Option<ElementId> {
        self.block_stack.pop()
    }

    pub fn current_scope(&self) -> Option<ElementId> {
        self.block_stack.last().copied()
    }

    pub fn push_module(&mut self, module: ElementId) {
        self.module_stack.push(module);
    }

    pub fn pop_module(&mut self) -> Option<ElementId> {
        self.module_stack.pop()
    }

    pub fn current_module(&self) -> Option<ElementId> {
        self.module_stack.last().copied()
    }

    // ------------------------------------------------------------------
    // worklists

    pub fn enqueue_identifier_with_unknown_type(&mut self, identifier: ElementId) {
        if !self.identifiers_with_unknown_types.contains(&identifier) {
            self.identifiers_with_unknown_types.push(identifier);
        }
    }

    pub fn enqueue_unresolved_reference(&mut self, reference: ElementId) {
        if !self.unresolved_identifier_references.contains(&reference) {
            self.unresolved_identifier_references.push(reference);
        }
    }

    pub fn identifiers_with_unknown_types(&mut self) -> &mut Vec<ElementId> {
        &mut self.identifiers_with_unknown_types
    }

    pub fn unresolved_identifier_references(&mut self) -> &mut Vec<ElementId> {
        &mut self.unresolved_identifier_references
    }

    pub fn pending_unknown_types(&self) -> usize {
        self.identifiers_with_unknown_types.len()
    }

    pub fn pending_unresolved_references(&self) -> usize {
        self.unresolved_identifier_references.len()
    }

    // ------------------------------------------------------------------
    // lookups

    /// Find the type `symbol` names, walking the scope chain upward from
    /// `from_scope` (or the current scope).
    pub fn find_type(
        &self,
        elements: &ElementMap,
        symbol: &QualifiedSymbol,
        from_scope: Option<ElementId>,
    ) -> Option<ElementId> {
        let start = from_scope.or_else(|| self.current_scope())?;
        if symbol.is_qualified() {
            let namespace_scope = self.resolve_namespace_scope(elements, symbol, start)?;
            return find_type_in_block(elements, namespace_scope, symbol);
        }
        let mut current = Some(start);
        let mut depth = 0usize;
        while let Some(block) = current {
            if let Some(found) = find_type_in_block(elements, block, symbol) {
                return Some(found);
            }
            current = parent_scope_of(elements, block);
            depth += 1;
            if depth > MAX_SCOPE_WALK_DEPTH {
                break;
            }
        }
        None
    }

    /// Find every identifier matching `symbol`, innermost scope first,
    /// insertion order within a scope. Callers use the full list for
    /// overload resolution.
    pub fn find_identifier(
        &self,
        elements: &ElementMap,
        symbol: &QualifiedSymbol,
        from_scope: Option<ElementId>,
    ) -> Vec<ElementId> {
        let Some(start) = from_scope.or_else(|| self.current_scope()) else {
            return Vec::new();
        };
        if symbol.is_qualified() {
            let Some(namespace_scope) = self.resolve_namespace_scope(elements, symbol, start)
            else {
                return Vec::new();
            };
            return identifiers_in_block(elements, namespace_scope, &symbol.name);
        }
        let mut matches = Vec::new();
        let mut current = Some(start);
        let mut depth = 0usize;
        while let Some(block) = current {
            matches.extend(identifiers_in_block(elements, block, &symbol.name));
            current = parent_scope_of(elements, block);
            depth += 1;
            if depth > MAX_SCOPE_WALK_DEPTH {
                break;
            }
        }
        matches
    }

    /// Resolve `symbol`'s namespace prefix to the block that namespace
    /// owns, starting the search for the first part at `start`.
    fn resolve_namespace_scope(
        &self,
        elements: &ElementMap,
        symbol: &QualifiedSymbol,
        start: ElementId,
    ) -> Option<ElementId> {
        let mut scope = start;
        for (index, part) in symbol.namespaces.iter().enumerate() {
            let part_symbol = QualifiedSymbol::new(part.clone());
            let candidates = if index == 0 {
                self.find_identifier(elements, &part_symbol, Some(scope))
            } else {
                identifiers_in_block(elements, scope, part)
            };
            let namespace_scope = candidates
                .iter()
                .find_map(|&identifier| namespace_scope_of(elements, identifier));
            scope = namespace_scope?;
        }
        Some(scope)
    }
}

fn parent_scope_of(elements: &ElementMap, block: ElementId) -> Option<ElementId> {
    elements.get(block)?.parent_scope
}

fn find_type_in_block(
    elements: &ElementMap,
    block: ElementId,
    symbol: &QualifiedSymbol,
) -> Option<ElementId> {
    let ElementData::Block(data) = &elements.get(block)?.data else {
        return None;
    };
    data.types
        .get(&symbol.fully_qualified)
        .or_else(|| data.types.get(&symbol.name))
        .copied()
}

fn identifiers_in_block(elements: &ElementMap, block: ElementId, name: &str) -> Vec<ElementId> {
    match elements.get(block).map(|e| &e.data) {
        Some(ElementData::Block(data)) => data.identifiers.get(name).cloned().unwrap_or_default(),
        _ => Vec::new(),
    }
}

/// When `identifier` is bound to a namespace expression, the namespace's
/// scope block.
fn namespace_scope_of(elements: &ElementMap, identifier: ElementId) -> Option<ElementId> {
    let ElementData::Identifier(data) = &elements.get(identifier)?.data else {
        return None;
    };
    let initializer = data.initializer?;
    let ElementData::Initializer(init) = &elements.get(initializer)?.data else {
        return None;
    };
    let expression = init.expression?;
    match &elements.get(expression)?.data {
        ElementData::Namespace(namespace) => Some(namespace.scope),
        _ => None,
    }
}
