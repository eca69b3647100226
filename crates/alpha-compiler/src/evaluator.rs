//! The AST evaluator.
//!
//! Transforms parser nodes into elements, recursing through child slots
//! and returning a tagged result rather than downcasting. Name uses
//! become unresolved identifier references and missing type annotations
//! become unknown-type placeholders; both land on the scope manager's
//! worklists for the pipeline to drain.

use crate::directives::DirectiveKind;
use crate::elements::{types, CommentKind, ElementData, ElementId, ElementKind, OperatorKind};
use crate::intrinsics::IntrinsicKind;
use crate::session::Session;
use alpha_ast::{AstArena, AstNode, AstNodeKind, NodeId, TokenKind};
use alpha_common::numeric::{parse_float_literal, parse_integer_literal};
use alpha_common::{Id, QualifiedSymbol};

/// What evaluating a node produced.
#[derive(Clone, Debug)]
pub enum EvalResult {
    None,
    Element(ElementId),
    Type(ElementId),
    Module(ElementId),
    Identifier(ElementId),
    Identifiers(Vec<ElementId>),
}

impl EvalResult {
    /// The single element id carried by this result, when there is one.
    pub fn element(&self) -> Option<ElementId> {
        match self {
            EvalResult::Element(id)
            | EvalResult::Type(id)
            | EvalResult::Module(id)
            | EvalResult::Identifier(id) => Some(*id),
            EvalResult::Identifiers(ids) => ids.first().copied(),
            EvalResult::None => None,
        }
    }
}

impl Session {
    /// Evaluate a module's root node: allocate the module element and its
    /// root block, register it in the module cache (guarding import
    /// cycles), then evaluate every top-level child inside that scope.
    pub(crate) fn evaluate_module(
        &mut self,
        arena: &AstArena,
        root: NodeId,
        source_id: Id,
    ) -> Option<ElementId> {
        let path = self.source_file(source_id)?.path.clone();
        // Module scopes chain to the program scope, never to the module
        // that happened to trigger the import.
        let program_block = self.program().and_then(|program| {
            match self.elements.get(program).map(|e| &e.data) {
                Some(ElementData::Program(data)) => data.block,
                _ => None,
            }
        });
        let scope = self.make_block(program_block.or_else(|| self.scopes.current_scope()));
        let module = self.make_module(scope);
        if let Some(element) = self.elements.get_mut(module) {
            element.module = Some(module);
        }
        if let Some(parent) = self.scopes.current_module() {
            self.set_parent(module, parent);
            // The importing module does not own the imported one; the
            // registry does.
            if let Some(element) = self.elements.get_mut(module) {
                element.make_non_owning();
            }
        }
        self.modules.insert(path, module);

        self.scopes.push_module(module);
        self.scopes.push_block(scope);
        let children = arena.get(root).children.clone();
        for child in children {
            if let Some(statement) = self.evaluate_statement(arena, child) {
                self.add_statement_to_block(scope, statement);
            }
        }
        self.scopes.pop_block();
        self.scopes.pop_module();
        Some(module)
    }

    /// Evaluate one AST node into the element graph.
    pub fn evaluate(&mut self, arena: &AstArena, node_id: NodeId) -> EvalResult {
        let node = arena.get(node_id).clone();
        let scope = self.scopes.current_scope();
        let result = match node.kind {
            AstNodeKind::Module => EvalResult::None,
            AstNodeKind::BasicBlock => {
                let block = self.push_new_block();
                for child in node.children.iter().copied() {
                    if let Some(statement) = self.evaluate_statement(arena, child) {
                        self.add_statement_to_block(block, statement);
                    }
                }
                self.scopes.pop_block();
                EvalResult::Element(block)
            }
            AstNodeKind::Statement => match self.evaluate_statement(arena, node_id) {
                Some(statement) => EvalResult::Element(statement),
                None => EvalResult::None,
            },
            AstNodeKind::Assignment => self.evaluate_declaration(arena, &node, false),
            AstNodeKind::ConstantAssignment => self.evaluate_declaration(arena, &node, true),
            AstNodeKind::TypeSpec | AstNodeKind::PointerSpec | AstNodeKind::ArraySpec => {
                match self.evaluate_type_spec(arena, node_id) {
                    Some(reference) => EvalResult::Element(reference),
                    None => EvalResult::None,
                }
            }
            AstNodeKind::Symbol => self.evaluate_symbol_use(arena, node_id),
            AstNodeKind::BinaryOperator => self.evaluate_binary_operator(arena, &node),
            AstNodeKind::UnaryOperator => {
                let op = node
                    .token
                    .as_ref()
                    .and_then(|t| OperatorKind::from_unary_token(t.kind))
                    .unwrap_or(OperatorKind::Unknown);
                match node.rhs.and_then(|rhs| self.evaluate_element(arena, rhs)) {
                    Some(rhs) => EvalResult::Element(self.make_unary_operator(scope, op, rhs)),
                    None => EvalResult::None,
                }
            }
            AstNodeKind::NumberLiteral => {
                let text = node.lexeme();
                if let Some(value) = parse_integer_literal(text) {
                    EvalResult::Element(self.make_integer(scope, value))
                } else if let Some(value) = parse_float_literal(text) {
                    EvalResult::Element(self.make_float(scope, value))
                } else {
                    let location = node.location;
                    let module = self.scopes.current_module();
                    self.error(
                        module,
                        "P041",
                        format!("invalid numeric literal: {text}"),
                        location,
                    );
                    EvalResult::None
                }
            }
            AstNodeKind::StringLiteral => {
                EvalResult::Element(self.make_string(scope, node.lexeme()))
            }
            AstNodeKind::BooleanLiteral => {
                let value = node.token.as_ref().map(|t| t.kind) == Some(TokenKind::True);
                EvalResult::Element(self.make_bool(scope, value))
            }
            AstNodeKind::CharacterLiteral => {
                let rune = node.lexeme().chars().next().unwrap_or('\0');
                EvalResult::Element(self.make_character(scope, rune))
            }
            AstNodeKind::NilLiteral => EvalResult::Element(self.make_nil(scope)),
            AstNodeKind::UninitializedLiteral => {
                EvalResult::Element(self.make_uninitialized(scope))
            }
            AstNodeKind::ProcExpression => self.evaluate_proc_expression(arena, &node),
            AstNodeKind::ProcCall => self.evaluate_proc_call(arena, &node),
            AstNodeKind::ArgumentList => {
                let mut elements = Vec::new();
                for child in node.children.iter().copied() {
                    if let Some(element) = self.evaluate_element(arena, child) {
                        elements.push(element);
                    }
                }
                EvalResult::Element(self.make_argument_list(scope, elements))
            }
            AstNodeKind::IfExpression | AstNodeKind::ElseIfExpression => {
                self.evaluate_if(arena, &node)
            }
            AstNodeKind::ElseExpression => {
                match node
                    .children
                    .first()
                    .and_then(|&block| self.evaluate_element(arena, block))
                {
                    Some(block) => EvalResult::Element(block),
                    None => EvalResult::None,
                }
            }
            AstNodeKind::WhileStatement => {
                let predicate = node.lhs.and_then(|n| self.evaluate_element(arena, n));
                let body = node.rhs.and_then(|n| self.evaluate_element(arena, n));
                match (predicate, body) {
                    (Some(predicate), Some(body)) => {
                        EvalResult::Element(self.make_while(scope, predicate, body))
                    }
                    _ => EvalResult::None,
                }
            }
            AstNodeKind::ForStatement => self.evaluate_for(arena, &node),
            AstNodeKind::BreakStatement => {
                let label = node
                    .token
                    .as_ref()
                    .map(|t| t.value.clone())
                    .map(|name| self.make_label_reference(scope, &name));
                EvalResult::Element(self.make_break(scope, label))
            }
            AstNodeKind::ContinueStatement => {
                let label = node
                    .token
                    .as_ref()
                    .map(|t| t.value.clone())
                    .map(|name| self.make_label_reference(scope, &name));
                EvalResult::Element(self.make_continue(scope, label))
            }
            AstNodeKind::ReturnStatement => {
                let mut expressions = Vec::new();
                for child in node.children.iter().copied() {
                    if let Some(element) = self.evaluate_element(arena, child) {
                        expressions.push(element);
                    }
                }
                EvalResult::Element(self.make_return(scope, expressions))
            }
            AstNodeKind::DeferExpression => {
                match node.lhs.and_then(|n| self.evaluate_element(arena, n)) {
                    Some(expression) => EvalResult::Element(self.make_defer(scope, expression)),
                    None => EvalResult::None,
                }
            }
            AstNodeKind::SwitchExpression => self.evaluate_switch(arena, &node),
            AstNodeKind::CaseExpression => {
                let expression = node.lhs.and_then(|n| self.evaluate_element(arena, n));
                match node.rhs.and_then(|n| self.evaluate_element(arena, n)) {
                    Some(block) => {
                        EvalResult::Element(self.make_case(scope, expression, block))
                    }
                    None => EvalResult::None,
                }
            }
            AstNodeKind::FallthroughStatement => {
                EvalResult::Element(self.make_fallthrough(scope, None))
            }
            AstNodeKind::WithExpression => {
                let expression = node.lhs.and_then(|n| self.evaluate_element(arena, n));
                let body = node.rhs.and_then(|n| self.evaluate_element(arena, n));
                match (expression, body) {
                    (Some(expression), Some(body)) => {
                        EvalResult::Element(self.make_with(scope, expression, body))
                    }
                    _ => EvalResult::None,
                }
            }
            AstNodeKind::NamespaceExpression => self.evaluate_namespace(arena, &node),
            AstNodeKind::StructExpression => {
                self.evaluate_composite(arena, &node, types::CompositeKind::Struct)
            }
            AstNodeKind::EnumExpression => {
                self.evaluate_composite(arena, &node, types::CompositeKind::Enum)
            }
            AstNodeKind::UnionExpression => {
                self.evaluate_composite(arena, &node, types::CompositeKind::Union)
            }
            AstNodeKind::ImportExpression | AstNodeKind::ModuleExpression => {
                self.evaluate_import(arena, &node)
            }
            AstNodeKind::Directive => self.evaluate_directive_node(arena, &node),
            AstNodeKind::Attribute => {
                let expression = node.lhs.and_then(|n| self.evaluate_element(arena, n));
                EvalResult::Element(self.make_attribute(scope, node.lexeme(), expression))
            }
            AstNodeKind::Label => EvalResult::Element(self.make_label(scope, node.lexeme())),
            AstNodeKind::Comment => {
                let kind = match node.token.as_ref().map(|t| t.kind) {
                    Some(TokenKind::BlockComment) => CommentKind::Block,
                    _ => CommentKind::Line,
                };
                EvalResult::Element(self.make_comment(scope, kind, node.lexeme()))
            }
            AstNodeKind::RawBlock => EvalResult::Element(self.make_raw_block(scope, node.lexeme())),
            AstNodeKind::CastExpression => {
                let type_ref = node.lhs.and_then(|n| self.evaluate_type_spec(arena, n));
                let expression = node.rhs.and_then(|n| self.evaluate_element(arena, n));
                match (type_ref, expression) {
                    (Some(type_ref), Some(expression)) => {
                        EvalResult::Element(self.make_cast(scope, type_ref, expression))
                    }
                    _ => EvalResult::None,
                }
            }
            AstNodeKind::TransmuteExpression => {
                let type_ref = node.lhs.and_then(|n| self.evaluate_type_spec(arena, n));
                let expression = node.rhs.and_then(|n| self.evaluate_element(arena, n));
                match (type_ref, expression) {
                    (Some(type_ref), Some(expression)) => {
                        EvalResult::Element(self.make_transmute(scope, type_ref, expression))
                    }
                    _ => EvalResult::None,
                }
            }
            AstNodeKind::SpreadOperator => {
                let expression = node.lhs.and_then(|n| self.evaluate_element(arena, n));
                EvalResult::Element(self.make_spread_operator(scope, expression))
            }
            AstNodeKind::Expression => match node.lhs {
                Some(inner) => self.evaluate(arena, inner),
                None => EvalResult::None,
            },
            AstNodeKind::Parameter
            | AstNodeKind::SymbolPart
            | AstNodeKind::ReturnArgumentList => EvalResult::None,
        };
        if let Some(element) = result.element() {
            self.set_location(element, node.location);
            self.attach_side_nodes(arena, &node, element);
        }
        result
    }

    /// Evaluate a node and take the element it produced.
    pub(crate) fn evaluate_element(
        &mut self,
        arena: &AstArena,
        node: NodeId,
    ) -> Option<ElementId> {
        self.evaluate(arena, node).element()
    }

    fn evaluate_statement(&mut self, arena: &AstArena, node_id: NodeId) -> Option<ElementId> {
        let node = arena.get(node_id).clone();
        let scope = self.scopes.current_scope();
        if node.kind != AstNodeKind::Statement {
            let element = self.evaluate_element(arena, node_id)?;
            return Some(self.make_statement(scope, Vec::new(), Some(element)));
        }
        let mut labels = Vec::new();
        for label in node.labels.iter().copied() {
            let name = arena.get(label).lexeme().to_string();
            labels.push(self.make_label(scope, &name));
        }
        let expression = node.lhs.and_then(|lhs| self.evaluate_element(arena, lhs));
        let statement = self.make_statement(scope, labels, expression);
        self.set_location(statement, node.location);
        Some(statement)
    }

    // ------------------------------------------------------------------
    // names

    pub(crate) fn symbol_from_node(&self, arena: &AstArena, node_id: NodeId) -> QualifiedSymbol {
        let node = arena.get(node_id);
        let mut parts: Vec<String> = node
            .children
            .iter()
            .map(|&part| arena.get(part).lexeme().to_string())
            .collect();
        if parts.is_empty() {
            parts.push(node.lexeme().to_string());
        }
        let name = parts.pop().unwrap_or_default();
        QualifiedSymbol::qualified(name, parts).with_location(node.location)
    }

    /// A name used as an expression: a known type becomes a type
    /// reference, anything else an unresolved identifier reference.
    fn evaluate_symbol_use(&mut self, arena: &AstArena, node_id: NodeId) -> EvalResult {
        let symbol = self.symbol_from_node(arena, node_id);
        let scope = self.scopes.current_scope();
        if let Some(type_id) = self.scopes.find_type(&self.elements, &symbol, scope) {
            return EvalResult::Element(self.make_type_reference(scope, symbol, Some(type_id)));
        }
        let reference = self.make_identifier_reference(scope, symbol, None);
        self.scopes.enqueue_unresolved_reference(reference);
        EvalResult::Element(reference)
    }

    fn evaluate_binary_operator(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let op = node
            .token
            .as_ref()
            .and_then(|t| OperatorKind::from_binary_token(t.kind))
            .unwrap_or(OperatorKind::Unknown);
        let scope = self.scopes.current_scope();
        let lhs = node.lhs.and_then(|n| self.evaluate_element(arena, n));
        // The right side of a member access always resolves later, in the
        // scope of the left side's type.
        let rhs = match (op, node.rhs) {
            (OperatorKind::MemberAccess, Some(rhs_node))
                if arena.get(rhs_node).kind == AstNodeKind::Symbol =>
            {
                let symbol = self.symbol_from_node(arena, rhs_node);
                let reference = self.make_identifier_reference(scope, symbol, None);
                self.scopes.enqueue_unresolved_reference(reference);
                Some(reference)
            }
            (_, Some(rhs_node)) => self.evaluate_element(arena, rhs_node),
            (_, None) => None,
        };
        match (lhs, rhs) {
            (Some(lhs), Some(rhs)) => {
                EvalResult::Element(self.make_binary_operator(scope, op, lhs, rhs))
            }
            _ => EvalResult::None,
        }
    }

    // ------------------------------------------------------------------
    // declarations

    fn evaluate_declaration(
        &mut self,
        arena: &AstArena,
        node: &AstNode,
        constant: bool,
    ) -> EvalResult {
        let Some(symbol_node) = node.lhs else {
            return EvalResult::None;
        };
        let symbol = self.symbol_from_node(arena, symbol_node);
        let type_spec = node.children.first().copied();
        let scope = self.scopes.current_scope();

        // Without an annotation, a name already in scope makes this an
        // assignment to the existing identifier.
        if type_spec.is_none() && !constant {
            let existing = self
                .scopes
                .find_identifier(&self.elements, &symbol, scope);
            if !existing.is_empty() {
                let reference = self.make_identifier_reference(scope, symbol, None);
                self.scopes.enqueue_unresolved_reference(reference);
                let Some(rhs) = node.rhs.and_then(|n| self.evaluate_element(arena, n)) else {
                    return EvalResult::None;
                };
                let operator =
                    self.make_binary_operator(scope, OperatorKind::Assignment, reference, rhs);
                return EvalResult::Element(operator);
            }
        }

        let symbol_element =
            self.make_symbol(scope, &symbol.name, symbol.namespaces.clone());
        let init_element = node.rhs.and_then(|n| self.evaluate_element(arena, n));

        // Type-valued initializers bind the identifier to the type itself.
        if let Some(expr) = init_element {
            match self.elements.kind_of(expr) {
                Some(ElementKind::CompositeType) => {
                    return self.bind_composite_declaration(scope, symbol, symbol_element, expr);
                }
                Some(ElementKind::Namespace) => {
                    let namespace_type = self.scopes.find_type(
                        &self.elements,
                        &QualifiedSymbol::new("namespace"),
                        scope,
                    );
                    let type_ref = self.make_type_reference(
                        scope,
                        QualifiedSymbol::new("namespace"),
                        namespace_type,
                    );
                    let initializer = self.make_initializer(scope, Some(expr));
                    let identifier = self.make_identifier(
                        scope,
                        symbol_element,
                        Some(type_ref),
                        Some(initializer),
                        true,
                    );
                    if let Some(block) = scope {
                        self.add_identifier_to_scope(block, identifier);
                    }
                    let declaration = self.make_declaration(scope, identifier, None);
                    return EvalResult::Element(declaration);
                }
                Some(ElementKind::ProcedureType) => {
                    return self.bind_procedure_declaration(
                        scope,
                        symbol,
                        symbol_element,
                        expr,
                        constant,
                    );
                }
                _ => {}
            }
        }

        let initializer = init_element.map(|expr| self.make_initializer(scope, Some(expr)));
        let (type_ref, unknown) = match type_spec {
            Some(spec) => match self.evaluate_type_spec(arena, spec) {
                Some(reference) => {
                    let unknown = types::is_unknown_type_ref(&self.elements, reference);
                    (reference, unknown)
                }
                None => return EvalResult::None,
            },
            None => {
                let placeholder =
                    self.make_unknown_type(scope, QualifiedSymbol::default(), init_element);
                let reference =
                    self.make_type_reference(scope, QualifiedSymbol::default(), Some(placeholder));
                (reference, true)
            }
        };

        let identifier = self.make_identifier(
            scope,
            symbol_element,
            Some(type_ref),
            initializer,
            constant,
        );
        self.set_location(identifier, symbol.location);
        if let Some(block) = scope {
            self.add_identifier_to_scope(block, identifier);
        }
        if unknown {
            self.scopes.enqueue_identifier_with_unknown_type(identifier);
        }
        let declaration = self.make_declaration(scope, identifier, None);
        EvalResult::Element(declaration)
    }

    fn bind_composite_declaration(
        &mut self,
        scope: Option<ElementId>,
        symbol: QualifiedSymbol,
        symbol_element: ElementId,
        composite: ElementId,
    ) -> EvalResult {
        let type_symbol =
            self.make_symbol(scope, &symbol.name, symbol.namespaces.clone());
        self.set_parent(type_symbol, composite);
        if let Some(header) = self
            .elements
            .get_mut(composite)
            .and_then(|e| e.type_header_mut())
        {
            header.symbol = Some(type_symbol);
        }
        self.compute_composite_layout(composite);
        self.add_type_to_scope(composite);
        let type_ref = self.make_type_reference(scope, symbol.clone(), Some(composite));
        let identifier =
            self.make_identifier(scope, symbol_element, Some(type_ref), None, true);
        if let Some(block) = scope {
            self.add_identifier_to_scope(block, identifier);
        }
        let declaration = self.make_declaration(scope, identifier, None);
        EvalResult::Element(declaration)
    }

    fn bind_procedure_declaration(
        &mut self,
        scope: Option<ElementId>,
        symbol: QualifiedSymbol,
        symbol_element: ElementId,
        proc_type: ElementId,
        constant: bool,
    ) -> EvalResult {
        let initializer = self.make_initializer(scope, Some(proc_type));
        let type_ref = self.make_type_reference(scope, symbol.clone(), Some(proc_type));
        let identifier = self.make_identifier(
            scope,
            symbol_element,
            Some(type_ref),
            Some(initializer),
            constant,
        );
        if let Some(block) = scope {
            self.add_identifier_to_scope(block, identifier);
        }
        let label = self.label_name(identifier);
        let has_body = matches!(
            self.elements.get(proc_type).map(|e| &e.data),
            Some(ElementData::ProcedureType(data)) if data.body.is_some()
        );
        if let Some(ElementData::ProcedureType(data)) =
            self.elements.get_mut(proc_type).map(|e| &mut e.data)
        {
            data.label = Some(label);
        }
        if has_body {
            let instance_scope = match self.elements.get(proc_type).map(|e| &e.data) {
                Some(ElementData::ProcedureType(data)) => data.body,
                _ => None,
            };
            self.make_procedure_instance(scope, proc_type, instance_scope);
        }
        let declaration = self.make_declaration(scope, identifier, None);
        EvalResult::Element(declaration)
    }

    // ------------------------------------------------------------------
    // type specs

    /// Evaluate a type annotation into a type reference. Unknown names
    /// produce an unknown-type placeholder behind the reference; pointer
    /// bases stay peelable for the resolution pass.
    pub(crate) fn evaluate_type_spec(
        &mut self,
        arena: &AstArena,
        node_id: NodeId,
    ) -> Option<ElementId> {
        let node = arena.get(node_id).clone();
        let scope = self.scopes.current_scope();
        match node.kind {
            AstNodeKind::TypeSpec => {
                let symbol_node = node.lhs?;
                let symbol = self.symbol_from_node(arena, symbol_node);
                match self.scopes.find_type(&self.elements, &symbol, scope) {
                    Some(type_id) => {
                        Some(self.make_type_reference(scope, symbol, Some(type_id)))
                    }
                    None => {
                        let placeholder = self.make_unknown_type(scope, symbol.clone(), None);
                        Some(self.make_type_reference(scope, symbol, Some(placeholder)))
                    }
                }
            }
            AstNodeKind::PointerSpec => {
                let base_ref = self.evaluate_type_spec(arena, node.lhs?)?;
                let pointer = self.make_pointer_type(scope, base_ref);
                Some(self.make_type_reference(scope, QualifiedSymbol::default(), Some(pointer)))
            }
            AstNodeKind::ArraySpec => {
                let base_ref = self.evaluate_type_spec(arena, node.lhs?)?;
                let mut subscripts = Vec::new();
                for child in node.children.iter().copied() {
                    if let Some(subscript) = self.evaluate_element(arena, child) {
                        subscripts.push(subscript);
                    }
                }
                let entry_scope = self.make_block(scope);
                let array = self.make_array_type(scope, entry_scope, base_ref, subscripts);
                Some(self.make_type_reference(scope, QualifiedSymbol::default(), Some(array)))
            }
            // A spread in annotation position marks the variadic tail;
            // the wrapped spec is the declared element type.
            AstNodeKind::SpreadOperator => self.evaluate_type_spec(arena, node.lhs?),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // procedures

    fn evaluate_proc_expression(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let outer_scope = self.scopes.current_scope();
        let param_scope = self.push_new_block();
        let mut parameters = Vec::new();
        let mut variadic = false;
        for &param_node_id in &node.children {
            let param_node = arena.get(param_node_id).clone();
            if param_node.kind != AstNodeKind::Parameter {
                continue;
            }
            let Some(symbol_node) = param_node.lhs else {
                continue;
            };
            let symbol = self.symbol_from_node(arena, symbol_node);
            let Some(spec) = param_node.children.first().copied() else {
                continue;
            };
            if arena.get(spec).kind == AstNodeKind::SpreadOperator {
                variadic = true;
            }
            let Some(type_ref) = self.evaluate_type_spec(arena, spec) else {
                continue;
            };
            let symbol_element =
                self.make_symbol(Some(param_scope), &symbol.name, Vec::new());
            let identifier = self.make_identifier(
                Some(param_scope),
                symbol_element,
                Some(type_ref),
                None,
                false,
            );
            self.add_identifier_to_scope(param_scope, identifier);
            if types::is_unknown_type_ref(&self.elements, type_ref) {
                self.scopes.enqueue_identifier_with_unknown_type(identifier);
            }
            parameters.push(identifier);
        }
        let return_type = node.lhs.and_then(|n| self.evaluate_type_spec(arena, n));
        let body = node.rhs.and_then(|n| self.evaluate_element(arena, n));
        self.scopes.pop_block();
        let proc_type = self.make_procedure_type(
            outer_scope,
            param_scope,
            parameters,
            return_type,
            body,
            variadic,
        );
        EvalResult::Type(proc_type)
    }

    fn evaluate_proc_call(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let scope = self.scopes.current_scope();
        let Some(target) = node.lhs else {
            return EvalResult::None;
        };
        let symbol = self.symbol_from_node(arena, target);
        let mut arguments = Vec::new();
        if let Some(list) = node.rhs {
            for child in arena.get(list).children.clone() {
                if let Some(argument) = self.evaluate_element(arena, child) {
                    arguments.push(argument);
                }
            }
        }
        let argument_list = self.make_argument_list(scope, arguments);

        // Reserved names short-circuit to intrinsic elements.
        if !symbol.is_qualified() {
            if let Some(kind) = IntrinsicKind::from_name(&symbol.name) {
                if let Some(&proc_type) = self.intrinsic_proc_types.get(&kind) {
                    let intrinsic = self.make_intrinsic(scope, kind, argument_list, proc_type);
                    return EvalResult::Element(intrinsic);
                }
            }
        }

        let reference = self.make_identifier_reference(scope, symbol, None);
        self.scopes.enqueue_unresolved_reference(reference);
        let call = self.make_procedure_call(scope, argument_list, vec![reference], Vec::new());
        EvalResult::Element(call)
    }

    // ------------------------------------------------------------------
    // control flow

    fn evaluate_if(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let scope = self.scopes.current_scope();
        let predicate = node.lhs.and_then(|n| self.evaluate_element(arena, n));
        let true_branch = node
            .children
            .first()
            .and_then(|&n| self.evaluate_element(arena, n));
        let false_branch = node.rhs.and_then(|n| self.evaluate_element(arena, n));
        match (predicate, true_branch) {
            (Some(predicate), Some(true_branch)) => {
                EvalResult::Element(self.make_if(scope, predicate, true_branch, false_branch))
            }
            _ => EvalResult::None,
        }
    }

    fn evaluate_for(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let Some(induction_node) = node.lhs else {
            return EvalResult::None;
        };
        let symbol = self.symbol_from_node(arena, induction_node);
        let iterable = node
            .children
            .first()
            .and_then(|&n| self.evaluate_element(arena, n));
        let Some(iterable) = iterable else {
            return EvalResult::None;
        };
        let for_scope = self.push_new_block();

        // The induction variable draws its type from the iterable; a
        // range iterates its start value's type.
        let inference_source = match self.elements.get(iterable).map(|e| &e.data) {
            Some(ElementData::Intrinsic(data)) if data.kind == IntrinsicKind::Range => {
                self.first_argument(data.arguments).unwrap_or(iterable)
            }
            _ => iterable,
        };
        let symbol_element = self.make_symbol(Some(for_scope), &symbol.name, Vec::new());
        let placeholder = self.make_unknown_type(
            Some(for_scope),
            QualifiedSymbol::default(),
            Some(inference_source),
        );
        let type_ref = self.make_type_reference(
            Some(for_scope),
            QualifiedSymbol::default(),
            Some(placeholder),
        );
        let identifier = self.make_identifier(
            Some(for_scope),
            symbol_element,
            Some(type_ref),
            None,
            false,
        );
        self.add_identifier_to_scope(for_scope, identifier);
        self.scopes.enqueue_identifier_with_unknown_type(identifier);
        let induction_decl = self.make_declaration(Some(for_scope), identifier, None);

        let body = node.rhs.and_then(|n| self.evaluate_element(arena, n));
        self.scopes.pop_block();
        let outer_scope = self.scopes.current_scope();
        match body {
            Some(body) => EvalResult::Element(self.make_for(
                outer_scope,
                induction_decl,
                iterable,
                body,
            )),
            None => EvalResult::None,
        }
    }

    fn evaluate_switch(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let Some(selector) = node.lhs.and_then(|n| self.evaluate_element(arena, n)) else {
            return EvalResult::None;
        };
        let scope_block = self.push_new_block();
        for child in node.children.iter().copied() {
            if let Some(case) = self.evaluate_element(arena, child) {
                self.add_statement_to_block(scope_block, case);
            }
        }
        self.scopes.pop_block();
        let outer_scope = self.scopes.current_scope();
        EvalResult::Element(self.make_switch(outer_scope, selector, scope_block))
    }

    // ------------------------------------------------------------------
    // namespaces & composites

    fn evaluate_namespace(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let symbol_element = node.lhs.map(|symbol_node| {
            let symbol = self.symbol_from_node(arena, symbol_node);
            let scope = self.scopes.current_scope();
            self.make_symbol(scope, &symbol.name, symbol.namespaces)
        });
        let scope_block = self.push_new_block();
        if let Some(body) = node.rhs {
            for child in arena.get(body).children.clone() {
                if let Some(statement) = self.evaluate_statement(arena, child) {
                    self.add_statement_to_block(scope_block, statement);
                }
            }
        }
        self.scopes.pop_block();
        let outer_scope = self.scopes.current_scope();
        EvalResult::Element(self.make_namespace(outer_scope, symbol_element, scope_block))
    }

    fn evaluate_composite(
        &mut self,
        arena: &AstArena,
        node: &AstNode,
        kind: types::CompositeKind,
    ) -> EvalResult {
        let scope_block = self.push_new_block();
        for child in node.children.iter().copied() {
            // Field declarations evaluate like any other; their
            // identifiers land in the composite's scope.
            if let Some(statement) = self.evaluate_statement(arena, child) {
                self.add_statement_to_block(scope_block, statement);
            }
        }
        self.scopes.pop_block();
        let outer_scope = self.scopes.current_scope();
        let composite = self.make_composite_type(outer_scope, kind, scope_block, None);
        self.populate_composite_fields(composite);
        EvalResult::Type(composite)
    }

    fn populate_composite_fields(&mut self, composite: ElementId) {
        let scope = match self.elements.get(composite).map(|e| &e.data) {
            Some(ElementData::CompositeType(data)) => data.scope,
            _ => return,
        };
        let identifiers: Vec<(String, ElementId)> =
            match self.elements.get(scope).map(|e| &e.data) {
                Some(ElementData::Block(data)) => data
                    .identifiers
                    .iter()
                    .flat_map(|(name, ids)| {
                        ids.iter().map(move |&id| (name.clone(), id))
                    })
                    .collect(),
                _ => return,
            };
        for (name, identifier) in identifiers {
            let field = self.make_field(Some(scope), identifier, 0);
            self.set_parent(field, composite);
            if let Some(ElementData::CompositeType(data)) =
                self.elements.get_mut(composite).map(|e| &mut e.data)
            {
                data.fields.insert(name, field);
            }
        }
    }

    /// Assign field offsets and the composite's total size once member
    /// types are known. Unions overlay at offset zero.
    pub(crate) fn compute_composite_layout(&mut self, composite: ElementId) {
        let Some(ElementData::CompositeType(data)) =
            self.elements.get(composite).map(|e| e.data.clone())
        else {
            return;
        };
        let mut offset = 0u64;
        let mut max_size = 0usize;
        let mut max_align = 1usize;
        for &field in data.fields.values() {
            let identifier = match self.elements.get(field).map(|e| &e.data) {
                Some(ElementData::Field(field_data)) => field_data.identifier,
                _ => continue,
            };
            let (size, align) = self
                .identifier_type(identifier)
                .and_then(|t| self.elements.get(t))
                .and_then(|e| e.type_header())
                .map(|h| (h.size_in_bytes, h.alignment.max(1)))
                .unwrap_or((8, 8));
            max_align = max_align.max(align);
            match data.kind {
                types::CompositeKind::Union => {
                    max_size = max_size.max(size);
                }
                _ => {
                    let misalign = offset % align as u64;
                    if misalign != 0 {
                        offset += align as u64 - misalign;
                    }
                    if let Some(ElementData::Field(field_data)) =
                        self.elements.get_mut(field).map(|e| &mut e.data)
                    {
                        field_data.offset = offset;
                    }
                    offset += size as u64;
                }
            }
        }
        let total = match data.kind {
            types::CompositeKind::Union => max_size,
            _ => offset as usize,
        };
        if let Some(header) = self
            .elements
            .get_mut(composite)
            .and_then(|e| e.type_header_mut())
        {
            header.size_in_bytes = total;
            header.alignment = max_align;
        }
    }

    // ------------------------------------------------------------------
    // modules & directives

    fn evaluate_import(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let scope = self.scopes.current_scope();
        let path_node = match node.kind {
            AstNodeKind::ImportExpression => node.lhs.map(|inner| arena.get(inner).lhs),
            _ => Some(node.lhs),
        }
        .flatten();
        let Some(path_node) = path_node else {
            return EvalResult::None;
        };
        let path_text = arena.get(path_node).lexeme().to_string();
        let expression = self.make_string(scope, &path_text);
        let module = self.compile_module_by_path(std::path::Path::new(&path_text));
        let reference = self.make_module_reference(scope, expression);
        if let Some(ElementData::ModuleReference(data)) =
            self.elements.get_mut(reference).map(|e| &mut e.data)
        {
            data.module = module;
        }
        match (node.kind, module) {
            (AstNodeKind::ImportExpression, Some(module)) => {
                let import = self.make_import(scope, reference);
                if let Some(ElementData::Import(data)) =
                    self.elements.get_mut(import).map(|e| &mut e.data)
                {
                    data.module = Some(module);
                }
                // The enclosing block indexes its imports; the wrapping
                // statement owns the element.
                if let Some(block) = scope {
                    if let Some(ElementData::Block(block_data)) =
                        self.elements.get_mut(block).map(|e| &mut e.data)
                    {
                        block_data.imports.push(import);
                    }
                }
                EvalResult::Element(import)
            }
            _ => match module {
                Some(module) => EvalResult::Module(module),
                None => EvalResult::Element(reference),
            },
        }
    }

    fn evaluate_directive_node(&mut self, arena: &AstArena, node: &AstNode) -> EvalResult {
        let name = node.lexeme().to_string();
        let scope = self.scopes.current_scope();
        let Some(kind) = DirectiveKind::from_name(&name) else {
            let location = node.location;
            let module = self.scopes.current_module();
            self.error(
                module,
                "P043",
                format!("unknown directive: {name}"),
                location,
            );
            return EvalResult::None;
        };
        let directive = match kind {
            DirectiveKind::If => {
                let is_else = name == "else";
                let mut params = node.children.iter().copied();
                let predicate = if is_else {
                    None
                } else {
                    params
                        .next()
                        .and_then(|n| self.evaluate_element(arena, n))
                };
                let body = params.next().and_then(|n| self.evaluate_element(arena, n));
                let chain = params.next().and_then(|n| self.evaluate_element(arena, n));
                let body = if is_else {
                    // #else carries only a body.
                    predicate.or(body)
                } else {
                    body
                };
                self.make_directive(scope, kind, predicate, chain, body, None)
            }
            _ => {
                let expression = node
                    .children
                    .first()
                    .and_then(|&n| self.evaluate_element(arena, n));
                self.make_directive(scope, kind, None, None, None, expression)
            }
        };
        if !self.evaluate_directive_hook(directive) {
            let location = node.location;
            let module = self.scopes.current_module();
            self.error(
                module,
                "P044",
                format!("directive failed to evaluate: {name}"),
                location,
            );
        }
        EvalResult::Element(directive)
    }

    fn attach_side_nodes(&mut self, arena: &AstArena, node: &AstNode, element: ElementId) {
        for &attr_node in &node.attributes {
            let name = arena.get(attr_node).lexeme().to_string();
            let expression = arena
                .get(attr_node)
                .lhs
                .and_then(|n| self.evaluate_element(arena, n));
            let scope = self.scopes.current_scope();
            let attribute = self.make_attribute(scope, &name, expression);
            self.set_parent(attribute, element);
            if let Some(target) = self.elements.get_mut(element) {
                target.attributes.insert(name, attribute);
            }
        }
        for &comment_node in &node.comments {
            let text = arena.get(comment_node).lexeme().to_string();
            let scope = self.scopes.current_scope();
            let comment = self.make_comment(scope, CommentKind::Line, &text);
            self.set_parent(comment, element);
            if let Some(target) = self.elements.get_mut(element) {
                target.comments.push(comment);
            }
        }
    }
}
