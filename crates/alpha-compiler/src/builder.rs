//! Element construction.
//!
//! The `make_*` methods are the only sanctioned construction path: each
//! allocates a fresh id, initialises the variant payload, wires parent
//! links on directly-owned children, and registers built types where
//! required. Sharing is explicit via non-owning references; builders
//! never silently reuse existing elements (pointer and array types are
//! the exception, interned by their synthesized names).

use crate::directives::DirectiveKind;
use crate::elements::{
    types, ArgumentListData, ArrayTypeData, AssemblyLabelData, AssignmentData, AttributeData,
    BinaryOperatorData, BlockData, BreakData, CaseData, CastData, CommentData, CommentKind,
    CompositeKind, CompositeTypeData, ContinueData, DeclarationData, DeferData, DirectiveData,
    Element, ElementData, ElementId, ExpressionData, FallthroughData, FieldData, ForData,
    GenericTypeData, IdentifierData, IdentifierReferenceData, IfData, ImportData,
    InitializerData, IntrinsicData, LabelData, LabelReferenceData, ModuleData,
    ModuleReferenceData, ModuleTypeData, NamespaceData, NumericTypeData, OperatorKind,
    PointerTypeData, ProcedureCallData, ProcedureInstanceData, ProcedureTypeData, ProgramData,
    ReturnData, SpreadOperatorData, StatementData, SwitchData, SymbolData, TupleTypeData,
    TypeHeader, TypeReferenceData, UnaryOperatorData, UnknownTypeData, WhileData, WithData,
};
use crate::intrinsics::IntrinsicKind;
use crate::session::Session;
use alpha_common::{
    next_id, symbol::make_fully_qualified, NumberClass, QualifiedSymbol, SourceLocation,
};
use indexmap::IndexMap;

impl Session {
    fn new_element(&mut self, parent_scope: Option<ElementId>, data: ElementData) -> ElementId {
        let element = Element {
            id: next_id(),
            parent_scope,
            parent_element: None,
            module: self.scopes.current_module(),
            location: SourceLocation::default(),
            attributes: IndexMap::new(),
            comments: Vec::new(),
            non_owning: false,
            data,
        };
        self.elements.insert(element)
    }

    pub(crate) fn set_parent(&mut self, child: ElementId, parent: ElementId) {
        // A block re-parented away from its lexical container moves out
        // of that container's owned list; ownership stays single-headed.
        let container = match self.elements.get(child) {
            Some(element) if matches!(element.data, ElementData::Block(_)) => {
                element.parent_scope.filter(|&scope| scope != parent)
            }
            _ => None,
        };
        if let Some(container) = container {
            if let Some(ElementData::Block(data)) =
                self.elements.get_mut(container).map(|e| &mut e.data)
            {
                data.blocks.retain(|&block| block != child);
            }
        }
        if let Some(element) = self.elements.get_mut(child) {
            element.parent_element = Some(parent);
        }
    }

    pub(crate) fn set_location(&mut self, id: ElementId, location: SourceLocation) {
        if let Some(element) = self.elements.get_mut(id) {
            element.location = location;
        }
    }

    // ------------------------------------------------------------------
    // structure

    pub fn make_program(&mut self) -> ElementId {
        self.new_element(None, ElementData::Program(ProgramData::default()))
    }

    pub fn make_module(&mut self, scope: ElementId) -> ElementId {
        let module = self.new_element(
            self.scopes.current_scope(),
            ElementData::Module(ModuleData {
                scope: Some(scope),
                source_file: None,
                is_root: false,
            }),
        );
        self.set_parent(scope, module);
        module
    }

    pub fn make_module_reference(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: ElementId,
    ) -> ElementId {
        let reference = self.new_element(
            parent_scope,
            ElementData::ModuleReference(ModuleReferenceData {
                expression,
                module: None,
            }),
        );
        self.set_parent(expression, reference);
        reference
    }

    pub fn make_import(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: ElementId,
    ) -> ElementId {
        let import = self.new_element(
            parent_scope,
            ElementData::Import(ImportData {
                expression,
                module: None,
            }),
        );
        self.set_parent(expression, import);
        import
    }

    pub fn make_block(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        self.new_element(parent_scope, ElementData::Block(BlockData::default()))
    }

    pub fn make_statement(
        &mut self,
        parent_scope: Option<ElementId>,
        labels: Vec<ElementId>,
        expression: Option<ElementId>,
    ) -> ElementId {
        let statement = self.new_element(
            parent_scope,
            ElementData::Statement(StatementData {
                labels: labels.clone(),
                expression,
            }),
        );
        for label in labels {
            self.set_parent(label, statement);
        }
        if let Some(expression) = expression {
            self.set_parent(expression, statement);
        }
        statement
    }

    // ------------------------------------------------------------------
    // names & bindings

    pub fn make_symbol(
        &mut self,
        parent_scope: Option<ElementId>,
        name: &str,
        namespaces: Vec<String>,
    ) -> ElementId {
        let fully_qualified = make_fully_qualified(&namespaces, name);
        self.new_element(
            parent_scope,
            ElementData::Symbol(SymbolData {
                name: name.to_string(),
                namespaces,
                fully_qualified,
                constant: false,
                type_parameters: Vec::new(),
            }),
        )
    }

    pub fn make_identifier(
        &mut self,
        parent_scope: Option<ElementId>,
        symbol: ElementId,
        type_ref: Option<ElementId>,
        initializer: Option<ElementId>,
        constant: bool,
    ) -> ElementId {
        let identifier = self.new_element(
            parent_scope,
            ElementData::Identifier(IdentifierData {
                symbol,
                type_ref,
                initializer,
                inferred_type: false,
                constant,
            }),
        );
        self.set_parent(symbol, identifier);
        if let Some(ElementData::Symbol(data)) =
            self.elements.get_mut(symbol).map(|e| &mut e.data)
        {
            data.constant = constant;
        }
        if let Some(type_ref) = type_ref {
            self.set_parent(type_ref, identifier);
        }
        if let Some(initializer) = initializer {
            self.set_parent(initializer, identifier);
        }
        identifier
    }

    pub fn make_identifier_reference(
        &mut self,
        parent_scope: Option<ElementId>,
        symbol: QualifiedSymbol,
        identifier: Option<ElementId>,
    ) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::IdentifierReference(IdentifierReferenceData { symbol, identifier }),
        )
    }

    pub fn make_type_reference(
        &mut self,
        parent_scope: Option<ElementId>,
        symbol: QualifiedSymbol,
        referenced_type: Option<ElementId>,
    ) -> ElementId {
        if let Some(type_id) = referenced_type {
            self.track_used_type(type_id);
        }
        self.new_element(
            parent_scope,
            ElementData::TypeReference(TypeReferenceData {
                symbol,
                referenced_type,
            }),
        )
    }

    pub fn make_initializer(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: Option<ElementId>,
    ) -> ElementId {
        let initializer = self.new_element(
            parent_scope,
            ElementData::Initializer(InitializerData { expression }),
        );
        if let Some(expression) = expression {
            self.set_parent(expression, initializer);
        }
        initializer
    }

    pub fn make_declaration(
        &mut self,
        parent_scope: Option<ElementId>,
        identifier: ElementId,
        assignment: Option<ElementId>,
    ) -> ElementId {
        let declaration = self.new_element(
            parent_scope,
            ElementData::Declaration(DeclarationData {
                identifier,
                assignment,
            }),
        );
        if let Some(assignment) = assignment {
            self.set_parent(assignment, declaration);
        }
        declaration
    }

    pub fn make_assignment(
        &mut self,
        parent_scope: Option<ElementId>,
        expressions: Vec<ElementId>,
    ) -> ElementId {
        let assignment = self.new_element(
            parent_scope,
            ElementData::Assignment(AssignmentData {
                expressions: expressions.clone(),
            }),
        );
        for expression in expressions {
            self.set_parent(expression, assignment);
        }
        assignment
    }

    // ------------------------------------------------------------------
    // literals

    pub fn make_integer(&mut self, parent_scope: Option<ElementId>, value: u64) -> ElementId {
        self.new_element(parent_scope, ElementData::IntegerLiteral { value })
    }

    pub fn make_float(&mut self, parent_scope: Option<ElementId>, value: f64) -> ElementId {
        self.new_element(parent_scope, ElementData::FloatLiteral { value })
    }

    pub fn make_bool(&mut self, parent_scope: Option<ElementId>, value: bool) -> ElementId {
        self.new_element(parent_scope, ElementData::BooleanLiteral { value })
    }

    pub fn make_string(&mut self, parent_scope: Option<ElementId>, value: &str) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::StringLiteral {
                value: value.to_string(),
            },
        )
    }

    pub fn make_character(&mut self, parent_scope: Option<ElementId>, rune: char) -> ElementId {
        self.new_element(parent_scope, ElementData::CharacterLiteral { rune })
    }

    pub fn make_nil(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        self.new_element(parent_scope, ElementData::NilLiteral)
    }

    pub fn make_uninitialized(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        self.new_element(parent_scope, ElementData::UninitializedLiteral)
    }

    // ------------------------------------------------------------------
    // operators

    pub fn make_unary_operator(
        &mut self,
        parent_scope: Option<ElementId>,
        op: OperatorKind,
        rhs: ElementId,
    ) -> ElementId {
        let operator =
            self.new_element(parent_scope, ElementData::UnaryOperator(UnaryOperatorData { op, rhs }));
        self.set_parent(rhs, operator);
        operator
    }

    pub fn make_binary_operator(
        &mut self,
        parent_scope: Option<ElementId>,
        op: OperatorKind,
        lhs: ElementId,
        rhs: ElementId,
    ) -> ElementId {
        let operator = self.new_element(
            parent_scope,
            ElementData::BinaryOperator(BinaryOperatorData { op, lhs, rhs }),
        );
        self.set_parent(lhs, operator);
        self.set_parent(rhs, operator);
        operator
    }

    pub fn make_spread_operator(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: Option<ElementId>,
    ) -> ElementId {
        let spread = self.new_element(
            parent_scope,
            ElementData::SpreadOperator(SpreadOperatorData { expression }),
        );
        if let Some(expression) = expression {
            self.set_parent(expression, spread);
        }
        spread
    }

    // ------------------------------------------------------------------
    // labels, attributes, comments

    pub fn make_label(&mut self, parent_scope: Option<ElementId>, name: &str) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::Label(LabelData {
                name: name.to_string(),
            }),
        )
    }

    pub fn make_label_reference(
        &mut self,
        parent_scope: Option<ElementId>,
        name: &str,
    ) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::LabelReference(LabelReferenceData {
                name: name.to_string(),
                label: None,
            }),
        )
    }

    pub fn make_assembly_label(&mut self, parent_scope: Option<ElementId>, name: &str) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::AssemblyLabel(AssemblyLabelData {
                name: name.to_string(),
            }),
        )
    }

    pub fn make_attribute(
        &mut self,
        parent_scope: Option<ElementId>,
        name: &str,
        expression: Option<ElementId>,
    ) -> ElementId {
        let attribute = self.new_element(
            parent_scope,
            ElementData::Attribute(AttributeData {
                name: name.to_string(),
                expression,
            }),
        );
        if let Some(expression) = expression {
            self.set_parent(expression, attribute);
        }
        attribute
    }

    pub fn make_comment(
        &mut self,
        parent_scope: Option<ElementId>,
        kind: CommentKind,
        value: &str,
    ) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::Comment(CommentData {
                kind,
                value: value.to_string(),
            }),
        )
    }

    pub fn make_raw_block(&mut self, parent_scope: Option<ElementId>, value: &str) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::RawBlock(crate::elements::RawBlockData {
                value: value.to_string(),
            }),
        )
    }

    // ------------------------------------------------------------------
    // calls

    pub fn make_argument_list(
        &mut self,
        parent_scope: Option<ElementId>,
        elements: Vec<ElementId>,
    ) -> ElementId {
        let list = self.new_element(
            parent_scope,
            ElementData::ArgumentList(ArgumentListData {
                elements: elements.clone(),
                argument_index: Default::default(),
            }),
        );
        for element in elements {
            self.set_parent(element, list);
        }
        list
    }

    pub fn make_procedure_call(
        &mut self,
        parent_scope: Option<ElementId>,
        arguments: ElementId,
        references: Vec<ElementId>,
        type_parameters: Vec<ElementId>,
    ) -> ElementId {
        let call = self.new_element(
            parent_scope,
            ElementData::ProcedureCall(ProcedureCallData {
                arguments,
                type_parameters: type_parameters.clone(),
                references: references.clone(),
                resolved_proc_type: None,
                resolved_identifier_ref: None,
            }),
        );
        self.set_parent(arguments, call);
        for reference in references {
            self.set_parent(reference, call);
        }
        for parameter in type_parameters {
            self.set_parent(parameter, call);
        }
        call
    }

    pub fn make_intrinsic(
        &mut self,
        parent_scope: Option<ElementId>,
        kind: IntrinsicKind,
        arguments: ElementId,
        proc_type: ElementId,
    ) -> ElementId {
        let intrinsic = self.new_element(
            parent_scope,
            ElementData::Intrinsic(IntrinsicData {
                kind,
                arguments,
                proc_type,
                type_parameters: Vec::new(),
            }),
        );
        self.set_parent(arguments, intrinsic);
        intrinsic
    }

    pub fn make_procedure_instance(
        &mut self,
        parent_scope: Option<ElementId>,
        proc_type: ElementId,
        scope: Option<ElementId>,
    ) -> ElementId {
        let instance = self.new_element(
            parent_scope,
            ElementData::ProcedureInstance(ProcedureInstanceData { proc_type, scope }),
        );
        if let Some(ElementData::ProcedureType(data)) =
            self.elements.get_mut(proc_type).map(|e| &mut e.data)
        {
            data.instances.push(instance);
        }
        self.set_parent(instance, proc_type);
        instance
    }

    pub fn make_directive(
        &mut self,
        parent_scope: Option<ElementId>,
        kind: DirectiveKind,
        lhs: Option<ElementId>,
        rhs: Option<ElementId>,
        body: Option<ElementId>,
        expression: Option<ElementId>,
    ) -> ElementId {
        let directive = self.new_element(
            parent_scope,
            ElementData::Directive(DirectiveData {
                kind,
                lhs,
                rhs,
                body,
                true_body: None,
                expression,
            }),
        );
        for child in [lhs, rhs, body, expression].into_iter().flatten() {
            self.set_parent(child, directive);
        }
        directive
    }

    // ------------------------------------------------------------------
    // control flow

    pub fn make_expression_group(
        &mut self,
        parent_scope: Option<ElementId>,
        root: ElementId,
    ) -> ElementId {
        let group =
            self.new_element(parent_scope, ElementData::Expression(ExpressionData { root }));
        self.set_parent(root, group);
        group
    }

    pub fn make_if(
        &mut self,
        parent_scope: Option<ElementId>,
        predicate: ElementId,
        true_branch: ElementId,
        false_branch: Option<ElementId>,
    ) -> ElementId {
        let element = self.new_element(
            parent_scope,
            ElementData::If(IfData {
                predicate,
                true_branch,
                false_branch,
            }),
        );
        self.set_parent(predicate, element);
        self.set_parent(true_branch, element);
        if let Some(false_branch) = false_branch {
            self.set_parent(false_branch, element);
        }
        element
    }

    pub fn make_while(
        &mut self,
        parent_scope: Option<ElementId>,
        predicate: ElementId,
        body: ElementId,
    ) -> ElementId {
        let element =
            self.new_element(parent_scope, ElementData::While(WhileData { predicate, body }));
        self.set_parent(predicate, element);
        self.set_parent(body, element);
        element
    }

    pub fn make_for(
        &mut self,
        parent_scope: Option<ElementId>,
        induction_decl: ElementId,
        expression: ElementId,
        body: ElementId,
    ) -> ElementId {
        let element = self.new_element(
            parent_scope,
            ElementData::For(ForData {
                induction_decl,
                expression,
                body,
            }),
        );
        self.set_parent(induction_decl, element);
        self.set_parent(expression, element);
        self.set_parent(body, element);
        element
    }

    pub fn make_break(
        &mut self,
        parent_scope: Option<ElementId>,
        label: Option<ElementId>,
    ) -> ElementId {
        let element = self.new_element(parent_scope, ElementData::Break(BreakData { label }));
        if let Some(label) = label {
            self.set_parent(label, element);
        }
        element
    }

    pub fn make_continue(
        &mut self,
        parent_scope: Option<ElementId>,
        label: Option<ElementId>,
    ) -> ElementId {
        let element = self.new_element(parent_scope, ElementData::Continue(ContinueData { label }));
        if let Some(label) = label {
            self.set_parent(label, element);
        }
        element
    }

    pub fn make_return(
        &mut self,
        parent_scope: Option<ElementId>,
        expressions: Vec<ElementId>,
    ) -> ElementId {
        let element = self.new_element(
            parent_scope,
            ElementData::Return(ReturnData {
                expressions: expressions.clone(),
            }),
        );
        for expression in expressions {
            self.set_parent(expression, element);
        }
        element
    }

    pub fn make_switch(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: ElementId,
        scope: ElementId,
    ) -> ElementId {
        let element =
            self.new_element(parent_scope, ElementData::Switch(SwitchData { expression, scope }));
        self.set_parent(expression, element);
        self.set_parent(scope, element);
        element
    }

    pub fn make_case(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: Option<ElementId>,
        scope: ElementId,
    ) -> ElementId {
        let element =
            self.new_element(parent_scope, ElementData::Case(CaseData { expression, scope }));
        if let Some(expression) = expression {
            self.set_parent(expression, element);
        }
        self.set_parent(scope, element);
        element
    }

    pub fn make_fallthrough(
        &mut self,
        parent_scope: Option<ElementId>,
        label: Option<ElementId>,
    ) -> ElementId {
        let element =
            self.new_element(parent_scope, ElementData::Fallthrough(FallthroughData { label }));
        if let Some(label) = label {
            self.set_parent(label, element);
        }
        element
    }

    pub fn make_defer(&mut self, parent_scope: Option<ElementId>, expression: ElementId) -> ElementId {
        let element = self.new_element(parent_scope, ElementData::Defer(DeferData { expression }));
        self.set_parent(expression, element);
        element
    }

    pub fn make_with(
        &mut self,
        parent_scope: Option<ElementId>,
        expression: ElementId,
        body: ElementId,
    ) -> ElementId {
        let element =
            self.new_element(parent_scope, ElementData::With(WithData { expression, body }));
        self.set_parent(expression, element);
        self.set_parent(body, element);
        element
    }

    pub fn make_namespace(
        &mut self,
        parent_scope: Option<ElementId>,
        symbol: Option<ElementId>,
        scope: ElementId,
    ) -> ElementId {
        let element =
            self.new_element(parent_scope, ElementData::Namespace(NamespaceData { symbol, scope }));
        if let Some(symbol) = symbol {
            self.set_parent(symbol, element);
        }
        self.set_parent(scope, element);
        element
    }

    pub fn make_cast(
        &mut self,
        parent_scope: Option<ElementId>,
        type_ref: ElementId,
        expression: ElementId,
    ) -> ElementId {
        let element = self.new_element(
            parent_scope,
            ElementData::Cast(CastData {
                type_ref,
                expression,
            }),
        );
        self.set_parent(type_ref, element);
        self.set_parent(expression, element);
        element
    }

    pub fn make_transmute(
        &mut self,
        parent_scope: Option<ElementId>,
        type_ref: ElementId,
        expression: ElementId,
    ) -> ElementId {
        let element = self.new_element(
            parent_scope,
            ElementData::Transmute(CastData {
                type_ref,
                expression,
            }),
        );
        self.set_parent(type_ref, element);
        self.set_parent(expression, element);
        element
    }

    pub fn make_field(
        &mut self,
        parent_scope: Option<ElementId>,
        identifier: ElementId,
        offset: u64,
    ) -> ElementId {
        self.new_element(parent_scope, ElementData::Field(FieldData { identifier, offset }))
    }

    // ------------------------------------------------------------------
    // types

    pub fn make_numeric_type(
        &mut self,
        parent_scope: Option<ElementId>,
        name: &str,
        min: i64,
        max: u64,
        is_signed: bool,
        number_class: NumberClass,
        size_in_bytes: usize,
    ) -> ElementId {
        let symbol = self.make_symbol(parent_scope, name, Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::NumericType(NumericTypeData {
                header: TypeHeader {
                    symbol: Some(symbol),
                    alignment: size_in_bytes.max(1),
                    size_in_bytes,
                },
                min,
                max,
                is_signed,
                number_class,
            }),
        );
        self.set_parent(symbol, type_id);
        type_id
    }

    /// The zero-sized unit type. Pointers to it accept any pointer.
    pub fn make_void_type(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        self.make_numeric_type(parent_scope, "void", 0, 0, false, NumberClass::None, 0)
    }

    pub fn make_bool_type(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        let symbol = self.make_symbol(parent_scope, "bool", Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::BoolType(TypeHeader {
                symbol: Some(symbol),
                alignment: 1,
                size_in_bytes: 1,
            }),
        );
        self.set_parent(symbol, type_id);
        type_id
    }

    pub fn make_rune_type(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        let symbol = self.make_symbol(parent_scope, "rune", Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::RuneType(TypeHeader {
                symbol: Some(symbol),
                alignment: 4,
                size_in_bytes: 4,
            }),
        );
        self.set_parent(symbol, type_id);
        type_id
    }

    pub fn make_namespace_type(&mut self, parent_scope: Option<ElementId>) -> ElementId {
        let symbol = self.make_symbol(parent_scope, "namespace", Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::NamespaceType(TypeHeader {
                symbol: Some(symbol),
                alignment: 0,
                size_in_bytes: 0,
            }),
        );
        self.set_parent(symbol, type_id);
        type_id
    }

    pub fn make_module_type(
        &mut self,
        parent_scope: Option<ElementId>,
        scope: ElementId,
    ) -> ElementId {
        let symbol = self.make_symbol(parent_scope, "module", Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::ModuleType(ModuleTypeData {
                header: TypeHeader {
                    symbol: Some(symbol),
                    alignment: 0,
                    size_in_bytes: 0,
                },
                scope,
            }),
        );
        self.set_parent(symbol, type_id);
        self.set_parent(scope, type_id);
        type_id
    }

    pub fn make_tuple_type(
        &mut self,
        parent_scope: Option<ElementId>,
        scope: ElementId,
    ) -> ElementId {
        let symbol = self.make_symbol(parent_scope, "tuple", Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::TupleType(TupleTypeData {
                header: TypeHeader {
                    symbol: Some(symbol),
                    alignment: 8,
                    size_in_bytes: 0,
                },
                scope,
            }),
        );
        self.set_parent(symbol, type_id);
        self.set_parent(scope, type_id);
        type_id
    }

    pub fn make_generic_type(
        &mut self,
        parent_scope: Option<ElementId>,
        constraints: Vec<ElementId>,
    ) -> ElementId {
        let symbol = self.make_symbol(parent_scope, "any", Vec::new());
        let type_id = self.new_element(
            parent_scope,
            ElementData::GenericType(GenericTypeData {
                header: TypeHeader {
                    symbol: Some(symbol),
                    alignment: 0,
                    size_in_bytes: 0,
                },
                constraints: constraints.clone(),
            }),
        );
        self.set_parent(symbol, type_id);
        for constraint in constraints {
            self.set_parent(constraint, type_id);
        }
        type_id
    }

    /// A placeholder for a type the evaluator could not resolve. The
    /// embedded expression, when present, is the inference source; it is
    /// owned elsewhere.
    pub fn make_unknown_type(
        &mut self,
        parent_scope: Option<ElementId>,
        symbol: QualifiedSymbol,
        expression: Option<ElementId>,
    ) -> ElementId {
        self.new_element(
            parent_scope,
            ElementData::UnknownType(UnknownTypeData {
                header: TypeHeader::default(),
                symbol,
                expression,
            }),
        )
    }

    /// Pointer types are interned by their synthesized name; building the
    /// same pointer twice in one scope chain returns the existing type.
    pub fn make_pointer_type(
        &mut self,
        parent_scope: Option<ElementId>,
        base_type_ref: ElementId,
    ) -> ElementId {
        let base = types::referenced_type(&self.elements, base_type_ref);
        let base_name = base.map(|b| types::symbol_name(&self.elements, b));
        if let Some(base_name) = &base_name {
            if !base_name.is_empty() {
                let interned_name = types::name_for_pointer(base_name);
                let symbol = QualifiedSymbol::new(interned_name);
                if let Some(existing) =
                    self.scopes.find_type(&self.elements, &symbol, parent_scope)
                {
                    return existing;
                }
            }
        }
        let symbol = base_name
            .filter(|name| !name.is_empty())
            .map(|name| self.make_symbol(parent_scope, &types::name_for_pointer(&name), Vec::new()));
        let type_id = self.new_element(
            parent_scope,
            ElementData::PointerType(PointerTypeData {
                header: TypeHeader {
                    symbol,
                    alignment: 8,
                    size_in_bytes: 8,
                },
                base_type_ref,
            }),
        );
        if let Some(symbol) = symbol {
            self.set_parent(symbol, type_id);
        }
        self.set_parent(base_type_ref, type_id);
        if symbol.is_some() {
            if let Some(scope) = parent_scope.or_else(|| self.scopes.current_scope()) {
                self.add_type_to_block(scope, type_id);
            }
        }
        type_id
    }

    /// Convenience over `make_pointer_type` for a known base type.
    pub fn make_pointer_type_to(
        &mut self,
        parent_scope: Option<ElementId>,
        base_type: ElementId,
    ) -> ElementId {
        let base_name = types::symbol_name(&self.elements, base_type);
        let interned_name = types::name_for_pointer(&base_name);
        let symbol = QualifiedSymbol::new(interned_name);
        if let Some(existing) = self.scopes.find_type(&self.elements, &symbol, parent_scope) {
            return existing;
        }
        let base_ref = self.make_type_reference(
            parent_scope,
            QualifiedSymbol::new(base_name),
            Some(base_type),
        );
        self.make_pointer_type(parent_scope, base_ref)
    }

    pub fn make_array_type(
        &mut self,
        parent_scope: Option<ElementId>,
        scope: ElementId,
        base_type_ref: ElementId,
        subscripts: Vec<ElementId>,
    ) -> ElementId {
        let base = types::referenced_type(&self.elements, base_type_ref);
        let base_name = base
            .map(|b| types::symbol_name(&self.elements, b))
            .unwrap_or_default();
        let sizes: Vec<u64> = subscripts
            .iter()
            .filter_map(|&s| match self.elements.get(s).map(|e| &e.data) {
                Some(ElementData::IntegerLiteral { value }) => Some(*value),
                _ => None,
            })
            .collect();
        let (base_size, base_align) = base
            .and_then(|b| self.elements.get(b))
            .and_then(|e| e.type_header())
            .map(|h| (h.size_in_bytes, h.alignment))
            .unwrap_or((0, 1));
        let total: u64 = sizes.iter().product::<u64>().max(1);
        let symbol = if base_name.is_empty() {
            None
        } else {
            let interned_name = types::name_for_array(&base_name, &sizes);
            let lookup = QualifiedSymbol::new(interned_name.clone());
            if let Some(existing) = self.scopes.find_type(&self.elements, &lookup, parent_scope) {
                return existing;
            }
            Some(self.make_symbol(parent_scope, &interned_name, Vec::new()))
        };
        let type_id = self.new_element(
            parent_scope,
            ElementData::ArrayType(ArrayTypeData {
                header: TypeHeader {
                    symbol,
                    alignment: base_align.max(1),
                    size_in_bytes: base_size * total as usize,
                },
                scope,
                base_type_ref,
                subscripts: subscripts.clone(),
            }),
        );
        if let Some(symbol) = symbol {
            self.set_parent(symbol, type_id);
        }
        self.set_parent(scope, type_id);
        self.set_parent(base_type_ref, type_id);
        for subscript in subscripts {
            self.set_parent(subscript, type_id);
        }
        if symbol.is_some() {
            if let Some(scope) = parent_scope.or_else(|| self.scopes.current_scope()) {
                self.add_type_to_block(scope, type_id);
            }
        }
        type_id
    }

    pub fn make_composite_type(
        &mut self,
        parent_scope: Option<ElementId>,
        kind: CompositeKind,
        scope: ElementId,
        symbol: Option<ElementId>,
    ) -> ElementId {
        let type_id = self.new_element(
            parent_scope,
            ElementData::CompositeType(CompositeTypeData {
                header: TypeHeader {
                    symbol,
                    alignment: 8,
                    size_in_bytes: 0,
                },
                kind,
                scope,
                fields: IndexMap::new(),
            }),
        );
        if let Some(symbol) = symbol {
            self.set_parent(symbol, type_id);
        }
        self.set_parent(scope, type_id);
        type_id
    }

    pub fn make_procedure_type(
        &mut self,
        parent_scope: Option<ElementId>,
        scope: ElementId,
        parameters: Vec<ElementId>,
        return_type: Option<ElementId>,
        body: Option<ElementId>,
        variadic: bool,
    ) -> ElementId {
        let type_id = self.new_element(
            parent_scope,
            ElementData::ProcedureType(ProcedureTypeData {
                header: TypeHeader {
                    symbol: None,
                    alignment: 8,
                    size_in_bytes: 8,
                },
                scope,
                parameters,
                return_type,
                body,
                variadic,
                is_foreign: false,
                is_intrinsic: false,
                instances: Vec::new(),
                label: None,
            }),
        );
        self.set_parent(scope, type_id);
        if let Some(return_type) = return_type {
            self.set_parent(return_type, type_id);
        }
        if let Some(body) = body {
            self.set_parent(body, type_id);
        }
        type_id
    }

    /// The procedure type backing a reserved intrinsic name: generic
    /// parameters, an intrinsic flag, and the fixed return type.
    pub(crate) fn make_intrinsic_proc_type(
        &mut self,
        parent_scope: Option<ElementId>,
        kind: IntrinsicKind,
    ) -> ElementId {
        let scope = self.make_block(parent_scope);
        let any = self
            .scopes
            .find_type(&self.elements, &QualifiedSymbol::new("any"), parent_scope);
        let mut parameters = Vec::new();
        for position in 0..kind.arity() {
            let name = match (kind, position) {
                (IntrinsicKind::Range, 0) => "start",
                (IntrinsicKind::Range, 1) => "stop",
                (IntrinsicKind::Alloc, _) => "size",
                (IntrinsicKind::Free, _) => "address",
                _ => "expr",
            };
            let symbol = self.make_symbol(Some(scope), name, Vec::new());
            let type_ref =
                self.make_type_reference(Some(scope), QualifiedSymbol::new("any"), any);
            let parameter = self.make_identifier(Some(scope), symbol, Some(type_ref), None, false);
            self.add_identifier_to_scope(scope, parameter);
            parameters.push(parameter);
        }
        let return_type_name = match kind {
            IntrinsicKind::SizeOf | IntrinsicKind::AlignOf | IntrinsicKind::LengthOf => {
                Some("u32")
            }
            IntrinsicKind::Alloc => Some("u64"),
            IntrinsicKind::Range => Some("tuple"),
            IntrinsicKind::AddressOf | IntrinsicKind::TypeOf | IntrinsicKind::Free => None,
        };
        let return_type = return_type_name.map(|name| {
            let symbol = QualifiedSymbol::new(name);
            let found = self.scopes.find_type(&self.elements, &symbol, parent_scope);
            self.make_type_reference(parent_scope, symbol, found)
        });
        let proc_type =
            self.make_procedure_type(parent_scope, scope, parameters, return_type, None, false);
        if let Some(ElementData::ProcedureType(data)) =
            self.elements.get_mut(proc_type).map(|e| &mut e.data)
        {
            data.is_intrinsic = true;
            data.label = Some(format!("_intrinsic_{}", kind.name()));
        }
        proc_type
    }
}
