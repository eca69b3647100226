//! Visitor-polymorphic behavior over the element graph.
//!
//! Rather than virtual methods, behavior that varies by variant lives
//! here as matches with defaults: type inference, constant folding, fold
//! splicing, constancy, and the literal accessors. Everything operates
//! through ids so mutation stays inside the registry.

use crate::elements::{types, ElementData, ElementId, OperatorKind};
use crate::intrinsics::IntrinsicKind;
use crate::session::Session;
use alpha_common::numeric::{narrow_to_float, narrow_to_integer};
use alpha_common::QualifiedSymbol;

/// Result of a successful inference: the type, plus a reference element
/// resolution passes can patch into a declaration.
#[derive(Clone, Copy, Debug)]
pub struct InferredType {
    pub type_id: ElementId,
    pub reference: ElementId,
}

/// A fold replacement: the new element that stands in for the folded one.
#[derive(Clone, Copy, Debug)]
pub struct FoldResult {
    pub element: ElementId,
}

impl Session {
    // ------------------------------------------------------------------
    // inference

    /// Infer the type of `id` without allocating a reference.
    ///
    /// Self-referential declarations would recurse through their own
    /// initializer; the in-progress guard breaks the cycle, and the
    /// resolution pass reports the identifier as unresolvable.
    pub fn infer_type_of(&mut self, id: ElementId) -> Option<ElementId> {
        if !self.infer_guard_enter(id) {
            return None;
        }
        let result = self.infer_type_of_inner(id);
        self.infer_guard_exit(id);
        result
    }

    fn infer_type_of_inner(&mut self, id: ElementId) -> Option<ElementId> {
        // A type-valued expression (a procedure literal, a composite
        // body) is its own type; placeholders stay uninferrable.
        {
            let element = self.elements.get(id)?;
            if element.is_type() {
                return match element.data {
                    ElementData::UnknownType(_) => None,
                    _ => Some(id),
                };
            }
        }
        let data = self.elements.get(id)?.data.clone();
        let scope = self.elements.get(id).and_then(|e| e.parent_scope);
        match data {
            ElementData::IntegerLiteral { value } => {
                let name = narrow_to_integer(value)?;
                self.find_core_type(name, scope)
            }
            ElementData::FloatLiteral { value } => {
                self.find_core_type(narrow_to_float(value), scope)
            }
            ElementData::BooleanLiteral { .. } => self.find_core_type("bool", scope),
            ElementData::CharacterLiteral { .. } => self.find_core_type("rune", scope),
            ElementData::StringLiteral { .. } => {
                let u8_type = self.find_core_type("u8", scope)?;
                Some(self.make_pointer_type_to(scope, u8_type))
            }
            ElementData::NilLiteral => {
                let void = self.find_core_type("void", scope)?;
                Some(self.make_pointer_type_to(scope, void))
            }
            ElementData::Identifier(data) => data
                .type_ref
                .and_then(|r| types::referenced_type(&self.elements, r))
                .filter(|&t| !types::is_unknown_type(&self.elements, t)),
            ElementData::IdentifierReference(data) => {
                let identifier = data.identifier?;
                self.infer_type_of(identifier)
            }
            ElementData::UnaryOperator(data) => self.infer_unary(data.op, data.rhs),
            ElementData::BinaryOperator(data) => {
                if data.op.is_relational() {
                    self.find_core_type("bool", scope)
                } else if data.op == OperatorKind::MemberAccess {
                    self.infer_type_of(data.rhs)
                } else if data.op == OperatorKind::Subscript {
                    let array = self.infer_type_of(data.lhs)?;
                    match &self.elements.get(array)?.data {
                        ElementData::ArrayType(array_data) => {
                            types::referenced_type(&self.elements, array_data.base_type_ref)
                        }
                        _ => None,
                    }
                } else {
                    self.infer_type_of(data.lhs)
                        .or_else(|| self.infer_type_of(data.rhs))
                }
            }
            ElementData::ProcedureCall(data) => {
                let proc_type = data.resolved_proc_type.or_else(|| {
                    data.references.iter().find_map(|&reference| {
                        let identifier = match self.elements.get(reference).map(|e| &e.data) {
                            Some(ElementData::IdentifierReference(r)) => r.identifier,
                            _ => None,
                        }?;
                        self.identifier_type(identifier)
                    })
                })?;
                self.proc_return_type(proc_type)
            }
            ElementData::Intrinsic(data) => self.infer_intrinsic(data.kind, data.arguments, scope),
            ElementData::Cast(data) | ElementData::Transmute(data) => {
                types::referenced_type(&self.elements, data.type_ref)
            }
            ElementData::Expression(data) => self.infer_type_of(data.root),
            ElementData::Initializer(data) => {
                let expression = data.expression?;
                self.infer_type_of(expression)
            }
            ElementData::TypeReference(data) => data.referenced_type,
            ElementData::TypeLiteral(data) => {
                data.type_ref
                    .and_then(|r| types::referenced_type(&self.elements, r))
            }
            ElementData::Directive(data) => {
                let expression = data.expression?;
                self.infer_type_of(expression)
            }
            ElementData::Declaration(data) => self.identifier_type(data.identifier),
            ElementData::Namespace(_) => self.find_core_type("namespace", scope),
            _ => None,
        }
    }

    /// Infer and wrap the result in a fresh type reference, so callers
    /// can patch a declaration in one step.
    pub fn infer_with_reference(&mut self, id: ElementId) -> Option<InferredType> {
        let type_id = self.infer_type_of(id)?;
        let scope = self.elements.get(id).and_then(|e| e.parent_scope);
        let name = types::symbol_name(&self.elements, type_id);
        let reference =
            self.make_type_reference(scope, QualifiedSymbol::new(name), Some(type_id));
        Some(InferredType { type_id, reference })
    }

    fn find_core_type(&self, name: &str, scope: Option<ElementId>) -> Option<ElementId> {
        self.scopes
            .find_type(&self.elements, &QualifiedSymbol::new(name), scope)
    }

    fn infer_unary(&mut self, op: OperatorKind, rhs: ElementId) -> Option<ElementId> {
        let scope = self.elements.get(rhs).and_then(|e| e.parent_scope);
        match op {
            OperatorKind::LogicalNot => self.find_core_type("bool", scope),
            OperatorKind::BinaryNot => self.infer_type_of(rhs),
            OperatorKind::Negate => {
                if let Some(value) = self.as_integer(rhs) {
                    let negated = (value as i64).wrapping_neg() as u64;
                    let name = narrow_to_integer(negated)?;
                    self.find_core_type(name, scope)
                } else if let Some(value) = self.as_float(rhs) {
                    self.find_core_type(narrow_to_float(-value), scope)
                } else {
                    self.infer_type_of(rhs)
                }
            }
            OperatorKind::PointerDereference => {
                let pointer = self.infer_type_of(rhs)?;
                match &self.elements.get(pointer)?.data {
                    ElementData::PointerType(data) => {
                        types::referenced_type(&self.elements, data.base_type_ref)
                    }
                    _ => None,
                }
            }
            _ => None,
        }
    }

    fn infer_intrinsic(
        &mut self,
        kind: IntrinsicKind,
        arguments: ElementId,
        scope: Option<ElementId>,
    ) -> Option<ElementId> {
        match kind {
            IntrinsicKind::SizeOf | IntrinsicKind::AlignOf | IntrinsicKind::LengthOf => {
                self.find_core_type("u32", scope)
            }
            IntrinsicKind::Alloc => self.find_core_type("u64", scope),
            IntrinsicKind::Range => self.find_core_type("tuple", scope),
            IntrinsicKind::AddressOf => {
                let argument = self.first_argument(arguments)?;
                let base = self.infer_type_of(argument)?;
                Some(self.make_pointer_type_to(scope, base))
            }
            IntrinsicKind::TypeOf | IntrinsicKind::Free => None,
        }
    }

    pub(crate) fn first_argument(&self, arguments: ElementId) -> Option<ElementId> {
        match self.elements.get(arguments).map(|e| &e.data) {
            Some(ElementData::ArgumentList(list)) => list.elements.first().copied(),
            _ => None,
        }
    }

    fn proc_return_type(&self, proc_type: ElementId) -> Option<ElementId> {
        match self.elements.get(proc_type).map(|e| &e.data) {
            Some(ElementData::ProcedureType(data)) => data
                .return_type
                .and_then(|r| types::referenced_type(&self.elements, r)),
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // constancy & literal accessors

    pub fn is_constant(&self, id: ElementId) -> bool {
        let Some(element) = self.elements.get(id) else {
            return false;
        };
        match &element.data {
            ElementData::IntegerLiteral { .. }
            | ElementData::FloatLiteral { .. }
            | ElementData::BooleanLiteral { .. }
            | ElementData::StringLiteral { .. }
            | ElementData::CharacterLiteral { .. }
            | ElementData::NilLiteral
            | ElementData::Symbol(_) => true,
            ElementData::Identifier(data) => data.constant,
            ElementData::IdentifierReference(data) => data
                .identifier
                .map(|identifier| self.is_constant(identifier))
                .unwrap_or(false),
            ElementData::UnaryOperator(data) => self.is_constant(data.rhs),
            ElementData::BinaryOperator(data) => {
                !matches!(
                    data.op,
                    OperatorKind::Assignment | OperatorKind::MemberAccess
                ) && self.is_constant(data.lhs)
                    && self.is_constant(data.rhs)
            }
            ElementData::Expression(data) => self.is_constant(data.root),
            ElementData::Intrinsic(data) => data.kind.can_fold(),
            _ => false,
        }
    }

    pub fn as_integer(&self, id: ElementId) -> Option<u64> {
        match &self.elements.get(id)?.data {
            ElementData::IntegerLiteral { value } => Some(*value),
            ElementData::CharacterLiteral { rune } => Some(*rune as u64),
            ElementData::Identifier(data) => {
                if !data.constant {
                    return None;
                }
                let initializer = data.initializer?;
                self.as_integer(initializer)
            }
            ElementData::Initializer(data) => {
                let expression = data.expression?;
                self.as_integer(expression)
            }
            ElementData::IdentifierReference(data) => {
                let identifier = data.identifier?;
                self.as_integer(identifier)
            }
            ElementData::Expression(data) => self.as_integer(data.root),
            _ => None,
        }
    }

    pub fn as_float(&self, id: ElementId) -> Option<f64> {
        match &self.elements.get(id)?.data {
            ElementData::FloatLiteral { value } => Some(*value),
            ElementData::Identifier(data) => {
                if !data.constant {
                    return None;
                }
                let initializer = data.initializer?;
                self.as_float(initializer)
            }
            ElementData::Initializer(data) => {
                let expression = data.expression?;
                self.as_float(expression)
            }
            ElementData::IdentifierReference(data) => {
                let identifier = data.identifier?;
                self.as_float(identifier)
            }
            ElementData::Expression(data) => self.as_float(data.root),
            _ => None,
        }
    }

    pub fn as_bool(&self, id: ElementId) -> Option<bool> {
        match &self.elements.get(id)?.data {
            ElementData::BooleanLiteral { value } => Some(*value),
            ElementData::Identifier(data) => {
                let initializer = data.initializer?;
                self.as_bool(initializer)
            }
            ElementData::Initializer(data) => {
                let expression = data.expression?;
                self.as_bool(expression)
            }
            ElementData::IdentifierReference(data) => {
                let identifier = data.identifier?;
                self.as_bool(identifier)
            }
            ElementData::Expression(data) => self.as_bool(data.root),
            _ => None,
        }
    }

    pub fn as_string(&self, id: ElementId) -> Option<String> {
        match &self.elements.get(id)?.data {
            ElementData::StringLiteral { value } => Some(value.clone()),
            ElementData::Symbol(data) => Some(data.fully_qualified.clone()),
            ElementData::IdentifierReference(data) => {
                let identifier = data.identifier?;
                self.as_string(identifier)
            }
            ElementData::Identifier(data) => {
                let initializer = data.initializer?;
                self.as_string(initializer)
            }
            ElementData::Initializer(data) => {
                let expression = data.expression?;
                self.as_string(expression)
            }
            _ => None,
        }
    }

    pub fn as_rune(&self, id: ElementId) -> Option<char> {
        match &self.elements.get(id)?.data {
            ElementData::CharacterLiteral { rune } => Some(*rune),
            ElementData::IdentifierReference(data) => {
                let identifier = data.identifier?;
                self.as_rune(identifier)
            }
            ElementData::Identifier(data) => {
                let initializer = data.initializer?;
                self.as_rune(initializer)
            }
            ElementData::Initializer(data) => {
                let expression = data.expression?;
                self.as_rune(expression)
            }
            _ => None,
        }
    }

    // ------------------------------------------------------------------
    // folding

    /// Fold `id` to a fresh literal element, when its value is known at
    /// compile time. `None` means "no fold", not failure.
    pub fn fold_element(&mut self, id: ElementId) -> Option<FoldResult> {
        self.fold_element_inner(id)
            .map(|element| FoldResult { element })
    }

    fn fold_element_inner(&mut self, id: ElementId) -> Option<ElementId> {
        let data = self.elements.get(id)?.data.clone();
        let scope = self.elements.get(id).and_then(|e| e.parent_scope);
        match data {
            ElementData::Intrinsic(data) => self.fold_intrinsic(id, data.kind, data.arguments),
            ElementData::IdentifierReference(reference) => {
                let identifier = reference.identifier?;
                if !self.is_constant(identifier) {
                    return None;
                }
                if let Some(value) = self.as_integer(identifier) {
                    Some(self.make_integer(scope, value))
                } else if let Some(value) = self.as_float(identifier) {
                    Some(self.make_float(scope, value))
                } else if let Some(value) = self.as_bool(identifier) {
                    Some(self.make_bool(scope, value))
                } else if let Some(value) = self.as_rune(identifier) {
                    Some(self.make_character(scope, value))
                } else {
                    self.as_string(identifier)
                        .map(|value| self.make_string(scope, &value))
                }
            }
            ElementData::UnaryOperator(op) => self.fold_unary(scope, op.op, op.rhs),
            ElementData::BinaryOperator(op) => self.fold_binary(scope, op.op, op.lhs, op.rhs),
            // Label references fold only through equality of their
            // targets; an unbound reference has nothing to fold to.
            ElementData::LabelReference(_) => None,
            _ => None,
        }
    }

    fn fold_intrinsic(
        &mut self,
        intrinsic: ElementId,
        kind: IntrinsicKind,
        arguments: ElementId,
    ) -> Option<ElementId> {
        if !kind.can_fold() {
            return None;
        }
        let scope = self.elements.get(intrinsic).and_then(|e| e.parent_scope);
        let argument_count = match self.elements.get(arguments).map(|e| &e.data) {
            Some(ElementData::ArgumentList(list)) => list.elements.len(),
            _ => 0,
        };
        if argument_count != 1 {
            let location = self.location_of(intrinsic);
            let module = self.module_of(intrinsic);
            self.error(
                module,
                "P091",
                format!("{} expects a single argument.", kind.name()),
                location,
            );
            return None;
        }
        let argument = self.first_argument(arguments)?;
        let inferred = self.infer_type_of(argument)?;
        let (size_in_bytes, alignment) = {
            let header = self.elements.get(inferred)?.type_header()?;
            (header.size_in_bytes, header.alignment)
        };
        let value = match kind {
            IntrinsicKind::SizeOf => size_in_bytes as u64,
            IntrinsicKind::AlignOf => alignment as u64,
            IntrinsicKind::LengthOf => match &self.elements.get(inferred)?.data {
                ElementData::ArrayType(data) => {
                    let mut length = 1u64;
                    for &subscript in &data.subscripts {
                        if let Some(ElementData::IntegerLiteral { value }) =
                            self.elements.get(subscript).map(|e| &e.data)
                        {
                            length = length.saturating_mul(*value);
                        }
                    }
                    length
                }
                _ => {
                    let location = self.location_of(intrinsic);
                    let module = self.module_of(intrinsic);
                    self.error(
                        module,
                        "P091",
                        "length_of expects an array-typed argument.",
                        location,
                    );
                    return None;
                }
            },
            _ => return None,
        };
        Some(self.make_integer(scope, value))
    }

    fn fold_unary(
        &mut self,
        scope: Option<ElementId>,
        op: OperatorKind,
        rhs: ElementId,
    ) -> Option<ElementId> {
        match op {
            OperatorKind::Negate => {
                if let Some(value) = self.as_float(rhs) {
                    Some(self.make_float(scope, -value))
                } else {
                    let value = self.as_integer(rhs)?;
                    Some(self.make_integer(scope, (value as i64).wrapping_neg() as u64))
                }
            }
            OperatorKind::BinaryNot => {
                let value = self.as_integer(rhs)?;
                Some(self.make_integer(scope, !value))
            }
            OperatorKind::LogicalNot => {
                let value = self.as_bool(rhs)?;
                Some(self.make_bool(scope, !value))
            }
            _ => None,
        }
    }

    fn fold_binary(
        &mut self,
        scope: Option<ElementId>,
        op: OperatorKind,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<ElementId> {
        if matches!(
            op,
            OperatorKind::Assignment | OperatorKind::MemberAccess | OperatorKind::Subscript
        ) {
            return None;
        }
        if op.is_logical_conjunction() {
            let left = self.as_bool(lhs)?;
            let right = self.as_bool(rhs)?;
            let value = match op {
                OperatorKind::LogicalAnd => left && right,
                _ => left || right,
            };
            return Some(self.make_bool(scope, value));
        }
        // Mixed integer/float arithmetic folds in the float domain.
        let as_floats = match (self.as_float(lhs), self.as_float(rhs)) {
            (Some(a), Some(b)) => Some((a, b)),
            (Some(a), None) => self.as_integer(rhs).map(|b| (a, b as f64)),
            (None, Some(b)) => self.as_integer(lhs).map(|a| (a as f64, b)),
            (None, None) => None,
        };
        if let Some((a, b)) = as_floats {
            return if op.is_relational() {
                let value = match op {
                    OperatorKind::Equals => a == b,
                    OperatorKind::NotEquals => a != b,
                    OperatorKind::GreaterThan => a > b,
                    OperatorKind::LessThan => a < b,
                    OperatorKind::GreaterThanOrEqual => a >= b,
                    OperatorKind::LessThanOrEqual => a <= b,
                    _ => return None,
                };
                Some(self.make_bool(scope, value))
            } else {
                let value = match op {
                    OperatorKind::Add => a + b,
                    OperatorKind::Subtract => a - b,
                    OperatorKind::Multiply => a * b,
                    OperatorKind::Divide => {
                        if b == 0.0 {
                            return None;
                        }
                        a / b
                    }
                    OperatorKind::Modulo => {
                        if b == 0.0 {
                            return None;
                        }
                        a % b
                    }
                    OperatorKind::Exponent => a.powf(b),
                    _ => return None,
                };
                Some(self.make_float(scope, value))
            };
        }

        let a = self.as_integer(lhs)?;
        let b = self.as_integer(rhs)?;
        if op.is_relational() {
            let value = match op {
                OperatorKind::Equals => a == b,
                OperatorKind::NotEquals => a != b,
                OperatorKind::GreaterThan => a > b,
                OperatorKind::LessThan => a < b,
                OperatorKind::GreaterThanOrEqual => a >= b,
                OperatorKind::LessThanOrEqual => a <= b,
                _ => return None,
            };
            return Some(self.make_bool(scope, value));
        }
        let value = match op {
            OperatorKind::Add => a.wrapping_add(b),
            OperatorKind::Subtract => a.wrapping_sub(b),
            OperatorKind::Multiply => a.wrapping_mul(b),
            OperatorKind::Divide => a.checked_div(b)?,
            OperatorKind::Modulo => a.checked_rem(b)?,
            OperatorKind::BinaryAnd => a & b,
            OperatorKind::BinaryOr => a | b,
            OperatorKind::BinaryXor => a ^ b,
            OperatorKind::ShiftLeft => a.wrapping_shl(b as u32),
            OperatorKind::ShiftRight => a.wrapping_shr(b as u32),
            OperatorKind::RotateLeft => a.rotate_left(b as u32),
            OperatorKind::RotateRight => a.rotate_right(b as u32),
            OperatorKind::Exponent => a.checked_pow(b as u32)?,
            _ => return None,
        };
        Some(self.make_integer(scope, value))
    }

    // ------------------------------------------------------------------
    // fold splicing

    /// Replace `original` with `replacement` inside `parent`. Returns
    /// false when the parent kind has no child slot to patch, which the
    /// pipeline reports as an internal error.
    pub fn apply_fold_result(
        &mut self,
        parent: ElementId,
        original: ElementId,
        replacement: ElementId,
    ) -> bool {
        let Some(element) = self.elements.get_mut(parent) else {
            return false;
        };
        let replace = |slot: &mut ElementId| {
            if *slot == original {
                *slot = replacement;
                true
            } else {
                false
            }
        };
        let replace_opt = |slot: &mut Option<ElementId>| {
            if *slot == Some(original) {
                *slot = Some(replacement);
                true
            } else {
                false
            }
        };
        let replace_vec = |slots: &mut Vec<ElementId>| {
            let mut any = false;
            for slot in slots.iter_mut() {
                if *slot == original {
                    *slot = replacement;
                    any = true;
                }
            }
            any
        };
        match &mut element.data {
            ElementData::Statement(data) => replace_opt(&mut data.expression),
            ElementData::Initializer(data) => replace_opt(&mut data.expression),
            ElementData::UnaryOperator(data) => replace(&mut data.rhs),
            ElementData::BinaryOperator(data) => {
                let lhs = replace(&mut data.lhs);
                let rhs = replace(&mut data.rhs);
                lhs || rhs
            }
            ElementData::ArgumentList(data) => replace_vec(&mut data.elements),
            ElementData::ArgumentPair(data) => {
                let lhs = replace(&mut data.lhs);
                let rhs = replace(&mut data.rhs);
                lhs || rhs
            }
            ElementData::If(data) => replace(&mut data.predicate),
            ElementData::While(data) => replace(&mut data.predicate),
            ElementData::For(data) => replace(&mut data.expression),
            ElementData::Return(data) => replace_vec(&mut data.expressions),
            ElementData::Switch(data) => replace(&mut data.expression),
            ElementData::Case(data) => replace_opt(&mut data.expression),
            ElementData::Defer(data) => replace(&mut data.expression),
            ElementData::With(data) => replace(&mut data.expression),
            ElementData::Expression(data) => replace(&mut data.root),
            ElementData::Attribute(data) => replace_opt(&mut data.expression),
            ElementData::Assignment(data) => replace_vec(&mut data.expressions),
            ElementData::Cast(data) | ElementData::Transmute(data) => {
                replace(&mut data.expression)
            }
            ElementData::Directive(data) => {
                let lhs = replace_opt(&mut data.lhs);
                let rhs = replace_opt(&mut data.rhs);
                let expr = replace_opt(&mut data.expression);
                lhs || rhs || expr
            }
            ElementData::ArrayType(data) => replace_vec(&mut data.subscripts),
            ElementData::TypeLiteral(data) => replace_vec(&mut data.args),
            ElementData::SpreadOperator(data) => replace_opt(&mut data.expression),
            _ => false,
        }
    }
}
