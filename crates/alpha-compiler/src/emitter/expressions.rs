//! Expression and statement lowering.
//!
//! `emit_element` is the dispatch point: every statement emits through
//! it, and expressions return an `EmitResult` describing where their
//! value lives (register, stack slot, or immediate). Operators follow
//! left-then-right evaluation with a temp allocated around each
//! arithmetic instruction.

use super::{ByteCodeEmitter, EmitResult};
use crate::elements::{types, ElementData, ElementId, ElementKind, OperatorKind};
use crate::intrinsics::IntrinsicKind;
use alpha_vm::{OpCode, OpSize, Operand, Register, RegisterClass};

impl<'a> ByteCodeEmitter<'a> {
    /// Lower one element. `None` aborts emission; a diagnostic has been
    /// recorded by then.
    pub(crate) fn emit_element(&mut self, element: ElementId) -> Option<EmitResult> {
        let Some(data) = self
            .session_ref()
            .elements()
            .get(element)
            .map(|e| e.data.clone())
        else {
            return Some(EmitResult::none());
        };
        match data {
            ElementData::Statement(statement) => {
                for label in &statement.labels {
                    let name = self.session_ref().label_name(*label);
                    let label_id = self.session().assembler_mut().make_label(&name);
                    self.with_block(|block| block.label(label_id));
                }
                match statement.expression {
                    Some(expression) => {
                        let result = self.emit_element(expression)?;
                        // Statement-level values are discarded.
                        if let Some(operand) = &result.operand {
                            self.free_operand(operand);
                        }
                        Some(EmitResult::none())
                    }
                    None => Some(EmitResult::none()),
                }
            }
            ElementData::Block(_) => {
                if self.emit_block(element) {
                    Some(EmitResult::none())
                } else {
                    None
                }
            }
            ElementData::Declaration(declaration) => {
                self.emit_local_declaration(declaration.identifier)
            }
            ElementData::IntegerLiteral { value } => {
                Some(EmitResult::with(Operand::Immediate(value)))
            }
            ElementData::FloatLiteral { value } => {
                Some(EmitResult::with(Operand::ImmediateFloat(value)))
            }
            ElementData::BooleanLiteral { value } => {
                Some(EmitResult::with(Operand::Immediate(u64::from(value))))
            }
            ElementData::CharacterLiteral { rune } => {
                Some(EmitResult::with(Operand::Immediate(rune as u64)))
            }
            ElementData::NilLiteral => Some(EmitResult::with(Operand::Immediate(0))),
            ElementData::UninitializedLiteral => Some(EmitResult::none()),
            ElementData::StringLiteral { .. } => {
                let label_name = self.string_label(element)?.to_string();
                let label = self.session().assembler_mut().make_label(&label_name);
                Some(EmitResult::with(Operand::Label(label)))
            }
            ElementData::IdentifierReference(reference) => {
                let identifier = reference.identifier?;
                let register = self.load_identifier(identifier)?;
                Some(EmitResult::with(Operand::Register(register)))
            }
            ElementData::UnaryOperator(op) => self.emit_unary_operator(element, op.op, op.rhs),
            ElementData::BinaryOperator(op) => {
                if op.op == OperatorKind::Assignment {
                    self.emit_assignment(element, op.lhs, op.rhs)
                } else if op.op == OperatorKind::MemberAccess {
                    self.emit_member_access(element, op.lhs, op.rhs)
                } else if op.op.is_relational() {
                    self.emit_relational_operator(element, op.op, op.lhs, op.rhs)
                } else {
                    self.emit_arithmetic_operator(element, op.op, op.lhs, op.rhs)
                }
            }
            ElementData::ProcedureCall(call) => self.emit_procedure_call(element, &call),
            ElementData::Intrinsic(intrinsic) => {
                self.emit_intrinsic(element, intrinsic.kind, intrinsic.arguments)
            }
            ElementData::If(if_data) => {
                if self.emit_if(
                    element,
                    if_data.predicate,
                    if_data.true_branch,
                    if_data.false_branch,
                ) {
                    Some(EmitResult::none())
                } else {
                    None
                }
            }
            ElementData::While(while_data) => {
                if self.emit_while(element, while_data.predicate, while_data.body) {
                    Some(EmitResult::none())
                } else {
                    None
                }
            }
            ElementData::For(for_data) => {
                if self.emit_for(
                    element,
                    for_data.induction_decl,
                    for_data.expression,
                    for_data.body,
                ) {
                    Some(EmitResult::none())
                } else {
                    None
                }
            }
            ElementData::Switch(switch_data) => {
                if self.emit_switch(element, switch_data.expression, switch_data.scope) {
                    Some(EmitResult::none())
                } else {
                    None
                }
            }
            ElementData::Break(_) => {
                let exit = self
                    .current_flow_control()
                    .and_then(|frame| frame.exit_label);
                match exit {
                    Some(exit) => {
                        self.with_block(|block| {
                            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(exit));
                        });
                        Some(EmitResult::none())
                    }
                    None => self.emit_flow_error(element, "break outside of a loop or switch."),
                }
            }
            ElementData::Continue(_) => {
                let target = self
                    .current_flow_control()
                    .and_then(|frame| frame.step_label.or(frame.entry_label));
                match target {
                    Some(target) => {
                        self.with_block(|block| {
                            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(target));
                        });
                        Some(EmitResult::none())
                    }
                    None => self.emit_flow_error(element, "continue outside of a loop."),
                }
            }
            ElementData::Fallthrough(_) => {
                let target = self
                    .current_flow_control()
                    .and_then(|frame| frame.fallthrough_label);
                match target {
                    Some(target) => {
                        self.with_block(|block| {
                            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(target));
                        });
                        Some(EmitResult::none())
                    }
                    None => self.emit_flow_error(element, "fallthrough outside of a switch."),
                }
            }
            ElementData::Return(return_data) => {
                if let Some(&expression) = return_data.expressions.first() {
                    let result = self.emit_element(expression)?;
                    if let Some(operand) = result.operand {
                        self.with_block(|block| {
                            block.op2(
                                OpCode::Move,
                                OpSize::Qword,
                                Operand::Register(Register::integer(0)),
                                operand.clone(),
                            );
                        });
                        self.free_operand(&operand);
                    }
                }
                let epilogue = self.epilogue();
                if let Some(epilogue) = epilogue {
                    self.with_block(|block| {
                        block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(epilogue));
                    });
                } else {
                    self.with_block(|block| block.op0(OpCode::Ret));
                }
                Some(EmitResult::none())
            }
            ElementData::Defer(defer) => self.emit_element(defer.expression),
            ElementData::With(with_data) => {
                self.emit_element(with_data.expression)?;
                if self.emit_block(with_data.body) {
                    Some(EmitResult::none())
                } else {
                    None
                }
            }
            ElementData::Cast(cast) | ElementData::Transmute(cast) => {
                let result = self.emit_element(cast.expression)?;
                let size = types::referenced_type(self.session_ref().elements(), cast.type_ref)
                    .and_then(|t| self.session_ref().elements().get(t))
                    .and_then(|e| e.type_header())
                    .map(|h| h.size_in_bytes)
                    .unwrap_or(8);
                let operand = result.operand?;
                let register = self.read_into_register(element, &operand)?;
                self.with_block(|block| {
                    block.op2(
                        OpCode::Move,
                        OpSize::from_byte_size(size),
                        Operand::Register(register),
                        Operand::Register(register),
                    );
                });
                Some(EmitResult::with(Operand::Register(register)))
            }
            ElementData::Expression(group) => self.emit_element(group.root),
            ElementData::Label(_) => {
                let name = self.session_ref().label_name(element);
                let label = self.session().assembler_mut().make_label(&name);
                self.with_block(|block| block.label(label));
                Some(EmitResult::none())
            }
            ElementData::Directive(directive) => {
                self.emit_directive(element, &directive)
            }
            ElementData::Namespace(_)
            | ElementData::Import(_)
            | ElementData::ModuleReference(_)
            | ElementData::Comment(_)
            | ElementData::Attribute(_)
            | ElementData::Identifier(_)
            | ElementData::Initializer(_) => Some(EmitResult::none()),
            ElementData::RawBlock(raw) => {
                self.with_block(|block| {
                    for line in raw.value.lines() {
                        block.comment(line.to_string());
                    }
                });
                Some(EmitResult::none())
            }
            _ => {
                let kind_name = self
                    .session_ref()
                    .elements()
                    .kind_of(element)
                    .map(|k| k.name())
                    .unwrap_or("element");
                let location = self.session_ref().location_of(element);
                let module = self.session_ref().module_of(element);
                self.session().error(
                    module,
                    "X000",
                    format!("unable to emit element: {kind_name}"),
                    location,
                );
                None
            }
        }
    }

    fn emit_flow_error(&mut self, element: ElementId, message: &str) -> Option<EmitResult> {
        let location = self.session_ref().location_of(element);
        let module = self.session_ref().module_of(element);
        self.session().error(module, "X000", message, location);
        None
    }

    fn emit_directive(
        &mut self,
        _element: ElementId,
        directive: &crate::elements::DirectiveData,
    ) -> Option<EmitResult> {
        match directive.kind {
            crate::directives::DirectiveKind::If => match directive.true_body {
                Some(body) => self.emit_element(body),
                None => Some(EmitResult::none()),
            },
            crate::directives::DirectiveKind::Assembly => match directive.expression {
                Some(expression) => self.emit_element(expression),
                None => Some(EmitResult::none()),
            },
            _ => Some(EmitResult::none()),
        }
    }

    // ------------------------------------------------------------------
    // identifiers

    /// A local declaration with an initializer stores the value into its
    /// frame slot.
    fn emit_local_declaration(&mut self, identifier: ElementId) -> Option<EmitResult> {
        let Some(offset) = self.local_offset(identifier) else {
            // Module-scope declarations were laid out in the section
            // tables.
            return Some(EmitResult::none());
        };
        let expression = match self.session_ref().elements().get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => data.initializer.and_then(|init| {
                match self.session_ref().elements().get(init).map(|e| &e.data) {
                    Some(ElementData::Initializer(init_data)) => init_data.expression,
                    _ => None,
                }
            }),
            _ => None,
        };
        let Some(expression) = expression else {
            return Some(EmitResult::none());
        };
        // Uninitialized slots and type-valued bindings (nested procs,
        // composites, namespaces) store nothing.
        let skip = self
            .session_ref()
            .elements()
            .get(expression)
            .map(|e| {
                e.is_type()
                    || matches!(
                        e.kind(),
                        ElementKind::UninitializedLiteral | ElementKind::Namespace
                    )
            })
            .unwrap_or(true);
        if skip {
            return Some(EmitResult::none());
        }
        let result = self.emit_element(expression)?;
        let size = self
            .session_ref()
            .identifier_type(identifier)
            .and_then(|t| self.session_ref().elements().get(t))
            .and_then(|e| e.type_header())
            .map(|h| h.size_in_bytes)
            .unwrap_or(8);
        if let Some(operand) = result.operand {
            self.with_block(|block| {
                block.op2(
                    OpCode::Store,
                    OpSize::from_byte_size(size),
                    Operand::Slot(offset),
                    operand.clone(),
                );
            });
            self.free_operand(&operand);
        }
        Some(EmitResult::none())
    }

    /// Where an identifier's storage lives: a frame slot for locals, its
    /// section label for module-scope variables.
    pub(crate) fn identifier_storage(&mut self, identifier: ElementId) -> Option<Operand> {
        if let Some(offset) = self.local_offset(identifier) {
            return Some(Operand::Slot(offset));
        }
        let name = self.session_ref().label_name(identifier);
        let label = self.session().assembler_mut().make_label(&name);
        Some(Operand::Label(label))
    }

    /// Load an identifier's value into a freshly allocated register.
    pub(crate) fn load_identifier(&mut self, identifier: ElementId) -> Option<Register> {
        let storage = self.identifier_storage(identifier)?;
        let class = self.register_class_of(identifier);
        let size = self
            .session_ref()
            .identifier_type(identifier)
            .and_then(|t| self.session_ref().elements().get(t))
            .and_then(|e| e.type_header())
            .map(|h| h.size_in_bytes)
            .unwrap_or(8);
        let register = self.allocate_reg(class, identifier)?;
        self.with_block(|block| {
            block.op2(
                OpCode::Load,
                OpSize::from_byte_size(size),
                Operand::Register(register),
                storage,
            );
        });
        Some(register)
    }

    /// Materialize an operand into a register when it is not in one yet.
    pub(crate) fn read_into_register(
        &mut self,
        for_element: ElementId,
        operand: &Operand,
    ) -> Option<Register> {
        if let Operand::Register(register) = operand {
            return Some(*register);
        }
        let class = match operand {
            Operand::ImmediateFloat(_) => RegisterClass::Float,
            _ => RegisterClass::Integer,
        };
        let register = self.allocate_reg(class, for_element)?;
        let operand = operand.clone();
        self.with_block(|block| {
            block.op2(
                OpCode::Move,
                OpSize::Qword,
                Operand::Register(register),
                operand,
            );
        });
        Some(register)
    }

    // ------------------------------------------------------------------
    // operators

    fn emit_unary_operator(
        &mut self,
        element: ElementId,
        op: OperatorKind,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        let result = self.emit_element(rhs)?;
        let operand = result.operand?;
        match op {
            OperatorKind::Negate | OperatorKind::BinaryNot | OperatorKind::LogicalNot => {
                let register = self.read_into_register(element, &operand)?;
                let opcode = match op {
                    OperatorKind::Negate => OpCode::Neg,
                    _ => OpCode::Not,
                };
                self.with_block(|block| {
                    block.op2(
                        opcode,
                        OpSize::Qword,
                        Operand::Register(register),
                        Operand::Register(register),
                    );
                });
                Some(EmitResult::with(Operand::Register(register)))
            }
            OperatorKind::PointerDereference => {
                let address = self.read_into_register(element, &operand)?;
                let size = self
                    .session()
                    .infer_type_of(element)
                    .and_then(|t| self.session_ref().elements().get(t))
                    .and_then(|e| e.type_header())
                    .map(|h| h.size_in_bytes)
                    .unwrap_or(8);
                self.with_block(|block| {
                    block.op2(
                        OpCode::Load,
                        OpSize::from_byte_size(size),
                        Operand::Register(address),
                        Operand::Register(address),
                    );
                });
                Some(EmitResult::with(Operand::Register(address)))
            }
            _ => self.emit_flow_error(element, "unsupported unary operator."),
        }
    }

    /// Left-then-right evaluation, temp around the instruction, operands
    /// freed as soon as the result register holds the value.
    fn emit_arithmetic_operator(
        &mut self,
        element: ElementId,
        op: OperatorKind,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        if op == OperatorKind::Subscript {
            return self.emit_subscript(element, lhs, rhs);
        }
        let lhs_result = self.emit_element(lhs)?;
        let lhs_operand = lhs_result.operand?;
        let rhs_result = self.emit_element(rhs)?;
        let rhs_operand = rhs_result.operand?;

        let opcode = match op {
            OperatorKind::Add => OpCode::Add,
            OperatorKind::Subtract => OpCode::Sub,
            OperatorKind::Multiply => OpCode::Mul,
            OperatorKind::Divide => OpCode::Div,
            OperatorKind::Modulo => OpCode::Mod,
            OperatorKind::BinaryAnd => OpCode::And,
            OperatorKind::BinaryOr => OpCode::Or,
            OperatorKind::BinaryXor => OpCode::Xor,
            OperatorKind::ShiftLeft => OpCode::Shl,
            OperatorKind::ShiftRight => OpCode::Shr,
            OperatorKind::RotateLeft => OpCode::Rol,
            OperatorKind::RotateRight => OpCode::Ror,
            OperatorKind::Exponent => OpCode::Pow,
            _ => {
                return self.emit_flow_error(element, "unsupported binary operator.");
            }
        };

        let class = self.register_class_of(element);
        self.allocate_temp();
        let result_register = self.allocate_reg(class, element)?;
        self.with_block(|block| {
            block.op3(
                opcode,
                OpSize::Qword,
                Operand::Register(result_register),
                lhs_operand.clone(),
                rhs_operand.clone(),
            );
        });
        self.free_operand(&lhs_operand);
        self.free_operand(&rhs_operand);
        self.free_temp();
        Some(EmitResult::with(Operand::Register(result_register)))
    }

    /// Compare, then settle a boolean result register from the flags.
    fn emit_relational_operator(
        &mut self,
        element: ElementId,
        op: OperatorKind,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        if op.is_logical_conjunction() {
            return self.emit_logical_conjunction(element, op, lhs, rhs);
        }
        let lhs_result = self.emit_element(lhs)?;
        let lhs_operand = lhs_result.operand?;
        let rhs_result = self.emit_element(rhs)?;
        let rhs_operand = rhs_result.operand?;
        let result_register = self.allocate_reg(RegisterClass::Integer, element)?;
        let true_label_name = format!("_rel_true_{element}");
        let end_label_name = format!("_rel_end_{element}");
        let true_label = self.session().assembler_mut().make_label(&true_label_name);
        let end_label = self.session().assembler_mut().make_label(&end_label_name);
        let branch = match op {
            OperatorKind::Equals => OpCode::Beq,
            OperatorKind::NotEquals => OpCode::Bne,
            OperatorKind::GreaterThan => OpCode::Bg,
            OperatorKind::LessThan => OpCode::Bl,
            OperatorKind::GreaterThanOrEqual => OpCode::Bge,
            OperatorKind::LessThanOrEqual => OpCode::Ble,
            _ => return self.emit_flow_error(element, "unsupported relational operator."),
        };
        self.with_block(|block| {
            block.op2(
                OpCode::Cmp,
                OpSize::Qword,
                lhs_operand.clone(),
                rhs_operand.clone(),
            );
            block.op1(branch, OpSize::Qword, Operand::Label(true_label));
            block.op2(
                OpCode::Move,
                OpSize::Byte,
                Operand::Register(result_register),
                Operand::Immediate(0),
            );
            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(end_label));
            block.label(true_label);
            block.op2(
                OpCode::Move,
                OpSize::Byte,
                Operand::Register(result_register),
                Operand::Immediate(1),
            );
            block.label(end_label);
        });
        self.free_operand(&lhs_operand);
        self.free_operand(&rhs_operand);
        Some(EmitResult::with(Operand::Register(result_register)))
    }

    /// `and`/`or` with short-circuit evaluation.
    fn emit_logical_conjunction(
        &mut self,
        element: ElementId,
        op: OperatorKind,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        let short_label_name = format!("_logic_short_{element}");
        let short_label = self.session().assembler_mut().make_label(&short_label_name);
        let lhs_result = self.emit_element(lhs)?;
        let lhs_operand = lhs_result.operand?;
        let result_register = self.read_into_register(element, &lhs_operand)?;
        let branch = match op {
            // and: a false left side decides the result
            OperatorKind::LogicalAnd => OpCode::Beq,
            // or: a true left side decides the result
            _ => OpCode::Bne,
        };
        self.with_block(|block| {
            block.op2(
                OpCode::Cmp,
                OpSize::Byte,
                Operand::Register(result_register),
                Operand::Immediate(0),
            );
            block.op1(branch, OpSize::Qword, Operand::Label(short_label));
        });
        let rhs_result = self.emit_element(rhs)?;
        let rhs_operand = rhs_result.operand?;
        self.with_block(|block| {
            block.op2(
                OpCode::Move,
                OpSize::Byte,
                Operand::Register(result_register),
                rhs_operand.clone(),
            );
            block.label(short_label);
        });
        self.free_operand(&rhs_operand);
        Some(EmitResult::with(Operand::Register(result_register)))
    }

    /// Assignment: evaluate the value, then store through the target's
    /// storage or computed address.
    fn emit_assignment(
        &mut self,
        element: ElementId,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        let rhs_result = self.emit_element(rhs)?;
        let value = rhs_result.operand?;
        let size = self
            .session()
            .infer_type_of(lhs)
            .and_then(|t| self.session_ref().elements().get(t))
            .and_then(|e| e.type_header())
            .map(|h| h.size_in_bytes)
            .unwrap_or(8);
        let lhs_identifier = match self.session_ref().elements().get(lhs).map(|e| &e.data) {
            Some(ElementData::IdentifierReference(reference)) => Some(reference.identifier),
            _ => None,
        };
        let target = match lhs_identifier {
            // A bare identifier target stores straight to its slot.
            Some(identifier) => self.identifier_storage(identifier?)?,
            None => {
                let address = self.emit_address_of(lhs)?;
                Operand::Register(address)
            }
        };
        self.with_block(|block| {
            block.op2(
                OpCode::Store,
                OpSize::from_byte_size(size),
                target.clone(),
                value.clone(),
            );
        });
        self.free_operand(&target);
        self.free_operand(&value);
        let _ = element;
        Some(EmitResult::none())
    }

    /// Member access: base address plus field offset, then a read.
    fn emit_member_access(
        &mut self,
        element: ElementId,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        let address = self.emit_member_address(element, lhs, rhs)?;
        let size = self
            .session()
            .infer_type_of(rhs)
            .and_then(|t| self.session_ref().elements().get(t))
            .and_then(|e| e.type_header())
            .map(|h| h.size_in_bytes)
            .unwrap_or(8);
        self.with_block(|block| {
            block.op2(
                OpCode::Load,
                OpSize::from_byte_size(size),
                Operand::Register(address),
                Operand::Register(address),
            );
        });
        Some(EmitResult::with(Operand::Register(address)))
    }

    fn emit_member_address(
        &mut self,
        element: ElementId,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<Register> {
        let base = self.emit_address_of(lhs)?;
        let member = match self.session_ref().elements().get(rhs).map(|e| &e.data) {
            Some(ElementData::IdentifierReference(reference)) => reference.identifier,
            _ => None,
        };
        let offset = member
            .and_then(|identifier| self.field_offset(lhs, identifier))
            .unwrap_or(0);
        if offset != 0 {
            self.with_block(|block| {
                block.op3(
                    OpCode::Add,
                    OpSize::Qword,
                    Operand::Register(base),
                    Operand::Register(base),
                    Operand::Immediate(offset),
                );
            });
        }
        let _ = element;
        Some(base)
    }

    /// The field offset of `member` within the composite type of `lhs`.
    fn field_offset(&mut self, lhs: ElementId, member: ElementId) -> Option<u64> {
        let lhs_type = self.session().infer_type_of(lhs)?;
        let fields = match self.session_ref().elements().get(lhs_type).map(|e| &e.data) {
            Some(ElementData::CompositeType(data)) => data.fields.clone(),
            _ => return None,
        };
        for field in fields.values() {
            if let Some(ElementData::Field(field_data)) =
                self.session_ref().elements().get(*field).map(|e| &e.data)
            {
                if field_data.identifier == member {
                    return Some(field_data.offset);
                }
            }
        }
        None
    }

    /// Compute an element's address into a register: frame-pointer
    /// arithmetic for locals, the section label for module variables.
    pub(crate) fn emit_address_of(&mut self, element: ElementId) -> Option<Register> {
        let data = self
            .session_ref()
            .elements()
            .get(element)
            .map(|e| e.data.clone())?;
        match data {
            ElementData::IdentifierReference(reference) => {
                let identifier = reference.identifier?;
                let register = self.allocate_reg(RegisterClass::Integer, element)?;
                match self.identifier_storage(identifier)? {
                    Operand::Slot(offset) => {
                        self.with_block(|block| {
                            block.op2(
                                OpCode::Move,
                                OpSize::Qword,
                                Operand::Register(register),
                                Operand::Register(Register::FP),
                            );
                            if offset >= 0 {
                                block.op3(
                                    OpCode::Add,
                                    OpSize::Qword,
                                    Operand::Register(register),
                                    Operand::Register(register),
                                    Operand::Immediate(offset as u64),
                                );
                            } else {
                                block.op3(
                                    OpCode::Sub,
                                    OpSize::Qword,
                                    Operand::Register(register),
                                    Operand::Register(register),
                                    Operand::Immediate(offset.unsigned_abs()),
                                );
                            }
                        });
                    }
                    storage => {
                        self.with_block(|block| {
                            block.op2(
                                OpCode::Move,
                                OpSize::Qword,
                                Operand::Register(register),
                                storage,
                            );
                        });
                    }
                }
                Some(register)
            }
            ElementData::BinaryOperator(op) if op.op == OperatorKind::MemberAccess => {
                self.emit_member_address(element, op.lhs, op.rhs)
            }
            ElementData::UnaryOperator(op) if op.op == OperatorKind::PointerDereference => {
                let result = self.emit_element(op.rhs)?;
                let operand = result.operand?;
                self.read_into_register(element, &operand)
            }
            _ => {
                let _ = self.emit_flow_error(element, "expression has no address.");
                None
            }
        }
    }

    // ------------------------------------------------------------------
    // calls & intrinsics

    /// Arguments push right-to-left, then a call against the resolved
    /// procedure's label; the result convention is integer register 0.
    fn emit_procedure_call(
        &mut self,
        element: ElementId,
        call: &crate::elements::ProcedureCallData,
    ) -> Option<EmitResult> {
        let Some(proc_type) = call.resolved_proc_type else {
            return self.emit_flow_error(element, "call site was never resolved.");
        };
        let label_name = match self.session_ref().elements().get(proc_type).map(|e| &e.data) {
            Some(ElementData::ProcedureType(data)) => data
                .label
                .clone()
                .unwrap_or_else(|| format!("_proc_{proc_type}")),
            _ => return self.emit_flow_error(element, "call target is not a procedure."),
        };
        let arguments: Vec<ElementId> = match self
            .session_ref()
            .elements()
            .get(call.arguments)
            .map(|e| &e.data)
        {
            Some(ElementData::ArgumentList(list)) => list.elements.clone(),
            _ => Vec::new(),
        };
        self.allocate_temp();
        for argument in arguments.into_iter().rev() {
            let result = self.emit_element(argument)?;
            if let Some(operand) = result.operand {
                self.with_block(|block| {
                    block.op1(OpCode::Push, OpSize::Qword, operand.clone());
                });
                self.free_operand(&operand);
            }
        }
        let label = self.session().assembler_mut().make_label(&label_name);
        self.with_block(|block| {
            block.op1(OpCode::Call, OpSize::Qword, Operand::Label(label));
        });
        self.free_temp();
        let has_return = matches!(
            self.session_ref().elements().get(proc_type).map(|e| &e.data),
            Some(ElementData::ProcedureType(data)) if data.return_type.is_some()
        );
        if has_return {
            let register = self.allocate_reg(RegisterClass::Integer, element)?;
            self.with_block(|block| {
                block.op2(
                    OpCode::Move,
                    OpSize::Qword,
                    Operand::Register(register),
                    Operand::Register(Register::integer(0)),
                );
            });
            Some(EmitResult::with(Operand::Register(register)))
        } else {
            Some(EmitResult::none())
        }
    }

    /// The intrinsics that survive folding lower here: address-of, heap
    /// alloc and free. The query intrinsics re-fold to immediates.
    fn emit_intrinsic(
        &mut self,
        element: ElementId,
        kind: IntrinsicKind,
        arguments: ElementId,
    ) -> Option<EmitResult> {
        match kind {
            IntrinsicKind::AddressOf => {
                let argument = self.session_ref().first_argument(arguments)?;
                let register = self.emit_address_of(argument)?;
                Some(EmitResult::with(Operand::Register(register)))
            }
            IntrinsicKind::Alloc => {
                let argument = self.session_ref().first_argument(arguments)?;
                let result = self.emit_element(argument)?;
                let size_operand = result.operand?;
                let register = self.allocate_reg(RegisterClass::Integer, element)?;
                self.with_block(|block| {
                    block.op2(
                        OpCode::Alloc,
                        OpSize::Qword,
                        Operand::Register(register),
                        size_operand.clone(),
                    );
                });
                self.free_operand(&size_operand);
                Some(EmitResult::with(Operand::Register(register)))
            }
            IntrinsicKind::Free => {
                let argument = self.session_ref().first_argument(arguments)?;
                let result = self.emit_element(argument)?;
                let operand = result.operand?;
                self.with_block(|block| {
                    block.op1(OpCode::Free, OpSize::Qword, operand.clone());
                });
                self.free_operand(&operand);
                Some(EmitResult::none())
            }
            IntrinsicKind::SizeOf | IntrinsicKind::AlignOf | IntrinsicKind::LengthOf => {
                // Normally folded away; late arrivals still produce their
                // constant value.
                let folded = self.session().fold_element(element).map(|r| r.element);
                let value = folded.and_then(|folded| {
                    let value = self.session_ref().as_integer(folded);
                    self.session().elements_mut().remove(folded);
                    value
                });
                match value {
                    Some(value) => Some(EmitResult::with(Operand::Immediate(value))),
                    None => self.emit_flow_error(element, "intrinsic did not fold."),
                }
            }
            IntrinsicKind::TypeOf | IntrinsicKind::Range => {
                self.emit_flow_error(element, "intrinsic is not valid in this position.")
            }
        }
    }

    fn emit_subscript(
        &mut self,
        element: ElementId,
        lhs: ElementId,
        rhs: ElementId,
    ) -> Option<EmitResult> {
        let base = self.emit_address_of(lhs)?;
        let index_result = self.emit_element(rhs)?;
        let index_operand = index_result.operand?;
        let index = self.read_into_register(element, &index_operand)?;
        let stride = self
            .session()
            .infer_type_of(element)
            .and_then(|t| self.session_ref().elements().get(t))
            .and_then(|e| e.type_header())
            .map(|h| h.size_in_bytes)
            .unwrap_or(8)
            .max(1);
        self.with_block(|block| {
            block.op3(
                OpCode::Mul,
                OpSize::Qword,
                Operand::Register(index),
                Operand::Register(index),
                Operand::Immediate(stride as u64),
            );
            block.op3(
                OpCode::Add,
                OpSize::Qword,
                Operand::Register(base),
                Operand::Register(base),
                Operand::Register(index),
            );
            block.op2(
                OpCode::Load,
                OpSize::from_byte_size(stride),
                Operand::Register(base),
                Operand::Register(base),
            );
        });
        self.session().assembler_mut().free_reg(index);
        Some(EmitResult::with(Operand::Register(base)))
    }
}
