//! Procedure lowering: stack frames, temp locals, prologue and epilogue.

use super::{ByteCodeEmitter, FlowControl};
use crate::elements::{ElementData, ElementId, ProcedureTypeData};
use alpha_common::NumberClass;
use alpha_vm::{OpCode, OpSize, Operand, Register, SectionKind};

/// Pre-scan result: how many integer and float temp slots a body needs.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct TempCountResult {
    pub ints: usize,
    pub floats: usize,
}

impl TempCountResult {
    fn add(&mut self, other: TempCountResult) {
        self.ints += other.ints;
        self.floats += other.floats;
    }
}

/// A named, frame-relative temp slot.
#[derive(Clone, Debug)]
pub(crate) struct TempLocal {
    pub name: String,
    pub offset: i64,
}

impl<'a> ByteCodeEmitter<'a> {
    /// Emit one procedure: label, prologue sized for locals plus the
    /// pre-counted temps, the body statements, then the epilogue which
    /// unwinds locals in reverse declaration order.
    pub(crate) fn emit_procedure_instance(
        &mut self,
        proc_type: ElementId,
        data: &ProcedureTypeData,
    ) -> bool {
        let Some(body) = data.body else {
            return true;
        };
        let label_name = data
            .label
            .clone()
            .unwrap_or_else(|| format!("_proc_{proc_type}"));
        let label = self.session().assembler_mut().make_label(&label_name);
        let epilogue_name = format!("{label_name}_epilogue");
        let epilogue = self.session().assembler_mut().make_label(&epilogue_name);

        let id = self.push_basic_block();
        {
            let block = self.session().assembler_mut().block_mut(id);
            block.blank();
            block.comment(format!("proc {label_name}"));
            block.section(SectionKind::Text);
            block.label(label);
        }

        self.reset_temp();
        self.clear_locals();
        self.set_epilogue(Some(epilogue));

        // Parameters live above the frame pointer: saved fp + return
        // address, then one qword slot each.
        for (position, &parameter) in data.parameters.iter().enumerate() {
            self.set_local_offset(parameter, 16 + 8 * position as i64);
        }

        let locals = self.collect_locals(body);
        let mut frame_size: i64 = 0;
        for (identifier, size, align) in &locals {
            let align = (*align).max(1) as i64;
            frame_size += *size as i64;
            let misalign = frame_size % align;
            if misalign != 0 {
                frame_size += align - misalign;
            }
            self.set_local_offset(*identifier, -frame_size);
        }

        let mut counts = TempCountResult::default();
        self.count_temps(body, &mut counts);
        let temp_locals = self.make_temp_locals(&counts, frame_size);
        frame_size += 8 * (counts.ints + counts.floats) as i64;
        frame_size = (frame_size + 15) & !15;

        self.emit_procedure_prologue(frame_size, &temp_locals);
        if !self.emit_block(body) {
            return false;
        }
        self.emit_procedure_epilogue(epilogue, &locals);

        self.set_epilogue(None);
        self.pop_basic_block();
        true
    }

    /// Every identifier declared anywhere under `block`, with its size
    /// and alignment, in declaration order.
    fn collect_locals(&mut self, block: ElementId) -> Vec<(ElementId, usize, usize)> {
        let mut locals = Vec::new();
        self.collect_locals_into(block, &mut locals);
        locals
    }

    fn collect_locals_into(
        &mut self,
        element: ElementId,
        locals: &mut Vec<(ElementId, usize, usize)>,
    ) {
        // Nested procedures have their own frames; composite and
        // namespace scopes hold members, not locals.
        if matches!(
            self.session_ref().elements().kind_of(element),
            Some(crate::elements::ElementKind::ProcedureType)
                | Some(crate::elements::ElementKind::CompositeType)
                | Some(crate::elements::ElementKind::Namespace)
        ) {
            return;
        }
        if let Some(ElementData::Block(data)) =
            self.session_ref().elements().get(element).map(|e| &e.data)
        {
            let identifiers: Vec<ElementId> = data.identifiers_in_order().collect();
            for identifier in identifiers {
                if !self.needs_storage(identifier) {
                    continue;
                }
                let (size, align) = self
                    .session_ref()
                    .identifier_type(identifier)
                    .and_then(|t| self.session_ref().elements().get(t))
                    .and_then(|e| e.type_header())
                    .map(|h| (h.size_in_bytes.max(1), h.alignment.max(1)))
                    .unwrap_or((8, 8));
                locals.push((identifier, size, align));
            }
        }
        let children = self
            .session_ref()
            .elements()
            .get(element)
            .map(|e| e.owned_children())
            .unwrap_or_default();
        for child in children {
            self.collect_locals_into(child, locals);
        }
    }

    /// Count the temp slots the body needs: one per arithmetic operator
    /// and call, split by number class.
    pub(crate) fn count_temps(&mut self, element: ElementId, result: &mut TempCountResult) {
        if matches!(
            self.session_ref().elements().kind_of(element),
            Some(crate::elements::ElementKind::ProcedureType)
        ) {
            return;
        }
        let Some(data) = self
            .session_ref()
            .elements()
            .get(element)
            .map(|e| e.data.clone())
        else {
            return;
        };
        match &data {
            ElementData::BinaryOperator(op) if op.op.is_arithmetic() => {
                let mut own = TempCountResult::default();
                match self.number_class_of(element) {
                    NumberClass::Float => own.floats += 1,
                    _ => own.ints += 1,
                }
                result.add(own);
            }
            ElementData::ProcedureCall(_) => result.ints += 1,
            _ => {}
        }
        let children = self
            .session_ref()
            .elements()
            .get(element)
            .map(|e| e.owned_children())
            .unwrap_or_default();
        for child in children {
            self.count_temps(child, result);
        }
    }

    fn make_temp_locals(&self, counts: &TempCountResult, base_offset: i64) -> Vec<TempLocal> {
        let mut locals = Vec::new();
        let mut offset = base_offset;
        for number in 0..counts.ints {
            offset += 8;
            locals.push(TempLocal {
                name: Self::temp_local_name(NumberClass::Integer, number as u8 + 1),
                offset: -offset,
            });
        }
        for number in 0..counts.floats {
            offset += 8;
            locals.push(TempLocal {
                name: Self::temp_local_name(NumberClass::Float, number as u8 + 1),
                offset: -offset,
            });
        }
        locals
    }

    fn emit_procedure_prologue(&mut self, frame_size: i64, temp_locals: &[TempLocal]) {
        let comments: Vec<String> = temp_locals
            .iter()
            .map(|temp| format!("temp local {} at fp{:+}", temp.name, temp.offset))
            .collect();
        self.with_block(|block| {
            for comment in comments {
                block.comment(comment);
            }
            block.op1(
                OpCode::Push,
                OpSize::Qword,
                Operand::Register(Register::FP),
            );
            block.op2(
                OpCode::Move,
                OpSize::Qword,
                Operand::Register(Register::FP),
                Operand::Register(Register::SP),
            );
            if frame_size > 0 {
                block.op3(
                    OpCode::Sub,
                    OpSize::Qword,
                    Operand::Register(Register::SP),
                    Operand::Register(Register::SP),
                    Operand::Immediate(frame_size as u64),
                );
            }
        });
    }

    /// Locals unwind in reverse declaration order, then the frame is
    /// restored.
    fn emit_procedure_epilogue(
        &mut self,
        epilogue: alpha_vm::LabelId,
        locals: &[(ElementId, usize, usize)],
    ) {
        let finalizer_comments: Vec<String> = locals
            .iter()
            .rev()
            .map(|(identifier, _, _)| {
                format!(
                    "finalize {}",
                    self.session_ref().identifier_name(*identifier)
                )
            })
            .collect();
        self.with_block(|block| {
            block.label(epilogue);
            for comment in finalizer_comments {
                block.comment(comment);
            }
            block.op2(
                OpCode::Move,
                OpSize::Qword,
                Operand::Register(Register::SP),
                Operand::Register(Register::FP),
            );
            block.op1(OpCode::Pop, OpSize::Qword, Operand::Register(Register::FP));
            block.op0(OpCode::Ret);
        });
    }

    /// Emit every statement in a block, then any deferred expressions in
    /// reverse order.
    pub(crate) fn emit_block(&mut self, block: ElementId) -> bool {
        let statements: Vec<ElementId> =
            match self.session_ref().elements().get(block).map(|e| &e.data) {
                Some(ElementData::Block(data)) => data.statements.clone(),
                _ => Vec::new(),
            };
        let mut deferred = Vec::new();
        for statement in statements {
            let expression = match self.session_ref().elements().get(statement).map(|e| &e.data)
            {
                Some(ElementData::Statement(data)) => data.expression,
                _ => Some(statement),
            };
            if let Some(expression) = expression {
                if let Some(ElementData::Defer(defer)) =
                    self.session_ref().elements().get(expression).map(|e| &e.data)
                {
                    deferred.push(defer.expression);
                    continue;
                }
            }
            if self.emit_element(statement).is_none() {
                return false;
            }
        }
        for expression in deferred.into_iter().rev() {
            if self.emit_element(expression).is_none() {
                return false;
            }
        }
        true
    }

    /// Lower a while loop with entry/exit labels and a flow frame for
    /// break and continue.
    pub(crate) fn emit_while(
        &mut self,
        element: ElementId,
        predicate: ElementId,
        body: ElementId,
    ) -> bool {
        let entry_name = format!("_while_entry_{element}");
        let exit_name = format!("_while_exit_{element}");
        let entry = self.session().assembler_mut().make_label(&entry_name);
        let exit = self.session().assembler_mut().make_label(&exit_name);
        self.with_block(|block| block.label(entry));
        self.push_flow_control(FlowControl {
            entry_label: Some(entry),
            exit_label: Some(exit),
            step_label: Some(entry),
            fallthrough_label: None,
            selector: None,
        });
        let Some(result) = self.emit_element(predicate) else {
            return false;
        };
        let predicate_operand = result.operand.unwrap_or(Operand::Immediate(0));
        self.with_block(|block| {
            block.op2(
                OpCode::Cmp,
                OpSize::Byte,
                predicate_operand.clone(),
                Operand::Immediate(0),
            );
            block.op1(OpCode::Beq, OpSize::Qword, Operand::Label(exit));
        });
        self.free_operand(&predicate_operand);
        if !self.emit_block(body) {
            return false;
        }
        self.with_block(|block| {
            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(entry));
            block.label(exit);
        });
        self.pop_flow_control();
        true
    }

    /// Lower `for x in range(a, b)` as an induction loop: initialize,
    /// test, body, step.
    pub(crate) fn emit_for(
        &mut self,
        element: ElementId,
        induction_decl: ElementId,
        expression: ElementId,
        body: ElementId,
    ) -> bool {
        let range_args = match self.session_ref().elements().get(expression).map(|e| &e.data) {
            Some(ElementData::Intrinsic(data))
                if data.kind == crate::intrinsics::IntrinsicKind::Range =>
            {
                match self
                    .session_ref()
                    .elements()
                    .get(data.arguments)
                    .map(|e| &e.data)
                {
                    Some(ElementData::ArgumentList(list)) if list.elements.len() == 2 => {
                        Some((list.elements[0], list.elements[1]))
                    }
                    _ => None,
                }
            }
            _ => None,
        };
        let Some((start, stop)) = range_args else {
            let location = self.session_ref().location_of(element);
            let module = self.session_ref().module_of(element);
            self.session().error(
                module,
                "X000",
                "for loops lower only over range expressions.",
                location,
            );
            return false;
        };
        let induction = match self
            .session_ref()
            .elements()
            .get(induction_decl)
            .map(|e| &e.data)
        {
            Some(ElementData::Declaration(data)) => data.identifier,
            _ => return false,
        };

        let entry_name = format!("_for_entry_{element}");
        let step_name = format!("_for_step_{element}");
        let exit_name = format!("_for_exit_{element}");
        let entry = self.session().assembler_mut().make_label(&entry_name);
        let step = self.session().assembler_mut().make_label(&step_name);
        let exit = self.session().assembler_mut().make_label(&exit_name);

        let Some(start_result) = self.emit_element(start) else {
            return false;
        };
        let start_operand = start_result.operand.unwrap_or(Operand::Immediate(0));
        let Some(slot) = self.identifier_storage(induction) else {
            return false;
        };
        self.with_block(|block| {
            block.op2(OpCode::Store, OpSize::Qword, slot.clone(), start_operand.clone());
            block.label(entry);
        });
        self.free_operand(&start_operand);

        self.push_flow_control(FlowControl {
            entry_label: Some(entry),
            exit_label: Some(exit),
            step_label: Some(step),
            fallthrough_label: None,
            selector: None,
        });

        let Some(stop_result) = self.emit_element(stop) else {
            return false;
        };
        let stop_operand = stop_result.operand.unwrap_or(Operand::Immediate(0));
        let Some(current) = self.load_identifier(induction) else {
            return false;
        };
        self.with_block(|block| {
            block.op2(
                OpCode::Cmp,
                OpSize::Qword,
                Operand::Register(current),
                stop_operand.clone(),
            );
            block.op1(OpCode::Bge, OpSize::Qword, Operand::Label(exit));
        });
        self.free_operand(&stop_operand);
        self.session().assembler_mut().free_reg(current);

        if !self.emit_block(body) {
            return false;
        }

        let Some(stepped) = self.load_identifier(induction) else {
            return false;
        };
        self.with_block(|block| {
            block.label(step);
            block.op3(
                OpCode::Add,
                OpSize::Qword,
                Operand::Register(stepped),
                Operand::Register(stepped),
                Operand::Immediate(1),
            );
            block.op2(OpCode::Store, OpSize::Qword, slot, Operand::Register(stepped));
            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(entry));
            block.label(exit);
        });
        self.session().assembler_mut().free_reg(stepped);
        self.pop_flow_control();
        true
    }

    /// Lower a switch: evaluate the selector once, then compare against
    /// each case, chaining fallthrough labels.
    pub(crate) fn emit_switch(
        &mut self,
        element: ElementId,
        expression: ElementId,
        scope: ElementId,
    ) -> bool {
        let exit_name = format!("_switch_exit_{element}");
        let exit = self.session().assembler_mut().make_label(&exit_name);
        let Some(selector_result) = self.emit_element(expression) else {
            return false;
        };
        let selector_operand = selector_result.operand.unwrap_or(Operand::Immediate(0));
        let selector = match selector_operand {
            Operand::Register(register) => register,
            ref other => {
                let Some(register) =
                    self.allocate_reg(alpha_vm::RegisterClass::Integer, element)
                else {
                    return false;
                };
                let operand = other.clone();
                self.with_block(|block| {
                    block.op2(
                        OpCode::Move,
                        OpSize::Qword,
                        Operand::Register(register),
                        operand,
                    );
                });
                register
            }
        };

        let cases: Vec<ElementId> =
            match self.session_ref().elements().get(scope).map(|e| &e.data) {
                Some(ElementData::Block(data)) => data.statements.clone(),
                _ => Vec::new(),
            };
        for (index, case) in cases.iter().copied().enumerate() {
            let Some(ElementData::Case(case_data)) = self
                .session_ref()
                .elements()
                .get(case)
                .map(|e| e.data.clone())
            else {
                continue;
            };
            let next_name = format!("_switch_case_{element}_{index}");
            let next = self.session().assembler_mut().make_label(&next_name);
            if let Some(case_expression) = case_data.expression {
                let Some(case_result) = self.emit_element(case_expression) else {
                    return false;
                };
                let case_operand = case_result.operand.unwrap_or(Operand::Immediate(0));
                self.with_block(|block| {
                    block.op2(
                        OpCode::Cmp,
                        OpSize::Qword,
                        Operand::Register(selector),
                        case_operand.clone(),
                    );
                    block.op1(OpCode::Bne, OpSize::Qword, Operand::Label(next));
                });
                self.free_operand(&case_operand);
            }
            self.push_flow_control(FlowControl {
                entry_label: None,
                exit_label: Some(exit),
                step_label: None,
                fallthrough_label: Some(next),
                selector: Some(selector),
            });
            if !self.emit_block(case_data.scope) {
                return false;
            }
            self.pop_flow_control();
            self.with_block(|block| {
                block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(exit));
                block.label(next);
            });
        }
        self.with_block(|block| block.label(exit));
        self.session().assembler_mut().free_reg(selector);
        true
    }

    /// Conditional lowering: predicate, branch to else, fall through to
    /// the true block.
    pub(crate) fn emit_if(
        &mut self,
        element: ElementId,
        predicate: ElementId,
        true_branch: ElementId,
        false_branch: Option<ElementId>,
    ) -> bool {
        let else_name = format!("_if_else_{element}");
        let end_name = format!("_if_end_{element}");
        let else_label = self.session().assembler_mut().make_label(&else_name);
        let end = self.session().assembler_mut().make_label(&end_name);
        let Some(result) = self.emit_element(predicate) else {
            return false;
        };
        let operand = result.operand.unwrap_or(Operand::Immediate(0));
        self.with_block(|block| {
            block.op2(OpCode::Cmp, OpSize::Byte, operand.clone(), Operand::Immediate(0));
            block.op1(OpCode::Beq, OpSize::Qword, Operand::Label(else_label));
        });
        self.free_operand(&operand);
        if !self.emit_branch(true_branch) {
            return false;
        }
        self.with_block(|block| {
            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(end));
            block.label(else_label);
        });
        if let Some(false_branch) = false_branch {
            if !self.emit_branch(false_branch) {
                return false;
            }
        }
        self.with_block(|block| block.label(end));
        true
    }

    fn emit_branch(&mut self, branch: ElementId) -> bool {
        match self.session_ref().elements().kind_of(branch) {
            Some(crate::elements::ElementKind::Block) => self.emit_block(branch),
            _ => self.emit_element(branch).is_some(),
        }
    }
}
