//! The byte-code emitter.
//!
//! Walks the resolved element graph once and lowers it to instruction
//! blocks through the assembler. Two working stacks drive emission: the
//! basic-block stack (the block currently being appended to) and the
//! flow-control stack (enclosing loop/switch frames for break, continue,
//! and fallthrough). A single-byte temporary counter, re-zeroed per
//! procedure, names temp locals deterministically.
//!
//! Emission order: bootstrap block, interned string table, type-info
//! table, section tables, procedure bodies, the start block, and finally
//! the implicit module-initializer blocks.

mod procedures;
mod expressions;

use crate::elements::{types, ElementData, ElementId, ElementKind};
use crate::session::Session;
use alpha_common::NumberClass;
use alpha_vm::{
    BlockId, LabelId, OpCode, OpSize, Operand, Register, RegisterClass, SectionKind,
};
use bitflags::bitflags;
use rustc_hash::FxHashMap;
use tracing::debug;

bitflags! {
    /// Per-variable placement facts collected during section grouping.
    #[derive(Clone, Copy, Debug, PartialEq, Eq)]
    pub struct VarFlags: u8 {
        const CONSTANT    = 1 << 0;
        const INITIALIZED = 1 << 1;
    }
}

/// Where an emitted expression's value lives.
#[derive(Clone, Debug, Default)]
pub struct EmitResult {
    pub operand: Option<Operand>,
}

impl EmitResult {
    pub fn none() -> Self {
        EmitResult { operand: None }
    }

    pub fn with(operand: Operand) -> Self {
        EmitResult {
            operand: Some(operand),
        }
    }
}

/// One enclosing loop or switch for break/continue/fallthrough.
#[derive(Clone, Debug, Default)]
pub struct FlowControl {
    pub entry_label: Option<LabelId>,
    pub exit_label: Option<LabelId>,
    pub step_label: Option<LabelId>,
    pub fallthrough_label: Option<LabelId>,
    pub selector: Option<Register>,
}

pub struct ByteCodeEmitter<'a> {
    session: &'a mut Session,
    block_stack: Vec<BlockId>,
    flow_stack: Vec<FlowControl>,
    temp: u8,
    /// Frame offsets for the current procedure's locals and parameters.
    locals: FxHashMap<ElementId, i64>,
    /// Interned-string labels by string literal element.
    string_labels: FxHashMap<ElementId, String>,
    epilogue_label: Option<LabelId>,
}

impl<'a> ByteCodeEmitter<'a> {
    pub fn new(session: &'a mut Session) -> Self {
        ByteCodeEmitter {
            session,
            block_stack: Vec::new(),
            flow_stack: Vec::new(),
            temp: 0,
            locals: FxHashMap::default(),
            string_labels: FxHashMap::default(),
            epilogue_label: None,
        }
    }

    /// Lower the whole program. Fail-fast: the first element that cannot
    /// be lowered records a diagnostic and aborts the phase.
    pub fn emit(mut self) -> bool {
        self.emit_bootstrap_block();
        self.intern_string_literals();
        self.emit_interned_string_table();
        self.emit_type_table();
        let vars = self.group_identifiers();
        self.emit_section_tables(&vars);
        if !self.emit_procedure_types() {
            return false;
        }
        self.emit_start_block();
        if !self.emit_implicit_blocks() {
            return false;
        }
        debug!(
            blocks = self.session.assembler().block_count(),
            "emitter: byte-code generated"
        );
        true
    }

    // ------------------------------------------------------------------
    // temps

    /// Allocate the next temp number, 1-based within the procedure.
    pub(crate) fn allocate_temp(&mut self) -> u8 {
        self.temp += 1;
        self.temp
    }

    pub(crate) fn free_temp(&mut self) {
        if self.temp > 0 {
            self.temp -= 1;
        }
    }

    pub(crate) fn reset_temp(&mut self) {
        self.temp = 0;
    }

    /// Deterministic temp-local name: the same tree always produces the
    /// same labels.
    pub(crate) fn temp_local_name(class: NumberClass, number: u8) -> String {
        let prefix = match class {
            NumberClass::Float => "float",
            _ => "int",
        };
        format!("{prefix}_temp_{number}")
    }

    // ------------------------------------------------------------------
    // flow-control stack

    pub(crate) fn push_flow_control(&mut self, frame: FlowControl) {
        self.flow_stack.push(frame);
    }

    pub(crate) fn pop_flow_control(&mut self) -> Option<FlowControl> {
        self.flow_stack.pop()
    }

    pub(crate) fn current_flow_control(&self) -> Option<&FlowControl> {
        self.flow_stack.last()
    }

    // ------------------------------------------------------------------
    // block stack & registers

    pub(crate) fn push_basic_block(&mut self) -> BlockId {
        let id = self.session.assembler_mut().make_basic_block();
        self.block_stack.push(id);
        id
    }

    pub(crate) fn pop_basic_block(&mut self) {
        self.block_stack.pop();
    }

    pub(crate) fn current_block(&self) -> Option<BlockId> {
        self.block_stack.last().copied()
    }

    pub(crate) fn with_block<R>(
        &mut self,
        f: impl FnOnce(&mut alpha_vm::InstructionBlock) -> R,
    ) -> Option<R> {
        let id = self.current_block()?;
        Some(f(self.session.assembler_mut().block_mut(id)))
    }

    /// Allocate a scratch register; exhaustion is fatal.
    pub(crate) fn allocate_reg(
        &mut self,
        class: RegisterClass,
        for_element: ElementId,
    ) -> Option<Register> {
        match self.session.assembler_mut().allocate_reg(class) {
            Some(register) => Some(register),
            None => {
                let location = self.session.location_of(for_element);
                let module = self.session.module_of(for_element);
                self.session.error(
                    module,
                    "P052",
                    "assembler registers exhausted.",
                    location,
                );
                None
            }
        }
    }

    pub(crate) fn free_operand(&mut self, operand: &Operand) {
        if let Operand::Register(register) = operand {
            if *register != Register::FP && *register != Register::SP {
                self.session.assembler_mut().free_reg(*register);
            }
        }
    }

    // ------------------------------------------------------------------
    // emission order, step by step

    /// Program entry, trap setup, and the jump into the start block.
    fn emit_bootstrap_block(&mut self) {
        let bootstrap = self.session.assembler_mut().make_label("_bootstrap");
        let start = self.session.assembler_mut().make_label("_start");
        let id = self.push_basic_block();
        {
            let block = self.session.assembler_mut().block_mut(id);
            block.comment("bootstrap");
            block.section(SectionKind::Text);
            block.label(bootstrap);
            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(start));
            block.blank();
        }
        self.pop_basic_block();
    }

    fn intern_string_literals(&mut self) {
        for literal in self.session.elements().find_by_kind(ElementKind::StringLiteral) {
            let value = match self.session.elements().get(literal).map(|e| &e.data) {
                Some(ElementData::StringLiteral { value }) => value.clone(),
                _ => continue,
            };
            let intern_id = self.session.intern_string(&value);
            self.string_labels
                .insert(literal, format!("_intern_str_lit_{intern_id}"));
        }
    }

    fn emit_interned_string_table(&mut self) {
        if self.session.interned_strings().is_empty() {
            return;
        }
        let entries: Vec<(String, Vec<u8>)> = self
            .session
            .interned_strings()
            .iter()
            .map(|(id, value)| {
                (format!("_intern_str_lit_{id}"), value.as_bytes().to_vec())
            })
            .collect();
        let id = self.push_basic_block();
        {
            let block = self.session.assembler_mut().block_mut(id);
            block.comment("interned string table");
            block.section(SectionKind::RoData);
        }
        for (label_name, bytes) in entries {
            let label = self.session.assembler_mut().make_label(&label_name);
            let block = self.session.assembler_mut().block_mut(id);
            block.label(label);
            block.data(OpSize::Dword, vec![bytes.len() as u64]);
            block.bytes(bytes);
        }
        {
            let block = self.session.assembler_mut().block_mut(id);
            block.blank();
        }
        self.pop_basic_block();
    }

    /// One record per type the program actually used: name then size.
    fn emit_type_table(&mut self) {
        let used: Vec<ElementId> = self.session.used_types().collect();
        if used.is_empty() {
            return;
        }
        let id = self.push_basic_block();
        {
            let block = self.session.assembler_mut().block_mut(id);
            block.comment("type info table");
            block.section(SectionKind::RoData);
        }
        for type_id in used {
            let name = types::display_name(self.session.elements(), type_id);
            if name.is_empty() {
                continue;
            }
            let size = self
                .session
                .elements()
                .get(type_id)
                .and_then(|e| e.type_header())
                .map(|h| h.size_in_bytes as u64)
                .unwrap_or(0);
            let label_name = format!("_ti_{}", name.replace(['^', '[', ']', ':'], "_"));
            let label = self.session.assembler_mut().make_label(&label_name);
            let block = self.session.assembler_mut().block_mut(id);
            block.label(label);
            block.data(OpSize::Dword, vec![name.len() as u64]);
            block.bytes(name.into_bytes());
            block.data(OpSize::Qword, vec![size]);
        }
        self.pop_basic_block();
    }

    /// Group module-scope identifiers (including those inside namespace
    /// scopes) by target section based on their constancy and
    /// initialisation state.
    fn group_identifiers(&mut self) -> FxHashMap<SectionKind, Vec<ElementId>> {
        let mut vars: FxHashMap<SectionKind, Vec<ElementId>> = FxHashMap::default();
        for module in self.session.elements().find_by_kind(ElementKind::Module) {
            let scope = match self.session.elements().get(module).map(|e| &e.data) {
                Some(ElementData::Module(data)) => data.scope,
                _ => None,
            };
            let Some(scope) = scope else { continue };
            for identifier in self.module_scope_identifiers(scope) {
                if !self.needs_storage(identifier) {
                    continue;
                }
                let flags = self.var_flags(identifier);
                let section = if flags.contains(VarFlags::CONSTANT | VarFlags::INITIALIZED) {
                    SectionKind::RoData
                } else if flags.contains(VarFlags::INITIALIZED) {
                    SectionKind::Data
                } else {
                    SectionKind::Bss
                };
                vars.entry(section).or_default().push(identifier);
            }
        }
        vars
    }

    /// The identifiers a module's scope contributes to the section
    /// tables, descending into namespace scopes.
    fn module_scope_identifiers(&self, scope: ElementId) -> Vec<ElementId> {
        let mut out = Vec::new();
        self.collect_scope_identifiers(scope, &mut out);
        out
    }

    fn collect_scope_identifiers(&self, scope: ElementId, out: &mut Vec<ElementId>) {
        let identifiers: Vec<ElementId> =
            match self.session.elements().get(scope).map(|e| &e.data) {
                Some(ElementData::Block(data)) => data.identifiers_in_order().collect(),
                _ => Vec::new(),
            };
        for identifier in identifiers {
            if let Some(namespace_scope) = self.namespace_scope_of(identifier) {
                self.collect_scope_identifiers(namespace_scope, out);
            } else {
                out.push(identifier);
            }
        }
    }

    fn namespace_scope_of(&self, identifier: ElementId) -> Option<ElementId> {
        let ElementData::Identifier(data) =
            &self.session.elements().get(identifier)?.data
        else {
            return None;
        };
        let initializer = data.initializer?;
        let ElementData::Initializer(init) = &self.session.elements().get(initializer)?.data
        else {
            return None;
        };
        let expression = init.expression?;
        match &self.session.elements().get(expression)?.data {
            ElementData::Namespace(namespace) => Some(namespace.scope),
            _ => None,
        }
    }

    fn var_flags(&self, identifier: ElementId) -> VarFlags {
        let mut flags = VarFlags::empty();
        if let Some(ElementData::Identifier(data)) =
            self.session.elements().get(identifier).map(|e| &e.data)
        {
            if data.constant {
                flags |= VarFlags::CONSTANT;
            }
            let initialized = data.initializer.is_some_and(|init| {
                match self.session.elements().get(init).map(|e| &e.data) {
                    Some(ElementData::Initializer(init_data)) => {
                        init_data.expression.is_some_and(|expr| {
                            self.session.elements().kind_of(expr)
                                != Some(ElementKind::UninitializedLiteral)
                        })
                    }
                    _ => false,
                }
            });
            if initialized {
                flags |= VarFlags::INITIALIZED;
            }
        }
        flags
    }

    /// Identifiers bound to types, namespaces, modules, or procedures
    /// occupy no storage.
    fn needs_storage(&self, identifier: ElementId) -> bool {
        let Some(type_id) = self.session.identifier_type(identifier) else {
            return false;
        };
        !matches!(
            self.session.elements().kind_of(type_id),
            Some(ElementKind::ProcedureType)
                | Some(ElementKind::NamespaceType)
                | Some(ElementKind::ModuleType)
                | Some(ElementKind::UnknownType)
        ) && !self.is_type_binding(identifier, type_id)
    }

    fn is_type_binding(&self, identifier: ElementId, type_id: ElementId) -> bool {
        // `T :: struct { ... }` binds the name to the type itself.
        matches!(
            self.session.elements().kind_of(type_id),
            Some(ElementKind::CompositeType)
        ) && matches!(
            self.session.elements().get(identifier).map(|e| &e.data),
            Some(ElementData::Identifier(data)) if data.initializer.is_none()
        )
    }

    /// One table per section: a label and sized cell (or reservation)
    /// for each grouped identifier.
    fn emit_section_tables(&mut self, vars: &FxHashMap<SectionKind, Vec<ElementId>>) {
        for section in [SectionKind::RoData, SectionKind::Data, SectionKind::Bss] {
            let Some(identifiers) = vars.get(&section) else {
                continue;
            };
            if identifiers.is_empty() {
                continue;
            }
            let id = self.push_basic_block();
            {
                let block = self.session.assembler_mut().block_mut(id);
                block.blank();
                block.section(section);
            }
            for &identifier in identifiers.clone().iter() {
                self.emit_section_variable(id, section, identifier);
            }
            self.pop_basic_block();
        }
    }

    fn emit_section_variable(
        &mut self,
        block_id: BlockId,
        section: SectionKind,
        identifier: ElementId,
    ) {
        let label_name = self.session.label_name(identifier);
        let label = self.session.assembler_mut().make_label(&label_name);
        let size = self
            .session
            .identifier_type(identifier)
            .and_then(|t| self.session.elements().get(t))
            .and_then(|e| e.type_header())
            .map(|h| h.size_in_bytes)
            .unwrap_or(8)
            .max(1);
        let op_size = OpSize::from_byte_size(size);
        let value = self
            .session
            .as_integer(identifier)
            .or_else(|| self.session.as_float(identifier).map(f64::to_bits))
            .or_else(|| self.session.as_bool(identifier).map(u64::from));
        let block = self.session.assembler_mut().block_mut(block_id);
        block.label(label);
        match (section, value) {
            (SectionKind::Bss, _) | (_, None) => block.reserve(op_size, 1),
            (_, Some(value)) => block.data(op_size, vec![value]),
        }
    }

    /// Prologue, body, epilogue for every procedure with a body.
    fn emit_procedure_types(&mut self) -> bool {
        for proc_type in self
            .session
            .elements()
            .find_by_kind(ElementKind::ProcedureType)
        {
            let Some(ElementData::ProcedureType(data)) =
                self.session.elements().get(proc_type).map(|e| e.data.clone())
            else {
                continue;
            };
            if data.is_intrinsic || data.is_foreign || data.body.is_none() {
                continue;
            }
            if !self.emit_procedure_instance(proc_type, &data) {
                return false;
            }
        }
        true
    }

    /// Call the root module's initializer, then exit cleanly.
    fn emit_start_block(&mut self) {
        let has_modules = !self
            .session
            .elements()
            .find_by_kind(ElementKind::Module)
            .is_empty();
        let start = self.session.assembler_mut().make_label("_start");
        let root_init = has_modules
            .then(|| self.session.assembler_mut().make_label("_module_init_0"));
        let id = self.push_basic_block();
        {
            let block = self.session.assembler_mut().block_mut(id);
            block.blank();
            block.comment("start");
            block.section(SectionKind::Text);
            block.label(start);
            if let Some(root_init) = root_init {
                block.op1(OpCode::Call, OpSize::Qword, Operand::Label(root_init));
            }
            block.op1(OpCode::Push, OpSize::Qword, Operand::Immediate(0));
            block.op0(OpCode::Exit);
        }
        self.pop_basic_block();
    }

    /// One implicit block per module: its non-declaration top-level
    /// statements run as the module's initializer.
    fn emit_implicit_blocks(&mut self) -> bool {
        let modules = self.session.elements().find_by_kind(ElementKind::Module);
        for (index, module) in modules.iter().copied().enumerate() {
            let scope = match self.session.elements().get(module).map(|e| &e.data) {
                Some(ElementData::Module(data)) => data.scope,
                _ => None,
            };
            let Some(scope) = scope else { continue };
            let label_name = format!("_module_init_{index}");
            let label = self.session.assembler_mut().make_label(&label_name);
            let id = self.push_basic_block();
            {
                let block = self.session.assembler_mut().block_mut(id);
                block.blank();
                block.comment(format!("module initializer {index}"));
                block.section(SectionKind::Text);
                block.label(label);
            }
            self.reset_temp();
            let statements: Vec<ElementId> =
                match self.session.elements().get(scope).map(|e| &e.data) {
                    Some(ElementData::Block(data)) => data.statements.clone(),
                    _ => Vec::new(),
                };
            for statement in statements {
                if self.is_declaration_statement(statement) {
                    continue;
                }
                if self.emit_element(statement).is_none() {
                    return false;
                }
            }
            if !self.emit_module_var_initializers(scope) {
                return false;
            }
            self.with_block(|block| block.op0(OpCode::Ret));
            self.pop_basic_block();
        }
        true
    }

    /// Store non-constant initializer values into their section slots.
    /// Constant values were baked into the data section directly.
    fn emit_module_var_initializers(&mut self, scope: ElementId) -> bool {
        for identifier in self.module_scope_identifiers(scope) {
            if !self.needs_storage(identifier) {
                continue;
            }
            let flags = self.var_flags(identifier);
            if !flags.contains(VarFlags::INITIALIZED) || flags.contains(VarFlags::CONSTANT) {
                continue;
            }
            let expression = match self.session.elements().get(identifier).map(|e| &e.data) {
                Some(ElementData::Identifier(data)) => data.initializer.and_then(|init| {
                    match self.session.elements().get(init).map(|e| &e.data) {
                        Some(ElementData::Initializer(init_data)) => init_data.expression,
                        _ => None,
                    }
                }),
                _ => None,
            };
            let Some(expression) = expression else { continue };
            let Some(result) = self.emit_element(expression) else {
                return false;
            };
            let Some(value) = result.operand else { continue };
            let size = self
                .session
                .identifier_type(identifier)
                .and_then(|t| self.session.elements().get(t))
                .and_then(|e| e.type_header())
                .map(|h| h.size_in_bytes)
                .unwrap_or(8);
            let label_name = self.session.label_name(identifier);
            let label = self.session.assembler_mut().make_label(&label_name);
            self.with_block(|block| {
                block.op2(
                    OpCode::Store,
                    OpSize::from_byte_size(size),
                    Operand::Label(label),
                    value.clone(),
                );
            });
            self.free_operand(&value);
        }
        true
    }

    fn is_declaration_statement(&self, statement: ElementId) -> bool {
        let expression = match self.session.elements().get(statement).map(|e| &e.data) {
            Some(ElementData::Statement(data)) => data.expression,
            _ => None,
        };
        matches!(
            expression.and_then(|e| self.session.elements().kind_of(e)),
            Some(ElementKind::Declaration)
                | Some(ElementKind::Namespace)
                | Some(ElementKind::Import)
                | Some(ElementKind::Comment)
                | None
        )
    }

    /// Number class of an element's inferred type; integer by default.
    pub(crate) fn number_class_of(&mut self, element: ElementId) -> NumberClass {
        let Some(type_id) = self.session.infer_type_of(element) else {
            return NumberClass::Integer;
        };
        match self
            .session
            .elements()
            .get(type_id)
            .map(|e| e.number_class())
        {
            Some(NumberClass::Float) => NumberClass::Float,
            _ => NumberClass::Integer,
        }
    }

    pub(crate) fn register_class_of(&mut self, element: ElementId) -> RegisterClass {
        match self.number_class_of(element) {
            NumberClass::Float => RegisterClass::Float,
            _ => RegisterClass::Integer,
        }
    }

    pub(crate) fn string_label(&self, literal: ElementId) -> Option<&str> {
        self.string_labels.get(&literal).map(String::as_str)
    }

    pub(crate) fn local_offset(&self, identifier: ElementId) -> Option<i64> {
        self.locals.get(&identifier).copied()
    }

    pub(crate) fn set_local_offset(&mut self, identifier: ElementId, offset: i64) {
        self.locals.insert(identifier, offset);
    }

    pub(crate) fn clear_locals(&mut self) {
        self.locals.clear();
    }

    pub(crate) fn session(&mut self) -> &mut Session {
        self.session
    }

    pub(crate) fn session_ref(&self) -> &Session {
        self.session
    }

    pub(crate) fn set_epilogue(&mut self, label: Option<LabelId>) {
        self.epilogue_label = label;
    }

    pub(crate) fn epilogue(&self) -> Option<LabelId> {
        self.epilogue_label
    }
}
