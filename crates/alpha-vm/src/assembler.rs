//! The assembler.
//!
//! Collects instruction blocks from the emitter, then runs three passes:
//! symbol resolution (compiler symbols become literals or labels), address
//! layout, label resolution, and finally encoding into the byte stream.
//! A textual listing of every block is maintained for the listing file.

use crate::block::{BlockEntry, BlockId, InstructionBlock};
use crate::label::{LabelId, LabelTable};
use crate::op::{Instruction, Operand, Register, RegisterClass};
use crate::registers::RegisterAllocator;
use alpha_common::{CompileResult, Id, SourceLocation};
use indexmap::IndexMap;
use tracing::debug;

/// What kind of compiler symbol the resolver callback is being asked about.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AssemblySymbolKind {
    /// A module-scope identifier.
    Module,
    /// A local label.
    Label,
}

/// The compiler's answer for a symbol: a literal value when the constant
/// is known, otherwise the label the symbol's storage lives under.
#[derive(Clone, Debug, PartialEq)]
pub enum AssemblySymbolValue {
    Integer(u64),
    Float(f64),
    Label(String),
}

/// Resolver callback: `(kind, scope, name) -> value`.
///
/// `scope` is the id of the block element the reference appeared in, when
/// the emitter knows it.
pub type SymbolResolver<'a> =
    dyn FnMut(AssemblySymbolKind, Option<Id>, &str) -> Option<AssemblySymbolValue> + 'a;

/// Per-source-file listing text.
#[derive(Debug, Default)]
pub struct AssemblyListing {
    files: IndexMap<String, Vec<String>>,
    selected: Option<String>,
}

impl AssemblyListing {
    pub fn add_source_file(&mut self, name: impl Into<String>) {
        self.files.entry(name.into()).or_default();
    }

    pub fn select_source_file(&mut self, name: &str) {
        if self.files.contains_key(name) {
            self.selected = Some(name.to_string());
        }
    }

    pub fn append_line(&mut self, line: impl Into<String>) {
        if let Some(selected) = &self.selected {
            if let Some(lines) = self.files.get_mut(selected) {
                lines.push(line.into());
            }
        }
    }

    pub fn source_files(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    pub fn text(&self) -> String {
        let mut out = String::new();
        for (name, lines) in &self.files {
            out.push_str("; listing: ");
            out.push_str(name);
            out.push('\n');
            for line in lines {
                out.push_str(line);
                out.push('\n');
            }
        }
        out
    }
}

#[derive(Debug, Default)]
pub struct Assembler {
    blocks: Vec<InstructionBlock>,
    labels: LabelTable,
    registers: RegisterAllocator,
    listing: AssemblyListing,
    addresses_applied: bool,
}

impl Assembler {
    pub fn new() -> Self {
        Self::default()
    }

    // ------------------------------------------------------------------
    // block management

    pub fn make_basic_block(&mut self) -> BlockId {
        let id = BlockId::new(self.blocks.len());
        self.blocks.push(InstructionBlock::new());
        id
    }

    pub fn block(&self, id: BlockId) -> &InstructionBlock {
        &self.blocks[id.index()]
    }

    pub fn block_mut(&mut self, id: BlockId) -> &mut InstructionBlock {
        &mut self.blocks[id.index()]
    }

    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    // ------------------------------------------------------------------
    // labels & registers

    pub fn make_label(&mut self, name: &str) -> LabelId {
        self.labels.intern(name)
    }

    pub fn label_name(&self, id: LabelId) -> &str {
        self.labels.name(id)
    }

    pub fn label_address(&self, id: LabelId) -> Option<u64> {
        self.labels.address(id)
    }

    pub fn allocate_reg(&mut self, class: RegisterClass) -> Option<Register> {
        self.registers.allocate(class)
    }

    pub fn free_reg(&mut self, register: Register) {
        self.registers.release(register);
    }

    pub fn listing(&self) -> &AssemblyListing {
        &self.listing
    }

    pub fn listing_mut(&mut self) -> &mut AssemblyListing {
        &mut self.listing
    }

    // ------------------------------------------------------------------
    // passes

    /// Replace named-symbol operands using the compiler's resolver.
    pub fn resolve_symbols(
        &mut self,
        resolver: &mut SymbolResolver<'_>,
        result: &mut CompileResult,
    ) -> bool {
        let mut unresolved = 0usize;
        let Assembler { blocks, labels, .. } = self;
        for block in blocks.iter_mut() {
            for entry in block.entries_mut() {
                let BlockEntry::Instruction(instruction) = entry else {
                    continue;
                };
                for operand in instruction.operands.iter_mut() {
                    let Operand::Symbol(name) = operand else {
                        continue;
                    };
                    match resolver(AssemblySymbolKind::Module, None, name) {
                        Some(AssemblySymbolValue::Integer(value)) => {
                            *operand = Operand::Immediate(value);
                        }
                        Some(AssemblySymbolValue::Float(value)) => {
                            *operand = Operand::ImmediateFloat(value);
                        }
                        Some(AssemblySymbolValue::Label(label)) => {
                            *operand = Operand::Label(labels.intern(&label));
                        }
                        None => {
                            unresolved += 1;
                            result.error(
                                "X012",
                                format!("unresolved assembly symbol: {name}"),
                                SourceLocation::default(),
                            );
                        }
                    }
                }
            }
        }
        unresolved == 0
    }

    /// Assign a byte address to every entry and define labels at their
    /// offsets. Duplicate label definitions are diagnosed.
    pub fn apply_addresses(&mut self, result: &mut CompileResult) -> bool {
        let mut address = 0u64;
        let mut success = true;
        for block in &self.blocks {
            for entry in block.entries() {
                if let BlockEntry::Label(id) = entry {
                    if !self.labels.define(*id, address) {
                        success = false;
                        result.error(
                            "X010",
                            format!("duplicate label definition: {}", self.labels.name(*id)),
                            SourceLocation::default(),
                        );
                    }
                }
                address += entry.byte_size();
            }
        }
        self.addresses_applied = success;
        debug!(total_bytes = address, "assembler: addresses applied");
        success
    }

    /// Verify every label operand refers to a defined label.
    pub fn resolve_labels(&mut self, result: &mut CompileResult) -> bool {
        let mut success = true;
        for block in &self.blocks {
            for entry in block.entries() {
                let BlockEntry::Instruction(instruction) = entry else {
                    continue;
                };
                for operand in &instruction.operands {
                    if let Operand::Label(id) = operand {
                        if !self.labels.is_defined(*id) {
                            success = false;
                            result.error(
                                "X011",
                                format!("unresolved label: {}", self.labels.name(*id)),
                                SourceLocation::default(),
                            );
                        }
                    }
                }
            }
        }
        success
    }

    /// Encode all blocks into the final byte stream. Addresses must have
    /// been applied first.
    pub fn assemble(&mut self, result: &mut CompileResult) -> Option<Vec<u8>> {
        if !self.addresses_applied {
            result.error(
                "X013",
                "assemble called before addresses were applied",
                SourceLocation::default(),
            );
            return None;
        }
        let mut image = Vec::new();
        for block in &self.blocks {
            for entry in block.entries() {
                match entry {
                    BlockEntry::Instruction(instruction) => {
                        encode_instruction(instruction, &self.labels, &mut image);
                    }
                    BlockEntry::Data { size, values } => {
                        for value in values {
                            image.extend_from_slice(&value.to_le_bytes()[..size.byte_size()]);
                        }
                    }
                    BlockEntry::Bytes(bytes) => image.extend_from_slice(bytes),
                    BlockEntry::Reserve { size, count } => {
                        image.resize(image.len() + size.byte_size() * count, 0);
                    }
                    BlockEntry::Label(_)
                    | BlockEntry::Section(_)
                    | BlockEntry::Comment(_)
                    | BlockEntry::Blank => {}
                }
            }
        }
        Some(image)
    }

    /// Render every block in listing form and append it to the selected
    /// listing file.
    pub fn disassemble(&mut self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            for entry in block.entries() {
                let line = self.format_entry(entry);
                out.push_str(&line);
                out.push('\n');
            }
        }
        for line in out.lines() {
            self.listing.append_line(line.to_string());
        }
        out
    }

    fn format_entry(&self, entry: &BlockEntry) -> String {
        match entry {
            BlockEntry::Label(id) => format!("{}:", self.labels.name(*id)),
            BlockEntry::Instruction(instruction) => {
                let operands: Vec<String> = instruction
                    .operands
                    .iter()
                    .map(|operand| self.format_operand(operand))
                    .collect();
                if operands.is_empty() {
                    format!("    {}", instruction.op.mnemonic())
                } else {
                    format!(
                        "    {}.{} {}",
                        instruction.op.mnemonic(),
                        instruction.size.suffix(),
                        operands.join(", ")
                    )
                }
            }
            BlockEntry::Section(section) => format!(".section {}", section.name()),
            BlockEntry::Data { size, values } => {
                let cells: Vec<String> = values.iter().map(|v| format!("{v}")).collect();
                format!("    .d{} {}", size.suffix(), cells.join(", "))
            }
            BlockEntry::Bytes(bytes) => format!("    .bytes {}", bytes.len()),
            BlockEntry::Reserve { size, count } => {
                format!("    .reserve {} x {}", size.suffix(), count)
            }
            BlockEntry::Comment(text) => format!("; {text}"),
            BlockEntry::Blank => String::new(),
        }
    }

    fn format_operand(&self, operand: &Operand) -> String {
        match operand {
            Operand::Register(register) => register.to_string(),
            Operand::Immediate(value) => format!("#{value}"),
            Operand::ImmediateFloat(value) => format!("#{value}"),
            Operand::Label(id) => self.labels.name(*id).to_string(),
            Operand::Slot(offset) => format!("[fp{offset:+}]"),
            Operand::Symbol(name) => format!("@{name}"),
        }
    }
}

fn encode_instruction(instruction: &Instruction, labels: &LabelTable, image: &mut Vec<u8>) {
    image.push(instruction.op as u8);
    image.push(instruction.size.byte_size() as u8);
    image.push(instruction.operands.len() as u8);
    image.push(0);
    for operand in &instruction.operands {
        let (tag, payload): (u8, u64) = match operand {
            Operand::Register(register) => {
                let class_bit = match register.class {
                    RegisterClass::Integer => 0u64,
                    RegisterClass::Float => 1u64 << 8,
                };
                (0, class_bit | register.number as u64)
            }
            Operand::Immediate(value) => (1, *value),
            Operand::ImmediateFloat(value) => (2, value.to_bits()),
            Operand::Label(id) => (3, labels.address(*id).unwrap_or(0)),
            Operand::Slot(offset) => (4, *offset as u64),
            Operand::Symbol(_) => (5, 0),
        };
        image.push(tag);
        image.extend_from_slice(&[0, 0, 0]);
        image.extend_from_slice(&payload.to_le_bytes());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::op::{OpCode, OpSize};

    #[test]
    fn addresses_and_labels_resolve() {
        let mut assembler = Assembler::new();
        let mut result = CompileResult::new();
        let entry = assembler.make_label("_entry");
        let exit = assembler.make_label("_exit");
        let block = assembler.make_basic_block();
        {
            let block = assembler.block_mut(block);
            block.label(entry);
            block.op0(OpCode::Nop);
            block.op1(OpCode::Jmp, OpSize::Qword, Operand::Label(exit));
            block.label(exit);
            block.op0(OpCode::Exit);
        }
        assert!(assembler.apply_addresses(&mut result));
        assert!(assembler.resolve_labels(&mut result));
        assert_eq!(assembler.label_address(entry), Some(0));
        // nop = 4 bytes, jmp with one operand = 16 bytes
        assert_eq!(assembler.label_address(exit), Some(20));
        let image = assembler.assemble(&mut result).unwrap();
        assert_eq!(image.len(), 24);
        assert!(!result.is_failed());
    }

    #[test]
    fn duplicate_label_definition_is_diagnosed() {
        let mut assembler = Assembler::new();
        let mut result = CompileResult::new();
        let label = assembler.make_label("twice");
        let block = assembler.make_basic_block();
        {
            let block = assembler.block_mut(block);
            block.label(label);
            block.op0(OpCode::Nop);
            block.label(label);
        }
        assert!(!assembler.apply_addresses(&mut result));
        assert!(result.has_code("X010"));
    }

    #[test]
    fn unresolved_label_is_diagnosed() {
        let mut assembler = Assembler::new();
        let mut result = CompileResult::new();
        let missing = assembler.make_label("nowhere");
        let block = assembler.make_basic_block();
        assembler
            .block_mut(block)
            .op1(OpCode::Jmp, OpSize::Qword, Operand::Label(missing));
        assembler.apply_addresses(&mut result);
        assert!(!assembler.resolve_labels(&mut result));
        assert!(result.has_code("X011"));
    }

    #[test]
    fn symbols_resolve_to_literals_or_labels() {
        let mut assembler = Assembler::new();
        let mut result = CompileResult::new();
        let block = assembler.make_basic_block();
        {
            let block = assembler.block_mut(block);
            block.op2(
                OpCode::Move,
                OpSize::Dword,
                Operand::Register(Register::integer(0)),
                Operand::Symbol("limit".into()),
            );
            block.op1(OpCode::Call, OpSize::Qword, Operand::Symbol("main".into()));
        }
        let mut resolver = |_kind: AssemblySymbolKind, _scope: Option<Id>, name: &str| match name {
            "limit" => Some(AssemblySymbolValue::Integer(99)),
            "main" => Some(AssemblySymbolValue::Label("_main".into())),
            _ => None,
        };
        assert!(assembler.resolve_symbols(&mut resolver, &mut result));
        let entries = assembler.block(block).entries();
        let BlockEntry::Instruction(mov) = &entries[0] else {
            panic!("expected instruction");
        };
        assert_eq!(mov.operands[1], Operand::Immediate(99));
    }

    #[test]
    fn listing_collects_disassembly() {
        let mut assembler = Assembler::new();
        assembler.listing_mut().add_source_file("main.basm");
        assembler.listing_mut().select_source_file("main.basm");
        let label = assembler.make_label("_start");
        let block = assembler.make_basic_block();
        {
            let block = assembler.block_mut(block);
            block.label(label);
            block.op0(OpCode::Ret);
        }
        let text = assembler.disassemble();
        assert!(text.contains("_start:"));
        assert!(text.contains("    ret"));
        assert!(assembler.listing().text().contains("main.basm"));
    }
}
