//! Instruction blocks.
//!
//! A block is an ordered run of entries - label definitions, instructions,
//! data declarations, section switches, and listing commentary - emitted
//! for one procedure or implicit block. Blocks are assembled in creation
//! order.

use crate::label::LabelId;
use crate::op::{Instruction, OpCode, OpSize, Operand};

/// Index of a block within the assembler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct BlockId(u32);

impl BlockId {
    #[inline]
    pub(crate) const fn new(index: usize) -> Self {
        BlockId(index as u32)
    }

    #[inline]
    pub const fn index(self) -> usize {
        self.0 as usize
    }
}

/// Target section for data entries.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum SectionKind {
    Text,
    RoData,
    Data,
    Bss,
}

impl SectionKind {
    pub const fn name(self) -> &'static str {
        match self {
            SectionKind::Text => "text",
            SectionKind::RoData => "ro_data",
            SectionKind::Data => "data",
            SectionKind::Bss => "bss",
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum BlockEntry {
    Label(LabelId),
    Instruction(Instruction),
    Section(SectionKind),
    /// Initialized data cells of uniform width.
    Data { size: OpSize, values: Vec<u64> },
    /// Raw bytes (interned string storage).
    Bytes(Vec<u8>),
    /// Uninitialized reservation (bss).
    Reserve { size: OpSize, count: usize },
    Comment(String),
    Blank,
}

impl BlockEntry {
    /// Number of bytes this entry occupies in the final image.
    pub fn byte_size(&self) -> u64 {
        match self {
            BlockEntry::Instruction(instruction) => instruction.encoded_size(),
            BlockEntry::Data { size, values } => (size.byte_size() * values.len()) as u64,
            BlockEntry::Bytes(bytes) => bytes.len() as u64,
            BlockEntry::Reserve { size, count } => (size.byte_size() * count) as u64,
            BlockEntry::Label(_)
            | BlockEntry::Section(_)
            | BlockEntry::Comment(_)
            | BlockEntry::Blank => 0,
        }
    }
}

#[derive(Debug, Default)]
pub struct InstructionBlock {
    entries: Vec<BlockEntry>,
}

impl InstructionBlock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> &[BlockEntry] {
        &self.entries
    }

    pub fn entries_mut(&mut self) -> &mut [BlockEntry] {
        &mut self.entries
    }

    pub fn push(&mut self, entry: BlockEntry) {
        self.entries.push(entry);
    }

    pub fn label(&mut self, id: LabelId) {
        self.entries.push(BlockEntry::Label(id));
    }

    pub fn instruction(&mut self, instruction: Instruction) {
        self.entries.push(BlockEntry::Instruction(instruction));
    }

    pub fn section(&mut self, section: SectionKind) {
        self.entries.push(BlockEntry::Section(section));
    }

    pub fn data(&mut self, size: OpSize, values: Vec<u64>) {
        self.entries.push(BlockEntry::Data { size, values });
    }

    pub fn bytes(&mut self, bytes: Vec<u8>) {
        self.entries.push(BlockEntry::Bytes(bytes));
    }

    pub fn reserve(&mut self, size: OpSize, count: usize) {
        self.entries.push(BlockEntry::Reserve { size, count });
    }

    pub fn comment(&mut self, text: impl Into<String>) {
        self.entries.push(BlockEntry::Comment(text.into()));
    }

    pub fn blank(&mut self) {
        self.entries.push(BlockEntry::Blank);
    }

    // typed emission helpers

    pub fn op0(&mut self, op: OpCode) {
        self.instruction(Instruction::op0(op));
    }

    pub fn op1(&mut self, op: OpCode, size: OpSize, a: Operand) {
        self.instruction(Instruction::op1(op, size, a));
    }

    pub fn op2(&mut self, op: OpCode, size: OpSize, a: Operand, b: Operand) {
        self.instruction(Instruction::op2(op, size, a, b));
    }

    pub fn op3(&mut self, op: OpCode, size: OpSize, a: Operand, b: Operand, c: Operand) {
        self.instruction(Instruction::op3(op, size, a, b, c));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_sizes_cover_layout() {
        assert_eq!(BlockEntry::Blank.byte_size(), 0);
        assert_eq!(
            BlockEntry::Data {
                size: OpSize::Dword,
                values: vec![1, 2, 3]
            }
            .byte_size(),
            12
        );
        assert_eq!(
            BlockEntry::Reserve {
                size: OpSize::Byte,
                count: 32
            }
            .byte_size(),
            32
        );
    }
}
