//! The execution engine interface.
//!
//! The terp executes the encoded byte stream produced by the assembler.
//! The compiler only depends on a narrow surface: trap registration, the
//! operand stack traps read from, and `run`. The decoder here handles the
//! control subset needed by compile-time `#run` execution; arithmetic on
//! real programs is the engine's own concern.

use alpha_common::{CompileResult, SourceLocation};
use rustc_hash::FxHashMap;

/// Trap id: write one character from the operand stack to stdout.
pub const TRAP_PUTC: u8 = 1;
/// Trap id: read one character from stdin onto the operand stack.
pub const TRAP_GETC: u8 = 2;

#[derive(Debug, Default)]
pub struct OperandStack {
    values: Vec<u64>,
}

impl OperandStack {
    pub fn push(&mut self, value: u64) {
        self.values.push(value);
    }

    pub fn pop(&mut self) -> Option<u64> {
        self.values.pop()
    }

    pub fn depth(&self) -> usize {
        self.values.len()
    }
}

pub type TrapHandler = Box<dyn FnMut(&mut OperandStack)>;

pub struct Terp {
    stack: OperandStack,
    traps: FxHashMap<u8, TrapHandler>,
    heap_size: usize,
    stack_size: usize,
}

impl Terp {
    pub fn new(heap_size: usize, stack_size: usize) -> Self {
        Terp {
            stack: OperandStack::default(),
            traps: FxHashMap::default(),
            heap_size,
            stack_size,
        }
    }

    pub fn heap_size(&self) -> usize {
        self.heap_size
    }

    pub fn stack_size(&self) -> usize {
        self.stack_size
    }

    pub fn register_trap(&mut self, id: u8, handler: TrapHandler) {
        self.traps.insert(id, handler);
    }

    pub fn push(&mut self, value: u64) {
        self.stack.push(value);
    }

    pub fn pop(&mut self) -> Option<u64> {
        self.stack.pop()
    }

    /// Execute `image` from offset zero until `exit` or the end of the
    /// stream. Only the control subset is decoded: `nop`, `push`, `pop`,
    /// `trap`, `jmp`, `exit`. Anything else halts with a diagnostic.
    pub fn run(&mut self, image: &[u8], result: &mut CompileResult) -> bool {
        use crate::op::OpCode;
        let mut pc = 0usize;
        while pc + 4 <= image.len() {
            let opcode = image[pc];
            let operand_count = image[pc + 2] as usize;
            let operands_at = pc + 4;
            let next = operands_at + operand_count * 12;
            let operand = |index: usize| -> u64 {
                let at = operands_at + index * 12 + 4;
                let mut bytes = [0u8; 8];
                bytes.copy_from_slice(&image[at..at + 8]);
                u64::from_le_bytes(bytes)
            };
            match opcode {
                x if x == OpCode::Nop as u8 => pc = next,
                x if x == OpCode::Push as u8 => {
                    self.stack.push(operand(0));
                    pc = next;
                }
                x if x == OpCode::Pop as u8 => {
                    self.stack.pop();
                    pc = next;
                }
                x if x == OpCode::Trap as u8 => {
                    let id = operand(0) as u8;
                    if let Some(mut handler) = self.traps.remove(&id) {
                        handler(&mut self.stack);
                        self.traps.insert(id, handler);
                    }
                    pc = next;
                }
                x if x == OpCode::Jmp as u8 => {
                    pc = operand(0) as usize;
                }
                x if x == OpCode::Exit as u8 => return true,
                other => {
                    result.error(
                        "X020",
                        format!("terp: unsupported instruction at {pc}: opcode {other}"),
                        SourceLocation::default(),
                    );
                    return false;
                }
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn traps_read_the_operand_stack() {
        let mut terp = Terp::new(1024, 1024);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        terp.register_trap(
            TRAP_PUTC,
            Box::new(move |stack| {
                if let Some(value) = stack.pop() {
                    sink.borrow_mut().push(value);
                }
            }),
        );
        terp.push(b'A' as u64);
        let image = {
            // trap #1 ; exit
            let mut bytes = vec![];
            bytes.extend_from_slice(&[crate::op::OpCode::Trap as u8, 8, 1, 0]);
            bytes.extend_from_slice(&[1, 0, 0, 0]);
            bytes.extend_from_slice(&1u64.to_le_bytes());
            bytes.extend_from_slice(&[crate::op::OpCode::Exit as u8, 8, 0, 0]);
            bytes
        };
        let mut result = CompileResult::new();
        assert!(terp.run(&image, &mut result));
        assert_eq!(*seen.borrow(), vec![b'A' as u64]);
    }

    #[test]
    fn unsupported_opcode_is_diagnosed() {
        let mut terp = Terp::new(0, 0);
        let image = vec![crate::op::OpCode::Mul as u8, 8, 0, 0];
        let mut result = CompileResult::new();
        assert!(!terp.run(&image, &mut result));
        assert!(result.has_code("X020"));
    }
}
