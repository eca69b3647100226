//! Per-thread ambient context stack.
//!
//! A fixed-capacity LIFO of [`Context`] values. Each thread carries its
//! own stack; push/pop are strict last-in-first-out and fail loudly on
//! overflow or underflow. The stack never auto-grows.

use crate::limits::CONTEXT_STACK_CAPACITY;
use std::cell::RefCell;

/// Ambient state visible to the current thread.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Context {
    /// Name of the active allocator (e.g. `"system"`, `"slab"`).
    pub allocator: String,
    /// Target name the active logger writes under.
    pub logger: String,
}

impl Context {
    pub fn new(allocator: impl Into<String>, logger: impl Into<String>) -> Self {
        Context {
            allocator: allocator.into(),
            logger: logger.into(),
        }
    }
}

thread_local! {
    static CONTEXT_STACK: RefCell<Vec<Context>> =
        RefCell::new(Vec::with_capacity(CONTEXT_STACK_CAPACITY));
}

/// Push a context. Panics when the stack is full.
pub fn push(context: Context) {
    CONTEXT_STACK.with(|stack| {
        let mut stack = stack.borrow_mut();
        assert!(
            stack.len() < CONTEXT_STACK_CAPACITY,
            "context stack overflow"
        );
        stack.push(context);
    });
}

/// Pop the current context. Panics on an empty stack.
pub fn pop() -> Context {
    CONTEXT_STACK.with(|stack| {
        stack
            .borrow_mut()
            .pop()
            .expect("context stack underflow")
    })
}

/// The current context. Panics on an empty stack.
pub fn top() -> Context {
    CONTEXT_STACK.with(|stack| {
        stack
            .borrow()
            .last()
            .cloned()
            .expect("context stack underflow")
    })
}

/// Number of contexts currently pushed on this thread.
pub fn depth() -> usize {
    CONTEXT_STACK.with(|stack| stack.borrow().len())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn push_top_pop_is_lifo() {
        push(Context::new("system", "root"));
        push(Context::new("slab", "compiler"));
        assert_eq!(top().allocator, "slab");
        assert_eq!(pop().logger, "compiler");
        assert_eq!(top().allocator, "system");
        pop();
        assert_eq!(depth(), 0);
    }

    #[test]
    fn pop_on_empty_stack_panics() {
        // Runs on its own thread because thread_local state is per-thread.
        let result = std::thread::spawn(|| pop()).join();
        assert!(result.is_err());
    }

    #[test]
    fn each_thread_has_its_own_stack() {
        push(Context::new("system", "main"));
        let other_depth = std::thread::spawn(depth).join().unwrap();
        assert_eq!(other_depth, 0);
        pop();
    }
}
