//! Centralized limits and thresholds for the alpha compiler.
//!
//! Shared constants for stack capacities, iteration caps, and resource
//! pools. Centralizing these values prevents duplicate definitions with
//! inconsistent values and documents the rationale for each limit.

/// Capacity of the per-thread ambient context stack.
///
/// The stack never grows; push past this limit is a fatal logic error.
pub const CONTEXT_STACK_CAPACITY: usize = 512;

/// Maximum number of enclosing scopes a lookup will walk before giving up.
///
/// Guards against cycles introduced by corrupted parent-scope links; a
/// well-formed graph never approaches this depth.
pub const MAX_SCOPE_WALK_DEPTH: usize = 10_000;

/// Maximum sweeps of the unknown-type worklist per resolution pass.
///
/// Each sweep either shrinks the worklist or the pass stops, so this cap
/// only bounds pathological inputs.
pub const MAX_TYPE_RESOLUTION_SWEEPS: usize = 64;

/// Number of general-purpose registers per class (integer, float) in the
/// target register file.
pub const REGISTER_FILE_SIZE: usize = 64;

/// Upper bound on temporaries a single procedure body may allocate.
pub const MAX_TEMP_REGISTERS: u8 = u8::MAX;
