//! Common types and utilities for the alpha bootstrap compiler.
//!
//! This crate provides foundational types used across all alpha crates:
//! - Stable ids (`Id`, `IdPool`)
//! - Source locations (`Position`, `SourceLocation`, `SourceFile`)
//! - Qualified symbols (`QualifiedSymbol`)
//! - Diagnostics and the accumulated `CompileResult`
//! - Numeric type properties and literal narrowing
//! - Centralized limits and thresholds
//! - The per-thread ambient context stack

// Stable id allocation
pub mod id;
pub use id::{Id, IdPool, next_id};

// Source locations and source files
pub mod source;
pub use source::{Position, SourceFile, SourceLocation};

// Qualified symbols
pub mod symbol;
pub use symbol::QualifiedSymbol;

// Diagnostics and the session result object
pub mod diagnostics;
pub use diagnostics::{CompileResult, Diagnostic, Severity};

// Numeric type properties and literal narrowing
pub mod numeric;
pub use numeric::NumberClass;

// Centralized limits and thresholds
pub mod limits;

// Per-thread ambient context stack
pub mod context;
