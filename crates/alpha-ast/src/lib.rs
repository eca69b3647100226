//! Syntax tree types for the alpha compiler.
//!
//! The parser is a separate front-end; this crate pins down the interface
//! between it and the semantic core:
//! - `Token` / `TokenKind` - lexical atoms carried by nodes
//! - `AstArena` / `AstNode` / `NodeId` - the node store handed to the evaluator
//! - `AstBuilder` - construction helpers used by the parser and by tests
//! - `ModuleParser` - the callback the session drives per source file

pub mod token;
pub use token::{Token, TokenKind};

pub mod node;
pub use node::{AstArena, AstNode, AstNodeKind, NodeId};

pub mod builder;
pub use builder::AstBuilder;

use alpha_common::{CompileResult, SourceFile};

/// The parser collaborator.
///
/// Given a source file, produce the module's root node into `builder` and
/// return its id, or record diagnostics into `result` and return `None`.
pub trait ModuleParser {
    fn parse(
        &mut self,
        source: &SourceFile,
        builder: &mut AstBuilder,
        result: &mut CompileResult,
    ) -> Option<NodeId>;
}
