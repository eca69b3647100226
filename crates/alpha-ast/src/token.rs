//! Lexical tokens.
//!
//! Tokens reach the semantic core attached to AST nodes; the evaluator
//! reads the kind to pick operators and the lexeme to parse literals.

use alpha_common::SourceLocation;
use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TokenKind {
    // literals & names
    Identifier,
    Number,
    String,
    Character,
    True,
    False,
    Nil,
    Uninitialized,

    // unary operator tokens
    Tilde,
    Bang,

    // binary operator tokens (Minus and Caret are also unary)
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Caret,
    Ampersand,
    Pipe,
    Xor,
    Shl,
    Shr,
    Rol,
    Ror,
    Exponent,
    Equals,
    NotEquals,
    LessThan,
    LessThanEqual,
    GreaterThan,
    GreaterThanEqual,
    LogicalAnd,
    LogicalOr,
    Assignment,
    Period,

    // punctuation
    Comma,
    Colon,
    Semicolon,
    Spread,

    // keywords
    Proc,
    If,
    ElseIf,
    Else,
    While,
    For,
    In,
    Break,
    Continue,
    Return,
    Defer,
    With,
    Switch,
    Case,
    Fallthrough,
    Namespace,
    Struct,
    Enum,
    Union,
    Import,
    Module,

    // structure
    Directive,
    Attribute,
    Label,
    LineComment,
    BlockComment,
    EndOfFile,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Token {
    pub kind: TokenKind,
    pub value: String,
    pub location: SourceLocation,
}

impl Token {
    pub fn new(kind: TokenKind, value: impl Into<String>) -> Self {
        Token {
            kind,
            value: value.into(),
            location: SourceLocation::default(),
        }
    }

    pub fn with_location(mut self, location: SourceLocation) -> Self {
        self.location = location;
        self
    }
}
