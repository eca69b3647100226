//! The element model.
//!
//! Every semantic node is an [`Element`]: a stable id, a variant tag, a
//! back-pointer to its lexical parent scope, a back-pointer to its parent
//! element, a source location, an attribute map, a comment list, and the
//! variant payload. Elements are owned by the
//! [`ElementMap`](crate::ElementMap); all other references are non-owning
//! ids, so cycles (scope back-edges, identifier to declaration edges) stay
//! out of the ownership tree.

pub mod types;
pub use types::{
    ArrayTypeData, CompositeKind, CompositeTypeData, GenericTypeData, ModuleTypeData,
    NumericTypeData, PointerTypeData, ProcedureTypeData, TupleTypeData, TypeHeader,
    UnknownTypeData,
};

use crate::directives::DirectiveKind;
use crate::intrinsics::IntrinsicKind;
use alpha_common::{Id, NumberClass, QualifiedSymbol, SourceLocation};
use alpha_ast::TokenKind;
use indexmap::IndexMap;
use rustc_hash::FxHashMap;

/// Elements are identified by the same stable id space as every other
/// session-owned object.
pub type ElementId = Id;

/// The variant tag. One entry per element shape in the model.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ElementKind {
    Program,
    Module,
    ModuleReference,
    Import,
    Block,
    Statement,
    Identifier,
    IdentifierReference,
    UnknownIdentifier,
    Symbol,
    TypeReference,
    Initializer,
    Declaration,
    Assignment,
    BinaryOperator,
    UnaryOperator,
    SpreadOperator,
    Label,
    LabelReference,
    AssemblyLabel,
    AssemblyLiteralLabel,
    IntegerLiteral,
    FloatLiteral,
    BooleanLiteral,
    StringLiteral,
    CharacterLiteral,
    NilLiteral,
    UninitializedLiteral,
    TypeLiteral,
    Expression,
    ArgumentList,
    ArgumentPair,
    ProcedureCall,
    ProcedureInstance,
    Intrinsic,
    Directive,
    Attribute,
    Comment,
    RawBlock,
    If,
    While,
    For,
    Break,
    Continue,
    Return,
    Switch,
    Case,
    Fallthrough,
    Defer,
    With,
    Namespace,
    Cast,
    Transmute,
    Field,
    NumericType,
    BoolType,
    RuneType,
    PointerType,
    ArrayType,
    TupleType,
    CompositeType,
    ProcedureType,
    NamespaceType,
    ModuleType,
    GenericType,
    UnknownType,
}

impl ElementKind {
    pub const fn name(self) -> &'static str {
        match self {
            ElementKind::Program => "program",
            ElementKind::Module => "module",
            ElementKind::ModuleReference => "module_reference",
            ElementKind::Import => "import",
            ElementKind::Block => "block",
            ElementKind::Statement => "statement",
            ElementKind::Identifier => "identifier",
            ElementKind::IdentifierReference => "identifier_reference",
            ElementKind::UnknownIdentifier => "unknown_identifier",
            ElementKind::Symbol => "symbol",
            ElementKind::TypeReference => "type_reference",
            ElementKind::Initializer => "initializer",
            ElementKind::Declaration => "declaration",
            ElementKind::Assignment => "assignment",
            ElementKind::BinaryOperator => "binary_operator",
            ElementKind::UnaryOperator => "unary_operator",
            ElementKind::SpreadOperator => "spread_operator",
            ElementKind::Label => "label",
            ElementKind::LabelReference => "label_reference",
            ElementKind::AssemblyLabel => "assembly_label",
            ElementKind::AssemblyLiteralLabel => "assembly_literal_label",
            ElementKind::IntegerLiteral => "integer_literal",
            ElementKind::FloatLiteral => "float_literal",
            ElementKind::BooleanLiteral => "boolean_literal",
            ElementKind::StringLiteral => "string_literal",
            ElementKind::CharacterLiteral => "character_literal",
            ElementKind::NilLiteral => "nil_literal",
            ElementKind::UninitializedLiteral => "uninitialized_literal",
            ElementKind::TypeLiteral => "type_literal",
            ElementKind::Expression => "expression",
            ElementKind::ArgumentList => "argument_list",
            ElementKind::ArgumentPair => "argument_pair",
            ElementKind::ProcedureCall => "proc_call",
            ElementKind::ProcedureInstance => "proc_instance",
            ElementKind::Intrinsic => "intrinsic",
            ElementKind::Directive => "directive",
            ElementKind::Attribute => "attribute",
            ElementKind::Comment => "comment",
            ElementKind::RawBlock => "raw_block",
            ElementKind::If => "if",
            ElementKind::While => "while",
            ElementKind::For => "for",
            ElementKind::Break => "break",
            ElementKind::Continue => "continue",
            ElementKind::Return => "return",
            ElementKind::Switch => "switch",
            ElementKind::Case => "case",
            ElementKind::Fallthrough => "fallthrough",
            ElementKind::Defer => "defer",
            ElementKind::With => "with",
            ElementKind::Namespace => "namespace",
            ElementKind::Cast => "cast",
            ElementKind::Transmute => "transmute",
            ElementKind::Field => "field",
            ElementKind::NumericType => "numeric_type",
            ElementKind::BoolType => "bool_type",
            ElementKind::RuneType => "rune_type",
            ElementKind::PointerType => "pointer_type",
            ElementKind::ArrayType => "array_type",
            ElementKind::TupleType => "tuple_type",
            ElementKind::CompositeType => "composite_type",
            ElementKind::ProcedureType => "proc_type",
            ElementKind::NamespaceType => "namespace_type",
            ElementKind::ModuleType => "module_type",
            ElementKind::GenericType => "generic_type",
            ElementKind::UnknownType => "unknown_type",
        }
    }
}

// ---------------------------------------------------------------------------
// operators

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum OperatorKind {
    Unknown,

    // unary
    Negate,
    BinaryNot,
    LogicalNot,
    PointerDereference,

    // binary
    Add,
    Subscript,
    Subtract,
    Multiply,
    Divide,
    Modulo,
    Equals,
    NotEquals,
    GreaterThan,
    LessThan,
    GreaterThanOrEqual,
    LessThanOrEqual,
    LogicalOr,
    LogicalAnd,
    BinaryOr,
    BinaryAnd,
    BinaryXor,
    ShiftRight,
    ShiftLeft,
    RotateRight,
    RotateLeft,
    Exponent,
    Assignment,
    MemberAccess,
}

impl OperatorKind {
    pub const fn name(self) -> &'static str {
        match self {
            OperatorKind::Unknown => "unknown",
            OperatorKind::Negate => "negate",
            OperatorKind::BinaryNot => "binary_not",
            OperatorKind::LogicalNot => "logical_not",
            OperatorKind::PointerDereference => "pointer_dereference",
            OperatorKind::Add => "add",
            OperatorKind::Subscript => "subscript",
            OperatorKind::Subtract => "subtract",
            OperatorKind::Multiply => "multiply",
            OperatorKind::Divide => "divide",
            OperatorKind::Modulo => "modulo",
            OperatorKind::Equals => "equals",
            OperatorKind::NotEquals => "not_equals",
            OperatorKind::GreaterThan => "greater_than",
            OperatorKind::LessThan => "less_than",
            OperatorKind::GreaterThanOrEqual => "greater_than_or_equal",
            OperatorKind::LessThanOrEqual => "less_than_or_equal",
            OperatorKind::LogicalOr => "logical_or",
            OperatorKind::LogicalAnd => "logical_and",
            OperatorKind::BinaryOr => "binary_or",
            OperatorKind::BinaryAnd => "binary_and",
            OperatorKind::BinaryXor => "binary_xor",
            OperatorKind::ShiftRight => "shift_right",
            OperatorKind::ShiftLeft => "shift_left",
            OperatorKind::RotateRight => "rotate_right",
            OperatorKind::RotateLeft => "rotate_left",
            OperatorKind::Exponent => "exponent",
            OperatorKind::Assignment => "assignment",
            OperatorKind::MemberAccess => "member_access",
        }
    }

    pub fn from_unary_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Minus => Some(OperatorKind::Negate),
            TokenKind::Tilde => Some(OperatorKind::BinaryNot),
            TokenKind::Bang => Some(OperatorKind::LogicalNot),
            TokenKind::Caret => Some(OperatorKind::PointerDereference),
            _ => None,
        }
    }

    pub fn from_binary_token(kind: TokenKind) -> Option<Self> {
        match kind {
            TokenKind::Plus => Some(OperatorKind::Add),
            TokenKind::Minus => Some(OperatorKind::Subtract),
            TokenKind::Asterisk => Some(OperatorKind::Multiply),
            TokenKind::Slash => Some(OperatorKind::Divide),
            TokenKind::Percent => Some(OperatorKind::Modulo),
            TokenKind::Equals => Some(OperatorKind::Equals),
            TokenKind::NotEquals => Some(OperatorKind::NotEquals),
            TokenKind::GreaterThan => Some(OperatorKind::GreaterThan),
            TokenKind::LessThan => Some(OperatorKind::LessThan),
            TokenKind::GreaterThanEqual => Some(OperatorKind::GreaterThanOrEqual),
            TokenKind::LessThanEqual => Some(OperatorKind::LessThanOrEqual),
            TokenKind::LogicalOr => Some(OperatorKind::LogicalOr),
            TokenKind::LogicalAnd => Some(OperatorKind::LogicalAnd),
            TokenKind::Pipe => Some(OperatorKind::BinaryOr),
            TokenKind::Ampersand => Some(OperatorKind::BinaryAnd),
            TokenKind::Xor => Some(OperatorKind::BinaryXor),
            TokenKind::Shl => Some(OperatorKind::ShiftLeft),
            TokenKind::Shr => Some(OperatorKind::ShiftRight),
            TokenKind::Rol => Some(OperatorKind::RotateLeft),
            TokenKind::Ror => Some(OperatorKind::RotateRight),
            TokenKind::Exponent => Some(OperatorKind::Exponent),
            TokenKind::Assignment => Some(OperatorKind::Assignment),
            TokenKind::Period => Some(OperatorKind::MemberAccess),
            _ => None,
        }
    }

    pub const fn is_relational(self) -> bool {
        matches!(
            self,
            OperatorKind::Equals
                | OperatorKind::NotEquals
                | OperatorKind::GreaterThan
                | OperatorKind::LessThan
                | OperatorKind::GreaterThanOrEqual
                | OperatorKind::LessThanOrEqual
                | OperatorKind::LogicalOr
                | OperatorKind::LogicalAnd
        )
    }

    pub const fn is_logical_conjunction(self) -> bool {
        matches!(self, OperatorKind::LogicalOr | OperatorKind::LogicalAnd)
    }

    pub const fn is_arithmetic(self) -> bool {
        matches!(
            self,
            OperatorKind::Add
                | OperatorKind::Subtract
                | OperatorKind::Multiply
                | OperatorKind::Divide
                | OperatorKind::Modulo
                | OperatorKind::BinaryOr
                | OperatorKind::BinaryAnd
                | OperatorKind::BinaryXor
                | OperatorKind::ShiftLeft
                | OperatorKind::ShiftRight
                | OperatorKind::RotateLeft
                | OperatorKind::RotateRight
                | OperatorKind::Exponent
        )
    }
}

// ---------------------------------------------------------------------------
// payloads

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommentKind {
    Line,
    Block,
}

#[derive(Clone, Debug, Default)]
pub struct ProgramData {
    pub module: Option<ElementId>,
    pub block: Option<ElementId>,
}

#[derive(Clone, Debug, Default)]
pub struct ModuleData {
    pub scope: Option<ElementId>,
    pub source_file: Option<Id>,
    pub is_root: bool,
}

#[derive(Clone, Debug)]
pub struct ModuleReferenceData {
    pub expression: ElementId,
    pub module: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct ImportData {
    pub expression: ElementId,
    pub module: Option<ElementId>,
}

/// A lexical scope: ordered statements, nested blocks, and the maps the
/// scope manager searches. Identifier and type maps preserve insertion
/// order; identifiers with the same leaf name form an overload set.
#[derive(Clone, Debug, Default)]
pub struct BlockData {
    pub statements: Vec<ElementId>,
    pub blocks: Vec<ElementId>,
    pub identifiers: IndexMap<String, Vec<ElementId>>,
    pub types: IndexMap<String, ElementId>,
    pub imports: Vec<ElementId>,
    pub defers: Vec<ElementId>,
}

impl BlockData {
    pub fn identifiers_in_order(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.identifiers.values().flatten().copied()
    }
}

#[derive(Clone, Debug, Default)]
pub struct StatementData {
    pub labels: Vec<ElementId>,
    pub expression: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct IdentifierData {
    pub symbol: ElementId,
    pub type_ref: Option<ElementId>,
    pub initializer: Option<ElementId>,
    /// True when the type came from inference rather than an annotation.
    pub inferred_type: bool,
    pub constant: bool,
}

#[derive(Clone, Debug)]
pub struct IdentifierReferenceData {
    pub symbol: QualifiedSymbol,
    pub identifier: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct SymbolData {
    pub name: String,
    pub namespaces: Vec<String>,
    pub fully_qualified: String,
    pub constant: bool,
    pub type_parameters: Vec<ElementId>,
}

impl SymbolData {
    pub fn qualified_symbol(&self) -> QualifiedSymbol {
        QualifiedSymbol::qualified(self.name.clone(), self.namespaces.clone())
    }
}

/// The indirection every type consumer goes through, so resolution can
/// patch a single place.
#[derive(Clone, Debug)]
pub struct TypeReferenceData {
    pub symbol: QualifiedSymbol,
    pub referenced_type: Option<ElementId>,
}

#[derive(Clone, Debug, Default)]
pub struct InitializerData {
    pub expression: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct DeclarationData {
    pub identifier: ElementId,
    pub assignment: Option<ElementId>,
}

#[derive(Clone, Debug, Default)]
pub struct AssignmentData {
    pub expressions: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub struct BinaryOperatorData {
    pub op: OperatorKind,
    pub lhs: ElementId,
    pub rhs: ElementId,
}

#[derive(Clone, Debug)]
pub struct UnaryOperatorData {
    pub op: OperatorKind,
    pub rhs: ElementId,
}

#[derive(Clone, Debug, Default)]
pub struct SpreadOperatorData {
    pub expression: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct LabelData {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct LabelReferenceData {
    pub name: String,
    pub label: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct AssemblyLabelData {
    pub name: String,
}

#[derive(Clone, Debug)]
pub struct TypeLiteralData {
    pub type_ref: Option<ElementId>,
    pub args: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub struct ExpressionData {
    pub root: ElementId,
}

#[derive(Clone, Debug, Default)]
pub struct ArgumentListData {
    pub elements: Vec<ElementId>,
    pub argument_index: FxHashMap<String, usize>,
}

#[derive(Clone, Debug)]
pub struct ArgumentPairData {
    pub lhs: ElementId,
    pub rhs: ElementId,
}

#[derive(Clone, Debug)]
pub struct ProcedureCallData {
    pub arguments: ElementId,
    pub type_parameters: Vec<ElementId>,
    /// Candidate identifier references; overload resolution narrows this
    /// to one and records the winner below.
    pub references: Vec<ElementId>,
    pub resolved_proc_type: Option<ElementId>,
    pub resolved_identifier_ref: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct ProcedureInstanceData {
    pub proc_type: ElementId,
    pub scope: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct IntrinsicData {
    pub kind: IntrinsicKind,
    pub arguments: ElementId,
    pub proc_type: ElementId,
    pub type_parameters: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub struct DirectiveData {
    pub kind: DirectiveKind,
    pub lhs: Option<ElementId>,
    pub rhs: Option<ElementId>,
    pub body: Option<ElementId>,
    /// For `#if` chains: the branch selected during evaluation. Aliases
    /// one of the owned branches; never owned itself.
    pub true_body: Option<ElementId>,
    pub expression: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct AttributeData {
    pub name: String,
    pub expression: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct CommentData {
    pub kind: CommentKind,
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct RawBlockData {
    pub value: String,
}

#[derive(Clone, Debug)]
pub struct IfData {
    pub predicate: ElementId,
    pub true_branch: ElementId,
    pub false_branch: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct WhileData {
    pub predicate: ElementId,
    pub body: ElementId,
}

#[derive(Clone, Debug)]
pub struct ForData {
    pub induction_decl: ElementId,
    pub expression: ElementId,
    pub body: ElementId,
}

#[derive(Clone, Debug, Default)]
pub struct BreakData {
    pub label: Option<ElementId>,
}

#[derive(Clone, Debug, Default)]
pub struct ContinueData {
    pub label: Option<ElementId>,
}

#[derive(Clone, Debug, Default)]
pub struct ReturnData {
    pub expressions: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub struct SwitchData {
    pub expression: ElementId,
    pub scope: ElementId,
}

#[derive(Clone, Debug)]
pub struct CaseData {
    /// `None` marks the default case.
    pub expression: Option<ElementId>,
    pub scope: ElementId,
}

#[derive(Clone, Debug, Default)]
pub struct FallthroughData {
    pub label: Option<ElementId>,
}

#[derive(Clone, Debug)]
pub struct DeferData {
    pub expression: ElementId,
}

#[derive(Clone, Debug)]
pub struct WithData {
    pub expression: ElementId,
    pub body: ElementId,
}

#[derive(Clone, Debug)]
pub struct NamespaceData {
    pub symbol: Option<ElementId>,
    pub scope: ElementId,
}

#[derive(Clone, Debug)]
pub struct CastData {
    pub type_ref: ElementId,
    pub expression: ElementId,
}

#[derive(Clone, Debug)]
pub struct FieldData {
    /// The member identifier; owned by the composite's scope block.
    pub identifier: ElementId,
    pub offset: u64,
}

#[derive(Clone, Debug)]
pub enum ElementData {
    Program(ProgramData),
    Module(ModuleData),
    ModuleReference(ModuleReferenceData),
    Import(ImportData),
    Block(BlockData),
    Statement(StatementData),
    Identifier(IdentifierData),
    IdentifierReference(IdentifierReferenceData),
    UnknownIdentifier,
    Symbol(SymbolData),
    TypeReference(TypeReferenceData),
    Initializer(InitializerData),
    Declaration(DeclarationData),
    Assignment(AssignmentData),
    BinaryOperator(BinaryOperatorData),
    UnaryOperator(UnaryOperatorData),
    SpreadOperator(SpreadOperatorData),
    Label(LabelData),
    LabelReference(LabelReferenceData),
    AssemblyLabel(AssemblyLabelData),
    AssemblyLiteralLabel(AssemblyLabelData),
    IntegerLiteral { value: u64 },
    FloatLiteral { value: f64 },
    BooleanLiteral { value: bool },
    StringLiteral { value: String },
    CharacterLiteral { rune: char },
    NilLiteral,
    UninitializedLiteral,
    TypeLiteral(TypeLiteralData),
    Expression(ExpressionData),
    ArgumentList(ArgumentListData),
    ArgumentPair(ArgumentPairData),
    ProcedureCall(ProcedureCallData),
    ProcedureInstance(ProcedureInstanceData),
    Intrinsic(IntrinsicData),
    Directive(DirectiveData),
    Attribute(AttributeData),
    Comment(CommentData),
    RawBlock(RawBlockData),
    If(IfData),
    While(WhileData),
    For(ForData),
    Break(BreakData),
    Continue(ContinueData),
    Return(ReturnData),
    Switch(SwitchData),
    Case(CaseData),
    Fallthrough(FallthroughData),
    Defer(DeferData),
    With(WithData),
    Namespace(NamespaceData),
    Cast(CastData),
    Transmute(CastData),
    Field(FieldData),
    NumericType(NumericTypeData),
    BoolType(TypeHeader),
    RuneType(TypeHeader),
    PointerType(PointerTypeData),
    ArrayType(ArrayTypeData),
    TupleType(TupleTypeData),
    CompositeType(CompositeTypeData),
    ProcedureType(ProcedureTypeData),
    NamespaceType(TypeHeader),
    ModuleType(ModuleTypeData),
    GenericType(GenericTypeData),
    UnknownType(UnknownTypeData),
}

impl ElementData {
    pub fn kind(&self) -> ElementKind {
        match self {
            ElementData::Program(_) => ElementKind::Program,
            ElementData::Module(_) => ElementKind::Module,
            ElementData::ModuleReference(_) => ElementKind::ModuleReference,
            ElementData::Import(_) => ElementKind::Import,
            ElementData::Block(_) => ElementKind::Block,
            ElementData::Statement(_) => ElementKind::Statement,
            ElementData::Identifier(_) => ElementKind::Identifier,
            ElementData::IdentifierReference(_) => ElementKind::IdentifierReference,
            ElementData::UnknownIdentifier => ElementKind::UnknownIdentifier,
            ElementData::Symbol(_) => ElementKind::Symbol,
            ElementData::TypeReference(_) => ElementKind::TypeReference,
            ElementData::Initializer(_) => ElementKind::Initializer,
            ElementData::Declaration(_) => ElementKind::Declaration,
            ElementData::Assignment(_) => ElementKind::Assignment,
            ElementData::BinaryOperator(_) => ElementKind::BinaryOperator,
            ElementData::UnaryOperator(_) => ElementKind::UnaryOperator,
            ElementData::SpreadOperator(_) => ElementKind::SpreadOperator,
            ElementData::Label(_) => ElementKind::Label,
            ElementData::LabelReference(_) => ElementKind::LabelReference,
            ElementData::AssemblyLabel(_) => ElementKind::AssemblyLabel,
            ElementData::AssemblyLiteralLabel(_) => ElementKind::AssemblyLiteralLabel,
            ElementData::IntegerLiteral { .. } => ElementKind::IntegerLiteral,
            ElementData::FloatLiteral { .. } => ElementKind::FloatLiteral,
            ElementData::BooleanLiteral { .. } => ElementKind::BooleanLiteral,
            ElementData::StringLiteral { .. } => ElementKind::StringLiteral,
            ElementData::CharacterLiteral { .. } => ElementKind::CharacterLiteral,
            ElementData::NilLiteral => ElementKind::NilLiteral,
            ElementData::UninitializedLiteral => ElementKind::UninitializedLiteral,
            ElementData::TypeLiteral(_) => ElementKind::TypeLiteral,
            ElementData::Expression(_) => ElementKind::Expression,
            ElementData::ArgumentList(_) => ElementKind::ArgumentList,
            ElementData::ArgumentPair(_) => ElementKind::ArgumentPair,
            ElementData::ProcedureCall(_) => ElementKind::ProcedureCall,
            ElementData::ProcedureInstance(_) => ElementKind::ProcedureInstance,
            ElementData::Intrinsic(_) => ElementKind::Intrinsic,
            ElementData::Directive(_) => ElementKind::Directive,
            ElementData::Attribute(_) => ElementKind::Attribute,
            ElementData::Comment(_) => ElementKind::Comment,
            ElementData::RawBlock(_) => ElementKind::RawBlock,
            ElementData::If(_) => ElementKind::If,
            ElementData::While(_) => ElementKind::While,
            ElementData::For(_) => ElementKind::For,
            ElementData::Break(_) => ElementKind::Break,
            ElementData::Continue(_) => ElementKind::Continue,
            ElementData::Return(_) => ElementKind::Return,
            ElementData::Switch(_) => ElementKind::Switch,
            ElementData::Case(_) => ElementKind::Case,
            ElementData::Fallthrough(_) => ElementKind::Fallthrough,
            ElementData::Defer(_) => ElementKind::Defer,
            ElementData::With(_) => ElementKind::With,
            ElementData::Namespace(_) => ElementKind::Namespace,
            ElementData::Cast(_) => ElementKind::Cast,
            ElementData::Transmute(_) => ElementKind::Transmute,
            ElementData::Field(_) => ElementKind::Field,
            ElementData::NumericType(_) => ElementKind::NumericType,
            ElementData::BoolType(_) => ElementKind::BoolType,
            ElementData::RuneType(_) => ElementKind::RuneType,
            ElementData::PointerType(_) => ElementKind::PointerType,
            ElementData::ArrayType(_) => ElementKind::ArrayType,
            ElementData::TupleType(_) => ElementKind::TupleType,
            ElementData::CompositeType(_) => ElementKind::CompositeType,
            ElementData::ProcedureType(_) => ElementKind::ProcedureType,
            ElementData::NamespaceType(_) => ElementKind::NamespaceType,
            ElementData::ModuleType(_) => ElementKind::ModuleType,
            ElementData::GenericType(_) => ElementKind::GenericType,
            ElementData::UnknownType(_) => ElementKind::UnknownType,
        }
    }
}

// ---------------------------------------------------------------------------
// the element record

#[derive(Clone, Debug)]
pub struct Element {
    pub id: ElementId,
    pub parent_scope: Option<ElementId>,
    pub parent_element: Option<ElementId>,
    pub module: Option<ElementId>,
    pub location: SourceLocation,
    pub attributes: IndexMap<String, ElementId>,
    pub comments: Vec<ElementId>,
    /// When set, this element is held elsewhere and must not be destroyed
    /// with its apparent owner.
    pub non_owning: bool,
    pub data: ElementData,
}

impl Element {
    pub fn kind(&self) -> ElementKind {
        self.data.kind()
    }

    pub fn is_type(&self) -> bool {
        self.type_header().is_some()
    }

    pub fn make_non_owning(&mut self) {
        self.non_owning = true;
    }

    pub fn find_attribute(&self, name: &str) -> Option<ElementId> {
        self.attributes.get(name).copied()
    }

    /// The shared header carried by every type variant.
    pub fn type_header(&self) -> Option<&TypeHeader> {
        match &self.data {
            ElementData::NumericType(data) => Some(&data.header),
            ElementData::BoolType(header)
            | ElementData::RuneType(header)
            | ElementData::NamespaceType(header) => Some(header),
            ElementData::PointerType(data) => Some(&data.header),
            ElementData::ArrayType(data) => Some(&data.header),
            ElementData::TupleType(data) => Some(&data.header),
            ElementData::CompositeType(data) => Some(&data.header),
            ElementData::ProcedureType(data) => Some(&data.header),
            ElementData::ModuleType(data) => Some(&data.header),
            ElementData::GenericType(data) => Some(&data.header),
            ElementData::UnknownType(data) => Some(&data.header),
            _ => None,
        }
    }

    pub fn type_header_mut(&mut self) -> Option<&mut TypeHeader> {
        match &mut self.data {
            ElementData::NumericType(data) => Some(&mut data.header),
            ElementData::BoolType(header)
            | ElementData::RuneType(header)
            | ElementData::NamespaceType(header) => Some(header),
            ElementData::PointerType(data) => Some(&mut data.header),
            ElementData::ArrayType(data) => Some(&mut data.header),
            ElementData::TupleType(data) => Some(&mut data.header),
            ElementData::CompositeType(data) => Some(&mut data.header),
            ElementData::ProcedureType(data) => Some(&mut data.header),
            ElementData::ModuleType(data) => Some(&mut data.header),
            ElementData::GenericType(data) => Some(&mut data.header),
            ElementData::UnknownType(data) => Some(&mut data.header),
            _ => None,
        }
    }

    /// Machine representation class of a type element.
    pub fn number_class(&self) -> NumberClass {
        match &self.data {
            ElementData::NumericType(data) => data.number_class,
            ElementData::BoolType(_) | ElementData::RuneType(_) | ElementData::PointerType(_) => {
                NumberClass::Integer
            }
            _ => NumberClass::None,
        }
    }

    /// Directly-owned children, in deterministic order. Non-owning
    /// references (identifier bindings, referenced types, label targets)
    /// are deliberately absent.
    pub fn owned_children(&self) -> Vec<ElementId> {
        let mut list = Vec::new();
        match &self.data {
            ElementData::Program(data) => {
                list.extend(data.block);
                list.extend(data.module);
            }
            ElementData::Module(data) => list.extend(data.scope),
            ElementData::ModuleReference(data) => list.push(data.expression),
            ElementData::Import(data) => list.push(data.expression),
            ElementData::Block(data) => {
                // `imports` is a secondary index; the owning edge runs
                // through the statement list.
                list.extend(data.identifiers_in_order());
                list.extend(data.types.values().copied());
                list.extend(data.statements.iter().copied());
                list.extend(data.blocks.iter().copied());
            }
            ElementData::Statement(data) => {
                list.extend(data.labels.iter().copied());
                list.extend(data.expression);
            }
            ElementData::Identifier(data) => {
                list.push(data.symbol);
                list.extend(data.type_ref);
                list.extend(data.initializer);
            }
            ElementData::Symbol(data) => list.extend(data.type_parameters.iter().copied()),
            ElementData::Initializer(data) => list.extend(data.expression),
            ElementData::Declaration(data) => list.extend(data.assignment),
            ElementData::Assignment(data) => list.extend(data.expressions.iter().copied()),
            ElementData::BinaryOperator(data) => {
                list.push(data.lhs);
                list.push(data.rhs);
            }
            ElementData::UnaryOperator(data) => list.push(data.rhs),
            ElementData::SpreadOperator(data) => list.extend(data.expression),
            ElementData::TypeLiteral(data) => {
                list.extend(data.type_ref);
                list.extend(data.args.iter().copied());
            }
            ElementData::Expression(data) => list.push(data.root),
            ElementData::ArgumentList(data) => list.extend(data.elements.iter().copied()),
            ElementData::ArgumentPair(data) => {
                list.push(data.lhs);
                list.push(data.rhs);
            }
            ElementData::ProcedureCall(data) => {
                list.push(data.arguments);
                list.extend(data.type_parameters.iter().copied());
                list.extend(data.references.iter().copied());
            }
            ElementData::Intrinsic(data) => {
                list.push(data.arguments);
                list.extend(data.type_parameters.iter().copied());
            }
            ElementData::Directive(data) => {
                list.extend(data.lhs);
                list.extend(data.rhs);
                list.extend(data.body);
                list.extend(data.expression);
            }
            ElementData::Attribute(data) => list.extend(data.expression),
            ElementData::If(data) => {
                list.push(data.predicate);
                list.push(data.true_branch);
                list.extend(data.false_branch);
            }
            ElementData::While(data) => {
                list.push(data.predicate);
                list.push(data.body);
            }
            ElementData::For(data) => {
                list.push(data.induction_decl);
                list.push(data.expression);
                list.push(data.body);
            }
            ElementData::Break(data) => list.extend(data.label),
            ElementData::Continue(data) => list.extend(data.label),
            ElementData::Return(data) => list.extend(data.expressions.iter().copied()),
            ElementData::Switch(data) => {
                list.push(data.expression);
                list.push(data.scope);
            }
            ElementData::Case(data) => {
                list.extend(data.expression);
                list.push(data.scope);
            }
            ElementData::Fallthrough(data) => list.extend(data.label),
            ElementData::Defer(data) => list.push(data.expression),
            ElementData::With(data) => {
                list.push(data.expression);
                list.push(data.body);
            }
            ElementData::Namespace(data) => {
                list.extend(data.symbol);
                list.push(data.scope);
            }
            ElementData::Cast(data) | ElementData::Transmute(data) => {
                list.push(data.type_ref);
                list.push(data.expression);
            }
            ElementData::NumericType(data) => list.extend(data.header.symbol),
            ElementData::BoolType(header)
            | ElementData::RuneType(header)
            | ElementData::NamespaceType(header) => list.extend(header.symbol),
            ElementData::PointerType(data) => {
                list.extend(data.header.symbol);
                list.push(data.base_type_ref);
            }
            ElementData::ArrayType(data) => {
                list.extend(data.header.symbol);
                list.push(data.scope);
                list.push(data.base_type_ref);
                list.extend(data.subscripts.iter().copied());
            }
            ElementData::TupleType(data) => {
                list.extend(data.header.symbol);
                list.push(data.scope);
            }
            ElementData::CompositeType(data) => {
                list.extend(data.header.symbol);
                list.push(data.scope);
                list.extend(data.fields.values().copied());
            }
            ElementData::ProcedureType(data) => {
                list.extend(data.header.symbol);
                list.push(data.scope);
                list.extend(data.return_type);
                list.extend(data.body);
                list.extend(data.instances.iter().copied());
            }
            ElementData::ModuleType(data) => {
                list.extend(data.header.symbol);
                list.push(data.scope);
            }
            ElementData::GenericType(data) => {
                list.extend(data.header.symbol);
                list.extend(data.constraints.iter().copied());
            }
            ElementData::UnknownType(data) => list.extend(data.header.symbol),
            ElementData::IdentifierReference(_)
            | ElementData::UnknownIdentifier
            | ElementData::TypeReference(_)
            | ElementData::Label(_)
            | ElementData::LabelReference(_)
            | ElementData::AssemblyLabel(_)
            | ElementData::AssemblyLiteralLabel(_)
            | ElementData::IntegerLiteral { .. }
            | ElementData::FloatLiteral { .. }
            | ElementData::BooleanLiteral { .. }
            | ElementData::StringLiteral { .. }
            | ElementData::CharacterLiteral { .. }
            | ElementData::NilLiteral
            | ElementData::UninitializedLiteral
            | ElementData::Comment(_)
            | ElementData::RawBlock(_)
            | ElementData::ProcedureInstance(_)
            | ElementData::Field(_) => {}
        }
        list.extend(self.attributes.values().copied());
        list.extend(self.comments.iter().copied());
        list
    }
}
