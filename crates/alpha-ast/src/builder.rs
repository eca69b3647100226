//! AST construction helpers.
//!
//! The builder owns an [`AstArena`] and exposes one constructor per node
//! shape. Slot conventions (which the evaluator relies on):
//!
//! | kind | lhs | rhs | children |
//! |---|---|---|---|
//! | `Module` | | | top-level statements |
//! | `BasicBlock` | | | statements |
//! | `Statement` | expression | | |
//! | `Assignment`/`ConstantAssignment` | symbol | initializer | `[type spec]` |
//! | `Parameter` | symbol | default value | `[type spec]` |
//! | `TypeSpec` | symbol | | |
//! | `PointerSpec` | base spec | | |
//! | `ArraySpec` | base spec | | subscripts |
//! | `Symbol` | | | `SymbolPart`s |
//! | `BinaryOperator` | lhs | rhs | |
//! | `UnaryOperator` | | operand | |
//! | `ProcExpression` | return type spec | body block | parameters |
//! | `ProcCall` | target symbol | argument list | |
//! | `ArgumentList` | | | arguments |
//! | `IfExpression`/`ElseIfExpression` | predicate | else chain | `[true block]` |
//! | `ElseExpression` | | | `[block]` |
//! | `WhileStatement` | predicate | body block | |
//! | `ForStatement` | induction symbol | body block | `[iterable]` |
//! | `SwitchExpression` | selector | | cases |
//! | `CaseExpression` | match expr (none = default) | block | |
//! | `WithExpression`/`DeferExpression` | expression | body block | |
//! | `NamespaceExpression` | symbol | body block | |
//! | `StructExpression`/`EnumExpression`/`UnionExpression` | | | field declarations |
//! | `ImportExpression` | module expression | | |
//! | `ModuleExpression` | path string literal | | |
//! | `Directive` (token = name) | | | parameters |
//! | `Attribute` (token = name) | expression | | |
//! | `CastExpression`/`TransmuteExpression` | type spec | expression | |

use crate::node::{AstArena, AstNode, AstNodeKind, NodeId};
use crate::token::{Token, TokenKind};
use alpha_common::SourceLocation;

#[derive(Debug, Default)]
pub struct AstBuilder {
    arena: AstArena,
}

impl AstBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn arena(&self) -> &AstArena {
        &self.arena
    }

    pub fn into_arena(self) -> AstArena {
        self.arena
    }

    pub fn set_location(&mut self, id: NodeId, location: SourceLocation) {
        self.arena.get_mut(id).location = location;
    }

    fn add(&mut self, node: AstNode) -> NodeId {
        self.arena.add(node)
    }

    fn leaf(&mut self, kind: AstNodeKind, token: Token) -> NodeId {
        let mut node = AstNode::new(kind);
        node.location = token.location;
        node.token = Some(token);
        self.add(node)
    }

    // ------------------------------------------------------------------
    // structure

    pub fn module(&mut self, children: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::Module);
        node.children = children;
        self.add(node)
    }

    pub fn basic_block(&mut self, children: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::BasicBlock);
        node.children = children;
        self.add(node)
    }

    pub fn statement(&mut self, expression: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::Statement);
        node.lhs = Some(expression);
        node.location = self.arena.get(expression).location;
        self.add(node)
    }

    pub fn labeled_statement(&mut self, labels: Vec<NodeId>, expression: NodeId) -> NodeId {
        let id = self.statement(expression);
        self.arena.get_mut(id).labels = labels;
        id
    }

    // ------------------------------------------------------------------
    // names

    pub fn symbol(&mut self, parts: &[&str]) -> NodeId {
        let children = parts
            .iter()
            .map(|part| self.leaf(AstNodeKind::SymbolPart, Token::new(TokenKind::Identifier, *part)))
            .collect();
        let mut node = AstNode::new(AstNodeKind::Symbol);
        node.children = children;
        self.add(node)
    }

    // ------------------------------------------------------------------
    // declarations

    pub fn assignment(
        &mut self,
        symbol: NodeId,
        type_spec: Option<NodeId>,
        initializer: Option<NodeId>,
    ) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::Assignment);
        node.lhs = Some(symbol);
        node.rhs = initializer;
        node.children = type_spec.into_iter().collect();
        self.add(node)
    }

    pub fn constant_assignment(
        &mut self,
        symbol: NodeId,
        type_spec: Option<NodeId>,
        initializer: NodeId,
    ) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ConstantAssignment);
        node.lhs = Some(symbol);
        node.rhs = Some(initializer);
        node.children = type_spec.into_iter().collect();
        self.add(node)
    }

    pub fn parameter(&mut self, symbol: NodeId, type_spec: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::Parameter);
        node.lhs = Some(symbol);
        node.children = vec![type_spec];
        self.add(node)
    }

    // ------------------------------------------------------------------
    // type specs

    pub fn type_spec(&mut self, symbol: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::TypeSpec);
        node.lhs = Some(symbol);
        self.add(node)
    }

    pub fn named_type_spec(&mut self, name: &str) -> NodeId {
        let symbol = self.symbol(&[name]);
        self.type_spec(symbol)
    }

    pub fn pointer_spec(&mut self, base: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::PointerSpec);
        node.lhs = Some(base);
        self.add(node)
    }

    pub fn array_spec(&mut self, base: NodeId, subscripts: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ArraySpec);
        node.lhs = Some(base);
        node.children = subscripts;
        self.add(node)
    }

    // ------------------------------------------------------------------
    // operators

    pub fn binary_operator(&mut self, token_kind: TokenKind, lhs: NodeId, rhs: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::BinaryOperator);
        node.token = Some(Token::new(token_kind, ""));
        node.lhs = Some(lhs);
        node.rhs = Some(rhs);
        self.add(node)
    }

    pub fn unary_operator(&mut self, token_kind: TokenKind, operand: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::UnaryOperator);
        node.token = Some(Token::new(token_kind, ""));
        node.rhs = Some(operand);
        self.add(node)
    }

    // ------------------------------------------------------------------
    // literals

    pub fn number(&mut self, text: &str) -> NodeId {
        self.leaf(AstNodeKind::NumberLiteral, Token::new(TokenKind::Number, text))
    }

    pub fn string(&mut self, value: &str) -> NodeId {
        self.leaf(AstNodeKind::StringLiteral, Token::new(TokenKind::String, value))
    }

    pub fn boolean(&mut self, value: bool) -> NodeId {
        let kind = if value { TokenKind::True } else { TokenKind::False };
        self.leaf(
            AstNodeKind::BooleanLiteral,
            Token::new(kind, if value { "true" } else { "false" }),
        )
    }

    pub fn character(&mut self, value: char) -> NodeId {
        self.leaf(
            AstNodeKind::CharacterLiteral,
            Token::new(TokenKind::Character, value.to_string()),
        )
    }

    pub fn nil(&mut self) -> NodeId {
        self.leaf(AstNodeKind::NilLiteral, Token::new(TokenKind::Nil, "nil"))
    }

    pub fn uninitialized(&mut self) -> NodeId {
        self.leaf(
            AstNodeKind::UninitializedLiteral,
            Token::new(TokenKind::Uninitialized, "---"),
        )
    }

    // ------------------------------------------------------------------
    // procedures

    pub fn proc_expression(
        &mut self,
        parameters: Vec<NodeId>,
        return_type: Option<NodeId>,
        body: NodeId,
    ) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ProcExpression);
        node.lhs = return_type;
        node.rhs = Some(body);
        node.children = parameters;
        self.add(node)
    }

    pub fn argument_list(&mut self, arguments: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ArgumentList);
        node.children = arguments;
        self.add(node)
    }

    pub fn proc_call(&mut self, target: NodeId, arguments: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ProcCall);
        node.lhs = Some(target);
        node.rhs = Some(arguments);
        self.add(node)
    }

    // ------------------------------------------------------------------
    // control flow

    pub fn if_expression(
        &mut self,
        predicate: NodeId,
        true_block: NodeId,
        else_chain: Option<NodeId>,
    ) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::IfExpression);
        node.lhs = Some(predicate);
        node.rhs = else_chain;
        node.children = vec![true_block];
        self.add(node)
    }

    pub fn else_expression(&mut self, block: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ElseExpression);
        node.children = vec![block];
        self.add(node)
    }

    pub fn while_statement(&mut self, predicate: NodeId, body: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::WhileStatement);
        node.lhs = Some(predicate);
        node.rhs = Some(body);
        self.add(node)
    }

    pub fn for_statement(&mut self, induction: NodeId, iterable: NodeId, body: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ForStatement);
        node.lhs = Some(induction);
        node.rhs = Some(body);
        node.children = vec![iterable];
        self.add(node)
    }

    pub fn break_statement(&mut self, label: Option<&str>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::BreakStatement);
        node.token = label.map(|name| Token::new(TokenKind::Label, name));
        self.add(node)
    }

    pub fn continue_statement(&mut self, label: Option<&str>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ContinueStatement);
        node.token = label.map(|name| Token::new(TokenKind::Label, name));
        self.add(node)
    }

    pub fn return_statement(&mut self, expressions: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ReturnStatement);
        node.children = expressions;
        self.add(node)
    }

    pub fn defer_expression(&mut self, expression: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::DeferExpression);
        node.lhs = Some(expression);
        self.add(node)
    }

    pub fn switch_expression(&mut self, selector: NodeId, cases: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::SwitchExpression);
        node.lhs = Some(selector);
        node.children = cases;
        self.add(node)
    }

    pub fn case_expression(&mut self, matches: Option<NodeId>, block: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::CaseExpression);
        node.lhs = matches;
        node.rhs = Some(block);
        self.add(node)
    }

    pub fn fallthrough_statement(&mut self) -> NodeId {
        self.add(AstNode::new(AstNodeKind::FallthroughStatement))
    }

    pub fn with_expression(&mut self, expression: NodeId, body: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::WithExpression);
        node.lhs = Some(expression);
        node.rhs = Some(body);
        self.add(node)
    }

    // ------------------------------------------------------------------
    // composites & namespaces

    pub fn namespace_expression(&mut self, symbol: NodeId, body: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::NamespaceExpression);
        node.lhs = Some(symbol);
        node.rhs = Some(body);
        self.add(node)
    }

    pub fn struct_expression(&mut self, fields: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::StructExpression);
        node.children = fields;
        self.add(node)
    }

    pub fn enum_expression(&mut self, fields: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::EnumExpression);
        node.children = fields;
        self.add(node)
    }

    pub fn union_expression(&mut self, fields: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::UnionExpression);
        node.children = fields;
        self.add(node)
    }

    // ------------------------------------------------------------------
    // modules

    pub fn module_expression(&mut self, path: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ModuleExpression);
        node.lhs = Some(path);
        self.add(node)
    }

    pub fn import_expression(&mut self, module_expression: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::ImportExpression);
        node.lhs = Some(module_expression);
        self.add(node)
    }

    // ------------------------------------------------------------------
    // compile-time constructs

    pub fn directive(&mut self, name: &str, parameters: Vec<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::Directive);
        node.token = Some(Token::new(TokenKind::Directive, name));
        node.children = parameters;
        self.add(node)
    }

    pub fn attribute(&mut self, name: &str, expression: Option<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::Attribute);
        node.token = Some(Token::new(TokenKind::Attribute, name));
        node.lhs = expression;
        self.add(node)
    }

    pub fn label(&mut self, name: &str) -> NodeId {
        self.leaf(AstNodeKind::Label, Token::new(TokenKind::Label, name))
    }

    pub fn line_comment(&mut self, text: &str) -> NodeId {
        self.leaf(AstNodeKind::Comment, Token::new(TokenKind::LineComment, text))
    }

    pub fn raw_block(&mut self, text: &str) -> NodeId {
        self.leaf(AstNodeKind::RawBlock, Token::new(TokenKind::String, text))
    }

    pub fn cast_expression(&mut self, type_spec: NodeId, expression: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::CastExpression);
        node.lhs = Some(type_spec);
        node.rhs = Some(expression);
        self.add(node)
    }

    pub fn transmute_expression(&mut self, type_spec: NodeId, expression: NodeId) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::TransmuteExpression);
        node.lhs = Some(type_spec);
        node.rhs = Some(expression);
        self.add(node)
    }

    pub fn spread_operator(&mut self, expression: Option<NodeId>) -> NodeId {
        let mut node = AstNode::new(AstNodeKind::SpreadOperator);
        node.lhs = expression;
        self.add(node)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_a_declaration_with_annotation() {
        let mut builder = AstBuilder::new();
        let symbol = builder.symbol(&["x"]);
        let spec = builder.named_type_spec("u8");
        let value = builder.number("300");
        let decl = builder.assignment(symbol, Some(spec), Some(value));
        let arena = builder.into_arena();
        let node = arena.get(decl);
        assert_eq!(node.kind, AstNodeKind::Assignment);
        assert_eq!(node.children.len(), 1);
        assert_eq!(arena.get(node.children[0]).kind, AstNodeKind::TypeSpec);
    }

    #[test]
    fn symbol_parts_preserve_order() {
        let mut builder = AstBuilder::new();
        let symbol = builder.symbol(&["core", "io", "write"]);
        let arena = builder.into_arena();
        let parts: Vec<_> = arena
            .get(symbol)
            .children
            .iter()
            .map(|&part| arena.get(part).lexeme().to_string())
            .collect();
        assert_eq!(parts, ["core", "io", "write"]);
    }
}
