//! Compile-time directives: `#if` branch selection and `#assert`.

mod common;

use alpha_ast::TokenKind;
use alpha_compiler::elements::{ElementData, ElementKind};
use common::{compile, stmt};

#[test]
fn if_directive_selects_the_true_branch_and_erases_the_rest() {
    let (session, success) = compile(|b| {
        // #if true { a := 1; } #else { b := 2; }
        let a = b.symbol(&["a"]);
        let one = b.number("1");
        let a_decl = b.assignment(a, None, Some(one));
        let a_statement = stmt(b, a_decl);
        let true_block = b.basic_block(vec![a_statement]);

        let b_sym = b.symbol(&["b"]);
        let two = b.number("2");
        let b_decl = b.assignment(b_sym, None, Some(two));
        let b_statement = stmt(b, b_decl);
        let else_block = b.basic_block(vec![b_statement]);
        let else_directive = b.directive("else", vec![else_block]);

        let predicate = b.boolean(true);
        let if_directive = b.directive("if", vec![predicate, true_block, else_directive]);
        let statement = stmt(b, if_directive);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());

    let directive = session
        .elements()
        .find_by_kind(ElementKind::Directive)
        .into_iter()
        .find(|&d| {
            matches!(
                session.elements().get(d).map(|e| &e.data),
                Some(ElementData::Directive(data)) if data.lhs.is_some()
            )
        })
        .expect("the #if head survives");
    let ElementData::Directive(data) = &session.elements().get(directive).unwrap().data else {
        panic!("expected directive");
    };
    let true_body = data.true_body.expect("a branch was selected");
    assert_eq!(data.body, Some(true_body));

    // The untaken branch was erased from the graph.
    let surviving_blocks = session.elements().find_by_kind(ElementKind::Block);
    let else_body_alive = surviving_blocks.iter().any(|&block| {
        session
            .elements()
            .get(block)
            .map(|e| {
                e.parent_element
                    .and_then(|p| session.elements().kind_of(p))
                    == Some(ElementKind::Directive)
                    && Some(block) != data.body
            })
            .unwrap_or(false)
    });
    assert!(!else_body_alive);
}

#[test]
fn if_directive_with_false_predicate_takes_the_else_branch() {
    let (session, success) = compile(|b| {
        let a = b.symbol(&["a"]);
        let one = b.number("1");
        let a_decl = b.assignment(a, None, Some(one));
        let a_statement = stmt(b, a_decl);
        let true_block = b.basic_block(vec![a_statement]);

        let b_sym = b.symbol(&["b"]);
        let two = b.number("2");
        let b_decl = b.assignment(b_sym, None, Some(two));
        let b_statement = stmt(b, b_decl);
        let else_block = b.basic_block(vec![b_statement]);
        let else_directive = b.directive("else", vec![else_block]);

        let predicate = b.boolean(false);
        let if_directive = b.directive("if", vec![predicate, true_block, else_directive]);
        let statement = stmt(b, if_directive);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    // Only the else declaration survives; `a` was erased with its branch.
    assert!(!common::identifier_exists(&session, "a"));
    assert!(common::identifier_exists(&session, "b"));
}

#[test]
fn failing_assert_directive_fails_the_compile() {
    let (session, success) = compile(|b| {
        let one = b.number("1");
        let two = b.number("2");
        let equals = b.binary_operator(TokenKind::Equals, one, two);
        let assert_directive = b.directive("assert", vec![equals]);
        let statement = stmt(b, assert_directive);
        b.module(vec![statement])
    });
    assert!(!success);
    assert!(session.result().has_code("C060"));
    assert!(session.result().has_code("P044"));
}

#[test]
fn passing_assert_directive_compiles_cleanly() {
    let (session, success) = compile(|b| {
        let one = b.number("1");
        let also_one = b.number("1");
        let equals = b.binary_operator(TokenKind::Equals, one, also_one);
        let assert_directive = b.directive("assert", vec![equals]);
        let statement = stmt(b, assert_directive);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
}

#[test]
fn unknown_directives_are_rejected_at_evaluation() {
    let (session, success) = compile(|b| {
        let one = b.number("1");
        let bogus = b.directive("warp", vec![one]);
        let statement = stmt(b, bogus);
        b.module(vec![statement])
    });
    assert!(!success);
    assert!(session.result().has_code("P043"));
}
