//! Constant folding: intrinsics, identifier references, operators, and
//! the projection law (folding a folded graph is a no-op).

mod common;

use alpha_ast::TokenKind;
use alpha_compiler::elements::ElementKind;
use common::{compile, find_identifier, identifier_type_name, stmt};

#[test]
fn size_of_folds_to_a_u32_literal_and_leaves_the_registry() {
    let (session, success) = compile(|b| {
        // n :: size_of(u64);
        let n = b.symbol(&["n"]);
        let u64_use = b.symbol(&["u64"]);
        let args = b.argument_list(vec![u64_use]);
        let size_of = b.symbol(&["size_of"]);
        let call = b.proc_call(size_of, args);
        let decl = b.constant_assignment(n, None, call);
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let n = find_identifier(&session, "n").expect("n is declared");
    assert_eq!(session.as_integer(n), Some(8));
    assert_eq!(identifier_type_name(&session, "n").as_deref(), Some("u32"));
    assert!(
        session
            .elements()
            .find_by_kind(ElementKind::Intrinsic)
            .is_empty(),
        "the folded intrinsic must be removed from the registry"
    );
}

#[test]
fn folded_intrinsic_is_stamped_with_the_substitution_attribute() {
    let (session, success) = compile(|b| {
        let n = b.symbol(&["n"]);
        let u16_use = b.symbol(&["u16"]);
        let args = b.argument_list(vec![u16_use]);
        let size_of = b.symbol(&["size_of"]);
        let call = b.proc_call(size_of, args);
        let decl = b.constant_assignment(n, None, call);
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let stamped = session
        .elements()
        .find_by_kind(ElementKind::IntegerLiteral)
        .into_iter()
        .any(|literal| {
            session
                .elements()
                .get(literal)
                .and_then(|e| e.find_attribute("intrinsic_substitution"))
                .is_some()
        });
    assert!(stamped);
}

#[test]
fn align_of_agrees_with_the_type_table() {
    let (session, success) = compile(|b| {
        let a = b.symbol(&["a"]);
        let u32_use = b.symbol(&["u32"]);
        let args = b.argument_list(vec![u32_use]);
        let align_of = b.symbol(&["align_of"]);
        let call = b.proc_call(align_of, args);
        let decl = b.constant_assignment(a, None, call);
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let a = find_identifier(&session, "a").expect("a is declared");
    assert_eq!(
        session.as_integer(a),
        Some(alpha_common::numeric::properties_for("u32").unwrap().size_in_bytes as u64)
    );
}

#[test]
fn constant_chain_folds_through_references_and_operators() {
    let (session, success) = compile(|b| {
        // a :: 2; b :: a * 3;
        let a = b.symbol(&["a"]);
        let two = b.number("2");
        let a_decl = b.constant_assignment(a, None, two);
        let a_statement = stmt(b, a_decl);

        let b_sym = b.symbol(&["b"]);
        let a_use = b.symbol(&["a"]);
        let three = b.number("3");
        let product = b.binary_operator(TokenKind::Asterisk, a_use, three);
        let b_decl = b.constant_assignment(b_sym, None, product);
        let b_statement = stmt(b, b_decl);
        b.module(vec![a_statement, b_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let b_id = find_identifier(&session, "b").expect("b is declared");
    assert_eq!(session.as_integer(b_id), Some(6));
}

#[test]
fn folding_a_folded_graph_is_a_no_op() {
    let (mut session, success) = compile(|b| {
        let a = b.symbol(&["a"]);
        let two = b.number("2");
        let a_decl = b.constant_assignment(a, None, two);
        let a_statement = stmt(b, a_decl);

        let b_sym = b.symbol(&["b"]);
        let a_use = b.symbol(&["a"]);
        let three = b.number("3");
        let product = b.binary_operator(TokenKind::Asterisk, a_use, three);
        let b_decl = b.constant_assignment(b_sym, None, product);
        let b_statement = stmt(b, b_decl);
        b.module(vec![a_statement, b_statement])
    });
    assert!(success);
    let before = session.elements().len();
    assert!(session.fold_constant_expressions());
    assert_eq!(session.elements().len(), before);
}

#[test]
fn unary_and_logical_folds_produce_literals() {
    let (session, success) = compile(|b| {
        // mask :: ~0; truth :: !false;
        let mask = b.symbol(&["mask"]);
        let zero = b.number("0");
        let inverted = b.unary_operator(TokenKind::Tilde, zero);
        let mask_decl = b.constant_assignment(mask, None, inverted);
        let mask_statement = stmt(b, mask_decl);

        let truth = b.symbol(&["truth"]);
        let false_literal = b.boolean(false);
        let negated = b.unary_operator(TokenKind::Bang, false_literal);
        let truth_decl = b.constant_assignment(truth, None, negated);
        let truth_statement = stmt(b, truth_decl);
        b.module(vec![mask_statement, truth_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let mask = find_identifier(&session, "mask").expect("mask is declared");
    assert_eq!(session.as_integer(mask), Some(u64::MAX));
    let truth = find_identifier(&session, "truth").expect("truth is declared");
    assert_eq!(session.as_bool(truth), Some(true));
}
