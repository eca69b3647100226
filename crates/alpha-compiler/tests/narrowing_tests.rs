//! Integer and float literal narrowing through declaration inference.

mod common;

use alpha_ast::TokenKind;
use common::{compile, identifier_type_name, stmt};

#[test]
fn small_unsigned_literal_narrows_to_u8() {
    let (session, success) = compile(|b| {
        let x = b.symbol(&["x"]);
        let value = b.number("200");
        let decl = b.assignment(x, None, Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "x").as_deref(), Some("u8"));
}

#[test]
fn wider_literal_narrows_to_u16() {
    let (session, success) = compile(|b| {
        let y = b.symbol(&["y"]);
        let value = b.number("300");
        let decl = b.assignment(y, None, Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "y").as_deref(), Some("u16"));
}

#[test]
fn negative_literal_narrows_to_s8() {
    let (session, success) = compile(|b| {
        let z = b.symbol(&["z"]);
        let one = b.number("1");
        let negated = b.unary_operator(TokenKind::Minus, one);
        let decl = b.assignment(z, None, Some(negated));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "z").as_deref(), Some("s8"));
}

#[test]
fn float_literal_in_f32_range_narrows_to_f32() {
    let (session, success) = compile(|b| {
        let f = b.symbol(&["f"]);
        let value = b.number("1.5");
        let decl = b.assignment(f, None, Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "f").as_deref(), Some("f32"));
}

#[test]
fn huge_float_literal_needs_f64() {
    let (session, success) = compile(|b| {
        let g = b.symbol(&["g"]);
        let value = b.number("1.0e300");
        let decl = b.assignment(g, None, Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "g").as_deref(), Some("f64"));
}

#[test]
fn annotated_declaration_keeps_its_declared_type() {
    let (session, success) = compile(|b| {
        let w = b.symbol(&["w"]);
        let spec = b.named_type_spec("u32");
        let value = b.number("7");
        let decl = b.assignment(w, Some(spec), Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "w").as_deref(), Some("u32"));
}
