//! Composite types: field layout, member access resolution, and member
//! type checking.

mod common;

use alpha_ast::{AstBuilder, NodeId, TokenKind};
use alpha_compiler::elements::{ElementData, ElementKind};
use common::{compile, find_identifier, identifier_type_name, stmt};

/// `point :: struct { x: u32; y: u8; }`
fn declare_point(b: &mut AstBuilder) -> NodeId {
    let x = b.symbol(&["x"]);
    let x_spec = b.named_type_spec("u32");
    let x_field = b.assignment(x, Some(x_spec), None);
    let y = b.symbol(&["y"]);
    let y_spec = b.named_type_spec("u8");
    let y_field = b.assignment(y, Some(y_spec), None);
    let body = b.struct_expression(vec![x_field, y_field]);
    let point = b.symbol(&["point"]);
    let decl = b.constant_assignment(point, None, body);
    stmt(b, decl)
}

#[test]
fn struct_fields_lay_out_in_declaration_order() {
    let (session, success) = compile(|b| {
        let point_statement = declare_point(b);
        b.module(vec![point_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let composite = session
        .elements()
        .find_by_kind(ElementKind::CompositeType)
        .into_iter()
        .next()
        .expect("point exists");
    let element = session.elements().get(composite).unwrap();
    let ElementData::CompositeType(data) = &element.data else {
        panic!("expected composite");
    };
    let offsets: Vec<(String, u64)> = data
        .fields
        .iter()
        .map(|(name, &field)| {
            let ElementData::Field(field_data) = &session.elements().get(field).unwrap().data
            else {
                panic!("expected field");
            };
            (name.clone(), field_data.offset)
        })
        .collect();
    assert_eq!(offsets, vec![("x".to_string(), 0), ("y".to_string(), 4)]);
    assert_eq!(element.type_header().unwrap().size_in_bytes, 5);
    assert_eq!(element.type_header().unwrap().alignment, 4);
}

#[test]
fn member_access_resolves_in_the_composite_scope() {
    let (session, success) = compile(|b| {
        let point_statement = declare_point(b);

        // p: point := ---;
        let p = b.symbol(&["p"]);
        let p_spec = b.named_type_spec("point");
        let uninit = b.uninitialized();
        let p_decl = b.assignment(p, Some(p_spec), Some(uninit));
        let p_statement = stmt(b, p_decl);

        // v := p.x;
        let v = b.symbol(&["v"]);
        let p_use = b.symbol(&["p"]);
        let x_use = b.symbol(&["x"]);
        let access = b.binary_operator(TokenKind::Period, p_use, x_use);
        let v_decl = b.assignment(v, None, Some(access));
        let v_statement = stmt(b, v_decl);

        b.module(vec![point_statement, p_statement, v_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "v").as_deref(), Some("u32"));
}

#[test]
fn member_assignment_type_checks_against_the_field() {
    let (session, success) = compile(|b| {
        let point_statement = declare_point(b);

        let p = b.symbol(&["p"]);
        let p_spec = b.named_type_spec("point");
        let uninit = b.uninitialized();
        let p_decl = b.assignment(p, Some(p_spec), Some(uninit));
        let p_statement = stmt(b, p_decl);

        // p.y := 300; -- u16 into u8
        let p_use = b.symbol(&["p"]);
        let y_use = b.symbol(&["y"]);
        let access = b.binary_operator(TokenKind::Period, p_use, y_use);
        let value = b.number("300");
        let assign = b.binary_operator(TokenKind::Assignment, access, value);
        let assign_statement = stmt(b, assign);

        b.module(vec![point_statement, p_statement, assign_statement])
    });
    assert!(!success);
    assert!(session.result().has_code("C051"));
}

#[test]
fn size_of_reports_the_computed_composite_size() {
    let (session, success) = compile(|b| {
        let point_statement = declare_point(b);
        let n = b.symbol(&["n"]);
        let point_use = b.symbol(&["point"]);
        let args = b.argument_list(vec![point_use]);
        let size_of = b.symbol(&["size_of"]);
        let call = b.proc_call(size_of, args);
        let n_decl = b.constant_assignment(n, None, call);
        let n_statement = stmt(b, n_decl);
        b.module(vec![point_statement, n_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let n = find_identifier(&session, "n").unwrap();
    assert_eq!(session.as_integer(n), Some(5));
}
