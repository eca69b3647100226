//! Scope manager behavior: duplicate symbols, shadowing, overload sets,
//! and namespace-qualified lookup.

mod common;

use alpha_compiler::elements::ElementData;
use common::{compile, find_identifier, identifier_type_name, root_scope, stmt};

#[test]
fn duplicate_type_names_are_rejected() {
    let (session, success) = compile(|b| {
        let first = b.symbol(&["point"]);
        let first_body = b.struct_expression(vec![]);
        let first_decl = b.constant_assignment(first, None, first_body);
        let first_statement = stmt(b, first_decl);

        let second = b.symbol(&["point"]);
        let second_body = b.struct_expression(vec![]);
        let second_decl = b.constant_assignment(second, None, second_body);
        let second_statement = stmt(b, second_decl);
        b.module(vec![first_statement, second_statement])
    });
    assert!(!success);
    assert!(session.result().has_code("C031"));
}

#[test]
fn same_leaf_name_forms_an_overload_set_in_insertion_order() {
    let (session, success) = compile(|b| {
        let mut statements = Vec::new();
        for type_name in ["s32", "f32"] {
            let foo = b.symbol(&["foo"]);
            let a = b.symbol(&["a"]);
            let spec = b.named_type_spec(type_name);
            let parameter = b.parameter(a, spec);
            let body = b.basic_block(vec![]);
            let proc_node = b.proc_expression(vec![parameter], None, body);
            let decl = b.constant_assignment(foo, None, proc_node);
            statements.push(stmt(b, decl));
        }
        b.module(statements)
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let scope = root_scope(&session).expect("root scope exists");
    let matches = session.scopes().find_identifier(
        session.elements(),
        &alpha_common::QualifiedSymbol::new("foo"),
        Some(scope),
    );
    assert_eq!(matches.len(), 2);
    // Insertion order: the s32 overload was declared first.
    let first_type = {
        let ElementData::Identifier(data) = &session.elements().get(matches[0]).unwrap().data
        else {
            panic!("expected identifier");
        };
        let type_ref = data.type_ref.unwrap();
        alpha_compiler::elements::types::referenced_type(session.elements(), type_ref).unwrap()
    };
    let ElementData::ProcedureType(proc) = &session.elements().get(first_type).unwrap().data
    else {
        panic!("expected procedure type");
    };
    let parameter = proc.parameters[0];
    let ElementData::Identifier(param_data) =
        &session.elements().get(parameter).unwrap().data
    else {
        panic!("expected identifier");
    };
    let param_type = alpha_compiler::elements::types::referenced_type(
        session.elements(),
        param_data.type_ref.unwrap(),
    )
    .unwrap();
    assert_eq!(
        alpha_compiler::elements::types::display_name(session.elements(), param_type),
        "s32"
    );
}

#[test]
fn inner_scopes_shadow_outer_declarations() {
    let (session, success) = compile(|b| {
        // x: u32 := 1; main :: proc() { x: u8 := 2; }
        let x = b.symbol(&["x"]);
        let x_spec = b.named_type_spec("u32");
        let one = b.number("1");
        let x_decl = b.assignment(x, Some(x_spec), Some(one));
        let x_statement = stmt(b, x_decl);

        let inner_x = b.symbol(&["x"]);
        let inner_spec = b.named_type_spec("u8");
        let two = b.number("2");
        let inner_decl = b.assignment(inner_x, Some(inner_spec), Some(two));
        let inner_statement = stmt(b, inner_decl);
        let body = b.basic_block(vec![inner_statement]);
        let main = b.symbol(&["main"]);
        let proc_node = b.proc_expression(vec![], None, body);
        let main_decl = b.constant_assignment(main, None, proc_node);
        let main_statement = stmt(b, main_decl);
        b.module(vec![x_statement, main_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    // Module-level x keeps its declared type.
    assert_eq!(identifier_type_name(&session, "x").as_deref(), Some("u32"));
}

#[test]
fn qualified_names_search_only_their_namespace() {
    let (session, success) = compile(|b| {
        // io :: namespace { limit: u16 := 9; }
        // top := io::limit;
        let limit = b.symbol(&["limit"]);
        let limit_spec = b.named_type_spec("u16");
        let nine = b.number("9");
        let limit_decl = b.assignment(limit, Some(limit_spec), Some(nine));
        let limit_statement = stmt(b, limit_decl);
        let body = b.basic_block(vec![limit_statement]);
        let io = b.symbol(&["io"]);
        let namespace = b.namespace_expression(io, body);
        let io_decl_symbol = b.symbol(&["io"]);
        let io_decl = b.constant_assignment(io_decl_symbol, None, namespace);
        let io_statement = stmt(b, io_decl);

        let top = b.symbol(&["top"]);
        let qualified = b.symbol(&["io", "limit"]);
        let top_decl = b.assignment(top, None, Some(qualified));
        let top_statement = stmt(b, top_decl);
        b.module(vec![io_statement, top_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "top").as_deref(), Some("u16"));
    // The leaf name alone does not leak out of the namespace.
    assert!(find_identifier(&session, "limit").is_none());
}
