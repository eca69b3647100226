//! Procedure call overload resolution.

mod common;

use alpha_ast::{AstBuilder, NodeId};
use alpha_compiler::elements::{types, ElementData, ElementKind};
use alpha_compiler::Session;
use common::{compile, stmt};

/// `foo :: proc(a: s32) {}` and `foo :: proc(a: f32) {}`.
fn declare_overloads(b: &mut AstBuilder) -> Vec<NodeId> {
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
    statements
}

/// The parameter type the only call in the session resolved against.
fn resolved_parameter_type(session: &Session) -> Option<String> {
    let call = session
        .elements()
        .find_by_kind(ElementKind::ProcedureCall)
        .into_iter()
        .next()?;
    let ElementData::ProcedureCall(data) = &session.elements().get(call)?.data else {
        return None;
    };
    let proc_type = data.resolved_proc_type?;
    let ElementData::ProcedureType(proc_data) = &session.elements().get(proc_type)?.data else {
        return None;
    };
    let parameter = *proc_data.parameters.first()?;
    let ElementData::Identifier(identifier) = &session.elements().get(parameter)?.data else {
        return None;
    };
    let type_ref = identifier.type_ref?;
    let type_id = types::referenced_type(session.elements(), type_ref)?;
    Some(types::display_name(session.elements(), type_id))
}

#[test]
fn float_argument_selects_the_f32_overload() {
    let (session, success) = compile(|b| {
        let mut statements = declare_overloads(b);
        let foo = b.symbol(&["foo"]);
        let value = b.number("1.0");
        let args = b.argument_list(vec![value]);
        let call = b.proc_call(foo, args);
        statements.push(stmt(b, call));
        b.module(statements)
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(resolved_parameter_type(&session).as_deref(), Some("f32"));
}

#[test]
fn integer_argument_selects_the_s32_overload() {
    let (session, success) = compile(|b| {
        let mut statements = declare_overloads(b);
        let foo = b.symbol(&["foo"]);
        let value = b.number("1");
        let args = b.argument_list(vec![value]);
        let call = b.proc_call(foo, args);
        statements.push(stmt(b, call));
        b.module(statements)
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(resolved_parameter_type(&session).as_deref(), Some("s32"));
}

#[test]
fn string_argument_matches_no_overload() {
    let (session, success) = compile(|b| {
        let mut statements = declare_overloads(b);
        let foo = b.symbol(&["foo"]);
        let value = b.string("x");
        let args = b.argument_list(vec![value]);
        let call = b.proc_call(foo, args);
        statements.push(stmt(b, call));
        b.module(statements)
    });
    assert!(!success);
    assert!(session.result().has_code("C051"));
}

#[test]
fn arity_mismatch_is_an_overload_failure() {
    let (session, success) = compile(|b| {
        let mut statements = declare_overloads(b);
        let foo = b.symbol(&["foo"]);
        let first = b.number("1");
        let second = b.number("2");
        let args = b.argument_list(vec![first, second]);
        let call = b.proc_call(foo, args);
        statements.push(stmt(b, call));
        b.module(statements)
    });
    assert!(!success);
    assert!(session.result().has_code("C052"));
}

#[test]
fn variadic_tail_accepts_extra_arguments() {
    let (session, success) = compile(|b| {
        // sum :: proc(values: ...u32) {}
        let sum = b.symbol(&["sum"]);
        let values = b.symbol(&["values"]);
        let u32_spec = b.named_type_spec("u32");
        let spread = b.spread_operator(Some(u32_spec));
        let parameter = b.parameter(values, spread);
        let body = b.basic_block(vec![]);
        let proc_node = b.proc_expression(vec![parameter], None, body);
        let decl = b.constant_assignment(sum, None, proc_node);
        let decl_statement = stmt(b, decl);

        let sum_use = b.symbol(&["sum"]);
        let first = b.number("1");
        let second = b.number("2");
        let third = b.number("3");
        let args = b.argument_list(vec![first, second, third]);
        let call = b.proc_call(sum_use, args);
        let call_statement = stmt(b, call);
        b.module(vec![decl_statement, call_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
}

#[test]
fn variadic_tail_accepts_zero_arguments() {
    let (session, success) = compile(|b| {
        let sum = b.symbol(&["sum"]);
        let values = b.symbol(&["values"]);
        let u32_spec = b.named_type_spec("u32");
        let spread = b.spread_operator(Some(u32_spec));
        let parameter = b.parameter(values, spread);
        let body = b.basic_block(vec![]);
        let proc_node = b.proc_expression(vec![parameter], None, body);
        let decl = b.constant_assignment(sum, None, proc_node);
        let decl_statement = stmt(b, decl);

        let sum_use = b.symbol(&["sum"]);
        let args = b.argument_list(vec![]);
        let call = b.proc_call(sum_use, args);
        let call_statement = stmt(b, call);
        b.module(vec![decl_statement, call_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
}
