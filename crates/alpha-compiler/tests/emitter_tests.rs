//! Byte-code emission: block layout, frames, temps, flow control, and
//! the final encode.

mod common;

use alpha_ast::{AstBuilder, NodeId, TokenKind};
use common::{compile, stmt};

/// `main :: proc() { i: u32 := 0; while i < 10 { i := i + 1; } }`
fn counting_program(b: &mut AstBuilder) -> NodeId {
    let i = b.symbol(&["i"]);
    let i_spec = b.named_type_spec("u32");
    let zero = b.number("0");
    let i_decl = b.assignment(i, Some(i_spec), Some(zero));
    let i_statement = stmt(b, i_decl);

    let i_use = b.symbol(&["i"]);
    let ten = b.number("10");
    let predicate = b.binary_operator(TokenKind::LessThan, i_use, ten);
    let i_target = b.symbol(&["i"]);
    let i_rhs = b.symbol(&["i"]);
    let one = b.number("1");
    let sum = b.binary_operator(TokenKind::Plus, i_rhs, one);
    let step = b.assignment(i_target, None, Some(sum));
    let step_statement = stmt(b, step);
    let loop_body = b.basic_block(vec![step_statement]);
    let while_node = b.while_statement(predicate, loop_body);
    let while_statement = stmt(b, while_node);

    let body = b.basic_block(vec![i_statement, while_statement]);
    let main = b.symbol(&["main"]);
    let proc_node = b.proc_expression(vec![], None, body);
    let main_decl = b.constant_assignment(main, None, proc_node);
    let main_statement = stmt(b, main_decl);
    b.module(vec![main_statement])
}

#[test]
fn a_compiled_program_produces_an_image() {
    let (session, success) = compile(counting_program);
    assert!(success, "{:?}", session.result().diagnostics());
    let image = session.image().expect("image was assembled");
    assert!(!image.is_empty());
}

#[test]
fn procedure_emission_brackets_the_body_with_frame_code() {
    let (mut session, success) = compile(counting_program);
    assert!(success, "{:?}", session.result().diagnostics());
    let listing = session.assembler_mut().disassemble();
    assert!(listing.contains("_main_"), "missing proc label:\n{listing}");
    assert!(listing.contains("push.qw fp"), "missing prologue:\n{listing}");
    assert!(
        listing.contains("move.qw fp, sp"),
        "missing frame setup:\n{listing}"
    );
    assert!(listing.contains("    ret"), "missing epilogue:\n{listing}");
    assert!(
        listing.contains("_epilogue"),
        "missing epilogue label:\n{listing}"
    );
}

#[test]
fn while_loops_emit_entry_and_exit_labels() {
    let (mut session, success) = compile(counting_program);
    assert!(success, "{:?}", session.result().diagnostics());
    let listing = session.assembler_mut().disassemble();
    assert!(listing.contains("_while_entry_"), "{listing}");
    assert!(listing.contains("_while_exit_"), "{listing}");
    assert!(listing.contains("beq"), "{listing}");
    assert!(listing.contains("jmp"), "{listing}");
}

#[test]
fn arithmetic_reserves_deterministically_named_temp_locals() {
    let (mut session, success) = compile(counting_program);
    assert!(success, "{:?}", session.result().diagnostics());
    let listing = session.assembler_mut().disassemble();
    assert!(
        listing.contains("int_temp_1"),
        "temp local comment missing:\n{listing}"
    );
}

#[test]
fn bootstrap_and_start_frame_the_program() {
    let (mut session, success) = compile(counting_program);
    assert!(success, "{:?}", session.result().diagnostics());
    let listing = session.assembler_mut().disassemble();
    assert!(listing.contains("_bootstrap:"), "{listing}");
    assert!(listing.contains("_start:"), "{listing}");
    assert!(listing.contains("_module_init_0"), "{listing}");
    assert!(listing.contains("exit"), "{listing}");
}

#[test]
fn string_literals_are_interned_once() {
    let (mut session, success) = compile(|b| {
        let greeting = b.symbol(&["greeting"]);
        let hello_one = b.string("hello");
        let greeting_decl = b.assignment(greeting, None, Some(hello_one));
        let greeting_statement = stmt(b, greeting_decl);

        let other = b.symbol(&["other"]);
        let hello_two = b.string("hello");
        let other_decl = b.assignment(other, None, Some(hello_two));
        let other_statement = stmt(b, other_decl);
        b.module(vec![greeting_statement, other_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(session.interned_strings().len(), 1);
    let listing = session.assembler_mut().disassemble();
    assert_eq!(listing.matches("_intern_str_lit_").count(), 1 + 2, "{listing}");
}

#[test]
fn constant_module_variables_land_in_ro_data() {
    let (mut session, success) = compile(|b| {
        let limit = b.symbol(&["limit"]);
        let value = b.number("9");
        let decl = b.constant_assignment(limit, None, value);
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    let listing = session.assembler_mut().disassemble();
    assert!(listing.contains(".section ro_data"), "{listing}");
    assert!(listing.contains("_limit_"), "{listing}");
}

#[test]
fn used_types_populate_the_type_info_table() {
    let (mut session, success) = compile(counting_program);
    assert!(success, "{:?}", session.result().diagnostics());
    let listing = session.assembler_mut().disassemble();
    assert!(listing.contains("_ti_u32"), "{listing}");
}
