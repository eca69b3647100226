//! Declaration and assignment type checking, including pointer-to-void
//! compatibility.

mod common;

use common::{compile, identifier_type_name, stmt};

#[test]
fn narrowing_initializer_is_a_type_mismatch() {
    let (session, success) = compile(|b| {
        let x = b.symbol(&["x"]);
        let spec = b.named_type_spec("u8");
        let value = b.number("300");
        let decl = b.assignment(x, Some(spec), Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(!success);
    assert!(session.result().has_code("C051"));
    let message = session
        .result()
        .diagnostics()
        .iter()
        .find(|d| d.code == "C051")
        .map(|d| d.message.clone())
        .unwrap_or_default();
    assert!(
        message.contains("cannot assign u16 to u8"),
        "unexpected message: {message}"
    );
}

#[test]
fn widening_initializer_is_accepted() {
    let (session, success) = compile(|b| {
        let x = b.symbol(&["x"]);
        let spec = b.named_type_spec("u32");
        let value = b.number("300");
        let decl = b.assignment(x, Some(spec), Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
}

#[test]
fn narrowing_signed_initializer_is_rejected() {
    // A signed target accepts only strictly smaller signed sources.
    let (session, success) = compile(|b| {
        let a = b.symbol(&["a"]);
        let a_spec = b.named_type_spec("s32");
        let a_value = b.number("1");
        let a_decl = b.assignment(a, Some(a_spec), Some(a_value));
        let a_statement = stmt(b, a_decl);

        let c = b.symbol(&["c"]);
        let c_spec = b.named_type_spec("s16");
        let a_use = b.symbol(&["a"]);
        let c_decl = b.assignment(c, Some(c_spec), Some(a_use));
        let c_statement = stmt(b, c_decl);
        b.module(vec![a_statement, c_statement])
    });
    assert!(!success);
    assert!(session.result().has_code("C051"));
}

#[test]
fn void_pointer_accepts_any_pointer() {
    let (session, success) = compile(|b| {
        // n: s32 := 100;
        let n = b.symbol(&["n"]);
        let n_spec = b.named_type_spec("s32");
        let n_value = b.number("100");
        let n_decl = b.assignment(n, Some(n_spec), Some(n_value));
        let n_statement = stmt(b, n_decl);

        // p: ^void := nil;
        let p = b.symbol(&["p"]);
        let void_spec = b.named_type_spec("void");
        let p_spec = b.pointer_spec(void_spec);
        let nil = b.nil();
        let p_decl = b.assignment(p, Some(p_spec), Some(nil));
        let p_statement = stmt(b, p_decl);

        // p := address_of(n);
        let p_again = b.symbol(&["p"]);
        let n_use = b.symbol(&["n"]);
        let args = b.argument_list(vec![n_use]);
        let address_of = b.symbol(&["address_of"]);
        let call = b.proc_call(address_of, args);
        let assign = b.assignment(p_again, None, Some(call));
        let assign_statement = stmt(b, assign);

        b.module(vec![n_statement, p_statement, assign_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(
        identifier_type_name(&session, "p").as_deref(),
        Some("^void")
    );
}

#[test]
fn typed_pointer_rejects_a_void_pointer() {
    let (session, success) = compile(|b| {
        let n = b.symbol(&["n"]);
        let n_spec = b.named_type_spec("s32");
        let n_value = b.number("100");
        let n_decl = b.assignment(n, Some(n_spec), Some(n_value));
        let n_statement = stmt(b, n_decl);

        let p = b.symbol(&["p"]);
        let void_spec = b.named_type_spec("void");
        let p_spec = b.pointer_spec(void_spec);
        let nil = b.nil();
        let p_decl = b.assignment(p, Some(p_spec), Some(nil));
        let p_statement = stmt(b, p_decl);

        // q: ^s32 := address_of(n);
        let q = b.symbol(&["q"]);
        let s32_spec = b.named_type_spec("s32");
        let q_spec = b.pointer_spec(s32_spec);
        let n_use = b.symbol(&["n"]);
        let args = b.argument_list(vec![n_use]);
        let address_of = b.symbol(&["address_of"]);
        let call = b.proc_call(address_of, args);
        let q_decl = b.assignment(q, Some(q_spec), Some(call));
        let q_statement = stmt(b, q_decl);

        // q := p; -- rejected
        let q_again = b.symbol(&["q"]);
        let p_use = b.symbol(&["p"]);
        let assign = b.assignment(q_again, None, Some(p_use));
        let assign_statement = stmt(b, assign);

        b.module(vec![n_statement, p_statement, q_statement, assign_statement])
    });
    assert!(!success);
    assert!(session.result().has_code("C051"));
}

#[test]
fn uninitialized_literal_skips_the_declaration_check() {
    let (session, success) = compile(|b| {
        let x = b.symbol(&["x"]);
        let spec = b.named_type_spec("u8");
        let value = b.uninitialized();
        let decl = b.assignment(x, Some(spec), Some(value));
        let statement = stmt(b, decl);
        b.module(vec![statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    assert_eq!(identifier_type_name(&session, "x").as_deref(), Some("u8"));
}
