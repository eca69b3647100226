//! Module compilation: import cycles and cross-session determinism.

mod common;

use alpha_ast::AstBuilder;
use alpha_compiler::elements::ElementKind;
use alpha_compiler::{Session, SessionOptions};
use common::{root_module, stmt};
use std::sync::Arc;

/// A module whose only statement imports `path`.
fn importing_module(path: &str) -> (Arc<alpha_ast::AstArena>, alpha_ast::NodeId) {
    let mut builder = AstBuilder::new();
    let path_literal = builder.string(path);
    let module_expression = builder.module_expression(path_literal);
    let import = builder.import_expression(module_expression);
    let statement = stmt(&mut builder, import);
    let root = builder.module(vec![statement]);
    (Arc::new(builder.into_arena()), root)
}

#[test]
fn mutually_importing_modules_compile_once_each() {
    let mut session = Session::new(SessionOptions::default());
    session.add_source_file("a.alpha", "");
    session.add_source_file("b.alpha", "");
    let (a_arena, a_root) = importing_module("b.alpha");
    let (b_arena, b_root) = importing_module("a.alpha");
    session.add_parsed_module("a.alpha", a_arena, a_root);
    session.add_parsed_module("b.alpha", b_arena, b_root);
    session.initialize();
    let success = session.compile();
    assert!(success, "{:?}", session.result().diagnostics());

    // Re-entering module a through the cache must return the existing
    // element instead of evaluating it again.
    assert_eq!(
        session.elements().find_by_kind(ElementKind::Module).len(),
        2
    );
    assert_eq!(
        session.elements().find_by_kind(ElementKind::Import).len(),
        2
    );
}

#[test]
fn the_root_module_is_marked_and_owned_by_the_program() {
    let mut session = Session::new(SessionOptions::default());
    session.add_source_file("main.alpha", "");
    let mut builder = AstBuilder::new();
    let x = builder.symbol(&["x"]);
    let value = builder.number("1");
    let decl = builder.assignment(x, None, Some(value));
    let statement = stmt(&mut builder, decl);
    let root = builder.module(vec![statement]);
    session.add_parsed_module("main.alpha", Arc::new(builder.into_arena()), root);
    session.initialize();
    assert!(session.compile());

    let module = root_module(&session).expect("root module exists");
    let element = session.elements().get(module).unwrap();
    match &element.data {
        alpha_compiler::elements::ElementData::Module(data) => assert!(data.is_root),
        other => panic!("expected a module element, found {other:?}"),
    }
    assert_eq!(element.parent_element, session.program());
}

#[test]
fn identical_asts_hash_identically_across_sessions() {
    let build = |builder: &mut AstBuilder| {
        let x = builder.symbol(&["x"]);
        let value = builder.number("200");
        let x_decl = builder.assignment(x, None, Some(value));
        let x_statement = builder.statement(x_decl);

        let n = builder.symbol(&["n"]);
        let u64_use = builder.symbol(&["u64"]);
        let args = builder.argument_list(vec![u64_use]);
        let size_of = builder.symbol(&["size_of"]);
        let call = builder.proc_call(size_of, args);
        let n_decl = builder.constant_assignment(n, None, call);
        let n_statement = builder.statement(n_decl);
        builder.module(vec![x_statement, n_statement])
    };

    let run = || {
        let mut builder = AstBuilder::new();
        let root = build(&mut builder);
        let mut session = Session::new(SessionOptions::default());
        session.add_source_file("main.alpha", "");
        session.add_parsed_module("main.alpha", Arc::new(builder.into_arena()), root);
        session.initialize();
        assert!(session.compile());
        let module = root_module(&session).expect("root module exists");
        session.structural_hash(module)
    };

    assert_eq!(run(), run());
}
