//! Shared helpers for the compiler integration tests: build an AST with
//! the syntax builder, run a full session over it, and poke at the
//! resulting element graph.

// Each test binary uses its own subset of these helpers.
#![allow(dead_code)]

use alpha_ast::{AstBuilder, NodeId};
use alpha_common::QualifiedSymbol;
use alpha_compiler::elements::{types, ElementData, ElementId};
use alpha_compiler::{Session, SessionOptions};
use std::sync::Arc;

/// Build a single-module program and compile it end to end.
pub fn compile(build: impl FnOnce(&mut AstBuilder) -> NodeId) -> (Session, bool) {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
    let mut builder = AstBuilder::new();
    let root = build(&mut builder);
    let mut session = Session::new(SessionOptions::default());
    session.add_source_file("main.alpha", "");
    session.add_parsed_module("main.alpha", Arc::new(builder.into_arena()), root);
    session.initialize();
    let success = session.compile();
    (session, success)
}

/// The root module's scope block.
pub fn root_scope(session: &Session) -> Option<ElementId> {
    let program = session.program()?;
    let ElementData::Program(program_data) = &session.elements().get(program)?.data else {
        return None;
    };
    let module = program_data.module?;
    let ElementData::Module(module_data) = &session.elements().get(module)?.data else {
        return None;
    };
    module_data.scope
}

/// The root module element.
pub fn root_module(session: &Session) -> Option<ElementId> {
    let program = session.program()?;
    match &session.elements().get(program)?.data {
        ElementData::Program(data) => data.module,
        _ => None,
    }
}

/// Find a module-scope identifier by leaf name.
pub fn find_identifier(session: &Session, name: &str) -> Option<ElementId> {
    let scope = root_scope(session)?;
    session
        .scopes()
        .find_identifier(session.elements(), &QualifiedSymbol::new(name), Some(scope))
        .first()
        .copied()
}

/// Display name of an identifier's resolved type.
pub fn identifier_type_name(session: &Session, name: &str) -> Option<String> {
    let identifier = find_identifier(session, name)?;
    let ElementData::Identifier(data) = &session.elements().get(identifier)?.data else {
        return None;
    };
    let type_ref = data.type_ref?;
    let type_id = types::referenced_type(session.elements(), type_ref)?;
    Some(types::display_name(session.elements(), type_id))
}

/// Statement node helper: wrap an expression node and return the id.
pub fn stmt(builder: &mut AstBuilder, expression: NodeId) -> NodeId {
    builder.statement(expression)
}

/// True when any identifier element anywhere in the graph carries `name`.
pub fn identifier_exists(session: &Session, name: &str) -> bool {
    session
        .elements()
        .find_by_kind(alpha_compiler::ElementKind::Identifier)
        .into_iter()
        .any(|identifier| {
            match session.elements().get(identifier).map(|e| &e.data) {
                Some(ElementData::Identifier(data)) => {
                    matches!(
                        session.elements().get(data.symbol).map(|e| &e.data),
                        Some(ElementData::Symbol(symbol)) if symbol.name == name
                    )
                }
                _ => false,
            }
        })
}
