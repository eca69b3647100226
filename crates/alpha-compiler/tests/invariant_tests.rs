//! Graph-wide invariants over a fully compiled session.

mod common;

use alpha_compiler::elements::{types, ElementData, ElementKind};
use alpha_compiler::Session;
use common::{compile, stmt};

fn compiled_sample() -> Session {
    let (session, success) = compile(|b| {
        // x := 200;
        let x = b.symbol(&["x"]);
        let x_value = b.number("200");
        let x_decl = b.assignment(x, None, Some(x_value));
        let x_statement = stmt(b, x_decl);

        // n :: size_of(u64);
        let n = b.symbol(&["n"]);
        let u64_use = b.symbol(&["u64"]);
        let args = b.argument_list(vec![u64_use]);
        let size_of = b.symbol(&["size_of"]);
        let call = b.proc_call(size_of, args);
        let n_decl = b.constant_assignment(n, None, call);
        let n_statement = stmt(b, n_decl);

        // main :: proc() { y: u32 := 1; y := y + 1; }
        let y = b.symbol(&["y"]);
        let y_spec = b.named_type_spec("u32");
        let one = b.number("1");
        let y_decl = b.assignment(y, Some(y_spec), Some(one));
        let y_statement = stmt(b, y_decl);
        let y_use = b.symbol(&["y"]);
        let y_use_rhs = b.symbol(&["y"]);
        let another_one = b.number("1");
        let sum = b.binary_operator(alpha_ast::TokenKind::Plus, y_use_rhs, another_one);
        let assign = b.assignment(y_use, None, Some(sum));
        let assign_statement = stmt(b, assign);
        let body = b.basic_block(vec![y_statement, assign_statement]);
        let main = b.symbol(&["main"]);
        let proc_node = b.proc_expression(vec![], None, body);
        let main_decl = b.constant_assignment(main, None, proc_node);
        let main_statement = stmt(b, main_decl);

        b.module(vec![x_statement, n_statement, main_statement])
    });
    assert!(success, "{:?}", session.result().diagnostics());
    session
}

#[test]
fn owned_children_point_back_at_their_parent() {
    let session = compiled_sample();
    for id in session.elements().ids() {
        let element = session.elements().get(id).unwrap();
        for child in element.owned_children() {
            let Some(child_element) = session.elements().get(child) else {
                panic!(
                    "{} {id} owns a removed element {child}",
                    element.kind().name()
                );
            };
            assert!(
                child_element.non_owning || child_element.parent_element == Some(id),
                "{} {child} sits in the owned list of {} {id} but points at {:?}",
                child_element.kind().name(),
                element.kind().name(),
                child_element.parent_element,
            );
        }
    }
}

#[test]
fn parents_own_their_children_unless_marked_non_owning() {
    let session = compiled_sample();
    for id in session.elements().ids() {
        let element = session.elements().get(id).unwrap();
        if element.non_owning {
            continue;
        }
        let Some(parent) = element.parent_element else {
            continue;
        };
        let Some(parent_element) = session.elements().get(parent) else {
            continue;
        };
        assert!(
            parent_element.owned_children().contains(&id),
            "{} {id} claims parent {} {parent} which does not own it",
            element.kind().name(),
            parent_element.kind().name(),
        );
    }
}

#[test]
fn no_unknown_types_survive_a_successful_compile() {
    let session = compiled_sample();
    assert!(session
        .elements()
        .find_by_kind(ElementKind::UnknownType)
        .is_empty());
    for reference in session.elements().find_by_kind(ElementKind::TypeReference) {
        let ElementData::TypeReference(data) =
            &session.elements().get(reference).unwrap().data
        else {
            continue;
        };
        let resolved = data.referenced_type;
        assert!(
            resolved.is_some(),
            "type reference {reference} was never resolved"
        );
        assert!(!types::is_unknown_type(
            session.elements(),
            resolved.unwrap()
        ));
    }
}

#[test]
fn resolved_identifiers_have_concrete_types() {
    let session = compiled_sample();
    for identifier in session.elements().find_by_kind(ElementKind::Identifier) {
        let ElementData::Identifier(data) =
            &session.elements().get(identifier).unwrap().data
        else {
            continue;
        };
        if let Some(type_ref) = data.type_ref {
            assert!(
                !types::is_unknown_type_ref(session.elements(), type_ref),
                "identifier {identifier} kept an unknown type"
            );
        }
    }
}

#[test]
fn fully_qualified_type_names_are_unique_per_scope() {
    let session = compiled_sample();
    for block in session.elements().find_by_kind(ElementKind::Block) {
        let ElementData::Block(data) = &session.elements().get(block).unwrap().data else {
            continue;
        };
        // IndexMap keys are unique by construction; assert the mapping
        // is consistent with each type's own symbol.
        for (name, &type_id) in &data.types {
            assert_eq!(&types::symbol_name(session.elements(), type_id), name);
        }
    }
}

#[test]
fn worklists_are_drained_after_compilation() {
    let session = compiled_sample();
    assert_eq!(session.scopes().pending_unknown_types(), 0);
    assert_eq!(session.scopes().pending_unresolved_references(), 0);
}

#[test]
fn size_of_and_align_of_agree_with_type_headers() {
    for name in ["u8", "u16", "u32", "u64", "s32", "f64"] {
        let (session, success) = compile(|b| {
            let n = b.symbol(&["n"]);
            let type_use = b.symbol(&[name]);
            let args = b.argument_list(vec![type_use]);
            let size_of = b.symbol(&["size_of"]);
            let call = b.proc_call(size_of, args);
            let decl = b.constant_assignment(n, None, call);
            let statement = stmt(b, decl);
            b.module(vec![statement])
        });
        assert!(success);
        let n = common::find_identifier(&session, "n").unwrap();
        let expected = alpha_common::numeric::properties_for(name)
            .unwrap()
            .size_in_bytes as u64;
        assert_eq!(session.as_integer(n), Some(expected), "size_of({name})");
    }
}
