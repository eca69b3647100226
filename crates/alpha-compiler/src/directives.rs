//! Compile-time directives.
//!
//! Directives stay in the graph as elements with two hooks: `evaluate`
//! runs during the evaluator pass and may rewrite the graph (`#if` erases
//! its untaken branches), `execute` runs after assembly (`#run` drives
//! the terp, `#assert` checks a folded condition).

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DirectiveKind {
    If,
    Run,
    Type,
    CoreType,
    Assert,
    Assembly,
    Foreign,
    Intrinsic,
}

impl DirectiveKind {
    pub const fn name(self) -> &'static str {
        match self {
            DirectiveKind::If => "if",
            DirectiveKind::Run => "run",
            DirectiveKind::Type => "type",
            DirectiveKind::CoreType => "core_type",
            DirectiveKind::Assert => "assert",
            DirectiveKind::Assembly => "assembly",
            DirectiveKind::Foreign => "foreign",
            DirectiveKind::Intrinsic => "intrinsic",
        }
    }

    /// Map a source spelling to a directive. `#elif` and `#else` are
    /// parsed as continuations of an `#if` chain.
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "if" | "elif" | "else" => Some(DirectiveKind::If),
            "run" => Some(DirectiveKind::Run),
            "type" => Some(DirectiveKind::Type),
            "core_type" => Some(DirectiveKind::CoreType),
            "assert" => Some(DirectiveKind::Assert),
            "assembly" => Some(DirectiveKind::Assembly),
            "foreign" => Some(DirectiveKind::Foreign),
            "intrinsic" => Some(DirectiveKind::Intrinsic),
            _ => None,
        }
    }
}

use crate::elements::{ElementData, ElementId, ElementKind};
use crate::session::Session;

impl Session {
    /// Run a directive's `evaluate` hook during the evaluator pass.
    /// `#if` selects its live branch and erases the rest; `#foreign` and
    /// `#intrinsic` mark the procedure type they wrap.
    pub(crate) fn evaluate_directive_hook(&mut self, directive: ElementId) -> bool {
        let Some(ElementData::Directive(data)) =
            self.elements.get(directive).map(|e| e.data.clone())
        else {
            return false;
        };
        match data.kind {
            DirectiveKind::If => self.evaluate_if_directive(directive),
            DirectiveKind::Foreign => {
                if let Some(proc_type) = data
                    .expression
                    .and_then(|expr| self.find_proc_type_in(expr))
                {
                    if let Some(ElementData::ProcedureType(proc)) =
                        self.elements.get_mut(proc_type).map(|e| &mut e.data)
                    {
                        proc.is_foreign = true;
                    }
                    return true;
                }
                false
            }
            DirectiveKind::Intrinsic => {
                if let Some(proc_type) = data
                    .expression
                    .and_then(|expr| self.find_proc_type_in(expr))
                {
                    if let Some(ElementData::ProcedureType(proc)) =
                        self.elements.get_mut(proc_type).map(|e| &mut e.data)
                    {
                        proc.is_intrinsic = true;
                    }
                    return true;
                }
                false
            }
            DirectiveKind::CoreType => data.expression.is_some(),
            DirectiveKind::Assembly => matches!(
                data.expression.and_then(|e| self.elements.kind_of(e)),
                Some(ElementKind::RawBlock)
            ),
            DirectiveKind::Run | DirectiveKind::Type | DirectiveKind::Assert => true,
        }
    }

    /// Walk an `#if`/`#elif`/`#else` chain: pick the first branch whose
    /// predicate folds true (an `#else` always matches), record it as the
    /// head's live body, and erase the bodies of the branches not taken.
    fn evaluate_if_directive(&mut self, head: ElementId) -> bool {
        let mut selected: Option<ElementId> = None;
        let mut current = Some(head);
        let mut losers = Vec::new();
        while let Some(id) = current {
            let Some(ElementData::Directive(data)) =
                self.elements.get(id).map(|e| e.data.clone())
            else {
                break;
            };
            if selected.is_some() {
                if let Some(body) = data.body {
                    losers.push(body);
                }
                current = data.rhs;
                continue;
            }
            let taken = match data.lhs {
                None => Some(true),
                Some(predicate) => self.const_bool(predicate),
            };
            match taken {
                Some(true) => selected = data.body,
                Some(false) => {
                    if let Some(body) = data.body {
                        losers.push(body);
                    }
                }
                // Predicate not yet foldable; leave the chain intact.
                None => return true,
            }
            current = data.rhs;
        }
        if let Some(ElementData::Directive(data)) =
            self.elements.get_mut(head).map(|e| &mut e.data)
        {
            data.true_body = selected;
        }
        for body in losers {
            self.clear_directive_body(body);
            self.elements.remove(body);
        }
        true
    }

    fn clear_directive_body(&mut self, body: ElementId) {
        let owner = self.elements.get(body).and_then(|e| e.parent_element);
        if let Some(owner) = owner {
            if let Some(ElementData::Directive(data)) =
                self.elements.get_mut(owner).map(|e| &mut e.data)
            {
                if data.body == Some(body) {
                    data.body = None;
                }
                if data.true_body == Some(body) {
                    data.true_body = None;
                }
            }
        }
    }

    fn const_bool(&mut self, expression: ElementId) -> Option<bool> {
        if let Some(value) = self.as_bool(expression) {
            return Some(value);
        }
        let folded = self.fold_element(expression)?.element;
        let value = self.as_bool(folded);
        self.elements.remove(folded);
        value
    }

    fn find_proc_type_in(&self, expression: ElementId) -> Option<ElementId> {
        let element = self.elements.get(expression)?;
        match &element.data {
            ElementData::ProcedureType(_) => Some(expression),
            ElementData::Declaration(data) => {
                let identifier = data.identifier;
                self.identifier_type(identifier)
                    .filter(|&t| {
                        matches!(
                            self.elements.kind_of(t),
                            Some(ElementKind::ProcedureType)
                        )
                    })
            }
            ElementData::Statement(data) => {
                let expression = data.expression?;
                self.find_proc_type_in(expression)
            }
            ElementData::Identifier(_) => self.identifier_type(expression).filter(|&t| {
                matches!(self.elements.kind_of(t), Some(ElementKind::ProcedureType))
            }),
            _ => None,
        }
    }

    /// Run a directive's `execute` hook after assembly.
    pub(crate) fn execute_directive(&mut self, directive: ElementId) -> bool {
        let Some(ElementData::Directive(data)) =
            self.elements.get(directive).map(|e| e.data.clone())
        else {
            return false;
        };
        match data.kind {
            DirectiveKind::Assert => {
                let Some(expression) = data.expression else {
                    return false;
                };
                match self.const_bool(expression) {
                    Some(true) => true,
                    Some(false) | None => {
                        let location = self.location_of(directive);
                        let module = self.module_of(directive);
                        self.error(
                            module,
                            "C060",
                            "compile-time assertion failed.",
                            location,
                        );
                        false
                    }
                }
            }
            DirectiveKind::Assembly => matches!(
                data.expression.and_then(|e| self.elements.kind_of(e)),
                Some(ElementKind::RawBlock)
            ),
            // #run expressions were lowered with the implicit blocks and
            // execute with the assembled image.
            DirectiveKind::Run
            | DirectiveKind::If
            | DirectiveKind::Type
            | DirectiveKind::CoreType
            | DirectiveKind::Foreign
            | DirectiveKind::Intrinsic => true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn elif_and_else_join_the_if_chain() {
        assert_eq!(DirectiveKind::from_name("if"), Some(DirectiveKind::If));
        assert_eq!(DirectiveKind::from_name("elif"), Some(DirectiveKind::If));
        assert_eq!(DirectiveKind::from_name("else"), Some(DirectiveKind::If));
        assert_eq!(DirectiveKind::from_name("when"), None);
    }
}
