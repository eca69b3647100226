//! The compilation session.
//!
//! Owns the element registry, scope manager, assembler, terp, interned
//! strings, and module caches, and drives the phase sequence: core types,
//! built-in procedures, model generation, the fixed-point resolution
//! passes, constant folding, type checking, emission, assembly, and
//! directive execution. Each phase is timed into the task list; phases
//! short-circuit when a failure invalidates downstream invariants.

use crate::element_map::ElementMap;
use crate::elements::{types, ElementData, ElementId, ElementKind, OperatorKind};
use crate::emitter::ByteCodeEmitter;
use crate::intrinsics::IntrinsicKind;
use crate::scope_manager::ScopeManager;
use crate::string_intern::StringInternMap;
use alpha_ast::{AstArena, ModuleParser, NodeId};
use alpha_common::limits::MAX_TYPE_RESOLUTION_SWEEPS;
use alpha_common::{
    next_id, CompileResult, Id, QualifiedSymbol, SourceFile, SourceLocation,
};
use alpha_vm::{
    Assembler, AssemblySymbolKind, AssemblySymbolValue, Terp, TRAP_GETC, TRAP_PUTC,
};
use indexmap::{IndexMap, IndexSet};
use rustc_hash::FxHashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, debug_span};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompilePhase {
    Start,
    Success,
    Failed,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModuleType {
    Program,
    Module,
}

pub type CompileCallback = Box<dyn Fn(CompilePhase, ModuleType, &Path)>;

pub struct SessionOptions {
    pub allocator: String,
    pub heap_size: usize,
    pub stack_size: usize,
    pub ffi_heap_size: usize,
    pub debugger_enabled: bool,
    pub output_ast_graphs: bool,
    pub dom_graph_file: Option<PathBuf>,
    pub verbose: bool,
    pub compile_callback: Option<CompileCallback>,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            allocator: "system".to_string(),
            heap_size: 2 * 1024 * 1024,
            stack_size: 64 * 1024,
            ffi_heap_size: 16 * 1024,
            debugger_enabled: false,
            output_ast_graphs: false,
            dom_graph_file: None,
            verbose: false,
            compile_callback: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct SessionTask {
    pub name: String,
    pub elapsed: Duration,
    pub include_in_total: bool,
}

pub struct Session {
    options: SessionOptions,
    result: CompileResult,
    pub(crate) elements: ElementMap,
    pub(crate) scopes: ScopeManager,
    pub(crate) assembler: Assembler,
    terp: Terp,
    interned_strings: StringInternMap,
    source_files: IndexMap<Id, SourceFile>,
    source_paths: FxHashMap<PathBuf, Id>,
    source_file_stack: Vec<Id>,
    /// Module cache keyed by source path; guards import cycles.
    pub(crate) modules: FxHashMap<PathBuf, ElementId>,
    asts: FxHashMap<PathBuf, (Arc<AstArena>, NodeId)>,
    parser: Option<Box<dyn ModuleParser>>,
    pub(crate) program: Option<ElementId>,
    pub(crate) intrinsic_proc_types: FxHashMap<IntrinsicKind, ElementId>,
    pub(crate) used_types: IndexSet<ElementId>,
    infer_guard: rustc_hash::FxHashSet<ElementId>,
    tasks: Vec<SessionTask>,
    run_enabled: bool,
    image: Option<Vec<u8>>,
}

impl Session {
    pub fn new(options: SessionOptions) -> Self {
        let terp = Terp::new(options.heap_size, options.stack_size);
        Session {
            options,
            result: CompileResult::new(),
            elements: ElementMap::new(),
            scopes: ScopeManager::new(),
            assembler: Assembler::new(),
            terp,
            interned_strings: StringInternMap::new(),
            source_files: IndexMap::new(),
            source_paths: FxHashMap::default(),
            source_file_stack: Vec::new(),
            modules: FxHashMap::default(),
            asts: FxHashMap::default(),
            parser: None,
            program: None,
            intrinsic_proc_types: FxHashMap::default(),
            used_types: IndexSet::new(),
            infer_guard: rustc_hash::FxHashSet::default(),
            tasks: Vec::new(),
            run_enabled: false,
            image: None,
        }
    }

    // ------------------------------------------------------------------
    // accessors

    pub fn options(&self) -> &SessionOptions {
        &self.options
    }

    pub fn result(&self) -> &CompileResult {
        &self.result
    }

    pub fn result_mut(&mut self) -> &mut CompileResult {
        &mut self.result
    }

    pub fn elements(&self) -> &ElementMap {
        &self.elements
    }

    pub fn elements_mut(&mut self) -> &mut ElementMap {
        &mut self.elements
    }

    pub fn scopes(&self) -> &ScopeManager {
        &self.scopes
    }

    pub fn scopes_mut(&mut self) -> &mut ScopeManager {
        &mut self.scopes
    }

    pub fn assembler(&self) -> &Assembler {
        &self.assembler
    }

    pub fn assembler_mut(&mut self) -> &mut Assembler {
        &mut self.assembler
    }

    pub fn interned_strings(&self) -> &StringInternMap {
        &self.interned_strings
    }

    pub fn program(&self) -> Option<ElementId> {
        self.program
    }

    pub fn tasks(&self) -> &[SessionTask] {
        &self.tasks
    }

    pub fn image(&self) -> Option<&[u8]> {
        self.image.as_deref()
    }

    pub fn used_types(&self) -> impl Iterator<Item = ElementId> + '_ {
        self.used_types.iter().copied()
    }

    pub fn enable_run(&mut self) {
        self.run_enabled = true;
    }

    pub fn set_parser(&mut self, parser: Box<dyn ModuleParser>) {
        self.parser = Some(parser);
    }

    // ------------------------------------------------------------------
    // sources

    pub fn add_source_file(&mut self, path: impl Into<PathBuf>, content: impl Into<String>) -> Id {
        let path = path.into();
        if let Some(&id) = self.source_paths.get(&path) {
            return id;
        }
        let id = next_id();
        self.source_paths.insert(path.clone(), id);
        self.source_files
            .insert(id, SourceFile::new(id, path, content.into()));
        id
    }

    pub fn source_file(&self, id: Id) -> Option<&SourceFile> {
        self.source_files.get(&id)
    }

    pub fn current_source_file(&self) -> Option<Id> {
        self.source_file_stack.last().copied()
    }

    pub fn push_source_file(&mut self, id: Id) {
        self.source_file_stack.push(id);
    }

    pub fn pop_source_file(&mut self) -> Option<Id> {
        self.source_file_stack.pop()
    }

    /// Register a pre-parsed module so `compile` can proceed without the
    /// parser collaborator (the driver and the tests use this).
    pub fn add_parsed_module(
        &mut self,
        path: impl Into<PathBuf>,
        arena: Arc<AstArena>,
        root: NodeId,
    ) {
        self.asts.insert(path.into(), (arena, root));
    }

    // ------------------------------------------------------------------
    // diagnostics

    pub fn error(
        &mut self,
        module: Option<ElementId>,
        code: &str,
        message: impl Into<String>,
        location: SourceLocation,
    ) {
        let mut diagnostic = alpha_common::Diagnostic::error(code, message, location);
        if let Some(module_id) = module {
            diagnostic = diagnostic.in_module(module_id);
            if let Some(ElementData::Module(data)) = self.elements.get(module_id).map(|e| &e.data)
            {
                if let Some(file) = data.source_file.and_then(|id| self.source_files.get(&id)) {
                    diagnostic = diagnostic.in_file(file.path.display().to_string());
                }
            }
        }
        self.result.push(diagnostic);
    }

    pub(crate) fn module_of(&self, element: ElementId) -> Option<ElementId> {
        self.elements.get(element).and_then(|e| e.module)
    }

    pub(crate) fn location_of(&self, element: ElementId) -> SourceLocation {
        self.elements
            .get(element)
            .map(|e| e.location)
            .unwrap_or_default()
    }

    // ------------------------------------------------------------------
    // task timing

    pub(crate) fn time_task(
        &mut self,
        name: &str,
        include_in_total: bool,
        task: impl FnOnce(&mut Self) -> bool,
    ) -> bool {
        let span = debug_span!("task", name);
        let _enter = span.enter();
        let start = Instant::now();
        let success = task(self);
        let elapsed = start.elapsed();
        debug!(?elapsed, success, "{name}");
        self.tasks.push(SessionTask {
            name: name.to_string(),
            elapsed,
            include_in_total,
        });
        success
    }

    fn raise_phase(&self, phase: CompilePhase, module_type: ModuleType, path: &Path) {
        if let Some(callback) = &self.options.compile_callback {
            callback(phase, module_type, path);
        }
    }

    // ------------------------------------------------------------------
    // lifecycle

    /// Create the program element and register the standard traps.
    pub fn initialize(&mut self) -> bool {
        if self.program.is_none() {
            let program = self.make_program();
            self.program = Some(program);
        }
        self.terp.register_trap(
            TRAP_PUTC,
            Box::new(|stack| {
                if let Some(value) = stack.pop() {
                    if let Some(ch) = char::from_u32(value as u32) {
                        print!("{ch}");
                    }
                }
            }),
        );
        self.terp.register_trap(
            TRAP_GETC,
            Box::new(|stack| {
                use std::io::Read;
                let mut byte = [0u8; 1];
                let read = std::io::stdin().read(&mut byte).unwrap_or(0);
                stack.push(if read == 1 { byte[0] as u64 } else { u64::MAX });
            }),
        );
        !self.result.is_failed()
    }

    /// Run the full pipeline over the registered source files. The
    /// session's allocator and logger ride the ambient context stack for
    /// the duration of the run.
    pub fn compile(&mut self) -> bool {
        if self.program.is_none() && !self.initialize() {
            return false;
        }
        alpha_common::context::push(alpha_common::context::Context::new(
            self.options.allocator.clone(),
            "alpha::compiler",
        ));
        let success = self.compile_pipeline();
        alpha_common::context::pop();
        success
    }

    fn compile_pipeline(&mut self) -> bool {
        self.time_task("assembler: preparation", true, |session| {
            if let Some(file) = session.source_files.values().next() {
                let listing_name = file
                    .path
                    .with_extension("basm")
                    .display()
                    .to_string();
                session.assembler.listing_mut().add_source_file(&listing_name);
                session.assembler.listing_mut().select_source_file(&listing_name);
            }
            true
        });

        self.time_task("compiler: preparation", true, |session| {
            let program = session.program.expect("program element exists");
            let block = session.make_block(None);
            if let Some(element) = session.elements.get_mut(block) {
                element.parent_element = Some(program);
            }
            if let Some(element) = session.elements.get_mut(program) {
                if let ElementData::Program(data) = &mut element.data {
                    data.block = Some(block);
                }
            }
            session.scopes.push_block(block);
            true
        });

        self.time_task("compiler: core types", true, |session| {
            session.initialize_core_types();
            true
        });

        self.time_task("compiler: built-in procedures", true, |session| {
            session.initialize_built_in_procedures();
            true
        });

        let success = self.time_task("compiler: generate model", true, |session| {
            let files: Vec<Id> = session.source_files.keys().copied().collect();
            for file in files {
                if session.compile_module(file).is_none() {
                    return false;
                }
            }
            true
        });
        if !success {
            return false;
        }

        if !self.time_task("compiler: resolve unknown types (phase 1)", true, |s| {
            s.resolve_unknown_types(false)
        }) {
            return false;
        }

        if !self.time_task("compiler: resolve unknown identifiers", true, |s| {
            s.resolve_unknown_identifiers()
        }) {
            return false;
        }

        if !self.time_task("compiler: resolve unknown types (phase 2)", true, |s| {
            s.resolve_unknown_types(false)
        }) {
            return false;
        }

        if !self.time_task("compiler: constant expression folding", true, |s| {
            s.fold_constant_expressions()
        }) {
            return false;
        }

        if !self.time_task("compiler: type check", true, |s| s.type_check()) {
            return false;
        }

        if !self.result.is_failed() {
            self.time_task("compiler: generate byte-code", true, |session| {
                ByteCodeEmitter::new(session).emit()
            });

            let success = self.time_task("assembler: encode byte-code", true, |session| {
                session.encode_byte_code()
            });

            if self.options.verbose {
                self.time_task("assembler: listing file", true, |session| {
                    session.assembler.disassemble();
                    true
                });
            }

            if success {
                let success = self.time_task("compiler: execute directives", true, |s| {
                    s.execute_directives()
                });
                if success && self.run_enabled {
                    self.time_task("compiler: execute byte-code", true, |s| s.run());
                }
            }
        }

        !self.result.is_failed()
    }

    fn encode_byte_code(&mut self) -> bool {
        let mut assembler = std::mem::take(&mut self.assembler);
        let mut result = std::mem::take(&mut self.result);
        let mut success;
        {
            let mut resolver = |kind: AssemblySymbolKind, scope: Option<Id>, name: &str| {
                self.resolve_assembly_symbol(kind, scope, name)
            };
            success = assembler.resolve_symbols(&mut resolver, &mut result);
        }
        success &= assembler.apply_addresses(&mut result);
        success &= assembler.resolve_labels(&mut result);
        if success {
            self.image = assembler.assemble(&mut result);
            success = self.image.is_some();
        }
        self.assembler = assembler;
        self.result = result;
        success
    }

    /// Execute the assembled image on the terp.
    pub fn run(&mut self) -> bool {
        let Some(image) = self.image.take() else {
            return false;
        };
        let mut result = std::mem::take(&mut self.result);
        let success = self.terp.run(&image, &mut result);
        self.result = result;
        self.image = Some(image);
        success
    }

    // ------------------------------------------------------------------
    // phase 1: core types

    pub(crate) fn initialize_core_types(&mut self) {
        let parent_scope = self.scopes.current_scope();
        for props in alpha_common::numeric::NUMERIC_TYPE_PROPERTIES {
            let type_id = self.make_numeric_type(
                parent_scope,
                props.name,
                props.min,
                props.max,
                props.is_signed,
                props.number_class,
                props.size_in_bytes,
            );
            self.add_type_to_scope(type_id);
        }
        let void = self.make_void_type(parent_scope);
        self.add_type_to_scope(void);
        let module_scope = self.make_block(parent_scope);
        let module_type = self.make_module_type(parent_scope, module_scope);
        self.add_type_to_scope(module_type);
        let namespace_type = self.make_namespace_type(parent_scope);
        self.add_type_to_scope(namespace_type);
        let bool_type = self.make_bool_type(parent_scope);
        self.add_type_to_scope(bool_type);
        let rune_type = self.make_rune_type(parent_scope);
        self.add_type_to_scope(rune_type);
        let tuple_scope = self.make_block(parent_scope);
        let tuple_type = self.make_tuple_type(parent_scope, tuple_scope);
        self.add_type_to_scope(tuple_type);
        let generic_type = self.make_generic_type(parent_scope, Vec::new());
        self.add_type_to_scope(generic_type);
    }

    // ------------------------------------------------------------------
    // phase 2: built-in procedures

    pub(crate) fn initialize_built_in_procedures(&mut self) {
        let parent_scope = self.scopes.current_scope();
        for &kind in crate::intrinsics::INTRINSIC_KINDS {
            let proc_type = self.make_intrinsic_proc_type(parent_scope, kind);
            self.intrinsic_proc_types.insert(kind, proc_type);
        }
    }

    // ------------------------------------------------------------------
    // phase 3: model generation

    /// Compile one source file into a module element, caching by path so
    /// import cycles return the existing module without re-evaluating.
    pub fn compile_module(&mut self, source_id: Id) -> Option<ElementId> {
        let path = self.source_files.get(&source_id)?.path.clone();
        if let Some(&module) = self.modules.get(&path) {
            return Some(module);
        }

        let is_root = self.current_source_file().is_none();
        let module_type = if is_root {
            ModuleType::Program
        } else {
            ModuleType::Module
        };
        self.raise_phase(CompilePhase::Start, module_type, &path);
        self.push_source_file(source_id);

        let parsed = self.parse(source_id);
        let module = match parsed {
            Some((arena, root)) => self.evaluate_module(&arena, root, source_id),
            None => {
                self.error(
                    None,
                    "P002",
                    format!("no syntax tree for module: {}", path.display()),
                    SourceLocation::default(),
                );
                None
            }
        };

        if let Some(module) = module {
            if let Some(element) = self.elements.get_mut(module) {
                if let ElementData::Module(data) = &mut element.data {
                    data.source_file = Some(source_id);
                    data.is_root = is_root;
                }
            }
            if is_root {
                let program = self.program;
                if let Some(program) = program {
                    if let Some(element) = self.elements.get_mut(program) {
                        if let ElementData::Program(data) = &mut element.data {
                            data.module = Some(module);
                        }
                    }
                    if let Some(element) = self.elements.get_mut(module) {
                        element.parent_element = Some(program);
                    }
                }
            }
        }

        self.pop_source_file();
        self.raise_phase(
            if self.result.is_failed() {
                CompilePhase::Failed
            } else {
                CompilePhase::Success
            },
            module_type,
            &path,
        );

        module
    }

    /// Compile a module referenced by import path. The path must name a
    /// registered source file.
    pub fn compile_module_by_path(&mut self, path: &Path) -> Option<ElementId> {
        match self.source_paths.get(path).copied() {
            Some(source_id) => self.compile_module(source_id),
            None => {
                self.error(
                    None,
                    "P001",
                    format!("unable to locate module source: {}", path.display()),
                    SourceLocation::default(),
                );
                None
            }
        }
    }

    fn parse(&mut self, source_id: Id) -> Option<(Arc<AstArena>, NodeId)> {
        let path = self.source_files.get(&source_id)?.path.clone();
        if let Some((arena, root)) = self.asts.get(&path) {
            return Some((Arc::clone(arena), *root));
        }
        let mut parser = self.parser.take()?;
        let source = self.source_files.get(&source_id)?.clone();
        let mut builder = alpha_ast::AstBuilder::new();
        let root = parser.parse(&source, &mut builder, &mut self.result);
        self.parser = Some(parser);
        let root = root?;
        let arena = Arc::new(builder.into_arena());
        self.asts.insert(path, (Arc::clone(&arena), root));
        Some((arena, root))
    }

    // ------------------------------------------------------------------
    // phases 4/6/8c: resolve unknown types

    /// Drain the unknown-type worklist. Sweeps repeat until the list is
    /// stable (each iteration either shrinks the worklist or the pass
    /// stops); leftovers are then diagnosed once. In a final pass any
    /// leftover is a hard error; otherwise only placeholders with no
    /// expression to infer from are.
    pub fn resolve_unknown_types(&mut self, final_pass: bool) -> bool {
        for _ in 0..MAX_TYPE_RESOLUTION_SWEEPS {
            let before = self.scopes.pending_unknown_types();
            self.resolve_unknown_types_sweep();
            let after = self.scopes.pending_unknown_types();
            if after == 0 || after == before {
                break;
            }
        }

        let mut hard_failures = 0usize;
        let leftovers: Vec<ElementId> =
            self.scopes.identifiers_with_unknown_types().clone();
        for var in leftovers {
            let has_expression = self
                .unknown_placeholder_of(var)
                .and_then(|unknown| match self.elements.get(unknown).map(|e| &e.data) {
                    Some(ElementData::UnknownType(data)) => Some(data.expression.is_some()),
                    _ => None,
                })
                .unwrap_or(false);
            if final_pass || !has_expression {
                hard_failures += 1;
                let name = self.identifier_name(var);
                let location = self.location_of(var);
                let module = self.module_of(var);
                self.error(
                    module,
                    "P004",
                    format!("unable to resolve type for identifier: {name}"),
                    location,
                );
            }
        }

        if final_pass {
            self.scopes.pending_unknown_types() == 0
        } else {
            hard_failures == 0
        }
    }

    /// The unknown-type placeholder behind an identifier's reference,
    /// peeling one pointer layer when present.
    fn unknown_placeholder_of(&self, identifier: ElementId) -> Option<ElementId> {
        let type_ref = match self.elements.get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => data.type_ref,
            _ => None,
        }?;
        let referenced = types::referenced_type(&self.elements, type_ref)?;
        if types::is_pointer_type(&self.elements, referenced) {
            let base_ref = types::pointer_base_ref(&self.elements, referenced)?;
            let base = types::referenced_type(&self.elements, base_ref)?;
            matches!(
                self.elements.get(base).map(|e| &e.data),
                Some(ElementData::UnknownType(_))
            )
            .then_some(base)
        } else {
            matches!(
                self.elements.get(referenced).map(|e| &e.data),
                Some(ElementData::UnknownType(_))
            )
            .then_some(referenced)
        }
    }

    fn resolve_unknown_types_sweep(&mut self) {
        let pending = std::mem::take(self.scopes.identifiers_with_unknown_types());
        let mut still_pending = Vec::new();
        let mut to_remove: Vec<ElementId> = Vec::new();

        for var in pending {
            let Some(ElementData::Identifier(identifier)) =
                self.elements.get(var).map(|e| e.data.clone())
            else {
                continue;
            };
            let Some(type_ref) = identifier.type_ref else {
                continue;
            };
            if !types::is_unknown_type_ref(&self.elements, type_ref) {
                continue;
            }

            let referenced = types::referenced_type(&self.elements, type_ref);
            let (pointer, unknown) = match referenced {
                Some(type_id) if types::is_pointer_type(&self.elements, type_id) => {
                    let base_ref = types::pointer_base_ref(&self.elements, type_id);
                    let unknown = base_ref
                        .and_then(|r| types::referenced_type(&self.elements, r))
                        .filter(|&t| {
                            matches!(
                                self.elements.get(t).map(|e| &e.data),
                                Some(ElementData::UnknownType(_))
                            )
                        });
                    (Some(type_id), unknown)
                }
                Some(type_id) => (None, Some(type_id)),
                None => (None, None),
            };
            let unknown_data = unknown.and_then(|u| match self.elements.get(u).map(|e| &e.data) {
                Some(ElementData::UnknownType(data)) => Some(data.clone()),
                _ => None,
            });

            // Assignments infer the declared type from their right side.
            let parent = self.elements.get(var).and_then(|e| e.parent_element);
            let assignment_rhs = parent.and_then(|p| match self.elements.get(p).map(|e| &e.data) {
                Some(ElementData::BinaryOperator(op)) if op.op == OperatorKind::Assignment => {
                    Some(op.rhs)
                }
                _ => None,
            });

            if let Some(rhs) = assignment_rhs {
                if let Some(inferred) = self.infer_with_reference(rhs) {
                    self.set_identifier_type_ref(var, inferred.reference);
                }
            } else {
                let init_expression = identifier.initializer.and_then(|init| {
                    match self.elements.get(init).map(|e| &e.data) {
                        Some(ElementData::Initializer(data)) => data.expression,
                        _ => None,
                    }
                });
                let expression = init_expression
                    .or_else(|| unknown_data.as_ref().and_then(|data| data.expression));

                if expression.is_none() || pointer.is_some() {
                    let symbol = unknown_data
                        .as_ref()
                        .map(|data| data.symbol.clone())
                        .unwrap_or_default();
                    let scope = self.elements.get(var).and_then(|e| e.parent_scope);
                    if let Some(found) = self.scopes.find_type(&self.elements, &symbol, scope) {
                        let new_ref = self.make_type_reference(scope, symbol, Some(found));
                        if let Some(pointer_id) = pointer {
                            self.patch_pointer_base(pointer_id, new_ref);
                        } else {
                            self.set_identifier_type_ref(var, new_ref);
                        }
                        if let Some(unknown_id) = unknown {
                            to_remove.push(unknown_id);
                        }
                    }
                } else if let Some(expr) = expression {
                    if let Some(inferred) = self.infer_with_reference(expr) {
                        self.set_identifier_type_ref(var, inferred.reference);
                        if let Some(unknown_id) = unknown {
                            to_remove.push(unknown_id);
                        }
                    }
                }
            }

            let now_ref = match self.elements.get(var).map(|e| &e.data) {
                Some(ElementData::Identifier(data)) => data.type_ref,
                _ => None,
            };
            let resolved = now_ref
                .map(|r| !types::is_unknown_type_ref(&self.elements, r))
                .unwrap_or(false);
            if resolved {
                if let Some(ElementData::Identifier(data)) =
                    self.elements.get_mut(var).map(|e| &mut e.data)
                {
                    data.inferred_type = true;
                }
            } else {
                still_pending.push(var);
            }
        }

        *self.scopes.identifiers_with_unknown_types() = still_pending;
        self.elements.remove_all(&to_remove);
    }

    fn set_identifier_type_ref(&mut self, identifier: ElementId, type_ref: ElementId) {
        let old_ref = match self.elements.get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => data.type_ref,
            _ => None,
        };
        if let Some(element) = self.elements.get_mut(type_ref) {
            element.parent_element = Some(identifier);
        }
        if let Some(ElementData::Identifier(data)) =
            self.elements.get_mut(identifier).map(|e| &mut e.data)
        {
            data.type_ref = Some(type_ref);
        }
        if let Some(old_ref) = old_ref {
            if old_ref != type_ref {
                self.elements.remove(old_ref);
            }
        }
    }

    fn patch_pointer_base(&mut self, pointer: ElementId, new_base_ref: ElementId) {
        // Peel to the innermost pointer, then swap its base reference.
        let mut current = pointer;
        loop {
            let next = match self.elements.get(current).map(|e| &e.data) {
                Some(ElementData::PointerType(data)) => {
                    types::referenced_type(&self.elements, data.base_type_ref)
                        .filter(|&t| types::is_pointer_type(&self.elements, t))
                }
                _ => None,
            };
            match next {
                Some(inner) => current = inner,
                None => break,
            }
        }
        let old_ref = match self.elements.get(current).map(|e| &e.data) {
            Some(ElementData::PointerType(data)) => Some(data.base_type_ref),
            _ => None,
        };
        if let Some(element) = self.elements.get_mut(new_base_ref) {
            element.parent_element = Some(current);
        }
        if let Some(ElementData::PointerType(data)) =
            self.elements.get_mut(current).map(|e| &mut e.data)
        {
            data.base_type_ref = new_base_ref;
        }
        if let Some(old_ref) = old_ref {
            if old_ref != new_base_ref {
                self.elements.remove(old_ref);
            }
        }
    }

    pub(crate) fn infer_guard_enter(&mut self, id: ElementId) -> bool {
        self.infer_guard.insert(id)
    }

    pub(crate) fn infer_guard_exit(&mut self, id: ElementId) {
        self.infer_guard.remove(&id);
    }

    pub(crate) fn identifier_name(&self, identifier: ElementId) -> String {
        match self.elements.get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => {
                match self.elements.get(data.symbol).map(|e| &e.data) {
                    Some(ElementData::Symbol(symbol)) => symbol.fully_qualified.clone(),
                    _ => String::new(),
                }
            }
            _ => String::new(),
        }
    }

    // ------------------------------------------------------------------
    // phase 5: resolve unknown identifiers

    pub fn resolve_unknown_identifiers(&mut self) -> bool {
        let pending = std::mem::take(self.scopes.unresolved_identifier_references());
        let mut still_pending = Vec::new();

        for reference in pending {
            let Some(ElementData::IdentifierReference(data)) =
                self.elements.get(reference).map(|e| e.data.clone())
            else {
                continue;
            };
            if data.identifier.is_some() {
                continue;
            }

            // Member access resolves in the scope of the left side's type,
            // which must be composite.
            let mut type_scope = self.elements.get(reference).and_then(|e| e.parent_scope);
            let parent = self.elements.get(reference).and_then(|e| e.parent_element);
            let member_access_lhs =
                parent.and_then(|p| match self.elements.get(p).map(|e| &e.data) {
                    Some(ElementData::BinaryOperator(op))
                        if op.op == OperatorKind::MemberAccess && op.rhs == reference =>
                    {
                        Some(op.lhs)
                    }
                    _ => None,
                });
            if let Some(lhs) = member_access_lhs {
                let Some(lhs_type) = self.infer_type_of(lhs) else {
                    let location = data.symbol.location;
                    let module = self.module_of(reference);
                    self.error(
                        module,
                        "X000",
                        "unable to infer lhs of member access operator.",
                        location,
                    );
                    return false;
                };
                let Some(scope) = types::composite_scope(&self.elements, lhs_type) else {
                    let location = data.symbol.location;
                    let module = self.module_of(reference);
                    self.error(
                        module,
                        "X000",
                        "member access requires lhs composite type.",
                        location,
                    );
                    return false;
                };
                type_scope = Some(scope);
            }

            let matches = self
                .scopes
                .find_identifier(&self.elements, &data.symbol, type_scope);

            if matches.len() > 1 {
                self.bind_reference(reference, matches[0]);
                // Surviving candidates join the enclosing call's reference
                // list for overload resolution.
                let proc_call = parent.filter(|&p| {
                    matches!(
                        self.elements.get(p).map(|e| e.kind()),
                        Some(ElementKind::ProcedureCall)
                    )
                });
                if let Some(call) = proc_call {
                    let scope = self.elements.get(reference).and_then(|e| e.parent_scope);
                    let mut new_refs = Vec::new();
                    for &candidate in &matches[1..] {
                        let symbol = self.identifier_qualified_symbol(candidate);
                        let extra =
                            self.make_identifier_reference(scope, symbol, Some(candidate));
                        if let Some(element) = self.elements.get_mut(extra) {
                            element.parent_element = Some(call);
                        }
                        new_refs.push(extra);
                    }
                    if let Some(ElementData::ProcedureCall(call_data)) =
                        self.elements.get_mut(call).map(|e| &mut e.data)
                    {
                        call_data.references.extend(new_refs);
                    }
                }
            } else if let Some(&identifier) = matches.first() {
                self.bind_reference(reference, identifier);
            } else {
                let location = data.symbol.location;
                let module = self.module_of(reference);
                self.error(
                    module,
                    "P004",
                    format!("unable to resolve identifier: {}", data.symbol.name),
                    location,
                );
                still_pending.push(reference);
            }
        }

        let resolved_all = still_pending.is_empty();
        *self.scopes.unresolved_identifier_references() = still_pending;
        resolved_all
    }

    fn bind_reference(&mut self, reference: ElementId, identifier: ElementId) {
        if let Some(ElementData::IdentifierReference(data)) =
            self.elements.get_mut(reference).map(|e| &mut e.data)
        {
            data.identifier = Some(identifier);
        }
    }

    pub(crate) fn identifier_qualified_symbol(&self, identifier: ElementId) -> QualifiedSymbol {
        match self.elements.get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => {
                match self.elements.get(data.symbol).map(|e| &e.data) {
                    Some(ElementData::Symbol(symbol)) => symbol.qualified_symbol(),
                    _ => QualifiedSymbol::default(),
                }
            }
            _ => QualifiedSymbol::default(),
        }
    }

    // ------------------------------------------------------------------
    // phase 7: constant folding

    /// Fold in fixed tag order; cascades surface in the next category.
    pub fn fold_constant_expressions(&mut self) -> bool {
        self.fold_elements_of_kind(ElementKind::Intrinsic)
            && self.fold_elements_of_kind(ElementKind::IdentifierReference)
            && self.fold_elements_of_kind(ElementKind::UnaryOperator)
            && self.fold_elements_of_kind(ElementKind::BinaryOperator)
            && self.fold_elements_of_kind(ElementKind::LabelReference)
    }

    pub(crate) fn fold_elements_of_kind(&mut self, kind: ElementKind) -> bool {
        let mut to_remove = Vec::new();
        for element_id in self.elements.find_by_kind(kind) {
            if let Some(ElementData::Intrinsic(data)) =
                self.elements.get(element_id).map(|e| &e.data)
            {
                if !data.kind.can_fold() {
                    continue;
                }
            }

            let Some(fold_result) = self.fold_element(element_id) else {
                continue;
            };
            let folded = fold_result.element;
            let Some(parent) = self.elements.get(element_id).and_then(|e| e.parent_element)
            else {
                continue;
            };

            // Replacing an intrinsic stamps the substitution attribute so
            // later passes can see where the literal came from.
            if let Some(ElementData::Intrinsic(data)) =
                self.elements.get(element_id).map(|e| e.data.clone())
            {
                let scope = self.scopes.current_scope();
                let name_literal = self.make_string(scope, data.kind.name());
                let attribute =
                    self.make_attribute(scope, "intrinsic_substitution", Some(name_literal));
                if let Some(element) = self.elements.get_mut(folded) {
                    element
                        .attributes
                        .insert("intrinsic_substitution".to_string(), attribute);
                }
                if let Some(element) = self.elements.get_mut(attribute) {
                    element.parent_element = Some(folded);
                }
            }

            if let Some(element) = self.elements.get_mut(folded) {
                element.parent_element = Some(parent);
            }
            if !self.apply_fold_result(parent, element_id, folded) {
                let kind_name = self
                    .elements
                    .kind_of(element_id)
                    .map(|k| k.name())
                    .unwrap_or("element");
                let location = self.location_of(element_id);
                let module = self.module_of(element_id);
                self.error(
                    module,
                    "X000",
                    format!("element does not implement apply_fold_result: {kind_name}"),
                    location,
                );
                return false;
            }
            to_remove.push(element_id);
        }
        self.elements.remove_all(&to_remove);
        true
    }

    // ------------------------------------------------------------------
    // phase 8: type checking

    pub fn type_check(&mut self) -> bool {
        let success = self.time_task(" - intrinsic call sites", false, |session| {
            for intrinsic in session.elements.find_by_kind(ElementKind::Intrinsic) {
                if !session.prepare_intrinsic_call_site(intrinsic) {
                    return false;
                }
            }
            true
        });
        if !success {
            return false;
        }

        let success = self.time_task(" - procedure call sites", false, |session| {
            for call in session.elements.find_by_kind(ElementKind::ProcedureCall) {
                if !session.resolve_overloads(call) {
                    return false;
                }
            }
            true
        });
        if !success {
            let location = self
                .program
                .map(|p| self.location_of(p))
                .unwrap_or_default();
            self.error(
                None,
                "X000",
                "unable to prepare procedure call sites.",
                location,
            );
            return false;
        }

        if !self.time_task("compiler: resolve unknown types (phase 3)", true, |s| {
            s.resolve_unknown_types(true)
        }) {
            let location = self
                .program
                .map(|p| self.location_of(p))
                .unwrap_or_default();
            self.error(
                None,
                "X000",
                "unable to resolve unknown types (phase 3).",
                location,
            );
            return false;
        }

        // Declaration initializers must satisfy the declared type.
        for var in self.elements.find_by_kind(ElementKind::Identifier) {
            let Some(ElementData::Identifier(identifier)) =
                self.elements.get(var).map(|e| e.data.clone())
            else {
                continue;
            };
            let Some(initializer) = identifier.initializer else {
                continue;
            };
            let expression = match self.elements.get(initializer).map(|e| &e.data) {
                Some(ElementData::Initializer(data)) => data.expression,
                _ => None,
            };
            let Some(expression) = expression else {
                continue;
            };
            if matches!(
                self.elements.get(expression).map(|e| e.kind()),
                Some(ElementKind::UninitializedLiteral)
            ) {
                continue;
            }

            let Some(inferred) = self.infer_type_of(expression) else {
                let location = self.location_of(initializer);
                let module = self.module_of(initializer);
                self.error(module, "P052", "unable to infer type.", location);
                return false;
            };
            let declared = identifier
                .type_ref
                .and_then(|r| types::referenced_type(&self.elements, r));
            let Some(declared) = declared else {
                continue;
            };
            if !types::type_check(&self.elements, declared, inferred) {
                let inferred_name = types::display_name(&self.elements, inferred);
                let declared_name = types::display_name(&self.elements, declared);
                let location = self.location_of(var);
                let module = self.module_of(var);
                self.error(
                    module,
                    "C051",
                    format!(
                        "type mismatch: cannot assign {inferred_name} to {declared_name}."
                    ),
                    location,
                );
            }
        }

        // Both sides of every assignment operator must agree.
        for binary_op in self.elements.find_by_kind(ElementKind::BinaryOperator) {
            let Some(ElementData::BinaryOperator(op)) =
                self.elements.get(binary_op).map(|e| e.data.clone())
            else {
                continue;
            };
            if op.op != OperatorKind::Assignment {
                continue;
            }
            let Some(lhs_type) = self.infer_type_of(op.lhs) else {
                let location = self.location_of(op.lhs);
                let module = self.module_of(op.lhs);
                self.error(module, "P052", "unable to infer type.", location);
                return false;
            };
            let Some(rhs_type) = self.infer_type_of(op.rhs) else {
                let location = self.location_of(op.rhs);
                let module = self.module_of(op.rhs);
                self.error(module, "P052", "unable to infer type.", location);
                return false;
            };
            if !types::type_check(&self.elements, lhs_type, rhs_type) {
                let lhs_name = types::display_name(&self.elements, lhs_type);
                let rhs_name = types::display_name(&self.elements, rhs_type);
                let location = self.location_of(op.rhs);
                let module = self.module_of(binary_op);
                self.error(
                    module,
                    "C051",
                    format!("type mismatch: cannot assign {rhs_name} to {lhs_name}."),
                    location,
                );
            }
        }

        !self.result.is_failed()
    }

    /// Check an intrinsic call site against its procedure type: arity
    /// first, then each argument via `type_check`.
    fn prepare_intrinsic_call_site(&mut self, intrinsic: ElementId) -> bool {
        let Some(ElementData::Intrinsic(data)) =
            self.elements.get(intrinsic).map(|e| e.data.clone())
        else {
            return true;
        };
        let arguments = match self.elements.get(data.arguments).map(|e| &e.data) {
            Some(ElementData::ArgumentList(list)) => list.elements.clone(),
            _ => Vec::new(),
        };
        if arguments.len() != data.kind.arity() {
            let location = self.location_of(intrinsic);
            let module = self.module_of(intrinsic);
            self.error(
                module,
                "P091",
                format!(
                    "{} expects {} argument(s).",
                    data.kind.name(),
                    data.kind.arity()
                ),
                location,
            );
            return false;
        }
        let (parameters, index) = self.proc_type_parameters(data.proc_type);
        for (position, &argument) in arguments.iter().enumerate() {
            let Some(&parameter) = parameters.get(position) else {
                break;
            };
            let Some(param_type) = self.identifier_type(parameter) else {
                continue;
            };
            let Some(arg_type) = self.infer_type_of(argument) else {
                continue;
            };
            if !types::type_check(&self.elements, param_type, arg_type) {
                let arg_name = types::display_name(&self.elements, arg_type);
                let param_name = types::display_name(&self.elements, param_type);
                let location = self.location_of(argument);
                let module = self.module_of(intrinsic);
                self.error(
                    module,
                    "C051",
                    format!("type mismatch: cannot assign {arg_name} to {param_name}."),
                    location,
                );
                return false;
            }
        }
        if let Some(ElementData::ArgumentList(list)) =
            self.elements.get_mut(data.arguments).map(|e| &mut e.data)
        {
            list.argument_index = index;
        }
        true
    }

    /// Walk a call's candidate references and bind the first whose
    /// parameters accept the arguments. Variadic tails accept zero or
    /// more trailing arguments of the declared element type.
    pub(crate) fn resolve_overloads(&mut self, call: ElementId) -> bool {
        let Some(ElementData::ProcedureCall(data)) =
            self.elements.get(call).map(|e| e.data.clone())
        else {
            return true;
        };
        if data.resolved_proc_type.is_some() {
            return true;
        }
        let arguments = match self.elements.get(data.arguments).map(|e| &e.data) {
            Some(ElementData::ArgumentList(list)) => list.elements.clone(),
            _ => Vec::new(),
        };

        let mut first_mismatch: Option<(ElementId, ElementId, ElementId)> = None;
        for &reference in &data.references {
            let identifier = match self.elements.get(reference).map(|e| &e.data) {
                Some(ElementData::IdentifierReference(r)) => r.identifier,
                _ => None,
            };
            let Some(identifier) = identifier else {
                continue;
            };
            let Some(proc_type) = self.identifier_type(identifier) else {
                continue;
            };
            let Some(ElementData::ProcedureType(proc_data)) =
                self.elements.get(proc_type).map(|e| e.data.clone())
            else {
                continue;
            };

            let fixed = if proc_data.variadic {
                proc_data.parameters.len().saturating_sub(1)
            } else {
                proc_data.parameters.len()
            };
            let arity_ok = if proc_data.variadic {
                arguments.len() >= fixed
            } else {
                arguments.len() == fixed
            };
            if !arity_ok {
                continue;
            }

            let mut matches = true;
            for (position, &argument) in arguments.iter().enumerate() {
                let parameter = if position < fixed {
                    proc_data.parameters.get(position).copied()
                } else {
                    proc_data.parameters.last().copied()
                };
                let Some(parameter) = parameter else {
                    matches = false;
                    break;
                };
                let Some(param_type) = self.identifier_type(parameter) else {
                    matches = false;
                    break;
                };
                let Some(arg_type) = self.infer_type_of(argument) else {
                    matches = false;
                    break;
                };
                if !types::type_check(&self.elements, param_type, arg_type) {
                    if first_mismatch.is_none() {
                        first_mismatch = Some((argument, arg_type, param_type));
                    }
                    matches = false;
                    break;
                }
            }
            if matches {
                if let Some(ElementData::ProcedureCall(call_data)) =
                    self.elements.get_mut(call).map(|e| &mut e.data)
                {
                    call_data.resolved_proc_type = Some(proc_type);
                    call_data.resolved_identifier_ref = Some(reference);
                }
                return true;
            }
        }

        if let Some((argument, arg_type, param_type)) = first_mismatch {
            let arg_name = types::display_name(&self.elements, arg_type);
            let param_name = types::display_name(&self.elements, param_type);
            let location = self.location_of(argument);
            let module = self.module_of(call);
            self.error(
                module,
                "C051",
                format!("type mismatch: cannot assign {arg_name} to {param_name}."),
                location,
            );
        } else {
            let location = self.location_of(call);
            let module = self.module_of(call);
            self.error(
                module,
                "C052",
                "no matching overload for procedure call.",
                location,
            );
        }
        false
    }

    pub(crate) fn identifier_type(&self, identifier: ElementId) -> Option<ElementId> {
        match self.elements.get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => data
                .type_ref
                .and_then(|r| types::referenced_type(&self.elements, r)),
            _ => None,
        }
    }

    fn proc_type_parameters(
        &self,
        proc_type: ElementId,
    ) -> (Vec<ElementId>, FxHashMap<String, usize>) {
        let Some(ElementData::ProcedureType(data)) =
            self.elements.get(proc_type).map(|e| &e.data)
        else {
            return (Vec::new(), FxHashMap::default());
        };
        let mut index = FxHashMap::default();
        for (position, &parameter) in data.parameters.iter().enumerate() {
            let name = self.identifier_name(parameter);
            if !name.is_empty() {
                index.insert(name, position);
            }
        }
        (data.parameters.clone(), index)
    }

    // ------------------------------------------------------------------
    // directives

    pub fn execute_directives(&mut self) -> bool {
        for directive in self.elements.find_by_kind(ElementKind::Directive) {
            // Chained directives (#elif, #else) execute via their head.
            let parent_is_directive = self
                .elements
                .get(directive)
                .and_then(|e| e.parent_element)
                .and_then(|p| self.elements.kind_of(p))
                == Some(ElementKind::Directive);
            if parent_is_directive {
                continue;
            }
            if !self.execute_directive(directive) {
                let name = match self.elements.get(directive).map(|e| &e.data) {
                    Some(ElementData::Directive(data)) => data.kind.name(),
                    _ => "directive",
                };
                let location = self.location_of(directive);
                let module = self.module_of(directive);
                self.error(
                    module,
                    "P044",
                    format!("directive failed to execute: {name}"),
                    location,
                );
                return false;
            }
        }
        true
    }

    // ------------------------------------------------------------------
    // used types & interning

    /// Record that a concrete type reached a type reference, so the
    /// emitter can restrict the type-info table to types actually used.
    pub(crate) fn track_used_type(&mut self, type_id: ElementId) {
        let kind = self.elements.kind_of(type_id);
        if matches!(
            kind,
            Some(ElementKind::UnknownType) | Some(ElementKind::GenericType) | None
        ) {
            return;
        }
        let base = match self.elements.get(type_id).map(|e| &e.data) {
            Some(ElementData::PointerType(data)) => {
                types::referenced_type(&self.elements, data.base_type_ref)
            }
            Some(ElementData::ArrayType(data)) => {
                types::referenced_type(&self.elements, data.base_type_ref)
            }
            _ => None,
        };
        if let Some(base) = base {
            if matches!(
                self.elements.kind_of(base),
                Some(ElementKind::UnknownType) | Some(ElementKind::GenericType)
            ) {
                return;
            }
        }
        self.used_types.insert(type_id);
    }

    pub fn intern_string(&mut self, value: &str) -> Id {
        self.interned_strings.intern(value)
    }

    // ------------------------------------------------------------------
    // assembly symbol resolution

    /// Callback surface for the assembler: constant identifiers answer
    /// with their literal value, everything else with its storage label.
    pub fn resolve_assembly_symbol(
        &self,
        kind: AssemblySymbolKind,
        _scope: Option<Id>,
        name: &str,
    ) -> Option<AssemblySymbolValue> {
        if kind != AssemblySymbolKind::Module {
            return None;
        }
        let symbol = QualifiedSymbol::new(name);
        let program_block = self.program.and_then(|p| {
            match self.elements.get(p).map(|e| &e.data) {
                Some(ElementData::Program(data)) => data.block,
                _ => None,
            }
        });
        let matches = self
            .scopes
            .find_identifier(&self.elements, &symbol, program_block);
        let identifier = *matches.first()?;
        let Some(ElementData::Identifier(data)) = self.elements.get(identifier).map(|e| &e.data)
        else {
            return None;
        };
        if data.constant {
            let type_id = self.identifier_type(identifier)?;
            match self.elements.get(type_id).map(|e| &e.data) {
                Some(ElementData::BoolType(_)) => {
                    if let Some(value) = self.as_bool(identifier) {
                        return Some(AssemblySymbolValue::Integer(u64::from(value)));
                    }
                }
                Some(ElementData::NumericType(numeric)) => {
                    if numeric.number_class == alpha_common::NumberClass::Integer {
                        if let Some(value) = self.as_integer(identifier) {
                            return Some(AssemblySymbolValue::Integer(value));
                        }
                    } else if let Some(value) = self.as_float(identifier) {
                        return Some(AssemblySymbolValue::Float(value));
                    }
                }
                _ => {}
            }
        }
        Some(AssemblySymbolValue::Label(self.label_name(identifier)))
    }

    /// Deterministic emission label for an element: its qualified name
    /// with the separator flattened, suffixed by id for uniqueness.
    pub(crate) fn label_name(&self, element: ElementId) -> String {
        let name = match self.elements.get(element).map(|e| &e.data) {
            Some(ElementData::Identifier(_)) => self.identifier_name(element),
            Some(ElementData::ProcedureType(data)) => {
                if let Some(label) = &data.label {
                    return label.clone();
                }
                String::new()
            }
            Some(ElementData::Label(data)) => data.name.clone(),
            _ => String::new(),
        };
        let sanitized = name.replace("::", "_");
        if sanitized.is_empty() {
            format!("_anon_{element}")
        } else {
            format!("_{sanitized}_{element}")
        }
    }

    // ------------------------------------------------------------------
    // structural identity

    /// Hash of the graph's structure from `root`: kinds, names, literal
    /// values, and owned-child order. Ids are deliberately excluded, so
    /// two sessions evaluating the same AST hash identically.
    pub fn structural_hash(&self, root: ElementId) -> u64 {
        use std::hash::Hasher;
        let mut hasher = std::collections::hash_map::DefaultHasher::new();
        self.hash_element(root, &mut hasher);
        hasher.finish()
    }

    fn hash_element<H: std::hash::Hasher>(&self, id: ElementId, hasher: &mut H) {
        use std::hash::Hash;
        let Some(element) = self.elements.get(id) else {
            return;
        };
        element.kind().name().hash(hasher);
        match &element.data {
            ElementData::Symbol(data) => data.fully_qualified.hash(hasher),
            ElementData::IdentifierReference(data) => data.symbol.fully_qualified.hash(hasher),
            ElementData::TypeReference(data) => data.symbol.fully_qualified.hash(hasher),
            ElementData::IntegerLiteral { value } => value.hash(hasher),
            ElementData::FloatLiteral { value } => value.to_bits().hash(hasher),
            ElementData::BooleanLiteral { value } => value.hash(hasher),
            ElementData::StringLiteral { value } => value.hash(hasher),
            ElementData::CharacterLiteral { rune } => rune.hash(hasher),
            ElementData::BinaryOperator(data) => data.op.name().hash(hasher),
            ElementData::UnaryOperator(data) => data.op.name().hash(hasher),
            ElementData::Label(data) => data.name.hash(hasher),
            ElementData::Attribute(data) => data.name.hash(hasher),
            ElementData::Directive(data) => data.kind.name().hash(hasher),
            ElementData::Intrinsic(data) => data.kind.name().hash(hasher),
            ElementData::UnknownType(data) => data.symbol.fully_qualified.hash(hasher),
            _ => {}
        }
        let children = element.owned_children();
        children.len().hash(hasher);
        for child in children {
            self.hash_element(child, hasher);
        }
    }

    // ------------------------------------------------------------------
    // graph helpers shared by evaluator and pipeline

    pub(crate) fn add_statement_to_block(&mut self, block: ElementId, statement: ElementId) {
        if let Some(element) = self.elements.get_mut(statement) {
            element.parent_element = Some(block);
        }
        if let Some(ElementData::Block(data)) = self.elements.get_mut(block).map(|e| &mut e.data)
        {
            data.statements.push(statement);
        }
    }

    pub(crate) fn add_identifier_to_scope(&mut self, block: ElementId, identifier: ElementId) {
        let name = match self.elements.get(identifier).map(|e| &e.data) {
            Some(ElementData::Identifier(data)) => {
                match self.elements.get(data.symbol).map(|e| &e.data) {
                    Some(ElementData::Symbol(symbol)) => symbol.name.clone(),
                    _ => String::new(),
                }
            }
            _ => String::new(),
        };
        if name.is_empty() {
            return;
        }
        if let Some(element) = self.elements.get_mut(identifier) {
            element.parent_element = Some(block);
        }
        if let Some(ElementData::Block(data)) = self.elements.get_mut(block).map(|e| &mut e.data)
        {
            data.identifiers.entry(name).or_default().push(identifier);
        }
    }

    /// Insert a type into the current scope's table, diagnosing duplicate
    /// fully-qualified names.
    pub fn add_type_to_scope(&mut self, type_id: ElementId) -> bool {
        let Some(scope) = self.scopes.current_scope() else {
            return false;
        };
        self.add_type_to_block(scope, type_id)
    }

    pub(crate) fn add_type_to_block(&mut self, block: ElementId, type_id: ElementId) -> bool {
        let name = types::symbol_name(&self.elements, type_id);
        if name.is_empty() {
            return false;
        }
        let duplicate = matches!(
            self.elements.get(block).map(|e| &e.data),
            Some(ElementData::Block(data)) if data.types.contains_key(&name)
        );
        if duplicate {
            let location = self.location_of(type_id);
            let module = self.module_of(type_id);
            self.error(
                module,
                "C031",
                format!("duplicate symbol: {name}"),
                location,
            );
            return false;
        }
        if let Some(element) = self.elements.get_mut(type_id) {
            element.parent_element = Some(block);
        }
        if let Some(ElementData::Block(data)) = self.elements.get_mut(block).map(|e| &mut e.data)
        {
            data.types.insert(name, type_id);
        }
        true
    }

    /// Create a new block under the current scope and push it.
    pub(crate) fn push_new_block(&mut self) -> ElementId {
        let parent = self.scopes.current_scope();
        let block = self.make_block(parent);
        if let Some(parent) = parent {
            if let Some(element) = self.elements.get_mut(block) {
                element.parent_element = Some(parent);
            }
            if let Some(ElementData::Block(data)) =
                self.elements.get_mut(parent).map(|e| &mut e.data)
            {
                data.blocks.push(block);
            }
        }
        self.scopes.push_block(block);
        block
    }
}
