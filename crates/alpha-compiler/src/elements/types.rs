//! Type variants and the type-check relation.
//!
//! Every type element carries a [`TypeHeader`]: its symbol, alignment,
//! and size in bytes. `type_check` asks whether a value of `other` may
//! flow into a slot declared as `self`; the answer is variant-specific.

use crate::element_map::ElementMap;
use crate::elements::{ElementData, ElementId};
use alpha_common::{NumberClass, QualifiedSymbol};
use indexmap::IndexMap;

/// State shared by all type variants.
#[derive(Clone, Debug, Default)]
pub struct TypeHeader {
    pub symbol: Option<ElementId>,
    pub alignment: usize,
    pub size_in_bytes: usize,
}

impl TypeHeader {
    pub fn sized(size_in_bytes: usize, alignment: usize) -> Self {
        TypeHeader {
            symbol: None,
            alignment,
            size_in_bytes,
        }
    }
}

#[derive(Clone, Debug)]
pub struct NumericTypeData {
    pub header: TypeHeader,
    pub min: i64,
    pub max: u64,
    pub is_signed: bool,
    pub number_class: NumberClass,
}

#[derive(Clone, Debug)]
pub struct PointerTypeData {
    pub header: TypeHeader,
    pub base_type_ref: ElementId,
}

#[derive(Clone, Debug)]
pub struct ArrayTypeData {
    pub header: TypeHeader,
    pub scope: ElementId,
    pub base_type_ref: ElementId,
    pub subscripts: Vec<ElementId>,
}

#[derive(Clone, Debug)]
pub struct TupleTypeData {
    pub header: TypeHeader,
    pub scope: ElementId,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CompositeKind {
    Struct,
    Union,
    Enum,
}

impl CompositeKind {
    pub const fn name(self) -> &'static str {
        match self {
            CompositeKind::Struct => "struct_type",
            CompositeKind::Union => "union_type",
            CompositeKind::Enum => "enum_type",
        }
    }
}

#[derive(Clone, Debug)]
pub struct CompositeTypeData {
    pub header: TypeHeader,
    pub kind: CompositeKind,
    pub scope: ElementId,
    /// Field name to field element, in declaration order.
    pub fields: IndexMap<String, ElementId>,
}

#[derive(Clone, Debug)]
pub struct ProcedureTypeData {
    pub header: TypeHeader,
    /// The parameter scope; parameter identifiers live in its map.
    pub scope: ElementId,
    /// Parameter identifiers in declaration order (owned by the scope).
    pub parameters: Vec<ElementId>,
    pub return_type: Option<ElementId>,
    pub body: Option<ElementId>,
    /// The trailing parameter accepts zero or more arguments.
    pub variadic: bool,
    pub is_foreign: bool,
    pub is_intrinsic: bool,
    pub instances: Vec<ElementId>,
    /// Emission label, set when a declaration binds this type.
    pub label: Option<String>,
}

#[derive(Clone, Debug)]
pub struct ModuleTypeData {
    pub header: TypeHeader,
    pub scope: ElementId,
}

#[derive(Clone, Debug, Default)]
pub struct GenericTypeData {
    pub header: TypeHeader,
    pub constraints: Vec<ElementId>,
}

/// Placeholder for a type the evaluator could not resolve; drained by the
/// semantic pipeline.
#[derive(Clone, Debug)]
pub struct UnknownTypeData {
    pub header: TypeHeader,
    pub symbol: QualifiedSymbol,
    /// The expression inference should draw from, when one exists.
    pub expression: Option<ElementId>,
}

// ---------------------------------------------------------------------------
// queries over the graph

/// Synthesized name for the interned pointer type over `base`.
pub fn name_for_pointer(base_name: &str) -> String {
    format!("__ptr_{base_name}__")
}

/// Synthesized name for the interned array type over `base`.
pub fn name_for_array(base_name: &str, subscript_sizes: &[u64]) -> String {
    let mut name = format!("__array_{base_name}");
    for size in subscript_sizes {
        name.push_str(&format!("_S{size}"));
    }
    name.push_str("__");
    name
}

/// The type a reference points at, when resolved.
pub fn referenced_type(elements: &ElementMap, type_ref: ElementId) -> Option<ElementId> {
    match &elements.get(type_ref)?.data {
        ElementData::TypeReference(data) => data.referenced_type,
        _ => None,
    }
}

/// True when the reference (or the type behind it) is still unknown. A
/// pointer is unknown while its base reference is.
pub fn is_unknown_type_ref(elements: &ElementMap, type_ref: ElementId) -> bool {
    match referenced_type(elements, type_ref) {
        Some(type_id) => is_unknown_type(elements, type_id),
        None => true,
    }
}

pub fn is_unknown_type(elements: &ElementMap, type_id: ElementId) -> bool {
    match elements.get(type_id).map(|e| &e.data) {
        Some(ElementData::UnknownType(_)) => true,
        Some(ElementData::PointerType(data)) => is_unknown_type_ref(elements, data.base_type_ref),
        _ => false,
    }
}

pub fn is_pointer_type(elements: &ElementMap, type_id: ElementId) -> bool {
    matches!(
        elements.get(type_id).map(|e| &e.data),
        Some(ElementData::PointerType(_))
    )
}

/// Walk a pointer chain down to the deepest base reference.
pub fn pointer_base_ref(elements: &ElementMap, pointer_id: ElementId) -> Option<ElementId> {
    let mut current = pointer_id;
    loop {
        let ElementData::PointerType(data) = &elements.get(current)?.data else {
            return None;
        };
        match referenced_type(elements, data.base_type_ref) {
            Some(next) if is_pointer_type(elements, next) => current = next,
            _ => return Some(data.base_type_ref),
        }
    }
}

/// The scope to search for a member access on a value of `type_id`.
/// Pointers to composites expose their base's scope.
pub fn composite_scope(elements: &ElementMap, type_id: ElementId) -> Option<ElementId> {
    match &elements.get(type_id)?.data {
        ElementData::CompositeType(data) => Some(data.scope),
        ElementData::ArrayType(data) => Some(data.scope),
        ElementData::PointerType(data) => {
            let base = referenced_type(elements, data.base_type_ref)?;
            composite_scope(elements, base)
        }
        _ => None,
    }
}

/// The name of a type element's symbol, or `""`.
pub fn symbol_name(elements: &ElementMap, type_id: ElementId) -> String {
    let Some(element) = elements.get(type_id) else {
        return String::new();
    };
    let Some(header) = element.type_header() else {
        return String::new();
    };
    let Some(symbol_id) = header.symbol else {
        return String::new();
    };
    match elements.get(symbol_id).map(|e| &e.data) {
        Some(ElementData::Symbol(data)) => data.fully_qualified.clone(),
        _ => String::new(),
    }
}

/// Display name for diagnostics: `^base` for pointers, `[n]base` for
/// arrays, otherwise the symbol name.
pub fn display_name(elements: &ElementMap, type_id: ElementId) -> String {
    let Some(element) = elements.get(type_id) else {
        return String::new();
    };
    match &element.data {
        ElementData::PointerType(data) => {
            let base = referenced_type(elements, data.base_type_ref)
                .map(|base| display_name(elements, base))
                .unwrap_or_else(|| "unknown".to_string());
            format!("^{base}")
        }
        ElementData::ArrayType(data) => {
            let base = referenced_type(elements, data.base_type_ref)
                .map(|base| display_name(elements, base))
                .unwrap_or_else(|| "unknown".to_string());
            let mut name = String::new();
            for &subscript in &data.subscripts {
                if let Some(ElementData::IntegerLiteral { value }) =
                    elements.get(subscript).map(|e| &e.data)
                {
                    name.push_str(&format!("[{value}]"));
                }
            }
            name.push_str(&base);
            name
        }
        ElementData::UnknownType(data) => data.symbol.fully_qualified.clone(),
        _ => symbol_name(elements, type_id),
    }
}

/// True when the type is the `void` unit type.
pub fn is_void(elements: &ElementMap, type_id: ElementId) -> bool {
    symbol_name(elements, type_id) == "void"
}

/// May a value of type `other` flow into a slot of type `target`?
///
/// - numeric vs numeric: same id, or both floating, or widening within
///   the table rules (narrowing is forbidden)
/// - `^void` accepts any pointer; other pointers recurse on their bases
/// - pointer vs non-pointer delegates to the base type
/// - arrays recurse on the element type; subscripts are not identity here
/// - composites and everything else: identity only
pub fn type_check(elements: &ElementMap, target: ElementId, other: ElementId) -> bool {
    if target == other {
        return true;
    }
    let (Some(target_element), Some(other_element)) = (elements.get(target), elements.get(other))
    else {
        return false;
    };
    match &target_element.data {
        ElementData::NumericType(data) => {
            let ElementData::NumericType(other_data) = &other_element.data else {
                return false;
            };
            // The unit type is only compatible with itself, which the
            // identity check above already covered.
            if data.number_class == NumberClass::None
                || other_data.number_class == NumberClass::None
            {
                return false;
            }
            if data.number_class == NumberClass::Float
                && other_data.number_class == NumberClass::Float
            {
                return true;
            }
            if data.is_signed && other_data.is_signed {
                return other_data.header.size_in_bytes < data.header.size_in_bytes;
            }
            other_data.header.size_in_bytes <= data.header.size_in_bytes
        }
        ElementData::PointerType(data) => {
            let target_base = referenced_type(elements, data.base_type_ref);
            match &other_element.data {
                ElementData::PointerType(other_data) => {
                    // A void base accepts any pointer; the reverse does not hold.
                    if target_base.is_some_and(|base| is_void(elements, base)) {
                        return true;
                    }
                    let other_base = referenced_type(elements, other_data.base_type_ref);
                    match (target_base, other_base) {
                        (Some(a), Some(b)) => type_check(elements, a, b),
                        _ => false,
                    }
                }
                _ => match target_base {
                    Some(base) => type_check(elements, base, other),
                    None => false,
                },
            }
        }
        ElementData::ArrayType(data) => {
            let ElementData::ArrayType(other_data) = &other_element.data else {
                return false;
            };
            let (Some(a), Some(b)) = (
                referenced_type(elements, data.base_type_ref),
                referenced_type(elements, other_data.base_type_ref),
            ) else {
                return false;
            };
            type_check(elements, a, b)
        }
        // Generic parameters accept anything; the constraint set is not
        // enforced at this layer.
        ElementData::GenericType(_) => true,
        ElementData::BoolType(_) => matches!(other_element.data, ElementData::BoolType(_)),
        ElementData::RuneType(_) => matches!(other_element.data, ElementData::RuneType(_)),
        _ => false,
    }
}
