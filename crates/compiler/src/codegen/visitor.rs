//! `visitChildren`: hand each child of a node to a category-specific callback.
//!
//! The caller supplies an opaque `sink` and eight callbacks, in this order:
//! `visitSymbol`, `visitMap`, `visitList`, `visitSet`, `visitInt`,
//! `visitFloat`, `visitBool`, `visitMInt`. Scalar children are loaded and
//! passed with their sort's name:
//!
//! ```text
//! cb(sink, value, sort_name)
//! ```
//!
//! Collection children are passed by slot address with the names of the
//! sort's unit, element and concat symbols, so the callee can rebuild them:
//!
//! ```text
//! cb(sink, child_address, unit, element, concat)
//! ```

use super::dispatch::{TraversalCase, emit_traversal_dispatch};
use super::function::{BlockId, FunctionBuilder};
use super::{CodeGenError, EmitContext, VISIT_CHILDREN};
use crate::definition::{Sort, SortCategory, Symbol};

const CALLBACKS: [&str; 8] = [
    "visitSymbol",
    "visitMap",
    "visitList",
    "visitSet",
    "visitInt",
    "visitFloat",
    "visitBool",
    "visitMInt",
];

/// Parameter index of the first callback (after `node` and `sink`).
const FIRST_CALLBACK: usize = 2;

fn callback_index(category: SortCategory) -> Option<usize> {
    match category {
        SortCategory::Symbol | SortCategory::StringBuffer => Some(0),
        SortCategory::Map => Some(1),
        SortCategory::List => Some(2),
        SortCategory::Set => Some(3),
        SortCategory::Int => Some(4),
        SortCategory::Float => Some(5),
        SortCategory::Bool => Some(6),
        SortCategory::MInt => Some(7),
        SortCategory::Uncomputed => None,
    }
}

/// Interned name of one of a collection sort's protocol symbols.
fn collection_symbol(
    cx: &mut EmitContext<'_>,
    sort: &Sort,
    attribute: &str,
    name: Option<&str>,
) -> Result<String, CodeGenError> {
    let name = name.ok_or_else(|| {
        CodeGenError::Logic(format!(
            "CodeGen: collection sort '{}' has no '{}' attribute. This is a compiler bug.",
            sort, attribute
        ))
    })?;
    cx.module.intern_symbol_name(name)
}

struct VisitCase;

impl VisitCase {
    fn visit_collection(
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        block: BlockId,
        callback: &str,
        sort: &Sort,
        child: &str,
    ) -> Result<(), CodeGenError> {
        let definition = cx.definition;
        let decl = definition
            .sort_declaration(sort)
            .ok_or_else(|| CodeGenError::uncomputed(sort))?;
        let unit = collection_symbol(cx, sort, "unit", decl.unit.as_deref())?;
        let element = collection_symbol(cx, sort, "element", decl.element.as_deref())?;
        let concat = collection_symbol(cx, sort, "concat", decl.concat.as_deref())?;
        let sink = func.param(1)?;
        func.push(
            block,
            format!(
                "call void {}(ptr {}, ptr {}, ptr {}, ptr {}, ptr {})",
                callback, sink, child, unit, element, concat
            ),
        )?;
        Ok(())
    }

    fn visit_scalar(
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        block: BlockId,
        callback: &str,
        category: SortCategory,
        sort: &Sort,
        child: &str,
    ) -> Result<(), CodeGenError> {
        let ty = cx.layout.value_type(category)?;
        let mut value = func.assign(block, format!("load {}, ptr {}", ty, child))?;
        if category == SortCategory::StringBuffer {
            value = func.assign(block, format!("load ptr, ptr {}", value))?;
        }
        let sort_name = cx.module.intern_sort_name(sort)?;
        let sink = func.param(1)?;
        func.push(
            block,
            format!(
                "call void {}(ptr {}, {} {}, ptr {})",
                callback, sink, ty, value, sort_name
            ),
        )?;
        Ok(())
    }
}

impl TraversalCase for VisitCase {
    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<BlockId, CodeGenError> {
        let layout = cx.layout;
        let block_type = layout.block_type(cx.definition, symbol)?;
        let node = func.param(0)?;
        for (index, sort) in symbol.arguments.iter().enumerate() {
            let category = cx.definition.category(sort);
            let slot =
                callback_index(category).ok_or_else(|| CodeGenError::uncomputed(sort))?;
            let callback = func.param(FIRST_CALLBACK + slot)?;
            let child = layout.emit_child_address(func, block, &block_type, &node, index)?;
            if category.is_collection() {
                Self::visit_collection(cx, func, block, &callback, sort, &child)?;
            } else {
                Self::visit_scalar(cx, func, block, &callback, category, sort, &child)?;
            }
        }
        Ok(block)
    }
}

/// `void @visitChildren(ptr %node, ptr %sink, ptr %visitSymbol, ..., ptr %visitMInt)`
pub(super) fn emit_visitor(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    let mut params = vec![("ptr", "sink")];
    params.extend(CALLBACKS.iter().map(|name| ("ptr", *name)));
    emit_traversal_dispatch(cx, VISIT_CHILDREN, &params, &mut VisitCase)
}
