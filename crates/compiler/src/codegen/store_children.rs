//! `storeSymbolChildren`: fill an allocated node from generic argument slots.

use super::boxing::{load_argument, unbox};
use super::dispatch::{TraversalCase, emit_traversal_dispatch};
use super::function::{BlockId, FunctionBuilder};
use super::{CodeGenError, EmitContext, STORE_SYMBOL_CHILDREN};
use crate::definition::Symbol;

struct StoreCase;

impl TraversalCase for StoreCase {
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
        let args = func.param(1)?;
        for (index, sort) in symbol.arguments.iter().enumerate() {
            let category = cx.definition.category(sort);
            let slot = load_argument(func, block, &args, index)?;
            let value = unbox(func, block, layout, category, sort, &slot)?;
            let child = layout.emit_child_address(func, block, &block_type, &node, index)?;
            let ty = layout.value_type(category)?;
            func.push(block, format!("store {} {}, ptr {}", ty, value, child))?;
        }
        Ok(block)
    }
}

/// `void @storeSymbolChildren(ptr %node, ptr %args)`
pub(super) fn emit_store_children(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    emit_traversal_dispatch(cx, STORE_SYMBOL_CHILDREN, &[("ptr", "args")], &mut StoreCase)
}
