//! Constant-per-tag lookups
//!
//! `getBlockHeaderForSymbol`, `isSymbolAFunction` and `getSymbolNameForTag`
//! are data dispatches whose every case is a constant.

use super::dispatch::{DataCase, emit_data_dispatch};
use super::function::{BlockId, FunctionBuilder};
use super::term::Built;
use super::{
    CodeGenError, EmitContext, GET_BLOCK_HEADER_FOR_SYMBOL, GET_SYMBOL_NAME_FOR_TAG,
    IS_SYMBOL_A_FUNCTION,
};
use crate::definition::Symbol;

struct HeaderCase;

impl DataCase for HeaderCase {
    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        _func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        let header = cx.layout.header_value(cx.definition, symbol)?;
        Ok(Built {
            value: cx.layout.header_constant(header),
            block,
        })
    }
}

struct FunctionPredicateCase;

impl DataCase for FunctionPredicateCase {
    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        _func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        let decl = cx.definition.symbol_declaration(&symbol.name).ok_or_else(|| {
            CodeGenError::Logic(format!(
                "CodeGen: no declaration for symbol '{}'. This is a compiler bug.",
                symbol.name
            ))
        })?;
        Ok(Built {
            value: decl.is_function().to_string(),
            block,
        })
    }
}

struct NameCase;

impl DataCase for NameCase {
    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        _func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        let value = cx.module.intern_symbol_name(&symbol.name)?;
        Ok(Built { value, block })
    }
}

/// `%blockheader @getBlockHeaderForSymbol(i32 %tag)`
pub(super) fn emit_header_lookup(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    let header_type = cx.layout.header_type().to_string();
    emit_data_dispatch(
        cx,
        GET_BLOCK_HEADER_FOR_SYMBOL,
        &header_type,
        false,
        &mut HeaderCase,
    )
}

/// `i1 @isSymbolAFunction(i32 %tag)`
pub(super) fn emit_function_predicate(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    emit_data_dispatch(cx, IS_SYMBOL_A_FUNCTION, "i1", false, &mut FunctionPredicateCase)
}

/// `ptr @getSymbolNameForTag(i32 %tag)`
pub(super) fn emit_name_lookup(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    emit_data_dispatch(cx, GET_SYMBOL_NAME_FOR_TAG, "ptr", false, &mut NameCase)
}
