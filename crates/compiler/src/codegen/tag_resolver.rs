//! `getTagForSymbolName`: symbol name to tag.
//!
//! Names are strings, so this is a chain of `strcmp` tests in tag order
//! rather than a switch. The first test lives in `entry`; each later test gets
//! a block named after its symbol.

use super::function::FunctionBuilder;
use super::{CodeGenError, EmitContext, GET_TAG_FOR_SYMBOL_NAME};
use tracing::debug;

pub(super) fn emit_tag_resolver(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    let definition = cx.definition;
    let mut func = FunctionBuilder::new(GET_TAG_FOR_SYMBOL_NAME, "i32", &[("ptr", "name")]);
    let name = func.param(0)?;

    let entry = func.append_block("entry");
    let mut tests = vec![entry];
    for symbol in definition.symbols().skip(1) {
        tests.push(func.append_block(&symbol.name));
    }
    let exit = func.append_block("exit");
    let stuck = func.append_block("stuck");

    let mut incoming = Vec::new();
    for (index, symbol) in definition.symbols().enumerate() {
        let test = tests[index];
        let next = tests.get(index + 1).copied().unwrap_or(stuck);
        let global = cx.module.intern_symbol_name(&symbol.name)?;
        let cmp = func.assign(test, format!("call i32 @strcmp(ptr {}, ptr {})", name, global))?;
        let equal = func.assign(test, format!("icmp eq i32 {}, 0", cmp))?;
        func.cond_branch(test, &equal, exit, next)?;
        incoming.push((symbol.tag.to_string(), test));
    }
    debug!(symbols = incoming.len(), "tag resolver");

    if incoming.is_empty() {
        func.discard(exit)?;
        func.discard(stuck)?;
        func.trap(entry)?;
    } else {
        let tag = func.phi(exit, "i32", &incoming)?;
        func.terminate(exit, format!("ret i32 {}", tag))?;
        func.trap(stuck)?;
    }

    cx.module.add_function(GET_TAG_FOR_SYMBOL_NAME, func.finish()?)
}
