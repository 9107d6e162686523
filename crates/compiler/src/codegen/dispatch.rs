//! Tag Dispatch Shapes
//!
//! Six of the eight routines are a switch over symbol tags with one case per
//! symbol. They come in two shapes:
//!
//! - data dispatch: `switch` on a tag parameter, every case produces a value,
//!   the values meet in a phi in `exit`;
//! - traversal dispatch: the tag is loaded from a node header, every case
//!   does its work and returns; symbols without children get no case.
//!
//! Unknown tags reach the shared `stuck` block, which traps. What a case
//! emits is supplied by a `DataCase` or `TraversalCase` strategy.

use super::function::{BlockId, FunctionBuilder};
use super::term::Built;
use super::{CodeGenError, EmitContext};
use crate::definition::Symbol;
use std::fmt::Write as _;
use tracing::debug;

/// Per-symbol case of a data dispatch.
pub trait DataCase {
    /// Whether `symbol` gets a case at all. Ineligible tags trap.
    fn is_eligible(&self, _cx: &EmitContext<'_>, _symbol: &Symbol) -> Result<bool, CodeGenError> {
        Ok(true)
    }

    /// Emit the case body starting in `block`. Returns the case's value and
    /// the block control leaves from (it may differ from `block`).
    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<Built, CodeGenError>;
}

/// Per-symbol case of a traversal dispatch.
pub trait TraversalCase {
    /// Emit the case body starting in `block`. Returns the block to return from.
    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<BlockId, CodeGenError>;
}

/// Render a `switch` over `cases` with `default` as the fallback.
fn switch_instruction(
    func: &FunctionBuilder,
    tag: &str,
    default: BlockId,
    cases: &[(u32, BlockId)],
) -> Result<String, CodeGenError> {
    let mut switch = format!("switch i32 {}, label {} [", tag, func.label(default)?);
    for (value, block) in cases {
        write!(&mut switch, "\n    i32 {}, label {}", value, func.label(*block)?)?;
    }
    if !cases.is_empty() {
        switch.push_str("\n ");
    }
    switch.push_str(" ]");
    Ok(switch)
}

/// Emit `<return_type> @name(i32 %tag[, ptr %args])` as a data dispatch.
pub fn emit_data_dispatch(
    cx: &mut EmitContext<'_>,
    name: &str,
    return_type: &str,
    takes_arguments: bool,
    case: &mut dyn DataCase,
) -> Result<(), CodeGenError> {
    let mut params = vec![("i32", "tag")];
    if takes_arguments {
        params.push(("ptr", "args"));
    }
    let mut func = FunctionBuilder::new(name, return_type, &params);
    let entry = func.append_block("entry");
    let exit = func.append_block("exit");
    let stuck = func.append_block("stuck");

    let definition = cx.definition;
    let mut cases = Vec::new();
    let mut incoming = Vec::new();
    for symbol in definition.symbols() {
        if !case.is_eligible(cx, symbol)? {
            continue;
        }
        let block = func.append_block(&format!("tag{}", symbol.tag));
        let built = case.emit_case(cx, &mut func, symbol, block)?;
        func.branch(built.block, exit)?;
        incoming.push((built.value, built.block));
        cases.push((symbol.tag, block));
    }
    debug!(routine = name, cases = cases.len(), "data dispatch");

    let tag = func.param(0)?;
    let switch = switch_instruction(&func, &tag, stuck, &cases)?;
    func.terminate(entry, switch)?;

    if incoming.is_empty() {
        func.discard(exit)?;
    } else {
        let result = func.phi(exit, return_type, &incoming)?;
        func.terminate(exit, format!("ret {} {}", return_type, result))?;
        func.move_to_end(exit);
    }
    func.trap(stuck)?;
    func.move_to_end(stuck);

    cx.module.add_function(name, func.finish()?)
}

/// Emit `void @name(ptr %node, <extra params>)` as a traversal dispatch.
pub fn emit_traversal_dispatch(
    cx: &mut EmitContext<'_>,
    name: &str,
    extra_params: &[(&str, &str)],
    case: &mut dyn TraversalCase,
) -> Result<(), CodeGenError> {
    let mut params = vec![("ptr", "node")];
    params.extend_from_slice(extra_params);
    let mut func = FunctionBuilder::new(name, "void", &params);
    let entry = func.append_block("entry");
    let stuck = func.append_block("stuck");

    let node = func.param(0)?;
    let tag = cx.layout.emit_load_tag(&mut func, entry, &node)?;

    let definition = cx.definition;
    let mut cases = Vec::new();
    for symbol in definition.symbols() {
        if symbol.is_leaf() {
            continue;
        }
        let block = func.append_block(&format!("tag{}", symbol.tag));
        let last = case.emit_case(cx, &mut func, symbol, block)?;
        func.terminate(last, "ret void")?;
        cases.push((symbol.tag, block));
    }
    debug!(routine = name, cases = cases.len(), "traversal dispatch");

    let switch = switch_instruction(&func, &tag, stuck, &cases)?;
    func.terminate(entry, switch)?;
    func.trap(stuck)?;
    func.move_to_end(stuck);

    cx.module.add_function(name, func.finish()?)
}
