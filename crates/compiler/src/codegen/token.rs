//! `getToken`: turn literal bytes of a given sort into a runtime value.
//!
//! Tokens arrive as a sort name plus a byte buffer of `len` bytes. Int tokens
//! are the exception: GMP reads up to a NUL and ignores `len`, so the bytes of
//! an Int token must be NUL-terminated.
//!
//! Every declared sort with a builtin category gets a `strcmp` test, in sort
//! name order; anything that matches none of them becomes an opaque string
//! token.
//!
//! | Category                   | Result                                  |
//! |----------------------------|-----------------------------------------|
//! | Bool                       | boxed `i1`, true iff the bytes are `true` |
//! | Int                        | `%mpz` parsed base 10, trap if malformed |
//! | Float, StringBuffer, MInt  | trap                                    |
//! | Map, List, Set             | trap                                    |
//! | anything else              | `%string` copy of the bytes             |

use super::boxing::box_value;
use super::function::{BlockId, FunctionBuilder};
use super::{CodeGenError, EmitContext, GET_TOKEN};
use crate::definition::{Sort, SortCategory, SortDeclaration};
use tracing::debug;

/// Base passed to the GMP string parser.
const INTEGER_BASE: u32 = 10;

/// Byte length of the `true` literal.
const BOOL_TRUE_LEN: u64 = 4;

struct TokenParams {
    sort: String,
    len: String,
    bytes: String,
}

fn emit_bool_case(
    cx: &mut EmitContext<'_>,
    func: &mut FunctionBuilder,
    params: &TokenParams,
    sort: &Sort,
    block: BlockId,
) -> Result<String, CodeGenError> {
    let literal = cx.module.intern_bool_true()?;
    let value = func.assign(
        block,
        format!(
            "call i1 @string_equal(ptr {}, ptr {}, i64 {}, i64 {})",
            params.bytes, literal, params.len, BOOL_TRUE_LEN
        ),
    )?;
    box_value(func, block, cx.layout, SortCategory::Bool, sort, &value)
}

/// Emits the parse in `block` and returns the result. Malformed input
/// branches to an `invalid_int` trap; success falls through to `exit`.
fn emit_int_case(
    cx: &mut EmitContext<'_>,
    func: &mut FunctionBuilder,
    params: &TokenParams,
    block: BlockId,
    exit: BlockId,
) -> Result<String, CodeGenError> {
    let layout = cx.layout;
    let integer = layout.integer_type().to_string();
    let value = layout.emit_allocate(func, block, &integer, None)?;
    let status = func.assign(
        block,
        format!(
            "call i32 @__gmpz_init_set_str(ptr {}, ptr {}, i32 {})",
            value, params.bytes, INTEGER_BASE
        ),
    )?;
    let ok = func.assign(block, format!("icmp eq i32 {}, 0", status))?;
    let invalid = func.append_block("invalid_int");
    func.cond_branch(block, &ok, exit, invalid)?;
    func.trap(invalid)?;
    Ok(value)
}

fn emit_opaque_token(
    cx: &mut EmitContext<'_>,
    func: &mut FunctionBuilder,
    params: &TokenParams,
    block: BlockId,
) -> Result<String, CodeGenError> {
    let layout = cx.layout;
    let token_type = layout.token_type().to_string();
    let token = layout.emit_allocate(func, block, &token_type, Some(&params.len))?;
    let content = layout.emit_token_header(func, block, &token, &params.len)?;
    func.push(
        block,
        format!(
            "call ptr @memcpy(ptr {}, ptr {}, i64 {})",
            content, params.bytes, params.len
        ),
    )?;
    Ok(token)
}

/// `ptr @getToken(ptr %sort, i64 %len, ptr %bytes)`
pub(super) fn emit_token_parser(cx: &mut EmitContext<'_>) -> Result<(), CodeGenError> {
    let definition = cx.definition;
    let mut func = FunctionBuilder::new(
        GET_TOKEN,
        "ptr",
        &[("ptr", "sort"), ("i64", "len"), ("ptr", "bytes")],
    );
    let params = TokenParams {
        sort: func.param(0)?,
        len: func.param(1)?,
        bytes: func.param(2)?,
    };

    let builtin: Vec<&SortDeclaration> = definition
        .sort_declarations()
        .filter(|decl| decl.category() != SortCategory::Symbol)
        .collect();

    let entry = func.append_block("entry");
    let mut tests = vec![entry];
    for decl in builtin.iter().skip(1) {
        tests.push(func.append_block(&format!("is_{}", decl.name)));
    }
    let exit = func.append_block("exit");
    let fallback = func.append_block("symbol");

    let mut incoming = Vec::new();
    for (index, decl) in builtin.iter().enumerate() {
        let test = tests[index];
        let next = tests.get(index + 1).copied().unwrap_or(fallback);
        let sort = Sort::new(decl.name.as_str());
        let name = cx.module.intern_sort_name(&sort)?;
        let cmp = func.assign(
            test,
            format!("call i32 @strcmp(ptr {}, ptr {})", params.sort, name),
        )?;
        let equal = func.assign(test, format!("icmp eq i32 {}, 0", cmp))?;
        let case = func.append_block(&decl.name);
        func.cond_branch(test, &equal, case, next)?;

        match decl.category() {
            SortCategory::Bool => {
                let value = emit_bool_case(cx, &mut func, &params, &sort, case)?;
                func.branch(case, exit)?;
                incoming.push((value, case));
            }
            SortCategory::Int => {
                let value = emit_int_case(cx, &mut func, &params, case, exit)?;
                incoming.push((value, case));
            }
            SortCategory::Float
            | SortCategory::StringBuffer
            | SortCategory::MInt
            | SortCategory::Map
            | SortCategory::List
            | SortCategory::Set => func.trap(case)?,
            category @ (SortCategory::Symbol | SortCategory::Uncomputed) => {
                return Err(CodeGenError::unexpected_category(category, "a token test"));
            }
        }
    }
    if builtin.is_empty() {
        func.branch(entry, fallback)?;
    }
    debug!(sorts = builtin.len(), "token parser");

    let token = emit_opaque_token(cx, &mut func, &params, fallback)?;
    func.branch(fallback, exit)?;
    incoming.push((token, fallback));
    // The fallback follows the last test, ahead of the merge.
    func.move_to_end(fallback);

    let result = func.phi(exit, "ptr", &incoming)?;
    func.terminate(exit, format!("ret ptr {}", result))?;
    func.move_to_end(exit);

    cx.module.add_function(GET_TOKEN, func.finish()?)
}
