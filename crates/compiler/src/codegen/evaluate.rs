//! `evaluateFunctionSymbol`: apply a function symbol to generic arguments.
//!
//! Each case unboxes the argument slots, binds them to the synthetic
//! variables `_0`, `_1`, ..., asks the term builder for `symbol(_0, _1, ...)`
//! and boxes the result. The builder may leave the case in a different block
//! than it started in; boxing and the branch to `exit` happen there.

use super::boxing::{box_value, load_argument, unbox};
use super::dispatch::{DataCase, emit_data_dispatch};
use super::function::{BlockId, FunctionBuilder};
use super::term::{Built, Pattern, Substitution, TermBuilder};
use super::{CodeGenError, EmitContext, EVALUATE_FUNCTION_SYMBOL};
use crate::definition::{Symbol, SymbolDeclaration};
use tracing::trace;

struct EvaluateCase<'b> {
    term_builder: &'b mut dyn TermBuilder,
}

impl DataCase for EvaluateCase<'_> {
    fn is_eligible(&self, cx: &EmitContext<'_>, symbol: &Symbol) -> Result<bool, CodeGenError> {
        Ok(cx
            .definition
            .symbol_declaration(&symbol.name)
            .is_some_and(SymbolDeclaration::is_function))
    }

    fn emit_case(
        &mut self,
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        symbol: &Symbol,
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        let layout = cx.layout;
        let definition = cx.definition;
        let args = func.param(1)?;

        let mut substitution = Substitution::new();
        let mut variables = Vec::with_capacity(symbol.arguments.len());
        for (index, sort) in symbol.arguments.iter().enumerate() {
            let slot = load_argument(func, block, &args, index)?;
            let value = unbox(func, block, layout, definition.category(sort), sort, &slot)?;
            let name = format!("_{}", index);
            substitution.insert(name.clone(), value);
            variables.push(Pattern::Variable {
                name,
                sort: sort.clone(),
            });
        }
        let pattern = Pattern::Composite {
            symbol: symbol.clone(),
            arguments: variables,
        };
        trace!(symbol = %symbol.name, "evaluating function symbol");

        let built = self
            .term_builder
            .build(cx, func, &pattern, &substitution, block)?;
        let result = box_value(
            func,
            built.block,
            layout,
            definition.category(&symbol.sort),
            &symbol.sort,
            &built.value,
        )?;
        Ok(Built {
            value: result,
            block: built.block,
        })
    }
}

/// `ptr @evaluateFunctionSymbol(i32 %tag, ptr %args)`
pub(super) fn emit_evaluator(
    cx: &mut EmitContext<'_>,
    term_builder: &mut dyn TermBuilder,
) -> Result<(), CodeGenError> {
    let mut case = EvaluateCase { term_builder };
    emit_data_dispatch(cx, EVALUATE_FUNCTION_SYMBOL, "ptr", true, &mut case)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::IrModule;
    use crate::codegen::layout::StandardLayout;
    use crate::codegen::term::CallTermBuilder;
    use crate::config::CompilerConfig;
    use crate::definition::Definition;

    const DEF: &str = r#"
[[sort]]
name = "SortInt{}"
hook = "INT.Int"

[[sort]]
name = "SortBool{}"
hook = "BOOL.Bool"

[[sort]]
name = "SortKItem{}"

[[symbol]]
tag = 0
name = "Lbl'Unds-LT-'Int{}"
arguments = ["SortInt{}", "SortInt{}"]
sort = "SortBool{}"
attributes = ["function"]
hook = "INT.lt"

[[symbol]]
tag = 1
name = "inj{SortBool{}, SortKItem{}}"
arguments = ["SortBool{}"]
sort = "SortKItem{}"

[[symbol]]
tag = 2
name = "LblnotBool{}"
arguments = ["SortBool{}"]
sort = "SortBool{}"
attributes = ["function"]
"#;

    /// Builds every term in a freshly opened block, like a builder that
    /// needs its own control flow.
    struct SplittingBuilder;

    impl TermBuilder for SplittingBuilder {
        fn build(
            &mut self,
            _cx: &mut EmitContext<'_>,
            func: &mut FunctionBuilder,
            pattern: &Pattern,
            substitution: &Substitution,
            block: BlockId,
        ) -> Result<Built, CodeGenError> {
            let continuation = func.append_block("built");
            func.branch(block, continuation)?;
            let operand = substitution.get("_0").cloned().unwrap_or_default();
            let value = func.assign(
                continuation,
                format!("xor i1 {}, true", operand),
            )?;
            func.push(continuation, format!("; built {}", pattern.sort()))?;
            Ok(Built {
                value,
                block: continuation,
            })
        }
    }

    fn generate(term_builder: &mut dyn TermBuilder) -> String {
        let def = Definition::from_toml(DEF).unwrap();
        let mut module = IrModule::new(&CompilerConfig::new());
        let mut cx = EmitContext {
            definition: &def,
            module: &mut module,
            layout: &StandardLayout,
        };
        emit_evaluator(&mut cx, term_builder).unwrap();
        module.to_ir().unwrap()
    }

    #[test]
    fn test_only_function_symbols_get_cases() {
        let ir = generate(&mut CallTermBuilder);
        assert!(ir.contains("define ptr @evaluateFunctionSymbol(i32 %tag, ptr %args) {"));
        assert!(ir.contains(
            "switch i32 %tag, label %stuck [\n    i32 0, label %tag0\n    i32 2, label %tag2\n  ]"
        ));
        assert!(!ir.contains("tag1:"));
    }

    #[test]
    fn test_arguments_unboxed_and_result_boxed() {
        let ir = generate(&mut CallTermBuilder);
        // Int arguments pass by reference.
        assert!(ir.contains("%t1 = load ptr, ptr %t0"));
        assert!(ir.contains("%t3 = load ptr, ptr %t2"));
        assert!(ir.contains("%t4 = call i1 @hook_INT_lt(ptr %t1, ptr %t3)"));
        // Bool result is boxed.
        assert!(ir.contains("%t5 = call ptr @malloc(i64 ptrtoint (ptr getelementptr (i1, ptr null, i32 1) to i64))"));
        assert!(ir.contains("store i1 %t4, ptr %t5"));

        // Bool argument is unboxed and its box released.
        assert!(ir.contains("%t8 = load i1, ptr %t7\n  call void @free(ptr %t7)"));
        assert!(ir.contains("call i1 @\"eval_LblnotBool{}\"(i1 %t8)"));
        assert!(ir.contains("phi ptr [ %t5, %tag0 ], [ %t10, %tag2 ]"));
    }

    #[test]
    fn test_continuation_block_is_the_phi_predecessor() {
        let ir = generate(&mut SplittingBuilder);
        assert!(ir.contains("tag0:\n  %t0 = getelementptr [0 x ptr], ptr %args, i64 0, i64 0"));
        assert!(ir.contains("br label %built\n"));
        assert!(ir.contains("built:\n  %t4 = xor i1 %t1, true\n  ; built SortBool{}\n  %t5 = call ptr @malloc"));
        assert!(ir.contains("built.1:\n  %t9 = xor i1 %t8, true"));
        assert!(ir.contains("phi ptr [ %t5, %built ], [ %t10, %built.1 ]"));
        assert!(!ir.contains("%tag0 ]"));
    }
}
