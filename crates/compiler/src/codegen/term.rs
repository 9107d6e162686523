//! Term Construction
//!
//! The evaluator delegates building a function symbol's right-hand side to a
//! `TermBuilder`. A builder may open new blocks while it works, so it reports
//! where generation continues as part of its result (`Built::block`).
//!
//! `CallTermBuilder` is the default: a function symbol becomes a call to its
//! hook implementation (`hook_INT_add`) or to its compiled definition
//! (`eval_<symbol>`); a constructor becomes a freshly allocated block.

use super::function::{BlockId, FunctionBuilder};
use super::{CodeGenError, EmitContext};
use crate::definition::{Sort, SortCategory, Symbol};
use std::collections::HashMap;
use tracing::trace;

/// A pattern to build: a variable, or a symbol applied to sub-patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pattern {
    Variable { name: String, sort: Sort },
    Composite { symbol: Symbol, arguments: Vec<Pattern> },
}

impl Pattern {
    pub fn sort(&self) -> &Sort {
        match self {
            Pattern::Variable { sort, .. } => sort,
            Pattern::Composite { symbol, .. } => &symbol.sort,
        }
    }
}

/// Variable name -> SSA value holding its native representation.
pub type Substitution = HashMap<String, String>;

/// A built value together with the block generation continues in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Built {
    pub value: String,
    pub block: BlockId,
}

pub trait TermBuilder {
    /// Emit code computing `pattern` under `substitution`, starting in `block`.
    fn build(
        &mut self,
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        pattern: &Pattern,
        substitution: &Substitution,
        block: BlockId,
    ) -> Result<Built, CodeGenError>;
}

/// Default term builder.
#[derive(Debug, Default)]
pub struct CallTermBuilder;

impl CallTermBuilder {
    /// Callee implementing a function symbol.
    fn callee_name(symbol: &Symbol, hook: Option<&str>) -> String {
        match hook {
            Some(hook) => format!("hook_{}", hook.replace('.', "_")),
            None => format!("eval_{}", symbol.name),
        }
    }

    fn native_type(cx: &EmitContext<'_>, sort: &Sort) -> Result<&'static str, CodeGenError> {
        match cx.definition.category(sort) {
            SortCategory::Uncomputed => Err(CodeGenError::uncomputed(sort)),
            category => cx.layout.value_type(category),
        }
    }

    fn build_call(
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        symbol: &Symbol,
        hook: Option<&str>,
        arguments: &[String],
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        let return_type = Self::native_type(cx, &symbol.sort)?;
        let mut param_types = Vec::with_capacity(symbol.arguments.len());
        for sort in &symbol.arguments {
            param_types.push(Self::native_type(cx, sort)?);
        }
        let callee = cx.module.declare_function(
            &Self::callee_name(symbol, hook),
            return_type,
            &param_types,
        )?;
        let operands: Vec<String> = param_types
            .iter()
            .zip(arguments)
            .map(|(ty, value)| format!("{} {}", ty, value))
            .collect();
        let value = func.assign(
            block,
            format!("call {} {}({})", return_type, callee, operands.join(", ")),
        )?;
        Ok(Built { value, block })
    }

    fn build_constructor(
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        symbol: &Symbol,
        arguments: &[String],
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        let category = cx.definition.category(&symbol.sort);
        if category != SortCategory::Symbol {
            return Err(CodeGenError::unexpected_category(
                category,
                &format!("the result of constructor '{}'", symbol.name),
            ));
        }
        let block_type = cx.layout.block_type(cx.definition, symbol)?;
        let header = cx.layout.header_value(cx.definition, symbol)?;
        let header_type = cx.layout.header_type().to_string();

        let node = cx.layout.emit_allocate(func, block, &block_type, None)?;
        let header_ptr = func.assign(
            block,
            format!("getelementptr inbounds {}, ptr {}, i64 0, i32 0", block_type, node),
        )?;
        func.push(
            block,
            format!(
                "store {} {}, ptr {}",
                header_type,
                cx.layout.header_constant(header),
                header_ptr
            ),
        )?;
        for (index, (sort, value)) in symbol.arguments.iter().zip(arguments).enumerate() {
            let ty = Self::native_type(cx, sort)?;
            let child = cx
                .layout
                .emit_child_address(func, block, &block_type, &node, index)?;
            func.push(block, format!("store {} {}, ptr {}", ty, value, child))?;
        }
        Ok(Built { value: node, block })
    }
}

impl TermBuilder for CallTermBuilder {
    fn build(
        &mut self,
        cx: &mut EmitContext<'_>,
        func: &mut FunctionBuilder,
        pattern: &Pattern,
        substitution: &Substitution,
        block: BlockId,
    ) -> Result<Built, CodeGenError> {
        match pattern {
            Pattern::Variable { name, .. } => {
                let value = substitution.get(name).ok_or_else(|| {
                    CodeGenError::Logic(format!(
                        "CodeGen: variable '{}' is not bound. This is a compiler bug.",
                        name
                    ))
                })?;
                Ok(Built {
                    value: value.clone(),
                    block,
                })
            }
            Pattern::Composite { symbol, arguments } => {
                if arguments.len() != symbol.arguments.len() {
                    return Err(CodeGenError::Logic(format!(
                        "CodeGen: '{}' applied to {} arguments, expected {}",
                        symbol.name,
                        arguments.len(),
                        symbol.arguments.len()
                    )));
                }
                let mut block = block;
                let mut values = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    let built = self.build(cx, func, argument, substitution, block)?;
                    values.push(built.value);
                    block = built.block;
                }

                let decl = cx.definition.symbol_declaration(&symbol.name).ok_or_else(|| {
                    CodeGenError::Logic(format!(
                        "CodeGen: no declaration for symbol '{}'. This is a compiler bug.",
                        symbol.name
                    ))
                })?;
                if decl.is_function() {
                    let hook = decl.hook.clone();
                    trace!(symbol = %symbol.name, hook = ?hook, "building function call");
                    Self::build_call(cx, func, symbol, hook.as_deref(), &values, block)
                } else {
                    trace!(symbol = %symbol.name, "building constructor");
                    Self::build_constructor(cx, func, symbol, &values, block)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::IrModule;
    use crate::codegen::layout::StandardLayout;
    use crate::config::CompilerConfig;
    use crate::definition::Definition;

    const DEF: &str = r#"
[[sort]]
name = "SortInt{}"
hook = "INT.Int"

[[sort]]
name = "SortK{}"

[[symbol]]
tag = 0
name = "Lbl'Plus'Int{}"
arguments = ["SortInt{}", "SortInt{}"]
sort = "SortInt{}"
attributes = ["function"]
hook = "INT.add"

[[symbol]]
tag = 1
name = "Lblfoo{}"
arguments = ["SortK{}"]
sort = "SortK{}"
attributes = ["function"]

[[symbol]]
tag = 2
name = "Lblwrap{}"
arguments = ["SortInt{}"]
sort = "SortK{}"
"#;

    fn var(name: &str, sort: &str) -> Pattern {
        Pattern::Variable {
            name: name.to_string(),
            sort: Sort::new(sort),
        }
    }

    fn run(def: &Definition, pattern: &Pattern, subst: &Substitution) -> (Result<Built, CodeGenError>, String, IrModule) {
        let mut module = IrModule::new(&CompilerConfig::new());
        let mut func = FunctionBuilder::new("test", "ptr", &[("ptr", "a"), ("ptr", "b")]);
        let entry = func.append_block("entry");
        let result = {
            let mut cx = EmitContext {
                definition: def,
                module: &mut module,
                layout: &StandardLayout,
            };
            CallTermBuilder.build(&mut cx, &mut func, pattern, subst, entry)
        };
        if let Ok(built) = &result {
            func.terminate(built.block, format!("ret ptr {}", built.value)).unwrap();
        }
        let ir = func.finish().unwrap_or_default();
        (result, ir, module)
    }

    fn subst() -> Substitution {
        Substitution::from([
            ("_0".to_string(), "%a".to_string()),
            ("_1".to_string(), "%b".to_string()),
        ])
    }

    #[test]
    fn test_hooked_function_calls_hook() {
        let def = Definition::from_toml(DEF).unwrap();
        let pattern = Pattern::Composite {
            symbol: def.symbol(0).unwrap().clone(),
            arguments: vec![var("_0", "SortInt{}"), var("_1", "SortInt{}")],
        };
        let (result, ir, module) = run(&def, &pattern, &subst());
        result.unwrap();
        assert!(ir.contains("%t0 = call ptr @hook_INT_add(ptr %a, ptr %b)"));
        assert!(module.to_ir().unwrap().contains("declare ptr @hook_INT_add(ptr, ptr)"));
    }

    #[test]
    fn test_unhooked_function_calls_eval() {
        let def = Definition::from_toml(DEF).unwrap();
        let pattern = Pattern::Composite {
            symbol: def.symbol(1).unwrap().clone(),
            arguments: vec![var("_0", "SortK{}")],
        };
        let (result, ir, _) = run(&def, &pattern, &subst());
        result.unwrap();
        assert!(ir.contains("call ptr @\"eval_Lblfoo{}\"(ptr %a)"));
    }

    #[test]
    fn test_constructor_allocates_block() {
        let def = Definition::from_toml(DEF).unwrap();
        let pattern = Pattern::Composite {
            symbol: def.symbol(2).unwrap().clone(),
            arguments: vec![var("_0", "SortInt{}")],
        };
        let (result, ir, _) = run(&def, &pattern, &subst());
        result.unwrap();
        assert!(ir.contains("call ptr @koreAlloc(i64 ptrtoint (ptr getelementptr ({ %blockheader, [0 x ptr], ptr }, ptr null, i32 1) to i64))"));
        assert!(ir.contains(&format!("store %blockheader {{ i64 {} }}", 2u64 | (2u64 << 32))));
        assert!(ir.contains("store ptr %a, ptr %t2"));
    }

    #[test]
    fn test_unbound_variable_is_an_error() {
        let def = Definition::from_toml(DEF).unwrap();
        let (result, _, _) = run(&def, &var("_9", "SortInt{}"), &subst());
        assert!(result.unwrap_err().to_string().contains("'_9' is not bound"));
    }

    #[test]
    fn test_arity_mismatch_is_an_error() {
        let def = Definition::from_toml(DEF).unwrap();
        let pattern = Pattern::Composite {
            symbol: def.symbol(0).unwrap().clone(),
            arguments: vec![var("_0", "SortInt{}")],
        };
        let (result, _, _) = run(&def, &pattern, &subst());
        assert!(result.is_err());
    }
}
