//! LLVM IR Generation of Runtime Support Routines
//!
//! Generates, as textual LLVM IR, the routines every compiled program links
//! against to inspect and build terms at run time:
//!
//! | Routine                  | Signature                                         |
//! |--------------------------|---------------------------------------------------|
//! | `getTagForSymbolName`    | `i32 (ptr name)`                                  |
//! | `getBlockHeaderForSymbol`| `%blockheader (i32 tag)`                          |
//! | `isSymbolAFunction`      | `i1 (i32 tag)`                                    |
//! | `storeSymbolChildren`    | `void (ptr node, ptr args)`                       |
//! | `evaluateFunctionSymbol` | `ptr (i32 tag, ptr args)`                         |
//! | `getToken`               | `ptr (ptr sort, i64 len, ptr bytes)`              |
//! | `getSymbolNameForTag`    | `ptr (i32 tag)`                                   |
//! | `visitChildren`          | `void (ptr node, ptr sink, ptr x 8 callbacks)`    |
//!
//! Every routine ends in a fatal trap (`abort` + `unreachable`) for tags,
//! sorts or literals it does not know. Nothing is recoverable at run time.
//!
//! # Generation Strategy
//!
//! Most routines are a `switch` over the closed set of symbol tags (see
//! `dispatch`). Physical layout questions go to a `LayoutOracle`, and building
//! the right-hand side of a function symbol goes to a `TermBuilder`; the
//! defaults are `StandardLayout` and `CallTermBuilder`.

// Submodules
mod boxing;
mod dispatch;
mod error;
mod evaluate;
mod function;
mod globals;
pub mod layout;
mod lookups;
mod module;
mod runtime;
mod store_children;
mod tag_resolver;
mod term;
mod token;
mod visitor;

// Re-exports
pub use error::CodeGenError;
pub use function::{BlockId, FunctionBuilder};
pub use layout::{LayoutOracle, StandardLayout};
pub use module::IrModule;
pub use runtime::{RUNTIME_DECLARATIONS, emit_runtime_decls};
pub use term::{Built, CallTermBuilder, Pattern, Substitution, TermBuilder};

use crate::config::CompilerConfig;
use crate::definition::Definition;
use tracing::{debug, info};

pub const GET_TAG_FOR_SYMBOL_NAME: &str = "getTagForSymbolName";
pub const GET_BLOCK_HEADER_FOR_SYMBOL: &str = "getBlockHeaderForSymbol";
pub const IS_SYMBOL_A_FUNCTION: &str = "isSymbolAFunction";
pub const STORE_SYMBOL_CHILDREN: &str = "storeSymbolChildren";
pub const EVALUATE_FUNCTION_SYMBOL: &str = "evaluateFunctionSymbol";
pub const GET_TOKEN: &str = "getToken";
pub const GET_SYMBOL_NAME_FOR_TAG: &str = "getSymbolNameForTag";
pub const VISIT_CHILDREN: &str = "visitChildren";

/// Everything an emitter reads or writes while generating one routine.
pub struct EmitContext<'a> {
    pub definition: &'a Definition,
    pub module: &'a mut IrModule,
    pub layout: &'a dyn LayoutOracle,
}

/// Drives the emitters over one definition.
pub struct CodeGen<'a> {
    definition: &'a Definition,
    layout: &'a dyn LayoutOracle,
    term_builder: Box<dyn TermBuilder + 'a>,
}

impl<'a> CodeGen<'a> {
    /// Generator using the standard layout and call-based term construction.
    pub fn new(definition: &'a Definition) -> Self {
        CodeGen {
            definition,
            layout: &StandardLayout,
            term_builder: Box::new(CallTermBuilder),
        }
    }

    pub fn with_layout(mut self, layout: &'a dyn LayoutOracle) -> Self {
        self.layout = layout;
        self
    }

    pub fn with_term_builder(mut self, term_builder: impl TermBuilder + 'a) -> Self {
        self.term_builder = Box::new(term_builder);
        self
    }

    /// Emit all eight routines into `module`, in a fixed order.
    pub fn emit_config_parser_functions(
        &mut self,
        module: &mut IrModule,
    ) -> Result<(), CodeGenError> {
        info!(
            symbols = self.definition.symbol_count(),
            sorts = self.definition.sort_declarations().count(),
            "generating runtime support routines"
        );
        module.set_type_definitions(self.layout.type_definitions());

        let mut cx = EmitContext {
            definition: self.definition,
            module,
            layout: self.layout,
        };
        tag_resolver::emit_tag_resolver(&mut cx)?;
        lookups::emit_header_lookup(&mut cx)?;
        lookups::emit_function_predicate(&mut cx)?;
        store_children::emit_store_children(&mut cx)?;
        evaluate::emit_evaluator(&mut cx, self.term_builder.as_mut())?;
        token::emit_token_parser(&mut cx)?;
        lookups::emit_name_lookup(&mut cx)?;
        visitor::emit_visitor(&mut cx)?;

        debug!(
            interned = cx.module.interned_count(),
            "runtime support routines done"
        );
        Ok(())
    }

    /// Emit all routines into a fresh module and render it.
    pub fn generate(&mut self, config: &CompilerConfig) -> Result<String, CodeGenError> {
        let mut module = IrModule::new(config);
        self.emit_config_parser_functions(&mut module)?;
        module.to_ir()
    }
}
