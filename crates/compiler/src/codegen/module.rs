//! Output Module
//!
//! `IrModule` is the single piece of shared state during generation. It owns
//! the interned string constants, the on-demand function declarations and the
//! bodies of every generated routine, and renders them as one `.ll` file.

use super::runtime::{emit_runtime_decls, is_runtime_function};
use super::CodeGenError;
use crate::config::{CompilerConfig, host_target_triple};
use std::collections::{BTreeMap, HashMap};
use std::fmt::Write as _;

pub struct IrModule {
    pub(super) module_id: String,
    pub(super) target_triple: String,
    pub(super) type_definitions: String,
    /// LLVM IR for interned constants, in creation order
    pub(super) string_globals: String,
    /// global name -> reference (`@"sym_name_..."`), for deduplication
    pub(super) string_constants: HashMap<String, String>,
    /// function name -> `declare` line, for functions outside the runtime table
    pub(super) declarations: BTreeMap<String, String>,
    /// function name -> signature, for mismatch detection
    pub(super) signatures: HashMap<String, String>,
    pub(super) functions: Vec<(String, String)>,
}

impl IrModule {
    pub fn new(config: &CompilerConfig) -> Self {
        IrModule {
            module_id: config.module_id.clone(),
            target_triple: config
                .target_triple
                .clone()
                .unwrap_or_else(host_target_triple),
            type_definitions: String::new(),
            string_globals: String::new(),
            string_constants: HashMap::new(),
            declarations: BTreeMap::new(),
            signatures: HashMap::new(),
            functions: Vec::new(),
        }
    }

    pub(super) fn set_type_definitions(&mut self, types: String) {
        self.type_definitions = types;
    }

    /// Get or insert a declaration for an external function.
    ///
    /// Runtime functions are always declared by the module prologue, so only
    /// their signature is checked. Returns the callee reference (`@name`).
    pub fn declare_function(
        &mut self,
        name: &str,
        return_type: &str,
        params: &[&str],
    ) -> Result<String, CodeGenError> {
        let callee = format!("@{}", llvm_identifier(name)?);
        let signature = format!("{} ({})", return_type, params.join(", "));

        if let Some(existing) = self.signatures.get(name) {
            if *existing != signature {
                return Err(CodeGenError::Logic(format!(
                    "Function '{}' declared as '{}' and as '{}'",
                    name, existing, signature
                )));
            }
            return Ok(callee);
        }
        self.signatures.insert(name.to_string(), signature);

        if !is_runtime_function(name) && !self.is_defined(name) {
            self.declarations.insert(
                name.to_string(),
                format!("declare {} {}({})", return_type, callee, params.join(", ")),
            );
        }
        Ok(callee)
    }

    /// Add a fully rendered function definition.
    pub(super) fn add_function(&mut self, name: &str, body: String) -> Result<(), CodeGenError> {
        if self.is_defined(name) {
            return Err(CodeGenError::Logic(format!(
                "Function '{}' is defined twice",
                name
            )));
        }
        self.declarations.remove(name);
        self.functions.push((name.to_string(), body));
        Ok(())
    }

    pub fn is_defined(&self, name: &str) -> bool {
        self.functions.iter().any(|(defined, _)| defined == name)
    }

    /// Names of the defined functions, in definition order.
    pub fn function_names(&self) -> impl Iterator<Item = &str> {
        self.functions.iter().map(|(name, _)| name.as_str())
    }

    /// Render the module as LLVM IR text.
    pub fn to_ir(&self) -> Result<String, CodeGenError> {
        let mut ir = String::new();

        writeln!(&mut ir, "; ModuleID = '{}'", self.module_id)?;
        writeln!(&mut ir, "target triple = \"{}\"", self.target_triple)?;
        writeln!(&mut ir)?;

        if !self.type_definitions.is_empty() {
            ir.push_str(&self.type_definitions);
            writeln!(&mut ir)?;
        }

        self.emit_string_globals(&mut ir)?;

        emit_runtime_decls(&mut ir)?;

        if !self.declarations.is_empty() {
            writeln!(&mut ir, "; Term construction declarations")?;
            for decl in self.declarations.values() {
                writeln!(&mut ir, "{}", decl)?;
            }
            writeln!(&mut ir)?;
        }

        for (_, body) in &self.functions {
            ir.push_str(body);
            writeln!(&mut ir)?;
        }

        Ok(ir)
    }
}

/// Spell a global or local name so LLVM accepts it.
///
/// Names made only of identifier characters are used as-is; anything else
/// (K names such as `Lbl'Plus'Int{}`) is quoted and escaped.
pub(crate) fn llvm_identifier(name: &str) -> Result<String, std::fmt::Error> {
    let plain = !name.is_empty()
        && name.chars().enumerate().all(|(i, c)| {
            c.is_ascii_alphabetic()
                || matches!(c, '-' | '$' | '.' | '_')
                || (i > 0 && c.is_ascii_digit())
        });
    if plain {
        Ok(name.to_string())
    } else {
        Ok(format!("\"{}\"", IrModule::escape_llvm_string(name)?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn module() -> IrModule {
        IrModule::new(&CompilerConfig::new().with_target_triple("x86_64-unknown-linux-gnu"))
    }

    #[test]
    fn test_llvm_identifier_plain_and_quoted() {
        assert_eq!(llvm_identifier("getToken").unwrap(), "getToken");
        assert_eq!(llvm_identifier("tag12").unwrap(), "tag12");
        assert_eq!(llvm_identifier("12tag").unwrap(), "\"12tag\"");
        assert_eq!(
            llvm_identifier("sym_name_Lbl'Plus'Int{}").unwrap(),
            "\"sym_name_Lbl'Plus'Int{}\""
        );
        assert_eq!(llvm_identifier("a\"b").unwrap(), r#""a\22b""#);
    }

    #[test]
    fn test_declare_function_is_get_or_insert() {
        let mut m = module();
        let a = m.declare_function("eval_foo", "ptr", &["ptr"]).unwrap();
        let b = m.declare_function("eval_foo", "ptr", &["ptr"]).unwrap();
        assert_eq!(a, "@eval_foo");
        assert_eq!(a, b);
        let ir = m.to_ir().unwrap();
        assert_eq!(ir.matches("declare ptr @eval_foo(ptr)").count(), 1);
    }

    #[test]
    fn test_declare_function_signature_mismatch() {
        let mut m = module();
        m.declare_function("eval_foo", "ptr", &["ptr"]).unwrap();
        let err = m.declare_function("eval_foo", "i1", &[]).unwrap_err();
        assert!(err.to_string().contains("eval_foo"));
    }

    #[test]
    fn test_runtime_functions_not_redeclared() {
        let mut m = module();
        m.declare_function("malloc", "ptr", &["i64"]).unwrap();
        let ir = m.to_ir().unwrap();
        assert_eq!(ir.matches("declare ptr @malloc(i64)").count(), 1);
    }

    #[test]
    fn test_defined_function_drops_declaration() {
        let mut m = module();
        m.declare_function("helper", "void", &[]).unwrap();
        m.add_function("helper", "define void @helper() {\nentry:\n  ret void\n}\n".to_string())
            .unwrap();
        let ir = m.to_ir().unwrap();
        assert!(!ir.contains("declare void @helper()"));
        assert!(ir.contains("define void @helper()"));
        assert!(m.add_function("helper", String::new()).is_err());
    }

    #[test]
    fn test_module_header() {
        let m = IrModule::new(
            &CompilerConfig::new()
                .with_module_id("imp")
                .with_target_triple("aarch64-unknown-linux-gnu"),
        );
        let ir = m.to_ir().unwrap();
        assert!(ir.starts_with("; ModuleID = 'imp'\n"));
        assert!(ir.contains("target triple = \"aarch64-unknown-linux-gnu\""));
        assert!(ir.contains("declare void @abort()"));
    }
}
