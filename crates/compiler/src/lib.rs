//! Runtime Support Generator
//!
//! Generates the LLVM IR dispatch routines a compiled term-rewriting program
//! needs at run time (tag and name lookup, node headers, child storage,
//! function evaluation, token parsing and child traversal) from a fully
//! resolved definition.
//!
//! ```rust,ignore
//! use korec::{CompilerConfig, Definition, generate_ir};
//!
//! let definition = Definition::from_toml(&std::fs::read_to_string("def.toml")?)?;
//! let ir = generate_ir(&definition, &CompilerConfig::new())?;
//! ```
//!
//! Custom memory layouts and term construction plug in through
//! [`LayoutOracle`] and [`TermBuilder`] on [`CodeGen`].

pub mod codegen;
pub mod config;
pub mod definition;

pub use codegen::{
    CallTermBuilder, CodeGen, CodeGenError, IrModule, LayoutOracle, StandardLayout, TermBuilder,
};
pub use config::CompilerConfig;
pub use definition::{Definition, Sort, SortCategory, SortDeclaration, Symbol, SymbolDeclaration};

use std::fs;
use std::path::Path;
use tracing::info;

/// Generate the runtime support module for `definition` with the default
/// layout and term builder.
pub fn generate_ir(
    definition: &Definition,
    config: &CompilerConfig,
) -> Result<String, CodeGenError> {
    CodeGen::new(definition).generate(config)
}

/// Load a definition file, checking it without generating anything.
pub fn load_definition(path: &Path) -> Result<Definition, String> {
    let content = fs::read_to_string(path)
        .map_err(|e| format!("Failed to read definition file {}: {}", path.display(), e))?;
    Definition::from_toml(&content)
}

/// Generate the runtime support module for a definition file and write it to
/// `output_path`.
pub fn compile_file(
    definition_path: &Path,
    output_path: &Path,
    config: &CompilerConfig,
) -> Result<(), String> {
    let definition = load_definition(definition_path)?;
    info!(
        definition = %definition_path.display(),
        symbols = definition.symbol_count(),
        "loaded definition"
    );

    let ir = generate_ir(&definition, config).map_err(|e| e.to_string())?;

    fs::write(output_path, ir).map_err(|e| format!("Failed to write IR file: {}", e))?;
    info!(output = %output_path.display(), "wrote runtime support module");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    const DEF: &str = r#"
[[sort]]
name = "SortInt{}"
hook = "INT.Int"

[[sort]]
name = "SortKItem{}"

[[symbol]]
tag = 0
name = "inj{SortInt{}, SortKItem{}}"
arguments = ["SortInt{}"]
sort = "SortKItem{}"
"#;

    #[test]
    fn test_compile_file_writes_module() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("def.toml");
        let output = dir.path().join("support.ll");
        let mut file = fs::File::create(&input).unwrap();
        file.write_all(DEF.as_bytes()).unwrap();

        let config = CompilerConfig::new()
            .with_module_id("support")
            .with_target_triple("x86_64-unknown-linux-gnu");
        compile_file(&input, &output, &config).unwrap();

        let ir = fs::read_to_string(&output).unwrap();
        assert!(ir.starts_with("; ModuleID = 'support'\n"));
        assert!(ir.contains("define ptr @getToken(ptr %sort, i64 %len, ptr %bytes)"));
        assert!(ir.contains("define void @visitChildren("));
    }

    #[test]
    fn test_compile_file_reports_missing_input() {
        let dir = tempfile::tempdir().unwrap();
        let err = compile_file(
            &dir.path().join("missing.toml"),
            &dir.path().join("out.ll"),
            &CompilerConfig::new(),
        )
        .unwrap_err();
        assert!(err.starts_with("Failed to read definition file"), "{}", err);
    }

    #[test]
    fn test_compile_file_reports_invalid_definition() {
        let mut input = tempfile::NamedTempFile::new().unwrap();
        input.write_all(b"[[symbol]]\ntag = 3\nname = \"a\"\nsort = \"S\"\n").unwrap();
        let dir = tempfile::tempdir().unwrap();
        let output = dir.path().join("out.ll");
        let err = compile_file(input.path(), &output, &CompilerConfig::new()).unwrap_err();
        assert!(err.contains("contiguous"), "{}", err);
        assert!(!output.exists());
    }

    #[test]
    fn test_demo_definition_generates() {
        let definition = Definition::from_toml(include_str!("../../../demos/imp.toml")).unwrap();
        let config = CompilerConfig::from_toml(include_str!("../../../demos/korec.toml")).unwrap();
        let ir = generate_ir(&definition, &config).unwrap();
        assert!(ir.starts_with("; ModuleID = 'imp_support'\n"));
        assert_eq!(ir.matches("\ndefine ").count(), 8);
        // Functions are tags 0 through 8.
        assert!(ir.contains("    i32 8, label %tag8\n  ]\ntag0:"));
        assert!(ir.contains("declare ptr @\"eval_LbllookupVar{}\"(%map, ptr)"));
    }

    #[test]
    fn test_generation_errors_surface_as_strings() {
        let def = Definition::from_toml(
            "[[symbol]]\ntag = 0\nname = \"a\"\narguments = [\"S\"]\nsort = \"S\"\n",
        )
        .unwrap();
        let err = generate_ir(&def, &CompilerConfig::new()).unwrap_err();
        assert!(err.to_string().contains("'S'"), "{}", err);
    }
}
