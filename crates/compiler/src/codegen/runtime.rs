//! Runtime function declarations for LLVM IR.
//!
//! Every runtime function the generated routines call is declared here in a
//! single data-driven table, emitted once per module.

use super::error::CodeGenError;
use std::fmt::Write as _;
use std::sync::LazyLock;

/// A runtime function declaration for LLVM IR.
pub struct RuntimeDecl {
    /// Function name without the `@` sigil
    pub name: &'static str,
    /// LLVM declaration string (e.g., "declare ptr @malloc(i64)")
    pub decl: &'static str,
    /// Optional category comment (e.g., "; Allocation")
    pub category: Option<&'static str>,
}

/// All runtime function declarations, organized by category.
pub static RUNTIME_DECLARATIONS: LazyLock<Vec<RuntimeDecl>> = LazyLock::new(|| {
    vec![
        // Fatal trap
        RuntimeDecl {
            name: "abort",
            decl: "declare void @abort()",
            category: Some("; Runtime function declarations"),
        },
        // String comparison
        RuntimeDecl {
            name: "strcmp",
            decl: "declare i32 @strcmp(ptr, ptr)",
            category: None,
        },
        RuntimeDecl {
            name: "string_equal",
            decl: "declare i1 @string_equal(ptr, ptr, i64, i64)",
            category: None,
        },
        // Boxing
        RuntimeDecl {
            name: "malloc",
            decl: "declare ptr @malloc(i64)",
            category: None,
        },
        RuntimeDecl {
            name: "free",
            decl: "declare void @free(ptr)",
            category: None,
        },
        RuntimeDecl {
            name: "memcpy",
            decl: "declare ptr @memcpy(ptr, ptr, i64)",
            category: None,
        },
        // Term allocation
        RuntimeDecl {
            name: "koreAlloc",
            decl: "declare ptr @koreAlloc(i64)",
            category: None,
        },
        RuntimeDecl {
            name: "koreAllocToken",
            decl: "declare ptr @koreAllocToken(i64)",
            category: None,
        },
        // Arbitrary-precision integers
        RuntimeDecl {
            name: "__gmpz_init_set_str",
            decl: "declare i32 @__gmpz_init_set_str(ptr, ptr, i32)",
            category: None,
        },
    ]
});

/// True if `name` is declared by the runtime table.
pub fn is_runtime_function(name: &str) -> bool {
    RUNTIME_DECLARATIONS.iter().any(|decl| decl.name == name)
}

/// Emit all runtime function declarations to the IR string.
pub fn emit_runtime_decls(ir: &mut String) -> Result<(), CodeGenError> {
    for decl in RUNTIME_DECLARATIONS.iter() {
        if let Some(cat) = decl.category {
            writeln!(ir, "{}", cat)?;
        }
        writeln!(ir, "{}", decl.decl)?;
    }
    writeln!(ir)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_declarations_match_names() {
        for decl in RUNTIME_DECLARATIONS.iter() {
            assert!(
                decl.decl.contains(&format!("@{}(", decl.name)),
                "{} does not declare {}",
                decl.decl,
                decl.name
            );
        }
    }

    #[test]
    fn test_is_runtime_function() {
        assert!(is_runtime_function("abort"));
        assert!(is_runtime_function("__gmpz_init_set_str"));
        assert!(!is_runtime_function("eval_foo"));
    }

    #[test]
    fn test_emit_runtime_decls() {
        let mut ir = String::new();
        emit_runtime_decls(&mut ir).unwrap();
        assert!(ir.starts_with("; Runtime function declarations\n"));
        assert_eq!(ir.matches("declare ").count(), RUNTIME_DECLARATIONS.len());
    }
}
