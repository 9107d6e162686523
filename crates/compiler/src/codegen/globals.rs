//! Interned String Constants
//!
//! Symbol names, sort names and the `"true"` literal are emitted as LLVM
//! global constants. Every request goes through `intern_string`, keyed by the
//! global's name (which is derived from the string content), so the same
//! literal requested by different routines resolves to one global.

use super::module::llvm_identifier;
use super::{CodeGenError, IrModule};
use crate::definition::Sort;
use std::fmt::Write as _;

const SYMBOL_NAME_PREFIX: &str = "sym_name_";
const SORT_NAME_PREFIX: &str = "sort_name_";
const BOOL_TRUE: &str = "bool_true";

impl IrModule {
    /// Escape a string for LLVM IR string literals
    pub(crate) fn escape_llvm_string(s: &str) -> Result<String, std::fmt::Error> {
        let mut result = String::new();
        for ch in s.chars() {
            match ch {
                ' '..='!' | '#'..='[' | ']'..='~' => result.push(ch),
                '\\' => result.push_str(r"\\"),
                '"' => result.push_str(r#"\22"#),
                '\n' => result.push_str(r"\0A"),
                '\r' => result.push_str(r"\0D"),
                '\t' => result.push_str(r"\09"),
                _ => {
                    // Non-printable: use hex escape
                    for byte in ch.to_string().as_bytes() {
                        write!(&mut result, r"\{:02X}", byte)?;
                    }
                }
            }
        }
        Ok(result)
    }

    /// Get or create a global string constant named `global`.
    fn intern_string(
        &mut self,
        global: &str,
        content: &str,
        null_terminated: bool,
    ) -> Result<String, CodeGenError> {
        if let Some(reference) = self.string_constants.get(global) {
            return Ok(reference.clone());
        }

        let reference = format!("@{}", llvm_identifier(global)?);
        let escaped = Self::escape_llvm_string(content)?;
        let (len, terminator) = if null_terminated {
            (content.len() + 1, "\\00")
        } else {
            (content.len(), "")
        };

        writeln!(
            &mut self.string_globals,
            "{} = constant [{} x i8] c\"{}{}\"",
            reference, len, escaped, terminator
        )?;

        self.string_constants
            .insert(global.to_string(), reference.clone());
        Ok(reference)
    }

    /// Null-terminated name of a symbol, as returned by `getSymbolNameForTag`.
    pub fn intern_symbol_name(&mut self, name: &str) -> Result<String, CodeGenError> {
        self.intern_string(&format!("{}{}", SYMBOL_NAME_PREFIX, name), name, true)
    }

    /// Null-terminated name of a sort, as passed to visitor callbacks.
    pub fn intern_sort_name(&mut self, sort: &Sort) -> Result<String, CodeGenError> {
        self.intern_string(
            &format!("{}{}", SORT_NAME_PREFIX, sort.name()),
            sort.name(),
            true,
        )
    }

    /// The four bytes `true`, without a terminator.
    pub fn intern_bool_true(&mut self) -> Result<String, CodeGenError> {
        self.intern_string(BOOL_TRUE, "true", false)
    }

    pub fn interned_count(&self) -> usize {
        self.string_constants.len()
    }

    pub(super) fn emit_string_globals(&self, ir: &mut String) -> Result<(), CodeGenError> {
        if !self.string_globals.is_empty() {
            ir.push_str(&self.string_globals);
            writeln!(ir)?;
        }
        Ok(())
    }
}
