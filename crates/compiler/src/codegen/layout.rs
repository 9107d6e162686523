//! Layout Oracle
//!
//! Every physical layout decision lives behind `LayoutOracle`: the shape of
//! a symbol's block, the header constant, the native type of each sort
//! category and how memory is allocated. Dispatch emitters only ever use the
//! strings and temporaries it hands back.
//!
//! `StandardLayout` is the layout the runtime library is built against:
//!
//! ```text
//! block  = { %blockheader, [0 x ptr], child0, child1, ... }
//! header = tag | (size_in_words << 32)
//! ```

use super::function::{BlockId, FunctionBuilder};
use super::CodeGenError;
use crate::definition::{Definition, SortCategory, Symbol};

/// Struct index of the first child in a block.
pub const FIRST_CHILD_INDEX: usize = 2;

const HEADER_TYPE: &str = "%blockheader";
const INTEGER_TYPE: &str = "%mpz";
const TOKEN_TYPE: &str = "%string";

/// `sizeof(ty)` as an LLVM constant expression.
pub fn size_of(ty: &str) -> String {
    format!("ptrtoint (ptr getelementptr ({}, ptr null, i32 1) to i64)", ty)
}

pub trait LayoutOracle {
    /// Named type definitions referenced by the types below.
    fn type_definitions(&self) -> String;

    /// Type returned by `getBlockHeaderForSymbol`.
    fn header_type(&self) -> &str {
        HEADER_TYPE
    }

    /// Native type of a value of `category` when stored in a block.
    fn value_type(&self, category: SortCategory) -> Result<&'static str, CodeGenError>;

    /// Struct type of a block whose constructor is `symbol`.
    fn block_type(&self, definition: &Definition, symbol: &Symbol) -> Result<String, CodeGenError>;

    /// Header constant stored in every block of `symbol`.
    fn header_value(&self, definition: &Definition, symbol: &Symbol) -> Result<u64, CodeGenError>;

    /// `value` as a constant of `header_type`.
    fn header_constant(&self, value: u64) -> String {
        format!("{{ i64 {} }}", value)
    }

    /// Arbitrary-precision integer type.
    fn integer_type(&self) -> &str {
        INTEGER_TYPE
    }

    /// Length-prefixed byte buffer type used for opaque tokens.
    fn token_type(&self) -> &str {
        TOKEN_TYPE
    }

    /// Emit an allocation of `ty`, plus `extra_bytes` trailing bytes when
    /// given. Returns the pointer.
    fn emit_allocate(
        &self,
        func: &mut FunctionBuilder,
        block: BlockId,
        ty: &str,
        extra_bytes: Option<&str>,
    ) -> Result<String, CodeGenError> {
        match extra_bytes {
            None => func.assign(block, format!("call ptr @koreAlloc(i64 {})", size_of(ty))),
            Some(extra) => {
                let size = func.assign(block, format!("add i64 {}, {}", extra, size_of(ty)))?;
                func.assign(block, format!("call ptr @koreAllocToken(i64 {})", size))
            }
        }
    }

    /// Emit a load of the tag out of the header of `node`.
    fn emit_load_tag(
        &self,
        func: &mut FunctionBuilder,
        block: BlockId,
        node: &str,
    ) -> Result<String, CodeGenError> {
        let header_ptr = func.assign(
            block,
            format!("getelementptr inbounds %block, ptr {}, i64 0, i32 0, i32 0", node),
        )?;
        let header = func.assign(block, format!("load i64, ptr {}", header_ptr))?;
        func.assign(block, format!("trunc i64 {} to i32", header))
    }

    /// Emit the address of child `index` of a block of type `block_type`.
    fn emit_child_address(
        &self,
        func: &mut FunctionBuilder,
        block: BlockId,
        block_type: &str,
        node: &str,
        index: usize,
    ) -> Result<String, CodeGenError> {
        func.assign(
            block,
            format!(
                "getelementptr inbounds {}, ptr {}, i64 0, i32 {}",
                block_type,
                node,
                index + FIRST_CHILD_INDEX
            ),
        )
    }

    /// Emit the store of a token's byte length into its header. Returns the
    /// address of the first content byte.
    fn emit_token_header(
        &self,
        func: &mut FunctionBuilder,
        block: BlockId,
        token: &str,
        len: &str,
    ) -> Result<String, CodeGenError> {
        let ty = self.token_type().to_string();
        let header_ptr = func.assign(
            block,
            format!("getelementptr inbounds {}, ptr {}, i64 0, i32 0, i32 0", ty, token),
        )?;
        func.push(block, format!("store i64 {}, ptr {}", len, header_ptr))?;
        func.assign(
            block,
            format!("getelementptr inbounds {}, ptr {}, i64 0, i32 1, i64 0", ty, token),
        )
    }
}

/// Layout shared with the runtime library.
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardLayout;

impl StandardLayout {
    /// Size in 8-byte words of a child of `category`.
    fn words(category: SortCategory) -> Result<u64, CodeGenError> {
        match category {
            SortCategory::Map | SortCategory::Set => Ok(3),
            SortCategory::List => Ok(7),
            SortCategory::Bool
            | SortCategory::MInt
            | SortCategory::Int
            | SortCategory::Float
            | SortCategory::StringBuffer
            | SortCategory::Symbol => Ok(1),
            SortCategory::Uncomputed => Err(CodeGenError::unexpected_category(
                category,
                "block layout",
            )),
        }
    }
}

impl LayoutOracle for StandardLayout {
    fn type_definitions(&self) -> String {
        [
            "%blockheader = type { i64 }",
            "%block = type { %blockheader, [0 x ptr] }",
            "%mpz = type { i32, i32, ptr }",
            "%string = type { %blockheader, [0 x i8] }",
            "%map = type { i64, ptr, ptr }",
            "%list = type { i64, i64, ptr, ptr, ptr, ptr, ptr }",
            "%set = type { i64, ptr, ptr }",
        ]
        .iter()
        .map(|line| format!("{}\n", line))
        .collect()
    }

    fn value_type(&self, category: SortCategory) -> Result<&'static str, CodeGenError> {
        match category {
            SortCategory::Map => Ok("%map"),
            SortCategory::List => Ok("%list"),
            SortCategory::Set => Ok("%set"),
            SortCategory::Bool => Ok("i1"),
            SortCategory::MInt => Ok("i64"),
            SortCategory::Int
            | SortCategory::Float
            | SortCategory::StringBuffer
            | SortCategory::Symbol => Ok("ptr"),
            SortCategory::Uncomputed => Err(CodeGenError::unexpected_category(
                category,
                "a value type",
            )),
        }
    }

    fn block_type(&self, definition: &Definition, symbol: &Symbol) -> Result<String, CodeGenError> {
        let mut fields = vec![HEADER_TYPE.to_string(), "[0 x ptr]".to_string()];
        for sort in &symbol.arguments {
            let category = definition.category(sort);
            if category == SortCategory::Uncomputed {
                return Err(CodeGenError::uncomputed(sort));
            }
            fields.push(self.value_type(category)?.to_string());
        }
        Ok(format!("{{ {} }}", fields.join(", ")))
    }

    fn header_value(&self, definition: &Definition, symbol: &Symbol) -> Result<u64, CodeGenError> {
        let mut words = 1;
        for sort in &symbol.arguments {
            let category = definition.category(sort);
            if category == SortCategory::Uncomputed {
                return Err(CodeGenError::uncomputed(sort));
            }
            words += Self::words(category)?;
        }
        Ok(u64::from(symbol.tag) | (words << 32))
    }
}
