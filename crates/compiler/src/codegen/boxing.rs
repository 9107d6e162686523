//! Generic Slot Boxing
//!
//! Values cross the generic interface as one machine word. Categories whose
//! native value is already a single pointer pass through unchanged; wider
//! ones travel as a heap copy. `unbox` consumes the copy (load, then free)
//! and `box_value` creates one (malloc, then store), so the two directions
//! stay symmetric.

use super::function::{BlockId, FunctionBuilder};
use super::layout::{LayoutOracle, size_of};
use super::CodeGenError;
use crate::definition::{Sort, SortCategory};

/// How a category is passed through a generic slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Boxing {
    /// The slot holds the address of a heap copy of the value.
    Boxed,
    /// The slot is the value itself, reinterpreted.
    ByReference,
}

impl Boxing {
    pub fn of(category: SortCategory, sort: &Sort) -> Result<Self, CodeGenError> {
        match category {
            SortCategory::Map
            | SortCategory::List
            | SortCategory::Set
            | SortCategory::Bool
            | SortCategory::MInt => Ok(Boxing::Boxed),
            SortCategory::Int
            | SortCategory::Float
            | SortCategory::StringBuffer
            | SortCategory::Symbol => Ok(Boxing::ByReference),
            SortCategory::Uncomputed => Err(CodeGenError::uncomputed(sort)),
        }
    }
}

/// Load generic slot `index` out of the `[0 x ptr]` array `args`.
pub fn load_argument(
    func: &mut FunctionBuilder,
    block: BlockId,
    args: &str,
    index: usize,
) -> Result<String, CodeGenError> {
    let addr = func.assign(
        block,
        format!("getelementptr [0 x ptr], ptr {}, i64 0, i64 {}", args, index),
    )?;
    func.assign(block, format!("load ptr, ptr {}", addr))
}

/// Turn a generic slot into a native value of `sort`, releasing the box.
pub fn unbox(
    func: &mut FunctionBuilder,
    block: BlockId,
    layout: &dyn LayoutOracle,
    category: SortCategory,
    sort: &Sort,
    slot: &str,
) -> Result<String, CodeGenError> {
    match Boxing::of(category, sort)? {
        Boxing::Boxed => {
            let ty = layout.value_type(category)?;
            let value = func.assign(block, format!("load {}, ptr {}", ty, slot))?;
            func.push(block, format!("call void @free(ptr {})", slot))?;
            Ok(value)
        }
        Boxing::ByReference => Ok(slot.to_string()),
    }
}

/// Turn a native value of `sort` into a generic slot.
pub fn box_value(
    func: &mut FunctionBuilder,
    block: BlockId,
    layout: &dyn LayoutOracle,
    category: SortCategory,
    sort: &Sort,
    value: &str,
) -> Result<String, CodeGenError> {
    match Boxing::of(category, sort)? {
        Boxing::Boxed => {
            let ty = layout.value_type(category)?;
            let boxed = func.assign(block, format!("call ptr @malloc(i64 {})", size_of(ty)))?;
            func.push(block, format!("store {} {}, ptr {}", ty, value, boxed))?;
            Ok(boxed)
        }
        Boxing::ByReference => Ok(value.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codegen::layout::StandardLayout;

    fn sort() -> Sort {
        Sort::new("S")
    }

    #[test]
    fn test_boxing_table() {
        for category in [
            SortCategory::Map,
            SortCategory::List,
            SortCategory::Set,
            SortCategory::Bool,
            SortCategory::MInt,
        ] {
            assert_eq!(Boxing::of(category, &sort()).unwrap(), Boxing::Boxed);
        }
        for category in [
            SortCategory::Int,
            SortCategory::Float,
            SortCategory::StringBuffer,
            SortCategory::Symbol,
        ] {
            assert_eq!(Boxing::of(category, &sort()).unwrap(), Boxing::ByReference);
        }
        assert!(Boxing::of(SortCategory::Uncomputed, &sort()).is_err());
    }

    #[test]
    fn test_unbox_boxed_loads_then_frees() {
        let mut f = FunctionBuilder::new("f", "void", &[("ptr", "slot")]);
        let entry = f.append_block("entry");
        let v = unbox(&mut f, entry, &StandardLayout, SortCategory::Map, &sort(), "%slot").unwrap();
        assert_eq!(v, "%t0");
        f.terminate(entry, "ret void").unwrap();
        let ir = f.finish().unwrap();
        let load = ir.find("%t0 = load %map, ptr %slot").unwrap();
        let free = ir.find("call void @free(ptr %slot)").unwrap();
        assert!(load < free);
    }

    #[test]
    fn test_unbox_reference_emits_nothing() {
        let mut f = FunctionBuilder::new("f", "void", &[("ptr", "slot")]);
        let entry = f.append_block("entry");
        let v = unbox(&mut f, entry, &StandardLayout, SortCategory::Int, &sort(), "%slot").unwrap();
        assert_eq!(v, "%slot");
        f.terminate(entry, "ret void").unwrap();
        let ir = f.finish().unwrap();
        assert!(!ir.contains("load"));
        assert!(!ir.contains("@free"));
    }

    #[test]
    fn test_box_boxed_mallocs_and_stores() {
        let mut f = FunctionBuilder::new("f", "ptr", &[("i1", "b")]);
        let entry = f.append_block("entry");
        let p = box_value(&mut f, entry, &StandardLayout, SortCategory::Bool, &sort(), "%b").unwrap();
        f.terminate(entry, format!("ret ptr {}", p)).unwrap();
        let ir = f.finish().unwrap();
        assert!(ir.contains("%t0 = call ptr @malloc(i64 ptrtoint (ptr getelementptr (i1, ptr null, i32 1) to i64))"));
        assert!(ir.contains("store i1 %b, ptr %t0"));
        assert!(ir.contains("ret ptr %t0"));
    }

    #[test]
    fn test_load_argument() {
        let mut f = FunctionBuilder::new("f", "ptr", &[("ptr", "args")]);
        let entry = f.append_block("entry");
        let slot = load_argument(&mut f, entry, "%args", 3).unwrap();
        f.terminate(entry, format!("ret ptr {}", slot)).unwrap();
        let ir = f.finish().unwrap();
        assert!(ir.contains("%t0 = getelementptr [0 x ptr], ptr %args, i64 0, i64 3"));
        assert!(ir.contains("%t1 = load ptr, ptr %t0"));
    }
}
