//! Function Bodies
//!
//! A generated routine is assembled block by block. Blocks are addressed by
//! `BlockId` so an emitter can keep appending to a block it created earlier
//! (the shared `stuck` and `exit` blocks) while other blocks are filled in.
//! Rendering happens once, in block order; `move_to_end` and `discard`
//! adjust that order.
//!
//! Labels share the local namespace with parameters and `%tN` temporaries,
//! so a label that would collide with either is suffixed like a duplicate.

use super::CodeGenError;
use super::module::llvm_identifier;
use std::collections::HashSet;
use std::fmt::Write as _;

/// Handle to a basic block of the function being built.
///
/// This is also the "insertion point" handed to and returned by term
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct BlockId(usize);

struct BasicBlock {
    label: String,
    instructions: Vec<String>,
    terminated: bool,
}

pub struct FunctionBuilder {
    name: String,
    return_type: String,
    params: Vec<(String, String)>,
    blocks: Vec<BasicBlock>,
    /// Render order, as indices into `blocks`
    order: Vec<usize>,
    labels: HashSet<String>,
    temp_counter: usize,
}

impl FunctionBuilder {
    /// Start a function. `params` are `(type, name)` pairs.
    pub fn new(name: &str, return_type: &str, params: &[(&str, &str)]) -> Self {
        FunctionBuilder {
            name: name.to_string(),
            return_type: return_type.to_string(),
            params: params
                .iter()
                .map(|(ty, name)| (ty.to_string(), name.to_string()))
                .collect(),
            blocks: Vec::new(),
            order: Vec::new(),
            labels: params.iter().map(|(_, name)| name.to_string()).collect(),
            temp_counter: 0,
        }
    }

    /// Reference to the parameter at `index` (e.g. `%tag`).
    pub fn param(&self, index: usize) -> Result<String, CodeGenError> {
        let (_, name) = self.params.get(index).ok_or_else(|| {
            CodeGenError::Logic(format!(
                "CodeGen: function '{}' has no parameter {}",
                self.name, index
            ))
        })?;
        Ok(format!("%{}", name))
    }

    /// Append a new block. Labels are made unique by suffixing a counter.
    pub fn append_block(&mut self, label: &str) -> BlockId {
        let mut unique = label.to_string();
        let mut n = 1;
        while self.labels.contains(&unique) || is_temp_name(&unique) {
            unique = format!("{}.{}", label, n);
            n += 1;
        }
        self.labels.insert(unique.clone());
        self.blocks.push(BasicBlock {
            label: unique,
            instructions: Vec::new(),
            terminated: false,
        });
        self.order.push(self.blocks.len() - 1);
        BlockId(self.blocks.len() - 1)
    }

    /// Render `block` after every other block.
    pub fn move_to_end(&mut self, block: BlockId) {
        self.order.retain(|&index| index != block.0);
        self.order.push(block.0);
    }

    /// Drop a block that turned out to have no predecessors and no code.
    pub fn discard(&mut self, block: BlockId) -> Result<(), CodeGenError> {
        if !self.block(block)?.instructions.is_empty() {
            return Err(CodeGenError::Logic(format!(
                "CodeGen: cannot discard non-empty block in '{}'",
                self.name
            )));
        }
        self.order.retain(|&index| index != block.0);
        Ok(())
    }

    /// Operand form of a block label (`%tag0`, `%"is_SortInt{}"`).
    pub fn label(&self, block: BlockId) -> Result<String, CodeGenError> {
        Ok(format!("%{}", llvm_identifier(&self.block(block)?.label)?))
    }

    /// Generate a fresh SSA name
    pub fn fresh_temp(&mut self) -> String {
        let name = format!("%t{}", self.temp_counter);
        self.temp_counter += 1;
        name
    }

    /// Append a non-terminator instruction.
    pub fn push(&mut self, block: BlockId, instruction: impl Into<String>) -> Result<(), CodeGenError> {
        let name = self.name.clone();
        let b = self.block_mut(block)?;
        if b.terminated {
            return Err(CodeGenError::Logic(format!(
                "CodeGen: instruction after terminator in block '{}' of '{}'",
                b.label, name
            )));
        }
        b.instructions.push(instruction.into());
        Ok(())
    }

    /// Append `%tN = <rhs>` and return `%tN`.
    pub fn assign(&mut self, block: BlockId, rhs: impl AsRef<str>) -> Result<String, CodeGenError> {
        let temp = self.fresh_temp();
        self.push(block, format!("{} = {}", temp, rhs.as_ref()))?;
        Ok(temp)
    }

    /// Append a terminator and close the block.
    pub fn terminate(
        &mut self,
        block: BlockId,
        instruction: impl Into<String>,
    ) -> Result<(), CodeGenError> {
        self.push(block, instruction)?;
        self.block_mut(block)?.terminated = true;
        Ok(())
    }

    pub fn branch(&mut self, block: BlockId, target: BlockId) -> Result<(), CodeGenError> {
        let target = self.label(target)?;
        self.terminate(block, format!("br label {}", target))
    }

    pub fn cond_branch(
        &mut self,
        block: BlockId,
        condition: &str,
        if_true: BlockId,
        if_false: BlockId,
    ) -> Result<(), CodeGenError> {
        let if_true = self.label(if_true)?;
        let if_false = self.label(if_false)?;
        self.terminate(
            block,
            format!("br i1 {}, label {}, label {}", condition, if_true, if_false),
        )
    }

    /// Close `block` with the fatal trap: no return, no recovery.
    pub fn trap(&mut self, block: BlockId) -> Result<(), CodeGenError> {
        self.push(block, "call void @abort()")?;
        self.terminate(block, "unreachable")
    }

    /// Append a phi over `incoming` `(value, predecessor)` pairs and return it.
    pub fn phi(
        &mut self,
        block: BlockId,
        ty: &str,
        incoming: &[(String, BlockId)],
    ) -> Result<String, CodeGenError> {
        let mut arms = Vec::with_capacity(incoming.len());
        for (value, pred) in incoming {
            arms.push(format!("[ {}, {} ]", value, self.label(*pred)?));
        }
        self.assign(block, format!("phi {} {}", ty, arms.join(", ")))
    }

    /// Render the function. Every block must have been terminated.
    pub fn finish(self) -> Result<String, CodeGenError> {
        let params: Vec<String> = self
            .params
            .iter()
            .map(|(ty, name)| format!("{} %{}", ty, name))
            .collect();

        let mut out = String::new();
        writeln!(
            &mut out,
            "define {} @{}({}) {{",
            self.return_type,
            llvm_identifier(&self.name)?,
            params.join(", ")
        )?;
        for block in self.order.iter().map(|&index| &self.blocks[index]) {
            if !block.terminated {
                return Err(CodeGenError::Logic(format!(
                    "CodeGen: block '{}' of '{}' has no terminator",
                    block.label, self.name
                )));
            }
            writeln!(&mut out, "{}:", llvm_identifier(&block.label)?)?;
            for instruction in &block.instructions {
                writeln!(&mut out, "  {}", instruction)?;
            }
        }
        writeln!(&mut out, "}}")?;
        Ok(out)
    }

    fn block(&self, block: BlockId) -> Result<&BasicBlock, CodeGenError> {
        self.blocks.get(block.0).ok_or_else(|| {
            CodeGenError::Logic(format!("CodeGen: unknown block in '{}'", self.name))
        })
    }

    fn block_mut(&mut self, block: BlockId) -> Result<&mut BasicBlock, CodeGenError> {
        let name = &self.name;
        self.blocks
            .get_mut(block.0)
            .ok_or_else(|| CodeGenError::Logic(format!("CodeGen: unknown block in '{}'", name)))
    }
}

/// Whether `name` has the shape of a `fresh_temp` result (without the `%`).
fn is_temp_name(name: &str) -> bool {
    name.strip_prefix('t')
        .is_some_and(|digits| !digits.is_empty() && digits.bytes().all(|b| b.is_ascii_digit()))
}
