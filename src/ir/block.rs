use crate::ir::instr::IrInstr;
use crate::ir::value::ValueId;

/// An opaque index identifying a basic block within an `IrFunction`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BlockId(pub u32);

impl std::fmt::Display for BlockId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "bb{}", self.0)
    }
}

/// A basic block.
///
/// Invariants enforced by `FunctionBuilder::build()` and the verifier:
/// 1. `instrs` is non-empty — at minimum a terminator is present.
/// 2. Exactly one terminator exists and it is the last element.
/// 3. Each result `ValueId` is unique within the function.
#[derive(Debug, Clone, PartialEq)]
pub struct IrBlock {
    pub id: BlockId,
    /// Display name used for the emitted label (`entry`, `then`, `while.cond`, …).
    pub name: String,
    /// Instructions in program order. Terminator is last.
    pub instrs: Vec<IrInstr>,
}

impl IrBlock {
    pub fn new(id: BlockId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            instrs: Vec::new(),
        }
    }

    /// The label this block prints as. The entry block keeps its bare name;
    /// later blocks append the id so repeated names stay unique.
    pub fn label(&self) -> String {
        if self.id.0 == 0 {
            self.name.clone()
        } else {
            format!("{}{}", self.name, self.id.0)
        }
    }

    /// Returns the terminator instruction if the block is sealed.
    pub fn terminator(&self) -> Option<&IrInstr> {
        self.instrs.last().filter(|i| i.is_terminator())
    }

    /// A block is sealed when it ends with a terminator.
    pub fn is_sealed(&self) -> bool {
        self.terminator().is_some()
    }

    /// Iterates over all `ValueId`s used as operands across all instructions.
    pub fn all_operands(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.instrs.iter().flat_map(|i| i.operands())
    }

    /// Iterates over all `ValueId`s defined in this block.
    pub fn all_defs(&self) -> impl Iterator<Item = ValueId> + '_ {
        self.instrs.iter().filter_map(|i| i.result())
    }
}
