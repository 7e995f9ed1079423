use std::collections::HashMap;

use crate::ir::block::{BlockId, IrBlock};
use crate::ir::types::IrType;
use crate::ir::value::{ValueDef, ValueId};

/// Uniquely identifies a function within an `IrModule`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FunctionId(pub u32);

/// A named, typed parameter of a function.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub name: String,
    pub ty: IrType,
}

/// An external function declaration — signature only, no body.
#[derive(Debug, Clone, PartialEq)]
pub struct ExternFn {
    pub name: String,
    pub param_tys: Vec<IrType>,
    pub ret_ty: IrType,
}

/// A function with a body.
///
/// Blocks are stored in a flat `Vec`; `BlockId(n)` indexes `blocks[n]` and
/// the entry block is always `blocks[0]`. The first `params.len()` value ids
/// are the incoming parameters, allocated by the builder at construction.
///
/// Post-construction the function is immutable to callers outside this crate;
/// passes mutate through the `pub(crate)` fields.
#[derive(Debug, Clone)]
pub struct IrFunction {
    pub id: FunctionId,
    pub name: String,
    pub params: Vec<Param>,
    pub return_ty: IrType,
    pub(crate) blocks: Vec<IrBlock>,
    /// Maps `ValueId` → its definition site.
    pub(crate) value_defs: HashMap<ValueId, ValueDef>,
    /// Maps `ValueId` → its type.
    pub(crate) value_types: HashMap<ValueId, IrType>,
    /// Counter for allocating fresh `ValueId`s.
    pub(crate) next_value: u32,
}

impl IrFunction {
    /// Returns the entry block (always `BlockId(0)`).
    pub fn entry_block(&self) -> &IrBlock {
        &self.blocks[0]
    }

    pub fn block(&self, id: BlockId) -> Option<&IrBlock> {
        self.blocks.get(id.0 as usize)
    }

    pub fn blocks(&self) -> &[IrBlock] {
        &self.blocks
    }

    /// The `ValueId` of the `index`-th parameter.
    pub fn param_value(&self, index: usize) -> ValueId {
        debug_assert!(index < self.params.len());
        ValueId(index as u32)
    }

    /// Returns the type of a value, if known.
    pub fn value_type(&self, v: ValueId) -> Option<IrType> {
        self.value_types.get(&v).copied()
    }

    /// Returns the definition site of a value.
    pub fn value_def(&self, v: ValueId) -> Option<ValueDef> {
        self.value_defs.get(&v).copied()
    }

    /// Allocates a fresh `ValueId`. Used by the builder only.
    pub(crate) fn fresh_value(&mut self) -> ValueId {
        let id = ValueId(self.next_value);
        self.next_value += 1;
        id
    }
}
