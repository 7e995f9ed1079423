use std::collections::HashMap;

use crate::ir::block::{BlockId, IrBlock};
use crate::ir::function::{ExternFn, FunctionId, IrFunction, Param};
use crate::ir::instr::IrInstr;
use crate::ir::types::IrType;
use crate::ir::value::{ValueDef, ValueId};

/// The top-level IR container.
///
/// Invariants:
/// - Function and extern names are unique within a module (jointly).
/// - `FunctionId(n)` always indexes `functions[n]`.
/// - Once a function is added via `add_function()`, it is immutable to
///   external callers. Passes mutate through the `pub(crate)` fields.
#[derive(Debug, Default)]
pub struct IrModule {
    pub name: String,
    pub(crate) functions: Vec<IrFunction>,
    pub(crate) function_index: HashMap<String, FunctionId>,
    /// Extern declarations: signature only, emitted as `declare` lines.
    pub(crate) extern_fns: Vec<ExternFn>,
}

impl IrModule {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            functions: Vec::new(),
            function_index: HashMap::new(),
            extern_fns: Vec::new(),
        }
    }

    pub fn function(&self, id: FunctionId) -> Option<&IrFunction> {
        self.functions.get(id.0 as usize)
    }

    pub fn function_by_name(&self, name: &str) -> Option<&IrFunction> {
        let id = self.function_index.get(name)?;
        self.functions.get(id.0 as usize)
    }

    pub fn functions(&self) -> &[IrFunction] {
        &self.functions
    }

    pub fn extern_fns(&self) -> &[ExternFn] {
        &self.extern_fns
    }

    pub fn extern_by_name(&self, name: &str) -> Option<&ExternFn> {
        self.extern_fns.iter().find(|e| e.name == name)
    }

    /// `true` if `name` is taken by either a defined or an extern function.
    pub fn declares(&self, name: &str) -> bool {
        self.function_index.contains_key(name) || self.extern_by_name(name).is_some()
    }

    /// Seals and registers a function built by `FunctionBuilder`.
    /// Returns `Err` with the name if it is already taken.
    pub fn add_function(&mut self, mut func: IrFunction) -> Result<FunctionId, String> {
        if self.declares(&func.name) {
            return Err(func.name);
        }
        let id = FunctionId(self.functions.len() as u32);
        func.id = id;
        self.function_index.insert(func.name.clone(), id);
        self.functions.push(func);
        Ok(id)
    }

    /// Registers an external declaration. Returns `Err` with the name if it
    /// is already taken.
    pub fn add_extern(&mut self, ext: ExternFn) -> Result<(), String> {
        if self.declares(&ext.name) {
            return Err(ext.name);
        }
        self.extern_fns.push(ext);
        Ok(())
    }
}

/// Builder for constructing an `IrFunction` incrementally.
///
/// Call order:
/// 1. `create_block()` — the first created block is the entry block
/// 2. `set_current_block()` — point the insertion cursor at a block
/// 3. `push_instr()` / `push_entry_alloca()` — emit instructions
/// 4. `build()` — consume the builder and return the completed function
///
/// Parameter values are allocated up front: `param_value(i)` is valid as soon
/// as the builder exists. `build()` panics in debug builds if any block lacks
/// a terminator.
pub struct FunctionBuilder {
    func: IrFunction,
    current_block: Option<BlockId>,
    /// Number of `Alloca` instructions at the head of the entry block.
    /// New slots are inserted at this index so allocas stay contiguous.
    entry_allocas: usize,
}

impl FunctionBuilder {
    pub fn new(name: impl Into<String>, params: Vec<Param>, return_ty: IrType) -> Self {
        let mut value_defs = HashMap::new();
        let mut value_types = HashMap::new();
        for (index, param) in params.iter().enumerate() {
            let id = ValueId(index as u32);
            value_defs.insert(id, ValueDef::Param { index });
            value_types.insert(id, param.ty);
        }
        let next_value = params.len() as u32;
        let func = IrFunction {
            id: FunctionId(0), // reassigned by IrModule::add_function
            name: name.into(),
            params,
            return_ty,
            blocks: Vec::new(),
            value_defs,
            value_types,
            next_value,
        };
        Self {
            func,
            current_block: None,
            entry_allocas: 0,
        }
    }

    /// Creates a new block and returns its `BlockId`.
    pub fn create_block(&mut self, name: &str) -> BlockId {
        let id = BlockId(self.func.blocks.len() as u32);
        self.func.blocks.push(IrBlock::new(id, name));
        id
    }

    /// The `ValueId` of the `index`-th incoming parameter.
    pub fn param_value(&self, index: usize) -> ValueId {
        self.func.param_value(index)
    }

    /// Returns the current insertion block.
    pub fn current_block(&self) -> BlockId {
        self.current_block
            .expect("FunctionBuilder: no current block set")
    }

    /// Sets the current insertion block.
    pub fn set_current_block(&mut self, block: BlockId) {
        self.current_block = Some(block);
    }

    /// Allocates a fresh `ValueId` for use as an instruction result.
    pub fn fresh_value(&mut self) -> ValueId {
        self.func.fresh_value()
    }

    /// Returns the recorded type of a value, if any.
    pub fn value_type(&self, v: ValueId) -> Option<IrType> {
        self.func.value_type(v)
    }

    /// Appends an instruction to the current block and registers its result.
    ///
    /// Panics in debug builds if the current block is already sealed.
    pub fn push_instr(&mut self, instr: IrInstr) -> Option<ValueId> {
        let block_id = self
            .current_block
            .expect("FunctionBuilder: no current block set before push_instr");
        debug_assert!(
            !self.func.blocks[block_id.0 as usize].is_sealed(),
            "push_instr called on already-sealed block {}",
            block_id
        );
        self.register(block_id, &instr);
        let result = instr.result();
        self.func.blocks[block_id.0 as usize].instrs.push(instr);
        result
    }

    /// Reserves a stack slot at the head of the entry block, regardless of
    /// where the cursor currently points. Returns the slot's `ValueId`.
    pub fn push_entry_alloca(&mut self, ty: IrType, name: impl Into<String>) -> ValueId {
        assert!(
            !self.func.blocks.is_empty(),
            "push_entry_alloca requires an entry block"
        );
        let result = self.func.fresh_value();
        let instr = IrInstr::Alloca {
            result,
            ty,
            name: name.into(),
        };
        let entry = BlockId(0);
        self.register(entry, &instr);
        self.func.blocks[0].instrs.insert(self.entry_allocas, instr);
        self.entry_allocas += 1;
        result
    }

    fn register(&mut self, block: BlockId, instr: &IrInstr) {
        if let (Some(result), Some(ty)) = (instr.result(), instr.result_type()) {
            self.func.value_defs.insert(result, ValueDef::Instr { block });
            self.func.value_types.insert(result, ty);
        }
    }

    /// Returns true if the current block already ends with a terminator.
    pub fn is_current_block_terminated(&self) -> bool {
        match self.current_block {
            Some(block_id) => self.func.blocks[block_id.0 as usize].is_sealed(),
            None => false,
        }
    }

    /// Consumes the builder and returns the completed `IrFunction`.
    ///
    /// Panics in debug builds if any block is not sealed. The verifier
    /// re-checks this for release builds.
    pub fn build(self) -> IrFunction {
        #[cfg(debug_assertions)]
        for block in &self.func.blocks {
            assert!(
                block.is_sealed(),
                "build() called with unsealed block {} ('{}')",
                block.id,
                block.name
            );
        }
        self.func
    }
}
