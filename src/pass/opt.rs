//! IR cleanup passes.
//!
//! - `SimplifyCfgPass` — removes unreachable blocks (no predecessors, not the
//!   entry). The lowerer leaves an empty `ifcont` behind when both arms of an
//!   `if` return; this pass erases it.
//! - `DcePass` — dead code elimination: backward liveness from side-effecting
//!   instructions; pure instructions with no live uses are dropped.

use std::collections::{HashMap, HashSet, VecDeque};

use crate::error::PassError;
use crate::ir::block::BlockId;
use crate::ir::function::IrFunction;
use crate::ir::instr::IrInstr;
use crate::ir::module::IrModule;
use crate::ir::value::ValueId;
use crate::pass::Pass;

// ===========================================================================
// SimplifyCfgPass
// ===========================================================================

pub struct SimplifyCfgPass;

impl Pass for SimplifyCfgPass {
    fn name(&self) -> &'static str {
        "simplifycfg"
    }

    fn run(&mut self, module: &mut IrModule) -> Result<(), PassError> {
        for func in &mut module.functions {
            remove_unreachable_blocks(func);
        }
        Ok(())
    }
}

fn remove_unreachable_blocks(func: &mut IrFunction) {
    // Removing a block can strand its successors, so iterate to a fixpoint.
    loop {
        let mut preds: HashMap<BlockId, usize> = HashMap::new();
        for block in &func.blocks {
            if let Some(term) = block.terminator() {
                for succ in term.successors() {
                    *preds.entry(succ).or_insert(0) += 1;
                }
            }
        }

        let dead: HashSet<BlockId> = func
            .blocks
            .iter()
            .filter(|b| b.id.0 != 0 && preds.get(&b.id).copied().unwrap_or(0) == 0)
            .map(|b| b.id)
            .collect();
        if dead.is_empty() {
            return;
        }

        // Rebuild the block list with contiguous ids and remap branch targets.
        let mut remap: HashMap<BlockId, BlockId> = HashMap::new();
        let mut next = 0u32;
        for block in &func.blocks {
            if !dead.contains(&block.id) {
                remap.insert(block.id, BlockId(next));
                next += 1;
            }
        }

        let old_blocks = std::mem::take(&mut func.blocks);
        for mut block in old_blocks {
            if dead.contains(&block.id) {
                for instr in &block.instrs {
                    if let Some(result) = instr.result() {
                        func.value_types.remove(&result);
                        func.value_defs.remove(&result);
                    }
                }
                continue;
            }
            block.id = remap[&block.id];
            if let Some(last) = block.instrs.last_mut() {
                match last {
                    IrInstr::Br { target } => {
                        let t = remap[&*target];
                        *target = t;
                    }
                    IrInstr::CondBr {
                        then_block,
                        else_block,
                        ..
                    } => {
                        let t = remap[&*then_block];
                        *then_block = t;
                        let e = remap[&*else_block];
                        *else_block = e;
                    }
                    _ => {}
                }
            }
            func.blocks.push(block);
        }
    }
}

// ===========================================================================
// DcePass
// ===========================================================================

pub struct DcePass;

impl Pass for DcePass {
    fn name(&self) -> &'static str {
        "dce"
    }

    fn run(&mut self, module: &mut IrModule) -> Result<(), PassError> {
        for func in &mut module.functions {
            dce_function(func);
        }
        Ok(())
    }
}

fn is_side_effecting(instr: &IrInstr) -> bool {
    matches!(
        instr,
        IrInstr::Store { .. }
            | IrInstr::Call { .. }
            | IrInstr::Br { .. }
            | IrInstr::CondBr { .. }
            | IrInstr::Ret { .. }
    )
}

fn dce_function(func: &mut IrFunction) {
    // Build result → operands map for backward reachability.
    let mut result_ops: HashMap<ValueId, Vec<ValueId>> = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if let Some(r) = instr.result() {
                result_ops.insert(r, instr.operands());
            }
        }
    }

    // Seed the live set with operands of all side-effecting instructions.
    let mut live: HashSet<ValueId> = HashSet::new();
    let mut queue: VecDeque<ValueId> = VecDeque::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if is_side_effecting(instr) {
                for op in instr.operands() {
                    if live.insert(op) {
                        queue.push_back(op);
                    }
                }
            }
        }
    }

    // BFS: whatever a live value depends on is also live.
    while let Some(vid) = queue.pop_front() {
        if let Some(ops) = result_ops.get(&vid) {
            for &op in ops {
                if live.insert(op) {
                    queue.push_back(op);
                }
            }
        }
    }

    let mut removed: Vec<ValueId> = Vec::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if is_side_effecting(instr) {
                continue;
            }
            if let Some(r) = instr.result() {
                if !live.contains(&r) {
                    removed.push(r);
                }
            }
        }
    }

    for block in &mut func.blocks {
        block.instrs.retain(|instr| {
            is_side_effecting(instr) || instr.result().map_or(true, |r| live.contains(&r))
        });
    }
    for r in removed {
        func.value_types.remove(&r);
        func.value_defs.remove(&r);
    }
}
