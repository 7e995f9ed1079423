//! Stack-slot promotion.
//!
//! The lowerer keeps every local in an entry-block slot so this pass can
//! rewrite loads into direct value uses. Two shapes are promoted:
//!
//! 1. *Dominating single store*: the slot is stored exactly once, in the
//!    entry block, before any entry-block load. Parameters and locals that
//!    are never reassigned fall in this class.
//! 2. *Single block*: every load and store of the slot sits in one block.
//!    Loads forward the most recent store within that block.
//!
//! Slots whose address escapes (used by anything other than a direct
//! load/store) or that are reassigned across blocks stay in memory — the
//! resulting IR is still valid, just less tidy.

use std::collections::{HashMap, HashSet};

use crate::error::PassError;
use crate::ir::block::BlockId;
use crate::ir::function::IrFunction;
use crate::ir::instr::IrInstr;
use crate::ir::module::IrModule;
use crate::ir::value::ValueId;
use crate::pass::Pass;

pub struct Mem2RegPass;

impl Pass for Mem2RegPass {
    fn name(&self) -> &'static str {
        "mem2reg"
    }

    fn run(&mut self, module: &mut IrModule) -> Result<(), PassError> {
        for func in &mut module.functions {
            promote_function(func);
        }
        Ok(())
    }
}

#[derive(Debug, Default)]
struct SlotUses {
    /// (block, instr index) of each store to the slot.
    stores: Vec<(BlockId, usize)>,
    /// (block, instr index, result) of each load from the slot.
    loads: Vec<(BlockId, usize, ValueId)>,
    /// The slot pointer is used by something other than a direct load/store.
    escapes: bool,
}

fn promote_function(func: &mut IrFunction) {
    // Gather per-slot use information.
    let mut slots: HashMap<ValueId, SlotUses> = HashMap::new();
    for block in &func.blocks {
        for instr in &block.instrs {
            if let IrInstr::Alloca { result, .. } = instr {
                slots.entry(*result).or_default();
            }
        }
    }
    for block in &func.blocks {
        for (i, instr) in block.instrs.iter().enumerate() {
            match instr {
                IrInstr::Alloca { .. } => {}
                IrInstr::Load { result, slot, .. } => {
                    if let Some(uses) = slots.get_mut(slot) {
                        uses.loads.push((block.id, i, *result));
                    }
                }
                IrInstr::Store { slot, value, .. } => {
                    if let Some(uses) = slots.get_mut(slot) {
                        uses.stores.push((block.id, i));
                    }
                    // Storing the slot pointer itself pins the slot.
                    if let Some(uses) = slots.get_mut(value) {
                        uses.escapes = true;
                    }
                }
                other => {
                    for operand in other.operands() {
                        if let Some(uses) = slots.get_mut(&operand) {
                            uses.escapes = true;
                        }
                    }
                }
            }
        }
    }

    // Decide replacements: load result → forwarded value.
    let mut replace: HashMap<ValueId, ValueId> = HashMap::new();
    // Instructions to delete, as (block, index) pairs.
    let mut dead: HashSet<(BlockId, usize)> = HashSet::new();
    // Promoted slots whose alloca can go away.
    let mut promoted: HashSet<ValueId> = HashSet::new();

    for (&slot, uses) in &slots {
        if uses.escapes {
            continue;
        }
        if let Some(plan) = plan_single_store(func, uses) {
            apply_plan(slot, uses, plan, &mut replace, &mut dead, &mut promoted);
        } else if let Some(plan) = plan_single_block(func, uses) {
            apply_plan(slot, uses, plan, &mut replace, &mut dead, &mut promoted);
        }
    }

    if promoted.is_empty() {
        return;
    }

    // Resolve replacement chains (a forwarded value may itself be a promoted
    // load's result).
    let resolve = |mut v: ValueId| {
        let mut hops = 0;
        while let Some(&next) = replace.get(&v) {
            v = next;
            hops += 1;
            if hops > replace.len() {
                break;
            }
        }
        v
    };

    for block in &mut func.blocks {
        let id = block.id;
        let mut kept = Vec::with_capacity(block.instrs.len());
        for (i, mut instr) in block.instrs.drain(..).enumerate() {
            if dead.contains(&(id, i)) {
                if let Some(result) = instr.result() {
                    func.value_types.remove(&result);
                    func.value_defs.remove(&result);
                }
                continue;
            }
            if let IrInstr::Alloca { result, .. } = &instr {
                if promoted.contains(result) {
                    func.value_types.remove(result);
                    func.value_defs.remove(result);
                    continue;
                }
            }
            let operands = instr.operands();
            for operand in operands {
                let target = resolve(operand);
                if target != operand {
                    instr.replace_uses(operand, target);
                }
            }
            kept.push(instr);
        }
        block.instrs = kept;
    }
}

/// The forwarded value for each load of one slot.
type Plan = Vec<(ValueId, ValueId)>;

/// Case 1: a unique store in the entry block that precedes every entry load.
fn plan_single_store(func: &IrFunction, uses: &SlotUses) -> Option<Plan> {
    if uses.stores.len() != 1 {
        return None;
    }
    let (store_block, store_idx) = uses.stores[0];
    if store_block.0 != 0 {
        return None;
    }
    for &(load_block, load_idx, _) in &uses.loads {
        if load_block.0 == 0 && load_idx < store_idx {
            return None;
        }
    }
    let stored = stored_value(func, store_block, store_idx)?;
    Some(
        uses.loads
            .iter()
            .map(|&(_, _, result)| (result, stored))
            .collect(),
    )
}

/// Case 2: every access in one block; forward store-to-load within it.
fn plan_single_block(func: &IrFunction, uses: &SlotUses) -> Option<Plan> {
    let mut blocks = uses
        .stores
        .iter()
        .map(|&(b, _)| b)
        .chain(uses.loads.iter().map(|&(b, _, _)| b));
    let first = blocks.next()?;
    if blocks.any(|b| b != first) {
        return None;
    }

    let mut accesses: Vec<(usize, Option<ValueId>)> = Vec::new();
    for &(_, idx) in &uses.stores {
        accesses.push((idx, None));
    }
    for &(_, idx, result) in &uses.loads {
        accesses.push((idx, Some(result)));
    }
    accesses.sort_by_key(|&(idx, _)| idx);

    let mut plan = Vec::new();
    let mut current: Option<ValueId> = None;
    for (idx, load_result) in accesses {
        match load_result {
            None => current = stored_value(func, first, idx),
            Some(result) => match current {
                Some(v) => plan.push((result, v)),
                // A load before any store reads indeterminate memory; leave
                // the slot alone.
                None => return None,
            },
        }
    }
    Some(plan)
}

fn stored_value(func: &IrFunction, block: BlockId, idx: usize) -> Option<ValueId> {
    match func.blocks[block.0 as usize].instrs.get(idx) {
        Some(IrInstr::Store { value, .. }) => Some(*value),
        _ => None,
    }
}

fn apply_plan(
    slot: ValueId,
    uses: &SlotUses,
    plan: Plan,
    replace: &mut HashMap<ValueId, ValueId>,
    dead: &mut HashSet<(BlockId, usize)>,
    promoted: &mut HashSet<ValueId>,
) {
    for (load_result, forwarded) in plan {
        replace.insert(load_result, forwarded);
    }
    for &(block, idx) in &uses.stores {
        dead.insert((block, idx));
    }
    for &(block, idx, _) in &uses.loads {
        dead.insert((block, idx));
    }
    promoted.insert(slot);
}
