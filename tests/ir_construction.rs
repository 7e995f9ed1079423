//! Tests that construct IR through the builder API directly, without parsing.
//! These pin down builder invariants and verifier rejections.

use minicc::error::PassError;
use minicc::ir::function::Param;
use minicc::ir::instr::{BinOp, IrInstr};
use minicc::ir::module::{FunctionBuilder, IrModule};
use minicc::ir::types::IrType;
use minicc::pass::validate::verify_function;

fn int_params(names: &[&str]) -> Vec<Param> {
    names
        .iter()
        .map(|n| Param {
            name: (*n).to_owned(),
            ty: IrType::I32,
        })
        .collect()
}

#[test]
fn test_build_scalar_add() {
    let mut module = IrModule::new("test_scalar");

    let mut builder = FunctionBuilder::new("add", int_params(&["x", "y"]), IrType::I32);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);

    let x = builder.param_value(0);
    let y = builder.param_value(1);
    let result = builder.fresh_value();
    builder.push_instr(IrInstr::Bin {
        result,
        op: BinOp::Add,
        lhs: x,
        rhs: y,
        ty: IrType::I32,
    });
    builder.push_instr(IrInstr::Ret {
        value: Some(result),
        ty: IrType::I32,
    });

    let func = builder.build();
    assert_eq!(func.blocks().len(), 1);
    assert_eq!(func.entry_block().instrs.len(), 2); // Bin + Ret
    assert_eq!(func.value_type(result), Some(IrType::I32));
    verify_function(&func).expect("function should verify");

    module.add_function(func).expect("should add function");
    assert!(module.function_by_name("add").is_some());
}

#[test]
fn test_entry_allocas_stay_at_block_head() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::Void);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);

    // Interleave: alloca, store, then another alloca. The second alloca must
    // land before the store.
    let slot_a = builder.push_entry_alloca(IrType::I32, "a");
    let zero = builder.fresh_value();
    builder.push_instr(IrInstr::ConstInt {
        result: zero,
        value: 0,
        ty: IrType::I32,
    });
    builder.push_instr(IrInstr::Store {
        slot: slot_a,
        value: zero,
        ty: IrType::I32,
    });
    let _slot_b = builder.push_entry_alloca(IrType::F64, "b");
    builder.push_instr(IrInstr::Ret {
        value: None,
        ty: IrType::Void,
    });

    let func = builder.build();
    let instrs = &func.entry_block().instrs;
    assert!(matches!(instrs[0], IrInstr::Alloca { .. }));
    assert!(matches!(instrs[1], IrInstr::Alloca { .. }));
    assert!(!matches!(instrs[2], IrInstr::Alloca { .. }));
    verify_function(&func).expect("function should verify");
}

#[test]
fn test_entry_alloca_reachable_from_later_blocks() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::I32);
    let entry = builder.create_block("entry");
    let next = builder.create_block("next");
    builder.set_current_block(entry);
    let slot = builder.push_entry_alloca(IrType::I32, "x");
    let one = builder.fresh_value();
    builder.push_instr(IrInstr::ConstInt {
        result: one,
        value: 1,
        ty: IrType::I32,
    });
    builder.push_instr(IrInstr::Store {
        slot,
        value: one,
        ty: IrType::I32,
    });
    builder.push_instr(IrInstr::Br { target: next });

    builder.set_current_block(next);
    let loaded = builder.fresh_value();
    builder.push_instr(IrInstr::Load {
        result: loaded,
        slot,
        ty: IrType::I32,
    });
    builder.push_instr(IrInstr::Ret {
        value: Some(loaded),
        ty: IrType::I32,
    });

    let func = builder.build();
    assert_eq!(func.blocks().len(), 2);
    verify_function(&func).expect("cross-block slot use should verify");
}

#[test]
fn test_is_current_block_terminated() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::Void);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);
    assert!(!builder.is_current_block_terminated());
    builder.push_instr(IrInstr::Ret {
        value: None,
        ty: IrType::Void,
    });
    assert!(builder.is_current_block_terminated());
}

#[test]
fn test_verifier_rejects_use_before_def() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::I32);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);
    // A fresh value with no defining instruction.
    let ghost = builder.fresh_value();
    builder.push_instr(IrInstr::Ret {
        value: Some(ghost),
        ty: IrType::I32,
    });
    let func = builder.build();
    assert!(matches!(
        verify_function(&func),
        Err(PassError::UseBeforeDef { .. })
    ));
}

#[test]
fn test_verifier_rejects_alloca_outside_entry() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::Void);
    let entry = builder.create_block("entry");
    let tail = builder.create_block("tail");
    builder.set_current_block(entry);
    builder.push_instr(IrInstr::Br { target: tail });
    builder.set_current_block(tail);
    let slot = builder.fresh_value();
    // Bypasses push_entry_alloca on purpose.
    builder.push_instr(IrInstr::Alloca {
        result: slot,
        ty: IrType::I32,
        name: "x".into(),
    });
    builder.push_instr(IrInstr::Ret {
        value: None,
        ty: IrType::Void,
    });
    let func = builder.build();
    assert!(matches!(
        verify_function(&func),
        Err(PassError::AllocaOutsideEntry { .. })
    ));
}

#[test]
fn test_verifier_rejects_store_type_mismatch() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::Void);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);
    let slot = builder.push_entry_alloca(IrType::F64, "d");
    let int_val = builder.fresh_value();
    builder.push_instr(IrInstr::ConstInt {
        result: int_val,
        value: 1,
        ty: IrType::I32,
    });
    // Claims to store an f64 but the value is an i32.
    builder.push_instr(IrInstr::Store {
        slot,
        value: int_val,
        ty: IrType::F64,
    });
    builder.push_instr(IrInstr::Ret {
        value: None,
        ty: IrType::Void,
    });
    let func = builder.build();
    assert!(matches!(
        verify_function(&func),
        Err(PassError::TypeError { .. })
    ));
}

#[test]
fn test_verifier_rejects_return_type_mismatch() {
    let mut builder = FunctionBuilder::new("f", vec![], IrType::F64);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);
    let v = builder.fresh_value();
    builder.push_instr(IrInstr::ConstInt {
        result: v,
        value: 0,
        ty: IrType::I32,
    });
    builder.push_instr(IrInstr::Ret {
        value: Some(v),
        ty: IrType::I32,
    });
    let func = builder.build();
    assert!(matches!(
        verify_function(&func),
        Err(PassError::TypeError { .. })
    ));
}

#[test]
fn test_duplicate_function_names_rejected() {
    let mut module = IrModule::new("m");
    for _ in 0..2 {
        let mut builder = FunctionBuilder::new("dup", vec![], IrType::Void);
        let entry = builder.create_block("entry");
        builder.set_current_block(entry);
        builder.push_instr(IrInstr::Ret {
            value: None,
            ty: IrType::Void,
        });
        if module.function_by_name("dup").is_none() {
            module.add_function(builder.build()).expect("first add");
        } else {
            assert!(module.add_function(builder.build()).is_err());
        }
    }
    assert_eq!(module.functions().len(), 1);
}

#[test]
fn test_extern_and_function_share_namespace() {
    let mut module = IrModule::new("m");
    module
        .add_extern(minicc::ir::function::ExternFn {
            name: "puts".into(),
            param_tys: vec![IrType::Ptr],
            ret_ty: IrType::I32,
        })
        .expect("extern should register");

    let mut builder = FunctionBuilder::new("puts", vec![], IrType::Void);
    let entry = builder.create_block("entry");
    builder.set_current_block(entry);
    builder.push_instr(IrInstr::Ret {
        value: None,
        ty: IrType::Void,
    });
    assert!(module.add_function(builder.build()).is_err());
}
