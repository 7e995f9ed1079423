//! IR verifier.
//!
//! Checks structural correctness of a function or module:
//! 1. Every block ends with exactly one terminator, as its last instruction.
//! 2. No instruction appears after a terminator.
//! 3. Every `Alloca` sits in its function's entry block.
//! 4. Every value is defined before its first use (linear scan — sufficient
//!    because the lowerer only carries values across blocks through entry
//!    allocas, which always precede their uses).
//! 5. Every value is defined exactly once.
//! 6. Operand types are consistent with each instruction's declared type.
//!
//! The lowering loop calls [`verify_function`] on each freshly built function;
//! [`ValidatePass`] re-runs the same checks module-wide for `-v`.

use std::collections::HashSet;

use crate::error::PassError;
use crate::ir::function::IrFunction;
use crate::ir::instr::IrInstr;
use crate::ir::module::IrModule;
use crate::ir::types::IrType;
use crate::ir::value::ValueId;
use crate::pass::Pass;

pub struct ValidatePass;

impl Pass for ValidatePass {
    fn name(&self) -> &'static str {
        "validate"
    }

    fn run(&mut self, module: &mut IrModule) -> Result<(), PassError> {
        verify_module(module)
    }
}

/// Verifies every function in the module.
pub fn verify_module(module: &IrModule) -> Result<(), PassError> {
    for func in module.functions() {
        verify_function(func)?;
    }
    Ok(())
}

/// Verifies a single function. Called by the lowerer before the function is
/// added to its module.
pub fn verify_function(func: &IrFunction) -> Result<(), PassError> {
    let func_name = &func.name;

    // Parameters are defined on entry.
    let mut defined: HashSet<ValueId> = (0..func.params.len())
        .map(|i| func.param_value(i))
        .collect();

    for block in func.blocks() {
        let block_label = block.label();
        let n = block.instrs.len();

        for (i, instr) in block.instrs.iter().enumerate() {
            if instr.is_terminator() && i != n - 1 {
                return Err(PassError::InstrAfterTerminator {
                    func: func_name.clone(),
                    block: block_label.clone(),
                });
            }

            if matches!(instr, IrInstr::Alloca { .. }) && block.id.0 != 0 {
                return Err(PassError::AllocaOutsideEntry {
                    func: func_name.clone(),
                });
            }

            for operand in instr.operands() {
                if !defined.contains(&operand) {
                    return Err(PassError::UseBeforeDef {
                        func: func_name.clone(),
                        value: operand.to_string(),
                    });
                }
            }

            check_types(func, instr)?;

            if let Some(result) = instr.result() {
                if !defined.insert(result) {
                    return Err(PassError::MultipleDefinition {
                        func: func_name.clone(),
                        value: result.to_string(),
                    });
                }
            }
        }

        if !block.is_sealed() {
            return Err(PassError::MissingTerminator {
                func: func_name.clone(),
                block: block_label,
            });
        }
    }
    Ok(())
}

fn type_error(func: &IrFunction, detail: String) -> PassError {
    PassError::TypeError {
        func: func.name.clone(),
        detail,
    }
}

fn expect_ty(
    func: &IrFunction,
    value: ValueId,
    expected: IrType,
    what: &str,
) -> Result<(), PassError> {
    match func.value_type(value) {
        Some(actual) if actual == expected => Ok(()),
        Some(actual) => Err(type_error(
            func,
            format!("{} has type {}, expected {}", what, actual, expected),
        )),
        None => Err(type_error(func, format!("{} has no recorded type", what))),
    }
}

fn check_types(func: &IrFunction, instr: &IrInstr) -> Result<(), PassError> {
    match instr {
        IrInstr::Load { slot, .. } => expect_ty(func, *slot, IrType::Ptr, "load address"),
        IrInstr::Store { slot, value, ty } => {
            expect_ty(func, *slot, IrType::Ptr, "store address")?;
            expect_ty(func, *value, *ty, "stored value")
        }
        IrInstr::Bin {
            lhs, rhs, ty, op, ..
        } => {
            if op.int_only() && !ty.is_int() {
                return Err(type_error(
                    func,
                    format!("integer operator '{}' applied at type {}", op, ty),
                ));
            }
            expect_ty(func, *lhs, *ty, "left operand")?;
            expect_ty(func, *rhs, *ty, "right operand")
        }
        IrInstr::FNeg { operand, ty, .. } => {
            if !ty.is_float() {
                return Err(type_error(func, format!("fneg at non-float type {}", ty)));
            }
            expect_ty(func, *operand, *ty, "fneg operand")
        }
        IrInstr::Cmp { lhs, rhs, ty, .. } => {
            expect_ty(func, *lhs, *ty, "left operand")?;
            expect_ty(func, *rhs, *ty, "right operand")
        }
        IrInstr::Cast {
            operand, from_ty, ..
        } => expect_ty(func, *operand, *from_ty, "cast operand"),
        IrInstr::Call { args, .. } => {
            for (i, (value, ty)) in args.iter().enumerate() {
                expect_ty(func, *value, *ty, &format!("argument {}", i))?;
            }
            Ok(())
        }
        IrInstr::Gep { base, index, .. } => {
            expect_ty(func, *base, IrType::Ptr, "gep base")?;
            match func.value_type(*index) {
                Some(t) if t.is_int() => Ok(()),
                _ => Err(type_error(func, "gep index is not an integer".to_owned())),
            }
        }
        IrInstr::CondBr { cond, .. } => expect_ty(func, *cond, IrType::I1, "branch condition"),
        IrInstr::Ret { value, ty } => {
            if *ty != func.return_ty {
                return Err(type_error(
                    func,
                    format!("return at type {}, function returns {}", ty, func.return_ty),
                ));
            }
            match (value, func.return_ty) {
                (None, IrType::Void) => Ok(()),
                (Some(v), ret_ty) if ret_ty != IrType::Void => {
                    expect_ty(func, *v, ret_ty, "return value")
                }
                (None, _) => Err(type_error(func, "missing return value".to_owned())),
                (Some(_), _) => Err(type_error(func, "return value in void function".to_owned())),
            }
        }
        IrInstr::Alloca { .. }
        | IrInstr::ConstInt { .. }
        | IrInstr::ConstFloat { .. }
        | IrInstr::ConstStr { .. }
        | IrInstr::Br { .. } => Ok(()),
    }
}
