//! Textual LLVM IR backend.
//!
//! Emits a `.ll` module: interned string globals, `declare` lines for extern
//! functions, then one `define` per function. Output is deterministic —
//! functions in `FunctionId` order, blocks in `BlockId` order, instructions
//! in program order, string globals in first-use order.
//!
//! Constants are inlined at their use sites rather than printed as
//! instructions; value names are `%v<n>`, parameters keep their source names.

use std::collections::HashMap;
use std::fmt::Write;

use crate::error::CodegenError;
use crate::ir::function::IrFunction;
use crate::ir::instr::{BinOp, CmpOp, IrInstr};
use crate::ir::module::IrModule;
use crate::ir::types::IrType;
use crate::ir::value::ValueId;

/// Emits the whole module as LLVM IR text.
pub fn emit_llvm_ir(module: &IrModule) -> Result<String, CodegenError> {
    let mut out = String::new();
    writeln!(out, "; ModuleID = '{}'", module.name)?;
    writeln!(out, "source_filename = \"{}\"", module.name)?;
    writeln!(out)?;

    let str_table = intern_strings(module);
    emit_string_globals(&str_table, &mut out)?;

    for ext in module.extern_fns() {
        let params: Vec<String> = ext.param_tys.iter().map(|t| t.to_string()).collect();
        writeln!(out, "declare {} @{}({})", ext.ret_ty, ext.name, params.join(", "))?;
    }
    if !module.extern_fns().is_empty() {
        writeln!(out)?;
    }

    for func in module.functions() {
        emit_function(func, &str_table, &mut out)?;
    }
    Ok(out)
}

/// Emits a single function definition, with the module-wide string table.
/// Used by the interactive driver to print one declaration at a time.
pub fn emit_function_text(module: &IrModule, func: &IrFunction) -> Result<String, CodegenError> {
    let str_table = intern_strings(module);
    let mut out = String::new();
    emit_function(func, &str_table, &mut out)?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// String interning
// ---------------------------------------------------------------------------

fn intern_strings(module: &IrModule) -> HashMap<Vec<u8>, usize> {
    let mut table: HashMap<Vec<u8>, usize> = HashMap::new();
    for func in module.functions() {
        for block in func.blocks() {
            for instr in &block.instrs {
                if let IrInstr::ConstStr { value, .. } = instr {
                    let next = table.len();
                    table.entry(value.clone()).or_insert(next);
                }
            }
        }
    }
    table
}

fn emit_string_globals(
    table: &HashMap<Vec<u8>, usize>,
    out: &mut String,
) -> Result<(), CodegenError> {
    let mut ordered: Vec<(&Vec<u8>, usize)> = table.iter().map(|(k, &v)| (k, v)).collect();
    ordered.sort_by_key(|&(_, idx)| idx);
    for (content, idx) in &ordered {
        writeln!(
            out,
            "@.str.{} = private unnamed_addr constant [{} x i8] c\"{}\\00\", align 1",
            idx,
            content.len() + 1,
            escape_bytes(content)
        )?;
    }
    if !ordered.is_empty() {
        writeln!(out)?;
    }
    Ok(())
}

fn escape_bytes(bytes: &[u8]) -> String {
    let mut s = String::new();
    for &b in bytes {
        match b {
            b'"' | b'\\' => {
                let _ = write!(s, "\\{:02X}", b);
            }
            0x20..=0x7e => s.push(b as char),
            _ => {
                let _ = write!(s, "\\{:02X}", b);
            }
        }
    }
    s
}

// ---------------------------------------------------------------------------
// Function emission
// ---------------------------------------------------------------------------

struct ValueNames<'f> {
    func: &'f IrFunction,
    /// Inlined constant spellings, keyed by the constant's result id.
    consts: HashMap<ValueId, String>,
}

impl<'f> ValueNames<'f> {
    fn new(func: &'f IrFunction, str_table: &HashMap<Vec<u8>, usize>) -> Self {
        let mut consts = HashMap::new();
        for block in func.blocks() {
            for instr in &block.instrs {
                match instr {
                    IrInstr::ConstInt { result, value, .. } => {
                        consts.insert(*result, value.to_string());
                    }
                    IrInstr::ConstFloat { result, value, .. } => {
                        consts.insert(*result, fmt_float(*value));
                    }
                    IrInstr::ConstStr { result, value } => {
                        if let Some(idx) = str_table.get(value) {
                            consts.insert(*result, format!("@.str.{}", idx));
                        }
                    }
                    _ => {}
                }
            }
        }
        Self { func, consts }
    }

    fn val(&self, v: ValueId) -> String {
        if let Some(lit) = self.consts.get(&v) {
            return lit.clone();
        }
        if (v.0 as usize) < self.func.params.len() {
            return format!("%{}", self.func.params[v.0 as usize].name);
        }
        format!("%v{}", v.0)
    }
}

fn emit_function(
    func: &IrFunction,
    str_table: &HashMap<Vec<u8>, usize>,
    out: &mut String,
) -> Result<(), CodegenError> {
    let params: Vec<String> = func
        .params
        .iter()
        .map(|p| format!("{} %{}", p.ty, p.name))
        .collect();
    writeln!(
        out,
        "define {} @{}({}) {{",
        func.return_ty,
        func.name,
        params.join(", ")
    )?;

    let names = ValueNames::new(func, str_table);
    let labels: HashMap<_, _> = func
        .blocks()
        .iter()
        .map(|b| (b.id, b.label()))
        .collect();

    for block in func.blocks() {
        writeln!(out, "{}:", block.label())?;
        for instr in &block.instrs {
            if names.consts.contains_key(&instr.result().unwrap_or(ValueId(u32::MAX))) {
                continue; // constants are inlined at use sites
            }
            write!(out, "  ")?;
            emit_instr(instr, &names, &labels, out)?;
            writeln!(out)?;
        }
    }
    writeln!(out, "}}")?;
    writeln!(out)?;
    Ok(())
}

fn emit_instr(
    instr: &IrInstr,
    names: &ValueNames<'_>,
    labels: &HashMap<crate::ir::block::BlockId, String>,
    out: &mut String,
) -> Result<(), CodegenError> {
    match instr {
        IrInstr::Alloca { result, ty, .. } => {
            write!(out, "{} = alloca {}, align {}", names.val(*result), ty, ty.align())?;
        }
        IrInstr::Load { result, slot, ty } => {
            write!(
                out,
                "{} = load {}, ptr {}, align {}",
                names.val(*result),
                ty,
                names.val(*slot),
                ty.align()
            )?;
        }
        IrInstr::Store { slot, value, ty } => {
            write!(
                out,
                "store {} {}, ptr {}, align {}",
                ty,
                names.val(*value),
                names.val(*slot),
                ty.align()
            )?;
        }
        IrInstr::Bin {
            result,
            op,
            lhs,
            rhs,
            ty,
        } => {
            write!(
                out,
                "{} = {} {} {}, {}",
                names.val(*result),
                bin_mnemonic(*op, *ty)?,
                ty,
                names.val(*lhs),
                names.val(*rhs)
            )?;
        }
        IrInstr::FNeg {
            result,
            operand,
            ty,
        } => {
            write!(out, "{} = fneg {} {}", names.val(*result), ty, names.val(*operand))?;
        }
        IrInstr::Cmp {
            result,
            op,
            lhs,
            rhs,
            ty,
        } => {
            let (instr_name, pred) = if ty.is_float() {
                ("fcmp", fcmp_pred(*op))
            } else {
                ("icmp", icmp_pred(*op))
            };
            write!(
                out,
                "{} = {} {} {} {}, {}",
                names.val(*result),
                instr_name,
                pred,
                ty,
                names.val(*lhs),
                names.val(*rhs)
            )?;
        }
        IrInstr::Cast {
            result,
            op,
            operand,
            from_ty,
            to_ty,
        } => {
            write!(
                out,
                "{} = {} {} {} to {}",
                names.val(*result),
                op,
                from_ty,
                names.val(*operand),
                to_ty
            )?;
        }
        IrInstr::Call {
            result,
            callee,
            args,
            ret_ty,
        } => {
            let rendered: Vec<String> = args
                .iter()
                .map(|(v, ty)| format!("{} {}", ty, names.val(*v)))
                .collect();
            match result {
                Some(r) => write!(
                    out,
                    "{} = call {} @{}({})",
                    names.val(*r),
                    ret_ty,
                    callee,
                    rendered.join(", ")
                )?,
                None => write!(out, "call void @{}({})", callee, rendered.join(", "))?,
            }
        }
        IrInstr::Gep {
            result,
            base,
            index,
            elem_ty,
        } => {
            write!(
                out,
                "{} = getelementptr {}, ptr {}, i32 {}",
                names.val(*result),
                elem_ty,
                names.val(*base),
                names.val(*index)
            )?;
        }
        IrInstr::Br { target } => {
            write!(out, "br label %{}", labels[target])?;
        }
        IrInstr::CondBr {
            cond,
            then_block,
            else_block,
        } => {
            write!(
                out,
                "br i1 {}, label %{}, label %{}",
                names.val(*cond),
                labels[then_block],
                labels[else_block]
            )?;
        }
        IrInstr::Ret { value, ty } => match value {
            Some(v) => write!(out, "ret {} {}", ty, names.val(*v))?,
            None => write!(out, "ret void")?,
        },
        // Inlined at use sites; reaching here means the constant was dead
        // and survived DCE, which is harmless to skip.
        IrInstr::ConstInt { .. } | IrInstr::ConstFloat { .. } | IrInstr::ConstStr { .. } => {}
    }
    Ok(())
}

fn bin_mnemonic(op: BinOp, ty: IrType) -> Result<&'static str, CodegenError> {
    let name = if ty.is_float() {
        match op {
            BinOp::Add => "fadd",
            BinOp::Sub => "fsub",
            BinOp::Mul => "fmul",
            BinOp::Div => "fdiv",
            BinOp::Rem => "frem",
            other => {
                return Err(CodegenError::Unsupported {
                    detail: format!("integer operator '{}' at floating type {}", other, ty),
                })
            }
        }
    } else {
        match op {
            BinOp::Add => "add",
            BinOp::Sub => "sub",
            BinOp::Mul => "mul",
            BinOp::Div => "sdiv",
            BinOp::Rem => "srem",
            BinOp::And => "and",
            BinOp::Or => "or",
            BinOp::Xor => "xor",
            BinOp::Shl => "shl",
            BinOp::Shr => "ashr",
        }
    };
    Ok(name)
}

fn icmp_pred(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "eq",
        CmpOp::Ne => "ne",
        CmpOp::Lt => "slt",
        CmpOp::Le => "sle",
        CmpOp::Gt => "sgt",
        CmpOp::Ge => "sge",
    }
}

/// Unordered predicates, so NaN comparisons behave like the source's `!= 0`
/// truthiness tests.
fn fcmp_pred(op: CmpOp) -> &'static str {
    match op {
        CmpOp::Eq => "ueq",
        CmpOp::Ne => "une",
        CmpOp::Lt => "ult",
        CmpOp::Le => "ule",
        CmpOp::Gt => "ugt",
        CmpOp::Ge => "uge",
    }
}

/// Formats a floating constant in LLVM's `d.ddddde±XX` style.
fn fmt_float(value: f64) -> String {
    let s = format!("{:e}", value);
    let (mantissa, exp) = match s.split_once('e') {
        Some(parts) => parts,
        None => return s,
    };
    let mantissa = if mantissa.contains('.') {
        mantissa.to_owned()
    } else {
        format!("{}.0", mantissa)
    };
    let exp: i32 = exp.parse().unwrap_or(0);
    let sign = if exp < 0 { '-' } else { '+' };
    format!("{}e{}{:02}", mantissa, sign, exp.abs())
}
