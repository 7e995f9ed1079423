//! AST → IR lowering.
//!
//! The lowerer walks the AST and constructs an `IrModule` through
//! `FunctionBuilder`. Each function is lowered independently and verified
//! before it is added to the module; a failed function never leaves partial
//! IR behind. Variable bindings live in a stack of lexical scopes mapping
//! names to entry-block stack slots.
//!
//! Terminator discipline: before lowering each statement the current block is
//! checked for a terminator; statements after `return`/`break`/`continue` are
//! unreachable and emit nothing.

use std::collections::HashMap;

use crate::error::{Error, LowerError};
use crate::ir::block::BlockId;
use crate::ir::function::{ExternFn, FunctionId, IrFunction, Param};
use crate::ir::instr::{BinOp as IrBinOp, CastOp, CmpOp, IrInstr};
use crate::ir::module::{FunctionBuilder, IrModule};
use crate::ir::types::IrType;
use crate::ir::value::ValueId;
use crate::parser::ast::{BinOp, CType, Decl, Expr, Ident, Program, Stmt, UnaryOp};
use crate::parser::lexer::Pos;
use crate::pass::validate::verify_function;

/// Lowers a whole program to a fresh `IrModule`.
pub fn lower(program: &Program, module_name: &str) -> Result<IrModule, Error> {
    let mut ctx = LowerCtx::new(module_name);
    for decl in &program.decls {
        ctx.lower_decl(decl)?;
    }
    Ok(ctx.finish())
}

/// A function signature as seen by call sites.
#[derive(Debug, Clone)]
struct FnSig {
    param_tys: Vec<IrType>,
    ret_ty: IrType,
}

/// Incremental lowering context.
///
/// Declarations are lowered one at a time in source order, which is what the
/// interactive driver needs; `lower()` above is the batch wrapper. The
/// signature table persists across declarations so later functions can call
/// earlier ones (and themselves — a function's own signature is registered
/// before its body is lowered).
pub struct LowerCtx {
    module: IrModule,
    fn_sigs: HashMap<String, FnSig>,
}

impl LowerCtx {
    pub fn new(module_name: impl Into<String>) -> Self {
        Self {
            module: IrModule::new(module_name),
            fn_sigs: HashMap::new(),
        }
    }

    pub fn module(&self) -> &IrModule {
        &self.module
    }

    pub fn finish(self) -> IrModule {
        self.module
    }

    /// Lowers one top-level declaration into the module.
    ///
    /// Returns the new `FunctionId` for definitions, `None` for externs.
    /// On error the module is left exactly as it was before the call.
    pub fn lower_decl(&mut self, decl: &Decl) -> Result<Option<FunctionId>, Error> {
        match decl {
            Decl::Extern {
                return_ty,
                name,
                params,
                ..
            } => {
                let sig = build_sig(*return_ty, params)?;
                self.check_undeclared(name)?;
                self.module
                    .add_extern(ExternFn {
                        name: name.name.clone(),
                        param_tys: sig.param_tys.clone(),
                        ret_ty: sig.ret_ty,
                    })
                    .map_err(|n| LowerError::DuplicateFunction {
                        name: n,
                        pos: name.pos,
                    })?;
                self.fn_sigs.insert(name.name.clone(), sig);
                Ok(None)
            }
            Decl::Function {
                return_ty,
                name,
                params,
                body,
                ..
            } => {
                let sig = build_sig(*return_ty, params)?;
                self.check_undeclared(name)?;
                // Registered before the body is lowered so recursive calls
                // resolve to the function itself.
                self.fn_sigs.insert(name.name.clone(), sig.clone());

                let lowered = self.lower_function(name, params, body, &sig);
                let func = match lowered {
                    Ok(func) => func,
                    Err(e) => {
                        self.fn_sigs.remove(&name.name);
                        return Err(e);
                    }
                };
                if let Err(e) = verify_function(&func) {
                    self.fn_sigs.remove(&name.name);
                    return Err(e.into());
                }
                let id = self
                    .module
                    .add_function(func)
                    .map_err(|n| LowerError::DuplicateFunction {
                        name: n,
                        pos: name.pos,
                    })?;
                Ok(Some(id))
            }
        }
    }

    fn check_undeclared(&self, name: &Ident) -> Result<(), LowerError> {
        if self.fn_sigs.contains_key(&name.name) {
            return Err(LowerError::DuplicateFunction {
                name: name.name.clone(),
                pos: name.pos,
            });
        }
        Ok(())
    }

    fn lower_function(
        &self,
        name: &Ident,
        params: &[crate::parser::ast::Param],
        body: &Stmt,
        sig: &FnSig,
    ) -> Result<IrFunction, Error> {
        let ir_params: Vec<Param> = params
            .iter()
            .zip(&sig.param_tys)
            .map(|(p, ty)| Param {
                name: p.name.name.clone(),
                ty: *ty,
            })
            .collect();
        let builder = FunctionBuilder::new(&name.name, ir_params, sig.ret_ty);
        let mut lowerer = FnLowerer {
            builder,
            scopes: Vec::new(),
            loop_stack: Vec::new(),
            fn_sigs: &self.fn_sigs,
            return_ty: sig.ret_ty,
        };
        lowerer.lower_body(params, sig, body)?;
        Ok(lowerer.builder.build())
    }
}

fn build_sig(return_ty: CType, params: &[crate::parser::ast::Param]) -> Result<FnSig, LowerError> {
    let mut param_tys = Vec::with_capacity(params.len());
    for p in params {
        if p.ty == CType::Void {
            return Err(LowerError::VoidParam {
                name: p.name.name.clone(),
                pos: p.name.pos,
            });
        }
        param_tys.push(map_type(p.ty));
    }
    Ok(FnSig {
        param_tys,
        ret_ty: map_type(return_ty),
    })
}

/// Source type → IR type, per the fixed mapping.
fn map_type(ty: CType) -> IrType {
    match ty {
        CType::Int => IrType::I32,
        CType::Float => IrType::F32,
        CType::Double => IrType::F64,
        CType::Char => IrType::I8,
        CType::Void => IrType::Void,
        CType::Bool => IrType::I1,
    }
}

/// A local variable bound to an entry-block stack slot.
#[derive(Debug, Clone, Copy)]
struct Binding {
    slot: ValueId,
    ty: IrType,
}

/// Branch targets for `continue` / `break` of one enclosing loop.
#[derive(Debug, Clone, Copy)]
struct LoopTargets {
    continue_block: BlockId,
    exit_block: BlockId,
}

/// A lowered expression: its value (absent for void calls) and type.
#[derive(Debug, Clone, Copy)]
struct Lowered {
    value: Option<ValueId>,
    ty: IrType,
}

impl Lowered {
    fn of(value: ValueId, ty: IrType) -> Self {
        Self {
            value: Some(value),
            ty,
        }
    }
}

struct FnLowerer<'ctx> {
    builder: FunctionBuilder,
    /// Innermost scope is last. Lookup walks back to front.
    scopes: Vec<HashMap<String, Binding>>,
    /// Strict LIFO of enclosing loops; empty at function exit.
    loop_stack: Vec<LoopTargets>,
    fn_sigs: &'ctx HashMap<String, FnSig>,
    return_ty: IrType,
}

impl<'ctx> FnLowerer<'ctx> {
    fn lower_body(
        &mut self,
        params: &[crate::parser::ast::Param],
        sig: &FnSig,
        body: &Stmt,
    ) -> Result<(), Error> {
        let entry = self.builder.create_block("entry");
        self.builder.set_current_block(entry);

        // Parameters get slots in the entry block; the incoming values are
        // stored immediately so later loads observe them.
        self.push_scope();
        for (i, (p, ty)) in params.iter().zip(&sig.param_tys).enumerate() {
            let slot = self.builder.push_entry_alloca(*ty, &p.name.name);
            let incoming = self.builder.param_value(i);
            self.builder.push_instr(IrInstr::Store {
                slot,
                value: incoming,
                ty: *ty,
            });
            self.bind(&p.name.name, Binding { slot, ty: *ty });
        }

        let result = self.lower_stmt(body);
        self.pop_scope();
        result?;

        if !self.builder.is_current_block_terminated() {
            self.emit_default_return();
        }
        Ok(())
    }

    /// Synthesizes a `return` for a body that falls off the end.
    fn emit_default_return(&mut self) {
        match self.return_ty {
            IrType::Void => {
                self.builder.push_instr(IrInstr::Ret {
                    value: None,
                    ty: IrType::Void,
                });
            }
            ty if ty.is_float() => {
                let zero = self.const_float(0.0, ty);
                self.builder.push_instr(IrInstr::Ret {
                    value: Some(zero),
                    ty,
                });
            }
            ty => {
                let zero = self.const_int(0, ty);
                self.builder.push_instr(IrInstr::Ret {
                    value: Some(zero),
                    ty,
                });
            }
        }
    }

    // -----------------------------------------------------------------------
    // Scopes
    // -----------------------------------------------------------------------

    fn push_scope(&mut self) {
        self.scopes.push(HashMap::new());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn bind(&mut self, name: &str, binding: Binding) {
        self.scopes
            .last_mut()
            .expect("FnLowerer: no scope to bind into")
            .insert(name.to_owned(), binding);
    }

    fn lookup(&self, name: &str) -> Option<Binding> {
        self.scopes
            .iter()
            .rev()
            .find_map(|scope| scope.get(name).copied())
    }

    fn lookup_or_err(&self, ident: &Ident) -> Result<Binding, Error> {
        self.lookup(&ident.name).ok_or_else(|| {
            LowerError::UnknownVariable {
                name: ident.name.clone(),
                pos: ident.pos,
            }
            .into()
        })
    }

    // -----------------------------------------------------------------------
    // Statements
    // -----------------------------------------------------------------------

    fn lower_stmt(&mut self, stmt: &Stmt) -> Result<(), Error> {
        // Dead code after a terminator is skipped, not an error.
        if self.builder.is_current_block_terminated() {
            return Ok(());
        }
        match stmt {
            Stmt::Block { stmts, .. } => {
                self.push_scope();
                let result = stmts.iter().try_for_each(|s| self.lower_stmt(s));
                self.pop_scope();
                result
            }
            Stmt::VarDecl { ty, name, init, .. } => self.lower_var_decl(*ty, name, init.as_deref()),
            Stmt::Expr(expr) => {
                self.lower_expr(expr)?;
                Ok(())
            }
            Stmt::If {
                cond,
                then_branch,
                else_branch,
                ..
            } => self.lower_if(cond, then_branch, else_branch.as_deref()),
            Stmt::While { cond, body, .. } => self.lower_while(cond, body),
            Stmt::For {
                init,
                cond,
                step,
                body,
                ..
            } => self.lower_for(init.as_deref(), cond.as_deref(), step.as_deref(), body),
            Stmt::Return { value, pos } => self.lower_return(value.as_deref(), *pos),
            Stmt::Break { pos } => {
                let targets = self
                    .loop_stack
                    .last()
                    .copied()
                    .ok_or(LowerError::BreakOutsideLoop { pos: *pos })?;
                self.builder.push_instr(IrInstr::Br {
                    target: targets.exit_block,
                });
                Ok(())
            }
            Stmt::Continue { pos } => {
                let targets = self
                    .loop_stack
                    .last()
                    .copied()
                    .ok_or(LowerError::ContinueOutsideLoop { pos: *pos })?;
                self.builder.push_instr(IrInstr::Br {
                    target: targets.continue_block,
                });
                Ok(())
            }
        }
    }

    fn lower_var_decl(
        &mut self,
        ty: CType,
        name: &Ident,
        init: Option<&Expr>,
    ) -> Result<(), Error> {
        if ty == CType::Void {
            return Err(LowerError::VoidVariable {
                name: name.name.clone(),
                pos: name.pos,
            }
            .into());
        }
        let ir_ty = map_type(ty);
        let slot = self.builder.push_entry_alloca(ir_ty, &name.name);
        if let Some(init) = init {
            let (value, value_ty) = self.lower_value_expr(init)?;
            let converted = self.convert(value, value_ty, ir_ty, init.pos())?;
            self.builder.push_instr(IrInstr::Store {
                slot,
                value: converted,
                ty: ir_ty,
            });
        }
        // Bound after the initializer so `int x = x;` reports an unknown name.
        self.bind(&name.name, Binding { slot, ty: ir_ty });
        Ok(())
    }

    fn lower_if(
        &mut self,
        cond: &Expr,
        then_branch: &Stmt,
        else_branch: Option<&Stmt>,
    ) -> Result<(), Error> {
        let (cond_val, cond_ty) = self.lower_value_expr(cond)?;
        let flag = self.to_bool(cond_val, cond_ty, cond.pos())?;

        let then_bb = self.builder.create_block("then");
        let else_bb = else_branch.map(|_| self.builder.create_block("else"));
        let cont_bb = self.builder.create_block("ifcont");

        self.builder.push_instr(IrInstr::CondBr {
            cond: flag,
            then_block: then_bb,
            else_block: else_bb.unwrap_or(cont_bb),
        });

        self.builder.set_current_block(then_bb);
        self.lower_stmt(then_branch)?;
        if !self.builder.is_current_block_terminated() {
            self.builder.push_instr(IrInstr::Br { target: cont_bb });
        }

        if let Some(else_stmt) = else_branch {
            let else_bb = else_bb.expect("else block exists when else branch does");
            self.builder.set_current_block(else_bb);
            self.lower_stmt(else_stmt)?;
            if !self.builder.is_current_block_terminated() {
                self.builder.push_instr(IrInstr::Br { target: cont_bb });
            }
        }

        // If both arms terminated, `cont` is unreachable and stays empty
        // until the function-level default return seals it.
        self.builder.set_current_block(cont_bb);
        Ok(())
    }

    fn lower_while(&mut self, cond: &Expr, body: &Stmt) -> Result<(), Error> {
        let cond_bb = self.builder.create_block("while.cond");
        let body_bb = self.builder.create_block("while.body");
        let exit_bb = self.builder.create_block("while.exit");

        self.builder.push_instr(IrInstr::Br { target: cond_bb });

        self.builder.set_current_block(cond_bb);
        let (cond_val, cond_ty) = self.lower_value_expr(cond)?;
        let flag = self.to_bool(cond_val, cond_ty, cond.pos())?;
        self.builder.push_instr(IrInstr::CondBr {
            cond: flag,
            then_block: body_bb,
            else_block: exit_bb,
        });

        self.builder.set_current_block(body_bb);
        self.loop_stack.push(LoopTargets {
            continue_block: cond_bb,
            exit_block: exit_bb,
        });
        let body_result = self.lower_stmt(body);
        self.loop_stack.pop();
        body_result?;
        if !self.builder.is_current_block_terminated() {
            self.builder.push_instr(IrInstr::Br { target: cond_bb });
        }

        self.builder.set_current_block(exit_bb);
        Ok(())
    }

    fn lower_for(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), Error> {
        // The for header introduces its own scope so an init declaration dies
        // with the loop.
        self.push_scope();
        let result = self.lower_for_inner(init, cond, step, body);
        self.pop_scope();
        result
    }

    fn lower_for_inner(
        &mut self,
        init: Option<&Stmt>,
        cond: Option<&Expr>,
        step: Option<&Expr>,
        body: &Stmt,
    ) -> Result<(), Error> {
        if let Some(init) = init {
            self.lower_stmt(init)?;
        }

        let cond_bb = self.builder.create_block("for.cond");
        let body_bb = self.builder.create_block("for.body");
        let step_bb = self.builder.create_block("for.step");
        let exit_bb = self.builder.create_block("for.exit");

        self.builder.push_instr(IrInstr::Br { target: cond_bb });

        self.builder.set_current_block(cond_bb);
        match cond {
            Some(cond) => {
                let (cond_val, cond_ty) = self.lower_value_expr(cond)?;
                let flag = self.to_bool(cond_val, cond_ty, cond.pos())?;
                self.builder.push_instr(IrInstr::CondBr {
                    cond: flag,
                    then_block: body_bb,
                    else_block: exit_bb,
                });
            }
            // No condition means an always-taken branch into the body.
            None => {
                self.builder.push_instr(IrInstr::Br { target: body_bb });
            }
        }

        self.builder.set_current_block(body_bb);
        self.loop_stack.push(LoopTargets {
            continue_block: step_bb,
            exit_block: exit_bb,
        });
        let body_result = self.lower_stmt(body);
        self.loop_stack.pop();
        body_result?;
        if !self.builder.is_current_block_terminated() {
            self.builder.push_instr(IrInstr::Br { target: step_bb });
        }

        self.builder.set_current_block(step_bb);
        if let Some(step) = step {
            self.lower_expr(step)?;
        }
        self.builder.push_instr(IrInstr::Br { target: cond_bb });

        self.builder.set_current_block(exit_bb);
        Ok(())
    }

    fn lower_return(&mut self, value: Option<&Expr>, pos: Pos) -> Result<(), Error> {
        if self.return_ty == IrType::Void {
            if value.is_some() {
                return Err(LowerError::ReturnValueInVoid { pos }.into());
            }
            self.builder.push_instr(IrInstr::Ret {
                value: None,
                ty: IrType::Void,
            });
            return Ok(());
        }
        let value = value.ok_or(LowerError::MissingReturnValue {
            expected: self.return_ty.to_string(),
            pos,
        })?;
        let (v, ty) = self.lower_value_expr(value)?;
        let converted = self.convert(v, ty, self.return_ty, value.pos())?;
        self.builder.push_instr(IrInstr::Ret {
            value: Some(converted),
            ty: self.return_ty,
        });
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Expressions
    // -----------------------------------------------------------------------

    /// Lowers an expression that must produce a value.
    fn lower_value_expr(&mut self, expr: &Expr) -> Result<(ValueId, IrType), Error> {
        let lowered = self.lower_expr(expr)?;
        match lowered.value {
            Some(v) => Ok((v, lowered.ty)),
            None => Err(LowerError::VoidValue { pos: expr.pos() }.into()),
        }
    }

    fn lower_expr(&mut self, expr: &Expr) -> Result<Lowered, Error> {
        match expr {
            Expr::IntLit { value, .. } => {
                let v = self.const_int(*value, IrType::I32);
                Ok(Lowered::of(v, IrType::I32))
            }
            Expr::FloatLit { value, .. } => {
                let v = self.const_float(*value, IrType::F64);
                Ok(Lowered::of(v, IrType::F64))
            }
            Expr::CharLit { value, .. } => {
                let v = self.const_int(*value as i64, IrType::I8);
                Ok(Lowered::of(v, IrType::I8))
            }
            Expr::BoolLit { value, .. } => {
                let v = self.const_int(*value as i64, IrType::I1);
                Ok(Lowered::of(v, IrType::I1))
            }
            Expr::StrLit { value, .. } => {
                let result = self.builder.fresh_value();
                self.builder.push_instr(IrInstr::ConstStr {
                    result,
                    value: value.clone(),
                });
                Ok(Lowered::of(result, IrType::Ptr))
            }
            Expr::Var(ident) => {
                let binding = self.lookup_or_err(ident)?;
                let v = self.load(binding);
                Ok(Lowered::of(v, binding.ty))
            }
            Expr::Assign { target, value, .. } => {
                let (v, ty) = self.lower_value_expr(value)?;
                let binding = self.lookup_or_err(target)?;
                let converted = self.convert(v, ty, binding.ty, value.pos())?;
                self.builder.push_instr(IrInstr::Store {
                    slot: binding.slot,
                    value: converted,
                    ty: binding.ty,
                });
                Ok(Lowered::of(converted, binding.ty))
            }
            Expr::Binary { op, lhs, rhs, pos } => self.lower_binary(*op, lhs, rhs, *pos),
            Expr::Unary {
                op,
                operand,
                postfix,
                pos,
            } => self.lower_unary(*op, operand, *postfix, *pos),
            Expr::Call { callee, args, pos } => self.lower_call(callee, args, *pos),
            Expr::Index { base, index, pos } => self.lower_index(base, index, *pos),
        }
    }

    fn lower_binary(
        &mut self,
        op: BinOp,
        lhs: &Expr,
        rhs: &Expr,
        pos: Pos,
    ) -> Result<Lowered, Error> {
        // Operands evaluate left to right in every case.
        let (lv, lt) = self.lower_value_expr(lhs)?;
        let (rv, rt) = self.lower_value_expr(rhs)?;

        match op {
            // Eager logical operators: both sides are normalized to i1,
            // combined bitwise, and widened to i32.
            BinOp::And | BinOp::Or => {
                let ln = self.to_bool(lv, lt, lhs.pos())?;
                let rn = self.to_bool(rv, rt, rhs.pos())?;
                let ir_op = if op == BinOp::And {
                    IrBinOp::And
                } else {
                    IrBinOp::Or
                };
                let combined = self.bin(ir_op, ln, rn, IrType::I1);
                let widened = self.cast(CastOp::Zext, combined, IrType::I1, IrType::I32);
                Ok(Lowered::of(widened, IrType::I32))
            }
            BinOp::Eq | BinOp::Ne | BinOp::Lt | BinOp::Le | BinOp::Gt | BinOp::Ge => {
                let (lv, rv, ty) = self.promote_pair(lv, lt, rv, rt, &op.to_string(), pos)?;
                let cmp_op = match op {
                    BinOp::Eq => CmpOp::Eq,
                    BinOp::Ne => CmpOp::Ne,
                    BinOp::Lt => CmpOp::Lt,
                    BinOp::Le => CmpOp::Le,
                    BinOp::Gt => CmpOp::Gt,
                    _ => CmpOp::Ge,
                };
                let result = self.builder.fresh_value();
                self.builder.push_instr(IrInstr::Cmp {
                    result,
                    op: cmp_op,
                    lhs: lv,
                    rhs: rv,
                    ty,
                });
                // Comparisons yield i1, immediately widened to i32.
                let widened = self.cast(CastOp::Zext, result, IrType::I1, IrType::I32);
                Ok(Lowered::of(widened, IrType::I32))
            }
            _ => {
                let ir_op = match op {
                    BinOp::Add => IrBinOp::Add,
                    BinOp::Sub => IrBinOp::Sub,
                    BinOp::Mul => IrBinOp::Mul,
                    BinOp::Div => IrBinOp::Div,
                    BinOp::Rem => IrBinOp::Rem,
                    BinOp::BitAnd => IrBinOp::And,
                    BinOp::BitOr => IrBinOp::Or,
                    BinOp::BitXor => IrBinOp::Xor,
                    BinOp::Shl => IrBinOp::Shl,
                    BinOp::Shr => IrBinOp::Shr,
                    _ => unreachable!("logical and comparison ops handled above"),
                };
                let (lv, rv, ty) = self.promote_pair(lv, lt, rv, rt, &op.to_string(), pos)?;
                if ir_op.int_only() && ty.is_float() {
                    return Err(LowerError::InvalidOperand {
                        op: op.to_string(),
                        ty: ty.to_string(),
                        pos,
                    }
                    .into());
                }
                let v = self.bin(ir_op, lv, rv, ty);
                Ok(Lowered::of(v, ty))
            }
        }
    }

    fn lower_unary(
        &mut self,
        op: UnaryOp,
        operand: &Expr,
        postfix: bool,
        pos: Pos,
    ) -> Result<Lowered, Error> {
        match op {
            UnaryOp::Neg => {
                let (v, ty) = self.lower_value_expr(operand)?;
                let (v, ty) = self.promote_bool(v, ty);
                if ty.is_float() {
                    let result = self.builder.fresh_value();
                    self.builder.push_instr(IrInstr::FNeg {
                        result,
                        operand: v,
                        ty,
                    });
                    Ok(Lowered::of(result, ty))
                } else if ty.is_int() {
                    let zero = self.const_int(0, ty);
                    let v = self.bin(IrBinOp::Sub, zero, v, ty);
                    Ok(Lowered::of(v, ty))
                } else {
                    Err(self.invalid_operand("-", ty, pos))
                }
            }
            UnaryOp::Plus => {
                let (v, ty) = self.lower_value_expr(operand)?;
                if !(ty.is_int() || ty.is_float()) {
                    return Err(self.invalid_operand("+", ty, pos));
                }
                let (v, ty) = self.promote_bool(v, ty);
                Ok(Lowered::of(v, ty))
            }
            UnaryOp::Not => {
                let (v, ty) = self.lower_value_expr(operand)?;
                let flag = self.to_bool(v, ty, pos)?;
                let zero = self.const_int(0, IrType::I1);
                let result = self.builder.fresh_value();
                self.builder.push_instr(IrInstr::Cmp {
                    result,
                    op: CmpOp::Eq,
                    lhs: flag,
                    rhs: zero,
                    ty: IrType::I1,
                });
                let widened = self.cast(CastOp::Zext, result, IrType::I1, IrType::I32);
                Ok(Lowered::of(widened, IrType::I32))
            }
            UnaryOp::BitNot => {
                let (v, ty) = self.lower_value_expr(operand)?;
                if !ty.is_int() {
                    return Err(self.invalid_operand("~", ty, pos));
                }
                let (v, ty) = self.promote_bool(v, ty);
                let all_ones = self.const_int(-1, ty);
                let v = self.bin(IrBinOp::Xor, v, all_ones, ty);
                Ok(Lowered::of(v, ty))
            }
            UnaryOp::Inc | UnaryOp::Dec => {
                let ident = match operand {
                    Expr::Var(ident) => ident,
                    _ => {
                        return Err(LowerError::InvalidAssignTarget {
                            op: op.to_string(),
                            pos,
                        }
                        .into())
                    }
                };
                let binding = self.lookup_or_err(ident)?;
                let old = self.load(binding);
                let one = if binding.ty.is_float() {
                    self.const_float(1.0, binding.ty)
                } else {
                    self.const_int(1, binding.ty)
                };
                let ir_op = if op == UnaryOp::Inc {
                    IrBinOp::Add
                } else {
                    IrBinOp::Sub
                };
                let new = self.bin(ir_op, old, one, binding.ty);
                self.builder.push_instr(IrInstr::Store {
                    slot: binding.slot,
                    value: new,
                    ty: binding.ty,
                });
                // Prefix yields the updated value, postfix the original.
                let result = if postfix { old } else { new };
                Ok(Lowered::of(result, binding.ty))
            }
        }
    }

    fn lower_call(&mut self, callee: &Ident, args: &[Expr], pos: Pos) -> Result<Lowered, Error> {
        let sig = self
            .fn_sigs
            .get(&callee.name)
            .cloned()
            .ok_or_else(|| LowerError::UnknownFunction {
                name: callee.name.clone(),
                pos: callee.pos,
            })?;
        if args.len() != sig.param_tys.len() {
            return Err(LowerError::ArityMismatch {
                name: callee.name.clone(),
                expected: sig.param_tys.len(),
                found: args.len(),
                pos,
            }
            .into());
        }
        let mut lowered_args = Vec::with_capacity(args.len());
        for (arg, param_ty) in args.iter().zip(&sig.param_tys) {
            let (v, ty) = self.lower_value_expr(arg)?;
            let converted = self.convert(v, ty, *param_ty, arg.pos())?;
            lowered_args.push((converted, *param_ty));
        }
        let result = if sig.ret_ty == IrType::Void {
            None
        } else {
            Some(self.builder.fresh_value())
        };
        self.builder.push_instr(IrInstr::Call {
            result,
            callee: callee.name.clone(),
            args: lowered_args,
            ret_ty: sig.ret_ty,
        });
        Ok(Lowered {
            value: result,
            ty: sig.ret_ty,
        })
    }

    fn lower_index(&mut self, base: &Ident, index: &Expr, pos: Pos) -> Result<Lowered, Error> {
        let binding = self.lookup_or_err(base)?;
        if binding.ty != IrType::Ptr {
            return Err(LowerError::NotIndexable {
                name: base.name.clone(),
                pos,
            }
            .into());
        }
        let base_ptr = self.load(binding);
        let (idx, idx_ty) = self.lower_value_expr(index)?;
        if !idx_ty.is_int() {
            return Err(self.invalid_operand("[]", idx_ty, index.pos()));
        }
        let idx = self.convert(idx, idx_ty, IrType::I32, index.pos())?;
        let elem_ptr = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::Gep {
            result: elem_ptr,
            base: base_ptr,
            index: idx,
            elem_ty: IrType::I8,
        });
        let result = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::Load {
            result,
            slot: elem_ptr,
            ty: IrType::I8,
        });
        Ok(Lowered::of(result, IrType::I8))
    }

    // -----------------------------------------------------------------------
    // Value plumbing
    // -----------------------------------------------------------------------

    fn const_int(&mut self, value: i64, ty: IrType) -> ValueId {
        let result = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::ConstInt { result, value, ty });
        result
    }

    fn const_float(&mut self, value: f64, ty: IrType) -> ValueId {
        let result = self.builder.fresh_value();
        self.builder
            .push_instr(IrInstr::ConstFloat { result, value, ty });
        result
    }

    fn bin(&mut self, op: IrBinOp, lhs: ValueId, rhs: ValueId, ty: IrType) -> ValueId {
        let result = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::Bin {
            result,
            op,
            lhs,
            rhs,
            ty,
        });
        result
    }

    fn cast(&mut self, op: CastOp, operand: ValueId, from_ty: IrType, to_ty: IrType) -> ValueId {
        let result = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::Cast {
            result,
            op,
            operand,
            from_ty,
            to_ty,
        });
        result
    }

    fn load(&mut self, binding: Binding) -> ValueId {
        let result = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::Load {
            result,
            slot: binding.slot,
            ty: binding.ty,
        });
        result
    }

    fn invalid_operand(&self, op: &str, ty: IrType, pos: Pos) -> Error {
        LowerError::InvalidOperand {
            op: op.to_owned(),
            ty: ty.to_string(),
            pos,
        }
        .into()
    }

    /// Normalizes a value to `i1` by comparing it against zero.
    fn to_bool(&mut self, v: ValueId, ty: IrType, pos: Pos) -> Result<ValueId, Error> {
        if ty == IrType::I1 {
            return Ok(v);
        }
        let zero = if ty.is_float() {
            self.const_float(0.0, ty)
        } else if ty.is_int() {
            self.const_int(0, ty)
        } else {
            return Err(self.invalid_operand("!=", ty, pos));
        };
        let result = self.builder.fresh_value();
        self.builder.push_instr(IrInstr::Cmp {
            result,
            op: CmpOp::Ne,
            lhs: v,
            rhs: zero,
            ty,
        });
        Ok(result)
    }

    /// Rule 3 of the promotion policy: `i1` is zero-extended to `i32` before
    /// it meets any arithmetic operator.
    fn promote_bool(&mut self, v: ValueId, ty: IrType) -> (ValueId, IrType) {
        if ty == IrType::I1 {
            let widened = self.cast(CastOp::Zext, v, IrType::I1, IrType::I32);
            (widened, IrType::I32)
        } else {
            (v, ty)
        }
    }

    /// Applies the numeric promotion policy to a pair of operands and
    /// returns them converted to a common type.
    fn promote_pair(
        &mut self,
        lv: ValueId,
        lt: IrType,
        rv: ValueId,
        rt: IrType,
        op: &str,
        pos: Pos,
    ) -> Result<(ValueId, ValueId, IrType), Error> {
        let (lv, lt) = self.promote_bool(lv, lt);
        let (rv, rt) = self.promote_bool(rv, rt);

        if !(lt.is_int() || lt.is_float()) {
            return Err(self.invalid_operand(op, lt, pos));
        }
        if !(rt.is_int() || rt.is_float()) {
            return Err(self.invalid_operand(op, rt, pos));
        }
        if lt == rt {
            return Ok((lv, rv, lt));
        }

        if lt.is_float() || rt.is_float() {
            // Among floating types, double dominates float.
            let target = if lt == IrType::F64 || rt == IrType::F64 {
                IrType::F64
            } else {
                IrType::F32
            };
            let lv = self.widen_to_float(lv, lt, target);
            let rv = self.widen_to_float(rv, rt, target);
            Ok((lv, rv, target))
        } else {
            // Both integer: the narrower is sign-extended to the wider.
            let (lw, rw) = (lt.int_bits().unwrap_or(0), rt.int_bits().unwrap_or(0));
            let target = if lw >= rw { lt } else { rt };
            let lv = if lt == target {
                lv
            } else {
                self.cast(CastOp::Sext, lv, lt, target)
            };
            let rv = if rt == target {
                rv
            } else {
                self.cast(CastOp::Sext, rv, rt, target)
            };
            Ok((lv, rv, target))
        }
    }

    fn widen_to_float(&mut self, v: ValueId, from: IrType, target: IrType) -> ValueId {
        if from == target {
            v
        } else if from.is_int() {
            self.cast(CastOp::SiToFp, v, from, target)
        } else {
            self.cast(CastOp::FpExt, v, from, target)
        }
    }

    /// Store-site conversion of `v` to a declared slot/parameter/return type.
    /// This is the only place values narrow.
    fn convert(
        &mut self,
        v: ValueId,
        from: IrType,
        to: IrType,
        pos: Pos,
    ) -> Result<ValueId, Error> {
        if from == to {
            return Ok(v);
        }
        let invalid = || -> Error {
            LowerError::InvalidConversion {
                from: from.to_string(),
                to: to.to_string(),
                pos,
            }
            .into()
        };
        match (from, to) {
            (f, t) if f.is_int() && t.is_int() => {
                let (fw, tw) = (f.int_bits().unwrap_or(0), t.int_bits().unwrap_or(0));
                let op = if fw < tw {
                    // Bool widens unsigned; other integers sign-extend.
                    if f == IrType::I1 {
                        CastOp::Zext
                    } else {
                        CastOp::Sext
                    }
                } else {
                    CastOp::Trunc
                };
                Ok(self.cast(op, v, f, t))
            }
            (IrType::I1, t) if t.is_float() => {
                // sitofp would read i1's single bit as the sign; widen first.
                let wide = self.cast(CastOp::Zext, v, IrType::I1, IrType::I32);
                Ok(self.cast(CastOp::SiToFp, wide, IrType::I32, t))
            }
            (f, t) if f.is_int() && t.is_float() => Ok(self.cast(CastOp::SiToFp, v, f, t)),
            (f, t) if f.is_float() && t.is_int() => Ok(self.cast(CastOp::FpToSi, v, f, t)),
            (IrType::F32, IrType::F64) => Ok(self.cast(CastOp::FpExt, v, IrType::F32, IrType::F64)),
            (IrType::F64, IrType::F32) => {
                Ok(self.cast(CastOp::FpTrunc, v, IrType::F64, IrType::F32))
            }
            _ => Err(invalid()),
        }
    }
}
