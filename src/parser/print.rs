//! AST pretty-printer backing the `--ast` mode.
//!
//! Output is an indented tree, one node per line, deterministic for a given
//! program.

use std::fmt::Write;

use crate::error::CodegenError;
use crate::parser::ast::{Decl, Expr, Program, Stmt};

pub fn emit_ast_text(program: &Program) -> Result<String, CodegenError> {
    let mut out = String::new();
    for decl in &program.decls {
        emit_decl(&mut out, decl)?;
    }
    Ok(out)
}

fn indent(out: &mut String, depth: usize) {
    for _ in 0..depth {
        out.push_str("  ");
    }
}

fn emit_decl(out: &mut String, decl: &Decl) -> Result<(), CodegenError> {
    match decl {
        Decl::Extern {
            return_ty,
            name,
            params,
            ..
        } => {
            write!(out, "extern {} {}(", return_ty, name.name)?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write!(out, "{} {}", p.ty, p.name.name)?;
            }
            writeln!(out, ")")?;
        }
        Decl::Function {
            return_ty,
            name,
            params,
            body,
            ..
        } => {
            write!(out, "function {} {}(", return_ty, name.name)?;
            for (i, p) in params.iter().enumerate() {
                if i > 0 {
                    write!(out, ", ")?;
                }
                write!(out, "{} {}", p.ty, p.name.name)?;
            }
            writeln!(out, ")")?;
            emit_stmt(out, body, 1)?;
        }
    }
    Ok(())
}

fn emit_stmt(out: &mut String, stmt: &Stmt, depth: usize) -> Result<(), CodegenError> {
    indent(out, depth);
    match stmt {
        Stmt::VarDecl { ty, name, init, .. } => {
            writeln!(out, "var {} {}", ty, name.name)?;
            if let Some(init) = init {
                emit_expr(out, init, depth + 1)?;
            }
        }
        Stmt::Expr(expr) => {
            writeln!(out, "expr")?;
            emit_expr(out, expr, depth + 1)?;
        }
        Stmt::If {
            cond,
            then_branch,
            else_branch,
            ..
        } => {
            writeln!(out, "if")?;
            emit_expr(out, cond, depth + 1)?;
            emit_stmt(out, then_branch, depth + 1)?;
            if let Some(else_branch) = else_branch {
                indent(out, depth);
                writeln!(out, "else")?;
                emit_stmt(out, else_branch, depth + 1)?;
            }
        }
        Stmt::While { cond, body, .. } => {
            writeln!(out, "while")?;
            emit_expr(out, cond, depth + 1)?;
            emit_stmt(out, body, depth + 1)?;
        }
        Stmt::For {
            init,
            cond,
            step,
            body,
            ..
        } => {
            writeln!(out, "for")?;
            if let Some(init) = init {
                emit_stmt(out, init, depth + 1)?;
            }
            if let Some(cond) = cond {
                emit_expr(out, cond, depth + 1)?;
            }
            if let Some(step) = step {
                emit_expr(out, step, depth + 1)?;
            }
            emit_stmt(out, body, depth + 1)?;
        }
        Stmt::Return { value, .. } => {
            writeln!(out, "return")?;
            if let Some(value) = value {
                emit_expr(out, value, depth + 1)?;
            }
        }
        Stmt::Break { .. } => writeln!(out, "break")?,
        Stmt::Continue { .. } => writeln!(out, "continue")?,
        Stmt::Block { stmts, .. } => {
            writeln!(out, "block")?;
            for stmt in stmts {
                emit_stmt(out, stmt, depth + 1)?;
            }
        }
    }
    Ok(())
}

fn emit_expr(out: &mut String, expr: &Expr, depth: usize) -> Result<(), CodegenError> {
    indent(out, depth);
    match expr {
        Expr::IntLit { value, .. } => writeln!(out, "int {}", value)?,
        Expr::FloatLit { value, .. } => writeln!(out, "float {}", value)?,
        Expr::StrLit { value, .. } => {
            writeln!(out, "string \"{}\"", String::from_utf8_lossy(value))?
        }
        Expr::CharLit { value, .. } => writeln!(out, "char '{}'", *value as char)?,
        Expr::BoolLit { value, .. } => writeln!(out, "bool {}", value)?,
        Expr::Var(ident) => writeln!(out, "var {}", ident.name)?,
        Expr::Binary { op, lhs, rhs, .. } => {
            writeln!(out, "binary {}", op)?;
            emit_expr(out, lhs, depth + 1)?;
            emit_expr(out, rhs, depth + 1)?;
        }
        Expr::Unary {
            op,
            operand,
            postfix,
            ..
        } => {
            writeln!(out, "unary {}{}", op, if *postfix { " (postfix)" } else { "" })?;
            emit_expr(out, operand, depth + 1)?;
        }
        Expr::Call { callee, args, .. } => {
            writeln!(out, "call {}", callee.name)?;
            for arg in args {
                emit_expr(out, arg, depth + 1)?;
            }
        }
        Expr::Assign { target, value, .. } => {
            writeln!(out, "assign {}", target.name)?;
            emit_expr(out, value, depth + 1)?;
        }
        Expr::Index { base, index, .. } => {
            writeln!(out, "index {}", base.name)?;
            emit_expr(out, index, depth + 1)?;
        }
    }
    Ok(())
}
