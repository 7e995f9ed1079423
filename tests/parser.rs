//! Parser tests: precedence, associativity, statement forms, parse errors.

use minicc::error::{Error, ParseError};
use minicc::parser::ast::{BinOp, Decl, Expr, Stmt, UnaryOp};
use minicc::parser::parse::Parser;

fn parse_ok(src: &str) -> minicc::parser::ast::Program {
    Parser::from_source(src)
        .parse_program()
        .expect("parse should succeed")
}

fn parse_expr(src: &str) -> Expr {
    let program = parse_ok(&format!("int f() {{ return {}; }}", src));
    let Decl::Function { body, .. } = &program.decls[0] else {
        panic!("expected a function");
    };
    let Stmt::Block { stmts, .. } = body else {
        panic!("expected a block body");
    };
    let Stmt::Return { value: Some(v), .. } = &stmts[0] else {
        panic!("expected a return statement");
    };
    (**v).clone()
}

fn parse_err(src: &str) -> Error {
    Parser::from_source(src)
        .parse_program()
        .expect_err("parse should fail")
}

#[test]
fn test_mul_binds_tighter_than_add() {
    let e = parse_expr("1 + 2 * 3");
    let Expr::Binary { op: BinOp::Add, rhs, .. } = e else {
        panic!("expected + at the top: {:?}", e);
    };
    assert!(matches!(*rhs, Expr::Binary { op: BinOp::Mul, .. }));
}

#[test]
fn test_comparison_binds_tighter_than_equality() {
    let e = parse_expr("1 < 2 == 3 < 4");
    let Expr::Binary { op: BinOp::Eq, lhs, rhs, .. } = e else {
        panic!("expected == at the top: {:?}", e);
    };
    assert!(matches!(*lhs, Expr::Binary { op: BinOp::Lt, .. }));
    assert!(matches!(*rhs, Expr::Binary { op: BinOp::Lt, .. }));
}

#[test]
fn test_shift_binds_looser_than_add() {
    let e = parse_expr("1 << 2 + 3");
    let Expr::Binary { op: BinOp::Shl, rhs, .. } = e else {
        panic!("expected << at the top: {:?}", e);
    };
    assert!(matches!(*rhs, Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn test_bitwise_precedence_chain() {
    // a | b ^ c & d  parses as  a | (b ^ (c & d))
    let e = parse_expr("a | b ^ c & d");
    let Expr::Binary { op: BinOp::BitOr, rhs, .. } = e else {
        panic!("expected | at the top: {:?}", e);
    };
    let Expr::Binary { op: BinOp::BitXor, rhs, .. } = *rhs else {
        panic!("expected ^ under |");
    };
    assert!(matches!(*rhs, Expr::Binary { op: BinOp::BitAnd, .. }));
}

#[test]
fn test_left_associativity() {
    // 10 - 4 - 3 parses as (10 - 4) - 3
    let e = parse_expr("10 - 4 - 3");
    let Expr::Binary { op: BinOp::Sub, lhs, rhs, .. } = e else {
        panic!("expected - at the top");
    };
    assert!(matches!(*lhs, Expr::Binary { op: BinOp::Sub, .. }));
    assert!(matches!(*rhs, Expr::IntLit { value: 3, .. }));
}

#[test]
fn test_assignment_is_right_associative() {
    let program = parse_ok("int f() { a = b = 1; }");
    let Decl::Function { body, .. } = &program.decls[0] else {
        panic!();
    };
    let Stmt::Block { stmts, .. } = body else { panic!() };
    let Stmt::Expr(e) = &stmts[0] else {
        panic!("expected expression statement");
    };
    let Expr::Assign { target, value, .. } = &**e else {
        panic!("expected assignment");
    };
    assert_eq!(target.name, "a");
    assert!(matches!(&**value, Expr::Assign { .. }));
}

#[test]
fn test_assignment_to_non_name_is_rejected() {
    let err = parse_err("int f() { 1 = x; }");
    assert!(matches!(err, Error::Parse(ParseError::UnexpectedToken { .. })));
}

#[test]
fn test_prefix_and_postfix_unary() {
    let e = parse_expr("-~x");
    let Expr::Unary { op: UnaryOp::Neg, operand, postfix: false, .. } = e else {
        panic!("expected prefix neg");
    };
    assert!(matches!(
        *operand,
        Expr::Unary { op: UnaryOp::BitNot, .. }
    ));

    let e = parse_expr("x++");
    assert!(matches!(
        e,
        Expr::Unary { op: UnaryOp::Inc, postfix: true, .. }
    ));
}

#[test]
fn test_call_and_index_postfix() {
    let e = parse_expr("f(1, 2 + 3)");
    let Expr::Call { callee, args, .. } = e else {
        panic!("expected call");
    };
    assert_eq!(callee.name, "f");
    assert_eq!(args.len(), 2);

    let e = parse_expr("s[i + 1]");
    let Expr::Index { base, index, .. } = e else {
        panic!("expected index");
    };
    assert_eq!(base.name, "s");
    assert!(matches!(*index, Expr::Binary { op: BinOp::Add, .. }));
}

#[test]
fn test_dangling_else_binds_to_nearest_if() {
    let program = parse_ok("int f() { if (a) if (b) x = 1; else x = 2; }");
    let Decl::Function { body, .. } = &program.decls[0] else {
        panic!();
    };
    let Stmt::Block { stmts, .. } = body else { panic!() };
    let Stmt::If { else_branch: outer_else, then_branch, .. } = &stmts[0] else {
        panic!("expected if");
    };
    assert!(outer_else.is_none(), "else must bind to the inner if");
    let Stmt::If { else_branch: inner_else, .. } = &**then_branch else {
        panic!("expected nested if");
    };
    assert!(inner_else.is_some());
}

#[test]
fn test_for_statement_forms() {
    // All three clauses present, init as a declaration.
    let program = parse_ok("int f() { for (int i = 0; i < 10; i++) x = x + i; }");
    let Decl::Function { body, .. } = &program.decls[0] else {
        panic!();
    };
    let Stmt::Block { stmts, .. } = body else { panic!() };
    let Stmt::For { init, cond, step, .. } = &stmts[0] else {
        panic!("expected for");
    };
    assert!(matches!(init.as_deref(), Some(Stmt::VarDecl { .. })));
    assert!(cond.is_some());
    assert!(step.is_some());

    // All clauses empty.
    let program = parse_ok("int f() { for (;;) break; }");
    let Decl::Function { body, .. } = &program.decls[0] else {
        panic!();
    };
    let Stmt::Block { stmts, .. } = body else { panic!() };
    let Stmt::For { init, cond, step, .. } = &stmts[0] else {
        panic!("expected for");
    };
    assert!(init.is_none() && cond.is_none() && step.is_none());
}

#[test]
fn test_extern_declaration() {
    let program = parse_ok("extern int putchar(int c);");
    let Decl::Extern { name, params, .. } = &program.decls[0] else {
        panic!("expected extern");
    };
    assert_eq!(name.name, "putchar");
    assert_eq!(params.len(), 1);
}

#[test]
fn test_statements_in_source_order() {
    let program = parse_ok("int f() { int a = 1; a = 2; return a; }");
    let Decl::Function { body, .. } = &program.decls[0] else {
        panic!();
    };
    let Stmt::Block { stmts, .. } = body else { panic!() };
    assert_eq!(stmts.len(), 3);
    assert!(matches!(stmts[0], Stmt::VarDecl { .. }));
    assert!(matches!(stmts[1], Stmt::Expr(_)));
    assert!(matches!(stmts[2], Stmt::Return { .. }));
}

#[test]
fn test_missing_semicolon_reports_position() {
    let err = parse_err("int f() {\n  return 1\n}");
    let Error::Parse(ParseError::UnexpectedToken { expected, found, pos }) = err else {
        panic!("expected a parse error");
    };
    assert!(expected.contains(';'), "expected set was {:?}", expected);
    assert_eq!(found, "}");
    assert_eq!(pos.line, 3);
}

#[test]
fn test_unexpected_eof() {
    let err = parse_err("int f() { return 1;");
    assert!(matches!(err, Error::Parse(ParseError::UnexpectedEof { .. })));
}

#[test]
fn test_child_positions_non_decreasing() {
    let program = parse_ok("int f(int a) {\n  return a + 1;\n}");
    let Decl::Function { body, pos, .. } = &program.decls[0] else {
        panic!();
    };
    let Stmt::Block { stmts, pos: block_pos, .. } = body else {
        panic!()
    };
    assert!(block_pos >= pos);
    let ret_pos = stmts[0].pos();
    assert!(ret_pos >= *block_pos);
    let Stmt::Return { value: Some(v), .. } = &stmts[0] else {
        panic!()
    };
    assert!(v.pos() >= ret_pos);
}
