//! End-to-end tests: source string → compile() → structural assertions on
//! the emitted LLVM IR text.

use minicc::diagnostics::render_error;
use minicc::error::{Error, LowerError};
use minicc::lower::LowerCtx;
use minicc::parser::parse::Parser;
use minicc::{compile, Options};

fn compile_ok(src: &str) -> String {
    compile(src, "test", Options::default()).expect("compile should succeed")
}

fn compile_err(src: &str) -> Error {
    compile(src, "test", Options::default()).expect_err("compile should fail")
}

// ---------------------------------------------------------------------------
// End-to-end scenarios
// ---------------------------------------------------------------------------

#[test]
fn test_add_function() {
    let out = compile_ok("int add(int a, int b) { return a + b; }");
    assert!(out.contains("define i32 @add(i32 %a, i32 %b)"));
    assert_eq!(out.matches("alloca i32").count(), 2, "two parameter slots");
    assert_eq!(out.matches("store i32").count(), 2, "parameters stored");
    assert!(out.contains(" = add i32 "));
    assert!(out.contains("ret i32 %"));
}

#[test]
fn test_max_if_else() {
    let out = compile_ok("int max(int a, int b) { if (a > b) { return a; } else { return b; } }");
    assert!(out.contains("icmp sgt i32"));
    assert!(out.contains("br i1 "));
    // One edge into each arm.
    assert_eq!(out.matches("label %then1").count(), 1);
    assert_eq!(out.matches("label %else2").count(), 1);
    // Both arms return; the continuation block exists but is unreachable and
    // holds only the synthesized return.
    assert!(out.contains("ifcont3:"));
    assert_eq!(out.matches("ret i32").count(), 3);
}

#[test]
fn test_sum_while_loop() {
    let out = compile_ok(
        "int sum(int n) { int s = 0; int i = 1; while (i < n) { s = s + i; i = i + 1; } return s; }",
    );
    assert!(out.contains("while.cond1:"));
    assert!(out.contains("while.body2:"));
    assert!(out.contains("while.exit3:"));
    // Two predecessors of the condition block: entry and the body back-edge.
    assert_eq!(out.matches("br label %while.cond1").count(), 2);
    assert!(out.contains("icmp slt i32"));
    // The return lives after the exit label.
    let exit_at = out.find("while.exit3:").expect("exit label");
    let ret_at = out.rfind("ret i32").expect("return");
    assert!(ret_at > exit_at);
}

#[test]
fn test_recursive_factorial() {
    let out = compile_ok("int fact(int n) { if (n < 2) { return 1; } return n * fact(n - 1); }");
    assert!(out.contains("call i32 @fact(i32 "), "self-call resolves");
    // The fall-through return sits in the continuation block after the if.
    let cont_at = out.find("ifcont2:").expect("continuation label");
    let mul_at = out.find(" = mul i32").expect("multiply");
    assert!(mul_at > cont_at);
}

#[test]
fn test_extern_putchar() {
    let out = compile_ok("extern int putchar(int c); int main() { putchar(65); return 0; }");
    assert!(out.contains("declare i32 @putchar(i32)"));
    assert!(out.contains("call i32 @putchar(i32 65)"));
}

#[test]
fn test_unknown_variable_leaves_no_partial_function() {
    let src = "int bad() { return 1 + x; }";
    let err = compile_err(src);
    assert!(matches!(
        err,
        Error::Lower(LowerError::UnknownVariable { ref name, .. }) if name == "x"
    ));

    // Lower through the incremental context to observe the module state.
    let program = Parser::from_source(src).parse_program().expect("parses");
    let mut ctx = LowerCtx::new("test");
    assert!(ctx.lower_decl(&program.decls[0]).is_err());
    assert!(ctx.module().function_by_name("bad").is_none());
    assert!(ctx.module().functions().is_empty());
}

// ---------------------------------------------------------------------------
// Boundary behaviors
// ---------------------------------------------------------------------------

#[test]
fn test_empty_body_synthesizes_return() {
    let out = compile_ok("void f() { }");
    assert!(out.contains("define void @f()"));
    assert!(out.contains("entry:"));
    assert!(out.contains("ret void"));

    let out = compile_ok("int g() { }");
    assert!(out.contains("ret i32 0"));

    let out = compile_ok("double h() { }");
    assert!(out.contains("ret double 0.0e+00"));
}

#[test]
fn test_while_true_empty_body() {
    let out = compile_ok("int spin() { while (1) { } }");
    assert!(out.contains("icmp ne i32 1, 0"));
    // The exit block exists even though it is unreachable.
    assert!(out.contains("while.exit3:"));
    // Body loops straight back to the condition.
    assert_eq!(out.matches("br label %while.cond1").count(), 2);
}

#[test]
fn test_dead_code_after_return_is_skipped() {
    let out = compile_ok("int f() { return 1; return 2; }");
    assert!(out.contains("ret i32 1"));
    assert!(!out.contains("ret i32 2"));
    assert_eq!(out.matches("ret i32").count(), 1);
}

#[test]
fn test_extern_collision_with_definition_is_fatal() {
    let err = compile_err("extern int foo(int a); int foo(int a) { return a; }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::DuplicateFunction { ref name, .. }) if name == "foo"
    ));
}

#[test]
fn test_break_targets_innermost_loop_exit() {
    let out = compile_ok("int f() { while (1) { break; } return 0; }");
    // while blocks are cond=1, body=2, exit=3.
    assert!(out.contains("br label %while.exit3"));
}

#[test]
fn test_continue_targets_for_step_block() {
    let out = compile_ok("int f() { for (int i = 0; i < 9; i = i + 1) { continue; } return 0; }");
    assert!(out.contains("for.cond1:"));
    assert!(out.contains("for.body2:"));
    assert!(out.contains("for.step3:"));
    assert!(out.contains("for.exit4:"));
    // The continue terminates the body, so exactly one edge reaches the
    // step block.
    assert_eq!(out.matches("br label %for.step3").count(), 1);
}

#[test]
fn test_nested_loop_break_is_inner() {
    let out = compile_ok(
        "int f() { while (1) { while (2) { break; } return 1; } return 0; }",
    );
    // Outer while: cond=1 body=2 exit=3; inner while: cond=4 body=5 exit=6.
    assert!(out.contains("br label %while.exit6"));
}

// ---------------------------------------------------------------------------
// Promotion policy
// ---------------------------------------------------------------------------

#[test]
fn test_int_plus_double_promotes_to_double() {
    let out = compile_ok("double f(int a, double d) { return a + d; }");
    assert!(out.contains("sitofp i32"));
    assert!(out.contains("fadd double"));
    assert!(out.contains("ret double"));
}

#[test]
fn test_float_plus_double_promotes_to_double() {
    let out = compile_ok("double f(float x, double d) { return x + d; }");
    assert!(out.contains("fpext float"));
    assert!(out.contains("fadd double"));
}

#[test]
fn test_char_sign_extends_to_int() {
    let out = compile_ok("int f(char c) { return c + 1; }");
    assert!(out.contains("sext i8"));
    assert!(out.contains("add i32"));
}

#[test]
fn test_bool_zero_extends_before_arithmetic() {
    let out = compile_ok("int f(bool b) { return b + 1; }");
    assert!(out.contains("zext i1"));
    assert!(out.contains("add i32"));
}

#[test]
fn test_store_narrowing_at_declared_slot() {
    let out = compile_ok("int f(double d) { int x = d; return x; }");
    assert!(out.contains("fptosi double"));
}

#[test]
fn test_comparison_widens_to_i32() {
    let out = compile_ok("int f(int a, int b) { return a < b; }");
    assert!(out.contains("icmp slt i32"));
    assert!(out.contains("zext i1"));
    assert!(out.contains("ret i32"));
}

#[test]
fn test_float_comparison_uses_unordered_predicates() {
    let out = compile_ok("int f(double a, double b) { return a < b; }");
    assert!(out.contains("fcmp ult double"));
}

#[test]
fn test_logical_ops_are_eager_bitwise() {
    let out = compile_ok("int f(int a, int b) { return a && b; }");
    // Both operands normalized, combined with a plain `and`, widened.
    assert_eq!(out.matches("icmp ne i32").count(), 2);
    assert!(out.contains("and i1"));
    assert!(out.contains("zext i1"));

    let out = compile_ok("int f(int a, int b) { return a || b; }");
    assert!(out.contains("or i1"));
}

#[test]
fn test_unary_operators() {
    let out = compile_ok("int f(int a) { return -a; }");
    assert!(out.contains("sub i32 0, "));

    let out = compile_ok("double f(double d) { return -d; }");
    assert!(out.contains("fneg double"));

    let out = compile_ok("int f(int a) { return !a; }");
    assert!(out.contains("icmp ne i32"));
    assert!(out.contains("icmp eq i1"));

    let out = compile_ok("int f(int a) { return ~a; }");
    assert!(out.contains("xor i32 "));
}

#[test]
fn test_bitwise_on_float_is_rejected() {
    let err = compile_err("double f(double d) { return ~d; }");
    assert!(matches!(err, Error::Lower(LowerError::InvalidOperand { .. })));

    let err = compile_err("double f(double d) { return d << 1; }");
    assert!(matches!(err, Error::Lower(LowerError::InvalidOperand { .. })));
}

// ---------------------------------------------------------------------------
// Strings and indexing
// ---------------------------------------------------------------------------

#[test]
fn test_string_literal_becomes_interned_global() {
    let out = compile_ok("int f() { \"hello\"; return 0; }");
    assert!(out.contains(
        "@.str.0 = private unnamed_addr constant [6 x i8] c\"hello\\00\", align 1"
    ));
}

#[test]
fn test_identical_strings_share_one_global() {
    let out = compile_ok("int f() { \"dup\"; \"dup\"; return 0; }");
    assert_eq!(out.matches("@.str.").count(), 1);
}

#[test]
fn test_indexing_non_pointer_is_fatal() {
    let err = compile_err("int f(int a) { return a[0]; }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::NotIndexable { ref name, .. }) if name == "a"
    ));
}

// ---------------------------------------------------------------------------
// Resolution and arity errors
// ---------------------------------------------------------------------------

#[test]
fn test_unknown_function_is_fatal() {
    let err = compile_err("int f() { return g(); }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::UnknownFunction { ref name, .. }) if name == "g"
    ));
}

#[test]
fn test_arity_mismatch_is_fatal() {
    let err = compile_err("extern int putchar(int c); int f() { return putchar(1, 2); }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::ArityMismatch {
            expected: 1,
            found: 2,
            ..
        })
    ));
}

#[test]
fn test_break_outside_loop_is_fatal() {
    let err = compile_err("int f() { break; }");
    assert!(matches!(err, Error::Lower(LowerError::BreakOutsideLoop { .. })));

    let err = compile_err("int f() { continue; }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::ContinueOutsideLoop { .. })
    ));
}

#[test]
fn test_return_type_discipline() {
    let err = compile_err("void f() { return 1; }");
    assert!(matches!(err, Error::Lower(LowerError::ReturnValueInVoid { .. })));

    let err = compile_err("int f() { return; }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::MissingReturnValue { .. })
    ));
}

#[test]
fn test_void_call_used_as_value_is_fatal() {
    let err = compile_err("extern void halt(); int f() { return halt(); }");
    assert!(matches!(err, Error::Lower(LowerError::VoidValue { .. })));
}

#[test]
fn test_return_value_converts_to_return_type() {
    let out = compile_ok("double f() { return 1; }");
    assert!(out.contains("sitofp i32 1 to double"));
    assert!(out.contains("ret double"));
}

#[test]
fn test_shadowing_inner_scope_wins_then_expires() {
    let out = compile_ok(
        "int f() { int x = 1; { double x = 2.5; x = 3.0; } return x; }",
    );
    // The inner assignment stores a double, the return loads the outer i32.
    assert!(out.contains("store double"));
    assert!(out.contains("ret i32"));
}

#[test]
fn test_scope_expires_with_block() {
    let err = compile_err("int f() { { int y = 1; } return y; }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::UnknownVariable { ref name, .. }) if name == "y"
    ));
}

#[test]
fn test_for_header_scope_expires() {
    let err = compile_err("int f() { for (int i = 0; i < 3; i = i + 1) { } return i; }");
    assert!(matches!(
        err,
        Error::Lower(LowerError::UnknownVariable { ref name, .. }) if name == "i"
    ));
}

// ---------------------------------------------------------------------------
// Incremental lowering (interactive driver contract)
// ---------------------------------------------------------------------------

#[test]
fn test_incremental_lowering_persists_signatures() {
    let src = "extern int putchar(int c); int twice(int x) { return x * 2; } \
               int main() { putchar(twice(33)); return 0; }";
    let program = Parser::from_source(src).parse_program().expect("parses");
    let mut ctx = LowerCtx::new("interactive");

    assert_eq!(ctx.lower_decl(&program.decls[0]).expect("extern"), None);
    assert!(ctx.lower_decl(&program.decls[1]).expect("twice").is_some());
    assert!(ctx.lower_decl(&program.decls[2]).expect("main").is_some());

    let module = ctx.finish();
    assert!(module.extern_by_name("putchar").is_some());
    assert!(module.function_by_name("twice").is_some());
    assert!(module.function_by_name("main").is_some());
}

#[test]
fn test_failed_decl_can_be_retried() {
    let mut ctx = LowerCtx::new("interactive");
    let bad = Parser::from_source("int f() { return q; }")
        .parse_program()
        .expect("parses");
    assert!(ctx.lower_decl(&bad.decls[0]).is_err());

    // The failed attempt left no trace, so the name is free again.
    let good = Parser::from_source("int f() { return 7; }")
        .parse_program()
        .expect("parses");
    assert!(ctx.lower_decl(&good.decls[0]).is_ok());
    assert!(ctx.module().function_by_name("f").is_some());
}

// ---------------------------------------------------------------------------
// Diagnostics
// ---------------------------------------------------------------------------

#[test]
fn test_error_rendering_is_single_line_with_position() {
    let err = compile_err("int bad() { return 1 + x; }");
    let rendered = render_error(&err);
    assert_eq!(rendered, "error: unknown variable 'x' at line 1, column 24");
    assert!(!rendered.contains('\n'));
}

#[test]
fn test_lex_error_position() {
    let err = compile_err("int f() {\n  return 1 $ 2;\n}");
    let rendered = render_error(&err);
    assert!(rendered.contains("at line 2, column 12"), "{}", rendered);
}
