// ABOUTME: Comprehensive integration tests verifying all pipeline stages work together

use lox::error::Reporter;
use lox::eval::Interpreter;
use lox::parser::Parser;
use lox::resolver::Resolver;
use lox::scanner::Scanner;
use lox::value::Value;

/// Runs the full scan → parse → resolve → interpret pipeline and reports
/// whether a compile or runtime error occurred.
fn run(src: &str) -> (bool, bool) {
    let reporter = Reporter::new();
    let tokens = Scanner::new(src).scan_tokens(&reporter);
    let statements = Parser::new(tokens, &reporter).parse();

    if reporter.had_compile_error() {
        return (true, false);
    }

    let locals = Resolver::new(&reporter).resolve(&statements);
    if reporter.had_compile_error() {
        return (true, false);
    }

    let mut interpreter = Interpreter::new(locals, &reporter);
    interpreter.run(&statements);
    (reporter.had_compile_error(), reporter.had_runtime_error())
}

/// Evaluates a single expression statement and returns its value, bypassing
/// stdout (used for tests that want to inspect the actual `Value`, not its
/// printed form).
fn eval_expr(src: &str) -> Value {
    let reporter = Reporter::new();
    let tokens = Scanner::new(src).scan_tokens(&reporter);
    let statements = Parser::new(tokens, &reporter).parse();
    assert!(!reporter.had_compile_error(), "unexpected compile error in {src:?}");

    let locals = Resolver::new(&reporter).resolve(&statements);
    assert!(!reporter.had_compile_error(), "unexpected resolve error in {src:?}");

    let mut interpreter = Interpreter::new(locals, &reporter);
    match &statements[0] {
        lox::ast::Stmt::Expression(expr) => {
            let value = interpreter.evaluate(expr).expect("unexpected runtime error");
            assert!(!reporter.had_runtime_error());
            value
        }
        other => panic!("expected a single expression statement, got {other:?}"),
    }
}

#[test]
fn factorial_via_recursion() {
    let (compile_err, runtime_err) = run(
        "fun factorial(n) { if (n <= 1) return 1; return n * factorial(n - 1); }\n\
         var r = factorial(5);\n\
         if (r != 120) print \"wrong\"; else print \"ok\";",
    );
    assert!(!compile_err && !runtime_err);
}

#[test]
fn fibonacci_via_recursion() {
    assert!(matches!(
        eval_expr(
            "fun fib(n) { if (n < 2) return n; return fib(n - 1) + fib(n - 2); } fib(10);"
        ),
        Value::Number(n) if n == 55.0
    ));
}

#[test]
fn closure_counter_increments_shared_state() {
    let (compile_err, runtime_err) = run(
        "fun make() { var i = 0; fun inc() { i = i + 1; return i; } return inc; }\n\
         var c = make();\n\
         var first = c();\n\
         var second = c();\n\
         if (first != 1) print \"first wrong\";\n\
         if (second != 2) print \"second wrong\";",
    );
    assert!(!compile_err && !runtime_err);
}

#[test]
fn class_method_dispatch() {
    let (compile_err, runtime_err) = run(
        "class A { greet() { print \"hi\"; } } A().greet();",
    );
    assert!(!compile_err && !runtime_err);
}

#[test]
fn single_inheritance_with_super_call() {
    assert!(matches!(
        eval_expr(
            "class A { f() { return \"A\"; } } \
             class B < A { f() { return super.f() + \"B\"; } } \
             B().f();"
        ),
        Value::Str(s) if s == "AB"
    ));
}

#[test]
fn closure_over_shadowed_variable_keeps_definition_site_binding() {
    assert!(matches!(
        eval_expr(
            "var a = \"outer\"; var f; { fun g() { return a; } var a = \"inner\"; f = g; } f();"
        ),
        Value::Str(s) if s == "outer"
    ));
}

#[test]
fn string_plus_number_is_a_runtime_type_error() {
    let (compile_err, runtime_err) = run("print \"a\" + 1;");
    assert!(!compile_err);
    assert!(runtime_err);
}

#[test]
fn bare_return_yields_nil() {
    assert!(matches!(
        eval_expr("fun f() { return; } f();"),
        Value::Nil
    ));
}

#[test]
fn initializer_always_returns_bound_instance_even_on_bare_return() {
    let (compile_err, runtime_err) = run(
        "class Counter { init() { this.n = 0; return; } }\n\
         var c = Counter();\n\
         if (c.n != 0) print \"wrong\";",
    );
    assert!(!compile_err && !runtime_err);
}

#[test]
fn subclass_inherits_parent_initializer_when_not_overridden() {
    let (compile_err, runtime_err) = run(
        "class A { init(x) { this.x = x; } }\n\
         class B < A {}\n\
         var b = B(7);\n\
         if (b.x != 7) print \"wrong\";",
    );
    assert!(!compile_err && !runtime_err);
}

#[test]
fn for_loop_desugars_and_runs_to_completion() {
    assert!(matches!(
        eval_expr(
            "var sum = 0; for (var i = 0; i < 5; i = i + 1) { sum = sum + i; } sum;"
        ),
        Value::Number(n) if n == 10.0
    ));
}

#[test]
fn logical_operators_short_circuit_and_preserve_value() {
    assert!(matches!(eval_expr("nil or \"fallback\";"), Value::Str(s) if s == "fallback"));
    assert!(matches!(eval_expr("1 and 2;"), Value::Number(n) if n == 2.0));
}

#[test]
fn arity_mismatch_is_a_runtime_error() {
    let (compile_err, runtime_err) = run("fun f(a, b) { return a + b; } f(1);");
    assert!(!compile_err);
    assert!(runtime_err);
}

#[test]
fn calling_a_non_callable_is_a_runtime_error() {
    let (compile_err, runtime_err) = run("var x = 1; x();");
    assert!(!compile_err);
    assert!(runtime_err);
}

#[test]
fn accessing_a_field_on_a_non_instance_is_a_runtime_error() {
    let (compile_err, runtime_err) = run("var x = 1; print x.y;");
    assert!(!compile_err);
    assert!(runtime_err);
}

#[test]
fn inheriting_from_a_non_class_is_a_runtime_error() {
    let (compile_err, runtime_err) = run("var NotAClass = 1; class B < NotAClass {}");
    assert!(!compile_err);
    assert!(runtime_err);
}

#[test]
fn parser_recovers_and_surfaces_multiple_syntax_errors() {
    // Missing semicolon after the first declaration; the parser should
    // synchronize and still parse the second one rather than giving up.
    let reporter = Reporter::new();
    let tokens = Scanner::new("var a = 1 var b = 2;").scan_tokens(&reporter);
    let statements = Parser::new(tokens, &reporter).parse();
    assert!(reporter.had_compile_error());
    assert_eq!(statements.len(), 1);
}
