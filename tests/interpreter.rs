#[cfg(test)]
mod interpreter_tests {
    use rox::error::{LoxError, RuntimeError};
    use rox::value::Value;
    use rox::Interpreter;

    /// Run `source` on a fresh interpreter; returns everything printed and
    /// the outcome.
    fn run(source: &str) -> (String, rox::Result<()>) {
        let mut interpreter = Interpreter::with_output(Vec::new());
        let result = rox::run(source, &mut interpreter);
        let output = String::from_utf8(interpreter.into_output()).expect("utf-8 output");
        (output, result)
    }

    fn output_of(source: &str) -> String {
        let (output, result) = run(source);
        if let Err(e) = result {
            panic!("program failed: {}\noutput so far:\n{}", e, output);
        }
        output
    }

    fn runtime_error(source: &str) -> (String, RuntimeError) {
        match run(source) {
            (output, Err(LoxError::Runtime(e))) => (output, e),
            (_, other) => panic!("expected a runtime error, got {:?}", other),
        }
    }

    #[test]
    fn test_print_formats_values() {
        let output = output_of(
            "print 1; print 2.5; print -0.5; print \"hi\"; print true; print nil; print 10 / 4;",
        );

        assert_eq!(output, "1\n2.5\n-0.5\nhi\ntrue\nnil\n2.5\n");
    }

    #[test]
    fn test_arithmetic_and_comparison() {
        let output = output_of(
            "print 1 + 2 * 3; print (1 + 2) * 3; print 7 - 10; print 3 < 4; print 4 <= 3; \
             print 2 >= 2; print 1 == 1; print 1 != 1; print \"a\" + \"b\";",
        );

        assert_eq!(output, "7\n9\n-3\ntrue\nfalse\ntrue\ntrue\nfalse\nab\n");
    }

    #[test]
    fn test_equality_never_crosses_types() {
        let output = output_of("print nil == false; print 0 == false; print \"1\" == 1; print nil == nil;");

        assert_eq!(output, "false\nfalse\nfalse\ntrue\n");
    }

    #[test]
    fn test_truthiness_and_not() {
        let output = output_of("print !nil; print !0; print !\"\"; print !!false;");

        assert_eq!(output, "true\nfalse\nfalse\nfalse\n");
    }

    #[test]
    fn test_logical_operators_return_operands_and_short_circuit() {
        let output = output_of(
            "var hits = 0; \
             fun bump() { hits = hits + 1; return true; } \
             print nil or \"fallback\"; \
             print 1 and 2; \
             print false and bump(); \
             print true or bump(); \
             print hits;",
        );

        assert_eq!(output, "fallback\n2\nfalse\ntrue\n0\n");
    }

    #[test]
    fn test_control_flow() {
        let output = output_of(
            "var total = 0; \
             for (var i = 1; i <= 4; i = i + 1) { if (i == 3) total = total + 100; else total = total + i; } \
             print total; \
             var n = 3; while (n > 0) n = n - 1; print n;",
        );

        assert_eq!(output, "107\n0\n");
    }

    #[test]
    fn test_blocks_shadow_and_restore() {
        let output = output_of("var a = \"global\"; { var a = \"block\"; print a; } print a;");

        assert_eq!(output, "block\nglobal\n");
    }

    #[test]
    fn test_unset_var_is_nil_and_assignment_yields_value() {
        let output = output_of("var a; print a; var b; print b = 3; print b;");

        assert_eq!(output, "nil\n3\n3\n");
    }

    #[test]
    fn test_operand_type_errors() {
        let (_, err) = runtime_error("print -\"x\";");
        assert!(matches!(err, RuntimeError::NumberOperand { found: "string", .. }));

        let (_, err) = runtime_error("print 1 < nil;");
        assert!(matches!(
            err,
            RuntimeError::NumberOperands {
                operator: "<",
                left: "number",
                right: "nil",
                ..
            }
        ));

        let (_, err) = runtime_error("print 1 + \"1\";");
        assert!(matches!(err, RuntimeError::AddOperands { .. }));
    }

    #[test]
    fn test_division_by_zero() {
        let (output, err) = runtime_error("print 1;\nprint 1 / 0;\nprint 2;");

        assert_eq!(output, "1\n");
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
        assert_eq!(err.span().line, 2);
    }

    #[test]
    fn test_undefined_variable_read_and_write() {
        let (_, err) = runtime_error("print missing;");
        assert!(matches!(err, RuntimeError::UndefinedVariable { ref name, .. } if name == "missing"));
        assert_eq!(err.to_string(), "Undefined variable 'missing'.\n[line 1]");

        let (_, err) = runtime_error("missing = 1;");
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));
    }

    #[test]
    fn test_runtime_error_exit_code() {
        let (_, result) = run("print nil + 1;");

        assert_eq!(result.map_err(|e| e.exit_code()), Err(70));
    }

    #[test]
    fn test_arity_checked_before_body_runs() {
        let (output, err) = runtime_error("fun f(a, b) { print \"ran\"; } f(1);");

        assert_eq!(output, "");
        assert!(matches!(
            err,
            RuntimeError::Arity {
                expected: 2,
                found: 1,
                ..
            }
        ));
        assert!(err.to_string().starts_with("'f' expected 2 arguments but got 1."));
    }

    #[test]
    fn test_native_arity() {
        let (_, err) = runtime_error("clock(1);");

        assert!(matches!(
            err,
            RuntimeError::Arity { ref callee, expected: 0, found: 1, .. } if callee == "clock"
        ));
    }

    #[test]
    fn test_calling_a_non_callable() {
        let (_, err) = runtime_error("var x = \"not a function\"; x();");

        assert!(matches!(err, RuntimeError::NotCallable { found: "string", .. }));
    }

    #[test]
    fn test_failing_argument_aborts_the_call() {
        let (output, err) = runtime_error("fun f(a, b) { print \"ran\"; } f(print_me(), 1 / 0);");

        assert_eq!(output, "");
        assert!(matches!(err, RuntimeError::UndefinedVariable { .. }));

        let (output, err) = runtime_error("fun f(a) { print \"ran\"; } f(1 / 0);");
        assert_eq!(output, "");
        assert!(matches!(err, RuntimeError::DivisionByZero { .. }));
    }

    #[test]
    fn test_function_without_return_yields_nil() {
        let output = output_of("fun f() {} print f(); fun g() { return; } print g();");

        assert_eq!(output, "nil\nnil\n");
    }

    #[test]
    fn test_return_unwinds_loops() {
        let output = output_of(
            "fun first_over(limit) { var i = 0; while (true) { i = i + 1; if (i > limit) return i; } } \
             print first_over(5);",
        );

        assert_eq!(output, "6\n");
    }

    #[test]
    fn test_functions_print_their_names() {
        let output = output_of("fun f() {} print f; print clock; print f == f; print f == clock;");

        assert_eq!(output, "<fn f>\n<native fn clock>\ntrue\nfalse\n");
    }

    #[test]
    fn test_str_native() {
        let output = output_of("print str(12) + \"!\"; print str(nil); print str(str);");

        assert_eq!(output, "12!\nnil\n<native fn str>\n");
    }

    #[test]
    fn test_clock_native_is_positive_seconds() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        rox::run("var t = clock();", &mut interpreter).expect("runs");

        match interpreter.globals().get_global("t") {
            Ok(Value::Number(seconds)) => assert!(seconds > 1_000_000_000.0),
            other => panic!("expected a number, got {:?}", other),
        }
    }

    #[test]
    fn test_define_native() {
        fn twice(args: &[Value]) -> Result<Value, String> {
            match args {
                [Value::Number(n)] => Ok(Value::Number(n * 2.0)),
                [other] => Err(format!("cannot double a {}", other.kind())),
                _ => Err("one argument".into()),
            }
        }

        let mut interpreter = Interpreter::with_output(Vec::new());
        interpreter.define_native("twice", 1, twice);

        rox::run("print twice(21);", &mut interpreter).expect("runs");
        let err = rox::run("twice(\"x\");", &mut interpreter).unwrap_err();

        assert!(matches!(
            err,
            LoxError::Runtime(RuntimeError::Native { ref message, .. }) if message == "cannot double a string"
        ));
        assert_eq!(interpreter.output().as_slice(), b"42\n");
    }

    #[test]
    fn test_bare_interpreter_has_no_natives() {
        let mut interpreter = Interpreter::bare(Vec::new());

        let err = rox::run("clock();", &mut interpreter).unwrap_err();

        assert!(matches!(err, LoxError::Runtime(RuntimeError::UndefinedVariable { .. })));
    }

    #[test]
    fn test_interpreter_is_reusable_after_error() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        rox::run("var kept = 1;", &mut interpreter).expect("runs");
        let err = rox::run("{ var inner = 2; { print nil + 1; } }", &mut interpreter);
        assert!(err.is_err());

        // back at global scope, earlier state intact
        rox::run("var after = kept + 1; print after;", &mut interpreter).expect("runs");
        assert!(interpreter.globals().contains("after"));

        let output = String::from_utf8(interpreter.into_output()).expect("utf-8");
        assert_eq!(output, "2\n");
    }

    #[test]
    fn test_later_programs_see_earlier_functions() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        rox::run("fun add(a, b) { { var s = a + b; return s; } }", &mut interpreter).expect("runs");
        rox::run("print add(2, 3);", &mut interpreter).expect("runs");

        assert_eq!(interpreter.output().as_slice(), b"5\n");
    }

    #[test]
    fn test_top_level_functions_may_be_mutually_recursive() {
        let output = output_of(
            "fun is_even(n) { if (n == 0) return true; return is_odd(n - 1); } \
             fun is_odd(n) { if (n == 0) return false; return is_even(n - 1); } \
             print is_even(10); print is_odd(7);",
        );

        assert_eq!(output, "true\ntrue\n");
    }

    /// Run `body` on a thread with the same stack the driver gives programs.
    fn on_program_stack<T: Send + 'static>(body: impl FnOnce() -> T + Send + 'static) -> T {
        std::thread::Builder::new()
            .stack_size(64 * 1024 * 1024)
            .spawn(body)
            .expect("spawn")
            .join()
            .expect("program thread")
    }

    #[test]
    fn test_runaway_recursion_is_a_runtime_error() {
        let mut interpreter = Interpreter::with_output(Vec::new()).with_max_call_depth(64);

        let err = rox::run("fun f(n) { return f(n + 1); }\nf(0);", &mut interpreter).unwrap_err();

        assert!(matches!(
            err,
            LoxError::Runtime(RuntimeError::StackOverflow { depth: 64, .. })
        ));
        assert_eq!(err.exit_code(), 70);
        assert_eq!(
            err.to_string(),
            "Stack overflow: more than 64 nested calls.\n[line 1]"
        );

        // the depth counter unwound with the error
        rox::run(
            "fun g(n) { if (n == 0) return 0; return g(n - 1) + 1; } print g(60);",
            &mut interpreter,
        )
        .expect("runs after overflow");
        assert_eq!(interpreter.output().as_slice(), b"60\n");
    }

    #[test]
    fn test_depth_limit_counts_nesting_not_total_calls() {
        let mut interpreter = Interpreter::with_output(Vec::new()).with_max_call_depth(8);

        rox::run(
            "fun one() { return 1; } var total = 0; \
             for (var i = 0; i < 100; i = i + 1) total = total + one(); print total;",
            &mut interpreter,
        )
        .expect("runs");

        assert_eq!(interpreter.output().as_slice(), b"100\n");
    }

    #[test]
    fn test_default_depth_limit_on_program_stack() {
        let (deep, runaway) = on_program_stack(|| {
            let deep = run("fun f(n) { if (n == 0) return 0; return f(n - 1) + 1; } print f(900);");
            let runaway = run("fun f(n) { return f(n + 1); } f(0);");
            (
                deep.0,
                runaway.1.map_err(|e| matches!(e, LoxError::Runtime(RuntimeError::StackOverflow { .. }))),
            )
        });

        assert_eq!(deep, "900\n");
        assert_eq!(runaway, Err(true));
    }

    #[test]
    fn test_overflowing_numbers_print_as_infinity() {
        let output = output_of(
            "var big = 10; for (var i = 0; i < 400; i = i + 1) big = big * 10; \
             print big; print -big; print big - big;",
        );

        assert_eq!(output, "Infinity\n-Infinity\nNaN\n");
    }

    #[test]
    fn test_bindings_accumulate_across_programs() {
        let mut interpreter = Interpreter::with_output(Vec::new());

        rox::run("fun twice(x) { return x + x; }", &mut interpreter).expect("runs");
        let after_first = interpreter.bindings().len();
        rox::run("{ var y = 2; print twice(y); }", &mut interpreter).expect("runs");

        assert!(after_first > 0);
        assert!(interpreter.bindings().len() > after_first);
        assert_eq!(interpreter.output().as_slice(), b"4\n");
    }
}
