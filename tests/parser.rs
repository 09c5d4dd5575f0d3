#[cfg(test)]
mod parser_tests {
    use rox::ast::{BinaryOp, Expr, LiteralValue, Stmt};
    use rox::ast_printer::AstPrinter;
    use rox::error::LoxError;
    use rox::parser::Parser;

    fn print_program(source: &str) -> Vec<String> {
        let statements = rox::parse_program(source).expect("program should parse");
        statements.iter().map(AstPrinter::print_stmt).collect()
    }

    fn parse_expr(source: &str) -> Expr {
        let tokens = rox::tokenize(source).expect("source should scan");
        Parser::new(&tokens)
            .parse_expression()
            .expect("expression should parse")
    }

    #[test]
    fn test_precedence_and_grouping() {
        let expr = parse_expr("1 + 2 * (3 - 4) == !false");

        assert_eq!(
            AstPrinter::print(&expr),
            "(== (+ 1.0 (* 2.0 (group (- 3.0 4.0)))) (! false))"
        );
    }

    #[test]
    fn test_logical_operators_nest_or_over_and() {
        let expr = parse_expr("a or b and c");

        assert_eq!(AstPrinter::print(&expr), "(or a (and b c))");
    }

    #[test]
    fn test_assignment_is_right_associative() {
        let expr = parse_expr("a = b = 3");

        assert_eq!(AstPrinter::print(&expr), "(= a (= b 3.0))");
    }

    #[test]
    fn test_calls_chain() {
        let expr = parse_expr("make(1)(2, \"x\")");

        assert_eq!(AstPrinter::print(&expr), "(call (call make 1.0) 2.0 x)");
    }

    #[test]
    fn test_statements_render() {
        let lines = print_program(
            "var a = 1; var b; print a; { a = 2; } if (a) print 1; else print 2; \
             while (false) a; fun f(x, y) { return x; } fun g() { return; }",
        );

        assert_eq!(
            lines,
            vec![
                "(var a 1.0)",
                "(var b)",
                "(print a)",
                "(block (= a 2.0))",
                "(if a (print 1.0) (print 2.0))",
                "(while false a)",
                "(fun f (x y) (return x))",
                "(fun g () (return))",
            ]
        );
    }

    #[test]
    fn test_for_loop_desugars_to_while() {
        let lines = print_program("for (var i = 0; i < 3; i = i + 1) print i;");

        assert_eq!(
            lines,
            vec!["(block (var i 0.0) (while (< i 3.0) (block (print i) (= i (+ i 1.0)))))"]
        );
    }

    #[test]
    fn test_for_loop_without_clauses_loops_on_true() {
        let statements = rox::parse_program("for (;;) print 1;").expect("should parse");

        match &statements[..] {
            [Stmt::While { condition, .. }] => {
                assert_eq!(*condition, Expr::Literal(LiteralValue::True));
            }
            other => panic!("expected a bare while, got {:?}", other),
        }
    }

    #[test]
    fn test_every_variable_reference_gets_its_own_id() {
        let expr = parse_expr("a + a");

        let Expr::Binary {
            left,
            operator: BinaryOp::Add,
            right,
            ..
        } = expr
        else {
            panic!("expected addition");
        };

        match (*left, *right) {
            (Expr::Variable { id: l, .. }, Expr::Variable { id: r, .. }) => assert_ne!(l, r),
            other => panic!("expected two variables, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_assignment_target() {
        let err = rox::parse_program("1 = 2;").unwrap_err();

        assert!(matches!(err, LoxError::Parse { line: 1, .. }));
        assert!(err.to_string().contains("Invalid assignment target"));
    }

    #[test]
    fn test_missing_semicolon_reports_line() {
        let err = rox::parse_program("var a = 1;\nprint a").unwrap_err();

        assert!(matches!(err, LoxError::Parse { line: 2, .. }));
        assert_eq!(err.exit_code(), 65);
    }

    #[test]
    fn test_error_messages_name_the_offending_token() {
        let cases = [
            ("print ;", "[line 1] Error at ';': Expected expression"),
            ("1 = 2;", "[line 1] Error at '=': Invalid assignment target"),
            ("var a = 1;\nprint a", "[line 2] Error at end: Expected ';' after value"),
            ("fun (a) {}", "[line 1] Error at '(': Expected function name"),
        ];

        for (source, expected) in cases {
            let err = rox::parse_program(source).unwrap_err();
            assert_eq!(err.to_string(), expected, "source: {:?}", source);
        }
    }

    #[test]
    fn test_trailing_tokens_after_expression() {
        let tokens = rox::tokenize("1 + 2 3").expect("source should scan");

        let err = Parser::new(&tokens).parse_expression().unwrap_err();

        assert_eq!(
            err.to_string(),
            "[line 1] Error at '3': Expected end of expression"
        );
    }

    #[test]
    fn test_class_keyword_is_reserved() {
        assert!(rox::parse_program("class Foo {}").is_err());
    }
}
