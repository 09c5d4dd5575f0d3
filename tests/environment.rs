#[cfg(test)]
mod environment_tests {
    use rox::callable::Callable;
    use rox::environment::{EnvError, Environment};
    use rox::value::Value;

    #[test]
    fn test_define_and_read_in_same_frame() {
        let env = Environment::new();
        env.define("a", Value::Number(1.0));

        assert!(env.contains("a"));
        assert_eq!(env.get_at(0, "a"), Ok(Value::Number(1.0)));
        assert_eq!(env.get_global("a"), Ok(Value::Number(1.0)));
    }

    #[test]
    fn test_define_overwrites() {
        let env = Environment::new();
        env.define("a", Value::Number(1.0));
        env.define("a", Value::from("two"));

        assert_eq!(env.get_at(0, "a"), Ok(Value::from("two")));
    }

    #[test]
    fn test_get_at_walks_exact_depth() {
        let globals = Environment::new();
        globals.define("x", Value::from("global"));

        let outer = globals.child();
        outer.define("x", Value::from("outer"));

        let inner = outer.child();
        inner.define("x", Value::from("inner"));

        assert_eq!(inner.get_at(0, "x"), Ok(Value::from("inner")));
        assert_eq!(inner.get_at(1, "x"), Ok(Value::from("outer")));
        assert_eq!(inner.get_at(2, "x"), Ok(Value::from("global")));
        assert_eq!(inner.get_global("x"), Ok(Value::from("global")));
    }

    #[test]
    fn test_child_links_back_to_parent() {
        let parent = Environment::new();
        let child = parent.child();

        assert!(child.enclosing().is_some_and(|e| e.ptr_eq(&parent)));
        assert!(parent.enclosing().is_none());
        assert!(child.child().global().ptr_eq(&parent));
        assert!(!child.ptr_eq(&parent));
    }

    #[test]
    fn test_child_does_not_leak_into_parent() {
        let parent = Environment::new();
        let child = parent.child();
        child.define("local", Value::Bool(true));

        assert!(!parent.contains("local"));
        assert_eq!(
            parent.get_global("local"),
            Err(EnvError::Undefined("local".into()))
        );
    }

    #[test]
    fn test_assign_at_updates_the_shared_frame() {
        let outer = Environment::new().child();
        outer.define("n", Value::Number(0.0));

        let a = outer.child();
        let b = outer.child();

        a.assign_at(1, "n", Value::Number(5.0)).expect("slot exists");

        assert_eq!(b.get_at(1, "n"), Ok(Value::Number(5.0)));
    }

    #[test]
    fn test_assign_global_never_creates_a_binding() {
        let globals = Environment::new();

        let err = globals.assign_global("ghost", Value::Nil).unwrap_err();

        assert_eq!(err, EnvError::Undefined("ghost".into()));
        assert!(!err.is_defect());
        assert!(!globals.contains("ghost"));
    }

    #[test]
    fn test_assign_global_from_nested_frame() {
        let globals = Environment::new();
        globals.define("g", Value::Number(1.0));

        let nested = globals.child().child();
        nested
            .assign_global("g", Value::Number(2.0))
            .expect("global exists");

        assert_eq!(globals.get_at(0, "g"), Ok(Value::Number(2.0)));
    }

    #[test]
    fn test_missing_frame_is_a_defect() {
        let env = Environment::new().child();

        let err = env.get_at(3, "x").unwrap_err();

        assert!(matches!(err, EnvError::MissingFrame { depth: 3, .. }));
        assert!(err.is_defect());
    }

    #[test]
    fn test_missing_slot_is_a_defect() {
        let env = Environment::new().child();

        let read = env.get_at(1, "nope").unwrap_err();
        let write = env.assign_at(0, "nope", Value::Nil).unwrap_err();

        assert!(matches!(read, EnvError::MissingSlot { depth: 1, .. }));
        assert!(matches!(write, EnvError::MissingSlot { depth: 0, .. }));
        assert!(read.is_defect() && write.is_defect());
    }

    #[test]
    fn test_debug_lists_names_only() {
        let env = Environment::new();
        env.define("b", Value::Nil);
        env.define("a", Value::Nil);

        let rendered = format!("{:?}", env);

        assert!(rendered.contains("[\"a\", \"b\"]"), "got {}", rendered);
    }

    #[test]
    fn test_child_frames_release_their_parent() {
        let parent = Environment::new();
        assert_eq!(parent.handle_count(), 1);

        let child = parent.child();
        let grandchild = child.child();
        assert_eq!(parent.handle_count(), 2);

        drop(grandchild);
        drop(child);
        assert_eq!(parent.handle_count(), 1);
    }

    #[test]
    fn test_function_stored_in_its_own_closure_keeps_the_frame() {
        let mut interpreter = rox::Interpreter::with_output(Vec::new());
        rox::run(
            "fun make() { var n = 0; fun next() { n = n + 1; return n; } return next; } \
             var counter = make();",
            &mut interpreter,
        )
        .expect("runs");

        let Ok(Value::Callable(Callable::Function(next))) = interpreter.globals().get_global("counter")
        else {
            panic!("expected a user function");
        };

        // the function holds the frame, and the frame's `next` binding holds
        // the function: global `counter`, the `next` slot, and this handle
        let frame = next.closure().clone();
        assert!(frame.contains("next"));
        assert_eq!(std::rc::Rc::strong_count(&next), 3);
        assert_eq!(frame.handle_count(), 2);
    }
}
