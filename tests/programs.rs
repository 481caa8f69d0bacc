use std::sync::Arc;

use strata::*;

fn run(code: &str) -> Result<Vec<Value>, RuntimeError> {
    let asm = compile(code).unwrap_or_else(|e| panic!("{code:?} failed to compile: {e}"));
    execute(&asm, Vec::new())
}

fn top(code: &str) -> Value {
    let mut stack = run(code).unwrap_or_else(|e| panic!("{code:?} failed: {e}"));
    stack.pop().unwrap_or_else(|| panic!("{code:?} left nothing on the stack"))
}

fn error_kind(code: &str) -> RuntimeErrorKind {
    match run(code) {
        Ok(stack) => panic!("{code:?} should have failed, but left {stack:?}"),
        Err(e) => e.kind,
    }
}

fn matrix(shape: [usize; 2], data: &[i64]) -> Value {
    Value::Int(Array::new(shape, data))
}

#[test]
fn arguments_are_taken_right_to_left() {
    assert_eq!(top("- 1 5"), Value::from(4i64));
    assert_eq!(top("÷ 2 5"), Value::from(2.5));
    assert_eq!(top("× 2 + 1 3"), Value::from(8i64));
    assert_eq!(run("1 2 3").unwrap(), [3i64, 2, 1].map(Value::from));
}

#[test]
fn scalars_broadcast() {
    assert_eq!(
        top("+ 1 [1_2_3 4_5_6]"),
        matrix([2, 3], &[2, 3, 4, 5, 6, 7])
    );
    assert_eq!(
        top("+ [1_2_3 4_5_6] [10_20_30 40_50_60]"),
        matrix([2, 3], &[11, 22, 33, 44, 55, 66])
    );
}

#[test]
fn other_shapes_do_not_broadcast() {
    let kind = error_kind("+ [1_2 3_4 5_6] [1_2_3 4_5_6]");
    let RuntimeErrorKind::ShapeMismatch { a, b } = kind else {
        panic!("expected a shape mismatch, got {kind:?}");
    };
    let mut shapes = [a.to_vec(), b.to_vec()];
    shapes.sort();
    assert_eq!(shapes, [vec![2, 3], vec![3, 2]]);
    assert!(matches!(
        error_kind("+ [1 2] [1 2 3]"),
        RuntimeErrorKind::ShapeMismatch { .. }
    ));
}

#[test]
fn indexing_is_strict() {
    assert_eq!(top("⊡ 1 [5 6 7]"), Value::from(6i64));
    assert_eq!(
        error_kind("⊡ 5 [1 2 3]"),
        RuntimeErrorKind::IndexOutOfBounds { index: 5, len: 3 }
    );
    assert_eq!(
        error_kind("⊡ ¯1 [1 2 3]"),
        RuntimeErrorKind::IndexOutOfBounds { index: -1, len: 3 }
    );
    assert!(matches!(
        error_kind("⊏ [0 3] [1 2 3]"),
        RuntimeErrorKind::IndexOutOfBounds { index: 3, len: 3 }
    ));
}

#[test]
fn arithmetic_is_checked() {
    assert!(matches!(
        error_kind("÷ 0 1"),
        RuntimeErrorKind::Arithmetic(_)
    ));
    assert!(matches!(
        error_kind("+ 1 9223372036854775807"),
        RuntimeErrorKind::Arithmetic(_)
    ));
}

#[test]
fn failed_runs_only_return_the_error() {
    let asm = compile("⊡ 5 [1 2 3]").unwrap();
    let stack = vec![Value::from("kept?")];
    let err = execute(&asm, stack).unwrap_err();
    assert!(matches!(err.span, Span::Code(_)), "{err:?}");
}

#[test]
fn reshape_cycles_data() {
    assert_eq!(top("↯ 2_3 ⇡6"), matrix([2, 3], &[0, 1, 2, 3, 4, 5]));
    assert_eq!(top("↯ 2_2 [1 2 3]"), matrix([2, 2], &[1, 2, 3, 1]));
    assert_eq!(top("△ ↯ 3_2 1"), Value::from([3i64, 2]));
}

#[test]
fn oversized_arrays_are_domain_errors() {
    for code in [
        "↯ 4294967296_4294967296_2 1",
        "↯ 100000_100000_100 1",
        "⇡ 10000000000000",
        "▽ 10000000000000 [1 2]",
    ] {
        assert!(
            matches!(error_kind(code), RuntimeErrorKind::Domain(_)),
            "{code:?}"
        );
    }
    assert_eq!(
        top("△ ↯ 4294967296_4294967296_0 1"),
        Value::from([4294967296i64, 4294967296, 0])
    );
}

#[test]
fn searching_and_filtering() {
    assert_eq!(top("▽ [1 0 2] [7 8 9]"), Value::from([7i64, 9, 9]));
    assert_eq!(top("◫ 2 [1 2 3]"), matrix([2, 2], &[1, 2, 2, 3]));
    let bools = |data: &[bool]| Value::Bool(Array::list(data));
    assert_eq!(top("⌕ [1 2] [1 2 3 1 2]"), bools(&[true, false, false, true, false]));
    assert_eq!(top("∊ [2 5] [1 2 3]"), bools(&[true, false]));
    assert_eq!(top("⊗ [3 9] [1 2 3]"), Value::from([2i64, 3]));
    assert!(matches!(
        error_kind("▽ [1 2] [1 2 3]"),
        RuntimeErrorKind::ShapeMismatch { .. }
    ));
}

#[test]
fn reduce_folds_rows() {
    assert_eq!(top("/-[1 2 3]"), Value::from(2i64));
    assert_eq!(top("/+[1 2 3 4]"), Value::from(10i64));
    assert_eq!(top("/(+×1) [1 2 3]"), Value::from(6i64));
    assert_eq!(top("/+ [1_2 3_4]"), Value::from([4i64, 6]));
    assert_eq!(top("/+ []"), Value::from(0i64));
}

#[test]
fn each_and_rows() {
    assert_eq!(top("∵(×2) [1 2 3]"), Value::from([2i64, 4, 6]));
    assert_eq!(top("∵(×2) [1_2 3_4]"), matrix([2, 2], &[2, 4, 6, 8]));
    assert_eq!(top("≡(/+) [1_2 3_4]"), Value::from([3i64, 7]));
    assert!(matches!(
        error_kind("≡+ [1 2] [1 2 3]"),
        RuntimeErrorKind::ShapeMismatch { .. }
    ));
}

#[test]
fn repeat_and_do() {
    assert_eq!(top("⍥(×2) 5 1"), Value::from(32i64));
    assert_eq!(top("⍢(×2)(<100.) 1"), Value::from(128i64));
    assert!(matches!(
        error_kind("⍥(×2) ¯1 1"),
        RuntimeErrorKind::Domain(_)
    ));
}

#[test]
fn switch_picks_a_branch() {
    assert_eq!(top("⨬(+1|×10) 1 5"), Value::from(50i64));
    assert_eq!(top("⨬(+1|×10) 0 5"), Value::from(6i64));
    assert_eq!(
        error_kind("⨬(+1|×10) 2 5"),
        RuntimeErrorKind::IndexOutOfBounds { index: 2, len: 2 }
    );
}

#[test]
fn fork_and_dip() {
    assert_eq!(
        run("⊃+- 1 2").unwrap(),
        [Value::from(1i64), Value::from(3i64)]
    );
    assert_eq!(
        run("⊙+ 1 2 3").unwrap(),
        [Value::from(5i64), Value::from(1i64)]
    );
}

#[test]
fn bindings_and_local_scopes() {
    assert_eq!(top("Double ← ×2\nDouble 5"), Value::from(10i64));
    assert_eq!(top("F ← +1\nF ← ×2 F\nF 3"), Value::from(8i64));
    assert_eq!(top("(X ← 2\n+X X)"), Value::from(4i64));
    assert_eq!(top("F ← |1.1 ⍥(+1) 3\nF 0"), Value::from(3i64));
}

#[test]
fn boxes_and_characters() {
    assert_eq!(top("+ 1 @a"), Value::from('b'));
    assert_eq!(top("⧻ {1 \"ab\" [1 2 3]}"), Value::from(3i64));
    assert_eq!(top("⊔ ⊡ 1 {1 \"ab\"}"), Value::from("ab"));
}

#[test]
fn macros_expand_before_parsing() {
    assert_eq!(top("Twice! ← ^0 ^0\nTwice!(+1) 5"), Value::from(7i64));
    assert_eq!(top("Sum! ← /+ ^0\nSum!1_2_3"), Value::from(6i64));
    assert!(matches!(
        compile("Loop! ← Loop!^0\nLoop!1"),
        Err(CompileError::MacroRecursion { .. })
    ));
}

#[test]
fn complex_semantics_are_configurable() {
    let asm = compile("⌊ ℂ 0.5 1.5").unwrap();
    let out = execute(&asm, Vec::new()).unwrap();
    assert_eq!(out, [Value::from(Complex::new(1.0, 0.0))]);
    let reject = Vm::default().complex(ComplexSemantics {
        rounding: ComplexRounding::Reject,
        ..ComplexSemantics::default()
    });
    assert!(matches!(
        reject.run(&asm, Vec::new()).unwrap_err().kind,
        RuntimeErrorKind::Domain(_)
    ));

    let asm = compile("< ℂ 0 1 ℂ 0 2").unwrap();
    assert!(matches!(
        execute(&asm, Vec::new()).unwrap_err().kind,
        RuntimeErrorKind::Domain(_)
    ));
    let lexicographic = Vm::default().complex(ComplexSemantics {
        ordering: ComplexOrdering::Lexicographic,
        ..ComplexSemantics::default()
    });
    assert_eq!(
        lexicographic.run(&asm, Vec::new()).unwrap(),
        [Value::from(false)]
    );

    // Equality never depends on the ordering
    let asm = compile("= ℂ 1 2 ℂ 1 2").unwrap();
    assert_eq!(execute(&asm, Vec::new()).unwrap(), [Value::from(true)]);
}

#[test]
fn system_functions_use_the_backend() {
    let sys = SafeSys::with_input(["typed"]);
    let registry = Arc::new(SysRegistry::with_builtins(sys.clone()));
    let asm = Compiler::default()
        .with_sys(registry.clone())
        .load_str("&p \"hello\"\n&pf 12\n&sc")
        .unwrap();
    let out = Vm::default().with_sys(registry).run(&asm, Vec::new()).unwrap();
    assert_eq!(out, [Value::from("typed")]);
    assert_eq!(sys.take_stdout(), "hello\n12");
}

#[test]
fn custom_system_functions() {
    let mut registry = SysRegistry::with_builtins(SafeSys::new());
    registry.register(SysFn::new("twice", 1, 2, |_, mut args| {
        let value = args.pop().ok_or("no argument")?;
        Ok(vec![value.clone(), value])
    }));
    let registry = Arc::new(registry);
    let asm = Compiler::default()
        .with_sys(registry.clone())
        .load_str("+ &twice 4")
        .unwrap();
    let out = Vm::default().with_sys(registry).run(&asm, Vec::new()).unwrap();
    assert_eq!(out, [Value::from(8i64)]);
}
