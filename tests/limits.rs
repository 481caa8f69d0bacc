use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread,
    time::Duration,
};

use strata::*;

const FOREVER: &str = "⍢(+1)(≥0.) 0";

#[test]
fn deep_recursion_overflows() {
    let asm = compile("F ← |1.1 F\nF 5").unwrap();
    let err = Vm::default().max_call_depth(32).run(&asm, Vec::new()).unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow { limit: 32 });
    assert_eq!(err.trace.len(), 32);
    assert!(err
        .trace
        .iter()
        .all(|frame| frame.id == FunctionId::Named("F".into())));
    let message = err.to_string();
    assert!(message.contains("(x 31)"), "{message}");
}

#[test]
fn recursion_within_the_limit_succeeds() {
    // Each level calls F and then a switch branch
    let asm = compile("F ← |1.1 ⨬(∘|F -1) > 0 .\nF 10").unwrap();
    let out = Vm::default().max_call_depth(64).run(&asm, Vec::new()).unwrap();
    assert_eq!(out, [Value::from(0i64)]);
    let err = Vm::default().max_call_depth(8).run(&asm, Vec::new()).unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow { limit: 8 });
}

#[test]
fn deep_recursion_through_modifiers_stays_on_the_frame_stack() {
    let switched = compile("F ← |1.1 ⨬(∘|F -1) > 0 .\nF 1000").unwrap();
    assert_eq!(execute(&switched, Vec::new()).unwrap(), [Value::from(0i64)]);

    // Each level leaves a dip continuation below the recursive call
    let dipped = "F ← |1.1 ⨬(∘|◌⊙F 0 -1) > 0 .\nF ";
    let asm = compile(&format!("{dipped}1000")).unwrap();
    assert_eq!(execute(&asm, Vec::new()).unwrap(), [Value::from(0i64)]);
    let asm = compile(&format!("{dipped}100000")).unwrap();
    let out = Vm::default()
        .max_call_depth(1_000_000)
        .run(&asm, Vec::new())
        .unwrap();
    assert_eq!(out, [Value::from(0i64)]);
}

#[test]
fn recursion_through_repeat_overflows() {
    let asm = compile("F ← |1.1 ⍥F 1\nF 5").unwrap();
    let err = Vm::default().max_call_depth(64).run(&asm, Vec::new()).unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::StackOverflow { limit: 64 });
    assert_eq!(err.trace.len(), 64);
}

#[test]
fn a_raised_flag_stops_execution() {
    let asm = compile(FOREVER).unwrap();
    let flag = Arc::new(AtomicBool::new(false));
    let vm = Vm::default().cancel_flag(flag.clone());
    let canceller = thread::spawn(move || {
        thread::sleep(Duration::from_millis(20));
        flag.store(true, Ordering::Relaxed);
    });
    let err = vm.run(&asm, Vec::new()).unwrap_err();
    canceller.join().unwrap();
    assert_eq!(err.kind, RuntimeErrorKind::Cancelled);
}

#[test]
fn instruction_limits_stop_execution() {
    let asm = compile(FOREVER).unwrap();
    let err = Vm::default().instruction_limit(1000).run(&asm, Vec::new()).unwrap_err();
    assert_eq!(err.kind, RuntimeErrorKind::InstructionLimit(1000));
    let out = Vm::default()
        .instruction_limit(1000)
        .run(&compile("+ 1 2").unwrap(), Vec::new())
        .unwrap();
    assert_eq!(out, [Value::from(3i64)]);
}

#[test]
fn assemblies_are_shared_between_threads() {
    let asm = Arc::new(compile("/+ ⇡ 100").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|_| {
            let asm = asm.clone();
            thread::spawn(move || execute(&asm, Vec::new()))
        })
        .collect();
    for handle in handles {
        assert_eq!(handle.join().unwrap().unwrap(), [Value::from(4950i64)]);
    }
}

#[test]
fn macro_depth_is_configurable() {
    let source = "Loop! ← Loop!^0\nLoop!1";
    let err = Compiler::default()
        .max_macro_depth(3)
        .load_str(source)
        .unwrap_err();
    assert!(
        matches!(err, CompileError::MacroRecursion { ref name, limit: 3, .. } if name == "Loop!"),
        "{err:?}"
    );
    let nested = "Inc! ← +1 ^0\nTwo! ← Inc!Inc!^0\nTwo!5";
    let asm = Compiler::default().load_str(nested).unwrap();
    assert_eq!(execute(&asm, Vec::new()).unwrap(), [Value::from(7i64)]);
}

#[test]
fn unreachable_functions_are_removed() {
    let source = "Double ← ×2\nUnused ← -1\nAlsoUnused ← Unused\nDouble 3";
    let asm = compile(source).unwrap();
    let names: Vec<String> = asm.functions.iter().map(|f| f.id.to_string()).collect();
    assert_eq!(names, ["Double"]);
    assert_eq!(asm.constants.len(), 2);
    assert!(asm.validate().is_ok());
    assert_eq!(execute(&asm, Vec::new()).unwrap(), [Value::from(6i64)]);

    let asm = Compiler::default()
        .export("AlsoUnused")
        .load_str(source)
        .unwrap();
    let mut names: Vec<String> = asm.functions.iter().map(|f| f.id.to_string()).collect();
    names.sort();
    assert_eq!(names, ["AlsoUnused", "Double", "Unused"]);
    assert!(asm.validate().is_ok());
}
