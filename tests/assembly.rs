use strata::*;

const PROGRAM: &str = "\
Double ← ×2
Inc ← +1
Double Inc 3
{1 \"hi\" @c}
[∞ ¯2.5 π]
⍢(×2)(<100.) 1";

fn compile_with_exports(source: &str, exports: &[&str]) -> Assembly {
    let mut compiler = (exports.iter()).fold(Compiler::default(), |c, name| c.export(*name));
    compiler.load_str(source).unwrap()
}

#[test]
fn decoded_assemblies_run_identically() {
    let asm = compile(PROGRAM).unwrap();
    let expected = execute(&asm, Vec::new()).unwrap();
    assert_eq!(expected.len(), 4);
    assert_eq!(expected[0], Value::from(8i64));

    let encoded = asm.encode();
    let decoded = Assembly::decode(&encoded).unwrap();
    assert_eq!(execute(&decoded, Vec::new()).unwrap(), expected);
    assert_eq!(decoded.spans, asm.spans);
    assert_eq!(decoded.encode(), encoded);
}

#[test]
fn exports_survive_encoding() {
    let asm = compile_with_exports("Double ← ×2\nInc ← +1\nInc 1", &["Double"]);
    let decoded = Assembly::decode(&asm.encode()).unwrap();
    assert!(decoded.export("Double").is_some());
    assert!(decoded.export("Inc").is_none());
    let out = Vm::default()
        .call_export(&decoded, "Double", vec![Value::from(21i64)])
        .unwrap();
    assert_eq!(out, [Value::from(42i64)]);
}

#[test]
fn version_one_assemblies_still_run() {
    let asm = compile(PROGRAM).unwrap();
    let encoded = asm.encode();
    let (body, _) = encoded.split_once("EXPORTS").unwrap();
    let v1 = body.replacen("STRATA ASSEMBLY 2", "STRATA ASSEMBLY 1", 1);
    let decoded = Assembly::decode(&v1).unwrap();
    assert!(decoded.exports.is_empty());
    assert!(decoded.spans.iter().all(|span| *span == Span::Builtin));
    assert_eq!(
        execute(&decoded, Vec::new()).unwrap(),
        execute(&asm, Vec::new()).unwrap()
    );
}

#[test]
fn the_version_is_checked_before_anything_else() {
    assert_eq!(
        Assembly::decode("STRATA ASSEMBLY 9\nthis is not an assembly"),
        Err(FormatError::UnsupportedVersion {
            found: 9,
            supported: Assembly::VERSION,
        })
    );
    assert!(matches!(
        Assembly::decode("STRATA ASSEMBLY 0\n"),
        Err(FormatError::UnsupportedVersion { found: 0, .. })
    ));
    assert!(matches!(
        Assembly::decode("STRATA ASSEMBLY two\n"),
        Err(FormatError::Malformed { line: 1, .. })
    ));
}

#[test]
fn corrupted_assemblies_are_rejected() {
    let encoded = compile(PROGRAM).unwrap().encode();
    let truncated = encoded.replacen("FUNCTIONS", "FUNCTIONZ", 1);
    assert!(Assembly::decode(&truncated).is_err());
    let (head, _) = encoded.split_once("CONSTANTS").unwrap();
    assert!(Assembly::decode(head).is_err());
}

/// Replace the first line of a section
fn replace_section_line(encoded: &str, section: &str, line: &str) -> String {
    let mut lines: Vec<&str> = encoded.lines().collect();
    let header = lines.iter().position(|l| *l == section).unwrap();
    lines[header + 1] = line;
    lines.join("\n") + "\n"
}

#[test]
fn overflowing_slices_are_rejected() {
    let encoded = compile("+ 1 2").unwrap().encode();
    let overflowing = replace_section_line(
        &encoded,
        "ROOT",
        &format!("{{\"start\":{},\"len\":3}}", usize::MAX),
    );
    assert!(matches!(
        Assembly::decode(&overflowing),
        Err(FormatError::DanglingReference {
            table: "instruction",
            index: usize::MAX,
            ..
        })
    ));
}

#[test]
fn constants_with_overflowing_shapes_are_rejected() {
    let encoded = compile("5").unwrap().encode();
    let huge = replace_section_line(
        &encoded,
        "CONSTANTS",
        "{\"int\":[[4294967296,4294967296,2],[1]]}",
    );
    let err = Assembly::decode(&huge).unwrap_err();
    assert!(
        matches!(&err, FormatError::Malformed { message, .. } if message.contains("too many")),
        "{err:?}"
    );
}
