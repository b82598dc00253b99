// tests/pipeline.rs
//! End-to-end tests driving the full pipeline through the compilation unit
//! and the per-file commands.

use std::fs;
use std::path::PathBuf;

use prism::commands::{check, run_golden, scan, spirv_bin, spirv_text, GoldenKind};
use prism::Unit;

fn write_fixture(dir: &tempfile::TempDir, name: &str, content: &str) -> PathBuf {
    let path = dir.path().join(name);
    fs::write(&path, content).expect("fixture write");
    path
}

fn run(command: prism::commands::Command, source: &str) -> String {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = write_fixture(&dir, "input.prism", source);
    let mut out = Vec::new();
    command(&path, &mut out).expect("command run");
    String::from_utf8(out).expect("utf-8 output")
}

#[test]
fn empty_function_emits_the_expected_assembly() {
    let text = run(spirv_text, "func main() {}\n");
    let expected = "\
OpCapability Shader
OpCapability Linkage
OpMemoryModel Logical GLSL450
%type_void_1 = OpTypeVoid
%type_func_main_2 = OpTypeFunction %type_void_1
%func_main_3 = OpFunction %type_void_1 None %type_func_main_2
%block_entry_4 = OpLabel
OpReturn
OpFunctionEnd
";
    assert_eq!(text, expected);
}

#[test]
fn binary_header_carries_magic_version_and_bound() {
    let dir = tempfile::tempdir().unwrap();
    let path = write_fixture(&dir, "input.prism", "func main() {}\n");
    let mut out = Vec::new();
    spirv_bin(&path, &mut out).unwrap();

    let words: Vec<u32> = out
        .chunks_exact(4)
        .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect();
    assert_eq!(words[0], 0x0723_0203);
    assert_eq!(words[1], 0x0001_0300);
    assert_eq!(words[2], 0);
    // func main() {} allocates void, the function type, the function, and
    // the entry block.
    assert_eq!(words[3], 5);
    assert_eq!(words[4], 0);
}

#[test]
fn scan_lines_quote_the_lexeme_and_cover_the_source() {
    let output = run(scan, "x := 1\n");
    let lines: Vec<&str> = output.lines().collect();
    assert!(lines[0].starts_with("Identifier"), "{output}");
    assert!(lines[0].contains("\"x\""), "{output}");
    assert!(lines[1].starts_with("Define"), "{output}");
    assert!(lines[2].starts_with("LiteralInt"), "{output}");
    assert!(lines[3].starts_with("Semicolon"), "{output}");
    assert!(lines[4].starts_with("EOF"), "{output}");
}

#[test]
fn token_ranges_cover_their_lexemes() {
    let mut unit = Unit::from_source("<test>", "func add(a int) int { return a + 1 }\n");
    assert!(unit.scan());
    let file = unit.file().clone();
    for token in unit.tokens() {
        let begin = token.range.begin.offset;
        let end = token.range.end.offset;
        assert!(begin <= end && end <= file.len());
        if begin == end {
            // Synthetic terminators and EOF.
            continue;
        }
        assert_eq!(file.slice(token.range), token.text);
    }
}

#[test]
fn undeclared_identifier_diagnostic_covers_the_identifier() {
    let output = run(check, "func k() int { return z }\n");
    assert_eq!(output.trim(), "1:23: error: undeclared identifier");
}

#[test]
fn cyclic_constants_report_a_cycle_and_emit_no_module() {
    let source = "const a int = b\nconst b int = a\n";
    let output = run(check, source);
    assert!(output.contains("cyclic dependency"), "{output}");

    let mut unit = Unit::from_source("<test>", source);
    assert!(unit.emit_spirv().is_none());
}

#[test]
fn semantic_errors_keep_exit_flow_on_stdout() {
    // Diagnostics are ordinary command output; the command itself succeeds.
    let output = run(check, "func f() { break }\n");
    assert!(output.contains("break statement not within"), "{output}");
}

#[test]
fn spirv_output_is_deterministic_across_runs() {
    let source = "func f(x int) int {\n  var a int = 2\n  if x > 0 {\n    a = a + x\n  }\n  return a\n}\n";
    let first = run(spirv_text, source);
    let second = run(spirv_text, source);
    assert_eq!(first, second);
    assert!(first.contains("OpSelectionMerge"), "{first}");
    assert!(first.contains("OpIAdd"), "{first}");
}

#[test]
fn if_lowering_has_three_extra_terminated_blocks() {
    let text = run(spirv_text, "func p(x bool) { if x { } }\n");
    assert_eq!(text.matches("OpLabel").count(), 4, "{text}");
    let merge_pos = text.find("OpSelectionMerge").expect("selection merge");
    let branch_pos = text.find("OpBranchConditional").expect("branch");
    assert!(merge_pos < branch_pos);
}

#[test]
fn stage_gating_stops_after_scan_errors() {
    let output = run(check, "func f() { @ }\n");
    assert!(output.contains("unrecognized character"), "{output}");
    // The parser never ran, so the output holds only the scan diagnostic.
    assert_eq!(output.lines().count(), 1, "{output}");
}

#[test]
fn golden_harness_updates_then_passes() {
    let dir = tempfile::tempdir().unwrap();
    write_fixture(&dir, "main.prism", "func main() {}\n");
    write_fixture(&dir, "main.prism.golden", "stale\n");

    let mut out = Vec::new();
    let ok = run_golden(dir.path(), spirv_text, GoldenKind::Text, false, &mut out).unwrap();
    assert!(!ok);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("FAILURE"), "{printed}");

    let mut out = Vec::new();
    let ok = run_golden(dir.path(), spirv_text, GoldenKind::Text, true, &mut out).unwrap();
    assert!(ok);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("UPDATED"), "{printed}");

    let mut out = Vec::new();
    let ok = run_golden(dir.path(), spirv_text, GoldenKind::Text, false, &mut out).unwrap();
    assert!(ok);
    let printed = String::from_utf8(out).unwrap();
    assert!(printed.contains("SUCCESS"), "{printed}");
}

#[test]
fn golden_harness_is_byte_exact_for_binaries() {
    let dir = tempfile::tempdir().unwrap();
    let input = write_fixture(&dir, "main.prism", "func main() {}\n");

    let mut expected = Vec::new();
    spirv_bin(&input, &mut expected).unwrap();
    fs::write(dir.path().join("main.prism.golden.bin"), &expected).unwrap();

    let mut out = Vec::new();
    let ok = run_golden(dir.path(), spirv_bin, GoldenKind::Binary, false, &mut out).unwrap();
    assert!(ok, "{}", String::from_utf8_lossy(&out));

    // Flip one byte: byte-exact comparison must fail.
    let mut tampered = expected.clone();
    tampered[20] ^= 1;
    fs::write(dir.path().join("main.prism.golden.bin"), &tampered).unwrap();
    let mut out = Vec::new();
    let ok = run_golden(dir.path(), spirv_bin, GoldenKind::Binary, false, &mut out).unwrap();
    assert!(!ok);
}
