/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use mjc::compile;
use mjc::errors::CompileError;

fn main_wrap(stms: &str) -> String {
    format!(
        "class Main {{ public static void main(String[] a) {{ {} }} }}",
        stms
    )
}

/// No pseudo-register may survive register allocation. Pseudo registers
/// print as `t<number>`.
fn assert_no_pseudo_registers(assem: &str) {
    for line in assem.lines() {
        for token in line.split(|c: char| !c.is_ascii_alphanumeric()) {
            if token.starts_with('t') && token.len() > 1 && token[1..].chars().all(|c| c.is_ascii_digit()) {
                panic!("pseudo register {} survived allocation in line: {}", token, line);
            }
        }
    }
}

/// Every conditional jump must fall through to a label (its false branch).
fn assert_cjump_fall_through(assem: &str) {
    let lines: Vec<&str> = assem.lines().collect();
    for (i, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('J') && !trimmed.starts_with("JMP") {
            let next = lines.get(i + 1).map(|l| l.trim_end()).unwrap_or("");
            assert!(
                next.ends_with(':'),
                "conditional jump not followed by a label: {} / {}",
                line,
                next
            );
        }
    }
}

#[test]
fn test_compile_println_of_sum() {
    let assem = compile(&main_wrap("System.out.println(1+2);")).unwrap();
    assert!(assem.starts_with(".intel_syntax noprefix\n.global Lmain\n"));
    assert!(assem.contains("Lmain:\n"));
    assert!(assem.contains("CALL L_println_int"));
    // cdecl: the caller removes the single argument.
    assert!(assem.contains("ADD esp, 4"));
    assert_no_pseudo_registers(&assem);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_compile_array_program() {
    let assem = compile(&main_wrap(
        "int[] xs;\n\
         xs = new int[3];\n\
         xs[0] = 10; xs[1] = 20; xs[2] = 30;\n\
         System.out.println(xs[0] + xs[1] + xs[2]);",
    ))
    .unwrap();
    assert!(assem.contains("CALL L_halloc"));
    // Bounds violations land in the raise block.
    assert!(assem.contains("LMain$main$raise:"));
    assert!(assem.contains("CALL L_raise"));
    assert_no_pseudo_registers(&assem);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_out_of_bounds_access_keeps_runtime_check() {
    let assem = compile(&main_wrap(
        "int[] xs; xs = new int[1]; System.out.println(xs[5]);",
    ))
    .unwrap();
    // The constant index still gets its upper bound check, jumping to the
    // raise block that loops on L_raise.
    assert!(assem.contains("LMain$main$raise:"));
    assert!(assem.contains("CALL L_raise"));
    assert!(assem.contains("JMP LMain$main$raise"));
    assert_no_pseudo_registers(&assem);
}

#[test]
fn test_short_circuit_condition_compiles_to_jumps() {
    let assem = compile(&main_wrap(
        "if (1 < 2 && 3 < 4) System.out.println(1); else System.out.println(0);",
    ))
    .unwrap();
    // Two comparisons, no boolean AND materialization.
    let cmps = assem.lines().filter(|l| l.trim_start().starts_with("CMP")).count();
    assert!(cmps >= 2, "expected two comparisons, got {}:\n{}", cmps, assem);
    assert!(!assem.contains("\n  AND "), "short circuit must not compute a boolean AND");
    // Both println calls exist, on disjoint paths.
    let calls = assem.matches("CALL L_println_int").count();
    assert_eq!(calls, 2);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_recursive_factorial_compiles() {
    let assem = compile(
        "class Main { public static void main(String[] a) { System.out.println(new Fac().fac(6)); } }\n\
         class Fac {\n\
             public int fac(int n) {\n\
                 int r;\n\
                 if (n < 1) r = 1; else r = n * this.fac(n - 1);\n\
                 return r;\n\
             }\n\
         }",
    )
    .unwrap();
    assert!(assem.contains("LFac$fac:\n"));
    assert!(assem.contains("CALL LFac$fac"));
    // Function framing: prologue and epilogue around the body.
    assert!(assem.contains("PUSH ebp"));
    assert!(assem.contains("MOV ebp, esp"));
    assert!(assem.contains("POP ebp"));
    assert!(assem.contains("RET"));
    // IMUL for n * this.fac(n - 1).
    assert!(assem.contains("IMUL"));
    assert_no_pseudo_registers(&assem);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_register_pressure_forces_spill() {
    let assem = compile(
        "class Main { public static void main(String[] a) throws java.io.IOException {\n\
             int v1; int v2; int v3; int v4; int v5; int v6; int v7;\n\
             v1 = System.in.read();\n\
             v2 = System.in.read();\n\
             v3 = System.in.read();\n\
             v4 = System.in.read();\n\
             v5 = System.in.read();\n\
             v6 = System.in.read();\n\
             v7 = System.in.read();\n\
             System.out.println(v1 + v2 + v3 + v4 + v5 + v6 + v7);\n\
         } }",
    )
    .unwrap();
    // Seven values alive across calls cannot fit six registers: at least
    // one of them lives in a frame slot.
    assert!(
        assem.contains("DWORD PTR [ebp - "),
        "expected a spill slot access:\n{}",
        assem
    );
    let sub_line = assem
        .lines()
        .find(|l| l.trim_start().starts_with("SUB esp, "))
        .expect("prologue reserves the frame");
    let size: u32 = sub_line.trim().trim_start_matches("SUB esp, ").parse().unwrap();
    assert!(size >= 4, "frame must hold at least one spill slot");
    assert_no_pseudo_registers(&assem);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_while_loop_compiles_to_backward_jump() {
    let assem = compile(&main_wrap(
        "int i; i = 0; while (i < 10) { i = i + 1; } System.out.println(i);",
    ))
    .unwrap();
    assert!(assem.contains("JMP "));
    assert!(assem.contains("JL ") || assem.contains("JGE "));
    assert_no_pseudo_registers(&assem);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_division_uses_idiv() {
    let assem = compile(&main_wrap("System.out.println(144 / 12);")).unwrap();
    assert!(assem.contains("IDIV"));
    assert!(assem.contains("SAR edx, 31"));
    assert_no_pseudo_registers(&assem);
}

#[test]
fn test_field_and_method_interplay() {
    let assem = compile(
        "class Main { public static void main(String[] a) { System.out.println(new Counter().bump().bump().get()); } }\n\
         class Counter {\n\
             int n;\n\
             public Counter bump() { n = n + 1; return this; }\n\
             public int get() { return n; }\n\
         }",
    )
    .unwrap();
    assert!(assem.contains("LCounter$bump:"));
    assert!(assem.contains("LCounter$get:"));
    // The receiver is the first parameter slot of each method.
    assert!(assem.contains("DWORD PTR [ebp + 8]"));
    assert_no_pseudo_registers(&assem);
    assert_cjump_fall_through(&assem);
}

#[test]
fn test_every_function_is_emitted() {
    let assem = compile(
        "class Main { public static void main(String[] a) { } }\n\
         class A { public int f() { return 1; } public int g() { return 2; } }\n\
         class B { public int h() { return 3; } }",
    )
    .unwrap();
    for name in ["LA$f:", "LA$g:", "LB$h:", "Lmain:"] {
        assert!(assem.contains(name), "missing function {}", name);
    }
}

#[test]
fn test_empty_main_still_has_frame_and_raise_block() {
    let assem = compile(&main_wrap("")).unwrap();
    assert!(assem.contains("Lmain:\n"));
    assert!(assem.contains("PUSH ebp"));
    assert!(assem.contains("SUB esp, "));
    assert!(assem.contains("RET"));
    assert_no_pseudo_registers(&assem);
}

#[test]
fn test_compile_error_reports_location() {
    let source = "class Main {\n  public static void main(String[] a) {\n    x = 1;\n  }\n}";
    let err = compile(source).unwrap_err();
    let compile_error = err
        .root_cause()
        .downcast_ref::<CompileError>()
        .expect("a compile error bubbles up");
    assert_eq!(compile_error.message, "Undeclared variable x.");
    let location = compile_error.location.expect("the error is located");
    assert_eq!(location.line, 3);
}

#[test]
fn test_compile_from_file_to_assembly_file() {
    use std::fs;

    let dir = tempfile::tempdir().unwrap();
    let source_path = dir.path().join("Add.java");
    fs::write(&source_path, main_wrap("System.out.println(40 + 2);")).unwrap();

    let source = fs::read_to_string(&source_path).unwrap();
    let assem = compile(&source).unwrap();
    let target = dir.path().join("Add.s");
    fs::write(&target, &assem).unwrap();

    let written = fs::read_to_string(&target).unwrap();
    assert!(written.starts_with(".intel_syntax noprefix"));
    assert!(written.contains("CALL L_println_int"));
}

#[test]
fn test_deterministic_output_for_same_source() {
    let source = main_wrap("int i; i = 0; while (i < 3) { System.out.println(i); i = i + 1; }");
    let first = compile(&source).unwrap();
    let second = compile(&source).unwrap();
    assert_eq!(first, second);
}
