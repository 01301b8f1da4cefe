//! End-to-end container invariants for both front ends.

use botforge_compiler::emitter::opcodes::Op;
use botforge_compiler::{compile_netbots, compile_program, CompileError};

/// Parsed view of an assembled container.
struct Container {
    magic: [u8; 4],
    entry: u32,
    constants: Vec<Vec<u8>>,
    code: Vec<u8>,
}

fn split(container: &[u8]) -> Container {
    assert!(container.len() >= 16, "container too small for its header");
    let magic: [u8; 4] = container[0..4].try_into().unwrap();
    let entry = u32::from_le_bytes(container[4..8].try_into().unwrap());
    let data_len = u32::from_le_bytes(container[8..12].try_into().unwrap()) as usize;
    let code_len = u32::from_le_bytes(container[12..16].try_into().unwrap()) as usize;
    assert_eq!(
        container.len(),
        16 + data_len + code_len,
        "header section lengths must match the payload exactly"
    );

    let mut constants = Vec::new();
    let data = &container[16..16 + data_len];
    let mut pos = 0;
    while pos < data.len() {
        let len = u32::from_le_bytes(data[pos..pos + 4].try_into().unwrap()) as usize;
        pos += 4;
        constants.push(data[pos..pos + len].to_vec());
        pos += len;
    }
    assert_eq!(pos, data.len(), "data section decodes byte-exactly");

    Container {
        magic,
        entry,
        constants,
        code: container[16 + data_len..].to_vec(),
    }
}

/// Instruction operand width in the PBO encoding.
fn pbo_operand_width(opcode: u8) -> usize {
    match Op::from_byte(opcode).expect("valid opcode") {
        Op::PushConst
        | Op::LoadVar
        | Op::StoreVar
        | Op::LoadGlobal
        | Op::StoreGlobal
        | Op::Call
        | Op::NewArray
        | Op::GetProp
        | Op::SetProp
        | Op::Import
        | Op::ImportDefault
        | Op::Export
        | Op::SuperCtor => 4,
        Op::Jmp | Op::Jz | Op::Jnz => 2,
        Op::NewClass => 5,
        Op::DefineMethod | Op::DefineGetter | Op::DefineSetter => 9,
        Op::InvokeSuper | Op::CallHost => 8,
        _ => 0,
    }
}

/// Instruction starts of PBO code.
fn pbo_instruction_starts(code: &[u8]) -> Vec<usize> {
    let mut starts = Vec::new();
    let mut pos = 0;
    while pos < code.len() {
        starts.push(pos);
        pos += 1 + pbo_operand_width(code[pos]);
    }
    assert_eq!(pos, code.len(), "code section decodes byte-exactly");
    starts
}

fn assert_pbo_jumps_aligned(code: &[u8]) {
    let starts = pbo_instruction_starts(code);
    for &pos in &starts {
        if matches!(code[pos], 0x20 | 0x21 | 0x22) {
            let disp = i16::from_be_bytes([code[pos + 1], code[pos + 2]]) as i64;
            let target = pos as i64 + 3 + disp;
            assert!(
                starts.contains(&(target as usize)),
                "jump at {} lands mid-instruction at {}",
                pos,
                target
            );
        }
    }
}

#[test]
fn program_header_is_exact() {
    let container = compile_program("let x = 1;").unwrap();
    let parsed = split(&container);
    assert_eq!(&parsed.magic, b"PBO3");
    assert_eq!(parsed.entry, 0);
    assert!(parsed.magic.iter().all(u8::is_ascii));
}

#[test]
fn netbots_header_is_exact() {
    let container = compile_netbots(
        r#"{"blocks":[{"id":"A","type":"start"}],"connections":[]}"#,
    )
    .unwrap();
    let parsed = split(&container);
    assert_eq!(&parsed.magic, b"NBO2");
    assert_eq!(parsed.entry, 0);
}

#[test]
fn program_compilation_is_deterministic() {
    let source = r#"
        function scan(radius) {
            let hits = [];
            for (let i = 0; i < radius; i = i + 1) {
                if (i % 2 === 0) { hits = hits; } else { continue; }
            }
            return hits;
        }
        let found = scan(8);
        console.log(`found: ${found}`);
    "#;
    assert_eq!(
        compile_program(source).unwrap(),
        compile_program(source).unwrap()
    );
}

#[test]
fn netbots_compilation_is_deterministic() {
    let graph = r#"{"blocks":[
        {"id":"A","type":"if","config":{"trueTarget":"T","falseTarget":"F"}},
        {"id":"T","type":"step"},
        {"id":"F","type":"end"}],
        "connections":[{"from":"A","to":"T"},{"from":"A","to":"F"},{"from":"T","to":"F"}]}"#;
    assert_eq!(
        compile_netbots(graph).unwrap(),
        compile_netbots(graph).unwrap()
    );
}

#[test]
fn program_jumps_align_on_instruction_starts() {
    let sources = [
        "let a = 1; function b() {} function c() {} if (a) b(); else c();",
        "let n = 5; while (n > 0) n = n - 1;",
        "for (let i = 0; i < 9; i++) { if (i === 3) continue; if (i === 7) break; }",
        "function f() {} function g() {} function h() {} \
         try { f(); } catch (e) { g(); } finally { h(); }",
        "let k = 2; function a() {} function b() {} \
         switch (k) { case 1: a(); break; default: b(); }",
        "let k = 1; let r = 0; \
         switch (k) { case 1: r = 1; default: r = 2; case 2: r = 3; break; }",
        "let a = 1; let b = 2; let c = 3; let d = 4; let done = a && b || c ?? d;",
        "let pairs = []; for (const [x, y] of pairs) { x + y; }",
    ];
    for source in sources {
        let container = compile_program(source).unwrap();
        assert_pbo_jumps_aligned(&split(&container).code);
    }
}

#[test]
fn program_halt_exactly_once() {
    let container = compile_program("function f() { return 2; } f();").unwrap();
    let parsed = split(&container);
    let halts = pbo_instruction_starts(&parsed.code)
        .iter()
        .filter(|&&pos| parsed.code[pos] == 0xFF)
        .count();
    assert_eq!(halts, 1);
    assert_eq!(*parsed.code.last().unwrap(), 0xFF);
}

#[test]
fn literal_statement_exact_bytes() {
    let container = compile_program("42;").unwrap();
    let parsed = split(&container);
    assert_eq!(parsed.code, vec![0x01, 0, 0, 0, 0, 0x02, 0xFF]);
    assert_eq!(parsed.constants, vec![42f64.to_le_bytes().to_vec()]);
}

#[test]
fn constant_pool_dedup() {
    let container = compile_program("let a = 5; let b = 5; let c = \"k\"; let d = \"k\";").unwrap();
    let parsed = split(&container);
    let fives = parsed
        .constants
        .iter()
        .filter(|c| c.as_slice() == 5f64.to_le_bytes())
        .count();
    let keys = parsed
        .constants
        .iter()
        .filter(|c| c.as_slice() == b"k")
        .count();
    assert_eq!(fives, 1);
    assert_eq!(keys, 1);
}

#[test]
fn netbots_linear_graph_exact_bytes() {
    // A -> B emits EXEC_BLOCK A; EXEC_BLOCK B; HALT.
    let container = compile_netbots(
        r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],
            "connections":[{"from":"A","to":"B"}]}"#,
    )
    .unwrap();
    let parsed = split(&container);
    assert_eq!(
        parsed.code,
        vec![0x14, 0, 0, 0, 0, 0x14, 0, 0, 0, 1, 0xFF]
    );
    // Block constants serialize their {type, config} objects.
    assert_eq!(
        parsed.constants[0],
        br#"{"config":null,"type":"start"}"#.to_vec()
    );
}

#[test]
fn netbots_if_block_fall_through() {
    // The true branch falls through, the false branch is
    // placed later and reached by the JZ.
    let container = compile_netbots(
        r#"{"blocks":[
            {"id":"A","type":"if","config":{"trueTarget":"T","falseTarget":"F"}},
            {"id":"T","type":"end"},
            {"id":"F","type":"end"}],
            "connections":[{"from":"A","to":"T"},{"from":"A","to":"F"}]}"#,
    )
    .unwrap();
    let parsed = split(&container);
    let code = &parsed.code;
    assert_eq!(code[5], 0x21, "JZ follows the if block");
    assert_eq!(code[8], 0x14, "true target falls through");
    let disp = i16::from_be_bytes([code[6], code[7]]) as i64;
    let target = (8 + disp) as usize;
    assert_eq!(code[target], 0x14, "JZ resolves to the false target");
    assert!(target > 8);
}

#[test]
fn netbots_exec_blocks_unique_and_entry_first() {
    let graph = r#"{"blocks":[
        {"id":"S","type":"start"},
        {"id":"L","type":"loop","config":{"bodyStart":"B","exitTarget":"E"}},
        {"id":"B","type":"step"},
        {"id":"E","type":"end"}],
        "connections":[{"from":"S","to":"L"},{"from":"L","to":"B"},
                       {"from":"B","to":"L"},{"from":"L","to":"E"}]}"#;
    let parsed = split(&compile_netbots(graph).unwrap());

    // Entry is placed first: code starts with EXEC_BLOCK of constant 0,
    // and the first constant is the start block object.
    assert_eq!(parsed.code[0], 0x14);
    assert_eq!(u32::from_be_bytes(parsed.code[1..5].try_into().unwrap()), 0);
    let first = String::from_utf8(parsed.constants[0].clone()).unwrap();
    assert!(first.contains(r#""type":"start""#));

    // One EXEC_BLOCK per block.
    let mut pos = 0;
    let mut exec_count = 0;
    while pos < parsed.code.len() {
        match parsed.code[pos] {
            0x14 => {
                exec_count += 1;
                pos += 5;
            }
            0x20 | 0x21 | 0x22 => pos += 3,
            0xFF => pos += 1,
            other => panic!("unexpected NBO opcode {:#x}", other),
        }
    }
    assert_eq!(exec_count, 4);
}

#[test]
fn switch_fall_through_executes_next_body() {
    // case 1 carries no break, so its body must run straight into case 2's
    // body: all tests sit before the body area, and the bodies are
    // contiguous in source order.
    let container = compile_program(
        "let k = 1; let a = 0; \
         switch (k) { case 1: a = 1; case 2: a = 2; break; default: a = 3; }",
    )
    .unwrap();
    let parsed = split(&container);
    let code = &parsed.code;
    assert_pbo_jumps_aligned(code);

    let a_idx = parsed
        .constants
        .iter()
        .position(|c| c.as_slice() == b"a")
        .expect("variable name in pool") as u32;
    let starts = pbo_instruction_starts(code);

    let first_eq = starts
        .iter()
        .copied()
        .find(|&pos| code[pos] == Op::Eq as u8)
        .expect("case tests emitted");
    let last_eq = starts
        .iter()
        .copied()
        .filter(|&pos| code[pos] == Op::Eq as u8)
        .last()
        .unwrap();

    // The switch-body stores of `a` (each body is PUSH; DUP; STORE; POP);
    // the `let a = 0` store precedes the first test.
    let body_stores: Vec<usize> = starts
        .iter()
        .copied()
        .filter(|&pos| {
            pos > first_eq
                && code[pos] == Op::StoreVar as u8
                && u32::from_be_bytes(code[pos + 1..pos + 5].try_into().unwrap()) == a_idx
        })
        .collect();
    assert_eq!(body_stores.len(), 3);
    assert!(last_eq < body_stores[0] - 6, "every test precedes every body");

    // Fall-through: case 1's body ends (store, POP) and case 2's body
    // begins with no instruction between, so omitting break executes the
    // next body's store.
    let second_body_start = body_stores[1] - 6;
    assert_eq!(second_body_start, body_stores[0] + 6);

    // Bodies keep source order: they assign 1, 2, 3 in turn.
    for (store, value) in body_stores.iter().zip([1.0f64, 2.0, 3.0]) {
        let push = store - 6;
        assert_eq!(code[push], Op::PushConst as u8);
        let idx = u32::from_be_bytes(code[push + 1..push + 5].try_into().unwrap());
        assert_eq!(parsed.constants[idx as usize], value.to_le_bytes().to_vec());
    }
}

#[test]
fn unterminated_string_reports_source_end() {
    let source = "let s = \"open";
    match compile_program(source) {
        Err(CompileError::Lex(err)) => assert_eq!(err.position, source.len()),
        other => panic!("expected lex error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn break_outside_loop_is_an_emission_error() {
    assert!(matches!(
        compile_program("break;"),
        Err(CompileError::Emit(_))
    ));
}

#[test]
fn duplicate_declaration_message() {
    match compile_program("let a; let a;") {
        Err(CompileError::Semantic(err)) => {
            assert_eq!(err.messages, vec!["Duplicate declaration: a"]);
        }
        other => panic!("expected semantic error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn netbots_two_entries_rejected() {
    let result = compile_netbots(
        r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"start"}],
            "connections":[]}"#,
    );
    match result {
        Err(CompileError::Graph(err)) => {
            assert_eq!(err.to_string(), "multiple start blocks");
        }
        other => panic!("expected graph error, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn netbots_if_without_true_target_rejected() {
    let result = compile_netbots(
        r#"{"blocks":[
            {"id":"A","type":"if","config":{"falseTarget":"B"}},
            {"id":"B","type":"end"}],
            "connections":[{"from":"A","to":"B"}]}"#,
    );
    assert!(matches!(result, Err(CompileError::Graph(_))));
}

#[test]
fn full_language_program_compiles() {
    let source = r#"
        import { base } from "lib/bots";

        class Scout extends base {
            constructor(name) {
                super(name);
                this.seen = [];
            }

            get count() { return this.seen.length; }

            async patrol(area) {
                for (const cell of area.cells) {
                    let { x, y } = cell;
                    if (this.seen[x] ?? false) { continue; }
                    let risk = x > 3 ? x ** 2 : 0;
                    risk += y;
                    try {
                        await this.visit(`cell ${x},${y}`, risk);
                    } catch (err) {
                        console.log(err);
                        throw err;
                    } finally {
                        this.seen[x] = true;
                    }
                }
                return this.count;
            }
        }

        function* ids(limit) {
            let n = 0;
            while (n < limit) { yield n; n = n + 1; }
        }

        export { Scout as Bot };
        export default Scout;
    "#;
    let container = compile_program(source).unwrap();
    assert_pbo_jumps_aligned(&split(&container).code);
}
