//! Worklist layout for validated graphs.
//!
//! Produces linear code with fall-through where possible: a block's
//! preferred successor goes to the front of the worklist, alternatives to
//! the back. Jumps to already-placed (or deferred) blocks are recorded as
//! patches and resolved once every reachable block has a position.

use std::collections::VecDeque;

use rustc_hash::FxHashMap;
use serde_json::json;
use tracing::trace;

use crate::emitter::constants::{Const, ConstantPool};
use crate::emitter::opcodes::{Op, EXEC_BLOCK};
use crate::emitter::CodeBuffer;
use crate::error::GraphError;

use super::{Block, Graph};

/// Lays out a validated graph and emits its code and constants.
///
/// Each placed block becomes `EXEC_BLOCK const_idx` where the constant is
/// the block's `{type, config}` object; the entry block is placed first.
pub fn emit_graph(graph: &Graph) -> Result<(Vec<u8>, Vec<Const>), GraphError> {
    let mut code = CodeBuffer::new();
    let mut pool = ConstantPool::new();
    let mut placed: FxHashMap<String, usize> = FxHashMap::default();
    let mut patches: Vec<(crate::emitter::Jump, String)> = Vec::new();
    let mut pending: VecDeque<String> = VecDeque::new();

    pending.push_back(graph.entry.clone());

    while let Some(id) = pending.pop_front() {
        if placed.contains_key(&id) {
            continue;
        }
        let block = graph.block(&id);
        placed.insert(id.clone(), code.here());
        trace!(id = %block.id, offset = code.here(), "placing block");

        let const_idx = pool.add(Const::Object(json!({
            "type": block.block_type,
            "config": block.config,
        })));
        code.byte(EXEC_BLOCK);
        code.u32(const_idx);

        match block.block_type.as_str() {
            "if" => {
                let true_target = target(block, "trueTarget")?;
                let false_target = target(block, "falseTarget")?;
                let jz = code.jump(Op::Jz);
                patches.push((jz, false_target.clone()));
                pending.push_front(true_target);
                pending.push_back(false_target);
            }
            "loop" => {
                let body_start = target(block, "bodyStart")?;
                let exit_target = target(block, "exitTarget")?;
                let jz = code.jump(Op::Jz);
                patches.push((jz, exit_target.clone()));
                pending.push_front(body_start);
                pending.push_back(exit_target);
            }
            _ => match block.successors.first() {
                None => code.op(Op::Halt),
                Some(successor) => {
                    if placed.contains_key(successor) {
                        let jmp = code.jump(Op::Jmp);
                        patches.push((jmp, successor.clone()));
                    } else {
                        pending.push_front(successor.clone());
                    }
                }
            },
        }
    }

    for (jump, target) in patches {
        let position = placed
            .get(&target)
            .copied()
            .ok_or(GraphError::UnresolvedTarget { id: target })?;
        code.patch(jump, position)
            .map_err(|_| GraphError::JumpOutOfRange)?;
    }

    Ok((code.bytes, pool.into_values()))
}

/// Reads a config target re-checked here so layout never panics on a graph
/// that slipped past validation.
fn target(block: &Block, field: &str) -> Result<String, GraphError> {
    block
        .config
        .get(field)
        .and_then(|value| value.as_str())
        .map(str::to_string)
        .ok_or_else(|| match block.block_type.as_str() {
            "if" => GraphError::MalformedIf {
                id: block.id.clone(),
                reason: format!("missing {}", field),
            },
            _ => GraphError::MalformedLoop {
                id: block.id.clone(),
                reason: format!("missing {}", field),
            },
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::netbots::{validate, GraphInput};

    fn layout(json: &str) -> (Vec<u8>, Vec<Const>) {
        let input: GraphInput = serde_json::from_str(json).expect("valid JSON");
        let graph = validate(input).expect("valid graph");
        emit_graph(&graph).expect("layout should succeed")
    }

    #[test]
    fn test_linear_graph() {
        let (code, constants) = layout(
            r#"{"blocks":[{"id":"A","type":"start"},{"id":"B","type":"end"}],
                "connections":[{"from":"A","to":"B"}]}"#,
        );
        // EXEC_BLOCK 0; EXEC_BLOCK 1; HALT
        assert_eq!(
            code,
            vec![0x14, 0, 0, 0, 0, 0x14, 0, 0, 0, 1, 0xFF]
        );
        assert_eq!(constants.len(), 2);
    }

    #[test]
    fn test_if_fall_through_true_branch() {
        let (code, _) = layout(
            r#"{"blocks":[
                  {"id":"A","type":"if","config":{"trueTarget":"T","falseTarget":"F"}},
                  {"id":"T","type":"end"},
                  {"id":"F","type":"end"}],
                "connections":[{"from":"A","to":"T"},{"from":"A","to":"F"}]}"#,
        );
        // A: EXEC_BLOCK(5) JZ(3); T: EXEC_BLOCK HALT; F: EXEC_BLOCK HALT
        assert_eq!(code[5], Op::Jz as u8);
        // T falls through directly after the JZ.
        assert_eq!(code[8], 0x14);
        // The JZ displacement lands on F's EXEC_BLOCK.
        let disp = i16::from_be_bytes([code[6], code[7]]) as i64;
        let target = (6 + 2) as i64 + disp;
        assert_eq!(target, 14);
        assert_eq!(code[14], 0x14);
    }

    #[test]
    fn test_loop_back_edge() {
        let (code, _) = layout(
            r#"{"blocks":[
                  {"id":"S","type":"start"},
                  {"id":"L","type":"loop","config":{"bodyStart":"B","exitTarget":"E"}},
                  {"id":"B","type":"step"},
                  {"id":"E","type":"end"}],
                "connections":[{"from":"S","to":"L"},{"from":"L","to":"B"},
                               {"from":"B","to":"L"},{"from":"L","to":"E"}]}"#,
        );
        // B's successor L is already placed, so B ends in an explicit
        // backward JMP.
        let jmp_pos = code
            .iter()
            .position(|&b| b == Op::Jmp as u8)
            .expect("expected a JMP back to the loop head");
        let disp = i16::from_be_bytes([code[jmp_pos + 1], code[jmp_pos + 2]]);
        assert!(disp < 0);
    }

    #[test]
    fn test_each_block_placed_once() {
        let (code, constants) = layout(
            r#"{"blocks":[
                  {"id":"A","type":"if","config":{"trueTarget":"C","falseTarget":"B"}},
                  {"id":"B","type":"step"},
                  {"id":"C","type":"end"}],
                "connections":[{"from":"A","to":"B"},{"from":"A","to":"C"},{"from":"B","to":"C"}]}"#,
        );
        let exec_count = count_exec_blocks(&code);
        assert_eq!(exec_count, 3);
        assert_eq!(constants.len(), 3);
    }

    fn count_exec_blocks(code: &[u8]) -> usize {
        // Walk the instruction stream; EXEC_BLOCK carries a u32 operand,
        // jumps carry 2 bytes, HALT none.
        let mut count = 0;
        let mut pos = 0;
        while pos < code.len() {
            match code[pos] {
                0x14 => {
                    count += 1;
                    pos += 5;
                }
                0x20 | 0x21 | 0x22 => pos += 3,
                0xFF => pos += 1,
                other => panic!("unexpected opcode {:#x}", other),
            }
        }
        count
    }
}
