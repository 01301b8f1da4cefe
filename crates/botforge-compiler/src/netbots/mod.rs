//! The NetBots graph front end.
//!
//! NetBots programs arrive as JSON control-flow graphs: blocks with a type
//! and free-form config, plus directed connections. This module parses and
//! validates the graph against the CFG invariants; `layout.rs` places the
//! blocks and emits code.
//!
//! Invariants enforced here:
//! - every connection endpoint names a declared block
//! - no duplicate edges
//! - exactly one block has no predecessors (the entry)
//! - `if` blocks carry valid `trueTarget`/`falseTarget` and exactly those
//!   two outgoing edges
//! - `loop` blocks carry valid `bodyStart`/`exitTarget`
//! - every other block has at most one successor

mod layout;

pub use layout::emit_graph;

use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;

use crate::error::GraphError;

/// The NetBots input shape.
#[derive(Debug, Deserialize)]
pub struct GraphInput {
    /// Declared blocks
    pub blocks: Vec<BlockDef>,
    /// Directed edges
    #[serde(default)]
    pub connections: Vec<Connection>,
}

/// One declared block.
#[derive(Debug, Deserialize)]
pub struct BlockDef {
    /// Unique block id
    #[serde(default)]
    pub id: String,
    /// Block type (`start`, `if`, `loop`, action types, ...)
    #[serde(rename = "type", default)]
    pub block_type: String,
    /// Free-form block configuration
    #[serde(default)]
    pub config: serde_json::Value,
}

/// One directed edge.
#[derive(Debug, Deserialize)]
pub struct Connection {
    /// Source block id
    pub from: String,
    /// Target block id
    pub to: String,
}

/// A validated control-flow graph.
#[derive(Debug)]
pub struct Graph {
    pub(crate) blocks: Vec<Block>,
    pub(crate) index: FxHashMap<String, usize>,
    pub(crate) entry: String,
}

/// A validated block with its insertion-ordered successors.
#[derive(Debug)]
pub(crate) struct Block {
    pub(crate) id: String,
    pub(crate) block_type: String,
    pub(crate) config: serde_json::Value,
    pub(crate) successors: Vec<String>,
}

impl Graph {
    pub(crate) fn block(&self, id: &str) -> &Block {
        &self.blocks[self.index[id]]
    }
}

/// Validates a parsed graph input against the CFG invariants.
pub fn validate(input: GraphInput) -> Result<Graph, GraphError> {
    let mut blocks = Vec::with_capacity(input.blocks.len());
    let mut index = FxHashMap::default();

    for def in input.blocks {
        if def.id.is_empty() {
            return Err(GraphError::MissingField { field: "id" });
        }
        if def.block_type.is_empty() {
            return Err(GraphError::MissingField { field: "type" });
        }
        if index.contains_key(&def.id) {
            return Err(GraphError::DuplicateBlock { id: def.id });
        }
        index.insert(def.id.clone(), blocks.len());
        blocks.push(Block {
            id: def.id,
            block_type: def.block_type,
            config: def.config,
            successors: Vec::new(),
        });
    }

    let mut has_predecessor: FxHashSet<String> = FxHashSet::default();
    let mut seen_edges: FxHashSet<(String, String)> = FxHashSet::default();

    for connection in &input.connections {
        if !index.contains_key(&connection.from) {
            return Err(GraphError::UnknownBlock {
                id: connection.from.clone(),
            });
        }
        if !index.contains_key(&connection.to) {
            return Err(GraphError::UnknownBlock {
                id: connection.to.clone(),
            });
        }
        let edge = (connection.from.clone(), connection.to.clone());
        if !seen_edges.insert(edge) {
            return Err(GraphError::DuplicateEdge {
                from: connection.from.clone(),
                to: connection.to.clone(),
            });
        }
        blocks[index[&connection.from]]
            .successors
            .push(connection.to.clone());
        has_predecessor.insert(connection.to.clone());
    }

    let mut entries = blocks
        .iter()
        .filter(|block| !has_predecessor.contains(&block.id))
        .map(|block| block.id.clone());
    let entry = entries.next().ok_or(GraphError::NoStartBlock)?;
    if entries.next().is_some() {
        return Err(GraphError::MultipleStartBlocks);
    }
    drop(entries);

    for block in &blocks {
        match block.block_type.as_str() {
            "if" => validate_if(block, &index)?,
            "loop" => validate_loop(block, &index)?,
            _ => {
                if block.successors.len() > 1 {
                    return Err(GraphError::TooManySuccessors {
                        id: block.id.clone(),
                    });
                }
            }
        }
    }

    Ok(Graph {
        blocks,
        index,
        entry,
    })
}

fn config_target(config: &serde_json::Value, field: &str) -> Option<String> {
    config
        .get(field)
        .and_then(|value| value.as_str())
        .map(str::to_string)
}

fn validate_if(block: &Block, index: &FxHashMap<String, usize>) -> Result<(), GraphError> {
    let true_target = config_target(&block.config, "trueTarget").ok_or_else(|| {
        GraphError::MalformedIf {
            id: block.id.clone(),
            reason: "missing trueTarget".to_string(),
        }
    })?;
    let false_target = config_target(&block.config, "falseTarget").ok_or_else(|| {
        GraphError::MalformedIf {
            id: block.id.clone(),
            reason: "missing falseTarget".to_string(),
        }
    })?;

    for target in [&true_target, &false_target] {
        if !index.contains_key(target) {
            return Err(GraphError::MalformedIf {
                id: block.id.clone(),
                reason: format!("target '{}' is not a declared block", target),
            });
        }
    }
    if block.successors.len() != 2 {
        return Err(GraphError::MalformedIf {
            id: block.id.clone(),
            reason: format!(
                "expected exactly 2 outgoing connections, found {}",
                block.successors.len()
            ),
        });
    }
    Ok(())
}

fn validate_loop(block: &Block, index: &FxHashMap<String, usize>) -> Result<(), GraphError> {
    for field in ["bodyStart", "exitTarget"] {
        let target =
            config_target(&block.config, field).ok_or_else(|| GraphError::MalformedLoop {
                id: block.id.clone(),
                reason: format!("missing {}", field),
            })?;
        if !index.contains_key(&target) {
            return Err(GraphError::MalformedLoop {
                id: block.id.clone(),
                reason: format!("target '{}' is not a declared block", target),
            });
        }
    }
    Ok(())
}
