//! Error types for the compiler.
//!
//! Each pipeline stage has its own error type so callers can classify
//! failures by kind; [`CompileError`] is the umbrella returned by the
//! compile entry points. No partial output is ever produced alongside an
//! error.

use thiserror::Error;

/// Any failure during compilation.
#[derive(Debug, Error)]
pub enum CompileError {
    /// Tokenization failure
    #[error(transparent)]
    Lex(#[from] LexError),

    /// Syntax failure
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// Binding-resolution failures (collected in batch)
    #[error(transparent)]
    Semantic(#[from] SemanticError),

    /// Bytecode emission failure
    #[error(transparent)]
    Emit(#[from] EmitError),

    /// NetBots graph failure
    #[error(transparent)]
    Graph(#[from] GraphError),

    /// Malformed NetBots input JSON
    #[error("invalid graph JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// A tokenization error at a byte position in the source.
#[derive(Debug, Clone, Error)]
#[error("lex error at byte {position}: {message}")]
pub struct LexError {
    /// Byte offset into the source where the error was detected
    pub position: usize,
    /// Human-readable description
    pub message: String,
}

impl LexError {
    pub(crate) fn new(position: usize, message: impl Into<String>) -> Self {
        Self {
            position,
            message: message.into(),
        }
    }
}

/// A syntax error. The parser stops at the first failure.
#[derive(Debug, Clone, Error)]
#[error("parse error at byte {position}: {message} (found {found})")]
pub struct ParseError {
    /// Byte offset of the offending token
    pub position: usize,
    /// Rendering of the offending token
    pub found: String,
    /// Human-readable description
    pub message: String,
}

/// All semantic diagnostics for a program, reported atomically.
#[derive(Debug, Clone, Error)]
#[error("{}", messages.join("; "))]
pub struct SemanticError {
    /// Every diagnostic collected while walking the tree
    pub messages: Vec<String>,
}

/// A failure while lowering a validated AST to bytecode.
#[derive(Debug, Clone, Error)]
pub enum EmitError {
    /// `break` with no enclosing loop
    #[error("'break' outside of a loop")]
    BreakOutsideLoop,

    /// `continue` with no enclosing loop
    #[error("'continue' outside of a loop")]
    ContinueOutsideLoop,

    /// Compound assignment into something that is neither an identifier nor
    /// a member expression
    #[error("invalid compound assignment target")]
    InvalidAssignmentTarget,

    /// A construct the emitter cannot lower
    #[error("unsupported construct: {0}")]
    Unsupported(String),

    /// A jump displacement does not fit in a signed 16-bit operand
    #[error("jump displacement out of signed 16-bit range")]
    JumpOutOfRange,
}

/// A NetBots graph that violates the CFG invariants.
#[derive(Debug, Clone, Error)]
pub enum GraphError {
    /// A block is missing its id or type
    #[error("block is missing required field '{field}'")]
    MissingField {
        /// The absent field name
        field: &'static str,
    },

    /// Two blocks share an id
    #[error("duplicate block id: {id}")]
    DuplicateBlock {
        /// The repeated id
        id: String,
    },

    /// A connection endpoint names an undeclared block
    #[error("connection references unknown block: {id}")]
    UnknownBlock {
        /// The undeclared id
        id: String,
    },

    /// The same edge appears twice
    #[error("duplicate connection {from} -> {to}")]
    DuplicateEdge {
        /// Source block id
        from: String,
        /// Target block id
        to: String,
    },

    /// No block with empty predecessors
    #[error("graph has no start block")]
    NoStartBlock,

    /// More than one block with empty predecessors
    #[error("multiple start blocks")]
    MultipleStartBlocks,

    /// An `if` block without a valid trueTarget/falseTarget pair
    #[error("malformed 'if' block {id}: {reason}")]
    MalformedIf {
        /// The offending block
        id: String,
        /// What is wrong with its config
        reason: String,
    },

    /// A `loop` block without bodyStart/exitTarget
    #[error("malformed 'loop' block {id}: {reason}")]
    MalformedLoop {
        /// The offending block
        id: String,
        /// What is wrong with its config
        reason: String,
    },

    /// A non-branching block with more than one outgoing edge
    #[error("block {id} has multiple successors")]
    TooManySuccessors {
        /// The offending block
        id: String,
    },

    /// A patched jump whose target was never placed
    #[error("unresolved jump target: {id}")]
    UnresolvedTarget {
        /// The missing block
        id: String,
    },

    /// A jump displacement does not fit in a signed 16-bit operand
    #[error("jump displacement out of signed 16-bit range")]
    JumpOutOfRange,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lex_error_display() {
        let err = LexError::new(12, "unterminated string");
        assert_eq!(err.to_string(), "lex error at byte 12: unterminated string");
    }

    #[test]
    fn test_semantic_error_joins_messages() {
        let err = SemanticError {
            messages: vec![
                "Duplicate declaration: a".to_string(),
                "Undefined variable: b".to_string(),
            ],
        };
        assert_eq!(
            err.to_string(),
            "Duplicate declaration: a; Undefined variable: b"
        );
    }

    #[test]
    fn test_compile_error_classification() {
        let err: CompileError = EmitError::BreakOutsideLoop.into();
        assert!(matches!(err, CompileError::Emit(_)));

        let err: CompileError = GraphError::MultipleStartBlocks.into();
        assert!(matches!(err, CompileError::Graph(_)));
    }
}
