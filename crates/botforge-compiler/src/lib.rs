// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # botforge-compiler
//!
//! An ahead-of-time compiler that lowers bot programs into stack-based
//! bytecode containers. Two front ends share one output format:
//!
//! - the textual front end compiles a pragmatic JS-like language
//!   (modules, classes, destructuring, template literals, generators,
//!   async/await, try/catch, switch, iterators, optional chaining,
//!   nullish coalescing) — magic `PBO3`
//! - the NetBots front end compiles JSON control-flow graphs — magic `NBO2`
//!
//! ## Pipeline
//!
//! ```text
//! source text -> lexer -> parser -> semantics -> emitter -> assembler
//! graph JSON  -> validate -> layout ------------^
//! ```
//!
//! A compile invocation runs synchronously to completion and owns all of
//! its state; independent invocations are freely parallelizable. Either a
//! complete container is returned or a single [`CompileError`] — partial
//! output is never produced.
//!
//! ## Quick Start
//!
//! ```rust
//! use botforge_compiler::compile_program;
//!
//! let container = compile_program("let x = 1 + 2;").unwrap();
//! assert_eq!(&container[0..4], b"PBO3");
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod ast;
pub mod binary;
pub mod emitter;
pub mod error;
pub mod lexer;
pub mod netbots;
pub mod parser;
pub mod semantics;

pub use emitter::{Emission, Emitter};
pub use error::CompileError;

use tracing::debug;

/// Container magic for the textual front end, revision 3.
pub const PROGRAM_MAGIC: &[u8; 4] = b"PBO3";

/// Container magic for the NetBots front end, revision 2.
pub const NETBOTS_MAGIC: &[u8; 4] = b"NBO2";

/// Compiles textual source to a `PBO3` byte container.
pub fn compile_program(source: &str) -> Result<Vec<u8>, CompileError> {
    let tokens = lexer::lex(source)?;
    debug!(source_bytes = source.len(), tokens = tokens.len(), "lexed program");

    let program = parser::Parser::new(tokens).parse_program()?;
    debug!(items = program.body.len(), "parsed program");

    semantics::check(&program)?;

    let emission = Emitter::new().emit(&program)?;
    Ok(binary::assemble(
        PROGRAM_MAGIC,
        &emission.code,
        &emission.constants,
    ))
}

/// Compiles a NetBots graph (JSON text) to an `NBO2` byte container.
pub fn compile_netbots(graph_json: &str) -> Result<Vec<u8>, CompileError> {
    let input: netbots::GraphInput = serde_json::from_str(graph_json)?;
    let graph = netbots::validate(input)?;
    let (code, constants) = netbots::emit_graph(&graph)?;
    debug!(
        code_bytes = code.len(),
        constants = constants.len(),
        "emitted graph"
    );
    Ok(binary::assemble(NETBOTS_MAGIC, &code, &constants))
}

/// Runs the front half of the pipeline (lex, parse, semantic analysis)
/// without emitting code.
pub fn analyze_program(source: &str) -> Result<(), CompileError> {
    let tokens = lexer::lex(source)?;
    let program = parser::Parser::new(tokens).parse_program()?;
    semantics::check(&program)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_program_magic() {
        let container = compile_program("1;").unwrap();
        assert_eq!(&container[0..4], b"PBO3");
    }

    #[test]
    fn test_compile_netbots_magic() {
        let container = compile_netbots(
            r#"{"blocks":[{"id":"A","type":"start"}],"connections":[]}"#,
        )
        .unwrap();
        assert_eq!(&container[0..4], b"NBO2");
    }

    #[test]
    fn test_analyze_only() {
        analyze_program("let x = 1; x;").unwrap();
        assert!(analyze_program("let a; let a;").is_err());
    }

    #[test]
    fn test_no_partial_output() {
        let result = compile_program("let x = ;");
        assert!(matches!(result, Err(CompileError::Parse(_))));
    }

    #[test]
    fn test_error_kinds_classifiable() {
        assert!(matches!(
            compile_program("\"unterminated"),
            Err(CompileError::Lex(_))
        ));
        assert!(matches!(
            compile_program("missing();"),
            Err(CompileError::Semantic(_))
        ));
        assert!(matches!(
            compile_program("break;"),
            Err(CompileError::Emit(_))
        ));
        assert!(matches!(
            compile_netbots("not json"),
            Err(CompileError::Json(_))
        ));
        assert!(matches!(
            compile_netbots(r#"{"blocks":[],"connections":[]}"#),
            Err(CompileError::Graph(_))
        ));
    }
}
