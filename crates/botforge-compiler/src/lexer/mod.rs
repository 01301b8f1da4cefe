//! Lexical analysis (tokenization) for bot-program source code.
//!
//! The lexer transforms source text into a flat stream of tokens for the
//! parser. Template literals are the one non-flat construct: each
//! interpolation is tokenized by a fresh scanner and spliced into the outer
//! stream as a nested `TemplateExpr` token.
//!
//! ## Structure
//!
//! - `scanner.rs` - Main `Scanner` struct that produces tokens
//! - `token.rs` - `Token`, `TokenKind`, `Keyword`, `Operator`, `Punct`
//!
//! ## Documentation Submodules
//!
//! - `literals` - Number, string, and template literal forms
//!
//! ## Usage
//!
//! ```rust
//! use botforge_compiler::lexer;
//!
//! let tokens = lexer::lex("let x = 42;").unwrap();
//! assert_eq!(tokens.len(), 6); // let, x, =, 42, ;, EOF
//! ```

mod scanner;
mod token;

// Documentation submodule
pub mod literals;

pub use scanner::{lex, Scanner};
pub use token::{Keyword, Operator, Punct, Span, Token, TokenKind};
