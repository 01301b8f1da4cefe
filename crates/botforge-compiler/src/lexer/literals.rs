//! Literal scanning documentation.
//!
//! This module documents the literal scanning logic in `scanner.rs`.
//!
//! ## Numeric Literals
//!
//! ### Decimal Numbers
//!
//! ```text
//! 42        -> integer, stored as f64
//! 3.14      -> float
//! 1e10      -> exponential
//! 1.5e-3    -> exponential with sign
//! ```
//!
//! Method: `scan_number`
//!
//! ### Integer Bases
//!
//! | Prefix | Base | Example |
//! |--------|------|---------|
//! | `0x` | 16 | `0xFF` |
//! | `0o` | 8 | `0o777` |
//! | `0b` | 2 | `0b1010` |
//!
//! Method: `scan_radix_number`
//!
//! ### BigInt
//!
//! A trailing `n` converts an integral literal into a signed 64-bit bigint:
//!
//! ```text
//! 42n       -> BigInt(42)
//! 0xFFn     -> BigInt(255)
//! 1.5n      -> lex error (fractional bigint)
//! ```
//!
//! ## String Literals
//!
//! Single or double quoted. Recognized escapes are `\n \t \r \" \' \\`;
//! any other escape yields the literal trailing character. An unterminated
//! string is a lex error whose position is the end of the source.
//!
//! Method: `scan_string`
//!
//! ## Template Literals
//!
//! Backtick-delimited. Without interpolation a template is a single
//! `Template` token. With interpolation it lexes to the sequence
//!
//! ```text
//! TemplateHead (TemplateExpr TemplateMiddle)* TemplateExpr TemplateTail
//! ```
//!
//! Each interpolation's text is collected with brace-depth tracking (so
//! `{}` inside the interpolation does not close it prematurely) and
//! tokenized by a fresh scanner; the nested stream ends with its own `Eof`.
//!
//! Method: `scan_template`
//!
//! ## Identifiers and Keywords
//!
//! Identifiers match `[A-Za-z_$][A-Za-z0-9_$]*`. Names matching the fixed
//! reserved-word set (see `Keyword`) become keyword tokens.
//!
//! Method: `scan_identifier`
