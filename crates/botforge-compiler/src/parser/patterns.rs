//! Destructuring pattern parsing and expression-to-pattern conversion.
//!
//! Patterns appear in five positions: parameters, variable declarators,
//! catch parameters, for-in/of heads, and assignment targets. The first
//! four parse patterns directly; assignment targets are parsed as
//! expressions first and converted here.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Punct, TokenKind};

use super::parser::Parser;

impl Parser {
    /// Parses a binding position: identifier or destructuring pattern.
    pub(crate) fn parse_binding_target(&mut self) -> Result<BindingTarget, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(_) => Ok(BindingTarget::Identifier(self.expect_ident()?)),
            TokenKind::Punct(Punct::LBrace) => {
                Ok(BindingTarget::Pattern(Pattern::Object(self.parse_object_pattern()?)))
            }
            TokenKind::Punct(Punct::LBracket) => {
                Ok(BindingTarget::Pattern(Pattern::Array(self.parse_array_pattern()?)))
            }
            _ => Err(self.error("expected binding identifier or pattern")),
        }
    }

    fn parse_object_pattern(&mut self) -> Result<ObjectPattern, ParseError> {
        self.advance(); // consume '{'
        let mut entries = Vec::new();

        while !self.check_punct(Punct::RBrace) && !self.is_at_end() {
            let key = match &self.current().kind {
                TokenKind::Ident(name) => {
                    let name = name.clone();
                    self.advance();
                    name
                }
                TokenKind::Keyword(kw) => {
                    let name = kw.as_str().to_string();
                    self.advance();
                    name
                }
                TokenKind::Str(s) => {
                    let name = s.clone();
                    self.advance();
                    name
                }
                _ => return Err(self.error("expected property name in pattern")),
            };

            let value = if self.eat_punct(Punct::Colon) {
                self.parse_pattern_target()?
            } else {
                PatternTarget::Identifier(Identifier { name: key.clone() })
            };

            entries.push(ObjectPatternEntry { key, value });

            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }

        self.expect_punct(Punct::RBrace)?;
        Ok(ObjectPattern { entries })
    }

    fn parse_array_pattern(&mut self) -> Result<ArrayPattern, ParseError> {
        self.advance(); // consume '['
        let mut elements = Vec::new();

        while !self.check_punct(Punct::RBracket) && !self.is_at_end() {
            if self.eat_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }

            elements.push(Some(self.parse_pattern_target()?));

            if !self.check_punct(Punct::RBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }

        self.expect_punct(Punct::RBracket)?;
        Ok(ArrayPattern { elements })
    }

    fn parse_pattern_target(&mut self) -> Result<PatternTarget, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(_) => Ok(PatternTarget::Identifier(self.expect_ident()?)),
            TokenKind::Punct(Punct::LBrace) => Ok(PatternTarget::Pattern(Box::new(
                Pattern::Object(self.parse_object_pattern()?),
            ))),
            TokenKind::Punct(Punct::LBracket) => Ok(PatternTarget::Pattern(Box::new(
                Pattern::Array(self.parse_array_pattern()?),
            ))),
            _ => Err(self.error("invalid destructuring target")),
        }
    }

    /// Reinterprets an already-parsed expression as an assignment target.
    pub(crate) fn expression_to_assignment_target(
        &self,
        expr: Expression,
    ) -> Result<AssignmentTarget, ParseError> {
        match expr {
            Expression::Identifier(id) => Ok(AssignmentTarget::Identifier(id)),
            Expression::Member(member) => Ok(AssignmentTarget::Member(member)),
            Expression::Array(array) => Ok(AssignmentTarget::Pattern(Pattern::Array(
                self.array_to_pattern(array)?,
            ))),
            Expression::Object(object) => Ok(AssignmentTarget::Pattern(Pattern::Object(
                self.object_to_pattern(object)?,
            ))),
            _ => Err(self.error("invalid assignment target")),
        }
    }

    fn array_to_pattern(&self, array: ArrayExpression) -> Result<ArrayPattern, ParseError> {
        let mut elements = Vec::new();
        for element in array.elements {
            match element {
                None => elements.push(None),
                Some(expr) => elements.push(Some(self.expression_to_pattern_target(expr)?)),
            }
        }
        Ok(ArrayPattern { elements })
    }

    fn object_to_pattern(&self, object: ObjectExpression) -> Result<ObjectPattern, ParseError> {
        let mut entries = Vec::new();
        for property in object.properties {
            if property.kind != PropertyKind::Init {
                return Err(self.error("invalid destructuring target"));
            }
            let key = match &property.key {
                PropertyKey::Identifier(id) => id.name.clone(),
                PropertyKey::Literal(Literal::String(s)) => s.clone(),
                _ => return Err(self.error("invalid destructuring target")),
            };
            let value = self.expression_to_pattern_target(property.value)?;
            entries.push(ObjectPatternEntry { key, value });
        }
        Ok(ObjectPattern { entries })
    }

    fn expression_to_pattern_target(
        &self,
        expr: Expression,
    ) -> Result<PatternTarget, ParseError> {
        match expr {
            Expression::Identifier(id) => Ok(PatternTarget::Identifier(id)),
            Expression::Array(array) => Ok(PatternTarget::Pattern(Box::new(Pattern::Array(
                self.array_to_pattern(array)?,
            )))),
            Expression::Object(object) => Ok(PatternTarget::Pattern(Box::new(Pattern::Object(
                self.object_to_pattern(object)?,
            )))),
            _ => Err(self.error("invalid destructuring target")),
        }
    }
}
