//! Expression parsing: the precedence ladder, member/call chains, literals,
//! and template splicing.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Keyword, Operator, Punct, Token, TokenKind};

use super::parser::Parser;

impl Parser {
    /// Parses an expression.
    pub fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        self.parse_assignment()
    }

    /// Assignment level: right-associative, also home of `yield`.
    pub(crate) fn parse_assignment(&mut self) -> Result<Expression, ParseError> {
        if self.check_keyword(Keyword::Yield) {
            return self.parse_yield();
        }

        let left = self.parse_conditional()?;

        let operator = match &self.current().kind {
            TokenKind::Operator(op) => match op {
                Operator::Assign => Some(AssignmentOperator::Assign),
                Operator::PlusAssign => Some(AssignmentOperator::AddAssign),
                Operator::MinusAssign => Some(AssignmentOperator::SubtractAssign),
                Operator::StarAssign => Some(AssignmentOperator::MultiplyAssign),
                Operator::SlashAssign => Some(AssignmentOperator::DivideAssign),
                Operator::PercentAssign => Some(AssignmentOperator::ModuloAssign),
                Operator::PowAssign => Some(AssignmentOperator::ExponentAssign),
                Operator::ShlAssign => Some(AssignmentOperator::LeftShiftAssign),
                Operator::ShrAssign => Some(AssignmentOperator::RightShiftAssign),
                Operator::UshrAssign => Some(AssignmentOperator::UnsignedRightShiftAssign),
                Operator::AmpAssign => Some(AssignmentOperator::BitwiseAndAssign),
                Operator::PipeAssign => Some(AssignmentOperator::BitwiseOrAssign),
                Operator::CaretAssign => Some(AssignmentOperator::BitwiseXorAssign),
                Operator::AndAssign => Some(AssignmentOperator::LogicalAndAssign),
                Operator::OrAssign => Some(AssignmentOperator::LogicalOrAssign),
                Operator::NullishAssign => Some(AssignmentOperator::NullishAssign),
                _ => None,
            },
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let value = self.parse_assignment()?;
            let target = self.expression_to_assignment_target(left)?;
            return Ok(Expression::Assignment(AssignmentExpression {
                operator,
                target,
                value: Box::new(value),
            }));
        }

        Ok(left)
    }

    fn parse_yield(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // consume 'yield'
        let delegate = self.eat_op(Operator::Star);

        let argument = if self.yield_has_argument() {
            Some(Box::new(self.parse_assignment()?))
        } else {
            None
        };

        Ok(Expression::Yield(YieldExpression { argument, delegate }))
    }

    fn yield_has_argument(&self) -> bool {
        !matches!(
            &self.current().kind,
            TokenKind::Eof
                | TokenKind::Punct(
                    Punct::Semicolon
                        | Punct::RParen
                        | Punct::RBracket
                        | Punct::RBrace
                        | Punct::Comma
                        | Punct::Colon,
                )
        )
    }

    fn parse_conditional(&mut self) -> Result<Expression, ParseError> {
        let test = self.parse_nullish()?;

        if self.eat_punct(Punct::Question) {
            let consequent = self.parse_assignment()?;
            self.expect_punct(Punct::Colon)?;
            let alternate = self.parse_assignment()?;
            return Ok(Expression::Conditional(ConditionalExpression {
                test: Box::new(test),
                consequent: Box::new(consequent),
                alternate: Box::new(alternate),
            }));
        }

        Ok(test)
    }

    fn parse_nullish(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_or()?;

        while self.eat_op(Operator::QuestionQuestion) {
            let right = self.parse_logical_or()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Nullish,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_logical_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_logical_and()?;

        while self.eat_op(Operator::PipePipe) {
            let right = self.parse_logical_and()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::Or,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_logical_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_or()?;

        while self.eat_op(Operator::AmpAmp) {
            let right = self.parse_bitwise_or()?;
            left = Expression::Logical(LogicalExpression {
                operator: LogicalOperator::And,
                left: Box::new(left),
                right: Box::new(right),
            });
        }

        Ok(left)
    }

    fn parse_bitwise_or(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_xor()?;
        while self.check_op(Operator::Pipe) {
            self.advance();
            let right = self.parse_bitwise_xor()?;
            left = binary(BinaryOperator::BitwiseOr, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_xor(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_bitwise_and()?;
        while self.check_op(Operator::Caret) {
            self.advance();
            let right = self.parse_bitwise_and()?;
            left = binary(BinaryOperator::BitwiseXor, left, right);
        }
        Ok(left)
    }

    fn parse_bitwise_and(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_equality()?;
        while self.check_op(Operator::Amp) {
            self.advance();
            let right = self.parse_equality()?;
            left = binary(BinaryOperator::BitwiseAnd, left, right);
        }
        Ok(left)
    }

    fn parse_equality(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_relational()?;

        loop {
            let operator = match &self.current().kind {
                TokenKind::Operator(Operator::Eq) => BinaryOperator::Equal,
                TokenKind::Operator(Operator::Neq) => BinaryOperator::NotEqual,
                TokenKind::Operator(Operator::StrictEq) => BinaryOperator::StrictEqual,
                TokenKind::Operator(Operator::StrictNeq) => BinaryOperator::StrictNotEqual,
                _ => break,
            };
            self.advance();
            let right = self.parse_relational()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_relational(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_shift()?;

        loop {
            let operator = match &self.current().kind {
                TokenKind::Operator(Operator::Lt) => BinaryOperator::LessThan,
                TokenKind::Operator(Operator::Le) => BinaryOperator::LessThanEqual,
                TokenKind::Operator(Operator::Gt) => BinaryOperator::GreaterThan,
                TokenKind::Operator(Operator::Ge) => BinaryOperator::GreaterThanEqual,
                TokenKind::Keyword(Keyword::In) if !self.no_in => BinaryOperator::In,
                TokenKind::Keyword(Keyword::Instanceof) => BinaryOperator::InstanceOf,
                _ => break,
            };
            self.advance();
            let right = self.parse_shift()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_shift(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_additive()?;

        loop {
            let operator = match &self.current().kind {
                TokenKind::Operator(Operator::Shl) => BinaryOperator::LeftShift,
                TokenKind::Operator(Operator::Shr) => BinaryOperator::RightShift,
                TokenKind::Operator(Operator::Ushr) => BinaryOperator::UnsignedRightShift,
                _ => break,
            };
            self.advance();
            let right = self.parse_additive()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_additive(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_multiplicative()?;

        loop {
            let operator = match &self.current().kind {
                TokenKind::Operator(Operator::Plus) => BinaryOperator::Add,
                TokenKind::Operator(Operator::Minus) => BinaryOperator::Subtract,
                _ => break,
            };
            self.advance();
            let right = self.parse_multiplicative()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    fn parse_multiplicative(&mut self) -> Result<Expression, ParseError> {
        let mut left = self.parse_exponent()?;

        loop {
            let operator = match &self.current().kind {
                TokenKind::Operator(Operator::Star) => BinaryOperator::Multiply,
                TokenKind::Operator(Operator::Slash) => BinaryOperator::Divide,
                TokenKind::Operator(Operator::Percent) => BinaryOperator::Modulo,
                _ => break,
            };
            self.advance();
            let right = self.parse_exponent()?;
            left = binary(operator, left, right);
        }

        Ok(left)
    }

    /// Exponentiation is right-associative.
    fn parse_exponent(&mut self) -> Result<Expression, ParseError> {
        let left = self.parse_unary()?;

        if self.eat_op(Operator::StarStar) {
            let right = self.parse_exponent()?;
            return Ok(binary(BinaryOperator::Exponent, left, right));
        }

        Ok(left)
    }

    pub(crate) fn parse_unary(&mut self) -> Result<Expression, ParseError> {
        let operator = match &self.current().kind {
            TokenKind::Operator(Operator::Bang) => Some(UnaryOperator::LogicalNot),
            TokenKind::Operator(Operator::Minus) => Some(UnaryOperator::Minus),
            TokenKind::Operator(Operator::Plus) => Some(UnaryOperator::Plus),
            TokenKind::Operator(Operator::Tilde) => Some(UnaryOperator::BitwiseNot),
            TokenKind::Keyword(Keyword::Typeof) => Some(UnaryOperator::Typeof),
            TokenKind::Keyword(Keyword::Void) => Some(UnaryOperator::Void),
            TokenKind::Keyword(Keyword::Delete) => Some(UnaryOperator::Delete),
            TokenKind::Keyword(Keyword::Await) => Some(UnaryOperator::Await),
            _ => None,
        };

        if let Some(operator) = operator {
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Unary(UnaryExpression {
                operator,
                argument: Box::new(argument),
            }));
        }

        if matches!(
            &self.current().kind,
            TokenKind::Operator(Operator::PlusPlus | Operator::MinusMinus)
        ) {
            let operator = if self.check_op(Operator::PlusPlus) {
                UpdateOperator::Increment
            } else {
                UpdateOperator::Decrement
            };
            self.advance();
            let argument = self.parse_unary()?;
            return Ok(Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(argument),
                prefix: true,
            }));
        }

        self.parse_postfix()
    }

    fn parse_postfix(&mut self) -> Result<Expression, ParseError> {
        let expr = self.parse_call_member()?;

        if matches!(
            &self.current().kind,
            TokenKind::Operator(Operator::PlusPlus | Operator::MinusMinus)
        ) {
            let operator = if self.check_op(Operator::PlusPlus) {
                UpdateOperator::Increment
            } else {
                UpdateOperator::Decrement
            };
            self.advance();
            return Ok(Expression::Update(UpdateExpression {
                operator,
                argument: Box::new(expr),
                prefix: false,
            }));
        }

        Ok(expr)
    }

    fn parse_call_member(&mut self) -> Result<Expression, ParseError> {
        let mut expr = self.parse_primary()?;

        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self.expect_member_name()?;
                expr = member(expr, name, false);
            } else if self.eat_punct(Punct::QuestionDot) {
                let name = self.expect_member_name()?;
                expr = member(expr, name, true);
            } else if self.eat_punct(Punct::LBracket) {
                let property = self.parse_expression()?;
                self.expect_punct(Punct::RBracket)?;
                expr = Expression::Member(MemberExpression {
                    object: Box::new(expr),
                    property: MemberProperty::Expression(Box::new(property)),
                    computed: true,
                    optional: false,
                });
            } else if self.eat_punct(Punct::LParen) {
                let arguments = self.parse_arguments()?;
                expr = Expression::Call(CallExpression {
                    callee: Box::new(expr),
                    arguments,
                    optional: false,
                });
            } else {
                break;
            }
        }

        Ok(expr)
    }

    /// A member name after `.` or `?.` — identifiers and reserved words.
    fn expect_member_name(&mut self) -> Result<Identifier, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let id = Identifier { name: name.clone() };
                self.advance();
                Ok(id)
            }
            TokenKind::Keyword(kw) => {
                let id = Identifier {
                    name: kw.as_str().to_string(),
                };
                self.advance();
                Ok(id)
            }
            _ => Err(self.error("expected property name")),
        }
    }

    /// Parses a comma-separated argument list; the opening paren is already
    /// consumed.
    fn parse_arguments(&mut self) -> Result<Vec<Expression>, ParseError> {
        let mut args = Vec::new();

        if !self.check_punct(Punct::RParen) {
            loop {
                args.push(self.parse_assignment()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }

        self.expect_punct(Punct::RParen)?;
        Ok(args)
    }

    fn parse_primary(&mut self) -> Result<Expression, ParseError> {
        match &self.current().kind {
            TokenKind::Number(n) => {
                let value = *n;
                self.advance();
                Ok(Expression::Literal(Literal::Number(value)))
            }
            TokenKind::BigInt(i) => {
                let value = *i;
                self.advance();
                Ok(Expression::Literal(Literal::BigInt(value)))
            }
            TokenKind::Str(s) => {
                let value = s.clone();
                self.advance();
                Ok(Expression::Literal(Literal::String(value)))
            }
            TokenKind::Template(_) | TokenKind::TemplateHead(_) => self.parse_template(),
            TokenKind::Keyword(Keyword::True) => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(true)))
            }
            TokenKind::Keyword(Keyword::False) => {
                self.advance();
                Ok(Expression::Literal(Literal::Boolean(false)))
            }
            TokenKind::Keyword(Keyword::Null) => {
                self.advance();
                Ok(Expression::Literal(Literal::Null))
            }
            TokenKind::Keyword(Keyword::This) => {
                self.advance();
                Ok(Expression::This)
            }
            TokenKind::Keyword(Keyword::Super) => {
                self.advance();
                Ok(Expression::Super)
            }
            TokenKind::Ident(name) => {
                let id = Identifier { name: name.clone() };
                self.advance();
                Ok(Expression::Identifier(id))
            }
            TokenKind::Punct(Punct::LParen) => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(Punct::RParen)?;
                Ok(expr)
            }
            TokenKind::Punct(Punct::LBracket) => self.parse_array_literal(),
            TokenKind::Punct(Punct::LBrace) => self.parse_object_literal(),
            TokenKind::Keyword(Keyword::Function) => self.parse_function_expression(false),
            TokenKind::Keyword(Keyword::Async)
                if matches!(self.peek_kind(1), TokenKind::Keyword(Keyword::Function)) =>
            {
                self.advance();
                self.parse_function_expression(true)
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class_expression(),
            TokenKind::Keyword(Keyword::New) => self.parse_new_expression(),
            TokenKind::Keyword(Keyword::Import)
                if matches!(self.peek_kind(1), TokenKind::Punct(Punct::LParen)) =>
            {
                self.advance();
                self.advance();
                let source = self.parse_assignment()?;
                self.expect_punct(Punct::RParen)?;
                Ok(Expression::ImportExpr(ImportExpression {
                    source: Box::new(source),
                }))
            }
            _ => Err(self.error("unexpected token in expression")),
        }
    }

    /// Splices a template literal's nested token streams back into parsed
    /// expressions.
    fn parse_template(&mut self) -> Result<Expression, ParseError> {
        if let TokenKind::Template(text) = &self.current().kind {
            let quasis = vec![text.clone()];
            self.advance();
            return Ok(Expression::Template(TemplateLiteral {
                quasis,
                expressions: Vec::new(),
            }));
        }

        let mut quasis = Vec::new();
        let mut expressions = Vec::new();

        match &self.current().kind {
            TokenKind::TemplateHead(text) => {
                quasis.push(text.clone());
                self.advance();
            }
            _ => return Err(self.error("expected template literal")),
        }

        loop {
            match &self.current().kind {
                TokenKind::TemplateExpr(tokens) => {
                    let tokens = tokens.clone();
                    self.advance();
                    expressions.push(parse_nested_expression(tokens)?);
                }
                _ => return Err(self.error("expected template interpolation")),
            }

            match &self.current().kind {
                TokenKind::TemplateMiddle(text) => {
                    quasis.push(text.clone());
                    self.advance();
                }
                TokenKind::TemplateTail(text) => {
                    quasis.push(text.clone());
                    self.advance();
                    break;
                }
                _ => return Err(self.error("expected template continuation")),
            }
        }

        Ok(Expression::Template(TemplateLiteral {
            quasis,
            expressions,
        }))
    }

    fn parse_array_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // consume '['
        let mut elements = Vec::new();

        while !self.check_punct(Punct::RBracket) && !self.is_at_end() {
            if self.eat_punct(Punct::Comma) {
                elements.push(None);
                continue;
            }

            elements.push(Some(self.parse_assignment()?));

            if !self.check_punct(Punct::RBracket) {
                self.expect_punct(Punct::Comma)?;
            }
        }

        self.expect_punct(Punct::RBracket)?;
        Ok(Expression::Array(ArrayExpression { elements }))
    }

    fn parse_object_literal(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // consume '{'
        let mut properties = Vec::new();

        while !self.check_punct(Punct::RBrace) && !self.is_at_end() {
            properties.push(self.parse_object_property()?);

            if !self.check_punct(Punct::RBrace) {
                self.expect_punct(Punct::Comma)?;
            }
        }

        self.expect_punct(Punct::RBrace)?;
        Ok(Expression::Object(ObjectExpression { properties }))
    }

    fn parse_object_property(&mut self) -> Result<Property, ParseError> {
        // `get`/`set` introduce accessors unless they are themselves the key.
        let accessor = if self.check_keyword(Keyword::Get) || self.check_keyword(Keyword::Set) {
            match self.peek_kind(1) {
                TokenKind::Punct(
                    Punct::Colon | Punct::Comma | Punct::LParen | Punct::RBrace,
                ) => None,
                _ => {
                    let kind = if self.check_keyword(Keyword::Get) {
                        PropertyKind::Get
                    } else {
                        PropertyKind::Set
                    };
                    self.advance();
                    Some(kind)
                }
            }
        } else {
            None
        };

        let key = self.parse_property_key()?;

        if let Some(kind) = accessor {
            let params = self.parse_params()?;
            let body = self.parse_brace_body()?;
            return Ok(Property {
                key,
                value: Expression::Function(FunctionExpression {
                    id: None,
                    params,
                    body,
                    is_async: false,
                    is_generator: false,
                }),
                kind,
                shorthand: false,
            });
        }

        // Method shorthand.
        if self.check_punct(Punct::LParen) {
            let params = self.parse_params()?;
            let body = self.parse_brace_body()?;
            return Ok(Property {
                key,
                value: Expression::Function(FunctionExpression {
                    id: None,
                    params,
                    body,
                    is_async: false,
                    is_generator: false,
                }),
                kind: PropertyKind::Init,
                shorthand: false,
            });
        }

        // Data property.
        if self.eat_punct(Punct::Colon) {
            let value = self.parse_assignment()?;
            return Ok(Property {
                key,
                value,
                kind: PropertyKind::Init,
                shorthand: false,
            });
        }

        // Shorthand `{ name }`.
        match &key {
            PropertyKey::Identifier(id) => Ok(Property {
                value: Expression::Identifier(id.clone()),
                key,
                kind: PropertyKind::Init,
                shorthand: true,
            }),
            _ => Err(self.error("expected ':' after property key")),
        }
    }

    fn parse_function_expression(&mut self, is_async: bool) -> Result<Expression, ParseError> {
        self.advance(); // consume 'function'
        let is_generator = self.eat_op(Operator::Star);
        let id = if matches!(self.current().kind, TokenKind::Ident(_)) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let params = self.parse_params()?;
        let body = self.parse_brace_body()?;

        Ok(Expression::Function(FunctionExpression {
            id,
            params,
            body,
            is_async,
            is_generator,
        }))
    }

    fn parse_class_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // consume 'class'
        let id = if matches!(self.current().kind, TokenKind::Ident(_)) {
            Some(self.expect_ident()?)
        } else {
            None
        };
        let superclass = if self.eat_keyword(Keyword::Extends) {
            Some(self.parse_unary()?)
        } else {
            None
        };
        let body = self.parse_class_body()?;

        Ok(Expression::Class(Box::new(ClassExpression {
            id,
            superclass,
            body,
        })))
    }

    fn parse_new_expression(&mut self) -> Result<Expression, ParseError> {
        self.advance(); // consume 'new'

        // The callee is a primary with member accesses only; a trailing
        // argument list belongs to the `new` expression itself.
        let mut callee = self.parse_primary()?;
        loop {
            if self.eat_punct(Punct::Dot) {
                let name = self.expect_member_name()?;
                callee = member(callee, name, false);
            } else if self.eat_punct(Punct::LBracket) {
                let property = self.parse_expression()?;
                self.expect_punct(Punct::RBracket)?;
                callee = Expression::Member(MemberExpression {
                    object: Box::new(callee),
                    property: MemberProperty::Expression(Box::new(property)),
                    computed: true,
                    optional: false,
                });
            } else {
                break;
            }
        }

        let arguments = if self.eat_punct(Punct::LParen) {
            self.parse_arguments()?
        } else {
            Vec::new()
        };

        Ok(Expression::New(NewExpression {
            callee: Box::new(callee),
            arguments,
        }))
    }
}

/// Parses one template interpolation's nested token stream.
fn parse_nested_expression(tokens: Vec<Token>) -> Result<Expression, ParseError> {
    let mut parser = Parser::new(tokens);
    let expr = parser.parse_expression()?;
    parser.expect_eof()?;
    Ok(expr)
}

fn binary(operator: BinaryOperator, left: Expression, right: Expression) -> Expression {
    Expression::Binary(BinaryExpression {
        operator,
        left: Box::new(left),
        right: Box::new(right),
    })
}

fn member(object: Expression, name: Identifier, optional: bool) -> Expression {
    Expression::Member(MemberExpression {
        object: Box::new(object),
        property: MemberProperty::Identifier(name),
        computed: false,
        optional,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse_expr(source: &str) -> Expression {
        let tokens = lex(source).expect("lexing should succeed");
        let mut parser = Parser::new(tokens);
        let expr = parser.parse_expression().expect("parsing should succeed");
        parser.expect_eof().expect("expression should consume input");
        expr
    }

    #[test]
    fn test_precedence_mul_over_add() {
        match parse_expr("1 + 2 * 3") {
            Expression::Binary(b) => {
                assert_eq!(b.operator, BinaryOperator::Add);
                assert!(matches!(
                    *b.right,
                    Expression::Binary(BinaryExpression {
                        operator: BinaryOperator::Multiply,
                        ..
                    })
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_exponent_right_associative() {
        match parse_expr("2 ** 3 ** 4") {
            Expression::Binary(b) => {
                assert_eq!(b.operator, BinaryOperator::Exponent);
                assert!(matches!(*b.left, Expression::Literal(_)));
                assert!(matches!(
                    *b.right,
                    Expression::Binary(BinaryExpression {
                        operator: BinaryOperator::Exponent,
                        ..
                    })
                ));
            }
            other => panic!("expected binary, got {:?}", other),
        }
    }

    #[test]
    fn test_assignment_right_associative() {
        match parse_expr("a = b = 1") {
            Expression::Assignment(a) => {
                assert!(matches!(*a.value, Expression::Assignment(_)));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }

    #[test]
    fn test_ternary() {
        assert!(matches!(
            parse_expr("a ? b : c"),
            Expression::Conditional(_)
        ));
    }

    #[test]
    fn test_logical_operators() {
        for (src, op) in [
            ("a && b", LogicalOperator::And),
            ("a || b", LogicalOperator::Or),
            ("a ?? b", LogicalOperator::Nullish),
        ] {
            match parse_expr(src) {
                Expression::Logical(l) => assert_eq!(l.operator, op),
                other => panic!("expected logical, got {:?}", other),
            }
        }
    }

    #[test]
    fn test_member_and_call_chain() {
        match parse_expr("a.b[c](1, 2).d") {
            Expression::Member(m) => {
                assert!(!m.computed);
                assert!(matches!(*m.object, Expression::Call(_)));
            }
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_optional_chaining() {
        match parse_expr("a?.b") {
            Expression::Member(m) => assert!(m.optional),
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_keyword_member_name() {
        match parse_expr("cfg.default") {
            Expression::Member(m) => match m.property {
                MemberProperty::Identifier(id) => assert_eq!(id.name, "default"),
                other => panic!("expected identifier property, got {:?}", other),
            },
            other => panic!("expected member, got {:?}", other),
        }
    }

    #[test]
    fn test_update_expressions() {
        match parse_expr("x++") {
            Expression::Update(u) => {
                assert!(!u.prefix);
                assert_eq!(u.operator, UpdateOperator::Increment);
            }
            other => panic!("expected update, got {:?}", other),
        }
        match parse_expr("--y") {
            Expression::Update(u) => {
                assert!(u.prefix);
                assert_eq!(u.operator, UpdateOperator::Decrement);
            }
            other => panic!("expected update, got {:?}", other),
        }
    }

    #[test]
    fn test_array_with_holes() {
        match parse_expr("[1, , 2]") {
            Expression::Array(arr) => {
                assert_eq!(arr.elements.len(), 3);
                assert!(arr.elements[1].is_none());
            }
            other => panic!("expected array, got {:?}", other),
        }
    }

    #[test]
    fn test_object_literal_forms() {
        match parse_expr("{ a: 1, b, c() { return 1; }, [k]: 2, get d() { return 3; } }") {
            Expression::Object(obj) => {
                assert_eq!(obj.properties.len(), 5);
                assert!(obj.properties[1].shorthand);
                assert!(matches!(obj.properties[3].key, PropertyKey::Computed(_)));
                assert_eq!(obj.properties[4].kind, PropertyKind::Get);
            }
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn test_template_expression() {
        match parse_expr("`a${x}b${y}c`") {
            Expression::Template(t) => {
                assert_eq!(t.quasis, vec!["a", "b", "c"]);
                assert_eq!(t.expressions.len(), 2);
            }
            other => panic!("expected template, got {:?}", other),
        }
    }

    #[test]
    fn test_new_expression() {
        match parse_expr("new Bot(1)") {
            Expression::New(n) => {
                assert_eq!(n.arguments.len(), 1);
            }
            other => panic!("expected new, got {:?}", other),
        }
        assert!(matches!(parse_expr("new Bot"), Expression::New(_)));
    }

    #[test]
    fn test_dynamic_import() {
        assert!(matches!(
            parse_expr("import(\"mod\")"),
            Expression::ImportExpr(_)
        ));
    }

    #[test]
    fn test_yield_forms() {
        match parse_expr("yield 1") {
            Expression::Yield(y) => {
                assert!(!y.delegate);
                assert!(y.argument.is_some());
            }
            other => panic!("expected yield, got {:?}", other),
        }
        match parse_expr("yield* gen()") {
            Expression::Yield(y) => assert!(y.delegate),
            other => panic!("expected yield, got {:?}", other),
        }
        match parse_expr("yield") {
            Expression::Yield(y) => assert!(y.argument.is_none()),
            other => panic!("expected yield, got {:?}", other),
        }
    }

    #[test]
    fn test_await_unary() {
        match parse_expr("await f()") {
            Expression::Unary(u) => assert_eq!(u.operator, UnaryOperator::Await),
            other => panic!("expected unary, got {:?}", other),
        }
    }

    #[test]
    fn test_destructuring_assignment_target() {
        match parse_expr("[a, b] = pair") {
            Expression::Assignment(a) => {
                assert!(matches!(a.target, AssignmentTarget::Pattern(_)));
            }
            other => panic!("expected assignment, got {:?}", other),
        }
    }
}
