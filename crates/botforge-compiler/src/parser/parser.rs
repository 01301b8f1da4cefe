//! The main parser implementation: statements, declarations, and modules.
//!
//! Expression parsing lives in `expressions.rs`, destructuring patterns in
//! `patterns.rs`. The parser consumes a pre-lexed token stream, never
//! recovers after an error, and reads exactly to the terminating `Eof`.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Keyword, Operator, Punct, Token, TokenKind};

/// A recursive descent parser for bot programs.
pub struct Parser {
    pub(crate) tokens: Vec<Token>,
    pub(crate) pos: usize,
    /// Suppresses the `in` operator while parsing a for-header expression.
    pub(crate) no_in: bool,
}

impl Parser {
    /// Creates a new parser over a token stream produced by [`crate::lexer::lex`].
    pub fn new(tokens: Vec<Token>) -> Self {
        Self {
            tokens,
            pos: 0,
            no_in: false,
        }
    }

    /// Parses the whole stream into a [`Program`].
    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let mut body = Vec::new();

        while !self.is_at_end() {
            body.push(self.parse_module_item()?);
        }

        Ok(Program { body })
    }

    fn parse_module_item(&mut self) -> Result<Statement, ParseError> {
        match &self.current().kind {
            TokenKind::Keyword(Keyword::Import)
                if !matches!(
                    self.peek_kind(1),
                    TokenKind::Punct(Punct::LParen)
                ) =>
            {
                self.parse_import_declaration()
            }
            TokenKind::Keyword(Keyword::Export) => self.parse_export_declaration(),
            _ => self.parse_statement(),
        }
    }

    /// Parses a single statement.
    pub fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match &self.current().kind {
            TokenKind::Keyword(Keyword::Var | Keyword::Let | Keyword::Const) => {
                let decl = self.parse_variable_declaration()?;
                self.expect_punct(Punct::Semicolon)?;
                Ok(Statement::VariableDeclaration(decl))
            }
            TokenKind::Keyword(Keyword::Function) => self.parse_function_declaration(false),
            TokenKind::Keyword(Keyword::Async)
                if matches!(self.peek_kind(1), TokenKind::Keyword(Keyword::Function)) =>
            {
                self.advance();
                self.parse_function_declaration(true)
            }
            TokenKind::Keyword(Keyword::Class) => self.parse_class_declaration(),
            TokenKind::Keyword(Keyword::If) => self.parse_if_statement(),
            TokenKind::Keyword(Keyword::While) => self.parse_while_statement(),
            TokenKind::Keyword(Keyword::For) => self.parse_for_statement(),
            TokenKind::Keyword(Keyword::Return) => self.parse_return_statement(),
            TokenKind::Keyword(Keyword::Break) => {
                self.advance();
                self.expect_punct(Punct::Semicolon)?;
                Ok(Statement::Break)
            }
            TokenKind::Keyword(Keyword::Continue) => {
                self.advance();
                self.expect_punct(Punct::Semicolon)?;
                Ok(Statement::Continue)
            }
            TokenKind::Keyword(Keyword::Throw) => {
                self.advance();
                let argument = self.parse_expression()?;
                self.expect_punct(Punct::Semicolon)?;
                Ok(Statement::Throw(ThrowStatement { argument }))
            }
            TokenKind::Keyword(Keyword::Try) => self.parse_try_statement(),
            TokenKind::Keyword(Keyword::Switch) => self.parse_switch_statement(),
            TokenKind::Punct(Punct::LBrace) => {
                Ok(Statement::Block(self.parse_block_statement()?))
            }
            TokenKind::Punct(Punct::Semicolon) => {
                self.advance();
                Ok(Statement::Empty)
            }
            _ => self.parse_expression_statement(),
        }
    }

    fn parse_variable_declaration(&mut self) -> Result<VariableDeclaration, ParseError> {
        let kind = match &self.current().kind {
            TokenKind::Keyword(Keyword::Var) => VariableKind::Var,
            TokenKind::Keyword(Keyword::Let) => VariableKind::Let,
            TokenKind::Keyword(Keyword::Const) => VariableKind::Const,
            _ => return Err(self.error("expected declaration keyword")),
        };
        self.advance();

        let mut declarations = Vec::new();

        loop {
            let target = self.parse_binding_target()?;
            let init = if self.eat_op(Operator::Assign) {
                Some(self.parse_assignment()?)
            } else {
                None
            };

            declarations.push(VariableDeclarator { target, init });

            if !self.eat_punct(Punct::Comma) {
                break;
            }
        }

        Ok(VariableDeclaration { kind, declarations })
    }

    fn parse_function_declaration(&mut self, is_async: bool) -> Result<Statement, ParseError> {
        self.advance(); // consume 'function'
        let is_generator = self.eat_op(Operator::Star);

        let id = self.expect_ident()?;
        let params = self.parse_params()?;
        let body = self.parse_brace_body()?;

        Ok(Statement::FunctionDeclaration(FunctionDeclaration {
            id,
            params,
            body,
            is_async,
            is_generator,
        }))
    }

    pub(crate) fn parse_params(&mut self) -> Result<Vec<BindingTarget>, ParseError> {
        self.expect_punct(Punct::LParen)?;
        let mut params = Vec::new();

        if !self.check_punct(Punct::RParen) {
            loop {
                params.push(self.parse_binding_target()?);
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
        }

        self.expect_punct(Punct::RParen)?;
        Ok(params)
    }

    /// Parses `{ statements }` and returns the inner statements.
    pub(crate) fn parse_brace_body(&mut self) -> Result<Vec<Statement>, ParseError> {
        self.expect_punct(Punct::LBrace)?;
        let mut body = Vec::new();

        while !self.check_punct(Punct::RBrace) && !self.is_at_end() {
            body.push(self.parse_statement()?);
        }

        self.expect_punct(Punct::RBrace)?;
        Ok(body)
    }

    fn parse_block_statement(&mut self) -> Result<BlockStatement, ParseError> {
        Ok(BlockStatement {
            body: self.parse_brace_body()?,
        })
    }

    fn parse_if_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'if'
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let consequent = Box::new(self.parse_statement()?);
        let alternate = if self.eat_keyword(Keyword::Else) {
            Some(Box::new(self.parse_statement()?))
        } else {
            None
        };

        Ok(Statement::If(IfStatement {
            test,
            consequent,
            alternate,
        }))
    }

    fn parse_while_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'while'
        self.expect_punct(Punct::LParen)?;
        let test = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(Statement::While(WhileStatement { test, body }))
    }

    fn parse_for_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'for'
        self.expect_punct(Punct::LParen)?;

        // Declaration-form header: may turn out to be for-in/for-of.
        if let TokenKind::Keyword(kw @ (Keyword::Var | Keyword::Let | Keyword::Const)) =
            self.current().kind
        {
            let kind = match kw {
                Keyword::Var => VariableKind::Var,
                Keyword::Let => VariableKind::Let,
                _ => VariableKind::Const,
            };
            self.advance();
            let target = self.parse_binding_target()?;

            if self.eat_keyword(Keyword::In) {
                return self.parse_for_in_of_tail(ForTarget::Declaration { kind, target }, true);
            }
            if self.eat_keyword(Keyword::Of) {
                return self.parse_for_in_of_tail(ForTarget::Declaration { kind, target }, false);
            }

            // C-style with a declaration init.
            let mut declarations = Vec::new();
            self.no_in = true;
            let init = if self.eat_op(Operator::Assign) {
                Some(self.parse_assignment()?)
            } else {
                None
            };
            declarations.push(VariableDeclarator { target, init });
            while self.eat_punct(Punct::Comma) {
                let target = self.parse_binding_target()?;
                let init = if self.eat_op(Operator::Assign) {
                    Some(self.parse_assignment()?)
                } else {
                    None
                };
                declarations.push(VariableDeclarator { target, init });
            }
            self.no_in = false;

            let init = Some(ForInit::Declaration(Box::new(VariableDeclaration {
                kind,
                declarations,
            })));
            return self.parse_c_style_for_tail(init);
        }

        // No-init C-style.
        if self.check_punct(Punct::Semicolon) {
            return self.parse_c_style_for_tail(None);
        }

        // Expression header: may turn out to be for-in/for-of.
        self.no_in = true;
        let first = self.parse_expression();
        self.no_in = false;
        let first = first?;

        if self.eat_keyword(Keyword::In) {
            let target = self.expression_to_assignment_target(first)?;
            return self.parse_for_in_of_tail(ForTarget::Expression(target), true);
        }
        if self.eat_keyword(Keyword::Of) {
            let target = self.expression_to_assignment_target(first)?;
            return self.parse_for_in_of_tail(ForTarget::Expression(target), false);
        }

        self.parse_c_style_for_tail(Some(ForInit::Expression(first)))
    }

    fn parse_c_style_for_tail(&mut self, init: Option<ForInit>) -> Result<Statement, ParseError> {
        self.expect_punct(Punct::Semicolon)?;

        let test = if self.check_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;

        let update = if self.check_punct(Punct::RParen) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::RParen)?;

        let body = Box::new(self.parse_statement()?);

        Ok(Statement::For(ForStatement {
            init,
            test,
            update,
            body,
        }))
    }

    fn parse_for_in_of_tail(
        &mut self,
        left: ForTarget,
        is_in: bool,
    ) -> Result<Statement, ParseError> {
        let right = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        let body = Box::new(self.parse_statement()?);

        Ok(if is_in {
            Statement::ForIn(ForInStatement { left, right, body })
        } else {
            Statement::ForOf(ForOfStatement { left, right, body })
        })
    }

    fn parse_return_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'return'
        let argument = if self.check_punct(Punct::Semicolon) {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(Punct::Semicolon)?;

        Ok(Statement::Return(ReturnStatement { argument }))
    }

    fn parse_try_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'try'
        let block = self.parse_block_statement()?;

        let handler = if self.eat_keyword(Keyword::Catch) {
            let param = if self.eat_punct(Punct::LParen) {
                let target = self.parse_binding_target()?;
                self.expect_punct(Punct::RParen)?;
                Some(target)
            } else {
                None
            };
            let body = self.parse_block_statement()?;
            Some(CatchClause { param, body })
        } else {
            None
        };

        let finalizer = if self.eat_keyword(Keyword::Finally) {
            Some(self.parse_block_statement()?)
        } else {
            None
        };

        if handler.is_none() && finalizer.is_none() {
            return Err(self.error("expected 'catch' or 'finally' after try block"));
        }

        Ok(Statement::Try(TryStatement {
            block,
            handler,
            finalizer,
        }))
    }

    fn parse_switch_statement(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'switch'
        self.expect_punct(Punct::LParen)?;
        let discriminant = self.parse_expression()?;
        self.expect_punct(Punct::RParen)?;
        self.expect_punct(Punct::LBrace)?;

        let mut cases = Vec::new();
        while !self.check_punct(Punct::RBrace) && !self.is_at_end() {
            let test = if self.eat_keyword(Keyword::Case) {
                let test = self.parse_expression()?;
                Some(test)
            } else if self.eat_keyword(Keyword::Default) {
                None
            } else {
                return Err(self.error("expected 'case' or 'default' in switch body"));
            };
            self.expect_punct(Punct::Colon)?;

            let mut consequent = Vec::new();
            while !self.check_punct(Punct::RBrace)
                && !self.check_keyword(Keyword::Case)
                && !self.check_keyword(Keyword::Default)
                && !self.is_at_end()
            {
                consequent.push(self.parse_statement()?);
            }

            cases.push(SwitchCase { test, consequent });
        }

        self.expect_punct(Punct::RBrace)?;
        Ok(Statement::Switch(SwitchStatement { discriminant, cases }))
    }

    fn parse_expression_statement(&mut self) -> Result<Statement, ParseError> {
        let expression = self.parse_expression()?;
        self.expect_punct(Punct::Semicolon)?;
        Ok(Statement::Expression(ExpressionStatement { expression }))
    }

    // ------------------------------------------------------------------
    // Classes
    // ------------------------------------------------------------------

    fn parse_class_declaration(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'class'
        let id = self.expect_ident()?;
        let superclass = if self.eat_keyword(Keyword::Extends) {
            Some(self.parse_unary()?)
        } else {
            None
        };
        let body = self.parse_class_body()?;

        Ok(Statement::ClassDeclaration(ClassDeclaration {
            id,
            superclass,
            body,
        }))
    }

    pub(crate) fn parse_class_body(&mut self) -> Result<Vec<MethodDefinition>, ParseError> {
        self.expect_punct(Punct::LBrace)?;
        let mut methods = Vec::new();

        while !self.check_punct(Punct::RBrace) && !self.is_at_end() {
            if self.eat_punct(Punct::Semicolon) {
                continue;
            }
            methods.push(self.parse_method_definition()?);
        }

        self.expect_punct(Punct::RBrace)?;
        Ok(methods)
    }

    fn parse_method_definition(&mut self) -> Result<MethodDefinition, ParseError> {
        // Modifier keywords double as method names when directly followed by
        // a parameter list.
        let is_static = self.check_keyword(Keyword::Static)
            && !matches!(self.peek_kind(1), TokenKind::Punct(Punct::LParen));
        if is_static {
            self.advance();
        }

        let is_async = self.check_keyword(Keyword::Async)
            && !matches!(self.peek_kind(1), TokenKind::Punct(Punct::LParen));
        if is_async {
            self.advance();
        }

        let is_generator = self.eat_op(Operator::Star);

        let mut kind = MethodKind::Method;
        if !is_generator {
            if self.check_keyword(Keyword::Get)
                && !matches!(self.peek_kind(1), TokenKind::Punct(Punct::LParen))
            {
                self.advance();
                kind = MethodKind::Getter;
            } else if self.check_keyword(Keyword::Set)
                && !matches!(self.peek_kind(1), TokenKind::Punct(Punct::LParen))
            {
                self.advance();
                kind = MethodKind::Setter;
            }
        }

        let key = self.parse_property_key()?;

        if kind == MethodKind::Method {
            if let PropertyKey::Identifier(id) = &key {
                if id.name == "constructor" && !is_static {
                    kind = MethodKind::Constructor;
                }
            }
        }

        let params = self.parse_params()?;
        let body = self.parse_brace_body()?;

        Ok(MethodDefinition {
            key,
            params,
            body,
            kind,
            is_static,
            is_async,
            is_generator,
        })
    }

    /// Parses an object or method key: identifier, reserved word, string or
    /// number literal, or computed `[expr]`.
    pub(crate) fn parse_property_key(&mut self) -> Result<PropertyKey, ParseError> {
        let key = match &self.current().kind {
            TokenKind::Ident(name) => {
                let key = PropertyKey::Identifier(Identifier { name: name.clone() });
                self.advance();
                key
            }
            TokenKind::Keyword(kw) => {
                let key = PropertyKey::Identifier(Identifier {
                    name: kw.as_str().to_string(),
                });
                self.advance();
                key
            }
            TokenKind::Str(s) => {
                let key = PropertyKey::Literal(Literal::String(s.clone()));
                self.advance();
                key
            }
            TokenKind::Number(n) => {
                let key = PropertyKey::Literal(Literal::Number(*n));
                self.advance();
                key
            }
            TokenKind::Punct(Punct::LBracket) => {
                self.advance();
                let expr = self.parse_assignment()?;
                self.expect_punct(Punct::RBracket)?;
                PropertyKey::Computed(Box::new(expr))
            }
            _ => return Err(self.error("expected property key")),
        };
        Ok(key)
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    fn parse_import_declaration(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'import'

        // Side-effect-only import.
        if let TokenKind::Str(source) = &self.current().kind {
            let source = source.clone();
            self.advance();
            self.expect_punct(Punct::Semicolon)?;
            return Ok(Statement::Import(ImportDeclaration {
                specifiers: Vec::new(),
                source,
            }));
        }

        let mut specifiers = Vec::new();

        if self.eat_op(Operator::Star) {
            self.expect_keyword(Keyword::As)?;
            let local = self.expect_ident()?;
            specifiers.push(ImportSpecifier::Namespace(local));
        } else if self.eat_punct(Punct::LBrace) {
            while !self.check_punct(Punct::RBrace) {
                let imported = self.expect_module_name()?;
                let local = if self.eat_keyword(Keyword::As) {
                    self.expect_ident()?
                } else {
                    Identifier {
                        name: imported.clone(),
                    }
                };
                specifiers.push(ImportSpecifier::Named { imported, local });
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
            self.expect_punct(Punct::RBrace)?;
        } else {
            let local = self.expect_ident()?;
            specifiers.push(ImportSpecifier::Default(local));
        }

        if !self.eat_keyword(Keyword::From) {
            return Err(self.error("expected 'from' in import declaration"));
        }
        let source = self.expect_string()?;
        self.expect_punct(Punct::Semicolon)?;

        Ok(Statement::Import(ImportDeclaration { specifiers, source }))
    }

    fn parse_export_declaration(&mut self) -> Result<Statement, ParseError> {
        self.advance(); // consume 'export'

        if self.eat_keyword(Keyword::Default) {
            let default = match &self.current().kind {
                TokenKind::Keyword(Keyword::Function | Keyword::Class) => {
                    ExportDefault::Declaration(Box::new(self.parse_statement()?))
                }
                TokenKind::Keyword(Keyword::Async)
                    if matches!(self.peek_kind(1), TokenKind::Keyword(Keyword::Function)) =>
                {
                    ExportDefault::Declaration(Box::new(self.parse_statement()?))
                }
                _ => {
                    let expr = self.parse_expression()?;
                    self.expect_punct(Punct::Semicolon)?;
                    ExportDefault::Expression(expr)
                }
            };
            return Ok(Statement::Export(ExportDeclaration::Default(default)));
        }

        if self.eat_punct(Punct::LBrace) {
            let mut specifiers = Vec::new();
            while !self.check_punct(Punct::RBrace) {
                let local = self.expect_module_name()?;
                let exported = if self.eat_keyword(Keyword::As) {
                    self.expect_module_name()?
                } else {
                    local.clone()
                };
                specifiers.push(ExportSpecifier { local, exported });
                if !self.eat_punct(Punct::Comma) {
                    break;
                }
            }
            self.expect_punct(Punct::RBrace)?;

            let source = if self.eat_keyword(Keyword::From) {
                Some(self.expect_string()?)
            } else {
                None
            };
            self.expect_punct(Punct::Semicolon)?;
            return Ok(Statement::Export(ExportDeclaration::Named {
                specifiers,
                source,
            }));
        }

        match &self.current().kind {
            TokenKind::Keyword(
                Keyword::Var
                | Keyword::Let
                | Keyword::Const
                | Keyword::Function
                | Keyword::Class
                | Keyword::Async,
            ) => {
                let decl = self.parse_statement()?;
                Ok(Statement::Export(ExportDeclaration::Declaration(Box::new(
                    decl,
                ))))
            }
            _ => Err(self.error("invalid export form")),
        }
    }

    // ------------------------------------------------------------------
    // Helpers
    // ------------------------------------------------------------------

    pub(crate) fn current(&self) -> &Token {
        &self.tokens[self.pos.min(self.tokens.len() - 1)]
    }

    pub(crate) fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    pub(crate) fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    pub(crate) fn is_at_end(&self) -> bool {
        matches!(self.current().kind, TokenKind::Eof)
    }

    pub(crate) fn check_punct(&self, punct: Punct) -> bool {
        matches!(&self.current().kind, TokenKind::Punct(p) if *p == punct)
    }

    pub(crate) fn check_op(&self, op: Operator) -> bool {
        matches!(&self.current().kind, TokenKind::Operator(o) if *o == op)
    }

    pub(crate) fn check_keyword(&self, kw: Keyword) -> bool {
        matches!(&self.current().kind, TokenKind::Keyword(k) if *k == kw)
    }

    pub(crate) fn eat_punct(&mut self, punct: Punct) -> bool {
        if self.check_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_op(&mut self, op: Operator) -> bool {
        if self.check_op(op) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn eat_keyword(&mut self, kw: Keyword) -> bool {
        if self.check_keyword(kw) {
            self.advance();
            true
        } else {
            false
        }
    }

    pub(crate) fn expect_punct(&mut self, punct: Punct) -> Result<(), ParseError> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.error(format!("expected {:?}", punct)))
        }
    }

    pub(crate) fn expect_keyword(&mut self, kw: Keyword) -> Result<(), ParseError> {
        if self.eat_keyword(kw) {
            Ok(())
        } else {
            Err(self.error(format!("expected '{}'", kw.as_str())))
        }
    }

    pub(crate) fn expect_ident(&mut self) -> Result<Identifier, ParseError> {
        if let TokenKind::Ident(name) = &self.current().kind {
            let id = Identifier { name: name.clone() };
            self.advance();
            Ok(id)
        } else {
            Err(self.error("expected identifier"))
        }
    }

    pub(crate) fn expect_string(&mut self) -> Result<String, ParseError> {
        if let TokenKind::Str(s) = &self.current().kind {
            let s = s.clone();
            self.advance();
            Ok(s)
        } else {
            Err(self.error("expected string literal"))
        }
    }

    /// An identifier or reserved word used as a module-specifier name.
    fn expect_module_name(&mut self) -> Result<String, ParseError> {
        match &self.current().kind {
            TokenKind::Ident(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            TokenKind::Keyword(kw) => {
                let name = kw.as_str().to_string();
                self.advance();
                Ok(name)
            }
            _ => Err(self.error("expected name")),
        }
    }

    pub(crate) fn expect_eof(&mut self) -> Result<(), ParseError> {
        if self.is_at_end() {
            Ok(())
        } else {
            Err(self.error("expected end of expression"))
        }
    }

    pub(crate) fn error(&self, message: impl Into<String>) -> ParseError {
        let token = self.current();
        ParseError {
            position: token.span.start,
            found: format!("{:?}", token.kind),
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;

    fn parse(source: &str) -> Program {
        let tokens = lex(source).expect("lexing should succeed");
        Parser::new(tokens)
            .parse_program()
            .expect("parsing should succeed")
    }

    fn parse_err(source: &str) -> ParseError {
        let tokens = lex(source).expect("lexing should succeed");
        Parser::new(tokens)
            .parse_program()
            .expect_err("parsing should fail")
    }

    #[test]
    fn test_parse_variable_declarations() {
        let program = parse("let x = 42; const y = x; var z;");
        assert_eq!(program.body.len(), 3);
    }

    #[test]
    fn test_parse_function_declaration() {
        let program = parse("function add(a, b) { return a + b; }");
        match &program.body[0] {
            Statement::FunctionDeclaration(f) => {
                assert_eq!(f.id.name, "add");
                assert_eq!(f.params.len(), 2);
                assert!(!f.is_async);
                assert!(!f.is_generator);
            }
            other => panic!("expected function declaration, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_async_generator_flags() {
        let program = parse("async function f() {} function* g() { yield 1; }");
        match (&program.body[0], &program.body[1]) {
            (Statement::FunctionDeclaration(f), Statement::FunctionDeclaration(g)) => {
                assert!(f.is_async);
                assert!(g.is_generator);
            }
            other => panic!("expected function declarations, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_if_else() {
        let program = parse("if (a) b(); else c();");
        match &program.body[0] {
            Statement::If(stmt) => assert!(stmt.alternate.is_some()),
            other => panic!("expected if, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_for_variants() {
        parse("for (let i = 0; i < 10; i = i + 1) {}");
        parse("for (;;) { break; }");
        parse("for (let k in obj) {}");
        parse("for (const v of list) {}");
        parse("for (x of list) {}");
    }

    #[test]
    fn test_for_in_header_not_confused_with_in_operator() {
        let program = parse("for (k in obj) {}");
        assert!(matches!(program.body[0], Statement::ForIn(_)));
    }

    #[test]
    fn test_parse_try_catch_finally() {
        let program = parse("try { f(); } catch (e) { g(e); } finally { h(); }");
        match &program.body[0] {
            Statement::Try(stmt) => {
                assert!(stmt.handler.is_some());
                assert!(stmt.finalizer.is_some());
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_catch_without_binding() {
        let program = parse("try { f(); } catch { g(); }");
        match &program.body[0] {
            Statement::Try(stmt) => {
                assert!(stmt.handler.as_ref().unwrap().param.is_none());
            }
            other => panic!("expected try, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_switch() {
        let program = parse("switch (x) { case 1: f(); break; default: g(); }");
        match &program.body[0] {
            Statement::Switch(stmt) => {
                assert_eq!(stmt.cases.len(), 2);
                assert!(stmt.cases[0].test.is_some());
                assert!(stmt.cases[1].test.is_none());
            }
            other => panic!("expected switch, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_class() {
        let program = parse(
            "class Bot extends Base { constructor(x) { this.x = x; } \
             get pos() { return this.x; } static make() { return new Bot(0); } }",
        );
        match &program.body[0] {
            Statement::ClassDeclaration(class) => {
                assert_eq!(class.id.name, "Bot");
                assert!(class.superclass.is_some());
                assert_eq!(class.body.len(), 3);
                assert_eq!(class.body[0].kind, MethodKind::Constructor);
                assert_eq!(class.body[1].kind, MethodKind::Getter);
                assert!(class.body[2].is_static);
            }
            other => panic!("expected class, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_imports() {
        let program = parse(
            "import lib from \"lib\"; import { a, b as c } from \"m\"; \
             import * as ns from \"n\"; import \"side\";",
        );
        assert_eq!(program.body.len(), 4);
        match &program.body[1] {
            Statement::Import(decl) => {
                assert_eq!(decl.specifiers.len(), 2);
                assert_eq!(decl.source, "m");
            }
            other => panic!("expected import, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_exports() {
        let program = parse(
            "export let a = 1; export { a as b }; export default 42;",
        );
        assert_eq!(program.body.len(), 3);
        assert!(matches!(
            program.body[2],
            Statement::Export(ExportDeclaration::Default(_))
        ));
    }

    #[test]
    fn test_import_missing_from() {
        let err = parse_err("import { a };");
        assert!(err.message.contains("from"));
    }

    #[test]
    fn test_invalid_export_form() {
        let err = parse_err("export 42;");
        assert!(err.message.contains("export"));
    }

    #[test]
    fn test_stops_at_first_error() {
        let err = parse_err("let = 5;");
        assert!(!err.message.is_empty());
    }
}
