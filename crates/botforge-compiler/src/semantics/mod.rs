//! Scope-aware semantic analysis.
//!
//! Walks the whole tree collecting binding diagnostics, then fails
//! atomically with every message. Scopes are a stack of name maps: pushed
//! for function bodies, blocks, for headers, for-in/of heads, catch
//! clauses, and each switch case. Function and class declarations are
//! hoisted into their scope before the statements are walked, so forward
//! references resolve.

use rustc_hash::FxHashMap;

use crate::ast::*;
use crate::error::SemanticError;

/// Globals that resolve without a declaration.
const BUILTINS: &[&str] = &[
    "console",
    "Math",
    "JSON",
    "Object",
    "Array",
    "String",
    "Number",
    "Boolean",
    "Date",
    "RegExp",
    "Error",
    "Promise",
    "Map",
    "Set",
    "WeakMap",
    "WeakSet",
    "Symbol",
    "Reflect",
    "Proxy",
    "globalThis",
    "window",
    "document",
    "fetch",
    "setTimeout",
    "setInterval",
    "clearTimeout",
    "clearInterval",
    "WebSocket",
    "EventTarget",
    "Event",
];

/// How a name entered scope.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BindingKind {
    Var,
    Let,
    Const,
    Function,
    Class,
    Parameter,
    Import,
    Catch,
}

/// Validates bindings in a parsed program.
///
/// Returns `Ok(())` or a [`SemanticError`] carrying every diagnostic found.
pub fn check(program: &Program) -> Result<(), SemanticError> {
    let mut analyzer = Analyzer::new();
    analyzer.push_scope();
    analyzer.hoist(&program.body);
    for statement in &program.body {
        analyzer.visit_statement(statement);
    }
    analyzer.pop_scope();

    if analyzer.diagnostics.is_empty() {
        Ok(())
    } else {
        Err(SemanticError {
            messages: analyzer.diagnostics,
        })
    }
}

struct Analyzer {
    scopes: Vec<FxHashMap<String, BindingKind>>,
    diagnostics: Vec<String>,
}

impl Analyzer {
    fn new() -> Self {
        Self {
            scopes: Vec::new(),
            diagnostics: Vec::new(),
        }
    }

    fn push_scope(&mut self) {
        self.scopes.push(FxHashMap::default());
    }

    fn pop_scope(&mut self) {
        self.scopes.pop();
    }

    fn declare(&mut self, name: &str, kind: BindingKind) {
        let scope = self
            .scopes
            .last_mut()
            .expect("analyzer always runs inside a scope");
        if scope.contains_key(name) {
            self.diagnostics
                .push(format!("Duplicate declaration: {}", name));
        } else {
            scope.insert(name.to_string(), kind);
        }
    }

    fn resolve(&mut self, name: &str) {
        for scope in self.scopes.iter().rev() {
            if scope.contains_key(name) {
                return;
            }
        }
        if BUILTINS.contains(&name) {
            return;
        }
        self.diagnostics
            .push(format!("Undefined variable: {}", name));
    }

    /// Pre-registers function and class declarations of one statement list.
    fn hoist(&mut self, statements: &[Statement]) {
        for statement in statements {
            match statement {
                Statement::FunctionDeclaration(f) => {
                    self.declare(&f.id.name, BindingKind::Function);
                }
                Statement::ClassDeclaration(c) => {
                    self.declare(&c.id.name, BindingKind::Class);
                }
                Statement::Export(ExportDeclaration::Declaration(decl)) => {
                    match decl.as_ref() {
                        Statement::FunctionDeclaration(f) => {
                            self.declare(&f.id.name, BindingKind::Function);
                        }
                        Statement::ClassDeclaration(c) => {
                            self.declare(&c.id.name, BindingKind::Class);
                        }
                        _ => {}
                    }
                }
                _ => {}
            }
        }
    }

    fn declare_binding_target(&mut self, target: &BindingTarget, kind: BindingKind) {
        match target {
            BindingTarget::Identifier(id) => self.declare(&id.name, kind),
            BindingTarget::Pattern(pattern) => self.declare_pattern(pattern, kind),
        }
    }

    /// One binding per terminal identifier of a destructuring pattern.
    fn declare_pattern(&mut self, pattern: &Pattern, kind: BindingKind) {
        match pattern {
            Pattern::Object(obj) => {
                for entry in &obj.entries {
                    match &entry.value {
                        PatternTarget::Identifier(id) => self.declare(&id.name, kind),
                        PatternTarget::Pattern(nested) => self.declare_pattern(nested, kind),
                    }
                }
            }
            Pattern::Array(arr) => {
                for element in arr.elements.iter().flatten() {
                    match element {
                        PatternTarget::Identifier(id) => self.declare(&id.name, kind),
                        PatternTarget::Pattern(nested) => self.declare_pattern(nested, kind),
                    }
                }
            }
        }
    }

    fn variable_kind(kind: VariableKind) -> BindingKind {
        match kind {
            VariableKind::Var => BindingKind::Var,
            VariableKind::Let => BindingKind::Let,
            VariableKind::Const => BindingKind::Const,
        }
    }

    fn visit_statement(&mut self, statement: &Statement) {
        match statement {
            Statement::VariableDeclaration(decl) => self.visit_variable_declaration(decl),
            Statement::FunctionDeclaration(f) => {
                // The name itself was hoisted.
                self.visit_function(&f.params, &f.body, None);
            }
            Statement::ClassDeclaration(c) => {
                self.visit_class(&c.superclass, &c.body);
            }
            Statement::Expression(stmt) => self.visit_expression(&stmt.expression),
            Statement::Block(block) => {
                self.push_scope();
                self.hoist(&block.body);
                for statement in &block.body {
                    self.visit_statement(statement);
                }
                self.pop_scope();
            }
            Statement::If(stmt) => {
                self.visit_expression(&stmt.test);
                self.visit_statement(&stmt.consequent);
                if let Some(alternate) = &stmt.alternate {
                    self.visit_statement(alternate);
                }
            }
            Statement::While(stmt) => {
                self.visit_expression(&stmt.test);
                self.visit_statement(&stmt.body);
            }
            Statement::For(stmt) => {
                self.push_scope();
                match &stmt.init {
                    Some(ForInit::Declaration(decl)) => self.visit_variable_declaration(decl),
                    Some(ForInit::Expression(expr)) => self.visit_expression(expr),
                    None => {}
                }
                if let Some(test) = &stmt.test {
                    self.visit_expression(test);
                }
                if let Some(update) = &stmt.update {
                    self.visit_expression(update);
                }
                self.visit_statement(&stmt.body);
                self.pop_scope();
            }
            Statement::ForIn(stmt) => self.visit_for_in_of(&stmt.left, &stmt.right, &stmt.body),
            Statement::ForOf(stmt) => self.visit_for_in_of(&stmt.left, &stmt.right, &stmt.body),
            Statement::Return(stmt) => {
                if let Some(argument) = &stmt.argument {
                    self.visit_expression(argument);
                }
            }
            Statement::Break | Statement::Continue | Statement::Empty => {}
            Statement::Throw(stmt) => self.visit_expression(&stmt.argument),
            Statement::Try(stmt) => {
                self.push_scope();
                self.hoist(&stmt.block.body);
                for statement in &stmt.block.body {
                    self.visit_statement(statement);
                }
                self.pop_scope();

                if let Some(handler) = &stmt.handler {
                    self.push_scope();
                    if let Some(param) = &handler.param {
                        self.declare_binding_target(param, BindingKind::Catch);
                    }
                    self.hoist(&handler.body.body);
                    for statement in &handler.body.body {
                        self.visit_statement(statement);
                    }
                    self.pop_scope();
                }

                if let Some(finalizer) = &stmt.finalizer {
                    self.push_scope();
                    self.hoist(&finalizer.body);
                    for statement in &finalizer.body {
                        self.visit_statement(statement);
                    }
                    self.pop_scope();
                }
            }
            Statement::Switch(stmt) => {
                self.visit_expression(&stmt.discriminant);
                for case in &stmt.cases {
                    if let Some(test) = &case.test {
                        self.visit_expression(test);
                    }
                    self.push_scope();
                    self.hoist(&case.consequent);
                    for statement in &case.consequent {
                        self.visit_statement(statement);
                    }
                    self.pop_scope();
                }
            }
            Statement::Import(decl) => {
                for specifier in &decl.specifiers {
                    let local = match specifier {
                        ImportSpecifier::Default(id) => id,
                        ImportSpecifier::Named { local, .. } => local,
                        ImportSpecifier::Namespace(id) => id,
                    };
                    self.declare(&local.name, BindingKind::Import);
                }
            }
            Statement::Export(decl) => match decl {
                ExportDeclaration::Declaration(inner) => self.visit_statement(inner),
                ExportDeclaration::Named { specifiers, source } => {
                    // Re-exports do not reference local bindings.
                    if source.is_none() {
                        for specifier in specifiers {
                            self.resolve(&specifier.local);
                        }
                    }
                }
                ExportDeclaration::Default(default) => match default {
                    ExportDefault::Declaration(inner) => self.visit_statement(inner),
                    ExportDefault::Expression(expr) => self.visit_expression(expr),
                },
            },
        }
    }

    fn visit_variable_declaration(&mut self, decl: &VariableDeclaration) {
        let kind = Self::variable_kind(decl.kind);
        for declarator in &decl.declarations {
            if let Some(init) = &declarator.init {
                self.visit_expression(init);
            }
            self.declare_binding_target(&declarator.target, kind);
        }
    }

    fn visit_for_in_of(&mut self, left: &ForTarget, right: &Expression, body: &Statement) {
        self.visit_expression(right);
        self.push_scope();
        match left {
            ForTarget::Declaration { kind, target } => {
                self.declare_binding_target(target, Self::variable_kind(*kind));
            }
            ForTarget::Expression(target) => self.visit_assignment_target(target),
        }
        self.visit_statement(body);
        self.pop_scope();
    }

    fn visit_function(
        &mut self,
        params: &[BindingTarget],
        body: &[Statement],
        own_name: Option<&str>,
    ) {
        self.push_scope();
        if let Some(name) = own_name {
            self.declare(name, BindingKind::Function);
        }
        for param in params {
            self.declare_binding_target(param, BindingKind::Parameter);
        }
        self.hoist(body);
        for statement in body {
            self.visit_statement(statement);
        }
        self.pop_scope();
    }

    fn visit_class(&mut self, superclass: &Option<Expression>, body: &[MethodDefinition]) {
        if let Some(superclass) = superclass {
            self.visit_expression(superclass);
        }
        for method in body {
            if let PropertyKey::Computed(expr) = &method.key {
                self.visit_expression(expr);
            }
            self.visit_function(&method.params, &method.body, None);
        }
    }

    fn visit_assignment_target(&mut self, target: &AssignmentTarget) {
        match target {
            AssignmentTarget::Identifier(id) => self.resolve(&id.name),
            AssignmentTarget::Member(member) => self.visit_member(member),
            AssignmentTarget::Pattern(pattern) => self.visit_pattern_targets(pattern),
        }
    }

    /// Pattern assignment targets reference existing bindings.
    fn visit_pattern_targets(&mut self, pattern: &Pattern) {
        match pattern {
            Pattern::Object(obj) => {
                for entry in &obj.entries {
                    match &entry.value {
                        PatternTarget::Identifier(id) => self.resolve(&id.name),
                        PatternTarget::Pattern(nested) => self.visit_pattern_targets(nested),
                    }
                }
            }
            Pattern::Array(arr) => {
                for element in arr.elements.iter().flatten() {
                    match element {
                        PatternTarget::Identifier(id) => self.resolve(&id.name),
                        PatternTarget::Pattern(nested) => self.visit_pattern_targets(nested),
                    }
                }
            }
        }
    }

    fn visit_member(&mut self, member: &MemberExpression) {
        self.visit_expression(&member.object);
        if let MemberProperty::Expression(expr) = &member.property {
            self.visit_expression(expr);
        }
    }

    fn visit_expression(&mut self, expression: &Expression) {
        match expression {
            Expression::Literal(_) | Expression::This | Expression::Super => {}
            Expression::Identifier(id) => self.resolve(&id.name),
            Expression::Array(arr) => {
                for element in arr.elements.iter().flatten() {
                    self.visit_expression(element);
                }
            }
            Expression::Object(obj) => {
                for property in &obj.properties {
                    if let PropertyKey::Computed(expr) = &property.key {
                        self.visit_expression(expr);
                    }
                    self.visit_expression(&property.value);
                }
            }
            Expression::Template(template) => {
                for expr in &template.expressions {
                    self.visit_expression(expr);
                }
            }
            Expression::Binary(b) => {
                self.visit_expression(&b.left);
                self.visit_expression(&b.right);
            }
            Expression::Logical(l) => {
                self.visit_expression(&l.left);
                self.visit_expression(&l.right);
            }
            Expression::Unary(u) => self.visit_expression(&u.argument),
            Expression::Update(u) => self.visit_expression(&u.argument),
            Expression::Assignment(a) => {
                self.visit_expression(&a.value);
                self.visit_assignment_target(&a.target);
            }
            Expression::Conditional(c) => {
                self.visit_expression(&c.test);
                self.visit_expression(&c.consequent);
                self.visit_expression(&c.alternate);
            }
            Expression::Call(call) => {
                self.visit_expression(&call.callee);
                for argument in &call.arguments {
                    self.visit_expression(argument);
                }
            }
            Expression::New(new) => {
                self.visit_expression(&new.callee);
                for argument in &new.arguments {
                    self.visit_expression(argument);
                }
            }
            Expression::Member(member) => self.visit_member(member),
            Expression::Function(f) => {
                self.visit_function(
                    &f.params,
                    &f.body,
                    f.id.as_ref().map(|id| id.name.as_str()),
                );
            }
            Expression::Class(c) => {
                self.visit_class(&c.superclass, &c.body);
            }
            Expression::Yield(y) => {
                if let Some(argument) = &y.argument {
                    self.visit_expression(argument);
                }
            }
            Expression::ImportExpr(import) => self.visit_expression(&import.source),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lexer::lex;
    use crate::parser::Parser;

    fn analyze(source: &str) -> Result<(), SemanticError> {
        let tokens = lex(source).expect("lexing should succeed");
        let program = Parser::new(tokens)
            .parse_program()
            .expect("parsing should succeed");
        check(&program)
    }

    #[test]
    fn test_valid_program() {
        analyze("let x = 1; function f(a) { return a + x; } f(2);").unwrap();
    }

    #[test]
    fn test_duplicate_declaration_message() {
        let err = analyze("let a; let a;").unwrap_err();
        assert_eq!(err.messages, vec!["Duplicate declaration: a"]);
    }

    #[test]
    fn test_shadowing_in_inner_scope_allowed() {
        analyze("let a = 1; { let a = 2; }").unwrap();
        analyze("let a = 1; function f(a) { return a; }").unwrap();
    }

    #[test]
    fn test_undefined_variable() {
        let err = analyze("missing();").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: missing"]);
    }

    #[test]
    fn test_all_diagnostics_collected() {
        let err = analyze("let a; let a; b(); c();").unwrap_err();
        assert_eq!(err.messages.len(), 3);
    }

    #[test]
    fn test_builtins_allowed() {
        analyze("console.log(Math.max(1, 2)); fetch(\"u\");").unwrap();
    }

    #[test]
    fn test_forward_function_reference() {
        analyze("f(); function f() {}").unwrap();
    }

    #[test]
    fn test_pattern_bindings() {
        analyze("let { x, y: z } = p(); x + z;").unwrap_err(); // p undefined
        analyze("let p = {}; let { x, y: z } = p; x + z;").unwrap();
    }

    #[test]
    fn test_duplicate_from_pattern() {
        let err = analyze("let q = {}; let { a, b: a } = q;").unwrap_err();
        assert_eq!(err.messages, vec!["Duplicate declaration: a"]);
    }

    #[test]
    fn test_catch_scope() {
        analyze("try { f(); } catch (e) { console.log(e); }").unwrap_err(); // f undefined
        analyze(
            "function f() {} try { f(); } catch (e) { console.log(e); } ",
        )
        .unwrap();
        // The catch binding is not visible outside its clause.
        let err = analyze("try {} catch (e) {} e;").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: e"]);
    }

    #[test]
    fn test_loop_variable_scope() {
        analyze("let list = []; for (const item of list) { item; }").unwrap();
        let err = analyze("let list = []; for (const item of list) {} item;").unwrap_err();
        assert_eq!(err.messages, vec!["Undefined variable: item"]);
    }

    #[test]
    fn test_switch_case_scopes() {
        analyze(
            "let x = 1; switch (x) { case 1: let y = 2; break; case 2: let y = 3; break; }",
        )
        .unwrap();
    }

    #[test]
    fn test_import_bindings() {
        analyze("import { lib } from \"m\"; lib();").unwrap();
        analyze("import * as ns from \"m\"; ns.go();").unwrap();
    }

    #[test]
    fn test_named_function_expression_self_reference() {
        analyze("let f = function rec(n) { return n > 0 ? rec(n - 1) : 0; };").unwrap();
    }

    #[test]
    fn test_class_bindings() {
        analyze("class Bot { run() { return this; } } new Bot();").unwrap();
    }
}
