//! Bytecode emission for the textual front end.
//!
//! Single-pass lowering with forward jump patches: every jump whose target
//! is unknown writes a two-byte placeholder and is resolved once the target
//! offset is established. Loop frames collect pending `break`/`continue`
//! jumps; function bodies are laid out inline behind a jump over them, with
//! call sites to not-yet-laid-out functions patched at the end.
//!
//! ## Structure
//!
//! - `mod.rs` - `Emitter` core: statements, functions, classes, modules
//! - `expressions.rs` - expression lowering
//! - `opcodes.rs` - the frozen opcode table
//! - `constants.rs` - the deduplicating constant pool

pub mod constants;
pub mod opcodes;

mod expressions;


pub use constants::{Const, ConstantPool};
pub use opcodes::Op;

use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, trace};

use crate::ast::*;
use crate::error::EmitError;

/// The result of lowering a program: position-independent code, its constant
/// pool, and the module export map.
#[derive(Debug)]
pub struct Emission {
    /// The emitted code section
    pub code: Vec<u8>,
    /// The ordered constant pool
    pub constants: Vec<Const>,
    /// Named exports of the module
    pub exports: Vec<ExportEntry>,
}

/// One entry of the module export map.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportEntry {
    /// The name visible to importers
    pub exported: String,
    /// The local binding backing it
    pub local: String,
    /// Set for re-exports (`export { a } from "m"`)
    pub source: Option<String>,
}

/// A pending displacement operand.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Jump {
    operand_pos: usize,
}

/// A growing byte buffer with jump-patch support.
///
/// Displacements are signed 16-bit big-endian, measured from the byte after
/// the operand to the target.
#[derive(Debug, Default)]
pub(crate) struct CodeBuffer {
    pub(crate) bytes: Vec<u8>,
}

impl CodeBuffer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn here(&self) -> usize {
        self.bytes.len()
    }

    pub(crate) fn op(&mut self, op: Op) {
        self.bytes.push(op as u8);
    }

    pub(crate) fn byte(&mut self, value: u8) {
        self.bytes.push(value);
    }

    pub(crate) fn u32(&mut self, value: u32) {
        self.bytes.extend_from_slice(&value.to_be_bytes());
    }

    /// Emits a jump with a placeholder displacement.
    pub(crate) fn jump(&mut self, op: Op) -> Jump {
        self.op(op);
        let operand_pos = self.here();
        self.bytes.extend_from_slice(&[0, 0]);
        Jump { operand_pos }
    }

    /// Resolves a pending jump to an absolute target offset.
    pub(crate) fn patch(&mut self, jump: Jump, target: usize) -> Result<(), EmitError> {
        let displacement = target as i64 - (jump.operand_pos as i64 + 2);
        let displacement =
            i16::try_from(displacement).map_err(|_| EmitError::JumpOutOfRange)?;
        self.bytes[jump.operand_pos..jump.operand_pos + 2]
            .copy_from_slice(&displacement.to_be_bytes());
        Ok(())
    }

    /// Resolves a pending jump to the current position.
    pub(crate) fn patch_here(&mut self, jump: Jump) -> Result<(), EmitError> {
        let target = self.here();
        self.patch(jump, target)
    }

    /// Emits a jump to an already-known target (backward jumps).
    pub(crate) fn jump_to(&mut self, op: Op, target: usize) -> Result<(), EmitError> {
        let jump = self.jump(op);
        self.patch(jump, target)
    }
}

/// An open looping construct: its start offset and the pending
/// `break`/`continue` jumps.
#[derive(Debug, Default)]
struct LoopFrame {
    start: usize,
    breaks: Vec<Jump>,
    continues: Vec<Jump>,
}

/// An open protected region.
#[derive(Debug)]
struct TryFrame {
    start: usize,
}

/// An open class emission.
#[derive(Debug)]
struct ClassFrame {
    name: Option<String>,
}

/// A call site waiting for its callee's layout offset.
#[derive(Debug)]
struct CallPatch {
    operand_pos: usize,
    name: String,
}

/// Identifier roots that dispatch through the host bridge.
const HOST_CALLEES: &[&str] = &[
    "document",
    "window",
    "fetch",
    "setTimeout",
    "setInterval",
    "WebSocket",
    "console",
];

/// Lowers a validated AST to bytecode.
pub struct Emitter {
    pub(crate) code: CodeBuffer,
    pub(crate) pool: ConstantPool,
    loops: Vec<LoopFrame>,
    tries: Vec<TryFrame>,
    classes: Vec<ClassFrame>,
    function_starts: FxHashMap<String, u32>,
    call_patches: Vec<CallPatch>,
    pub(crate) declared_functions: FxHashSet<String>,
    exports: Vec<ExportEntry>,
    synth: u32,
}

impl Emitter {
    /// Creates a fresh emitter. All state is scoped to one [`Emitter::emit`]
    /// call; nothing is shared across invocations.
    pub fn new() -> Self {
        Self {
            code: CodeBuffer::new(),
            pool: ConstantPool::new(),
            loops: Vec::new(),
            tries: Vec::new(),
            classes: Vec::new(),
            function_starts: FxHashMap::default(),
            call_patches: Vec::new(),
            declared_functions: FxHashSet::default(),
            exports: Vec::new(),
            synth: 0,
        }
    }

    /// Emits a whole program. Top-level code always ends with a single
    /// `HALT`.
    pub fn emit(mut self, program: &Program) -> Result<Emission, EmitError> {
        collect_function_names(&program.body, &mut self.declared_functions);

        for statement in &program.body {
            self.emit_statement(statement)?;
        }

        self.resolve_call_patches()?;
        self.code.op(Op::Halt);

        debug!(
            code_bytes = self.code.bytes.len(),
            constants = self.pool.len(),
            exports = self.exports.len(),
            "emitted program"
        );

        Ok(Emission {
            code: self.code.bytes,
            constants: self.pool.into_values(),
            exports: self.exports,
        })
    }

    // ------------------------------------------------------------------
    // Statements
    // ------------------------------------------------------------------

    pub(crate) fn emit_statement(&mut self, statement: &Statement) -> Result<(), EmitError> {
        match statement {
            Statement::Expression(stmt) => {
                self.emit_expression(&stmt.expression)?;
                self.code.op(Op::Pop);
            }
            Statement::VariableDeclaration(decl) => self.emit_variable_declaration(decl)?,
            Statement::FunctionDeclaration(decl) => self.emit_function_declaration(decl)?,
            Statement::ClassDeclaration(decl) => {
                self.emit_class(
                    Some(&decl.id.name),
                    decl.superclass.as_ref(),
                    &decl.body,
                )?;
                self.emit_store_var(&decl.id.name);
            }
            Statement::Block(block) => {
                for statement in &block.body {
                    self.emit_statement(statement)?;
                }
            }
            Statement::If(stmt) => self.emit_if(stmt)?,
            Statement::While(stmt) => self.emit_while(stmt)?,
            Statement::For(stmt) => self.emit_for(stmt)?,
            Statement::ForIn(stmt) => self.emit_for_iteration(&stmt.left, &stmt.right, &stmt.body)?,
            Statement::ForOf(stmt) => self.emit_for_iteration(&stmt.left, &stmt.right, &stmt.body)?,
            Statement::Return(stmt) => {
                match &stmt.argument {
                    Some(argument) => self.emit_expression(argument)?,
                    None => self.emit_push_const(Const::Undefined),
                }
                self.code.op(Op::Return);
            }
            Statement::Break => {
                let jump = self.code.jump(Op::Jmp);
                let frame = self.loops.last_mut().ok_or(EmitError::BreakOutsideLoop)?;
                frame.breaks.push(jump);
            }
            Statement::Continue => {
                let jump = self.code.jump(Op::Jmp);
                let frame = self
                    .loops
                    .last_mut()
                    .ok_or(EmitError::ContinueOutsideLoop)?;
                frame.continues.push(jump);
            }
            Statement::Throw(stmt) => {
                self.emit_expression(&stmt.argument)?;
                self.code.op(Op::Throw);
            }
            Statement::Try(stmt) => self.emit_try(stmt)?,
            Statement::Switch(stmt) => self.emit_switch(stmt)?,
            Statement::Import(decl) => self.emit_import(decl)?,
            Statement::Export(decl) => self.emit_export(decl)?,
            Statement::Empty => {}
        }
        Ok(())
    }

    fn emit_variable_declaration(&mut self, decl: &VariableDeclaration) -> Result<(), EmitError> {
        for declarator in &decl.declarations {
            match &declarator.init {
                Some(init) => self.emit_expression(init)?,
                None => self.emit_push_const(Const::Undefined),
            }
            self.emit_binding_target(&declarator.target)?;
        }
        Ok(())
    }

    /// Stores the value on top of the stack into a binding position.
    pub(crate) fn emit_binding_target(&mut self, target: &BindingTarget) -> Result<(), EmitError> {
        match target {
            BindingTarget::Identifier(id) => {
                self.emit_store_var(&id.name);
                Ok(())
            }
            BindingTarget::Pattern(pattern) => self.emit_destructure_from_stack(pattern),
        }
    }

    /// Spills the stack top into a synthetic and unpacks a pattern from it.
    pub(crate) fn emit_destructure_from_stack(
        &mut self,
        pattern: &Pattern,
    ) -> Result<(), EmitError> {
        let source = self.synth_name("$temp");
        self.emit_store_var(&source);
        self.emit_destructure(pattern, &source)
    }

    /// Unpacks a pattern by reloading the spilled source per sub-target.
    /// Holes in array patterns are skipped.
    fn emit_destructure(&mut self, pattern: &Pattern, source: &str) -> Result<(), EmitError> {
        match pattern {
            Pattern::Object(obj) => {
                for entry in &obj.entries {
                    self.emit_load_var(source);
                    let key_idx = self.pool.add_str(&entry.key);
                    self.code.op(Op::GetProp);
                    self.code.u32(key_idx);
                    self.emit_pattern_target(&entry.value)?;
                }
            }
            Pattern::Array(arr) => {
                for (index, element) in arr.elements.iter().enumerate() {
                    let Some(element) = element else { continue };
                    self.emit_load_var(source);
                    self.emit_push_const(Const::Number(index as f64));
                    self.code.op(Op::GetPropComputed);
                    self.emit_pattern_target(element)?;
                }
            }
        }
        Ok(())
    }

    fn emit_pattern_target(&mut self, target: &PatternTarget) -> Result<(), EmitError> {
        match target {
            PatternTarget::Identifier(id) => {
                self.emit_store_var(&id.name);
                Ok(())
            }
            PatternTarget::Pattern(nested) => self.emit_destructure_from_stack(nested),
        }
    }

    fn emit_if(&mut self, stmt: &IfStatement) -> Result<(), EmitError> {
        self.emit_expression(&stmt.test)?;
        let jz_else = self.code.jump(Op::Jz);
        self.emit_statement(&stmt.consequent)?;

        if let Some(alternate) = &stmt.alternate {
            let jmp_end = self.code.jump(Op::Jmp);
            self.code.patch_here(jz_else)?;
            self.emit_statement(alternate)?;
            self.code.patch_here(jmp_end)?;
        } else {
            self.code.patch_here(jz_else)?;
        }
        Ok(())
    }

    fn emit_while(&mut self, stmt: &WhileStatement) -> Result<(), EmitError> {
        let loop_start = self.code.here();
        self.emit_expression(&stmt.test)?;
        let jz_end = self.code.jump(Op::Jz);

        self.loops.push(LoopFrame {
            start: loop_start,
            ..Default::default()
        });
        self.emit_statement(&stmt.body)?;
        self.code.jump_to(Op::Jmp, loop_start)?;
        self.code.patch_here(jz_end)?;

        self.close_loop(loop_start)
    }

    fn emit_for(&mut self, stmt: &ForStatement) -> Result<(), EmitError> {
        // The init is emitted bare: a for-header expression is not an
        // expression statement and gets no trailing POP.
        match &stmt.init {
            Some(ForInit::Declaration(decl)) => self.emit_variable_declaration(decl)?,
            Some(ForInit::Expression(expr)) => self.emit_expression(expr)?,
            None => {}
        }

        let loop_start = self.code.here();
        match &stmt.test {
            Some(test) => self.emit_expression(test)?,
            None => self.emit_push_const(Const::Bool(true)),
        }
        let jz_end = self.code.jump(Op::Jz);

        self.loops.push(LoopFrame {
            start: loop_start,
            ..Default::default()
        });
        self.emit_statement(&stmt.body)?;

        let continue_target = self.code.here();
        if let Some(update) = &stmt.update {
            self.emit_expression(update)?;
        }
        self.code.jump_to(Op::Jmp, loop_start)?;
        self.code.patch_here(jz_end)?;

        self.close_loop(continue_target)
    }

    /// Shared lowering for `for-in` and `for-of`: both drive the iterator
    /// protocol over the right-hand side.
    fn emit_for_iteration(
        &mut self,
        left: &ForTarget,
        right: &Expression,
        body: &Statement,
    ) -> Result<(), EmitError> {
        self.emit_expression(right)?;
        self.code.op(Op::GetIterator);
        let iterator = self.synth_name("$iterator");
        self.emit_store_var(&iterator);

        let loop_start = self.code.here();
        self.emit_load_var(&iterator);
        let next_idx = self.pool.add_str("next");
        self.code.op(Op::GetProp);
        self.code.u32(next_idx);
        self.emit_load_var(&iterator);
        self.code.op(Op::Call);
        self.code.u32(1);

        self.code.op(Op::Dup);
        let done_idx = self.pool.add_str("done");
        self.code.op(Op::GetProp);
        self.code.u32(done_idx);
        let jnz_done = self.code.jump(Op::Jnz);

        let value_idx = self.pool.add_str("value");
        self.code.op(Op::GetProp);
        self.code.u32(value_idx);
        self.emit_iteration_binding(left)?;

        self.loops.push(LoopFrame {
            start: loop_start,
            ..Default::default()
        });
        self.emit_statement(body)?;
        self.code.jump_to(Op::Jmp, loop_start)?;

        // The done path still holds the result object.
        self.code.patch_here(jnz_done)?;
        self.code.op(Op::Pop);

        self.close_loop(loop_start)
    }

    /// Assigns the iteration value on top of the stack to the loop binding.
    fn emit_iteration_binding(&mut self, left: &ForTarget) -> Result<(), EmitError> {
        match left {
            ForTarget::Declaration { target, .. } => self.emit_binding_target(target),
            ForTarget::Expression(target) => match target {
                AssignmentTarget::Identifier(id) => {
                    self.emit_store_var(&id.name);
                    Ok(())
                }
                AssignmentTarget::Pattern(pattern) => self.emit_destructure_from_stack(pattern),
                AssignmentTarget::Member(member) => {
                    // value is on the stack; rearrange into the SET_PROP shape.
                    self.emit_expression(&member.object)?;
                    self.code.op(Op::Swap);
                    match &member.property {
                        MemberProperty::Identifier(name) => {
                            let name_idx = self.pool.add_str(&name.name);
                            self.code.op(Op::SetProp);
                            self.code.u32(name_idx);
                        }
                        MemberProperty::Expression(key) => {
                            self.emit_expression(key)?;
                            self.code.op(Op::Swap);
                            self.code.op(Op::SetPropComputed);
                        }
                    }
                    self.code.op(Op::Pop);
                    Ok(())
                }
            },
        }
    }

    /// Pops the innermost loop frame, resolving breaks to the current
    /// position and continues to `continue_target`.
    fn close_loop(&mut self, continue_target: usize) -> Result<(), EmitError> {
        let frame = self
            .loops
            .pop()
            .expect("close_loop is only called with an open frame");
        trace!(start = frame.start, "closed loop");
        for jump in frame.breaks {
            self.code.patch_here(jump)?;
        }
        for jump in frame.continues {
            self.code.patch(jump, continue_target)?;
        }
        Ok(())
    }

    fn emit_try(&mut self, stmt: &TryStatement) -> Result<(), EmitError> {
        self.tries.push(TryFrame {
            start: self.code.here(),
        });

        for statement in &stmt.block.body {
            self.emit_statement(statement)?;
        }
        let jmp_over = self.code.jump(Op::Jmp);

        if let Some(handler) = &stmt.handler {
            self.code.op(Op::Catch);
            match &handler.param {
                Some(param) => self.emit_binding_target(param)?,
                None => self.code.op(Op::Pop),
            }
            for statement in &handler.body.body {
                self.emit_statement(statement)?;
            }
            self.code.op(Op::EndCatch);
        }

        // The jump over the catch lands on the finalizer when present.
        let after_catch = self.code.here();
        if let Some(finalizer) = &stmt.finalizer {
            self.code.op(Op::Finally);
            for statement in &finalizer.body {
                self.emit_statement(statement)?;
            }
        }
        self.code.patch(jmp_over, after_catch)?;

        let frame = self
            .tries
            .pop()
            .expect("emit_try always pushes a frame");
        trace!(start = frame.start, "closed try region");
        Ok(())
    }

    fn emit_switch(&mut self, stmt: &SwitchStatement) -> Result<(), EmitError> {
        self.emit_expression(&stmt.discriminant)?;
        let discriminant = self.synth_name("$switch");
        self.emit_store_var(&discriminant);

        // First pass: one test per non-default case, jumping into the body
        // area on a match.
        let mut case_jumps = Vec::new();
        let mut default_index = None;
        for (index, case) in stmt.cases.iter().enumerate() {
            match &case.test {
                Some(test) => {
                    self.emit_load_var(&discriminant);
                    self.emit_expression(test)?;
                    self.code.op(Op::Eq);
                    case_jumps.push((index, self.code.jump(Op::Jnz)));
                }
                None => default_index = Some(index),
            }
        }

        // No case matched: jump to the default body, or past the switch.
        let no_match = self.code.jump(Op::Jmp);

        // Second pass: bodies back-to-back in source order, the default in
        // place, so a case without a trailing break falls into the next
        // body.
        let mut body_starts = Vec::new();
        let mut end_jumps = Vec::new();
        for case in &stmt.cases {
            body_starts.push(self.code.here());
            self.emit_case_body(&case.consequent, &mut end_jumps)?;
        }

        for (index, jump) in case_jumps {
            self.code.patch(jump, body_starts[index])?;
        }
        match default_index {
            Some(index) => self.code.patch(no_match, body_starts[index])?,
            None => self.code.patch_here(no_match)?,
        }
        for jump in end_jumps {
            self.code.patch_here(jump)?;
        }
        Ok(())
    }

    /// Emits one case body. A trailing `break` belongs to the switch and
    /// becomes a patched jump to the end; its absence falls through into
    /// the next body.
    fn emit_case_body(
        &mut self,
        consequent: &[Statement],
        end_jumps: &mut Vec<Jump>,
    ) -> Result<(), EmitError> {
        let (body, has_break) = match consequent.split_last() {
            Some((Statement::Break, body)) => (body, true),
            _ => (consequent, false),
        };
        for statement in body {
            self.emit_statement(statement)?;
        }
        if has_break {
            end_jumps.push(self.code.jump(Op::Jmp));
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Functions and classes
    // ------------------------------------------------------------------

    fn emit_function_declaration(&mut self, decl: &FunctionDeclaration) -> Result<(), EmitError> {
        let jmp_over = self.code.jump(Op::Jmp);
        let start = self.code.here() as u32;
        self.function_starts.insert(decl.id.name.clone(), start);
        trace!(name = %decl.id.name, offset = start, "laying out function");

        self.emit_function_prologue_and_body(
            &decl.params,
            &decl.body,
            decl.is_async,
            decl.is_generator,
        )?;
        self.code.patch_here(jmp_over)?;

        // Bind the layout offset to the function name.
        let offset_idx = self.pool.add(Const::Number(start as f64));
        self.code.op(Op::PushConst);
        self.code.u32(offset_idx);
        self.emit_store_var(&decl.id.name);
        Ok(())
    }

    /// Emits a function expression's body and leaves its offset on the
    /// stack.
    pub(crate) fn emit_function_expression(
        &mut self,
        f: &FunctionExpression,
    ) -> Result<(), EmitError> {
        let jmp_over = self.code.jump(Op::Jmp);
        let start = self.code.here() as u32;
        if let Some(id) = &f.id {
            self.function_starts.insert(id.name.clone(), start);
        }

        self.emit_function_prologue_and_body(&f.params, &f.body, f.is_async, f.is_generator)?;
        self.code.patch_here(jmp_over)?;

        let offset_idx = self.pool.add(Const::Number(start as f64));
        self.code.op(Op::PushConst);
        self.code.u32(offset_idx);
        Ok(())
    }

    fn emit_function_prologue_and_body(
        &mut self,
        params: &[BindingTarget],
        body: &[Statement],
        is_async: bool,
        is_generator: bool,
    ) -> Result<(), EmitError> {
        if is_async {
            self.code.op(Op::AsyncFunc);
        }
        if is_generator {
            self.code.op(Op::Generator);
        }
        self.code.op(Op::EnterFunc);

        // Arguments arrive in reverse push order: the first parameter is on
        // top of the stack.
        for param in params {
            self.emit_binding_target(param)?;
        }

        for statement in body {
            self.emit_statement(statement)?;
        }

        // Implicit return.
        self.emit_push_const(Const::Undefined);
        self.code.op(Op::Return);
        Ok(())
    }

    /// Emits a class and leaves the class value on the stack.
    pub(crate) fn emit_class(
        &mut self,
        name: Option<&str>,
        superclass: Option<&Expression>,
        body: &[MethodDefinition],
    ) -> Result<(), EmitError> {
        self.classes.push(ClassFrame {
            name: name.map(str::to_string),
        });

        if let Some(superclass) = superclass {
            self.emit_expression(superclass)?;
        }
        let name_idx = self.pool.add_str(name.unwrap_or(""));
        self.code.op(Op::NewClass);
        self.code.u32(name_idx);
        self.code.byte(u8::from(superclass.is_some()));

        for method in body {
            self.emit_method(method)?;
        }

        let frame = self
            .classes
            .pop()
            .expect("emit_class always pushes a frame");
        trace!(name = ?frame.name, "closed class");
        Ok(())
    }

    fn emit_method(&mut self, method: &MethodDefinition) -> Result<(), EmitError> {
        let key = match &method.key {
            PropertyKey::Identifier(id) => id.name.clone(),
            PropertyKey::Literal(Literal::String(s)) => s.clone(),
            PropertyKey::Literal(Literal::Number(n)) => n.to_string(),
            PropertyKey::Computed(expr) => match expr.as_ref() {
                Expression::Literal(Literal::String(s)) => s.clone(),
                Expression::Literal(Literal::Number(n)) => n.to_string(),
                _ => {
                    return Err(EmitError::Unsupported(
                        "computed method key".to_string(),
                    ));
                }
            },
            PropertyKey::Literal(_) => {
                return Err(EmitError::Unsupported("method key literal".to_string()));
            }
        };

        let jmp_over = self.code.jump(Op::Jmp);
        let start = self.code.here() as u32;
        self.emit_function_prologue_and_body(
            &method.params,
            &method.body,
            method.is_async,
            method.is_generator,
        )?;
        self.code.patch_here(jmp_over)?;

        let op = match method.kind {
            MethodKind::Getter => Op::DefineGetter,
            MethodKind::Setter => Op::DefineSetter,
            MethodKind::Method | MethodKind::Constructor => Op::DefineMethod,
        };
        let key_idx = self.pool.add_str(&key);
        self.code.op(op);
        self.code.u32(key_idx);
        self.code.u32(start);

        let mut flags = 0u8;
        if method.is_static {
            flags |= 0x1;
        }
        if method.is_async {
            flags |= 0x2;
        }
        if method.is_generator {
            flags |= 0x4;
        }
        self.code.byte(flags);
        Ok(())
    }

    // ------------------------------------------------------------------
    // Modules
    // ------------------------------------------------------------------

    fn emit_import(&mut self, decl: &ImportDeclaration) -> Result<(), EmitError> {
        let source_idx = self.pool.add_str(&decl.source);

        if decl.specifiers.is_empty() {
            self.code.op(Op::Import);
            self.code.u32(source_idx);
            return Ok(());
        }

        for specifier in &decl.specifiers {
            let (op, local) = match specifier {
                ImportSpecifier::Default(local) => (Op::ImportDefault, local),
                ImportSpecifier::Named { local, .. } => (Op::Import, local),
                ImportSpecifier::Namespace(local) => (Op::Import, local),
            };
            self.code.op(op);
            self.code.u32(source_idx);
            self.emit_store_var(&local.name);
        }
        Ok(())
    }

    fn emit_export(&mut self, decl: &ExportDeclaration) -> Result<(), EmitError> {
        match decl {
            ExportDeclaration::Declaration(statement) => {
                self.emit_statement(statement)?;
                let mut names = Vec::new();
                collect_declared_names(statement, &mut names);
                for name in names {
                    self.emit_export_name(&name);
                    self.exports.push(ExportEntry {
                        exported: name.clone(),
                        local: name,
                        source: None,
                    });
                }
            }
            ExportDeclaration::Named { specifiers, source } => {
                if let Some(source) = source {
                    let source_idx = self.pool.add_str(source);
                    self.code.op(Op::Import);
                    self.code.u32(source_idx);
                }
                for specifier in specifiers {
                    self.emit_export_name(&specifier.exported);
                    self.exports.push(ExportEntry {
                        exported: specifier.exported.clone(),
                        local: specifier.local.clone(),
                        source: source.clone(),
                    });
                }
            }
            ExportDeclaration::Default(default) => {
                match default {
                    ExportDefault::Declaration(statement) => {
                        self.emit_statement(statement)?;
                        let mut names = Vec::new();
                        collect_declared_names(statement, &mut names);
                        if let Some(name) = names.first() {
                            self.emit_load_var(name);
                            self.code.op(Op::ExportDefault);
                            self.exports.push(ExportEntry {
                                exported: "default".to_string(),
                                local: name.clone(),
                                source: None,
                            });
                        }
                    }
                    ExportDefault::Expression(expr) => {
                        self.emit_expression(expr)?;
                        self.code.op(Op::ExportDefault);
                        self.exports.push(ExportEntry {
                            exported: "default".to_string(),
                            local: "default".to_string(),
                            source: None,
                        });
                    }
                }
            }
        }
        Ok(())
    }

    fn emit_export_name(&mut self, name: &str) {
        let name_idx = self.pool.add_str(name);
        self.code.op(Op::Export);
        self.code.u32(name_idx);
    }

    // ------------------------------------------------------------------
    // Shared helpers
    // ------------------------------------------------------------------

    pub(crate) fn emit_push_const(&mut self, value: Const) {
        let idx = self.pool.add(value);
        self.code.op(Op::PushConst);
        self.code.u32(idx);
    }

    pub(crate) fn emit_load_var(&mut self, name: &str) {
        let idx = self.pool.add_str(name);
        self.code.op(Op::LoadVar);
        self.code.u32(idx);
    }

    pub(crate) fn emit_store_var(&mut self, name: &str) {
        let idx = self.pool.add_str(name);
        self.code.op(Op::StoreVar);
        self.code.u32(idx);
    }

    /// A fresh compiler-introduced name; the counter keeps nested uses
    /// apart.
    pub(crate) fn synth_name(&mut self, base: &str) -> String {
        let n = self.synth;
        self.synth += 1;
        format!("{}{}", base, n)
    }

    /// True when `name` refers to a declared function somewhere in the
    /// program.
    pub(crate) fn is_declared_function(&self, name: &str) -> bool {
        self.declared_functions.contains(name)
    }

    /// Emits the callee for a direct call to a declared function: its layout
    /// offset when known, a patched placeholder otherwise.
    pub(crate) fn emit_function_reference(&mut self, name: &str) {
        if let Some(&start) = self.function_starts.get(name) {
            let idx = self.pool.add(Const::Number(start as f64));
            self.code.op(Op::PushConst);
            self.code.u32(idx);
        } else {
            self.code.op(Op::PushConst);
            let operand_pos = self.code.here();
            self.code.u32(u32::MAX);
            self.call_patches.push(CallPatch {
                operand_pos,
                name: name.to_string(),
            });
        }
    }

    fn resolve_call_patches(&mut self) -> Result<(), EmitError> {
        let patches = std::mem::take(&mut self.call_patches);
        for patch in patches {
            let start = self.function_starts.get(&patch.name).copied().ok_or_else(|| {
                EmitError::Unsupported(format!("call to unlaid function '{}'", patch.name))
            })?;
            let idx = self.pool.add(Const::Number(start as f64));
            self.code.bytes[patch.operand_pos..patch.operand_pos + 4]
                .copy_from_slice(&idx.to_be_bytes());
        }
        Ok(())
    }

    /// The dotted host path of a callee rooted at a host identifier, if any.
    pub(crate) fn host_path(expr: &Expression) -> Option<String> {
        match expr {
            Expression::Identifier(id) if HOST_CALLEES.contains(&id.name.as_str()) => {
                Some(id.name.clone())
            }
            Expression::Member(member) if !member.computed => {
                let base = Self::host_path(&member.object)?;
                match &member.property {
                    MemberProperty::Identifier(name) => {
                        Some(format!("{}.{}", base, name.name))
                    }
                    MemberProperty::Expression(_) => None,
                }
            }
            _ => None,
        }
    }
}

impl Default for Emitter {
    fn default() -> Self {
        Self::new()
    }
}

/// Collects every function declaration name in the tree, at any nesting
/// depth; the flat map mirrors the flat `function_starts` layout record.
fn collect_function_names(statements: &[Statement], names: &mut FxHashSet<String>) {
    for statement in statements {
        match statement {
            Statement::FunctionDeclaration(f) => {
                names.insert(f.id.name.clone());
                collect_function_names(&f.body, names);
            }
            Statement::Block(block) => collect_function_names(&block.body, names),
            Statement::If(stmt) => {
                collect_function_names(std::slice::from_ref(&*stmt.consequent), names);
                if let Some(alternate) = &stmt.alternate {
                    collect_function_names(std::slice::from_ref(&**alternate), names);
                }
            }
            Statement::While(stmt) => {
                collect_function_names(std::slice::from_ref(&*stmt.body), names);
            }
            Statement::For(stmt) => {
                collect_function_names(std::slice::from_ref(&*stmt.body), names);
            }
            Statement::ForIn(stmt) => {
                collect_function_names(std::slice::from_ref(&*stmt.body), names);
            }
            Statement::ForOf(stmt) => {
                collect_function_names(std::slice::from_ref(&*stmt.body), names);
            }
            Statement::Try(stmt) => {
                collect_function_names(&stmt.block.body, names);
                if let Some(handler) = &stmt.handler {
                    collect_function_names(&handler.body.body, names);
                }
                if let Some(finalizer) = &stmt.finalizer {
                    collect_function_names(&finalizer.body, names);
                }
            }
            Statement::Switch(stmt) => {
                for case in &stmt.cases {
                    collect_function_names(&case.consequent, names);
                }
            }
            Statement::Export(ExportDeclaration::Declaration(decl)) => {
                collect_function_names(std::slice::from_ref(decl.as_ref()), names);
            }
            Statement::Export(ExportDeclaration::Default(ExportDefault::Declaration(decl))) => {
                collect_function_names(std::slice::from_ref(decl.as_ref()), names);
            }
            _ => {}
        }
    }
}

/// The names bound by a declaration statement, for the export record.
fn collect_declared_names(statement: &Statement, names: &mut Vec<String>) {
    match statement {
        Statement::VariableDeclaration(decl) => {
            for declarator in &decl.declarations {
                collect_binding_names(&declarator.target, names);
            }
        }
        Statement::FunctionDeclaration(f) => names.push(f.id.name.clone()),
        Statement::ClassDeclaration(c) => names.push(c.id.name.clone()),
        _ => {}
    }
}

fn collect_binding_names(target: &BindingTarget, names: &mut Vec<String>) {
    match target {
        BindingTarget::Identifier(id) => names.push(id.name.clone()),
        BindingTarget::Pattern(pattern) => collect_pattern_names(pattern, names),
    }
}

fn collect_pattern_names(pattern: &Pattern, names: &mut Vec<String>) {
    match pattern {
        Pattern::Object(obj) => {
            for entry in &obj.entries {
                match &entry.value {
                    PatternTarget::Identifier(id) => names.push(id.name.clone()),
                    PatternTarget::Pattern(nested) => collect_pattern_names(nested, names),
                }
            }
        }
        Pattern::Array(arr) => {
            for element in arr.elements.iter().flatten() {
                match element {
                    PatternTarget::Identifier(id) => names.push(id.name.clone()),
                    PatternTarget::Pattern(nested) => collect_pattern_names(nested, names),
                }
            }
        }
    }
}
