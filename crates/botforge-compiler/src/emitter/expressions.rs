//! Expression lowering.
//!
//! Stack discipline: every expression leaves exactly one value, so
//! expression statements can uniformly pop. Short-circuit operators keep
//! the surviving operand; assignments duplicate their value before the
//! store (member stores leave the object, which `SET_PROP` keeps on the
//! stack).

use crate::ast::*;
use crate::error::EmitError;

use super::constants::Const;
use super::opcodes::Op;
use super::Emitter;

/// A member target spilled into synthetic temporaries so it can be read and
/// written back.
struct MemberSpill {
    object: String,
    key: Option<String>,
    name: Option<String>,
}

impl Emitter {
    pub(crate) fn emit_expression(&mut self, expression: &Expression) -> Result<(), EmitError> {
        match expression {
            Expression::Literal(literal) => {
                let value = literal_const(literal);
                self.emit_push_const(value);
            }
            Expression::Identifier(id) => self.emit_load_var(&id.name),
            Expression::This => self.emit_load_var("this"),
            Expression::Super => self.emit_load_var("super"),
            Expression::Template(template) => self.emit_template(template)?,
            Expression::Array(array) => self.emit_array(array)?,
            Expression::Object(object) => self.emit_object(object)?,
            Expression::Binary(binary) => {
                self.emit_expression(&binary.left)?;
                self.emit_expression(&binary.right)?;
                self.code.op(binary_op(binary.operator));
            }
            Expression::Logical(logical) => self.emit_logical(logical)?,
            Expression::Unary(unary) => self.emit_unary(unary)?,
            Expression::Update(update) => self.emit_update(update)?,
            Expression::Assignment(assignment) => self.emit_assignment(assignment)?,
            Expression::Conditional(conditional) => {
                self.emit_expression(&conditional.test)?;
                let jz_else = self.code.jump(Op::Jz);
                self.emit_expression(&conditional.consequent)?;
                let jmp_end = self.code.jump(Op::Jmp);
                self.code.patch_here(jz_else)?;
                self.emit_expression(&conditional.alternate)?;
                self.code.patch_here(jmp_end)?;
            }
            Expression::Call(call) => self.emit_call(call)?,
            Expression::New(new) => {
                // No constructor opcode exists; `new` dispatches like a call.
                for argument in new.arguments.iter().rev() {
                    self.emit_expression(argument)?;
                }
                self.emit_expression(&new.callee)?;
                self.code.op(Op::Call);
                self.code.u32(new.arguments.len() as u32);
            }
            Expression::Member(member) => self.emit_member_read(member)?,
            Expression::Function(f) => self.emit_function_expression(f)?,
            Expression::Class(class) => {
                self.emit_class(
                    class.id.as_ref().map(|id| id.name.as_str()),
                    class.superclass.as_ref(),
                    &class.body,
                )?;
            }
            Expression::Yield(y) => {
                match &y.argument {
                    Some(argument) => self.emit_expression(argument)?,
                    None => self.emit_push_const(Const::Undefined),
                }
                self.code.op(if y.delegate {
                    Op::YieldDelegate
                } else {
                    Op::Yield
                });
            }
            Expression::ImportExpr(import) => {
                self.emit_expression(&import.source)?;
                self.code.op(Op::ImportDynamic);
            }
        }
        Ok(())
    }

    /// Quasis and interpolations concatenate in left-to-right pairs:
    /// `quasi0 (+ expr + quasi)*`.
    fn emit_template(&mut self, template: &TemplateLiteral) -> Result<(), EmitError> {
        self.emit_push_const(Const::Str(template.quasis[0].clone()));
        for (expr, quasi) in template
            .expressions
            .iter()
            .zip(template.quasis.iter().skip(1))
        {
            self.emit_expression(expr)?;
            self.emit_push_const(Const::Str(quasi.clone()));
            self.code.op(Op::Add);
            self.code.op(Op::Add);
        }
        Ok(())
    }

    fn emit_array(&mut self, array: &ArrayExpression) -> Result<(), EmitError> {
        for element in &array.elements {
            match element {
                Some(expr) => self.emit_expression(expr)?,
                None => self.emit_push_const(Const::Undefined),
            }
        }
        self.code.op(Op::NewArray);
        self.code.u32(array.elements.len() as u32);
        Ok(())
    }

    fn emit_object(&mut self, object: &ObjectExpression) -> Result<(), EmitError> {
        self.code.op(Op::NewObject);
        for property in &object.properties {
            match &property.key {
                PropertyKey::Computed(key) => {
                    self.emit_expression(key)?;
                    self.emit_expression(&property.value)?;
                    self.code.op(Op::SetPropComputed);
                }
                key => {
                    let name = match key {
                        PropertyKey::Identifier(id) => id.name.clone(),
                        PropertyKey::Literal(Literal::String(s)) => s.clone(),
                        PropertyKey::Literal(Literal::Number(n)) => n.to_string(),
                        _ => {
                            return Err(EmitError::Unsupported(
                                "object property key".to_string(),
                            ));
                        }
                    };
                    self.emit_expression(&property.value)?;
                    let key_idx = self.pool.add_str(&name);
                    self.code.op(Op::SetProp);
                    self.code.u32(key_idx);
                }
            }
        }
        Ok(())
    }

    fn emit_logical(&mut self, logical: &LogicalExpression) -> Result<(), EmitError> {
        self.emit_expression(&logical.left)?;
        self.code.op(Op::Dup);

        let skip_right = match logical.operator {
            LogicalOperator::And => self.code.jump(Op::Jz),
            LogicalOperator::Or => self.code.jump(Op::Jnz),
            LogicalOperator::Nullish => {
                // Loose null-equality holds exactly for null and undefined.
                self.emit_push_const(Const::Null);
                self.code.op(Op::Eq);
                self.code.jump(Op::Jz)
            }
        };

        self.code.op(Op::Pop);
        self.emit_expression(&logical.right)?;
        self.code.patch_here(skip_right)?;
        Ok(())
    }

    fn emit_unary(&mut self, unary: &UnaryExpression) -> Result<(), EmitError> {
        match unary.operator {
            UnaryOperator::Void => {
                self.emit_expression(&unary.argument)?;
                self.code.op(Op::Pop);
                self.emit_push_const(Const::Undefined);
            }
            UnaryOperator::Delete => match unary.argument.as_ref() {
                Expression::Member(member) => {
                    self.emit_expression(&member.object)?;
                    match &member.property {
                        MemberProperty::Identifier(name) => {
                            self.emit_push_const(Const::Str(name.name.clone()));
                        }
                        MemberProperty::Expression(key) => self.emit_expression(key)?,
                    }
                    self.code.op(Op::DeleteProp);
                }
                other => {
                    self.emit_expression(other)?;
                    self.code.op(Op::Pop);
                    self.emit_push_const(Const::Bool(true));
                }
            },
            UnaryOperator::Await => {
                self.emit_expression(&unary.argument)?;
                self.code.op(Op::Await);
            }
            operator => {
                self.emit_expression(&unary.argument)?;
                self.code.op(match operator {
                    UnaryOperator::Minus => Op::Neg,
                    UnaryOperator::Plus => Op::Pos,
                    UnaryOperator::LogicalNot => Op::Not,
                    UnaryOperator::BitwiseNot => Op::BitNot,
                    UnaryOperator::Typeof => Op::Typeof,
                    _ => unreachable!("handled above"),
                });
            }
        }
        Ok(())
    }

    fn emit_update(&mut self, update: &UpdateExpression) -> Result<(), EmitError> {
        let step_op = match update.operator {
            UpdateOperator::Increment => Op::Add,
            UpdateOperator::Decrement => Op::Sub,
        };

        match update.argument.as_ref() {
            Expression::Identifier(id) => {
                self.emit_load_var(&id.name);
                if update.prefix {
                    self.emit_push_const(Const::Number(1.0));
                    self.code.op(step_op);
                    self.code.op(Op::Dup);
                } else {
                    self.code.op(Op::Dup);
                    self.emit_push_const(Const::Number(1.0));
                    self.code.op(step_op);
                }
                self.emit_store_var(&id.name);
            }
            Expression::Member(member) => {
                let spill = self.spill_member(member)?;
                self.load_spilled(&spill);
                if update.prefix {
                    self.emit_push_const(Const::Number(1.0));
                    self.code.op(step_op);
                    self.code.op(Op::Dup);
                } else {
                    self.code.op(Op::Dup);
                    self.emit_push_const(Const::Number(1.0));
                    self.code.op(step_op);
                }
                self.write_spilled(&spill);
                self.code.op(Op::Pop);
            }
            _ => return Err(EmitError::InvalidAssignmentTarget),
        }
        Ok(())
    }

    fn emit_assignment(&mut self, assignment: &AssignmentExpression) -> Result<(), EmitError> {
        match assignment.operator {
            AssignmentOperator::Assign => self.emit_plain_assignment(assignment),
            AssignmentOperator::LogicalAndAssign
            | AssignmentOperator::LogicalOrAssign
            | AssignmentOperator::NullishAssign => self.emit_logical_assignment(assignment),
            _ => self.emit_compound_assignment(assignment),
        }
    }

    fn emit_plain_assignment(
        &mut self,
        assignment: &AssignmentExpression,
    ) -> Result<(), EmitError> {
        match &assignment.target {
            AssignmentTarget::Identifier(id) => {
                self.emit_expression(&assignment.value)?;
                self.code.op(Op::Dup);
                self.emit_store_var(&id.name);
            }
            AssignmentTarget::Member(member) => {
                self.emit_expression(&member.object)?;
                match &member.property {
                    MemberProperty::Identifier(name) => {
                        self.emit_expression(&assignment.value)?;
                        let name_idx = self.pool.add_str(&name.name);
                        self.code.op(Op::SetProp);
                        self.code.u32(name_idx);
                    }
                    MemberProperty::Expression(key) => {
                        self.emit_expression(key)?;
                        self.emit_expression(&assignment.value)?;
                        self.code.op(Op::SetPropComputed);
                    }
                }
            }
            AssignmentTarget::Pattern(pattern) => {
                self.emit_expression(&assignment.value)?;
                self.code.op(Op::Dup);
                self.emit_destructure_from_stack(pattern)?;
            }
        }
        Ok(())
    }

    fn emit_compound_assignment(
        &mut self,
        assignment: &AssignmentExpression,
    ) -> Result<(), EmitError> {
        let op = compound_op(assignment.operator);
        match &assignment.target {
            AssignmentTarget::Identifier(id) => {
                self.emit_load_var(&id.name);
                self.emit_expression(&assignment.value)?;
                self.code.op(op);
                self.code.op(Op::Dup);
                self.emit_store_var(&id.name);
            }
            AssignmentTarget::Member(member) => {
                let spill = self.spill_member(member)?;
                self.load_spilled(&spill);
                self.emit_expression(&assignment.value)?;
                self.code.op(op);
                self.write_spilled(&spill);
            }
            AssignmentTarget::Pattern(_) => return Err(EmitError::InvalidAssignmentTarget),
        }
        Ok(())
    }

    /// `&&= ||= ??=` evaluate and store the right side only when the current
    /// value does not decide the result.
    fn emit_logical_assignment(
        &mut self,
        assignment: &AssignmentExpression,
    ) -> Result<(), EmitError> {
        match &assignment.target {
            AssignmentTarget::Identifier(id) => {
                self.emit_load_var(&id.name);
                self.code.op(Op::Dup);
                let skip = self.emit_logical_skip(assignment.operator);
                self.code.op(Op::Pop);
                self.emit_expression(&assignment.value)?;
                self.code.op(Op::Dup);
                self.emit_store_var(&id.name);
                self.code.patch_here(skip)?;
            }
            AssignmentTarget::Member(member) => {
                let spill = self.spill_member(member)?;
                self.load_spilled(&spill);
                self.code.op(Op::Dup);
                let skip = self.emit_logical_skip(assignment.operator);
                self.code.op(Op::Pop);
                self.emit_expression(&assignment.value)?;
                self.write_spilled(&spill);
                self.code.patch_here(skip)?;
            }
            AssignmentTarget::Pattern(_) => return Err(EmitError::InvalidAssignmentTarget),
        }
        Ok(())
    }

    fn emit_logical_skip(&mut self, operator: AssignmentOperator) -> super::Jump {
        match operator {
            AssignmentOperator::LogicalAndAssign => self.code.jump(Op::Jz),
            AssignmentOperator::LogicalOrAssign => self.code.jump(Op::Jnz),
            _ => {
                self.emit_push_const(Const::Null);
                self.code.op(Op::Eq);
                self.code.jump(Op::Jz)
            }
        }
    }

    fn emit_call(&mut self, call: &CallExpression) -> Result<(), EmitError> {
        let argc = call.arguments.len() as u32;

        // super(...) and super.m(...) dispatch through dedicated opcodes.
        if matches!(call.callee.as_ref(), Expression::Super) {
            for argument in call.arguments.iter().rev() {
                self.emit_expression(argument)?;
            }
            self.code.op(Op::SuperCtor);
            self.code.u32(argc);
            return Ok(());
        }
        if let Expression::Member(member) = call.callee.as_ref() {
            if matches!(member.object.as_ref(), Expression::Super) && !member.computed {
                if let MemberProperty::Identifier(name) = &member.property {
                    for argument in call.arguments.iter().rev() {
                        self.emit_expression(argument)?;
                    }
                    let name_idx = self.pool.add_str(&name.name);
                    self.code.op(Op::InvokeSuper);
                    self.code.u32(name_idx);
                    self.code.u32(argc);
                    return Ok(());
                }
            }
        }

        for argument in call.arguments.iter().rev() {
            self.emit_expression(argument)?;
        }

        // Declared functions dispatch by layout offset; host roots go
        // through the host bridge.
        if let Expression::Identifier(id) = call.callee.as_ref() {
            if self.is_declared_function(&id.name) {
                self.emit_function_reference(&id.name);
                self.code.op(Op::Call);
                self.code.u32(argc);
                return Ok(());
            }
        }
        if let Some(path) = Self::host_path(&call.callee) {
            let name_idx = self.pool.add_str(&path);
            self.code.op(Op::CallHost);
            self.code.u32(name_idx);
            self.code.u32(argc);
            return Ok(());
        }

        self.emit_expression(&call.callee)?;
        self.code.op(Op::Call);
        self.code.u32(argc);
        Ok(())
    }

    fn emit_member_read(&mut self, member: &MemberExpression) -> Result<(), EmitError> {
        self.emit_expression(&member.object)?;
        match &member.property {
            MemberProperty::Identifier(name) => {
                let name_idx = self.pool.add_str(&name.name);
                self.code.op(Op::GetProp);
                self.code.u32(name_idx);
            }
            MemberProperty::Expression(key) => {
                self.emit_expression(key)?;
                self.code.op(Op::GetPropComputed);
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Member spill helpers
    // ------------------------------------------------------------------

    fn spill_member(&mut self, member: &MemberExpression) -> Result<MemberSpill, EmitError> {
        let object = self.synth_name("$temp");
        self.emit_expression(&member.object)?;
        self.emit_store_var(&object);

        let (key, name) = match &member.property {
            MemberProperty::Identifier(id) => (None, Some(id.name.clone())),
            MemberProperty::Expression(expr) => {
                let key = self.synth_name("$temp");
                self.emit_expression(expr)?;
                self.emit_store_var(&key);
                (Some(key), None)
            }
        };

        Ok(MemberSpill { object, key, name })
    }

    /// Reads the spilled member onto the stack.
    fn load_spilled(&mut self, spill: &MemberSpill) {
        self.emit_load_var(&spill.object);
        match (&spill.key, &spill.name) {
            (Some(key), _) => {
                self.emit_load_var(key);
                self.code.op(Op::GetPropComputed);
            }
            (None, Some(name)) => {
                let name_idx = self.pool.add_str(name);
                self.code.op(Op::GetProp);
                self.code.u32(name_idx);
            }
            (None, None) => unreachable!("spill always records a key or a name"),
        }
    }

    /// Writes the stack top back into the spilled member; leaves the object.
    fn write_spilled(&mut self, spill: &MemberSpill) {
        self.emit_load_var(&spill.object);
        self.code.op(Op::Swap);
        match (&spill.key, &spill.name) {
            (Some(key), _) => {
                self.emit_load_var(key);
                self.code.op(Op::Swap);
                self.code.op(Op::SetPropComputed);
            }
            (None, Some(name)) => {
                let name_idx = self.pool.add_str(name);
                self.code.op(Op::SetProp);
                self.code.u32(name_idx);
            }
            (None, None) => unreachable!("spill always records a key or a name"),
        }
    }
}

fn literal_const(literal: &Literal) -> Const {
    match literal {
        Literal::Number(n) => Const::Number(*n),
        Literal::String(s) => Const::Str(s.clone()),
        Literal::Boolean(b) => Const::Bool(*b),
        Literal::Null => Const::Null,
        Literal::Undefined => Const::Undefined,
        Literal::BigInt(i) => Const::BigInt(*i),
    }
}

fn binary_op(operator: BinaryOperator) -> Op {
    match operator {
        BinaryOperator::Add => Op::Add,
        BinaryOperator::Subtract => Op::Sub,
        BinaryOperator::Multiply => Op::Mul,
        BinaryOperator::Divide => Op::Div,
        BinaryOperator::Modulo => Op::Mod,
        BinaryOperator::Exponent => Op::Pow,
        BinaryOperator::Equal => Op::Eq,
        BinaryOperator::NotEqual => Op::Neq,
        BinaryOperator::StrictEqual => Op::StrictEq,
        BinaryOperator::StrictNotEqual => Op::StrictNeq,
        BinaryOperator::LessThan => Op::Lt,
        BinaryOperator::LessThanEqual => Op::Lte,
        BinaryOperator::GreaterThan => Op::Gt,
        BinaryOperator::GreaterThanEqual => Op::Gte,
        BinaryOperator::BitwiseAnd => Op::BitAnd,
        BinaryOperator::BitwiseOr => Op::BitOr,
        BinaryOperator::BitwiseXor => Op::BitXor,
        BinaryOperator::LeftShift => Op::Shl,
        BinaryOperator::RightShift => Op::Shr,
        BinaryOperator::UnsignedRightShift => Op::Ushr,
        BinaryOperator::In => Op::InOp,
        BinaryOperator::InstanceOf => Op::Instanceof,
    }
}

fn compound_op(operator: AssignmentOperator) -> Op {
    match operator {
        AssignmentOperator::AddAssign => Op::Add,
        AssignmentOperator::SubtractAssign => Op::Sub,
        AssignmentOperator::MultiplyAssign => Op::Mul,
        AssignmentOperator::DivideAssign => Op::Div,
        AssignmentOperator::ModuloAssign => Op::Mod,
        AssignmentOperator::ExponentAssign => Op::Pow,
        AssignmentOperator::LeftShiftAssign => Op::Shl,
        AssignmentOperator::RightShiftAssign => Op::Shr,
        AssignmentOperator::UnsignedRightShiftAssign => Op::Ushr,
        AssignmentOperator::BitwiseAndAssign => Op::BitAnd,
        AssignmentOperator::BitwiseOrAssign => Op::BitOr,
        AssignmentOperator::BitwiseXorAssign => Op::BitXor,
        AssignmentOperator::Assign
        | AssignmentOperator::LogicalAndAssign
        | AssignmentOperator::LogicalOrAssign
        | AssignmentOperator::NullishAssign => {
            unreachable!("plain and logical assignment are lowered separately")
        }
    }
}
