use crate::ast::*;
use crate::context::MethodContext;
use crate::diagnostics::CompileError;
use crate::span::Spanned;
use crate::typeck::infer::{expr_type, operand_type};
use crate::typeck::resolver::TypeResolver;
use crate::typeck::scope::{LocalId, MethodScope, ScopeId};
use crate::typeck::types::{PrimitiveType, Type};

use super::instr::*;
use super::stream::CodeStream;

/// Where `break` and `continue` go, innermost last.
#[derive(Debug, Clone)]
pub(crate) enum JumpTarget {
    Label { name: String, break_label: Label, labels_loop: bool },
    /// `continue_label` is absent when the loop never continues.
    Loop { break_label: Label, continue_label: Option<Label> },
}

/// Lowers one analyzed method into a [`CodeStream`].
pub struct Generator<'c, 'a> {
    pub(crate) ctx: &'c MethodContext<'a>,
    pub(crate) code: CodeStream<'c>,
    pub(crate) targets: Vec<JumpTarget>,
}

/// Generate code for a method that has been resolved, analyzed and given
/// frame slots.
pub fn generate_method(method: &Method, ctx: &MethodContext) -> Result<MethodCode, CompileError> {
    let mut generator = Generator::new(ctx);
    for param in &method.params {
        let id = param.binding.ok_or_else(|| {
            CompileError::codegen(format!("parameter '{}' was never bound", param.name.node))
        })?;
        generator.code.add_variable(id);
    }
    let start = generator.code.position();
    generator.generate_block(&method.body.node, MethodScope::ROOT)?;
    if ctx.completes_normally && ctx.return_type == Type::Void {
        generator.code.emit(Instr::Return(None));
    }
    generator.code.record_positions_from(start, method.body.span);
    tracing::debug!(
        method = %method.name.node,
        instructions = generator.code.position(),
        "generated method"
    );
    generator.code.finish(&method.name.node)
}

impl<'c, 'a> Generator<'c, 'a> {
    pub fn new(ctx: &'c MethodContext<'a>) -> Self {
        Self { ctx, code: CodeStream::new(&ctx.scope), targets: Vec::new() }
    }

    fn type_of(&self, expr: &Expr) -> Type {
        expr_type(self.ctx.env, &self.ctx.scope, expr)
    }

    fn binding(name_ref: &NameRef) -> Result<LocalId, CompileError> {
        name_ref
            .binding
            .ok_or_else(|| CompileError::codegen(format!("name '{}' was never bound", name_ref.name)))
    }

    // ── Statements ───────────────────────────────────────────────────────

    pub(crate) fn generate_block(&mut self, block: &Block, scope: ScopeId) -> Result<(), CompileError> {
        for stmt in block.reachable_stmts() {
            self.generate_stmt(stmt, scope)?;
        }
        Ok(())
    }

    /// `scope` is the innermost block scope enclosing `stmt`.
    pub(crate) fn generate_stmt(&mut self, stmt: &Spanned<Stmt>, scope: ScopeId) -> Result<(), CompileError> {
        let pc = self.code.position();
        match &stmt.node {
            Stmt::Local(decl) => {
                if let Some(init) = &decl.init {
                    let id = decl
                        .binding
                        .ok_or_else(|| CompileError::codegen(format!("local '{}' was never bound", decl.name.node)))?;
                    let target = self.ctx.local(id).ty.clone();
                    if self.ctx.local(id).slot.is_some() {
                        self.generate_expr(init, true)?;
                        let from = self.type_of(&init.node);
                        self.generate_assignment_conversion(&from, &target);
                        self.code.store(id, false)?;
                    } else {
                        self.generate_expr(init, false)?;
                    }
                }
            }
            Stmt::Expr(expr) => self.generate_expr(expr, false)?,
            Stmt::Block(block) => {
                let inner = block.scope.unwrap_or(scope);
                self.generate_block(block, inner)?;
                if inner != scope {
                    self.code.exit_user_scope(inner);
                }
            }
            Stmt::If { condition, then_branch, else_branch } => {
                let else_label = self.code.new_label();
                self.generate_condition(condition, false, else_label)?;
                self.generate_stmt(then_branch, scope)?;
                match else_branch {
                    Some(else_branch) => {
                        let end_label = self.code.new_label();
                        if !self.code.is_terminated() {
                            self.code.emit(Instr::Goto(end_label));
                        }
                        self.code.place(else_label);
                        self.generate_stmt(else_branch, scope)?;
                        self.code.place(end_label);
                    }
                    None => self.code.place(else_label),
                }
            }
            Stmt::Foreach(node) => self.generate_foreach(node, stmt.span, scope)?,
            Stmt::Labeled { label, body } => {
                let break_label = self.code.new_label();
                self.targets.push(JumpTarget::Label {
                    name: label.node.clone(),
                    break_label,
                    labels_loop: body.node.is_loop(),
                });
                let result = self.generate_stmt(body, scope);
                self.targets.pop();
                result?;
                self.code.place(break_label);
            }
            Stmt::Break(label) => {
                let target = self.break_target(label.as_ref().map(|l| l.node.as_str()))?;
                self.code.emit(Instr::Goto(target));
            }
            Stmt::Continue(label) => {
                let target = self.continue_target(label.as_ref().map(|l| l.node.as_str()))?;
                self.code.emit(Instr::Goto(target));
            }
            Stmt::Return(value) => match value {
                Some(value) => {
                    self.generate_expr(value, true)?;
                    let from = self.type_of(&value.node);
                    let to = self.ctx.return_type.clone();
                    self.generate_assignment_conversion(&from, &to);
                    self.code.emit(Instr::Return(Some(ValueKind::of(&to))));
                }
                None => self.code.emit(Instr::Return(None)),
            },
            Stmt::Empty => {}
        }
        self.code.record_positions_from(pc, stmt.span);
        Ok(())
    }

    fn break_target(&self, label: Option<&str>) -> Result<Label, CompileError> {
        let found = self.targets.iter().rev().find_map(|t| match (t, label) {
            (JumpTarget::Loop { break_label, .. }, None) => Some(*break_label),
            (JumpTarget::Label { name, break_label, .. }, Some(wanted)) if name == wanted => Some(*break_label),
            _ => None,
        });
        found.ok_or_else(|| CompileError::codegen("break has no enclosing target"))
    }

    fn continue_target(&self, label: Option<&str>) -> Result<Label, CompileError> {
        let index = match label {
            None => self.targets.iter().rposition(|t| matches!(t, JumpTarget::Loop { .. })),
            Some(wanted) => self
                .targets
                .iter()
                .rposition(|t| matches!(t, JumpTarget::Label { name, labels_loop: true, .. } if name == wanted))
                .map(|i| i + 1),
        };
        match index.and_then(|i| self.targets.get(i)) {
            Some(JumpTarget::Loop { continue_label: Some(l), .. }) => Ok(*l),
            _ => Err(CompileError::codegen("continue has no enclosing loop with a continue target")),
        }
    }

    // ── Expressions ──────────────────────────────────────────────────────

    /// Emit `expr`, leaving its value on the stack only when `value_required`.
    pub(crate) fn generate_expr(&mut self, expr: &Spanned<Expr>, value_required: bool) -> Result<(), CompileError> {
        match &expr.node {
            Expr::IntLit(v) => {
                if value_required {
                    self.code.emit(Instr::IConst(*v));
                }
            }
            Expr::BoolLit(b) => {
                if value_required {
                    self.code.emit(Instr::IConst(i32::from(*b)));
                }
            }
            Expr::StringLit(s) => {
                if value_required {
                    self.code.emit(Instr::Ldc(s.clone()));
                }
            }
            Expr::Null => {
                if value_required {
                    self.code.emit(Instr::AConstNull);
                }
            }
            Expr::Name(name_ref) => {
                if value_required {
                    self.code.load(Self::binding(name_ref)?)?;
                }
            }
            Expr::NewArray { elem, elements } => self.generate_new_array(elem, elements, value_required)?,
            Expr::Binary { op, lhs, rhs } => {
                if !value_required {
                    self.generate_expr(lhs, false)?;
                    return self.generate_expr(rhs, false);
                }
                if op.is_comparison() {
                    let false_label = self.code.new_label();
                    let end_label = self.code.new_label();
                    self.generate_condition(expr, false, false_label)?;
                    self.code.emit(Instr::IConst(1));
                    self.code.emit(Instr::Goto(end_label));
                    self.code.place(false_label);
                    self.code.emit(Instr::IConst(0));
                    self.code.place(end_label);
                } else {
                    let (l, r) = (self.type_of(&lhs.node), self.type_of(&rhs.node));
                    let operand = operand_type(&l, &r)
                        .ok_or_else(|| CompileError::codegen(format!("operator {} on {l}, {r}", op.symbol())))?;
                    self.generate_operand(lhs, &l, operand)?;
                    self.generate_operand(rhs, &r, operand)?;
                    self.code.emit(Instr::Arith(arith_op(*op)?, ValueKind::of_primitive(operand)));
                }
            }
            Expr::Assign { target, op, value } => self.generate_assignment(target, *op, value, value_required)?,
            Expr::Call { name, args } => {
                let func = self
                    .ctx
                    .env
                    .function(&name.node)
                    .ok_or_else(|| CompileError::codegen(format!("unknown function '{}'", name.node)))?;
                for (arg, param) in args.iter().zip(&func.params) {
                    self.generate_expr(arg, true)?;
                    let from = self.type_of(&arg.node);
                    self.generate_assignment_conversion(&from, param);
                }
                let env = self.ctx.env;
                self.code.emit(Instr::Invoke(
                    InvokeKind::Static,
                    MethodRef::new(
                        env.internal_name(&func.owner),
                        name.node.clone(),
                        env.method_descriptor(&func.params, &func.return_type),
                    ),
                ));
                self.discard_result(&func.return_type, value_required);
            }
            Expr::MethodCall { receiver, method, args } => {
                let receiver_ty = self.type_of(&receiver.node);
                let env = self.ctx.env;
                let resolved = env.lookup_method(&receiver_ty, &method.node).ok_or_else(|| {
                    CompileError::codegen(format!("unknown method '{}' on {receiver_ty}", method.node))
                })?;
                self.generate_expr(receiver, true)?;
                for (arg, param) in args.iter().zip(&resolved.substituted.params) {
                    self.generate_expr(arg, true)?;
                    let from = self.type_of(&arg.node);
                    self.generate_assignment_conversion(&from, param);
                }
                let owner = Type::Class(resolved.owner.clone());
                let kind = if env.is_interface(&owner) { InvokeKind::Interface } else { InvokeKind::Virtual };
                self.code.emit(Instr::Invoke(
                    kind,
                    MethodRef::new(
                        env.reference_name(&owner),
                        method.node.clone(),
                        env.method_descriptor(&resolved.declared.params, &resolved.declared.return_type),
                    ),
                ));
                let returned = &resolved.substituted.return_type;
                if returned.is_reference() && returned.erasure() != resolved.declared.return_type.erasure() {
                    self.code.emit(Instr::CheckCast(env.reference_name(returned)));
                }
                self.discard_result(returned, value_required);
            }
        }
        Ok(())
    }

    fn discard_result(&mut self, ty: &Type, value_required: bool) {
        if !value_required && *ty != Type::Void {
            self.code.pop_value(ValueKind::of(ty));
        }
    }

    fn generate_operand(&mut self, expr: &Spanned<Expr>, ty: &Type, operand: PrimitiveType) -> Result<(), CompileError> {
        self.generate_expr(expr, true)?;
        if let Some(p) = ty.as_primitive() {
            self.code.convert(p, operand);
        }
        Ok(())
    }

    fn generate_new_array(
        &mut self,
        elem: &Spanned<TypeExpr>,
        elements: &[Spanned<Expr>],
        value_required: bool,
    ) -> Result<(), CompileError> {
        if !value_required {
            for element in elements {
                self.generate_expr(element, false)?;
            }
            return Ok(());
        }
        let component = self
            .ctx
            .env
            .resolve_type_expr(&elem.node, &self.ctx.type_vars)
            .map_err(CompileError::codegen)?;
        let length = i32::try_from(elements.len())
            .map_err(|_| CompileError::codegen("array initializer too large"))?;
        self.code.emit(Instr::IConst(length));
        match component.as_primitive() {
            Some(p) => self.code.emit(Instr::NewArray(p)),
            None => self.code.emit(Instr::ANewArray(self.ctx.env.reference_name(&component))),
        }
        let kind = ArrayKind::of(&component);
        for (i, element) in elements.iter().enumerate() {
            self.code.emit(Instr::Dup);
            self.code.emit(Instr::IConst(i as i32));
            self.generate_expr(element, true)?;
            let from = self.type_of(&element.node);
            self.generate_assignment_conversion(&from, &component);
            self.code.emit(Instr::ArrayStore(kind));
        }
        Ok(())
    }

    fn generate_assignment(
        &mut self,
        target: &Spanned<NameRef>,
        op: Option<BinOp>,
        value: &Spanned<Expr>,
        value_required: bool,
    ) -> Result<(), CompileError> {
        let id = Self::binding(&target.node)?;
        let local_ty = self.ctx.local(id).ty.clone();
        let value_ty = self.type_of(&value.node);
        let Some(op) = op else {
            if self.ctx.local(id).slot.is_none() {
                return self.generate_expr(value, value_required);
            }
            self.generate_expr(value, true)?;
            self.generate_assignment_conversion(&value_ty, &local_ty);
            return self.code.store(id, value_required);
        };

        // `i += c` on an int local with a small constant.
        if let (Type::Primitive(PrimitiveType::Int), Expr::IntLit(c), BinOp::Add | BinOp::Sub) =
            (&local_ty, &value.node, op)
        {
            let delta = if op == BinOp::Add { Some(*c) } else { c.checked_neg() };
            if let Some(delta) = delta.and_then(|d| i16::try_from(d).ok()) {
                self.code.iinc(id, delta)?;
                if value_required {
                    self.code.load(id)?;
                }
                return Ok(());
            }
        }

        let operand = operand_type(&local_ty, &value_ty)
            .ok_or_else(|| CompileError::codegen(format!("operator {}= on {local_ty}, {value_ty}", op.symbol())))?;
        let target_prim = local_ty
            .as_primitive()
            .ok_or_else(|| CompileError::codegen(format!("compound assignment to {local_ty}")))?;
        self.code.load(id)?;
        self.code.convert(target_prim, operand);
        self.generate_operand(value, &value_ty, operand)?;
        self.code.emit(Instr::Arith(arith_op(op)?, ValueKind::of_primitive(operand)));
        self.code.convert(operand, target_prim);
        self.code.store(id, value_required)
    }

    /// Jump to `target` when `expr` evaluates to `jump_if`; fall through
    /// otherwise.
    pub(crate) fn generate_condition(&mut self, expr: &Spanned<Expr>, jump_if: bool, target: Label) -> Result<(), CompileError> {
        match &expr.node {
            Expr::BoolLit(b) => {
                if *b == jump_if {
                    self.code.emit(Instr::Goto(target));
                }
            }
            Expr::Binary { op, lhs, rhs } if op.is_comparison() => {
                let (l, r) = (self.type_of(&lhs.node), self.type_of(&rhs.node));
                let cond = comparison(*op)?;
                let cond = if jump_if { cond } else { cond.negate() };
                match operand_type(&l, &r) {
                    Some(operand) => {
                        self.generate_operand(lhs, &l, operand)?;
                        self.generate_operand(rhs, &r, operand)?;
                        match ValueKind::of_primitive(operand) {
                            ValueKind::Int => self.code.emit(Instr::IfICmp(cond, target)),
                            kind => {
                                let nan_greater = matches!(op, BinOp::Lt | BinOp::Le);
                                self.code.emit(Instr::Compare { kind, nan_greater });
                                self.code.emit(Instr::If(cond, target));
                            }
                        }
                    }
                    None => {
                        self.generate_expr(lhs, true)?;
                        self.generate_expr(rhs, true)?;
                        if l.is_reference() {
                            self.code.emit(Instr::IfACmp(cond, target));
                        } else {
                            self.code.emit(Instr::IfICmp(cond, target));
                        }
                    }
                }
            }
            _ => {
                self.generate_expr(expr, true)?;
                let from = self.type_of(&expr.node);
                self.generate_assignment_conversion(&from, &Type::boolean());
                self.code.emit(Instr::If(if jump_if { Cond::Ne } else { Cond::Eq }, target));
            }
        }
        Ok(())
    }

    // ── Conversions ──────────────────────────────────────────────────────

    /// Widening, boxing or unboxing from `from` to `to`.
    pub(crate) fn generate_assignment_conversion(&mut self, from: &Type, to: &Type) {
        match (from.as_primitive(), to.as_primitive()) {
            (Some(p), Some(q)) => self.code.convert(p, q),
            (Some(p), None) if to.is_reference() => self.box_primitive(p),
            (None, Some(q)) => {
                if let Some(p) = self.ctx.env.unboxed_type(from) {
                    self.unbox(p);
                    self.code.convert(p, q);
                }
            }
            _ => {}
        }
    }

    /// `Wrapper.valueOf(p)`.
    pub(crate) fn box_primitive(&mut self, p: PrimitiveType) {
        let env = self.ctx.env;
        let wrapper = Type::class(p.wrapper());
        self.code.emit(Instr::Invoke(
            InvokeKind::Static,
            MethodRef::new(
                env.reference_name(&wrapper),
                "valueOf",
                env.method_descriptor(&[Type::Primitive(p)], &wrapper),
            ),
        ));
    }

    /// `wrapper.pValue()` on the wrapper of `p` on top of the stack.
    pub(crate) fn unbox(&mut self, p: PrimitiveType) {
        let env = self.ctx.env;
        let wrapper = Type::class(p.wrapper());
        self.code.emit(Instr::Invoke(
            InvokeKind::Virtual,
            MethodRef::new(
                env.reference_name(&wrapper),
                format!("{}Value", p.name()),
                env.method_descriptor(&[], &Type::Primitive(p)),
            ),
        ));
    }
}

fn arith_op(op: BinOp) -> Result<ArithOp, CompileError> {
    match op {
        BinOp::Add => Ok(ArithOp::Add),
        BinOp::Sub => Ok(ArithOp::Sub),
        BinOp::Mul => Ok(ArithOp::Mul),
        other => Err(CompileError::codegen(format!("{} is not arithmetic", other.symbol()))),
    }
}

fn comparison(op: BinOp) -> Result<Cond, CompileError> {
    match op {
        BinOp::Lt => Ok(Cond::Lt),
        BinOp::Le => Ok(Cond::Le),
        BinOp::Gt => Ok(Cond::Gt),
        BinOp::Ge => Ok(Cond::Ge),
        BinOp::Eq => Ok(Cond::Eq),
        BinOp::Ne => Ok(Cond::Ne),
        other => Err(CompileError::codegen(format!("{} is not a comparison", other.symbol()))),
    }
}
