use crate::ast::*;
use crate::context::MethodContext;
use crate::diagnostics::Problem;
use crate::span::{Span, Spanned};
use crate::typeck::scope::LocalId;
use crate::typeck::types::Type;

use super::context::{FlowContextStack, JumpError};
use super::{FlowInfo, NullStatus};

/// Run flow analysis over a resolved method. Returns the state at the end of
/// the body and records whether the body can complete normally.
pub fn analyze_method(method: &mut Method, ctx: &mut MethodContext) -> FlowInfo {
    let mut flow = FlowInfo::initial();
    for param in &method.params {
        if let Some(id) = param.binding {
            flow.mark_as_definitely_assigned(id);
        }
    }
    let mut analyzer = FlowAnalyzer::new(ctx);
    let out = analyzer.analyze_block(&mut method.body.node, flow);
    ctx.completes_normally = out.is_reachable();
    if ctx.completes_normally && ctx.return_type != Type::Void && !ctx.return_type.is_unknown() {
        ctx.diagnostics.error(
            Problem::TypeMismatch,
            format!("This method must return a result of type {}", ctx.return_type),
            method.name.span,
        );
    }
    out
}

pub struct FlowAnalyzer<'c, 'a> {
    pub(crate) ctx: &'c mut MethodContext<'a>,
    pub(crate) contexts: FlowContextStack,
}

impl<'c, 'a> FlowAnalyzer<'c, 'a> {
    pub fn new(ctx: &'c mut MethodContext<'a>) -> Self {
        Self { ctx, contexts: FlowContextStack::new() }
    }

    pub fn analyze_block(&mut self, block: &mut Block, mut flow: FlowInfo) -> FlowInfo {
        block.unreachable_from = None;
        let mut did_already_complain = false;
        for (i, stmt) in block.stmts.iter_mut().enumerate() {
            if self.complain_if_unreachable(stmt.span, &flow, did_already_complain) {
                if block.unreachable_from.is_none() {
                    block.unreachable_from = Some(i);
                }
                did_already_complain = true;
                continue;
            }
            flow = self.analyze_stmt(stmt, flow);
        }
        flow
    }

    /// Report a statement reached by no path. Returns true when `flow` is
    /// unreachable, whether or not a report was made.
    pub(crate) fn complain_if_unreachable(&mut self, span: Span, flow: &FlowInfo, did_already_complain: bool) -> bool {
        if flow.is_reachable() {
            return false;
        }
        if !did_already_complain {
            self.ctx.diagnostics.error(Problem::UnreachableCode, "Unreachable code", span);
        }
        true
    }

    pub fn analyze_stmt(&mut self, stmt: &mut Spanned<Stmt>, flow: FlowInfo) -> FlowInfo {
        let span = stmt.span;
        match &mut stmt.node {
            Stmt::Local(decl) => self.analyze_local_decl(decl, flow),
            Stmt::Expr(expr) => self.analyze_expr(expr, flow),
            Stmt::Block(block) => self.analyze_block(block, flow),
            Stmt::If { condition, then_branch, else_branch } => {
                let flow = self.analyze_expr(condition, flow);
                let then_out = self.analyze_stmt(then_branch, flow.clone());
                let else_out = match else_branch {
                    Some(else_branch) => self.analyze_stmt(else_branch, flow),
                    None => flow,
                };
                then_out.merged_with(&else_out)
            }
            Stmt::Foreach(node) => self.analyze_foreach(node, span, flow),
            Stmt::Labeled { label, body } => {
                self.contexts.push_label(&label.node, body.node.is_loop());
                let out = self.analyze_stmt(body, flow);
                match self.contexts.pop_label() {
                    Some(label_ctx) => out.merged_with(&label_ctx.inits_on_break),
                    None => out,
                }
            }
            Stmt::Break(label) => {
                let result = self.contexts.record_break(label.as_ref().map(|l| l.node.as_str()), &flow);
                self.report_jump(result, span);
                FlowInfo::dead_end()
            }
            Stmt::Continue(label) => {
                let result = self.contexts.record_continue(label.as_ref().map(|l| l.node.as_str()), &flow);
                self.report_jump(result, span);
                FlowInfo::dead_end()
            }
            Stmt::Return(value) => {
                if let Some(value) = value {
                    self.analyze_expr(value, flow);
                }
                FlowInfo::dead_end()
            }
            Stmt::Empty => flow,
        }
    }

    fn report_jump(&mut self, result: Result<(), JumpError>, span: Span) {
        if let Err(err) = result {
            self.ctx.diagnostics.error(Problem::InvalidJump, err.to_string(), span);
        }
    }

    pub(crate) fn analyze_local_decl(&mut self, decl: &mut LocalDecl, flow: FlowInfo) -> FlowInfo {
        let Some(init) = &decl.init else {
            return flow;
        };
        let mut flow = self.analyze_expr(init, flow);
        if let Some(id) = decl.binding {
            flow.mark_as_definitely_assigned(id);
            if self.tracks_nullness(id) {
                let status = self.null_status_of(&init.node, &flow);
                flow.mark_null_status(id, status);
            }
        }
        flow
    }

    pub(crate) fn analyze_expr(&mut self, expr: &Spanned<Expr>, mut flow: FlowInfo) -> FlowInfo {
        match &expr.node {
            Expr::IntLit(_) | Expr::BoolLit(_) | Expr::StringLit(_) | Expr::Null => flow,
            Expr::Name(name_ref) => {
                if let Some(id) = name_ref.binding {
                    self.check_initialized(id, &flow, expr.span);
                }
                flow
            }
            Expr::NewArray { elements, .. } => {
                for element in elements {
                    flow = self.analyze_expr(element, flow);
                }
                flow
            }
            Expr::Binary { lhs, rhs, .. } => {
                let flow = self.analyze_expr(lhs, flow);
                self.analyze_expr(rhs, flow)
            }
            Expr::Assign { target, op, value } => {
                let id = target.node.binding;
                if let (Some(id), Some(_)) = (id, op) {
                    self.check_initialized(id, &flow, target.span);
                }
                let mut flow = self.analyze_expr(value, flow);
                if let Some(id) = id {
                    self.check_final_assignment(id, &flow, target.span);
                    flow.mark_as_definitely_assigned(id);
                    if self.tracks_nullness(id) {
                        let status = self.null_status_of(&value.node, &flow);
                        flow.mark_null_status(id, status);
                    }
                }
                flow
            }
            Expr::Call { args, .. } => {
                for arg in args {
                    flow = self.analyze_expr(arg, flow);
                }
                flow
            }
            Expr::MethodCall { receiver, args, .. } => {
                let mut flow = self.analyze_expr(receiver, flow);
                self.check_npe(receiver, &mut flow);
                for arg in args {
                    flow = self.analyze_expr(arg, flow);
                }
                flow
            }
        }
    }

    fn check_initialized(&mut self, id: LocalId, flow: &FlowInfo, span: Span) {
        if flow.is_definitely_assigned(id) {
            return;
        }
        let name = self.ctx.local(id).name.clone();
        self.ctx.diagnostics.error(
            Problem::UninitializedLocal,
            format!("The local variable {name} may not have been initialized"),
            span,
        );
    }

    fn check_final_assignment(&mut self, id: LocalId, flow: &FlowInfo, span: Span) {
        let local = self.ctx.local(id);
        if !local.is_final || flow.is_unreachable() {
            return;
        }
        if flow.is_potentially_assigned(id) {
            let name = local.name.clone();
            self.report_final_reassignment(&name, span);
        } else {
            let declared_in = local.scope;
            self.contexts.record_setting_final(id, declared_in, span, &self.ctx.scope);
        }
    }

    pub(crate) fn report_final_reassignment(&mut self, name: &str, span: Span) {
        self.ctx.diagnostics.error(
            Problem::FinalReassignment,
            format!("The final local variable {name} may already have been assigned"),
            span,
        );
    }

    pub(crate) fn tracks_nullness(&self, id: LocalId) -> bool {
        self.ctx.options.null_analysis && self.ctx.local(id).ty.is_reference()
    }

    fn null_status_of(&self, expr: &Expr, flow: &FlowInfo) -> NullStatus {
        match expr {
            Expr::Null => NullStatus::Null,
            Expr::StringLit(_) | Expr::NewArray { .. } => NullStatus::NonNull,
            Expr::Name(name_ref) => name_ref.binding.map(|id| flow.null_status(id)).unwrap_or_default(),
            Expr::Assign { value, .. } => self.null_status_of(&value.node, flow),
            _ => NullStatus::Unknown,
        }
    }

    /// Check a dereference of `expr`. A local whose status is only known
    /// across loop iterations is deferred to the innermost loop. The local is
    /// non-null afterwards.
    pub(crate) fn check_npe(&mut self, expr: &Spanned<Expr>, flow: &mut FlowInfo) {
        if !self.ctx.options.null_analysis || flow.is_unreachable() {
            return;
        }
        let id = match &expr.node {
            Expr::Null => {
                self.ctx.diagnostics.error(
                    Problem::NullReference,
                    "Null pointer access: This expression can only be null",
                    expr.span,
                );
                return;
            }
            Expr::Name(NameRef { binding: Some(id), .. }) if self.tracks_nullness(*id) => *id,
            _ => return,
        };
        match flow.null_status(id) {
            NullStatus::Null => self.report_null(id, expr.span),
            NullStatus::PotentiallyNull => self.report_potential_null(id, expr.span),
            NullStatus::NonNull => {}
            NullStatus::Unknown => {
                let declared_in = self.ctx.local(id).scope;
                self.contexts
                    .record_using_null_reference(id, declared_in, expr.span, &self.ctx.scope);
            }
        }
        flow.mark_null_status(id, NullStatus::NonNull);
    }

    pub(crate) fn report_null(&mut self, id: LocalId, span: Span) {
        let name = self.ctx.local(id).name.clone();
        self.ctx.diagnostics.error(
            Problem::NullReference,
            format!("Null pointer access: The variable {name} can only be null at this location"),
            span,
        );
    }

    pub(crate) fn report_potential_null(&mut self, id: LocalId, span: Span) {
        let name = self.ctx.local(id).name.clone();
        self.ctx.diagnostics.warning(
            Problem::PotentialNullReference,
            format!("Potential null pointer access: The variable {name} may be null at this location"),
            span,
        );
    }
}
